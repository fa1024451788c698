use std::fmt::{self, Debug};

use crate::auth::LockAuth;
use crate::lock::{RawLock, RwLock, Tracking};

/// A value-less container acting as a gate for multi-container critical
/// sections.
///
/// Containers accept a meta-lock at each acquisition
/// ([`Protected::acquire_write_through`] and friends); every proxy obtained
/// that way keeps a shared hold on the gate for its lifetime. A caller that
/// acquires the gate exclusively therefore waits until no through-proxy is
/// left and fences off new ones. Because its authorization is marked as
/// the escalation holder, it may then lock as many participating
/// containers as it needs, something its authorization would otherwise
/// forbid.
///
/// The exclusive hold can be dropped as soon as the needed proxies are in
/// hand: the proxies keep protecting their containers, and other callers
/// resume once those proxies are gone.
///
/// This only prevents deadlocks if *all* code locking the participating
/// containers goes through the same meta-lock. [`MetaLock::global`] is a
/// process-wide gate for the common case.
///
/// # Examples
///
/// ```
/// use custody::{MetaLock, Protected};
///
/// let meta = MetaLock::new();
/// let first = Protected::<i32>::new(1);
/// let second = Protected::<i32>::new(2);
/// let auth = first.new_auth();
///
/// // drain and fence off both containers, then lock them together
/// let gate = meta.acquire_write(&auth, true);
/// assert!(gate.is_valid());
///
/// let mut a = first.acquire_write_through(&meta, &auth, true);
/// let mut b = second.acquire_write_through(&meta, &auth, true);
/// std::mem::swap(&mut *a, &mut *b);
/// ```
///
/// [`Protected::acquire_write_through`]: `crate::Protected::acquire_write_through`
pub struct MetaLock {
	gate: RwLock,
}

static GLOBAL: MetaLock = MetaLock::new();

impl MetaLock {
	/// Create a new meta-lock.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			gate: RwLock::new(),
		}
	}

	/// The process-wide meta-lock.
	#[must_use]
	pub fn global() -> &'static MetaLock {
		&GLOBAL
	}

	pub(crate) fn gate(&self) -> &RwLock {
		&self.gate
	}

	/// Acquire the gate exclusively, establishing a multi-container
	/// critical section.
	///
	/// Blocks (if `blocking`) until every through-proxy has been dropped.
	/// An authorization is required; while the returned guard is live, that
	/// authorization may acquire participating containers freely.
	#[must_use]
	pub fn acquire_write<'a>(&'a self, auth: &'a dyn LockAuth, blocking: bool) -> MetaWriteGuard<'a> {
		let inner = self
			.gate
			.acquire(Some(auth), false, blocking, Tracking::Tracked)
			.map(|_| {
				auth.note_meta(true);
				WriteHold {
					gate: &self.gate,
					auth,
				}
			});
		MetaWriteGuard { inner }
	}

	/// Acquire the gate shared, holding open the current set of
	/// through-acquisitions.
	///
	/// This blocks an escalating writer for as long as the guard lives; it
	/// confers no escalation right.
	#[must_use]
	pub fn acquire_read<'a>(&'a self, auth: &'a dyn LockAuth, blocking: bool) -> MetaReadGuard<'a> {
		let inner = self
			.gate
			.acquire(Some(auth), true, blocking, Tracking::Tracked)
			.map(|count| ReadHold {
				gate: &self.gate,
				auth,
				count,
			});
		MetaReadGuard { inner }
	}
}

impl Default for MetaLock {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for MetaLock {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MetaLock").field("gate", &self.gate).finish()
	}
}

struct WriteHold<'a> {
	gate: &'a RwLock,
	auth: &'a dyn LockAuth,
}

impl Drop for WriteHold<'_> {
	fn drop(&mut self) {
		self.auth.note_meta(false);
		let _ = self.gate.release(Some(self.auth), false, Tracking::Tracked);
	}
}

struct ReadHold<'a> {
	gate: &'a RwLock,
	auth: &'a dyn LockAuth,
	count: usize,
}

impl Drop for ReadHold<'_> {
	fn drop(&mut self) {
		let _ = self.gate.release(Some(self.auth), true, Tracking::Tracked);
	}
}

/// An exclusive hold on a [`MetaLock`], or nothing.
///
/// While valid, the authorization that took it may lock any number of
/// participating containers. Dropping (or clearing) the guard reopens the
/// gate.
#[must_use]
pub struct MetaWriteGuard<'a> {
	inner: Option<WriteHold<'a>>,
}

impl MetaWriteGuard<'_> {
	/// Did the acquisition succeed?
	#[must_use]
	pub fn is_valid(&self) -> bool {
		self.inner.is_some()
	}

	/// Reopen the gate now instead of at the end of scope. Idempotent.
	pub fn clear(&mut self) {
		self.inner = None;
	}
}

impl Debug for MetaWriteGuard<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MetaWriteGuard")
			.field("valid", &self.is_valid())
			.finish()
	}
}

/// A shared hold on a [`MetaLock`], or nothing.
#[must_use]
pub struct MetaReadGuard<'a> {
	inner: Option<ReadHold<'a>>,
}

impl MetaReadGuard<'_> {
	/// Did the acquisition succeed?
	#[must_use]
	pub fn is_valid(&self) -> bool {
		self.inner.is_some()
	}

	/// The gate's reader count at the moment of acquisition.
	#[must_use]
	pub fn last_lock_count(&self) -> usize {
		self.inner.as_ref().map_or(0, |hold| hold.count)
	}

	/// Release the hold now instead of at the end of scope. Idempotent.
	pub fn clear(&mut self) {
		self.inner = None;
	}
}

impl Debug for MetaReadGuard<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MetaReadGuard")
			.field("valid", &self.is_valid())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::{LockAuth, RwAuth};
	use crate::protected::Protected;

	#[test]
	fn exclusive_gate_confers_escalation() {
		let meta = MetaLock::new();
		let first = Protected::<i32>::new(1);
		let second = Protected::<i32>::new(2);
		let auth = RwAuth::new();

		let gate = meta.acquire_write(&auth, true);
		assert!(gate.is_valid());
		assert!(auth.meta_held());

		// two exclusive proxies at once, normally forbidden
		let a = first.acquire_write_through(&meta, &auth, true);
		let b = second.acquire_write_through(&meta, &auth, true);
		assert!(a.is_valid() && b.is_valid());
		assert_eq!(auth.writing_count(), 3);

		drop(gate);
		assert!(!auth.meta_held());
		// the proxies keep protecting their containers
		assert!(!first.acquire_write(false).is_valid());
		drop(a);
		drop(b);
		assert!(first.acquire_write(false).is_valid());
	}

	#[test]
	fn through_proxies_hold_the_gate_open() {
		let meta = MetaLock::new();
		let container = Protected::<i32>::new(0);
		let reader = RwAuth::new();
		let writer = RwAuth::new();

		let held = container.acquire_read_through(&meta, &reader, true);
		assert!(held.is_valid());
		// the gate hold is real but not charged to the authorization
		assert_eq!(reader.reading_count(), 1);

		let refused = meta.acquire_write(&writer, false);
		assert!(!refused.is_valid());

		drop(held);
		let granted = meta.acquire_write(&writer, false);
		assert!(granted.is_valid());
	}

	#[test]
	fn read_guard_blocks_an_escalator() {
		let meta = MetaLock::new();
		let holder = RwAuth::new();
		let writer = RwAuth::new();

		let read = meta.acquire_read(&holder, true);
		assert!(read.is_valid());
		assert_eq!(read.last_lock_count(), 1);
		assert_eq!(holder.reading_count(), 1);

		assert!(!meta.acquire_write(&writer, false).is_valid());
		drop(read);
		assert!(meta.acquire_write(&writer, false).is_valid());
	}

	#[test]
	fn clear_reopens_the_gate() {
		let meta = MetaLock::new();
		let auth = RwAuth::new();
		let other = RwAuth::new();

		let mut gate = meta.acquire_write(&auth, true);
		assert!(!meta.acquire_write(&other, false).is_valid());
		gate.clear();
		gate.clear();
		assert!(meta.acquire_write(&other, false).is_valid());
	}
}
