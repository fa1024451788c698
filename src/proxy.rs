use std::fmt::{self, Debug};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::rc::Rc;

use crate::auth::LockAuth;
use crate::lock::{RawLock, RwLock, Tracking};

/// A live acquisition: the protected value, the lock holding it, and the
/// bookkeeping needed to let go of both.
///
/// Dropping the locker releases the container's lock and then the
/// meta-lock gate hold, the reverse of acquisition order.
pub(crate) struct Locker<'a, T: ?Sized> {
	value: NonNull<T>,
	count: usize,
	shared: bool,
	lock: &'a dyn RawLock,
	auth: Option<&'a dyn LockAuth>,
	gate: Option<&'a RwLock>,
}

impl<'a, T: ?Sized> Locker<'a, T> {
	fn new(
		value: NonNull<T>,
		lock: &'a dyn RawLock,
		auth: Option<&'a dyn LockAuth>,
		shared: bool,
		blocking: bool,
		gate: Option<&'a RwLock>,
	) -> Option<Self> {
		// gate first: the hold is real for the proxy's whole lifetime, but
		// untracked, so it is never charged to the authorization
		if let Some(gate) = gate {
			gate.acquire(auth, true, blocking, Tracking::Untracked)?;
		}
		match lock.acquire(auth, shared, blocking, Tracking::Tracked) {
			Some(count) => Some(Self {
				value,
				count,
				shared,
				lock,
				auth,
				gate,
			}),
			None => {
				if let Some(gate) = gate {
					let _ = gate.release(auth, true, Tracking::Untracked);
				}
				None
			}
		}
	}
}

impl<T: ?Sized> Drop for Locker<'_, T> {
	fn drop(&mut self) {
		let _ = self.lock.release(self.auth, self.shared, Tracking::Tracked);
		if let Some(gate) = self.gate {
			let _ = gate.release(self.auth, true, Tracking::Untracked);
		}
	}
}

/// A proxy granting mutable access to a container's value.
///
/// The proxy either owns a live exclusive acquisition or is empty; check
/// with [`is_valid`] before dereferencing. The acquisition is released when
/// the proxy is dropped or [`clear`]ed. A `WriteProxy` is move-only and
/// confined to the thread that created it.
///
/// Mutable access is refused (by panic or `None`) while the same
/// authorization also holds read proxies on the container, since those
/// borrow the value too.
///
/// [`is_valid`]: `WriteProxy::is_valid`
/// [`clear`]: `WriteProxy::clear`
pub struct WriteProxy<'a, T: ?Sized> {
	inner: Option<Locker<'a, T>>,
}

/// A proxy granting shared access to a container's value.
///
/// Clones share the same acquisition; the lock is released when the last
/// clone is dropped or cleared. The reference count is not atomic; a
/// `ReadProxy` never leaves its thread.
pub struct ReadProxy<'a, T: ?Sized> {
	inner: Option<Rc<Locker<'a, T>>>,
}

impl<'a, T: ?Sized> WriteProxy<'a, T> {
	pub(crate) fn new(
		value: NonNull<T>,
		lock: &'a dyn RawLock,
		auth: Option<&'a dyn LockAuth>,
		blocking: bool,
		gate: Option<&'a RwLock>,
	) -> Self {
		Self {
			inner: Locker::new(value, lock, auth, false, blocking, gate),
		}
	}

	/// Did the acquisition succeed?
	#[must_use]
	pub fn is_valid(&self) -> bool {
		self.inner.is_some()
	}

	/// Release the acquisition now instead of at the end of scope.
	///
	/// Idempotent: clearing an empty proxy does nothing.
	pub fn clear(&mut self) {
		self.inner = None;
	}

	/// The lock's reader count at the moment of acquisition.
	///
	/// Zero for an exclusive acquisition, and for an empty proxy.
	#[must_use]
	pub fn last_lock_count(&self) -> usize {
		self.inner.as_ref().map_or(0, |locker| locker.count)
	}

	/// The protected value, or `None` for an empty proxy.
	#[must_use]
	pub fn get(&self) -> Option<&T> {
		// safety: the exclusive acquisition keeps every other thread out,
		// and this thread only holds shared borrows through this call
		self.inner
			.as_ref()
			.map(|locker| unsafe { locker.value.as_ref() })
	}

	/// The protected value, mutably.
	///
	/// `None` for an empty proxy, and while re-entrant read proxies exist
	/// on the same container, since their borrows alias the value.
	#[must_use]
	pub fn get_mut(&mut self) -> Option<&mut T> {
		let locker = self.inner.as_mut()?;
		if locker.lock.readers() > 0 {
			return None;
		}
		// safety: exclusive acquisition, and no read proxy outstanding;
		// the readers check cannot race because only this thread's
		// authorization can hold read locks past our write lock
		Some(unsafe { locker.value.as_mut() })
	}
}

impl<T: ?Sized> Deref for WriteProxy<'_, T> {
	type Target = T;

	/// # Panics
	///
	/// Panics if the proxy is empty.
	fn deref(&self) -> &Self::Target {
		self.get().expect("dereferenced an empty write proxy")
	}
}

impl<T: ?Sized> DerefMut for WriteProxy<'_, T> {
	/// # Panics
	///
	/// Panics if the proxy is empty, or if the value is also held through
	/// re-entrant read proxies.
	fn deref_mut(&mut self) -> &mut Self::Target {
		let locker = self
			.inner
			.as_mut()
			.expect("dereferenced an empty write proxy");
		assert!(
			locker.lock.readers() == 0,
			"value is also borrowed through a read proxy"
		);
		// safety: see `get_mut`
		unsafe { locker.value.as_mut() }
	}
}

impl<T: ?Sized + Debug> Debug for WriteProxy<'_, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.get() {
			Some(value) => Debug::fmt(value, f),
			None => f.write_str("<empty>"),
		}
	}
}

impl<'a, T: ?Sized> ReadProxy<'a, T> {
	pub(crate) fn new(
		value: NonNull<T>,
		lock: &'a dyn RawLock,
		auth: Option<&'a dyn LockAuth>,
		blocking: bool,
		gate: Option<&'a RwLock>,
	) -> Self {
		Self {
			inner: Locker::new(value, lock, auth, true, blocking, gate).map(Rc::new),
		}
	}

	/// Did the acquisition succeed?
	#[must_use]
	pub fn is_valid(&self) -> bool {
		self.inner.is_some()
	}

	/// Drop this handle's share of the acquisition.
	///
	/// The lock itself is released when the last clone lets go. Idempotent.
	pub fn clear(&mut self) {
		self.inner = None;
	}

	/// The lock's reader count at the moment of acquisition.
	#[must_use]
	pub fn last_lock_count(&self) -> usize {
		self.inner.as_ref().map_or(0, |locker| locker.count)
	}

	/// The protected value, or `None` for an empty proxy.
	#[must_use]
	pub fn get(&self) -> Option<&T> {
		// safety: the shared acquisition excludes writers; every live
		// borrow of the value is a shared one
		self.inner
			.as_ref()
			.map(|locker| unsafe { locker.value.as_ref() })
	}
}

impl<T: ?Sized> Clone for ReadProxy<'_, T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: ?Sized> Deref for ReadProxy<'_, T> {
	type Target = T;

	/// # Panics
	///
	/// Panics if the proxy is empty.
	fn deref(&self) -> &Self::Target {
		self.get().expect("dereferenced an empty read proxy")
	}
}

impl<T: ?Sized + Debug> Debug for ReadProxy<'_, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.get() {
			Some(value) => Debug::fmt(value, f),
			None => f.write_str("<empty>"),
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::auth::RwAuth;
	use crate::protected::Protected;

	#[test]
	fn clear_is_idempotent() {
		let container: Protected<i32> = Protected::new(5);

		let mut proxy = container.acquire_write(true);
		assert!(proxy.is_valid());
		proxy.clear();
		assert!(!proxy.is_valid());
		proxy.clear();
		assert!(!proxy.is_valid());

		// the lock is free again
		assert!(container.acquire_write(false).is_valid());
	}

	#[test]
	fn clones_share_one_acquisition() {
		let container: Protected<String> = Protected::new(String::from("shared"));

		let first = container.acquire_read(true);
		let second = first.clone();
		assert_eq!(first.last_lock_count(), 1);
		assert_eq!(second.last_lock_count(), 1);

		drop(first);
		// still read-locked: a write attempt fails
		assert!(!container.acquire_write(false).is_valid());

		drop(second);
		assert!(container.acquire_write(false).is_valid());
	}

	#[test]
	fn empty_proxy_reports_nothing() {
		let container: Protected<i32> = Protected::new(1);
		let _held = container.acquire_write(true);

		let missed = container.acquire_read(false);
		assert!(!missed.is_valid());
		assert_eq!(missed.last_lock_count(), 0);
		assert!(missed.get().is_none());
	}

	#[test]
	#[should_panic(expected = "empty read proxy")]
	fn deref_of_empty_proxy_panics() {
		let container: Protected<i32> = Protected::new(1);
		let _held = container.acquire_write(true);

		let missed = container.acquire_read(false);
		let _ = *missed;
	}

	#[test]
	fn writer_mutation_waits_for_reentrant_readers() {
		let auth = RwAuth::new();
		let container: Protected<i32> = Protected::new(7);

		let mut write = container.acquire_write_auth(&auth, true);
		*write += 1;

		let read = container.acquire_read_auth(&auth, true);
		assert_eq!(*read, 8);

		// the read proxy borrows the value, so mutable access is refused
		assert!(write.get_mut().is_none());
		drop(read);
		assert_eq!(write.get_mut().copied(), Some(8));
	}
}
