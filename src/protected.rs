use std::cell::UnsafeCell;
use std::fmt::{self, Debug};
use std::ptr::{self, NonNull};

use crate::auth::{LockAuth, Order};
use crate::lock::{DefaultAuth, RawLock, RwLock};
use crate::meta::MetaLock;
use crate::proxy::{ReadProxy, WriteProxy};

/// A container that keeps its value in custody: the only path to the value
/// is a proxy that owns a live lock acquisition.
///
/// The second type parameter picks the lock; [`RwLock`] is the default.
/// While any proxy exists the lock holds a matching acquisition (shared
/// for read proxies, exclusive for write proxies), so the usual
/// forgot-to-lock bugs cannot be written.
///
/// # Examples
///
/// ```
/// use custody::Protected;
///
/// let counter = Protected::<i32>::new(0);
///
/// {
///     let mut value = counter.acquire_write(true);
///     *value += 1;
/// }
///
/// let value = counter.acquire_read(true);
/// assert_eq!(*value, 1);
/// ```
///
/// Pass an authorization to every acquisition to opt in to deadlock
/// prevention:
///
/// ```
/// use custody::Protected;
///
/// let first = Protected::<i32>::new(1);
/// let second = Protected::<i32>::new(2);
/// let auth = first.new_auth();
///
/// let held = first.acquire_read_auth(&auth, true);
/// // taking a write lock while holding a read lock could deadlock;
/// // the authorization refuses it and the proxy comes back empty
/// let refused = second.acquire_write_auth(&auth, true);
/// assert!(held.is_valid());
/// assert!(!refused.is_valid());
/// ```
pub struct Protected<T: ?Sized, L = RwLock> {
	lock: L,
	value: UnsafeCell<T>,
}

impl<T, L: Default> Protected<T, L> {
	/// Create a container around `value` with a default lock.
	#[must_use]
	pub fn new(value: T) -> Self {
		Self::with_lock(value, L::default())
	}
}

impl<T, L> Protected<T, L> {
	/// Create a container around `value` with the given lock.
	///
	/// This is how ordered containers are made:
	///
	/// ```
	/// use custody::{lock::{OrderedLock, RwLock}, Protected};
	///
	/// let container = Protected::with_lock(7, OrderedLock::new(RwLock::new(), 1));
	/// assert_eq!(container.order(), 1);
	/// ```
	#[must_use]
	pub const fn with_lock(value: T, lock: L) -> Self {
		Self {
			lock,
			value: UnsafeCell::new(value),
		}
	}

	/// Consume the container, returning the value.
	#[must_use]
	pub fn into_inner(self) -> T {
		self.value.into_inner()
	}
}

impl<T: ?Sized, L> Protected<T, L> {
	/// The value, bypassing the lock.
	///
	/// No locking happens and none is needed: the mutable borrow statically
	/// guarantees no proxies exist.
	#[must_use]
	pub fn get_mut(&mut self) -> &mut T {
		self.value.get_mut()
	}

	/// The underlying lock.
	///
	/// # Safety
	///
	/// The lock can be used to release acquisitions that proxies still
	/// rely on. Nothing may be released that a proxy owns.
	#[must_use]
	pub const unsafe fn raw(&self) -> &L {
		&self.lock
	}

	fn value_ptr(&self) -> NonNull<T> {
		// safety: an UnsafeCell pointer is never null
		unsafe { NonNull::new_unchecked(self.value.get()) }
	}
}

impl<T: ?Sized, L: RawLock> Protected<T, L> {
	/// The container's lock order. Zero unless the lock is ordered.
	#[must_use]
	pub fn order(&self) -> Order {
		self.lock.order()
	}

	/// Acquire a write proxy without deadlock prevention.
	///
	/// Blocks until the lock is granted when `blocking` is true; otherwise
	/// returns an empty proxy if the lock is busy. Always test the result
	/// with [`WriteProxy::is_valid`].
	#[must_use]
	pub fn acquire_write(&self, blocking: bool) -> WriteProxy<'_, T> {
		WriteProxy::new(self.value_ptr(), &self.lock, None, blocking, None)
	}

	/// Acquire a read proxy without deadlock prevention.
	#[must_use]
	pub fn acquire_read(&self, blocking: bool) -> ReadProxy<'_, T> {
		ReadProxy::new(self.value_ptr(), &self.lock, None, blocking, None)
	}

	/// Acquire a write proxy, letting `auth` veto the acquisition.
	///
	/// The proxy comes back empty when the authorization refuses, that is,
	/// when granting would let this caller wait on a lock while other
	/// callers wait on locks it holds.
	#[must_use]
	pub fn acquire_write_auth<'a>(
		&'a self,
		auth: &'a dyn LockAuth,
		blocking: bool,
	) -> WriteProxy<'a, T> {
		WriteProxy::new(self.value_ptr(), &self.lock, Some(auth), blocking, None)
	}

	/// Acquire a read proxy, letting `auth` veto the acquisition.
	#[must_use]
	pub fn acquire_read_auth<'a>(
		&'a self,
		auth: &'a dyn LockAuth,
		blocking: bool,
	) -> ReadProxy<'a, T> {
		ReadProxy::new(self.value_ptr(), &self.lock, Some(auth), blocking, None)
	}

	/// Acquire a write proxy through a meta-lock.
	///
	/// The proxy additionally holds the meta-lock's gate (shared) for its
	/// whole lifetime, so an exclusive holder of the meta-lock can drain
	/// and fence off every participating container at once.
	#[must_use]
	pub fn acquire_write_through<'a>(
		&'a self,
		meta: &'a MetaLock,
		auth: &'a dyn LockAuth,
		blocking: bool,
	) -> WriteProxy<'a, T> {
		WriteProxy::new(
			self.value_ptr(),
			&self.lock,
			Some(auth),
			blocking,
			Some(meta.gate()),
		)
	}

	/// Acquire a read proxy through a meta-lock.
	#[must_use]
	pub fn acquire_read_through<'a>(
		&'a self,
		meta: &'a MetaLock,
		auth: &'a dyn LockAuth,
		blocking: bool,
	) -> ReadProxy<'a, T> {
		ReadProxy::new(
			self.value_ptr(),
			&self.lock,
			Some(auth),
			blocking,
			Some(meta.gate()),
		)
	}

	/// Replace this container's value with a copy of `source`'s.
	///
	/// Assignment proper: locks `self` for writing and `source` for
	/// reading, blocking on both, copies, and releases. Assigning a
	/// container to itself does nothing. Prefer [`try_copy`] and its
	/// variants where a failed lock should be survivable.
	///
	/// # Panics
	///
	/// A lock that refuses outright is a fatal error here: a
	/// [`BrokenLock`] on either side, a write on a [`ReadLock`]
	/// destination, or an ordered container (which never grants the null
	/// authorization).
	///
	/// [`BrokenLock`]: `crate::lock::BrokenLock`
	/// [`ReadLock`]: `crate::lock::ReadLock`
	pub fn assign<LS: RawLock>(&self, source: &Protected<T, LS>)
	where
		T: Clone,
	{
		if ptr::eq(self.value.get(), source.value.get()) {
			return;
		}
		let mut write = self.acquire_write(true);
		let read = source.acquire_read(true);
		let destination = write
			.get_mut()
			.expect("assignment could not write-lock the destination");
		let source_value = read
			.get()
			.expect("assignment could not read-lock the source");
		destination.clone_from(source_value);
	}
}

impl<T: ?Sized, L: DefaultAuth> Protected<T, L> {
	/// Create an authorization of the variant matching this container's
	/// lock type. One authorization per caller.
	#[must_use]
	pub fn new_auth(&self) -> L::Auth {
		L::new_auth()
	}
}

impl<T: ?Sized + Debug, L: RawLock> Debug for Protected<T, L> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// just a try lock, dropped immediately; this cannot block anyone
		let proxy = self.acquire_read(false);
		match proxy.get() {
			Some(value) => f.debug_struct("Protected").field("value", &value).finish(),
			None => {
				struct LockedPlaceholder;
				impl Debug for LockedPlaceholder {
					fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
						f.write_str("<locked>")
					}
				}

				f.debug_struct("Protected")
					.field("value", &LockedPlaceholder)
					.finish()
			}
		}
	}
}

impl<T: Default, L: Default> Default for Protected<T, L> {
	fn default() -> Self {
		Self::new(T::default())
	}
}

impl<T, L: Default> From<T> for Protected<T, L> {
	fn from(value: T) -> Self {
		Self::new(value)
	}
}

impl<T: ?Sized, L> AsMut<T> for Protected<T, L> {
	fn as_mut(&mut self) -> &mut T {
		self.get_mut()
	}
}

unsafe impl<T: ?Sized + Send, L: Send> Send for Protected<T, L> {}
unsafe impl<T: ?Sized + Send + Sync, L: Sync> Sync for Protected<T, L> {}

/// Copy one container's value into another, without deadlock prevention.
///
/// Locks the destination for writing and the source for reading, in that
/// order, and fails if either acquisition fails. Copying a container onto
/// itself succeeds without locking anything.
pub fn try_copy<T, LD, LS>(dst: &Protected<T, LD>, src: &Protected<T, LS>, blocking: bool) -> bool
where
	T: Clone,
	LD: RawLock,
	LS: RawLock,
{
	if ptr::eq(dst.value.get(), src.value.get()) {
		return true;
	}
	let mut write = dst.acquire_write(blocking);
	if !write.is_valid() {
		return false;
	}
	let read = src.acquire_read(blocking);
	if !read.is_valid() {
		return false;
	}
	match (write.get_mut(), read.get()) {
		(Some(dst_value), Some(src_value)) => {
			dst_value.clone_from(src_value);
			true
		}
		_ => false,
	}
}

/// Copy one container's value into another under one authorization.
///
/// The containers' orders decide which lock is taken first, so two ordered
/// containers are always locked in a consistent direction.
pub fn try_copy_auth<'a, T, LD, LS>(
	dst: &'a Protected<T, LD>,
	src: &'a Protected<T, LS>,
	auth: &'a dyn LockAuth,
	blocking: bool,
) -> bool
where
	T: Clone,
	LD: RawLock,
	LS: RawLock,
{
	if ptr::eq(dst.value.get(), src.value.get()) {
		return true;
	}

	let mut write;
	let read;
	if dst.order() < src.order() {
		write = dst.acquire_write_auth(auth, blocking);
		read = src.acquire_read_auth(auth, blocking);
	} else {
		read = src.acquire_read_auth(auth, blocking);
		write = dst.acquire_write_auth(auth, blocking);
	}
	if !write.is_valid() || !read.is_valid() {
		return false;
	}
	match (write.get_mut(), read.get()) {
		(Some(dst_value), Some(src_value)) => {
			dst_value.clone_from(src_value);
			true
		}
		_ => false,
	}
}

/// Copy one container's value into another inside a meta-lock section.
///
/// Acquires the meta-lock exclusively first, so both containers are
/// guaranteed free; fails if any of the three acquisitions fails.
pub fn try_copy_through<'a, T, LD, LS>(
	dst: &'a Protected<T, LD>,
	src: &'a Protected<T, LS>,
	meta: &'a MetaLock,
	auth: &'a dyn LockAuth,
	blocking: bool,
) -> bool
where
	T: Clone,
	LD: RawLock,
	LS: RawLock,
{
	if ptr::eq(dst.value.get(), src.value.get()) {
		return true;
	}

	let gate = meta.acquire_write(auth, blocking);
	if !gate.is_valid() {
		return false;
	}
	let mut write = dst.acquire_write_through(meta, auth, blocking);
	if !write.is_valid() {
		return false;
	}
	let read = src.acquire_read_through(meta, auth, blocking);
	if !read.is_valid() {
		return false;
	}
	match (write.get_mut(), read.get()) {
		(Some(dst_value), Some(src_value)) => {
			dst_value.clone_from(src_value);
			true
		}
		_ => false,
	}
}
