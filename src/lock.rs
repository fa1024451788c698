use std::sync::atomic::AtomicUsize;

use parking_lot::{Condvar, Mutex};

use crate::auth::{LockAuth, Order, Request};

mod broken;
mod dumb;
mod ordered;
mod read;
mod rw;
mod write;

/// Whether a lock operation is recorded against the supplied
/// authorization.
///
/// An [`Untracked`] acquisition is real (the lock changes state) but the
/// authorization is only consulted, never charged. The meta-lock gate hold
/// kept by a through-acquisition works this way: it must not count toward
/// the caller's held locks, or a caller could never hold more than the gate.
///
/// [`Untracked`]: `Tracking::Untracked`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tracking {
	/// Consult the authorization and record the acquisition.
	Tracked,
	/// Consult the authorization but record nothing.
	Untracked,
}

/// Opaque identity of an authorization object.
///
/// Compared for equality only, never dereferenced; an [`RwLock`] remembers
/// which authorization holds its write slot this way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AuthId(*const ());

impl AuthId {
	pub(crate) fn of(auth: &dyn LockAuth) -> Self {
		Self(auth as *const dyn LockAuth as *const ())
	}
}

// safety: the pointer is an identity token; it is never dereferenced
unsafe impl Send for AuthId {}

/// Evaluate the authorization for an attempted acquisition.
///
/// A null authorization permits everything except ordered locks.
pub(crate) fn register_auth(
	auth: Option<&dyn LockAuth>,
	request: &mut Request,
	tracking: Tracking,
) -> bool {
	match auth {
		None => request.order == 0,
		Some(auth) => match tracking {
			Tracking::Tracked => auth.register(request),
			Tracking::Untracked => auth.test(request),
		},
	}
}

/// Undo the bookkeeping of a tracked [`register_auth`].
pub(crate) fn release_auth(
	auth: Option<&dyn LockAuth>,
	shared: bool,
	order: Order,
	tracking: Tracking,
) {
	if let (Some(auth), Tracking::Tracked) = (auth, tracking) {
		auth.release(shared, order);
	}
}

/// A lock primitive: the wait/grant machinery underneath a container.
///
/// All variants share one contract. An acquisition names the authorization
/// speaking for the caller (or `None` to opt out of deadlock prevention),
/// whether it is shared, whether the caller may wait, and whether it is
/// recorded against the authorization. On success the returned count is the
/// new reader total for a shared acquisition and `0` for an exclusive one;
/// `None` means the acquisition failed: refused by the authorization,
/// abandoned because it could not be granted without waiting, or impossible
/// for the lock variant.
///
/// Failures never change lock state or authorization counts.
pub trait RawLock {
	/// The order of this lock. Zero means unordered.
	fn order(&self) -> Order {
		0
	}

	/// The number of shared holds currently granted.
	///
	/// Diagnostic; it may be stale by the time the caller looks at it,
	/// except for the one reader the caller itself controls.
	fn readers(&self) -> usize {
		0
	}

	/// Acquire the lock.
	fn acquire(
		&self,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
		tracking: Tracking,
	) -> Option<usize> {
		self.acquire_at(self.order(), auth, shared, blocking, tracking)
	}

	/// Release one acquisition. Never waits.
	fn release(
		&self,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		tracking: Tracking,
	) -> Option<usize> {
		self.release_at(self.order(), auth, shared, tracking)
	}

	/// Would an acquisition succeed right now?
	///
	/// Pure: evaluates the authorization in test mode and inspects lock
	/// state without changing either. A blocking acquisition that would
	/// merely have to wait still counts as succeeding.
	fn test(&self, auth: Option<&dyn LockAuth>, shared: bool, blocking: bool) -> bool {
		self.test_at(self.order(), auth, shared, blocking)
	}

	/// [`acquire`] with the order supplied by the caller.
	///
	/// This is how [`OrderedLock`] injects its order into the wrapped
	/// primitive; use [`acquire`] everywhere else.
	///
	/// [`acquire`]: `RawLock::acquire`
	fn acquire_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
		tracking: Tracking,
	) -> Option<usize>;

	/// [`release`] with the order supplied by the caller.
	///
	/// [`release`]: `RawLock::release`
	fn release_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		tracking: Tracking,
	) -> Option<usize>;

	/// [`test`] with the order supplied by the caller.
	///
	/// [`test`]: `RawLock::test`
	fn test_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
	) -> bool;
}

/// Maps a lock type to the authorization variant that understands its
/// policy. [`Protected::new_auth`] goes through this.
///
/// [`Protected::new_auth`]: `crate::Protected::new_auth`
pub trait DefaultAuth {
	/// The authorization variant for this lock type.
	type Auth: LockAuth + Default;

	/// Create a fresh authorization for this lock type.
	#[must_use]
	fn new_auth() -> Self::Auth {
		Self::Auth::default()
	}
}

/// The default lock: multiple readers or one writer, with writer priority.
///
/// A write acquisition blocks until all readers and any current writer have
/// left, locking out new readers in the meantime. At most one writer queues
/// for the write slot at a time; later writers wait to become the queued
/// writer. The lock remembers which authorization holds the write slot so
/// that the same authorization may take additional read locks on the same
/// container, the re-entrant read that makes meta-lock escalation work.
pub struct RwLock {
	state: Mutex<RwState>,
	read_wait: Condvar,
	write_wait: Condvar,
}

struct RwState {
	readers: usize,
	readers_waiting: usize,
	writer: bool,
	writer_waiting: bool,
	the_writer: Option<AuthId>,
}

/// A lock that admits readers and nothing else.
///
/// Acquisitions never wait; there is nothing to wait for. Exclusive
/// requests always fail. The authorization is still consulted, so a broken
/// authorization or an order mismatch is still refused.
pub struct ReadLock {
	readers: AtomicUsize,
}

/// A lock with a single slot and no reader/writer distinction.
///
/// Every acquisition is treated as exclusive, whatever was asked for. This
/// is faster than [`RwLock`] when concurrent reads are not worth anything.
pub struct WriteLock {
	state: Mutex<WriteState>,
	write_wait: Condvar,
}

struct WriteState {
	writer: bool,
	writers_waiting: usize,
}

/// A bare mutex that keeps no waiter accounting.
///
/// For authorization purposes it always reports itself busy and contended,
/// so a caller holding anything else will (at best) get a fast-failing try.
/// Containers guarded this way cannot take part in multi-container
/// sections.
pub struct DumbLock {
	raw: parking_lot::RawMutex,
}

/// A lock that is permanently broken: every operation fails.
///
/// Mostly a joke, but useful for pathological tests.
pub struct BrokenLock;

/// A lock wrapper that assigns an order for deadlock prevention.
///
/// The wrapped primitive behaves as usual, except that every authorization
/// consult carries this lock's order. Unordered authorizations (anything
/// but [`OrderedAuth`]) refuse non-zero orders, and an `OrderedLock` never
/// grants anything to the null authorization.
///
/// [`OrderedAuth`]: `crate::auth::OrderedAuth`
pub struct OrderedLock<L> {
	lock: L,
	order: Order,
}
