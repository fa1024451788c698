use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::marker::PhantomData;

mod broken;
mod dumb;
mod ordered;
mod read;
mod rw;
mod write;

/// The order value of a lock.
///
/// An order of zero means the lock is unordered. A non-zero order places the
/// lock in an acquisition hierarchy: an [`OrderedAuth`] refuses to wait for a
/// lock whose order is not strictly greater than the highest order it
/// already holds a lock for.
pub type Order = u32;

/// A description of an attempted acquisition, passed from a lock to an
/// authorization.
///
/// The lock fills in the state-dependent fields (`lock_out`, `must_block`)
/// while holding its internal mutex. The authorization may refuse the
/// request, permit it, or downgrade `blocking` to `false`, forcing the lock
/// to treat the request as a non-blocking attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request {
	/// Is this a shared (read) acquisition?
	pub shared: bool,
	/// May the caller wait for the lock? Authorizations downgrade this.
	pub blocking: bool,
	/// Is some other party already waiting on the lock?
	pub lock_out: bool,
	/// Would this acquisition have to wait before being granted?
	pub must_block: bool,
	/// The order of the lock being acquired.
	pub order: Order,
}

/// Per-caller bookkeeping of held locks, and the grant/deny decision.
///
/// One authorization belongs to exactly one caller; it is `!Send` and
/// `!Sync`, and its counters are plain [`Cell`]s. Passing `None` where an
/// `Option<&dyn LockAuth>` is expected opts out of deadlock prevention: the
/// null authorization permits everything (except ordered locks, which
/// refuse it).
///
/// The counters always equal the number of live proxies the caller holds of
/// each kind; dropping an authorization with a non-zero count is a
/// programming error.
pub trait LockAuth {
	/// The number of shared acquisitions this authorization holds.
	fn reading_count(&self) -> usize {
		0
	}

	/// The number of exclusive acquisitions this authorization holds.
	fn writing_count(&self) -> usize {
		0
	}

	/// Predict whether an acquisition of the given kind could be granted.
	///
	/// This is observational and conservative: it knows nothing about the
	/// target lock, so it assumes the worst (another party waiting, the lock
	/// in use).
	fn would_allow(&self, shared: bool, blocking: bool) -> bool;

	/// Evaluate `request` and, if it is permitted, record the acquisition.
	///
	/// Returns `false` without changing any counts when the request is
	/// refused. May downgrade `request.blocking`.
	fn register(&self, request: &mut Request) -> bool {
		if !self.test(request) {
			return false;
		}
		self.record(request.shared, request.order);
		true
	}

	/// Evaluate `request` without recording anything.
	///
	/// Same verdict and `blocking` downgrade as [`register`], no count
	/// changes.
	///
	/// [`register`]: `LockAuth::register`
	fn test(&self, request: &mut Request) -> bool;

	/// Evaluate `request` when a lock-order discipline already rules out
	/// wait-while-holding cycles.
	///
	/// [`OrderedAuth`] consults this instead of [`test`] while the caller
	/// is respecting a strict lock order: the authorization only vetoes
	/// kinds it could never hold and keeps its held counts out of the
	/// decision.
	///
	/// [`test`]: `LockAuth::test`
	fn test_ordered(&self, request: &mut Request) -> bool {
		self.test(request)
	}

	/// Record an acquisition whose evaluation already happened.
	///
	/// The bookkeeping half of [`register`]; callers must have obtained a
	/// `true` verdict from [`test`] or [`test_ordered`] first, and must
	/// pass the same `order` to the matching [`release`].
	///
	/// [`register`]: `LockAuth::register`
	/// [`test`]: `LockAuth::test`
	/// [`test_ordered`]: `LockAuth::test_ordered`
	/// [`release`]: `LockAuth::release`
	fn record(&self, shared: bool, order: Order);

	/// Release one acquisition previously recorded by [`register`].
	///
	/// [`register`]: `LockAuth::register`
	fn release(&self, shared: bool, order: Order);

	/// May this authorization acquire a lock with the given order?
	fn order_allowed(&self, order: Order) -> bool {
		order == 0
	}

	/// Called by a meta-lock when this authorization gains or loses its
	/// exclusive hold on the gate.
	fn note_meta(&self, held: bool) {
		let _ = held;
	}

	/// Does this authorization currently hold a meta-lock exclusively?
	fn meta_held(&self) -> bool {
		false
	}
}

/// Authorization for [`RwLock`] containers.
///
/// The caller may hold multiple read locks, or a single write lock, but not
/// both. A new exclusive acquisition is refused while any lock is held; a
/// new shared acquisition is downgraded to non-blocking when another party
/// is already waiting on the target, or when the caller holds a write lock
/// and the target is busy. Holding a meta-lock exclusively suspends all of
/// these rules.
///
/// [`RwLock`]: `crate::lock::RwLock`
#[derive(Debug, Default)]
pub struct RwAuth {
	reading: Cell<usize>,
	writing: Cell<usize>,
	meta: Cell<bool>,
	_marker: PhantomData<*const ()>,
}

/// Authorization that never permits an exclusive acquisition.
///
/// Use this for callers that must only ever read. A shared acquisition is
/// downgraded to non-blocking when the caller already holds a read lock and
/// another party is waiting on the target.
#[derive(Debug, Default)]
pub struct ReadAuth {
	reading: Cell<usize>,
	_marker: PhantomData<*const ()>,
}

/// Authorization for [`WriteLock`] containers.
///
/// The caller holds at most one lock at a time, of any kind. While a lock is
/// held, further acquisitions are forced non-blocking, so a busy target
/// fails fast and an idle one is still granted.
///
/// [`WriteLock`]: `crate::lock::WriteLock`
#[derive(Debug, Default)]
pub struct WriteAuth {
	writing: Cell<usize>,
	meta: Cell<bool>,
	_marker: PhantomData<*const ()>,
}

/// Authorization for [`DumbLock`] containers: one lock at a time, no
/// exceptions.
///
/// Unlike [`WriteAuth`], it does not matter whether the target is idle; a
/// second acquisition is refused outright. Containers guarded this way
/// cannot take part in multi-container sections.
///
/// [`DumbLock`]: `crate::lock::DumbLock`
#[derive(Debug, Default)]
pub struct DumbAuth {
	writing: Cell<bool>,
	_marker: PhantomData<*const ()>,
}

/// Authorization that refuses every request. For testing pathological
/// cases.
#[derive(Debug, Default)]
pub struct BrokenAuth {
	_marker: PhantomData<*const ()>,
}

/// Authorization enforcing a strict lock order on top of a base
/// authorization.
///
/// Against unordered locks it behaves exactly like `A`. Against ordered
/// locks it refuses to wait for any lock whose order is not strictly
/// greater than the highest order it currently holds, which keeps the
/// acquisition graph acyclic. While it holds a lock on an unordered
/// container, deadlock prevention reverts to the base rules.
#[derive(Debug, Default)]
pub struct OrderedAuth<A> {
	base: A,
	ordered: RefCell<BTreeSet<Order>>,
	unordered: Cell<usize>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(shared: bool, blocking: bool, lock_out: bool, must_block: bool) -> Request {
		Request {
			shared,
			blocking,
			lock_out,
			must_block,
			order: 0,
		}
	}

	#[test]
	fn rw_allows_many_reads() {
		let auth = RwAuth::new();

		for count in 1..=4 {
			assert!(auth.register(&mut request(true, true, false, false)));
			assert_eq!(auth.reading_count(), count);
		}

		for _ in 0..4 {
			auth.release(true, 0);
		}
	}

	#[test]
	fn rw_denies_exclusive_while_holding() {
		let auth = RwAuth::new();
		assert!(auth.register(&mut request(true, true, false, false)));

		// even against an idle target
		assert!(!auth.register(&mut request(false, true, false, false)));
		assert_eq!(auth.writing_count(), 0);

		auth.release(true, 0);
		assert!(auth.register(&mut request(false, true, false, false)));
		auth.release(false, 0);
	}

	#[test]
	fn rw_downgrades_blocking_when_locked_out() {
		let auth = RwAuth::new();
		assert!(auth.register(&mut request(true, true, false, false)));

		let mut read = request(true, true, true, false);
		assert!(auth.register(&mut read));
		assert!(!read.blocking);

		auth.release(true, 0);
		auth.release(true, 0);
	}

	#[test]
	fn rw_holding_nothing_may_block() {
		let auth = RwAuth::new();

		let mut read = request(true, true, true, true);
		assert!(auth.test(&mut read));
		assert!(read.blocking);

		let mut write = request(false, true, true, true);
		assert!(auth.test(&mut write));
		assert!(write.blocking);
	}

	#[test]
	fn rw_meta_hold_suspends_the_rules() {
		let auth = RwAuth::new();
		assert!(auth.register(&mut request(false, true, false, false)));
		auth.note_meta(true);

		let mut write = request(false, true, true, true);
		assert!(auth.register(&mut write));
		assert!(write.blocking);

		auth.release(false, 0);
		auth.note_meta(false);
		auth.release(false, 0);
	}

	#[test]
	fn rw_test_is_pure() {
		let auth = RwAuth::new();
		assert!(auth.test(&mut request(true, true, false, false)));
		assert_eq!(auth.reading_count(), 0);
		assert_eq!(auth.writing_count(), 0);
	}

	#[test]
	fn read_auth_rejects_exclusive() {
		let auth = ReadAuth::new();
		assert!(!auth.register(&mut request(false, true, false, false)));
		assert!(!auth.register(&mut request(false, false, false, false)));
		assert!(auth.register(&mut request(true, true, false, false)));
		auth.release(true, 0);
	}

	#[test]
	fn write_auth_downgrades_second_lock() {
		let auth = WriteAuth::new();
		assert!(auth.register(&mut request(false, true, false, false)));

		// second lock on a busy target becomes a failed try
		let mut busy = request(false, true, false, true);
		assert!(auth.register(&mut busy));
		assert!(!busy.blocking);
		auth.release(false, 0);

		auth.release(false, 0);
	}

	#[test]
	fn dumb_auth_allows_exactly_one() {
		let auth = DumbAuth::new();
		assert!(auth.register(&mut request(false, true, false, false)));
		assert!(!auth.register(&mut request(true, true, false, false)));
		assert_eq!(auth.writing_count(), 1);
		auth.release(false, 0);
		assert!(auth.register(&mut request(true, false, false, false)));
		auth.release(true, 0);
	}

	#[test]
	fn broken_auth_refuses_everything() {
		let auth = BrokenAuth::new();
		assert!(!auth.register(&mut request(true, true, false, false)));
		assert!(!auth.test(&mut request(false, false, false, false)));
		assert!(!auth.would_allow(true, true));
	}

	#[test]
	fn would_allow_matches_held_state() {
		let auth = RwAuth::new();
		assert!(auth.would_allow(true, true));
		assert!(auth.would_allow(false, true));

		assert!(auth.register(&mut request(true, true, false, false)));
		assert!(auth.would_allow(true, true));
		assert!(!auth.would_allow(false, true));
		// a non-blocking write attempt is always worth trying
		assert!(auth.would_allow(false, false));
		auth.release(true, 0);
	}

	#[test]
	fn ordered_requires_strictly_increasing_orders() {
		let auth = OrderedAuth::<RwAuth>::new();

		let mut first = Request {
			order: 2,
			..request(true, true, false, false)
		};
		assert!(auth.register(&mut first));

		// an equal or lower order is refused when the target would block
		let mut equal = Request {
			order: 2,
			..request(true, true, false, true)
		};
		assert!(!auth.register(&mut equal));
		let mut lower = Request {
			order: 1,
			..request(true, true, false, true)
		};
		assert!(!auth.register(&mut lower));

		// an idle target is exempt from the order discipline
		let mut idle = Request {
			order: 1,
			..request(true, true, false, false)
		};
		assert!(auth.register(&mut idle));
		auth.release(true, 1);

		let mut higher = Request {
			order: 3,
			..request(true, true, false, true)
		};
		assert!(auth.register(&mut higher));
		assert!(higher.blocking);

		auth.release(true, 3);
		auth.release(true, 2);
	}

	#[test]
	fn ordered_reverts_to_base_rules_when_unordered() {
		let auth = OrderedAuth::<RwAuth>::new();
		assert!(auth.register(&mut request(true, true, false, false)));

		// holding an unordered lock, lock-out downgrades like the base auth
		let mut read = Request {
			order: 5,
			..request(true, true, true, false)
		};
		assert!(auth.register(&mut read));
		assert!(!read.blocking);

		auth.release(true, 5);
		auth.release(true, 0);
	}

	#[test]
	fn ordered_base_still_denies_exclusive_while_holding() {
		let auth = OrderedAuth::<RwAuth>::new();
		assert!(auth.register(&mut request(true, true, false, false)));
		assert!(!auth.register(&mut request(false, true, false, false)));
		auth.release(true, 0);
	}
}
