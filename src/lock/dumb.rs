use lock_api::RawMutex as _;

use crate::auth::{LockAuth, Order, Request};

use super::{register_auth, release_auth, DefaultAuth, DumbLock, RawLock, Tracking};

impl DumbLock {
	/// Create a new, unheld lock.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			raw: parking_lot::RawMutex::INIT,
		}
	}
}

impl RawLock for DumbLock {
	fn acquire_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		_shared: bool,
		blocking: bool,
		tracking: Tracking,
	) -> Option<usize> {
		// no waiter accounting: assume the worst for the authorization
		let mut request = Request {
			shared: false,
			blocking,
			lock_out: true,
			must_block: true,
			order,
		};
		if !register_auth(auth, &mut request, tracking) {
			return None;
		}
		let locked = if request.blocking {
			self.raw.lock();
			true
		} else {
			self.raw.try_lock()
		};
		if !locked {
			release_auth(auth, false, order, tracking);
			return None;
		}
		Some(0)
	}

	fn release_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		_shared: bool,
		tracking: Tracking,
	) -> Option<usize> {
		release_auth(auth, false, order, tracking);
		debug_assert!(self.raw.is_locked());
		// safety: releasing is only reachable from a granted acquisition
		unsafe { self.raw.unlock() };
		Some(0)
	}

	fn test_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		_shared: bool,
		blocking: bool,
	) -> bool {
		let mut request = Request {
			shared: false,
			blocking,
			lock_out: true,
			must_block: true,
			order,
		};
		let allowed = match auth {
			None => order == 0,
			Some(auth) => auth.test(&mut request),
		};
		allowed && (request.blocking || !self.raw.is_locked())
	}
}

impl DefaultAuth for DumbLock {
	type Auth = crate::auth::DumbAuth;
}

impl Default for DumbLock {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for DumbLock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DumbLock")
			.field("locked", &self.raw.is_locked())
			.finish()
	}
}
