use std::sync::atomic::{AtomicUsize, Ordering};

use crate::auth::{LockAuth, Order, Request};

use super::{register_auth, release_auth, DefaultAuth, RawLock, ReadLock, Tracking};

impl ReadLock {
	/// Create a new lock with no readers.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			readers: AtomicUsize::new(0),
		}
	}
}

impl RawLock for ReadLock {
	fn readers(&self) -> usize {
		self.readers.load(Ordering::Acquire)
	}

	fn acquire_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
		tracking: Tracking,
	) -> Option<usize> {
		if !shared {
			return None;
		}
		let mut request = Request {
			shared,
			blocking,
			lock_out: false,
			must_block: false,
			order,
		};
		if !register_auth(auth, &mut request, tracking) {
			return None;
		}
		let count = self.readers.fetch_add(1, Ordering::Acquire) + 1;
		debug_assert!(count > 0);
		Some(count)
	}

	fn release_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		tracking: Tracking,
	) -> Option<usize> {
		if !shared {
			return None;
		}
		release_auth(auth, shared, order, tracking);
		let previous = self.readers.fetch_sub(1, Ordering::Release);
		debug_assert!(previous > 0);
		Some(previous - 1)
	}

	fn test_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
	) -> bool {
		if !shared {
			return false;
		}
		let mut request = Request {
			shared,
			blocking,
			lock_out: false,
			must_block: false,
			order,
		};
		match auth {
			None => order == 0,
			Some(auth) => auth.test(&mut request),
		}
	}
}

impl DefaultAuth for ReadLock {
	type Auth = crate::auth::ReadAuth;
}

impl Default for ReadLock {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for ReadLock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ReadLock")
			.field("readers", &self.readers())
			.finish()
	}
}
