use crate::auth::{LockAuth, Order};

use super::{BrokenLock, DefaultAuth, RawLock, Tracking};

impl RawLock for BrokenLock {
	fn acquire_at(
		&self,
		_order: Order,
		_auth: Option<&dyn LockAuth>,
		_shared: bool,
		_blocking: bool,
		_tracking: Tracking,
	) -> Option<usize> {
		None
	}

	fn release_at(
		&self,
		_order: Order,
		_auth: Option<&dyn LockAuth>,
		_shared: bool,
		_tracking: Tracking,
	) -> Option<usize> {
		None
	}

	fn test_at(
		&self,
		_order: Order,
		_auth: Option<&dyn LockAuth>,
		_shared: bool,
		_blocking: bool,
	) -> bool {
		false
	}
}

impl DefaultAuth for BrokenLock {
	type Auth = crate::auth::BrokenAuth;
}

impl std::fmt::Debug for BrokenLock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("BrokenLock")
	}
}
