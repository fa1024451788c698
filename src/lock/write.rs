use parking_lot::{Condvar, Mutex};

use crate::auth::{LockAuth, Order, Request};

use super::{register_auth, release_auth, DefaultAuth, RawLock, Tracking, WriteLock, WriteState};

impl WriteLock {
	/// Create a new, unheld lock.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			state: Mutex::new(WriteState {
				writer: false,
				writers_waiting: 0,
			}),
			write_wait: Condvar::new(),
		}
	}
}

impl RawLock for WriteLock {
	fn acquire_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		_shared: bool,
		blocking: bool,
		tracking: Tracking,
	) -> Option<usize> {
		let mut state = self.state.lock();

		// there is no shared access here; the authorization is told the
		// truth, so that it counts this as a write even for a read proxy
		let mut request = Request {
			shared: false,
			blocking,
			lock_out: state.writers_waiting > 0,
			must_block: state.writer,
			order,
		};
		if !register_auth(auth, &mut request, tracking) {
			return None;
		}
		if !request.blocking && state.writer {
			release_auth(auth, false, order, tracking);
			return None;
		}

		state.writers_waiting += 1;
		while state.writer {
			self.write_wait.wait(&mut state);
		}
		state.writers_waiting -= 1;
		state.writer = true;
		Some(0)
	}

	fn release_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		_shared: bool,
		tracking: Tracking,
	) -> Option<usize> {
		let mut state = self.state.lock();
		release_auth(auth, false, order, tracking);
		debug_assert!(state.writer);
		state.writer = false;
		if state.writers_waiting > 0 {
			self.write_wait.notify_all();
		}
		Some(0)
	}

	fn test_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		_shared: bool,
		blocking: bool,
	) -> bool {
		let state = self.state.lock();
		let mut request = Request {
			shared: false,
			blocking,
			lock_out: state.writers_waiting > 0,
			must_block: state.writer,
			order,
		};
		let allowed = match auth {
			None => order == 0,
			Some(auth) => auth.test(&mut request),
		};
		allowed && (request.blocking || !state.writer)
	}
}

impl DefaultAuth for WriteLock {
	type Auth = crate::auth::WriteAuth;
}

impl Default for WriteLock {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for WriteLock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("WriteLock")
			.field("writer", &state.writer)
			.finish_non_exhaustive()
	}
}
