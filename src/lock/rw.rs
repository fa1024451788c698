use parking_lot::{Condvar, Mutex};

use crate::auth::{LockAuth, Order, Request};

use super::{register_auth, release_auth, AuthId, DefaultAuth, RawLock, RwLock, RwState, Tracking};

impl RwLock {
	/// Create a new, unheld lock.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			state: Mutex::new(RwState {
				readers: 0,
				readers_waiting: 0,
				writer: false,
				writer_waiting: false,
				the_writer: None,
			}),
			read_wait: Condvar::new(),
			write_wait: Condvar::new(),
		}
	}
}

impl RwState {
	/// Does `auth` identify the authorization holding the write slot?
	fn writer_is(&self, auth: Option<&dyn LockAuth>) -> bool {
		match (auth, self.the_writer) {
			(Some(auth), Some(writer)) => AuthId::of(auth) == writer,
			_ => false,
		}
	}

	fn must_block(&self, shared: bool) -> bool {
		self.writer || self.writer_waiting || (!shared && self.readers > 0)
	}

	fn lock_out(&self) -> bool {
		self.writer_waiting || self.readers_waiting > 0
	}
}

impl RawLock for RwLock {
	fn readers(&self) -> usize {
		self.state.lock().readers
	}

	fn acquire_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
		tracking: Tracking,
	) -> Option<usize> {
		let mut state = self.state.lock();

		// the holder of the write slot may take additional read locks; for
		// that one case the lock presents itself as free
		let writer_reads = shared && state.writer_is(auth);
		let must_block = state.must_block(shared);

		let mut request = Request {
			shared,
			blocking,
			lock_out: !writer_reads && state.lock_out(),
			must_block: !writer_reads && must_block,
			order,
		};
		if !register_auth(auth, &mut request, tracking) {
			return None;
		}
		if !writer_reads && !request.blocking && must_block {
			release_auth(auth, shared, order, tracking);
			return None;
		}

		if shared {
			state.readers_waiting += 1;
			if !writer_reads {
				while state.writer || state.writer_waiting {
					self.read_wait.wait(&mut state);
				}
			}
			state.readers_waiting -= 1;
			state.readers += 1;
			debug_assert!(writer_reads || (!state.writer && !state.writer_waiting));
			Some(state.readers)
		} else {
			// only one writer lines up at a time; wait on `read_wait` to
			// become the queued writer, since that is what a write release
			// broadcasts on
			state.readers_waiting += 1;
			while state.writer_waiting {
				self.read_wait.wait(&mut state);
			}
			state.readers_waiting -= 1;
			state.writer_waiting = true;
			while state.writer || state.readers > 0 {
				self.write_wait.wait(&mut state);
			}
			state.writer_waiting = false;
			state.writer = true;
			state.the_writer = auth.map(AuthId::of);
			Some(0)
		}
	}

	fn release_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		tracking: Tracking,
	) -> Option<usize> {
		let mut state = self.state.lock();
		release_auth(auth, shared, order, tracking);

		if shared {
			debug_assert!(state.readers > 0 && (state.writer_is(auth) || !state.writer));
			state.readers -= 1;
			let remaining = state.readers;
			if remaining == 0 && state.writer_waiting {
				self.write_wait.notify_all();
			}
			Some(remaining)
		} else {
			debug_assert!(state.writer);
			debug_assert!(state.the_writer == auth.map(AuthId::of));
			state.writer = false;
			state.the_writer = None;
			if state.writer_waiting {
				self.write_wait.notify_all();
			}
			if state.readers_waiting > 0 {
				self.read_wait.notify_all();
			}
			Some(0)
		}
	}

	fn test_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
	) -> bool {
		let state = self.state.lock();

		let writer_reads = shared && state.writer_is(auth);
		let must_block = state.must_block(shared);

		let mut request = Request {
			shared,
			blocking,
			lock_out: !writer_reads && state.lock_out(),
			must_block: !writer_reads && must_block,
			order,
		};
		let allowed = match auth {
			None => order == 0,
			Some(auth) => auth.test(&mut request),
		};
		allowed && (writer_reads || request.blocking || !must_block)
	}
}

impl DefaultAuth for RwLock {
	type Auth = crate::auth::RwAuth;
}

impl Default for RwLock {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for RwLock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("RwLock")
			.field("readers", &state.readers)
			.field("writer", &state.writer)
			.finish_non_exhaustive()
	}
}
