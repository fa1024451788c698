use std::cell::Cell;
use std::marker::PhantomData;

use super::{LockAuth, Order, ReadAuth, Request};

impl ReadAuth {
	/// Create an authorization holding nothing.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			reading: Cell::new(0),
			_marker: PhantomData,
		}
	}
}

impl LockAuth for ReadAuth {
	fn reading_count(&self) -> usize {
		self.reading.get()
	}

	fn would_allow(&self, shared: bool, _blocking: bool) -> bool {
		shared
	}

	fn record(&self, shared: bool, _order: Order) {
		debug_assert!(shared);
		self.reading.set(self.reading.get() + 1);
	}

	fn test(&self, request: &mut Request) -> bool {
		if !self.order_allowed(request.order) {
			return false;
		}
		if !request.shared {
			return false;
		}
		if self.reading.get() > 0 && request.lock_out {
			request.blocking = false;
		}
		true
	}

	fn release(&self, shared: bool, _order: Order) {
		debug_assert!(shared);
		debug_assert!(self.reading.get() > 0);
		self.reading.set(self.reading.get() - 1);
	}
}

impl Drop for ReadAuth {
	fn drop(&mut self) {
		debug_assert!(
			self.reading.get() == 0,
			"authorization dropped with live acquisitions"
		);
	}
}
