use std::cell::Cell;
use std::marker::PhantomData;

use super::{LockAuth, Order, Request, RwAuth};

impl RwAuth {
	/// Create an authorization holding nothing.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			reading: Cell::new(0),
			writing: Cell::new(0),
			meta: Cell::new(false),
			_marker: PhantomData,
		}
	}
}

impl LockAuth for RwAuth {
	fn reading_count(&self) -> usize {
		self.reading.get()
	}

	fn writing_count(&self) -> usize {
		self.writing.get()
	}

	fn would_allow(&self, shared: bool, blocking: bool) -> bool {
		if self.meta.get() {
			return true;
		}
		if !blocking && !shared {
			return true;
		}
		if shared {
			self.writing.get() == 0
		} else {
			self.reading.get() == 0 && self.writing.get() == 0
		}
	}

	fn record(&self, shared: bool, _order: Order) {
		if shared {
			self.reading.set(self.reading.get() + 1);
		} else {
			self.writing.set(self.writing.get() + 1);
		}
	}

	fn test(&self, request: &mut Request) -> bool {
		if !self.order_allowed(request.order) {
			return false;
		}
		if self.meta.get() {
			return true;
		}
		if self.reading.get() > 0 || self.writing.get() > 0 {
			// waiting while holding is what deadlocks; a new exclusive
			// acquisition is refused, a shared one is forced non-blocking
			// whenever it could end up waiting on another caller
			if !request.shared {
				return false;
			}
			if request.lock_out {
				request.blocking = false;
			}
			if self.writing.get() > 0 && request.must_block {
				request.blocking = false;
			}
		}
		true
	}

	fn test_ordered(&self, _request: &mut Request) -> bool {
		// the order discipline makes waiting safe even while holding
		true
	}

	fn release(&self, shared: bool, _order: Order) {
		if shared {
			// the count may coexist with `writing` during a re-entrant read
			debug_assert!(self.reading.get() > 0);
			self.reading.set(self.reading.get() - 1);
		} else {
			debug_assert!(self.writing.get() > 0);
			self.writing.set(self.writing.get() - 1);
		}
	}

	fn note_meta(&self, held: bool) {
		self.meta.set(held);
	}

	fn meta_held(&self) -> bool {
		self.meta.get()
	}
}

impl Drop for RwAuth {
	fn drop(&mut self) {
		debug_assert!(
			self.reading.get() == 0 && self.writing.get() == 0 && !self.meta.get(),
			"authorization dropped with live acquisitions"
		);
	}
}
