use std::cell::Cell;
use std::marker::PhantomData;

use super::{LockAuth, Order, Request, WriteAuth};

impl WriteAuth {
	/// Create an authorization holding nothing.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			writing: Cell::new(0),
			meta: Cell::new(false),
			_marker: PhantomData,
		}
	}
}

impl LockAuth for WriteAuth {
	fn writing_count(&self) -> usize {
		self.writing.get()
	}

	fn would_allow(&self, _shared: bool, _blocking: bool) -> bool {
		self.meta.get() || self.writing.get() == 0
	}

	fn record(&self, _shared: bool, _order: Order) {
		// every acquisition counts as a write, whatever the caller asked for
		self.writing.set(self.writing.get() + 1);
	}

	fn test(&self, request: &mut Request) -> bool {
		if !self.order_allowed(request.order) {
			return false;
		}
		if self.meta.get() {
			return true;
		}
		if self.writing.get() > 0 && (request.lock_out || request.must_block) {
			request.blocking = false;
		}
		true
	}

	fn release(&self, _shared: bool, _order: Order) {
		debug_assert!(self.writing.get() > 0);
		self.writing.set(self.writing.get() - 1);
	}

	fn note_meta(&self, held: bool) {
		self.meta.set(held);
	}

	fn meta_held(&self) -> bool {
		self.meta.get()
	}
}

impl Drop for WriteAuth {
	fn drop(&mut self) {
		debug_assert!(
			self.writing.get() == 0 && !self.meta.get(),
			"authorization dropped with live acquisitions"
		);
	}
}
