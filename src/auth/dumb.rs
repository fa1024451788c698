use std::cell::Cell;
use std::marker::PhantomData;

use super::{DumbAuth, LockAuth, Order, Request};

impl DumbAuth {
	/// Create an authorization holding nothing.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			writing: Cell::new(false),
			_marker: PhantomData,
		}
	}
}

impl LockAuth for DumbAuth {
	fn writing_count(&self) -> usize {
		usize::from(self.writing.get())
	}

	fn would_allow(&self, _shared: bool, _blocking: bool) -> bool {
		!self.writing.get()
	}

	fn record(&self, _shared: bool, _order: Order) {
		debug_assert!(!self.writing.get());
		self.writing.set(true);
	}

	fn test(&self, request: &mut Request) -> bool {
		self.order_allowed(request.order) && !self.writing.get()
	}

	fn release(&self, _shared: bool, _order: Order) {
		debug_assert!(self.writing.get());
		self.writing.set(false);
	}
}

impl Drop for DumbAuth {
	fn drop(&mut self) {
		debug_assert!(
			!self.writing.get(),
			"authorization dropped with a live acquisition"
		);
	}
}
