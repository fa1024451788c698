use super::{LockAuth, Order, OrderedAuth, Request};

impl<A: LockAuth + Default> OrderedAuth<A> {
	/// Create an ordered authorization over a default base authorization.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}

impl<A: LockAuth> OrderedAuth<A> {
	/// Create an ordered authorization over an existing base authorization.
	#[must_use]
	pub fn over(base: A) -> Self {
		Self {
			base,
			ordered: Default::default(),
			unordered: Default::default(),
		}
	}

	/// The highest order this authorization holds a lock for, if any.
	fn highest_order(&self) -> Option<Order> {
		self.ordered.borrow().iter().next_back().copied()
	}

	/// Does the order discipline forbid this request?
	///
	/// Only ordered requests against a busy target are constrained: the
	/// requested order must be strictly greater than every held order.
	fn order_blocked(&self, request: &Request) -> bool {
		request.order != 0
			&& request.must_block
			&& self.highest_order().is_some_and(|max| max >= request.order)
	}

	/// Is this request outside the order discipline?
	///
	/// Unordered requests always are, and holding any unordered lock puts
	/// ordered requests back under the base authorization's full rules.
	fn normal_rules(&self, request: &Request) -> bool {
		request.order == 0 || self.unordered.get() > 0
	}

	/// Evaluate `request`, routing between the base rules and the order
	/// discipline. Propagates the base's `blocking` downgrade.
	fn evaluate(&self, request: &mut Request) -> bool {
		if self.order_blocked(request) {
			return false;
		}
		let mut inner = Request {
			order: 0,
			..*request
		};
		let allowed = if self.normal_rules(request) {
			self.base.test(&mut inner)
		} else {
			// the discipline rules out wait-while-holding cycles, so the
			// contention fields are withheld from the base
			inner.lock_out = false;
			inner.must_block = false;
			self.base.test_ordered(&mut inner)
		};
		if !allowed {
			return false;
		}
		request.blocking = inner.blocking;
		true
	}

	fn track(&self, order: Order) {
		if order == 0 {
			self.unordered.set(self.unordered.get() + 1);
		} else {
			let inserted = self.ordered.borrow_mut().insert(order);
			debug_assert!(inserted, "duplicate hold on one ordered lock");
		}
	}

	fn untrack(&self, order: Order) {
		if order == 0 {
			debug_assert!(self.unordered.get() > 0);
			self.unordered.set(self.unordered.get() - 1);
		} else {
			let removed = self.ordered.borrow_mut().remove(&order);
			debug_assert!(removed, "released an ordered lock that was not held");
		}
	}
}

impl<A: LockAuth> LockAuth for OrderedAuth<A> {
	fn reading_count(&self) -> usize {
		self.base.reading_count()
	}

	fn writing_count(&self) -> usize {
		self.base.writing_count()
	}

	fn would_allow(&self, shared: bool, blocking: bool) -> bool {
		self.base.would_allow(shared, blocking)
	}

	fn register(&self, request: &mut Request) -> bool {
		if !self.evaluate(request) {
			return false;
		}
		self.record(request.shared, request.order);
		true
	}

	fn test(&self, request: &mut Request) -> bool {
		self.evaluate(request)
	}

	fn record(&self, shared: bool, order: Order) {
		// the base never sees orders; they are tracked here and stripped
		// again by `release`
		self.base.record(shared, 0);
		self.track(order);
	}

	fn release(&self, shared: bool, order: Order) {
		self.untrack(order);
		self.base.release(shared, 0);
	}

	fn order_allowed(&self, _order: Order) -> bool {
		true
	}

	fn note_meta(&self, held: bool) {
		self.base.note_meta(held);
	}

	fn meta_held(&self) -> bool {
		self.base.meta_held()
	}
}

impl<A> Drop for OrderedAuth<A> {
	fn drop(&mut self) {
		debug_assert!(
			self.unordered.get() == 0 && self.ordered.borrow().is_empty(),
			"authorization dropped with live acquisitions"
		);
	}
}
