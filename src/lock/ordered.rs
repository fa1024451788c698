use crate::auth::{LockAuth, Order, OrderedAuth};

use super::{DefaultAuth, OrderedLock, RawLock, Tracking};

impl<L> OrderedLock<L> {
	/// Wrap a lock with an order value.
	///
	/// An order of zero still refuses the null authorization, but places no
	/// constraint on ordered authorizations.
	#[must_use]
	pub const fn new(lock: L, order: Order) -> Self {
		Self { lock, order }
	}

	/// Consume the wrapper, returning the wrapped lock.
	#[must_use]
	pub fn into_inner(self) -> L {
		self.lock
	}
}

impl<L: RawLock> RawLock for OrderedLock<L> {
	fn order(&self) -> Order {
		self.order
	}

	fn readers(&self) -> usize {
		self.lock.readers()
	}

	fn acquire_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
		tracking: Tracking,
	) -> Option<usize> {
		auth?;
		self.lock.acquire_at(order, auth, shared, blocking, tracking)
	}

	fn release_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		tracking: Tracking,
	) -> Option<usize> {
		auth?;
		self.lock.release_at(order, auth, shared, tracking)
	}

	fn test_at(
		&self,
		order: Order,
		auth: Option<&dyn LockAuth>,
		shared: bool,
		blocking: bool,
	) -> bool {
		auth.is_some() && self.lock.test_at(order, auth, shared, blocking)
	}
}

impl<L: DefaultAuth> DefaultAuth for OrderedLock<L> {
	type Auth = OrderedAuth<L::Auth>;
}

impl<L: std::fmt::Debug> std::fmt::Debug for OrderedLock<L> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OrderedLock")
			.field("order", &self.order)
			.field("lock", &self.lock)
			.finish()
	}
}
