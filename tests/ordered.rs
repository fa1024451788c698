use std::sync::mpsc;
use std::thread;

use custody::auth::{OrderedAuth, RwAuth};
use custody::lock::{OrderedLock, RwLock};
use custody::Protected;

fn ordered_container(value: i32, order: u32) -> Protected<i32, OrderedLock<RwLock>> {
	Protected::with_lock(value, OrderedLock::new(RwLock::new(), order))
}

#[test]
fn ascending_acquisitions_are_granted() {
	let low = ordered_container(1, 1);
	let high = ordered_container(2, 2);
	let auth = OrderedAuth::<RwAuth>::new();

	let first = low.acquire_write_auth(&auth, true);
	let second = high.acquire_write_auth(&auth, true);
	assert!(first.is_valid());
	assert!(second.is_valid());
}

#[test]
fn contended_lower_order_is_refused() {
	let low = ordered_container(1, 1);
	let high = ordered_container(2, 2);

	let (hold_tx, hold_rx) = mpsc::channel();
	let (done_tx, done_rx) = mpsc::channel::<()>();

	thread::scope(|scope| {
		let low = &low;
		scope.spawn(move || {
			let auth = OrderedAuth::<RwAuth>::new();
			let held = low.acquire_read_auth(&auth, true);
			assert!(held.is_valid());
			hold_tx.send(()).unwrap();
			// keep the lower container busy until the main thread is done
			done_rx.recv().unwrap();
		});
		hold_rx.recv().unwrap();

		let auth = OrderedAuth::<RwAuth>::new();
		let high_held = high.acquire_write_auth(&auth, true);
		assert!(high_held.is_valid());

		// waiting for a busy lower order while holding a higher one would
		// invert the hierarchy
		let refused = low.acquire_write_auth(&auth, true);
		assert!(!refused.is_valid());

		done_tx.send(()).unwrap();
	});
}

#[test]
fn ordered_container_refuses_the_null_auth() {
	let container = ordered_container(1, 1);
	assert!(!container.acquire_read(true).is_valid());
	assert!(!container.acquire_write(false).is_valid());
}
