use std::sync::{mpsc, Barrier};
use std::thread;

use custody::Protected;

#[test]
fn ten_readers_hold_at_once() {
	let container = Protected::<i32>::new(7);
	let barrier = Barrier::new(10);
	let (tx, rx) = mpsc::channel();

	thread::scope(|scope| {
		for _ in 0..10 {
			let container = &container;
			let barrier = &barrier;
			let tx = tx.clone();
			scope.spawn(move || {
				let value = container.acquire_read(true);
				assert!(value.is_valid());
				assert_eq!(*value, 7);

				// all ten proxies are alive here at once
				barrier.wait();
				tx.send(value.last_lock_count()).unwrap();
			});
		}
	});
	drop(tx);

	let counts: Vec<usize> = rx.iter().collect();
	assert_eq!(counts.len(), 10);
	assert!(counts.iter().all(|count| (1..=10).contains(count)));
	assert!(counts.contains(&10));
}
