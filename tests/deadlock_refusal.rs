use std::thread;
use std::time::Duration;

use custody::Protected;

#[test]
fn held_read_refuses_a_new_write() {
	let first = Protected::<i32>::new(1);
	let second = Protected::<i32>::new(2);
	let auth = first.new_auth();

	let held = first.acquire_read_auth(&auth, true);
	assert!(held.is_valid());

	thread::scope(|scope| {
		scope.spawn(|| {
			// a parallel writer queues up on the container we hold
			let value = first.acquire_write(true);
			assert!(value.is_valid());
		});
		thread::sleep(Duration::from_millis(100));

		// a blocking write elsewhere is refused outright, with no wait;
		// otherwise we could sit on `first` forever while its writer waits
		let refused = second.acquire_write_auth(&auth, true);
		assert!(!refused.is_valid());

		// and re-reading the contended container is downgraded to a try,
		// which fails because the writer is waiting
		let refused = first.acquire_read_auth(&auth, true);
		assert!(!refused.is_valid());

		drop(held);
	});

	// once nothing is held, the same authorization may write again
	let granted = second.acquire_write_auth(&auth, true);
	assert!(granted.is_valid());
}
