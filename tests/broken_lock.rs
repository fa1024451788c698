use custody::auth::BrokenAuth;
use custody::lock::BrokenLock;
use custody::Protected;

#[test]
fn broken_container_grants_nothing_and_drops_cleanly() {
	let container = Protected::with_lock(5, BrokenLock);

	for _ in 0..3 {
		assert!(!container.acquire_write(true).is_valid());
		assert!(!container.acquire_read(true).is_valid());
		assert!(!container.acquire_write(false).is_valid());
	}

	let auth = container.new_auth();
	assert!(!container.acquire_read_auth(&auth, true).is_valid());

	// no acquisition ever succeeded, so dropping everything is clean
	drop(auth);
	drop(container);
}

#[test]
fn broken_auth_leaves_a_good_lock_untouched() {
	let container = Protected::<i32>::new(1);
	let auth = BrokenAuth::new();

	assert!(!container.acquire_read_auth(&auth, true).is_valid());
	assert!(!container.acquire_write_auth(&auth, false).is_valid());

	// the refusals changed no lock state
	let granted = container.acquire_write(false);
	assert!(granted.is_valid());
}
