use custody::{LockAuth, Protected};

#[test]
fn write_holder_reads_the_same_container() {
	let container = Protected::<String>::new(String::from("draft"));
	let auth = container.new_auth();

	let mut write = container.acquire_write_auth(&auth, true);
	assert!(write.is_valid());
	write.push_str(" v2");

	// the write-holding authorization may take a read lock on top
	let read = container.acquire_read_auth(&auth, true);
	assert!(read.is_valid());
	assert_eq!(read.last_lock_count(), 1);
	assert_eq!(*read, "draft v2");
	assert_eq!(auth.reading_count(), 1);
	assert_eq!(auth.writing_count(), 1);

	drop(read);
	write.push_str(" final");
	drop(write);

	assert_eq!(*container.acquire_read(true), "draft v2 final");
}

#[test]
fn only_the_write_holder_gets_the_exception() {
	let container = Protected::<i32>::new(0);
	let writer = container.new_auth();
	let other = container.new_auth();

	let held = container.acquire_write_auth(&writer, true);
	assert!(held.is_valid());

	// a different authorization cannot read past the writer
	assert!(!container.acquire_read_auth(&other, false).is_valid());
	// and neither can the null authorization
	assert!(!container.acquire_read(false).is_valid());
}

#[test]
fn reentrant_read_blocks_mutation_until_dropped() {
	let container = Protected::<i32>::new(41);
	let auth = container.new_auth();

	let mut write = container.acquire_write_auth(&auth, true);
	let read = container.acquire_read_auth(&auth, true);

	assert!(write.get_mut().is_none());
	assert_eq!(*read, 41);

	drop(read);
	*write += 1;
	drop(write);
	assert_eq!(*container.acquire_read(true), 42);
}
