//! Lock-owning containers with deadlock prevention.
//!
//! A [`Protected<T, L>`] owns a value and the lock guarding it; the only
//! path to the value is a proxy that holds a live acquisition for its whole
//! lifetime, so forgetting to lock (or to unlock) cannot be written. On
//! top of that, per-caller [authorization objects] track which locks a
//! caller already holds and refuse (or downgrade to non-blocking) any new
//! acquisition that could deadlock: the classic wait-while-holding cycles
//! are stopped at acquisition time.
//!
//! # Locks
//!
//! Five lock flavors share one contract ([`RawLock`]):
//!
//! - [`lock::RwLock`]: multiple readers or one writer, writer priority,
//!   and re-entrant reads for the write holder (the default)
//! - [`lock::ReadLock`]: readers only, never blocks
//! - [`lock::WriteLock`]: one holder, no reader/writer distinction
//! - [`lock::DumbLock`]: a bare mutex with no waiter accounting
//! - [`lock::BrokenLock`]: always fails, for pathological tests
//!
//! [`lock::OrderedLock`] wraps any of them with an order value for the
//! strict lock-order discipline enforced by [`auth::OrderedAuth`].
//!
//! # Acquiring
//!
//! Every acquisition is blocking or non-blocking, and returns a proxy that
//! may be *empty*, so always check [`is_valid`]:
//!
//! ```
//! use custody::Protected;
//!
//! let shared = Protected::<Vec<i32>>::new(vec![1, 2, 3]);
//!
//! let mut value = shared.acquire_write(true);
//! value.push(4);
//! drop(value);
//!
//! let value = shared.acquire_read(true);
//! assert!(value.is_valid());
//! assert_eq!(value.len(), 4);
//! ```
//!
//! # Deadlock prevention
//!
//! Create one authorization per thread (per lock-usage domain) with
//! [`Protected::new_auth`] and pass it to every acquisition. The
//! authorization refuses acquisitions that would let this caller wait
//! while other callers wait on locks it holds:
//!
//! ```
//! use std::thread;
//! use custody::Protected;
//!
//! let accounts = Protected::<i64>::new(100);
//! let audit_log = Protected::<Vec<String>>::new(Vec::new());
//!
//! thread::scope(|scope| {
//!     scope.spawn(|| {
//!         let auth = accounts.new_auth();
//!         let mut balance = accounts.acquire_write_auth(&auth, true);
//!         if balance.is_valid() {
//!             *balance -= 10;
//!         }
//!     });
//! });
//!
//! let auth = accounts.new_auth();
//! let balance = accounts.acquire_read_auth(&auth, true);
//! // a write elsewhere while holding a read lock would be refused, not
//! // deadlocked on
//! let log = audit_log.acquire_write_auth(&auth, true);
//! assert!(balance.is_valid());
//! assert!(!log.is_valid());
//! ```
//!
//! # Multi-container sections
//!
//! To hold several containers at once, route their acquisitions through a
//! [`MetaLock`] and take the gate exclusively when a multi-container
//! section is needed; see the [`MetaLock`] documentation.
//!
//! [`Protected<T, L>`]: `Protected`
//! [`is_valid`]: `WriteProxy::is_valid`
//! [authorization objects]: `auth::LockAuth`

pub mod auth;
pub mod lock;
pub mod meta;
pub mod protected;
pub mod proxy;

pub use auth::LockAuth;
pub use lock::{DefaultAuth, RawLock};
pub use meta::{MetaLock, MetaReadGuard, MetaWriteGuard};
pub use protected::{try_copy, try_copy_auth, try_copy_through, Protected};
pub use proxy::{ReadProxy, WriteProxy};
