//! Test doubles shared by unit tests (in `src/`) and behaviour tests (in
//! `tests/`).
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature. Doubles
//! keep their state behind `std::sync::Mutex` and panic on poisoning, which
//! only happens after another assertion already failed.

mod catalog;
mod pooler_host;
mod sleepers;
mod stores;

pub use catalog::InMemoryCatalogRepository;
pub use pooler_host::ScriptedPoolerHost;
pub use sleepers::{ImmediateSleeper, RecordingSleeper};
pub use stores::{InMemoryObjectStore, InMemorySecretStore};

fn lock<'a, T>(mutex: &'a std::sync::Mutex<T>, what: &str) -> std::sync::MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{what} mutex poisoned"),
    }
}
