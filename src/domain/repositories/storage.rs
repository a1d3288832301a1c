// src/domain/repositories/storage.rs
use crate::domain::error::DomainResult;

/*
   Local key-value storage
   Mirrors a browser's local storage: string keys mapped to string values.
   Every call is synchronous; `set` returns only after the value is durable,
   so a fresh `get` (even from another instance) observes it.
*/
pub trait KeyValueStore: std::fmt::Debug + Send + Sync {
    /// Value stored under `key`, `None` when the slot is empty
    fn get(&self, key: &str) -> DomainResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> DomainResult<()>;

    /// Empty the slot; returns whether a value was present
    fn remove(&self, key: &str) -> DomainResult<bool>;
}
