// src/infrastructure/repositories/storage/memory.rs
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::storage::KeyValueStore;

/// Process-local storage, used for tests and throwaway runs
#[derive(Debug, Default)]
pub struct InMemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one slot
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut slots) = store.slots.write() {
            slots.insert(key.to_string(), value.to_string());
        }
        store
    }
}

fn poisoned<E>(_: E) -> DomainError {
    DomainError::Storage("In-memory storage lock poisoned".to_string())
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let slots = self.slots.read().map_err(poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        let mut slots = self.slots.write().map_err(poisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> DomainResult<bool> {
        let mut slots = self.slots.write().map_err(poisoned)?;
        Ok(slots.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_empty_store_when_set_then_get_returns_value() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("blockedTags").unwrap(), None);

        store.set("blockedTags", "[\"memes\"]").unwrap();
        assert_eq!(
            store.get("blockedTags").unwrap().as_deref(),
            Some("[\"memes\"]")
        );
    }

    #[test]
    fn given_seeded_store_when_remove_then_slot_is_empty() {
        let store = InMemoryStore::with_value("k", "v");
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }
}
