// src/application/services/blocked_set_store.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::domain::command::Command;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::storage::KeyValueStore;
use crate::domain::tag::BlockedTag;

/// Owns the set of blocked tags and keeps its storage slot in step.
///
/// The slot holds a JSON list of tag strings. Every mutation is written back
/// before the call returns; when the write fails the mutation is undone, so
/// memory and storage never disagree.
#[derive(Debug)]
pub struct BlockedSetStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    tags: Vec<BlockedTag>,
}

impl BlockedSetStore {
    /// Reads the slot. Missing or malformed data yields an empty set.
    #[instrument(skip(storage), level = "debug")]
    pub fn load(storage: Arc<dyn KeyValueStore>, key: &str) -> Self {
        let tags = read_slot(storage.as_ref(), key);
        debug!("Loaded {} blocked tags", tags.len());
        Self {
            storage,
            key: key.to_string(),
            tags,
        }
    }

    /// Re-reads the slot, discarding the in-memory copy
    pub fn reload(&mut self) {
        self.tags = read_slot(self.storage.as_ref(), &self.key);
    }

    /// Inserts `tag`; returns whether the set changed
    #[instrument(skip(self), level = "debug", fields(tag = %tag))]
    pub fn add(&mut self, tag: &BlockedTag) -> DomainResult<bool> {
        if self.contains(tag) {
            debug!("Tag '{}' already blocked", tag);
            return Ok(false);
        }

        self.tags.push(tag.clone());
        if let Err(e) = self.persist() {
            self.tags.pop();
            return Err(e);
        }
        info!("Tag '{}' added to the blocked tags list", tag);
        Ok(true)
    }

    /// Deletes `tag`; returns whether the set changed
    #[instrument(skip(self), level = "debug", fields(tag = %tag))]
    pub fn remove(&mut self, tag: &BlockedTag) -> DomainResult<bool> {
        let Some(index) = self.tags.iter().position(|t| t == tag) else {
            debug!("Tag '{}' is not blocked", tag);
            return Ok(false);
        };

        let removed = self.tags.remove(index);
        if let Err(e) = self.persist() {
            self.tags.insert(index, removed);
            return Err(e);
        }
        info!("Tag '{}' removed from the blocked tags list", tag);
        Ok(true)
    }

    /// Applies a block or unblock command; returns whether the set changed
    pub fn execute(&mut self, command: &Command) -> DomainResult<bool> {
        match command {
            Command::Block(tag) => self.add(tag),
            Command::Unblock(tag) => self.remove(tag),
        }
    }

    /// Empties the set; returns whether it held anything
    #[instrument(skip(self), level = "debug")]
    pub fn clear(&mut self) -> DomainResult<bool> {
        if self.tags.is_empty() {
            return Ok(false);
        }

        let previous = std::mem::take(&mut self.tags);
        if let Err(e) = self.persist() {
            self.tags = previous;
            return Err(e);
        }
        info!("Cleared {} blocked tags", previous.len());
        Ok(true)
    }

    pub fn contains(&self, tag: &BlockedTag) -> bool {
        self.tags.contains(tag)
    }

    /// Membership test on already normalized text
    pub fn contains_value(&self, value: &str) -> bool {
        !value.is_empty() && self.tags.iter().any(|t| t.value() == value)
    }

    /// Snapshot in insertion order
    pub fn all(&self) -> Vec<BlockedTag> {
        self.tags.clone()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn persist(&self) -> DomainResult<()> {
        let values: Vec<&str> = self.tags.iter().map(|t| t.value()).collect();
        let json = serde_json::to_string(&values)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;
        self.storage
            .set(&self.key, &json)
            .map_err(|e| e.context("Failed to persist blocked tags"))
    }
}

fn read_slot(storage: &dyn KeyValueStore, key: &str) -> Vec<BlockedTag> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Cannot read blocked tags, starting empty: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Option<Vec<String>>>(&raw) {
        Ok(values) => BlockedTag::parse_list(values.unwrap_or_default()),
        Err(e) => {
            warn!("Stored blocked tags are malformed, starting empty: {}", e);
            Vec::new()
        }
    }
}
