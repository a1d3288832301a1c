// src/application/mod.rs
pub mod error;
pub mod services;

// Re-export key services for easier imports
pub use services::blocked_set_store::BlockedSetStore;
pub use services::tag_blocker::{Activation, SyncReport, TagBlocker};
