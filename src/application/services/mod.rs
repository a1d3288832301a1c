// src/application/services/mod.rs
pub mod blocked_set_store;
pub mod change_watcher;
pub mod control_injector;
pub mod tag_blocker;
pub mod visibility_filter;
