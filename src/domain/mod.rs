pub mod command;
pub mod document;
pub mod error;
pub mod repositories;
pub mod services;
pub mod tag;
