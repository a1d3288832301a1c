pub mod di;
pub mod dom;
pub mod permissions;
pub mod repositories;
