// src/domain/command.rs
use std::fmt;

use crate::domain::tag::BlockedTag;

/// A discrete user action against the blocked set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Block(BlockedTag),
    Unblock(BlockedTag),
}

impl Command {
    pub fn tag(&self) -> &BlockedTag {
        match self {
            Command::Block(tag) | Command::Unblock(tag) => tag,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Block(tag) => write!(f, "block '{}'", tag),
            Command::Unblock(tag) => write!(f, "unblock '{}'", tag),
        }
    }
}
