// src/domain/tag.rs
use std::fmt;

use regex::Regex;

use crate::domain::error::{DomainError, DomainResult};

/// A single blocked tag as a value object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockedTag {
    value: String,
}

impl BlockedTag {
    /// Creates a new BlockedTag, normalizing case and surrounding whitespace
    pub fn new<S: AsRef<str>>(value: S) -> DomainResult<Self> {
        let value = value.as_ref().trim().to_lowercase();

        if value.is_empty() {
            return Err(DomainError::InvalidTag("Tag cannot be empty".to_string()));
        }

        Ok(Self { value })
    }

    /// Get the tag value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Parse a list of raw values, dropping empties and duplicates while keeping first-seen order
    pub fn parse_list<I, S>(values: I) -> Vec<BlockedTag>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result: Vec<BlockedTag> = Vec::new();
        for tag in values.into_iter().filter_map(|v| BlockedTag::new(v).ok()) {
            if !result.contains(&tag) {
                result.push(tag);
            }
        }
        result
    }
}

impl fmt::Display for BlockedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Derives the canonical tag identifier from the rendered text of a tag element.
///
/// The rendered text may already carry the label of an injected control (the
/// control lives inside the tag element), so one trailing occurrence of the
/// label is stripped before trimming and lower-casing.
///
/// Matching of the label is case-sensitive and the label must contain an
/// upper-case letter (the default `Block`). Normalized text is lower-case, so
/// it never ends in such a label and extraction stays idempotent.
#[derive(Debug, Clone)]
pub struct TagTextExtractor {
    trailing_label: Regex,
}

impl TagTextExtractor {
    pub fn new(control_label: &str) -> DomainResult<Self> {
        if !control_label.chars().any(char::is_uppercase) {
            return Err(DomainError::Other(format!(
                "Block label '{}' needs an upper-case letter",
                control_label
            )));
        }
        let pattern = format!("{}$", regex::escape(control_label));
        let trailing_label = Regex::new(&pattern)
            .map_err(|e| DomainError::Other(format!("Invalid control label pattern: {}", e)))?;
        Ok(Self { trailing_label })
    }

    /// Normalized tag text; empty means "no usable tag text"
    pub fn extract(&self, raw: &str) -> String {
        self.trailing_label
            .replace(raw, "")
            .trim()
            .to_lowercase()
    }

    /// Like `extract`, but yields `None` for text that can never match
    pub fn extract_tag(&self, raw: &str) -> Option<BlockedTag> {
        BlockedTag::new(self.extract(raw)).ok()
    }
}
