// src/infrastructure/permissions.rs
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::domain::error::DomainResult;
use crate::domain::repositories::storage::KeyValueStore;
use crate::domain::services::permission::{OriginPattern, PermissionGate};

pub const GRANTED_ORIGINS_KEY: &str = "grantedOrigins";

/// Permission gate backed by local storage.
///
/// Granted match patterns live as a JSON list in their own slot. `request`
/// stands for the user confirming the host's permission prompt, so it records
/// the grant.
#[derive(Debug)]
pub struct StoredPermissionGate {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl StoredPermissionGate {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            key: GRANTED_ORIGINS_KEY.to_string(),
        }
    }

    /// Currently granted patterns; unreadable entries are skipped
    pub fn granted(&self) -> DomainResult<Vec<OriginPattern>> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        let values: Vec<String> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!("Granted origins are malformed, treating as none: {}", e);
                return Ok(Vec::new());
            }
        };
        Ok(values
            .iter()
            .filter_map(|v| match v.parse::<OriginPattern>() {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Skipping stored origin: {}", e);
                    None
                }
            })
            .collect())
    }

    fn store(&self, patterns: &[OriginPattern]) -> DomainResult<()> {
        let values: Vec<&str> = patterns.iter().map(|p| p.as_str()).collect();
        self.storage.set(&self.key, &serde_json::to_string(&values)?)
    }
}

impl PermissionGate for StoredPermissionGate {
    fn contains(&self, origins: &[OriginPattern]) -> DomainResult<bool> {
        let granted = self.granted()?;
        Ok(origins
            .iter()
            .all(|o| granted.iter().any(|g| o.is_covered_by(g))))
    }

    #[instrument(skip(self), level = "debug")]
    fn request(&self, origins: &[OriginPattern]) -> DomainResult<bool> {
        let mut granted = self.granted()?;
        let before = granted.len();
        for origin in origins {
            if !granted.iter().any(|g| origin.is_covered_by(g)) {
                granted.push(origin.clone());
            }
        }
        if granted.len() != before {
            self.store(&granted)?;
            debug!("Granted {} new origins", granted.len() - before);
        }
        self.contains(origins)
    }

    #[instrument(skip(self), level = "debug")]
    fn revoke(&self, origins: &[OriginPattern]) -> DomainResult<bool> {
        let mut granted = self.granted()?;
        let before = granted.len();
        granted.retain(|g| !origins.contains(g));
        if granted.len() == before {
            return Ok(false);
        }
        self.store(&granted)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::storage::InMemoryStore;

    fn patterns(values: &[&str]) -> Vec<OriginPattern> {
        OriginPattern::parse_all(values).unwrap()
    }

    #[test]
    fn given_nothing_granted_when_contains_then_false() {
        let gate = StoredPermissionGate::new(Arc::new(InMemoryStore::new()));
        assert!(!gate.contains(&patterns(&["https://9gag.com/*"])).unwrap());
    }

    #[test]
    fn given_request_when_contains_then_true_and_persisted() {
        let storage = Arc::new(InMemoryStore::new());
        let gate = StoredPermissionGate::new(storage.clone());

        assert!(gate.request(&patterns(&["https://9gag.com/*"])).unwrap());
        assert!(gate.contains(&patterns(&["https://9gag.com/*"])).unwrap());

        let fresh = StoredPermissionGate::new(storage);
        assert!(fresh.contains(&patterns(&["https://9gag.com/*"])).unwrap());
    }

    #[test]
    fn given_broad_grant_when_request_narrow_then_nothing_new_stored() {
        let storage = Arc::new(InMemoryStore::new());
        let gate = StoredPermissionGate::new(storage.clone());
        gate.request(&patterns(&["*://*.9gag.com/*"])).unwrap();

        assert!(gate.request(&patterns(&["https://9gag.com/*"])).unwrap());
        assert_eq!(gate.granted().unwrap().len(), 1);
    }

    #[test]
    fn given_grant_when_revoke_then_no_longer_contained() {
        let gate = StoredPermissionGate::new(Arc::new(InMemoryStore::new()));
        let origins = patterns(&["https://9gag.com/*"]);
        gate.request(&origins).unwrap();

        assert!(gate.revoke(&origins).unwrap());
        assert!(!gate.revoke(&origins).unwrap());
        assert!(!gate.contains(&origins).unwrap());
    }

    #[test]
    fn given_malformed_slot_when_granted_then_empty() {
        let storage = Arc::new(InMemoryStore::with_value(GRANTED_ORIGINS_KEY, "{oops"));
        let gate = StoredPermissionGate::new(storage);
        assert!(gate.granted().unwrap().is_empty());
    }
}
