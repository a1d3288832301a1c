use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::blocked_set_store::BlockedSetStore;
use crate::application::services::tag_blocker::TagBlocker;
use crate::config::Settings;
use crate::domain::document::Document;
use crate::domain::repositories::storage::KeyValueStore;
use crate::domain::services::permission::{OriginPattern, PermissionGate};
use crate::infrastructure::permissions::StoredPermissionGate;
use crate::infrastructure::repositories::storage::JsonFileStore;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Production service container - single source of truth for service creation
pub struct ServiceContainer {
    pub storage: Arc<dyn KeyValueStore>,
    pub permission_gate: Arc<dyn PermissionGate>,
    pub permitted_origins: Vec<OriginPattern>,
    settings: Settings,
}

impl ServiceContainer {
    /// Create all services with explicit dependency injection
    pub fn new(config: &Settings) -> ApplicationResult<Self> {
        let storage = Self::create_storage(&config.expanded_storage_path())?;
        Self::with_storage(config, storage)
    }

    /// Wire the services around an existing store
    pub fn with_storage(
        config: &Settings,
        storage: Arc<dyn KeyValueStore>,
    ) -> ApplicationResult<Self> {
        let permitted_origins = OriginPattern::parse_all(&config.permitted_origins)
            .map_err(|e| ApplicationError::Domain(e).context("Invalid permitted_origins"))?;
        let permission_gate = Arc::new(StoredPermissionGate::new(storage.clone()));

        Ok(Self {
            storage,
            permission_gate,
            permitted_origins,
            settings: config.clone(),
        })
    }

    fn create_storage(path: &Path) -> ApplicationResult<Arc<dyn KeyValueStore>> {
        debug!("Using storage file {:?}", path);
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    ApplicationError::Other(format!(
                        "Cannot create storage directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(Arc::new(JsonFileStore::new(path)))
    }

    /// Blocked set as currently persisted
    pub fn blocked_set_store(&self) -> BlockedSetStore {
        BlockedSetStore::load(self.storage.clone(), &self.settings.storage_key)
    }

    /// Engine bound to `document` and the persisted blocked set
    pub fn tag_blocker<D: Document>(&self, document: D) -> ApplicationResult<TagBlocker<D>> {
        Ok(TagBlocker::new(
            document,
            self.blocked_set_store(),
            &self.settings,
        )?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("storage", &"Arc<dyn KeyValueStore>")
            .field("permission_gate", &"Arc<dyn PermissionGate>")
            .field("permitted_origins", &self.permitted_origins)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tag::BlockedTag;
    use crate::util::testing::{feed_document, memory_storage, test_settings};

    #[test]
    fn given_storage_file_in_missing_dir_when_new_then_dir_created() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut settings = test_settings();
        settings.storage_path = temp_dir
            .path()
            .join("nested/storage.json")
            .to_string_lossy()
            .to_string();

        let services = ServiceContainer::new(&settings).unwrap();
        let mut store = services.blocked_set_store();
        store.add(&BlockedTag::new("memes").unwrap()).unwrap();

        assert!(temp_dir.path().join("nested/storage.json").exists());
    }

    #[test]
    fn given_invalid_origin_when_with_storage_then_error() {
        let mut settings = test_settings();
        settings.permitted_origins = vec!["not a pattern".to_string()];

        let result = ServiceContainer::with_storage(&settings, memory_storage());
        assert!(result.is_err());
    }

    #[test]
    fn given_container_when_tag_blocker_then_shares_persisted_set() {
        let settings = test_settings();
        let services = ServiceContainer::with_storage(&settings, memory_storage()).unwrap();
        services
            .blocked_set_store()
            .add(&BlockedTag::new("cats").unwrap())
            .unwrap();

        let mut blocker = services.tag_blocker(feed_document()).unwrap();
        let report = blocker.initialize().unwrap();
        assert_eq!(report.filter.blocked, 1);
    }
}
