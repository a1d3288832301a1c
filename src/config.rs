// src/config.rs
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tag::TagTextExtractor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, trace};

/// Texts of the injected affordances
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Labels {
    /// Label of the control appended to every tag (default: "Block")
    #[serde(default = "default_block_label")]
    pub block: String,

    /// Label of the control on every summary row (default: "Unblock")
    #[serde(default = "default_unblock_label")]
    pub unblock: String,

    /// Heading of the summary panel (default: "Blocked Tag")
    #[serde(default = "default_panel_title")]
    pub panel_title: String,
}

fn default_block_label() -> String {
    "Block".to_string()
}

fn default_unblock_label() -> String {
    "Unblock".to_string()
}

fn default_panel_title() -> String {
    "Blocked Tag".to_string()
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            block: default_block_label(),
            unblock: default_unblock_label(),
            panel_title: default_panel_title(),
        }
    }
}

/// Where things live on the host page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageLayout {
    /// Element watched for changes: a tag name, `#id` or `.class` (default: "body")
    #[serde(default = "default_container")]
    pub container: String,

    /// Tag name of a content item (default: "article")
    #[serde(default = "default_item_element")]
    pub item_element: String,

    /// Class of the element wrapping an item's tags (default: "post-tags")
    #[serde(default = "default_tag_container_class")]
    pub tag_container_class: String,

    /// Tag name of a single tag inside the wrapper (default: "a")
    #[serde(default = "default_tag_element")]
    pub tag_element: String,

    /// Class of section headings (default: "h3")
    #[serde(default = "default_heading_class")]
    pub heading_class: String,

    /// Text of the heading the summary panel is placed before (default: "Recents")
    #[serde(default = "default_anchor_heading")]
    pub anchor_heading: String,

    /// Id of the summary panel list (default: "blockedTagsList")
    #[serde(default = "default_panel_list_id")]
    pub panel_list_id: String,
}

fn default_container() -> String {
    "body".to_string()
}

fn default_item_element() -> String {
    "article".to_string()
}

fn default_tag_container_class() -> String {
    "post-tags".to_string()
}

fn default_tag_element() -> String {
    "a".to_string()
}

fn default_heading_class() -> String {
    "h3".to_string()
}

fn default_anchor_heading() -> String {
    "Recents".to_string()
}

fn default_panel_list_id() -> String {
    "blockedTagsList".to_string()
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            container: default_container(),
            item_element: default_item_element(),
            tag_container_class: default_tag_container_class(),
            tag_element: default_tag_element(),
            heading_class: default_heading_class(),
            anchor_heading: default_anchor_heading(),
            panel_list_id: default_panel_list_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Path of the local storage file
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Storage slot holding the blocked tags (default: "blockedTags")
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Host match patterns the engine may run on
    #[serde(default = "default_permitted_origins")]
    pub permitted_origins: Vec<String>,

    /// Upper bound of filter passes run for one burst of page changes
    #[serde(default = "default_max_settle_passes")]
    pub max_settle_passes: usize,

    #[serde(default)]
    pub labels: Labels,

    #[serde(default)]
    pub layout: PageLayout,
}

fn default_storage_path() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config/tagblock/storage.json")
        .to_string_lossy()
        .to_string()
}

fn default_storage_key() -> String {
    "blockedTags".to_string()
}

fn default_permitted_origins() -> Vec<String> {
    vec!["https://9gag.com/*".to_string()]
}

fn default_max_settle_passes() -> usize {
    8
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            storage_key: default_storage_key(),
            permitted_origins: default_permitted_origins(),
            max_settle_passes: default_max_settle_passes(),
            labels: Labels::default(),
            layout: PageLayout::default(),
        }
    }
}

impl Settings {
    /// Storage path with `~` and environment variables expanded
    pub fn expanded_storage_path(&self) -> PathBuf {
        match shellexpand::full(&self.storage_path) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                debug!("Cannot expand storage path '{}': {}", self.storage_path, e);
                PathBuf::from(&self.storage_path)
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config/tagblock/config.toml"))
}

/// Load settings: defaults, then a config file, then environment variables.
///
/// An explicitly given config file must exist and parse; the default location
/// is optional.
#[instrument(level = "debug")]
pub fn load_settings(config_path: Option<&Path>) -> DomainResult<Settings> {
    trace!("Loading settings");

    let mut settings = match config_path {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => Settings::default(),
        },
    };

    // Override with environment variables
    if let Ok(storage_path) = std::env::var("TAGBLOCK_STORAGE_PATH") {
        trace!("Using TAGBLOCK_STORAGE_PATH from environment: {}", storage_path);
        settings.storage_path = storage_path;
    }

    if let Ok(storage_key) = std::env::var("TAGBLOCK_STORAGE_KEY") {
        trace!("Using TAGBLOCK_STORAGE_KEY from environment: {}", storage_key);
        settings.storage_key = storage_key;
    }

    // a label the extractor cannot strip reliably is a configuration error
    TagTextExtractor::new(&settings.labels.block)?;

    trace!("Settings loaded: {:?}", settings);
    Ok(settings)
}

fn read_config_file(path: &Path) -> DomainResult<Settings> {
    trace!("Loading config from: {:?}", path);
    let config_text = std::fs::read_to_string(path).map_err(|e| {
        DomainError::Other(format!("Cannot read config {}: {}", path.display(), e))
    })?;
    toml::from_str::<Settings>(&config_text).map_err(|e| {
        DomainError::DeserializationError(format!("Invalid config {}: {}", path.display(), e))
    })
}

pub fn generate_default_config() -> String {
    let default_settings = Settings::default();
    toml::to_string_pretty(&default_settings)
        .unwrap_or_else(|_| "# Error generating default configuration".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::EnvGuard;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_config_file(content: &str) -> (TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).unwrap();
        (temp_dir, config_path)
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert!(settings.storage_path.ends_with("storage.json"));
        assert_eq!(settings.storage_key, "blockedTags");
        assert_eq!(settings.permitted_origins, vec!["https://9gag.com/*"]);
        assert_eq!(settings.labels.block, "Block");
        assert_eq!(settings.labels.unblock, "Unblock");
        assert_eq!(settings.layout.item_element, "article");
        assert_eq!(settings.layout.anchor_heading, "Recents");
        assert_eq!(settings.max_settle_passes, 8);
    }

    #[test]
    #[serial]
    fn test_config_file_loading_with_partial_sections() {
        let _guard = EnvGuard::new();
        env::remove_var("TAGBLOCK_STORAGE_PATH");
        env::remove_var("TAGBLOCK_STORAGE_KEY");

        let (temp_dir, config_path) = create_temp_config_file(
            r#"
            storage_path = "/config/file/storage.json"

            [labels]
            block = "Hide"

            [layout]
            anchor_heading = "Recent"
            "#,
        );

        let settings = load_settings(Some(&config_path)).unwrap();
        assert_eq!(settings.storage_path, "/config/file/storage.json");
        assert_eq!(settings.storage_key, "blockedTags");
        assert_eq!(settings.labels.block, "Hide");
        assert_eq!(settings.labels.unblock, "Unblock");
        assert_eq!(settings.layout.anchor_heading, "Recent");
        assert_eq!(settings.layout.tag_element, "a");

        drop(temp_dir);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_config_file() {
        let _guard = EnvGuard::new();
        env::set_var("TAGBLOCK_STORAGE_PATH", "/env/override.json");
        env::set_var("TAGBLOCK_STORAGE_KEY", "otherSlot");

        let (temp_dir, config_path) =
            create_temp_config_file(r#"storage_path = "/config/non-override.json""#);

        let settings = load_settings(Some(&config_path)).unwrap();
        assert_eq!(settings.storage_path, "/env/override.json");
        assert_eq!(settings.storage_key, "otherSlot");

        drop(temp_dir);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_config_is_an_error() {
        let _guard = EnvGuard::new();
        let result = load_settings(Some(Path::new("/does/not/exist/config.toml")));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_malformed_config_is_an_error() {
        let _guard = EnvGuard::new();
        let (temp_dir, config_path) = create_temp_config_file("storage_path = [");
        assert!(matches!(
            load_settings(Some(&config_path)),
            Err(DomainError::DeserializationError(_))
        ));
        drop(temp_dir);
    }

    #[test]
    #[serial]
    fn test_lower_case_block_label_is_an_error() {
        let _guard = EnvGuard::new();
        let (temp_dir, config_path) = create_temp_config_file(
            r#"
            [labels]
            block = "block"
            "#,
        );
        assert!(matches!(
            load_settings(Some(&config_path)),
            Err(DomainError::Other(_))
        ));
        drop(temp_dir);
    }

    #[test]
    fn test_generated_config_round_trips() {
        let text = generate_default_config();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.labels, Labels::default());
        assert_eq!(parsed.layout, PageLayout::default());
    }

    #[test]
    #[serial]
    fn test_storage_path_expansion() {
        let _guard = EnvGuard::new();
        let settings = Settings {
            storage_path: "~/tagblock/storage.json".to_string(),
            ..Settings::default()
        };
        let expanded = settings.expanded_storage_path();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("tagblock/storage.json"));
    }
}
