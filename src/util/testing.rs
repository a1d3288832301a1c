// src/util/testing.rs

use std::env;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::config::{PageLayout, Settings};
use crate::infrastructure::dom::HtmlDocument;
use crate::infrastructure::repositories::storage::InMemoryStore;

/// A feed page shaped like the target site: three articles (two tagged, one
/// without tags) and a sidebar with a "Recents" section.
pub const FEED_PAGE: &str = concat!(
    "<!DOCTYPE html><html><head><title>Feed</title></head><body>",
    "<div id=\"page\">",
    "<section id=\"list-view\">",
    "<article id=\"jx1\"><header><a href=\"/gag/jx1\">Title one</a></header>",
    "<div class=\"post-tags\"><a href=\"/tag/funny\">Funny</a>",
    "<a href=\"/tag/politics\">Politics</a></div></article>",
    "<article id=\"jx2\"><header><a href=\"/gag/jx2\">Title two</a></header>",
    "<div class=\"post-tags\"><a href=\"/tag/cats\">Cats</a></div></article>",
    "<article id=\"jx3\"><header><a href=\"/gag/jx3\">Title three</a></header>",
    "<p>No tags here</p></article>",
    "</section>",
    "<aside id=\"sidebar\">",
    "<section><header><div class=\"h3\">Popular</div></header><ul><li>hot</li></ul></section>",
    "<section><header><div class=\"h3\">Recents</div></header><ul><li>recent</li></ul></section>",
    "</aside>",
    "</div></body></html>"
);

/// One more article as delivered by infinite scrolling
pub const LAZY_ARTICLE: &str = concat!(
    "<article id=\"jx4\"><header><a href=\"/gag/jx4\">Title four</a></header>",
    "<div class=\"post-tags\"><a href=\"/tag/politics\">Politics</a>",
    "<a href=\"/tag/wtf\">WTF</a></div></article>"
);

pub fn feed_page() -> &'static str {
    FEED_PAGE
}

/// Freshly parsed `FEED_PAGE` with the default layout
pub fn feed_document() -> HtmlDocument {
    HtmlDocument::parse(FEED_PAGE, PageLayout::default())
}

/// Settings pointing at nothing on disk
pub fn test_settings() -> Settings {
    Settings {
        storage_path: "/dev/null/tagblock-test.json".to_string(),
        ..Settings::default()
    }
}

pub fn memory_storage() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

/// Global test configuration, initialized exactly once.
#[derive(Debug)]
pub struct TestEnv {
    pub settings: Settings,
}

static TEST_ENV: OnceLock<TestEnv> = OnceLock::new();

/// Initializes logging for tests exactly once and returns the shared test environment
pub fn init_test_env() -> &'static TestEnv {
    TEST_ENV.get_or_init(|| {
        setup_test_logging();
        info!("Test environment initialized");
        TestEnv {
            settings: test_settings(),
        }
    })
}

/// Logging setup only runs once; subsequent calls do nothing if `tracing` is already set.
fn setup_test_logging() {
    debug!("Attempting logger init from testing.rs");
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
        return;
    }

    let noisy_modules = ["html5ever", "markup5ever"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    subscriber.try_init().unwrap_or_else(|e| {
        eprintln!("Error: Failed to set up logging: {}", e);
    });
}

/// Restores the `TAGBLOCK_*` environment variables when dropped
#[derive(Debug, Clone)]
pub struct EnvGuard {
    storage_path: Option<String>,
    storage_key: Option<String>,
}

impl Default for EnvGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            storage_path: env::var("TAGBLOCK_STORAGE_PATH").ok(),
            storage_key: env::var("TAGBLOCK_STORAGE_KEY").ok(),
        }
    }
}

impl Drop for EnvGuard {
    #[instrument(level = "trace")]
    fn drop(&mut self) {
        env::remove_var("TAGBLOCK_STORAGE_PATH");
        env::remove_var("TAGBLOCK_STORAGE_KEY");
        if let Some(val) = &self.storage_path {
            env::set_var("TAGBLOCK_STORAGE_PATH", val);
        }
        if let Some(val) = &self.storage_key {
            env::set_var("TAGBLOCK_STORAGE_KEY", val);
        }
    }
}
