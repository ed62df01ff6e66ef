//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wr_core::ClassifierConfig;
use wr_jira::ClientOptions;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Jira site base URL, e.g. `https://example.atlassian.net`.
    pub base_url: String,

    /// Account email used for basic auth.
    pub username: String,

    /// API token paired with the username.
    pub api_token: String,

    /// Project keys to report on. Empty means discover all accessible
    /// projects. Accepts a list or a comma-separated string, so it can be
    /// set from a single `WR_PROJECT_KEYS` environment variable.
    #[serde(deserialize_with = "project_keys_form")]
    pub project_keys: Vec<String>,

    /// Whether responses are cached on disk between runs.
    pub enable_cache: bool,

    /// Cache directory. Defaults to the platform cache dir.
    pub cache_dir: Option<PathBuf>,

    /// Cache entry lifetime in hours. Absent means entries never expire.
    pub cache_ttl_hours: Option<u64>,

    /// How many projects fetch concurrently.
    pub max_workers: usize,

    /// Overall fetch deadline in seconds. Absent means no deadline.
    pub fetch_timeout_secs: Option<u64>,

    /// Page size for issue and worklog pagination.
    pub page_size: u32,

    /// Custom field IDs checked for the work-type category, in priority
    /// order. Absent means the built-in defaults.
    pub category_fields: Option<Vec<String>>,

    /// Issue-type terms that classify an issue as maintenance.
    pub maintenance_types: Option<Vec<String>>,

    /// Label terms that classify an issue as maintenance.
    pub maintenance_labels: Option<Vec<String>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_token", &"[REDACTED]")
            .field("project_keys", &self.project_keys)
            .field("enable_cache", &self.enable_cache)
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl_hours", &self.cache_ttl_hours)
            .field("max_workers", &self.max_workers)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            api_token: String::new(),
            project_keys: Vec::new(),
            enable_cache: true,
            cache_dir: None,
            cache_ttl_hours: Some(24),
            max_workers: 8,
            fetch_timeout_secs: None,
            page_size: 100,
            category_fields: None,
            maintenance_types: None,
            maintenance_labels: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WR_*)
        figment = figment.merge(Env::prefixed("WR_"));

        figment.extract()
    }

    /// Cache directory, falling back to the platform default.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs_cache_path().unwrap_or_else(|| PathBuf::from(".wr-cache"))
        })
    }

    /// Cache entry lifetime, `None` meaning entries never expire.
    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_hours.map(|hours| Duration::from_secs(hours * 3600))
    }

    /// Overall fetch deadline.
    #[must_use]
    pub fn fetch_deadline(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    /// Classifier term sets, with config overrides applied over the
    /// defaults.
    #[must_use]
    pub fn classifier(&self) -> ClassifierConfig {
        let mut classifier = ClassifierConfig::default();
        if let Some(types) = &self.maintenance_types {
            classifier.maintenance_types.clone_from(types);
        }
        if let Some(labels) = &self.maintenance_labels {
            classifier.maintenance_labels.clone_from(labels);
        }
        classifier
    }

    /// Client tunables derived from this config.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions {
            classifier: self.classifier(),
            page_size: self.page_size,
            ..ClientOptions::default()
        };
        if let Some(fields) = &self.category_fields {
            options.category_fields.clone_from(fields);
        }
        options
    }
}

/// Deserializes the allowlist from either a sequence or a comma-separated
/// string (`WR_PROJECT_KEYS=ERP,CRM`).
fn project_keys_form<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Form;

    impl<'de> serde::de::Visitor<'de> for Form {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of project keys or a comma-separated string")
        }

        fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(value
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(String::from)
                .collect())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut keys = Vec::new();
            while let Some(key) = seq.next_element::<String>()? {
                keys.push(key);
            }
            Ok(keys)
        }
    }

    deserializer.deserialize_any(Form)
}

/// Returns the platform-specific config directory for wr.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wr"))
}

/// Returns the platform-specific cache directory for wr.
///
/// On Linux: `~/.cache/wr`
pub fn dirs_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("wr"))
}
