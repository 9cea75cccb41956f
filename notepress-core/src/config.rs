//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

/// Main configuration struct matching the notepress.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    pub site: SiteConfig,

    #[serde(default)]
    pub format: FormatConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub token: String,

    /// Note store workspace; assets are read from `<workspace>/data/assets`
    pub workspace: PathBuf,
}

fn default_api_url() -> String {
    String::from("http://127.0.0.1:6806")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_attribute")]
    pub attribute: String,

    #[serde(default = "default_value")]
    pub value: String,

    #[serde(default = "default_attribute_prefix")]
    pub attribute_prefix: String,

    #[serde(default)]
    pub on_fetch_failure: FetchFailurePolicy,
}

fn default_attribute() -> String {
    String::from("custom-publish")
}

fn default_value() -> String {
    String::from("1")
}

fn default_attribute_prefix() -> String {
    String::from("custom-sn-")
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            attribute: default_attribute(),
            value: default_value(),
            attribute_prefix: default_attribute_prefix(),
            on_fetch_failure: FetchFailurePolicy::default(),
        }
    }
}

/// What happens to an indirectly discovered note whose fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Mark it failed for the rest of the run; later references stay plain text
    #[default]
    Abandon,
    /// Leave it unseen so the next reference to it re-attempts the fetch
    Retry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Static site root (the directory holding `content/`)
    pub root: PathBuf,

    /// Content section; also the first path segment of every note link
    pub section: String,

    #[serde(default = "default_true")]
    pub clean: bool,

    /// Site generator executable run in `root` after emission
    #[serde(default)]
    pub generator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    #[serde(default = "default_true")]
    pub auto_space: bool,

    #[serde(default = "default_true")]
    pub fix_term_typo: bool,

    #[serde(default = "default_backlinks_heading")]
    pub backlinks_heading: String,
}

fn default_true() -> bool {
    true
}

fn default_backlinks_heading() -> String {
    String::from("Backlinks")
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            auto_space: true,
            fix_term_typo: true,
            backlinks_heading: default_backlinks_heading(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store.workspace.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("store.workspace".to_string()));
        }
        if self.site.root.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("site.root".to_string()));
        }
        let section = self.section();
        if section.is_empty() {
            return Err(ConfigError::MissingField("site.section".to_string()));
        }
        if section
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == ".." || part.contains('\\'))
        {
            return Err(ConfigError::InvalidField {
                field: "site.section".to_string(),
                reason: format!("{section:?} must be a relative path below content/"),
            });
        }
        Ok(())
    }

    /// Directory the referenced asset files are copied from
    pub fn assets_dir(&self) -> PathBuf {
        self.resolve_path(&self.store.workspace)
            .join("data")
            .join("assets")
    }

    /// Get the site root, resolved relative to config file
    pub fn site_root(&self) -> PathBuf {
        self.resolve_path(&self.site.root)
    }

    /// Section directory every note directory is written under
    pub fn content_dir(&self) -> PathBuf {
        self.site_root().join("content").join(self.section())
    }

    /// Section name without surrounding slashes
    pub fn section(&self) -> &str {
        self.site.section.trim().trim_matches('/')
    }

    /// Override the store credential (CLI flag / environment)
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.store.token = token.into();
        self
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}

/// Commented sample written by `notepress init`
pub const SAMPLE_CONFIG: &str = r#"# notepress configuration
store:
  api_url: "http://127.0.0.1:6806"
  # API token of the note store (or pass --token / NOTEPRESS_TOKEN)
  token: ""
  # Workspace directory; assets are read from <workspace>/data/assets
  workspace: "/path/to/workspace"

publish:
  # Documents carrying this attribute/value pair are published
  attribute: "custom-publish"
  value: "1"
  # Attributes with this prefix become front-matter entries
  attribute_prefix: "custom-sn-"
  # abandon | retry
  on_fetch_failure: abandon

site:
  root: "/path/to/blog"
  section: "notes"
  clean: true
  # generator: "hugo"

format:
  auto_space: true
  fix_term_typo: true
  backlinks_heading: "Backlinks"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
store:
  workspace: "ws"
site:
  root: "blog"
  section: "/notes/"
"#;

    #[test]
    fn test_default_values() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.store.api_url, "http://127.0.0.1:6806");
        assert_eq!(config.store.token, "");
        assert_eq!(config.publish.attribute, "custom-publish");
        assert_eq!(config.publish.value, "1");
        assert_eq!(config.publish.attribute_prefix, "custom-sn-");
        assert_eq!(config.publish.on_fetch_failure, FetchFailurePolicy::Abandon);
        assert!(config.site.clean);
        assert!(config.site.generator.is_none());
        assert!(config.format.auto_space);
        assert!(config.format.fix_term_typo);
        assert_eq!(config.format.backlinks_heading, "Backlinks");
    }

    #[test]
    fn test_section_and_paths() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.section(), "notes");
        assert_eq!(config.content_dir(), PathBuf::from("blog/content/notes"));
        assert_eq!(config.assets_dir(), PathBuf::from("ws/data/assets"));
    }

    #[test]
    fn test_paths_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notepress.yml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.site_root(), dir.path().join("blog"));
        assert_eq!(
            config.assets_dir(),
            dir.path().join("ws").join("data").join("assets")
        );
    }

    #[test]
    fn test_retry_policy() {
        let yaml = format!("{MINIMAL}publish:\n  on_fetch_failure: retry\n");
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.publish.on_fetch_failure, FetchFailurePolicy::Retry);
    }

    #[test]
    fn test_missing_section() {
        let yaml = r#"
store:
  workspace: "ws"
site:
  root: "blog"
  section: "/"
"#;
        match Config::from_yaml(yaml) {
            Err(ConfigError::MissingField(field)) => assert_eq!(field, "site.section"),
            other => panic!("Expected MissingField error, got {other:?}"),
        }
    }

    #[test]
    fn test_section_cannot_leave_content_dir() {
        for section in ["..", "./", "notes/../..", "a//b"] {
            let yaml = format!("store:\n  workspace: ws\nsite:\n  root: blog\n  section: \"{section}\"\n");
            match Config::from_yaml(&yaml) {
                Err(ConfigError::InvalidField { field, .. }) => assert_eq!(field, "site.section"),
                other => panic!("Expected InvalidField for {section:?}, got {other:?}"),
            }
        }

        let nested = "store:\n  workspace: ws\nsite:\n  root: blog\n  section: \"docs/notes\"\n";
        let config = Config::from_yaml(nested).unwrap();
        assert_eq!(config.content_dir(), PathBuf::from("blog/content/docs/notes"));
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::from_yaml(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.section(), "notes");
        let config = config.with_token("secret");
        assert_eq!(config.store.token, "secret");
    }
}
