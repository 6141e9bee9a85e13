//! Configuration management for tailmd.
//!
//! Parses `tailmd.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `diagrams.kroki_url`
//!
//! ## Example
//!
//! ```toml
//! [render]
//! math = true
//! tables = true
//! class_prefix = "md-"
//!
//! [stream]
//! cursor = "▋"
//!
//! [diagrams]
//! kroki_url = "${KROKI_URL:-https://kroki.io}"
//! cache_capacity = 256
//! ```

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override math rendering flag.
    pub math: Option<bool>,
    /// Override syntax highlighting flag.
    pub highlight: Option<bool>,
    /// Override table recognition flag.
    pub tables: Option<bool>,
    /// Override sanitizer flag.
    pub sanitize: Option<bool>,
    /// Override streaming cursor marker.
    pub cursor: Option<String>,
    /// Override CSS class prefix.
    pub class_prefix: Option<String>,
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tailmd.toml";

/// Default number of rendered diagrams kept in the shared cache.
const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Default HTTP timeout for diagram requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rendering feature flags.
    pub render: RenderConfig,
    /// Streaming session configuration.
    pub stream: StreamConfig,
    /// Diagram rendering configuration (optional section).
    /// When present, `kroki_url` is required.
    diagrams: Option<DiagramsConfigRaw>,

    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Rendering feature flags.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenderConfig {
    /// Recognize `$$` blocks and `$…$` spans.
    pub math: bool,
    /// Colorize fenced code.
    pub highlight: bool,
    /// Render diagram fences through the diagram service.
    pub diagrams: bool,
    /// Recognize pipe tables.
    pub tables: bool,
    /// Strikethrough and task list checkboxes.
    pub gfm: bool,
    /// `^sup^` spans.
    pub superscript: bool,
    /// `==mark==` spans.
    pub mark: bool,
    /// Run the allowlist sanitizer over the final HTML.
    pub sanitize: bool,
    /// Prefix for every CSS hook class the renderer emits.
    pub class_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            math: true,
            highlight: true,
            diagrams: true,
            tables: true,
            gfm: true,
            superscript: false,
            mark: false,
            sanitize: true,
            class_prefix: "md-".to_owned(),
        }
    }
}

/// Streaming session configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Render in streaming mode (cursor marker, inline math deferred).
    pub enabled: bool,
    /// Cursor marker appended while streaming. Empty disables the marker.
    pub cursor: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cursor: "▋".to_owned(),
        }
    }
}

/// Raw diagrams configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    kroki_url: Option<String>,
    cache_capacity: Option<usize>,
    timeout_secs: Option<u64>,
}

/// Resolved diagram rendering configuration.
#[derive(Debug, Clone)]
pub struct DiagramsConfig {
    /// Kroki server URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Maximum number of rendered diagrams kept in memory.
    pub cache_capacity: usize,
    /// HTTP timeout for a single diagram request.
    pub timeout: Duration,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            kroki_url: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.kroki_url`").
        field: String,
        /// Error message (e.g., "${`KROKI_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tailmd.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.resolve()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(math) = settings.math {
            self.render.math = math;
        }
        if let Some(highlight) = settings.highlight {
            self.render.highlight = highlight;
        }
        if let Some(tables) = settings.tables {
            self.render.tables = tables;
        }
        if let Some(sanitize) = settings.sanitize {
            self.render.sanitize = sanitize;
        }
        if let Some(cursor) = &settings.cursor {
            self.stream.cursor.clone_from(cursor);
        }
        if let Some(class_prefix) = &settings.class_prefix {
            self.render.class_prefix.clone_from(class_prefix);
        }
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams_resolved.kroki_url = Some(kroki_url.clone());
        }
    }

    /// Whether diagram fences should be sent to the diagram service.
    #[must_use]
    pub fn diagrams_enabled(&self) -> bool {
        self.render.diagrams && self.diagrams_resolved.kroki_url.is_some()
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_render()?;
        self.validate_diagrams()?;
        Ok(())
    }

    /// The prefix is pasted into `class` attributes, so it must not be able to
    /// break out of the attribute value.
    fn validate_render(&self) -> Result<(), ConfigError> {
        let prefix = &self.render.class_prefix;
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Validation(
                "render.class_prefix may only contain ASCII letters, digits, '-' and '_'"
                    .to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        const MAX_CACHE_CAPACITY: usize = 100_000;

        if let Some(ref kroki_url) = self.diagrams_resolved.kroki_url {
            require_non_empty(kroki_url, "diagrams.kroki_url")?;
            require_http_url(kroki_url, "diagrams.kroki_url")?;
        }

        if self.diagrams_resolved.cache_capacity > MAX_CACHE_CAPACITY {
            return Err(ConfigError::Validation(format!(
                "diagrams.cache_capacity cannot exceed {MAX_CACHE_CAPACITY}"
            )));
        }
        if self.diagrams_resolved.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref mut diagrams) = self.diagrams
            && let Some(ref url) = diagrams.kroki_url
        {
            diagrams.kroki_url = Some(expand::expand_env(url, "diagrams.kroki_url")?);
        }
        Ok(())
    }

    /// Resolve raw sections into their final form.
    ///
    /// Validates that `kroki_url` is provided when `[diagrams]` section exists.
    fn resolve(&mut self) -> Result<(), ConfigError> {
        self.diagrams_resolved = match &self.diagrams {
            Some(diagrams) => {
                let kroki_url = diagrams.kroki_url.clone().ok_or_else(|| {
                    ConfigError::Validation(
                        "[diagrams] section requires kroki_url to be set".to_owned(),
                    )
                })?;
                DiagramsConfig {
                    kroki_url: Some(kroki_url.trim_end_matches('/').to_owned()),
                    cache_capacity: diagrams.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
                    timeout: Duration::from_secs(
                        diagrams.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                    ),
                }
            }
            None => DiagramsConfig::default(),
        };
        Ok(())
    }
}
