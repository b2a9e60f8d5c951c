//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.coursereviews.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".coursereviews.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Engine settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Avatar resolution settings.
    #[serde(default)]
    pub avatars: AvatarConfig,

    /// Network reachability settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl GeneralConfig {
    /// Log level from verbosity settings. `--quiet` wins over `verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Review engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Pause before re-fetching on refresh, in milliseconds.
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// Name shown for reviews whose author cannot be resolved.
    #[serde(default = "default_anonymous_name")]
    pub anonymous_name: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            refresh_delay_ms: default_refresh_delay_ms(),
            anonymous_name: default_anonymous_name(),
        }
    }
}

fn default_refresh_delay_ms() -> u64 {
    500
}

fn default_anonymous_name() -> String {
    "Anonymous".to_string()
}

/// Avatar image settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// Directory (or URL prefix) holding avatar images.
    #[serde(default = "default_avatar_base")]
    pub base_path: String,

    /// Key used when a student's avatar is unknown.
    #[serde(default = "default_avatar_key")]
    pub default_avatar: String,

    /// Avatar keys that have an image.
    #[serde(default = "default_known_avatars")]
    pub known: Vec<String>,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            base_path: default_avatar_base(),
            default_avatar: default_avatar_key(),
            known: default_known_avatars(),
        }
    }
}

fn default_avatar_base() -> String {
    "avatars".to_string()
}

fn default_avatar_key() -> String {
    "default".to_string()
}

fn default_known_avatars() -> Vec<String> {
    vec!["blue", "green", "orange", "purple", "red", "yellow"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Network reachability settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// URL checked before refreshes. Empty means "assume reachable".
    #[serde(default)]
    pub check_url: String,

    /// Check timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            check_url: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include review comment text.
    #[serde(default = "default_true")]
    pub include_comments: bool,

    /// Include review dates.
    #[serde(default = "default_true")]
    pub include_dates: bool,

    /// Draw the rating histogram.
    #[serde(default = "default_true")]
    pub show_histogram: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_comments: true,
            include_dates: true,
            show_histogram: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(delay) = args.refresh_delay_ms {
            self.engine.refresh_delay_ms = delay;
        }

        if let Some(ref url) = args.check_url {
            self.network.check_url = url.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.refresh_delay_ms, 500);
        assert_eq!(config.engine.anonymous_name, "Anonymous");
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert!(config.avatars.known.contains(&"orange".to_string()));
        assert!(config.network.check_url.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
format = "json"

[engine]
refresh_delay_ms = 250

[avatars]
known = ["teal"]

[report]
show_histogram = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.engine.refresh_delay_ms, 250);
        assert_eq!(config.engine.anonymous_name, "Anonymous");
        assert_eq!(config.avatars.known, vec!["teal"]);
        assert_eq!(config.avatars.default_avatar, "default");
        assert!(!config.report.show_histogram);
        assert!(config.report.include_comments);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[avatars]"));
        assert!(toml_str.contains("[network]"));
    }

    #[test]
    fn test_load_written_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, Config::default_toml()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.engine.refresh_delay_ms, 500);
        assert_eq!(config.network.timeout_seconds, 5);
    }

    #[test]
    fn test_log_level() {
        let mut general = GeneralConfig::default();
        assert_eq!(general.log_level(false), tracing::Level::INFO);
        assert_eq!(general.log_level(true), tracing::Level::ERROR);

        general.verbose = true;
        assert_eq!(general.log_level(false), tracing::Level::DEBUG);
        assert_eq!(general.log_level(true), tracing::Level::ERROR);
    }

    #[test]
    fn test_verbose_from_file_or_flag() {
        let from_file: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert_eq!(from_file.general.log_level(false), tracing::Level::DEBUG);

        let mut config = Config::default();
        let mut args = make_args();
        args.verbose = true;
        config.merge_with_args(&args);
        assert_eq!(config.general.log_level(false), tracing::Level::DEBUG);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = make_args();
        args.format = Some(OutputFormat::Json);
        args.refresh_delay_ms = Some(0);

        config.merge_with_args(&args);

        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.engine.refresh_delay_ms, 0);
        assert!(config.network.check_url.is_empty());
    }
}
