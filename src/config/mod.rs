//! Configuration for skymark.
//!
//! Read from `~/.config/skymark/config.toml` at startup. If the file doesn't
//! exist, a default configuration with comments is created. Missing fields
//! fall back to defaults.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bluesky: BlueskyConfig,
    pub bookmarker: BookmarkerConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlueskyConfig {
    /// XRPC service base URL.
    pub service: String,
    /// Handle or email used to sign in; also namespaces local state.
    pub identifier: String,
    /// App password.
    pub password: String,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service: "https://bsky.social".into(),
            identifier: String::new(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookmarkerConfig {
    /// Base URL of the bookmarking endpoint.
    pub endpoint: String,
    /// Hex-encoded shared secret for request signatures.
    pub secret_hex: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between delivery cycles.
    pub interval_secs: u64,
    /// Reply-tree depth requested when collecting an author's own thread.
    pub thread_depth: usize,
    /// Build payloads but deliver nothing.
    pub dry_run: bool,
    /// Write each fetched feed window to the data directory.
    pub dump_feed: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            thread_depth: 6,
            dry_run: false,
            dump_feed: false,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/skymark/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("skymark").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# skymark configuration
#
# The agent signs in to Bluesky with an app password, polls the account's
# liked posts, and forwards each new like to the bookmarking endpoint.

[bluesky]
# XRPC service base URL.
service = "https://bsky.social"
# Handle or email used to sign in (also namespaces local state).
identifier = ""
# App password (Settings -> Privacy and security -> App passwords).
password = ""

[bookmarker]
# Base URL of the bookmarking service.
endpoint = ""
# Hex-encoded shared secret used to sign requests.
secret_hex = ""

[poll]
# Seconds between delivery cycles. Each cycle refetches the whole liked
# feed, so keep this moderate for accounts with many likes.
interval_secs = 60
# Reply-tree depth requested when collecting an author's own thread.
thread_depth = 6
# Build payloads but deliver nothing.
dry_run = false
# Write each fetched feed window to the data directory as JSON.
dump_feed = false
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.bluesky.service, "https://bsky.social");
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.poll.thread_depth, 6);
        assert!(!config.poll.dry_run);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[bluesky]
identifier = "alice.bsky.social"

[poll]
interval_secs = 300
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        // Custom values
        assert_eq!(config.bluesky.identifier, "alice.bsky.social");
        assert_eq!(config.poll.interval_secs, 300);
        // Default values
        assert_eq!(config.bluesky.service, "https://bsky.social");
        assert_eq!(config.poll.thread_depth, 6);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");

        assert_eq!(config.bluesky.service, "https://bsky.social");
        assert!(config.bluesky.identifier.is_empty());
        assert_eq!(config.poll.interval_secs, 60);
    }
}
