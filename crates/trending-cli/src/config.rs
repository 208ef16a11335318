// crates/trending-cli/src/config.rs
//
// Runtime configuration for the trending CLI.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    /// Directory holding the RocksDB trending store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Records fetched per page during ranked scans.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Log level used when `RUST_LOG` is unset: "trace" .. "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Item type used when a command omits `--item-type`.
    #[serde(default = "default_item_type")]
    pub default_item_type: String,
}

fn default_data_dir() -> String {
    "~/.trending/data".to_string()
}

fn default_page_size() -> usize {
    trending_store::DEFAULT_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_item_type() -> String {
    "post".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            page_size: default_page_size(),
            log_level: default_log_level(),
            default_item_type: default_item_type(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(expand_tilde(path))?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text; missing keys take their defaults.
    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: CliConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Path of the RocksDB database inside `data_dir`.
    pub fn db_path(&self) -> String {
        format!("{}/trending_rocksdb", expand_tilde(&self.data_dir))
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        assert_eq!(CliConfig::parse("").unwrap(), CliConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let config = CliConfig::parse("page_size = 25\ndefault_item_type = \"comment\"\n").unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.default_item_type, "comment");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.data_dir, "~/.trending/data");
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(CliConfig::parse("page_size = \"many\"").is_err());
    }

    #[test]
    fn test_db_path_for_absolute_dir() {
        let config = CliConfig {
            data_dir: "/var/lib/trending".into(),
            ..CliConfig::default()
        };
        assert_eq!(config.db_path(), "/var/lib/trending/trending_rocksdb");
    }

    #[test]
    fn test_expand_tilde_leaves_other_paths() {
        assert_eq!(expand_tilde("/tmp/x"), "/tmp/x");
        assert_eq!(expand_tilde("relative/~/x"), "relative/~/x");
    }
}
