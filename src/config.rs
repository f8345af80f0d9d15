// Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub formatters: FormattersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattersConfig {
    /// Formatter added when none is configured
    #[serde(default = "default_formatter")]
    pub default: String,

    /// Adapt formatters that use the legacy interface instead of skipping them
    #[serde(default)]
    pub legacy_formatters: bool,

    /// Directories searched for formatter manifests
    #[serde(default)]
    pub load_path: Vec<PathBuf>,

    /// Report the slowest examples at the end of the run
    #[serde(default)]
    pub profile_examples: bool,

    /// Enable colored output
    #[serde(default = "default_color")]
    pub color: bool,

    /// Where deprecation warnings go: "stdout", "stderr" or a path
    #[serde(default = "default_deprecation_output")]
    pub deprecation_output: String,

    /// Formatters to add, in order
    #[serde(default)]
    pub format: Vec<FormatConfig>,
}

impl Default for FormattersConfig {
    fn default() -> Self {
        Self {
            default: default_formatter(),
            legacy_formatters: false,
            load_path: Vec::new(),
            profile_examples: false,
            color: default_color(),
            deprecation_output: default_deprecation_output(),
            format: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatConfig {
    /// Short code or qualified type name
    pub name: String,

    /// Output path; stdout when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

// Default values
pub const ENV_TESTFMT_LOAD_PATH: &str = "TESTFMT_LOAD_PATH";

pub fn default_formatter() -> String {
    String::from(crate::loader::DEFAULT_FORMATTER)
}

fn default_color() -> bool {
    true
}

pub fn default_deprecation_output() -> String {
    String::from("stderr")
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 1. .testfmtrc (current directory)
        // 2. ~/.testfmtrc (home directory)
        // 3. .testfmtrc.toml (current directory)
        // 4. ~/.testfmtrc.toml (home directory)

        let cwd = std::env::current_dir().ok()?;
        let home = dirs::home_dir()?;

        let paths = [
            cwd.join(".testfmtrc"),
            home.join(".testfmtrc"),
            cwd.join(".testfmtrc.toml"),
            home.join(".testfmtrc.toml"),
        ];

        paths
            .iter()
            .find(|path| path.exists())
            .and_then(|path| Self::load_from_file(path))
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let config = Self::parse(&content);
        if config.is_none() {
            warn!("Ignoring invalid configuration file {}", path.display());
        }
        config
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Option<Self> {
        match toml::from_str(content) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Failed to parse configuration: {}", e);
                None
            }
        }
    }

    /// Load path from the config file plus `TESTFMT_LOAD_PATH`
    pub fn load_path(&self) -> Vec<PathBuf> {
        let mut paths = self.formatters.load_path.clone();
        if let Some(extra) = std::env::var_os(ENV_TESTFMT_LOAD_PATH) {
            paths.extend(std::env::split_paths(&extra));
        }
        paths
    }

    /// Generate default configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[formatters]
default = "doc"
legacy_formatters = true
load_path = ["formatters", "vendor/formatters"]
profile_examples = true
color = false
deprecation_output = "reports/deprecations.txt"

[[formatters.format]]
name = "progress"

[[formatters.format]]
name = "Acme::DotsFormatter"
output = "reports/dots.txt"
"#;

        let config = Config::parse(toml).expect("Failed to parse config");
        let formatters = &config.formatters;
        assert_eq!(formatters.default, "doc");
        assert!(formatters.legacy_formatters);
        assert_eq!(formatters.load_path.len(), 2);
        assert!(formatters.profile_examples);
        assert!(!formatters.color);
        assert_eq!(formatters.deprecation_output, "reports/deprecations.txt");
        assert_eq!(
            formatters.format,
            vec![
                FormatConfig {
                    name: "progress".to_string(),
                    output: None,
                },
                FormatConfig {
                    name: "Acme::DotsFormatter".to_string(),
                    output: Some("reports/dots.txt".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_invalid_config_is_ignored() {
        assert!(Config::parse("[formatters]\ncolor = \"maybe\"").is_none());
    }
}
