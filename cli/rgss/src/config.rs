//! `rgss.toml` parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rgss_core::Dialect;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "rgss.toml";

/// Optional project configuration. Command-line flags take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RgssConfig {
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Engine generation (`xp`, `vx` or `ace`).
    #[serde(default)]
    pub dialect: Option<Dialect>,
    /// Disable lossy normalisations.
    #[serde(default)]
    pub round_trip: Option<bool>,
    /// Maximum cells per `Table` row in documents.
    #[serde(default)]
    pub table_width: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// File-name fragments skipped by directory conversion. `{ext}` expands
    /// to the source extension, dot included.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
        }
    }
}

fn default_exclude() -> Vec<String> {
    vec!["Scripts{ext}".to_string(), "_doodads{ext}".to_string()]
}

impl DiscoveryConfig {
    /// Exclusion fragments with `{ext}` filled in.
    pub fn exclusions(&self, ext: &str) -> Vec<String> {
        self.exclude.iter().map(|e| e.replace("{ext}", ext)).collect()
    }
}

impl RgssConfig {
    /// Search upward from `start_dir` for `rgss.toml`, returning the parsed
    /// file and the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let config = Self::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing rgss.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = RgssConfig::from_str(
            r#"
[conversion]
dialect = "vx"
round_trip = true
table_width = 20

[discovery]
exclude = ["Scripts{ext}", "Backup"]
"#,
        )
        .unwrap();
        assert_eq!(config.conversion.dialect, Some(Dialect::Vx));
        assert_eq!(config.conversion.round_trip, Some(true));
        assert_eq!(config.conversion.table_width, Some(20));
        assert_eq!(
            config.discovery.exclusions(".rvdata"),
            vec!["Scripts.rvdata", "Backup"]
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = RgssConfig::from_str("").unwrap();
        assert!(config.conversion.dialect.is_none());
        assert_eq!(
            config.discovery.exclusions(".rxdata"),
            vec!["Scripts.rxdata", "_doodads.rxdata"]
        );
    }

    #[test]
    fn reject_unknown_dialect() {
        assert!(RgssConfig::from_str("[conversion]\ndialect = \"mv\"\n").is_err());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[conversion]\ndialect = \"ace\"\n").unwrap();
        let nested = dir.path().join("Data").join("Maps");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, found) = RgssConfig::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(config.conversion.dialect, Some(Dialect::Ace));
        assert_eq!(found, dir.path());
    }
}
