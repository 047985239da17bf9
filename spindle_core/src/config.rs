use serde::Deserialize;
use std::path::Path;

use crate::random_source::DEFAULT_MAX_RECORD_LEN;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct DumpSettings {
    /// Payload bytes shown per record.
    #[serde(default = "default_preview_bytes")]
    pub preview_bytes: usize,
    /// Stop after this many records. 0 means no limit.
    #[serde(default)]
    pub max_records: usize,
    #[serde(default)]
    pub json: bool,
}

pub fn default_preview_bytes() -> usize {
    16
}

impl Default for DumpSettings {
    fn default() -> Self {
        Self {
            preview_bytes: default_preview_bytes(),
            max_records: 0,
            json: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct GenerateSettings {
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_max_record_len")]
    pub max_record_len: usize,
    #[serde(default = "default_budget")]
    pub budget: usize,
}

fn default_max_record_len() -> usize {
    DEFAULT_MAX_RECORD_LEN
}

pub fn default_budget() -> usize {
    65_536
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            max_record_len: default_max_record_len(),
            budget: default_budget(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SpindleConfig {
    #[serde(default)]
    pub dump: DumpSettings,
    #[serde(default)]
    pub generate: GenerateSettings,
}

impl SpindleConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
