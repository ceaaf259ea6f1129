//! Run configuration: YAML schema, defaults, and validation.
//!
//! A run is described by one YAML file with five sections: where the input
//! lives (`input`), which columns carry address parts (`columns`), how street
//! names are cleaned up (`address`), how the provider is queried (`search`),
//! and how the point layer is shaped (`output`). Everything except the input
//! path and the column roles has a default.

use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    data::CellKind,
    fields::{FieldOverride, SizingMode},
    geocode::SearchMode,
    street::Expansion,
};

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_DELAY_MS: u64 = 1200;
/// Public Nominatim bans clients that query more than once a second.
const COURTESY_DELAY_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroIndex { field: &'static str },
    #[error("min_row {min} is beyond max_row {max}")]
    EmptyRowWindow { min: u32, max: u32 },
    #[error("expansion pattern '{pattern}' does not compile: {source}")]
    BadExpansion {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("reject substrings must not be empty")]
    EmptyRejectSubstring,
    #[error("search endpoint must not be empty")]
    EmptyEndpoint,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub input: InputConfig,
    pub columns: ColumnRoles,
    #[serde(default)]
    pub address: AddressConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: Config = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Validating config file {path:?}"))?;
        if config.search.delay_ms < COURTESY_DELAY_MS {
            warn!(
                "Provider delay of {} ms is below the public Nominatim minimum of {} ms",
                config.search.delay_ms, COURTESY_DELAY_MS
            );
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, index) in [
            ("columns.street", Some(self.columns.street)),
            (
                "columns.secondary_place",
                Some(self.columns.secondary_place),
            ),
            ("columns.primary_place", Some(self.columns.primary_place)),
            ("columns.county", Some(self.columns.county)),
            ("columns.postal_code", self.columns.postal_code),
            ("columns.province", self.columns.province),
        ] {
            if index == Some(0) {
                return Err(ConfigError::ZeroIndex { field });
            }
        }
        if self.input.min_row == Some(0) {
            return Err(ConfigError::ZeroIndex {
                field: "input.min_row",
            });
        }
        if self.input.sample_row == Some(0) {
            return Err(ConfigError::ZeroIndex {
                field: "input.sample_row",
            });
        }
        if self.input.max_columns == Some(0) {
            return Err(ConfigError::ZeroIndex {
                field: "input.max_columns",
            });
        }
        if let Some(max) = self.input.max_row {
            let min = self.input.first_data_row();
            if min > max {
                return Err(ConfigError::EmptyRowWindow { min, max });
            }
        }
        if self
            .address
            .reject_substrings
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(ConfigError::EmptyRejectSubstring);
        }
        for rule in &self.address.expansions {
            Expansion::compile(&rule.pattern, &rule.replacement).map_err(|source| {
                ConfigError::BadExpansion {
                    pattern: rule.pattern.clone(),
                    source,
                }
            })?;
        }
        if self.search.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Input spreadsheet: `.xlsx`/`.xls`/`.ods` workbooks or delimited text.
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub has_header: bool,
    /// First data row (1-based). Defaults to 2 with a header row, 1 without.
    #[serde(default)]
    pub min_row: Option<u32>,
    /// Last data row (1-based, inclusive).
    #[serde(default)]
    pub max_row: Option<u32>,
    /// Number of columns carried into the point layer.
    #[serde(default)]
    pub max_columns: Option<usize>,
    /// Row whose cells type the attribute table. Defaults to the first data
    /// row.
    #[serde(default)]
    pub sample_row: Option<u32>,
}

impl InputConfig {
    pub fn first_data_row(&self) -> u32 {
        self.min_row.unwrap_or(if self.has_header { 2 } else { 1 })
    }

    pub fn effective_sample_row(&self) -> u32 {
        self.sample_row.unwrap_or_else(|| self.first_data_row())
    }
}

/// 1-based column positions of the address parts. `postal_code` and
/// `province` are accepted for completeness but take no part in assembly.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnRoles {
    pub street: usize,
    pub secondary_place: usize,
    pub primary_place: usize,
    pub county: usize,
    #[serde(default)]
    pub postal_code: Option<usize>,
    #[serde(default)]
    pub province: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AddressConfig {
    pub reject_substrings: Vec<String>,
    pub expansions: Vec<ExpansionRule>,
    pub strip_abbreviations: bool,
    pub number_first: bool,
    pub county_qualifier: String,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            reject_substrings: Vec::new(),
            expansions: Vec::new(),
            strip_abbreviations: false,
            number_first: true,
            county_qualifier: "powiat".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpansionRule {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SearchConfig {
    pub mode: SearchMode,
    pub delay_ms: u64,
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            delay_ms: DEFAULT_DELAY_MS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl SearchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    /// Parent directory for run directories. Defaults to the input's parent.
    pub dir: Option<PathBuf>,
    pub sizing: SizingMode,
    pub overrides: BTreeMap<CellKind, FieldOverride>,
}

fn default_true() -> bool {
    true
}
