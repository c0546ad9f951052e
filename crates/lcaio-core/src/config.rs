//! Hybridizer configuration.
//!
//! Values come from `HybridizerConfig::default()`, from a JSON file
//! deserialized by the caller, or from `LCAIO_*` environment variables via
//! [`HybridizerConfig::from_env`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How intrasector rows are recognised during hybridization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectorMatching {
    /// Same sector name in any region, e.g. `(reg1, transport)` matches `(reg2, transport)`.
    #[default]
    SectorOnly,
    /// Only the exact region+sector label.
    RegionSector,
}

impl FromStr for SectorMatching {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sector" | "sector-only" | "sector_only" => Ok(SectorMatching::SectorOnly),
            "region-sector" | "region_sector" | "region+sector" => Ok(SectorMatching::RegionSector),
            other => Err(format!("unknown sector matching rule: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridizerConfig {
    /// Metadata columns forming process/stressor/impact labels; negatives count from the end.
    pub label_columns: Vec<isize>,
    /// Header of the numeric id column shifted by `increase_foreground_process_ids`.
    pub id_column: String,
    pub sector_matching: SectorMatching,
    /// Entries with magnitude at or below this count as zero in flow-loss checks.
    pub zero_tolerance: f64,
    /// Relative pivot magnitude below which `(I - A)` is reported singular.
    pub singularity_tolerance: f64,
    /// Log hybridization steps at `info` instead of `debug`.
    pub verbose: bool,
}

impl Default for HybridizerConfig {
    fn default() -> Self {
        Self {
            label_columns: vec![0, 1],
            id_column: "MATRIXID".to_string(),
            sector_matching: SectorMatching::SectorOnly,
            zero_tolerance: 0.0,
            singularity_tolerance: 1e-12,
            verbose: false,
        }
    }
}

fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn parse_columns(raw: &str) -> Option<Vec<isize>> {
    let columns = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<isize>().ok())
        .collect::<Option<Vec<_>>>()?;
    if columns.is_empty() {
        None
    } else {
        Some(columns)
    }
}

impl HybridizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration keyed by the given label columns, other fields default.
    pub fn with_label_columns(columns: impl Into<Vec<isize>>) -> Self {
        Self {
            label_columns: columns.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by any `LCAIO_*` variables that are set and parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(columns) = std::env::var("LCAIO_LABEL_COLUMNS")
            .ok()
            .and_then(|raw| parse_columns(&raw))
        {
            config.label_columns = columns;
        }
        if let Ok(id_column) = std::env::var("LCAIO_ID_COLUMN") {
            config.id_column = id_column;
        }
        if let Some(matching) = env_var("LCAIO_SECTOR_MATCHING") {
            config.sector_matching = matching;
        }
        if let Some(tol) = env_var("LCAIO_ZERO_TOLERANCE") {
            config.zero_tolerance = tol;
        }
        if let Some(tol) = env_var("LCAIO_SINGULARITY_TOLERANCE") {
            config.singularity_tolerance = tol;
        }
        if let Some(verbose) = env_bool("LCAIO_VERBOSE") {
            config.verbose = verbose;
        }
        config
    }
}
