//! Hybridization: filling truncated foreground processes with IO-sector
//! requirements.
//!
//! A [`HybridizationRecord`] names a foreground process, a background sector
//! and the price of one functional unit. The sector's technology column is
//! scaled by the price and written into the process's `A_hyb` column after
//! two corrections: rows of the same sector are zeroed (the process itself
//! stands in for that sector) and rows belonging to double-counted categories
//! are zeroed (the foreground already models those inputs).
//!
//! Every applied record leaves an entry in the [`HybridLedger`]. The ledger
//! makes repeated application a no-op and lets an overwrite recompute a
//! column from a clean baseline instead of accumulating.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lcaio_types::{IdentifierKind, Label, LabelIndex, LabeledMatrix, LcaioError, Result};

use crate::background::BackgroundModel;
use crate::config::{HybridizerConfig, SectorMatching};
use crate::foreground::ForegroundModel;

/// One hybridization request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridizationRecord {
    pub process: Label,
    pub sector: Label,
    /// Price of one functional unit of `process`, in the sector's monetary unit.
    pub price_per_fu: f64,
    /// Categories whose sectors the foreground already covers. `None` applies
    /// every registered category, an empty list applies none.
    #[serde(default)]
    pub double_counted: Option<Vec<String>>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub note: Option<String>,
    /// Report this record at `info` level even when the config is quiet.
    #[serde(default)]
    pub verbose: bool,
}

impl HybridizationRecord {
    pub fn new(process: impl Into<Label>, sector: impl Into<Label>, price_per_fu: f64) -> Self {
        Self {
            process: process.into(),
            sector: sector.into(),
            price_per_fu,
            double_counted: None,
            overwrite: false,
            note: None,
            verbose: false,
        }
    }

    pub fn with_double_counted<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.double_counted = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn is_verbose(&self, config: &HybridizerConfig) -> bool {
        self.verbose || config.verbose
    }
}

/// What a single record did to the model.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HybridizeOutcome {
    Applied,
    Replaced,
    Skipped,
}

/// Ledger entry for one (process, sector) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridEntry {
    pub price_per_fu: f64,
    pub categories: BTreeSet<String>,
    pub note: Option<String>,
    /// Nonzero `A_hyb` contributions, keyed by background sector.
    pub contribution: Vec<(Label, f64)>,
}

/// Applied hybridizations keyed by (process, sector).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridLedger {
    entries: BTreeMap<(Label, Label), HybridEntry>,
}

impl HybridLedger {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, process: &Label, sector: &Label) -> bool {
        self.entries.contains_key(&(process.clone(), sector.clone()))
    }

    pub fn get(&self, process: &Label, sector: &Label) -> Option<&HybridEntry> {
        self.entries.get(&(process.clone(), sector.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, &Label, &HybridEntry)> + '_ {
        self.entries.iter().map(|((p, s), e)| (p, s, e))
    }

    /// Distinct processes with at least one entry.
    pub fn processes(&self) -> impl Iterator<Item = &Label> + '_ {
        let mut seen = BTreeSet::new();
        self.entries
            .keys()
            .map(|(p, _)| p)
            .filter(move |p| seen.insert(*p))
    }

    pub(crate) fn insert(&mut self, process: Label, sector: Label, entry: HybridEntry) {
        self.entries.insert((process, sector), entry);
    }

    pub(crate) fn retain_processes(&mut self, keep: impl Fn(&Label) -> bool) {
        self.entries.retain(|(p, _), _| keep(p));
    }

    pub(crate) fn relabel_processes(&self, mapping: &HashMap<Label, Label>) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|((p, s), e)| {
                let p = mapping.get(p).cloned().unwrap_or_else(|| p.clone());
                ((p, s.clone()), e.clone())
            })
            .collect();
        Self { entries }
    }

    /// Union with `other`; the two ledgers never share a process after a
    /// successful collision check, so no entry is overwritten.
    pub(crate) fn merged(&self, other: &HybridLedger) -> Self {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { entries }
    }

    /// Sum of all contributions recorded for `process`.
    fn column_for(&self, process: &Label) -> Vec<(Label, f64)> {
        self.entries
            .iter()
            .filter(|((p, _), _)| p == process)
            .flat_map(|(_, e)| e.contribution.iter().cloned())
            .collect()
    }
}

fn is_intrasector(row: &Label, sector: &Label, matching: SectorMatching) -> bool {
    match matching {
        SectorMatching::RegionSector => row == sector,
        SectorMatching::SectorOnly => row.sector() == sector.sector(),
    }
}

/// Scaled and corrected sector column, as nonzero `(row, value)` pairs.
fn sector_contribution(
    background: &BackgroundModel,
    record: &HybridizationRecord,
    categories: &BTreeSet<String>,
    matching: SectorMatching,
) -> Result<Vec<(Label, f64)>> {
    let index = background.process_index();
    let column = background
        .io_sector_column(&record.sector)
        .ok_or_else(|| LcaioError::unknown(IdentifierKind::Sector, &record.sector))?;

    let mut excluded: BTreeSet<&str> = BTreeSet::new();
    for name in categories {
        let sectors = background
            .io_category(name)
            .ok_or_else(|| LcaioError::unknown(IdentifierKind::Category, name))?;
        excluded.extend(sectors.iter().map(String::as_str));
    }

    let contribution = index
        .iter()
        .zip(column.iter())
        .filter(|(row, _)| !is_intrasector(row, &record.sector, matching))
        .filter(|(row, _)| {
            !matches!(row.sector().and_then(|p| p.as_text()), Some(s) if excluded.contains(s))
        })
        .map(|(row, v)| (row.clone(), v * record.price_per_fu))
        .filter(|(_, v)| *v != 0.0)
        .collect();
    Ok(contribution)
}

impl ForegroundModel {
    /// Apply one record to `self` in place, without the final validation.
    fn apply_record(
        &mut self,
        background: &BackgroundModel,
        record: &HybridizationRecord,
        config: &HybridizerConfig,
    ) -> Result<HybridizeOutcome> {
        if !self.index.contains(&record.process) {
            return Err(LcaioError::unknown(IdentifierKind::Process, &record.process));
        }
        let existing = self.ledger.contains(&record.process, &record.sector);
        if existing && !record.overwrite {
            warn!(
                process = %record.process,
                sector = %record.sector,
                "hybridization already applied, skipping (set overwrite to recompute)"
            );
            return Ok(HybridizeOutcome::Skipped);
        }

        let categories: BTreeSet<String> = match &record.double_counted {
            Some(names) => names.iter().cloned().collect(),
            None => background.io_category_names().cloned().collect(),
        };
        let contribution =
            sector_contribution(background, record, &categories, config.sector_matching)?;

        if record.is_verbose(config) {
            info!(
                process = %record.process,
                sector = %record.sector,
                price = record.price_per_fu,
                rows = contribution.len(),
                "hybridizing process"
            );
        } else {
            debug!(
                process = %record.process,
                sector = %record.sector,
                price = record.price_per_fu,
                rows = contribution.len(),
                "hybridizing process"
            );
        }

        self.ledger.insert(
            record.process.clone(),
            record.sector.clone(),
            HybridEntry {
                price_per_fu: record.price_per_fu,
                categories,
                note: record.note.clone(),
                contribution,
            },
        );
        self.rebuild_hybrid_column(background.process_index(), &record.process, config)?;

        Ok(if existing {
            HybridizeOutcome::Replaced
        } else {
            HybridizeOutcome::Applied
        })
    }

    /// Recompute the `A_hyb` column of `process` from the ledger.
    fn rebuild_hybrid_column(
        &mut self,
        background_index: LabelIndex,
        process: &Label,
        config: &HybridizerConfig,
    ) -> Result<()> {
        let rows = self.a_hyb.row_index().union(&background_index);
        let mut a_hyb = self
            .a_hyb
            .reindex_rows(&rows, config.zero_tolerance)
            .map_err(|e| e.in_matrix("A_hyb"))?;
        for row in rows.iter() {
            a_hyb.set(row, process, 0.0)?;
        }
        for (row, value) in self.ledger.column_for(process) {
            let current = a_hyb.get(&row, process).unwrap_or(0.0);
            a_hyb.set(&row, process, current + value)?;
        }
        self.a_hyb = a_hyb;
        Ok(())
    }

    /// Hybridize one foreground process with one background sector.
    pub fn hybridize_process(
        &mut self,
        background: &BackgroundModel,
        record: &HybridizationRecord,
        config: &HybridizerConfig,
    ) -> Result<HybridizeOutcome> {
        let mut candidate = self.clone();
        let outcome = candidate.apply_record(background, record, config)?;
        if outcome != HybridizeOutcome::Skipped {
            self.commit(candidate)?;
        }
        Ok(outcome)
    }

    /// Apply `records` in order; on any failure the model is left unchanged.
    pub fn hybridize_multiple_processes(
        &mut self,
        background: &BackgroundModel,
        records: &[HybridizationRecord],
        config: &HybridizerConfig,
    ) -> Result<Vec<HybridizeOutcome>> {
        let mut candidate = self.clone();
        let outcomes = records
            .iter()
            .map(|r| candidate.apply_record(background, r, config))
            .collect::<Result<Vec<_>>>()?;
        self.commit(candidate)?;
        Ok(outcomes)
    }
}
