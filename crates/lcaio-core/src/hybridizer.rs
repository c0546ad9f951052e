//! `InventoryHybridizer`: one foreground, one background, one configuration.
//!
//! This is the entry point most callers want. It forwards to the model
//! operations with the configured tolerances and label rules, and exposes
//! the combined matrices for inspection.

use tracing::info;

use lcaio_types::{Label, LabelIndex, LabeledMatrix, LabeledVector, Result};

use crate::background::{BackgroundModel, IoBackground};
use crate::bundle::{self, MatDict, DEFAULT_HEADER};
use crate::config::HybridizerConfig;
use crate::foreground::ForegroundModel;
use crate::hybridize::{HybridizationRecord, HybridizeOutcome};
use crate::io_source::IoSource;
use crate::lifecycle::{self, CombinedSystem, LifecycleResults, Quantity};

#[derive(Debug, Clone)]
pub struct InventoryHybridizer {
    config: HybridizerConfig,
    foreground: ForegroundModel,
    background: BackgroundModel,
}

impl Default for InventoryHybridizer {
    fn default() -> Self {
        Self::new(HybridizerConfig::default())
    }
}

impl InventoryHybridizer {
    pub fn new(config: HybridizerConfig) -> Self {
        let header = DEFAULT_HEADER.iter().map(|h| h.to_string()).collect();
        Self {
            foreground: ForegroundModel::empty(config.label_columns.clone(), header),
            background: BackgroundModel::new(),
            config,
        }
    }

    pub fn config(&self) -> &HybridizerConfig {
        &self.config
    }

    pub fn foreground(&self) -> &ForegroundModel {
        &self.foreground
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    /// Replace the generic background with the one described by `dict`.
    pub fn extract_background_from_matdict(&mut self, dict: &MatDict) -> Result<()> {
        let generic = bundle::extract_background(dict, &self.config)?;
        self.background.set_generic(generic)
    }

    /// Replace the foreground with the one described by `dict`.
    pub fn extract_foreground_from_matdict(&mut self, dict: &MatDict) -> Result<()> {
        self.foreground = bundle::extract_foreground(dict, &self.config, Some(&self.background))?;
        Ok(())
    }

    /// Load an IO table as the IO part of the background.
    pub fn extract_io_background<S: IoSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        let io = IoBackground::from_source(source, self.config.zero_tolerance)?;
        info!(sectors = io.sector_index().len(), "loaded IO background");
        self.background.set_io(io)
    }

    pub fn set_io_category<I, S>(&mut self, name: impl Into<String>, sectors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.background.set_io_category(name, sectors);
    }

    pub fn match_foreground_to_background(&mut self) -> Result<()> {
        self.foreground
            .match_foreground_to_background(&self.background, self.config.zero_tolerance)
    }

    pub fn append_to_foreground(&mut self, other: &ForegroundModel, final_demand: bool) -> Result<()> {
        self.foreground.append_to_foreground(other, final_demand)
    }

    pub fn delete_processes_foreground(&mut self, ids: &[Label]) -> Result<()> {
        self.foreground.delete_processes_foreground(ids)
    }

    pub fn increase_foreground_process_ids(&mut self, offset: i64) -> Result<()> {
        self.foreground
            .increase_foreground_process_ids(offset, &self.config.id_column)
    }

    pub fn hybridize_process(&mut self, record: &HybridizationRecord) -> Result<HybridizeOutcome> {
        self.foreground
            .hybridize_process(&self.background, record, &self.config)
    }

    pub fn hybridize_multiple_processes(
        &mut self,
        records: &[HybridizationRecord],
    ) -> Result<Vec<HybridizeOutcome>> {
        self.foreground
            .hybridize_multiple_processes(&self.background, records, &self.config)
    }

    pub fn calc_lifecycle(&self, quantity: Quantity) -> Result<LabeledVector> {
        lifecycle::calc_lifecycle(&self.foreground, &self.background, quantity, &self.config)
    }

    pub fn calc_all(&self) -> Result<LifecycleResults> {
        lifecycle::calc_all(&self.foreground, &self.background, &self.config)
    }

    fn combined(&self) -> Result<CombinedSystem> {
        CombinedSystem::assemble(&self.foreground, &self.background, self.config.zero_tolerance)
    }

    /// Combined technology matrix `A`.
    pub fn technology_matrix(&self) -> Result<LabeledMatrix> {
        Ok(self.combined()?.technology().clone())
    }

    /// Combined stressor matrix `F`.
    pub fn stressor_matrix(&self) -> Result<LabeledMatrix> {
        Ok(self.combined()?.stressors().clone())
    }

    /// Characterization matrix over the full stressor index.
    pub fn characterization_matrix(&self) -> Result<Option<LabeledMatrix>> {
        self.background.characterization()
    }

    /// Foreground then background process labels.
    pub fn process_labels(&self) -> Result<LabelIndex> {
        self.foreground
            .process_index()
            .concat(&self.background.process_index())
    }

    pub fn to_matdict(&self, foreground: bool, background: bool) -> MatDict {
        bundle::to_matdict(
            foreground.then_some(&self.foreground),
            background.then_some(&self.background),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcaio_types::ErrorKind;

    #[test]
    fn test_new_hybridizer_is_empty() {
        let h = InventoryHybridizer::default();
        assert!(h.foreground().is_empty());
        assert!(h.process_labels().unwrap().is_empty());
        assert!(h.to_matdict(false, true).is_empty());
    }

    #[test]
    fn test_extract_foreground_requires_pro_f() {
        let mut h = InventoryHybridizer::default();
        let err = h.extract_foreground_from_matdict(&MatDict::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingData);
    }
}
