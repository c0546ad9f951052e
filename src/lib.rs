//! lcaio: hybrid LCA/IO inventory engine.
//!
//! Links a foreground of specifically modelled processes to a background of
//! generic processes and input-output sectors, fills truncated foreground
//! processes with IO-sector requirements, and solves the combined system:
//!
//! - **Labelled matrices**: [`types`] (labels, metadata tables, labelled matrices, errors)
//! - **Models and operations**: [`engine`] (alignment, merge, edit, hybridization, lifecycle)
//! - **Bundles**: [`MatDict`] import/export, binary and JSON persistence
//!
//! See [`InventoryHybridizer`] for the usual entry point.

pub mod args;
pub mod report;

pub use lcaio_core as engine;
pub use lcaio_types as types;

pub use lcaio_core::{
    calc_all, calc_lifecycle, BackgroundModel, ForegroundModel, HybridizationRecord,
    HybridizeOutcome, HybridizerConfig, InventoryHybridizer, IoSource, IoTable, LifecycleResults,
    MatDict, Quantity, SectorMatching,
};
pub use lcaio_types::{Label, LabelIndex, LabeledMatrix, LabeledVector, LcaioError};
