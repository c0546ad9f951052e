//! Foreground/background hybridization engine.
//!
//! - [`ForegroundModel`] / [`BackgroundModel`] - the two halves of an inventory
//! - [`align`], [`merge`], [`edit`] - reshaping the foreground against the background
//! - [`hybridize`] - adding IO-sector requirements to foreground processes
//! - [`lifecycle`] - solving the combined system
//! - [`bundle`] - `MatDict` import/export and persistence
//! - [`InventoryHybridizer`] - facade tying a foreground, a background and a
//!   [`HybridizerConfig`] together

pub mod align;
pub mod background;
pub mod bundle;
pub mod config;
pub mod edit;
pub mod foreground;
pub mod hybridize;
pub mod hybridizer;
pub mod io_source;
pub mod lifecycle;
pub mod merge;

pub use background::{BackgroundModel, Extension, GenericBackground, IoBackground};
pub use bundle::{DenseArray, MatDict, MatValue};
pub use config::{HybridizerConfig, SectorMatching};
pub use foreground::ForegroundModel;
pub use hybridize::{HybridEntry, HybridLedger, HybridizationRecord, HybridizeOutcome};
pub use hybridizer::InventoryHybridizer;
pub use io_source::{IoExtension, IoSource, IoTable};
pub use lifecycle::{calc_all, calc_lifecycle, CombinedSystem, LifecycleResults, Quantity};
