//! Shared types for the lcaio workspace.
//!
//! This crate holds the pieces every other crate builds on:
//! - [`Label`] / [`KeyPart`] - composite process, sector and stressor identifiers
//! - [`MetadataTable`] / [`Cell`] - process, stressor and impact metadata
//! - [`LabeledMatrix`] / [`LabeledVector`] / [`LabelIndex`] - the labelled matrix store
//! - [`LcaioError`] - the error enum shared across the workspace

pub mod error;
pub mod label;
pub mod matrix;
pub mod table;

pub use error::{ErrorKind, IdentifierKind, LcaioError, Result};
pub use label::{KeyPart, Label};
pub use matrix::{LabelIndex, LabeledMatrix, LabeledVector};
pub use table::{Cell, MetadataTable};
