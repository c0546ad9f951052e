//! Error type shared by every crate in the workspace.
//!
//! Each variant corresponds to one failure kind that a pipeline may want to
//! react to differently (re-extract a bundle, fix an identifier, abort).

use std::fmt;

use crate::label::Label;

/// Coarse classification of an [`LcaioError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FlowLoss,
    IdentifierCollision,
    UnknownIdentifier,
    ShapeMismatch,
    SingularSystem,
    MissingData,
    MalformedLabel,
    Storage,
}

/// What kind of identifier an unknown-identifier error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Label,
    Process,
    Sector,
    Stressor,
    Category,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentifierKind::Label => "label",
            IdentifierKind::Process => "process",
            IdentifierKind::Sector => "sector",
            IdentifierKind::Stressor => "stressor",
            IdentifierKind::Category => "category",
        };
        f.write_str(name)
    }
}

/// Errors raised by labelled-matrix operations and the hybridization engine.
#[derive(Debug, Clone)]
pub enum LcaioError {
    /// Nonzero flows whose labels have no counterpart in the target index.
    FlowLoss {
        /// Matrix being reindexed (e.g. "A_bf")
        matrix: String,
        /// Labels of the rows/columns that would have been dropped
        labels: Vec<Label>,
    },

    /// An operation would produce duplicate identifiers.
    IdentifierCollision {
        /// Where the collision was detected
        context: String,
        /// The duplicated labels
        labels: Vec<Label>,
    },

    /// An identifier is not present in the model.
    UnknownIdentifier {
        kind: IdentifierKind,
        identifier: String,
    },

    /// Two pieces of data disagree on their dimensions.
    ShapeMismatch {
        /// What was being checked
        what: String,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// `(I - A)` cannot be inverted.
    SingularSystem {
        /// Order of the system
        size: usize,
        /// Smallest pivot magnitude encountered
        pivot: f64,
    },

    /// A required matrix, table or bundle key is absent.
    MissingData { what: String },

    /// A metadata cell cannot be used as (part of) an identifier.
    MalformedLabel { reason: String },

    /// Reading or writing a persisted bundle failed.
    Storage { path: String, message: String },
}

impl LcaioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LcaioError::FlowLoss { .. } => ErrorKind::FlowLoss,
            LcaioError::IdentifierCollision { .. } => ErrorKind::IdentifierCollision,
            LcaioError::UnknownIdentifier { .. } => ErrorKind::UnknownIdentifier,
            LcaioError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            LcaioError::SingularSystem { .. } => ErrorKind::SingularSystem,
            LcaioError::MissingData { .. } => ErrorKind::MissingData,
            LcaioError::MalformedLabel { .. } => ErrorKind::MalformedLabel,
            LcaioError::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Attach the name of the matrix an error was raised for.
    ///
    /// Matrix primitives do not know which model field they belong to, so
    /// callers rename flow-loss and shape errors on the way out.
    pub fn in_matrix(self, name: &str) -> Self {
        match self {
            LcaioError::FlowLoss { labels, .. } => LcaioError::FlowLoss {
                matrix: name.to_string(),
                labels,
            },
            LcaioError::ShapeMismatch {
                what,
                expected,
                got,
            } => LcaioError::ShapeMismatch {
                what: format!("{}: {}", name, what),
                expected,
                got,
            },
            other => other,
        }
    }

    pub fn unknown(kind: IdentifierKind, identifier: impl fmt::Display) -> Self {
        LcaioError::UnknownIdentifier {
            kind,
            identifier: identifier.to_string(),
        }
    }

    pub fn missing(what: impl Into<String>) -> Self {
        LcaioError::MissingData { what: what.into() }
    }
}

fn write_labels(f: &mut fmt::Formatter<'_>, labels: &[Label]) -> fmt::Result {
    const SHOWN: usize = 8;
    for (i, label) in labels.iter().take(SHOWN).enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", label)?;
    }
    if labels.len() > SHOWN {
        write!(f, ", ... ({} more)", labels.len() - SHOWN)?;
    }
    Ok(())
}

impl fmt::Display for LcaioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LcaioError::FlowLoss { matrix, labels } => {
                write!(
                    f,
                    "FLOW_LOSS: {} has nonzero flows with no counterpart in the target index: ",
                    matrix
                )?;
                write_labels(f, labels)
            }
            LcaioError::IdentifierCollision { context, labels } => {
                write!(f, "IDENTIFIER_COLLISION in {}: ", context)?;
                write_labels(f, labels)
            }
            LcaioError::UnknownIdentifier { kind, identifier } => {
                write!(f, "UNKNOWN_IDENTIFIER: no {} {}", kind, identifier)
            }
            LcaioError::ShapeMismatch {
                what,
                expected,
                got,
            } => write!(
                f,
                "SHAPE_MISMATCH for {}: expected {}x{}, got {}x{}",
                what, expected.0, expected.1, got.0, got.1
            ),
            LcaioError::SingularSystem { size, pivot } => write!(
                f,
                "SINGULAR_SYSTEM: (I - A) of order {} is not invertible (smallest pivot {:e})",
                size, pivot
            ),
            LcaioError::MissingData { what } => write!(f, "MISSING_DATA: {}", what),
            LcaioError::MalformedLabel { reason } => write!(f, "MALFORMED_LABEL: {}", reason),
            LcaioError::Storage { path, message } => {
                write!(f, "STORAGE: {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for LcaioError {}

pub type Result<T> = std::result::Result<T, LcaioError>;
