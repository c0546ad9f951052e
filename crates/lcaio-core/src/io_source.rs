//! Third-party input-output tables.
//!
//! The engine only needs a labelled technology matrix and named extension
//! matrices. Anything that can produce those implements [`IoSource`];
//! [`IoTable`] is the in-memory implementation that also round-trips
//! through JSON.

use std::path::Path;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use lcaio_types::{Label, LabeledMatrix, LcaioError, Result};

use crate::bundle::DenseArray;

/// Provider of an IO technology matrix and its extensions.
pub trait IoSource {
    /// Square technology coefficient matrix over the sector index.
    fn technology(&self) -> Result<LabeledMatrix>;

    /// Named extension matrices, rows = stressors, columns = sectors.
    fn extensions(&self) -> Result<Vec<(String, LabeledMatrix)>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoExtension {
    pub name: String,
    pub stressors: Vec<Label>,
    pub values: DenseArray,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoTable {
    pub sectors: Vec<Label>,
    pub technology: DenseArray,
    #[serde(default)]
    pub extensions: Vec<IoExtension>,
}

impl IoTable {
    pub fn new(sectors: Vec<Label>, technology: DMatrix<f64>) -> Self {
        Self {
            sectors,
            technology: DenseArray::from_matrix(&technology),
            extensions: Vec::new(),
        }
    }

    /// Table over every `(region, sector)` pair, region-major.
    pub fn from_regions(regions: &[&str], sectors: &[&str], technology: DMatrix<f64>) -> Self {
        let labels = regions
            .iter()
            .flat_map(|r| sectors.iter().map(move |s| Label::from((*r, *s))))
            .collect();
        Self::new(labels, technology)
    }

    pub fn with_extension(
        mut self,
        name: impl Into<String>,
        stressors: Vec<Label>,
        values: DMatrix<f64>,
    ) -> Self {
        self.extensions.push(IoExtension {
            name: name.into(),
            stressors,
            values: DenseArray::from_matrix(&values),
        });
        self
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| LcaioError::Storage {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| LcaioError::Storage {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl IoSource for IoTable {
    fn technology(&self) -> Result<LabeledMatrix> {
        LabeledMatrix::from_labels(
            self.sectors.clone(),
            self.sectors.clone(),
            self.technology.to_matrix()?,
        )
        .map_err(|e| e.in_matrix("A_io"))
    }

    fn extensions(&self) -> Result<Vec<(String, LabeledMatrix)>> {
        self.extensions
            .iter()
            .map(|ext| {
                let m = LabeledMatrix::from_labels(
                    ext.stressors.clone(),
                    self.sectors.clone(),
                    ext.values.to_matrix()?,
                )
                .map_err(|e| e.in_matrix(&ext.name))?;
                Ok((ext.name.clone(), m))
            })
            .collect()
    }
}
