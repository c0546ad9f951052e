//! Metadata tables (`PRO_f`, `PRO_gen`, `STR`, `IMP`).
//!
//! A table is a header plus rows of loosely typed cells. Labels are derived
//! from a configurable selection of columns, so the same table can key
//! processes by id alone or by (name, id, unit).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LcaioError, Result};
use crate::label::{KeyPart, Label};

/// One metadata cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Convert to a label component. Integral floats become integers.
    pub fn to_key_part(&self) -> Result<KeyPart> {
        match self {
            Cell::Int(v) => Ok(KeyPart::Int(*v)),
            Cell::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(KeyPart::Int(*v as i64)),
            Cell::Float(v) => Err(LcaioError::MalformedLabel {
                reason: format!("non-integral number {} cannot be an identifier", v),
            }),
            Cell::Text(s) => Ok(KeyPart::Text(s.clone())),
            Cell::Empty => Err(LcaioError::MalformedLabel {
                reason: "empty cell cannot be an identifier".to_string(),
            }),
        }
    }

    /// Add `offset` to a numeric cell.
    pub fn offset(&self, offset: i64) -> Result<Cell> {
        let base = match self {
            Cell::Int(v) => *v,
            Cell::Float(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
                *v as i64
            }
            other => {
                return Err(LcaioError::MalformedLabel {
                    reason: format!("cannot offset non-integer id {}", other),
                })
            }
        };
        base.checked_add(offset)
            .map(Cell::Int)
            .ok_or_else(|| LcaioError::MalformedLabel {
                reason: format!("id {} offset by {} overflows", base, offset),
            })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<i32> for Cell {
    fn from(v: i32) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

/// Header plus rows of cells; every row has the header's width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataTable {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl MetadataTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let width = header.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(LcaioError::ShapeMismatch {
                what: "metadata row".to_string(),
                expected: (1, width),
                got: (1, bad.len()),
            });
        }
        Ok(Self { header, rows })
    }

    /// Table with the header only.
    pub fn empty(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    fn resolve_column(&self, column: isize) -> Result<usize> {
        let width = self.header.len() as isize;
        let resolved = if column < 0 { width + column } else { column };
        if resolved < 0 || resolved >= width {
            return Err(LcaioError::MalformedLabel {
                reason: format!(
                    "label column {} out of range for {} metadata columns",
                    column, width
                ),
            });
        }
        Ok(resolved as usize)
    }

    /// Build one label per row from the selected columns.
    ///
    /// Negative column numbers count from the end, so `[0, 1, -1]` on a
    /// (FULL NAME, MATRIXID, UNIT) header keys rows by all three fields.
    pub fn labels(&self, columns: &[isize]) -> Result<Vec<Label>> {
        if columns.is_empty() {
            return Err(LcaioError::MalformedLabel {
                reason: "no label columns selected".to_string(),
            });
        }
        let positions = columns
            .iter()
            .map(|c| self.resolve_column(*c))
            .collect::<Result<Vec<_>>>()?;
        self.rows
            .iter()
            .map(|row| {
                let parts = positions
                    .iter()
                    .map(|p| row[*p].to_key_part())
                    .collect::<Result<Vec<_>>>()?;
                Ok(Label::new(parts))
            })
            .collect()
    }

    /// Keep the rows at `positions`, in that order.
    pub fn select_rows(&self, positions: &[usize]) -> Self {
        Self {
            header: self.header.clone(),
            rows: positions.iter().map(|p| self.rows[*p].clone()).collect(),
        }
    }

    /// Append `other`'s rows after this table's rows. Headers must agree.
    pub fn concat(&self, other: &MetadataTable) -> Result<Self> {
        if self.header != other.header {
            return Err(LcaioError::ShapeMismatch {
                what: format!(
                    "metadata header [{}] vs [{}]",
                    self.header.join(", "),
                    other.header.join(", ")
                ),
                expected: (1, self.header.len()),
                got: (1, other.header.len()),
            });
        }
        let mut rows = self.rows.clone();
        rows.extend(other.rows.iter().cloned());
        Ok(Self {
            header: self.header.clone(),
            rows,
        })
    }

    /// Copy with `offset` added to every cell of `column`.
    pub fn offset_column(&self, column: usize, offset: i64) -> Result<Self> {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row[column] = row[column].offset(offset)?;
                Ok(row)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            header: self.header.clone(),
            rows,
        })
    }
}
