//! Merging two foreground models.

use tracing::{debug, warn};

use lcaio_types::{LabeledMatrix, LabeledVector, LcaioError, Result};

use crate::foreground::ForegroundModel;

/// Column-concatenate two matrices over the union of their row indices.
fn concat_over_union(
    left: &LabeledMatrix,
    right: &LabeledMatrix,
    name: &str,
) -> Result<LabeledMatrix> {
    let rows = left.row_index().union(right.row_index());
    // Pure row insertion: both sides keep every label, nothing can be lost.
    let left = left.reindex_rows(&rows, 0.0).map_err(|e| e.in_matrix(name))?;
    let right = right.reindex_rows(&rows, 0.0).map_err(|e| e.in_matrix(name))?;
    left.hconcat(&right).map_err(|e| e.in_matrix(name))
}

impl ForegroundModel {
    /// Append `other`'s processes after this model's.
    ///
    /// `other`'s final demand is kept only when `final_demand` is set; by
    /// default it is zeroed so an upstream model can be attached without
    /// counting its demand twice.
    pub fn append_to_foreground(&mut self, other: &ForegroundModel, final_demand: bool) -> Result<()> {
        if self.label_columns != other.label_columns {
            return Err(LcaioError::MalformedLabel {
                reason: format!(
                    "cannot merge models keyed by label columns {:?} and {:?}",
                    self.label_columns, other.label_columns
                ),
            });
        }
        let shared = self.index.intersection(&other.index);
        if !shared.is_empty() {
            return Err(LcaioError::IdentifierCollision {
                context: "append_to_foreground".to_string(),
                labels: shared,
            });
        }
        if self.a_bf.row_index() != other.a_bf.row_index()
            || self.f_f.row_index() != other.f_f.row_index()
        {
            warn!("merging foregrounds aligned to different backgrounds; rows are unioned");
        }

        let pro_f = self.pro_f.concat(&other.pro_f)?;
        let index = self.index.concat(&other.index)?;
        let a_ff = self.a_ff.block_diag(&other.a_ff).map_err(|e| e.in_matrix("A_ff"))?;
        let a_bf = concat_over_union(&self.a_bf, &other.a_bf, "A_bf")?;
        let f_f = concat_over_union(&self.f_f, &other.f_f, "F_f")?;
        let a_hyb = concat_over_union(&self.a_hyb, &other.a_hyb, "A_hyb")?;
        let other_y = if final_demand {
            other.y_f.clone()
        } else {
            LabeledVector::zeros(other.index.clone())
        };
        let y_f = self.y_f.concat(&other_y)?;

        debug!(
            receiver = self.len(),
            operand = other.len(),
            final_demand,
            "merged foreground models"
        );
        let candidate = ForegroundModel {
            label_columns: self.label_columns.clone(),
            pro_f,
            index,
            a_ff,
            a_bf,
            f_f,
            y_f,
            a_hyb,
            ledger: self.ledger.merged(&other.ledger),
        };
        self.commit(candidate)
    }
}
