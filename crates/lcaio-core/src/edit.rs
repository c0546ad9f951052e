//! Removing and renumbering foreground processes.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use lcaio_types::{IdentifierKind, Label, LabelIndex, LcaioError, Result};

use crate::foreground::ForegroundModel;

impl ForegroundModel {
    /// Remove `ids` from every matrix, `y_f`, `PRO_f` and the ledger.
    ///
    /// All ids are resolved first; one unknown id fails the whole call.
    pub fn delete_processes_foreground(&mut self, ids: &[Label]) -> Result<()> {
        let doomed: HashSet<usize> = self
            .index
            .positions_of(ids, IdentifierKind::Process)?
            .into_iter()
            .collect();
        let keep: Vec<usize> = (0..self.len()).filter(|p| !doomed.contains(p)).collect();
        let index = self.index.select(&keep);

        let mut ledger = self.ledger.clone();
        ledger.retain_processes(|p| index.contains(p));

        let candidate = ForegroundModel {
            label_columns: self.label_columns.clone(),
            pro_f: self.pro_f.select_rows(&keep),
            a_ff: self.a_ff.select_row_positions(&keep).select_col_positions(&keep),
            a_bf: self.a_bf.select_col_positions(&keep),
            f_f: self.f_f.select_col_positions(&keep),
            a_hyb: self.a_hyb.select_col_positions(&keep),
            y_f: self.y_f.select_positions(&keep),
            ledger,
            index,
        };
        debug!(removed = doomed.len(), remaining = keep.len(), "deleted foreground processes");
        self.commit(candidate)
    }

    /// Add `offset` to the numeric `id_column` of `PRO_f` and relabel every
    /// matrix accordingly. Values are untouched; a negative offset undoes a
    /// previous shift.
    pub fn increase_foreground_process_ids(&mut self, offset: i64, id_column: &str) -> Result<()> {
        let column = self
            .pro_f
            .column_position(id_column)
            .ok_or_else(|| LcaioError::missing(format!("id column {} in PRO_f", id_column)))?;
        let pro_f = self.pro_f.offset_column(column, offset)?;
        let index = LabelIndex::new(pro_f.labels(&self.label_columns)?).map_err(|e| match e {
            LcaioError::IdentifierCollision { labels, .. } => LcaioError::IdentifierCollision {
                context: "increase_foreground_process_ids".to_string(),
                labels,
            },
            other => other,
        })?;
        let mapping: HashMap<Label, Label> = self
            .index
            .iter()
            .cloned()
            .zip(index.iter().cloned())
            .collect();

        let candidate = ForegroundModel {
            label_columns: self.label_columns.clone(),
            pro_f,
            a_ff: self.a_ff.relabel_rows(index.clone())?.relabel_cols(index.clone())?,
            a_bf: self.a_bf.relabel_cols(index.clone())?,
            f_f: self.f_f.relabel_cols(index.clone())?,
            a_hyb: self.a_hyb.relabel_cols(index.clone())?,
            y_f: self.y_f.relabel(index.clone())?,
            ledger: self.ledger.relabel_processes(&mapping),
            index,
        };
        debug!(offset, "renumbered foreground processes");
        self.commit(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcaio_types::{Cell, ErrorKind, LabeledMatrix, LabeledVector, MetadataTable};
    use nalgebra::{DMatrix, DVector};

    fn model() -> ForegroundModel {
        let pro = MetadataTable::new(
            vec!["FULL NAME".into(), "MATRIXID".into(), "UNIT".into()],
            vec![
                vec![Cell::from("s+orm"), Cell::from(10005), Cell::from("kg")],
                vec![Cell::from("Batt Packing"), Cell::from(10002), Cell::from("kg")],
                vec![Cell::from("foo"), Cell::from(10), Cell::from("kg")],
            ],
        )
        .unwrap();
        let p = LabelIndex::new(pro.labels(&[1]).unwrap()).unwrap();
        let sectors = LabelIndex::new(vec![Label::from(1), Label::from(2)]).unwrap();
        ForegroundModel::new(
            pro,
            vec![1],
            LabeledMatrix::new(
                p.clone(),
                p.clone(),
                DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, 10.0, 11.0, 0.0, 0.0, 0.0, 11.0]),
            )
            .unwrap(),
            LabeledMatrix::new(
                sectors,
                p.clone(),
                DMatrix::from_row_slice(2, 3, &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0]),
            )
            .unwrap(),
            LabeledMatrix::zeros(LabelIndex::default(), p.clone()),
            LabeledVector::new(p, DVector::from_vec(vec![1.0, 0.0, 2.0])).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_delete_removes_process_everywhere() {
        let mut m = model();
        m.delete_processes_foreground(&[Label::from(10)]).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.pro_f().len(), 2);
        assert_eq!(m.a_ff().shape(), (2, 2));
        assert_eq!(m.a_ff().get(&Label::from(10002), &Label::from(10005)), Some(10.0));
        assert_eq!(m.a_bf().shape(), (2, 2));
        assert_eq!(m.y_f().get(&Label::from(10)), None);
    }

    #[test]
    fn test_delete_unknown_id_removes_nothing() {
        let mut m = model();
        let err = m
            .delete_processes_foreground(&[Label::from(10), Label::from(99)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
        assert_eq!(m, model());
    }

    #[test]
    fn test_increase_ids_relabels_without_touching_values() {
        let mut m = model();
        m.increase_foreground_process_ids(70000, "MATRIXID").unwrap();
        assert_eq!(m.pro_f().rows()[0][1], Cell::Int(80005));
        assert_eq!(m.a_ff().get(&Label::from(80002), &Label::from(80005)), Some(10.0));
        assert_eq!(m.y_f().get(&Label::from(70010)), Some(2.0));
        m.increase_foreground_process_ids(-70000, "MATRIXID").unwrap();
        assert_eq!(m, model());
    }

    #[test]
    fn test_increase_ids_requires_id_column() {
        let mut m = model();
        let err = m.increase_foreground_process_ids(1, "ID").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingData);
    }
}
