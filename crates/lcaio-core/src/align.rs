//! Aligning foreground row indices to the background.

use tracing::debug;

use lcaio_types::Result;

use crate::background::BackgroundModel;
use crate::foreground::ForegroundModel;

impl ForegroundModel {
    /// Reindex `A_bf` and `A_hyb` rows to the background process index and
    /// `F_f` rows to the background stressor index.
    ///
    /// Rows are inserted as zeros where the background has labels the
    /// foreground lacks. A nonzero row with no background counterpart fails
    /// with a flow-loss error and leaves the model unchanged. Running it
    /// twice against the same background is a no-op the second time.
    pub fn match_foreground_to_background(
        &mut self,
        background: &BackgroundModel,
        tolerance: f64,
    ) -> Result<()> {
        let processes = background.process_index();
        let stressors = background.stressor_index();

        let a_bf = self
            .a_bf
            .reindex_rows(&processes, tolerance)
            .map_err(|e| e.in_matrix("A_bf"))?;
        let a_hyb = self
            .a_hyb
            .reindex_rows(&processes, tolerance)
            .map_err(|e| e.in_matrix("A_hyb"))?;
        let f_f = self
            .f_f
            .reindex_rows(&stressors, tolerance)
            .map_err(|e| e.in_matrix("F_f"))?;

        debug!(
            sectors = processes.len(),
            stressors = stressors.len(),
            "aligned foreground to background"
        );
        let candidate = ForegroundModel {
            a_bf,
            a_hyb,
            f_f,
            ..self.clone()
        };
        self.commit(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::GenericBackground;
    use lcaio_types::{
        Cell, ErrorKind, Label, LabelIndex, LabeledMatrix, LabeledVector, LcaioError,
        MetadataTable,
    };
    use nalgebra::DMatrix;

    fn meta(ids: &[i64]) -> MetadataTable {
        MetadataTable::new(
            vec!["FULL NAME".into(), "MATRIXID".into()],
            ids.iter()
                .map(|id| vec![Cell::from(format!("p{}", id).as_str()), Cell::from(*id)])
                .collect(),
        )
        .unwrap()
    }

    fn idx(ids: &[i64]) -> LabelIndex {
        LabelIndex::new(ids.iter().map(|i| Label::from(*i)).collect()).unwrap()
    }

    fn background(ids: &[i64]) -> BackgroundModel {
        let p = idx(ids);
        let generic = GenericBackground::new(
            vec![1],
            meta(ids),
            meta(&[]),
            LabeledMatrix::zeros(p.clone(), p.clone()),
            LabeledMatrix::zeros(LabelIndex::default(), p.clone()),
            LabeledVector::zeros(p),
            None,
        )
        .unwrap();
        let mut bg = BackgroundModel::new();
        bg.set_generic(generic).unwrap();
        bg
    }

    fn foreground() -> ForegroundModel {
        let f = idx(&[10005, 10002]);
        ForegroundModel::new(
            meta(&[10005, 10002]),
            vec![1],
            LabeledMatrix::zeros(f.clone(), f.clone()),
            LabeledMatrix::new(
                idx(&[1, 2, 3, 4]),
                f.clone(),
                DMatrix::from_row_slice(4, 2, &[0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
            )
            .unwrap(),
            LabeledMatrix::zeros(LabelIndex::default(), f.clone()),
            LabeledVector::zeros(f),
        )
        .unwrap()
    }

    #[test]
    fn test_alignment_inserts_rows_in_background_order() {
        let mut fg = foreground();
        fg.match_foreground_to_background(&background(&[1, 5, 3, 2, 4]), 0.0)
            .unwrap();
        assert_eq!(
            fg.a_bf().data(),
            &DMatrix::from_row_slice(5, 2, &[0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0])
        );
        assert_eq!(fg.a_hyb().nrows(), 5);
    }

    #[test]
    fn test_alignment_refuses_to_drop_flows() {
        let mut fg = foreground();
        let err = fg
            .match_foreground_to_background(&background(&[1, 3, 4]), 0.0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FlowLoss);
        match err {
            LcaioError::FlowLoss { matrix, labels } => {
                assert_eq!(matrix, "A_bf");
                assert_eq!(labels, vec![Label::from(2)]);
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(fg, foreground());
    }

    #[test]
    fn test_alignment_is_idempotent() {
        let bg = background(&[1, 5, 3, 2, 4]);
        let mut once = foreground();
        once.match_foreground_to_background(&bg, 0.0).unwrap();
        let mut twice = once.clone();
        twice.match_foreground_to_background(&bg, 0.0).unwrap();
        assert_eq!(once, twice);
    }
}
