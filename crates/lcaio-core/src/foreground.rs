//! The foreground model: the specifically modelled processes under study.
//!
//! `ForegroundModel` owns `PRO_f`, `A_ff`, `A_bf`, `F_f`, `y_f`, the hybrid
//! background requirements `A_hyb` and the hybridization ledger as one unit.
//! Operations that reorder, filter or relabel processes live in sibling
//! modules (`align`, `merge`, `edit`, `hybridize`); all of them build a
//! complete candidate model and hand it to [`ForegroundModel::commit`], which
//! validates every cross-matrix invariant before swapping it in.

use lcaio_types::{
    LabelIndex, LabeledMatrix, LabeledVector, LcaioError, MetadataTable, Result,
};

use crate::hybridize::HybridLedger;

#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundModel {
    pub(crate) label_columns: Vec<isize>,
    pub(crate) pro_f: MetadataTable,
    pub(crate) index: LabelIndex,
    pub(crate) a_ff: LabeledMatrix,
    pub(crate) a_bf: LabeledMatrix,
    pub(crate) f_f: LabeledMatrix,
    pub(crate) y_f: LabeledVector,
    pub(crate) a_hyb: LabeledMatrix,
    pub(crate) ledger: HybridLedger,
}

impl ForegroundModel {
    /// Model with no processes.
    pub fn empty(label_columns: Vec<isize>, header: Vec<String>) -> Self {
        let index = LabelIndex::default();
        Self {
            label_columns,
            pro_f: MetadataTable::empty(header),
            a_ff: LabeledMatrix::zeros(index.clone(), index.clone()),
            a_bf: LabeledMatrix::zeros(LabelIndex::default(), index.clone()),
            f_f: LabeledMatrix::zeros(LabelIndex::default(), index.clone()),
            y_f: LabeledVector::zeros(index.clone()),
            a_hyb: LabeledMatrix::zeros(LabelIndex::default(), index.clone()),
            ledger: HybridLedger::default(),
            index,
        }
    }

    /// Assemble a model from already-labelled parts.
    ///
    /// Process labels are derived from `pro_f` with `label_columns`; every
    /// matrix must already be indexed by exactly those labels on its process
    /// axis.
    pub fn new(
        pro_f: MetadataTable,
        label_columns: Vec<isize>,
        a_ff: LabeledMatrix,
        a_bf: LabeledMatrix,
        f_f: LabeledMatrix,
        y_f: LabeledVector,
    ) -> Result<Self> {
        let index = LabelIndex::new(pro_f.labels(&label_columns)?)?;
        let a_hyb = LabeledMatrix::zeros(LabelIndex::default(), index.clone());
        let model = Self {
            label_columns,
            pro_f,
            index,
            a_ff,
            a_bf,
            f_f,
            y_f,
            a_hyb,
            ledger: HybridLedger::default(),
        };
        model.validate()?;
        Ok(model)
    }

    /// Replace the hybrid-flow block, e.g. when re-importing an exported model.
    pub fn with_hybrid_flows(mut self, a_hyb: LabeledMatrix) -> Result<Self> {
        self.a_hyb = a_hyb;
        self.validate()?;
        Ok(self)
    }

    pub fn label_columns(&self) -> &[isize] {
        &self.label_columns
    }

    pub fn pro_f(&self) -> &MetadataTable {
        &self.pro_f
    }

    pub fn process_index(&self) -> &LabelIndex {
        &self.index
    }

    pub fn a_ff(&self) -> &LabeledMatrix {
        &self.a_ff
    }

    pub fn a_bf(&self) -> &LabeledMatrix {
        &self.a_bf
    }

    pub fn f_f(&self) -> &LabeledMatrix {
        &self.f_f
    }

    pub fn y_f(&self) -> &LabeledVector {
        &self.y_f
    }

    /// Background requirements written by hybridization.
    pub fn a_hyb(&self) -> &LabeledMatrix {
        &self.a_hyb
    }

    pub fn ledger(&self) -> &HybridLedger {
        &self.ledger
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check every invariant tying the owned matrices to `PRO_f`.
    pub fn validate(&self) -> Result<()> {
        let derived = self.pro_f.labels(&self.label_columns)?;
        if derived.as_slice() != self.index.labels() {
            return Err(LcaioError::ShapeMismatch {
                what: "process index vs PRO_f identifiers".to_string(),
                expected: (derived.len(), 1),
                got: (self.index.len(), 1),
            });
        }
        let n = self.index.len();
        if self.a_ff.row_index() != &self.index || self.a_ff.col_index() != &self.index {
            return Err(LcaioError::ShapeMismatch {
                what: "A_ff index vs process index".to_string(),
                expected: (n, n),
                got: self.a_ff.shape(),
            });
        }
        for (name, m) in [("A_bf", &self.a_bf), ("F_f", &self.f_f), ("A_hyb", &self.a_hyb)] {
            if m.col_index() != &self.index {
                return Err(LcaioError::ShapeMismatch {
                    what: format!("{} columns vs process index", name),
                    expected: (m.nrows(), n),
                    got: m.shape(),
                });
            }
        }
        if self.y_f.index() != &self.index {
            return Err(LcaioError::ShapeMismatch {
                what: "y_f index vs process index".to_string(),
                expected: (n, 1),
                got: (self.y_f.len(), 1),
            });
        }
        if let Some(stray) = self.ledger.processes().find(|p| !self.index.contains(p)) {
            return Err(LcaioError::unknown(
                lcaio_types::IdentifierKind::Process,
                stray,
            ));
        }
        Ok(())
    }

    /// Swap in `candidate` once it passes validation; `self` is untouched otherwise.
    pub(crate) fn commit(&mut self, candidate: ForegroundModel) -> Result<()> {
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }
}
