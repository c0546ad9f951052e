//! The background model: generic process inventory plus an optional IO table.
//!
//! The generic part (`PRO_gen`, `A_gen`, `F_gen`, `y_gen`, `STR`, `C`, `IMP`)
//! comes from an extraction bundle; the IO part (`A_io` and its named
//! extensions) comes from an [`IoSource`](crate::io_source::IoSource). The two
//! share no labels, so the combined background is block-diagonal: generic
//! processes first, IO sectors after.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::DVector;
use tracing::debug;

use lcaio_types::{
    IdentifierKind, Label, LabelIndex, LabeledMatrix, LabeledVector, LcaioError, MetadataTable,
    Result,
};

use crate::io_source::IoSource;

/// Generic (process-LCA) background inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericBackground {
    pub(crate) label_columns: Vec<isize>,
    pub(crate) pro_gen: MetadataTable,
    pub(crate) str_meta: MetadataTable,
    pub(crate) imp: Option<MetadataTable>,
    pub(crate) a_gen: LabeledMatrix,
    pub(crate) f_gen: LabeledMatrix,
    pub(crate) y_gen: LabeledVector,
    pub(crate) c: Option<LabeledMatrix>,
}

impl GenericBackground {
    /// Build and validate. Labels are derived from the metadata tables with
    /// `label_columns`; `c` and `imp` come together or not at all.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        label_columns: Vec<isize>,
        pro_gen: MetadataTable,
        str_meta: MetadataTable,
        a_gen: LabeledMatrix,
        f_gen: LabeledMatrix,
        y_gen: LabeledVector,
        characterization: Option<(MetadataTable, LabeledMatrix)>,
    ) -> Result<Self> {
        let (imp, c) = match characterization {
            Some((imp, c)) => (Some(imp), Some(c)),
            None => (None, None),
        };
        let background = Self {
            label_columns,
            pro_gen,
            str_meta,
            imp,
            a_gen,
            f_gen,
            y_gen,
            c,
        };
        background.validate()?;
        Ok(background)
    }

    pub fn validate(&self) -> Result<()> {
        let processes = self.process_index()?;
        let stressors = self.stressor_index()?;
        let n = processes.len();
        if self.a_gen.row_index() != &processes || self.a_gen.col_index() != &processes {
            return Err(LcaioError::ShapeMismatch {
                what: "A_gen index vs PRO_gen identifiers".to_string(),
                expected: (n, n),
                got: self.a_gen.shape(),
            });
        }
        if self.f_gen.row_index() != &stressors || self.f_gen.col_index() != &processes {
            return Err(LcaioError::ShapeMismatch {
                what: "F_gen index vs STR and PRO_gen identifiers".to_string(),
                expected: (stressors.len(), n),
                got: self.f_gen.shape(),
            });
        }
        if self.y_gen.index() != &processes {
            return Err(LcaioError::ShapeMismatch {
                what: "y_gen index vs PRO_gen identifiers".to_string(),
                expected: (n, 1),
                got: (self.y_gen.len(), 1),
            });
        }
        if let (Some(c), Some(imp)) = (&self.c, &self.imp) {
            let impacts = LabelIndex::new(imp.labels(&self.label_columns)?)?;
            if c.row_index() != &impacts || c.col_index() != &stressors {
                return Err(LcaioError::ShapeMismatch {
                    what: "C index vs IMP and STR identifiers".to_string(),
                    expected: (impacts.len(), stressors.len()),
                    got: c.shape(),
                });
            }
        }
        Ok(())
    }

    pub fn process_index(&self) -> Result<LabelIndex> {
        LabelIndex::new(self.pro_gen.labels(&self.label_columns)?)
    }

    pub fn stressor_index(&self) -> Result<LabelIndex> {
        LabelIndex::new(self.str_meta.labels(&self.label_columns)?)
    }

    pub fn pro_gen(&self) -> &MetadataTable {
        &self.pro_gen
    }

    pub fn str_meta(&self) -> &MetadataTable {
        &self.str_meta
    }

    pub fn imp(&self) -> Option<&MetadataTable> {
        self.imp.as_ref()
    }

    pub fn a_gen(&self) -> &LabeledMatrix {
        &self.a_gen
    }

    pub fn f_gen(&self) -> &LabeledMatrix {
        &self.f_gen
    }

    pub fn y_gen(&self) -> &LabeledVector {
        &self.y_gen
    }

    pub fn c(&self) -> Option<&LabeledMatrix> {
        self.c.as_ref()
    }
}

/// One named IO extension (e.g. "emissions", "factor_inputs").
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub name: String,
    pub matrix: LabeledMatrix,
}

/// Input-output background: square sector matrix plus extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct IoBackground {
    a_io: LabeledMatrix,
    extensions: Vec<Extension>,
}

impl IoBackground {
    /// Read an IO table from `source`, checking that the technology matrix is
    /// square over one sector index and every extension spans that index.
    pub fn from_source<S: IoSource + ?Sized>(source: &S, tolerance: f64) -> Result<Self> {
        let a = source.technology()?;
        let sectors = a.col_index().clone();
        if a.nrows() != a.ncols() || a.row_index().intersection(&sectors).len() != sectors.len() {
            return Err(LcaioError::ShapeMismatch {
                what: "A_io rows vs columns".to_string(),
                expected: (sectors.len(), sectors.len()),
                got: a.shape(),
            });
        }
        let a_io = a.reindex_rows(&sectors, tolerance).map_err(|e| e.in_matrix("A_io"))?;

        let mut extensions: Vec<Extension> = Vec::new();
        let mut stressors = LabelIndex::default();
        for (name, matrix) in source.extensions()? {
            if extensions.iter().any(|e| e.name == name) {
                return Err(LcaioError::IdentifierCollision {
                    context: format!("IO extension name {}", name),
                    labels: Vec::new(),
                });
            }
            if matrix.ncols() != sectors.len() {
                return Err(LcaioError::ShapeMismatch {
                    what: format!("extension {} columns vs sector index", name),
                    expected: (matrix.nrows(), sectors.len()),
                    got: matrix.shape(),
                });
            }
            let matrix = matrix
                .reindex_cols(&sectors, tolerance)
                .map_err(|e| e.in_matrix(&name))?;
            stressors = stressors.concat(matrix.row_index())?;
            debug!(extension = %name, rows = matrix.nrows(), "loaded IO extension");
            extensions.push(Extension { name, matrix });
        }
        Ok(Self { a_io, extensions })
    }

    pub fn sector_index(&self) -> &LabelIndex {
        self.a_io.col_index()
    }

    pub fn a_io(&self) -> &LabeledMatrix {
        &self.a_io
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn extension(&self, name: &str) -> Option<&LabeledMatrix> {
        self.extensions.iter().find(|e| e.name == name).map(|e| &e.matrix)
    }

    /// All extension rows stacked in registration order.
    pub fn stressors(&self) -> Result<LabeledMatrix> {
        let mut stacked = LabeledMatrix::zeros(LabelIndex::default(), self.sector_index().clone());
        for ext in &self.extensions {
            let rows = stacked.row_index().concat(ext.matrix.row_index())?;
            let upper = stacked.nrows();
            let data = nalgebra::DMatrix::from_fn(rows.len(), self.sector_index().len(), |i, j| {
                if i < upper {
                    stacked.data()[(i, j)]
                } else {
                    ext.matrix.data()[(i - upper, j)]
                }
            });
            stacked = LabeledMatrix::new(rows, self.sector_index().clone(), data)?;
        }
        Ok(stacked)
    }
}

/// Everything the foreground is linked to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundModel {
    generic: Option<GenericBackground>,
    io: Option<IoBackground>,
    io_categories: BTreeMap<String, BTreeSet<String>>,
}

impl BackgroundModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generic(&self) -> Option<&GenericBackground> {
        self.generic.as_ref()
    }

    pub fn io(&self) -> Option<&IoBackground> {
        self.io.as_ref()
    }

    /// Install or replace the generic part; its labels must not collide with the IO part.
    pub fn set_generic(&mut self, generic: GenericBackground) -> Result<()> {
        let candidate = Self {
            generic: Some(generic),
            ..self.clone()
        };
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Install or replace the IO part; its labels must not collide with the generic part.
    pub fn set_io(&mut self, io: IoBackground) -> Result<()> {
        let candidate = Self {
            io: Some(io),
            ..self.clone()
        };
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Register (or replace) a named group of sector names.
    pub fn set_io_category<I, S>(&mut self, name: impl Into<String>, sectors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.io_categories
            .insert(name.into(), sectors.into_iter().map(Into::into).collect());
    }

    pub fn io_category(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.io_categories.get(name)
    }

    pub fn io_category_names(&self) -> impl Iterator<Item = &String> + '_ {
        self.io_categories.keys()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(generic) = &self.generic {
            generic.validate()?;
        }
        self.try_process_index()?;
        self.try_stressor_index()?;
        Ok(())
    }

    fn try_process_index(&self) -> Result<LabelIndex> {
        let generic = match &self.generic {
            Some(g) => g.process_index()?,
            None => LabelIndex::default(),
        };
        match &self.io {
            Some(io) => generic
                .concat(io.sector_index())
                .map_err(|e| relabel_collision(e, "generic processes vs IO sectors")),
            None => Ok(generic),
        }
    }

    fn try_stressor_index(&self) -> Result<LabelIndex> {
        let generic = match &self.generic {
            Some(g) => g.stressor_index()?,
            None => LabelIndex::default(),
        };
        match &self.io {
            Some(io) => generic
                .concat(io.stressors()?.row_index())
                .map_err(|e| relabel_collision(e, "generic stressors vs IO extensions")),
            None => Ok(generic),
        }
    }

    /// Full background process index: generic processes, then IO sectors.
    pub fn process_index(&self) -> LabelIndex {
        // Validated on every mutation, so construction cannot fail here.
        self.try_process_index().unwrap_or_default()
    }

    /// Full stressor index: `STR`, then IO extension rows.
    pub fn stressor_index(&self) -> LabelIndex {
        self.try_stressor_index().unwrap_or_default()
    }

    /// Impact categories of the characterization matrix, if any.
    pub fn impact_index(&self) -> Option<LabelIndex> {
        let generic = self.generic.as_ref()?;
        let c = generic.c.as_ref()?;
        Some(c.row_index().clone())
    }

    /// Combined background technology matrix `diag(A_gen, A_io)`.
    pub fn technology(&self) -> Result<LabeledMatrix> {
        let generic = match &self.generic {
            Some(g) => g.a_gen.clone(),
            None => LabeledMatrix::zeros(LabelIndex::default(), LabelIndex::default()),
        };
        match &self.io {
            Some(io) => generic.block_diag(&io.a_io),
            None => Ok(generic),
        }
    }

    /// Combined background stressor matrix `diag(F_gen, F_io)`.
    pub fn stressors(&self) -> Result<LabeledMatrix> {
        let generic = match &self.generic {
            Some(g) => g.f_gen.clone(),
            None => LabeledMatrix::zeros(LabelIndex::default(), LabelIndex::default()),
        };
        match &self.io {
            Some(io) => generic.block_diag(&io.stressors()?),
            None => Ok(generic),
        }
    }

    /// `C` widened with zero columns over the IO extension rows.
    pub fn characterization(&self) -> Result<Option<LabeledMatrix>> {
        let Some(c) = self.generic.as_ref().and_then(|g| g.c.as_ref()) else {
            return Ok(None);
        };
        let widened = c
            .reindex_cols(&self.stressor_index(), 0.0)
            .map_err(|e| e.in_matrix("C"))?;
        Ok(Some(widened))
    }

    /// Background final demand: `y_gen`, zero over IO sectors.
    pub fn final_demand(&self) -> Result<LabeledVector> {
        let generic = match &self.generic {
            Some(g) => g.y_gen.clone(),
            None => LabeledVector::zeros(LabelIndex::default()),
        };
        match &self.io {
            Some(io) => generic.concat(&LabeledVector::zeros(io.sector_index().clone())),
            None => Ok(generic),
        }
    }

    /// Column of the combined technology matrix for the IO sector `sector`,
    /// over [`process_index`](Self::process_index). Generic processes are not
    /// sectors and yield `None`, as does a model without an IO part.
    pub fn io_sector_column(&self, sector: &Label) -> Option<DVector<f64>> {
        let io = self.io.as_ref()?;
        let col = io.a_io.column(sector)?;
        let n_gen = self
            .generic
            .as_ref()
            .map(|g| g.a_gen.ncols())
            .unwrap_or(0);
        let n_io = io.a_io.ncols();
        let mut column = DVector::zeros(n_gen + n_io);
        column.rows_mut(n_gen, n_io).copy_from(&col);
        Some(column)
    }

    pub fn contains_process(&self, label: &Label) -> bool {
        self.process_index().contains(label)
    }

    /// Ensure `label` names a background process or sector.
    pub fn require_process(&self, label: &Label) -> Result<()> {
        if self.contains_process(label) {
            Ok(())
        } else {
            Err(LcaioError::unknown(IdentifierKind::Sector, label))
        }
    }
}

fn relabel_collision(err: LcaioError, context: &str) -> LcaioError {
    match err {
        LcaioError::IdentifierCollision { labels, .. } => LcaioError::IdentifierCollision {
            context: context.to_string(),
            labels,
        },
        other => other,
    }
}
