//! `MatDict`: the flat key → array/table bundle exchanged with extraction
//! pipelines, plus conversion to and from the foreground/background models.
//!
//! Bundles persist either as JSON (`*.json`) or as a bincode container (any
//! other extension). Matrices are stored row-major with explicit shape;
//! metadata tables are rows of cells.

use std::collections::BTreeMap;
use std::path::Path;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lcaio_types::{
    Cell, KeyPart, Label, LabelIndex, LabeledMatrix, LabeledVector, LcaioError, MetadataTable,
    Result,
};

use crate::background::{BackgroundModel, GenericBackground};
use crate::config::HybridizerConfig;
use crate::foreground::ForegroundModel;

/// Header used when a bundle carries no `*_header` entry.
pub const DEFAULT_HEADER: [&str; 3] = ["FULL NAME", "MATRIXID", "UNIT"];

/// Keys written for the foreground partition.
pub const FOREGROUND_KEYS: &[&str] = &[
    "PRO_f", "PRO_header", "A_ff", "A_bf", "A_bf_rows", "F_f", "F_f_rows", "y_f", "A_hyb",
    "A_hyb_rows",
];

/// Keys written for the background partition.
pub const BACKGROUND_KEYS: &[&str] = &[
    "PRO_gen", "PRO_header", "A_gen", "F_gen", "y_gen", "STR", "STR_header", "C", "IMP",
    "IMP_header",
];

/// Dense row-major array with explicit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseArray {
    pub nrows: usize,
    pub ncols: usize,
    pub data: Vec<f64>,
}

impl DenseArray {
    pub fn from_matrix(m: &DMatrix<f64>) -> Self {
        let data = m.row_iter().flat_map(|r| r.iter().copied().collect::<Vec<_>>()).collect();
        Self {
            nrows: m.nrows(),
            ncols: m.ncols(),
            data,
        }
    }

    pub fn from_vector(v: &DVector<f64>) -> Self {
        Self {
            nrows: v.len(),
            ncols: 1,
            data: v.iter().copied().collect(),
        }
    }

    pub fn to_matrix(&self) -> Result<DMatrix<f64>> {
        if self.nrows.checked_mul(self.ncols) != Some(self.data.len()) {
            return Err(LcaioError::ShapeMismatch {
                what: "dense array payload".to_string(),
                expected: (self.nrows, self.ncols),
                got: (self.data.len(), 1),
            });
        }
        Ok(DMatrix::from_row_slice(self.nrows, self.ncols, &self.data))
    }

    /// Accept either a column or a row vector.
    pub fn to_vector(&self) -> Result<DVector<f64>> {
        if self.nrows != 1 && self.ncols != 1 && !self.data.is_empty() {
            return Err(LcaioError::ShapeMismatch {
                what: "vector payload".to_string(),
                expected: (self.data.len(), 1),
                got: (self.nrows, self.ncols),
            });
        }
        Ok(DVector::from_vec(self.data.clone()))
    }
}

/// One bundle value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatValue {
    Array(DenseArray),
    Table(Vec<Vec<Cell>>),
}

/// Flat key → value mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatDict {
    entries: BTreeMap<String, MatValue>,
}

// bincode cannot drive the untagged `Cell` representation, so the binary
// container stores cells externally tagged.
#[derive(Serialize, Deserialize)]
enum WireCell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Serialize, Deserialize)]
enum WireValue {
    Array(DenseArray),
    Table(Vec<Vec<WireCell>>),
}

impl From<&Cell> for WireCell {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Empty => WireCell::Empty,
            Cell::Int(v) => WireCell::Int(*v),
            Cell::Float(v) => WireCell::Float(*v),
            Cell::Text(s) => WireCell::Text(s.clone()),
        }
    }
}

impl From<WireCell> for Cell {
    fn from(cell: WireCell) -> Self {
        match cell {
            WireCell::Empty => Cell::Empty,
            WireCell::Int(v) => Cell::Int(v),
            WireCell::Float(v) => Cell::Float(v),
            WireCell::Text(s) => Cell::Text(s),
        }
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> LcaioError {
    LcaioError::Storage {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

impl MatDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&MatValue> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MatValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn insert_matrix(&mut self, key: impl Into<String>, m: &DMatrix<f64>) {
        self.insert(key, MatValue::Array(DenseArray::from_matrix(m)));
    }

    pub fn insert_vector(&mut self, key: impl Into<String>, v: &DVector<f64>) {
        self.insert(key, MatValue::Array(DenseArray::from_vector(v)));
    }

    pub fn insert_table(&mut self, key: impl Into<String>, rows: Vec<Vec<Cell>>) {
        self.insert(key, MatValue::Table(rows));
    }

    /// Copy every entry of `other` into `self`, replacing shared keys.
    pub fn extend(&mut self, other: MatDict) {
        self.entries.extend(other.entries);
    }

    pub fn array(&self, key: &str) -> Result<Option<&DenseArray>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(MatValue::Array(a)) => Ok(Some(a)),
            Some(MatValue::Table(_)) => Err(LcaioError::MalformedLabel {
                reason: format!("bundle key {} holds a table, expected an array", key),
            }),
        }
    }

    pub fn table(&self, key: &str) -> Result<Option<&Vec<Vec<Cell>>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(MatValue::Table(t)) => Ok(Some(t)),
            Some(MatValue::Array(_)) => Err(LcaioError::MalformedLabel {
                reason: format!("bundle key {} holds an array, expected a table", key),
            }),
        }
    }

    fn header(&self, key: &str) -> Result<Vec<String>> {
        Ok(match self.table(key)? {
            Some(rows) => rows
                .first()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .unwrap_or_default(),
            None => DEFAULT_HEADER.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn metadata(&self, key: &str, header_key: &str) -> Result<Option<MetadataTable>> {
        match self.table(key)? {
            Some(rows) => Ok(Some(
                MetadataTable::new(self.header(header_key)?, rows.clone())
                    .map_err(|e| e.in_matrix(key))?,
            )),
            None => Ok(None),
        }
    }

    fn label_rows(&self, key: &str) -> Result<Option<LabelIndex>> {
        match self.table(key)? {
            Some(rows) => {
                let labels = rows
                    .iter()
                    .map(|row| {
                        let parts = row
                            .iter()
                            .map(Cell::to_key_part)
                            .collect::<Result<Vec<KeyPart>>>()?;
                        Ok(Label::new(parts))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(LabelIndex::new(labels)?))
            }
            None => Ok(None),
        }
    }

    fn matrix_or_zeros(&self, key: &str, rows: &LabelIndex, cols: &LabelIndex) -> Result<LabeledMatrix> {
        match self.array(key)? {
            Some(a) => LabeledMatrix::new(rows.clone(), cols.clone(), a.to_matrix()?)
                .map_err(|e| e.in_matrix(key)),
            None => Ok(LabeledMatrix::zeros(rows.clone(), cols.clone())),
        }
    }

    fn vector_or_zeros(&self, key: &str, index: &LabelIndex) -> Result<LabeledVector> {
        match self.array(key)? {
            Some(a) => LabeledVector::new(index.clone(), a.to_vector()?).map_err(|e| e.in_matrix(key)),
            None => Ok(LabeledVector::zeros(index.clone())),
        }
    }

    /// Write as JSON when the path ends in `.json`, bincode otherwise.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = if is_json(path) {
            serde_json::to_vec_pretty(self).map_err(|e| storage_error(path, e))?
        } else {
            let wire: BTreeMap<&str, WireValue> = self
                .entries
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        MatValue::Array(a) => WireValue::Array(a.clone()),
                        MatValue::Table(t) => WireValue::Table(
                            t.iter().map(|r| r.iter().map(WireCell::from).collect()).collect(),
                        ),
                    };
                    (k.as_str(), value)
                })
                .collect();
            bincode::serialize(&wire).map_err(|e| storage_error(path, e))?
        };
        std::fs::write(path, bytes).map_err(|e| storage_error(path, e))?;
        info!(path = %path.display(), entries = self.len(), "saved bundle");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| storage_error(path, e))?;
        let dict = if is_json(path) {
            serde_json::from_slice(&bytes).map_err(|e| storage_error(path, e))?
        } else {
            let wire: BTreeMap<String, WireValue> =
                bincode::deserialize(&bytes).map_err(|e| storage_error(path, e))?;
            let entries = wire
                .into_iter()
                .map(|(k, v)| {
                    let value = match v {
                        WireValue::Array(a) => MatValue::Array(a),
                        WireValue::Table(t) => MatValue::Table(
                            t.into_iter()
                                .map(|r| r.into_iter().map(Cell::from).collect())
                                .collect(),
                        ),
                    };
                    (k, value)
                })
                .collect();
            MatDict { entries }
        };
        debug!(path = %path.display(), "loaded bundle");
        Ok(dict)
    }
}

fn label_table(index: &LabelIndex) -> Vec<Vec<Cell>> {
    index
        .iter()
        .map(|l| {
            l.parts()
                .iter()
                .map(|p| match p {
                    KeyPart::Int(v) => Cell::Int(*v),
                    KeyPart::Text(s) => Cell::Text(s.clone()),
                })
                .collect()
        })
        .collect()
}

fn header_row(header: &[String]) -> Vec<Vec<Cell>> {
    vec![header.iter().map(|h| Cell::Text(h.clone())).collect()]
}

/// Row labels for a foreground matrix: an explicit `*_rows` table, then the
/// metadata table of the same bundle, then the already-known background.
fn foreground_rows(
    dict: &MatDict,
    rows_key: &str,
    meta_key: &str,
    header_key: &str,
    config: &HybridizerConfig,
    known: Option<LabelIndex>,
) -> Result<LabelIndex> {
    if let Some(index) = dict.label_rows(rows_key)? {
        return Ok(index);
    }
    if let Some(meta) = dict.metadata(meta_key, header_key)? {
        return LabelIndex::new(meta.labels(&config.label_columns)?);
    }
    Ok(known.unwrap_or_default())
}

/// Build a foreground model from the foreground keys of `dict`.
pub fn extract_foreground(
    dict: &MatDict,
    config: &HybridizerConfig,
    background: Option<&BackgroundModel>,
) -> Result<ForegroundModel> {
    let pro_f = dict
        .metadata("PRO_f", "PRO_header")?
        .ok_or_else(|| LcaioError::missing("bundle key PRO_f"))?;
    let index = LabelIndex::new(pro_f.labels(&config.label_columns)?)?;
    let generic = background.and_then(BackgroundModel::generic);

    let bf_rows = foreground_rows(
        dict,
        "A_bf_rows",
        "PRO_gen",
        "PRO_header",
        config,
        generic.map(|g| g.process_index()).transpose()?,
    )?;
    let f_rows = foreground_rows(
        dict,
        "F_f_rows",
        "STR",
        "STR_header",
        config,
        generic.map(|g| g.stressor_index()).transpose()?,
    )?;
    if dict.contains_key("A_bf") && bf_rows.is_empty() {
        return Err(LcaioError::missing("row labels for A_bf (PRO_gen or a known background)"));
    }
    if dict.contains_key("F_f") && f_rows.is_empty() {
        return Err(LcaioError::missing("row labels for F_f (STR or a known background)"));
    }

    let a_ff = dict.matrix_or_zeros("A_ff", &index, &index)?;
    let a_bf = dict.matrix_or_zeros("A_bf", &bf_rows, &index)?;
    let f_f = dict.matrix_or_zeros("F_f", &f_rows, &index)?;
    let y_f = dict.vector_or_zeros("y_f", &index)?;
    let model = ForegroundModel::new(pro_f, config.label_columns.clone(), a_ff, a_bf, f_f, y_f)?;

    let model = match dict.label_rows("A_hyb_rows")? {
        Some(rows) => {
            let a_hyb = dict.matrix_or_zeros("A_hyb", &rows, &index)?;
            model.with_hybrid_flows(a_hyb)?
        }
        None => model,
    };
    info!(processes = model.len(), "extracted foreground");
    Ok(model)
}

/// Build the generic background from the background keys of `dict`.
pub fn extract_background(dict: &MatDict, config: &HybridizerConfig) -> Result<GenericBackground> {
    let pro_gen = dict
        .metadata("PRO_gen", "PRO_header")?
        .ok_or_else(|| LcaioError::missing("bundle key PRO_gen"))?;
    let str_meta = match dict.metadata("STR", "STR_header")? {
        Some(t) => t,
        None => MetadataTable::empty(dict.header("STR_header")?),
    };
    let processes = LabelIndex::new(pro_gen.labels(&config.label_columns)?)?;
    let stressors = LabelIndex::new(str_meta.labels(&config.label_columns)?)?;

    let a_gen = dict.matrix_or_zeros("A_gen", &processes, &processes)?;
    let f_gen = dict.matrix_or_zeros("F_gen", &stressors, &processes)?;
    let y_gen = dict.vector_or_zeros("y_gen", &processes)?;

    let characterization = match (dict.array("C")?, dict.metadata("IMP", "IMP_header")?) {
        (Some(c), Some(imp)) => {
            let impacts = LabelIndex::new(imp.labels(&config.label_columns)?)?;
            let c = LabeledMatrix::new(impacts, stressors.clone(), c.to_matrix()?)
                .map_err(|e| e.in_matrix("C"))?;
            Some((imp, c))
        }
        (Some(_), None) => return Err(LcaioError::missing("bundle key IMP (required with C)")),
        (None, _) => None,
    };

    let generic = GenericBackground::new(
        config.label_columns.clone(),
        pro_gen,
        str_meta,
        a_gen,
        f_gen,
        y_gen,
        characterization,
    )?;
    info!(processes = processes.len(), stressors = stressors.len(), "extracted background");
    Ok(generic)
}

/// Foreground keys of the export bundle.
pub fn foreground_to_matdict(fg: &ForegroundModel) -> MatDict {
    let mut dict = MatDict::new();
    dict.insert_table("PRO_f", fg.pro_f().rows().to_vec());
    dict.insert_table("PRO_header", header_row(fg.pro_f().header()));
    dict.insert_matrix("A_ff", fg.a_ff().data());
    dict.insert_matrix("A_bf", fg.a_bf().data());
    dict.insert_table("A_bf_rows", label_table(fg.a_bf().row_index()));
    dict.insert_matrix("F_f", fg.f_f().data());
    dict.insert_table("F_f_rows", label_table(fg.f_f().row_index()));
    dict.insert_vector("y_f", fg.y_f().data());
    dict.insert_matrix("A_hyb", fg.a_hyb().data());
    dict.insert_table("A_hyb_rows", label_table(fg.a_hyb().row_index()));
    dict
}

/// Background keys of the export bundle. IO data is not exported.
pub fn background_to_matdict(bg: &BackgroundModel) -> MatDict {
    let mut dict = MatDict::new();
    let Some(generic) = bg.generic() else {
        return dict;
    };
    dict.insert_table("PRO_gen", generic.pro_gen().rows().to_vec());
    dict.insert_table("PRO_header", header_row(generic.pro_gen().header()));
    dict.insert_matrix("A_gen", generic.a_gen().data());
    dict.insert_matrix("F_gen", generic.f_gen().data());
    dict.insert_vector("y_gen", generic.y_gen().data());
    dict.insert_table("STR", generic.str_meta().rows().to_vec());
    dict.insert_table("STR_header", header_row(generic.str_meta().header()));
    if let (Some(c), Some(imp)) = (generic.c(), generic.imp()) {
        dict.insert_matrix("C", c.data());
        dict.insert_table("IMP", imp.rows().to_vec());
        dict.insert_table("IMP_header", header_row(imp.header()));
    }
    dict
}

/// Export either or both partitions into one bundle.
pub fn to_matdict(fg: Option<&ForegroundModel>, bg: Option<&BackgroundModel>) -> MatDict {
    let mut dict = MatDict::new();
    if let Some(bg) = bg {
        dict.extend(background_to_matdict(bg));
    }
    // Foreground last so its PRO_header wins when the two headers differ.
    if let Some(fg) = fg {
        dict.extend(foreground_to_matdict(fg));
    }
    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcaio_types::ErrorKind;

    fn dict() -> MatDict {
        let mut d = MatDict::new();
        d.insert_table(
            "PRO_f",
            vec![
                vec!["s+orm".into(), 10005.into(), "kg".into()],
                vec!["Batt Packing".into(), 10002.into(), "kg".into()],
            ],
        );
        let header: Vec<String> = DEFAULT_HEADER.iter().map(|h| h.to_string()).collect();
        d.insert_table("PRO_header", header_row(&header));
        d.insert_matrix("A_ff", &DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 10.0, 11.0]));
        d.insert_table(
            "PRO_gen",
            vec![
                vec!["back01".into(), 1.into(), "kg".into()],
                vec!["back02".into(), 2.into(), "kg".into()],
            ],
        );
        d.insert_matrix("A_bf", &DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]));
        d.insert_vector("y_f", &DVector::from_vec(vec![1.0, 0.0]));
        d
    }

    #[test]
    fn test_dense_array_is_row_major() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let a = DenseArray::from_matrix(&m);
        assert_eq!(a.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.to_matrix().unwrap(), m);
        let bad = DenseArray { nrows: 2, ncols: 2, data: vec![1.0] };
        assert!(bad.to_matrix().is_err());
        let huge = DenseArray { nrows: usize::MAX, ncols: 2, data: vec![] };
        assert_eq!(huge.to_matrix().unwrap_err().kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_extract_foreground_labels_rows_from_pro_gen() {
        let config = HybridizerConfig::with_label_columns(vec![1]);
        let fg = extract_foreground(&dict(), &config, None).unwrap();
        assert_eq!(fg.a_bf().get(&Label::from(2), &Label::from(10005)), Some(1.0));
        assert_eq!(fg.f_f().nrows(), 0);
        assert_eq!(fg.y_f().get(&Label::from(10005)), Some(1.0));
    }

    #[test]
    fn test_extract_foreground_without_row_labels_fails() {
        let mut d = dict();
        d.entries.remove("PRO_gen");
        let config = HybridizerConfig::with_label_columns(vec![1]);
        let err = extract_foreground(&d, &config, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingData);
    }

    #[test]
    fn test_wrong_kind_under_key() {
        let mut d = MatDict::new();
        d.insert_matrix("PRO_f", &DMatrix::zeros(1, 1));
        assert!(d.table("PRO_f").is_err());
        assert!(d.array("missing").unwrap().is_none());
    }

    #[test]
    fn test_binary_and_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["bundle.bin", "bundle.json"] {
            let path = dir.path().join(name);
            dict().save(&path).unwrap();
            assert_eq!(MatDict::load(&path).unwrap(), dict());
        }
    }

    #[test]
    fn test_load_missing_file_is_storage_error() {
        let err = MatDict::load(Path::new("/nonexistent/bundle.bin")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
