#![allow(dead_code)]
//! Shared fixtures for integration tests.
//!
//! - `reference_bundle`: two foreground processes over a four-process generic
//!   background with three stressors and one impact category
//! - `io_table`: two regions by five sectors with two extensions
//! - `hybridizer`: the reference bundle loaded and aligned

use lcaio::engine::bundle::DEFAULT_HEADER;
use lcaio::{HybridizerConfig, InventoryHybridizer, IoTable, Label, LabeledVector, MatDict};
use lcaio_types::Cell;
use nalgebra::{DMatrix, DVector};

pub const REGIONS: [&str; 2] = ["reg1", "reg2"];
pub const SECTORS: [&str; 5] = ["food", "mining", "electricity", "transport", "manufacturing"];

pub fn header() -> Vec<Vec<Cell>> {
    vec![DEFAULT_HEADER.iter().map(|h| Cell::from(*h)).collect()]
}

fn meta(rows: &[(&str, i64, &str)]) -> Vec<Vec<Cell>> {
    rows.iter()
        .map(|(name, id, unit)| vec![Cell::from(*name), Cell::from(*id), Cell::from(*unit)])
        .collect()
}

/// Foreground keys only, rows of `A_bf`/`F_f` described by `PRO_gen`/`STR`.
pub fn foreground_bundle() -> MatDict {
    let mut d = MatDict::new();
    d.insert_table("PRO_f", meta(&[("s+orm", 10005, "kg"), ("Batt Packing", 10002, "kg")]));
    d.insert_table("PRO_header", header());
    d.insert_matrix("A_ff", &DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 10.0, 11.0]));
    d.insert_matrix(
        "A_bf",
        &DMatrix::from_row_slice(4, 2, &[0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
    );
    d.insert_matrix(
        "F_f",
        &DMatrix::from_row_slice(3, 2, &[0.3, 0.0, 0.1, 0.2, 0.0, 0.0]),
    );
    d.insert_vector("y_f", &DVector::from_vec(vec![1.0, 0.0]));
    d
}

pub fn background_bundle() -> MatDict {
    let mut d = MatDict::new();
    d.insert_table(
        "PRO_gen",
        meta(&[("back01", 1, "kg"), ("back02", 2, "kg"), ("back03", 3, "MJ"), ("back04", 4, "MJ")]),
    );
    d.insert_table("PRO_header", header());
    d.insert_matrix(
        "A_gen",
        &DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 2.0, 0.0, //
                1.0, 0.0, 1.0, 0.0, //
                0.0, 3.0, 0.0, 0.0,
            ],
        ),
    );
    d.insert_matrix("F_gen", &DMatrix::zeros(3, 4));
    d.insert_vector("y_gen", &DVector::zeros(4));
    d.insert_table(
        "STR",
        meta(&[("stress01", 1614, "kg"), ("stress02", 1615, "kg"), ("stress03", 1616, "kg")]),
    );
    d.insert_table("STR_header", header());
    d.insert_matrix("C", &DMatrix::from_element(1, 3, 1.0));
    d.insert_table("IMP", meta(&[("GWP100", 1, "kgCO2-eq")]));
    d.insert_table("IMP_header", header());
    d
}

pub fn reference_bundle() -> MatDict {
    let mut d = background_bundle();
    d.extend(foreground_bundle());
    d
}

/// Same generic processes, listed as 1, 5, 3, 2, 4.
pub fn bigger_background_bundle() -> MatDict {
    let mut d = background_bundle();
    d.insert_table(
        "PRO_gen",
        meta(&[
            ("back01", 1, "kg"),
            ("back05", 5, "kg"),
            ("back03", 3, "MJ"),
            ("back02", 2, "kg"),
            ("back04", 4, "MJ"),
        ]),
    );
    d.insert_matrix("A_gen", &DMatrix::zeros(5, 5));
    d.insert_matrix("F_gen", &DMatrix::zeros(3, 5));
    d.insert_vector("y_gen", &DVector::zeros(5));
    d
}

/// Generic processes 1, 3, 4 only: sector 2 is missing.
pub fn smaller_background_bundle() -> MatDict {
    let mut d = background_bundle();
    d.insert_table(
        "PRO_gen",
        meta(&[("back01", 1, "kg"), ("back03", 3, "MJ"), ("back04", 4, "MJ")]),
    );
    d.insert_matrix("A_gen", &DMatrix::zeros(3, 3));
    d.insert_matrix("F_gen", &DMatrix::zeros(3, 3));
    d.insert_vector("y_gen", &DVector::zeros(3));
    d
}

/// Operand model: one process `foo` (id 10) with demand 2.
pub fn operand_bundle() -> MatDict {
    let mut d = MatDict::new();
    d.insert_table("PRO_f", meta(&[("foo", 10, "kg")]));
    d.insert_table("PRO_header", header());
    d.insert_matrix("A_ff", &DMatrix::from_element(1, 1, 11.0));
    d.insert_matrix("A_bf", &DMatrix::from_row_slice(4, 1, &[1.0, 0.0, 0.0, 0.0]));
    d.insert_matrix("F_f", &DMatrix::from_row_slice(3, 1, &[0.0, 0.2, 0.0]));
    d.insert_vector("y_f", &DVector::from_element(1, 2.0));
    d
}

pub fn config() -> HybridizerConfig {
    HybridizerConfig::with_label_columns(vec![0, 1])
}

pub fn process(name: &str, id: i64) -> Label {
    Label::from((name, id))
}

pub fn sector(region: &str, name: &str) -> Label {
    Label::from((region, name))
}

/// Deterministic, strictly positive coefficients small enough for `(I - A)` to invert.
pub fn io_coefficient(i: usize, j: usize) -> f64 {
    ((i * 7 + j * 3) % 5 + 1) as f64 * 0.01
}

pub fn io_table() -> IoTable {
    let n = REGIONS.len() * SECTORS.len();
    let a = DMatrix::from_fn(n, n, io_coefficient);
    let emissions = DMatrix::from_fn(2, n, |k, j| (k + 1) as f64 * 0.1 * (j + 1) as f64);
    let factors = DMatrix::from_fn(1, n, |_, j| 0.5 + j as f64 * 0.01);
    IoTable::from_regions(&REGIONS, &SECTORS, a)
        .with_extension(
            "emissions",
            vec![
                Label::from(("emission_type1", "air")),
                Label::from(("emission_type2", "water")),
            ],
            emissions,
        )
        .with_extension("factor_inputs", vec![Label::from("Value Added")], factors)
}

/// Reference bundle extracted and aligned.
pub fn hybridizer() -> InventoryHybridizer {
    let mut h = InventoryHybridizer::new(config());
    let bundle = reference_bundle();
    h.extract_background_from_matdict(&bundle).unwrap();
    h.extract_foreground_from_matdict(&bundle).unwrap();
    h.match_foreground_to_background().unwrap();
    h
}

/// Reference bundle plus the IO table and two categories.
pub fn io_hybridizer() -> InventoryHybridizer {
    let mut h = InventoryHybridizer::new(config());
    let bundle = reference_bundle();
    h.extract_background_from_matdict(&bundle).unwrap();
    h.extract_io_background(&io_table()).unwrap();
    h.set_io_category("material", ["mining", "food"]);
    h.set_io_category("energy", ["electricity"]);
    h.extract_foreground_from_matdict(&bundle).unwrap();
    h.match_foreground_to_background().unwrap();
    h
}

pub fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("label missing from result");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub fn assert_vector_close(v: &LabeledVector, expected: &[(Label, f64)]) {
    assert_eq!(v.len(), expected.len(), "result length");
    for (label, value) in expected {
        assert_close(v.get(label), *value);
    }
}
