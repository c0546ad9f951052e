mod common;

use common::{assert_close, io_coefficient, process, sector, SECTORS};
use lcaio::{
    HybridizationRecord, HybridizeOutcome, InventoryHybridizer, Label, Quantity, SectorMatching,
};
use lcaio::LcaioError;
use lcaio_types::{ErrorKind, IdentifierKind, KeyPart};

fn batt() -> Label {
    process("Batt Packing", 10002)
}

/// Position of `(region, sector)` in the IO table.
fn io_pos(region: usize, name: &str) -> usize {
    region * SECTORS.len() + SECTORS.iter().position(|s| *s == name).unwrap()
}

fn transport_record(price: f64) -> HybridizationRecord {
    HybridizationRecord::new(batt(), sector("reg2", "transport"), price)
}

#[test]
fn test_hybridize_copies_scaled_sector_column() {
    let mut h = common::io_hybridizer();
    let outcome = h
        .hybridize_process(&transport_record(0.1).with_double_counted(Vec::<String>::new()))
        .unwrap();
    assert_eq!(outcome, HybridizeOutcome::Applied);

    let a_hyb = h.foreground().a_hyb();
    let source = io_pos(1, "transport");
    for (r, region) in ["reg1", "reg2"].iter().enumerate() {
        for name in SECTORS {
            let value = a_hyb.get(&sector(region, name), &batt()).unwrap();
            if name == "transport" {
                assert_eq!(value, 0.0, "intrasector row ({region}, {name})");
            } else {
                let expected = io_coefficient(io_pos(r, name), source) * 0.1;
                assert!((value - expected).abs() < 1e-15, "row ({region}, {name})");
            }
        }
    }
    // Generic background rows and the other process stay empty.
    assert_eq!(a_hyb.get(&process("back01", 1), &batt()), Some(0.0));
    assert_eq!(
        a_hyb.column(&process("s+orm", 10005)).unwrap().sum(),
        0.0
    );
}

#[test]
fn test_default_categories_remove_double_counting() {
    let mut h = common::io_hybridizer();
    h.hybridize_process(&transport_record(0.1)).unwrap();
    let a_hyb = h.foreground().a_hyb();
    for region in ["reg1", "reg2"] {
        for name in ["food", "mining", "electricity", "transport"] {
            assert_eq!(a_hyb.get(&sector(region, name), &batt()), Some(0.0));
        }
        assert!(a_hyb.get(&sector(region, "manufacturing"), &batt()).unwrap() > 0.0);
    }
    let entry = h
        .foreground()
        .ledger()
        .get(&batt(), &sector("reg2", "transport"))
        .unwrap();
    assert_eq!(entry.categories.len(), 2);
}

#[test]
fn test_single_category_leaves_others() {
    let mut h = common::io_hybridizer();
    h.hybridize_process(&transport_record(0.1).with_double_counted(["energy"]))
        .unwrap();
    let a_hyb = h.foreground().a_hyb();
    assert_eq!(a_hyb.get(&sector("reg1", "electricity"), &batt()), Some(0.0));
    assert!(a_hyb.get(&sector("reg1", "mining"), &batt()).unwrap() > 0.0);
}

#[test]
fn test_region_sector_matching_keeps_other_regions() {
    let mut config = common::config();
    config.sector_matching = SectorMatching::RegionSector;
    let mut h = InventoryHybridizer::new(config);
    let bundle = common::reference_bundle();
    h.extract_background_from_matdict(&bundle).unwrap();
    h.extract_io_background(&common::io_table()).unwrap();
    h.extract_foreground_from_matdict(&bundle).unwrap();
    h.match_foreground_to_background().unwrap();

    h.hybridize_process(&transport_record(1.0)).unwrap();
    let a_hyb = h.foreground().a_hyb();
    assert_eq!(a_hyb.get(&sector("reg2", "transport"), &batt()), Some(0.0));
    let expected = io_coefficient(io_pos(0, "transport"), io_pos(1, "transport"));
    assert_close(a_hyb.get(&sector("reg1", "transport"), &batt()), expected);
}

#[test]
fn test_hybridize_never_touches_stressors() {
    let mut h = common::io_hybridizer();
    let f_f = h.foreground().f_f().clone();
    let a_bf = h.foreground().a_bf().clone();
    h.hybridize_process(&transport_record(0.1)).unwrap();
    assert_eq!(h.foreground().f_f(), &f_f);
    assert_eq!(h.foreground().a_bf(), &a_bf);
}

#[test]
fn test_repeated_hybridization_is_a_no_op() {
    let mut once = common::io_hybridizer();
    once.hybridize_process(&transport_record(0.1)).unwrap();
    let mut twice = once.clone();
    let outcome = twice.hybridize_process(&transport_record(0.1)).unwrap();
    assert_eq!(outcome, HybridizeOutcome::Skipped);
    assert_eq!(twice.foreground(), once.foreground());

    // Even with a different price, without overwrite nothing changes.
    twice.hybridize_process(&transport_record(5.0)).unwrap();
    assert_eq!(twice.foreground(), once.foreground());
}

#[test]
fn test_overwrite_reflects_only_last_call() {
    let mut h = common::io_hybridizer();
    h.hybridize_process(&transport_record(0.1)).unwrap();
    let outcome = h
        .hybridize_process(&transport_record(0.2).with_overwrite(true))
        .unwrap();
    assert_eq!(outcome, HybridizeOutcome::Replaced);

    let mut fresh = common::io_hybridizer();
    fresh.hybridize_process(&transport_record(0.2)).unwrap();
    let diff = h
        .foreground()
        .a_hyb()
        .max_abs_diff(fresh.foreground().a_hyb())
        .unwrap();
    assert!(diff < 1e-15);
}

#[test]
fn test_two_sectors_accumulate_in_one_column() {
    let mut h = common::io_hybridizer();
    let outcomes = h
        .hybridize_multiple_processes(&[
            transport_record(1.0).with_double_counted(Vec::<String>::new()),
            HybridizationRecord::new(batt(), sector("reg1", "manufacturing"), 1.0)
                .with_double_counted(Vec::<String>::new()),
        ])
        .unwrap();
    assert_eq!(outcomes, vec![HybridizeOutcome::Applied, HybridizeOutcome::Applied]);
    // (reg1, food) gets the transport and the manufacturing coefficient.
    let expected = io_coefficient(io_pos(0, "food"), io_pos(1, "transport"))
        + io_coefficient(io_pos(0, "food"), io_pos(0, "manufacturing"));
    assert_close(
        h.foreground().a_hyb().get(&sector("reg1", "food"), &batt()),
        expected,
    );
    assert_eq!(h.foreground().ledger().len(), 2);
}

#[test]
fn test_bulk_hybridization_is_atomic() {
    let mut h = common::io_hybridizer();
    let before = h.foreground().clone();
    let err = h
        .hybridize_multiple_processes(&[
            transport_record(0.1),
            HybridizationRecord::new(batt(), sector("reg3", "transport"), 0.1),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
    assert_eq!(h.foreground(), &before);
}

#[test]
fn test_unknown_identifiers_are_rejected() {
    let mut h = common::io_hybridizer();
    let unknown_process =
        HybridizationRecord::new(process("ghost", 1), sector("reg2", "transport"), 0.1);
    assert_eq!(
        h.hybridize_process(&unknown_process).unwrap_err().kind(),
        ErrorKind::UnknownIdentifier
    );
    let unknown_category = transport_record(0.1).with_double_counted(["labour"]);
    let err = h.hybridize_process(&unknown_category).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
    assert!(err.to_string().contains("labour"));
    assert!(h.foreground().ledger().is_empty());
}

#[test]
fn test_negative_price_is_accepted() {
    let mut h = common::io_hybridizer();
    h.hybridize_process(&transport_record(-0.1)).unwrap();
    assert!(h
        .foreground()
        .a_hyb()
        .get(&sector("reg1", "manufacturing"), &batt())
        .unwrap()
        < 0.0);
}

#[test]
fn test_hybrid_flows_enter_the_combined_system() {
    let mut h = common::io_hybridizer();
    h.hybridize_process(&transport_record(0.1)).unwrap();
    let a = h.technology_matrix().unwrap();
    let expected = io_coefficient(io_pos(1, "manufacturing"), io_pos(1, "transport")) * 0.1;
    assert_close(a.get(&sector("reg2", "manufacturing"), &batt()), expected);

    let results = h.calc_all().unwrap();
    let x_batt = results.production.get(&batt()).unwrap();
    assert!((x_batt + 0.5).abs() < 1e-9);
    // IO sectors are produced (negatively, following Batt Packing's sign).
    let x_manu = results.production.get(&sector("reg2", "manufacturing")).unwrap();
    assert!(x_manu < 0.0);

    // Extension emissions equal F_io applied to IO production.
    let io = h.background().io().unwrap();
    let f_io = io.stressors().unwrap();
    let air = Label::from(("emission_type1", "air"));
    let expected_air: f64 = io
        .sector_index()
        .iter()
        .map(|s| f_io.get(&air, s).unwrap() * results.production.get(s).unwrap())
        .sum();
    assert_close(results.emissions.get(&air), expected_air);

    // Characterization ignores the IO extensions.
    let impacts = h.calc_lifecycle(Quantity::Impacts).unwrap();
    assert_close(impacts.get(&process("GWP100", 1)), 0.1);
}

#[test]
fn test_records_from_json() {
    let records: Vec<HybridizationRecord> = serde_json::from_str(
        r#"[{"process": ["Batt Packing", 10002], "sector": ["reg2", "transport"],
             "price_per_fu": 0.1, "double_counted": ["material"], "note": "cpa 49"}]"#,
    )
    .unwrap();
    let mut h = common::io_hybridizer();
    h.hybridize_multiple_processes(&records).unwrap();
    let entry = h
        .foreground()
        .ledger()
        .get(&batt(), &sector("reg2", "transport"))
        .unwrap();
    assert_eq!(entry.note.as_deref(), Some("cpa 49"));
}

fn with_unit(name: &str, id: i64, unit: &str) -> Label {
    Label::new([KeyPart::from(name), KeyPart::from(id), KeyPart::from(unit)])
}

#[test]
fn test_generic_process_is_not_a_sector() {
    let mut config = common::config();
    config.label_columns = vec![0, 1, -1];
    let mut h = InventoryHybridizer::new(config);
    let bundle = common::reference_bundle();
    h.extract_background_from_matdict(&bundle).unwrap();
    h.extract_foreground_from_matdict(&bundle).unwrap();
    h.match_foreground_to_background().unwrap();
    let before = h.foreground().clone();

    // back01 and back02 share the unit "kg", the last label component.
    let record = HybridizationRecord::new(
        with_unit("Batt Packing", 10002, "kg"),
        with_unit("back02", 2, "kg"),
        1.0,
    )
    .with_double_counted(Vec::<String>::new());
    match h.hybridize_process(&record).unwrap_err() {
        LcaioError::UnknownIdentifier { kind, .. } => assert_eq!(kind, IdentifierKind::Sector),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(h.foreground(), &before);
    assert_eq!(
        h.foreground().a_hyb().get(&with_unit("back01", 1, "kg"), &with_unit("Batt Packing", 10002, "kg")),
        Some(0.0)
    );
}

#[test]
fn test_generic_rows_untouched_by_io_hybridization() {
    let mut config = common::config();
    config.label_columns = vec![0, 1, -1];
    let mut h = InventoryHybridizer::new(config);
    let bundle = common::reference_bundle();
    h.extract_background_from_matdict(&bundle).unwrap();
    h.extract_io_background(&common::io_table()).unwrap();
    h.extract_foreground_from_matdict(&bundle).unwrap();
    h.match_foreground_to_background().unwrap();

    let batt = with_unit("Batt Packing", 10002, "kg");
    h.hybridize_process(
        &HybridizationRecord::new(batt.clone(), sector("reg2", "transport"), 1.0)
            .with_double_counted(Vec::<String>::new()),
    )
    .unwrap();
    let a_hyb = h.foreground().a_hyb();
    for generic in [with_unit("back01", 1, "kg"), with_unit("back02", 2, "kg")] {
        assert_eq!(a_hyb.get(&generic, &batt), Some(0.0));
    }
    let expected = io_coefficient(io_pos(0, "food"), io_pos(1, "transport"));
    assert_close(a_hyb.get(&sector("reg1", "food"), &batt), expected);
    assert_eq!(h.foreground().a_bf().get(&with_unit("back01", 1, "kg"), &batt), Some(1.0));
}

