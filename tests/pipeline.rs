//! End-to-end pipeline tests: CSV on disk → clean → enrich → aggregate.

use std::fs;

use pretty_assertions::assert_eq;
use rstest::*;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use cites_trade::record::frame_from_records;
use cites_trade::{
    AggregateOptions, GroupKey, GroupValue, ProcessorConfig, TradeError, TradeRecord,
    TradeRecordProcessor, UnclassifiedOrders,
};

const EXPORT: &str = "\
Year,App.,Taxon,Class,Order,Family,Genus,Term,Unit,Importer,Exporter,Origin,Purpose,Source,Importer reported quantity,Exporter reported quantity
2005,II,Macaca fascicularis,Mammalia,Primates,Cercopithecidae,Macaca,live,,US,ID,,T,W,5,
2005,II,Macaca fascicularis,Mammalia,Primates,Cercopithecidae,Macaca,live,,US,ID,,T,W,0,4
2006,II,Chlorocebus sabaeus,Mammalia,Primates,Cercopithecidae,Chlorocebus,live,,US,KN,,B,W,,10
2006,I,Panthera leo,Mammalia,Carnivora,Felidae,Panthera,live,,ZA,BW,,Z,W,2,3
2007,II,Rattus rattus,Mammalia,Rodentia,Muridae,Rattus,live,,GB,FR,,S,W,6,
2007,II,Pteropus vampyrus,Mammalia,Chiroptera,Pteropodidae,Pteropus,live,,US,MY,,X,W,bad,1
2008,II,Macaca mulatta,Mammalia,Primates,Cercopithecidae,Macaca,live,,CN,VN,,T,C,50,
2019,II,Macaca fascicularis,Mammalia,Primates,Cercopithecidae,Macaca,live,,US,ID,,T,W,3,
2010,II,Macaca fascicularis,Mammalia,Primates,Cercopithecidae,Macaca,live,,US,ID,,T,,7,
";

struct Fixture {
    _dir: TempDir,
    processor: TradeRecordProcessor,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[fixture]
fn fixture() -> Fixture {
    init_tracing();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("comptab.csv"), EXPORT).unwrap();
    let config = ProcessorConfig::default().with_base_path(dir.path());
    Fixture {
        _dir: dir,
        processor: TradeRecordProcessor::new(config),
    }
}

fn text(v: &str) -> GroupValue {
    GroupValue::Text(v.to_string())
}

#[rstest]
fn test_load_from_base_path(fixture: Fixture) {
    let raw = fixture.processor.load("comptab.csv").unwrap();
    assert_eq!(raw.height(), 9);
}

#[rstest]
fn test_clean_drops_incomplete_year_and_non_wild(fixture: Fixture) {
    let raw = fixture.processor.load("comptab.csv").unwrap();
    let cleaned = fixture.processor.clean(raw).unwrap();
    let records = fixture.processor.records(&cleaned).unwrap();

    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.year != 2019));
    assert!(records.iter().all(|r| r.source.as_deref() == Some("W")));
}

#[rstest]
fn test_quantity_resolution_from_csv(fixture: Fixture) {
    let raw = fixture.processor.load("comptab.csv").unwrap();
    let enriched = fixture.processor.prepare(raw).unwrap();
    let quantities: Vec<f64> = fixture
        .processor
        .enriched_records(&enriched)
        .unwrap()
        .iter()
        .map(|r| r.quantity)
        .collect();

    // importer 5; importer 0 → exporter 4; importer blank → exporter 10;
    // importer 2; importer 6; importer malformed → exporter 1
    assert_eq!(quantities, vec![5.0, 4.0, 10.0, 2.0, 6.0, 1.0]);
}

#[rstest]
fn test_aggregate_by_animal_order_keeps_unclassified_group(fixture: Fixture) {
    let raw = fixture.processor.load("comptab.csv").unwrap();
    let enriched = fixture.processor.prepare(raw).unwrap();
    let rows = fixture
        .processor
        .aggregate(
            &enriched,
            &[GroupKey::AnimalOrder],
            AggregateOptions::default().with_percentage(),
        )
        .unwrap();

    let keys: Vec<GroupValue> = rows.iter().map(|r| r.key[0].clone()).collect();
    assert_eq!(
        keys,
        vec![text("Primates"), GroupValue::Null, text("Carnivores"), text("Bats")]
    );
    assert_eq!(rows[0].quantity, 19.0);
    let pct: f64 = rows.iter().filter_map(|r| r.percentage).sum();
    assert!((pct - 100.0).abs() < 1e-9);
}

#[rstest]
#[case(UnclassifiedOrders::Drop, 3, 22.0)]
#[case(UnclassifiedOrders::Label("Unclassified".to_string()), 4, 28.0)]
#[case(UnclassifiedOrders::Keep, 4, 28.0)]
fn test_unclassified_policy(
    fixture: Fixture,
    #[case] policy: UnclassifiedOrders,
    #[case] groups: usize,
    #[case] total: f64,
) {
    let config = fixture.processor.config().clone().with_unclassified(policy);
    let processor = TradeRecordProcessor::new(config);
    let raw = processor.load("comptab.csv").unwrap();
    let enriched = processor.prepare(raw).unwrap();
    let rows = processor
        .aggregate(&enriched, &[GroupKey::AnimalOrder], AggregateOptions::default())
        .unwrap();

    assert_eq!(rows.len(), groups);
    assert_eq!(cites_trade::aggregation::grand_total(&rows), total);
}

#[rstest]
fn test_multi_key_grouping_by_name(fixture: Fixture) {
    let raw = fixture.processor.load("comptab.csv").unwrap();
    let enriched = fixture.processor.prepare(raw).unwrap();
    let rows = fixture
        .processor
        .aggregate_by_names(&enriched, &["year", "Purpose"], AggregateOptions::default())
        .unwrap();

    assert_eq!(rows[0].key, vec![GroupValue::Int(2006), text("Captive breeding")]);
    assert_eq!(rows[0].quantity, 10.0);
    assert_eq!(rows[1].key, vec![GroupValue::Int(2005), text("Commercial")]);
    assert_eq!(rows[1].quantity, 9.0);
    // unmapped purpose code passes through
    assert!(rows.iter().any(|r| r.key[1] == text("X")));
}

#[rstest]
fn test_unknown_group_key(fixture: Fixture) {
    let raw = fixture.processor.load("comptab.csv").unwrap();
    let enriched = fixture.processor.prepare(raw).unwrap();
    let err = fixture
        .processor
        .aggregate_by_names(&enriched, &["importer"], AggregateOptions::default())
        .unwrap_err();
    assert!(matches!(err, TradeError::InvalidGroupKey(_)));
    assert!(!err.is_load_error());
}

#[rstest]
fn test_drill_down_and_top_n(fixture: Fixture) {
    let raw = fixture.processor.load("comptab.csv").unwrap();
    let enriched = fixture.processor.prepare(raw).unwrap();
    let primates = fixture
        .processor
        .filter_animal_order(&enriched, "Primates")
        .unwrap();
    let rows = fixture
        .processor
        .aggregate(&primates, &[GroupKey::Taxon], AggregateOptions::default())
        .unwrap();
    let top = cites_trade::aggregation::top_n(rows, 1);

    assert_eq!(top.len(), 1);
    assert_eq!(top[0].key, vec![text("Chlorocebus sabaeus")]);
}

#[rstest]
fn test_malformed_quantity_logged_and_recovered(fixture: Fixture) {
    // runs the load/clean/enrich logging paths under an installed subscriber
    assert!(tracing::dispatcher::has_been_set());
    let raw = fixture.processor.load("comptab.csv").unwrap();
    let enriched = fixture.processor.prepare(raw).unwrap();
    let bats = fixture
        .processor
        .filter_animal_order(&enriched, "Bats")
        .unwrap();
    let rows = fixture.processor.enriched_records(&bats).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.importer_quantity, None);
    assert_eq!(rows[0].quantity, 1.0);
}

#[test]
fn test_incomplete_year_dropped_and_labels_applied() {
    let processor = TradeRecordProcessor::default();
    let base = TradeRecord {
        order: Some("Primates".to_string()),
        source: Some("W".to_string()),
        purpose: Some("T".to_string()),
        ..Default::default()
    };
    let records = vec![
        TradeRecord {
            year: 2005,
            importer_quantity: Some(5.0),
            ..base.clone()
        },
        TradeRecord {
            year: 2019,
            importer_quantity: Some(3.0),
            ..base
        },
    ];

    let cleaned = processor.clean(frame_from_records(&records).unwrap()).unwrap();
    assert_eq!(cleaned.height(), 1);

    let enriched = processor.enrich(cleaned).unwrap();
    let rows = processor.enriched_records(&enriched).unwrap();
    assert_eq!(rows[0].animal_order.as_deref(), Some("Primates"));
    assert_eq!(rows[0].purpose_label.as_deref(), Some("Commercial"));
    assert_eq!(rows[0].quantity, 5.0);
}

#[test]
fn test_null_importer_falls_back_to_exporter() {
    let processor = TradeRecordProcessor::default();
    let records = vec![TradeRecord {
        year: 2001,
        source: Some("W".to_string()),
        exporter_quantity: Some(10.0),
        ..Default::default()
    }];
    let enriched = processor
        .prepare(frame_from_records(&records).unwrap())
        .unwrap();
    assert_eq!(processor.enriched_records(&enriched).unwrap()[0].quantity, 10.0);
}

#[test]
fn test_aggregate_empty_input() {
    let processor = TradeRecordProcessor::default();
    let enriched = processor.enrich(frame_from_records(&[]).unwrap()).unwrap();

    let by_year = processor
        .aggregate(&enriched, &[GroupKey::Year], AggregateOptions::default())
        .unwrap();
    assert!(by_year.is_empty());

    let global = processor
        .aggregate(&enriched, &[], AggregateOptions::default().with_percentage())
        .unwrap();
    assert!(global.is_empty());
}

#[test]
fn test_json_export_for_charts() {
    let processor = TradeRecordProcessor::default();
    let records = vec![
        TradeRecord {
            year: 2003,
            order: Some("Sirenia".to_string()),
            source: Some("W".to_string()),
            importer_quantity: Some(1.0),
            ..Default::default()
        },
        TradeRecord {
            year: 2004,
            order: Some("Sirenia".to_string()),
            source: Some("W".to_string()),
            importer_quantity: Some(3.0),
            ..Default::default()
        },
    ];
    let enriched = processor
        .prepare(frame_from_records(&records).unwrap())
        .unwrap();
    let keys = [GroupKey::AnimalOrder];
    let rows = processor
        .aggregate(&enriched, &keys, AggregateOptions::default().with_percentage())
        .unwrap();
    let json = cites_trade::aggregation::to_json(&keys, &rows).unwrap();
    assert_eq!(
        json,
        r#"[{"animal_order":"Sea-cows","quantity":4.0,"percentage":100.0}]"#
    );
}
