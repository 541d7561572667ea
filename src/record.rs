//! Row-level views of the trade table.
//!
//! The pipeline itself runs on polars frames; these structs are the typed
//! shapes handed to consumers and used to build frames in code.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::UnclassifiedOrders;
use crate::error::TradeError;
use crate::lookup;
use crate::schema::{derived, source};

/// One row of the source export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub year: i64,
    pub appendix: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub taxon: Option<String>,
    pub term: Option<String>,
    pub purpose: Option<String>,
    pub source: Option<String>,
    pub importer_quantity: Option<f64>,
    pub exporter_quantity: Option<f64>,
}

/// A trade record with its recoded labels and resolved quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: TradeRecord,
    pub animal_order: Option<String>,
    pub purpose_label: Option<String>,
    pub quantity: f64,
}

impl EnrichedRecord {
    /// Row-at-a-time enrichment; gives the same result as the frame pipeline.
    pub fn from_record(record: TradeRecord, unclassified: &UnclassifiedOrders) -> Self {
        let animal_order = match record.order.as_deref().and_then(lookup::animal_order_label) {
            Some(label) => Some(label.to_string()),
            None => match unclassified {
                UnclassifiedOrders::Label(label) => Some(label.clone()),
                _ => None,
            },
        };
        let purpose_label = record
            .purpose
            .as_deref()
            .map(|code| lookup::purpose_label(code).unwrap_or(code).to_string());
        let quantity = resolve_quantity(record.importer_quantity, record.exporter_quantity);

        Self {
            record,
            animal_order,
            purpose_label,
            quantity,
        }
    }
}

/// Null, malformed and negative quantities all count as zero.
fn usable_quantity(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v > 0.0 && v.is_finite() => v,
        _ => 0.0,
    }
}

/// Importer-reported quantity when nonzero, otherwise exporter-reported.
pub fn resolve_quantity(importer: Option<f64>, exporter: Option<f64>) -> f64 {
    let importer = usable_quantity(importer);
    if importer != 0.0 {
        importer
    } else {
        usable_quantity(exporter)
    }
}

// ── Frame conversion ────────────────────────────────────────────────────────

/// Build a typed trade frame (the shape `load` produces) from rows.
pub fn frame_from_records(records: &[TradeRecord]) -> Result<DataFrame, TradeError> {
    let text = |f: fn(&TradeRecord) -> &Option<String>| -> Vec<Option<String>> {
        records.iter().map(|r| f(r).clone()).collect()
    };

    let columns: Vec<Column> = vec![
        Column::new(
            source::YEAR.into(),
            records.iter().map(|r| r.year).collect::<Vec<i64>>(),
        ),
        Column::new(source::APPENDIX.into(), text(|r| &r.appendix)),
        Column::new(source::ORDER.into(), text(|r| &r.order)),
        Column::new(source::FAMILY.into(), text(|r| &r.family)),
        Column::new(source::TAXON.into(), text(|r| &r.taxon)),
        Column::new(source::TERM.into(), text(|r| &r.term)),
        Column::new(source::PURPOSE.into(), text(|r| &r.purpose)),
        Column::new(source::SOURCE.into(), text(|r| &r.source)),
        Column::new(
            source::IMPORTER_QUANTITY.into(),
            records
                .iter()
                .map(|r| r.importer_quantity)
                .collect::<Vec<Option<f64>>>(),
        ),
        Column::new(
            source::EXPORTER_QUANTITY.into(),
            records
                .iter()
                .map(|r| r.exporter_quantity)
                .collect::<Vec<Option<f64>>>(),
        ),
    ];

    Ok(DataFrame::new(columns)?)
}

/// Read trade rows back out of a frame produced by `load` or `clean`.
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<TradeRecord>, TradeError> {
    let years = df.column(source::YEAR)?.i64()?;
    let appendix = text_values(df, source::APPENDIX)?;
    let order = text_values(df, source::ORDER)?;
    let family = text_values(df, source::FAMILY)?;
    let taxon = text_values(df, source::TAXON)?;
    let term = text_values(df, source::TERM)?;
    let purpose = text_values(df, source::PURPOSE)?;
    let src = text_values(df, source::SOURCE)?;
    let importer = df.column(source::IMPORTER_QUANTITY)?.f64()?;
    let exporter = df.column(source::EXPORTER_QUANTITY)?.f64()?;

    (0..df.height())
        .map(|i| {
            let year = years
                .get(i)
                .ok_or_else(|| TradeError::InvalidData(format!("Null year at row {i}")))?;
            Ok(TradeRecord {
                year,
                appendix: appendix[i].clone(),
                order: order[i].clone(),
                family: family[i].clone(),
                taxon: taxon[i].clone(),
                term: term[i].clone(),
                purpose: purpose[i].clone(),
                source: src[i].clone(),
                importer_quantity: importer.get(i),
                exporter_quantity: exporter.get(i),
            })
        })
        .collect()
}

/// Read enriched rows out of a frame produced by `enrich`.
pub fn enriched_from_frame(df: &DataFrame) -> Result<Vec<EnrichedRecord>, TradeError> {
    let records = records_from_frame(df)?;
    let animal_order = text_values(df, derived::ANIMAL_ORDER)?;
    let purpose_label = text_values(df, derived::PURPOSE_LABEL)?;
    let quantity = df.column(derived::QUANTITY)?.f64()?;

    Ok(records
        .into_iter()
        .enumerate()
        .map(|(i, record)| EnrichedRecord {
            record,
            animal_order: animal_order[i].clone(),
            purpose_label: purpose_label[i].clone(),
            quantity: quantity.get(i).unwrap_or(0.0),
        })
        .collect())
}

fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, TradeError> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}
