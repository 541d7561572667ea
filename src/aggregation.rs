use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TradeError;
use crate::schema::{aggregate, derived, source};

/// Field an aggregate can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Year,
    AnimalOrder,
    Family,
    Taxon,
    /// Groups on the purpose label, not the raw code.
    Purpose,
    Appendix,
}

impl GroupKey {
    pub const ALL: [GroupKey; 6] = [
        GroupKey::Year,
        GroupKey::AnimalOrder,
        GroupKey::Family,
        GroupKey::Taxon,
        GroupKey::Purpose,
        GroupKey::Appendix,
    ];

    /// Column of the enriched frame this key reads.
    pub fn column(self) -> &'static str {
        match self {
            Self::Year => source::YEAR,
            Self::AnimalOrder => derived::ANIMAL_ORDER,
            Self::Family => source::FAMILY,
            Self::Taxon => source::TAXON,
            Self::Purpose => derived::PURPOSE_LABEL,
            Self::Appendix => source::APPENDIX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::AnimalOrder => "animal_order",
            Self::Family => "family",
            Self::Taxon => "taxon",
            Self::Purpose => "purpose",
            Self::Appendix => "appendix",
        }
    }

    /// Parse a list of key names, failing on the first unknown one.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<GroupKey>, TradeError> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl FromStr for GroupKey {
    type Err = TradeError;

    /// Accepts snake_case names as well as the column headers
    /// ("Animal order", "App.", "Purpose label"), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_end_matches('.')
            .to_lowercase()
            .replace([' ', '-'], "_");
        match normalized.as_str() {
            "year" => Ok(Self::Year),
            "animal_order" => Ok(Self::AnimalOrder),
            "family" => Ok(Self::Family),
            "taxon" => Ok(Self::Taxon),
            "purpose" | "purpose_label" => Ok(Self::Purpose),
            "appendix" | "app" => Ok(Self::Appendix),
            _ => Err(TradeError::InvalidGroupKey(s.to_string())),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One component of a group's key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GroupValue {
    Int(i64),
    Text(String),
    Null,
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for GroupValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for GroupValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A group key paired with its summed quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// One value per requested group key, in request order.
    pub key: Vec<GroupValue>,
    pub quantity: f64,
    /// Share of the grand total, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub descending: bool,
    pub with_percentage: bool,
    /// Exclude rows without an animal order label when grouping on it.
    pub drop_unclassified: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            descending: true,
            with_percentage: false,
            drop_unclassified: false,
        }
    }
}

impl AggregateOptions {
    pub fn new(descending: bool, with_percentage: bool) -> Self {
        Self {
            descending,
            with_percentage,
            ..Self::default()
        }
    }

    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }

    pub fn with_percentage(mut self) -> Self {
        self.with_percentage = true;
        self
    }

    pub fn drop_unclassified(mut self, drop: bool) -> Self {
        self.drop_unclassified = drop;
        self
    }
}

/// Group an enriched frame and sum `Quantity` per group.
///
/// Output columns: one per key (named after the key's column), `Quantity`,
/// and `Percentage` when requested. Rows are sorted on `Quantity` with a
/// stable sort, so equal sums keep first-encountered group order. An empty
/// key list yields a single global group; an empty input yields no rows.
pub fn aggregate_frame(
    enriched: &DataFrame,
    keys: &[GroupKey],
    options: AggregateOptions,
) -> Result<DataFrame, TradeError> {
    if enriched.column(derived::QUANTITY).is_err() {
        return Err(TradeError::InvalidData(format!(
            "Frame has no '{}' column; enrich it before aggregating",
            derived::QUANTITY
        )));
    }
    for key in keys {
        if enriched.column(key.column()).is_err() {
            return Err(TradeError::MissingColumn(key.column().to_string()));
        }
    }

    let drop_nulls = options.drop_unclassified && keys.contains(&GroupKey::AnimalOrder);
    let input_rows = if drop_nulls {
        enriched.height() - enriched.column(derived::ANIMAL_ORDER)?.null_count()
    } else {
        enriched.height()
    };

    let mut lazy = enriched.clone().lazy();
    if drop_nulls {
        lazy = lazy.filter(col(derived::ANIMAL_ORDER).is_not_null());
    }

    let summed = col(derived::QUANTITY).sum().alias(aggregate::QUANTITY);
    let grouped = if keys.is_empty() {
        lazy.select([summed])
    } else {
        let by: Vec<Expr> = keys.iter().map(|k| col(k.column())).collect();
        lazy.group_by_stable(by).agg([summed])
    };

    let mut grouped = grouped.sort(
        [aggregate::QUANTITY],
        SortMultipleOptions::default()
            .with_order_descending(options.descending)
            .with_maintain_order(true),
    );

    if options.with_percentage {
        let total = col(aggregate::QUANTITY).sum();
        grouped = grouped.with_column(
            when(total.clone().eq(lit(0.0)))
                .then(lit(0.0))
                .otherwise(col(aggregate::QUANTITY) / total * lit(100.0))
                .alias(aggregate::PERCENTAGE),
        );
    }

    let mut result = grouped.collect()?;
    if input_rows == 0 {
        result = result.clear();
    }

    debug!(
        keys = ?keys,
        rows = input_rows,
        groups = result.height(),
        "aggregated trade records"
    );
    Ok(result)
}

/// Convert an aggregate frame into typed rows.
pub fn rows_from_frame(
    df: &DataFrame,
    keys: &[GroupKey],
) -> Result<Vec<AggregateRow>, TradeError> {
    let key_values: Vec<Vec<GroupValue>> = keys
        .iter()
        .map(|k| key_column_values(df, *k))
        .collect::<Result<_, _>>()?;
    let quantity = df.column(aggregate::QUANTITY)?.f64()?;
    let percentage = match df.column(aggregate::PERCENTAGE) {
        Ok(c) => Some(c.f64()?),
        Err(_) => None,
    };

    Ok((0..df.height())
        .map(|i| AggregateRow {
            key: key_values.iter().map(|vals| vals[i].clone()).collect(),
            quantity: quantity.get(i).unwrap_or(0.0),
            percentage: percentage.and_then(|p| p.get(i)),
        })
        .collect())
}

fn key_column_values(df: &DataFrame, key: GroupKey) -> Result<Vec<GroupValue>, TradeError> {
    let column = df.column(key.column())?;
    match key {
        GroupKey::Year => {
            let years = column.cast(&DataType::Int64)?;
            Ok(years
                .i64()?
                .into_iter()
                .map(|v| v.map_or(GroupValue::Null, GroupValue::Int))
                .collect())
        }
        _ => Ok(column
            .str()?
            .into_iter()
            .map(|v| v.map_or(GroupValue::Null, GroupValue::from))
            .collect()),
    }
}

/// Keep the first `n` rows of an already sorted aggregate.
pub fn top_n(mut rows: Vec<AggregateRow>, n: usize) -> Vec<AggregateRow> {
    rows.truncate(n);
    rows
}

/// Sum of quantities across aggregate rows.
pub fn grand_total(rows: &[AggregateRow]) -> f64 {
    rows.iter().map(|r| r.quantity).sum()
}

/// Serialize aggregate rows as a JSON array of records keyed by group key
/// name, the shape chart renderers consume.
pub fn to_json(keys: &[GroupKey], rows: &[AggregateRow]) -> Result<String, TradeError> {
    let records: Vec<Value> = rows
        .iter()
        .map(|row| -> Result<Value, serde_json::Error> {
            let mut obj = Map::new();
            for (key, value) in keys.iter().zip(&row.key) {
                obj.insert(key.name().to_string(), serde_json::to_value(value)?);
            }
            obj.insert("quantity".to_string(), Value::from(row.quantity));
            if let Some(p) = row.percentage {
                obj.insert("percentage".to_string(), Value::from(p));
            }
            Ok(Value::Object(obj))
        })
        .collect::<Result<_, _>>()?;
    Ok(serde_json::to_string(&records)?)
}
