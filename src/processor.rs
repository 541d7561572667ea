use std::io::{Cursor, Read};
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregation::{self, AggregateOptions, AggregateRow, GroupKey};
use crate::config::{ProcessorConfig, UnclassifiedOrders};
use crate::error::TradeError;
use crate::lookup;
use crate::record::{self, EnrichedRecord, TradeRecord};
use crate::schema::{derived, source};

/// Load → clean → enrich → aggregate pipeline over a CITES trade export.
///
/// Every step takes a frame and returns a new one; nothing is mutated in
/// place, so one enriched frame can back any number of aggregates.
#[derive(Debug, Clone, Default)]
pub struct TradeRecordProcessor {
    config: ProcessorConfig,
}

impl TradeRecordProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load a trade export CSV, resolved against the configured base path.
    ///
    /// Required columns: Year, App., Order, Family, Taxon, Term, Purpose,
    /// Source, Importer reported quantity, Exporter reported quantity.
    /// Extra columns are kept as strings.
    pub fn load(&self, filename: impl AsRef<Path>) -> Result<DataFrame, TradeError> {
        let path = self.config.base_path.join(filename.as_ref());
        if !path.is_file() {
            return Err(TradeError::Load(format!(
                "Trade export not found: {}",
                path.display()
            )));
        }
        let raw = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()?;

        info!(path = %path.display(), rows = raw.height(), "loaded trade export");
        Self::parse_trade_frame(raw)
    }

    /// Load a trade export from any byte stream.
    pub fn load_reader<R: Read>(&self, mut reader: R) -> Result<DataFrame, TradeError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let raw = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        info!(rows = raw.height(), "loaded trade export from reader");
        Self::parse_trade_frame(raw)
    }

    // ── Cleaning ────────────────────────────────────────────────────────────

    /// Drop records from excluded years, then records whose source code is
    /// not the configured one. A null source code counts as a mismatch.
    pub fn clean(&self, records: DataFrame) -> Result<DataFrame, TradeError> {
        Self::require_columns(&records, &[source::YEAR, source::SOURCE])?;
        let before = records.height();

        let excluded = Series::new("".into(), self.config.excluded_years.as_slice());
        let not_excluded = col(source::YEAR).is_in(lit(excluded), false).not();
        let by_year = records.lazy().filter(not_excluded).collect()?;
        let after_year = by_year.height();

        let by_source = by_year
            .lazy()
            .filter(col(source::SOURCE).eq(lit(self.config.source_code.as_str())))
            .collect()?;

        info!(
            rows = before,
            excluded_year = before - after_year,
            excluded_source = after_year - by_source.height(),
            kept = by_source.height(),
            "cleaned trade records"
        );
        Ok(by_source)
    }

    // ── Enrichment ──────────────────────────────────────────────────────────

    /// Add `Animal order`, `Purpose label` and the resolved `Quantity`.
    pub fn enrich(&self, records: DataFrame) -> Result<DataFrame, TradeError> {
        Self::require_columns(
            &records,
            &[
                source::ORDER,
                source::PURPOSE,
                source::IMPORTER_QUANTITY,
                source::EXPORTER_QUANTITY,
            ],
        )?;

        let unmapped_order = match &self.config.unclassified {
            UnclassifiedOrders::Label(label) => lit(label.as_str()),
            UnclassifiedOrders::Keep | UnclassifiedOrders::Drop => {
                lit(NULL).cast(DataType::String)
            }
        };

        let df = records
            .lazy()
            .with_columns([
                lookup::recode_expr(source::ORDER, &lookup::ANIMAL_ORDERS, unmapped_order)
                    .alias(derived::ANIMAL_ORDER),
                lookup::recode_expr(source::PURPOSE, &lookup::PURPOSES, col(source::PURPOSE))
                    .alias(derived::PURPOSE_LABEL),
                resolved_quantity().alias(derived::QUANTITY),
            ])
            .collect()?;

        let unlabelled = df.column(derived::ANIMAL_ORDER)?.null_count();
        if unlabelled > 0 {
            debug!(rows = unlabelled, "records with an order outside the label lookup");
        }
        Ok(df)
    }

    /// `clean` followed by `enrich`.
    pub fn prepare(&self, records: DataFrame) -> Result<DataFrame, TradeError> {
        let cleaned = self.clean(records)?;
        self.enrich(cleaned)
    }

    /// Enriched records belonging to one animal order label.
    pub fn filter_animal_order(
        &self,
        enriched: &DataFrame,
        label: &str,
    ) -> Result<DataFrame, TradeError> {
        Self::require_columns(enriched, &[derived::ANIMAL_ORDER])?;
        Ok(enriched
            .clone()
            .lazy()
            .filter(col(derived::ANIMAL_ORDER).eq(lit(label)))
            .collect()?)
    }

    // ── Aggregation ─────────────────────────────────────────────────────────

    /// Sum quantity per group of `keys`, as a frame for chart renderers.
    pub fn aggregate_frame(
        &self,
        enriched: &DataFrame,
        keys: &[GroupKey],
        options: AggregateOptions,
    ) -> Result<DataFrame, TradeError> {
        aggregation::aggregate_frame(enriched, keys, self.effective_options(options))
    }

    /// Sum quantity per group of `keys`, as typed rows.
    pub fn aggregate(
        &self,
        enriched: &DataFrame,
        keys: &[GroupKey],
        options: AggregateOptions,
    ) -> Result<Vec<AggregateRow>, TradeError> {
        let df = self.aggregate_frame(enriched, keys, options)?;
        aggregation::rows_from_frame(&df, keys)
    }

    /// Like [`aggregate`](Self::aggregate), with keys given by name.
    pub fn aggregate_by_names<S: AsRef<str>>(
        &self,
        enriched: &DataFrame,
        names: &[S],
        options: AggregateOptions,
    ) -> Result<Vec<AggregateRow>, TradeError> {
        let keys = GroupKey::parse_all(names)?;
        self.aggregate(enriched, &keys, options)
    }

    fn effective_options(&self, options: AggregateOptions) -> AggregateOptions {
        let drop = options.drop_unclassified
            || self.config.unclassified == UnclassifiedOrders::Drop;
        options.drop_unclassified(drop)
    }

    // ── Row views ───────────────────────────────────────────────────────────

    pub fn records(&self, df: &DataFrame) -> Result<Vec<TradeRecord>, TradeError> {
        record::records_from_frame(df)
    }

    pub fn enriched_records(&self, df: &DataFrame) -> Result<Vec<EnrichedRecord>, TradeError> {
        record::enriched_from_frame(df)
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

impl TradeRecordProcessor {
    /// Type a raw all-string frame: trim headers and values, blank → null,
    /// `Year` to Int64 (must parse), quantities to Float64 (malformed → null).
    fn parse_trade_frame(mut df: DataFrame) -> Result<DataFrame, TradeError> {
        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed.as_slice())?;

        Self::require_columns(&df, &source::REQUIRED)?;

        let mut exprs: Vec<Expr> = source::TEXT.iter().map(|c| stripped_expr(c)).collect();
        exprs.push(stripped_expr(source::YEAR));
        exprs.push(stripped_expr(source::IMPORTER_QUANTITY));
        exprs.push(stripped_expr(source::EXPORTER_QUANTITY));
        let df = df.lazy().with_columns(exprs).collect()?;

        let raw_nulls = |df: &DataFrame, c: &str| -> Result<usize, TradeError> {
            Ok(df.column(c)?.null_count())
        };
        let year_nulls = raw_nulls(&df, source::YEAR)?;
        let importer_nulls = raw_nulls(&df, source::IMPORTER_QUANTITY)?;
        let exporter_nulls = raw_nulls(&df, source::EXPORTER_QUANTITY)?;

        let df = df
            .lazy()
            .with_columns([
                col(source::YEAR).cast(DataType::Int64),
                col(source::IMPORTER_QUANTITY).cast(DataType::Float64),
                col(source::EXPORTER_QUANTITY).cast(DataType::Float64),
            ])
            .collect()?;

        let bad_years = df.column(source::YEAR)?.null_count();
        if bad_years > 0 {
            return Err(TradeError::Load(format!(
                "{} rows have a missing or unparsable {} ({} blank)",
                bad_years,
                source::YEAR,
                year_nulls
            )));
        }

        let malformed = (df.column(source::IMPORTER_QUANTITY)?.null_count() - importer_nulls)
            + (df.column(source::EXPORTER_QUANTITY)?.null_count() - exporter_nulls);
        if malformed > 0 {
            warn!(
                values = malformed,
                "unparsable reported quantities treated as missing"
            );
        }

        Ok(df)
    }

    fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), TradeError> {
        for &col_name in required {
            if df.column(col_name).is_err() {
                return Err(TradeError::MissingColumn(col_name.to_string()));
            }
        }
        Ok(())
    }
}

/// Trim whitespace; an empty string becomes null.
fn stripped_expr(column: &str) -> Expr {
    let value = col(column).str().strip_chars(lit(" \t\r\n"));
    when(value.clone().eq(lit("")))
        .then(lit(NULL).cast(DataType::String))
        .otherwise(value)
        .alias(column)
}

/// A reported quantity usable for resolution: positive and finite, else 0.
fn usable_quantity(column: &str) -> Expr {
    let q = col(column).cast(DataType::Float64);
    when(
        q.clone()
            .gt(lit(0.0))
            .and(q.clone().lt(lit(f64::INFINITY))),
    )
    .then(q)
    .otherwise(lit(0.0))
}

/// Importer-reported quantity when nonzero, otherwise exporter-reported.
fn resolved_quantity() -> Expr {
    let importer = usable_quantity(source::IMPORTER_QUANTITY);
    when(importer.clone().neq(lit(0.0)))
        .then(importer)
        .otherwise(usable_quantity(source::EXPORTER_QUANTITY))
}
