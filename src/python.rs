use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::aggregation::{to_json, top_n, AggregateOptions, GroupKey};
use crate::config::{ProcessorConfig, UnclassifiedOrders};
use crate::processor::TradeRecordProcessor;
use crate::schema;

#[pyclass(name = "TradeRecordProcessor")]
pub struct PyTradeRecordProcessor {
    inner: TradeRecordProcessor,
}

#[pymethods]
impl PyTradeRecordProcessor {
    #[new]
    #[pyo3(signature = (
        base_path = ".",
        excluded_years = None,
        source_code = None,
        unclassified_label = None,
        drop_unclassified = false,
    ))]
    fn new(
        base_path: &str,
        excluded_years: Option<Vec<i64>>,
        source_code: Option<String>,
        unclassified_label: Option<String>,
        drop_unclassified: bool,
    ) -> Self {
        let mut config = ProcessorConfig::default().with_base_path(base_path);
        if let Some(years) = excluded_years {
            config = config.with_excluded_years(years);
        }
        if let Some(code) = source_code {
            config = config.with_source_code(code);
        }
        let unclassified = match (unclassified_label, drop_unclassified) {
            (Some(label), _) => UnclassifiedOrders::Label(label),
            (None, true) => UnclassifiedOrders::Drop,
            (None, false) => UnclassifiedOrders::Keep,
        };
        Self {
            inner: TradeRecordProcessor::new(config.with_unclassified(unclassified)),
        }
    }

    fn load(&self, filename: &str) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.load(filename)?))
    }

    fn clean(&self, df: PyDataFrame) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.clean(df.0)?))
    }

    fn enrich(&self, df: PyDataFrame) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.enrich(df.0)?))
    }

    /// Clean then enrich.
    fn prepare(&self, df: PyDataFrame) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.prepare(df.0)?))
    }

    /// Sum quantity per group.
    ///
    /// Args:
    ///     group_by: key names - any of year, animal_order, family, taxon,
    ///               purpose, appendix (column headers are accepted too)
    ///     descending: sort by summed quantity, largest first (default: True)
    ///     percentage: add a Percentage column (default: False)
    ///     top: keep only the first `top` groups
    #[pyo3(signature = (df, group_by, descending = true, percentage = false, top = None))]
    fn aggregate(
        &self,
        df: PyDataFrame,
        group_by: Vec<String>,
        descending: bool,
        percentage: bool,
        top: Option<usize>,
    ) -> PyResult<PyDataFrame> {
        let keys = GroupKey::parse_all(group_by.as_slice())?;
        let options = AggregateOptions::new(descending, percentage);
        let result = self.inner.aggregate_frame(&df.0, &keys, options)?;
        Ok(PyDataFrame(match top {
            Some(n) => result.head(Some(n)),
            None => result,
        }))
    }

    /// Aggregate and return the rows as a JSON string.
    ///
    /// Takes the same arguments as `aggregate`.
    #[pyo3(signature = (df, group_by, descending = true, percentage = false, top = None))]
    fn aggregate_json(
        &self,
        df: PyDataFrame,
        group_by: Vec<String>,
        descending: bool,
        percentage: bool,
        top: Option<usize>,
    ) -> PyResult<String> {
        let keys = GroupKey::parse_all(group_by.as_slice())?;
        let options = AggregateOptions::new(descending, percentage);
        let mut rows = self.inner.aggregate(&df.0, &keys, options)?;
        if let Some(n) = top {
            rows = top_n(rows, n);
        }
        Ok(to_json(&keys, &rows)?)
    }
}

/// Register the processor class and the column-name constants.
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTradeRecordProcessor>()?;

    let columns = PyModule::new(m.py(), "columns")?;
    columns.add("YEAR", schema::source::YEAR)?;
    columns.add("APPENDIX", schema::source::APPENDIX)?;
    columns.add("ORDER", schema::source::ORDER)?;
    columns.add("FAMILY", schema::source::FAMILY)?;
    columns.add("TAXON", schema::source::TAXON)?;
    columns.add("TERM", schema::source::TERM)?;
    columns.add("PURPOSE", schema::source::PURPOSE)?;
    columns.add("SOURCE", schema::source::SOURCE)?;
    columns.add("IMPORTER_QUANTITY", schema::source::IMPORTER_QUANTITY)?;
    columns.add("EXPORTER_QUANTITY", schema::source::EXPORTER_QUANTITY)?;
    columns.add("ANIMAL_ORDER", schema::derived::ANIMAL_ORDER)?;
    columns.add("PURPOSE_LABEL", schema::derived::PURPOSE_LABEL)?;
    columns.add("QUANTITY", schema::derived::QUANTITY)?;
    columns.add("PERCENTAGE", schema::aggregate::PERCENTAGE)?;
    m.add_submodule(&columns)?;

    Ok(())
}
