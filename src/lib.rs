//! Cleaning and aggregation of CITES wildlife-trade exports.
//!
//! ```no_run
//! use cites_trade::{AggregateOptions, GroupKey, TradeRecordProcessor};
//!
//! let processor = TradeRecordProcessor::default();
//! let raw = processor.load("comptab.csv")?;
//! let enriched = processor.prepare(raw)?;
//! let by_order = processor.aggregate(
//!     &enriched,
//!     &[GroupKey::AnimalOrder],
//!     AggregateOptions::default().with_percentage(),
//! )?;
//! # Ok::<(), cites_trade::TradeError>(())
//! ```

pub mod aggregation;
pub mod config;
pub mod error;
pub mod lookup;
pub mod processor;
pub mod record;
pub mod schema;

#[cfg(feature = "python")]
mod python;

pub use aggregation::{AggregateOptions, AggregateRow, GroupKey, GroupValue};
pub use config::{ProcessorConfig, UnclassifiedOrders};
pub use error::TradeError;
pub use processor::TradeRecordProcessor;
pub use record::{EnrichedRecord, TradeRecord};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::register(m)
}
