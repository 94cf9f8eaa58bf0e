//! `gst-recon`: GST portal vs Tally ledger reconciliation engine.
//!
//! Pure engine crate: receives parsed records and a column mapping, returns
//! exact matches, partial matches with discrepancies, and source-only records.
//! No CLI or filesystem dependencies.

pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod key;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod relational;

pub use config::ReconConfig;
pub use dates::{convert_to_standard_date, detect_date_column};
pub use engine::{reconcile, reconcile_with, ReconOptions};
pub use error::ReconError;
pub use matcher::PartialPolicy;
pub use model::{CellValue, ColumnMapping, ColumnPair, MatchResult, Record, ReconReport};
pub use normalize::normalize;
