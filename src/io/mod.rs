//! Input/output helpers.
//!
//! - workbook ingest + grid normalization (`ingest`)
//! - result exports (JSON/CSV) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
