//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - taxonomy entries (`TaxonomyEntry`, `AssetEntry`, `ValueType`)
//! - per-request grid and pairing types (`CellRecord`, `Candidate`)
//! - result entities and the wire envelope (`DataPoint`, `ReviewItem`, `ParseResult`, ...)
//! - engine tuning (`ParseConfig`)

pub mod types;

pub use types::*;
