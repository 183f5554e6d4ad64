//! `opsheet` library crate.
//!
//! The binary (`opsheet`) is a thin wrapper around this library so that:
//!
//! - the engine is testable without spawning processes
//! - an HTTP front-end can call `app::pipeline::parse_workbook` directly
//! - code stays easy to navigate as the project grows
//!
//! Data flows one way: `io::ingest` -> `layout` -> `matcher` -> `coerce` ->
//! `report`, with the `taxonomy` registry built once and shared read-only.

pub mod app;
pub mod cli;
pub mod coerce;
pub mod domain;
pub mod error;
pub mod io;
pub mod layout;
pub mod matcher;
pub mod report;
pub mod taxonomy;
