//! Taxonomy registry.
//!
//! - label normalization (`normalize`)
//! - fuzzy similarity between normalized labels (`similarity`)
//! - built-in and JSON catalogue definitions (`definitions`)
//! - the validated, read-only registry with alias indexes (`registry`)

pub mod definitions;
pub mod normalize;
pub mod registry;
pub mod similarity;

pub use definitions::*;
pub use normalize::*;
pub use registry::*;
pub use similarity::*;
