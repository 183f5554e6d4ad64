//! Taxonomy matching: header label -> taxonomy entry + confidence tier.
//!
//! Matching looks at the label only, never at the values below it, so the
//! same label always resolves the same way. Tiers:
//!
//! - `high`: the label (or the label with its asset/unit annotation removed)
//!   equals a registered alias
//! - `medium`: best fuzzy similarity >= `medium_threshold`
//! - `low`: best fuzzy similarity >= `low_floor`
//! - otherwise unmatched, and the label becomes an unmapped column

pub mod header;

use std::collections::HashMap;

use tracing::trace;

use crate::coerce::units::UnitDef;
use crate::domain::{AssetEntry, Confidence, ParseConfig, TaxonomyEntry};
use crate::taxonomy::{Taxonomy, normalize_label, tokens};

pub use header::*;

/// A resolved header label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelMatch<'t> {
    pub entry: &'t TaxonomyEntry,
    pub confidence: Confidence,
    pub score: f64,
    /// Asset named inside the header itself (`"Coal Consumption AFBC-1"`).
    pub asset: Option<&'t AssetEntry>,
    /// Unit annotation of the header (`"(psi)"`), applied to unitless cells.
    pub header_unit: Option<&'static UnitDef>,
}

/// Resolve one header label.
pub fn match_label<'t>(taxonomy: &'t Taxonomy, config: &ParseConfig, label: &str) -> Option<LabelMatch<'t>> {
    let full = normalize_label(label);
    if full.is_empty() {
        return None;
    }
    let (header_unit, stem) = split_header_unit(label);

    if let Some(entry) = taxonomy.exact(&full) {
        return Some(LabelMatch {
            entry,
            confidence: Confidence::High,
            score: 1.0,
            asset: None,
            header_unit,
        });
    }

    let stem_tokens = tokens(&stem);
    let (asset, core_tokens) = match taxonomy.find_embedded_asset(&stem_tokens) {
        Some((asset, rest)) => (Some(asset), rest),
        None => (None, stem_tokens),
    };
    let core = core_tokens.join(" ");

    if let Some(entry) = taxonomy.exact(&core) {
        let confidence = if units_agree(entry, header_unit) {
            Confidence::High
        } else {
            Confidence::Medium
        };
        return Some(LabelMatch {
            entry,
            confidence,
            score: 1.0,
            asset,
            header_unit,
        });
    }

    let (entry, score) = [taxonomy.lookup(&core), taxonomy.lookup(&full)]
        .into_iter()
        .flatten()
        .fold(None, |best: Option<(&TaxonomyEntry, f64)>, (entry, score)| match best {
            Some((_, s)) if s >= score => best,
            _ => Some((entry, score)),
        })?;

    let confidence = if score >= config.medium_threshold {
        Confidence::Medium
    } else if score >= config.low_floor {
        Confidence::Low
    } else {
        trace!(label, score, "label below the low floor");
        return None;
    };

    Some(LabelMatch {
        entry,
        confidence,
        score,
        asset,
        header_unit,
    })
}

/// A header unit agrees with an entry when it measures the same dimension.
fn units_agree(entry: &TaxonomyEntry, header_unit: Option<&'static UnitDef>) -> bool {
    let Some(header) = header_unit else {
        return true;
    };
    entry
        .unit
        .as_deref()
        .and_then(crate::coerce::units::unit_by_id)
        .is_some_and(|canonical| canonical.dimension == header.dimension)
}

/// The registry's canonical asset name for a grid label, else the label.
pub fn canonical_asset(taxonomy: &Taxonomy, label: &str) -> String {
    taxonomy
        .find_asset(&normalize_label(label))
        .map_or_else(|| label.trim().to_string(), |asset| asset.name.clone())
}

/// Per-sheet matcher that resolves each distinct label once.
pub struct Matcher<'t> {
    taxonomy: &'t Taxonomy,
    config: &'t ParseConfig,
    cache: HashMap<String, Option<LabelMatch<'t>>>,
}

impl<'t> Matcher<'t> {
    pub fn new(taxonomy: &'t Taxonomy, config: &'t ParseConfig) -> Self {
        Self {
            taxonomy,
            config,
            cache: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, label: &str) -> Option<LabelMatch<'t>> {
        if let Some(hit) = self.cache.get(label) {
            return *hit;
        }
        let resolved = match_label(self.taxonomy, self.config, label);
        self.cache.insert(label.to_string(), resolved);
        resolved
    }

    pub fn taxonomy(&self) -> &'t Taxonomy {
        self.taxonomy
    }
}
