//! The taxonomy registry: an immutable, validated catalogue of parameters
//! and assets with alias indexes.
//!
//! A registry is built once (from the built-in definitions or a JSON file)
//! before any workbook is parsed, then shared by reference. Nothing mutates
//! it afterwards, so concurrent sheet workers read it without locking.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::info;

use crate::coerce::units::unit_by_id;
use crate::domain::{AssetEntry, TaxonomyEntry, ValueType};
use crate::error::TaxonomyError;
use crate::taxonomy::definitions::{TaxonomyDefinition, builtin_definition};
use crate::taxonomy::normalize::normalize_label;
use crate::taxonomy::similarity::similarity;

#[derive(Debug)]
pub struct Taxonomy {
    entries: Vec<TaxonomyEntry>,
    display_names: Vec<String>,
    assets: Vec<AssetEntry>,
    /// normalized alias -> entry index
    alias_index: HashMap<String, usize>,
    /// (normalized alias, entry index), sorted by alias for stable fuzzy scans.
    alias_list: Vec<(String, usize)>,
    /// normalized asset alias -> asset index
    asset_index: HashMap<String, usize>,
}

impl Taxonomy {
    /// Build a registry from definitions, failing on the first defect.
    pub fn build(definition: TaxonomyDefinition) -> Result<Self, TaxonomyError> {
        let mut entries = Vec::with_capacity(definition.parameters.len());
        let mut display_names = Vec::with_capacity(definition.parameters.len());
        let mut alias_index: HashMap<String, usize> = HashMap::new();
        let mut seen_keys: BTreeSet<String> = BTreeSet::new();

        for def in definition.parameters {
            if !seen_keys.insert(def.key.clone()) {
                return Err(TaxonomyError::DuplicateKey(def.key));
            }
            if let Some(range) = def.valid_range {
                if let (Some(min), Some(max)) = (range.min, range.max) {
                    if min > max {
                        return Err(TaxonomyError::InvalidRange(def.key));
                    }
                }
            }
            if def.value_type == ValueType::Enumerated && def.enum_values.is_empty() {
                return Err(TaxonomyError::MissingEnumValues(def.key));
            }
            let unit = match def.unit {
                Some(unit) => {
                    let resolved = unit_by_id(&unit).ok_or_else(|| TaxonomyError::UnknownUnit {
                        key: def.key.clone(),
                        unit: unit.clone(),
                    })?;
                    Some(resolved.id.to_string())
                }
                None => None,
            };

            // The canonical parameter name is always an alias of its own entry.
            let mut aliases = BTreeSet::new();
            for raw in def.aliases.iter().chain(std::iter::once(&def.parameter_name)) {
                let alias = normalize_label(raw);
                if alias.is_empty() {
                    return Err(TaxonomyError::EmptyAlias(def.key.clone()));
                }
                aliases.insert(alias);
            }

            let idx = entries.len();
            for alias in &aliases {
                if let Some(&other) = alias_index.get(alias) {
                    let first: &TaxonomyEntry = &entries[other];
                    return Err(TaxonomyError::AmbiguousAlias {
                        alias: alias.clone(),
                        first: first.key.clone(),
                        second: def.key,
                    });
                }
                alias_index.insert(alias.clone(), idx);
            }

            display_names.push(def.display_name.unwrap_or_else(|| def.parameter_name.clone()));
            entries.push(TaxonomyEntry {
                key: def.key,
                asset_category: def.asset_category,
                parameter_name: def.parameter_name,
                aliases,
                value_type: def.value_type,
                unit,
                valid_range: def.valid_range,
                enum_values: def.enum_values,
            });
        }

        let mut assets = Vec::with_capacity(definition.assets.len());
        let mut asset_index: HashMap<String, usize> = HashMap::new();
        let mut seen_assets: BTreeSet<String> = BTreeSet::new();

        for def in definition.assets {
            if !seen_assets.insert(def.name.clone()) {
                return Err(TaxonomyError::DuplicateKey(def.name));
            }
            let mut aliases = BTreeSet::new();
            for raw in def.aliases.iter().chain(std::iter::once(&def.name)) {
                let alias = normalize_label(raw);
                if alias.is_empty() {
                    return Err(TaxonomyError::EmptyAlias(def.name.clone()));
                }
                aliases.insert(alias);
            }
            let idx = assets.len();
            for alias in &aliases {
                if let Some(&other) = asset_index.get(alias) {
                    let first: &AssetEntry = &assets[other];
                    return Err(TaxonomyError::AmbiguousAlias {
                        alias: alias.clone(),
                        first: first.name.clone(),
                        second: def.name,
                    });
                }
                asset_index.insert(alias.clone(), idx);
            }
            assets.push(AssetEntry {
                display_name: def.display_name.unwrap_or_else(|| def.name.clone()),
                name: def.name,
                asset_type: def.asset_type,
                aliases,
            });
        }

        let mut alias_list: Vec<(String, usize)> =
            alias_index.iter().map(|(alias, idx)| (alias.clone(), *idx)).collect();
        alias_list.sort();

        info!(
            parameters = entries.len(),
            assets = assets.len(),
            aliases = alias_list.len(),
            "taxonomy registry built"
        );

        Ok(Self {
            entries,
            display_names,
            assets,
            alias_index,
            alias_list,
            asset_index,
        })
    }

    /// The catalogue compiled into the binary.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::build(builtin_definition())
    }

    pub fn from_json_str(json: &str) -> Result<Self, TaxonomyError> {
        let definition: TaxonomyDefinition = serde_json::from_str(json)?;
        Self::build(definition)
    }

    pub fn from_json_path(path: &Path) -> Result<Self, TaxonomyError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn assets(&self) -> &[AssetEntry] {
        &self.assets
    }

    /// Human-readable name of an entry (falls back to `parameter_name`).
    pub fn display_name<'a>(&'a self, entry: &'a TaxonomyEntry) -> &'a str {
        self.entries
            .iter()
            .position(|e| e.key == entry.key)
            .and_then(|idx| self.display_names.get(idx))
            .map(String::as_str)
            .unwrap_or(entry.parameter_name.as_str())
    }

    /// Exact alias hit for an already-normalized label.
    pub fn exact(&self, normalized: &str) -> Option<&TaxonomyEntry> {
        self.alias_index.get(normalized).map(|&idx| &self.entries[idx])
    }

    /// Best entry for an already-normalized label, with its similarity.
    ///
    /// An exact alias hit scores `1.0`; anything else is the best fuzzy score
    /// over every alias (ties keep the alphabetically first alias). Returns
    /// `None` only for an empty label or an empty registry.
    pub fn lookup(&self, normalized: &str) -> Option<(&TaxonomyEntry, f64)> {
        if normalized.is_empty() {
            return None;
        }
        if let Some(entry) = self.exact(normalized) {
            return Some((entry, 1.0));
        }

        let mut best: Option<(usize, f64)> = None;
        for (alias, idx) in &self.alias_list {
            let score = similarity(normalized, alias);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((*idx, score));
            }
        }
        best.map(|(idx, score)| (&self.entries[idx], score))
    }

    /// Asset whose alias equals the normalized label.
    pub fn find_asset(&self, normalized: &str) -> Option<&AssetEntry> {
        self.asset_index.get(normalized).map(|&idx| &self.assets[idx])
    }

    /// Find the longest asset alias occurring as a contiguous token run.
    ///
    /// Returns the asset and the remaining tokens (in order) with the alias
    /// removed. Among equally long runs the leftmost wins.
    pub fn find_embedded_asset(&self, tokens: &[String]) -> Option<(&AssetEntry, Vec<String>)> {
        for len in (1..=tokens.len()).rev() {
            for start in 0..=tokens.len() - len {
                let run = tokens[start..start + len].join(" ");
                if let Some(asset) = self.find_asset(&run) {
                    let mut rest = tokens[..start].to_vec();
                    rest.extend_from_slice(&tokens[start + len..]);
                    return Some((asset, rest));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::definitions::{AssetDef, ParameterDef};

    fn param(key: &str, aliases: &[&str]) -> ParameterDef {
        ParameterDef {
            key: key.to_string(),
            parameter_name: key.to_string(),
            display_name: None,
            asset_category: None,
            value_type: ValueType::Numeric,
            unit: None,
            valid_range: None,
            enum_values: vec![],
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn builtin_catalogue_is_consistent() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert!(taxonomy.entries().len() >= 10);
        assert!(taxonomy.assets().len() >= 3);
    }

    #[test]
    fn ambiguous_alias_fails_fast() {
        let def = TaxonomyDefinition {
            parameters: vec![param("a", &["Steam Temp"]), param("b", &["steam temperature"])],
            assets: vec![],
        };
        let err = Taxonomy::build(def).unwrap_err();
        assert!(matches!(err, TaxonomyError::AmbiguousAlias { .. }), "{err}");
    }

    #[test]
    fn duplicate_key_fails_fast() {
        let def = TaxonomyDefinition {
            parameters: vec![param("a", &["x"]), param("a", &["y"])],
            assets: vec![],
        };
        assert!(matches!(Taxonomy::build(def), Err(TaxonomyError::DuplicateKey(_))));
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let mut p = param("a", &["x"]);
        p.unit = Some("furlongs".to_string());
        let def = TaxonomyDefinition {
            parameters: vec![p],
            assets: vec![],
        };
        assert!(matches!(Taxonomy::build(def), Err(TaxonomyError::UnknownUnit { .. })));
    }

    #[test]
    fn lookup_exact_scores_one() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let (entry, score) = taxonomy.lookup(&normalize_label("Pwr Gen")).unwrap();
        assert_eq!(entry.parameter_name, "power_generation");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn lookup_fuzzy_scores_below_one() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let (entry, score) = taxonomy.lookup(&normalize_label("Steam Generaton")).unwrap();
        assert_eq!(entry.parameter_name, "steam_generation");
        assert!(score > 0.9 && score < 1.0, "{score}");
    }

    #[test]
    fn embedded_asset_is_removed_from_tokens() {
        let def = TaxonomyDefinition {
            parameters: vec![param("coal", &["coal consumption"])],
            assets: vec![AssetDef {
                name: "AFBC-1".to_string(),
                display_name: None,
                asset_type: None,
                aliases: vec!["Boiler 1".to_string()],
            }],
        };
        let taxonomy = Taxonomy::build(def).unwrap();
        let tokens: Vec<String> = ["coal", "consumption", "afbc", "1"].iter().map(|s| s.to_string()).collect();
        let (asset, rest) = taxonomy.find_embedded_asset(&tokens).unwrap();
        assert_eq!(asset.name, "AFBC-1");
        assert_eq!(rest, vec!["coal".to_string(), "consumption".to_string()]);
    }

    #[test]
    fn json_definitions_are_accepted() {
        let json = r#"{
            "parameters": [
                { "key": "pump.pressure", "parameter_name": "pump_pressure",
                  "value_type": "numeric", "unit": "psi",
                  "valid_range": { "min": 0, "max": 500 },
                  "aliases": ["Pump Pressure (psi)"] }
            ]
        }"#;
        let taxonomy = Taxonomy::from_json_str(json).unwrap();
        assert_eq!(taxonomy.entries().len(), 1);
        assert!(taxonomy.exact("pump pressure psi").is_some());
    }
}
