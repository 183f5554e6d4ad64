//! Unit catalogue and conversion table.
//!
//! Every unit belongs to one `Dimension` and is described by an affine map onto
//! that dimension's base unit: `base = value * scale + offset`. Converting
//! between two units of the same dimension goes through the base unit, which
//! keeps temperature offsets exact.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Pressure,
    Temperature,
    Mass,
    MassFlow,
    Energy,
    Power,
    VolumeFlow,
    Current,
    Ratio,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    /// Canonical id used in taxonomy definitions.
    pub id: &'static str,
    pub dimension: Dimension,
    scale: f64,
    offset: f64,
    aliases: &'static [&'static str],
}

impl UnitDef {
    const fn new(
        id: &'static str,
        dimension: Dimension,
        scale: f64,
        offset: f64,
        aliases: &'static [&'static str],
    ) -> Self {
        Self {
            id,
            dimension,
            scale,
            offset,
            aliases,
        }
    }
}

// Base units: kPa, °C, tonne, t/h, MWh, MW, m3/h, A, %.
const UNITS: &[UnitDef] = &[
    UnitDef::new("kpa", Dimension::Pressure, 1.0, 0.0, &["kpa"]),
    UnitDef::new("psi", Dimension::Pressure, 6.894_757_293_168, 0.0, &["psi", "psig", "psia", "lb/in2"]),
    UnitDef::new("bar", Dimension::Pressure, 100.0, 0.0, &["bar", "barg"]),
    UnitDef::new("mpa", Dimension::Pressure, 1000.0, 0.0, &["mpa"]),
    UnitDef::new("kg/cm2", Dimension::Pressure, 98.0665, 0.0, &["kg/cm2", "kgcm2", "ksc", "kgf/cm2"]),
    UnitDef::new("degc", Dimension::Temperature, 1.0, 0.0, &["degc", "c", "°c", "celsius", "degreesc"]),
    UnitDef::new("degf", Dimension::Temperature, 5.0 / 9.0, -160.0 / 9.0, &["degf", "f", "°f", "fahrenheit"]),
    UnitDef::new("k", Dimension::Temperature, 1.0, -273.15, &["k", "kelvin"]),
    UnitDef::new("t", Dimension::Mass, 1.0, 0.0, &["t", "mt", "ton", "tons", "tonne", "tonnes"]),
    UnitDef::new("kg", Dimension::Mass, 0.001, 0.0, &["kg", "kgs"]),
    UnitDef::new("lb", Dimension::Mass, 0.000_453_592_37, 0.0, &["lb", "lbs"]),
    UnitDef::new("t/h", Dimension::MassFlow, 1.0, 0.0, &["t/h", "t/hr", "tph", "tonne/h", "tons/hr", "mt/hr"]),
    UnitDef::new("kg/h", Dimension::MassFlow, 0.001, 0.0, &["kg/h", "kg/hr", "kgph"]),
    UnitDef::new("kg/s", Dimension::MassFlow, 3.6, 0.0, &["kg/s", "kg/sec"]),
    UnitDef::new("mwh", Dimension::Energy, 1.0, 0.0, &["mwh"]),
    UnitDef::new("kwh", Dimension::Energy, 0.001, 0.0, &["kwh"]),
    UnitDef::new("gwh", Dimension::Energy, 1000.0, 0.0, &["gwh"]),
    UnitDef::new("mw", Dimension::Power, 1.0, 0.0, &["mw"]),
    UnitDef::new("kw", Dimension::Power, 0.001, 0.0, &["kw"]),
    UnitDef::new("m3/h", Dimension::VolumeFlow, 1.0, 0.0, &["m3/h", "m3/hr", "cmh"]),
    UnitDef::new("l/s", Dimension::VolumeFlow, 3.6, 0.0, &["l/s", "lps"]),
    UnitDef::new("a", Dimension::Current, 1.0, 0.0, &["a", "amp", "amps", "ampere"]),
    UnitDef::new("ka", Dimension::Current, 1000.0, 0.0, &["ka"]),
    UnitDef::new("%", Dimension::Ratio, 1.0, 0.0, &["%", "pct", "percent"]),
];

/// Resolve a unit spelling (`"T/hr"`, `"°C"`, `"kg/cm²"`...) to its definition.
pub fn find_unit(text: &str) -> Option<&'static UnitDef> {
    let key = unit_key(text);
    if key.is_empty() {
        return None;
    }
    UNITS
        .iter()
        .find(|u| u.id == key || u.aliases.iter().any(|a| unit_key(a) == key))
}

/// Canonical unit by id, as written in taxonomy definitions.
pub fn unit_by_id(id: &str) -> Option<&'static UnitDef> {
    find_unit(id)
}

/// Convert `value` from one unit to another of the same dimension.
pub fn convert(value: f64, from: &UnitDef, to: &UnitDef) -> Option<f64> {
    if from.dimension != to.dimension {
        return None;
    }
    if from.id == to.id {
        return Some(value);
    }
    let base = value * from.scale + from.offset;
    Some((base - to.offset) / to.scale)
}

fn unit_key(text: &str) -> String {
    format!(" {} ", text.trim().to_lowercase())
        .replace(" per ", "/")
        .replace('²', "2")
        .replace('³', "3")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect()
}
