//! Static taxonomy definitions.
//!
//! Definitions are the raw, human-written form of the catalogue: aliases are
//! written the way they appear in plant spreadsheets and are normalized only
//! when the registry is built. The same shape is accepted from a JSON file:
//!
//! ```json
//! {
//!   "parameters": [
//!     { "key": "boiler.coal_consumption", "parameter_name": "coal_consumption",
//!       "display_name": "Coal Consumption", "asset_category": "boiler",
//!       "value_type": "numeric", "unit": "t", "valid_range": { "min": 0 },
//!       "aliases": ["Coal Consumption", "Coal Used"] }
//!   ],
//!   "assets": [
//!     { "name": "AFBC-1", "display_name": "AFBC Boiler 1", "asset_type": "boiler",
//!       "aliases": ["AFBC 1", "Boiler 1"] }
//!   ]
//! }
//! ```

use serde::Deserialize;

use crate::domain::{ValidRange, ValueType};

#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomyDefinition {
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub assets: Vec<AssetDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterDef {
    pub key: String,
    pub parameter_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub asset_category: Option<String>,
    pub value_type: ValueType,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub valid_range: Option<ValidRange>,
    #[serde(default)]
    pub enum_values: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetDef {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

struct P {
    key: &'static str,
    name: &'static str,
    display: &'static str,
    category: Option<&'static str>,
    value_type: ValueType,
    unit: Option<&'static str>,
    range: Option<(Option<f64>, Option<f64>)>,
    enum_values: &'static [&'static str],
    aliases: &'static [&'static str],
}

const NON_NEGATIVE: Option<(Option<f64>, Option<f64>)> = Some((Some(0.0), None));

const BUILTIN_PARAMETERS: &[P] = &[
    P {
        key: "boiler.coal_consumption",
        name: "coal_consumption",
        display: "Coal Consumption",
        category: Some("boiler"),
        value_type: ValueType::Numeric,
        unit: Some("t"),
        range: NON_NEGATIVE,
        enum_values: &[],
        aliases: &["Coal Consumption", "Coal Consumed", "Coal Used", "Coal", "Coal Consump", "Fuel Coal"],
    },
    P {
        key: "boiler.steam_generation",
        name: "steam_generation",
        display: "Steam Generation",
        category: Some("boiler"),
        value_type: ValueType::Numeric,
        unit: Some("t/h"),
        range: Some((Some(0.0), Some(5000.0))),
        enum_values: &[],
        aliases: &["Steam Generation", "Steam Gen", "Steam", "Steam Flow", "Steam Output", "Main Steam Flow"],
    },
    P {
        key: "boiler.steam_pressure",
        name: "steam_pressure",
        display: "Steam Pressure",
        category: Some("boiler"),
        value_type: ValueType::Numeric,
        unit: Some("kg/cm2"),
        range: Some((Some(0.0), Some(300.0))),
        enum_values: &[],
        aliases: &["Steam Pressure", "Main Steam Pressure", "Drum Pressure", "MS Pressure"],
    },
    P {
        key: "boiler.steam_temperature",
        name: "steam_temperature",
        display: "Steam Temperature",
        category: Some("boiler"),
        value_type: ValueType::Numeric,
        unit: Some("degc"),
        range: Some((Some(0.0), Some(650.0))),
        enum_values: &[],
        aliases: &["Steam Temperature", "Main Steam Temperature", "Steam Temp", "MS Temp"],
    },
    P {
        key: "boiler.feed_water_flow",
        name: "feed_water_flow",
        display: "Feed Water Flow",
        category: Some("boiler"),
        value_type: ValueType::Numeric,
        unit: Some("m3/h"),
        range: NON_NEGATIVE,
        enum_values: &[],
        aliases: &["Feed Water Flow", "FW Flow", "Feedwater Flow", "BFW Flow"],
    },
    P {
        key: "turbine.power_generation",
        name: "power_generation",
        display: "Power Generation",
        category: Some("turbine"),
        value_type: ValueType::Numeric,
        unit: Some("mwh"),
        range: NON_NEGATIVE,
        enum_values: &[],
        aliases: &["Power Generation", "Power Gen", "Power", "Generation", "Gross Generation", "Energy Generated"],
    },
    P {
        key: "turbine.load",
        name: "turbine_load",
        display: "Turbine Load",
        category: Some("turbine"),
        value_type: ValueType::Numeric,
        unit: Some("mw"),
        range: NON_NEGATIVE,
        enum_values: &[],
        aliases: &["Turbine Load", "TG Load", "Load", "Active Load"],
    },
    P {
        key: "pump.discharge_pressure",
        name: "pump_pressure",
        display: "Pump Pressure",
        category: Some("pump"),
        value_type: ValueType::Numeric,
        unit: Some("psi"),
        range: Some((Some(0.0), Some(5000.0))),
        enum_values: &[],
        aliases: &["Pump Pressure", "Pump Pressure (psi)", "Discharge Pressure", "Pump Discharge Pressure"],
    },
    P {
        key: "pump.motor_current",
        name: "motor_current",
        display: "Motor Current",
        category: Some("pump"),
        value_type: ValueType::Numeric,
        unit: Some("a"),
        range: Some((Some(0.0), Some(5000.0))),
        enum_values: &[],
        aliases: &["Motor Current", "Motor Amps", "Current"],
    },
    P {
        key: "plant.auxiliary_power_consumption",
        name: "auxiliary_power_consumption",
        display: "Auxiliary Power Consumption",
        category: None,
        value_type: ValueType::Numeric,
        unit: Some("mwh"),
        range: NON_NEGATIVE,
        enum_values: &[],
        aliases: &["Auxiliary Power Consumption", "Aux Power", "APC", "Auxiliary Consumption"],
    },
    P {
        key: "plant.load_factor",
        name: "plant_load_factor",
        display: "Plant Load Factor",
        category: None,
        value_type: ValueType::Numeric,
        unit: Some("%"),
        range: Some((Some(0.0), Some(100.0))),
        enum_values: &[],
        aliases: &["Plant Load Factor", "PLF", "Load Factor"],
    },
    P {
        key: "plant.running_status",
        name: "running_status",
        display: "Running Status",
        category: None,
        value_type: ValueType::Enumerated,
        unit: None,
        range: None,
        enum_values: &["running", "stopped", "standby", "maintenance"],
        aliases: &["Running Status", "Status", "Operating Status", "Unit Status"],
    },
    P {
        key: "plant.trip_occurred",
        name: "trip_occurred",
        display: "Trip Occurred",
        category: None,
        value_type: ValueType::Boolean,
        unit: None,
        range: None,
        enum_values: &[],
        aliases: &["Trip Occurred", "Trip", "Tripped", "Unit Trip"],
    },
    P {
        key: "plant.operator_remarks",
        name: "operator_remarks",
        display: "Operator Remarks",
        category: None,
        value_type: ValueType::Text,
        unit: None,
        range: None,
        enum_values: &[],
        aliases: &["Operator Remarks", "Remarks", "Shift Remarks", "Operator Notes"],
    },
];

const BUILTIN_ASSETS: &[(&str, &str, &str, &[&str])] = &[
    ("AFBC-1", "AFBC Boiler 1", "boiler", &["AFBC-1", "AFBC Boiler 1", "Boiler 1", "Boiler-1"]),
    ("AFBC-2", "AFBC Boiler 2", "boiler", &["AFBC-2", "AFBC Boiler 2", "Boiler 2", "Boiler-2"]),
    ("TG-1", "Turbo Generator 1", "turbine", &["TG-1", "Turbo Generator 1", "Turbine 1", "STG 1"]),
    ("BFP-1", "Boiler Feed Pump 1", "pump", &["BFP-1", "Boiler Feed Pump 1", "Feed Pump 1", "Pump 1"]),
    ("BFP-2", "Boiler Feed Pump 2", "pump", &["BFP-2", "Boiler Feed Pump 2", "Feed Pump 2", "Pump 2"]),
];

/// The catalogue compiled into the binary.
pub fn builtin_definition() -> TaxonomyDefinition {
    let parameters = BUILTIN_PARAMETERS
        .iter()
        .map(|p| ParameterDef {
            key: p.key.to_string(),
            parameter_name: p.name.to_string(),
            display_name: Some(p.display.to_string()),
            asset_category: p.category.map(str::to_string),
            value_type: p.value_type,
            unit: p.unit.map(str::to_string),
            valid_range: p.range.map(|(min, max)| ValidRange { min, max }),
            enum_values: p.enum_values.iter().map(|s| s.to_string()).collect(),
            aliases: p.aliases.iter().map(|s| s.to_string()).collect(),
        })
        .collect();

    let assets = BUILTIN_ASSETS
        .iter()
        .map(|(name, display, kind, aliases)| AssetDef {
            name: name.to_string(),
            display_name: Some(display.to_string()),
            asset_type: Some(kind.to_string()),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        })
        .collect();

    TaxonomyDefinition { parameters, assets }
}
