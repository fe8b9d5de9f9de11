//! Per-parameter getters over a raw device record.
//!
//! Each getter is independent: `Ok(None)` means the device does not report
//! the parameter, `Err` means it reported something this crate cannot read.

use serde_json::Value;

use crate::protocol::{self, slug};
use crate::types::*;
use crate::{Error, Result};

/// Snapshot keys.
pub mod keys {
    pub const TEMPERATURE_TANK: &str = "temperature_tank";
    pub const TARGET_TEMPERATURE_TANK: &str = "target_temperature_tank";
    pub const TEMPERATURE_OUTDOOR: &str = "temperature_outdoor";
    pub const FIRMWARE_VERSION: &str = "firmware_version";
    pub const DEVICE_TYPE: &str = "device_type";
    pub const PERMANENT_HEAT_DEMAND: &str = "permanent_heat_demand";
    pub const PERMANENT_COOL_DEMAND: &str = "permanent_cool_demand";
    pub const HVAC_MODE: &str = "hvac_mode";
    pub const HOT_TANK_MIN_TEMP: &str = "hot_tank_min_temp";
    pub const HOT_TANK_MAX_TEMP: &str = "hot_tank_max_temp";
    pub const HOT_TANK_OUTDOOR_RESET: &str = "hot_tank_outdoor_reset";
    pub const COLD_TANK_MIN_TEMP: &str = "cold_tank_min_temp";
    pub const COLD_TANK_MAX_TEMP: &str = "cold_tank_max_temp";
    pub const COLD_TANK_OUTDOOR_RESET: &str = "cold_tank_outdoor_reset";
    pub const WARM_WEATHER_SHUTDOWN: &str = "warm_weather_shutdown";
    pub const COLD_WEATHER_SHUTDOWN: &str = "cold_weather_shutdown";
    pub const STAGE_ON_LAG_TIME: &str = "stage_on_lag_time";
    pub const STAGE_OFF_LAG_TIME: &str = "stage_off_lag_time";
    pub const ROTATE_CYCLES: &str = "rotate_cycles";
    pub const ROTATE_TIME: &str = "rotate_time";
    pub const OFF_STAGING: &str = "off_staging";
    pub const BACKUP_LAG_TIME: &str = "backup_lag_time";
    pub const BACKUP_DIFFERENTIAL: &str = "backup_differential";
    pub const HOT_TANK_DIFFERENTIAL: &str = "hot_tank_differential";
    pub const COLD_TANK_DIFFERENTIAL: &str = "cold_tank_differential";
    pub const BACKUP_ONLY_OUTDOOR_TEMP: &str = "backup_only_outdoor_temp";
    pub const NUMBER_OF_STAGES: &str = "number_of_stages";
    pub const BACKUP_TEMP: &str = "backup_temp";
    pub const WIDE_PRIORITY_DIFFERENTIAL: &str = "wide_priority_differential";
    pub const WEATHER_SHUTDOWN_LAG_TIME: &str = "weather_shutdown_lag_time";
    pub const TWO_STAGE_HEAT_PUMP: &str = "two_stage_heat_pump";
    pub const HEAT_COOL_SWITCH_DELAY: &str = "heat_cool_switch_delay";
    pub const BACKUP_ONLY_TANK_TEMP: &str = "backup_only_tank_temp";
    pub const HEATPUMP_STAGES: &str = "heatpump_stages";
    pub const BACKUP_STATE: &str = "backup_state";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    /// Boolean that some firmware reports as `"on"`/`"off"`.
    Toggle,
    Text,
    Priority,
    Temperature,
    OptionalTemperature,
    Delta,
    OptionalDelta,
    Count,
    OptionalCount,
    Stages,
    Backup,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ParameterSpec {
    pub key: &'static str,
    pub field: &'static str,
    kind: Kind,
}

const fn spec(key: &'static str, field: &'static str, kind: Kind) -> ParameterSpec {
    ParameterSpec { key, field, kind }
}

pub(crate) const PARAMETERS: &[ParameterSpec] = &[
    spec(keys::PERMANENT_HEAT_DEMAND, protocol::FIELD_PERMANENT_HD, Kind::Bool),
    spec(keys::PERMANENT_COOL_DEMAND, protocol::FIELD_PERMANENT_CD, Kind::Bool),
    spec(keys::HVAC_MODE, protocol::FIELD_PRIORITY, Kind::Priority),
    spec(keys::HOT_TANK_MIN_TEMP, protocol::FIELD_HOT_TANK_MIN, Kind::Temperature),
    spec(keys::HOT_TANK_MAX_TEMP, protocol::FIELD_HOT_TANK_MAX, Kind::Temperature),
    spec(keys::HOT_TANK_OUTDOOR_RESET, protocol::FIELD_HOT_TANK_RESET, Kind::OptionalTemperature),
    spec(keys::COLD_TANK_MIN_TEMP, protocol::FIELD_COLD_TANK_MIN, Kind::Temperature),
    spec(keys::COLD_TANK_MAX_TEMP, protocol::FIELD_COLD_TANK_MAX, Kind::Temperature),
    spec(keys::COLD_TANK_OUTDOOR_RESET, protocol::FIELD_COLD_TANK_RESET, Kind::OptionalTemperature),
    spec(keys::FIRMWARE_VERSION, protocol::FIELD_FIRMWARE, Kind::Text),
    spec(keys::DEVICE_TYPE, protocol::FIELD_DEVICE_TYPE, Kind::Text),
    spec(keys::WARM_WEATHER_SHUTDOWN, protocol::FIELD_WARM_WEATHER_SD, Kind::OptionalTemperature),
    spec(keys::COLD_WEATHER_SHUTDOWN, protocol::FIELD_COLD_WEATHER_SD, Kind::OptionalTemperature),
    spec(keys::HEATPUMP_STAGES, protocol::FIELD_STAGES, Kind::Stages),
    spec(keys::BACKUP_STATE, protocol::FIELD_BACKUP, Kind::Backup),
    spec(keys::STAGE_ON_LAG_TIME, protocol::FIELD_STAGE_ON_LAG, Kind::Count),
    spec(keys::STAGE_OFF_LAG_TIME, protocol::FIELD_STAGE_OFF_LAG, Kind::Count),
    spec(keys::ROTATE_CYCLES, protocol::FIELD_ROTATE_CYCLES, Kind::OptionalCount),
    spec(keys::ROTATE_TIME, protocol::FIELD_ROTATE_TIME, Kind::OptionalCount),
    spec(keys::OFF_STAGING, protocol::FIELD_OFF_STAGING, Kind::Bool),
    spec(keys::BACKUP_LAG_TIME, protocol::FIELD_BACKUP_LAG, Kind::OptionalCount),
    spec(keys::BACKUP_DIFFERENTIAL, protocol::FIELD_BACKUP_DIFF, Kind::OptionalDelta),
    spec(keys::HOT_TANK_DIFFERENTIAL, protocol::FIELD_HOT_TANK_DIFF, Kind::Delta),
    spec(keys::COLD_TANK_DIFFERENTIAL, protocol::FIELD_COLD_TANK_DIFF, Kind::Delta),
    spec(
        keys::BACKUP_ONLY_OUTDOOR_TEMP,
        protocol::FIELD_BACKUP_ONLY_OUTDOOR,
        Kind::OptionalTemperature,
    ),
    spec(keys::NUMBER_OF_STAGES, protocol::FIELD_NUMBER_OF_STAGES, Kind::Count),
    spec(keys::BACKUP_TEMP, protocol::FIELD_BACKUP_TEMP, Kind::OptionalTemperature),
    spec(keys::WIDE_PRIORITY_DIFFERENTIAL, protocol::FIELD_WIDE_PRIORITY_DIFF, Kind::Toggle),
    spec(keys::WEATHER_SHUTDOWN_LAG_TIME, protocol::FIELD_WEATHER_SD_LAG, Kind::Count),
    spec(keys::TWO_STAGE_HEAT_PUMP, protocol::FIELD_TWO_STAGE_HP, Kind::Bool),
    spec(keys::HEAT_COOL_SWITCH_DELAY, protocol::FIELD_HEAT_COOL_DELAY, Kind::Count),
    spec(keys::BACKUP_ONLY_TANK_TEMP, protocol::FIELD_BACKUP_ONLY_TANK, Kind::OptionalTemperature),
];

/// Read one parameter from a device record.
pub(crate) fn read(spec: &ParameterSpec, device: &Value) -> Result<Option<ParamValue>> {
    let raw = match device.get(spec.field) {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let bad = || Error::Protocol(format!("{}: unexpected value {raw}", spec.key));

    let value = match spec.kind {
        Kind::Bool => ParamValue::Bool(as_bool(raw).ok_or_else(bad)?),
        Kind::Toggle => {
            let on = match raw {
                Value::String(s) if s.eq_ignore_ascii_case("on") => true,
                v if protocol::is_off(v) => false,
                v => as_bool(v).ok_or_else(bad)?,
            };
            ParamValue::Bool(on)
        }
        Kind::Text => match raw {
            Value::String(s) => ParamValue::Text(s.clone()),
            Value::Number(n) => ParamValue::Text(n.to_string()),
            _ => return Err(bad()),
        },
        Kind::Priority => {
            let mode = match raw {
                v if protocol::is_off(v) => return Ok(Some(ParamValue::Off)),
                Value::Number(n) => n
                    .as_u64()
                    .map_or(HvacModePriority::Auto, HvacModePriority::from_code),
                Value::String(s) => {
                    HvacModePriority::from_str_lossy(s).unwrap_or(HvacModePriority::Auto)
                }
                Value::Bool(_) => HvacModePriority::Auto,
                _ => return Err(bad()),
            };
            ParamValue::Text(mode.as_str().to_string())
        }
        Kind::Temperature => {
            ParamValue::Temperature(Temperature::from_fahrenheit(raw.as_f64().ok_or_else(bad)?))
        }
        Kind::OptionalTemperature => optional(raw, |v| {
            v.as_f64().map(|f| ParamValue::Temperature(Temperature::from_fahrenheit(f)))
        })
        .ok_or_else(bad)?,
        Kind::Delta => {
            ParamValue::Delta(TemperatureDelta::from_fahrenheit(raw.as_f64().ok_or_else(bad)?))
        }
        Kind::OptionalDelta => optional(raw, |v| {
            v.as_f64().map(|f| ParamValue::Delta(TemperatureDelta::from_fahrenheit(f)))
        })
        .ok_or_else(bad)?,
        Kind::Count => ParamValue::Number(as_count(raw).ok_or_else(bad)?),
        Kind::OptionalCount => {
            optional(raw, |v| as_count(v).map(ParamValue::Number)).ok_or_else(bad)?
        }
        Kind::Stages => {
            let mut stages: Vec<StageState> =
                serde_json::from_value(raw.clone()).map_err(|_| bad())?;
            if stages.is_empty() {
                return Ok(None);
            }
            for stage in &mut stages {
                if stage.title.is_empty() {
                    stage.title = "Stage".to_string();
                }
            }
            ParamValue::Stages(stages)
        }
        Kind::Backup => match raw {
            Value::Bool(false) => return Ok(None),
            Value::Object(m) if m.is_empty() => return Ok(None),
            Value::Object(_) => {
                let mut state: StageState =
                    serde_json::from_value(raw.clone()).map_err(|_| bad())?;
                if state.title.is_empty() {
                    state.title = "Backup".to_string();
                }
                ParamValue::Backup(state)
            }
            _ => return Err(bad()),
        },
    };
    Ok(Some(value))
}

/// `temperature_<title>` / `target_temperature_<title>` pairs from the
/// device's temperature list.
pub(crate) fn read_temperatures(device: &Value) -> Result<Vec<(String, ParamValue)>> {
    let entries = match device.get(protocol::FIELD_TEMPERATURES) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(Error::Protocol(format!("temperatures: expected a list, got {other}")));
        }
    };

    let mut out = Vec::new();
    for entry in entries {
        let Some(title) = entry.get("title").and_then(|v| v.as_str()) else {
            continue;
        };
        let name = slug(title);
        if let Some(current) = entry.get("current").and_then(|v| v.as_f64()) {
            out.push((
                format!("temperature_{name}"),
                ParamValue::Temperature(Temperature::from_fahrenheit(current)),
            ));
        }
        if let Some(target) = entry.get("target").and_then(|v| v.as_f64()) {
            out.push((
                format!("target_temperature_{name}"),
                ParamValue::Temperature(Temperature::from_fahrenheit(target)),
            ));
        }
    }
    Ok(out)
}

fn optional(raw: &Value, on: impl FnOnce(&Value) -> Option<ParamValue>) -> Option<ParamValue> {
    if protocol::is_off(raw) {
        Some(ParamValue::Off)
    } else {
        on(raw)
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

fn as_count(v: &Value) -> Option<f64> {
    v.as_f64().filter(|f| *f >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn find(key: &str) -> &'static ParameterSpec {
        PARAMETERS.iter().find(|p| p.key == key).unwrap()
    }

    #[test]
    fn keys_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for p in PARAMETERS {
            assert!(seen.insert(p.key), "duplicate key {}", p.key);
        }
    }

    #[test]
    fn absent_field_is_unsupported() {
        let got = read(find(keys::HOT_TANK_MIN_TEMP), &json!({})).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn malformed_field_is_an_error() {
        let got = read(find(keys::HOT_TANK_MIN_TEMP), &json!({"dbt": "warm"}));
        assert!(got.is_err());
    }

    #[test]
    fn off_sentinel_decodes_for_optional_settings() {
        let got = read(find(keys::HOT_TANK_OUTDOOR_RESET), &json!({"dot": "off"})).unwrap();
        assert_eq!(got, Some(ParamValue::Off));
        let got = read(find(keys::HOT_TANK_OUTDOOR_RESET), &json!({"dot": 5})).unwrap();
        assert_eq!(got, Some(ParamValue::Temperature(Temperature::from_fahrenheit(5.0))));
    }

    #[test]
    fn off_is_not_accepted_for_plain_temperatures() {
        assert!(read(find(keys::HOT_TANK_MIN_TEMP), &json!({"dbt": "off"})).is_err());
    }

    #[test]
    fn priority_code_becomes_mode_name() {
        let got = read(find(keys::HVAC_MODE), &json!({"prior": 1})).unwrap();
        assert_eq!(got, Some(ParamValue::Text("cool".into())));
        for raw in [json!(9), json!(-1), json!(1.5), json!("2"), json!("emergency")] {
            let got = read(find(keys::HVAC_MODE), &json!({ "prior": raw })).unwrap();
            assert_eq!(got, Some(ParamValue::Text("auto".into())), "prior {raw}");
        }
    }

    #[test]
    fn priority_off_is_typed_and_objects_are_malformed() {
        let got = read(find(keys::HVAC_MODE), &json!({"prior": "OFF"})).unwrap();
        assert_eq!(got, Some(ParamValue::Off));
        assert!(read(find(keys::HVAC_MODE), &json!({"prior": {"mode": 1}})).is_err());
        assert!(read(find(keys::HVAC_MODE), &json!({"prior": [0]})).is_err());
    }

    #[test]
    fn toggle_reads_off_as_false() {
        let got = read(find(keys::WIDE_PRIORITY_DIFFERENTIAL), &json!({"wPDif": "off"})).unwrap();
        assert_eq!(got, Some(ParamValue::Bool(false)));
        let got = read(find(keys::WIDE_PRIORITY_DIFFERENTIAL), &json!({"wPDif": true})).unwrap();
        assert_eq!(got, Some(ParamValue::Bool(true)));
    }

    #[test]
    fn empty_stage_list_is_omitted() {
        let got = read(find(keys::HEATPUMP_STAGES), &json!({"stages": []})).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn stages_decode_with_runtime() {
        let dev = json!({"stages": [
            {"title": "Stage 1", "activated": true, "enabled": true, "runTime": "100:05:30"},
            {"activated": false}
        ]});
        let got = read(find(keys::HEATPUMP_STAGES), &dev).unwrap();
        let Some(ParamValue::Stages(stages)) = got else {
            panic!("expected stages");
        };
        assert_eq!(stages[0].run_time.as_deref(), Some("100:05:30"));
        assert_eq!(stages[1].title, "Stage");
    }

    #[test]
    fn falsy_backup_is_omitted() {
        let spec = find(keys::BACKUP_STATE);
        assert_eq!(read(spec, &json!({"backup": false})).unwrap(), None);
        assert_eq!(read(spec, &json!({"backup": {}})).unwrap(), None);
        let got = read(spec, &json!({"backup": {"activated": true}})).unwrap();
        assert!(matches!(got, Some(ParamValue::Backup(ref s)) if s.title == "Backup"));
    }

    #[test]
    fn temperatures_produce_current_and_target_keys() {
        let dev = json!({"temperatures": [
            {"title": "Tank", "current": 120.0, "target": 125.0},
            {"title": "Outdoor", "current": 35.0},
            {"current": 1.0}
        ]});
        let temps = read_temperatures(&dev).unwrap();
        let names: Vec<_> = temps.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["temperature_tank", "target_temperature_tank", "temperature_outdoor"]
        );
    }
}
