use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::{Building, ParamValue, StageState};

pub type Parameters = BTreeMap<String, ParamValue>;

/// Everything one poll learned. Replaced wholesale by the next poll.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub profile: Value,
    pub buildings: Vec<Building>,
    pub devices: BTreeMap<String, DeviceSnapshot>,
}

impl Snapshot {
    pub fn device(&self, id: &str) -> Option<&DeviceSnapshot> {
        self.devices.get(id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeviceSnapshot {
    pub id: String,
    pub name: Option<String>,
    pub device_type: Option<String>,
    /// Building the device was listed under; writes go through it.
    pub building_id: String,
    /// Only keys the device reported and that decoded cleanly.
    pub parameters: Parameters,
    /// Keys the device reported but that failed to decode.
    pub failed_parameters: Vec<String>,
}

impl DeviceSnapshot {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn has(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    pub fn stages(&self, key: &str) -> &[StageState] {
        match self.parameters.get(key) {
            Some(ParamValue::Stages(stages)) => stages,
            _ => &[],
        }
    }

    pub fn backup(&self, key: &str) -> Option<&StageState> {
        match self.parameters.get(key) {
            Some(ParamValue::Backup(state)) => Some(state),
            _ => None,
        }
    }

    pub fn firmware_version(&self) -> Option<&str> {
        self.get(crate::parameters::keys::FIRMWARE_VERSION)
            .and_then(ParamValue::as_str)
    }
}

pub(crate) fn building_from_record(record: &Value) -> Option<Building> {
    let id = match record.get("id")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let name = record.get("name").and_then(|v| v.as_str()).map(str::to_string);
    Some(Building { id, name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_name_falls_back_to_id() {
        let dev = DeviceSnapshot {
            id: "ABC123".into(),
            ..Default::default()
        };
        assert_eq!(dev.display_name(), "ABC123");
    }

    #[test]
    fn building_ids_accept_numbers() {
        let b = building_from_record(&json!({"id": 7, "name": "Shop"})).unwrap();
        assert_eq!(b.id, "7");
        assert_eq!(b.name.as_deref(), Some("Shop"));
        assert!(building_from_record(&json!({"name": "no id"})).is_none());
    }
}
