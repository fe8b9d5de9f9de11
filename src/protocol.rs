use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://mobile.sensorlinx.co";

pub const LOGIN_PATH: &str = "/account/login";
pub const PROFILE_PATH: &str = "/account/me";
pub const BUILDINGS_PATH: &str = "/buildings";

/// Wire value of a disabled optional feature.
pub const OFF: &str = "off";
pub const REDACTED: &str = "<redacted>";

// Device record fields, one per controller parameter.
pub const FIELD_SYNC_CODE: &str = "syncCode";
pub const FIELD_ID: &str = "id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_TEMPERATURES: &str = "temperatures";
pub const FIELD_FIRMWARE: &str = "firmVer";
pub const FIELD_DEVICE_TYPE: &str = "deviceType";
pub const FIELD_PERMANENT_HD: &str = "permHD";
pub const FIELD_PERMANENT_CD: &str = "permCD";
pub const FIELD_PRIORITY: &str = "prior";
pub const FIELD_HOT_TANK_MIN: &str = "dbt";
pub const FIELD_HOT_TANK_MAX: &str = "mbt";
pub const FIELD_HOT_TANK_RESET: &str = "dot";
pub const FIELD_COLD_TANK_MIN: &str = "cdbt";
pub const FIELD_COLD_TANK_MAX: &str = "cmbt";
pub const FIELD_COLD_TANK_RESET: &str = "cdot";
pub const FIELD_WARM_WEATHER_SD: &str = "wwsd";
pub const FIELD_COLD_WEATHER_SD: &str = "cwsd";
pub const FIELD_STAGE_ON_LAG: &str = "stgOnLag";
pub const FIELD_STAGE_OFF_LAG: &str = "stgOffLag";
pub const FIELD_ROTATE_CYCLES: &str = "rotCyc";
pub const FIELD_ROTATE_TIME: &str = "rotTime";
pub const FIELD_OFF_STAGING: &str = "offStg";
pub const FIELD_BACKUP_LAG: &str = "bkLag";
pub const FIELD_BACKUP_DIFF: &str = "bkDiff";
pub const FIELD_HOT_TANK_DIFF: &str = "htDif";
pub const FIELD_COLD_TANK_DIFF: &str = "clDif";
pub const FIELD_BACKUP_ONLY_OUTDOOR: &str = "bkOdT";
pub const FIELD_NUMBER_OF_STAGES: &str = "numStg";
pub const FIELD_BACKUP_TEMP: &str = "bkTemp";
pub const FIELD_WIDE_PRIORITY_DIFF: &str = "wPDif";
pub const FIELD_WEATHER_SD_LAG: &str = "wsdLag";
pub const FIELD_TWO_STAGE_HP: &str = "twoStg";
pub const FIELD_HEAT_COOL_DELAY: &str = "hcDelay";
pub const FIELD_BACKUP_ONLY_TANK: &str = "bkTkT";
pub const FIELD_STAGES: &str = "stages";
pub const FIELD_BACKUP: &str = "backup";

pub fn login_body(email: &str, password: &str) -> Value {
    json!({
        "email": email,
        "password": password,
    })
}

pub fn token_from_login(body: &Value) -> Option<&str> {
    body.get("token")
        .or_else(|| body.pointer("/data/token"))
        .and_then(|v| v.as_str())
        .filter(|t| !t.is_empty())
}

/// Copy of a login response with the session token masked.
pub fn redact_token(body: &Value) -> Value {
    let mut body = body.clone();
    for pointer in ["/token", "/data/token"] {
        if let Some(token) = body.pointer_mut(pointer) {
            *token = Value::String(REDACTED.to_string());
        }
    }
    body
}

pub fn devices_path(building_id: &str) -> String {
    format!("{BUILDINGS_PATH}/{building_id}/devices")
}

pub fn device_path(building_id: &str, device_id: &str) -> String {
    format!("{BUILDINGS_PATH}/{building_id}/devices/{device_id}")
}

/// Body for a single-parameter write.
pub fn set_parameter_data(field: &str, value: Value) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(field.to_string(), value);
    Value::Object(body)
}

pub fn off_value() -> Value {
    Value::String(OFF.to_string())
}

pub fn is_off(value: &Value) -> bool {
    value.as_str().is_some_and(|s| s.eq_ignore_ascii_case(OFF))
}

/// Identifier used for a device record: sync code when set, else the id.
pub fn device_identifier(device: &Value) -> Option<String> {
    let non_empty = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    device
        .get(FIELD_SYNC_CODE)
        .and_then(non_empty)
        .or_else(|| device.get(FIELD_ID).and_then(non_empty))
}

/// `"Tank"` -> `"tank"`, `"Outdoor Air"` -> `"outdoor_air"`.
pub fn slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "_")
}

/// Extract a list payload that is either a bare array or wrapped in `data`.
pub fn list_payload(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_prefers_sync_code() {
        let dev = json!({"id": "fallback_id", "syncCode": "SYNC123"});
        assert_eq!(device_identifier(&dev).as_deref(), Some("SYNC123"));
    }

    #[test]
    fn identifier_falls_back_to_id() {
        let dev = json!({"id": "device_99", "syncCode": ""});
        assert_eq!(device_identifier(&dev).as_deref(), Some("device_99"));
        let dev = json!({"id": 42});
        assert_eq!(device_identifier(&dev).as_deref(), Some("42"));
        assert_eq!(device_identifier(&json!({})), None);
    }

    #[test]
    fn token_accepts_wrapped_payload() {
        assert_eq!(token_from_login(&json!({"token": "abc"})), Some("abc"));
        assert_eq!(token_from_login(&json!({"data": {"token": "xyz"}})), Some("xyz"));
        assert_eq!(token_from_login(&json!({"token": ""})), None);
    }

    #[test]
    fn redaction_masks_both_token_shapes() {
        let flat = redact_token(&json!({"token": "abc", "user": "u"}));
        assert_eq!(flat, json!({"token": REDACTED, "user": "u"}));
        let wrapped = redact_token(&json!({"data": {"token": "xyz"}}));
        assert_eq!(wrapped, json!({"data": {"token": REDACTED}}));
    }

    #[test]
    fn list_payload_unwraps_data() {
        assert_eq!(list_payload(json!([1, 2])).len(), 2);
        assert_eq!(list_payload(json!({"data": [1]})).len(), 1);
        assert!(list_payload(json!(null)).is_empty());
    }

    #[test]
    fn slug_lowercases_and_underscores() {
        assert_eq!(slug("Outdoor Air"), "outdoor_air");
    }

    #[test]
    fn off_matching_is_case_insensitive() {
        assert!(is_off(&json!("OFF")));
        assert!(!is_off(&json!(0)));
    }
}
