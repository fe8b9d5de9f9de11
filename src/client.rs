use std::sync::{Mutex, RwLock};

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::api::SensorLinxApi;
use crate::config::Config;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{self, DEFAULT_BASE_URL};
use crate::types::*;
use crate::{Error, Result};

/// Accepted value ranges, in the controller's native units.
pub mod limits {
    pub const TANK_TEMP: (f64, f64) = (35.0, 200.0);
    pub const OUTDOOR_RESET: (f64, f64) = (-40.0, 127.0);
    pub const WARM_WEATHER_SHUTDOWN: (f64, f64) = (34.0, 180.0);
    pub const COLD_WEATHER_SHUTDOWN: (f64, f64) = (33.0, 119.0);
    pub const LAG_TIME: (f64, f64) = (1.0, 240.0);
    pub const DIFFERENTIAL: (f64, f64) = (2.0, 100.0);
    pub const BACKUP_ONLY_OUTDOOR: (f64, f64) = (-40.0, 127.0);
    pub const NUMBER_OF_STAGES: (f64, f64) = (1.0, 4.0);
    pub const BACKUP_TEMP: (f64, f64) = (2.0, 100.0);
    pub const WEATHER_SHUTDOWN_LAG: (f64, f64) = (0.0, 240.0);
    pub const HEAT_COOL_SWITCH_DELAY: (f64, f64) = (30.0, 600.0);
    pub const BACKUP_ONLY_TANK: (f64, f64) = (33.0, 200.0);
}

pub struct SensorLinxBuilder {
    base_url: String,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl SensorLinxBuilder {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            log_mode: None,
            log_path: None,
        }
    }

    /// Base URL and message log taken from a [`Config`].
    pub fn from_config(config: &Config) -> Self {
        let builder = Self::new().base_url(config.base_url.clone());
        match &config.message_log {
            Some(log) => builder.message_log(log.mode, log.path.clone()),
            None => builder,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SensorLinx> {
        let http = reqwest::Client::builder().build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        Ok(SensorLinx {
            http,
            base_url: self.base_url,
            token: RwLock::new(None),
            logger: Mutex::new(logger),
        })
    }
}

impl Default for SensorLinxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client for the SensorLinx cloud.
pub struct SensorLinx {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    logger: Mutex<Option<MessageLogger>>,
}

impl SensorLinx {
    pub fn builder() -> SensorLinxBuilder {
        SensorLinxBuilder::new()
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    fn bearer(&self) -> Result<String> {
        self.token
            .read()
            .ok()
            .and_then(|t| t.clone())
            .ok_or(Error::NotLoggedIn)
    }

    fn log_request(&self, method: &Method, path: &str, body: Option<&Value>) -> Option<String> {
        let mut guard = self.logger.lock().ok()?;
        let logger = guard.as_mut()?;
        Some(logger.log_request(method.as_str(), path, body))
    }

    fn log_response(&self, id: Option<&str>, path: &str, status: u16, body: &Value) {
        if let (Some(id), Ok(mut guard)) = (id, self.logger.lock())
            && let Some(logger) = guard.as_mut()
        {
            logger.log_response(id, path, status, body);
        }
    }

    fn log_command(&self, device: &str, field: &str, body: &Value) {
        if let Ok(mut guard) = self.logger.lock()
            && let Some(logger) = guard.as_mut()
        {
            logger.log_command(device, field, body);
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authenticated: bool,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        trace!(%method, url = %url, "sending request");

        // Unauthenticated traffic is the login exchange: the request carries the
        // password and the response the session token.
        let log_id = self.log_request(&method, path, body.filter(|_| authenticated));

        let mut req = self.http.request(method, &url);
        if authenticated {
            req = req.bearer_auth(self.bearer()?);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();

        match status {
            401 | 403 => {
                debug!(status, path, "request rejected as unauthorized");
                self.log_response(log_id.as_deref(), path, status, &Value::Null);
                return Err(Error::Unauthorized);
            }
            s if !(200..300).contains(&s) => {
                let message = resp.text().await.unwrap_or_default();
                self.log_response(log_id.as_deref(), path, status, &json!(message));
                return Err(Error::Api { status, message });
            }
            _ => {}
        }

        let text = resp.text().await?;
        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| Error::Protocol(format!("invalid JSON from {path}: {e}")))?
        };
        if authenticated {
            self.log_response(log_id.as_deref(), path, status, &value);
        } else {
            let redacted = protocol::redact_token(&value);
            self.log_response(log_id.as_deref(), path, status, &redacted);
        }
        Ok(value)
    }
}

impl SensorLinxApi for SensorLinx {
    async fn login(&self, username: &str, password: &str) -> Result<()> {
        debug!(username, "logging in");
        let body = protocol::login_body(username, password);
        let resp = self.send(Method::POST, protocol::LOGIN_PATH, Some(&body), false).await?;
        let token = protocol::token_from_login(&resp)
            .ok_or_else(|| Error::Protocol("login response has no token".to_string()))?
            .to_string();
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token);
        }
        Ok(())
    }

    async fn profile(&self) -> Result<Option<Value>> {
        let resp = self.send(Method::GET, protocol::PROFILE_PATH, None, true).await?;
        Ok(match resp {
            Value::Null => None,
            Value::Object(ref m) if m.is_empty() => None,
            other => Some(other),
        })
    }

    async fn buildings(&self) -> Result<Vec<Value>> {
        let resp = self.send(Method::GET, protocol::BUILDINGS_PATH, None, true).await?;
        Ok(protocol::list_payload(resp))
    }

    async fn devices(&self, building_id: &str) -> Result<Vec<Value>> {
        let path = protocol::devices_path(building_id);
        let resp = self.send(Method::GET, &path, None, true).await?;
        Ok(protocol::list_payload(resp))
    }

    async fn write_parameter(
        &self,
        building_id: &str,
        device_id: &str,
        field: &'static str,
        value: Value,
    ) -> Result<()> {
        let path = protocol::device_path(building_id, device_id);
        let body = protocol::set_parameter_data(field, value);
        self.log_command(device_id, field, &body);
        self.send(Method::PATCH, &path, Some(&body), true).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!("closing SensorLinx session");
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
        if let Ok(mut guard) = self.logger.lock()
            && let Some(logger) = guard.as_mut()
        {
            logger.flush();
        }
        Ok(())
    }
}

/// Write handle for one device. Every setter validates before sending.
pub struct Device<'a, A: SensorLinxApi> {
    api: &'a A,
    building_id: String,
    device_id: String,
}

impl<'a, A: SensorLinxApi> Device<'a, A> {
    pub fn new(api: &'a A, building_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            api,
            building_id: building_id.into(),
            device_id: device_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.device_id
    }

    pub fn building_id(&self) -> &str {
        &self.building_id
    }

    async fn write(&self, field: &'static str, value: Value) -> Result<()> {
        debug!(device = %self.device_id, field, %value, "writing parameter");
        self.api
            .write_parameter(&self.building_id, &self.device_id, field, value)
            .await
    }

    // -- Tanks --

    pub async fn set_hot_tank_min_temp(&self, temp: Temperature) -> Result<()> {
        let v = temperature("hot_tank_min_temp", temp, limits::TANK_TEMP)?;
        self.write(protocol::FIELD_HOT_TANK_MIN, v).await
    }

    pub async fn set_hot_tank_max_temp(&self, temp: Temperature) -> Result<()> {
        let v = temperature("hot_tank_max_temp", temp, limits::TANK_TEMP)?;
        self.write(protocol::FIELD_HOT_TANK_MAX, v).await
    }

    /// Fixed target: with outdoor reset off the controller expects min == max.
    pub async fn set_hot_tank_target_temp(&self, temp: Temperature) -> Result<()> {
        self.set_hot_tank_min_temp(temp).await?;
        self.set_hot_tank_max_temp(temp).await
    }

    pub async fn set_hot_tank_outdoor_reset(&self, setting: Setting<Temperature>) -> Result<()> {
        let v = setting_value(setting, |t| {
            temperature("hot_tank_outdoor_reset", t, limits::OUTDOOR_RESET)
        })?;
        self.write(protocol::FIELD_HOT_TANK_RESET, v).await
    }

    pub async fn set_cold_tank_min_temp(&self, temp: Temperature) -> Result<()> {
        let v = temperature("cold_tank_min_temp", temp, limits::TANK_TEMP)?;
        self.write(protocol::FIELD_COLD_TANK_MIN, v).await
    }

    pub async fn set_cold_tank_max_temp(&self, temp: Temperature) -> Result<()> {
        let v = temperature("cold_tank_max_temp", temp, limits::TANK_TEMP)?;
        self.write(protocol::FIELD_COLD_TANK_MAX, v).await
    }

    pub async fn set_cold_tank_target_temp(&self, temp: Temperature) -> Result<()> {
        self.set_cold_tank_min_temp(temp).await?;
        self.set_cold_tank_max_temp(temp).await
    }

    pub async fn set_cold_tank_outdoor_reset(&self, setting: Setting<Temperature>) -> Result<()> {
        let v = setting_value(setting, |t| {
            temperature("cold_tank_outdoor_reset", t, limits::OUTDOOR_RESET)
        })?;
        self.write(protocol::FIELD_COLD_TANK_RESET, v).await
    }

    pub async fn set_hot_tank_differential(&self, delta: TemperatureDelta) -> Result<()> {
        let v = differential("hot_tank_differential", delta)?;
        self.write(protocol::FIELD_HOT_TANK_DIFF, v).await
    }

    pub async fn set_cold_tank_differential(&self, delta: TemperatureDelta) -> Result<()> {
        let v = differential("cold_tank_differential", delta)?;
        self.write(protocol::FIELD_COLD_TANK_DIFF, v).await
    }

    // -- Demand and mode --

    pub async fn set_permanent_heat_demand(&self, on: bool) -> Result<()> {
        self.write(protocol::FIELD_PERMANENT_HD, json!(on)).await
    }

    pub async fn set_permanent_cool_demand(&self, on: bool) -> Result<()> {
        self.write(protocol::FIELD_PERMANENT_CD, json!(on)).await
    }

    pub async fn set_hvac_mode_priority(&self, mode: HvacModePriority) -> Result<()> {
        self.write(protocol::FIELD_PRIORITY, json!(mode.code())).await
    }

    // -- Weather shutdown --

    pub async fn set_warm_weather_shutdown(&self, setting: Setting<Temperature>) -> Result<()> {
        let v = setting_value(setting, |t| {
            temperature("warm_weather_shutdown", t, limits::WARM_WEATHER_SHUTDOWN)
        })?;
        self.write(protocol::FIELD_WARM_WEATHER_SD, v).await
    }

    pub async fn set_cold_weather_shutdown(&self, setting: Setting<Temperature>) -> Result<()> {
        let v = setting_value(setting, |t| {
            temperature("cold_weather_shutdown", t, limits::COLD_WEATHER_SHUTDOWN)
        })?;
        self.write(protocol::FIELD_COLD_WEATHER_SD, v).await
    }

    pub async fn set_weather_shutdown_lag_time(&self, hours: u32) -> Result<()> {
        let v = count("weather_shutdown_lag_time", hours, limits::WEATHER_SHUTDOWN_LAG)?;
        self.write(protocol::FIELD_WEATHER_SD_LAG, v).await
    }

    // -- Staging --

    pub async fn set_stage_on_lag_time(&self, minutes: u32) -> Result<()> {
        let v = count("stage_on_lag_time", minutes, limits::LAG_TIME)?;
        self.write(protocol::FIELD_STAGE_ON_LAG, v).await
    }

    pub async fn set_stage_off_lag_time(&self, seconds: u32) -> Result<()> {
        let v = count("stage_off_lag_time", seconds, limits::LAG_TIME)?;
        self.write(protocol::FIELD_STAGE_OFF_LAG, v).await
    }

    pub async fn set_rotate_cycles(&self, setting: Setting<u32>) -> Result<()> {
        let v = setting_value(setting, |n| count("rotate_cycles", n, limits::LAG_TIME))?;
        self.write(protocol::FIELD_ROTATE_CYCLES, v).await
    }

    pub async fn set_rotate_time(&self, setting: Setting<u32>) -> Result<()> {
        let v = setting_value(setting, |n| count("rotate_time", n, limits::LAG_TIME))?;
        self.write(protocol::FIELD_ROTATE_TIME, v).await
    }

    pub async fn set_off_staging(&self, on: bool) -> Result<()> {
        self.write(protocol::FIELD_OFF_STAGING, json!(on)).await
    }

    pub async fn set_number_of_stages(&self, stages: u8) -> Result<()> {
        let v = count("number_of_stages", u32::from(stages), limits::NUMBER_OF_STAGES)?;
        self.write(protocol::FIELD_NUMBER_OF_STAGES, v).await
    }

    pub async fn set_two_stage_heat_pump(&self, on: bool) -> Result<()> {
        self.write(protocol::FIELD_TWO_STAGE_HP, json!(on)).await
    }

    pub async fn set_heat_cool_switch_delay(&self, seconds: u32) -> Result<()> {
        let v = count("heat_cool_switch_delay", seconds, limits::HEAT_COOL_SWITCH_DELAY)?;
        self.write(protocol::FIELD_HEAT_COOL_DELAY, v).await
    }

    pub async fn set_wide_priority_differential(&self, on: bool) -> Result<()> {
        self.write(protocol::FIELD_WIDE_PRIORITY_DIFF, json!(on)).await
    }

    // -- Backup heater --

    pub async fn set_backup_lag_time(&self, setting: Setting<u32>) -> Result<()> {
        let v = setting_value(setting, |n| count("backup_lag_time", n, limits::LAG_TIME))?;
        self.write(protocol::FIELD_BACKUP_LAG, v).await
    }

    pub async fn set_backup_differential(&self, setting: Setting<TemperatureDelta>) -> Result<()> {
        let v = setting_value(setting, |d| differential("backup_differential", d))?;
        self.write(protocol::FIELD_BACKUP_DIFF, v).await
    }

    pub async fn set_backup_only_outdoor_temp(&self, setting: Setting<Temperature>) -> Result<()> {
        let v = setting_value(setting, |t| {
            temperature("backup_only_outdoor_temp", t, limits::BACKUP_ONLY_OUTDOOR)
        })?;
        self.write(protocol::FIELD_BACKUP_ONLY_OUTDOOR, v).await
    }

    pub async fn set_backup_temp(&self, setting: Setting<Temperature>) -> Result<()> {
        let v = setting_value(setting, |t| temperature("backup_temp", t, limits::BACKUP_TEMP))?;
        self.write(protocol::FIELD_BACKUP_TEMP, v).await
    }

    pub async fn set_backup_only_tank_temp(&self, setting: Setting<Temperature>) -> Result<()> {
        let v = setting_value(setting, |t| {
            temperature("backup_only_tank_temp", t, limits::BACKUP_ONLY_TANK)
        })?;
        self.write(protocol::FIELD_BACKUP_ONLY_TANK, v).await
    }
}

fn check_range(parameter: &'static str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(Error::OutOfRange { parameter, value, min, max });
    }
    Ok(())
}

fn temperature(parameter: &'static str, temp: Temperature, range: (f64, f64)) -> Result<Value> {
    check_range(parameter, temp.fahrenheit(), range)?;
    Ok(json!(temp.to_wire()))
}

fn differential(parameter: &'static str, delta: TemperatureDelta) -> Result<Value> {
    check_range(parameter, delta.fahrenheit(), limits::DIFFERENTIAL)?;
    Ok(json!(delta.to_wire()))
}

fn count(parameter: &'static str, n: u32, range: (f64, f64)) -> Result<Value> {
    check_range(parameter, f64::from(n), range)?;
    Ok(json!(n))
}

fn setting_value<T>(
    setting: Setting<T>,
    encode: impl FnOnce(T) -> Result<Value>,
) -> Result<Value> {
    match setting {
        Setting::Off => Ok(protocol::off_value()),
        Setting::On(v) => encode(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_rounds_to_whole_degrees() {
        let v = temperature("t", Temperature::from_fahrenheit(120.6), limits::TANK_TEMP).unwrap();
        assert_eq!(v, json!(121));
    }

    #[test]
    fn out_of_range_rejected() {
        let err =
            temperature("t", Temperature::from_fahrenheit(20.0), limits::TANK_TEMP).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { min, .. } if min == 35.0));
    }

    #[test]
    fn nan_rejected() {
        assert!(check_range("t", f64::NAN, (0.0, 1.0)).is_err());
    }

    #[test]
    fn off_setting_skips_validation() {
        let v = setting_value(Setting::<u32>::Off, |n| count("c", n, (1.0, 2.0))).unwrap();
        assert_eq!(v, json!("off"));
    }

    #[test]
    fn differential_uses_delta_range() {
        assert!(differential("d", TemperatureDelta::from_fahrenheit(1.0)).is_err());
        assert_eq!(differential("d", TemperatureDelta::from_fahrenheit(4.0)).unwrap(), json!(4));
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let client = SensorLinx::builder().base_url("http://localhost:1234/").build().unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
        assert!(!client.is_logged_in());
    }
}
