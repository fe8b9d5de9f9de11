use crate::api::SensorLinxApi;
use crate::client::{limits, Device};
use crate::coordinator::{Coordinator, CoordinatorState};
use crate::parameters::keys;
use crate::platform::EntityId;
use crate::snapshot::{DeviceSnapshot, Snapshot};
use crate::types::{Setting, Temperature, TemperatureDelta};
use crate::{Error, Result};

use Availability::{Present, ResetOff, ResetOn, SettingOn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberUnit {
    Fahrenheit,
    /// A temperature difference in Fahrenheit degrees.
    FahrenheitDelta,
    Minutes,
    Seconds,
    Hours,
    Cycles,
    None,
}

impl NumberUnit {
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            NumberUnit::Fahrenheit | NumberUnit::FahrenheitDelta => Some("\u{00b0}F"),
            NumberUnit::Minutes => Some("min"),
            NumberUnit::Seconds => Some("s"),
            NumberUnit::Hours => Some("h"),
            NumberUnit::Cycles => Some("cycles"),
            NumberUnit::None => None,
        }
    }
}

/// When a number accepts input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// The value key is reported.
    Present,
    /// The value key holds a value rather than `Off`.
    SettingOn,
    /// The given outdoor reset is `Off` or not reported: the tank runs on a
    /// fixed target.
    ResetOff(&'static str),
    /// The given outdoor reset is active: the tank floats between min and max.
    ResetOn(&'static str),
}

/// Device setter a number writes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberTarget {
    HotTankTarget,
    HotTankMin,
    HotTankMax,
    HotTankOutdoorReset,
    ColdTankTarget,
    ColdTankMin,
    ColdTankMax,
    ColdTankOutdoorReset,
    WarmWeatherShutdown,
    ColdWeatherShutdown,
    StageOnLagTime,
    StageOffLagTime,
    RotateCycles,
    RotateTime,
    BackupLagTime,
    BackupDifferential,
    HotTankDifferential,
    ColdTankDifferential,
    BackupOnlyOutdoorTemp,
    NumberOfStages,
    BackupTemp,
    WeatherShutdownLagTime,
    HeatCoolSwitchDelay,
    BackupOnlyTankTemp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberDescription {
    pub suffix: &'static str,
    pub label: &'static str,
    /// Snapshot key the value is read from.
    pub key: &'static str,
    /// Snapshot key that must be reported for the entity to exist.
    pub requires: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: NumberUnit,
    pub availability: Availability,
    pub target: NumberTarget,
    /// Reading used when the key is reported but has no numeric value.
    pub default: Option<f64>,
}

const fn number(
    suffix: &'static str,
    label: &'static str,
    key: &'static str,
    (min, max): (f64, f64),
    unit: NumberUnit,
    availability: Availability,
    target: NumberTarget,
) -> NumberDescription {
    NumberDescription {
        suffix,
        label,
        key,
        requires: key,
        min,
        max,
        step: 1.0,
        unit,
        availability,
        target,
        default: None,
    }
}

pub const NUMBERS: &[NumberDescription] = &[
    NumberDescription {
        requires: keys::HOT_TANK_MIN_TEMP,
        ..number(
            "hot_tank_target_temp",
            "Hot Tank Target Temperature",
            keys::TARGET_TEMPERATURE_TANK,
            limits::TANK_TEMP,
            NumberUnit::Fahrenheit,
            ResetOff(keys::HOT_TANK_OUTDOOR_RESET),
            NumberTarget::HotTankTarget,
        )
    },
    number(
        "hot_tank_min_temp",
        "Hot Tank Min Temperature",
        keys::HOT_TANK_MIN_TEMP,
        limits::TANK_TEMP,
        NumberUnit::Fahrenheit,
        ResetOn(keys::HOT_TANK_OUTDOOR_RESET),
        NumberTarget::HotTankMin,
    ),
    number(
        "hot_tank_max_temp",
        "Hot Tank Max Temperature",
        keys::HOT_TANK_MAX_TEMP,
        limits::TANK_TEMP,
        NumberUnit::Fahrenheit,
        ResetOn(keys::HOT_TANK_OUTDOOR_RESET),
        NumberTarget::HotTankMax,
    ),
    number(
        "hot_tank_outdoor_reset",
        "Hot Tank Outdoor Reset",
        keys::HOT_TANK_OUTDOOR_RESET,
        limits::OUTDOOR_RESET,
        NumberUnit::Fahrenheit,
        SettingOn,
        NumberTarget::HotTankOutdoorReset,
    ),
    number(
        "cold_tank_target_temp",
        "Cold Tank Target Temperature",
        keys::COLD_TANK_MIN_TEMP,
        limits::TANK_TEMP,
        NumberUnit::Fahrenheit,
        ResetOff(keys::COLD_TANK_OUTDOOR_RESET),
        NumberTarget::ColdTankTarget,
    ),
    number(
        "cold_tank_min_temp",
        "Cold Tank Min Temperature",
        keys::COLD_TANK_MIN_TEMP,
        limits::TANK_TEMP,
        NumberUnit::Fahrenheit,
        ResetOn(keys::COLD_TANK_OUTDOOR_RESET),
        NumberTarget::ColdTankMin,
    ),
    number(
        "cold_tank_max_temp",
        "Cold Tank Max Temperature",
        keys::COLD_TANK_MAX_TEMP,
        limits::TANK_TEMP,
        NumberUnit::Fahrenheit,
        ResetOn(keys::COLD_TANK_OUTDOOR_RESET),
        NumberTarget::ColdTankMax,
    ),
    number(
        "cold_tank_outdoor_reset",
        "Cold Tank Outdoor Reset",
        keys::COLD_TANK_OUTDOOR_RESET,
        limits::OUTDOOR_RESET,
        NumberUnit::Fahrenheit,
        SettingOn,
        NumberTarget::ColdTankOutdoorReset,
    ),
    number(
        "warm_weather_shutdown",
        "Warm Weather Shutdown Temperature",
        keys::WARM_WEATHER_SHUTDOWN,
        limits::WARM_WEATHER_SHUTDOWN,
        NumberUnit::Fahrenheit,
        SettingOn,
        NumberTarget::WarmWeatherShutdown,
    ),
    number(
        "cold_weather_shutdown",
        "Cold Weather Shutdown Temperature",
        keys::COLD_WEATHER_SHUTDOWN,
        limits::COLD_WEATHER_SHUTDOWN,
        NumberUnit::Fahrenheit,
        SettingOn,
        NumberTarget::ColdWeatherShutdown,
    ),
    number(
        "stage_on_lag_time",
        "Stage On Lag Time",
        keys::STAGE_ON_LAG_TIME,
        limits::LAG_TIME,
        NumberUnit::Minutes,
        Present,
        NumberTarget::StageOnLagTime,
    ),
    number(
        "stage_off_lag_time",
        "Stage Off Lag Time",
        keys::STAGE_OFF_LAG_TIME,
        limits::LAG_TIME,
        NumberUnit::Seconds,
        Present,
        NumberTarget::StageOffLagTime,
    ),
    number(
        "rotate_cycles",
        "Rotate Cycles",
        keys::ROTATE_CYCLES,
        limits::LAG_TIME,
        NumberUnit::Cycles,
        SettingOn,
        NumberTarget::RotateCycles,
    ),
    number(
        "rotate_time",
        "Rotate Time",
        keys::ROTATE_TIME,
        limits::LAG_TIME,
        NumberUnit::Hours,
        SettingOn,
        NumberTarget::RotateTime,
    ),
    number(
        "backup_lag_time",
        "Backup Lag Time",
        keys::BACKUP_LAG_TIME,
        limits::LAG_TIME,
        NumberUnit::Minutes,
        SettingOn,
        NumberTarget::BackupLagTime,
    ),
    number(
        "backup_differential",
        "Backup Differential",
        keys::BACKUP_DIFFERENTIAL,
        limits::DIFFERENTIAL,
        NumberUnit::FahrenheitDelta,
        SettingOn,
        NumberTarget::BackupDifferential,
    ),
    number(
        "hot_tank_differential",
        "Hot Tank Differential",
        keys::HOT_TANK_DIFFERENTIAL,
        limits::DIFFERENTIAL,
        NumberUnit::FahrenheitDelta,
        Present,
        NumberTarget::HotTankDifferential,
    ),
    number(
        "cold_tank_differential",
        "Cold Tank Differential",
        keys::COLD_TANK_DIFFERENTIAL,
        limits::DIFFERENTIAL,
        NumberUnit::FahrenheitDelta,
        Present,
        NumberTarget::ColdTankDifferential,
    ),
    number(
        "backup_only_outdoor_temp",
        "Backup Only Outdoor Temp",
        keys::BACKUP_ONLY_OUTDOOR_TEMP,
        limits::BACKUP_ONLY_OUTDOOR,
        NumberUnit::Fahrenheit,
        SettingOn,
        NumberTarget::BackupOnlyOutdoorTemp,
    ),
    NumberDescription {
        default: Some(1.0),
        ..number(
            "number_of_stages",
            "Number of HP Stages",
            keys::NUMBER_OF_STAGES,
            limits::NUMBER_OF_STAGES,
            NumberUnit::None,
            Present,
            NumberTarget::NumberOfStages,
        )
    },
    number(
        "backup_temp",
        "Backup Temperature",
        keys::BACKUP_TEMP,
        limits::BACKUP_TEMP,
        NumberUnit::Fahrenheit,
        SettingOn,
        NumberTarget::BackupTemp,
    ),
    number(
        "weather_shutdown_lag_time",
        "Weather Shutdown Lag Time",
        keys::WEATHER_SHUTDOWN_LAG_TIME,
        limits::WEATHER_SHUTDOWN_LAG,
        NumberUnit::Hours,
        Present,
        NumberTarget::WeatherShutdownLagTime,
    ),
    number(
        "heat_cool_switch_delay",
        "Heat/Cool Switch Delay",
        keys::HEAT_COOL_SWITCH_DELAY,
        limits::HEAT_COOL_SWITCH_DELAY,
        NumberUnit::Seconds,
        Present,
        NumberTarget::HeatCoolSwitchDelay,
    ),
    number(
        "backup_only_tank_temp",
        "Backup Only Tank Temp",
        keys::BACKUP_ONLY_TANK_TEMP,
        limits::BACKUP_ONLY_TANK,
        NumberUnit::Fahrenheit,
        SettingOn,
        NumberTarget::BackupOnlyTankTemp,
    ),
];

#[derive(Debug, Clone)]
pub struct Number {
    pub id: EntityId,
    pub description: &'static NumberDescription,
}

impl Number {
    pub fn available(&self, state: &CoordinatorState) -> bool {
        state
            .device(&self.id.device_id)
            .is_some_and(|device| is_available(self.description, device))
    }

    /// Current reading; `None` for a disabled setting or an unavailable device.
    pub fn value(&self, state: &CoordinatorState) -> Option<f64> {
        let device = state.device(&self.id.device_id)?;
        match device.get(self.description.key) {
            Some(v) if v.is_off() => None,
            Some(v) => v.as_f64().or(self.description.default),
            None => None,
        }
    }

    /// Validate against the entity's range, write, then ask for a refresh.
    pub async fn set_value<A: SensorLinxApi>(
        &self,
        coordinator: &Coordinator<A>,
        value: f64,
    ) -> Result<()> {
        let d = self.description;
        if !value.is_finite() || value < d.min || value > d.max {
            return Err(Error::OutOfRange {
                parameter: d.suffix,
                value,
                min: d.min,
                max: d.max,
            });
        }
        let device = coordinator.device(&self.id.building_id, &self.id.device_id);
        write(d.target, &device, value).await?;
        coordinator.request_refresh();
        Ok(())
    }
}

fn is_available(d: &NumberDescription, device: &DeviceSnapshot) -> bool {
    match d.availability {
        Present => device.has(d.key),
        SettingOn => device.get(d.key).is_some_and(|v| !v.is_off()),
        ResetOff(reset) => device.get(reset).is_none_or(|v| v.is_off()),
        ResetOn(reset) => device.has(d.key) && device.get(reset).is_some_and(|v| !v.is_off()),
    }
}

async fn write<A: SensorLinxApi>(
    target: NumberTarget,
    device: &Device<'_, A>,
    value: f64,
) -> Result<()> {
    let temp = Temperature::from_fahrenheit(value);
    let delta = TemperatureDelta::from_fahrenheit(value);
    let n = value.round() as u32;

    match target {
        NumberTarget::HotTankTarget => device.set_hot_tank_target_temp(temp).await,
        NumberTarget::HotTankMin => device.set_hot_tank_min_temp(temp).await,
        NumberTarget::HotTankMax => device.set_hot_tank_max_temp(temp).await,
        NumberTarget::HotTankOutdoorReset => {
            device.set_hot_tank_outdoor_reset(Setting::On(temp)).await
        }
        NumberTarget::ColdTankTarget => device.set_cold_tank_target_temp(temp).await,
        NumberTarget::ColdTankMin => device.set_cold_tank_min_temp(temp).await,
        NumberTarget::ColdTankMax => device.set_cold_tank_max_temp(temp).await,
        NumberTarget::ColdTankOutdoorReset => {
            device.set_cold_tank_outdoor_reset(Setting::On(temp)).await
        }
        NumberTarget::WarmWeatherShutdown => {
            device.set_warm_weather_shutdown(Setting::On(temp)).await
        }
        NumberTarget::ColdWeatherShutdown => {
            device.set_cold_weather_shutdown(Setting::On(temp)).await
        }
        NumberTarget::StageOnLagTime => device.set_stage_on_lag_time(n).await,
        NumberTarget::StageOffLagTime => device.set_stage_off_lag_time(n).await,
        NumberTarget::RotateCycles => device.set_rotate_cycles(Setting::On(n)).await,
        NumberTarget::RotateTime => device.set_rotate_time(Setting::On(n)).await,
        NumberTarget::BackupLagTime => device.set_backup_lag_time(Setting::On(n)).await,
        NumberTarget::BackupDifferential => {
            device.set_backup_differential(Setting::On(delta)).await
        }
        NumberTarget::HotTankDifferential => device.set_hot_tank_differential(delta).await,
        NumberTarget::ColdTankDifferential => device.set_cold_tank_differential(delta).await,
        NumberTarget::BackupOnlyOutdoorTemp => {
            device.set_backup_only_outdoor_temp(Setting::On(temp)).await
        }
        NumberTarget::NumberOfStages => device.set_number_of_stages(n as u8).await,
        NumberTarget::BackupTemp => device.set_backup_temp(Setting::On(temp)).await,
        NumberTarget::WeatherShutdownLagTime => device.set_weather_shutdown_lag_time(n).await,
        NumberTarget::HeatCoolSwitchDelay => device.set_heat_cool_switch_delay(n).await,
        NumberTarget::BackupOnlyTankTemp => {
            device.set_backup_only_tank_temp(Setting::On(temp)).await
        }
    }
}

pub fn setup(snapshot: &Snapshot) -> Vec<Number> {
    let mut out = Vec::new();
    for device in snapshot.devices.values() {
        for d in NUMBERS.iter().filter(|d| device.has(d.requires)) {
            out.push(Number {
                id: EntityId::new(device, d.suffix, d.label),
                description: d,
            });
        }
    }
    out
}
