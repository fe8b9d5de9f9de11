use crate::api::SensorLinxApi;
use crate::client::Device;
use crate::coordinator::{Coordinator, CoordinatorState};
use crate::parameters::keys;
use crate::platform::binary_sensor::coerce;
use crate::platform::EntityId;
use crate::snapshot::{DeviceSnapshot, Snapshot};
use crate::types::{Setting, Temperature, TemperatureDelta};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwitchKind {
    /// Enables an optional setting; turning on writes this value.
    Setting { on_value: f64 },
    /// Plain boolean flag.
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchTarget {
    HotTankOutdoorReset,
    ColdTankOutdoorReset,
    WarmWeatherShutdown,
    ColdWeatherShutdown,
    RotateCycles,
    RotateTime,
    BackupLagTime,
    BackupDifferential,
    BackupOnlyOutdoorTemp,
    BackupTemp,
    BackupOnlyTankTemp,
    PermanentHeatDemand,
    PermanentCoolDemand,
    OffStaging,
    WidePriorityDifferential,
    TwoStageHeatPump,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchDescription {
    pub suffix: &'static str,
    pub label: &'static str,
    pub key: &'static str,
    pub kind: SwitchKind,
    pub target: SwitchTarget,
}

const fn setting(
    suffix: &'static str,
    label: &'static str,
    key: &'static str,
    on_value: f64,
    target: SwitchTarget,
) -> SwitchDescription {
    SwitchDescription {
        suffix,
        label,
        key,
        kind: SwitchKind::Setting { on_value },
        target,
    }
}

const fn flag(
    suffix: &'static str,
    label: &'static str,
    key: &'static str,
    target: SwitchTarget,
) -> SwitchDescription {
    SwitchDescription {
        suffix,
        label,
        key,
        kind: SwitchKind::Flag,
        target,
    }
}

pub const SWITCHES: &[SwitchDescription] = &[
    setting(
        "hot_tank_outdoor_reset_enabled",
        "Hot Tank Outdoor Reset",
        keys::HOT_TANK_OUTDOOR_RESET,
        0.0,
        SwitchTarget::HotTankOutdoorReset,
    ),
    setting(
        "cold_tank_outdoor_reset_enabled",
        "Cold Tank Outdoor Reset",
        keys::COLD_TANK_OUTDOOR_RESET,
        0.0,
        SwitchTarget::ColdTankOutdoorReset,
    ),
    setting(
        "warm_weather_shutdown_enabled",
        "Warm Weather Shutdown",
        keys::WARM_WEATHER_SHUTDOWN,
        88.0,
        SwitchTarget::WarmWeatherShutdown,
    ),
    setting(
        "cold_weather_shutdown_enabled",
        "Cold Weather Shutdown",
        keys::COLD_WEATHER_SHUTDOWN,
        41.0,
        SwitchTarget::ColdWeatherShutdown,
    ),
    setting(
        "rotate_cycles_enabled",
        "Rotate Cycles",
        keys::ROTATE_CYCLES,
        1.0,
        SwitchTarget::RotateCycles,
    ),
    setting(
        "rotate_time_enabled",
        "Rotate Time",
        keys::ROTATE_TIME,
        1.0,
        SwitchTarget::RotateTime,
    ),
    setting(
        "backup_lag_time_enabled",
        "Backup Lag Time",
        keys::BACKUP_LAG_TIME,
        10.0,
        SwitchTarget::BackupLagTime,
    ),
    setting(
        "backup_differential_enabled",
        "Backup Differential",
        keys::BACKUP_DIFFERENTIAL,
        10.0,
        SwitchTarget::BackupDifferential,
    ),
    setting(
        "backup_only_outdoor_temp_enabled",
        "Backup Only Outdoor Temp",
        keys::BACKUP_ONLY_OUTDOOR_TEMP,
        -13.0,
        SwitchTarget::BackupOnlyOutdoorTemp,
    ),
    setting(
        "backup_temp_enabled",
        "Backup Temperature",
        keys::BACKUP_TEMP,
        50.0,
        SwitchTarget::BackupTemp,
    ),
    setting(
        "backup_only_tank_temp_enabled",
        "Backup Only Tank Temp",
        keys::BACKUP_ONLY_TANK_TEMP,
        120.0,
        SwitchTarget::BackupOnlyTankTemp,
    ),
    flag(
        "permanent_heat_demand",
        "Permanent Heat Demand",
        keys::PERMANENT_HEAT_DEMAND,
        SwitchTarget::PermanentHeatDemand,
    ),
    flag(
        "permanent_cool_demand",
        "Permanent Cool Demand",
        keys::PERMANENT_COOL_DEMAND,
        SwitchTarget::PermanentCoolDemand,
    ),
    flag(
        "synchronized_stage_off",
        "Synchronized Stage Off",
        keys::OFF_STAGING,
        SwitchTarget::OffStaging,
    ),
    flag(
        "wide_priority_differential",
        "Wide Priority Differential",
        keys::WIDE_PRIORITY_DIFFERENTIAL,
        SwitchTarget::WidePriorityDifferential,
    ),
    flag(
        "two_stage_heat_pump",
        "Two Stage Heat Pump",
        keys::TWO_STAGE_HEAT_PUMP,
        SwitchTarget::TwoStageHeatPump,
    ),
];

#[derive(Debug, Clone)]
pub struct Switch {
    pub id: EntityId,
    pub description: &'static SwitchDescription,
}

impl Switch {
    pub fn available(&self, state: &CoordinatorState) -> bool {
        let Some(device) = state.device(&self.id.device_id) else {
            return false;
        };
        match self.description.target {
            SwitchTarget::TwoStageHeatPump => {
                device.has(self.description.key) && two_stage_capable(device)
            }
            _ => true,
        }
    }

    pub fn is_on(&self, state: &CoordinatorState) -> Option<bool> {
        let value = state.device(&self.id.device_id)?.get(self.description.key)?;
        match self.description.kind {
            SwitchKind::Setting { .. } => Some(!value.is_off()),
            SwitchKind::Flag => coerce(value),
        }
    }

    pub async fn turn_on<A: SensorLinxApi>(&self, coordinator: &Coordinator<A>) -> Result<()> {
        self.set(coordinator, true).await
    }

    pub async fn turn_off<A: SensorLinxApi>(&self, coordinator: &Coordinator<A>) -> Result<()> {
        self.set(coordinator, false).await
    }

    async fn set<A: SensorLinxApi>(&self, coordinator: &Coordinator<A>, on: bool) -> Result<()> {
        let device = coordinator.device(&self.id.building_id, &self.id.device_id);
        write(self.description, &device, on).await?;
        coordinator.request_refresh();
        Ok(())
    }
}

/// Two-stage operation needs an even stage count; unknown counts allow it.
fn two_stage_capable(device: &DeviceSnapshot) -> bool {
    match device.get(keys::NUMBER_OF_STAGES).and_then(|v| v.as_f64()) {
        Some(n) => n == 2.0 || n == 4.0,
        None => true,
    }
}

async fn write<A: SensorLinxApi>(
    d: &SwitchDescription,
    device: &Device<'_, A>,
    on: bool,
) -> Result<()> {
    let on_value = match d.kind {
        SwitchKind::Setting { on_value } => on_value,
        SwitchKind::Flag => 0.0,
    };
    let temp = || enabled(on, Temperature::from_fahrenheit(on_value));
    let count = || enabled(on, on_value.round() as u32);

    match d.target {
        SwitchTarget::HotTankOutdoorReset => device.set_hot_tank_outdoor_reset(temp()).await,
        SwitchTarget::ColdTankOutdoorReset => device.set_cold_tank_outdoor_reset(temp()).await,
        SwitchTarget::WarmWeatherShutdown => device.set_warm_weather_shutdown(temp()).await,
        SwitchTarget::ColdWeatherShutdown => device.set_cold_weather_shutdown(temp()).await,
        SwitchTarget::RotateCycles => device.set_rotate_cycles(count()).await,
        SwitchTarget::RotateTime => device.set_rotate_time(count()).await,
        SwitchTarget::BackupLagTime => device.set_backup_lag_time(count()).await,
        SwitchTarget::BackupDifferential => {
            device
                .set_backup_differential(enabled(on, TemperatureDelta::from_fahrenheit(on_value)))
                .await
        }
        SwitchTarget::BackupOnlyOutdoorTemp => device.set_backup_only_outdoor_temp(temp()).await,
        SwitchTarget::BackupTemp => device.set_backup_temp(temp()).await,
        SwitchTarget::BackupOnlyTankTemp => device.set_backup_only_tank_temp(temp()).await,
        SwitchTarget::PermanentHeatDemand => device.set_permanent_heat_demand(on).await,
        SwitchTarget::PermanentCoolDemand => device.set_permanent_cool_demand(on).await,
        SwitchTarget::OffStaging => device.set_off_staging(on).await,
        SwitchTarget::WidePriorityDifferential => device.set_wide_priority_differential(on).await,
        SwitchTarget::TwoStageHeatPump => device.set_two_stage_heat_pump(on).await,
    }
}

fn enabled<T>(on: bool, value: T) -> Setting<T> {
    if on { Setting::On(value) } else { Setting::Off }
}

pub fn setup(snapshot: &Snapshot) -> Vec<Switch> {
    let mut out = Vec::new();
    for device in snapshot.devices.values() {
        for d in SWITCHES.iter().filter(|d| device.has(d.key)) {
            out.push(Switch {
                id: EntityId::new(device, d.suffix, d.label),
                description: d,
            });
        }
    }
    out
}
