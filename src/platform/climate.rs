use tracing::debug;

use crate::api::SensorLinxApi;
use crate::coordinator::{Coordinator, CoordinatorState};
use crate::parameters::keys;
use crate::platform::binary_sensor::coerce;
use crate::platform::EntityId;
use crate::snapshot::{DeviceSnapshot, Snapshot};
use crate::types::{HvacModePriority, Temperature};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    Auto,
}

impl HvacMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
            HvacMode::Auto => "auto",
        }
    }

    /// Case-insensitive; anything unrecognised is auto.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("off") {
            return HvacMode::Off;
        }
        match HvacModePriority::from_str_lossy(s) {
            Some(HvacModePriority::Heat) => HvacMode::Heat,
            Some(HvacModePriority::Cool) => HvacMode::Cool,
            _ => HvacMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacAction {
    Off,
    Heating,
    Cooling,
    Idle,
}

pub const HVAC_MODES: &[HvacMode] = &[
    HvacMode::Off,
    HvacMode::Heat,
    HvacMode::Cool,
    HvacMode::Auto,
];

/// Tank thermostat view of a device.
#[derive(Debug, Clone)]
pub struct Climate {
    pub id: EntityId,
}

impl Climate {
    pub fn hvac_modes(&self) -> &'static [HvacMode] {
        HVAC_MODES
    }

    pub fn available(&self, state: &CoordinatorState) -> bool {
        state.device(&self.id.device_id).is_some()
    }

    pub fn current_temperature(&self, state: &CoordinatorState) -> Option<f64> {
        state.device(&self.id.device_id)?.get(keys::TEMPERATURE_TANK)?.as_f64()
    }

    pub fn target_temperature(&self, state: &CoordinatorState) -> Option<f64> {
        state
            .device(&self.id.device_id)?
            .get(keys::TARGET_TEMPERATURE_TANK)?
            .as_f64()
    }

    pub fn hvac_mode(&self, state: &CoordinatorState) -> Option<HvacMode> {
        state.device(&self.id.device_id).map(mode_of)
    }

    pub fn hvac_action(&self, state: &CoordinatorState) -> Option<HvacAction> {
        let device = state.device(&self.id.device_id)?;
        let demand = |key: &str| device.get(key).and_then(coerce).unwrap_or(false);
        let action = if demand(keys::PERMANENT_HEAT_DEMAND) {
            HvacAction::Heating
        } else if demand(keys::PERMANENT_COOL_DEMAND) {
            HvacAction::Cooling
        } else if mode_of(device) == HvacMode::Off {
            HvacAction::Off
        } else {
            HvacAction::Idle
        };
        Some(action)
    }

    /// Write the target of the tank the current mode drives. Does nothing
    /// when the device is not in the snapshot.
    pub async fn set_temperature<A: SensorLinxApi>(
        &self,
        coordinator: &Coordinator<A>,
        fahrenheit: f64,
    ) -> Result<()> {
        let state = coordinator.state();
        let Some(device) = state.last_known_device(&self.id.device_id) else {
            debug!(device = %self.id.device_id, "set_temperature for unknown device ignored");
            return Ok(());
        };
        let temp = Temperature::from_fahrenheit(fahrenheit);
        let handle = coordinator.device(&device.building_id, &device.id);
        match mode_of(device) {
            HvacMode::Cool => handle.set_cold_tank_target_temp(temp).await?,
            _ => handle.set_hot_tank_target_temp(temp).await?,
        }
        coordinator.request_refresh();
        Ok(())
    }

    /// Write the mode priority. The controller has no off priority.
    pub async fn set_hvac_mode<A: SensorLinxApi>(
        &self,
        coordinator: &Coordinator<A>,
        mode: HvacMode,
    ) -> Result<()> {
        let priority = match mode {
            HvacMode::Heat => HvacModePriority::Heat,
            HvacMode::Cool => HvacModePriority::Cool,
            HvacMode::Auto => HvacModePriority::Auto,
            HvacMode::Off => return Err(Error::InvalidMode(mode.as_str().to_string())),
        };
        let state = coordinator.state();
        let Some(device) = state.last_known_device(&self.id.device_id) else {
            debug!(device = %self.id.device_id, "set_hvac_mode for unknown device ignored");
            return Ok(());
        };
        coordinator
            .device(&device.building_id, &device.id)
            .set_hvac_mode_priority(priority)
            .await?;
        coordinator.request_refresh();
        Ok(())
    }
}

/// The controller reports `"off"` when the system is shut down; otherwise the
/// mode follows the priority.
fn mode_of(device: &DeviceSnapshot) -> HvacMode {
    match device.get(keys::HVAC_MODE) {
        Some(v) if v.is_off() => HvacMode::Off,
        Some(v) => v.as_str().map_or(HvacMode::Auto, HvacMode::parse),
        None => HvacMode::Auto,
    }
}

pub fn setup(snapshot: &Snapshot) -> Vec<Climate> {
    snapshot
        .devices
        .values()
        .filter(|d| d.has(keys::TEMPERATURE_TANK) || d.has(keys::TARGET_TEMPERATURE_TANK))
        .map(|d| Climate {
            id: EntityId::new(d, "climate", "Climate"),
        })
        .collect()
}
