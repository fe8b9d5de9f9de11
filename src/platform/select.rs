use crate::api::SensorLinxApi;
use crate::coordinator::{Coordinator, CoordinatorState};
use crate::parameters::keys;
use crate::platform::EntityId;
use crate::snapshot::Snapshot;
use crate::types::HvacModePriority;
use crate::{Error, Result};

pub const HVAC_MODE_OPTIONS: &[&str] = &["heat", "cool", "auto"];

/// HVAC mode priority of one device.
#[derive(Debug, Clone)]
pub struct Select {
    pub id: EntityId,
}

impl Select {
    pub fn options(&self) -> &'static [&'static str] {
        HVAC_MODE_OPTIONS
    }

    pub fn available(&self, state: &CoordinatorState) -> bool {
        state
            .device(&self.id.device_id)
            .is_some_and(|d| d.has(keys::HVAC_MODE))
    }

    pub fn current_option(&self, state: &CoordinatorState) -> Option<&'static str> {
        let device = state.device(&self.id.device_id)?;
        let mode = device.get(keys::HVAC_MODE)?.as_str()?;
        HvacModePriority::from_str_lossy(mode).map(|m| m.as_str())
    }

    pub async fn select_option<A: SensorLinxApi>(
        &self,
        coordinator: &Coordinator<A>,
        option: &str,
    ) -> Result<()> {
        let mode = HvacModePriority::from_str_lossy(option)
            .ok_or_else(|| Error::InvalidMode(option.to_string()))?;
        coordinator
            .device(&self.id.building_id, &self.id.device_id)
            .set_hvac_mode_priority(mode)
            .await?;
        coordinator.request_refresh();
        Ok(())
    }
}

pub fn setup(snapshot: &Snapshot) -> Vec<Select> {
    snapshot
        .devices
        .values()
        .filter(|d| d.has(keys::HVAC_MODE))
        .map(|d| Select {
            id: EntityId::new(d, "hvac_mode_priority", "HVAC Mode Priority"),
        })
        .collect()
}
