use crate::coordinator::CoordinatorState;
use crate::parameters::keys;
use crate::platform::EntityId;
use crate::protocol::slug;
use crate::snapshot::{DeviceSnapshot, Snapshot};
use crate::types::{ParamValue, StageState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorDeviceClass {
    Temperature,
    Enum,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorDescription {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: SensorDeviceClass,
    /// Numeric readings that vary over time.
    pub measurement: bool,
}

pub const SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: keys::TEMPERATURE_TANK,
        label: "Tank Temperature",
        unit: Some("\u{00b0}F"),
        device_class: SensorDeviceClass::Temperature,
        measurement: true,
    },
    SensorDescription {
        key: keys::TEMPERATURE_OUTDOOR,
        label: "Outdoor Temperature",
        unit: Some("\u{00b0}F"),
        device_class: SensorDeviceClass::Temperature,
        measurement: true,
    },
    SensorDescription {
        key: keys::FIRMWARE_VERSION,
        label: "Firmware Version",
        unit: None,
        device_class: SensorDeviceClass::Enum,
        measurement: false,
    },
    SensorDescription {
        key: keys::DEVICE_TYPE,
        label: "Device Type",
        unit: None,
        device_class: SensorDeviceClass::Enum,
        measurement: false,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub enum SensorKind {
    Parameter(SensorDescription),
    /// Runtime counter of the heat-pump stage with this title.
    StageRuntime { title: String },
    BackupRuntime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Sensor {
    pub id: EntityId,
    pub kind: SensorKind,
}

impl Sensor {
    pub fn device_class(&self) -> SensorDeviceClass {
        match &self.kind {
            SensorKind::Parameter(d) => d.device_class,
            SensorKind::StageRuntime { .. } | SensorKind::BackupRuntime => {
                SensorDeviceClass::Duration
            }
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match &self.kind {
            SensorKind::Parameter(d) => d.unit,
            _ => None,
        }
    }

    pub fn available(&self, state: &CoordinatorState) -> bool {
        let Some(device) = state.device(&self.id.device_id) else {
            return false;
        };
        match &self.kind {
            SensorKind::Parameter(d) => device.has(d.key),
            SensorKind::StageRuntime { title } => stage(device, title).is_some(),
            SensorKind::BackupRuntime => device.backup(keys::BACKUP_STATE).is_some(),
        }
    }

    pub fn value(&self, state: &CoordinatorState) -> Option<SensorValue> {
        let device = state.device(&self.id.device_id)?;
        match &self.kind {
            SensorKind::Parameter(d) => match device.get(d.key)? {
                ParamValue::Text(s) => Some(SensorValue::Text(s.clone())),
                v => v.as_f64().map(SensorValue::Number),
            },
            SensorKind::StageRuntime { title } => stage(device, title)?
                .run_time
                .clone()
                .map(SensorValue::Text),
            SensorKind::BackupRuntime => device
                .backup(keys::BACKUP_STATE)?
                .run_time
                .clone()
                .map(SensorValue::Text),
        }
    }
}

fn stage<'a>(device: &'a DeviceSnapshot, title: &str) -> Option<&'a StageState> {
    device
        .stages(keys::HEATPUMP_STAGES)
        .iter()
        .find(|s| s.title == title)
}

pub fn setup(snapshot: &Snapshot) -> Vec<Sensor> {
    let mut out = Vec::new();
    for device in snapshot.devices.values() {
        for d in SENSORS.iter().filter(|d| device.has(d.key)) {
            out.push(Sensor {
                id: EntityId::new(device, d.key, d.label),
                kind: SensorKind::Parameter(*d),
            });
        }

        for s in device.stages(keys::HEATPUMP_STAGES) {
            out.push(Sensor {
                id: EntityId::new(
                    device,
                    &format!("hp_{}_runtime", slug(&s.title)),
                    &format!("HP {} Runtime", s.title),
                ),
                kind: SensorKind::StageRuntime {
                    title: s.title.clone(),
                },
            });
        }

        if let Some(backup) = device.backup(keys::BACKUP_STATE) {
            out.push(Sensor {
                id: EntityId::new(device, "backup_runtime", &format!("{} Runtime", backup.title)),
                kind: SensorKind::BackupRuntime,
            });
        }
    }
    out
}
