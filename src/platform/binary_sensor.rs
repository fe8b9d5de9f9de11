use crate::coordinator::CoordinatorState;
use crate::parameters::keys;
use crate::platform::EntityId;
use crate::protocol::slug;
use crate::snapshot::{DeviceSnapshot, Snapshot};
use crate::types::{ParamValue, StageState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySensorDeviceClass {
    Heat,
    Cold,
    Running,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinarySensorDescription {
    pub key: &'static str,
    pub label: &'static str,
    pub device_class: BinarySensorDeviceClass,
}

pub const BINARY_SENSORS: &[BinarySensorDescription] = &[
    BinarySensorDescription {
        key: keys::PERMANENT_HEAT_DEMAND,
        label: "Permanent Heat Demand",
        device_class: BinarySensorDeviceClass::Heat,
    },
    BinarySensorDescription {
        key: keys::PERMANENT_COOL_DEMAND,
        label: "Permanent Cool Demand",
        device_class: BinarySensorDeviceClass::Cold,
    },
];

/// Which flag of a stage or the backup heater is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFlag {
    Running,
    Enabled,
}

impl StageFlag {
    fn suffix(self) -> &'static str {
        match self {
            StageFlag::Running => "running",
            StageFlag::Enabled => "enabled",
        }
    }

    fn label(self) -> &'static str {
        match self {
            StageFlag::Running => "Running",
            StageFlag::Enabled => "Enabled",
        }
    }

    fn read(self, state: &StageState) -> bool {
        match self {
            StageFlag::Running => state.activated,
            StageFlag::Enabled => state.enabled,
        }
        .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinarySensorKind {
    Parameter(BinarySensorDescription),
    Stage { title: String, flag: StageFlag },
    Backup(StageFlag),
}

#[derive(Debug, Clone)]
pub struct BinarySensor {
    pub id: EntityId,
    pub kind: BinarySensorKind,
}

impl BinarySensor {
    pub fn device_class(&self) -> BinarySensorDeviceClass {
        match &self.kind {
            BinarySensorKind::Parameter(d) => d.device_class,
            BinarySensorKind::Stage { flag, .. } | BinarySensorKind::Backup(flag) => match flag {
                StageFlag::Running => BinarySensorDeviceClass::Running,
                StageFlag::Enabled => BinarySensorDeviceClass::Power,
            },
        }
    }

    pub fn available(&self, state: &CoordinatorState) -> bool {
        let Some(device) = state.device(&self.id.device_id) else {
            return false;
        };
        match &self.kind {
            BinarySensorKind::Parameter(d) => device.has(d.key),
            BinarySensorKind::Stage { title, .. } => stage(device, title).is_some(),
            BinarySensorKind::Backup(_) => device.backup(keys::BACKUP_STATE).is_some(),
        }
    }

    pub fn is_on(&self, state: &CoordinatorState) -> Option<bool> {
        let device = state.device(&self.id.device_id)?;
        match &self.kind {
            BinarySensorKind::Parameter(d) => device.get(d.key).and_then(coerce),
            BinarySensorKind::Stage { title, flag } => stage(device, title).map(|s| flag.read(s)),
            BinarySensorKind::Backup(flag) => {
                device.backup(keys::BACKUP_STATE).map(|s| flag.read(s))
            }
        }
    }
}

/// Loose truthiness for controller flags.
pub fn coerce(value: &ParamValue) -> Option<bool> {
    match value {
        ParamValue::Bool(b) => Some(*b),
        ParamValue::Number(n) => Some(*n > 0.0),
        ParamValue::Text(s) => Some(matches!(
            s.to_ascii_lowercase().as_str(),
            "true" | "on" | "1" | "yes" | "active"
        )),
        ParamValue::Off => Some(false),
        _ => None,
    }
}

fn stage<'a>(device: &'a DeviceSnapshot, title: &str) -> Option<&'a StageState> {
    device
        .stages(keys::HEATPUMP_STAGES)
        .iter()
        .find(|s| s.title == title)
}

pub fn setup(snapshot: &Snapshot) -> Vec<BinarySensor> {
    let mut out = Vec::new();
    for device in snapshot.devices.values() {
        for d in BINARY_SENSORS.iter().filter(|d| device.has(d.key)) {
            out.push(BinarySensor {
                id: EntityId::new(device, d.key, d.label),
                kind: BinarySensorKind::Parameter(*d),
            });
        }

        for s in device.stages(keys::HEATPUMP_STAGES) {
            for flag in [StageFlag::Running, StageFlag::Enabled] {
                out.push(BinarySensor {
                    id: EntityId::new(
                        device,
                        &format!("hp_{}_{}", slug(&s.title), flag.suffix()),
                        &format!("HP {} {}", s.title, flag.label()),
                    ),
                    kind: BinarySensorKind::Stage {
                        title: s.title.clone(),
                        flag,
                    },
                });
            }
        }

        if let Some(backup) = device.backup(keys::BACKUP_STATE) {
            for flag in [StageFlag::Running, StageFlag::Enabled] {
                out.push(BinarySensor {
                    id: EntityId::new(
                        device,
                        &format!("backup_{}", flag.suffix()),
                        &format!("{} {}", backup.title, flag.label()),
                    ),
                    kind: BinarySensorKind::Backup(flag),
                });
            }
        }
    }
    out
}
