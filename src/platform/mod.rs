//! Entities built from a [`Snapshot`].
//!
//! Every platform is a table of static descriptions plus a `setup` that
//! instantiates one entity per description the device supports. Entities
//! keep no state of their own: reads go through a [`CoordinatorState`],
//! writes through the [`Coordinator`](crate::Coordinator) and end with a
//! refresh request.
//!
//! [`CoordinatorState`]: crate::CoordinatorState

pub mod binary_sensor;
pub mod climate;
pub mod number;
pub mod select;
pub mod sensor;
pub mod switch;

use crate::snapshot::{DeviceSnapshot, Snapshot};

/// Identity shared by every entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityId {
    /// `<device_id>_<suffix>`, stable across polls.
    pub unique_id: String,
    /// `<device name or id> <label>`.
    pub name: String,
    pub device_id: String,
    /// Building the device was listed under; writes are addressed to it.
    pub building_id: String,
}

impl EntityId {
    pub(crate) fn new(device: &DeviceSnapshot, suffix: &str, label: &str) -> Self {
        Self {
            unique_id: format!("{}_{suffix}", device.id),
            name: format!("{} {label}", device.display_name()),
            device_id: device.id.clone(),
            building_id: device.building_id.clone(),
        }
    }
}

/// All entities for one snapshot.
#[derive(Debug, Default)]
pub struct Entities {
    pub sensors: Vec<sensor::Sensor>,
    pub binary_sensors: Vec<binary_sensor::BinarySensor>,
    pub numbers: Vec<number::Number>,
    pub selects: Vec<select::Select>,
    pub switches: Vec<switch::Switch>,
    pub climates: Vec<climate::Climate>,
}

impl Entities {
    pub fn len(&self) -> usize {
        self.sensors.len()
            + self.binary_sensors.len()
            + self.numbers.len()
            + self.selects.len()
            + self.switches.len()
            + self.climates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.sensors
            .iter()
            .map(|e| &e.id)
            .chain(self.binary_sensors.iter().map(|e| &e.id))
            .chain(self.numbers.iter().map(|e| &e.id))
            .chain(self.selects.iter().map(|e| &e.id))
            .chain(self.switches.iter().map(|e| &e.id))
            .chain(self.climates.iter().map(|e| &e.id))
    }

    /// Entities belonging to one device.
    pub fn for_device<'a>(&'a self, device_id: &'a str) -> impl Iterator<Item = &'a EntityId> + 'a {
        self.ids().filter(move |id| id.device_id == device_id)
    }
}

/// Instantiate every platform for every device in the snapshot.
pub fn setup(snapshot: &Snapshot) -> Entities {
    let entities = Entities {
        sensors: sensor::setup(snapshot),
        binary_sensors: binary_sensor::setup(snapshot),
        numbers: number::setup(snapshot),
        selects: select::setup(snapshot),
        switches: switch::setup(snapshot),
        climates: climate::setup(snapshot),
    };
    tracing::debug!(
        devices = snapshot.devices.len(),
        entities = entities.len(),
        "entities set up"
    );
    entities
}
