//! Client, poller and entity model for HBX SensorLinx heating/cooling
//! controllers.

mod api;
mod client;
mod config;
mod coordinator;
mod diff;
mod error;
mod logger;
mod parameters;
pub mod platform;
mod protocol;
mod snapshot;
mod types;

pub use api::SensorLinxApi;
pub use client::{limits, Device, SensorLinx, SensorLinxBuilder};
pub use config::{Config, MessageLogConfig};
pub use coordinator::{build_snapshot, Coordinator, CoordinatorBuilder, CoordinatorState};
pub use error::{Error, Result, UpdateError};
pub use logger::MessageLogMode;
pub use parameters::keys;
pub use protocol::DEFAULT_BASE_URL;
pub use snapshot::{DeviceSnapshot, Parameters, Snapshot};
pub use types::*;
