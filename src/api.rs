use std::future::Future;

use serde_json::Value;

use crate::Result;

/// The controller cloud as seen by the poller and the entities.
///
/// [`SensorLinx`](crate::SensorLinx) is the HTTP implementation; tests plug in
/// an in-memory fake.
pub trait SensorLinxApi: Send + Sync {
    /// Authenticate and keep the session for later calls.
    fn login(&self, username: &str, password: &str) -> impl Future<Output = Result<()>> + Send;

    /// Account profile; `None` when the service returns nothing for the session.
    fn profile(&self) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Raw building records.
    fn buildings(&self) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Raw device records of one building.
    fn devices(&self, building_id: &str) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Write one device field.
    fn write_parameter(
        &self,
        building_id: &str,
        device_id: &str,
        field: &'static str,
        value: Value,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Drop the session.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}
