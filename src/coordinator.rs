use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, trace, warn};

use crate::api::SensorLinxApi;
use crate::client::Device;
use crate::config::Config;
use crate::error::UpdateError;
use crate::parameters::{self, PARAMETERS};
use crate::protocol;
use crate::snapshot::{building_from_record, DeviceSnapshot, Snapshot};
use crate::Error;

type SnapshotCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&UpdateError) + Send + Sync>;

/// What entities read: the latest snapshot and whether the last poll worked.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    pub snapshot: Option<Arc<Snapshot>>,
    pub last_update_success: bool,
}

impl CoordinatorState {
    /// The device, if the last poll succeeded and still lists it.
    pub fn device(&self, device_id: &str) -> Option<&DeviceSnapshot> {
        if !self.last_update_success {
            return None;
        }
        self.snapshot.as_deref()?.device(device_id)
    }

    /// The device from whatever snapshot is held, regardless of poll health.
    pub fn last_known_device(&self, device_id: &str) -> Option<&DeviceSnapshot> {
        self.snapshot.as_deref()?.device(device_id)
    }
}

pub struct CoordinatorBuilder<A: SensorLinxApi> {
    api: A,
    config: Config,
    snapshot_callbacks: Vec<SnapshotCallback>,
    error_callbacks: Vec<ErrorCallback>,
}

impl<A: SensorLinxApi> CoordinatorBuilder<A> {
    pub fn new(api: A, config: Config) -> Self {
        Self {
            api,
            config,
            snapshot_callbacks: Vec::new(),
            error_callbacks: Vec::new(),
        }
    }

    pub fn on_snapshot(mut self, f: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&UpdateError) + Send + Sync + 'static) -> Self {
        self.error_callbacks.push(Box::new(f));
        self
    }

    pub fn build(self) -> Coordinator<A> {
        Coordinator {
            inner: Arc::new(Inner {
                api: self.api,
                config: self.config,
                state: RwLock::new(CoordinatorState::default()),
                refresh: Notify::new(),
                update_lock: Mutex::new(()),
                snapshot_callbacks: self.snapshot_callbacks,
                error_callbacks: self.error_callbacks,
            }),
        }
    }
}

struct Inner<A> {
    api: A,
    config: Config,
    state: RwLock<CoordinatorState>,
    refresh: Notify,
    update_lock: Mutex<()>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    error_callbacks: Vec<ErrorCallback>,
}

/// Polls the controller cloud and holds the latest snapshot.
///
/// Cheap to clone; clones share the snapshot and the refresh signal.
pub struct Coordinator<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for Coordinator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: SensorLinxApi> Coordinator<A> {
    pub fn builder(api: A, config: Config) -> CoordinatorBuilder<A> {
        CoordinatorBuilder::new(api, config)
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn state(&self) -> CoordinatorState {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state().snapshot
    }

    pub fn last_update_success(&self) -> bool {
        self.state().last_update_success
    }

    /// Write handle for a device.
    pub fn device(&self, building_id: &str, device_id: &str) -> Device<'_, A> {
        Device::new(&self.inner.api, building_id, device_id)
    }

    /// Write handle for a device of the latest snapshot, addressed to the
    /// building it was listed under.
    pub fn find_device(&self, device_id: &str) -> crate::Result<Device<'_, A>> {
        let building_id = self
            .snapshot()
            .and_then(|s| s.device(device_id).map(|d| d.building_id.clone()))
            .ok_or_else(|| Error::UnknownDevice(device_id.to_string()))?;
        Ok(Device::new(&self.inner.api, building_id, device_id))
    }

    /// Ask the run loop for a poll as soon as possible.
    pub fn request_refresh(&self) {
        trace!("refresh requested");
        self.inner.refresh.notify_one();
    }

    /// Run one poll now. Concurrent callers wait for the poll in flight.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, UpdateError> {
        let _guard = self.inner.update_lock.lock().await;

        match build_snapshot(&self.inner.api, &self.inner.config).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.set_state(Some(Arc::clone(&snapshot)), true);
                for cb in &self.inner.snapshot_callbacks {
                    cb(&snapshot);
                }
                Ok(snapshot)
            }
            Err(e) => {
                match &e {
                    UpdateError::ReauthRequired(reason) => {
                        debug!(reason = %reason, "authentication failed during data update");
                    }
                    UpdateError::UpdateFailed(err) => {
                        error!("error communicating with SensorLinx API: {err}");
                    }
                }
                let previous = self.state().snapshot;
                self.set_state(previous, false);
                for cb in &self.inner.error_callbacks {
                    cb(&e);
                }
                Err(e)
            }
        }
    }

    /// Poll on the configured interval, and right away on
    /// [`request_refresh`](Self::request_refresh), until `shutdown` resolves.
    ///
    /// Transient failures are retried on the next tick. A rejected login ends
    /// the loop with [`UpdateError::ReauthRequired`].
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), UpdateError> {
        let mut ticker = tokio::time::interval(self.inner.config.scan_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                _ = ticker.tick() => {}
                _ = self.inner.refresh.notified() => ticker.reset(),
            }

            if let Err(UpdateError::ReauthRequired(reason)) = self.refresh().await {
                break Err(UpdateError::ReauthRequired(reason));
            }
        };

        self.shutdown().await;
        outcome
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.inner.api.close().await {
            warn!("failed to close SensorLinx session: {e}");
        }
    }

    fn set_state(&self, snapshot: Option<Arc<Snapshot>>, success: bool) {
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        state.snapshot = snapshot;
        state.last_update_success = success;
    }
}

/// One full poll: login, profile, buildings, devices, parameters.
pub async fn build_snapshot<A: SensorLinxApi>(
    api: &A,
    config: &Config,
) -> Result<Snapshot, UpdateError> {
    debug!("starting SensorLinx data update");

    debug!(username = %config.username, "logging in");
    api.login(&config.username, &config.password)
        .await
        .map_err(classify)?;

    debug!("fetching user profile");
    let profile = match api.profile().await.map_err(classify)? {
        Some(p) if !is_empty_profile(&p) => p,
        _ => {
            debug!("no profile returned");
            return Err(UpdateError::ReauthRequired("failed to get user profile".to_string()));
        }
    };

    debug!("fetching buildings");
    let building_records = api.buildings().await.map_err(classify)?;
    let buildings: Vec<_> = building_records.iter().filter_map(building_from_record).collect();
    debug!(count = buildings.len(), "fetched buildings");

    let mut snapshot = Snapshot {
        profile,
        buildings: Vec::new(),
        devices: Default::default(),
    };

    for building in &buildings {
        debug!(building = %building.id, "fetching devices");
        let records = match api.devices(&building.id).await {
            Ok(records) => records,
            Err(e) => {
                warn!(building = %building.id, "failed to get devices for building: {e}");
                continue;
            }
        };
        if records.is_empty() {
            debug!(building = %building.id, "no devices found for building");
        }
        for record in &records {
            if let Some(device) = build_device(record, &building.id) {
                snapshot.devices.insert(device.id.clone(), device);
            }
        }
    }

    snapshot.buildings = buildings;
    debug!(
        buildings = snapshot.buildings.len(),
        devices = snapshot.devices.len(),
        "data update complete"
    );
    Ok(snapshot)
}

/// Decode one device record. Every parameter is read on its own, so a bad
/// field costs only that key.
pub(crate) fn build_device(record: &Value, building_id: &str) -> Option<DeviceSnapshot> {
    let Some(id) = protocol::device_identifier(record) else {
        warn!(building = %building_id, "device record without syncCode or id, skipping");
        return None;
    };

    let mut device = DeviceSnapshot {
        name: record
            .get(protocol::FIELD_NAME)
            .and_then(|v| v.as_str())
            .map(str::to_string),
        device_type: record
            .get(protocol::FIELD_DEVICE_TYPE)
            .and_then(|v| v.as_str())
            .map(str::to_string),
        building_id: building_id.to_string(),
        id,
        ..Default::default()
    };
    debug!(device = %device.id, name = ?device.name, "processing device");

    match parameters::read_temperatures(record) {
        Ok(temps) => device.parameters.extend(temps),
        Err(e) => {
            warn!(device = %device.id, "failed to read temperatures: {e}");
            device.failed_parameters.push(protocol::FIELD_TEMPERATURES.to_string());
        }
    }

    for spec in PARAMETERS {
        match parameters::read(spec, record) {
            Ok(Some(value)) => {
                device.parameters.insert(spec.key.to_string(), value);
            }
            Ok(None) => trace!(device = %device.id, key = spec.key, "parameter not reported"),
            Err(e) => {
                warn!(device = %device.id, key = spec.key, "failed to read parameter: {e}");
                device.failed_parameters.push(spec.key.to_string());
            }
        }
    }

    debug!(
        device = %device.id,
        parameters = device.parameters.len(),
        failed = device.failed_parameters.len(),
        "device parameters extracted"
    );
    Some(device)
}

fn is_empty_profile(profile: &Value) -> bool {
    match profile {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

fn classify(e: Error) -> UpdateError {
    match e {
        Error::Unauthorized => UpdateError::ReauthRequired("credentials rejected".to_string()),
        other => UpdateError::UpdateFailed(other),
    }
}
