use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hbx_sensorlinx::platform::{self, climate::HvacMode};
use hbx_sensorlinx::{keys, Config, Coordinator, Error, SensorLinxApi, UpdateError};
use serde_json::{json, Value};
use tokio::sync::Notify;

type Write = (String, String, &'static str, Value);

#[derive(Default)]
struct FakeState {
    reject_login: bool,
    fail_buildings: bool,
    profile: Option<Value>,
    buildings: Vec<Value>,
    devices: HashMap<String, Vec<Value>>,
    broken_buildings: Vec<String>,
    writes: Vec<Write>,
    closed: bool,
}

#[derive(Default)]
struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    fn with_device(record: Value) -> Self {
        let api = FakeApi::default();
        {
            let mut s = api.state.lock().unwrap();
            s.profile = Some(json!({"email": "user@example.com"}));
            s.buildings = vec![json!({"id": "b1", "name": "Home"})];
            s.devices.insert("b1".into(), vec![record]);
        }
        api
    }

    fn edit(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }
}

impl SensorLinxApi for FakeApi {
    fn login(
        &self,
        _username: &str,
        _password: &str,
    ) -> impl Future<Output = hbx_sensorlinx::Result<()>> + Send {
        let reject = self.state.lock().unwrap().reject_login;
        async move {
            if reject {
                Err(Error::Unauthorized)
            } else {
                Ok(())
            }
        }
    }

    fn profile(&self) -> impl Future<Output = hbx_sensorlinx::Result<Option<Value>>> + Send {
        let profile = self.state.lock().unwrap().profile.clone();
        async move { Ok(profile) }
    }

    fn buildings(&self) -> impl Future<Output = hbx_sensorlinx::Result<Vec<Value>>> + Send {
        let s = self.state.lock().unwrap();
        let result = if s.fail_buildings {
            Err(Error::Api {
                status: 503,
                message: "unavailable".into(),
            })
        } else {
            Ok(s.buildings.clone())
        };
        async move { result }
    }

    fn devices(
        &self,
        building_id: &str,
    ) -> impl Future<Output = hbx_sensorlinx::Result<Vec<Value>>> + Send {
        let s = self.state.lock().unwrap();
        let result = if s.broken_buildings.iter().any(|b| b == building_id) {
            Err(Error::Protocol("device listing failed".into()))
        } else {
            Ok(s.devices.get(building_id).cloned().unwrap_or_default())
        };
        async move { result }
    }

    fn write_parameter(
        &self,
        building_id: &str,
        device_id: &str,
        field: &'static str,
        value: Value,
    ) -> impl Future<Output = hbx_sensorlinx::Result<()>> + Send {
        self.state
            .lock()
            .unwrap()
            .writes
            .push((building_id.to_string(), device_id.to_string(), field, value));
        async { Ok(()) }
    }

    fn close(&self) -> impl Future<Output = hbx_sensorlinx::Result<()>> + Send {
        self.state.lock().unwrap().closed = true;
        async { Ok(()) }
    }
}

fn coordinator(api: FakeApi) -> Coordinator<FakeApi> {
    Coordinator::builder(api, Config::new("user@example.com", "pw")).build()
}

fn boiler() -> Value {
    json!({
        "syncCode": "SYNC1",
        "id": "65f0",
        "name": "Boiler",
        "deviceType": "ECO-0600",
        "firmVer": "2.09",
        "temperatures": [
            {"title": "Tank", "current": 118.0, "target": 120.0},
            {"title": "Outdoor", "current": 31.0}
        ],
        "permHD": false,
        "permCD": false,
        "prior": 0,
        "dbt": 120,
        "mbt": 120,
        "dot": "off",
        "cdbt": 45,
        "cmbt": 55,
        "cdot": 10,
        "wwsd": 88,
        "numStg": 2,
        "twoStg": true
    })
}

#[tokio::test]
async fn snapshot_keys_devices_by_sync_code() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    let snapshot = coordinator.refresh().await.unwrap();

    let device = snapshot.device("SYNC1").expect("device keyed by sync code");
    assert!(snapshot.device("65f0").is_none());
    assert_eq!(device.building_id, "b1");
    assert_eq!(device.display_name(), "Boiler");
    assert_eq!(device.firmware_version(), Some("2.09"));
    assert_eq!(device.get(keys::HVAC_MODE).and_then(|v| v.as_str()), Some("heat"));
    assert!(device.get(keys::HOT_TANK_OUTDOOR_RESET).unwrap().is_off());
    assert!(device.has(keys::TEMPERATURE_OUTDOOR));
    assert!(!device.has(keys::BACKUP_STATE));
    assert!(coordinator.last_update_success());
}

#[tokio::test]
async fn falls_back_to_id_without_sync_code() {
    let coordinator = coordinator(FakeApi::with_device(json!({"syncCode": "", "id": "65f0"})));
    let snapshot = coordinator.refresh().await.unwrap();
    assert!(snapshot.device("65f0").is_some());
}

#[tokio::test]
async fn missing_profile_requires_reauth() {
    let api = FakeApi::with_device(boiler());
    api.edit(|s| s.profile = None);

    let errors = Arc::new(AtomicUsize::new(0));
    let counter = errors.clone();
    let coordinator = Coordinator::builder(api, Config::new("u", "p"))
        .on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let err = coordinator.refresh().await.unwrap_err();
    assert!(matches!(err, UpdateError::ReauthRequired(_)), "got {err:?}");
    assert!(!coordinator.last_update_success());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_login_requires_reauth() {
    let api = FakeApi::with_device(boiler());
    api.edit(|s| s.reject_login = true);
    let err = coordinator(api).refresh().await.unwrap_err();
    assert!(matches!(err, UpdateError::ReauthRequired(_)), "got {err:?}");
}

#[tokio::test]
async fn api_failure_keeps_previous_snapshot() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    coordinator.refresh().await.unwrap();

    coordinator.api().edit(|s| s.fail_buildings = true);
    let err = coordinator.refresh().await.unwrap_err();
    assert!(
        matches!(err, UpdateError::UpdateFailed(Error::Api { status: 503, .. })),
        "got {err:?}"
    );

    let state = coordinator.state();
    assert!(!state.last_update_success);
    assert!(state.device("SYNC1").is_none());
    assert!(state.last_known_device("SYNC1").is_some());
}

#[tokio::test]
async fn failing_building_is_skipped() {
    let api = FakeApi::with_device(boiler());
    api.edit(|s| {
        s.buildings.insert(0, json!({"id": "b0"}));
        s.broken_buildings.push("b0".into());
    });
    let snapshot = coordinator(api).refresh().await.unwrap();
    assert_eq!(snapshot.buildings.len(), 2);
    assert!(snapshot.device("SYNC1").is_some());
}

#[tokio::test]
async fn no_buildings_is_an_empty_snapshot() {
    let api = FakeApi::with_device(boiler());
    api.edit(|s| s.buildings.clear());
    let snapshot = coordinator(api).refresh().await.unwrap();
    assert!(snapshot.devices.is_empty());
}

#[tokio::test]
async fn malformed_field_is_recorded_and_omitted() {
    let mut record = boiler();
    record["mbt"] = json!("hot");
    let snapshot = coordinator(FakeApi::with_device(record)).refresh().await.unwrap();
    let device = snapshot.device("SYNC1").unwrap();
    assert!(!device.has(keys::HOT_TANK_MAX_TEMP));
    assert!(device.has(keys::HOT_TANK_MIN_TEMP));
    assert_eq!(device.failed_parameters, vec![keys::HOT_TANK_MAX_TEMP.to_string()]);
}

#[tokio::test]
async fn entities_go_unavailable_when_device_disappears() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    let snapshot = coordinator.refresh().await.unwrap();
    let entities = platform::setup(&snapshot);
    assert!(!entities.is_empty());

    let state = coordinator.state();
    assert!(entities.numbers.iter().any(|n| n.available(&state)));
    assert!(entities.climates.iter().all(|c| c.available(&state)));

    coordinator.api().edit(|s| s.devices.clear());
    coordinator.refresh().await.unwrap();

    let state = coordinator.state();
    assert!(entities.sensors.iter().all(|e| !e.available(&state)));
    assert!(entities.binary_sensors.iter().all(|e| !e.available(&state)));
    assert!(entities.numbers.iter().all(|e| !e.available(&state)));
    assert!(entities.selects.iter().all(|e| !e.available(&state)));
    assert!(entities.switches.iter().all(|e| !e.available(&state)));
    assert!(entities.climates.iter().all(|e| !e.available(&state)));
}

#[tokio::test]
async fn absent_backup_creates_no_backup_state_entities() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    let snapshot = coordinator.refresh().await.unwrap();
    let entities = platform::setup(&snapshot);
    let backup_state = |uid: &str| {
        uid.starts_with("SYNC1_backup_r") || uid.starts_with("SYNC1_backup_enabled")
    };
    assert!(entities.ids().all(|id| !backup_state(&id.unique_id)));

    let mut record = boiler();
    record["backup"] = json!({"title": "Boiler Backup", "activated": true, "runTime": "5:00:00"});
    coordinator.api().edit(|s| {
        s.devices.insert("b1".into(), vec![record]);
    });
    let snapshot = coordinator.refresh().await.unwrap();
    let entities = platform::setup(&snapshot);
    let ids: Vec<_> = entities.ids().map(|id| id.unique_id.as_str()).collect();
    assert!(ids.contains(&"SYNC1_backup_runtime"));
    assert!(ids.contains(&"SYNC1_backup_running"));
    assert!(ids.contains(&"SYNC1_backup_enabled"));
}

#[tokio::test]
async fn absent_keys_create_no_entities() {
    let coordinator = coordinator(FakeApi::with_device(json!({"syncCode": "BARE"})));
    let snapshot = coordinator.refresh().await.unwrap();
    assert!(platform::setup(&snapshot).is_empty());
}

#[tokio::test]
async fn number_write_targets_listed_building() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    let snapshot = coordinator.refresh().await.unwrap();
    let entities = platform::setup(&snapshot);

    let target = entities
        .numbers
        .iter()
        .find(|n| n.id.unique_id == "SYNC1_hot_tank_target_temp")
        .unwrap();
    target.set_value(&coordinator, 125.0).await.unwrap();

    let err = target.set_value(&coordinator, 250.0).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { .. }), "got {err:?}");

    let writes = coordinator.api().writes();
    assert_eq!(
        writes,
        vec![
            ("b1".to_string(), "SYNC1".to_string(), "dbt", json!(125)),
            ("b1".to_string(), "SYNC1".to_string(), "mbt", json!(125)),
        ]
    );
}

#[tokio::test]
async fn switches_write_defaults_and_off() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    let snapshot = coordinator.refresh().await.unwrap();
    let entities = platform::setup(&snapshot);
    let reset = entities
        .switches
        .iter()
        .find(|s| s.id.unique_id == "SYNC1_hot_tank_outdoor_reset_enabled")
        .unwrap();
    let state = coordinator.state();
    assert_eq!(reset.is_on(&state), Some(false));

    reset.turn_on(&coordinator).await.unwrap();
    reset.turn_off(&coordinator).await.unwrap();

    let values: Vec<_> = coordinator.api().writes().into_iter().map(|w| (w.2, w.3)).collect();
    assert_eq!(values, vec![("dot", json!(0)), ("dot", json!("off"))]);
}

#[tokio::test]
async fn select_and_climate_write_priority() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    let snapshot = coordinator.refresh().await.unwrap();
    let entities = platform::setup(&snapshot);

    entities.selects[0].select_option(&coordinator, "auto").await.unwrap();
    let err = entities.selects[0]
        .select_option(&coordinator, "turbo")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidMode(_)));

    let climate = &entities.climates[0];
    climate.set_hvac_mode(&coordinator, HvacMode::Cool).await.unwrap();
    let err = climate
        .set_hvac_mode(&coordinator, HvacMode::Off)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidMode(_)));

    let values: Vec<_> = coordinator.api().writes().into_iter().map(|w| (w.2, w.3)).collect();
    assert_eq!(values, vec![("prior", json!(2)), ("prior", json!(1))]);
}

#[tokio::test]
async fn climate_temperature_follows_mode() {
    let mut record = boiler();
    record["prior"] = json!(1);
    let coordinator = coordinator(FakeApi::with_device(record));
    let snapshot = coordinator.refresh().await.unwrap();
    let entities = platform::setup(&snapshot);

    entities.climates[0]
        .set_temperature(&coordinator, 50.0)
        .await
        .unwrap();
    let fields: Vec<_> = coordinator.api().writes().into_iter().map(|w| w.2).collect();
    assert_eq!(fields, vec!["cdbt", "cmbt"]);
}

#[tokio::test]
async fn climate_ignores_missing_device() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    let snapshot = coordinator.refresh().await.unwrap();
    let entities = platform::setup(&snapshot);

    coordinator.api().edit(|s| s.devices.clear());
    coordinator.refresh().await.unwrap();

    entities.climates[0]
        .set_temperature(&coordinator, 130.0)
        .await
        .unwrap();
    assert!(coordinator.api().writes().is_empty());
}

#[tokio::test]
async fn find_device_rejects_unknown_ids() {
    let coordinator = coordinator(FakeApi::with_device(boiler()));
    assert!(matches!(
        coordinator.find_device("SYNC1"),
        Err(Error::UnknownDevice(_))
    ));
    coordinator.refresh().await.unwrap();
    let device = coordinator.find_device("SYNC1").unwrap();
    assert_eq!(device.building_id(), "b1");
}

#[tokio::test]
async fn run_polls_until_shutdown_and_closes() {
    let polled = Arc::new(Notify::new());
    let signal = polled.clone();
    let coordinator = Coordinator::builder(FakeApi::with_device(boiler()), Config::new("u", "p"))
        .on_snapshot(move |_| signal.notify_one())
        .build();

    coordinator.run(polled.notified()).await.unwrap();

    assert!(coordinator.snapshot().is_some());
    assert!(coordinator.api().state.lock().unwrap().closed);
}

#[tokio::test(start_paused = true)]
async fn refresh_request_polls_before_next_tick() {
    let polls = Arc::new(AtomicUsize::new(0));
    let polled = Arc::new(Notify::new());
    let (count, signal) = (polls.clone(), polled.clone());
    let coordinator = Coordinator::builder(FakeApi::with_device(boiler()), Config::new("u", "p"))
        .on_snapshot(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            signal.notify_one();
        })
        .build();

    let stop = Arc::new(Notify::new());
    let runner = {
        let coordinator = coordinator.clone();
        let stop = stop.clone();
        tokio::spawn(async move { coordinator.run(stop.notified()).await })
    };

    polled.notified().await;
    assert_eq!(polls.load(Ordering::SeqCst), 1);

    let requested = tokio::time::Instant::now();
    coordinator.request_refresh();
    tokio::time::timeout(Duration::from_secs(10), polled.notified())
        .await
        .expect("requested refresh should poll before the next tick");
    assert_eq!(polls.load(Ordering::SeqCst), 2);
    assert!(requested.elapsed() < coordinator.config().scan_interval());

    stop.notify_one();
    runner.await.unwrap().unwrap();
    assert!(coordinator.api().state.lock().unwrap().closed);
}

#[tokio::test]
async fn run_stops_when_reauth_is_needed() {
    let api = FakeApi::with_device(boiler());
    api.edit(|s| s.reject_login = true);
    let coordinator = coordinator(api);

    let result = coordinator.run(std::future::pending()).await;
    assert!(matches!(result, Err(UpdateError::ReauthRequired(_))));
    assert!(coordinator.api().state.lock().unwrap().closed);
}
