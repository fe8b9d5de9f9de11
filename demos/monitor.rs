use std::env;

use hbx_sensorlinx::platform::{self, sensor::SensorValue};
use hbx_sensorlinx::{Config, Coordinator, CoordinatorState, SensorLinx, SensorLinxBuilder};

#[tokio::main]
async fn main() -> hbx_sensorlinx::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let path = args.get(1).expect("usage: monitor <config.toml>");
    let config = Config::load(path)?;

    let client: SensorLinx = SensorLinxBuilder::from_config(&config).build()?;
    let coordinator = Coordinator::builder(client, config)
        .on_snapshot(|snapshot| {
            let entities = platform::setup(snapshot);
            let state = CoordinatorState {
                snapshot: Some(std::sync::Arc::new(snapshot.clone())),
                last_update_success: true,
            };
            for device in snapshot.devices.values() {
                println!(
                    "[{}] {} ({} parameters, {} unreadable)",
                    device.id,
                    device.display_name(),
                    device.parameters.len(),
                    device.failed_parameters.len(),
                );
            }
            for sensor in &entities.sensors {
                match sensor.value(&state) {
                    Some(SensorValue::Number(n)) => {
                        println!("  {}: {n:.1}{}", sensor.id.name, sensor.unit().unwrap_or(""))
                    }
                    Some(SensorValue::Text(s)) => println!("  {}: {s}", sensor.id.name),
                    None => {}
                }
            }
            for climate in &entities.climates {
                println!(
                    "  {}: mode {:?}, action {:?}, target {:?}",
                    climate.id.name,
                    climate.hvac_mode(&state),
                    climate.hvac_action(&state),
                    climate.target_temperature(&state),
                );
            }
        })
        .on_error(|e| eprintln!("Poll error: {e}"))
        .build();

    println!("Polling every {:?}...", coordinator.config().scan_interval());
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    if let Err(e) = coordinator.run(shutdown).await {
        eprintln!("Stopped: {e}");
    }
    Ok(())
}
