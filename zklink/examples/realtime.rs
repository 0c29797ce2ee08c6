//! Print attendance events as they happen
//!
//! ```text
//! DEVICE_IP=192.168.1.201 RUST_LOG=zklink=debug cargo run --example realtime
//! ```

use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zklink::{ConnectOptions, DeviceRegistry, EventMask};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.201".to_string());

    let registry = DeviceRegistry::new();
    let mut events = registry.subscribe();

    let device = registry
        .connect("gate", ConnectOptions::new(ip.as_str()))
        .await?;
    device.init_realtime(EventMask::ATTENDANCE).await?;

    info!("Waiting for events, press Ctrl+C to stop");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!(
                    "[{}] user {} verified ({}) at {}",
                    event.device, event.event.user_id, event.event.verify_type, event.event.time
                ),
                Err(RecvError::Lagged(missed)) => info!("Missed {} events", missed),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    registry.disconnect_all().await?;

    Ok(())
}
