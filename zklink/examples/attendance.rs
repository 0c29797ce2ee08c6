//! Read users and the attendance log from one or more terminals
//!
//! ```text
//! DEVICES=192.168.1.201,192.168.1.202 DEVICE_PASSWORD=0 cargo run --example attendance
//! ```

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use zklink::{ConnectOptions, DeviceRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let hosts = std::env::var("DEVICES").unwrap_or_else(|_| "192.168.1.201".to_string());
    let password: u32 = std::env::var("DEVICE_PASSWORD")
        .unwrap_or_else(|_| "0".to_string())
        .parse()
        .context("DEVICE_PASSWORD must be a number")?;

    let registry = DeviceRegistry::new();

    for host in hosts.split(',').map(str::trim).filter(|h| !h.is_empty()) {
        let options = ConnectOptions::new(host).with_password(password);
        registry
            .connect(host, options)
            .await
            .with_context(|| format!("connecting to {}", host))?;
    }

    for id in registry.ids() {
        let device = registry.get(&id)?;

        let status = device.device_status().await?;
        println!(
            "[{}] {} users, {} fingerprints, clock {}",
            id,
            status.user_count,
            status.fingerprint_count,
            device.get_time().await?
        );

        for user in device.read_all_users().await? {
            println!("[{}] {}", id, user);
        }

        let log = device.read_attendance_log().await?;
        println!("[{}] {} attendance records", id, log.len());
        for record in log.iter().rev().take(10) {
            println!("[{}] {}", id, record);
        }
    }

    registry.disconnect_all().await?;

    Ok(())
}
