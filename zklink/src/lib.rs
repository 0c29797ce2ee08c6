//! # zklink
//!
//! Multi-device driver for ZKTeco biometric attendance terminals.
//!
//! ## Features
//!
//! - One connection per terminal, many terminals per process
//! - Async/await API using Tokio
//! - Replies correlated by reply number, real-time events broadcast separately
//! - Bulk reads of users and the attendance log, single packet or chunked
//!
//! ## Quick Start
//!
//! ```no_run
//! use zklink::{ConnectOptions, DeviceRegistry};
//!
//! #[tokio::main]
//! async fn main() -> zklink::Result<()> {
//!     let registry = DeviceRegistry::new();
//!
//!     // Connect to device
//!     let device = registry
//!         .connect("front-door", ConnectOptions::new("192.168.1.201"))
//!         .await?;
//!
//!     for record in device.read_attendance_log().await? {
//!         println!("{}", record);
//!     }
//!
//!     // Disconnect
//!     registry.disconnect_all().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod device;
pub mod error;
pub mod event;
pub mod options;
pub mod registry;

mod pending;
mod receiver;
mod transfer;

// Re-exports
pub use commands::Refresh;
pub use device::Device;
pub use error::{Error, Result};
pub use event::{DeviceEvent, DeviceId};
pub use options::ConnectOptions;
pub use registry::DeviceRegistry;

// Re-export types
pub use zklink_core::{Command, Packet, SessionState};
pub use zklink_transport::{MemoryTransport, TcpTransport, Transport};
pub use zklink_types::{
    AttendanceRecord, EnrollRequest, EventMask, MachineStatus, Privilege, RealtimeEvent, Timestamp,
    UserPermissions, UserRecord, VerifyState,
};
