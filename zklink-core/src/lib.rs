//! # zklink-core
//!
//! Core protocol implementation for ZKTeco biometric terminals.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet framing and encoding/decoding
//! - Checksum calculation
//! - CommKey authentication
//! - Command definitions
//! - Session state and reply numbering
//! - Protocol constants

pub mod auth;
pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod packet;
pub mod session;

pub use auth::{commkey_payload, make_commkey};
pub use command::Command;
pub use error::{Error, Result};
pub use packet::{Packet, PacketHeader};
pub use session::{Session, SessionState};

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "1.0";

/// Default device port
pub const DEFAULT_PORT: u16 = 4370;
