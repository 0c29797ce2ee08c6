//! Record layouts exchanged with ZKTeco terminals
//!
//! Every record is a packed little-endian structure. Decoding never mutates
//! the input and never reads past the slice it was handed.

pub mod attendance;
pub mod enroll;
pub mod error;
pub mod event;
pub mod records;
pub mod status;
pub mod time;
pub mod user;

pub use attendance::{AttendanceRecord, VerifyState};
pub use enroll::EnrollRequest;
pub use error::{Error, Result};
pub use event::{EventMask, RealtimeEvent};
pub use records::{FixedRecord, decode_record_array};
pub use status::MachineStatus;
pub use time::Timestamp;
pub use user::{Privilege, UserPermissions, UserRecord};
