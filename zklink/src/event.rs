//! Device identities and the events they publish

use std::fmt;

use zklink_types::RealtimeEvent;

/// Caller-chosen name of a registered terminal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

macro_rules! device_id_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for DeviceId {
                fn from(id: $t) -> Self {
                    Self(id.to_string())
                }
            }
        )*
    };
}

device_id_from_int!(u8, u16, u32, u64, usize, i32, i64);

/// A real-time event tagged with the terminal that sent it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub device: DeviceId,
    pub event: RealtimeEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_conversions() {
        assert_eq!(DeviceId::from(7u32), DeviceId::from("7"));
        assert_eq!(DeviceId::from(String::from("gate")).as_str(), "gate");
        assert_eq!(DeviceId::new("front-door").to_string(), "front-door");
    }
}
