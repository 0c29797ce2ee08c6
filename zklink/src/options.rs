//! Connection options

use std::time::Duration;

use zklink_core::DEFAULT_PORT;
use zklink_core::constants::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TICKS, DEFAULT_TIMEOUT};
use zklink_transport::TcpTransport;

/// Capacity of the real-time event channel shared by all devices
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How to reach and talk to one terminal
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Host name or IP address
    pub host: String,
    /// TCP port, 4370 unless changed on the device
    pub port: u16,
    /// Communication password (0 when none is set)
    pub password: u32,
    /// Ticks value mixed into the CommKey
    pub ticks: u8,
    /// How long to wait for each reply; `None` waits forever
    pub reply_timeout: Option<Duration>,
    /// How long to wait for the TCP connection
    pub connect_timeout: Duration,
    /// Bound on reading the rest of a frame once its first byte arrived
    pub receive_timeout: Option<Duration>,
    pub nodelay: bool,
    /// TCP keep-alive, on by default so idle terminals are noticed
    pub keepalive: bool,
    /// Drop attendance records whose packed time is zero
    pub skip_empty_attendance: bool,
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            password: 0,
            ticks: DEFAULT_TICKS,
            reply_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT)),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            receive_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT)),
            nodelay: true,
            keepalive: true,
            skip_empty_attendance: true,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: u32) -> Self {
        self.password = password;
        self
    }

    pub fn with_ticks(mut self, ticks: u8) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_skip_empty_attendance(mut self, skip: bool) -> Self {
        self.skip_empty_attendance = skip;
        self
    }

    /// Build the TCP transport these options describe
    pub fn tcp_transport(&self) -> TcpTransport {
        TcpTransport::new(self.host.clone(), self.port)
            .with_connect_timeout(self.connect_timeout)
            .with_receive_timeout(self.receive_timeout)
            .with_nodelay(self.nodelay)
            .with_keepalive(self.keepalive)
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zklink_transport::Transport;

    #[test]
    fn test_defaults() {
        let options = ConnectOptions::new("192.168.1.201");

        assert_eq!(options.port, 4370);
        assert_eq!(options.password, 0);
        assert_eq!(options.ticks, 50);
        assert_eq!(options.reply_timeout, Some(Duration::from_secs(5)));
        assert!(options.skip_empty_attendance);
        assert!(options.keepalive);
    }

    #[test]
    fn test_builder() {
        let options = ConnectOptions::new("10.0.0.7")
            .with_port(4371)
            .with_password(12345)
            .with_reply_timeout(None)
            .with_skip_empty_attendance(false);

        assert_eq!(options.port, 4371);
        assert_eq!(options.password, 12345);
        assert_eq!(options.reply_timeout, None);
        assert!(!options.skip_empty_attendance);
        assert_eq!(options.tcp_transport().remote_addr(), "10.0.0.7:4371");
    }
}
