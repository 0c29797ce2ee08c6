//! Session management
//!
//! A session represents one connection lifetime with a device and tracks:
//! - Session ID (assigned by device)
//! - Reply counter (one sequence number per outgoing request)
//! - Connection state and whether CMD_AUTH was needed
//! - The last error reported for this device

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::constants::POST_AUTH_REPLY_ID;
use crate::error::{Error, Result};

/// Session state
///
/// ```text
/// Disconnected → Connecting → ┬──────────────────────→ Connected → Disconnecting → Disconnected
///                             └→ AwaitingAuth ─(OK)──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected
    Disconnected,

    /// CMD_CONNECT sent, waiting for the device
    Connecting,

    /// Device answered CMD_ACK_UNAUTH, CMD_AUTH in flight
    AwaitingAuth,

    /// Ready for commands
    Connected,

    /// CMD_EXIT sent, tearing down
    Disconnecting,
}

/// Session manager
///
/// Manages session state and reply ID generation.
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Session ID assigned by device (0 when not connected)
    session_id: AtomicU16,

    /// Next reply number handed out
    reply_counter: AtomicU16,

    /// Whether the device demanded CMD_AUTH
    authenticated: AtomicBool,

    /// Current session state
    state: parking_lot::RwLock<SessionState>,

    /// Last error reported for this device
    last_error: parking_lot::Mutex<Option<String>>,
}

impl Session {
    /// Reply number used for CMD_CONNECT
    pub const CONNECT_REPLY_ID: u16 = 0;

    /// Reply number used for CMD_AUTH
    pub const AUTH_REPLY_ID: u16 = 1;

    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                session_id: AtomicU16::new(0),
                reply_counter: AtomicU16::new(Self::CONNECT_REPLY_ID),
                authenticated: AtomicBool::new(false),
                state: parking_lot::RwLock::new(SessionState::Disconnected),
                last_error: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// Get current session ID
    pub fn session_id(&self) -> u16 {
        self.inner.session_id.load(Ordering::Acquire)
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if ready for commands
    pub fn is_connected(&self) -> bool {
        matches!(self.state(), SessionState::Connected)
    }

    /// Check if the handshake went through CMD_AUTH
    pub fn is_authenticated(&self) -> bool {
        self.inner.authenticated.load(Ordering::Acquire)
    }

    /// Move to `Connecting` before CMD_CONNECT is sent
    pub fn begin_connect(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot connect from state: {:?}",
                *state
            )));
        }

        self.inner.session_id.store(0, Ordering::Release);
        self.inner.reply_counter.store(Self::CONNECT_REPLY_ID, Ordering::Release);
        self.inner.authenticated.store(false, Ordering::Release);
        *state = SessionState::Connecting;

        Ok(())
    }

    /// Device answered CMD_ACK_OK: password-less connection is established
    pub fn establish(&self, session_id: u16) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Connecting {
            return Err(Error::InvalidSessionState(format!(
                "Cannot establish from state: {:?}",
                *state
            )));
        }

        self.inner.session_id.store(session_id, Ordering::Release);
        self.inner
            .reply_counter
            .store(Self::CONNECT_REPLY_ID + 1, Ordering::Release);
        *state = SessionState::Connected;

        Ok(())
    }

    /// Device answered CMD_ACK_UNAUTH: remember the session id, CMD_AUTH comes next
    pub fn require_auth(&self, session_id: u16) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Connecting {
            return Err(Error::InvalidSessionState(format!(
                "Cannot authenticate from state: {:?}",
                *state
            )));
        }

        self.inner.session_id.store(session_id, Ordering::Release);
        *state = SessionState::AwaitingAuth;

        Ok(())
    }

    /// CMD_AUTH accepted; the reply counter is forced to its post-auth value
    pub fn authenticate(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::AwaitingAuth {
            return Err(Error::InvalidSessionState(format!(
                "Cannot complete authentication from state: {:?}",
                *state
            )));
        }

        self.inner
            .reply_counter
            .store(POST_AUTH_REPLY_ID, Ordering::Release);
        self.inner.authenticated.store(true, Ordering::Release);
        *state = SessionState::Connected;

        Ok(())
    }

    /// Move to `Disconnecting`; returns false if there is nothing to tear down
    pub fn begin_disconnect(&self) -> bool {
        let mut state = self.inner.state.write();

        match *state {
            SessionState::Disconnected | SessionState::Disconnecting => false,
            _ => {
                *state = SessionState::Disconnecting;
                true
            }
        }
    }

    /// Close session
    pub fn close(&self) {
        self.inner.session_id.store(0, Ordering::Release);
        self.inner
            .reply_counter
            .store(Self::CONNECT_REPLY_ID, Ordering::Release);
        self.inner.authenticated.store(false, Ordering::Release);
        *self.inner.state.write() = SessionState::Disconnected;
    }

    /// Get next reply ID
    ///
    /// Wraps from 65535 to 0. Nothing guards against a wrapped id colliding with
    /// a request that is still outstanding; with one request in flight per
    /// device this only matters on very long-lived connections.
    pub fn next_reply_id(&self) -> u16 {
        self.inner.reply_counter.fetch_add(1, Ordering::AcqRel)
    }

    /// Record an error for this device
    pub fn set_last_error(&self, message: impl Into<String>) {
        *self.inner.last_error.lock() = Some(message.into());
    }

    /// Last error recorded for this device
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
