//! One connected terminal
//!
//! A [`Device`] owns the write half of its transport, the receive task bound
//! to the read half and the table where that task leaves replies. Requests
//! are correlated with replies by reply number only, so every device keeps
//! its own numbering and two devices never see each other's traffic.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use zklink_core::constants::DEFAULT_TIMEOUT;
use zklink_core::{Command, Packet, Session, SessionState, commkey_payload};
use zklink_transport::{Transport, TransportWriter};

use crate::error::{Error, Result};
use crate::event::{DeviceEvent, DeviceId};
use crate::options::ConnectOptions;
use crate::pending::PendingReplies;
use crate::receiver::Receiver;

/// ZKTeco device
///
/// Created by [`DeviceRegistry`](crate::DeviceRegistry) or [`Device::connect`];
/// methods take `&self` so a device can be shared behind an `Arc`.
pub struct Device {
    id: DeviceId,
    remote_addr: String,
    options: ConnectOptions,
    session: Session,
    pending: Arc<PendingReplies>,
    writer: Mutex<Box<dyn TransportWriter>>,
    shutdown: watch::Sender<bool>,
    receiver: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Device {
    /// Open `transport`, start the receive task and run the handshake
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - Device doesn't respond within the reply timeout
    /// - Device rejects the password ([`Error::AuthenticationFailed`])
    pub async fn connect(
        id: DeviceId,
        mut transport: Box<dyn Transport>,
        options: ConnectOptions,
        events: broadcast::Sender<DeviceEvent>,
    ) -> Result<Self> {
        info!(device = %id, "Connecting to {}...", transport.remote_addr());

        if !transport.is_connected() {
            transport.connect().await?;
        }
        let remote_addr = transport.remote_addr();
        let (reader, writer) = transport.into_split()?;

        let session = Session::new();
        session.begin_connect()?;

        let pending = Arc::new(PendingReplies::new());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let receiver = Receiver {
            device: id.clone(),
            session: session.clone(),
            pending: pending.clone(),
            events,
        };
        let handle = tokio::spawn(receiver.run(reader, shutdown_rx));

        let device = Self {
            id,
            remote_addr,
            options,
            session,
            pending,
            writer: Mutex::new(writer),
            shutdown,
            receiver: parking_lot::Mutex::new(Some(handle)),
        };

        if let Err(e) = device.handshake().await {
            warn!(device = %device.id, "Handshake failed: {}", e);
            device.session.set_last_error(e.to_string());
            device.teardown().await;
            return Err(e);
        }

        Ok(device)
    }

    /// CMD_CONNECT, then CMD_AUTH if the device asks for it
    async fn handshake(&self) -> Result<()> {
        let reply = self
            .exchange(
                Command::Connect,
                0,
                Session::CONNECT_REPLY_ID,
                Bytes::new(),
                self.options.reply_timeout,
            )
            .await?;

        match reply.kind() {
            Some(Command::AckOk) => {
                self.session.establish(reply.session_id)?;
                info!(
                    device = %self.id,
                    "Connected successfully (session_id={})",
                    reply.session_id
                );
                Ok(())
            }
            Some(Command::AckUnauth) => {
                info!(device = %self.id, "Device requires authentication, sending password...");

                let session_id = reply.session_id;
                self.session.require_auth(session_id)?;

                let key = commkey_payload(self.options.password, session_id, self.options.ticks);
                debug!(device = %self.id, "Auth key: {} (session_id={})", hex::encode(key), session_id);

                let auth = self
                    .exchange(
                        Command::Auth,
                        session_id,
                        Session::AUTH_REPLY_ID,
                        Bytes::copy_from_slice(&key),
                        self.options.reply_timeout,
                    )
                    .await?;

                match auth.kind() {
                    Some(Command::AckOk) => {
                        self.session.authenticate()?;
                        info!(
                            device = %self.id,
                            "Authenticated successfully (session_id={})",
                            session_id
                        );
                        Ok(())
                    }
                    Some(Command::AckUnauth) => Err(Error::AuthenticationFailed),
                    _ => Err(Error::Device {
                        command: Command::Auth.into(),
                        code: auth.command,
                    }),
                }
            }
            _ => Err(Error::Device {
                command: Command::Connect.into(),
                code: reply.command,
            }),
        }
    }

    /// Send CMD_EXIT, stop the receive task and drop every pending reply
    ///
    /// Failure to deliver CMD_EXIT is logged and ignored. The wait for its
    /// reply is bounded even when the reply timeout is disabled.
    pub async fn disconnect(&self) -> Result<()> {
        if !self.session.begin_disconnect() {
            return Ok(());
        }

        info!(device = %self.id, "Disconnecting from {}...", self.remote_addr);

        if !self.pending.is_closed() {
            let reply_id = self.session.next_reply_id();
            let limit = self
                .options
                .reply_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT));
            match self
                .exchange(
                    Command::Exit,
                    self.session.session_id(),
                    reply_id,
                    Bytes::new(),
                    Some(limit),
                )
                .await
            {
                Ok(reply) if !reply.is_success() => {
                    warn!(device = %self.id, "EXIT answered with {}", Command::name_of(reply.command))
                }
                Ok(_) => {}
                Err(e) => warn!(device = %self.id, "Failed to send EXIT command: {}", e),
            }
        }

        self.teardown().await;

        info!(device = %self.id, "Disconnected");
        Ok(())
    }

    /// Tear down without CMD_EXIT, for a device that is going away by itself
    pub(crate) async fn close(&self) {
        if self.session.begin_disconnect() {
            self.teardown().await;
            info!(device = %self.id, "Connection closed");
        }
    }

    async fn teardown(&self) {
        let _ = self.shutdown.send(true);

        if let Err(e) = self.writer.lock().await.disconnect().await {
            debug!(device = %self.id, "Closing writer failed: {}", e);
        }

        let handle = self.receiver.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(device = %self.id, "Receive task ended abnormally: {}", e);
            }
        }

        self.pending.close();
        self.session.close();
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    pub fn session_id(&self) -> u16 {
        self.session.session_id()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.session.is_connected() && !self.pending.is_closed()
    }

    /// Whether the device demanded CMD_AUTH during the handshake
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Last error recorded for this device
    pub fn last_error(&self) -> Option<String> {
        self.session.last_error()
    }

    /// Issue `command` and require an ACK_OK or ACK_DATA reply
    pub async fn act(&self, command: Command, data: &[u8]) -> Result<()> {
        self.act_with_data(command, data).await.map(|_| ())
    }

    /// Issue `command` and return the data carried by its successful reply
    pub async fn act_with_data(&self, command: Command, data: &[u8]) -> Result<Bytes> {
        let reply = self.request(command, data).await?;
        self.expect_success(command, &reply)?;
        Ok(reply.data)
    }

    /// Issue `command` and return its reply whatever the reply code
    pub async fn request(&self, command: Command, data: &[u8]) -> Result<Packet> {
        let reply_id = self.send_request(command, data).await?;
        self.await_reply(reply_id).await
    }

    /// Allocate the next reply number and send `command` under it
    pub(crate) async fn send_request(&self, command: Command, data: &[u8]) -> Result<u16> {
        self.ensure_connected()?;

        let reply_id = self.session.next_reply_id();
        let packet = Packet::with_data(
            command,
            self.session.session_id(),
            reply_id,
            Bytes::copy_from_slice(data),
        );
        self.pending.expect(reply_id);
        self.send_packet(&packet).await?;

        Ok(reply_id)
    }

    /// Wait for the next packet filed under `reply_id`
    pub(crate) async fn await_reply(&self, reply_id: u16) -> Result<Packet> {
        let result = self
            .pending
            .wait_for_timeout(reply_id, self.options.reply_timeout)
            .await;

        if let Err(e) = &result {
            self.session.set_last_error(e.to_string());
        }
        result
    }

    /// Forget replies still queued under `reply_id`
    pub(crate) fn discard_replies(&self, reply_id: u16) {
        self.pending.abandon(reply_id);
    }

    /// Fail with [`Error::Device`] unless `reply` acknowledges `command`
    pub(crate) fn expect_success(&self, command: Command, reply: &Packet) -> Result<()> {
        if reply.is_success() {
            return Ok(());
        }

        let err = Error::Device {
            command: command.into(),
            code: reply.command,
        };
        debug!(device = %self.id, "{}", err);
        self.session.set_last_error(err.to_string());
        Err(err)
    }

    /// Send with explicit session and reply numbers; used by the handshake and CMD_EXIT
    async fn exchange(
        &self,
        command: Command,
        session_id: u16,
        reply_id: u16,
        data: Bytes,
        limit: Option<Duration>,
    ) -> Result<Packet> {
        let packet = Packet::with_data(command, session_id, reply_id, data);
        self.pending.expect(reply_id);
        self.send_packet(&packet).await?;
        self.pending.wait_for_timeout(reply_id, limit).await
    }

    /// Write header then data; the writer lock keeps the two writes together
    async fn send_packet(&self, packet: &Packet) -> Result<()> {
        trace!(device = %self.id, "Sending: {:?}", packet);

        let mut writer = self.writer.lock().await;
        writer.send(&packet.encode_header()).await?;
        if !packet.data.is_empty() {
            writer.send(&packet.data).await?;
        }

        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.pending.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        if !self.session.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("state", &self.session.state())
            .field("session_id", &self.session.session_id())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        if self.session.is_connected() {
            warn!(device = %self.id, "Device dropped while still connected");
        }
    }
}
