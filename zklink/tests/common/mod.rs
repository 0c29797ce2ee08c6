//! In-process terminal that answers the driver over a duplex pipe

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

use zklink::{Command, ConnectOptions, DeviceRegistry, MemoryTransport, Packet};
use zklink_core::{PacketHeader, commkey_payload};

pub const SESSION_ID: u16 = 0x1234;

/// Scripted terminal behaviour
#[derive(Debug, Default)]
pub struct Terminal {
    pub session_id: u16,
    /// Password the terminal demands; `None` skips CMD_AUTH
    pub password: Option<u32>,
    pub users: Vec<u8>,
    pub attendance: Vec<u8>,
    /// Answer CMD_DATA_WRRQ with a size hint instead of the records
    pub chunked: bool,
    pub config: HashMap<String, String>,
    /// Reply code to use instead of ACK_OK, by command
    pub rejects: HashMap<u16, u16>,
    /// Commands that never get an answer
    pub silent: HashSet<u16>,
    /// Data carried by the ACK_OK for a command
    pub answers: HashMap<u16, Vec<u8>>,
    staged: Vec<u8>,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            session_id: SESSION_ID,
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: u32) -> Self {
        self.password = Some(password);
        self
    }

    pub fn with_session_id(mut self, session_id: u16) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_users(mut self, records: Vec<u8>) -> Self {
        self.users = records;
        self
    }

    pub fn with_attendance(mut self, records: Vec<u8>) -> Self {
        self.attendance = records;
        self
    }

    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.config.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn rejecting(mut self, command: Command, code: Command) -> Self {
        self.rejects.insert(command.into(), code.into());
        self
    }

    pub fn silent_on(mut self, command: Command) -> Self {
        self.silent.insert(command.into());
        self
    }

    pub fn answering(mut self, command: Command, data: Vec<u8>) -> Self {
        self.answers.insert(command.into(), data);
        self
    }

    fn reply(&self, code: Command, request: &Packet) -> Packet {
        Packet::new(code, self.session_id, request.reply_id)
    }

    fn reply_with(&self, code: Command, request: &Packet, data: Vec<u8>) -> Packet {
        Packet::with_data(code, self.session_id, request.reply_id, data)
    }

    fn respond(&mut self, request: &Packet) -> Vec<Packet> {
        if self.silent.contains(&request.command) {
            return Vec::new();
        }
        if let Some(&code) = self.rejects.get(&request.command) {
            return vec![Packet::new(code, self.session_id, request.reply_id)];
        }

        match Command::try_from(request.command) {
            Ok(Command::Connect) => match self.password {
                Some(_) => vec![self.reply(Command::AckUnauth, request)],
                None => vec![self.reply(Command::AckOk, request)],
            },
            Ok(Command::Auth) => {
                let expected = self
                    .password
                    .map(|password| commkey_payload(password, self.session_id, 50));
                if expected.as_ref().map(|key| &key[..]) == Some(&request.data[..]) {
                    vec![self.reply(Command::AckOk, request)]
                } else {
                    vec![self.reply(Command::AckUnauth, request)]
                }
            }
            Ok(Command::DataWriteRequest) => {
                let records = if request.data.get(1) == Some(&0x09) {
                    &self.users
                } else {
                    &self.attendance
                };
                self.staged = record_array(records);

                if self.chunked {
                    let mut hint = vec![0u8];
                    hint.extend_from_slice(&(self.staged.len() as u32).to_le_bytes());
                    vec![self.reply_with(Command::AckOk, request, hint)]
                } else {
                    vec![self.reply_with(Command::Data, request, self.staged.clone())]
                }
            }
            Ok(Command::DataReady) => vec![
                self.reply(Command::PrepareData, request),
                self.reply_with(Command::Data, request, self.staged.clone()),
                self.reply(Command::AckOk, request),
            ],
            Ok(Command::OptionsRrq) => {
                let end = request
                    .data
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(request.data.len());
                let key = String::from_utf8_lossy(&request.data[..end]).into_owned();
                match self.config.get(&key) {
                    Some(value) => {
                        let mut text = format!("{}={}", key, value).into_bytes();
                        text.push(0);
                        vec![self.reply_with(Command::AckOk, request, text)]
                    }
                    None => vec![self.reply(Command::AckError, request)],
                }
            }
            _ => match self.answers.get(&request.command) {
                Some(data) => vec![self.reply_with(Command::AckOk, request, data.clone())],
                None => vec![self.reply(Command::AckOk, request)],
            },
        }
    }
}

/// `[u32 byte count][records]`
pub fn record_array(records: &[u8]) -> Vec<u8> {
    let mut array = (records.len() as u32).to_le_bytes().to_vec();
    array.extend_from_slice(records);
    array
}

/// One 40-byte attendance slot
pub fn attendance_record(serial: u16, user_id: &str, packed_time: u32) -> Vec<u8> {
    let mut record = vec![0u8; 40];
    record[0..2].copy_from_slice(&serial.to_le_bytes());
    record[2..2 + user_id.len()].copy_from_slice(user_id.as_bytes());
    record[26] = 1;
    record[27..31].copy_from_slice(&packed_time.to_le_bytes());
    record[36] = 0xFF;
    record
}

/// One 32-byte real-time attendance event, pushed with the given sub-type
pub fn realtime_event(kind: u16, user_id: &str, time: [u8; 6]) -> Packet {
    let mut data = vec![0u8; 32];
    data[..user_id.len()].copy_from_slice(user_id.as_bytes());
    data[24] = 1;
    data[26..32].copy_from_slice(&time);
    Packet::with_data(Command::RegEvent, kind, 0, data)
}

/// Handle on a running mock terminal
pub struct MockTerminal {
    received: Arc<Mutex<Vec<Packet>>>,
    outbound: mpsc::UnboundedSender<Packet>,
}

impl MockTerminal {
    pub fn spawn(mut terminal: Terminal, stream: DuplexStream) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let (outbound, mut queue) = mpsc::unbounded_channel::<Packet>();
        let (mut read_half, mut write_half) = tokio::io::split(stream);

        let log = received.clone();
        let replies = outbound.clone();
        tokio::spawn(async move {
            while let Some(request) = read_frame(&mut read_half).await {
                log.lock().push(request.clone());
                for reply in terminal.respond(&request) {
                    if replies.send(reply).is_err() {
                        return;
                    }
                }
            }
        });

        tokio::spawn(async move {
            while let Some(packet) = queue.recv().await {
                if write_half.write_all(&packet.encode()).await.is_err() {
                    break;
                }
            }
        });

        Self { received, outbound }
    }

    /// Send an unsolicited packet to the driver
    pub fn push(&self, packet: Packet) {
        let _ = self.outbound.send(packet);
    }

    pub fn received(&self) -> Vec<Packet> {
        self.received.lock().clone()
    }

    pub fn commands(&self) -> Vec<u16> {
        self.received.lock().iter().map(|p| p.command).collect()
    }

    /// Wait until the terminal has seen `count` packets
    pub async fn wait_for_packets(&self, count: usize) {
        for _ in 0..200 {
            if self.received.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Option<Packet> {
    let mut header = [0u8; Packet::HEADER_SIZE];
    reader.read_exact(&mut header).await.ok()?;
    let header = PacketHeader::parse(&header).ok()?;

    let mut data = vec![0u8; header.data_len()];
    reader.read_exact(&mut data).await.ok()?;

    Packet::from_parts(&header, data.into()).ok()
}

pub fn options() -> ConnectOptions {
    ConnectOptions::new("mock").with_reply_timeout(Some(Duration::from_millis(300)))
}

/// Register a device backed by `terminal` under `id`
pub async fn connect(
    registry: &DeviceRegistry,
    id: &str,
    terminal: Terminal,
    options: ConnectOptions,
) -> (zklink::Result<Arc<zklink::Device>>, MockTerminal) {
    let (transport, remote) = MemoryTransport::pair(id, 64 * 1024);
    let mock = MockTerminal::spawn(terminal, remote);
    let device = registry.connect_with(id, Box::new(transport), options).await;
    (device, mock)
}
