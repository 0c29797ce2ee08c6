//! Receive task
//!
//! One task per connected device owns the read half of its transport. It
//! reads whole frames, publishes real-time events and hands every other
//! packet to the pending-reply table of its own device.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, watch};
use tracing::{debug, trace, warn};

use zklink_core::constants::events::EF_ATTLOG;
use zklink_core::{Packet, PacketHeader, Session};
use zklink_transport::TransportReader;
use zklink_types::{FixedRecord, RealtimeEvent};

use crate::error::Result;
use crate::event::{DeviceEvent, DeviceId};
use crate::pending::PendingReplies;

/// Everything the receive task shares with its device
pub(crate) struct Receiver {
    pub device: DeviceId,
    pub session: Session,
    pub pending: Arc<PendingReplies>,
    pub events: broadcast::Sender<DeviceEvent>,
}

impl Receiver {
    /// Read until shutdown, EOF or a framing error
    pub async fn run(self, mut reader: Box<dyn TransportReader>, mut shutdown: watch::Receiver<bool>) {
        debug!(device = %self.device, "Receive task started");

        let result: Result<()> = loop {
            if *shutdown.borrow() {
                break Ok(());
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                }
                ready = reader.wait_readable() => {
                    if let Err(e) = ready {
                        break Err(e.into());
                    }
                    match read_packet(reader.as_mut()).await {
                        Ok(packet) => self.dispatch(packet),
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        self.pending.close();

        match result {
            Ok(()) => debug!(device = %self.device, "Receive task stopped"),
            Err(e) => {
                if *shutdown.borrow() {
                    debug!(device = %self.device, "Receive task stopped: {}", e);
                } else {
                    warn!(device = %self.device, "Receive task failed: {}", e);
                    self.session.set_last_error(e.to_string());
                }
            }
        }
    }

    fn dispatch(&self, packet: Packet) {
        if packet.is_event() {
            self.publish(packet);
            return;
        }

        if !self.pending.deposit(packet) {
            debug!(device = %self.device, "Reply arrived after close, dropped");
        }
    }

    fn publish(&self, packet: Packet) {
        // Real-time packets carry the event type in the session id field
        let kind = packet.session_id;
        if kind != EF_ATTLOG {
            debug!(device = %self.device, kind, "Ignoring real-time event");
            return;
        }

        match RealtimeEvent::decode(&packet.data) {
            Ok(event) => {
                debug!(device = %self.device, user_id = %event.user_id, "Attendance event");
                // No subscribers is fine
                let _ = self.events.send(DeviceEvent {
                    device: self.device.clone(),
                    event,
                });
            }
            Err(e) => warn!(device = %self.device, "Malformed attendance event: {}", e),
        }
    }
}

/// Read one complete frame
pub(crate) async fn read_packet(reader: &mut dyn TransportReader) -> Result<Packet> {
    let header_bytes = reader.receive_exact(Packet::HEADER_SIZE).await?;
    let header = PacketHeader::parse(&header_bytes)?;

    let data = match header.data_len() {
        0 => Bytes::new(),
        len => reader.receive_exact(len).await?.freeze(),
    };

    let packet = Packet::from_parts(&header, data)?;

    if let Err(e) = packet.verify_checksum(header.checksum) {
        warn!("{} (processing anyway)", e);
    }

    trace!(
        "Received: {:?} data={}",
        packet,
        hex::encode(&packet.data[..packet.data.len().min(64)])
    );

    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use zklink_core::Command;
    use zklink_transport::StreamReader;

    fn event_frame(kind: u16, user_id: &str) -> Vec<u8> {
        let mut data = vec![0u8; 32];
        data[..user_id.len()].copy_from_slice(user_id.as_bytes());
        data[24] = 1;
        data[26..32].copy_from_slice(&[24, 1, 15, 8, 0, 0]);
        Packet::with_data(Command::RegEvent, kind, 0, data).encode().to_vec()
    }

    fn spawn_receiver(
        stream: tokio::io::DuplexStream,
    ) -> (
        Arc<PendingReplies>,
        broadcast::Receiver<DeviceEvent>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
        Session,
    ) {
        let (events, rx) = broadcast::channel(8);
        let (stop, shutdown) = watch::channel(false);
        let pending = Arc::new(PendingReplies::new());
        let session = Session::new();

        let receiver = Receiver {
            device: DeviceId::from("gate"),
            session: session.clone(),
            pending: pending.clone(),
            events,
        };
        let handle = tokio::spawn(receiver.run(Box::new(StreamReader::new(stream)), shutdown));

        (pending, rx, stop, handle, session)
    }

    #[tokio::test]
    async fn test_replies_and_events_are_separated() {
        let (local, mut remote) = tokio::io::duplex(4096);
        let (pending, mut events, stop, handle, _session) = spawn_receiver(local);

        remote.write_all(&event_frame(EF_ATTLOG, "77")).await.unwrap();
        let reply = Packet::with_data(Command::AckOk, 0x1234, 5, vec![1, 2, 3]);
        remote.write_all(&reply.encode()).await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.device.as_str(), "gate");
        assert_eq!(event.event.user_id, "77");
        assert_eq!(event.event.time.to_string(), "2024-01-15 08:00:00");

        let packet = pending.wait_for(5).await.unwrap();
        assert_eq!(&packet.data[..], &[1, 2, 3]);
        assert_eq!(pending.len(), 0);

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_event_types_are_dropped() {
        let (local, mut remote) = tokio::io::duplex(4096);
        let (pending, mut events, stop, handle, _session) = spawn_receiver(local);

        remote.write_all(&event_frame(1 << 3, "77")).await.unwrap();
        remote
            .write_all(&Packet::new(Command::AckOk, 0, 1).encode())
            .await
            .unwrap();

        pending.wait_for(1).await.unwrap();
        assert!(events.try_recv().is_err());
        assert_eq!(pending.len(), 0);

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_frame_split_across_writes() {
        let (local, mut remote) = tokio::io::duplex(4096);
        let (pending, _events, stop, handle, _session) = spawn_receiver(local);

        let frame = Packet::with_data(Command::AckData, 1, 2, vec![9; 40]).encode();
        remote.write_all(&frame[..5]).await.unwrap();
        tokio::task::yield_now().await;
        remote.write_all(&frame[5..20]).await.unwrap();
        tokio::task::yield_now().await;
        remote.write_all(&frame[20..]).await.unwrap();

        let packet = pending.wait_for(2).await.unwrap();
        assert_eq!(packet.data.len(), 40);

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_checksum_still_delivered() {
        let (local, mut remote) = tokio::io::duplex(4096);
        let (pending, _events, stop, handle, _session) = spawn_receiver(local);

        let mut frame = Packet::new(Command::AckOk, 1, 7).encode();
        frame[10] ^= 0xFF;
        remote.write_all(&frame).await.unwrap();

        assert_eq!(pending.wait_for(7).await.unwrap().command, Command::AckOk);

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_closes_pending() {
        let (local, remote) = tokio::io::duplex(4096);
        let (pending, _events, _stop, handle, session) = spawn_receiver(local);

        drop(remote);
        handle.await.unwrap();

        assert!(pending.is_closed());
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn test_bad_marker_stops_task() {
        let (local, mut remote) = tokio::io::duplex(4096);
        let (pending, _events, _stop, handle, session) = spawn_receiver(local);

        remote.write_all(&[0u8; 16]).await.unwrap();
        handle.await.unwrap();

        assert!(pending.is_closed());
        assert!(session.last_error().unwrap().contains("marker"));
    }
}
