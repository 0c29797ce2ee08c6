//! Replies waiting to be claimed by the request that caused them
//!
//! The receive task deposits every non-event packet under its reply number.
//! A request claims packets for its own reply number only, so replies can
//! arrive before the request starts waiting and several packets may queue up
//! under one number (the chunked transfer answers CMD_DATA_RDY three times).
//! Numbers given up on after a timeout stay abandoned until they are issued
//! again, and replies arriving for them in the meantime are dropped.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use zklink_core::Packet;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    replies: HashMap<u16, VecDeque<Packet>>,
    abandoned: HashSet<u16>,
    closed: bool,
}

impl Inner {
    fn pop(&mut self, reply_id: u16) -> Option<Packet> {
        let queue = self.replies.get_mut(&reply_id)?;
        let packet = queue.pop_front();
        if queue.is_empty() {
            self.replies.remove(&reply_id);
        }
        packet
    }
}

/// Per-device table of unclaimed replies
#[derive(Debug, Default)]
pub struct PendingReplies {
    inner: Mutex<Inner>,
    ready: Notify,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accepting replies for `reply_id`; call before the request is sent
    pub fn expect(&self, reply_id: u16) {
        let mut inner = self.inner.lock();
        inner.abandoned.remove(&reply_id);
        if let Some(stale) = inner.replies.remove(&reply_id) {
            debug!(reply_id, dropped = stale.len(), "Discarded stale replies");
        }
    }

    /// Queue a reply and wake waiters; returns false once the table is closed
    ///
    /// Replies for an abandoned reply number are dropped.
    pub fn deposit(&self, packet: Packet) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return false;
            }
            if inner.abandoned.contains(&packet.reply_id) {
                debug!(reply_id = packet.reply_id, "Dropping late reply");
                return true;
            }
            inner
                .replies
                .entry(packet.reply_id)
                .or_default()
                .push_back(packet);
        }
        self.ready.notify_waiters();
        true
    }

    /// Wait until a reply for `reply_id` is available
    pub async fn wait_for(&self, reply_id: u16) -> Result<Packet> {
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if let Some(packet) = inner.pop(reply_id) {
                    return Ok(packet);
                }
                if inner.closed {
                    return Err(Error::ConnectionClosed);
                }
            }

            notified.await;
        }
    }

    /// Like [`wait_for`](Self::wait_for) with an optional deadline
    ///
    /// On timeout `reply_id` is abandoned, so a late reply can never satisfy a
    /// later request.
    pub async fn wait_for_timeout(&self, reply_id: u16, limit: Option<Duration>) -> Result<Packet> {
        let Some(limit) = limit else {
            return self.wait_for(reply_id).await;
        };

        match tokio::time::timeout(limit, self.wait_for(reply_id)).await {
            Ok(result) => result,
            Err(_) => {
                self.abandon(reply_id);
                Err(Error::Timeout)
            }
        }
    }

    /// Drop every queued reply for `reply_id` and refuse later ones until
    /// [`expect`](Self::expect) is called for it again
    ///
    /// Returns how many queued replies were dropped.
    pub fn abandon(&self, reply_id: u16) -> usize {
        let dropped = {
            let mut inner = self.inner.lock();
            inner.abandoned.insert(reply_id);
            inner.replies.remove(&reply_id).map_or(0, |queue| queue.len())
        };
        if dropped > 0 {
            debug!(reply_id, dropped, "Discarded unclaimed replies");
        }
        dropped
    }

    /// Drain the table and fail every current and future waiter
    pub fn close(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            let drained: usize = inner.replies.values().map(VecDeque::len).sum();
            inner.replies.clear();
            inner.abandoned.clear();
            drained
        };
        if drained > 0 {
            debug!("Clearing {} pending replies", drained);
        }
        self.ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of queued, unclaimed replies
    pub fn len(&self) -> usize {
        self.inner.lock().replies.values().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use zklink_core::Command;

    fn reply(command: Command, reply_id: u16) -> Packet {
        Packet::new(command, 0x1234, reply_id)
    }

    #[tokio::test]
    async fn test_reply_before_wait() {
        let pending = PendingReplies::new();
        assert!(pending.deposit(reply(Command::AckOk, 4)));
        assert_eq!(pending.len(), 1);

        let packet = pending.wait_for(4).await.unwrap();
        assert_eq!(packet.reply_id, 4);
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn test_reply_after_wait() {
        let pending = Arc::new(PendingReplies::new());

        let waiter = {
            let pending = pending.clone();
            tokio::spawn(async move { pending.wait_for(9).await })
        };

        tokio::task::yield_now().await;
        pending.deposit(reply(Command::AckOk, 8));
        pending.deposit(reply(Command::AckData, 9));

        let packet = waiter.await.unwrap().unwrap();
        assert_eq!(packet.command, Command::AckData);
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_same_reply_id_keeps_order() {
        let pending = PendingReplies::new();
        pending.deposit(reply(Command::PrepareData, 6));
        pending.deposit(reply(Command::Data, 6));
        pending.deposit(reply(Command::AckOk, 6));

        assert_eq!(pending.wait_for(6).await.unwrap().command, Command::PrepareData);
        assert_eq!(pending.wait_for(6).await.unwrap().command, Command::Data);
        assert_eq!(pending.wait_for(6).await.unwrap().command, Command::AckOk);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_abandons_reply_id() {
        let pending = PendingReplies::new();

        let result = pending
            .wait_for_timeout(3, Some(Duration::from_millis(100)))
            .await;
        assert!(matches!(result, Err(Error::Timeout)));

        // Late replies are dropped instead of lingering in the table
        assert!(pending.deposit(reply(Command::AckOk, 3)));
        assert!(pending.deposit(reply(Command::Data, 3)));
        assert_eq!(pending.len(), 0);

        // Other reply numbers are unaffected
        pending.deposit(reply(Command::AckOk, 4));
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reissued_reply_id_accepts_replies() {
        let pending = PendingReplies::new();
        let result = pending
            .wait_for_timeout(3, Some(Duration::from_millis(100)))
            .await;
        assert!(matches!(result, Err(Error::Timeout)));
        pending.deposit(reply(Command::AckOk, 3));

        // The counter came round to 3 again
        pending.expect(3);
        pending.deposit(reply(Command::AckData, 3));

        let packet = pending.wait_for(3).await.unwrap();
        assert_eq!(packet.command, Command::AckData);
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn test_expect_drops_stale_replies() {
        let pending = PendingReplies::new();
        pending.deposit(reply(Command::AckOk, 5));
        pending.expect(5);
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let pending = Arc::new(PendingReplies::new());
        pending.deposit(reply(Command::AckOk, 1));

        let waiter = {
            let pending = pending.clone();
            tokio::spawn(async move { pending.wait_for(2).await })
        };

        tokio::task::yield_now().await;
        pending.close();

        assert!(matches!(waiter.await.unwrap(), Err(Error::ConnectionClosed)));
        assert_eq!(pending.len(), 0);
        assert!(pending.is_closed());
        assert!(!pending.deposit(reply(Command::AckOk, 2)));
    }
}
