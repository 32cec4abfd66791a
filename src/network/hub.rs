//! Relay hub: the single broadcast decision point
//!
//! The peer set is owned by one control loop and mutated nowhere else; every
//! register, unregister and broadcast is a command through the hub's channel.
//! That single-writer discipline is what makes the set safe without locks and
//! gives all peers the same relative broadcast order.
//!
//! Overflow policy differs from the audio queues on purpose: a full audio
//! queue drops the incoming frame to protect the connection, while a full
//! mailbox drops the connection to protect broadcast throughput. A slow
//! consumer must not stall delivery to fast ones.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::constants::HUB_CHANNEL_CAPACITY;
use crate::network::peer::Peer;
use crate::queue::PushResult;

enum HubCommand {
    Register(Arc<Peer>),
    Unregister(Uuid),
    Broadcast { sender: Uuid, frame: Bytes },
    PeerCount(oneshot::Sender<usize>),
}

/// Owns the set of registered peers
pub struct RelayHub {
    peers: HashMap<Uuid, Arc<Peer>>,
}

impl RelayHub {
    fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Spawn the control loop; all hub operations go through the handle
    pub fn spawn() -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(HUB_CHANNEL_CAPACITY);
        let task = tokio::spawn(Self::new().run(rx));
        (HubHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                HubCommand::Register(peer) => self.register(peer),
                HubCommand::Unregister(id) => self.unregister(id),
                HubCommand::Broadcast { sender, frame } => self.broadcast(sender, frame),
                HubCommand::PeerCount(reply) => {
                    let _ = reply.send(self.peers.len());
                }
            }
        }
        // Every handle is gone: close remaining mailboxes so outbound loops
        // drain and exit.
        for peer in self.peers.values() {
            peer.mailbox().close();
        }
    }

    fn register(&mut self, peer: Arc<Peer>) {
        tracing::info!(peer = %peer.id(), "peer registered");
        self.peers.insert(peer.id(), peer);
    }

    /// Remove a peer and close its mailbox. Removing an unknown peer is a
    /// no-op; a session's own unregister may race a hub-side eviction.
    fn unregister(&mut self, id: Uuid) {
        if let Some(peer) = self.peers.remove(&id) {
            peer.mailbox().close();
            tracing::info!(peer = %id, "peer unregistered");
        }
    }

    /// Fan one frame out to every registered peer except its sender.
    ///
    /// A mailbox that cannot take the frame (full or already closed) marks
    /// a consumer that cannot keep up; the peer is evicted in the same step
    /// and the remaining peers still receive this frame.
    fn broadcast(&mut self, sender: Uuid, frame: Bytes) {
        self.peers.retain(|id, peer| {
            if *id == sender {
                return true;
            }
            match peer.mailbox().push(frame.clone()) {
                PushResult::Pushed => true,
                PushResult::Dropped | PushResult::Closed => {
                    peer.mailbox().close();
                    tracing::warn!(peer = %id, "mailbox unavailable, evicting peer");
                    false
                }
            }
        });
    }
}

/// Clonable facade submitting operations to the hub's control loop.
///
/// Sends are fire-and-forget; a hub that has already shut down simply
/// ignores them.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn register(&self, peer: Arc<Peer>) {
        let _ = self.tx.send(HubCommand::Register(peer)).await;
    }

    pub async fn unregister(&self, id: Uuid) {
        let _ = self.tx.send(HubCommand::Unregister(id)).await;
    }

    pub async fn broadcast(&self, sender: Uuid, frame: Bytes) {
        let _ = self.tx.send(HubCommand::Broadcast { sender, frame }).await;
    }

    /// Number of currently registered peers
    pub async fn peer_count(&self) -> usize {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(HubCommand::PeerCount(reply_tx)).await.is_err() {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Bytes {
        Bytes::from_static(&[0x01, 0x02, 0x03, 0x04])
    }

    #[test]
    fn broadcast_skips_sender() {
        let mut hub = RelayHub::new();
        let a = Arc::new(Peer::new());
        let b = Arc::new(Peer::new());
        let c = Arc::new(Peer::new());
        hub.register(a.clone());
        hub.register(b.clone());
        hub.register(c.clone());

        hub.broadcast(a.id(), frame());

        assert_eq!(b.mailbox().try_pop().as_deref(), Some(&frame()[..]));
        assert_eq!(c.mailbox().try_pop().as_deref(), Some(&frame()[..]));
        assert!(a.mailbox().try_pop().is_none());
    }

    #[test]
    fn full_mailbox_evicts_peer_but_serves_the_rest() {
        let mut hub = RelayHub::new();
        let sender = Arc::new(Peer::new());
        let slow = Arc::new(Peer::with_mailbox_capacity(1));
        let fast = Arc::new(Peer::new());
        hub.register(sender.clone());
        hub.register(slow.clone());
        hub.register(fast.clone());

        slow.mailbox().push(frame());
        assert_eq!(hub.peers.len(), 3);

        hub.broadcast(sender.id(), frame());

        assert!(!hub.peers.contains_key(&slow.id()));
        assert!(slow.mailbox().is_closed());
        assert_eq!(fast.mailbox().try_pop().as_deref(), Some(&frame()[..]));

        // The evicted peer keeps its queued item but receives nothing new.
        hub.broadcast(sender.id(), frame());
        assert_eq!(slow.mailbox().len(), 1);
    }

    #[test]
    fn closed_mailbox_evicts_peer() {
        let mut hub = RelayHub::new();
        let sender = Arc::new(Peer::new());
        let gone = Arc::new(Peer::new());
        hub.register(sender.clone());
        hub.register(gone.clone());

        gone.mailbox().close();
        hub.broadcast(sender.id(), frame());

        assert!(!hub.peers.contains_key(&gone.id()));
    }

    #[test]
    fn unregister_twice_is_noop() {
        let mut hub = RelayHub::new();
        let peer = Arc::new(Peer::new());
        hub.register(peer.clone());

        hub.unregister(peer.id());
        hub.unregister(peer.id());

        assert!(hub.peers.is_empty());
        assert!(peer.mailbox().is_closed());
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut hub = RelayHub::new();
        hub.unregister(Uuid::new_v4());
        assert!(hub.peers.is_empty());
    }

    #[tokio::test]
    async fn commands_flow_through_the_control_loop() {
        let (hub, task) = RelayHub::spawn();
        let a = Arc::new(Peer::new());
        let b = Arc::new(Peer::new());

        hub.register(a.clone()).await;
        hub.register(b.clone()).await;
        assert_eq!(hub.peer_count().await, 2);

        hub.broadcast(a.id(), frame()).await;
        // peer_count round-trips through the loop, so the broadcast before
        // it has already been applied.
        assert_eq!(hub.peer_count().await, 2);
        assert_eq!(b.mailbox().try_pop().as_deref(), Some(&frame()[..]));
        assert!(a.mailbox().try_pop().is_none());

        hub.unregister(a.id()).await;
        assert_eq!(hub.peer_count().await, 1);

        drop(hub);
        let _ = task.await;
        assert!(b.mailbox().is_closed());
    }
}
