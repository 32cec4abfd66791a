//! A connected remote endpoint

use bytes::Bytes;
use uuid::Uuid;

use crate::constants::QUEUE_CAPACITY;
use crate::queue::BoundedQueue;

/// One registered peer: an opaque identity plus the outbound mailbox feeding
/// its connection's write side.
///
/// Created when a connection upgrades; destroyed when the hub unregisters it,
/// which closes the mailbox and lets the outbound loop drain and exit.
pub struct Peer {
    id: Uuid,
    mailbox: BoundedQueue<Bytes>,
}

impl Peer {
    pub fn new() -> Self {
        Self::with_mailbox_capacity(QUEUE_CAPACITY)
    }

    pub fn with_mailbox_capacity(capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            mailbox: BoundedQueue::new(capacity),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mailbox(&self) -> &BoundedQueue<Bytes> {
        &self.mailbox
    }
}

impl Default for Peer {
    fn default() -> Self {
        Self::new()
    }
}
