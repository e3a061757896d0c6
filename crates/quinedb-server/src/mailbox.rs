//! Inter-worker mailboxes.
//!
//! Each worker owns one MPSC mailbox: any worker may `push`, only the
//! owner calls `drain`. Both are lock-based; `drain` swaps the whole
//! batch out under the lock so the owner processes messages without
//! holding it. Pushing does **not** signal — the producer follows up
//! with [`Topology::notify`](crate::topology::Topology::notify), which
//! keeps the door open for batched signalling later.

use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::oneshot;

/// A message delivered to a worker's mailbox.
#[derive(Debug)]
pub enum Message {
    /// A command forwarded to the shard that owns its key. `origin` and
    /// `conn_id` identify where the eventual reply must be delivered.
    Request {
        origin: usize,
        conn_id: u32,
        args: Vec<Bytes>,
    },
    /// The encoded wire reply for a forwarded command, addressed to a
    /// connection on the receiving worker. If that connection has died
    /// in the meantime the payload is dropped silently.
    Response { conn_id: u32, payload: Bytes },
    /// Snapshot collection: the receiving worker serializes its whole
    /// partition and answers on the channel. Sent by the SAVE driver to
    /// every peer so no worker ever reads another worker's shard.
    Collect { reply: oneshot::Sender<Vec<u8>> },
}

/// Lock-based MPSC queue with batch-swap draining.
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: Mutex<Vec<Message>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a message. Safe from any worker.
    pub fn push(&self, msg: Message) {
        self.queue
            .lock()
            .expect("mailbox lock poisoned")
            .push(msg);
    }

    /// Takes every queued message in one atomic swap. Only the owning
    /// worker calls this.
    pub fn drain(&self) -> Vec<Message> {
        std::mem::take(&mut *self.queue.lock().expect("mailbox lock poisoned"))
    }
}
