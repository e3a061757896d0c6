//! Static topology: everything the workers share.
//!
//! Fixed after construction — the router, one mailbox per worker, one
//! wake handle per worker, the startup barrier, and one-shot seed slots
//! holding each worker's snapshot-loaded partition. Shard stores
//! themselves are owned by their workers; the topology only ferries a
//! seeded store to its owner exactly once during boot.
//!
//! ## startup barrier
//!
//! A worker registers its wake handle, then enters the barrier before it
//! starts accepting. No cross-shard message may be sent until every
//! worker has registered — a request forwarded during the first
//! milliseconds of uptime would otherwise target an empty wake slot.

use std::sync::{Arc, Barrier, Mutex, OnceLock};

use quinedb_core::Store;
use tokio::sync::Notify;

use crate::mailbox::{Mailbox, Message};
use crate::router::Router;

pub struct Topology {
    router: Router,
    mailboxes: Vec<Mailbox>,
    /// Wake handles, registered once by each worker at startup.
    /// `Notify::notify_one` stores a permit when nobody is waiting, which
    /// gives the idempotent, coalescing wake semantics the drain loop
    /// relies on.
    wakers: Vec<OnceLock<Arc<Notify>>>,
    barrier: Barrier,
    /// Snapshot-loaded partitions, taken by their owners during boot.
    seeds: Vec<Mutex<Option<Store>>>,
}

impl Topology {
    pub fn new(router: Router) -> Self {
        let workers = router.shard_count();
        Self {
            router,
            mailboxes: (0..workers).map(|_| Mailbox::new()).collect(),
            wakers: (0..workers).map(|_| OnceLock::new()).collect(),
            barrier: Barrier::new(workers),
            seeds: (0..workers).map(|_| Mutex::new(None)).collect(),
        }
    }

    pub fn workers(&self) -> usize {
        self.mailboxes.len()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// True when the given key is owned by `worker_id`.
    pub fn is_local(&self, worker_id: usize, key: &[u8]) -> bool {
        self.router.shard_of(key) == worker_id
    }

    /// Installs a worker's wake handle. Called exactly once per worker,
    /// before the barrier.
    pub fn register_waker(&self, worker_id: usize, waker: Arc<Notify>) {
        if self.wakers[worker_id].set(waker).is_err() {
            panic!("worker {worker_id} registered its waker twice");
        }
    }

    /// Blocks until every worker has registered. Workers call this after
    /// [`Self::register_waker`] and before accepting connections.
    pub fn wait_ready(&self) {
        self.barrier.wait();
    }

    /// Enqueues a message for `target` without signalling.
    pub fn push(&self, target: usize, msg: Message) {
        self.mailboxes[target].push(msg);
    }

    /// Wakes `target`'s event loop. Multiple notifies before the next
    /// drain coalesce into one wake.
    pub fn notify(&self, target: usize) {
        if let Some(waker) = self.wakers[target].get() {
            waker.notify_one();
        }
    }

    /// Drains `worker_id`'s mailbox. Only the owning worker calls this.
    pub fn drain(&self, worker_id: usize) -> Vec<Message> {
        self.mailboxes[worker_id].drain()
    }

    /// Stores a snapshot-loaded partition for its owner to pick up.
    pub fn seed(&self, worker_id: usize, store: Store) {
        *self.seeds[worker_id].lock().expect("seed lock poisoned") = Some(store);
    }

    /// Takes the seeded partition, if any. Each worker calls this once.
    pub fn take_seed(&self, worker_id: usize) -> Option<Store> {
        self.seeds[worker_id]
            .lock()
            .expect("seed lock poisoned")
            .take()
    }
}
