//! Worker threads: the thread-per-core, shared-nothing runtime.
//!
//! One worker = one OS thread = one current-thread tokio runtime driving
//! a `LocalSet`. Everything a worker owns — its shard store, its live
//! connections, its listener — lives behind `Rc<RefCell>` and never
//! crosses a thread boundary. The only shared state is the topology's
//! mailboxes and wake handles.
//!
//! Boot sequence per worker: register the wake handle, take the seeded
//! store, bind the reuse-port listener, report readiness, enter the
//! startup barrier, then start the peer loop and the accept loop. The
//! barrier guarantees no worker can forward a request before every wake
//! handle is registered.
//!
//! The peer loop is the worker's half of the forwarding protocol: wait
//! on the wake handle, drain the mailbox to empty, run every message to
//! completion. Requests execute against the local store and push a
//! Response (plus notify) back to the origin; Responses are routed into
//! the target connection's write queue; Collect messages serialize the
//! partition for the snapshot driver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};

use bytes::Bytes;
use quinedb_core::Store;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, info, warn};

use crate::commands;
use crate::config::ServerConfig;
use crate::connection;
use crate::mailbox::Message;
use crate::snapshot;
use crate::topology::Topology;

/// Monotonic process-wide connection ids. Starts at 1 so 0 can never
/// collide with a live connection.
static NEXT_CONN_ID: AtomicU32 = AtomicU32::new(1);

/// A live connection as seen from the worker: its reply queue and the
/// completion slot for an in-flight cross-shard forward.
pub struct ConnHandle {
    pub reply: mpsc::UnboundedSender<Bytes>,
    /// Present while a forwarded command is outstanding; fired by the
    /// peer loop once the Response has been queued.
    pub pending_forward: Option<oneshot::Sender<()>>,
}

/// Worker-local state shared by this worker's tasks only.
pub struct WorkerCtx {
    pub id: usize,
    pub topology: Arc<Topology>,
    pub config: Arc<ServerConfig>,
    pub store: RefCell<Store>,
    /// Live-connection index: conn id → handle. Entries are removed on
    /// disconnect; Responses addressed to absent ids are dropped.
    pub conns: RefCell<HashMap<u32, ConnHandle>>,
}

/// Spawns one worker thread per shard. Each reports bind success or
/// failure on `ready_tx` before entering the startup barrier.
pub fn spawn(
    topology: Arc<Topology>,
    config: Arc<ServerConfig>,
    ready_tx: std_mpsc::Sender<std::io::Result<()>>,
) -> Vec<std::thread::JoinHandle<()>> {
    (0..topology.workers())
        .map(|id| {
            let topology = topology.clone();
            let config = config.clone();
            let ready_tx = ready_tx.clone();
            std::thread::Builder::new()
                .name(format!("quinedb-worker-{id}"))
                .spawn(move || worker_main(id, topology, config, ready_tx))
                .expect("failed to spawn worker thread")
        })
        .collect()
}

fn worker_main(
    id: usize,
    topology: Arc<Topology>,
    config: Arc<ServerConfig>,
    ready_tx: std_mpsc::Sender<std::io::Result<()>>,
) {
    let waker = Arc::new(Notify::new());
    topology.register_waker(id, waker.clone());
    let store = topology.take_seed(id).unwrap_or_default();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let local = tokio::task::LocalSet::new();
    runtime.block_on(local.run_until(async move {
        let listener = match bind_listener(config.port) {
            Ok(listener) => listener,
            Err(e) => {
                // report before the barrier so main can abort the boot
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        let _ = ready_tx.send(Ok(()));

        // no cross-shard message may be sent until every worker has
        // registered its wake handle
        topology.wait_ready();
        info!(worker = id, port = config.port, "worker accepting");

        let ctx = Rc::new(WorkerCtx {
            id,
            topology: topology.clone(),
            config,
            store: RefCell::new(store),
            conns: RefCell::new(HashMap::new()),
        });

        tokio::task::spawn_local(peer_loop(ctx.clone(), waker));
        accept_loop(ctx, listener).await;
    }));
}

/// Binds the shared port with reuse-port so the kernel load-balances
/// incoming connections across all workers' listening sockets.
fn bind_listener(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.set_reuseport(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

/// Standing accept loop. Transient failures are logged and the loop
/// keeps accepting — the listener never dies.
async fn accept_loop(ctx: Rc<WorkerCtx>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
                debug!(worker = ctx.id, conn_id, %peer, "accepted connection");
                connection::spawn(ctx.clone(), conn_id, stream);
            }
            Err(e) => {
                warn!(worker = ctx.id, "accept failed: {e}");
            }
        }
    }
}

/// Mailbox pump: wake, drain to empty, process every message. Notifies
/// coalesce, so the inner loop keeps draining until the queue is seen
/// empty — a message pushed after the last drain leaves a stored permit
/// that wakes the next `notified()` immediately.
async fn peer_loop(ctx: Rc<WorkerCtx>, waker: Arc<Notify>) {
    loop {
        waker.notified().await;
        loop {
            let batch = ctx.topology.drain(ctx.id);
            if batch.is_empty() {
                break;
            }
            for msg in batch {
                handle_message(&ctx, msg);
            }
        }
    }
}

fn handle_message(ctx: &Rc<WorkerCtx>, msg: Message) {
    match msg {
        Message::Request {
            origin,
            conn_id,
            args,
        } => {
            let payload = execute_forwarded(ctx, &args);
            ctx.topology
                .push(origin, Message::Response { conn_id, payload });
            ctx.topology.notify(origin);
        }
        Message::Response { conn_id, payload } => {
            let mut conns = ctx.conns.borrow_mut();
            match conns.get_mut(&conn_id) {
                Some(handle) => {
                    let _ = handle.reply.send(payload);
                    if let Some(done) = handle.pending_forward.take() {
                        let _ = done.send(());
                    }
                }
                None => {
                    // the connection died while its request was in flight
                    debug!(
                        worker = ctx.id,
                        conn_id, "dropping response for dead connection"
                    );
                }
            }
        }
        Message::Collect { reply } => {
            let partition = snapshot::serialize_partition(&ctx.store.borrow());
            let _ = reply.send(partition);
        }
    }
}

/// Runs a forwarded command against the local shard. The origin already
/// validated arity; ownership is a routing invariant.
fn execute_forwarded(ctx: &Rc<WorkerCtx>, args: &[Bytes]) -> Bytes {
    let spec = match commands::resolve(args) {
        Ok(spec) => spec,
        Err(err) => return err,
    };
    debug_assert!(
        args.len() > 1 && ctx.topology.is_local(ctx.id, &args[1]),
        "forwarded command landed on a non-owner worker"
    );
    commands::execute_keyed(spec, &mut ctx.store.borrow_mut(), args)
}
