//! Per-connection handling.
//!
//! Each connection is owned by the worker that accepted it and is driven
//! by two worker-local tasks:
//!
//! - the **read task** reads into a buffer, feeds the streaming RESP
//!   decoder, and dispatches each completed command;
//! - the **write task** drains the connection's FIFO reply queue and
//!   performs one `write_all` at a time — the single-outstanding-write
//!   rule that keeps bytes in order on the wire.
//!
//! Every reply — produced locally or arriving later as a cross-shard
//! Response — goes through the same queue, so a pipelining client always
//! sees replies in request order. To keep that true across forwards, the
//! read task does not decode the next command while a forwarded one is
//! outstanding: it parks on a oneshot that the peer loop fires once the
//! Response has been enqueued.
//!
//! Teardown on read EOF/error or write error removes the connection id
//! from the worker's live index; a late Response addressed to a dead id
//! is dropped silently by the peer loop.

use std::rc::Rc;

use bytes::{Bytes, BytesMut};
use quinedb_protocol::{reply, Decode, RespDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::commands::{self, CommandKind};
use crate::mailbox::Message;
use crate::snapshot;
use crate::worker::{ConnHandle, WorkerCtx};

/// Initial read buffer capacity; covers typical commands without
/// over-allocating for PING/SET/GET traffic.
const BUF_CAPACITY: usize = 4096;

/// Read buffer ceiling. A client streaming an incomplete frame past this
/// is disconnected rather than allowed to grow the buffer without bound.
const MAX_BUF_SIZE: usize = 64 * 1024 * 1024;

/// Registers a fresh connection and spawns its read and write tasks.
pub fn spawn(ctx: Rc<WorkerCtx>, conn_id: u32, stream: TcpStream) {
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    ctx.conns.borrow_mut().insert(
        conn_id,
        ConnHandle {
            reply: reply_tx.clone(),
            pending_forward: None,
        },
    );

    let (read_half, write_half) = stream.into_split();
    tokio::task::spawn_local(write_loop(ctx.clone(), conn_id, write_half, reply_rx));
    tokio::task::spawn_local(read_loop(ctx, conn_id, read_half, reply_tx));
}

/// The write side: one buffer in flight at a time, strict FIFO.
async fn write_loop(
    ctx: Rc<WorkerCtx>,
    conn_id: u32,
    mut write_half: OwnedWriteHalf,
    mut reply_rx: mpsc::UnboundedReceiver<Bytes>,
) {
    while let Some(payload) = reply_rx.recv().await {
        if let Err(e) = write_half.write_all(&payload).await {
            debug!(worker = ctx.id, conn_id, "write failed: {e}");
            ctx.conns.borrow_mut().remove(&conn_id);
            return;
        }
    }
}

/// The read side: read, decode, dispatch, repeat.
async fn read_loop(
    ctx: Rc<WorkerCtx>,
    conn_id: u32,
    mut read_half: OwnedReadHalf,
    reply_tx: mpsc::UnboundedSender<Bytes>,
) {
    let mut buf = BytesMut::with_capacity(BUF_CAPACITY);
    let mut decoder = RespDecoder::new();

    'conn: loop {
        if buf.len() > MAX_BUF_SIZE {
            let _ = reply_tx.send(reply::error("ERR max buffer size exceeded"));
            break;
        }

        match read_half.read_buf(&mut buf).await {
            Ok(0) => break, // clean disconnect
            Ok(_) => {}
            Err(e) => {
                debug!(worker = ctx.id, conn_id, "read failed: {e}");
                break;
            }
        }

        // drain every complete command the buffer holds (pipelining)
        loop {
            match decoder.consume(&mut buf) {
                Decode::Complete => {
                    let args = decoder.take_args();
                    decoder.reset();
                    match dispatch(&ctx, conn_id, args).await {
                        Outcome::Reply(payload) => {
                            if reply_tx.send(payload).is_err() {
                                break 'conn; // writer died
                            }
                        }
                        Outcome::Forwarded(done) => {
                            // single outstanding forward per connection:
                            // the next command is not decoded until the
                            // peer's Response has been queued
                            if done.await.is_err() {
                                break 'conn;
                            }
                        }
                    }
                }
                Decode::Partial => break,
                Decode::Error => {
                    if reply_tx.send(reply::error("ERR Protocol Error")).is_err() {
                        break 'conn;
                    }
                    // one error per read: drop the rest of the garbage
                    // and resynchronize on the next read
                    decoder.reset();
                    buf.clear();
                    break;
                }
            }
        }
    }

    ctx.conns.borrow_mut().remove(&conn_id);
    debug!(worker = ctx.id, conn_id, "connection closed");
}

enum Outcome {
    /// Reply produced synchronously; queue it.
    Reply(Bytes),
    /// Command forwarded to its owner; the reply arrives via the
    /// mailbox. Resolving the receiver means it has been queued.
    Forwarded(oneshot::Receiver<()>),
}

/// Routes one parsed command: inline, local shard, or cross-shard
/// forward.
async fn dispatch(ctx: &Rc<WorkerCtx>, conn_id: u32, args: Vec<Bytes>) -> Outcome {
    let spec = match commands::resolve(&args) {
        Ok(spec) => spec,
        Err(err) => return Outcome::Reply(err),
    };

    match spec.kind {
        CommandKind::Connection(handler) => Outcome::Reply(handler(&args)),
        CommandKind::Save => Outcome::Reply(snapshot::save(ctx).await),
        CommandKind::Keyed(_) => {
            let key = &args[1];
            let target = ctx.topology.router().shard_of(key);
            if target == ctx.id {
                let payload =
                    commands::execute_keyed(spec, &mut ctx.store.borrow_mut(), &args);
                Outcome::Reply(payload)
            } else {
                let (done_tx, done_rx) = oneshot::channel();
                if let Some(handle) = ctx.conns.borrow_mut().get_mut(&conn_id) {
                    handle.pending_forward = Some(done_tx);
                }
                ctx.topology.push(
                    target,
                    Message::Request {
                        origin: ctx.id,
                        conn_id,
                        args,
                    },
                );
                ctx.topology.notify(target);
                Outcome::Forwarded(done_rx)
            }
        }
    }
}
