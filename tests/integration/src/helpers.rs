//! Test helpers for spawning a quinedb-server and talking RESP to it.

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Workers per test server. Four shards make cross-shard forwarding the
/// common case for any handful of keys.
pub const TEST_WORKERS: usize = 4;

/// A parsed server→client RESP frame, just enough for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

/// A quinedb-server subprocess managed by the test harness.
pub struct TestServer {
    child: Child,
    pub port: u16,
    _data_dir: Option<tempfile::TempDir>,
}

/// Options for starting a test server.
#[derive(Default)]
pub struct ServerOptions {
    /// Owned temp directory (cleaned up when the server drops).
    pub data_dir: Option<tempfile::TempDir>,
    /// Use an existing path without taking ownership. Wins over
    /// `data_dir` when both are set.
    pub data_dir_path: Option<PathBuf>,
    /// Routing algorithm flag ("crc16" or "ring").
    pub routing: Option<&'static str>,
}

impl TestServer {
    /// Starts a server on a random port with the default options.
    pub fn start() -> Self {
        Self::start_with(ServerOptions::default())
    }

    /// Starts a server with custom options. Blocks until it accepts
    /// connections (up to 5 seconds).
    pub fn start_with(opts: ServerOptions) -> Self {
        let binary = server_binary();
        let port = find_free_port();

        let mut cmd = Command::new(&binary);
        cmd.arg("--port").arg(port.to_string());
        cmd.arg("--worker-threads").arg(TEST_WORKERS.to_string());
        // suppress tracing output in tests
        cmd.env("RUST_LOG", "error");

        if let Some(routing) = opts.routing {
            cmd.arg("--routing").arg(routing);
        }

        let data_dir = if let Some(ref path) = opts.data_dir_path {
            cmd.arg("--dir").arg(path);
            None // caller manages the directory lifetime
        } else {
            let dir = opts
                .data_dir
                .unwrap_or_else(|| tempfile::tempdir().unwrap());
            cmd.arg("--dir").arg(dir.path());
            Some(dir)
        };

        let child = cmd
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .unwrap_or_else(|e| {
                panic!(
                    "failed to spawn quinedb-server at {}: {e}",
                    binary.display()
                )
            });

        // wait for the server to be ready
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            if std::time::Instant::now() > deadline {
                panic!("quinedb-server failed to start within 5 seconds on port {port}");
            }
            if std::net::TcpStream::connect(format!("127.0.0.1:{port}")).is_ok() {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        Self {
            child,
            port,
            _data_dir: data_dir,
        }
    }

    /// Connects a test client to this server.
    pub async fn connect(&self) -> TestClient {
        TestClient::connect(self.port).await
    }

    /// Kills the server, keeping any data directory it pointed at.
    pub fn stop(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A minimal raw-RESP client.
pub struct TestClient {
    stream: TcpStream,
    buf: BytesMut,
}

impl TestClient {
    async fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .unwrap_or_else(|e| panic!("failed to connect to 127.0.0.1:{port}: {e}"));
        Self {
            stream,
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Sends a command as an array of bulk strings and returns the
    /// parsed response frame.
    pub async fn cmd(&mut self, args: &[&str]) -> Frame {
        self.send_raw(&encode_command(args)).await;
        self.read_frame().await
    }

    /// Writes raw bytes to the socket.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Reads exactly `expected.len()` bytes and asserts they match.
    pub async fn expect_exact(&mut self, expected: &[u8]) {
        while self.buf.len() < expected.len() {
            let n = self.stream.read_buf(&mut self.buf).await.unwrap();
            if n == 0 {
                panic!(
                    "server closed connection; got {:?}, wanted {:?}",
                    String::from_utf8_lossy(&self.buf),
                    String::from_utf8_lossy(expected)
                );
            }
        }
        let got = self.buf.split_to(expected.len());
        assert_eq!(
            &got[..],
            expected,
            "wire bytes mismatch: got {:?}, wanted {:?}",
            String::from_utf8_lossy(&got),
            String::from_utf8_lossy(expected)
        );
    }

    /// Reads one complete frame from the connection.
    pub async fn read_frame(&mut self) -> Frame {
        loop {
            if let Some((frame, consumed)) = parse_frame(&self.buf) {
                let _ = self.buf.split_to(consumed);
                return frame;
            }
            let n = self.stream.read_buf(&mut self.buf).await.unwrap();
            if n == 0 {
                panic!("server closed connection while waiting for a frame");
            }
        }
    }

    /// Sends a command and expects `+OK`.
    pub async fn ok(&mut self, args: &[&str]) {
        match self.cmd(args).await {
            Frame::Simple(s) if s == "OK" => {}
            other => panic!("expected OK for {args:?}, got {other:?}"),
        }
    }

    /// Sends a command and extracts a bulk string (None for null bulk).
    pub async fn get_bulk(&mut self, args: &[&str]) -> Option<String> {
        match self.cmd(args).await {
            Frame::Bulk(data) => Some(String::from_utf8_lossy(&data).to_string()),
            Frame::Null => None,
            other => panic!("expected Bulk or Null for {args:?}, got {other:?}"),
        }
    }

    /// Sends a command and extracts the integer reply.
    pub async fn get_int(&mut self, args: &[&str]) -> i64 {
        match self.cmd(args).await {
            Frame::Integer(n) => n,
            other => panic!("expected Integer for {args:?}, got {other:?}"),
        }
    }

    /// Sends a command and expects an error; returns its message.
    pub async fn err(&mut self, args: &[&str]) -> String {
        match self.cmd(args).await {
            Frame::Error(msg) => msg,
            other => panic!("expected Error for {args:?}, got {other:?}"),
        }
    }
}

/// Encodes a command as an array of bulk strings.
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Parses one server→client frame. Returns `None` when the buffer does
/// not yet hold a complete frame.
fn parse_frame(buf: &[u8]) -> Option<(Frame, usize)> {
    let (line, mut consumed) = read_line(buf)?;
    let frame = match line.first()? {
        b'+' => Frame::Simple(String::from_utf8_lossy(&line[1..]).to_string()),
        b'-' => Frame::Error(String::from_utf8_lossy(&line[1..]).to_string()),
        b':' => Frame::Integer(std::str::from_utf8(&line[1..]).ok()?.parse().ok()?),
        b'$' => {
            let len: i64 = std::str::from_utf8(&line[1..]).ok()?.parse().ok()?;
            if len < 0 {
                Frame::Null
            } else {
                let len = len as usize;
                if buf.len() < consumed + len + 2 {
                    return None;
                }
                let data = Bytes::copy_from_slice(&buf[consumed..consumed + len]);
                consumed += len + 2;
                Frame::Bulk(data)
            }
        }
        b'*' => {
            let count: usize = std::str::from_utf8(&line[1..]).ok()?.parse().ok()?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (item, used) = parse_frame(&buf[consumed..])?;
                items.push(item);
                consumed += used;
            }
            Frame::Array(items)
        }
        other => panic!("unexpected reply prefix {:?}", *other as char),
    };
    Some((frame, consumed))
}

/// Returns the line before the next CRLF and the bytes consumed
/// including the CRLF.
fn read_line(buf: &[u8]) -> Option<(&[u8], usize)> {
    let nl = buf.windows(2).position(|w| w == b"\r\n")?;
    Some((&buf[..nl], nl + 2))
}

/// Finds a free TCP port by binding to port 0.
fn find_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Locates the quinedb-server binary in the cargo target directory.
fn server_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    // test binary is in target/debug/deps/ — go up to target/debug/
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("quinedb-server");
    if !path.exists() {
        panic!(
            "quinedb-server binary not found. run `cargo build` first.\nlooked at: {}",
            path.display()
        );
    }
    path
}
