//! quinedb-protocol: the RESP wire protocol.
//!
//! Inbound traffic is restricted to arrays of bulk strings
//! (`*N\r\n($L\r\n<data>\r\n)^N`), decoded by a restartable streaming
//! [`RespDecoder`] that tolerates arbitrary read boundaries. Outbound
//! replies are built directly into byte buffers by the [`reply`] helpers.
//!
//! # quick start
//!
//! ```
//! use bytes::BytesMut;
//! use quinedb_protocol::{Decode, RespDecoder};
//!
//! let mut decoder = RespDecoder::new();
//! let mut buf = BytesMut::from(&b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n"[..]);
//! assert_eq!(decoder.consume(&mut buf), Decode::Complete);
//! assert_eq!(decoder.args()[0].as_ref(), b"ECHO");
//! ```

pub mod decoder;
pub mod reply;

pub use decoder::{Decode, RespDecoder};
