//! Direct-to-buffer RESP reply serialization.
//!
//! Replies are built into a `BytesMut` and frozen; integer formatting
//! goes through `itoa` to stay off the heap. Only the reply shapes the
//! server actually emits are covered: simple strings, errors, integers,
//! bulk strings, null bulk, and flat arrays of bulk strings.

use bytes::{BufMut, Bytes, BytesMut};

/// `+OK\r\n`
pub fn ok() -> Bytes {
    simple("OK")
}

/// `+<s>\r\n`
pub fn simple(s: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(s.len() + 3);
    buf.put_u8(b'+');
    buf.put_slice(s.as_bytes());
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// `-<msg>\r\n`
pub fn error(msg: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(msg.len() + 3);
    buf.put_u8(b'-');
    buf.put_slice(msg.as_bytes());
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// `:<n>\r\n`
pub fn integer(n: i64) -> Bytes {
    let mut buf = BytesMut::with_capacity(24);
    buf.put_u8(b':');
    put_i64(&mut buf, n);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// `$<len>\r\n<data>\r\n`
pub fn bulk(data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(data.len() + 16);
    put_bulk(&mut buf, data);
    buf.freeze()
}

/// `$-1\r\n`
pub fn null_bulk() -> Bytes {
    Bytes::from_static(b"$-1\r\n")
}

/// `*0\r\n`
pub fn empty_array() -> Bytes {
    Bytes::from_static(b"*0\r\n")
}

/// `*N\r\n` followed by one bulk string per item.
pub fn bulk_array<I, T>(items: I) -> Bytes
where
    I: ExactSizeIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut buf = BytesMut::with_capacity(16);
    buf.put_u8(b'*');
    put_i64(&mut buf, items.len() as i64);
    buf.put_slice(b"\r\n");
    for item in items {
        put_bulk(&mut buf, item.as_ref());
    }
    buf.freeze()
}

/// Formats a sorted-set score the way Redis prints floats: shortest
/// representation that round-trips, no trailing zeros, no dangling
/// decimal point ("1", "1.5", "-0.25").
pub fn fmt_score(score: f64) -> String {
    if score == f64::INFINITY {
        "inf".to_owned()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_owned()
    } else {
        format!("{score}")
    }
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    buf.put_u8(b'$');
    put_i64(buf, data.len() as i64);
    buf.put_slice(b"\r\n");
    buf.put_slice(data);
    buf.put_slice(b"\r\n");
}

fn put_i64(buf: &mut BytesMut, val: i64) {
    let mut scratch = itoa::Buffer::new();
    buf.put_slice(scratch.format(val).as_bytes());
}
