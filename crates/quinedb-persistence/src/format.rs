//! Binary format primitives for the QUINEDB dump file.
//!
//! All multi-byte integers are little-endian. Strings (keys, elements,
//! fields, members) are length-prefixed with a `u32`.
//!
//! File layout:
//! ```text
//! [magic "QUINEDB": 7B][version: u32]
//! entries: ([0xFC][expire_ms: i64])? [type: u8][key][payload]
//! [0xFF]
//! ```
//! Type bytes: 0x00 string, 0x01 list, 0x02 set, 0x03 hash, 0x04 zset.
//! Collection payloads are a `u32` count followed by the elements; hashes
//! store field/value pairs, zsets store an `f64` score before each member.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Magic bytes opening every dump file.
pub const MAGIC: &[u8; 7] = b"QUINEDB";

/// Current dump format version.
pub const VERSION: u32 = 1;

/// Opcode prefixing an entry that carries an absolute-ms expiry.
pub const OP_EXPIRE_MS: u8 = 0xFC;

/// Terminator byte closing the entry stream.
pub const OP_EOF: u8 = 0xFF;

pub const TYPE_STRING: u8 = 0x00;
pub const TYPE_LIST: u8 = 0x01;
pub const TYPE_SET: u8 = 0x02;
pub const TYPE_HASH: u8 = 0x03;
pub const TYPE_ZSET: u8 = 0x04;

/// Maximum length accepted for a length-prefixed field when reading.
/// A corrupt prefix must not trigger a multi-gigabyte allocation.
pub const MAX_FIELD_LEN: usize = 512 * 1024 * 1024;

/// Maximum element count accepted for a collection when reading.
pub const MAX_COLLECTION_COUNT: u32 = 100_000_000;

/// Errors reading or writing the dump format.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("invalid magic bytes")]
    InvalidMagic,

    #[error("unsupported dump version: {0}")]
    UnsupportedVersion(u32),

    #[error("unknown entry type: {0:#04x}")]
    UnknownType(u8),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// write helpers
// ---------------------------------------------------------------------------

pub fn write_u8(w: &mut impl Write, val: u8) -> io::Result<()> {
    w.write_all(&[val])
}

pub fn write_u32(w: &mut impl Write, val: u32) -> io::Result<()> {
    w.write_all(&val.to_le_bytes())
}

pub fn write_i64(w: &mut impl Write, val: i64) -> io::Result<()> {
    w.write_all(&val.to_le_bytes())
}

pub fn write_f64(w: &mut impl Write, val: f64) -> io::Result<()> {
    w.write_all(&val.to_le_bytes())
}

/// Writes a length-prefixed byte slice: `[len: u32][data]`.
pub fn write_bytes(w: &mut impl Write, data: &[u8]) -> io::Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("field length {} exceeds u32::MAX", data.len()),
        )
    })?;
    write_u32(w, len)?;
    w.write_all(data)
}

/// Writes the file header: magic + version.
pub fn write_header(w: &mut impl Write) -> io::Result<()> {
    w.write_all(MAGIC)?;
    write_u32(w, VERSION)
}

// ---------------------------------------------------------------------------
// read helpers
// ---------------------------------------------------------------------------

pub fn read_u8(r: &mut impl Read) -> Result<u8, DumpError> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf)?;
    Ok(buf[0])
}

pub fn read_u32(r: &mut impl Read) -> Result<u32, DumpError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_i64(r: &mut impl Read) -> Result<i64, DumpError> {
    let mut buf = [0u8; 8];
    read_exact(r, &mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

pub fn read_f64(r: &mut impl Read) -> Result<f64, DumpError> {
    let mut buf = [0u8; 8];
    read_exact(r, &mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Reads a length-prefixed byte vector, rejecting lengths over
/// [`MAX_FIELD_LEN`].
pub fn read_bytes(r: &mut impl Read) -> Result<Vec<u8>, DumpError> {
    let len = read_u32(r)? as usize;
    if len > MAX_FIELD_LEN {
        return Err(DumpError::InvalidData(format!(
            "field length {len} exceeds maximum of {MAX_FIELD_LEN}"
        )));
    }
    let mut buf = vec![0u8; len];
    read_exact(r, &mut buf)?;
    Ok(buf)
}

/// Reads and validates the file header, returning the version.
pub fn read_header(r: &mut impl Read) -> Result<u32, DumpError> {
    let mut magic = [0u8; 7];
    read_exact(r, &mut magic)?;
    if &magic != MAGIC {
        return Err(DumpError::InvalidMagic);
    }
    let version = read_u32(r)?;
    if version != VERSION {
        return Err(DumpError::UnsupportedVersion(version));
    }
    Ok(version)
}

/// Validates a deserialized collection count against
/// [`MAX_COLLECTION_COUNT`].
pub fn validate_count(count: u32, label: &str) -> Result<(), DumpError> {
    if count > MAX_COLLECTION_COUNT {
        return Err(DumpError::InvalidData(format!(
            "{label} count {count} exceeds max {MAX_COLLECTION_COUNT}"
        )));
    }
    Ok(())
}

/// Caps pre-allocation so a corrupt count can't exhaust memory up front;
/// the vector still grows organically while elements actually parse.
pub fn capped_capacity(count: u32) -> usize {
    (count as usize).min(65_536)
}

fn read_exact(r: &mut impl Read, buf: &mut [u8]) -> Result<(), DumpError> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DumpError::UnexpectedEof
        } else {
            DumpError::Io(e)
        }
    })
}
