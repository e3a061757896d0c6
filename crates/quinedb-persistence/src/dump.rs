//! Dump file writer and reader.
//!
//! A dump is written to a `.tmp` sibling first and atomically renamed on
//! completion, so a crashed save never clobbers the previous good file.
//! Entries can be serialized to any `Write` via [`write_entry`] — the
//! snapshot driver uses this to let each worker serialize its own
//! partition to memory, then stitches the partitions together between a
//! single header and terminator.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::format::{self, DumpError};

/// The value carried by one dump entry.
#[derive(Debug, Clone, PartialEq)]
pub enum DumpValue {
    String(Bytes),
    List(VecDeque<Bytes>),
    Set(Vec<Bytes>),
    /// Field/value pairs, order irrelevant.
    Hash(Vec<(Bytes, Bytes)>),
    /// (score, member) pairs.
    SortedSet(Vec<(f64, Bytes)>),
}

/// A single entry in a dump file.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpEntry {
    pub key: Bytes,
    pub value: DumpValue,
    /// Absolute expiry in ms since epoch, if any.
    pub expire_at_ms: Option<i64>,
}

/// Serializes one entry: optional expiry prefix, type byte, key, payload.
pub fn write_entry(w: &mut impl Write, entry: &DumpEntry) -> io::Result<()> {
    if let Some(at) = entry.expire_at_ms {
        format::write_u8(w, format::OP_EXPIRE_MS)?;
        format::write_i64(w, at)?;
    }

    match &entry.value {
        DumpValue::String(data) => {
            format::write_u8(w, format::TYPE_STRING)?;
            format::write_bytes(w, &entry.key)?;
            format::write_bytes(w, data)?;
        }
        DumpValue::List(items) => {
            format::write_u8(w, format::TYPE_LIST)?;
            format::write_bytes(w, &entry.key)?;
            format::write_u32(w, items.len() as u32)?;
            for item in items {
                format::write_bytes(w, item)?;
            }
        }
        DumpValue::Set(members) => {
            format::write_u8(w, format::TYPE_SET)?;
            format::write_bytes(w, &entry.key)?;
            format::write_u32(w, members.len() as u32)?;
            for member in members {
                format::write_bytes(w, member)?;
            }
        }
        DumpValue::Hash(pairs) => {
            format::write_u8(w, format::TYPE_HASH)?;
            format::write_bytes(w, &entry.key)?;
            format::write_u32(w, pairs.len() as u32)?;
            for (field, value) in pairs {
                format::write_bytes(w, field)?;
                format::write_bytes(w, value)?;
            }
        }
        DumpValue::SortedSet(members) => {
            format::write_u8(w, format::TYPE_ZSET)?;
            format::write_bytes(w, &entry.key)?;
            format::write_u32(w, members.len() as u32)?;
            for (score, member) in members {
                format::write_f64(w, *score)?;
                format::write_bytes(w, member)?;
            }
        }
    }
    Ok(())
}

/// Writes a complete dump file: header, entries and/or raw partitions,
/// terminator, atomic rename.
pub struct DumpWriter {
    final_path: PathBuf,
    tmp_path: PathBuf,
    writer: BufWriter<File>,
    /// Set after a successful `finish()`; `Drop` removes the temp file
    /// otherwise.
    finished: bool,
}

impl DumpWriter {
    /// Creates the temp file and writes the header. Nothing appears at
    /// `path` until [`Self::finish`] succeeds.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, DumpError> {
        let final_path = path.into();
        let tmp_path = final_path.with_extension("rdb.tmp");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        format::write_header(&mut writer)?;
        Ok(Self {
            final_path,
            tmp_path,
            writer,
            finished: false,
        })
    }

    /// Appends a single entry.
    pub fn write_entry(&mut self, entry: &DumpEntry) -> Result<(), DumpError> {
        write_entry(&mut self.writer, entry)?;
        Ok(())
    }

    /// Appends a pre-serialized run of entries (a worker's partition).
    pub fn write_partition(&mut self, bytes: &[u8]) -> Result<(), DumpError> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Writes the terminator, flushes and syncs, then renames the temp
    /// file over the final path.
    pub fn finish(mut self) -> Result<(), DumpError> {
        format::write_u8(&mut self.writer, format::OP_EOF)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for DumpWriter {
    fn drop(&mut self) {
        if !self.finished {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Reads entries from a dump file until the terminator.
pub struct DumpReader {
    reader: BufReader<File>,
    done: bool,
}

impl DumpReader {
    /// Opens a dump file and validates its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DumpError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        format::read_header(&mut reader)?;
        Ok(Self {
            reader,
            done: false,
        })
    }

    /// Reads the next entry; `None` once the terminator is reached. A
    /// stream that ends without a terminator is an error — finished dumps
    /// always carry one because the writer renames only after writing it.
    pub fn read_entry(&mut self) -> Result<Option<DumpEntry>, DumpError> {
        if self.done {
            return Ok(None);
        }

        let mut tag = format::read_u8(&mut self.reader)?;
        if tag == format::OP_EOF {
            self.done = true;
            return Ok(None);
        }

        let expire_at_ms = if tag == format::OP_EXPIRE_MS {
            let at = format::read_i64(&mut self.reader)?;
            tag = format::read_u8(&mut self.reader)?;
            Some(at)
        } else {
            None
        };

        let key = Bytes::from(format::read_bytes(&mut self.reader)?);
        let value = self.read_value(tag)?;

        Ok(Some(DumpEntry {
            key,
            value,
            expire_at_ms,
        }))
    }

    fn read_value(&mut self, tag: u8) -> Result<DumpValue, DumpError> {
        let r = &mut self.reader;
        match tag {
            format::TYPE_STRING => Ok(DumpValue::String(Bytes::from(format::read_bytes(r)?))),
            format::TYPE_LIST => {
                let count = format::read_u32(r)?;
                format::validate_count(count, "list")?;
                let mut items = VecDeque::with_capacity(format::capped_capacity(count));
                for _ in 0..count {
                    items.push_back(Bytes::from(format::read_bytes(r)?));
                }
                Ok(DumpValue::List(items))
            }
            format::TYPE_SET => {
                let count = format::read_u32(r)?;
                format::validate_count(count, "set")?;
                let mut members = Vec::with_capacity(format::capped_capacity(count));
                for _ in 0..count {
                    members.push(Bytes::from(format::read_bytes(r)?));
                }
                Ok(DumpValue::Set(members))
            }
            format::TYPE_HASH => {
                let count = format::read_u32(r)?;
                format::validate_count(count, "hash")?;
                let mut pairs = Vec::with_capacity(format::capped_capacity(count));
                for _ in 0..count {
                    let field = Bytes::from(format::read_bytes(r)?);
                    let value = Bytes::from(format::read_bytes(r)?);
                    pairs.push((field, value));
                }
                Ok(DumpValue::Hash(pairs))
            }
            format::TYPE_ZSET => {
                let count = format::read_u32(r)?;
                format::validate_count(count, "zset")?;
                let mut members = Vec::with_capacity(format::capped_capacity(count));
                for _ in 0..count {
                    let score = format::read_f64(r)?;
                    let member = Bytes::from(format::read_bytes(r)?);
                    members.push((score, member));
                }
                Ok(DumpValue::SortedSet(members))
            }
            other => Err(DumpError::UnknownType(other)),
        }
    }
}
