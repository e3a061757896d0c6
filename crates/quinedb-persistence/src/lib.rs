//! quinedb-persistence: the snapshot layer.
//!
//! Implements the QUINEDB binary dump format — a single versioned file
//! holding every live entry with its optional absolute expiry. Workers
//! serialize their own partitions; the dump file is the concatenation of
//! all partitions between one header and one terminator.

pub mod dump;
pub mod format;

pub use dump::{DumpEntry, DumpReader, DumpValue, DumpWriter};
pub use format::DumpError;
