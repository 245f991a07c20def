//! Versioned record descriptors
//!
//! Each adapter names its record schema with a `RecordDescriptor` that is
//! written as a small header ahead of every payload. On load the header
//! is checked first, so a save/load pair that drifted apart fails with a
//! diagnosable mismatch instead of an opaque length error deep in the
//! stream.

use std::fmt;

use super::{SnapshotError, SnapshotReader, SnapshotWriter};

/// Identity and version of one adapter's record schema.
///
/// Bump `version` whenever the ordered field layout of `save` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordDescriptor {
    pub name: &'static str,
    pub version: u16,
}

impl RecordDescriptor {
    pub const fn new(name: &'static str, version: u16) -> Self {
        Self { name, version }
    }

    /// Write the descriptor header: length-prefixed name, then version.
    pub fn write_header(&self, w: &mut SnapshotWriter) {
        w.write_u16(self.name.len() as u16);
        w.write_bytes(self.name.as_bytes());
        w.write_u16(self.version);
    }

    /// Read and verify a descriptor header against this descriptor.
    pub fn check_header(&self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        let name_len = r.read_u16()? as usize;
        let name_bytes = r.read_bytes(name_len)?;
        let version = r.read_u16()?;

        let matches = name_bytes == self.name.as_bytes() && version == self.version;
        if !matches {
            let found = match String::from_utf8(name_bytes) {
                Ok(name) => format!("{name} v{version}"),
                Err(_) => format!("<non-utf8 name> v{version}"),
            };
            return Err(SnapshotError::DescriptorMismatch {
                expected: self.to_string(),
                found,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}
