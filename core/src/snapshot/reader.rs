//! Snapshot stream reader
//!
//! Sequentially decodes statically-known types from a byte cursor in the
//! exact order they were written. A read past the end of the stream is a
//! fatal schema mismatch, never a recoverable condition.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::SnapshotError;

/// Reader half of the snapshot stream.
pub struct SnapshotReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> SnapshotReader<'a> {
    /// Create a reader over an encoded payload.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    /// Bytes not yet decoded.
    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        (len - self.cursor.position().min(len)) as usize
    }

    fn check(&self, wanted: usize) -> Result<(), SnapshotError> {
        let remaining = self.remaining();
        if wanted > remaining {
            return Err(SnapshotError::UnexpectedEof { wanted, remaining });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, SnapshotError> {
        self.check(1)?;
        Ok(self.cursor.read_u8().expect("length checked"))
    }

    pub fn read_u16(&mut self) -> Result<u16, SnapshotError> {
        self.check(2)?;
        Ok(self.cursor.read_u16::<LittleEndian>().expect("length checked"))
    }

    pub fn read_u32(&mut self) -> Result<u32, SnapshotError> {
        self.check(4)?;
        Ok(self.cursor.read_u32::<LittleEndian>().expect("length checked"))
    }

    pub fn read_u64(&mut self) -> Result<u64, SnapshotError> {
        self.check(8)?;
        Ok(self.cursor.read_u64::<LittleEndian>().expect("length checked"))
    }

    pub fn read_i8(&mut self) -> Result<i8, SnapshotError> {
        self.check(1)?;
        Ok(self.cursor.read_i8().expect("length checked"))
    }

    pub fn read_i16(&mut self) -> Result<i16, SnapshotError> {
        self.check(2)?;
        Ok(self.cursor.read_i16::<LittleEndian>().expect("length checked"))
    }

    pub fn read_i32(&mut self) -> Result<i32, SnapshotError> {
        self.check(4)?;
        Ok(self.cursor.read_i32::<LittleEndian>().expect("length checked"))
    }

    pub fn read_i64(&mut self) -> Result<i64, SnapshotError> {
        self.check(8)?;
        Ok(self.cursor.read_i64::<LittleEndian>().expect("length checked"))
    }

    pub fn read_f32(&mut self) -> Result<f32, SnapshotError> {
        self.check(4)?;
        Ok(self.cursor.read_f32::<LittleEndian>().expect("length checked"))
    }

    pub fn read_f64(&mut self) -> Result<f64, SnapshotError> {
        self.check(8)?;
        Ok(self.cursor.read_f64::<LittleEndian>().expect("length checked"))
    }

    pub fn read_bool(&mut self) -> Result<bool, SnapshotError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SnapshotError::InvalidEncoding { what: "bool" }),
        }
    }

    /// Read exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, SnapshotError> {
        self.check(len)?;
        let pos = self.cursor.position() as usize;
        let bytes = self.cursor.get_ref()[pos..pos + len].to_vec();
        self.cursor.set_position((pos + len) as u64);
        Ok(bytes)
    }

    /// Read a `u32` length prefix followed by that many bytes.
    pub fn read_prefixed_bytes(&mut self) -> Result<Vec<u8>, SnapshotError> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// Assert the stream was fully consumed.
    ///
    /// A load that leaves trailing bytes read fewer fields than the save
    /// wrote, which is the same adapter bug as reading too many.
    pub fn finish(self) -> Result<(), SnapshotError> {
        let remaining = self.remaining();
        if remaining > 0 {
            return Err(SnapshotError::TrailingBytes { remaining });
        }
        Ok(())
    }
}
