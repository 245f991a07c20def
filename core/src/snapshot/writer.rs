//! Snapshot stream writer
//!
//! Appends fixed-width little-endian values to a growable byte buffer.
//! Writing to memory cannot fail, so the writer API is infallible; the
//! ordered write/read contract is enforced on the read side.

use byteorder::{LittleEndian, WriteBytesExt};

/// Writer half of the snapshot stream.
///
/// Backed by a plain `Vec<u8>` so payload buffers can be pooled and
/// recycled by history and checkpoint storage.
#[derive(Debug, Default)]
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create a writer reusing an existing buffer (cleared, capacity kept).
    pub fn with_buffer(mut buf: Vec<u8>) -> Self {
        buf.clear();
        Self { buf }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.write_u8(v).expect("vec write is infallible");
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf
            .write_u16::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf
            .write_u32::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf
            .write_u64::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.write_i8(v).expect("vec write is infallible");
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf
            .write_i16::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf
            .write_i32::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf
            .write_i64::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf
            .write_f32::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf
            .write_f64::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    /// Write raw bytes with no length prefix.
    ///
    /// The reader must know the exact length from its own schema.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write bytes preceded by a `u32` length prefix.
    pub fn write_prefixed_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View the encoded bytes without consuming the writer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and take the encoded payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
