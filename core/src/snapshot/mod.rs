//! Binary snapshot stream
//!
//! Tick-tagged byte serialization used by every adapter to persist and
//! restore typed records. A writer/reader pair must decode values in
//! exactly the order they were written: there is no random access and no
//! embedded type tagging. Adapters writing variable-length collections
//! must write their own length prefix before the elements.
//!
//! Layout is fixed little-endian. The stream is a single-process format;
//! cross-endianness portability is explicitly out of scope.

mod descriptor;
mod reader;
mod writer;

pub use descriptor::RecordDescriptor;
pub use reader::SnapshotReader;
pub use writer::SnapshotWriter;

/// Error while encoding or decoding a snapshot stream.
///
/// Every variant signals an adapter bug (a `save`/`load` pair that does
/// not mirror each other) and is fatal by design: masking a schema
/// mismatch risks silently corrupting restored state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// A read requested more bytes than remain in the stream.
    #[error("snapshot stream ended early: wanted {wanted} bytes, {remaining} remain")]
    UnexpectedEof { wanted: usize, remaining: usize },

    /// A record's descriptor header did not match the loading adapter.
    #[error("record descriptor mismatch: expected {expected}, found {found}")]
    DescriptorMismatch { expected: String, found: String },

    /// A load finished with undecoded bytes left over.
    #[error("record payload has {remaining} undecoded trailing bytes")]
    TrailingBytes { remaining: usize },

    /// A fixed-width field held a value outside its encoding.
    #[error("invalid encoding for {what}")]
    InvalidEncoding { what: &'static str },
}

/// Compute the FNV-1a checksum of a payload.
///
/// Fast with good distribution; used to tag history records and
/// checkpoints so a host can diagnose divergence between runs.
pub fn checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
