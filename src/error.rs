//! Error types for the binary decoders.
//!
//! Decoding is all-or-nothing: once any of these errors is raised the
//! offset bookkeeping for the rest of the buffer cannot be trusted, so no
//! partially decoded structure is ever returned alongside it.

use thiserror::Error;

/// Failure while decoding a long-log or raw-sample buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A fixed-width field extends past the end of the buffer.
    #[error("truncated input: needed {wanted} bytes at offset {offset}, only {remaining} remain")]
    TruncatedInput {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },

    /// The decoded structure does not account for every byte of the file.
    ///
    /// `record_count` is the number of ranges (long-log) or frames (raw).
    #[error(
        "malformed file: length {raw_len} does not match {sync_count} sync details, \
         {record_count} records and {sample_count} samples"
    )]
    MalformedFile {
        raw_len: usize,
        sync_count: usize,
        record_count: usize,
        sample_count: usize,
    },

    /// The long-log header does not start with the expected marker.
    #[error("bad signature {found:?}, expected \"WLS\"")]
    BadSignature { found: [u8; 3] },

    /// A raw frame declares fewer bytes than its mandatory file header.
    #[error("frame at offset {offset} declares {length} bytes, shorter than its header")]
    InvalidFrameLength { offset: usize, length: u32 },

    /// A numeric read was requested at a width the field type cannot hold.
    #[error("unsupported {kind} width {width} at offset {offset}")]
    UnsupportedWidth {
        kind: &'static str,
        offset: usize,
        width: usize,
    },
}

/// Result alias used by the decoder layer.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
