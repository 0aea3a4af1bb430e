use crate::stream::EndOfStream;
use crate::wire::WireType;

/// Failure while encoding or decoding a record.
///
/// A decode that fails may leave the target partially populated; callers must
/// discard it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("stream exhausted")]
    EndOfStream,
    #[error("varint longer than 64 bits")]
    VarintOverflow,
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),
    #[error("field number {0} out of range")]
    FieldNumberOverflow(u64),
    #[error("length-delimited size {0} does not fit in memory")]
    SizeOverflow(u64),
    #[error("field {field} has wire type {found:?}, expected {expected:?}")]
    WireTypeMismatch {
        field: u32,
        expected: WireType,
        found: WireType,
    },
    #[error("field {field} value does not fit in 32 bits")]
    IntegerOverflow { field: u32 },
    #[error("field {field} holds unknown enum value {value}")]
    InvalidEnumValue { field: u32, value: u64 },
    #[error("field {field} ended before its declared size")]
    Truncated { field: u32 },
    #[error("unconsumed bytes after message")]
    TrailingData,
    #[error("record tagged {found:#x}/{wire_type:?}, expected {expected:#x}")]
    MagicMismatch {
        expected: u32,
        found: u32,
        wire_type: WireType,
    },
}

impl From<EndOfStream> for CodecError {
    fn from(_: EndOfStream) -> Self {
        CodecError::EndOfStream
    }
}
