use thiserror::Error;

/// Why a buffer could not be decoded. Every variant carries the byte offset
/// (relative to the start of the decoded buffer) where decoding stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unexpected end of data at offset {offset}")]
    Truncated { offset: usize },

    #[error("Length {length} at offset {offset} exceeds the {available} bytes remaining")]
    LengthOverrun {
        offset:    usize,
        length:    usize,
        available: usize,
    },

    #[error("Reserved length octet 0xFF at offset {offset}")]
    ReservedLength { offset: usize },

    #[error("Length at offset {offset} uses {octets} octets, which is not supported")]
    UnsupportedLength { offset: usize, octets: usize },

    #[error("Indefinite length on a primitive encoding at offset {offset}")]
    IndefinitePrimitive { offset: usize },

    #[error("Missing end-of-contents marker at offset {offset} for the value starting at {start}")]
    Unterminated { offset: usize, start: usize },

    #[error("Base-128 number at offset {offset} is too large")]
    NumberOverflow { offset: usize },

    #[error("Nesting deeper than {limit} levels at offset {offset}")]
    DepthExceeded { offset: usize, limit: usize },
}

impl DecodeError {
    /// The byte offset where decoding failed.
    pub fn offset(&self) -> usize {
        match *self {
            DecodeError::Truncated { offset }
            | DecodeError::LengthOverrun { offset, .. }
            | DecodeError::ReservedLength { offset }
            | DecodeError::UnsupportedLength { offset, .. }
            | DecodeError::IndefinitePrimitive { offset }
            | DecodeError::Unterminated { offset, .. }
            | DecodeError::NumberOverflow { offset }
            | DecodeError::DepthExceeded { offset, .. } => offset,
        }
    }
}
