/// Errors raised while encoding or decoding message bodies.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A read would advance past the end of the body.
    #[error("read out of bounds")]
    OutOfBounds,

    /// The optional counter exceeded the presence bitmap capacity.
    #[error("optional count is corrupted")]
    OptionalCorrupted,

    /// A field's declared type and its extra parameter disagree.
    #[error("field type is corrupted")]
    TypeCorrupted,

    /// A fixed binary slot does not hold exactly the declared length.
    #[error("fixed binary field '{field}': wrong length ({actual} bytes, want {expected})")]
    WrongLength {
        field: String,
        expected: u32,
        actual: usize,
    },

    /// A length-prefixed binary exceeds the `u16` prefix range.
    #[error("binary field '{field}' too long ({len} bytes, max 65535)")]
    LengthOverflow16 { field: String, len: usize },

    /// A length-prefixed binary exceeds the `u32` prefix range.
    #[error("binary field '{field}' too long ({len} bytes, max 4294967295)")]
    LengthOverflow32 { field: String, len: usize },

    /// An array exceeds the `u16` element-count range.
    #[error("array field '{field}' too long ({len} elements, max 65535)")]
    ArrayLengthOverflow { field: String, len: usize },

    /// A required field has no slot in the record, or its optional slot is empty.
    #[error("required field '{0}' not present in record")]
    RequiredNotPresent(String),

    /// The record's slot cannot hold the field's declared type.
    #[error("record slot for field '{field}' cannot hold its declared type")]
    InvalidRecordShape { field: String },

    /// Two fields of one record type bind the same protocol name.
    /// Permanent: cached per record type on first use.
    #[error("duplicate record binding: {0}")]
    DuplicateBinding(&'static str),

    /// Binary content is not valid UTF-8 for a string slot.
    #[error("binary field '{field}' is not valid UTF-8 for a string slot")]
    InvalidByteKind { field: String },
}

pub type Result<T> = std::result::Result<T, CodecError>;
