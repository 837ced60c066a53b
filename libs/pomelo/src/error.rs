//! Error handling types.
//!
//! Both codecs share one error type. The four families mirror the points
//! where a document can fail: schema definition, wire decoding, schema
//! matching between peers, and merge binding.

use std::io;

use crate::value::ValueType;

pub type Result<T> = std::result::Result<T, Error>;

/// Potential errors to encounter when serializing or deserializing.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The type's persistence declaration itself is malformed.
    ///
    /// Raised at the first schema extraction of the offending type and
    /// never at read or write time thereafter.
    #[error("in type `{type_name}`: {message}")]
    SchemaDefinition {
        /// The wire name of the offending type.
        type_name: String,
        /// What is wrong with the declaration.
        message: String,
    },

    /// The byte or text stream violates the wire format.
    #[error("{kind} at byte {offset}")]
    WireFormat {
        /// The specific violation.
        kind: WireFormatKind,
        /// Stream offset at which the violation was detected.
        offset: u64,
    },

    /// The persisted schema and the local schema disagree in a way the
    /// merge-join cannot reconcile.
    #[error("schema mismatch in `{type_name}`, field `{field}`: {kind}")]
    SchemaMismatch {
        /// The wire name of the type being read.
        type_name: String,
        /// The tag of the offending field.
        field: String,
        /// The specific disagreement.
        kind: SchemaMismatchKind,
    },

    /// A field is marked for in-place merging but its type cannot be
    /// merged into.
    #[error("in type `{type_name}`: field `{field}` cannot be merged into")]
    Merge {
        /// The wire name of the declaring type.
        type_name: String,
        /// The name of the offending field.
        field: String,
    },

    /// The error originated from the underlying [`io::Write`] or
    /// [`io::Read`] implementation.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The JSON text could not be parsed or emitted.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A JSON value whose shape does not fit the declared type.
    #[error("JSON value mismatch: expected {expected}, found {found}")]
    JsonMismatch {
        /// What the declared type called for.
        expected: String,
        /// A short rendering of the value found instead.
        found: String,
    },

    /// Another reason.
    #[error("{0}")]
    Custom(String),
}

/// Wire-level violations, always reported with a stream offset.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WireFormatKind {
    /// The stream does not start with the expected signature bytes.
    #[error("signature mismatch")]
    SignatureMismatch,
    /// The stream ended before the value was complete.
    #[error("unexpected end of stream")]
    Truncated,
    /// Bytes remained past the end of the deserialized value.
    #[error("trailing bytes past the end of the value")]
    TrailingBytes,
    /// A class id that is neither known nor the next to be defined.
    #[error("bad class id {0}")]
    BadClassId(i16),
    /// A rough type code outside the closed set.
    #[error("unknown rough type code {0}")]
    BadRoughType(u8),
    /// The reserved decimal rough type, which has no local representation.
    #[error("unsupported rough type `decimal`")]
    UnsupportedDecimal,
    /// A boolean byte that was neither 0 nor 1.
    #[error("invalid bool value")]
    InvalidBool,
    /// A char value that is not a valid scalar.
    #[error("invalid char code")]
    InvalidChar,
    /// String data contained invalid UTF-8.
    #[error("invalid utf-8 in string data")]
    InvalidUtf8,
    /// A tick count outside the representable date range.
    #[error("date out of representable range")]
    InvalidDate,
    /// An enum discriminant with no matching variant.
    #[error("invalid enum value {0}")]
    InvalidEnum(i32),
    /// A null value where the declared type does not permit one.
    #[error("unexpected null value")]
    UnexpectedNull,
    /// A LEB128 length prefix overflowing the target width.
    #[error("length prefix overflows the target type")]
    LengthOverflow,
    /// A negative element or field count other than the −1 null marker.
    #[error("invalid count {0}")]
    InvalidCount(i32),
    /// More classes than the 16-bit id space can hold.
    #[error("class id space exhausted")]
    TooManyClasses,
    /// A tagged object body that did not end with the 0 terminator.
    #[error("unfinished object, expected index 0 but got {0}")]
    UnfinishedObject(i16),
    /// A field index outside the persisted field list.
    #[error("field index {0} out of range")]
    BadFieldIndex(i16),
    /// The top-level rough type does not fit the requested type.
    #[error("top-level value of type {found} is incompatible with the requested type")]
    IncompatibleRoot {
        /// The rough type found in the stream.
        found: ValueType,
    },
}

/// Disagreements between the persisted and the local schema.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaMismatchKind {
    /// A locally required field is absent from the stream.
    #[error("required field missing from the stream")]
    MissingRequired,
    /// The persisted rough type does not fit the local declared type.
    #[error("incompatible persisted type {found}, expected {expected}")]
    IncompatibleType {
        /// The locally declared rough type.
        expected: ValueType,
        /// The rough type found in the stream.
        found: ValueType,
    },
    /// The stream carries a field the local schema does not declare, the
    /// type has no unknown storage, and the options disallow it.
    #[error("unknown field not declared by the local schema")]
    UnknownField,
    /// The stream carries an instance of a different class.
    #[error("cannot read class `{found}` into `{expected}`")]
    WrongClass {
        /// The locally expected wire name.
        expected: String,
        /// The wire name found in the stream.
        found: String,
    },
}

impl Error {
    pub(crate) fn schema(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaDefinition {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn wire(kind: WireFormatKind, offset: u64) -> Self {
        Self::WireFormat { kind, offset }
    }

    pub(crate) fn json_mismatch(expected: impl Into<String>, found: &serde_json::Value) -> Self {
        let found = match found {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "a bool",
            serde_json::Value::Number(_) => "a number",
            serde_json::Value::String(_) => "a string",
            serde_json::Value::Array(_) => "an array",
            serde_json::Value::Object(_) => "an object",
        };
        Self::JsonMismatch {
            expected: expected.into(),
            found: found.to_owned(),
        }
    }

    pub(crate) fn mismatch(
        type_name: impl Into<String>,
        field: impl Into<String>,
        kind: SchemaMismatchKind,
    ) -> Self {
        Self::SchemaMismatch {
            type_name: type_name.into(),
            field: field.into(),
            kind,
        }
    }
}
