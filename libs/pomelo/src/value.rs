//! Rough types and the generic wire value tree.
//!
//! A [`ValueType`] describes the *shape* of a value independent of its
//! exact local type: which primitive it is, or which container shape with
//! which element shapes. It is written once per polymorphic value, once
//! per field in a class definition, and drives the structural
//! compatibility check during the schema merge-join.
//!
//! A [`WireValue`] is the closed tagged union used wherever a value must
//! be handled without a local type: `Any`-typed fields, unknown fields,
//! and whole unknown classes. It retains enough structure (element types,
//! class tags) to be re-emitted byte-identically.

use std::fmt;

use time::{Duration, OffsetDateTime};

use crate::error::{Error, Result, WireFormatKind};

// These byte codes are part of the wire format.
pub(crate) mod code {
    pub const NONE: u8 = 0;
    pub const SBYTE: u8 = 1;
    pub const BYTE: u8 = 2;
    pub const SHORT: u8 = 3;
    pub const USHORT: u8 = 4;
    pub const INT: u8 = 5;
    pub const UINT: u8 = 6;
    pub const LONG: u8 = 7;
    pub const ULONG: u8 = 8;
    pub const BOOL: u8 = 9;
    pub const CHAR: u8 = 10;
    pub const FLOAT: u8 = 11;
    pub const DOUBLE: u8 = 12;
    // 13 is the reserved decimal code. No local representation exists, so
    // decoding it fails; the code stays reserved to keep the numbering
    // compatible.
    pub const DECIMAL: u8 = 13;
    pub const DATE: u8 = 14;
    pub const TIME_SPAN: u8 = 15;
    pub const STRING: u8 = 16;
    pub const ANY: u8 = 17;
    pub const NULLABLE: u8 = 18;
    pub const RECORD: u8 = 32;
    pub const SEQUENCE: u8 = 33;
    pub const MAPPING: u8 = 34;
}

/// The structural shape of a wire value.
///
/// Container shapes carry their recursively-tagged element shapes, so two
/// peers can check compatibility without agreeing on concrete container
/// implementations. `Record` is deliberately opaque: concrete classes are
/// resolved by name through the class-definition protocol, never through
/// their rough type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Shape of a null `Any` value; never a declared field type.
    None,
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Bool,
    Char,
    Float,
    Double,
    Date,
    TimeSpan,
    String,
    /// Any shape; the value itself carries its rough type.
    Any,
    Nullable(Box<ValueType>),
    Sequence(Box<ValueType>),
    Mapping(Box<ValueType>, Box<ValueType>),
    /// An opaque class or struct, resolved by name.
    Record,
}

impl ValueType {
    /// The leading wire code for this shape. Container codes are followed
    /// by their element shapes on the wire.
    pub(crate) fn code(&self) -> u8 {
        match self {
            Self::None => code::NONE,
            Self::SByte => code::SBYTE,
            Self::Byte => code::BYTE,
            Self::Short => code::SHORT,
            Self::UShort => code::USHORT,
            Self::Int => code::INT,
            Self::UInt => code::UINT,
            Self::Long => code::LONG,
            Self::ULong => code::ULONG,
            Self::Bool => code::BOOL,
            Self::Char => code::CHAR,
            Self::Float => code::FLOAT,
            Self::Double => code::DOUBLE,
            Self::Date => code::DATE,
            Self::TimeSpan => code::TIME_SPAN,
            Self::String => code::STRING,
            Self::Any => code::ANY,
            Self::Nullable(_) => code::NULLABLE,
            Self::Sequence(_) => code::SEQUENCE,
            Self::Mapping(..) => code::MAPPING,
            Self::Record => code::RECORD,
        }
    }

    /// Whether a persisted value of shape `persisted` can be decoded into
    /// a field locally declared with shape `self`.
    ///
    /// Local `Any` accepts everything. Containers recurse over their
    /// element shapes. Everything else must match exactly; enums are
    /// declared as `Int` locally and therefore match `Int`.
    pub fn is_compatible(&self, persisted: &ValueType) -> bool {
        match (self, persisted) {
            (Self::Any, _) => true,
            (Self::Nullable(a), Self::Nullable(b)) => a.is_compatible(b),
            (Self::Sequence(a), Self::Sequence(b)) => a.is_compatible(b),
            (Self::Mapping(ak, av), Self::Mapping(bk, bv)) => {
                ak.is_compatible(bk) && av.is_compatible(bv)
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::SByte => f.write_str("sbyte"),
            Self::Byte => f.write_str("byte"),
            Self::Short => f.write_str("short"),
            Self::UShort => f.write_str("ushort"),
            Self::Int => f.write_str("int"),
            Self::UInt => f.write_str("uint"),
            Self::Long => f.write_str("long"),
            Self::ULong => f.write_str("ulong"),
            Self::Bool => f.write_str("bool"),
            Self::Char => f.write_str("char"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Date => f.write_str("date"),
            Self::TimeSpan => f.write_str("timespan"),
            Self::String => f.write_str("string"),
            Self::Any => f.write_str("any"),
            Self::Nullable(t) => write!(f, "nullable<{t}>"),
            Self::Sequence(t) => write!(f, "seq<{t}>"),
            Self::Mapping(k, v) => write!(f, "map<{k}, {v}>"),
            Self::Record => f.write_str("record"),
        }
    }
}

/// A generically decoded value.
///
/// Containers keep the declared element shapes from the stream so that an
/// empty sequence or a null mapping re-emits with the same class
/// definition it arrived with.
#[derive(Clone, Debug, PartialEq)]
pub enum WireValue {
    /// A null `Any` value.
    Null,
    SByte(i8),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Bool(bool),
    Char(char),
    Float(f32),
    Double(f64),
    Date(OffsetDateTime),
    TimeSpan(Duration),
    /// A string value; `None` is the wire-level null string.
    Str(Option<String>),
    /// A nullable scalar with its declared inner shape.
    Nullable(ValueType, Option<Box<WireValue>>),
    /// A sequence with its declared element shape; `None` is a null
    /// sequence.
    Seq(ValueType, Option<Vec<WireValue>>),
    /// A mapping with its declared key and value shapes; `None` is a null
    /// mapping.
    Map(ValueType, ValueType, Option<Vec<(WireValue, WireValue)>>),
    /// A record; `None` is a null reference.
    Record(Option<Box<Unknown>>),
}

impl Default for WireValue {
    fn default() -> Self {
        Self::Null
    }
}

impl WireValue {
    /// The rough type this value presents on the wire.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::None,
            Self::SByte(_) => ValueType::SByte,
            Self::Byte(_) => ValueType::Byte,
            Self::Short(_) => ValueType::Short,
            Self::UShort(_) => ValueType::UShort,
            Self::Int(_) => ValueType::Int,
            Self::UInt(_) => ValueType::UInt,
            Self::Long(_) => ValueType::Long,
            Self::ULong(_) => ValueType::ULong,
            Self::Bool(_) => ValueType::Bool,
            Self::Char(_) => ValueType::Char,
            Self::Float(_) => ValueType::Float,
            Self::Double(_) => ValueType::Double,
            Self::Date(_) => ValueType::Date,
            Self::TimeSpan(_) => ValueType::TimeSpan,
            Self::Str(_) => ValueType::String,
            Self::Nullable(inner, _) => ValueType::Nullable(Box::new(inner.clone())),
            Self::Seq(elem, _) => ValueType::Sequence(Box::new(elem.clone())),
            Self::Map(k, v, _) => {
                ValueType::Mapping(Box::new(k.clone()), Box::new(v.clone()))
            }
            Self::Record(_) => ValueType::Record,
        }
    }
}

/// An instance of a class whose name was not locally resolvable, or a
/// record decoded without a local type.
///
/// All persisted fields are retained generically, in ascending tag order,
/// so the object can be forwarded or re-emitted without loss.
#[derive(Clone, Debug, PartialEq)]
pub struct Unknown {
    /// The wire name of the class.
    pub class_tag: String,
    /// Whether the class body was positionally encoded.
    pub compact: bool,
    /// The persisted fields, ascending by tag.
    pub fields: Vec<UnknownField>,
}

/// One retained field of an [`Unknown`] class or an [`UnknownStorage`].
#[derive(Clone, Debug, PartialEq)]
pub struct UnknownField {
    /// The wire tag of the field.
    pub tag: String,
    /// The declared rough type from the class definition.
    pub ty: ValueType,
    /// The decoded value.
    pub value: WireValue,
}

/// Per-instance side storage for fields the local schema no longer
/// declares.
///
/// A persisted type opts in by carrying a field of this type marked
/// `#[persist(unknown)]`. Retained fields are merged back into the wire
/// by tag order when the instance is re-serialized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnknownStorage {
    fields: Vec<UnknownField>,
}

impl UnknownStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no unknown fields are retained.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The number of retained fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Drops all retained fields.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// The retained fields, ascending by tag.
    pub fn fields(&self) -> &[UnknownField] {
        &self.fields
    }

    /// Looks up a retained field by tag.
    pub fn get(&self, tag: &str) -> Option<&UnknownField> {
        self.fields
            .binary_search_by(|f| f.tag.as_str().cmp(tag))
            .ok()
            .map(|i| &self.fields[i])
    }

    /// Retains a field, keeping the storage sorted by tag. A field with
    /// the same tag is replaced.
    pub fn add(&mut self, tag: impl Into<String>, ty: ValueType, value: WireValue) {
        let field = UnknownField {
            tag: tag.into(),
            ty,
            value,
        };
        match self
            .fields
            .binary_search_by(|f| f.tag.as_str().cmp(field.tag.as_str()))
        {
            Ok(i) => self.fields[i] = field,
            Err(i) => self.fields.insert(i, field),
        }
    }
}

pub(crate) const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

/// Converts a date to its wire tick count (100 ns units since the Unix
/// epoch).
pub(crate) fn date_to_ticks(value: OffsetDateTime) -> i64 {
    // the full OffsetDateTime year range fits an i64 tick count
    #[allow(clippy::cast_possible_truncation)]
    let ticks = (value.unix_timestamp_nanos() / i128::from(NANOS_PER_TICK)) as i64;
    ticks
}

pub(crate) fn date_from_ticks(ticks: i64, offset: u64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ticks) * i128::from(NANOS_PER_TICK))
        .map_err(|_| Error::wire(WireFormatKind::InvalidDate, offset))
}

/// Converts a time-span to its wire tick count.
pub(crate) fn duration_to_ticks(value: Duration) -> Result<i64> {
    i64::try_from(value.whole_nanoseconds() / i128::from(NANOS_PER_TICK))
        .map_err(|_| Error::Custom("time-span out of tick range".to_owned()))
}

pub(crate) fn duration_from_ticks(ticks: i64) -> Duration {
    let seconds = ticks / TICKS_PER_SECOND;
    #[allow(clippy::cast_possible_truncation)]
    let nanos = ((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK) as i32;
    Duration::new(seconds, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_is_structural() {
        let seq_int = ValueType::Sequence(Box::new(ValueType::Int));
        assert!(seq_int.is_compatible(&seq_int.clone()), "same shape");
        assert!(
            !seq_int.is_compatible(&ValueType::Sequence(Box::new(ValueType::Long))),
            "element shapes differ"
        );
        assert!(
            ValueType::Any.is_compatible(&seq_int),
            "any accepts every shape"
        );
        assert!(
            !ValueType::Record.is_compatible(&ValueType::String),
            "record is not a string"
        );
    }

    #[test]
    fn storage_stays_sorted() {
        let mut storage = UnknownStorage::new();
        storage.add("b", ValueType::Int, WireValue::Int(2));
        storage.add("a", ValueType::Int, WireValue::Int(1));
        storage.add("c", ValueType::Int, WireValue::Int(3));
        let tags: Vec<_> = storage.fields().iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(tags, ["a", "b", "c"], "tags must be ascending");
        assert_eq!(
            storage.get("b").map(|f| &f.value),
            Some(&WireValue::Int(2)),
            "lookup by tag"
        );
    }

    #[test]
    fn duration_ticks_round_trip() {
        let values = [
            Duration::ZERO,
            Duration::seconds(90) + Duration::nanoseconds(500),
            -Duration::seconds(1) - Duration::nanoseconds(100),
        ];
        for v in values {
            let ticks = duration_to_ticks(v).expect("in range");
            // sub-tick precision is truncated by design
            let back = duration_from_ticks(ticks);
            assert_eq!(
                duration_to_ticks(back).expect("in range"),
                ticks,
                "tick count must survive"
            );
        }
    }
}
