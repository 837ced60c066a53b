//! # Pomelo
//!
//! Metadata-driven object serialization with two wire formats — a
//! compact, self-describing binary encoding and a structurally parallel
//! JSON encoding — over one schema model.
//!
//! Types opt into persistence with `#[derive(Persist)]` and per-field
//! markers:
//!
//! ```
//! use pomelo::Persist;
//!
//! #[derive(Debug, Clone, Default, PartialEq, Persist)]
//! struct Point {
//!     #[persist(required, alias = "0")]
//!     x: i32,
//!     #[persist(required, alias = "1")]
//!     y: i32,
//! }
//!
//! let bytes = pomelo::binary::to_vec(&Point { x: 3, y: 4 })?;
//! let point: Point = pomelo::binary::from_slice(&bytes)?;
//! assert_eq!(point, Point { x: 3, y: 4 });
//! # Ok::<_, pomelo::Error>(())
//! ```
//!
//! The binary format writes, per stream, one rough-tagged top-level
//! value. The first instance of each class is preceded by an inline
//! class definition — `(class id, type name, field count, per-field tag
//! and rough type)` — so a stream is decodable with no schema exchange
//! beyond itself. Object bodies are `(field index, value)` pairs
//! terminated by index 0, or bare positional values for `compact` types.
//!
//! Readers join the persisted field list against the local schema by
//! tag: locally missing optional fields keep their defaults, fields the
//! local schema no longer declares are preserved in an opt-in
//! [`UnknownStorage`] (or dropped, or rejected, per [`Options`]), and
//! whole classes without a local type decode as [`Unknown`] and
//! round-trip losslessly. Adding optional fields to a type therefore
//! never breaks older readers, and old data keeps reading after fields
//! are removed.

pub mod binary;
pub mod error;
pub mod json;
pub mod meta;
mod object;
mod registry;
mod surrogate;
pub mod value;
mod wire;

pub use error::{Error, Result};
pub use object::{Persist, PersistObject};
pub use pomelo_macros::Persist;
pub use registry::register;
pub use surrogate::SurrogateDesc;
pub use value::{Unknown, UnknownStorage, ValueType, WireValue};
pub use wire::Wire;

/// How field tags are derived from member declarations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TagMode {
    /// The explicit alias, falling back to the member name.
    #[default]
    Aliases,
    /// Always the member name.
    Names,
    /// Generated 4-character ids, assigned at first schema use.
    Ids,
}

/// Options shared by both codecs.
///
/// Schemas are cached per `(type, options)` pair, so two option values
/// that differ in any field produce independent schemas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Options {
    /// How field tags are derived.
    pub tag_mode: TagMode,
    /// Whether fields undeclared by the local schema are silently
    /// dropped when the type carries no unknown storage. When unset,
    /// such fields fail the read.
    pub allow_unknown_fields: bool,
    /// Whether a type with no persisted members is accepted.
    pub allow_empty_schemas: bool,
    /// Whether binary streams carry the [`binary::SIGNATURE`] prefix.
    pub auto_signature: bool,
}

/// Implementation details of the `Persist` derive expansion. Not part of
/// the public interface.
#[doc(hidden)]
pub mod private {
    use std::any::Any;

    pub use serde_json::Value as Json;

    pub use crate::binary::de::BinReader;
    pub use crate::binary::ser::BinWriter;
    pub use crate::json::de::JsonReader;
    pub use crate::json::ser::JsonWriter;

    use crate::error::{Error, Result, WireFormatKind};
    use crate::object::{Persist, PersistObject};

    pub fn write_object(obj: &dyn PersistObject, w: &mut BinWriter<'_>) -> Result<()> {
        crate::binary::ser::write_object(obj, w)
    }

    pub fn write_null_object(w: &mut BinWriter<'_>) -> Result<()> {
        crate::binary::ser::write_null_object(w)
    }

    pub fn read_object_concrete<T: Persist>(r: &mut BinReader<'_>) -> Result<T> {
        crate::binary::de::read_object_concrete(r)
    }

    pub fn read_object_concrete_opt<T: Persist>(r: &mut BinReader<'_>) -> Result<Option<T>> {
        crate::binary::de::read_object_concrete_opt(r)
    }

    pub fn merge_object_concrete<T: Persist>(obj: &mut T, r: &mut BinReader<'_>) -> Result<()> {
        crate::binary::de::merge_object_concrete(obj, r)
    }

    pub fn read_object_dyn(r: &mut BinReader<'_>) -> Result<Option<Box<dyn PersistObject>>> {
        crate::binary::de::read_object_dyn(r)
    }

    pub fn write_object_json(
        obj: &dyn PersistObject,
        w: &mut JsonWriter<'_>,
        force_class: bool,
    ) -> Result<Json> {
        crate::json::ser::write_object_json(obj, w, force_class)
    }

    pub fn read_object_json_concrete<T: Persist>(r: &mut JsonReader<'_>, v: &Json) -> Result<T> {
        crate::json::de::read_object_json_concrete(r, v)
    }

    pub fn merge_object_json_concrete<T: Persist>(
        obj: &mut T,
        r: &mut JsonReader<'_>,
        v: &Json,
    ) -> Result<()> {
        crate::json::de::merge_object_json_concrete(obj, r, v)
    }

    pub fn read_object_json_dyn(
        r: &mut JsonReader<'_>,
        v: &Json,
    ) -> Result<Option<Box<dyn PersistObject>>> {
        crate::json::de::read_object_json_dyn(r, v)
    }

    pub fn read_object_json_surrogate<T: Persist, S: Persist>(
        r: &mut JsonReader<'_>,
        v: &Json,
        from: fn(S) -> T,
    ) -> Result<T> {
        crate::json::de::read_object_json_surrogate(r, v, from)
    }

    pub fn downcast_ref<T: Any>(obj: &dyn PersistObject) -> &T {
        obj.as_any()
            .downcast_ref::<T>()
            .expect("field accessor invoked with a foreign instance")
    }

    pub fn downcast_mut<T: Any>(obj: &mut dyn PersistObject) -> &mut T {
        obj.as_any_mut()
            .downcast_mut::<T>()
            .expect("field accessor invoked with a foreign instance")
    }

    pub fn ensure_registered<T: Persist>() {
        crate::registry::ensure(<T as Persist>::descriptor());
    }

    /// Forces schema extraction, surfacing definition errors (surrogate
    /// chains included) for types the engines never walk themselves.
    pub fn touch_schema<T: Persist>(options: &crate::Options) -> Result<()> {
        crate::meta::Meta::get::<T>(options).map(|_| ())
    }

    pub fn force_compact(w: &mut JsonWriter<'_>) {
        w.force_compact();
    }

    pub fn write_enum(w: &mut BinWriter<'_>, value: i32) -> Result<()> {
        w.write_i32(value)
    }

    pub fn read_enum(r: &mut BinReader<'_>) -> Result<i32> {
        r.read_i32()
    }

    pub fn invalid_enum(r: &BinReader<'_>, value: i32) -> Error {
        Error::wire(WireFormatKind::InvalidEnum(value), r.pos())
    }

    pub fn invalid_enum_json(expected: &str, v: &Json) -> Error {
        Error::json_mismatch(expected, v)
    }

    pub fn unexpected_null(r: &BinReader<'_>) -> Error {
        Error::wire(WireFormatKind::UnexpectedNull, r.pos())
    }

    /// Downcasts a dynamically read record to the owner type or its
    /// conditional surrogate.
    pub fn downcast_surrogate<T: Persist, S: Persist>(
        obj: Box<dyn PersistObject>,
        from: fn(S) -> T,
    ) -> Result<T> {
        let found = obj.type_name().to_owned();
        let obj = match obj.into_any().downcast::<T>() {
            Ok(value) => return Ok(*value),
            Err(obj) => obj,
        };
        match obj.downcast::<S>() {
            Ok(surrogate) => Ok(from(*surrogate)),
            Err(_) => Err(Error::SchemaMismatch {
                type_name: <T as Persist>::descriptor().name.to_owned(),
                field: "<value>".to_owned(),
                kind: crate::error::SchemaMismatchKind::WrongClass {
                    expected: <T as Persist>::descriptor().name.to_owned(),
                    found,
                },
            }),
        }
    }
}
