//! The value-level codec seam.
//!
//! [`Wire`] is what the original resolves dynamically per `Type` with its
//! writer/reader caches: how a declared type maps to a rough type and how
//! its values go to and from each format. Rust resolves that at compile
//! time, so the cache becomes a trait — implemented here for primitives
//! and containers, and by the `Persist` derive for records and enums.
//!
//! The `*_opt` hooks exist because nullability is encoded per shape:
//! scalars get a null-flag byte, strings the trailing-bool form,
//! sequences and mappings a −1 count, records the 0 class id. `Option<T>`
//! routes through whatever hooks `T` provides.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value as Json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::binary::de::{self, BinReader};
use crate::binary::ser::{self, BinWriter};
use crate::error::{Error, Result, WireFormatKind};
use crate::json::de::{self as json_de, JsonReader};
use crate::json::ser::{self as json_ser, JsonWriter};
use crate::object::PersistObject;
use crate::value::{self, ValueType, WireValue};

/// Maps a type to its wire representation in both formats.
///
/// Not intended for manual implementation: records and enums get theirs
/// from `#[derive(Persist)]`, everything else is covered here.
pub trait Wire: Sized + 'static {
    /// Whether values can be merged into in place during deserialization.
    const CAN_MERGE: bool = false;

    /// The declared rough type.
    fn value_type() -> ValueType;

    /// Registers record types reachable from this type with the wire-name
    /// registry.
    fn register_types() {}

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()>;

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self>;

    fn bin_merge(&mut self, r: &mut BinReader<'_>) -> Result<()> {
        *self = Self::bin_read(r)?;
        Ok(())
    }

    /// The rough type `Option<Self>` declares.
    fn nullable_value_type() -> ValueType {
        ValueType::Nullable(Box::new(Self::value_type()))
    }

    /// Writes an optional value; the default is the null-flag-byte form.
    fn bin_write_opt(value: Option<&Self>, w: &mut BinWriter<'_>) -> Result<()> {
        match value {
            None => w.write_bool(true),
            Some(v) => {
                w.write_bool(false)?;
                v.bin_write(w)
            }
        }
    }

    fn bin_read_opt(r: &mut BinReader<'_>) -> Result<Option<Self>> {
        if r.read_bool()? {
            Ok(None)
        } else {
            Ok(Some(Self::bin_read(r)?))
        }
    }

    /// Writes the top-level framing: rough type, then the value.
    fn bin_write_tagged(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_rough(&Self::value_type())?;
        self.bin_write(w)
    }

    /// Reads the top-level framing, checking rough-type compatibility.
    fn bin_read_tagged(r: &mut BinReader<'_>) -> Result<Self> {
        check_root_for::<Self>(r)?;
        Self::bin_read(r)
    }

    /// Merges through the top-level framing.
    fn bin_merge_tagged(&mut self, r: &mut BinReader<'_>) -> Result<()> {
        check_root_for::<Self>(r)?;
        self.bin_merge(r)
    }

    fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json>;

    fn json_read(r: &mut JsonReader<'_>, v: &Json) -> Result<Self>;

    fn json_merge(&mut self, r: &mut JsonReader<'_>, v: &Json) -> Result<()> {
        *self = Self::json_read(r, v)?;
        Ok(())
    }

    fn json_write_opt(value: Option<&Self>, w: &mut JsonWriter<'_>) -> Result<Json> {
        match value {
            None => Ok(Json::Null),
            Some(v) => v.json_write(w),
        }
    }

    fn json_read_opt(r: &mut JsonReader<'_>, v: &Json) -> Result<Option<Self>> {
        if v.is_null() {
            Ok(None)
        } else {
            Ok(Some(Self::json_read(r, v)?))
        }
    }

    /// Renders a value as a JSON mapping key.
    ///
    /// # Errors
    ///
    /// The default errors; only primitive key types override it.
    fn json_key(&self) -> Result<String> {
        Err(Error::Custom(
            "this type cannot be a JSON mapping key".to_owned(),
        ))
    }

    /// Parses a value back from a JSON mapping key.
    ///
    /// # Errors
    ///
    /// The default errors; only primitive key types override it.
    fn json_key_parse(_key: &str) -> Result<Self> {
        Err(Error::Custom(
            "this type cannot be a JSON mapping key".to_owned(),
        ))
    }
}

fn check_root_for<T: Wire>(r: &mut BinReader<'_>) -> Result<()> {
    let found = r.read_rough()?;
    if !T::value_type().is_compatible(&found) {
        return Err(Error::wire(
            WireFormatKind::IncompatibleRoot { found },
            r.pos(),
        ));
    }
    Ok(())
}

macro_rules! impl_wire_int {
    ($($ty:ty => $vt:ident, $write:ident, $read:ident);* $(;)?) => {$(
        impl Wire for $ty {
            fn value_type() -> ValueType {
                ValueType::$vt
            }

            fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
                w.$write(*self)
            }

            fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
                r.$read()
            }

            fn json_write(&self, _w: &mut JsonWriter<'_>) -> Result<Json> {
                Ok(Json::from(*self))
            }

            fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
                v.as_i64()
                    .and_then(|n| Self::try_from(n).ok())
                    .ok_or_else(|| Error::json_mismatch(stringify!($ty), v))
            }

            fn json_key(&self) -> Result<String> {
                Ok(self.to_string())
            }

            fn json_key_parse(key: &str) -> Result<Self> {
                key.parse().map_err(|_| Error::JsonMismatch {
                    expected: stringify!($ty).to_owned(),
                    found: format!("key `{key}`"),
                })
            }
        }
    )*};
}

impl_wire_int! {
    i8 => SByte, write_i8, read_i8;
    u8 => Byte, write_u8, read_u8;
    i16 => Short, write_i16, read_i16;
    u16 => UShort, write_u16, read_u16;
    i32 => Int, write_i32, read_i32;
    u32 => UInt, write_u32, read_u32;
}

impl Wire for i64 {
    fn value_type() -> ValueType {
        ValueType::Long
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_i64(*self)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        r.read_i64()
    }

    fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json> {
        if w.json_options().long_as_string {
            Ok(Json::String(self.to_string()))
        } else {
            Ok(Json::from(*self))
        }
    }

    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        match v {
            Json::Number(n) => n.as_i64(),
            Json::String(s) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| Error::json_mismatch("i64", v))
    }

    fn json_key(&self) -> Result<String> {
        Ok(self.to_string())
    }

    fn json_key_parse(key: &str) -> Result<Self> {
        key.parse().map_err(|_| Error::JsonMismatch {
            expected: "i64".to_owned(),
            found: format!("key `{key}`"),
        })
    }
}

impl Wire for u64 {
    fn value_type() -> ValueType {
        ValueType::ULong
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_u64(*self)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        r.read_u64()
    }

    fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json> {
        if w.json_options().long_as_string {
            Ok(Json::String(self.to_string()))
        } else {
            Ok(Json::from(*self))
        }
    }

    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        match v {
            Json::Number(n) => n.as_u64(),
            Json::String(s) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| Error::json_mismatch("u64", v))
    }

    fn json_key(&self) -> Result<String> {
        Ok(self.to_string())
    }

    fn json_key_parse(key: &str) -> Result<Self> {
        key.parse().map_err(|_| Error::JsonMismatch {
            expected: "u64".to_owned(),
            found: format!("key `{key}`"),
        })
    }
}

impl Wire for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_bool(*self)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        r.read_bool()
    }

    fn json_write(&self, _w: &mut JsonWriter<'_>) -> Result<Json> {
        Ok(Json::Bool(*self))
    }

    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        v.as_bool().ok_or_else(|| Error::json_mismatch("bool", v))
    }

    fn json_key(&self) -> Result<String> {
        Ok(self.to_string())
    }

    fn json_key_parse(key: &str) -> Result<Self> {
        match key {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(Error::JsonMismatch {
                expected: "bool".to_owned(),
                found: format!("key `{key}`"),
            }),
        }
    }
}

impl Wire for char {
    fn value_type() -> ValueType {
        ValueType::Char
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_char(*self)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        r.read_char()
    }

    fn json_write(&self, _w: &mut JsonWriter<'_>) -> Result<Json> {
        Ok(Json::String(self.to_string()))
    }

    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        match v.as_str() {
            Some(s) if s.chars().count() == 1 => Ok(s.chars().next().expect("one char")),
            _ => Err(Error::json_mismatch("single-char string", v)),
        }
    }

    fn json_key(&self) -> Result<String> {
        Ok(self.to_string())
    }

    fn json_key_parse(key: &str) -> Result<Self> {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::JsonMismatch {
                expected: "char".to_owned(),
                found: format!("key `{key}`"),
            }),
        }
    }
}

impl Wire for f32 {
    fn value_type() -> ValueType {
        ValueType::Float
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_f32(*self)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        r.read_f32()
    }

    fn json_write(&self, _w: &mut JsonWriter<'_>) -> Result<Json> {
        Ok(Json::from(f64::from(*self)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        v.as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| Error::json_mismatch("f32", v))
    }
}

impl Wire for f64 {
    fn value_type() -> ValueType {
        ValueType::Double
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_f64(*self)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        r.read_f64()
    }

    fn json_write(&self, _w: &mut JsonWriter<'_>) -> Result<Json> {
        Ok(Json::from(*self))
    }

    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        v.as_f64().ok_or_else(|| Error::json_mismatch("f64", v))
    }
}

impl Wire for String {
    fn value_type() -> ValueType {
        ValueType::String
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_str(self)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        r.read_str()
    }

    // a null string is a string on the wire, not a nullable
    fn nullable_value_type() -> ValueType {
        ValueType::String
    }

    fn bin_write_opt(value: Option<&Self>, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_str_opt(value.map(Self::as_str))
    }

    fn bin_read_opt(r: &mut BinReader<'_>) -> Result<Option<Self>> {
        r.read_str_opt()
    }

    fn json_write(&self, _w: &mut JsonWriter<'_>) -> Result<Json> {
        Ok(Json::String(self.clone()))
    }

    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        v.as_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::json_mismatch("string", v))
    }

    fn json_key(&self) -> Result<String> {
        Ok(self.clone())
    }

    fn json_key_parse(key: &str) -> Result<Self> {
        Ok(key.to_owned())
    }
}

impl Wire for OffsetDateTime {
    fn value_type() -> ValueType {
        ValueType::Date
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        w.write_i64(value::date_to_ticks(*self))
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        let ticks = r.read_i64()?;
        value::date_from_ticks(ticks, r.pos())
    }

    fn json_write(&self, _w: &mut JsonWriter<'_>) -> Result<Json> {
        let text = self
            .format(&Rfc3339)
            .map_err(|e| Error::Custom(format!("unformattable date: {e}")))?;
        Ok(Json::String(text))
    }

    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        let Some(text) = v.as_str() else {
            return Err(Error::json_mismatch("RFC 3339 date string", v));
        };
        Self::parse(text, &Rfc3339).map_err(|_| Error::json_mismatch("RFC 3339 date string", v))
    }
}

impl Wire for time::Duration {
    fn value_type() -> ValueType {
        ValueType::TimeSpan
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        let ticks = value::duration_to_ticks(*self)?;
        w.write_i64(ticks)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        Ok(value::duration_from_ticks(r.read_i64()?))
    }

    fn json_write(&self, _w: &mut JsonWriter<'_>) -> Result<Json> {
        Ok(Json::from(value::duration_to_ticks(*self)?))
    }

    fn json_read(_r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        v.as_i64()
            .map(value::duration_from_ticks)
            .ok_or_else(|| Error::json_mismatch("tick count", v))
    }
}

impl<T: Wire> Wire for Option<T> {
    fn value_type() -> ValueType {
        T::nullable_value_type()
    }

    fn register_types() {
        T::register_types();
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        T::bin_write_opt(self.as_ref(), w)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        T::bin_read_opt(r)
    }

    fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json> {
        T::json_write_opt(self.as_ref(), w)
    }

    fn json_read(r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        T::json_read_opt(r, v)
    }
}

impl<T: Wire> Wire for Box<T> {
    const CAN_MERGE: bool = T::CAN_MERGE;

    fn value_type() -> ValueType {
        T::value_type()
    }

    fn register_types() {
        T::register_types();
    }

    fn nullable_value_type() -> ValueType {
        T::nullable_value_type()
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        (**self).bin_write(w)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        T::bin_read(r).map(Box::new)
    }

    fn bin_merge(&mut self, r: &mut BinReader<'_>) -> Result<()> {
        (**self).bin_merge(r)
    }

    fn bin_write_opt(value: Option<&Self>, w: &mut BinWriter<'_>) -> Result<()> {
        T::bin_write_opt(value.map(|v| &**v), w)
    }

    fn bin_read_opt(r: &mut BinReader<'_>) -> Result<Option<Self>> {
        Ok(T::bin_read_opt(r)?.map(Box::new))
    }

    fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json> {
        (**self).json_write(w)
    }

    fn json_read(r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        T::json_read(r, v).map(Box::new)
    }

    fn json_merge(&mut self, r: &mut JsonReader<'_>, v: &Json) -> Result<()> {
        (**self).json_merge(r, v)
    }
}

macro_rules! impl_wire_seq {
    ($($ty:ident $(: $bound0:ident $(+ $boundn:ident)*)?);* $(;)?) => {$(
        impl<T: Wire $(+ $bound0 $(+ $boundn)*)?> Wire for $ty<T> {
            const CAN_MERGE: bool = true;

            fn value_type() -> ValueType {
                ValueType::Sequence(Box::new(T::value_type()))
            }

            fn register_types() {
                T::register_types();
            }

            fn nullable_value_type() -> ValueType {
                Self::value_type()
            }

            fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
                w.write_count(self.len())?;
                for item in self {
                    item.bin_write(w)?;
                }
                Ok(())
            }

            fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
                match Self::bin_read_opt(r)? {
                    None => Err(Error::wire(WireFormatKind::UnexpectedNull, r.pos())),
                    Some(out) => Ok(out),
                }
            }

            fn bin_merge(&mut self, r: &mut BinReader<'_>) -> Result<()> {
                match r.read_count()? {
                    None => Err(Error::wire(WireFormatKind::UnexpectedNull, r.pos())),
                    Some(count) => {
                        for _ in 0..count {
                            self.extend([T::bin_read(r)?]);
                        }
                        Ok(())
                    }
                }
            }

            fn bin_write_opt(value: Option<&Self>, w: &mut BinWriter<'_>) -> Result<()> {
                match value {
                    None => w.write_i32(-1),
                    Some(v) => v.bin_write(w),
                }
            }

            fn bin_read_opt(r: &mut BinReader<'_>) -> Result<Option<Self>> {
                match r.read_count()? {
                    None => Ok(None),
                    Some(count) => {
                        let mut out = Self::default();
                        for _ in 0..count {
                            out.extend([T::bin_read(r)?]);
                        }
                        Ok(Some(out))
                    }
                }
            }

            fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json> {
                w.clear_forced_compact();
                w.clear_root();
                let mut items = Vec::with_capacity(self.len());
                for item in self {
                    items.push(item.json_write(w)?);
                }
                Ok(Json::Array(items))
            }

            fn json_read(r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
                let Some(items) = v.as_array() else {
                    return Err(Error::json_mismatch("array", v));
                };
                let mut out = Self::default();
                for item in items {
                    out.extend([T::json_read(r, item)?]);
                }
                Ok(out)
            }

            fn json_merge(&mut self, r: &mut JsonReader<'_>, v: &Json) -> Result<()> {
                let Some(items) = v.as_array() else {
                    return Err(Error::json_mismatch("array", v));
                };
                for item in items {
                    self.extend([T::json_read(r, item)?]);
                }
                Ok(())
            }
        }
    )*};
}

impl_wire_seq! {
    Vec;
    HashSet: Eq + Hash;
    BTreeSet: Ord;
    IndexSet: Eq + Hash;
}

macro_rules! impl_wire_map {
    ($($ty:ident: $bound0:ident $(+ $boundn:ident)*);* $(;)?) => {$(
        impl<K: Wire + $bound0 $(+ $boundn)*, V: Wire> Wire for $ty<K, V> {
            const CAN_MERGE: bool = true;

            fn value_type() -> ValueType {
                ValueType::Mapping(Box::new(K::value_type()), Box::new(V::value_type()))
            }

            fn register_types() {
                K::register_types();
                V::register_types();
            }

            fn nullable_value_type() -> ValueType {
                Self::value_type()
            }

            fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
                w.write_count(self.len())?;
                for (key, value) in self {
                    key.bin_write(w)?;
                    value.bin_write(w)?;
                }
                Ok(())
            }

            fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
                match Self::bin_read_opt(r)? {
                    None => Err(Error::wire(WireFormatKind::UnexpectedNull, r.pos())),
                    Some(out) => Ok(out),
                }
            }

            fn bin_merge(&mut self, r: &mut BinReader<'_>) -> Result<()> {
                match r.read_count()? {
                    None => Err(Error::wire(WireFormatKind::UnexpectedNull, r.pos())),
                    Some(count) => {
                        for _ in 0..count {
                            let key = K::bin_read(r)?;
                            let value = V::bin_read(r)?;
                            self.insert(key, value);
                        }
                        Ok(())
                    }
                }
            }

            fn bin_write_opt(value: Option<&Self>, w: &mut BinWriter<'_>) -> Result<()> {
                match value {
                    None => w.write_i32(-1),
                    Some(v) => v.bin_write(w),
                }
            }

            fn bin_read_opt(r: &mut BinReader<'_>) -> Result<Option<Self>> {
                match r.read_count()? {
                    None => Ok(None),
                    Some(count) => {
                        let mut out = Self::default();
                        for _ in 0..count {
                            let key = K::bin_read(r)?;
                            let value = V::bin_read(r)?;
                            out.insert(key, value);
                        }
                        Ok(Some(out))
                    }
                }
            }

            fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json> {
                w.clear_forced_compact();
                w.clear_root();
                let mut map = serde_json::Map::new();
                for (key, value) in self {
                    map.insert(key.json_key()?, value.json_write(w)?);
                }
                Ok(Json::Object(map))
            }

            fn json_read(r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
                let Some(map) = v.as_object() else {
                    return Err(Error::json_mismatch("object", v));
                };
                let mut out = Self::default();
                for (key, value) in map {
                    out.insert(K::json_key_parse(key)?, V::json_read(r, value)?);
                }
                Ok(out)
            }

            fn json_merge(&mut self, r: &mut JsonReader<'_>, v: &Json) -> Result<()> {
                let Some(map) = v.as_object() else {
                    return Err(Error::json_mismatch("object", v));
                };
                for (key, value) in map {
                    self.insert(K::json_key_parse(key)?, V::json_read(r, value)?);
                }
                Ok(())
            }
        }
    )*};
}

impl_wire_map! {
    HashMap: Eq + Hash;
    BTreeMap: Ord;
    IndexMap: Eq + Hash;
}

impl Wire for Box<dyn PersistObject> {
    const CAN_MERGE: bool = true;

    fn value_type() -> ValueType {
        ValueType::Record
    }

    fn nullable_value_type() -> ValueType {
        ValueType::Record
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        ser::write_object(&**self, w)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        de::read_object_dyn(r)?.ok_or_else(|| Error::wire(WireFormatKind::UnexpectedNull, r.pos()))
    }

    fn bin_merge(&mut self, r: &mut BinReader<'_>) -> Result<()> {
        de::merge_object_dyn(&mut **self, r)
    }

    fn bin_write_opt(value: Option<&Self>, w: &mut BinWriter<'_>) -> Result<()> {
        match value {
            None => ser::write_null_object(w),
            Some(v) => v.bin_write(w),
        }
    }

    fn bin_read_opt(r: &mut BinReader<'_>) -> Result<Option<Self>> {
        de::read_object_dyn(r)
    }

    fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json> {
        // always class-tagged: the declared type says nothing concrete
        json_ser::write_object_json(&**self, w, true)
    }

    fn json_read(r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        json_de::read_object_json_dyn(r, v)?
            .ok_or_else(|| Error::json_mismatch("class-tagged object", v))
    }
}

impl Wire for WireValue {
    fn value_type() -> ValueType {
        ValueType::Any
    }

    fn bin_write(&self, w: &mut BinWriter<'_>) -> Result<()> {
        ser::write_value_tagged(self, w)
    }

    fn bin_read(r: &mut BinReader<'_>) -> Result<Self> {
        de::read_value_tagged(r)
    }

    // the value carries its own rough type; top-level framing is the same
    fn bin_write_tagged(&self, w: &mut BinWriter<'_>) -> Result<()> {
        self.bin_write(w)
    }

    fn bin_read_tagged(r: &mut BinReader<'_>) -> Result<Self> {
        Self::bin_read(r)
    }

    fn bin_merge_tagged(&mut self, r: &mut BinReader<'_>) -> Result<()> {
        self.bin_merge(r)
    }

    fn json_write(&self, w: &mut JsonWriter<'_>) -> Result<Json> {
        json_ser::wire_value_to_json(self, w)
    }

    fn json_read(r: &mut JsonReader<'_>, v: &Json) -> Result<Self> {
        Ok(json_de::wire_value_from_json(v, r))
    }
}
