//! The binary writer.
//!
//! Walks an object graph, assigns per-stream class identifiers in
//! first-use order, emits class definitions inline before the first
//! instance of each class, and encodes field values in the tagged or
//! compact form the schema selects.

use std::any::TypeId;
use std::collections::HashMap;
use std::io;

use super::{SIGNATURE, leb128};
use crate::Options;
use crate::error::{Error, Result};
use crate::meta::{Meta, MetaItem};
use crate::object::PersistObject;
use crate::value::{self, Unknown, UnknownField, ValueType, WireValue};
use crate::wire::Wire;

/// Serializes a value to a [`Vec<u8>`] with default [`Options`].
///
/// # Errors
///
/// Returns `Err` when a schema definition is malformed or the output
/// stream fails.
pub fn to_vec<T: Wire>(value: &T) -> Result<Vec<u8>> {
    BinarySerializer::new(Options::default()).to_vec(value)
}

/// Serializes a value to an [`io::Write`] with default [`Options`].
///
/// # Errors
///
/// See [`to_vec`].
pub fn to_writer<T: Wire>(value: &T, out: &mut dyn io::Write) -> Result<()> {
    BinarySerializer::new(Options::default()).to_writer(value, out)
}

/// A binary serializer with a persistent class-id table.
///
/// Class ids persist across calls, so repeated messages of the same types
/// only pay the definition cost once. The table is scoped to this
/// instance; use [`clear_class_ids`](Self::clear_class_ids) to start an
/// independent numbering space. Not shareable across threads mid-stream:
/// the instance requires `&mut self`.
pub struct BinarySerializer {
    options: Options,
    classes: ClassTable,
}

impl BinarySerializer {
    /// Creates a serializer with the given options.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            classes: ClassTable::default(),
        }
    }

    /// The options this serializer was created with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Forgets all assigned class ids, so the next write starts a fresh
    /// numbering space (e.g. for an independent document).
    pub fn clear_class_ids(&mut self) {
        self.classes.clear();
    }

    /// Serializes a value to a [`Vec<u8>`].
    ///
    /// # Errors
    ///
    /// Returns `Err` when a schema definition is malformed.
    pub fn to_vec<T: Wire>(&mut self, value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_writer(value, &mut buf)?;
        Ok(buf)
    }

    /// Serializes a value to an [`io::Write`].
    ///
    /// # Errors
    ///
    /// Returns `Err` when a schema definition is malformed or the output
    /// stream fails.
    pub fn to_writer<T: Wire>(&mut self, value: &T, out: &mut dyn io::Write) -> Result<()> {
        if self.options.auto_signature {
            out.write_all(&SIGNATURE)?;
        }
        let mut w = BinWriter {
            out,
            options: &self.options,
            classes: &mut self.classes,
        };
        value.bin_write_tagged(&mut w)
    }
}

#[derive(PartialEq, Eq, Hash)]
enum ClassKey {
    /// A local type plus the tags of its retained unknown fields; each
    /// distinct unknown-tag set carries its own definition.
    Type(TypeId, Box<[String]>),
    /// An unknown class, keyed by its wire name and field tags.
    Name(String, Box<[String]>),
}

#[derive(Default)]
pub(crate) struct ClassTable {
    ids: HashMap<ClassKey, i16>,
}

impl ClassTable {
    fn intern(&mut self, key: ClassKey) -> Result<(i16, bool)> {
        if let Some(&id) = self.ids.get(&key) {
            return Ok((id, false));
        }
        let id = i16::try_from(self.ids.len() + 1)
            .map_err(|_| Error::Custom("class id space exhausted".to_owned()))?;
        self.ids.insert(key, id);
        Ok((id, true))
    }

    fn clear(&mut self) {
        self.ids.clear();
    }
}

/// The write half of one serialization call: the output sink plus the
/// serializer's class table and options.
pub struct BinWriter<'a> {
    out: &'a mut dyn io::Write,
    pub(crate) options: &'a Options,
    classes: &'a mut ClassTable,
}

macro_rules! write_le {
    ($($name:ident: $ty:ty),* $(,)?) => {$(
        pub(crate) fn $name(&mut self, v: $ty) -> Result<()> {
            Ok(self.out.write_all(&v.to_le_bytes())?)
        }
    )*};
}

impl BinWriter<'_> {
    /// The options of the owning serializer.
    pub fn options(&self) -> &Options {
        self.options
    }

    write_le! {
        write_u8: u8,
        write_i8: i8,
        write_i16: i16,
        write_u16: u16,
        write_i32: i32,
        write_u32: u32,
        write_i64: i64,
        write_u64: u64,
        write_f32: f32,
        write_f64: f64,
    }

    pub(crate) fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(u8::from(v))
    }

    pub(crate) fn write_char(&mut self, v: char) -> Result<()> {
        self.write_u32(u32::from(v))
    }

    /// Writes a non-null string: LEB128 byte length, UTF-8 bytes, and the
    /// trailing empty-not-null marker when the length is zero.
    pub(crate) fn write_str(&mut self, s: &str) -> Result<()> {
        leb128::write(self.out, s.len() as u64)?;
        if s.is_empty() {
            self.write_bool(false)
        } else {
            Ok(self.out.write_all(s.as_bytes())?)
        }
    }

    pub(crate) fn write_str_opt(&mut self, s: Option<&str>) -> Result<()> {
        match s {
            Some(s) => self.write_str(s),
            None => {
                leb128::write(self.out, 0)?;
                self.write_bool(true)
            }
        }
    }

    /// Writes a sequence or mapping element count.
    pub(crate) fn write_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| Error::Custom("collection too large for the wire".to_owned()))?;
        self.write_i32(count)
    }

    pub(crate) fn write_rough(&mut self, ty: &ValueType) -> Result<()> {
        self.write_u8(ty.code())?;
        match ty {
            ValueType::Nullable(inner) | ValueType::Sequence(inner) => self.write_rough(inner),
            ValueType::Mapping(key, value) => {
                self.write_rough(key)?;
                self.write_rough(value)
            }
            _ => Ok(()),
        }
    }
}

/// One entry of the tag-merged field list of an instance: a declared
/// schema field or a retained unknown field.
enum MergedField<'m> {
    Declared(&'m MetaItem),
    Retained(&'m UnknownField),
}

impl MergedField<'_> {
    fn tag(&self) -> &str {
        match self {
            Self::Declared(item) => item.tag(),
            Self::Retained(field) => &field.tag,
        }
    }

    fn value_type(&self) -> &ValueType {
        match self {
            Self::Declared(item) => &item.value_type,
            Self::Retained(field) => &field.ty,
        }
    }
}

fn merge_fields<'m>(items: &'m [MetaItem], retained: &'m [UnknownField]) -> Vec<MergedField<'m>> {
    let mut merged = Vec::with_capacity(items.len() + retained.len());
    let mut items = items.iter().peekable();
    let mut retained = retained.iter().peekable();
    loop {
        match (items.peek(), retained.peek()) {
            (Some(item), Some(field)) => {
                if item.tag() <= field.tag.as_str() {
                    merged.push(MergedField::Declared(items.next().expect("peeked")));
                } else {
                    merged.push(MergedField::Retained(retained.next().expect("peeked")));
                }
            }
            (Some(_), None) => merged.push(MergedField::Declared(items.next().expect("peeked"))),
            (None, Some(_)) => merged.push(MergedField::Retained(retained.next().expect("peeked"))),
            (None, None) => break,
        }
    }
    merged
}

/// Writes a null object reference: the reserved class id 0.
pub(crate) fn write_null_object(w: &mut BinWriter<'_>) -> Result<()> {
    w.write_i16(0)
}

/// Writes one object: class id, inline definition on first use, then the
/// field body.
pub(crate) fn write_object(obj: &dyn PersistObject, w: &mut BinWriter<'_>) -> Result<()> {
    let Some(desc) = obj.descriptor() else {
        let unknown = obj
            .as_any()
            .downcast_ref::<Unknown>()
            .ok_or_else(|| Error::Custom("object without a descriptor must be Unknown".to_owned()))?;
        return write_unknown(unknown, w);
    };

    let meta = Meta::of(desc, w.options)?;
    meta.run_before_write(obj);

    let retained: &[UnknownField] = match &desc.unknown_storage {
        Some(access) => (access.get)(obj).fields(),
        None => &[],
    };
    let merged = merge_fields(&meta.items, retained);

    let signature: Box<[String]> = retained.iter().map(|f| f.tag.clone()).collect();
    let key = ClassKey::Type((desc.type_id)(), signature);
    let (class_id, is_new) = w.classes.intern(key)?;
    w.write_i16(class_id)?;
    if is_new {
        log::debug!("assigned class id {class_id} to `{}`", desc.name);
        write_class_def(desc.name, &merged, w)?;
    }

    if desc.compact {
        // compact bodies are positional and complete; serialize_if does
        // not apply
        for item in &meta.items {
            (item.desc.bin.write)(obj, w)?;
        }
        return Ok(());
    }

    let mut index: i16 = 0;
    for field in &merged {
        index += 1;
        match field {
            MergedField::Declared(item) => {
                if let Some(condition) = item.desc.serialize_if
                    && !condition(obj)
                {
                    continue;
                }
                w.write_i16(index)?;
                (item.desc.bin.write)(obj, w)?;
            }
            MergedField::Retained(field) => {
                w.write_i16(index)?;
                write_value_as(&field.value, &field.ty, w)?;
            }
        }
    }
    w.write_i16(0)
}

fn write_class_def(name: &str, fields: &[MergedField<'_>], w: &mut BinWriter<'_>) -> Result<()> {
    w.write_str(name)?;
    let count = i16::try_from(fields.len())
        .map_err(|_| Error::Custom("too many fields for the wire".to_owned()))?;
    w.write_i16(count)?;
    for field in fields {
        w.write_str(field.tag())?;
        w.write_rough(field.value_type())?;
    }
    Ok(())
}

/// Re-emits a generically captured class, preserving its definition and
/// body byte-for-byte.
pub(crate) fn write_unknown(unknown: &Unknown, w: &mut BinWriter<'_>) -> Result<()> {
    let signature: Box<[String]> = unknown.fields.iter().map(|f| f.tag.clone()).collect();
    let key = ClassKey::Name(unknown.class_tag.clone(), signature);
    let (class_id, is_new) = w.classes.intern(key)?;
    w.write_i16(class_id)?;
    if is_new {
        log::debug!(
            "assigned class id {class_id} to unknown class `{}`",
            unknown.class_tag
        );
        let merged: Vec<MergedField<'_>> =
            unknown.fields.iter().map(MergedField::Retained).collect();
        write_class_def(&unknown.class_tag, &merged, w)?;
    }

    if unknown.compact {
        for field in &unknown.fields {
            write_value_as(&field.value, &field.ty, w)?;
        }
        return Ok(());
    }

    let mut index: i16 = 0;
    for field in &unknown.fields {
        index += 1;
        w.write_i16(index)?;
        write_value_as(&field.value, &field.ty, w)?;
    }
    w.write_i16(0)
}

/// Writes a value with a leading rough-type tag, as `Any` fields and the
/// top level require.
pub(crate) fn write_value_tagged(value: &WireValue, w: &mut BinWriter<'_>) -> Result<()> {
    let ty = value.value_type();
    w.write_rough(&ty)?;
    if matches!(value, WireValue::Null) {
        // the none tag carries no payload
        return Ok(());
    }
    write_value_as(value, &ty, w)
}

/// Writes a value in the raw form its declared type calls for.
pub(crate) fn write_value_as(
    value: &WireValue,
    ty: &ValueType,
    w: &mut BinWriter<'_>,
) -> Result<()> {
    if *ty == ValueType::Any {
        return write_value_tagged(value, w);
    }
    match (value, ty) {
        (WireValue::SByte(v), ValueType::SByte) => w.write_i8(*v),
        (WireValue::Byte(v), ValueType::Byte) => w.write_u8(*v),
        (WireValue::Short(v), ValueType::Short) => w.write_i16(*v),
        (WireValue::UShort(v), ValueType::UShort) => w.write_u16(*v),
        (WireValue::Int(v), ValueType::Int) => w.write_i32(*v),
        (WireValue::UInt(v), ValueType::UInt) => w.write_u32(*v),
        (WireValue::Long(v), ValueType::Long) => w.write_i64(*v),
        (WireValue::ULong(v), ValueType::ULong) => w.write_u64(*v),
        (WireValue::Bool(v), ValueType::Bool) => w.write_bool(*v),
        (WireValue::Char(v), ValueType::Char) => w.write_char(*v),
        (WireValue::Float(v), ValueType::Float) => w.write_f32(*v),
        (WireValue::Double(v), ValueType::Double) => w.write_f64(*v),
        (WireValue::Date(v), ValueType::Date) => w.write_i64(value::date_to_ticks(*v)),
        (WireValue::TimeSpan(v), ValueType::TimeSpan) => {
            let ticks = value::duration_to_ticks(*v)?;
            w.write_i64(ticks)
        }
        (WireValue::Str(v), ValueType::String) => w.write_str_opt(v.as_deref()),
        (WireValue::Nullable(_, v), ValueType::Nullable(inner)) => match v {
            None => w.write_bool(true),
            Some(v) => {
                w.write_bool(false)?;
                write_value_as(v, inner, w)
            }
        },
        (WireValue::Seq(_, items), ValueType::Sequence(elem)) => match items {
            None => w.write_i32(-1),
            Some(items) => {
                w.write_count(items.len())?;
                for item in items {
                    write_value_as(item, elem, w)?;
                }
                Ok(())
            }
        },
        (WireValue::Map(_, _, entries), ValueType::Mapping(key_ty, value_ty)) => match entries {
            None => w.write_i32(-1),
            Some(entries) => {
                w.write_count(entries.len())?;
                for (key, val) in entries {
                    write_value_as(key, key_ty, w)?;
                    write_value_as(val, value_ty, w)?;
                }
                Ok(())
            }
        },
        (WireValue::Record(None), ValueType::Record) => write_null_object(w),
        (WireValue::Record(Some(unknown)), ValueType::Record) => write_unknown(unknown, w),
        _ => Err(Error::Custom(format!(
            "wire value of type {} cannot be written as {ty}",
            value.value_type()
        ))),
    }
}
