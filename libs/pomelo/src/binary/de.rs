//! The binary reader.
//!
//! Resolves incoming class ids to locally known types and builds, per
//! class, a slot list out of a sorted merge-join between the persisted
//! field descriptors and the local schema: assign, merge-into, keep as
//! unknown, or discard. Classes whose names do not resolve are captured
//! generically as [`Unknown`] so their data survives a round trip.

use std::any::TypeId;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use super::read::{IoSource, SliceSource, Source, read_array};
use super::{SIGNATURE, leb128};
use crate::error::{Error, Result, SchemaMismatchKind, WireFormatKind};
use crate::meta::{Meta, TypeDesc};
use crate::object::{Persist, PersistObject};
use crate::value::{self, Unknown, UnknownField, ValueType, WireValue, code};
use crate::wire::Wire;
use crate::{Options, registry};

/// Deserializes a value from a byte slice with default [`Options`].
///
/// The slice must be fully consumed.
///
/// # Errors
///
/// Returns `Err` on malformed streams, schema mismatches, and trailing
/// bytes.
pub fn from_slice<T: Wire>(buf: &[u8]) -> Result<T> {
    BinaryDeserializer::new(Options::default()).from_slice(buf)
}

/// Deserializes a value from an [`io::Read`] with default [`Options`].
///
/// The reader may still have bytes available when this returns.
///
/// # Errors
///
/// See [`from_slice`].
pub fn from_reader<T: Wire>(reader: &mut dyn io::Read) -> Result<T> {
    BinaryDeserializer::new(Options::default()).from_reader(reader)
}

/// Deserializes from a byte slice into an existing instance, merging
/// in place, with default [`Options`].
///
/// # Errors
///
/// See [`from_slice`].
pub fn from_slice_into<T: Wire>(buf: &[u8], into: &mut T) -> Result<()> {
    BinaryDeserializer::new(Options::default()).from_slice_into(buf, into)
}

/// Decodes a byte slice generically, without a local type.
///
/// # Errors
///
/// See [`from_slice`].
pub fn from_slice_value(buf: &[u8]) -> Result<WireValue> {
    BinaryDeserializer::new(Options::default()).from_slice_value(buf)
}

/// A binary deserializer with a persistent class-definition table.
///
/// The table is indexed by the class ids assigned by whichever writer
/// produced the stream, so one deserializer instance must only be fed
/// streams from one writer numbering space; use
/// [`clear_class_ids`](Self::clear_class_ids) between independent
/// documents.
pub struct BinaryDeserializer {
    options: Options,
    defs: Vec<Arc<ReaderClassDef>>,
    local: HashMap<&'static str, &'static TypeDesc>,
}

impl BinaryDeserializer {
    /// Creates a deserializer with the given options.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            // index 0 is the reserved null id and never looked up
            defs: vec![Arc::new(ReaderClassDef::null())],
            local: HashMap::new(),
        }
    }

    /// The options this deserializer was created with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Registers `T` for name resolution local to this deserializer,
    /// taking precedence over the process-wide registry.
    pub fn register<T: Persist + Wire>(&mut self) {
        T::register_types();
        self.local.insert(<T as Persist>::descriptor().name, <T as Persist>::descriptor());
    }

    /// Forgets all incoming class definitions, so the next read accepts
    /// a fresh numbering space.
    pub fn clear_class_ids(&mut self) {
        self.defs.truncate(1);
    }

    /// Deserializes a value from a byte slice.
    ///
    /// The slice must be fully consumed.
    ///
    /// # Errors
    ///
    /// Returns `Err` on malformed streams, schema mismatches, and
    /// trailing bytes.
    pub fn from_slice<T: Wire>(&mut self, buf: &[u8]) -> Result<T> {
        T::register_types();
        let mut src = SliceSource::new(buf);
        let value = self.read_root::<T>(&mut src)?;
        if src.remaining() != 0 {
            return Err(Error::wire(WireFormatKind::TrailingBytes, src.position()));
        }
        Ok(value)
    }

    /// Deserializes a value from an [`io::Read`].
    ///
    /// # Errors
    ///
    /// See [`Self::from_slice`].
    pub fn from_reader<T: Wire>(&mut self, reader: &mut dyn io::Read) -> Result<T> {
        T::register_types();
        let mut src = IoSource::new(reader);
        self.read_root::<T>(&mut src)
    }

    /// Deserializes from a byte slice into an existing instance,
    /// merging in place.
    ///
    /// # Errors
    ///
    /// See [`Self::from_slice`].
    pub fn from_slice_into<T: Wire>(&mut self, buf: &[u8], into: &mut T) -> Result<()> {
        T::register_types();
        let mut src = SliceSource::new(buf);
        {
            let mut r = BinReader {
                src: &mut src,
                options: &self.options,
                defs: &mut self.defs,
                local: &self.local,
            };
            r.check_signature()?;
            into.bin_merge_tagged(&mut r)?;
        }
        if src.remaining() != 0 {
            return Err(Error::wire(WireFormatKind::TrailingBytes, src.position()));
        }
        Ok(())
    }

    /// Decodes a byte slice generically, without a local type.
    ///
    /// # Errors
    ///
    /// See [`Self::from_slice`].
    pub fn from_slice_value(&mut self, buf: &[u8]) -> Result<WireValue> {
        self.from_slice::<WireValue>(buf)
    }

    fn read_root<T: Wire>(&mut self, src: &mut dyn Source) -> Result<T> {
        let mut r = BinReader {
            src,
            options: &self.options,
            defs: &mut self.defs,
            local: &self.local,
        };
        r.check_signature()?;
        T::bin_read_tagged(&mut r)
    }
}

/// The read half of one deserialization call: the byte source plus the
/// deserializer's class-definition table and options.
pub struct BinReader<'a> {
    src: &'a mut dyn Source,
    pub(crate) options: &'a Options,
    defs: &'a mut Vec<Arc<ReaderClassDef>>,
    local: &'a HashMap<&'static str, &'static TypeDesc>,
}

macro_rules! read_le {
    ($($name:ident: $ty:ty),* $(,)?) => {$(
        pub(crate) fn $name(&mut self) -> Result<$ty> {
            Ok(<$ty>::from_le_bytes(read_array(self.src)?))
        }
    )*};
}

impl BinReader<'_> {
    read_le! {
        read_u8: u8,
        read_i8: i8,
        read_i16: i16,
        read_u16: u16,
        read_i32: i32,
        read_u32: u32,
        read_i64: i64,
        read_u64: u64,
        read_f32: f32,
        read_f64: f64,
    }

    /// The options of the owning deserializer.
    pub fn options(&self) -> &Options {
        self.options
    }

    /// The number of bytes consumed so far.
    pub fn pos(&self) -> u64 {
        self.src.position()
    }

    fn check_signature(&mut self) -> Result<()> {
        if self.options.auto_signature {
            let sig: [u8; 4] = read_array(self.src)?;
            if sig != SIGNATURE {
                return Err(Error::wire(WireFormatKind::SignatureMismatch, 0));
            }
        }
        Ok(())
    }

    pub(crate) fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::wire(WireFormatKind::InvalidBool, self.pos())),
        }
    }

    pub(crate) fn read_char(&mut self) -> Result<char> {
        let code = self.read_u32()?;
        char::from_u32(code).ok_or_else(|| Error::wire(WireFormatKind::InvalidChar, self.pos()))
    }

    /// Reads a string, `None` being the wire-level null string.
    pub(crate) fn read_str_opt(&mut self) -> Result<Option<String>> {
        let len = leb128::read(self.src)?;
        let len = usize::try_from(len)
            .map_err(|_| Error::wire(WireFormatKind::LengthOverflow, self.pos()))?;
        if len == 0 {
            return if self.read_bool()? {
                Ok(None)
            } else {
                Ok(Some(String::new()))
            };
        }
        let mut buf = vec![0u8; len];
        self.src.read_exact(&mut buf)?;
        let text = String::from_utf8(buf)
            .map_err(|_| Error::wire(WireFormatKind::InvalidUtf8, self.pos()))?;
        Ok(Some(text))
    }

    pub(crate) fn read_str(&mut self) -> Result<String> {
        self.read_str_opt()?
            .ok_or_else(|| Error::wire(WireFormatKind::UnexpectedNull, self.pos()))
    }

    /// Reads a sequence or mapping count; `None` is the null marker.
    pub(crate) fn read_count(&mut self) -> Result<Option<usize>> {
        match self.read_i32()? {
            -1 => Ok(None),
            count => usize::try_from(count)
                .map(Some)
                .map_err(|_| Error::wire(WireFormatKind::InvalidCount(count), self.pos())),
        }
    }

    pub(crate) fn read_rough(&mut self) -> Result<ValueType> {
        let code = self.read_u8()?;
        Ok(match code {
            code::NONE => ValueType::None,
            code::SBYTE => ValueType::SByte,
            code::BYTE => ValueType::Byte,
            code::SHORT => ValueType::Short,
            code::USHORT => ValueType::UShort,
            code::INT => ValueType::Int,
            code::UINT => ValueType::UInt,
            code::LONG => ValueType::Long,
            code::ULONG => ValueType::ULong,
            code::BOOL => ValueType::Bool,
            code::CHAR => ValueType::Char,
            code::FLOAT => ValueType::Float,
            code::DOUBLE => ValueType::Double,
            code::DECIMAL => {
                return Err(Error::wire(WireFormatKind::UnsupportedDecimal, self.pos()));
            }
            code::DATE => ValueType::Date,
            code::TIME_SPAN => ValueType::TimeSpan,
            code::STRING => ValueType::String,
            code::ANY => ValueType::Any,
            code::NULLABLE => ValueType::Nullable(Box::new(self.read_rough()?)),
            code::SEQUENCE => ValueType::Sequence(Box::new(self.read_rough()?)),
            code::MAPPING => {
                let key = self.read_rough()?;
                let value = self.read_rough()?;
                ValueType::Mapping(Box::new(key), Box::new(value))
            }
            code::RECORD => ValueType::Record,
            other => return Err(Error::wire(WireFormatKind::BadRoughType(other), self.pos())),
        })
    }

    fn resolve(&self, name: &str) -> Option<&'static TypeDesc> {
        self.local
            .get(name)
            .copied()
            .or_else(|| registry::resolve(name))
    }
}

/// One persisted field descriptor from an incoming class definition.
pub(crate) struct TheirField {
    tag: String,
    ty: ValueType,
}

/// How one persisted field maps onto the local schema.
enum Slot {
    /// Decode and assign through the local field's setter.
    Assign(usize),
    /// Decode into the existing value in place.
    MergeInto(usize),
    /// Decode generically into the instance's unknown storage.
    Keep,
    /// Decode generically and drop.
    Discard,
}

enum DefKind {
    Known { meta: Arc<Meta>, slots: Vec<Slot> },
    Unknown { class_tag: String },
}

/// A resolved incoming class definition, cached per class id.
pub(crate) struct ReaderClassDef {
    their: Vec<TheirField>,
    compact: bool,
    kind: DefKind,
}

impl ReaderClassDef {
    fn null() -> Self {
        Self {
            their: Vec::new(),
            compact: false,
            kind: DefKind::Unknown {
                class_tag: String::new(),
            },
        }
    }
}

fn class_def(r: &mut BinReader<'_>, class_id: i16) -> Result<Arc<ReaderClassDef>> {
    let index = usize::try_from(class_id)
        .map_err(|_| Error::wire(WireFormatKind::BadClassId(class_id), r.pos()))?;
    if index < r.defs.len() {
        return Ok(Arc::clone(&r.defs[index]));
    }
    if index > r.defs.len() {
        return Err(Error::wire(WireFormatKind::BadClassId(class_id), r.pos()));
    }

    let def = Arc::new(build_def(r)?);
    r.defs.push(Arc::clone(&def));
    Ok(def)
}

fn build_def(r: &mut BinReader<'_>) -> Result<ReaderClassDef> {
    let name = r.read_str()?;
    let count = r.read_i16()?;
    let count = usize::try_from(count)
        .map_err(|_| Error::wire(WireFormatKind::InvalidCount(i32::from(count)), r.pos()))?;

    let Some(desc) = r.resolve(&name) else {
        log::debug!("class `{name}` is not locally resolvable; capturing generically");
        let mut their = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = r.read_str()?;
            let ty = r.read_rough()?;
            their.push(TheirField { tag, ty });
        }
        return Ok(ReaderClassDef {
            their,
            compact: false,
            kind: DefKind::Unknown { class_tag: name },
        });
    };

    let meta = Meta::of(desc, r.options)?;
    log::trace!("binding class `{name}` with {count} persisted fields");
    let mut slots = Vec::with_capacity(count);
    let mut their = Vec::with_capacity(count);
    let mut our = 0usize;

    for _ in 0..count {
        let tag = r.read_str()?;
        while our < meta.items.len() && meta.items[our].tag() < tag.as_str() {
            // local field absent from the stream
            if meta.items[our].desc.required {
                return Err(Error::mismatch(
                    name.as_str(),
                    meta.items[our].tag().to_owned(),
                    SchemaMismatchKind::MissingRequired,
                ));
            }
            our += 1;
        }

        let ty = r.read_rough()?;
        if our < meta.items.len() && meta.items[our].tag() == tag {
            let item = &meta.items[our];
            if !item.value_type.is_compatible(&ty) {
                return Err(Error::mismatch(
                    name.as_str(),
                    tag,
                    SchemaMismatchKind::IncompatibleType {
                        expected: item.value_type.clone(),
                        found: ty,
                    },
                ));
            }
            slots.push(if item.desc.merge {
                Slot::MergeInto(our)
            } else {
                Slot::Assign(our)
            });
            our += 1;
        } else {
            // the stream has a field the local schema does not declare
            let slot = if desc.unknown_storage.is_some() {
                log::trace!("retaining unknown field `{tag}` of `{name}`");
                Slot::Keep
            } else if r.options.allow_unknown_fields {
                log::debug!("discarding unknown field `{tag}` of `{name}`");
                Slot::Discard
            } else {
                return Err(Error::mismatch(name.as_str(), tag, SchemaMismatchKind::UnknownField));
            };
            slots.push(slot);
        }
        their.push(TheirField { tag, ty });
    }

    for item in &meta.items[our..] {
        if item.desc.required {
            return Err(Error::mismatch(
                name.as_str(),
                item.tag().to_owned(),
                SchemaMismatchKind::MissingRequired,
            ));
        }
    }

    Ok(ReaderClassDef {
        their,
        compact: desc.compact,
        kind: DefKind::Known { meta, slots },
    })
}

fn apply_slot(
    obj: &mut dyn PersistObject,
    meta: &Meta,
    their: &TheirField,
    slot: &Slot,
    r: &mut BinReader<'_>,
) -> Result<()> {
    match slot {
        Slot::Assign(index) => (meta.items[*index].desc.bin.read)(obj, r),
        Slot::MergeInto(index) => (meta.items[*index].desc.bin.merge)(obj, r),
        Slot::Keep => {
            let value = read_value_as(&their.ty, r)?;
            let Some(access) = &meta.desc.unknown_storage else {
                return Err(Error::Custom(
                    "keep slot on a type without unknown storage".to_owned(),
                ));
            };
            (access.get_mut)(obj).add(their.tag.clone(), their.ty.clone(), value);
            Ok(())
        }
        Slot::Discard => {
            read_value_as(&their.ty, r)?;
            Ok(())
        }
    }
}

fn apply_fields(obj: &mut dyn PersistObject, def: &ReaderClassDef, r: &mut BinReader<'_>) -> Result<()> {
    let DefKind::Known { meta, slots } = &def.kind else {
        return Err(Error::Custom(
            "cannot apply fields through an unknown class definition".to_owned(),
        ));
    };

    if def.compact {
        for (slot, their) in slots.iter().zip(&def.their) {
            apply_slot(obj, meta, their, slot, r)?;
        }
    } else {
        let mut next = r.read_i16()?;
        for i in 1..=slots.len() {
            let slot = &slots[i - 1];
            // the field count was read as i16, so every index fits
            #[allow(clippy::cast_possible_truncation)]
            let expected = i as i16;
            if next == expected {
                apply_slot(obj, meta, &def.their[i - 1], slot, r)?;
                next = r.read_i16()?;
            } else if let Slot::Assign(index) | Slot::MergeInto(index) = slot
                && meta.items[*index].desc.required
            {
                // the writer omitted a field we cannot do without
                return Err(Error::mismatch(
                    meta.desc.name,
                    meta.items[*index].tag().to_owned(),
                    SchemaMismatchKind::MissingRequired,
                ));
            }
        }
        if next != 0 {
            return Err(Error::wire(WireFormatKind::UnfinishedObject(next), r.pos()));
        }
    }

    meta.run_after_read(obj);
    Ok(())
}

/// Reads an object of unconstrained class; `None` is the null id.
pub(crate) fn read_object_dyn(r: &mut BinReader<'_>) -> Result<Option<Box<dyn PersistObject>>> {
    let class_id = r.read_i16()?;
    if class_id == 0 {
        return Ok(None);
    }
    let def = class_def(r, class_id)?;
    match &def.kind {
        DefKind::Known { meta, .. } => {
            let mut obj = (meta.desc.factory)();
            apply_fields(&mut *obj, &def, r)?;
            Ok(Some(obj))
        }
        DefKind::Unknown { .. } => {
            let unknown = read_unknown_body(&def, r)?;
            Ok(Some(Box::new(unknown)))
        }
    }
}

fn read_concrete_def<T: Persist>(
    r: &mut BinReader<'_>,
    def: &ReaderClassDef,
) -> Result<T> {
    match &def.kind {
        DefKind::Known { meta, .. } if (meta.desc.type_id)() == TypeId::of::<T>() => {
            let mut obj = T::default();
            apply_fields(&mut obj, def, r)?;
            Ok(obj)
        }
        DefKind::Known { meta, .. } => Err(wrong_class(<T as Persist>::descriptor().name, meta.desc.name)),
        DefKind::Unknown { class_tag } => Err(wrong_class(<T as Persist>::descriptor().name, class_tag)),
    }
}

/// Reads an object that must be of class `T`.
pub(crate) fn read_object_concrete<T: Persist>(r: &mut BinReader<'_>) -> Result<T> {
    let class_id = r.read_i16()?;
    if class_id == 0 {
        return Err(Error::wire(WireFormatKind::UnexpectedNull, r.pos()));
    }
    let def = class_def(r, class_id)?;
    read_concrete_def(r, &def)
}

/// Reads an object of class `T` or the null id.
pub(crate) fn read_object_concrete_opt<T: Persist>(r: &mut BinReader<'_>) -> Result<Option<T>> {
    let class_id = r.read_i16()?;
    if class_id == 0 {
        return Ok(None);
    }
    let def = class_def(r, class_id)?;
    read_concrete_def(r, &def).map(Some)
}

/// Reads an object of class `T` into an existing instance.
pub(crate) fn merge_object_concrete<T: Persist>(obj: &mut T, r: &mut BinReader<'_>) -> Result<()> {
    merge_object_dyn(obj, r)
}

/// Reads an object into an existing instance of the same class.
pub(crate) fn merge_object_dyn(obj: &mut dyn PersistObject, r: &mut BinReader<'_>) -> Result<()> {
    let Some(desc) = obj.descriptor() else {
        return Err(Error::Custom(
            "cannot merge into a generically captured object".to_owned(),
        ));
    };
    let class_id = r.read_i16()?;
    if class_id == 0 {
        return Err(Error::wire(WireFormatKind::UnexpectedNull, r.pos()));
    }
    let def = class_def(r, class_id)?;
    match &def.kind {
        DefKind::Known { meta, .. } if (meta.desc.type_id)() == (desc.type_id)() => {
            apply_fields(obj, &def, r)
        }
        DefKind::Known { meta, .. } => Err(wrong_class(desc.name, meta.desc.name)),
        DefKind::Unknown { class_tag } => Err(wrong_class(desc.name, class_tag)),
    }
}

fn wrong_class(expected: &str, found: &str) -> Error {
    Error::mismatch(
        expected,
        "<value>",
        SchemaMismatchKind::WrongClass {
            expected: expected.to_owned(),
            found: found.to_owned(),
        },
    )
}

fn read_unknown_body(def: &ReaderClassDef, r: &mut BinReader<'_>) -> Result<Unknown> {
    let class_tag = match &def.kind {
        DefKind::Known { meta, .. } => meta.desc.name.to_owned(),
        DefKind::Unknown { class_tag } => class_tag.clone(),
    };

    let mut fields = Vec::with_capacity(def.their.len());
    if def.compact {
        for their in &def.their {
            fields.push(UnknownField {
                tag: their.tag.clone(),
                ty: their.ty.clone(),
                value: read_value_as(&their.ty, r)?,
            });
        }
    } else {
        let mut next = r.read_i16()?;
        for i in 1..=def.their.len() {
            // the field count was read as i16, so every index fits
            #[allow(clippy::cast_possible_truncation)]
            let expected = i as i16;
            if next == expected {
                let their = &def.their[i - 1];
                fields.push(UnknownField {
                    tag: their.tag.clone(),
                    ty: their.ty.clone(),
                    value: read_value_as(&their.ty, r)?,
                });
                next = r.read_i16()?;
            }
        }
        if next != 0 {
            return Err(Error::wire(WireFormatKind::UnfinishedObject(next), r.pos()));
        }
    }

    Ok(Unknown {
        class_tag,
        compact: def.compact,
        fields,
    })
}

/// Reads a record generically; `None` is the null id.
pub(crate) fn read_unknown_object(r: &mut BinReader<'_>) -> Result<Option<Unknown>> {
    let class_id = r.read_i16()?;
    if class_id == 0 {
        return Ok(None);
    }
    let def = class_def(r, class_id)?;
    read_unknown_body(&def, r).map(Some)
}

/// Reads a rough-tagged value, as `Any` fields and the top level carry.
pub(crate) fn read_value_tagged(r: &mut BinReader<'_>) -> Result<WireValue> {
    let ty = r.read_rough()?;
    if ty == ValueType::None {
        return Ok(WireValue::Null);
    }
    read_value_as(&ty, r)
}

/// Reads a raw value of the given declared shape.
pub(crate) fn read_value_as(ty: &ValueType, r: &mut BinReader<'_>) -> Result<WireValue> {
    Ok(match ty {
        ValueType::None => return Err(Error::wire(WireFormatKind::BadRoughType(0), r.pos())),
        ValueType::SByte => WireValue::SByte(r.read_i8()?),
        ValueType::Byte => WireValue::Byte(r.read_u8()?),
        ValueType::Short => WireValue::Short(r.read_i16()?),
        ValueType::UShort => WireValue::UShort(r.read_u16()?),
        ValueType::Int => WireValue::Int(r.read_i32()?),
        ValueType::UInt => WireValue::UInt(r.read_u32()?),
        ValueType::Long => WireValue::Long(r.read_i64()?),
        ValueType::ULong => WireValue::ULong(r.read_u64()?),
        ValueType::Bool => WireValue::Bool(r.read_bool()?),
        ValueType::Char => WireValue::Char(r.read_char()?),
        ValueType::Float => WireValue::Float(r.read_f32()?),
        ValueType::Double => WireValue::Double(r.read_f64()?),
        ValueType::Date => {
            let ticks = r.read_i64()?;
            WireValue::Date(value::date_from_ticks(ticks, r.pos())?)
        }
        ValueType::TimeSpan => WireValue::TimeSpan(value::duration_from_ticks(r.read_i64()?)),
        ValueType::String => WireValue::Str(r.read_str_opt()?),
        ValueType::Any => read_value_tagged(r)?,
        ValueType::Nullable(inner) => {
            if r.read_bool()? {
                WireValue::Nullable((**inner).clone(), None)
            } else {
                let value = read_value_as(inner, r)?;
                WireValue::Nullable((**inner).clone(), Some(Box::new(value)))
            }
        }
        ValueType::Sequence(elem) => match r.read_count()? {
            None => WireValue::Seq((**elem).clone(), None),
            Some(count) => {
                let mut items = Vec::new();
                for _ in 0..count {
                    items.push(read_value_as(elem, r)?);
                }
                WireValue::Seq((**elem).clone(), Some(items))
            }
        },
        ValueType::Mapping(key_ty, value_ty) => match r.read_count()? {
            None => WireValue::Map((**key_ty).clone(), (**value_ty).clone(), None),
            Some(count) => {
                let mut entries = Vec::new();
                for _ in 0..count {
                    let key = read_value_as(key_ty, r)?;
                    let value = read_value_as(value_ty, r)?;
                    entries.push((key, value));
                }
                WireValue::Map((**key_ty).clone(), (**value_ty).clone(), Some(entries))
            }
        },
        ValueType::Record => WireValue::Record(read_unknown_object(r)?.map(Box::new)),
    })
}
