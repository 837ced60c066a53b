//! The JSON reader.
//!
//! Works over a parsed [`serde_json::Value`] tree, so field order in the
//! text does not matter; the schema contract (required fields, unknown
//! fields, hooks) is the same merge the binary reader performs, driven
//! by tag lookup instead of a sorted join.

use std::collections::HashMap;
use std::io;

use serde_json::Value as Json;

use super::JsonOptions;
use crate::error::{Error, Result, SchemaMismatchKind};
use crate::meta::{Meta, TypeDesc};
use crate::object::{Persist, PersistObject};
use crate::value::{Unknown, UnknownField, WireValue};
use crate::wire::Wire;
use crate::{Options, registry};

/// Deserializes a value from JSON text with default options.
///
/// # Errors
///
/// Returns `Err` on malformed text and schema mismatches.
pub fn from_str<T: Wire>(text: &str) -> Result<T> {
    JsonDeserializer::new(Options::default()).from_str(text)
}

/// Deserializes JSON text into an existing instance, merging in place,
/// with default options.
///
/// # Errors
///
/// See [`from_str`].
pub fn from_str_into<T: Wire>(text: &str, into: &mut T) -> Result<()> {
    JsonDeserializer::new(Options::default()).from_str_into(text, into)
}

/// A JSON deserializer.
pub struct JsonDeserializer {
    options: Options,
    json: JsonOptions,
    local: HashMap<&'static str, &'static TypeDesc>,
}

impl JsonDeserializer {
    /// Creates a deserializer with default [`JsonOptions`].
    pub fn new(options: Options) -> Self {
        Self::with_json(options, JsonOptions::default())
    }

    /// Creates a deserializer with explicit [`JsonOptions`].
    pub fn with_json(options: Options, json: JsonOptions) -> Self {
        Self {
            options,
            json,
            local: HashMap::new(),
        }
    }

    /// The shared options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Registers `T` for name resolution local to this deserializer,
    /// taking precedence over the process-wide registry.
    pub fn register<T: Persist + Wire>(&mut self) {
        T::register_types();
        self.local.insert(<T as Persist>::descriptor().name, <T as Persist>::descriptor());
    }

    /// Deserializes a value from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Err` on malformed text and schema mismatches.
    pub fn from_str<T: Wire>(&self, text: &str) -> Result<T> {
        let tree: Json = serde_json::from_str(text)?;
        self.from_value(&tree)
    }

    /// Deserializes a value from an [`io::Read`] of JSON text.
    ///
    /// # Errors
    ///
    /// See [`Self::from_str`].
    pub fn from_reader<T: Wire>(&self, reader: &mut dyn io::Read) -> Result<T> {
        let tree: Json = serde_json::from_reader(reader)?;
        self.from_value(&tree)
    }

    /// Deserializes a value from a parsed JSON tree.
    ///
    /// # Errors
    ///
    /// See [`Self::from_str`].
    pub fn from_value<T: Wire>(&self, tree: &Json) -> Result<T> {
        T::register_types();
        let mut r = JsonReader {
            options: &self.options,
            json: &self.json,
            local: &self.local,
        };
        T::json_read(&mut r, tree)
    }

    /// Deserializes JSON text into an existing instance, merging in
    /// place.
    ///
    /// # Errors
    ///
    /// See [`Self::from_str`].
    pub fn from_str_into<T: Wire>(&self, text: &str, into: &mut T) -> Result<()> {
        T::register_types();
        let tree: Json = serde_json::from_str(text)?;
        let mut r = JsonReader {
            options: &self.options,
            json: &self.json,
            local: &self.local,
        };
        into.json_merge(&mut r, &tree)
    }
}

/// The read half of one JSON deserialization call.
pub struct JsonReader<'a> {
    pub(crate) options: &'a Options,
    json: &'a JsonOptions,
    local: &'a HashMap<&'static str, &'static TypeDesc>,
}

impl JsonReader<'_> {
    /// The shared options.
    pub fn options(&self) -> &Options {
        self.options
    }

    /// The text-format options.
    pub fn json_options(&self) -> &JsonOptions {
        self.json
    }

    fn resolve(&self, name: &str) -> Option<&'static TypeDesc> {
        self.local
            .get(name)
            .copied()
            .or_else(|| registry::resolve(name))
    }
}

fn class_tag_of<'v>(map: &'v serde_json::Map<String, Json>, r: &JsonReader<'_>) -> Option<&'v str> {
    map.get(&r.json.class_tag).and_then(Json::as_str)
}

fn apply_json_fields(
    obj: &mut dyn PersistObject,
    meta: &Meta,
    r: &mut JsonReader<'_>,
    map: &serde_json::Map<String, Json>,
) -> Result<()> {
    let mut seen = vec![false; meta.items.len()];

    for (key, value) in map {
        if *key == r.json.class_tag {
            continue;
        }
        match meta.find(key) {
            Some(index) => {
                let item = &meta.items[index];
                seen[index] = true;
                if item.desc.merge {
                    (item.desc.json.merge)(obj, r, value)?;
                } else {
                    (item.desc.json.read)(obj, r, value)?;
                }
            }
            None => {
                if let Some(access) = &meta.desc.unknown_storage {
                    log::trace!(
                        "retaining unknown field `{key}` of `{}`",
                        meta.desc.name
                    );
                    let wire = wire_value_from_json(value, r);
                    (access.get_mut)(obj).add(key.clone(), wire.value_type(), wire);
                } else if r.options.allow_unknown_fields {
                    log::debug!("discarding unknown field `{key}` of `{}`", meta.desc.name);
                } else {
                    return Err(Error::mismatch(
                        meta.desc.name,
                        key.clone(),
                        SchemaMismatchKind::UnknownField,
                    ));
                }
            }
        }
    }

    for (index, seen) in seen.into_iter().enumerate() {
        let item = &meta.items[index];
        if !seen && item.desc.required {
            return Err(Error::mismatch(
                meta.desc.name,
                item.tag().to_owned(),
                SchemaMismatchKind::MissingRequired,
            ));
        }
    }

    meta.run_after_read(obj);
    Ok(())
}

fn apply_json_array(
    obj: &mut dyn PersistObject,
    meta: &Meta,
    r: &mut JsonReader<'_>,
    items: &[Json],
) -> Result<()> {
    if items.len() != meta.items.len() {
        return Err(Error::JsonMismatch {
            expected: format!(
                "{} positional fields for `{}`",
                meta.items.len(),
                meta.desc.name
            ),
            found: format!("{} elements", items.len()),
        });
    }
    for (item, value) in meta.items.iter().zip(items) {
        if item.desc.merge {
            (item.desc.json.merge)(obj, r, value)?;
        } else {
            (item.desc.json.read)(obj, r, value)?;
        }
    }
    meta.run_after_read(obj);
    Ok(())
}

/// Reads an object that must be of class `T`.
pub(crate) fn read_object_json_concrete<T: Persist>(r: &mut JsonReader<'_>, v: &Json) -> Result<T> {
    let mut obj = T::default();
    merge_object_json_concrete(&mut obj, r, v)?;
    Ok(obj)
}

/// Reads an object of class `T` into an existing instance.
pub(crate) fn merge_object_json_concrete<T: Persist>(
    obj: &mut T,
    r: &mut JsonReader<'_>,
    v: &Json,
) -> Result<()> {
    let meta = Meta::get::<T>(r.options)?;
    match v {
        Json::Object(map) => {
            if let Some(tag) = class_tag_of(map, r)
                && tag != meta.desc.name
            {
                return Err(Error::mismatch(
                    meta.desc.name,
                    "<value>",
                    SchemaMismatchKind::WrongClass {
                        expected: meta.desc.name.to_owned(),
                        found: tag.to_owned(),
                    },
                ));
            }
            apply_json_fields(obj, &meta, r, map)
        }
        // positional form: compact types, and compact-rendered members of
        // any type
        Json::Array(items) => apply_json_array(obj, &meta, r, items),
        _ => Err(Error::json_mismatch(
            format!("object of class `{}`", meta.desc.name),
            v,
        )),
    }
}

/// Reads a class-tagged object of unconstrained class; `None` for JSON
/// null.
pub(crate) fn read_object_json_dyn(
    r: &mut JsonReader<'_>,
    v: &Json,
) -> Result<Option<Box<dyn PersistObject>>> {
    let map = match v {
        Json::Null => return Ok(None),
        Json::Object(map) => map,
        _ => return Err(Error::json_mismatch("class-tagged object", v)),
    };
    let Some(tag) = class_tag_of(map, r) else {
        return Err(Error::json_mismatch("class-tagged object", v));
    };

    match r.resolve(tag) {
        Some(desc) => {
            let meta = Meta::of(desc, r.options)?;
            let mut obj = (desc.factory)();
            apply_json_fields(&mut *obj, &meta, r, map)?;
            Ok(Some(obj))
        }
        None => {
            log::debug!("class `{tag}` is not locally resolvable; capturing generically");
            Ok(Some(Box::new(unknown_from_json(tag, map, r))))
        }
    }
}

/// Reads a record of class `T` or its conditional surrogate `S`,
/// dispatching on the class tag.
pub(crate) fn read_object_json_surrogate<T: Persist, S: Persist>(
    r: &mut JsonReader<'_>,
    v: &Json,
    from: fn(S) -> T,
) -> Result<T> {
    if let Json::Object(map) = v
        && let Some(tag) = class_tag_of(map, r)
        && tag == <S as Persist>::descriptor().name
    {
        return Ok(from(read_object_json_concrete::<S>(r, v)?));
    }
    read_object_json_concrete::<T>(r, v)
}

fn unknown_from_json(tag: &str, map: &serde_json::Map<String, Json>, r: &JsonReader<'_>) -> Unknown {
    let mut fields: Vec<UnknownField> = map
        .iter()
        .filter(|(key, _)| **key != r.json.class_tag)
        .map(|(key, value)| {
            let wire = wire_value_from_json(value, r);
            UnknownField {
                tag: key.clone(),
                ty: wire.value_type(),
                value: wire,
            }
        })
        .collect();
    fields.sort_by(|a, b| a.tag.cmp(&b.tag));
    Unknown {
        class_tag: tag.to_owned(),
        compact: false,
        fields,
    }
}

/// Infers a generic value from a JSON tree. JSON numbers carry no width,
/// so integers come back as `Long`/`ULong` and everything else as
/// `Double`.
pub(crate) fn wire_value_from_json(v: &Json, r: &JsonReader<'_>) -> WireValue {
    match v {
        Json::Null => WireValue::Null,
        Json::Bool(b) => WireValue::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                WireValue::Long(i)
            } else if let Some(u) = n.as_u64() {
                WireValue::ULong(u)
            } else {
                WireValue::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => WireValue::Str(Some(s.clone())),
        Json::Array(items) => WireValue::Seq(
            crate::value::ValueType::Any,
            Some(items.iter().map(|item| wire_value_from_json(item, r)).collect()),
        ),
        Json::Object(map) => match class_tag_of(map, r) {
            Some(tag) => WireValue::Record(Some(Box::new(unknown_from_json(tag, map, r)))),
            None => WireValue::Map(
                crate::value::ValueType::String,
                crate::value::ValueType::Any,
                Some(
                    map.iter()
                        .map(|(key, value)| {
                            (
                                WireValue::Str(Some(key.clone())),
                                wire_value_from_json(value, r),
                            )
                        })
                        .collect(),
                ),
            ),
        },
    }
}
