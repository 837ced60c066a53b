//! The JSON writer.

use std::io;

use serde_json::Value as Json;

use super::JsonOptions;
use crate::Options;
use crate::error::{Error, Result};
use crate::meta::{Meta, MetaItem};
use crate::object::PersistObject;
use crate::value::{Unknown, UnknownField, WireValue};
use crate::wire::Wire;

/// Serializes a value to JSON text with default options.
///
/// # Errors
///
/// Returns `Err` when a schema definition is malformed.
pub fn to_string<T: Wire>(value: &T) -> Result<String> {
    JsonSerializer::new(Options::default()).to_string(value)
}

/// A JSON serializer.
///
/// Unlike the binary writer it carries no per-stream state; it exists to
/// pair [`Options`] with [`JsonOptions`].
pub struct JsonSerializer {
    options: Options,
    json: JsonOptions,
}

impl JsonSerializer {
    /// Creates a serializer with default [`JsonOptions`].
    pub fn new(options: Options) -> Self {
        Self::with_json(options, JsonOptions::default())
    }

    /// Creates a serializer with explicit [`JsonOptions`].
    pub fn with_json(options: Options, json: JsonOptions) -> Self {
        Self { options, json }
    }

    /// The shared options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The text-format options.
    pub fn json_options(&self) -> &JsonOptions {
        &self.json
    }

    /// Serializes a value to a JSON tree.
    ///
    /// # Errors
    ///
    /// Returns `Err` when a schema definition is malformed.
    pub fn to_value<T: Wire>(&self, value: &T) -> Result<Json> {
        let mut w = JsonWriter {
            options: &self.options,
            json: &self.json,
            root: true,
            forced_compact: false,
        };
        value.json_write(&mut w)
    }

    /// Serializes a value to JSON text.
    ///
    /// # Errors
    ///
    /// See [`Self::to_value`].
    pub fn to_string<T: Wire>(&self, value: &T) -> Result<String> {
        let tree = self.to_value(value)?;
        let text = if self.json.pretty {
            serde_json::to_string_pretty(&tree)?
        } else {
            serde_json::to_string(&tree)?
        };
        Ok(text)
    }

    /// Serializes a value as JSON text to an [`io::Write`].
    ///
    /// # Errors
    ///
    /// See [`Self::to_value`].
    pub fn to_writer<T: Wire>(&self, value: &T, out: &mut dyn io::Write) -> Result<()> {
        let text = self.to_string(value)?;
        Ok(out.write_all(text.as_bytes())?)
    }
}

/// The write half of one JSON serialization call.
pub struct JsonWriter<'a> {
    pub(crate) options: &'a Options,
    json: &'a JsonOptions,
    root: bool,
    forced_compact: bool,
}

impl JsonWriter<'_> {
    /// The shared options.
    pub fn options(&self) -> &Options {
        self.options
    }

    /// The text-format options.
    pub fn json_options(&self) -> &JsonOptions {
        self.json
    }

    fn take_root(&mut self) -> bool {
        std::mem::take(&mut self.root)
    }

    /// Root-class saving applies to a root object, not to elements of a
    /// root container.
    pub(crate) fn clear_root(&mut self) {
        self.root = false;
    }

    pub(crate) fn take_forced_compact(&mut self) -> bool {
        std::mem::take(&mut self.forced_compact)
    }

    /// Field-level compactness does not reach past a container boundary.
    pub(crate) fn clear_forced_compact(&mut self) {
        self.forced_compact = false;
    }

    /// Renders the next record compactly regardless of its type flag.
    pub(crate) fn force_compact(&mut self) {
        self.forced_compact = true;
    }
}

/// Writes one object: a class-tagged map, or a bare array for compact
/// schemas. `force_class` is set where the reader cannot infer the type.
pub(crate) fn write_object_json(
    obj: &dyn PersistObject,
    w: &mut JsonWriter<'_>,
    force_class: bool,
) -> Result<Json> {
    let root = w.take_root();
    let forced_compact = w.take_forced_compact();

    let Some(desc) = obj.descriptor() else {
        let unknown = obj
            .as_any()
            .downcast_ref::<Unknown>()
            .ok_or_else(|| Error::Custom("object without a descriptor must be Unknown".to_owned()))?;
        return unknown_to_json(unknown, w);
    };

    let meta = Meta::of(desc, w.options)?;
    meta.run_before_write(obj);

    let retained: &[UnknownField] = match &desc.unknown_storage {
        Some(access) => (access.get)(obj).fields(),
        None => &[],
    };

    let want_class = force_class || (root && w.json.save_root_class);
    // the class tag needs a map, so compactness yields to it; so do
    // retained unknown fields, which have no position in an array
    if (desc.compact || forced_compact) && !want_class && retained.is_empty() {
        let mut items = Vec::with_capacity(meta.items.len());
        for item in &meta.items {
            items.push((item.desc.json.write)(obj, w)?);
        }
        return Ok(Json::Array(items));
    }

    let mut map = serde_json::Map::new();
    if want_class {
        map.insert(w.json.class_tag.clone(), Json::String(desc.name.to_owned()));
    }

    let mut retained = retained.iter().peekable();

    for item in &meta.items {
        while let Some(field) = retained.peek()
            && field.tag.as_str() < item.tag()
        {
            let field = retained.next().expect("peeked");
            map.insert(field.tag.clone(), wire_value_to_json(&field.value, w)?);
        }
        if let Some(condition) = item.desc.serialize_if
            && !condition(obj)
        {
            continue;
        }
        map.insert(item.tag().to_owned(), write_item(obj, item, w)?);
    }
    for field in retained {
        map.insert(field.tag.clone(), wire_value_to_json(&field.value, w)?);
    }

    Ok(Json::Object(map))
}

fn write_item(obj: &dyn PersistObject, item: &MetaItem, w: &mut JsonWriter<'_>) -> Result<Json> {
    if item.desc.compact {
        w.force_compact();
    }
    (item.desc.json.write)(obj, w)
}

fn unknown_to_json(unknown: &Unknown, w: &mut JsonWriter<'_>) -> Result<Json> {
    let mut map = serde_json::Map::new();
    map.insert(
        w.json.class_tag.clone(),
        Json::String(unknown.class_tag.clone()),
    );
    for field in &unknown.fields {
        map.insert(field.tag.clone(), wire_value_to_json(&field.value, w)?);
    }
    Ok(Json::Object(map))
}

/// Renders a generic value as JSON. Rough types are structural, so some
/// distinctions (date vs. string, integer widths) flatten into their
/// closest JSON shape.
pub(crate) fn wire_value_to_json(value: &WireValue, w: &mut JsonWriter<'_>) -> Result<Json> {
    Ok(match value {
        WireValue::Null => Json::Null,
        WireValue::SByte(v) => Json::from(*v),
        WireValue::Byte(v) => Json::from(*v),
        WireValue::Short(v) => Json::from(*v),
        WireValue::UShort(v) => Json::from(*v),
        WireValue::Int(v) => Json::from(*v),
        WireValue::UInt(v) => Json::from(*v),
        WireValue::Long(v) => return v.json_write(w),
        WireValue::ULong(v) => return v.json_write(w),
        WireValue::Bool(v) => Json::Bool(*v),
        WireValue::Char(v) => Json::String(v.to_string()),
        WireValue::Float(v) => Json::from(f64::from(*v)),
        WireValue::Double(v) => Json::from(*v),
        WireValue::Date(v) => return v.json_write(w),
        WireValue::TimeSpan(v) => return v.json_write(w),
        WireValue::Str(v) => match v {
            None => Json::Null,
            Some(s) => Json::String(s.clone()),
        },
        WireValue::Nullable(_, v) => match v {
            None => Json::Null,
            Some(v) => wire_value_to_json(v, w)?,
        },
        WireValue::Seq(_, items) => match items {
            None => Json::Null,
            Some(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(wire_value_to_json(item, w)?);
                }
                Json::Array(out)
            }
        },
        WireValue::Map(_, _, entries) => match entries {
            None => Json::Null,
            Some(entries) => {
                let mut map = serde_json::Map::new();
                for (key, val) in entries {
                    map.insert(wire_key_to_string(key)?, wire_value_to_json(val, w)?);
                }
                Json::Object(map)
            }
        },
        WireValue::Record(v) => match v {
            None => Json::Null,
            Some(unknown) => unknown_to_json(unknown, w)?,
        },
    })
}

fn wire_key_to_string(key: &WireValue) -> Result<String> {
    Ok(match key {
        WireValue::SByte(v) => v.to_string(),
        WireValue::Byte(v) => v.to_string(),
        WireValue::Short(v) => v.to_string(),
        WireValue::UShort(v) => v.to_string(),
        WireValue::Int(v) => v.to_string(),
        WireValue::UInt(v) => v.to_string(),
        WireValue::Long(v) => v.to_string(),
        WireValue::ULong(v) => v.to_string(),
        WireValue::Bool(v) => v.to_string(),
        WireValue::Char(v) => v.to_string(),
        WireValue::Str(Some(s)) => s.clone(),
        other => {
            return Err(Error::Custom(format!(
                "wire value of type {} cannot be a JSON mapping key",
                other.value_type()
            )));
        }
    })
}
