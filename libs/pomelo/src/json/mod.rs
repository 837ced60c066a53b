//! The JSON text format.
//!
//! Structurally parallel to the binary format over the same schema
//! model: an object is `{ "class": "<name>", "<tag>": <value>, … }`, with
//! the class tag written only where the reader cannot infer the type;
//! compact types serialize as bare arrays in schema field order.

pub mod de;
pub mod ser;

pub use de::{JsonDeserializer, from_str, from_str_into};
pub use ser::{JsonSerializer, to_string};

/// Text-format options, alongside the shared [`Options`].
///
/// [`Options`]: crate::Options
#[derive(Clone, Debug)]
pub struct JsonOptions {
    /// The key carrying a class name inside an object.
    pub class_tag: String,
    /// Whether the root object is written with its class tag even when
    /// the caller knows the type.
    pub save_root_class: bool,
    /// Whether emitted text is pretty-printed.
    pub pretty: bool,
    /// Whether enums are written by variant name instead of value.
    pub enum_as_string: bool,
    /// Whether 64-bit integers are written as strings.
    pub long_as_string: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            class_tag: "class".to_owned(),
            save_root_class: false,
            pretty: false,
            enum_as_string: false,
            long_as_string: false,
        }
    }
}
