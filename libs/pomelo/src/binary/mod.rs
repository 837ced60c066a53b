//! The compact, self-describing binary format.
//!
//! A stream is the optional 4-byte signature followed by one rough-tagged
//! top-level value. Class definitions are emitted inline before the first
//! instance of each class, so the format is streamable without a second
//! pass; class ids are scoped to one writer's lifetime.

pub mod de;
mod leb128;
mod read;
pub mod ser;

pub use de::{BinaryDeserializer, from_reader, from_slice, from_slice_into, from_slice_value};
pub use ser::{BinarySerializer, to_vec, to_writer};

/// Signature bytes written when [`Options::auto_signature`] is set.
///
/// [`Options::auto_signature`]: crate::Options::auto_signature
pub const SIGNATURE: [u8; 4] = *b"PM01";
