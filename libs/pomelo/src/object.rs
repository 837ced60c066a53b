//! Runtime object model for persistable types.
//!
//! [`Persist`] is implemented by `#[derive(Persist)]` and never by hand;
//! it ties a type to its static descriptor. [`PersistObject`] is the
//! object-safe view the codecs walk: every persisted struct implements
//! it, and so does [`Unknown`], which is how instances of locally
//! unresolvable classes travel through the system.

use std::any::Any;
use std::fmt;

use crate::meta::TypeDesc;
use crate::value::Unknown;

/// Object-safe runtime view of a persistable value.
///
/// Implemented by the `Persist` derive; the only hand-written
/// implementation is [`Unknown`].
pub trait PersistObject: Any {
    /// The wire name of the value's class.
    fn type_name(&self) -> &str;

    /// The static descriptor, or `None` for [`Unknown`] instances.
    fn descriptor(&self) -> Option<&'static TypeDesc>;

    /// Upcasts to [`Any`] for downcasting by reference.
    fn as_any(&self) -> &dyn Any;

    /// Upcasts to [`Any`] for downcasting by mutable reference.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Upcasts to [`Any`] for downcasting by value.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Clones the value behind a fresh box.
    fn clone_boxed(&self) -> Box<dyn PersistObject>;
}

/// A persistable type with a static schema.
///
/// Implemented by `#[derive(Persist)]` on structs with named fields. The
/// derive also implements [`PersistObject`] and the codec-facing `Wire`
/// trait, wires up field accessors, hooks, surrogates and unknown-field
/// storage, and rejects malformed persistence markers at compile time.
pub trait Persist: PersistObject + Default + Clone + Sized {
    /// The static descriptor emitted by the derive.
    fn descriptor() -> &'static TypeDesc;
}

impl fmt::Debug for dyn PersistObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.type_name())
    }
}

impl Clone for Box<dyn PersistObject> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

impl PersistObject for Unknown {
    fn type_name(&self) -> &str {
        &self.class_tag
    }

    fn descriptor(&self) -> Option<&'static TypeDesc> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> Box<dyn PersistObject> {
        Box::new(self.clone())
    }
}
