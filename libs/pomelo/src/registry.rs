//! Process-wide wire-name registry.
//!
//! The binary reader resolves incoming class names through this table.
//! It populates itself transitively the first time a type's schema is
//! used, so reading a typed root needs no setup; concrete types that
//! only ever travel behind `Box<dyn PersistObject>` must be announced
//! with [`register`]. Deserializer instances may additionally carry
//! local overrides, which take precedence over this table.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::Lazy;

use crate::meta::TypeDesc;
use crate::object::Persist;

static REGISTRY: Lazy<DashMap<&'static str, &'static TypeDesc>> = Lazy::new(DashMap::new);

/// Registers `T` under its wire name for polymorphic decoding.
pub fn register<T: Persist>() {
    ensure(<T as Persist>::descriptor());
}

/// Registers a descriptor and, transitively, the record types reachable
/// from its members. Idempotent; a name collision keeps the first
/// registration.
pub(crate) fn ensure(desc: &'static TypeDesc) {
    match REGISTRY.entry(desc.name) {
        Entry::Occupied(occupied) => {
            if ((occupied.get()).type_id)() != (desc.type_id)() {
                log::warn!(
                    "wire name `{}` is already registered to a different type; \
                     keeping the first registration (use a per-deserializer \
                     registration to disambiguate)",
                    desc.name
                );
            }
            return;
        }
        Entry::Vacant(vacant) => {
            log::trace!("registered wire type `{}`", desc.name);
            vacant.insert(desc);
        }
    }

    // recurse only after the entry is published so cyclic graphs settle
    for member in desc.members {
        (member.register)();
    }
    if let Some(surrogate) = &desc.surrogate {
        (surrogate.register)();
    }
}

pub(crate) fn resolve(name: &str) -> Option<&'static TypeDesc> {
    REGISTRY.get(name).map(|entry| *entry.value())
}
