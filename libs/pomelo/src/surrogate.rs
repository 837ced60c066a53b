//! Surrogate resolution.
//!
//! A type may declare that it is represented on the wire by a different
//! type, via conversion functions named on the derive. Conversion
//! signatures are checked by the generated code at compile time; what
//! remains here is the process-wide chain check: for any `(type,
//! options)` pair, a type may be the *source* of a surrogate conversion
//! or the *target* of one, never both. Chains are rejected when the
//! schema is extracted, not when a value is written.

use std::any::TypeId;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::Options;
use crate::error::{Error, Result};
use crate::meta::TypeDesc;
use crate::value::ValueType;

/// A type's wire substitution, as declared on the derive.
#[derive(Debug)]
pub struct SurrogateDesc {
    /// A printable name of the surrogate type, for diagnostics.
    pub surrogate_name: &'static str,
    pub type_id: fn() -> TypeId,
    /// The surrogate's wire shape.
    pub value_type: fn() -> ValueType,
    /// Whether an `only_if` predicate gates the substitution.
    pub conditional: bool,
    /// Registers the surrogate's record types with the name registry.
    pub register: fn(),
}

const IS_SURROGATE: u8 = 1;
const HAS_SURROGATE: u8 = 2;

static CHAIN: Lazy<DashMap<(TypeId, Options), u8>> = Lazy::new(DashMap::new);

/// Records the `owner -> surrogate` edge, rejecting chains.
pub(crate) fn link(
    owner: &'static TypeDesc,
    surrogate: &SurrogateDesc,
    options: &Options,
) -> Result<()> {
    if surrogate.conditional && (surrogate.value_type)() != ValueType::Record {
        return Err(Error::schema(
            owner.name,
            format!(
                "conditional surrogate `{}` must be a record type",
                surrogate.surrogate_name
            ),
        ));
    }

    mark(
        (surrogate.type_id)(),
        IS_SURROGATE,
        owner.name,
        surrogate.surrogate_name,
        options,
    )?;
    mark(
        (owner.type_id)(),
        HAS_SURROGATE,
        owner.name,
        owner.name,
        options,
    )
}

fn mark(
    type_id: TypeId,
    state: u8,
    owner_name: &str,
    chained_name: &str,
    options: &Options,
) -> Result<()> {
    let mut entry = CHAIN.entry((type_id, *options)).or_insert(0);
    *entry |= state;
    if *entry == IS_SURROGATE | HAS_SURROGATE {
        return Err(Error::schema(
            owner_name,
            format!("surrogate chain through type `{chained_name}`"),
        ));
    }
    Ok(())
}
