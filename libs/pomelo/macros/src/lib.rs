use proc_macro::TokenStream as StdTokenStream;
use syn::DeriveInput;

mod args;
mod persist_impl;

/// Derives the persistence model for a type.
///
/// On a struct with named fields, implements `Persist`, `PersistObject`
/// and `Wire`: fields marked `#[persist(required)]` or
/// `#[persist(optional)]` become the type's ordered field schema,
/// everything else stays off the wire.
///
/// ### Field attributes
///
/// - `required` / `optional` — exactly one per persisted field.
/// - `alias = "…"` — the wire tag, decoupled from the field name.
/// - `serialize_if = "method"` — omit the field when `method(&self)` is
///   false.
/// - `skip_if_default` — omit the field when it equals its default.
/// - `merge` — deserialize into the existing value in place instead of
///   replacing it (collections and nested records).
/// - `compact` — render this field's record value positionally in JSON.
/// - `unknown` — marks the `UnknownStorage` side table receiving fields
///   the schema no longer declares.
///
/// ### Type attributes
///
/// - `name = "…"` — the wire name (defaults to the type name).
/// - `compact` — positional encoding: smaller, but fields can no longer
///   be omitted or reordered.
/// - `before_write = "method"` / `after_read = "method"` — hooks, in
///   declaration order; may be given multiple times.
/// - `surrogate(ty = Other, to = "method", from = "method",
///   only_if = "method")` — represent this type on the wire as `Other`.
///
/// On a fieldless enum, implements `Wire` only: variants are encoded by
/// their discriminant as a 32-bit integer.
#[proc_macro_derive(Persist, attributes(persist))]
pub fn derive_persist(input: StdTokenStream) -> StdTokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    persist_impl::entry_point(&input)
        .unwrap_or_else(darling::Error::write_errors)
        .into()
}
