//! Schema extraction.
//!
//! The `Persist` derive emits a static [`TypeDesc`] per type: the raw,
//! declaration-ordered member table with monomorphized accessor
//! functions. [`Meta`] is the runtime schema built from it — members
//! sorted by their wire tag under a given [`Options`], validated once,
//! then cached for the process lifetime. Everything else (both codecs,
//! the merge-join) works off `Meta`.

use std::any::TypeId;
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::binary::de::BinReader;
use crate::binary::ser::BinWriter;
use crate::error::{Error, Result};
use crate::json::de::JsonReader;
use crate::json::ser::JsonWriter;
use crate::object::PersistObject;
use crate::surrogate::SurrogateDesc;
use crate::value::{UnknownStorage, ValueType};
use crate::{Options, Persist, TagMode};

pub type BinWriteFn = fn(&dyn PersistObject, &mut BinWriter<'_>) -> Result<()>;
pub type BinReadFn = fn(&mut dyn PersistObject, &mut BinReader<'_>) -> Result<()>;
pub type JsonWriteFn = fn(&dyn PersistObject, &mut JsonWriter<'_>) -> Result<serde_json::Value>;
pub type JsonReadFn =
    fn(&mut dyn PersistObject, &mut JsonReader<'_>, &serde_json::Value) -> Result<()>;

/// Binary codec accessors for one member.
#[derive(Clone, Copy, Debug)]
pub struct BinAccess {
    pub write: BinWriteFn,
    pub read: BinReadFn,
    pub merge: BinReadFn,
}

/// JSON codec accessors for one member.
#[derive(Clone, Copy, Debug)]
pub struct JsonAccess {
    pub write: JsonWriteFn,
    pub read: JsonReadFn,
    pub merge: JsonReadFn,
}

/// Accessors for a type's unknown-field storage.
#[derive(Clone, Copy, Debug)]
pub struct UnknownAccess {
    pub get: fn(&dyn PersistObject) -> &UnknownStorage,
    pub get_mut: fn(&mut dyn PersistObject) -> &mut UnknownStorage,
}

/// One persisted member, as declared. Emitted by the derive.
#[derive(Debug)]
pub struct MemberDesc {
    /// The in-code field name.
    pub name: &'static str,
    /// The explicit wire alias, if any.
    pub alias: Option<&'static str>,
    /// Whether the field must be present in a peer schema.
    pub required: bool,
    /// Whether the member's value is rendered positionally in JSON.
    pub compact: bool,
    /// Whether deserialization merges into the existing value in place.
    pub merge: bool,
    /// Whether the member's type supports in-place merging.
    pub can_merge: bool,
    /// The declared rough type.
    pub value_type: fn() -> ValueType,
    /// Registers the member's record types with the name registry.
    pub register: fn(),
    /// Omits the field from the wire when the predicate is false.
    pub serialize_if: Option<fn(&dyn PersistObject) -> bool>,
    pub bin: BinAccess,
    pub json: JsonAccess,
}

/// A type's static persistence descriptor. Emitted by the derive.
#[derive(Debug)]
pub struct TypeDesc {
    /// The wire name of the type.
    pub name: &'static str,
    pub type_id: fn() -> TypeId,
    /// Whether instances are positionally encoded.
    pub compact: bool,
    /// Default-constructs a fresh instance.
    pub factory: fn() -> Box<dyn PersistObject>,
    /// The persisted members in declaration order.
    pub members: &'static [MemberDesc],
    /// Accessors for the unknown-field side storage, if the type opts in.
    pub unknown_storage: Option<UnknownAccess>,
    /// The wire substitution, if the type declares one.
    pub surrogate: Option<SurrogateDesc>,
    /// Hooks invoked before field emission, in declaration order.
    pub before_write: &'static [fn(&dyn PersistObject)],
    /// Hooks invoked after all fields are applied, in declaration order.
    pub after_read: &'static [fn(&mut dyn PersistObject)],
}

/// One member of a built schema, carrying its resolved wire tag.
#[derive(Debug)]
pub struct MetaItem {
    pub desc: &'static MemberDesc,
    tag: Cow<'static, str>,
    /// The declared rough type, resolved once.
    pub value_type: ValueType,
}

impl MetaItem {
    /// The wire tag under the schema's tag mode.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// The ordered, validated field schema of a type under one [`Options`].
///
/// Created lazily on first use, cached for the process lifetime,
/// immutable thereafter. Items are strictly ascending by tag; that
/// ordering is the backbone of the reader's merge-join.
#[derive(Debug)]
pub struct Meta {
    pub desc: &'static TypeDesc,
    pub options: Options,
    pub items: Vec<MetaItem>,
}

static CACHE: Lazy<DashMap<(TypeId, Options), Arc<Meta>>> = Lazy::new(DashMap::new);

impl Meta {
    /// Gets or builds the schema for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaDefinition`] or [`Error::Merge`] when the
    /// type's declaration is malformed; the same error resurfaces on
    /// every subsequent attempt.
    pub fn get<T: Persist>(options: &Options) -> Result<Arc<Self>> {
        Self::of(<T as Persist>::descriptor(), options)
    }

    /// Gets or builds the schema for a descriptor.
    ///
    /// # Errors
    ///
    /// See [`Meta::get`].
    pub fn of(desc: &'static TypeDesc, options: &Options) -> Result<Arc<Self>> {
        let key = ((desc.type_id)(), *options);
        if let Some(meta) = CACHE.get(&key) {
            return Ok(Arc::clone(&meta));
        }

        // concurrent first use may race-compute; the loser's value is
        // discarded and the published one wins
        let meta = Self::build(desc, options)?;
        let entry = CACHE.entry(key).or_insert_with(|| Arc::new(meta));
        Ok(Arc::clone(entry.value()))
    }

    fn build(desc: &'static TypeDesc, options: &Options) -> Result<Self> {
        log::trace!("extracting schema for `{}`", desc.name);
        crate::registry::ensure(desc);

        let mut items = Vec::with_capacity(desc.members.len());
        for member in desc.members {
            let tag: Cow<'static, str> = match options.tag_mode {
                TagMode::Names => Cow::Borrowed(member.name),
                TagMode::Aliases => Cow::Borrowed(member.alias.unwrap_or(member.name)),
                TagMode::Ids => Cow::Owned(next_short_id()),
            };
            if tag.is_empty() {
                return Err(Error::schema(
                    desc.name,
                    format!("empty tag for field `{}`", member.name),
                ));
            }
            if let Some(ch) = tag.chars().find(|&ch| ch <= ' ' || ch >= '\u{7f}') {
                return Err(Error::schema(
                    desc.name,
                    format!("bad character {ch:?} in tag for field `{}`", member.name),
                ));
            }
            if member.merge && !member.can_merge {
                return Err(Error::Merge {
                    type_name: desc.name.to_owned(),
                    field: member.name.to_owned(),
                });
            }
            items.push(MetaItem {
                desc: member,
                value_type: (member.value_type)(),
                tag,
            });
        }

        // a type that lives on the wire as its surrogate needs no fields
        // of its own
        if items.is_empty() && !options.allow_empty_schemas && desc.surrogate.is_none() {
            return Err(Error::schema(desc.name, "no serializable fields"));
        }
        if desc.compact && desc.unknown_storage.is_some() {
            return Err(Error::schema(
                desc.name,
                "unknown-field storage is not representable on a compact type",
            ));
        }

        items.sort_by(|a, b| a.tag.cmp(&b.tag));
        for pair in items.windows(2) {
            if pair[0].tag == pair[1].tag {
                return Err(Error::schema(
                    desc.name,
                    format!(
                        "duplicate tag `{}` for field `{}`",
                        pair[1].tag, pair[1].desc.name
                    ),
                ));
            }
        }

        if let Some(surrogate) = &desc.surrogate {
            crate::surrogate::link(desc, surrogate, options)?;
        }

        Ok(Self {
            desc,
            options: *options,
            items,
        })
    }

    /// Finds the item with the given tag.
    pub fn find(&self, tag: &str) -> Option<usize> {
        self.items.binary_search_by(|item| item.tag().cmp(tag)).ok()
    }

    pub(crate) fn run_before_write(&self, obj: &dyn PersistObject) {
        for hook in self.desc.before_write {
            hook(obj);
        }
    }

    pub(crate) fn run_after_read(&self, obj: &mut dyn PersistObject) {
        for hook in self.desc.after_read {
            hook(obj);
        }
    }
}

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

// 4-char ids over [A-Za-z], most significant first; "AAAB" comes first.
fn next_short_id() -> String {
    let mut n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let mut chars = [b'A'; 4];
    for slot in chars.iter_mut().rev() {
        #[allow(clippy::cast_possible_truncation)]
        let digit = (n % 52) as u8;
        n /= 52;
        *slot = if digit < 26 {
            b'A' + digit
        } else {
            b'a' + (digit - 26)
        };
    }
    String::from_utf8(chars.to_vec()).expect("ids are ASCII")
}
