//! Schema extraction rules: tag validation, ordering, tag modes,
//! conditional emission, merge validation, and hooks.

// dev-dependency shared across the test targets
use serde_json as _;
use time as _;
use std::sync::atomic::{AtomicU32, Ordering};

use pomelo::error::Error;
use pomelo::meta::Meta;
use pomelo::{Options, Persist, TagMode, binary};

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct DupTag {
    #[persist(required, alias = "k")]
    a: i32,
    #[persist(optional, alias = "k")]
    b: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct EmptyTag {
    #[persist(required, alias = "")]
    a: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct SpacedTag {
    #[persist(required, alias = "a b")]
    a: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct NoFields {
    plain: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct MergeScalar {
    #[persist(optional, merge)]
    n: i32,
}

#[test]
fn definition_errors_surface_at_first_extraction() {
    let options = Options::default();

    for err in [
        Meta::get::<DupTag>(&options).expect_err("duplicate tags"),
        Meta::get::<EmptyTag>(&options).expect_err("empty tag"),
        Meta::get::<SpacedTag>(&options).expect_err("non-printable tag"),
        Meta::get::<NoFields>(&options).expect_err("no serializable fields"),
    ] {
        assert!(
            matches!(err, Error::SchemaDefinition { .. }),
            "incorrect error kind: {err:?}"
        );
    }

    // scalars have no merge semantics
    let err = Meta::get::<MergeScalar>(&options).expect_err("unmergeable field");
    assert!(matches!(err, Error::Merge { .. }), "incorrect error kind: {err:?}");

    // the same error resurfaces on actual codec use, not just Meta::get
    let err = binary::to_vec(&DupTag::default()).expect_err("duplicate tags");
    assert!(
        matches!(err, Error::SchemaDefinition { .. }),
        "incorrect error kind: {err:?}"
    );
}

#[test]
fn empty_schemas_require_opt_in() {
    let options = Options {
        allow_empty_schemas: true,
        ..Options::default()
    };
    let mut ser = binary::BinarySerializer::new(options);
    let bytes = ser.to_vec(&NoFields { plain: 1 }).expect("empty schema allowed");

    let mut de = binary::BinaryDeserializer::new(options);
    let back: NoFields = de.from_slice(&bytes).expect("decode must succeed");
    // the unmarked field never travels
    assert_eq!(back.plain, 0, "unmarked fields stay at their defaults");
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Unordered {
    #[persist(required, alias = "b")]
    second: i32,
    #[persist(required, alias = "a")]
    first: i32,
}

#[test]
fn fields_are_ordered_by_tag_not_declaration() {
    let bytes = binary::to_vec(&Unordered { second: 2, first: 1 }).expect("serializing must work");
    // definition entries: tag "a" (int) before tag "b" (int)
    let def = [1, b'a', 5, 1, b'b', 5];
    assert!(
        bytes.windows(def.len()).any(|window| window == def),
        "definition must list tags ascending: {bytes:?}"
    );

    let back: Unordered = binary::from_slice(&bytes).expect("deserializing must work");
    assert_eq!(back, Unordered { second: 2, first: 1 }, "round trip");
}

#[test]
fn tag_modes_change_the_wire_names() {
    let names = Options {
        tag_mode: TagMode::Names,
        ..Options::default()
    };
    let mut ser = binary::BinarySerializer::new(names);
    let bytes = ser.to_vec(&Unordered { second: 2, first: 1 }).expect("serializing must work");
    assert!(
        bytes.windows(5).any(|window| window == b"first"),
        "names mode ignores aliases: {bytes:?}"
    );
    let mut de = binary::BinaryDeserializer::new(names);
    let back: Unordered = de.from_slice(&bytes).expect("deserializing must work");
    assert_eq!(back, Unordered { second: 2, first: 1 }, "names round trip");

    // generated ids are stable within the process, so a same-process
    // peer reads them back
    let ids = Options {
        tag_mode: TagMode::Ids,
        ..Options::default()
    };
    let mut ser = binary::BinarySerializer::new(ids);
    let bytes = ser.to_vec(&Unordered { second: 2, first: 1 }).expect("serializing must work");
    let mut de = binary::BinaryDeserializer::new(ids);
    let back: Unordered = de.from_slice(&bytes).expect("deserializing must work");
    assert_eq!(back, Unordered { second: 2, first: 1 }, "ids round trip");
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Sparse {
    #[persist(required, alias = "x")]
    x: i32,
    #[persist(optional, alias = "y", serialize_if = "has_y")]
    y: i32,
    #[persist(optional, alias = "z", skip_if_default)]
    z: String,
}

impl Sparse {
    fn has_y(&self) -> bool {
        self.y != 0
    }
}

#[test]
fn conditional_fields_are_omitted_from_the_wire() {
    let full = Sparse {
        x: 1,
        y: 2,
        z: "set".to_owned(),
    };
    let sparse = Sparse {
        x: 1,
        y: 0,
        z: String::new(),
    };

    let full_bytes = binary::to_vec(&full).expect("serializing must work");
    let sparse_bytes = binary::to_vec(&sparse).expect("serializing must work");
    assert!(
        sparse_bytes.len() < full_bytes.len(),
        "omitted fields cost nothing"
    );

    let back: Sparse = binary::from_slice(&full_bytes).expect("deserializing must work");
    assert_eq!(back, full, "present fields round trip");
    let back: Sparse = binary::from_slice(&sparse_bytes).expect("deserializing must work");
    assert_eq!(back, sparse, "omitted optional fields default");
}

static WRITE_HOOKS: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Default, PartialEq, Persist)]
#[persist(before_write = "mark", after_read = "rebuild")]
struct Hooked {
    #[persist(required)]
    base: i32,
    total: i32,
}

impl Hooked {
    fn mark(&self) {
        WRITE_HOOKS.fetch_add(1, Ordering::Relaxed);
    }

    fn rebuild(&mut self) {
        self.total = self.base * 2;
    }
}

#[test]
fn hooks_run_around_the_field_pass() {
    let bytes = binary::to_vec(&Hooked { base: 21, total: 0 }).expect("serializing must work");
    assert!(WRITE_HOOKS.load(Ordering::Relaxed) > 0, "before-write hook ran");

    let back: Hooked = binary::from_slice(&bytes).expect("deserializing must work");
    assert_eq!(back.total, 42, "after-read hook recomputed the cache");
}

#[test]
fn compact_types_reject_unknown_storage() {
    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(compact)]
    struct BadCompact {
        #[persist(required)]
        a: i32,
        #[persist(unknown)]
        rest: pomelo::UnknownStorage,
    }

    let err = Meta::get::<BadCompact>(&Options::default()).expect_err("storage needs indices");
    assert!(
        matches!(err, Error::SchemaDefinition { .. }),
        "incorrect error kind: {err:?}"
    );
}
