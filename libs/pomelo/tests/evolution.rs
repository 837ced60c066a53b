//! Schema evolution between writer and reader views of a type: dropped
//! fields, added fields, unknown-field preservation, unknown classes.

// dev-dependency shared across the test targets
use serde_json as _;
use time as _;
use pomelo::error::{Error, SchemaMismatchKind, WireFormatKind};
use pomelo::{Options, Persist, UnknownStorage, WireValue, binary};

mod wide {
    use super::Persist;

    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "EvoRec")]
    pub struct Rec {
        #[persist(required, alias = "a")]
        pub a: i32,
        #[persist(optional, alias = "b")]
        pub b: String,
    }
}

mod narrow {
    use super::Persist;

    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "EvoRec")]
    pub struct Rec {
        #[persist(required, alias = "a")]
        pub a: i32,
    }
}

mod keeping {
    use super::{Persist, UnknownStorage};

    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "EvoRec")]
    pub struct Rec {
        #[persist(required, alias = "a")]
        pub a: i32,
        #[persist(unknown)]
        pub rest: UnknownStorage,
    }
}

mod wider {
    use super::Persist;

    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "EvoRec")]
    pub struct Rec {
        #[persist(required, alias = "a")]
        pub a: i32,
        #[persist(optional, alias = "b")]
        pub b: String,
        #[persist(optional, alias = "c")]
        pub c: bool,
    }
}

mod demanding {
    use super::Persist;

    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "EvoRec")]
    pub struct Rec {
        #[persist(required, alias = "a")]
        pub a: i32,
        #[persist(required, alias = "c")]
        pub c: bool,
    }
}

fn wide_bytes() -> Vec<u8> {
    binary::to_vec(&wide::Rec {
        a: 1,
        b: "hi".to_owned(),
    })
    .expect("serializing must work")
}

#[test]
fn removed_field_is_dropped_when_allowed() {
    let options = Options {
        allow_unknown_fields: true,
        ..Options::default()
    };
    let mut de = binary::BinaryDeserializer::new(options);
    de.register::<narrow::Rec>();
    let rec: narrow::Rec = de.from_slice(&wide_bytes()).expect("decode must succeed");
    assert_eq!(rec.a, 1, "declared data survives");
}

#[test]
fn removed_field_is_rejected_by_default() {
    let mut de = binary::BinaryDeserializer::new(Options::default());
    de.register::<narrow::Rec>();
    let err = de
        .from_slice::<narrow::Rec>(&wide_bytes())
        .expect_err("unknown fields are disallowed by default");
    match err {
        Error::SchemaMismatch {
            field,
            kind: SchemaMismatchKind::UnknownField,
            ..
        } => assert_eq!(field, "b", "the offending tag is identified"),
        other => panic!("incorrect error kind: {other:?}"),
    }
}

#[test]
fn removed_field_is_preserved_and_reemitted_byte_identically() {
    let bytes = wide_bytes();
    let mut de = binary::BinaryDeserializer::new(Options::default());
    de.register::<keeping::Rec>();
    let rec: keeping::Rec = de.from_slice(&bytes).expect("decode must succeed");

    assert_eq!(rec.a, 1, "declared data survives");
    let kept = rec.rest.get("b").expect("removed field is retained");
    assert_eq!(kept.value, WireValue::Str(Some("hi".to_owned())), "value");

    let again = binary::to_vec(&rec).expect("re-serializing must work");
    assert_eq!(again, bytes, "the retained field reproduces its bytes");
}

#[test]
fn added_optional_field_defaults() {
    let bytes = binary::to_vec(&narrow::Rec { a: 2 }).expect("serializing must work");
    let mut de = binary::BinaryDeserializer::new(Options::default());
    de.register::<wider::Rec>();
    let rec: wider::Rec = de.from_slice(&bytes).expect("decode must succeed");
    assert_eq!(
        rec,
        wider::Rec {
            a: 2,
            b: String::new(),
            c: false,
        },
        "new optional fields stay at their defaults"
    );
}

#[test]
fn added_required_field_fails() {
    let bytes = binary::to_vec(&narrow::Rec { a: 2 }).expect("serializing must work");
    let mut de = binary::BinaryDeserializer::new(Options::default());
    de.register::<demanding::Rec>();
    let err = de
        .from_slice::<demanding::Rec>(&bytes)
        .expect_err("a required field cannot be conjured");
    match err {
        Error::SchemaMismatch {
            field,
            kind: SchemaMismatchKind::MissingRequired,
            ..
        } => assert_eq!(field, "c", "the offending tag is identified"),
        other => panic!("incorrect error kind: {other:?}"),
    }
}

mod num_writer {
    use super::Persist;

    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "EvoNum")]
    pub struct Num {
        #[persist(required, alias = "n")]
        pub n: i32,
    }
}

mod num_reader {
    use super::Persist;

    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "EvoNum")]
    pub struct Num {
        #[persist(required, alias = "n")]
        pub n: String,
    }
}

#[test]
fn incompatible_field_type_fails() {
    let bytes = binary::to_vec(&num_writer::Num { n: 3 }).expect("serializing must work");
    let mut de = binary::BinaryDeserializer::new(Options::default());
    de.register::<num_reader::Num>();
    let err = de
        .from_slice::<num_reader::Num>(&bytes)
        .expect_err("int data cannot fill a string field");
    assert!(
        matches!(
            err,
            Error::SchemaMismatch {
                kind: SchemaMismatchKind::IncompatibleType { .. },
                ..
            }
        ),
        "incorrect error kind: {err:?}"
    );
}

// a stream naming a class this process never defined
fn ghost_bytes() -> Vec<u8> {
    vec![
        32, // record
        1, 0, // class id 1
        5, b'G', b'h', b'o', b's', b't', // type name
        1, 0, // field count
        1, b'g', 5, // tag "g", int
        1, 0, 42, 0, 0, 0, // field 1 = 42
        0, 0, // terminator
    ]
}

#[test]
fn unknown_class_round_trips_losslessly() {
    let bytes = ghost_bytes();
    let value = binary::from_slice_value(&bytes).expect("generic decode must work");

    let WireValue::Record(Some(unknown)) = &value else {
        panic!("expected a record, found {value:?}");
    };
    assert_eq!(unknown.class_tag, "Ghost", "captured class tag");
    assert_eq!(unknown.fields[0].tag, "g", "captured field tag");
    assert_eq!(unknown.fields[0].value, WireValue::Int(42), "captured value");

    let again = binary::to_vec(&value).expect("re-serializing must work");
    assert_eq!(again, bytes, "unknown classes forward byte-identically");
}

#[test]
fn truncated_stream_reports_offset() {
    let mut bytes = wide_bytes();
    bytes.truncate(bytes.len() - 3);
    let err = binary::from_slice::<wide::Rec>(&bytes).expect_err("truncated");
    assert!(
        matches!(
            err,
            Error::WireFormat {
                kind: WireFormatKind::Truncated,
                ..
            }
        ),
        "incorrect error kind: {err:?}"
    );
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = wide_bytes();
    bytes.push(0);
    let err = binary::from_slice::<wide::Rec>(&bytes).expect_err("trailing byte");
    assert!(
        matches!(
            err,
            Error::WireFormat {
                kind: WireFormatKind::TrailingBytes,
                ..
            }
        ),
        "incorrect error kind: {err:?}"
    );
}

#[test]
fn signature_is_written_and_verified() {
    let options = Options {
        auto_signature: true,
        ..Options::default()
    };
    let mut ser = binary::BinarySerializer::new(options);
    let bytes = ser.to_vec(&num_writer::Num { n: 1 }).expect("serializing must work");
    assert_eq!(&bytes[..4], b"PM01", "signature prefix");

    let mut de = binary::BinaryDeserializer::new(options);
    let rec: num_writer::Num = de.from_slice(&bytes).expect("decode must succeed");
    assert_eq!(rec.n, 1, "data behind the signature");

    let unsigned = binary::to_vec(&num_writer::Num { n: 1 }).expect("serializing must work");
    let mut de = binary::BinaryDeserializer::new(options);
    let err = de
        .from_slice::<num_writer::Num>(&unsigned)
        .expect_err("missing signature");
    assert!(
        matches!(
            err,
            Error::WireFormat {
                kind: WireFormatKind::SignatureMismatch,
                ..
            }
        ),
        "incorrect error kind: {err:?}"
    );
}
