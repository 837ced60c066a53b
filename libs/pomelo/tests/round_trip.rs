//! Round-trip coverage for the binary format across the supported value
//! shapes.

// dev-dependency shared across the test targets
use serde_json as _;
use std::collections::BTreeMap;

use pomelo::value::ValueType;
use pomelo::{Options, Persist, PersistObject, WireValue, binary};

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Point {
    #[persist(required, alias = "0")]
    x: i32,
    #[persist(required, alias = "1")]
    y: i32,
}

// the full stream for Point { x: 3, y: 4 }: rough type, inline class
// definition, then the tagged body
#[test]
fn point_stream_is_bit_exact() {
    let bytes = binary::to_vec(&Point { x: 3, y: 4 }).expect("serializing must work");
    let expected = [
        32, // record
        1, 0, // class id 1
        5, b'P', b'o', b'i', b'n', b't', // type name
        2, 0, // field count
        1, b'0', 5, // tag "0", int
        1, b'1', 5, // tag "1", int
        1, 0, 3, 0, 0, 0, // field 1 = 3
        2, 0, 4, 0, 0, 0, // field 2 = 4
        0, 0, // terminator
    ];
    assert_eq!(bytes, expected, "wire layout must not drift");

    let point: Point = binary::from_slice(&bytes).expect("deserializing must work");
    assert_eq!(point, Point { x: 3, y: 4 }, "round trip");
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Scalars {
    #[persist(optional)]
    a: i8,
    #[persist(optional)]
    b: u8,
    #[persist(optional)]
    c: i16,
    #[persist(optional)]
    d: u16,
    #[persist(optional)]
    e: i32,
    #[persist(optional)]
    f: u32,
    #[persist(optional)]
    g: i64,
    #[persist(optional)]
    h: u64,
    #[persist(optional)]
    i: bool,
    #[persist(optional)]
    j: char,
    #[persist(optional)]
    k: f32,
    #[persist(optional)]
    l: f64,
    #[persist(optional)]
    m: String,
    #[persist(optional)]
    n: Option<i32>,
    #[persist(optional)]
    o: Option<String>,
}

fn round_trip<T>(value: &T) -> Vec<u8>
where
    T: std::fmt::Debug + PartialEq + pomelo::Wire,
{
    let buf = binary::to_vec(value).expect("serializing must work");
    let rev: T = binary::from_slice(&buf).expect("deserializing must work");
    assert_eq!(*value, rev, "serialization messed up data");
    buf
}

#[test]
fn round_trip_scalars() {
    round_trip(&Scalars::default());
    round_trip(&Scalars {
        a: -5,
        b: 200,
        c: -30_000,
        d: 60_000,
        e: -2_000_000_000,
        f: 4_000_000_000,
        g: i64::MIN,
        h: u64::MAX,
        i: true,
        j: 'λ',
        k: 1.5,
        l: -0.25,
        m: "hello".to_owned(),
        n: Some(-1),
        o: Some(String::new()),
    });
    // null and empty strings are distinct wire values
    round_trip(&Scalars {
        o: None,
        m: String::new(),
        ..Scalars::default()
    });
}

#[test]
fn round_trip_dates() {
    #[derive(Debug, Clone, PartialEq, Persist)]
    struct Stamps {
        #[persist(required)]
        at: time::OffsetDateTime,
        #[persist(required)]
        took: time::Duration,
    }

    impl Default for Stamps {
        fn default() -> Self {
            Self {
                at: time::OffsetDateTime::UNIX_EPOCH,
                took: time::Duration::ZERO,
            }
        }
    }

    round_trip(&Stamps::default());
    round_trip(&Stamps {
        at: time::macros::datetime!(2023-11-05 13:45:30 UTC),
        took: time::Duration::seconds(90) + time::Duration::microseconds(250),
    });
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Inner {
    #[persist(required)]
    id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Outer {
    #[persist(required)]
    name: String,
    #[persist(optional)]
    first: Inner,
    #[persist(optional)]
    rest: Vec<Inner>,
    #[persist(optional)]
    weights: BTreeMap<String, i64>,
    #[persist(optional)]
    maybe: Option<Inner>,
}

#[test]
fn round_trip_object_graph() {
    round_trip(&Outer {
        name: "graph".to_owned(),
        first: Inner { id: 1 },
        rest: vec![Inner { id: 2 }, Inner { id: 3 }],
        weights: BTreeMap::from([("a".to_owned(), -1), ("b".to_owned(), 7)]),
        maybe: None,
    });
    round_trip(&Outer {
        name: String::new(),
        maybe: Some(Inner { id: 9 }),
        ..Outer::default()
    });
}

#[derive(Debug, Clone, Default, Persist)]
struct DynHolder {
    #[persist(optional)]
    payload: Option<Box<dyn PersistObject>>,
}

#[test]
fn round_trip_polymorphic_field() {
    let holder = DynHolder {
        payload: Some(Box::new(Inner { id: 77 })),
    };
    let bytes = binary::to_vec(&holder).expect("serializing must work");

    let back: DynHolder = binary::from_slice(&bytes).expect("deserializing must work");
    let payload = back.payload.expect("payload must be present");
    let inner = payload
        .as_any()
        .downcast_ref::<Inner>()
        .expect("payload must come back as its concrete class");
    assert_eq!(inner.id, 77, "payload data");

    let empty: DynHolder =
        binary::from_slice(&binary::to_vec(&DynHolder::default()).expect("serializing must work"))
            .expect("deserializing must work");
    assert!(empty.payload.is_none(), "null payload stays null");
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
#[persist(compact)]
struct Vec2 {
    #[persist(required, alias = "0")]
    x: f32,
    #[persist(required, alias = "1")]
    y: f32,
}

#[test]
fn compact_body_is_positional() {
    let bytes = round_trip(&Vec2 { x: 1.5, y: -2.0 });
    // rough type + class id + definition, then exactly two floats with no
    // indices and no terminator
    let def_len = 1 + 2 + (1 + 4) + 2 + (1 + 1 + 1) * 2;
    assert_eq!(bytes.len(), def_len + 8, "compact body must carry values only");
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct AnyHolder {
    #[persist(optional)]
    value: WireValue,
}

#[test]
fn round_trip_any_values() {
    for value in [
        WireValue::Null,
        WireValue::Int(42),
        WireValue::Str(Some("text".to_owned())),
        WireValue::Str(None),
        WireValue::Seq(
            ValueType::Int,
            Some(vec![WireValue::Int(1), WireValue::Int(2)]),
        ),
        WireValue::Map(
            ValueType::String,
            ValueType::Bool,
            Some(vec![(
                WireValue::Str(Some("on".to_owned())),
                WireValue::Bool(true),
            )]),
        ),
    ] {
        round_trip(&AnyHolder { value });
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Persist)]
enum Fruit {
    #[default]
    Apple,
    Banana = 5,
    Cherry,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Basket {
    #[persist(required)]
    fruit: Fruit,
    #[persist(optional)]
    more: Vec<Fruit>,
}

#[test]
fn round_trip_enums() {
    round_trip(&Basket {
        fruit: Fruit::Cherry,
        more: vec![Fruit::Apple, Fruit::Banana],
    });
}

#[test]
fn class_ids_persist_across_writes() {
    let mut ser = binary::BinarySerializer::new(Options::default());
    let first = ser.to_vec(&Point { x: 1, y: 2 }).expect("first write");
    let second = ser.to_vec(&Point { x: 3, y: 4 }).expect("second write");
    assert!(
        second.len() < first.len(),
        "the class definition is only paid once per writer"
    );

    // both streams share one id numbering space, so one reader handles
    // them in sequence
    let mut de = binary::BinaryDeserializer::new(Options::default());
    let a: Point = de.from_slice(&first).expect("first read");
    let b: Point = de.from_slice(&second).expect("second read");
    assert_eq!((a, b), (Point { x: 1, y: 2 }, Point { x: 3, y: 4 }), "data");

    ser.clear_class_ids();
    let fresh = ser.to_vec(&Point { x: 1, y: 2 }).expect("fresh write");
    assert_eq!(fresh, first, "clearing restarts the numbering space");
}

#[test]
fn merge_into_existing_values() {
    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "MergeBag")]
    struct Bag {
        #[persist(optional, merge)]
        items: Vec<i32>,
    }

    let bytes = binary::to_vec(&Bag { items: vec![3, 4] }).expect("serializing must work");
    let mut bag = Bag { items: vec![1] };
    binary::from_slice_into(&bytes, &mut bag).expect("merge must work");
    assert_eq!(bag.items, [1, 3, 4], "merge appends instead of replacing");

    // top-level merge over a plain sequence behaves the same
    let bytes = binary::to_vec(&vec![5i32, 6]).expect("serializing must work");
    let mut list = vec![4i32];
    binary::from_slice_into(&bytes, &mut list).expect("merge must work");
    assert_eq!(list, [4, 5, 6], "sequence merge appends");
}

#[test]
fn reader_entry_points_agree() {
    let bytes = binary::to_vec(&Point { x: 8, y: 9 }).expect("serializing must work");
    let from_reader: Point =
        binary::from_reader(&mut bytes.as_slice()).expect("reader path must work");
    assert_eq!(from_reader, Point { x: 8, y: 9 }, "io::Read entry point");

    let value = binary::from_slice_value(&bytes).expect("generic decode must work");
    match value {
        WireValue::Record(Some(unknown)) => {
            assert_eq!(unknown.class_tag, "Point", "captured class tag");
            assert_eq!(unknown.fields.len(), 2, "captured fields");
        }
        other => panic!("expected a record, found {other:?}"),
    }
}
