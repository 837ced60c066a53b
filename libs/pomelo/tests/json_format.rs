//! Structure and options of the JSON text format.

use pomelo::json::{JsonDeserializer, JsonOptions, JsonSerializer};
use pomelo::{Options, Persist, PersistObject, UnknownStorage, json};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Persist)]
#[persist(name = "JPoint")]
struct JPoint {
    #[persist(required, alias = "0")]
    x: i32,
    #[persist(required, alias = "1")]
    y: i32,
}

#[test]
fn objects_map_tags_to_values() {
    let ser = JsonSerializer::new(Options::default());
    let tree = ser.to_value(&JPoint { x: 3, y: 4 }).expect("serializing must work");
    assert_eq!(tree, json!({ "0": 3, "1": 4 }), "schema order, no class tag");

    let point: JPoint = json::from_str(&tree.to_string()).expect("deserializing must work");
    assert_eq!(point, JPoint { x: 3, y: 4 }, "round trip");

    // field order in the text does not matter
    let point: JPoint = json::from_str(r#"{ "1": 4, "0": 3 }"#).expect("unordered fields");
    assert_eq!(point, JPoint { x: 3, y: 4 }, "unordered round trip");
}

#[test]
fn root_class_is_saved_on_request() {
    let ser = JsonSerializer::with_json(
        Options::default(),
        JsonOptions {
            save_root_class: true,
            ..JsonOptions::default()
        },
    );
    let tree = ser.to_value(&JPoint { x: 1, y: 2 }).expect("serializing must work");
    assert_eq!(tree, json!({ "class": "JPoint", "0": 1, "1": 2 }), "tagged root");

    let point: JPoint = json::from_str(&tree.to_string()).expect("deserializing must work");
    assert_eq!(point, JPoint { x: 1, y: 2 }, "class tag is verified and skipped");
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
#[persist(compact)]
struct JVec2 {
    #[persist(required, alias = "0")]
    x: f32,
    #[persist(required, alias = "1")]
    y: f32,
}

#[test]
fn compact_types_are_arrays() {
    let ser = JsonSerializer::new(Options::default());
    let tree = ser.to_value(&JVec2 { x: 1.5, y: -2.0 }).expect("serializing must work");
    assert_eq!(tree, json!([1.5, -2.0]), "bare positional array");

    let vec2: JVec2 = json::from_str("[1.5, -2.0]").expect("deserializing must work");
    assert_eq!(vec2, JVec2 { x: 1.5, y: -2.0 }, "round trip");
}

#[derive(Debug, Clone, PartialEq, Persist)]
struct JStamp {
    #[persist(required)]
    at: time::OffsetDateTime,
}

impl Default for JStamp {
    fn default() -> Self {
        Self {
            at: time::OffsetDateTime::UNIX_EPOCH,
        }
    }
}

#[test]
fn dates_are_rfc3339_strings() {
    let stamp = JStamp {
        at: time::macros::datetime!(2023-11-05 13:45:30 UTC),
    };
    let text = json::to_string(&stamp).expect("serializing must work");
    assert!(text.contains("2023-11-05T13:45:30"), "readable date: {text}");
    let back: JStamp = json::from_str(&text).expect("deserializing must work");
    assert_eq!(back, stamp, "round trip");
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Persist)]
enum JMode {
    #[default]
    Off,
    Slow = 10,
    Fast,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct JConfig {
    #[persist(required)]
    mode: JMode,
    #[persist(optional)]
    budget: i64,
}

#[test]
fn enum_and_long_rendering_options() {
    let config = JConfig {
        mode: JMode::Fast,
        budget: 9_007_199_254_740_993,
    };

    let plain = JsonSerializer::new(Options::default());
    assert_eq!(
        plain.to_value(&config).expect("serializing must work"),
        json!({ "budget": 9_007_199_254_740_993i64, "mode": 11 }),
        "numeric enum and long"
    );

    let readable = JsonSerializer::with_json(
        Options::default(),
        JsonOptions {
            enum_as_string: true,
            long_as_string: true,
            ..JsonOptions::default()
        },
    );
    let tree = readable.to_value(&config).expect("serializing must work");
    assert_eq!(
        tree,
        json!({ "budget": "9007199254740993", "mode": "Fast" }),
        "readable enum and long"
    );

    let de = JsonDeserializer::new(Options::default());
    let back: JConfig = de.from_value(&tree).expect("deserializing must work");
    assert_eq!(back, config, "both renderings read back");
}

mod slim {
    use super::{Persist, UnknownStorage};

    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "JEvo")]
    pub struct Rec {
        #[persist(required, alias = "a")]
        pub a: i32,
        #[persist(unknown)]
        pub rest: UnknownStorage,
    }
}

#[test]
fn unknown_fields_survive_json() {
    let mut de = JsonDeserializer::new(Options::default());
    de.register::<slim::Rec>();
    let rec: slim::Rec = de
        .from_str(r#"{ "a": 1, "z": [true, "x"] }"#)
        .expect("decode must succeed");
    assert_eq!(rec.a, 1, "declared data survives");
    assert!(rec.rest.get("z").is_some(), "undeclared field is retained");

    let text = json::to_string(&rec).expect("re-serializing must work");
    let tree: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(tree, json!({ "a": 1, "z": [true, "x"] }), "retained field re-emits");
}

#[derive(Debug, Clone, Default, Persist)]
struct JHolder {
    #[persist(optional)]
    payload: Option<Box<dyn PersistObject>>,
}

#[test]
fn polymorphic_fields_are_class_tagged() {
    let holder = JHolder {
        payload: Some(Box::new(JPoint { x: 5, y: 6 })),
    };
    let ser = JsonSerializer::new(Options::default());
    let tree = ser.to_value(&holder).expect("serializing must work");
    assert_eq!(
        tree,
        json!({ "payload": { "class": "JPoint", "0": 5, "1": 6 } }),
        "the declared type says nothing, so the class tag is required"
    );

    let back: JHolder = json::from_str(&tree.to_string()).expect("deserializing must work");
    let payload = back.payload.expect("payload must be present");
    let point = payload
        .as_any()
        .downcast_ref::<JPoint>()
        .expect("payload must come back as its concrete class");
    assert_eq!(*point, JPoint { x: 5, y: 6 }, "payload data");
}

#[test]
fn merge_appends_through_json() {
    #[derive(Debug, Clone, Default, PartialEq, Persist)]
    #[persist(name = "JMergeBag")]
    struct Bag {
        #[persist(optional, merge)]
        items: Vec<i32>,
    }

    let mut bag = Bag { items: vec![1] };
    json::from_str_into(r#"{ "items": [2, 3] }"#, &mut bag).expect("merge must work");
    assert_eq!(bag.items, [1, 2, 3], "merge appends instead of replacing");
}

#[test]
fn pretty_printing_is_optional() {
    let ser = JsonSerializer::with_json(
        Options::default(),
        JsonOptions {
            pretty: true,
            ..JsonOptions::default()
        },
    );
    let text = ser.to_string(&JPoint { x: 1, y: 2 }).expect("serializing must work");
    assert!(text.contains('\n'), "pretty output is multi-line: {text}");
}
