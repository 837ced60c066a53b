//! Surrogate substitution: unconditional and conditional conversion,
//! and chain rejection.

// dev-dependency shared across the test targets
use serde_json as _;
use time as _;
use pomelo::error::Error;
use pomelo::meta::Meta;
use pomelo::{Options, Persist, binary, json};

#[derive(Debug, Clone, Default, PartialEq, Persist)]
#[persist(surrogate(ty = "u32", to = "pack", from = "unpack"))]
struct Color {
    r: u8,
    g: u8,
    b: u8,
}

impl Color {
    fn pack(&self) -> u32 {
        u32::from(self.r) << 16 | u32::from(self.g) << 8 | u32::from(self.b)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn unpack(packed: u32) -> Self {
        Self {
            r: (packed >> 16) as u8,
            g: (packed >> 8) as u8,
            b: packed as u8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Swatch {
    #[persist(required)]
    name: String,
    #[persist(optional)]
    main: Color,
    #[persist(optional)]
    accent: Option<Color>,
}

#[test]
fn unconditional_surrogate_round_trips() {
    let color = Color { r: 1, g: 2, b: 3 };
    assert_eq!(Color::unpack(color.pack()), color, "conversion idempotence");

    // the wire shape is the surrogate's: one rough-tagged uint
    let bytes = binary::to_vec(&color).expect("serializing must work");
    assert_eq!(bytes, [6, 3, 2, 1, 0], "uint wire form");
    let back: Color = binary::from_slice(&bytes).expect("deserializing must work");
    assert_eq!(back, color, "round trip");

    let swatch = Swatch {
        name: "sea".to_owned(),
        main: Color { r: 9, g: 8, b: 7 },
        accent: Some(Color { r: 0, g: 0, b: 1 }),
    };
    let bytes = binary::to_vec(&swatch).expect("serializing must work");
    let back: Swatch = binary::from_slice(&bytes).expect("deserializing must work");
    assert_eq!(back, swatch, "field round trip through the surrogate");

    let text = json::to_string(&swatch).expect("serializing must work");
    let back: Swatch = json::from_str(&text).expect("deserializing must work");
    assert_eq!(back, swatch, "JSON round trip through the surrogate");
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
#[persist(name = "CondVal", surrogate(ty = "Halved", to = "halve", from = "double", only_if = "is_even"))]
struct CondVal {
    #[persist(required)]
    n: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct Halved {
    #[persist(required)]
    half: i32,
}

impl CondVal {
    fn is_even(&self) -> bool {
        self.n % 2 == 0
    }

    fn halve(&self) -> Halved {
        Halved { half: self.n / 2 }
    }

    fn double(surrogate: Halved) -> Self {
        Self {
            n: surrogate.half * 2,
        }
    }
}

#[test]
fn conditional_surrogate_dispatches_on_class() {
    // odd values travel as themselves
    let odd = CondVal { n: 7 };
    let bytes = binary::to_vec(&odd).expect("serializing must work");
    let back: CondVal = binary::from_slice(&bytes).expect("deserializing must work");
    assert_eq!(back, odd, "identity arm");

    // even values travel as the surrogate record
    let even = CondVal { n: 10 };
    let bytes = binary::to_vec(&even).expect("serializing must work");
    let back: CondVal = binary::from_slice(&bytes).expect("deserializing must work");
    assert_eq!(back, even, "surrogate arm");
    let tag = b"Halved";
    assert!(
        bytes.windows(tag.len()).any(|window| window == tag),
        "the surrogate class definition is on the wire"
    );

    let text = json::to_string(&even).expect("serializing must work");
    assert!(text.contains("Halved"), "JSON carries the class tag: {text}");
    let back: CondVal = json::from_str(&text).expect("deserializing must work");
    assert_eq!(back, even, "JSON surrogate arm");
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
#[persist(surrogate(ty = "ChainMid", to = "to_mid", from = "from_mid"))]
struct ChainHead {
    n: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
#[persist(surrogate(ty = "ChainTail", to = "to_tail", from = "from_tail"))]
struct ChainMid {
    n: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Persist)]
struct ChainTail {
    #[persist(required)]
    n: i32,
}

impl ChainHead {
    fn to_mid(&self) -> ChainMid {
        ChainMid { n: self.n }
    }

    fn from_mid(mid: ChainMid) -> Self {
        Self { n: mid.n }
    }
}

impl ChainMid {
    fn to_tail(&self) -> ChainTail {
        ChainTail { n: self.n }
    }

    fn from_tail(tail: ChainTail) -> Self {
        Self { n: tail.n }
    }
}

#[test]
fn surrogate_chains_are_rejected_at_extraction() {
    let options = Options::default();
    Meta::get::<ChainHead>(&options).expect("a single hop is fine");

    // ChainMid is now the target of a conversion; declaring its own
    // makes it both source and target
    let err = Meta::get::<ChainMid>(&options).expect_err("chains must be rejected");
    assert!(
        matches!(err, Error::SchemaDefinition { .. }),
        "incorrect error kind: {err:?}"
    );
}
