use hyproto_codec::{Codec, MapKey, ProtocolError, Record, Value, Writer};
use hyproto_protocol::enums::{FailOnType, GameMode, InteractionType, WaitForDataFrom};
use hyproto_protocol::interactions::{
    CHARGING_DELAY, CHARGING_INTERACTION, HIT_ENTITY, INTERACTION_FAMILY, INTERACTION_SETTINGS,
    SELECTOR_FAMILY, SELECT_INTERACTION, SIMPLE_INTERACTION, STAB_SELECTOR,
};

fn codec() -> Codec {
    hyproto_protocol::codec().unwrap_or_else(|e| panic!("protocol schema failed: {e}"))
}

fn base(name: &str) -> Record {
    Record::new(name)
        .with("waitForDataFrom", WaitForDataFrom::Client)
        .with("horizontalSpeedMultiplier", Value::Float(1.0))
        .with("runTime", Value::Float(0.25))
        .with("cancelOnItemChange", Value::Bool(true))
}

fn simple(next: i32, failed: i32) -> Record {
    base(SIMPLE_INTERACTION)
        .with("next", Value::Int(next))
        .with("failed", Value::Int(failed))
}

fn charging() -> Record {
    let delay = Record::new(CHARGING_DELAY)
        .with("minDelay", Value::Float(0.1))
        .with("maxDelay", Value::Float(0.5))
        .with("maxTotalDelay", Value::Float(2.0))
        .with("minHealth", Value::Float(0.0))
        .with("maxHealth", Value::Float(1.0));
    base(CHARGING_INTERACTION)
        .with("failed", Value::Int(-1))
        .with("allowIndefiniteHold", Value::Bool(false))
        .with("displayProgress", Value::Bool(true))
        .with("cancelOnOtherClick", Value::Bool(true))
        .with("failOnDamage", Value::Bool(false))
        .with("mouseSensitivityAdjustmentTarget", Value::Float(0.5))
        .with("mouseSensitivityAdjustmentDuration", Value::Float(1.5))
        .with(
            "settings",
            Value::Map(vec![(
                GameMode::Creative.into(),
                Record::new(INTERACTION_SETTINGS)
                    .with("allowSkipOnClick", Value::Bool(true))
                    .into(),
            )]),
        )
        .with(
            "chargedNext",
            Value::Map(vec![
                (MapKey::float(0.0), Value::Int(4)),
                (MapKey::float(1.5), Value::Int(5)),
            ]),
        )
        .with(
            "forks",
            Value::Map(vec![(InteractionType::Secondary.into(), Value::Int(6))]),
        )
        .with("chargingDelay", delay)
}

fn stab() -> Record {
    let mut selector = Record::new(STAB_SELECTOR).with("testLineOfSight", Value::Bool(true));
    let extents = [
        "extendTop",
        "extendBottom",
        "extendLeft",
        "extendRight",
        "yawOffset",
        "pitchOffset",
        "rollOffset",
        "startDistance",
        "endDistance",
    ];
    for (i, name) in extents.iter().enumerate() {
        selector.set(*name, Value::Float(i as f32 * 0.5));
    }
    selector
}

fn select() -> Record {
    base(SELECT_INTERACTION)
        .with("next", Value::Int(2))
        .with("failed", Value::Int(3))
        .with("selector", stab())
        .with("ignoreOwner", Value::Bool(true))
        .with("hitEntity", Value::Int(8))
        .with("failOn", FailOnType::Either)
        .with(
            "hitEntityRules",
            Value::Array(vec![
                Record::new(HIT_ENTITY).with("next", Value::Int(9)).into(),
                Record::new(HIT_ENTITY)
                    .with("next", Value::Int(10))
                    .with("matchers", Value::Array(vec![Value::Int(1), Value::Int(2)]))
                    .into(),
            ]),
        )
}

fn tagged(codec: &Codec, record: &Record) -> Vec<u8> {
    let mut writer = Writer::new();
    let written = codec
        .encode_with_tag(&mut writer, INTERACTION_FAMILY, record)
        .unwrap_or_else(|e| panic!("encode {} failed: {e}", record.name));
    let bytes = writer.flush();
    assert_eq!(written, bytes.len(), "{} written length", record.name);
    bytes
}

#[test]
fn family_round_trip_matrix() {
    let codec = codec();
    let cases: Vec<(Record, u8)> = vec![(simple(1, -1), 1), (charging(), 9), (select(), 20)];
    for (record, tag) in cases {
        let name = &record.name;
        let bytes = tagged(&codec, &record);
        assert_eq!(bytes[0], tag, "{name} tag byte");
        let size = codec.compute_size_with_tag(INTERACTION_FAMILY, &record);
        assert_eq!(size.unwrap(), bytes.len(), "{name} size");
        let span = codec.variant_bytes_consumed(&bytes, 0, INTERACTION_FAMILY);
        assert_eq!(span.unwrap(), bytes.len(), "{name} span");
        codec
            .validate_variant(&bytes, 0, INTERACTION_FAMILY)
            .unwrap_or_else(|e| panic!("{name} should validate: {e}"));
        let decoded = codec.decode_variant(&bytes, 0, INTERACTION_FAMILY);
        assert_eq!(decoded.unwrap(), record);
    }
}

#[test]
fn charging_delay_sits_at_the_end_of_the_fixed_block() {
    let codec = codec();
    let bytes = codec
        .encode_to_vec(&charging())
        .unwrap_or_else(|e| panic!("encode failed: {e}"));
    // settings, chargedNext, forks and chargingDelay.
    assert_eq!(bytes[0], 0b1110_0010);
    assert_eq!(&bytes[27..31], &0.1f32.to_le_bytes());
    assert_eq!(&bytes[43..47], &1.0f32.to_le_bytes());

    let mut without = charging();
    without.clear("chargingDelay");
    let bytes = codec
        .encode_to_vec(&without)
        .unwrap_or_else(|e| panic!("encode failed: {e}"));
    assert_eq!(bytes[0], 0b0110_0010);
    assert!(bytes[27..47].iter().all(|b| *b == 0));
    let decoded = codec.decode(&bytes, 0, CHARGING_INTERACTION).unwrap();
    assert_eq!(decoded, without);
}

#[test]
fn select_carries_a_tagged_selector() {
    let codec = codec();
    let record = select();
    let bytes = codec
        .encode_to_vec(&record)
        .unwrap_or_else(|e| panic!("encode failed: {e}"));
    // Only the selector and hitEntityRules are set among the nullables.
    assert_eq!(bytes[0], 0b0110_0000);
    let selector_slot = i32::from_le_bytes([bytes[45], bytes[46], bytes[47], bytes[48]]);
    let selector_at = 53 + selector_slot as usize;
    assert_eq!(bytes[selector_at], 4, "StabSelector tag");
    let span = codec.variant_bytes_consumed(&bytes, selector_at, SELECTOR_FAMILY);
    assert_eq!(span.unwrap(), 1 + 37);
    let decoded = codec.decode_variant(&bytes, selector_at, SELECTOR_FAMILY);
    assert_eq!(decoded.unwrap(), stab());
}

#[test]
fn interaction_rejection_matrix() {
    let codec = codec();
    let mut missing_failed = simple(1, 2);
    missing_failed.clear("failed");

    let cases: Vec<(Record, ProtocolError)> = vec![
        (
            missing_failed,
            ProtocolError::MissingField {
                record: SIMPLE_INTERACTION.into(),
                field: "failed".into(),
            },
        ),
        (
            simple(1, 2).with("selector", stab()),
            ProtocolError::UnknownField {
                record: SIMPLE_INTERACTION.into(),
                field: "selector".into(),
            },
        ),
        (
            charging().with(
                "forks",
                Value::Map(vec![
                    (InteractionType::Use.into(), Value::Int(1)),
                    (InteractionType::Use.into(), Value::Int(2)),
                ]),
            ),
            ProtocolError::DuplicateKey {
                field: "forks".into(),
                key: "#5".into(),
            },
        ),
        (
            select().with("selector", simple(0, 0)),
            ProtocolError::UnknownVariant {
                family: SELECTOR_FAMILY.into(),
                record: SIMPLE_INTERACTION.into(),
            },
        ),
        (
            base(STAB_SELECTOR),
            ProtocolError::UnknownVariant {
                family: INTERACTION_FAMILY.into(),
                record: STAB_SELECTOR.into(),
            },
        ),
    ];
    for (record, expected) in cases {
        let size = codec.compute_size_with_tag(INTERACTION_FAMILY, &record);
        assert_eq!(size.unwrap_err(), expected, "{}", record.name);
    }
}

#[test]
fn unknown_interaction_tag() {
    let codec = codec();
    let mut bytes = tagged(&codec, &simple(1, 2));
    bytes[0] = 2;
    let expected = ProtocolError::UnknownPolymorphicType {
        family: INTERACTION_FAMILY.into(),
        tag: 2,
    };
    let decoded = codec.decode_variant(&bytes, 0, INTERACTION_FAMILY);
    assert_eq!(decoded.unwrap_err(), expected);
    let validated = codec.validate_variant(&bytes, 0, INTERACTION_FAMILY);
    assert_eq!(validated.unwrap_err().cause(), &expected);
}
