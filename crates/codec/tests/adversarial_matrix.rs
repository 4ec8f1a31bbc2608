use hyproto_codec::{
    Codec, CodecOptions, FamilyDef, FieldType, KeyType, MapKey, PathSegment, ProtocolError, Reader,
    Record, RecordDef, SchemaSet, Value, VarIntError,
};

fn schema_with_label_cap(label_max: usize) -> SchemaSet {
    let scores = FieldType::map(KeyType::string(), FieldType::Int, 8);
    let numbers = FieldType::array(FieldType::Int, 1000);
    let color = FieldType::enumeration("Color");
    SchemaSet::builder()
        .enumeration("Color", 3)
        .record(
            RecordDef::new("Inner")
                .required("id", FieldType::Int)
                .optional("label", FieldType::string(16)),
        )
        .record(
            RecordDef::new("Sample")
                .optional("text", FieldType::string(8))
                .optional("child", FieldType::record("Inner")),
        )
        .record(RecordDef::new("Named").required("name", FieldType::string(16)))
        .record(RecordDef::new("Colored").required("color", color))
        .record(RecordDef::new("Scores").required("scores", scores))
        .record(RecordDef::new("Numbers").required("numbers", numbers))
        .record(
            RecordDef::new("Two")
                .optional("a", FieldType::string(8))
                .optional("b", FieldType::string(8)),
        )
        .record(
            RecordDef::new("Tree")
                .optional("label", FieldType::string(label_max))
                .optional("children", FieldType::array(FieldType::record("Tree"), 4)),
        )
        .record(RecordDef::new("Empty"))
        .record(RecordDef::new("Holder").optional("inner", FieldType::record("Empty")))
        .record(RecordDef::new("Circle").required("radius", FieldType::Float))
        .record(RecordDef::new("Wrapper").required("shape", FieldType::variant("Shape")))
        .family(FamilyDef::new("Shape").variant(0, "Circle"))
        .build()
        .unwrap_or_else(|e| panic!("schema build failed: {e}"))
}

fn codec() -> Codec {
    Codec::new(schema_with_label_cap(64))
}

/// Sample with `text` present at relative offset 0, followed by `payload`.
fn sample_with_text(payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x01, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff];
    bytes.extend_from_slice(payload);
    bytes
}

fn decode_err(codec: &Codec, bytes: &[u8], record: &str) -> ProtocolError {
    let err = codec
        .decode(bytes, 0, record)
        .err()
        .unwrap_or_else(|| panic!("{record} decode of {bytes:02x?} should fail"));
    let validated = codec
        .validate(bytes, 0, record)
        .err()
        .unwrap_or_else(|| panic!("{record} validate of {bytes:02x?} should fail"));
    assert_eq!(validated.cause(), &err, "validate and decode disagree");
    let measured = codec
        .bytes_consumed(bytes, 0, record)
        .err()
        .unwrap_or_else(|| panic!("{record} bytes_consumed of {bytes:02x?} should fail"));
    assert_eq!(measured, err, "bytes_consumed and decode disagree");
    err
}

fn tree(depth: usize) -> Record {
    let mut node = Record::new("Tree").with("label", "leaf");
    for _ in 0..depth {
        node = Record::new("Tree").with("children", Value::Array(vec![node.into()]));
    }
    node
}

#[test]
fn malformed_sample_matrix() {
    let codec = codec();
    let text = |s: &str| s.to_string();
    let cases: Vec<(Vec<u8>, ProtocolError)> = vec![
        (
            vec![0x00, 0xff],
            ProtocolError::BufferTooSmall {
                field: text("Sample"),
                required: 9,
                available: 2,
            },
        ),
        (
            vec![0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ProtocolError::InvalidOffset {
                field: text("text"),
                offset: -1,
            },
        ),
        (
            vec![0x01, 0xfb, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00],
            ProtocolError::InvalidOffset {
                field: text("text"),
                offset: -5,
            },
        ),
        (
            vec![0x01, 10, 0, 0, 0, 0xff, 0xff, 0xff, 0xff],
            ProtocolError::OffsetOutOfBounds {
                field: text("text"),
                position: 19,
                extent: 9,
            },
        ),
        (
            sample_with_text(&[]),
            ProtocolError::OffsetOutOfBounds {
                field: text("text"),
                position: 9,
                extent: 9,
            },
        ),
        (
            sample_with_text(&[0xff, 0xff, 0xff, 0xff, 0x0f]),
            ProtocolError::NegativeLength {
                field: text("text"),
                length: -1,
            },
        ),
        (
            sample_with_text(&[9]),
            ProtocolError::StringTooLong {
                field: text("text"),
                length: 9,
                max: 8,
            },
        ),
        (
            sample_with_text(&[5, b'a', b'b']),
            ProtocolError::BufferTooSmall {
                field: text("text"),
                required: 15,
                available: 12,
            },
        ),
        (
            sample_with_text(&[0x80, 0x80, 0x80, 0x80, 0x80]),
            ProtocolError::InvalidVarInt {
                field: text("text"),
                source: VarIntError::TooLong { position: 9 },
            },
        ),
        (
            sample_with_text(&[0xff, 0xff, 0xff, 0xff, 0x1f]),
            ProtocolError::InvalidVarInt {
                field: text("text"),
                source: VarIntError::Overflow { position: 9 },
            },
        ),
        (
            sample_with_text(&[0x80]),
            ProtocolError::InvalidVarInt {
                field: text("text"),
                source: VarIntError::Truncated { position: 9 },
            },
        ),
        (
            sample_with_text(&[2, 0xc3, 0x28]),
            ProtocolError::InvalidUtf8 {
                field: text("text"),
            },
        ),
        (
            vec![0x02, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0x00, 7],
            ProtocolError::BufferTooSmall {
                field: text("Inner"),
                required: 9,
                available: 2,
            },
        ),
    ];
    for (bytes, expected) in cases {
        assert_eq!(
            decode_err(&codec, &bytes, "Sample"),
            expected,
            "input {bytes:02x?}"
        );
    }
}

#[test]
fn malformed_field_kind_matrix() {
    let codec = codec();
    let cases: Vec<(&str, Vec<u8>, ProtocolError)> = vec![
        (
            "Named",
            vec![0xff, 0xff, 0xff, 0xff],
            ProtocolError::MissingField {
                record: "Named".into(),
                field: "name".into(),
            },
        ),
        (
            "Colored",
            vec![3],
            ProtocolError::InvalidEnumValue {
                field: "color".into(),
                value: 3,
                count: 3,
            },
        ),
        (
            "Scores",
            vec![0, 0, 0, 0, 2, 1, b'a', 1, 0, 0, 0, 1, b'a', 2, 0, 0, 0],
            ProtocolError::DuplicateKey {
                field: "scores".into(),
                key: "\"a\"".into(),
            },
        ),
        (
            "Scores",
            vec![0, 0, 0, 0, 9],
            ProtocolError::DictionaryTooLarge {
                field: "scores".into(),
                count: 9,
                max: 8,
            },
        ),
        (
            "Numbers",
            vec![0, 0, 0, 0, 100],
            ProtocolError::BufferTooSmall {
                field: "numbers".into(),
                required: 405,
                available: 5,
            },
        ),
        (
            "Numbers",
            vec![0, 0, 0, 0, 0xe9, 0x07],
            ProtocolError::ArrayTooLong {
                field: "numbers".into(),
                count: 1001,
                max: 1000,
            },
        ),
        (
            "Wrapper",
            vec![0, 0, 0, 0, 5],
            ProtocolError::UnknownPolymorphicType {
                family: "Shape".into(),
                tag: 5,
            },
        ),
    ];
    for (record, bytes, expected) in cases {
        assert_eq!(
            decode_err(&codec, &bytes, record),
            expected,
            "{record} {bytes:02x?}"
        );
    }
}

#[test]
fn written_extent_bounds_offsets() {
    let codec = codec();
    // Slot points at byte 9, which exists in the slice but lies past the
    // populated extent.
    let bytes = sample_with_text(&[2, b'o', b'k']);
    let reader = Reader::with_extent(&bytes, 9).unwrap_or_else(|e| panic!("extent rejected: {e}"));
    assert_eq!(
        codec.decode(reader, 0, "Sample").unwrap_err(),
        ProtocolError::OffsetOutOfBounds {
            field: "text".into(),
            position: 9,
            extent: 9,
        }
    );
    let full = Reader::new(&bytes);
    assert_eq!(codec.bytes_consumed(full, 0, "Sample").unwrap(), 12);
}

#[test]
fn offsets_may_point_backwards() {
    let codec = codec();
    // `a` owns the first slot but its payload sits after `b`'s.
    let bytes = vec![
        0b11, 3, 0, 0, 0, 0, 0, 0, 0, 2, b'y', b'y', 3, b'x', b'x', b'x',
    ];
    let decoded = codec
        .decode(&bytes, 0, "Two")
        .unwrap_or_else(|e| panic!("backwards offset should decode: {e}"));
    assert_eq!(decoded, Record::new("Two").with("a", "xxx").with("b", "yy"));
    assert_eq!(codec.bytes_consumed(&bytes, 0, "Two").unwrap(), 16);
    codec
        .validate(&bytes, 0, "Two")
        .unwrap_or_else(|e| panic!("backwards offset should validate: {e}"));

    // Encoding always lays payloads out in slot order.
    let canonical = codec
        .encode_to_vec(&decoded)
        .unwrap_or_else(|e| panic!("encode failed: {e}"));
    let mut expected = vec![0b11, 0, 0, 0, 0, 4, 0, 0, 0];
    expected.extend_from_slice(b"\x03xxx\x02yy");
    assert_eq!(canonical, expected);
    assert_eq!(codec.decode(&canonical, 0, "Two").unwrap(), decoded);
}

#[test]
fn empty_record_written_last_is_rejected_on_read() {
    let codec = codec();
    let holder = Record::new("Holder").with("inner", Record::new("Empty"));
    let bytes = codec
        .encode_to_vec(&holder)
        .unwrap_or_else(|e| panic!("encode failed: {e}"));
    assert_eq!(bytes, [0x01, 0, 0, 0, 0]);
    let expected = ProtocolError::OffsetOutOfBounds {
        field: "inner".into(),
        position: 5,
        extent: 5,
    };
    assert_eq!(decode_err(&codec, &bytes, "Holder"), expected);
}

#[test]
fn unknown_variant_tag_is_rejected() {
    let codec = codec();
    let cases = [
        (vec![0x05], 5i64),
        (vec![0xff, 0xff, 0xff, 0xff, 0x0f], 4_294_967_295),
    ];
    for (bytes, tag) in cases {
        let expected = ProtocolError::UnknownPolymorphicType {
            family: "Shape".into(),
            tag,
        };
        let decoded = codec.decode_variant(&bytes, 0, "Shape");
        let measured = codec.variant_bytes_consumed(&bytes, 0, "Shape");
        let validated = codec.validate_variant(&bytes, 0, "Shape");
        assert_eq!(decoded.unwrap_err(), expected);
        assert_eq!(measured.unwrap_err(), expected);
        assert_eq!(validated.unwrap_err().cause(), &expected);
    }
}

#[test]
fn validation_reports_nested_path() {
    let codec = codec();
    let bytes = vec![0x02, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0x00, 7];
    let err = codec
        .validate(&bytes, 0, "Sample")
        .err()
        .unwrap_or_else(|| panic!("truncated child should fail"));
    assert_eq!(
        err.path(),
        [PathSegment::Field {
            record: "Sample".into(),
            field: "child".into(),
        }]
    );
    assert_eq!(
        err.to_string(),
        "Invalid Sample in child: buffer too small for Inner: expected at least 9 bytes, 2 available"
    );
}

#[test]
fn validation_reports_array_index() {
    let loose = codec();
    let strict = Codec::new(schema_with_label_cap(4));
    let record = Record::new("Tree").with(
        "children",
        Value::Array(vec![
            Record::new("Tree").with("label", "ok").into(),
            Record::new("Tree").with("label", "too long").into(),
        ]),
    );
    let bytes = loose
        .encode_to_vec(&record)
        .unwrap_or_else(|e| panic!("encode failed: {e}"));
    loose
        .validate(&bytes, 0, "Tree")
        .unwrap_or_else(|e| panic!("loose validate failed: {e}"));

    let err = strict
        .validate(&bytes, 0, "Tree")
        .err()
        .unwrap_or_else(|| panic!("strict validate should fail"));
    assert_eq!(
        err.to_string(),
        "Invalid Tree in children[1].label: label exceeds max length 4 (got 8)"
    );
    assert_eq!(
        strict.decode(&bytes, 0, "Tree").unwrap_err(),
        ProtocolError::StringTooLong {
            field: "label".into(),
            length: 8,
            max: 4,
        }
    );
}

#[test]
fn depth_budget_fails_closed_everywhere() {
    let unlimited = codec();
    let limited = Codec::with_options(
        schema_with_label_cap(64),
        CodecOptions {
            max_depth: 2,
            ..CodecOptions::default()
        },
    );
    let exceeded = ProtocolError::DepthExceeded { max_depth: 2 };

    let shallow = tree(2);
    let bytes = limited
        .encode_to_vec(&shallow)
        .unwrap_or_else(|e| panic!("depth 2 should encode: {e}"));
    assert_eq!(limited.decode(&bytes, 0, "Tree").unwrap(), shallow);

    let deep = tree(3);
    assert_eq!(limited.encode_to_vec(&deep).unwrap_err(), exceeded);
    assert_eq!(limited.compute_size(&deep).unwrap_err(), exceeded);

    let bytes = unlimited
        .encode_to_vec(&deep)
        .unwrap_or_else(|e| panic!("default budget should encode: {e}"));
    assert_eq!(limited.decode(&bytes, 0, "Tree").unwrap_err(), exceeded);
    let measured = limited.bytes_consumed(&bytes, 0, "Tree");
    assert_eq!(measured.unwrap_err(), exceeded);
    let validated = limited.validate(&bytes, 0, "Tree");
    assert_eq!(validated.unwrap_err().cause(), &exceeded);
}

#[test]
fn encode_rejects_what_decode_would_reject() {
    let codec = codec();
    let cases: Vec<(Record, ProtocolError)> = vec![
        (
            Record::new("Named"),
            ProtocolError::MissingField {
                record: "Named".into(),
                field: "name".into(),
            },
        ),
        (
            Record::new("Named").with("name", "x").with("nickname", "y"),
            ProtocolError::UnknownField {
                record: "Named".into(),
                field: "nickname".into(),
            },
        ),
        (
            Record::new("Colored").with("color", Value::Enum(7)),
            ProtocolError::InvalidEnumValue {
                field: "color".into(),
                value: 7,
                count: 3,
            },
        ),
        (
            Record::new("Named").with("name", Value::Int(1)),
            ProtocolError::TypeMismatch {
                field: "name".into(),
                expected: "string",
            },
        ),
        (
            Record::new("Scores").with(
                "scores",
                Value::Map(vec![
                    (MapKey::Str("a".into()), Value::Int(1)),
                    (MapKey::Str("a".into()), Value::Int(2)),
                ]),
            ),
            ProtocolError::DuplicateKey {
                field: "scores".into(),
                key: "\"a\"".into(),
            },
        ),
        (
            Record::new("Wrapper").with("shape", Record::new("Named").with("name", "x")),
            ProtocolError::UnknownVariant {
                family: "Shape".into(),
                record: "Named".into(),
            },
        ),
        (
            Record::new("Mystery"),
            ProtocolError::UnknownType {
                name: "Mystery".into(),
            },
        ),
    ];
    for (record, expected) in cases {
        let name = &record.name;
        let size = codec.compute_size(&record);
        assert_eq!(size.unwrap_err(), expected, "{name}");
        let encoded = codec.encode_to_vec(&record);
        assert_eq!(encoded.unwrap_err(), expected, "{name}");
    }
}
