use bytes::Bytes;
use protoreef::prelude::*;

#[test]
fn negative_int32_occupies_ten_bytes()
{
    let ctx = Context::parse(&[r#"
        message M {
            optional int32 v = 1;
        }
    "#])
    .unwrap();

    let m = ctx.get_message("M").unwrap();
    let value = m.value_from(&ctx, vec![("v", Value::Int32(-1))]).unwrap();

    let encoded = value.encode(&ctx).unwrap();
    assert_eq!(
        &encoded[..],
        &b"\x08\xff\xff\xff\xff\xff\xff\xff\xff\xff\x01"[..]
    );

    let decoded = m.decode(&encoded, &ctx).unwrap();
    assert_eq!(decoded.get(&ctx, "v"), Some(&Value::Int32(-1)));
}

#[test]
fn all_scalar_types_roundtrip()
{
    let ctx = Context::parse(&[r#"
        message Message {
            optional string s = 1;
            optional int32 small = 2;
            optional int64 large = 3;
            optional sint32 signed = 4;
            optional sint64 signed64 = 5;
            optional fixed32 f32 = 6;
            optional fixed64 f64 = 7;
            optional sfixed32 sf32 = 8;
            optional sfixed64 sf64 = 9;
            optional uint32 u32 = 10;
            optional uint64 u64 = 11;
            optional float flt = 12;
            optional double dbl = 13;
            optional bool b = 14;
            optional bytes raw = 15;
            optional Message child = 20;
        }
    "#])
    .unwrap();

    let message = ctx.get_message("Message").unwrap();

    let child = message
        .value_from(&ctx, vec![("s", Value::String("child".to_string()))])
        .unwrap();

    let original = message
        .value_from(
            &ctx,
            vec![
                ("s", Value::String("parent".to_string())),
                ("small", Value::Int32(-123)),
                ("large", Value::Int64(-12356)),
                ("signed", Value::SInt32(-123)),
                ("signed64", Value::SInt64(-3_000_000_000)),
                ("f32", Value::Fixed32(12356)),
                ("f64", Value::Fixed64(12356)),
                ("sf32", Value::SFixed32(-12356)),
                ("sf64", Value::SFixed64(-12356)),
                ("u32", Value::UInt32(4_000_000_000)),
                ("u64", Value::UInt64(12_000_000_000_000_000_000)),
                ("flt", Value::Float(1.5)),
                ("dbl", Value::Double(1.2345)),
                ("b", Value::Bool(true)),
                ("raw", Value::Bytes(Bytes::from_static(b"\x00\x01\x02"))),
                ("child", Value::Message(Box::new(child))),
            ],
        )
        .unwrap();

    let encoded = original.encode(&ctx).unwrap();
    let decoded = message.decode(&encoded, &ctx).unwrap();
    let encoded_again = decoded.encode(&ctx).unwrap();

    assert_eq!(decoded, original);
    assert_eq!(encoded, encoded_again);
}

#[test]
fn repeated_strings_roundtrip()
{
    let ctx = Context::parse(&[r#"
        message M {
            repeated string names = 1;
        }
    "#])
    .unwrap();

    let m = ctx.get_message("M").unwrap();
    let mut value = m.new_value(&ctx).unwrap();
    for name in &["first", "second", "third"] {
        value
            .add(&ctx, "names", Value::String(name.to_string()))
            .unwrap();
    }

    let encoded = value.encode(&ctx).unwrap();
    let decoded = m.decode(&encoded, &ctx).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn unknown_fields_are_skipped()
{
    // The sender's schema has more fields than the receiver's; the receiver
    // still sees its own fields.
    let sender_ctx = Context::parse(&[r#"
        message Wide {
            optional int32 known = 1;
            optional int64 extra_varint = 2;
            optional fixed32 extra_f32 = 3;
            optional fixed64 extra_f64 = 4;
            optional string extra_str = 5;
            optional group Extra = 6 {
                optional int32 nested = 1;
            }
        }
    "#])
    .unwrap();

    let receiver_ctx = Context::parse(&[r#"
        message Wide {
            optional int32 known = 1;
        }
    "#])
    .unwrap();

    let wide = sender_ctx.get_message("Wide").unwrap();
    let extra = sender_ctx.get_message("Wide.Extra").unwrap();

    let group_value = extra
        .value_from(&sender_ctx, vec![("nested", Value::Int32(9))])
        .unwrap();
    let value = wide
        .value_from(
            &sender_ctx,
            vec![
                ("known", Value::Int32(1)),
                ("extra_varint", Value::Int64(123456789)),
                ("extra_f32", Value::Fixed32(42)),
                ("extra_f64", Value::Fixed64(42)),
                ("extra_str", Value::String("skip me".to_string())),
                ("extra", Value::Message(Box::new(group_value))),
            ],
        )
        .unwrap();

    let payload = value.encode(&sender_ctx).unwrap();

    let receiver = receiver_ctx.get_message("Wide").unwrap();
    let decoded = receiver.decode(&payload, &receiver_ctx).unwrap();
    assert_eq!(decoded.get(&receiver_ctx, "known"), Some(&Value::Int32(1)));
}

#[test]
fn later_singular_occurrence_wins()
{
    let ctx = Context::parse(&[r#"
        message M {
            optional int32 v = 1;
        }
    "#])
    .unwrap();

    let m = ctx.get_message("M").unwrap();
    let decoded = m.decode(b"\x08\x01\x08\x02", &ctx).unwrap();
    assert_eq!(decoded.get(&ctx, "v"), Some(&Value::Int32(2)));
}

#[test]
fn truncated_input_is_an_error()
{
    let ctx = Context::parse(&[r#"
        message M {
            optional string s = 1;
        }
    "#])
    .unwrap();

    let m = ctx.get_message("M").unwrap();

    // Length prefix of 5, three bytes of payload.
    assert!(m.decode(b"\x0a\x05abc", &ctx).is_err());

    // Varint with its continuation bit set forever.
    assert!(m.decode(b"\x08\x80\x80", &ctx).is_err());
}

#[test]
fn to_raw_deep_copies()
{
    let ctx = Context::parse(&[r#"
        message Inner {
            optional int32 x = 1;
        }

        message Outer {
            optional Inner inner = 1;
            repeated int32 vs = 2;
        }
    "#])
    .unwrap();

    let inner = ctx.get_message("Inner").unwrap();
    let outer = ctx.get_message("Outer").unwrap();

    let inner_value = inner.value_from(&ctx, vec![("x", Value::Int32(5))]).unwrap();
    let mut value = outer
        .value_from(&ctx, vec![("inner", Value::Message(Box::new(inner_value)))])
        .unwrap();
    value
        .set_all(&ctx, "vs", vec![Value::Int32(1), Value::Int32(2)])
        .unwrap();

    let raw = value.to_raw(&ctx, false);

    match raw.get("inner") {
        Some(RawValue::Message(fields)) => {
            assert_eq!(fields.get("x"), Some(&RawValue::Value(Value::Int32(5))));
        }
        other => panic!("Expected a nested message: {:?}", other),
    }

    assert_eq!(
        raw.get("vs"),
        Some(&RawValue::List(vec![
            RawValue::Value(Value::Int32(1)),
            RawValue::Value(Value::Int32(2)),
        ]))
    );
}
