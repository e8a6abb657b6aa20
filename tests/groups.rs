use protoreef::decode::DecodeError;
use protoreef::prelude::*;

fn group_context() -> Context
{
    Context::parse(&[r#"
        message Outer {
            optional group Result = 1 {
                required int32 x = 1;
            }
        }
    "#])
    .unwrap()
}

#[test]
fn group_wire_bytes()
{
    let ctx = group_context();
    let outer = ctx.get_message("Outer").unwrap();
    let result = ctx.get_message("Outer.Result").unwrap();
    assert!(result.group);

    let inner = result
        .value_from(&ctx, vec![("x", Value::Int32(5))])
        .unwrap();
    let value = outer
        .value_from(&ctx, vec![("result", Value::Message(Box::new(inner)))])
        .unwrap();

    // Start tag, the inner field, end tag with the matching id.
    let encoded = value.encode(&ctx).unwrap();
    assert_eq!(&encoded[..], &b"\x0b\x08\x05\x0c"[..]);

    let decoded = outer.decode(&encoded, &ctx).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn unknown_group_is_skipped()
{
    // The receiver knows nothing about field 1; the whole group is skipped
    // and the known field after it still decodes.
    let ctx = Context::parse(&[r#"
        message Receiver {
            optional int32 known = 2;
        }
    "#])
    .unwrap();

    let receiver = ctx.get_message("Receiver").unwrap();
    let decoded = receiver
        .decode(b"\x0b\x08\x05\x0c\x10\x07", &ctx)
        .unwrap();
    assert_eq!(decoded.get(&ctx, "known"), Some(&Value::Int32(7)));
}

#[test]
fn unknown_nested_groups_are_skipped()
{
    let ctx = Context::parse(&[r#"
        message Receiver {
            optional int32 known = 2;
        }
    "#])
    .unwrap();

    // Group 1 contains group 3, which contains a varint field.
    let payload = b"\x0b\x1b\x08\x05\x1c\x0c\x10\x07";
    let receiver = ctx.get_message("Receiver").unwrap();
    let decoded = receiver.decode(payload, &ctx).unwrap();
    assert_eq!(decoded.get(&ctx, "known"), Some(&Value::Int32(7)));
}

#[test]
fn group_end_mismatch_is_fatal()
{
    let ctx = group_context();
    let outer = ctx.get_message("Outer").unwrap();

    // Start of group 1 terminated by the end tag of group 2.
    match outer.decode(b"\x0b\x08\x05\x14", &ctx) {
        Err(DecodeError::GroupEndMismatch { expected, actual }) => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("Expected a group end mismatch: {:?}", other),
    }
}

#[test]
fn unterminated_group_is_fatal()
{
    let ctx = group_context();
    let outer = ctx.get_message("Outer").unwrap();
    assert!(outer.decode(b"\x0b\x08\x05", &ctx).is_err());
}

#[test]
fn required_fields_enforced_inside_groups()
{
    let ctx = group_context();
    let outer = ctx.get_message("Outer").unwrap();

    // Group 1 opens and closes without the required x field.
    assert!(matches!(
        outer.decode(b"\x0b\x0c", &ctx),
        Err(DecodeError::MissingRequiredFields { .. })
    ));
}
