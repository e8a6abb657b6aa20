use protoreef::prelude::*;

#[test]
fn delimited_framing()
{
    let ctx = Context::parse(&[r#"
        message M {
            optional int32 v = 1;
        }
    "#])
    .unwrap();

    let m = ctx.get_message("M").unwrap();

    let mut stream = Vec::new();
    for n in 1..=3 {
        let value = m.value_from(&ctx, vec![("v", Value::Int32(n))]).unwrap();
        stream.extend_from_slice(&value.encode_delimited(&ctx).unwrap());
    }

    // Each message is a two-byte payload behind a one-byte length.
    assert_eq!(
        &stream[..],
        &b"\x02\x08\x01\x02\x08\x02\x02\x08\x03"[..]
    );

    let mut slice = &stream[..];
    for n in 1..=3 {
        let decoded = m.decode_delimited(&mut slice, &ctx).unwrap();
        assert_eq!(decoded.get(&ctx, "v"), Some(&Value::Int32(n)));
    }
    assert!(slice.is_empty());
}

#[test]
fn delimited_empty_message()
{
    let ctx = Context::parse(&[r#"
        message Empty {}
    "#])
    .unwrap();

    let empty = ctx.get_message("Empty").unwrap();
    let value = empty.new_value(&ctx).unwrap();

    let framed = value.encode_delimited(&ctx).unwrap();
    assert_eq!(&framed[..], &b"\x00"[..]);

    let mut slice = &framed[..];
    let decoded = empty.decode_delimited(&mut slice, &ctx).unwrap();
    assert_eq!(decoded, value);
    assert!(slice.is_empty());
}

#[test]
fn delimited_length_overrun_is_an_error()
{
    let ctx = Context::parse(&[r#"
        message M {
            optional int32 v = 1;
        }
    "#])
    .unwrap();

    let m = ctx.get_message("M").unwrap();
    let mut slice: &[u8] = b"\x05\x08\x01";
    assert!(m.decode_delimited(&mut slice, &ctx).is_err());
}
