use protoreef::prelude::*;

fn enum_context() -> Context
{
    Context::parse(&[r#"
        enum E {
            A = 0;
            B = 1;
        }

        message M {
            required E e = 1;
        }
    "#])
    .unwrap()
}

#[test]
fn enum_by_name_and_id_encode_identically()
{
    let ctx = enum_context();
    let m = ctx.get_message("M").unwrap();

    let by_name = m
        .value_from(&ctx, vec![("e", Value::String("B".to_string()))])
        .unwrap();
    let by_id = m.value_from(&ctx, vec![("e", Value::Int32(1))]).unwrap();

    let name_bytes = by_name.encode(&ctx).unwrap();
    let id_bytes = by_id.encode(&ctx).unwrap();

    assert_eq!(name_bytes, id_bytes);
    assert_eq!(&name_bytes[..], &b"\x08\x01"[..]);
}

#[test]
fn undeclared_enum_values_are_rejected_on_write()
{
    let ctx = enum_context();
    let m = ctx.get_message("M").unwrap();

    assert!(m
        .value_from(&ctx, vec![("e", Value::String("C".to_string()))])
        .is_err());
    assert!(m.value_from(&ctx, vec![("e", Value::Int32(9))]).is_err());
}

#[test]
fn undeclared_enum_values_survive_decode()
{
    // Forward compatibility: a sender with a newer enum revision may use ids
    // this schema has never heard of.
    let ctx = enum_context();
    let m = ctx.get_message("M").unwrap();
    let enum_ref = ctx.get_enum("E").unwrap().self_ref;

    let decoded = m.decode(b"\x08\x09", &ctx).unwrap();
    assert_eq!(
        decoded.get(&ctx, "e"),
        Some(&Value::Enum(EnumValue { enum_ref, number: 9 }))
    );
}

#[test]
fn enum_values_keep_declaration_order()
{
    let ctx = enum_context();
    let e = ctx.get_enum("E").unwrap();

    let names: Vec<_> = e.iter_values().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);

    assert_eq!(e.value_by_name("B").unwrap().number, 1);
    assert_eq!(e.value_by_number(0).unwrap().name, "A");
}
