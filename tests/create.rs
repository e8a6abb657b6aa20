use protoreef::context::{
    Constant, Context, EnumField, EnumInfo, MessageField, MessageInfo, Multiplicity, Package,
    ProtoOption, Rpc, Service, TypeParent, ValueType,
};

#[test]
fn create_context_by_hand()
{
    let parsed_context = Context::parse(&[r#"
        package Named;

        message Message {
            required bool immediate = 1;
            optional string note = 2;
            repeated uint32 scores = 3 [ packed = true ];

            enum Inner {
                value1 = 1;
                value2 = 2;
            }
        }
    "#])
    .unwrap();

    let mut handbuilt_context = Context::new();
    let package = handbuilt_context
        .insert_package(Package::new(Some("Named".to_string())))
        .unwrap();
    let mut message = MessageInfo::new("Message".to_string(), TypeParent::Package(package));

    let mut immediate = MessageField::new("immediate".to_string(), 1, ValueType::Bool);
    immediate.multiplicity = Multiplicity::Required;
    message.add_field(immediate).unwrap();

    let note = MessageField::new("note".to_string(), 2, ValueType::String);
    message.add_field(note).unwrap();

    let mut scores = MessageField::new("scores".to_string(), 3, ValueType::UInt32);
    scores.multiplicity = Multiplicity::RepeatedPacked;
    scores.options = vec![ProtoOption {
        name: "packed".to_string(),
        value: Constant::Bool(true),
    }];
    message.add_field(scores).unwrap();

    let message_ref = handbuilt_context.insert_message(message).unwrap();

    let mut inner_enum = EnumInfo::new("Inner".to_string(), TypeParent::Message(message_ref));
    inner_enum
        .add_value(EnumField::new("value1".to_string(), 1))
        .unwrap();
    inner_enum
        .add_value(EnumField::new("value2".to_string(), 2))
        .unwrap();
    handbuilt_context.insert_enum(inner_enum).unwrap();

    assert_eq!(parsed_context, handbuilt_context);
}

#[test]
fn create_service_by_hand()
{
    let parsed_context = Context::parse(&[r#"
        package Named;

        message Request {}
        message Response {}

        service Calls {
            rpc Invoke( Request ) returns ( Response );
        }
    "#])
    .unwrap();

    let mut handbuilt_context = Context::new();
    let package = handbuilt_context
        .insert_package(Package::new(Some("Named".to_string())))
        .unwrap();

    let request = handbuilt_context
        .insert_message(MessageInfo::new(
            "Request".to_string(),
            TypeParent::Package(package),
        ))
        .unwrap();
    let response = handbuilt_context
        .insert_message(MessageInfo::new(
            "Response".to_string(),
            TypeParent::Package(package),
        ))
        .unwrap();

    let mut service = Service::new("Calls".to_string(), package);
    service
        .add_rpc(Rpc::new("Invoke".to_string(), request, response))
        .unwrap();
    handbuilt_context.insert_service(service).unwrap();

    assert_eq!(parsed_context, handbuilt_context);
}

#[test]
fn hand_built_name_collision_reverts()
{
    let mut context = Context::new();
    let package = context.insert_package(Package::new(None)).unwrap();
    let mut message = MessageInfo::new("M".to_string(), TypeParent::Package(package));

    // Two fields whose rewritten names collide but whose original names
    // differ: both revert and stay reachable by their original names.
    let mut first = MessageField::new("some_field".to_string(), 1, ValueType::Int32);
    first.name = "someField".to_string();
    message.add_field(first).unwrap();

    let mut second = MessageField::new("some__field".to_string(), 2, ValueType::Int32);
    second.name = "someField".to_string();
    message.add_field(second).unwrap();

    assert_eq!(message.get_field_by_name("some_field").unwrap().number, 1);
    assert_eq!(message.get_field_by_name("some__field").unwrap().number, 2);

    // A third genuine duplicate still fails.
    let third = MessageField::new("some_field".to_string(), 3, ValueType::Int32);
    assert!(message.add_field(third).is_err());
}

#[test]
fn field_numbers_validated_by_hand_construction()
{
    let mut context = Context::new();
    let package = context.insert_package(Package::new(None)).unwrap();
    let mut message = MessageInfo::new("M".to_string(), TypeParent::Package(package));
    message.set_extensions(100, 199);

    let zero = MessageField::new("zero".to_string(), 0, ValueType::Int32);
    assert!(message.add_field(zero).is_err());

    let reserved = MessageField::new("reserved".to_string(), 150, ValueType::Int32);
    assert!(message.add_field(reserved).is_err());

    let ok = MessageField::new("ok".to_string(), 1, ValueType::Int32);
    assert!(message.add_field(ok).is_ok());
}
