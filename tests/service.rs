use std::cell::RefCell;

use bytes::Bytes;
use protoreef::prelude::*;

fn fish_context() -> Context
{
    Context::parse(&[r#"
        package proto;

        message Request {
            required string kind = 1;
        }

        message Response {
            optional int32 distance = 1;
        }

        service Fish {
            rpc Swim( Request ) returns ( Response );
        }
    "#])
    .unwrap()
}

#[test]
fn dispatch_decodes_the_response()
{
    let ctx = fish_context();
    let service = ctx.get_service("proto.Fish").unwrap();

    let seen_method = RefCell::new(String::new());
    let dispatcher = service.dispatcher(&ctx, |method, _request, respond| {
        seen_method.replace(method.to_string());
        respond(Ok(Bytes::from_static(b"\x08\x2a")));
    });

    let request = ctx
        .get_message("proto.Request")
        .unwrap()
        .value_from(&ctx, vec![("kind", Value::String("Perch".to_string()))])
        .unwrap();

    let outcome = RefCell::new(None);
    dispatcher.call("Swim", &request, |result| {
        outcome.replace(Some(result));
    });

    // The transport saw the full method name.
    assert_eq!(seen_method.borrow().as_str(), "proto.Fish.Swim");

    let response = outcome.into_inner().unwrap().unwrap();
    assert_eq!(response.get(&ctx, "distance"), Some(&Value::Int32(42)));
}

#[test]
fn unknown_method_is_delivered_through_the_callback()
{
    let ctx = fish_context();
    let service = ctx.get_service("proto.Fish").unwrap();

    let dispatcher = service.dispatcher(&ctx, |_method, _request, _respond| {
        panic!("The transport must not be reached");
    });

    let request = ctx
        .get_message("proto.Request")
        .unwrap()
        .value_from(&ctx, vec![("kind", Value::String("Perch".to_string()))])
        .unwrap();

    let outcome = RefCell::new(None);
    dispatcher.call("Dive", &request, |result| {
        outcome.replace(Some(result));
    });

    match outcome.into_inner().unwrap() {
        Err(RpcError::UnknownMethod { method, .. }) => assert_eq!(method, "Dive"),
        other => panic!("Expected an unknown method error: {:?}", other),
    }
}

#[test]
fn request_type_is_verified()
{
    let ctx = fish_context();
    let service = ctx.get_service("proto.Fish").unwrap();

    let dispatcher = service.dispatcher(&ctx, |_method, _request, _respond| {
        panic!("The transport must not be reached");
    });

    // A Response value is not a valid Swim request.
    let not_a_request = ctx
        .get_message("proto.Response")
        .unwrap()
        .new_value(&ctx)
        .unwrap();

    let outcome = RefCell::new(None);
    dispatcher.call("Swim", &not_a_request, |result| {
        outcome.replace(Some(result));
    });

    match outcome.into_inner().unwrap() {
        Err(RpcError::RequestTypeMismatch { expected, .. }) => {
            assert_eq!(expected, "proto.Request")
        }
        other => panic!("Expected a request type mismatch: {:?}", other),
    }
}

#[test]
fn transport_failure_is_delivered_through_the_callback()
{
    let ctx = fish_context();
    let service = ctx.get_service("proto.Fish").unwrap();

    let dispatcher = service.dispatcher(&ctx, |_method, _request, respond| {
        respond(Err("connection reset".to_string()));
    });

    let request = ctx
        .get_message("proto.Request")
        .unwrap()
        .value_from(&ctx, vec![("kind", Value::String("Perch".to_string()))])
        .unwrap();

    let outcome = RefCell::new(None);
    dispatcher.call("Swim", &request, |result| {
        outcome.replace(Some(result));
    });

    match outcome.into_inner().unwrap() {
        Err(RpcError::Transport { message, .. }) => assert_eq!(message, "connection reset"),
        other => panic!("Expected a transport error: {:?}", other),
    }
}

#[test]
fn undecodable_response_is_an_error()
{
    let ctx = fish_context();
    let service = ctx.get_service("proto.Fish").unwrap();

    // A lone start-group tag is not a valid Response payload.
    let dispatcher = service.dispatcher(&ctx, |_method, _request, respond| {
        respond(Ok(Bytes::from_static(b"\x0b")));
    });

    let request = ctx
        .get_message("proto.Request")
        .unwrap()
        .value_from(&ctx, vec![("kind", Value::String("Perch".to_string()))])
        .unwrap();

    let outcome = RefCell::new(None);
    dispatcher.call("Swim", &request, |result| {
        outcome.replace(Some(result));
    });

    assert!(matches!(
        outcome.into_inner().unwrap(),
        Err(RpcError::BadResponse { .. })
    ));
}
