//! Runtime rpc dispatch.
//!
//! A [`Dispatcher`] binds a service schema to a user-supplied transport
//! function. The dispatcher verifies outgoing requests against the declared
//! request type and decodes raw response bytes as the declared response
//! type. Every outcome of a call flows through the per-call callback,
//! including errors the dispatcher detects before the transport is ever
//! invoked, so callers observe a single delivery channel no matter where a
//! call fails. Scheduling is the transport's concern; this layer performs no
//! I/O of its own.

use bytes::Bytes;
use snafu::Snafu;

use crate::context::{Context, Service, ServiceRef};
use crate::decode::DecodeError;
use crate::value::MessageValue;

/// Rpc dispatch error type.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum RpcError
{
    /// The service declares no method with the given name.
    #[snafu(display("Service '{}' has no method '{}'", service, method))]
    UnknownMethod
    {
        /// Full service name.
        service: String,

        /// The method name that failed to resolve.
        method: String,
    },

    /// The request value is not of the method's declared request type.
    #[snafu(display("Request for '{}' is not a '{}' value", method, expected))]
    RequestTypeMismatch
    {
        /// Method name.
        method: String,

        /// Full name of the declared request message type.
        expected: String,
    },

    /// The transport reported a failure.
    #[snafu(display("Transport error calling '{}': {}", method, message))]
    Transport
    {
        /// Method name.
        method: String,

        /// Transport-supplied failure description.
        message: String,
    },

    /// The transport's response bytes did not decode as the declared
    /// response type.
    #[snafu(display("Undecodable response from '{}': {}", method, source))]
    BadResponse
    {
        /// Method name.
        method: String,

        /// The decoding failure.
        source: DecodeError,
    },
}

/// Callback handed to the transport for delivering the raw response bytes,
/// or a failure description.
pub type ResponseHandler<'a> = Box<dyn FnOnce(Result<Bytes, String>) + 'a>;

/// Method dispatcher built from a service schema.
///
/// The transport is called with the method's full dotted name, the verified
/// request value and a [`ResponseHandler`] to complete the call with.
pub struct Dispatcher<'ctx, T>
where
    T: for<'r> Fn(&str, &MessageValue, ResponseHandler<'r>),
{
    ctx: &'ctx Context,
    service: ServiceRef,
    transport: T,
}

impl Service
{
    /// Builds a dispatcher for this service over the given transport
    /// function.
    pub fn dispatcher<'ctx, T>(&self, ctx: &'ctx Context, transport: T) -> Dispatcher<'ctx, T>
    where
        T: for<'r> Fn(&str, &MessageValue, ResponseHandler<'r>),
    {
        Dispatcher {
            ctx,
            service: self.self_ref,
            transport,
        }
    }
}

impl<'ctx, T> Dispatcher<'ctx, T>
where
    T: for<'r> Fn(&str, &MessageValue, ResponseHandler<'r>),
{
    /// Calls `method` with `request`, delivering the outcome to `callback`.
    ///
    /// The request must be a value of the method's declared request type.
    /// Raw bytes handed back by the transport are decoded as the declared
    /// response type; bytes that fail to decode surface as
    /// [`RpcError::BadResponse`].
    pub fn call<F>(&self, method: &str, request: &MessageValue, callback: F)
    where
        F: FnOnce(Result<MessageValue, RpcError>),
    {
        let service = self.ctx.resolve_service(self.service);

        let rpc = match service.rpc_by_name(method) {
            Some(rpc) => rpc,
            None => {
                return callback(Err(RpcError::UnknownMethod {
                    service: service.full_name.clone(),
                    method: method.to_string(),
                }))
            }
        };

        if request.msg_ref() != rpc.input {
            let expected = self.ctx.resolve_message(rpc.input);
            return callback(Err(RpcError::RequestTypeMismatch {
                method: method.to_string(),
                expected: expected.full_name.clone(),
            }));
        }

        let full_name = service.rpc_full_name(rpc);
        let ctx = self.ctx;
        let output = rpc.output;
        let method_name = method.to_string();

        let handler: ResponseHandler = Box::new(move |result| match result {
            Ok(bytes) => {
                let response = ctx
                    .resolve_message(output)
                    .decode(&bytes, ctx)
                    .map_err(|source| RpcError::BadResponse {
                        method: method_name,
                        source,
                    });
                callback(response)
            }
            Err(message) => callback(Err(RpcError::Transport {
                method: method_name,
                message,
            })),
        });

        (self.transport)(&full_name, request, handler);
    }
}
