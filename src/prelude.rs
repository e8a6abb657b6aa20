//! Protoreef prelude: the types most programs need.

pub use crate::context::{Context, EnumInfo, MessageInfo, ParseOptions, Service};
pub use crate::decode::DecodeError;
pub use crate::encode::EncodeError;
pub use crate::service::{Dispatcher, ResponseHandler, RpcError};
pub use crate::value::{EnumValue, MessageValue, RawValue, Value, ValueError};
