//!
//! Protoreef is a proto2 reflection library. It models protocol buffer
//! schemas (packages, messages, fields, enums and services) at runtime and
//! constructs, encodes and decodes dynamic message values against them
//! without any generated code. The wire format support covers packed
//! repeated fields, legacy groups, required-field tracking and
//! forward-compatible skipping of unknown fields.
//!
//! ```
//! use protoreef::prelude::*;
//!
//! let context = Context::parse(&[r#"
//!   package tutorial;
//!
//!   message Person {
//!       required string name = 1;
//!       optional int32 age = 2;
//!       repeated string email = 3;
//!   }
//! "#]).unwrap();
//!
//! let person = context.get_message("tutorial.Person").unwrap();
//!
//! let mut value = person.new_value(&context).unwrap();
//! value.set(&context, "name", Value::String("A".to_string())).unwrap();
//! value.set(&context, "age", Value::Int32(30)).unwrap();
//! value.add(&context, "email", Value::String("a@x".to_string())).unwrap();
//!
//! let encoded = value.encode(&context).unwrap();
//! assert_eq!(&encoded[..], &b"\x0a\x01A\x10\x1e\x1a\x03a@x"[..]);
//!
//! let decoded = person.decode(&encoded, &context).unwrap();
//! assert_eq!(decoded, value);
//! assert_eq!(decoded.get(&context, "age"), Some(&Value::Int32(30)));
//! ```
#![warn(missing_docs)]
#![allow(clippy::match_bool)]

pub mod context;
pub mod decode;
pub mod encode;
pub mod prelude;
pub mod service;
pub mod value;
pub mod wire;

pub use crate::context::Context;
pub use crate::value::{MessageValue, Value};
