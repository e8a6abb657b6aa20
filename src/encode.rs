//! Protocol buffer binary encoding.
//!
//! Encoding is driven by the schema: the message value supplies the slots,
//! the field descriptors decide tags, framing and payload layout. A missing
//! required field does not abort the pass; the remaining fields are still
//! encoded and the error carries the best-effort buffer.

use bytes::{BufMut, Bytes, BytesMut};
use snafu::Snafu;

use crate::context::{Context, MessageField, Multiplicity, ValueType};
use crate::value::{FieldSlot, MessageValue, Value};
use crate::wire;

/// Encoding error type.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum EncodeError
{
    /// One or more required fields had no value.
    #[snafu(display("Message '{}' is missing required fields: {:?}", message, missing))]
    MissingRequiredFields
    {
        /// Full message name.
        message: String,

        /// Names of the missing fields.
        missing: Vec<String>,

        /// Best-effort encoding of the fields that were present.
        encoded: Bytes,
    },
}

impl MessageValue
{
    /// Encodes the message value into protobuf wire format.
    pub fn encode(&self, ctx: &Context) -> Result<BytesMut, EncodeError>
    {
        let mut buf = BytesMut::new();
        self.encode_into(ctx, &mut buf)?;
        Ok(buf)
    }

    /// Encodes the message value prefixed with a varint of its length.
    ///
    /// Concatenated delimited messages form a stream that
    /// [`decode_delimited`](crate::context::MessageInfo::decode_delimited)
    /// consumes one message at a time.
    pub fn encode_delimited(&self, ctx: &Context) -> Result<BytesMut, EncodeError>
    {
        let payload = self.encode(ctx)?;

        let mut buf = BytesMut::new();
        wire::write_varint(&mut buf, payload.len() as u64);
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Encodes the message value and converts the result to base64.
    pub fn encode_base64(&self, ctx: &Context) -> Result<String, EncodeError>
    {
        use base64::Engine;

        let payload = self.encode(ctx)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&payload))
    }

    /// Encodes every present field in field number order, appending to `buf`.
    ///
    /// Missing required fields are recorded but do not stop the pass, so the
    /// error can carry everything that did encode.
    pub(crate) fn encode_into(&self, ctx: &Context, buf: &mut BytesMut) -> Result<(), EncodeError>
    {
        let msg = ctx.resolve_message(self.msg_ref());
        let mut missing: Vec<String> = vec![];

        for field in msg.iter_fields() {
            match self.slot(field.number) {
                None | Some(FieldSlot::Single(None)) => {
                    if field.multiplicity == Multiplicity::Required {
                        missing.push(field.name.clone());
                    }
                }
                Some(FieldSlot::Single(Some(value))) => field.encode_single(value, buf, ctx)?,
                Some(FieldSlot::Repeated(values)) => field.encode_repeated(values, buf, ctx)?,
            }
        }

        if !missing.is_empty() {
            return Err(EncodeError::MissingRequiredFields {
                message: msg.full_name.clone(),
                missing,
                encoded: buf.clone().freeze(),
            });
        }

        Ok(())
    }
}

impl MessageField
{
    /// Encodes one tagged value of this field.
    pub(crate) fn encode_single(
        &self,
        value: &Value,
        buf: &mut BytesMut,
        ctx: &Context,
    ) -> Result<(), EncodeError>
    {
        match &self.field_type {
            ValueType::Group(..) => {
                // Groups are framed by a start/end tag pair instead of a
                // length prefix.
                wire::write_varint(buf, wire::make_tag(self.number, wire::WIRE_START_GROUP));
                match value {
                    Value::Message(mv) => mv.encode_into(ctx, buf)?,
                    other => unreachable!("Non-message value {:?} in group field", other),
                }
                wire::write_varint(buf, wire::make_tag(self.number, wire::WIRE_END_GROUP));
            }

            ValueType::Message(..) => {
                wire::write_varint(buf, wire::make_tag(self.number, wire::WIRE_LEN_DELIMITED));
                match value {
                    Value::Message(mv) => {
                        let inner = mv.encode(ctx)?;
                        wire::write_varint(buf, inner.len() as u64);
                        buf.extend_from_slice(&inner);
                    }
                    other => unreachable!("Non-message value {:?} in message field", other),
                }
            }

            other => {
                wire::write_varint(buf, wire::make_tag(self.number, other.wire_type()));
                encode_scalar(value, buf);
            }
        }

        Ok(())
    }

    /// Encodes the values of a repeated field: one tag per element, or a
    /// single length-delimited run when the field is packed.
    pub(crate) fn encode_repeated(
        &self,
        values: &[Value],
        buf: &mut BytesMut,
        ctx: &Context,
    ) -> Result<(), EncodeError>
    {
        if values.is_empty() {
            return Ok(());
        }

        match self.multiplicity {
            Multiplicity::RepeatedPacked => {
                wire::write_varint(buf, wire::make_tag(self.number, wire::WIRE_LEN_DELIMITED));

                let mut payload = BytesMut::new();
                for value in values {
                    encode_scalar(value, &mut payload);
                }

                wire::write_varint(buf, payload.len() as u64);
                buf.extend_from_slice(&payload);
            }
            _ => {
                for value in values {
                    self.encode_single(value, buf, ctx)?;
                }
            }
        }

        Ok(())
    }
}

/// Writes the payload bytes of a scalar value.
///
/// Negative `int32` values are sign-extended to 64 bits before the varint,
/// occupying the full ten bytes the format prescribes.
fn encode_scalar(value: &Value, buf: &mut BytesMut)
{
    match value {
        Value::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Int32(v) => wire::write_varint(buf, i64::from(*v) as u64),
        Value::Int64(v) => wire::write_varint(buf, *v as u64),
        Value::UInt32(v) => wire::write_varint(buf, u64::from(*v)),
        Value::UInt64(v) => wire::write_varint(buf, *v),
        Value::SInt32(v) => wire::write_varint(buf, u64::from(wire::zigzag_encode32(*v))),
        Value::SInt64(v) => wire::write_varint(buf, wire::zigzag_encode64(*v)),
        Value::Fixed32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Fixed64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::SFixed32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::SFixed64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::Bool(v) => buf.put_u8(*v as u8),
        Value::String(v) => {
            wire::write_varint(buf, v.len() as u64);
            buf.extend_from_slice(v.as_bytes());
        }
        Value::Bytes(v) => {
            wire::write_varint(buf, v.len() as u64);
            buf.extend_from_slice(v);
        }
        Value::Enum(v) => wire::write_varint(buf, v.number as u64),
        Value::Message(..) => unreachable!("Message value encoded as a scalar"),
    }
}
