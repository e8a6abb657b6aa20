//! Protocol buffer binary payload decoding.
//!
//! Decoding walks the tag stream against the message schema. Fields with
//! unknown numbers are skipped according to their wire type, which keeps the
//! decoder forward compatible; malformed framing is an error, never silently
//! tolerated.

use snafu::Snafu;

use bytes::Bytes;

use crate::context::{Context, MessageField, MessageInfo, MessageRef, Multiplicity, ValueType};
use crate::value::{EnumValue, MessageValue, Value, ValueError};
use crate::wire;

/// Decoding error type.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DecodeError
{
    /// Input ended in the middle of a value.
    #[snafu(display("Unexpected end of input while decoding {}", context))]
    UnexpectedEnd
    {
        /// What was being decoded.
        context: String,
    },

    /// A wire type not defined by the format.
    #[snafu(display("Unknown wire type {} for field {}", wire_type, number))]
    UnknownWireType
    {
        /// The offending wire type code.
        wire_type: u8,

        /// Field number the tag carried.
        number: u64,
    },

    /// Declared and received wire types disagree.
    #[snafu(display("Field '{}' expects wire type {}, got {}", field, expected, actual))]
    WireTypeMismatch
    {
        /// Field name.
        field: String,

        /// Wire type the schema declares.
        expected: u8,

        /// Wire type that arrived.
        actual: u8,
    },

    /// An end-group tag did not match the group being decoded.
    #[snafu(display("Group end mismatch: expected id {}, got {}", expected, actual))]
    GroupEndMismatch
    {
        /// Id of the group being decoded.
        expected: u64,

        /// Id the end tag carried.
        actual: u64,
    },

    /// An end-group tag appeared outside any group.
    #[snafu(display("Stray group end tag for id {}", number))]
    StrayGroupEnd
    {
        /// Id the end tag carried.
        number: u64,
    },

    /// A group was not terminated before the input ended.
    #[snafu(display("Group {} was not terminated", number))]
    UnterminatedGroup
    {
        /// Id of the unterminated group.
        number: u64,
    },

    /// A length prefix pointed past the end of the input.
    #[snafu(display("Length {} exceeds the {} remaining bytes in {}", length, remaining, context))]
    LengthOverrun
    {
        /// The declared length.
        length: usize,

        /// Bytes actually remaining.
        remaining: usize,

        /// What was being decoded.
        context: String,
    },

    /// One or more required fields were absent from the payload.
    #[snafu(display("Message '{}' is missing required fields: {:?}", message, missing))]
    MissingRequiredFields
    {
        /// Full message name.
        message: String,

        /// Names of the missing fields.
        missing: Vec<String>,

        /// Best-effort value holding everything that did decode.
        decoded: Box<MessageValue>,
    },

    /// The schema's declared defaults could not be applied.
    #[snafu(display("Invalid schema default: {}", source))]
    InvalidDefault
    {
        /// Verification failure for the default constant.
        source: ValueError,
    },

    /// The input string was not valid base64.
    #[snafu(display("Invalid base64 input: {}", source))]
    InvalidBase64
    {
        /// Source error.
        source: base64::DecodeError,
    },
}

impl Context
{
    /// Decode a message.
    pub fn decode(&self, msg: MessageRef, data: &[u8]) -> Result<MessageValue, DecodeError>
    {
        self.resolve_message(msg).decode(data, self)
    }
}

impl MessageInfo
{
    /// Decodes a message value from a payload.
    ///
    /// The whole payload belongs to this message; decoding runs until the
    /// end of the input.
    ///
    /// Will **panic** if the message refers to types that do not exist in
    /// the given context. Such panic means the `MessageInfo` came from a
    /// different context.
    pub fn decode(&self, data: &[u8], ctx: &Context) -> Result<MessageValue, DecodeError>
    {
        let mut slice = data;
        self.decode_stream(&mut slice, ctx, None)
    }

    /// Decodes one length-prefixed message from the front of `data`,
    /// advancing it past the consumed bytes.
    pub fn decode_delimited(&self, data: &mut &[u8], ctx: &Context)
        -> Result<MessageValue, DecodeError>
    {
        let length = read_varint(data, "delimited message length")? as usize;
        if data.len() < length {
            return Err(DecodeError::LengthOverrun {
                length,
                remaining: data.len(),
                context: format!("delimited message '{}'", self.full_name),
            });
        }

        let (payload, rest) = data.split_at(length);
        let value = self.decode(payload, ctx)?;
        *data = rest;
        Ok(value)
    }

    /// Decodes a message value from a base64 string.
    pub fn decode_base64(&self, input: &str, ctx: &Context) -> Result<MessageValue, DecodeError>
    {
        use base64::Engine;

        let data = base64::engine::general_purpose::STANDARD
            .decode(input)
            .map_err(|source| DecodeError::InvalidBase64 { source })?;
        self.decode(&data, ctx)
    }

    /// Core decode loop.
    ///
    /// `group` carries the field number whose end-group tag terminates this
    /// message; `None` decodes until the input runs out.
    fn decode_stream(
        &self,
        data: &mut &[u8],
        ctx: &Context,
        group: Option<u64>,
    ) -> Result<MessageValue, DecodeError>
    {
        let mut msg = self
            .new_value(ctx)
            .map_err(|source| DecodeError::InvalidDefault { source })?;
        let mut terminated = false;

        loop {
            if data.is_empty() {
                break;
            }

            let tag = read_varint(data, "field tag")?;
            let (number, wire_type) = wire::split_tag(tag);

            if wire_type == wire::WIRE_END_GROUP {
                match group {
                    Some(expected) if expected == number => {
                        terminated = true;
                        break;
                    }
                    Some(expected) => {
                        return Err(DecodeError::GroupEndMismatch {
                            expected,
                            actual: number,
                        })
                    }
                    None => return Err(DecodeError::StrayGroupEnd { number }),
                }
            }

            match self.get_field(number) {
                Some(field) => field.decode_into(wire_type, data, ctx, &mut msg)?,
                None => skip_unknown(number, wire_type, data)?,
            }
        }

        if let Some(number) = group {
            if !terminated {
                return Err(DecodeError::UnterminatedGroup { number });
            }
        }

        let missing: Vec<_> = self
            .iter_fields()
            .filter(|f| f.multiplicity == Multiplicity::Required && !msg.has(f.number))
            .map(|f| f.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(DecodeError::MissingRequiredFields {
                message: self.full_name.clone(),
                missing,
                decoded: Box::new(msg),
            });
        }

        Ok(msg)
    }
}

impl MessageField
{
    /// Decodes one occurrence of this field from the stream into `msg`.
    ///
    /// The wire type must match the declared type, with one exception: a
    /// repeated scalar field accepts a length-delimited packed run no matter
    /// how the field was declared, and a packed-declared field accepts
    /// individually tagged elements. Singular fields are overwritten by
    /// later occurrences; repeated fields accumulate.
    fn decode_into(
        &self,
        wire_type: u8,
        data: &mut &[u8],
        ctx: &Context,
        msg: &mut MessageValue,
    ) -> Result<(), DecodeError>
    {
        let declared = self.field_type.wire_type();

        if self.multiplicity.is_repeated()
            && self.field_type.packable()
            && wire_type == wire::WIRE_LEN_DELIMITED
            && declared != wire::WIRE_LEN_DELIMITED
        {
            let values = self.decode_packed(data, ctx)?;
            msg.extend_decoded(self.number, values);
            return Ok(());
        }

        if wire_type != declared {
            return Err(DecodeError::WireTypeMismatch {
                field: self.name.clone(),
                expected: declared,
                actual: wire_type,
            });
        }

        let value = self.decode_value(data, ctx)?;
        match self.multiplicity.is_repeated() {
            true => msg.push_decoded(self.number, value),
            false => msg.set_decoded(self.number, value),
        }
        Ok(())
    }

    /// Decodes a packed run: a length prefix followed by contiguous payloads
    /// without intervening tags.
    fn decode_packed(&self, data: &mut &[u8], ctx: &Context) -> Result<Vec<Value>, DecodeError>
    {
        let length = read_varint(data, &self.name)? as usize;
        if data.len() < length {
            return Err(DecodeError::LengthOverrun {
                length,
                remaining: data.len(),
                context: self.name.clone(),
            });
        }

        let (mut run, rest) = data.split_at(length);
        *data = rest;

        let mut values = vec![];
        while !run.is_empty() {
            values.push(self.decode_value(&mut run, ctx)?);
        }
        Ok(values)
    }

    /// Decodes a single payload of the declared type. Integer results are
    /// masked to the declared width.
    fn decode_value(&self, data: &mut &[u8], ctx: &Context) -> Result<Value, DecodeError>
    {
        Ok(match &self.field_type {
            ValueType::Double => {
                Value::Double(f64::from_le_bytes(read_fixed64(data, &self.name)?))
            }
            ValueType::Float => Value::Float(f32::from_le_bytes(read_fixed32(data, &self.name)?)),
            ValueType::Int32 => Value::Int32(read_varint(data, &self.name)? as i32),
            ValueType::Int64 => Value::Int64(read_varint(data, &self.name)? as i64),
            ValueType::UInt32 => Value::UInt32(read_varint(data, &self.name)? as u32),
            ValueType::UInt64 => Value::UInt64(read_varint(data, &self.name)?),
            ValueType::SInt32 => {
                Value::SInt32(wire::zigzag_decode32(read_varint(data, &self.name)? as u32))
            }
            ValueType::SInt64 => {
                Value::SInt64(wire::zigzag_decode64(read_varint(data, &self.name)?))
            }
            ValueType::Fixed32 => {
                Value::Fixed32(u32::from_le_bytes(read_fixed32(data, &self.name)?))
            }
            ValueType::Fixed64 => {
                Value::Fixed64(u64::from_le_bytes(read_fixed64(data, &self.name)?))
            }
            ValueType::SFixed32 => {
                Value::SFixed32(i32::from_le_bytes(read_fixed32(data, &self.name)?))
            }
            ValueType::SFixed64 => {
                Value::SFixed64(i64::from_le_bytes(read_fixed64(data, &self.name)?))
            }
            ValueType::Bool => Value::Bool(read_varint(data, &self.name)? != 0),
            ValueType::String => {
                let payload = read_length_prefixed(data, &self.name)?;
                Value::String(String::from_utf8_lossy(payload).to_string())
            }
            ValueType::Bytes => {
                let payload = read_length_prefixed(data, &self.name)?;
                Value::Bytes(Bytes::copy_from_slice(payload))
            }
            ValueType::Enum(enum_ref) => {
                // Undeclared ids are preserved; rejecting them would break
                // forward compatibility.
                Value::Enum(EnumValue {
                    enum_ref: *enum_ref,
                    number: read_varint(data, &self.name)? as i64,
                })
            }
            ValueType::Message(msg_ref) => {
                let payload = read_length_prefixed(data, &self.name)?;
                let value = ctx.resolve_message(*msg_ref).decode(payload, ctx)?;
                Value::Message(Box::new(value))
            }
            ValueType::Group(msg_ref) => {
                let value =
                    ctx.resolve_message(*msg_ref)
                        .decode_stream(data, ctx, Some(self.number))?;
                Value::Message(Box::new(value))
            }
        })
    }
}

/// Skips a value of an unknown field according to its wire type.
fn skip_unknown(number: u64, wire_type: u8, data: &mut &[u8]) -> Result<(), DecodeError>
{
    match wire_type {
        wire::WIRE_VARINT => {
            read_varint(data, "unknown varint field")?;
        }
        wire::WIRE_FIXED64 => {
            read_fixed64(data, "unknown 64-bit field")?;
        }
        wire::WIRE_LEN_DELIMITED => {
            read_length_prefixed(data, "unknown length-delimited field")?;
        }
        wire::WIRE_START_GROUP => skip_till_group_end(number, data)?,
        wire::WIRE_FIXED32 => {
            read_fixed32(data, "unknown 32-bit field")?;
        }
        other => return Err(DecodeError::UnknownWireType {
            wire_type: other,
            number,
        }),
    }
    Ok(())
}

/// Consumes values until the end tag of `group_number` is reached. Nested
/// unknown groups recurse; an end tag for any other group is a wire error.
fn skip_till_group_end(group_number: u64, data: &mut &[u8]) -> Result<(), DecodeError>
{
    loop {
        if data.is_empty() {
            return Err(DecodeError::UnterminatedGroup {
                number: group_number,
            });
        }

        let tag = read_varint(data, "unknown group content")?;
        let (number, wire_type) = wire::split_tag(tag);

        if wire_type == wire::WIRE_END_GROUP {
            if number == group_number {
                return Ok(());
            }
            return Err(DecodeError::GroupEndMismatch {
                expected: group_number,
                actual: number,
            });
        }

        skip_unknown(number, wire_type, data)?;
    }
}

fn read_varint(data: &mut &[u8], context: &str) -> Result<u64, DecodeError>
{
    wire::read_varint(data).ok_or_else(|| DecodeError::UnexpectedEnd {
        context: context.to_string(),
    })
}

fn read_fixed32(data: &mut &[u8], context: &str) -> Result<[u8; 4], DecodeError>
{
    wire::read_fixed32(data).ok_or_else(|| DecodeError::UnexpectedEnd {
        context: context.to_string(),
    })
}

fn read_fixed64(data: &mut &[u8], context: &str) -> Result<[u8; 8], DecodeError>
{
    wire::read_fixed64(data).ok_or_else(|| DecodeError::UnexpectedEnd {
        context: context.to_string(),
    })
}

fn read_length_prefixed<'a>(data: &mut &'a [u8], context: &str) -> Result<&'a [u8], DecodeError>
{
    let length = read_varint(data, context)? as usize;
    if data.len() < length {
        return Err(DecodeError::LengthOverrun {
            length,
            remaining: data.len(),
            context: context.to_string(),
        });
    }

    let (payload, rest) = data.split_at(length);
    *data = rest;
    Ok(payload)
}
