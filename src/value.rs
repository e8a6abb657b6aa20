//! Runtime message values.
//!
//! A [`MessageValue`] is constructed from a message schema and carries one
//! slot per declared field: singular fields hold an optional value, repeated
//! fields hold an ordered sequence. Every write goes through
//! [`MessageField::verify`], so a slot only ever contains values that are in
//! range for the field type. Values are read and written through the generic
//! accessors; field names are resolved against the schema, falling back to
//! the original (pre-camel-case) name.

use bytes::Bytes;
use snafu::Snafu;
use std::collections::BTreeMap;

use crate::context::{
    Constant, Context, EnumRef, MessageField, MessageInfo, MessageRef, Multiplicity, ValueType,
};

/// Value verification error type.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ValueError
{
    /// The supplied value cannot be used for the field.
    #[snafu(display("Illegal value for field '{}': {}", field, detail))]
    IllegalValue
    {
        /// Field name.
        field: String,

        /// What was wrong with the value.
        detail: String,
    },

    /// The supplied value does not name a declared enum value.
    #[snafu(display("Illegal enum value for field '{}': {}", field, value))]
    IllegalEnumValue
    {
        /// Field name.
        field: String,

        /// The offending name or id.
        value: String,
    },

    /// The message has no field with the given name.
    #[snafu(display("Message '{}' has no field '{}'", message, field))]
    UnknownField
    {
        /// Full message name.
        message: String,

        /// The name that failed to resolve.
        field: String,
    },

    /// A repeated-only operation was used on a singular field.
    #[snafu(display("Field '{}' is not repeated", field))]
    NotRepeated
    {
        /// Field name.
        field: String,
    },

    /// A sequence was assigned to a singular field.
    #[snafu(display("A sequence cannot be assigned to singular field '{}'", field))]
    SingularSequence
    {
        /// Field name.
        field: String,
    },

    /// A required field cannot be cleared.
    #[snafu(display("Field '{}' is required and cannot be cleared", field))]
    ClearRequired
    {
        /// Field name.
        field: String,
    },

    /// More positional values were supplied than the message has fields.
    #[snafu(display("Too many positional values for message '{}'", message))]
    TooManyValues
    {
        /// Full message name.
        message: String,
    },
}

/// A single protocol buffer value.
#[derive(Debug, PartialEq, Clone)]
pub enum Value
{
    /// `double` value.
    Double(f64),
    /// `float` value.
    Float(f32),
    /// `int32` value.
    Int32(i32),
    /// `int64` value.
    Int64(i64),
    /// `uint32` value.
    UInt32(u32),
    /// `uint64` value.
    UInt64(u64),
    /// `sint32` value.
    SInt32(i32),
    /// `sint64` value.
    SInt64(i64),
    /// `fixed32` value.
    Fixed32(u32),
    /// `fixed64` value.
    Fixed64(u64),
    /// `sfixed32` value.
    SFixed32(i32),
    /// `sfixed64` value.
    SFixed64(i64),
    /// `bool` value.
    Bool(bool),
    /// `string` value.
    String(String),
    /// `bytes` value.
    Bytes(Bytes),

    /// Enum type value.
    Enum(EnumValue),

    /// Message type value. Also used for legacy group fields; the framing is
    /// decided by the field type, not the value.
    Message(Box<MessageValue>),
}

/// Enum value.
#[derive(Debug, PartialEq, Clone)]
pub struct EnumValue
{
    /// Reference to the enum type.
    pub enum_ref: EnumRef,

    /// Numeric id of the value.
    pub number: i64,
}

/// Message value.
///
/// Holds one slot per declared field of its message type. Constructed through
/// [`MessageInfo::new_value`] and its companions, or by decoding.
#[derive(Debug, PartialEq, Clone)]
pub struct MessageValue
{
    msg_ref: MessageRef,
    slots: BTreeMap<u64, FieldSlot>,
}

#[derive(Debug, PartialEq, Clone)]
pub(crate) enum FieldSlot
{
    Single(Option<Value>),
    Repeated(Vec<Value>),
}

impl MessageInfo
{
    /// Builds a new value of this message type.
    ///
    /// Every singular slot starts absent and every repeated slot starts
    /// empty; declared `[default = ...]` constants are then applied through
    /// the same verified path as user writes, which is where a malformed
    /// default surfaces as an error.
    pub fn new_value(&self, ctx: &Context) -> Result<MessageValue, ValueError>
    {
        let slots = self
            .iter_fields()
            .map(|f| {
                let slot = match f.multiplicity.is_repeated() {
                    true => FieldSlot::Repeated(vec![]),
                    false => FieldSlot::Single(None),
                };
                (f.number, slot)
            })
            .collect();

        let mut value = MessageValue {
            msg_ref: self.self_ref,
            slots,
        };

        for field in self.iter_fields() {
            if let Some(default) = field.default_candidate() {
                value.set_field(ctx, field, default)?;
            }
        }

        Ok(value)
    }

    /// Builds a new value and fills it from `(field name, value)` pairs.
    pub fn value_from<'a, T>(&self, ctx: &Context, entries: T) -> Result<MessageValue, ValueError>
    where
        T: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut value = self.new_value(ctx)?;
        for (name, v) in entries {
            value.set(ctx, name, v)?;
        }
        Ok(value)
    }

    /// Builds a new value and fills it from positional values, matched to
    /// the declared fields in ascending field number order.
    pub fn value_from_positional<T>(&self, ctx: &Context, values: T) -> Result<MessageValue, ValueError>
    where
        T: IntoIterator<Item = Value>,
    {
        let mut value = self.new_value(ctx)?;
        let mut fields = self.iter_fields();
        for v in values {
            let field = match fields.next() {
                Some(field) => field,
                None => {
                    return Err(ValueError::TooManyValues {
                        message: self.full_name.clone(),
                    })
                }
            };
            value.set_field(ctx, field, v)?;
        }
        Ok(value)
    }
}

impl MessageValue
{
    /// Reference to the message type of this value.
    pub fn msg_ref(&self) -> MessageRef
    {
        self.msg_ref
    }

    fn field<'a>(&self, ctx: &'a Context, name: &str) -> Result<&'a MessageField, ValueError>
    {
        let msg = ctx.resolve_message(self.msg_ref);
        match msg.get_field_by_name(name) {
            Some(field) => Ok(field),
            None => Err(ValueError::UnknownField {
                message: msg.full_name.clone(),
                field: name.to_string(),
            }),
        }
    }

    /// Sets a field to a single verified value.
    ///
    /// On a repeated field the value replaces the whole sequence, becoming
    /// its only element; use [`MessageValue::add`] to append instead.
    pub fn set(&mut self, ctx: &Context, name: &str, value: Value) -> Result<(), ValueError>
    {
        let field = self.field(ctx, name)?;
        self.set_field(ctx, field, value)
    }

    pub(crate) fn set_field(
        &mut self,
        ctx: &Context,
        field: &MessageField,
        value: Value,
    ) -> Result<(), ValueError>
    {
        let verified = field.verify(ctx, value)?;
        match self.slots.get_mut(&field.number) {
            Some(FieldSlot::Single(slot)) => *slot = Some(verified),
            Some(FieldSlot::Repeated(values)) => {
                values.clear();
                values.push(verified);
            }
            None => {
                let slot = match field.multiplicity.is_repeated() {
                    true => FieldSlot::Repeated(vec![verified]),
                    false => FieldSlot::Single(Some(verified)),
                };
                self.slots.insert(field.number, slot);
            }
        }
        Ok(())
    }

    /// Replaces a repeated field with a verified sequence.
    ///
    /// Fails on singular fields: a sequence is never a legal singular value.
    pub fn set_all(&mut self, ctx: &Context, name: &str, values: Vec<Value>) -> Result<(), ValueError>
    {
        let field = self.field(ctx, name)?;
        if !field.multiplicity.is_repeated() {
            return Err(ValueError::SingularSequence {
                field: field.name.clone(),
            });
        }

        let mut verified = Vec::with_capacity(values.len());
        for v in values {
            verified.push(field.verify(ctx, v)?);
        }

        self.slots
            .insert(field.number, FieldSlot::Repeated(verified));
        Ok(())
    }

    /// Appends a verified value to a repeated field.
    pub fn add(&mut self, ctx: &Context, name: &str, value: Value) -> Result<(), ValueError>
    {
        let field = self.field(ctx, name)?;
        if !field.multiplicity.is_repeated() {
            return Err(ValueError::NotRepeated {
                field: field.name.clone(),
            });
        }

        let verified = field.verify(ctx, value)?;
        match self.slots.get_mut(&field.number) {
            Some(FieldSlot::Repeated(values)) => values.push(verified),
            _ => {
                self.slots
                    .insert(field.number, FieldSlot::Repeated(vec![verified]));
            }
        }
        Ok(())
    }

    /// Clears a field back to absent (or empty for repeated fields).
    ///
    /// Required fields cannot be cleared.
    pub fn clear(&mut self, ctx: &Context, name: &str) -> Result<(), ValueError>
    {
        let field = self.field(ctx, name)?;
        if field.multiplicity == Multiplicity::Required {
            return Err(ValueError::ClearRequired {
                field: field.name.clone(),
            });
        }

        match self.slots.get_mut(&field.number) {
            Some(FieldSlot::Single(slot)) => *slot = None,
            Some(FieldSlot::Repeated(values)) => values.clear(),
            None => {}
        }
        Ok(())
    }

    /// Gets the value of a field.
    ///
    /// Returns the single value of a singular field, or the first element of
    /// a repeated field. `None` when the field is absent, empty or unknown.
    pub fn get(&self, ctx: &Context, name: &str) -> Option<&Value>
    {
        let msg = ctx.resolve_message(self.msg_ref);
        let field = msg.get_field_by_name(name)?;
        match self.slots.get(&field.number) {
            Some(FieldSlot::Single(slot)) => slot.as_ref(),
            Some(FieldSlot::Repeated(values)) => values.first(),
            None => None,
        }
    }

    /// Gets all values of a field as a slice.
    ///
    /// A set singular field yields a one-element slice; an absent, empty or
    /// unknown field yields an empty slice.
    pub fn get_all(&self, ctx: &Context, name: &str) -> &[Value]
    {
        let msg = ctx.resolve_message(self.msg_ref);
        let field = match msg.get_field_by_name(name) {
            Some(field) => field,
            None => return &[],
        };
        match self.slots.get(&field.number) {
            Some(FieldSlot::Single(Some(value))) => std::slice::from_ref(value),
            Some(FieldSlot::Repeated(values)) => values,
            _ => &[],
        }
    }

    /// Deep-copies the set fields into a plain data tree keyed by field
    /// name. Bytes-typed values are omitted unless `include_bytes` is set.
    pub fn to_raw(&self, ctx: &Context, include_bytes: bool) -> BTreeMap<String, RawValue>
    {
        let msg = ctx.resolve_message(self.msg_ref);
        let mut out = BTreeMap::new();

        for field in msg.iter_fields() {
            match self.slots.get(&field.number) {
                Some(FieldSlot::Single(Some(value))) => {
                    if let Some(raw) = raw_value(value, ctx, include_bytes) {
                        out.insert(field.name.clone(), raw);
                    }
                }
                Some(FieldSlot::Repeated(values)) if !values.is_empty() => {
                    let items = values
                        .iter()
                        .filter_map(|v| raw_value(v, ctx, include_bytes))
                        .collect();
                    out.insert(field.name.clone(), RawValue::List(items));
                }
                _ => {}
            }
        }

        out
    }

    pub(crate) fn slot(&self, number: u64) -> Option<&FieldSlot>
    {
        self.slots.get(&number)
    }

    /// True when the field slot holds at least one value.
    pub(crate) fn has(&self, number: u64) -> bool
    {
        match self.slots.get(&number) {
            Some(FieldSlot::Single(slot)) => slot.is_some(),
            Some(FieldSlot::Repeated(values)) => !values.is_empty(),
            None => false,
        }
    }

    // Decode-path writes. The decoder produces wire-valid values, so these
    // skip verification.

    pub(crate) fn set_decoded(&mut self, number: u64, value: Value)
    {
        match self.slots.get_mut(&number) {
            Some(FieldSlot::Single(slot)) => *slot = Some(value),
            Some(FieldSlot::Repeated(values)) => {
                values.clear();
                values.push(value);
            }
            None => {
                self.slots.insert(number, FieldSlot::Single(Some(value)));
            }
        }
    }

    pub(crate) fn push_decoded(&mut self, number: u64, value: Value)
    {
        match self.slots.get_mut(&number) {
            Some(FieldSlot::Repeated(values)) => values.push(value),
            _ => {
                self.slots.insert(number, FieldSlot::Repeated(vec![value]));
            }
        }
    }

    pub(crate) fn extend_decoded(&mut self, number: u64, values: Vec<Value>)
    {
        match self.slots.get_mut(&number) {
            Some(FieldSlot::Repeated(existing)) => existing.extend(values),
            _ => {
                self.slots.insert(number, FieldSlot::Repeated(values));
            }
        }
    }
}

/// Plain data tree produced by [`MessageValue::to_raw`].
#[derive(Debug, PartialEq, Clone)]
pub enum RawValue
{
    /// A scalar leaf. Never contains `Value::Message`; message values become
    /// [`RawValue::Message`] nodes.
    Value(Value),

    /// Values of a repeated field.
    List(Vec<RawValue>),

    /// A nested message, keyed by field name.
    Message(BTreeMap<String, RawValue>),
}

fn raw_value(value: &Value, ctx: &Context, include_bytes: bool) -> Option<RawValue>
{
    match value {
        Value::Bytes(..) if !include_bytes => None,
        Value::Message(mv) => Some(RawValue::Message(mv.to_raw(ctx, include_bytes))),
        other => Some(RawValue::Value(other.clone())),
    }
}

impl MessageField
{
    /// The declared default as a candidate value for the verification path.
    pub(crate) fn default_candidate(&self) -> Option<Value>
    {
        let constant = self.default.as_ref()?;
        Some(match constant {
            Constant::Integer(i) => Value::Int64(*i),
            Constant::Float(f) => Value::Double(*f),
            Constant::Bool(b) => Value::Bool(*b),
            Constant::String(bytes) => match self.field_type {
                ValueType::Bytes => Value::Bytes(bytes.clone()),
                _ => Value::String(String::from_utf8_lossy(bytes).to_string()),
            },
            // Idents appear for enum defaults; the name is resolved against
            // the enum during verification.
            Constant::Ident(name) => Value::String(name.clone()),
        })
    }

    /// Verifies a single value against the field type, coercing it to the
    /// canonical in-memory form for that type.
    ///
    /// Integers coerce across widths by truncation; strings parse into
    /// numeric and boolean fields; enum values are accepted by declared name
    /// or id; message and group fields accept only values of the resolved
    /// message type.
    pub fn verify(&self, ctx: &Context, value: Value) -> Result<Value, ValueError>
    {
        match &self.field_type {
            ValueType::Int32 => Ok(Value::Int32(self.integer_value(&value)? as i32)),
            ValueType::SInt32 => Ok(Value::SInt32(self.integer_value(&value)? as i32)),
            ValueType::SFixed32 => Ok(Value::SFixed32(self.integer_value(&value)? as i32)),
            ValueType::Int64 => Ok(Value::Int64(self.integer_value(&value)?)),
            ValueType::SInt64 => Ok(Value::SInt64(self.integer_value(&value)?)),
            ValueType::SFixed64 => Ok(Value::SFixed64(self.integer_value(&value)?)),
            ValueType::UInt32 => Ok(Value::UInt32(self.unsigned_value(&value)? as u32)),
            ValueType::Fixed32 => Ok(Value::Fixed32(self.unsigned_value(&value)? as u32)),
            ValueType::UInt64 => Ok(Value::UInt64(self.unsigned_value(&value)?)),
            ValueType::Fixed64 => Ok(Value::Fixed64(self.unsigned_value(&value)?)),
            ValueType::Float => Ok(Value::Float(self.float_value(&value)? as f32)),
            ValueType::Double => Ok(Value::Double(self.float_value(&value)?)),

            ValueType::Bool => match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::String(s) => match s.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    other => Err(self.illegal(format!("'{}' is not a boolean", other))),
                },
                other => match self.integer_of(&other) {
                    Some(n) => Ok(Value::Bool(n != 0)),
                    None => Err(self.illegal(format!("{:?} is not a boolean", other))),
                },
            },

            ValueType::String => match value {
                Value::String(s) => Ok(Value::String(s)),
                Value::Bytes(b) => Ok(Value::String(String::from_utf8_lossy(&b).to_string())),
                other => Err(self.illegal(format!("{:?} is not a string", other))),
            },

            ValueType::Bytes => match value {
                Value::Bytes(b) => Ok(Value::Bytes(b)),
                Value::String(s) => Ok(Value::Bytes(Bytes::from(s.into_bytes()))),
                other => Err(self.illegal(format!("{:?} is not a byte sequence", other))),
            },

            ValueType::Enum(enum_ref) => self.verify_enum(ctx, *enum_ref, value),

            ValueType::Message(msg_ref) | ValueType::Group(msg_ref) => match value {
                Value::Message(mv) => {
                    if mv.msg_ref == *msg_ref {
                        Ok(Value::Message(mv))
                    } else {
                        let expected = ctx.resolve_message(*msg_ref);
                        Err(self.illegal(format!(
                            "message value is not a '{}'",
                            expected.full_name
                        )))
                    }
                }
                other => Err(self.illegal(format!("{:?} is not a message", other))),
            },
        }
    }

    fn verify_enum(&self, ctx: &Context, enum_ref: EnumRef, value: Value) -> Result<Value, ValueError>
    {
        let info = ctx.resolve_enum(enum_ref);
        let number = match &value {
            Value::Enum(ev) => {
                if ev.enum_ref != enum_ref {
                    return Err(self.illegal(format!(
                        "enum value does not belong to '{}'",
                        info.full_name
                    )));
                }
                ev.number
            }
            Value::String(name) => match info.value_by_name(name) {
                Some(v) => v.number,
                None => {
                    return Err(ValueError::IllegalEnumValue {
                        field: self.name.clone(),
                        value: name.clone(),
                    })
                }
            },
            other => match self.integer_of(other) {
                Some(n) => n,
                None => return Err(self.illegal(format!("{:?} is not an enum value", other))),
            },
        };

        // Named or numeric, the id must be declared.
        if info.value_by_number(number).is_none() {
            return Err(ValueError::IllegalEnumValue {
                field: self.name.clone(),
                value: number.to_string(),
            });
        }

        Ok(Value::Enum(EnumValue { enum_ref, number }))
    }

    /// The integer-family content of a value, if it has one. No parsing, no
    /// float truncation.
    fn integer_of(&self, value: &Value) -> Option<i64>
    {
        match value {
            Value::Int32(v) | Value::SInt32(v) | Value::SFixed32(v) => Some(i64::from(*v)),
            Value::Int64(v) | Value::SInt64(v) | Value::SFixed64(v) => Some(*v),
            Value::UInt32(v) | Value::Fixed32(v) => Some(i64::from(*v)),
            Value::UInt64(v) | Value::Fixed64(v) => Some(*v as i64),
            Value::Enum(ev) => Some(ev.number),
            _ => None,
        }
    }

    fn integer_value(&self, value: &Value) -> Result<i64, ValueError>
    {
        if let Some(n) = self.integer_of(value) {
            return Ok(n);
        }

        match value {
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(n) => Ok(n),
                Err(..) => Err(self.illegal(format!("cannot parse '{}' as an integer", s))),
            },
            Value::Float(f) => self.float_to_integer(f64::from(*f)),
            Value::Double(f) => self.float_to_integer(*f),
            other => Err(self.illegal(format!("{:?} is not an integer", other))),
        }
    }

    fn unsigned_value(&self, value: &Value) -> Result<u64, ValueError>
    {
        match value {
            Value::UInt64(v) | Value::Fixed64(v) => Ok(*v),
            Value::UInt32(v) | Value::Fixed32(v) => Ok(u64::from(*v)),
            Value::String(s) => match s.trim().parse::<u64>() {
                Ok(n) => Ok(n),
                Err(..) => Err(self.illegal(format!("cannot parse '{}' as an unsigned integer", s))),
            },
            Value::Float(f) => self.float_to_unsigned(f64::from(*f)),
            Value::Double(f) => self.float_to_unsigned(*f),
            // Negative signed values wrap, matching unsigned reinterpretation.
            other => match self.integer_of(other) {
                Some(n) => Ok(n as u64),
                None => Err(self.illegal(format!("{:?} is not an unsigned integer", other))),
            },
        }
    }

    fn float_value(&self, value: &Value) -> Result<f64, ValueError>
    {
        match value {
            Value::Double(v) => Ok(*v),
            Value::Float(v) => Ok(f64::from(*v)),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) => Ok(f),
                Err(..) => Err(self.illegal(format!("cannot parse '{}' as a number", s))),
            },
            other => match self.integer_of(other) {
                Some(n) => Ok(n as f64),
                None => Err(self.illegal(format!("{:?} is not a number", other))),
            },
        }
    }

    fn float_to_integer(&self, f: f64) -> Result<i64, ValueError>
    {
        if f.is_nan() {
            return Err(self.illegal("NaN is not an integer".to_string()));
        }
        Ok(f as i64)
    }

    fn float_to_unsigned(&self, f: f64) -> Result<u64, ValueError>
    {
        if f.is_nan() {
            return Err(self.illegal("NaN is not an integer".to_string()));
        }
        Ok(f as u64)
    }

    fn illegal(&self, detail: String) -> ValueError
    {
        ValueError::IllegalValue {
            field: self.name.clone(),
            detail,
        }
    }
}

#[cfg(test)]
mod test
{
    use super::*;
    use crate::context::Context;

    fn person_context() -> Context
    {
        Context::parse(&[r#"
            message Person {
                required string name = 1;
                optional int32 age = 2;
                repeated string email = 3;
            }

            enum Mood {
                CALM = 0;
                GRUMPY = 1;
            }

            message Fish {
                optional Mood mood = 1;
                optional Person owner = 2;
            }
        "#])
        .unwrap()
    }

    #[test]
    fn singular_set_get()
    {
        let ctx = person_context();
        let person = ctx.get_message("Person").unwrap();
        let mut value = person.new_value(&ctx).unwrap();

        value
            .set(&ctx, "name", Value::String("Niilo".to_string()))
            .unwrap();
        value.set(&ctx, "age", Value::Int32(7)).unwrap();

        assert_eq!(
            value.get(&ctx, "name"),
            Some(&Value::String("Niilo".to_string()))
        );
        assert_eq!(value.get(&ctx, "age"), Some(&Value::Int32(7)));
        assert_eq!(value.get(&ctx, "email"), None);
        assert!(value.get(&ctx, "nonexistent").is_none());
    }

    #[test]
    fn repeated_add_and_set()
    {
        let ctx = person_context();
        let person = ctx.get_message("Person").unwrap();
        let mut value = person.new_value(&ctx).unwrap();

        value
            .add(&ctx, "email", Value::String("a@x".to_string()))
            .unwrap();
        value
            .add(&ctx, "email", Value::String("b@x".to_string()))
            .unwrap();
        assert_eq!(value.get_all(&ctx, "email").len(), 2);

        // A single set replaces the whole sequence.
        value
            .set(&ctx, "email", Value::String("c@x".to_string()))
            .unwrap();
        assert_eq!(
            value.get_all(&ctx, "email"),
            &[Value::String("c@x".to_string())][..]
        );

        // add() refuses singular fields.
        assert!(value.add(&ctx, "age", Value::Int32(1)).is_err());

        // Sequences never land in singular fields.
        assert!(value
            .set_all(&ctx, "age", vec![Value::Int32(1), Value::Int32(2)])
            .is_err());
    }

    #[test]
    fn integer_coercion()
    {
        let ctx = person_context();
        let person = ctx.get_message("Person").unwrap();
        let age = person.get_field_by_name("age").unwrap();

        assert_eq!(
            age.verify(&ctx, Value::Int64(0x1_0000_0001)).unwrap(),
            Value::Int32(1)
        );
        assert_eq!(
            age.verify(&ctx, Value::String("30".to_string())).unwrap(),
            Value::Int32(30)
        );
        assert_eq!(
            age.verify(&ctx, Value::Double(30.9)).unwrap(),
            Value::Int32(30)
        );
        assert!(age.verify(&ctx, Value::Double(f64::NAN)).is_err());
        assert!(age
            .verify(&ctx, Value::String("thirty".to_string()))
            .is_err());
    }

    #[test]
    fn enum_by_name_and_id()
    {
        let ctx = person_context();
        let fish = ctx.get_message("Fish").unwrap();
        let mood = fish.get_field_by_name("mood").unwrap();
        let enum_ref = ctx.get_enum("Mood").unwrap().self_ref;

        let by_name = mood
            .verify(&ctx, Value::String("GRUMPY".to_string()))
            .unwrap();
        let by_id = mood.verify(&ctx, Value::Int32(1)).unwrap();
        assert_eq!(by_name, by_id);
        assert_eq!(
            by_name,
            Value::Enum(EnumValue { enum_ref, number: 1 })
        );

        assert!(mood.verify(&ctx, Value::String("SLEEPY".to_string())).is_err());
        assert!(mood.verify(&ctx, Value::Int32(7)).is_err());
    }

    #[test]
    fn message_type_check()
    {
        let ctx = person_context();
        let fish = ctx.get_message("Fish").unwrap();
        let person = ctx.get_message("Person").unwrap();

        let mut value = fish.new_value(&ctx).unwrap();
        let owner = person.new_value(&ctx).unwrap();
        value
            .set(&ctx, "owner", Value::Message(Box::new(owner)))
            .unwrap();

        // A Fish is not a Person.
        let other = fish.new_value(&ctx).unwrap();
        assert!(value
            .set(&ctx, "owner", Value::Message(Box::new(other)))
            .is_err());
    }

    #[test]
    fn bool_strings()
    {
        let ctx = Context::parse(&[r#"
            message Flags {
                optional bool on = 1;
            }
        "#])
        .unwrap();
        let flags = ctx.get_message("Flags").unwrap();
        let on = flags.get_field_by_name("on").unwrap();

        assert_eq!(
            on.verify(&ctx, Value::String("true".to_string())).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            on.verify(&ctx, Value::String("false".to_string())).unwrap(),
            Value::Bool(false)
        );
        assert!(on.verify(&ctx, Value::String("TRUE".to_string())).is_err());
        assert_eq!(on.verify(&ctx, Value::Int32(2)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn defaults_applied()
    {
        let ctx = Context::parse(&[r#"
            enum Mood {
                CALM = 0;
                GRUMPY = 1;
            }

            message Defaults {
                optional int32 answer = 1 [ default = 42 ];
                optional string greeting = 2 [ default = "hello" ];
                optional Mood mood = 3 [ default = GRUMPY ];
                optional bool flag = 4 [ default = true ];
            }
        "#])
        .unwrap();

        let defaults = ctx.get_message("Defaults").unwrap();
        let value = defaults.new_value(&ctx).unwrap();

        assert_eq!(value.get(&ctx, "answer"), Some(&Value::Int32(42)));
        assert_eq!(
            value.get(&ctx, "greeting"),
            Some(&Value::String("hello".to_string()))
        );
        assert_eq!(value.get(&ctx, "flag"), Some(&Value::Bool(true)));

        let enum_ref = ctx.get_enum("Mood").unwrap().self_ref;
        assert_eq!(
            value.get(&ctx, "mood"),
            Some(&Value::Enum(EnumValue { enum_ref, number: 1 }))
        );
    }

    #[test]
    fn positional_construction()
    {
        let ctx = person_context();
        let person = ctx.get_message("Person").unwrap();

        let value = person
            .value_from_positional(
                &ctx,
                vec![
                    Value::String("Niilo".to_string()),
                    Value::Int32(7),
                    Value::String("niilo@x".to_string()),
                ],
            )
            .unwrap();

        assert_eq!(
            value.get(&ctx, "name"),
            Some(&Value::String("Niilo".to_string()))
        );
        assert_eq!(
            value.get_all(&ctx, "email"),
            &[Value::String("niilo@x".to_string())][..]
        );

        assert!(person
            .value_from_positional(&ctx, vec![Value::Int32(0); 4])
            .is_err());
    }

    #[test]
    fn to_raw_skips_bytes()
    {
        let ctx = Context::parse(&[r#"
            message Blob {
                optional string name = 1;
                optional bytes data = 2;
            }
        "#])
        .unwrap();

        let blob = ctx.get_message("Blob").unwrap();
        let mut value = blob.new_value(&ctx).unwrap();
        value
            .set(&ctx, "name", Value::String("b".to_string()))
            .unwrap();
        value
            .set(&ctx, "data", Value::Bytes(Bytes::from_static(b"\x01\x02")))
            .unwrap();

        let without = value.to_raw(&ctx, false);
        assert!(without.contains_key("name"));
        assert!(!without.contains_key("data"));

        let with = value.to_raw(&ctx, true);
        assert_eq!(
            with.get("data"),
            Some(&RawValue::Value(Value::Bytes(Bytes::from_static(b"\x01\x02"))))
        );
    }
}
