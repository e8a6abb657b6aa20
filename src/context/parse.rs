use bytes::{BufMut, Bytes, BytesMut};
use pest::{iterators::Pair, Parser};
use snafu::ResultExt;

use super::builder::*;
use super::*;
use crate::wire;

#[derive(pest_derive::Parser)]
#[grammar = "proto.pest"]
struct ProtoParser;

/// Schema parsing options.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParseOptions
{
    /// Rewrite `snake_case` field names to `camelCase` at build time. The
    /// original name is retained on the field and stays valid for lookups.
    pub convert_fields_to_camel_case: bool,
}

impl Context
{
    /// Parses the files and creates a reflection context.
    pub fn parse<T, S>(files: T) -> Result<Self, ParseError>
    where
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::parse_with(files, ParseOptions::default())
    }

    /// Parses the files and creates a reflection context with explicit
    /// [`ParseOptions`].
    pub fn parse_with<T, S>(files: T, options: ParseOptions) -> Result<Self, ParseError>
    where
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let builder = ContextBuilder {
            packages: files
                .into_iter()
                .map(|f| PackageBuilder::parse_str(f.as_ref()))
                .collect::<Result<_, _>>()?,
        };

        builder.build(options)
    }
}

impl PackageBuilder
{
    pub fn parse_str(input: &str) -> Result<Self, ParseError>
    {
        let pairs = ProtoParser::parse(Rule::proto, input)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            .context(SyntaxError {})?;

        let mut current_package = PackageBuilder::default();
        for pair in pairs {
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::syntax => {}
                    Rule::topLevelDef => current_package
                        .types
                        .push(ProtobufItemBuilder::parse(inner)),
                    Rule::import => {}
                    Rule::package => {
                        current_package.name =
                            Some(inner.into_inner().next().unwrap().as_str().to_string())
                    }
                    Rule::option => {}
                    Rule::emptyStatement => {}
                    Rule::EOI => {}
                    r => unreachable!("{:?}: {:?}", r, inner),
                }
            }
        }

        Ok(current_package)
    }
}

impl ProtobufItemBuilder
{
    pub fn parse(p: Pair<Rule>) -> Self
    {
        let pair = p.into_inner().next().unwrap();
        match pair.as_rule() {
            Rule::message => {
                ProtobufItemBuilder::Type(ProtobufTypeBuilder::Message(MessageBuilder::parse(pair)))
            }
            Rule::enum_ => {
                ProtobufItemBuilder::Type(ProtobufTypeBuilder::Enum(EnumBuilder::parse(pair)))
            }
            Rule::service => ProtobufItemBuilder::Service(ServiceBuilder::parse(pair)),
            r => unreachable!("{:?}: {:?}", r, pair),
        }
    }
}

impl MessageBuilder
{
    pub fn parse(p: Pair<Rule>) -> Self
    {
        let mut inner = p.into_inner();
        let name = inner.next().unwrap().as_str().to_string();
        let body = inner.next().unwrap();
        Self::parse_body(name, false, body)
    }

    /// Parses a message body into a builder. Shared between `message`
    /// definitions and legacy `group` fields, which declare a nested group
    /// message inline.
    fn parse_body(name: String, group: bool, body: Pair<Rule>) -> Self
    {
        let mut builder = MessageBuilder {
            name,
            group,
            ..Default::default()
        };

        for p in body.into_inner() {
            match p.as_rule() {
                Rule::field => builder.fields.push(FieldBuilder::parse(p)),
                Rule::group => {
                    let (inner_type, field) = parse_group(p);
                    builder
                        .inner_types
                        .push(InnerTypeBuilder::Message(inner_type));
                    builder.fields.push(field);
                }
                Rule::enum_ => builder
                    .inner_types
                    .push(InnerTypeBuilder::Enum(EnumBuilder::parse(p))),
                Rule::message => builder
                    .inner_types
                    .push(InnerTypeBuilder::Message(MessageBuilder::parse(p))),
                Rule::extensions => {
                    let (min, max) = parse_extensions(p);
                    builder.extensions = Some(match builder.extensions {
                        Some((old_min, old_max)) => (old_min.min(min), old_max.max(max)),
                        None => (min, max),
                    });
                }
                Rule::option => builder.options.push(ProtoOption::parse(p)),
                Rule::reserved => {} // Reserved numbers and names are not tracked.
                Rule::emptyStatement => {}
                r => unreachable!("{:?}: {:?}", r, p),
            }
        }

        builder
    }
}

/// Parses a `group` statement into the nested group message and the field
/// that carries it. The field is named after the group, lowercased, as the
/// protocol specifies.
fn parse_group(p: Pair<Rule>) -> (MessageBuilder, FieldBuilder)
{
    let mut inner = p.into_inner();
    let rule = parse_label(inner.next().unwrap());
    let name = inner.next().unwrap().as_str().to_string();
    let number = parse_uint_literal(inner.next().unwrap());
    let body = inner.next().unwrap();

    let message = MessageBuilder::parse_body(name.clone(), true, body);
    let field = FieldBuilder {
        rule,
        field_type: FieldTypeBuilder::UnresolvedGroup(name.clone()),
        name: name.to_lowercase(),
        number,
        options: vec![],
    };

    (message, field)
}

fn parse_extensions(p: Pair<Rule>) -> (u64, u64)
{
    let mut min = u64::max_value();
    let mut max = 0;

    for range in p.into_inner() {
        let mut inner = range.into_inner();
        let lo = parse_uint_literal(inner.next().unwrap());
        let hi = match inner.next() {
            Some(p) => match p.into_inner().next() {
                Some(num) => parse_uint_literal(num),
                None => wire::ID_MAX, // `max`
            },
            None => lo,
        };

        min = min.min(lo);
        max = max.max(hi);
    }

    (min, max)
}

impl EnumBuilder
{
    fn parse(p: Pair<Rule>) -> EnumBuilder
    {
        let mut inner = p.into_inner();
        let name = inner.next().unwrap().as_str().to_string();

        let mut values = vec![];
        let mut options = vec![];
        let body = inner.next().unwrap();
        for p in body.into_inner() {
            match p.as_rule() {
                Rule::enumField => {
                    let mut inner = p.into_inner();
                    values.push(EnumField {
                        name: inner.next().unwrap().as_str().to_string(),
                        number: parse_int_literal(inner.next().unwrap()),
                        options: match inner.next() {
                            Some(p) => ProtoOption::parse_options(p),
                            None => vec![],
                        },
                    })
                }
                Rule::option => options.push(ProtoOption::parse(p)),
                Rule::emptyStatement => {}
                r => unreachable!("{:?}: {:?}", r, p),
            }
        }

        EnumBuilder {
            name,
            values,
            options,
        }
    }
}

impl ServiceBuilder
{
    pub fn parse(p: Pair<Rule>) -> Self
    {
        let mut inner = p.into_inner();
        let name = inner.next().unwrap();
        let mut rpcs = vec![];
        let mut options = vec![];
        for p in inner {
            match p.as_rule() {
                Rule::option => options.push(ProtoOption::parse(p)),
                Rule::rpc => rpcs.push(RpcBuilder::parse(p)),
                Rule::emptyStatement => {}
                r => unreachable!("{:?}: {:?}", r, p),
            }
        }

        ServiceBuilder {
            name: name.as_str().to_string(),
            rpcs,
            options,
        }
    }
}

impl FieldBuilder
{
    pub fn parse(p: Pair<Rule>) -> Self
    {
        let mut inner = p.into_inner();
        let rule = parse_label(inner.next().unwrap());
        let field_type = parse_field_type(inner.next().unwrap().as_str());
        let name = inner.next().unwrap().as_str().to_string();
        let number = parse_uint_literal(inner.next().unwrap());

        let options = match inner.next() {
            Some(p) => ProtoOption::parse_options(p),
            None => vec![],
        };

        FieldBuilder {
            rule,
            field_type,
            name,
            number,
            options,
        }
    }
}

fn parse_label(p: Pair<Rule>) -> FieldRule
{
    match p.as_str() {
        "required" => FieldRule::Required,
        "optional" => FieldRule::Optional,
        "repeated" => FieldRule::Repeated,
        r => unreachable!("{:?}: {:?}", r, p),
    }
}

fn parse_field_type(t: &str) -> FieldTypeBuilder
{
    FieldTypeBuilder::Builtin(match t {
        "double" => ValueType::Double,
        "float" => ValueType::Float,
        "int32" => ValueType::Int32,
        "int64" => ValueType::Int64,
        "uint32" => ValueType::UInt32,
        "uint64" => ValueType::UInt64,
        "sint32" => ValueType::SInt32,
        "sint64" => ValueType::SInt64,
        "fixed32" => ValueType::Fixed32,
        "fixed64" => ValueType::Fixed64,
        "sfixed32" => ValueType::SFixed32,
        "sfixed64" => ValueType::SFixed64,
        "bool" => ValueType::Bool,
        "string" => ValueType::String,
        "bytes" => ValueType::Bytes,
        _ => return FieldTypeBuilder::Unresolved(t.to_string()),
    })
}

impl RpcBuilder
{
    pub fn parse(p: Pair<Rule>) -> Self
    {
        let mut inner = p.into_inner();
        let name = inner.next().unwrap();
        let input = inner.next().unwrap().as_str().to_string();
        let output = inner.next().unwrap().as_str().to_string();

        let mut options = vec![];
        for p in inner {
            match p.as_rule() {
                Rule::option => options.push(ProtoOption::parse(p)),
                Rule::emptyStatement => {}
                r => unreachable!("{:?}: {:?}", r, p),
            }
        }

        RpcBuilder {
            name: name.as_str().to_string(),
            input,
            output,
            options,
        }
    }
}

pub fn parse_uint_literal(p: Pair<Rule>) -> u64
{
    match p.as_rule() {
        Rule::fieldNumber => {
            let lit = p.into_inner().next().unwrap();
            match lit.as_rule() {
                Rule::decimalLit => str::parse(lit.as_str()).unwrap(),
                Rule::octalLit => u64::from_str_radix(&lit.as_str()[1..], 8).unwrap(),
                Rule::hexLit => u64::from_str_radix(&lit.as_str()[2..], 16).unwrap(),
                r => unreachable!("{:?}: {:?}", r, lit),
            }
        }
        r => unreachable!("{:?}: {:?}", r, p),
    }
}

pub fn parse_int_literal(p: Pair<Rule>) -> i64
{
    match p.as_rule() {
        Rule::intLit => {
            let mut inner = p.into_inner();
            let first = inner.next().unwrap();
            let (sign, lit) = match first.as_rule() {
                Rule::sign if first.as_str() == "-" => (-1, inner.next().unwrap()),
                Rule::sign => (1, inner.next().unwrap()),
                _ => (1, first),
            };
            match lit.as_rule() {
                Rule::decimalLit => sign * str::parse::<i64>(lit.as_str()).unwrap(),
                Rule::octalLit => sign * i64::from_str_radix(&lit.as_str()[1..], 8).unwrap(),
                Rule::hexLit => sign * i64::from_str_radix(&lit.as_str()[2..], 16).unwrap(),
                r => unreachable!("{:?}: {:?}", r, lit),
            }
        }
        r => unreachable!("{:?}: {:?}", r, p),
    }
}

pub fn parse_float_literal(p: Pair<Rule>) -> f64
{
    match p.as_rule() {
        Rule::floatLit => p.as_str().parse::<f64>().unwrap(),
        r => unreachable!("{:?}: {:?}", r, p),
    }
}

impl ProtoOption
{
    fn parse(p: Pair<Rule>) -> Self
    {
        let mut inner = p.into_inner();
        Self {
            name: parse_ident(inner.next().unwrap()),
            value: Constant::parse(inner.next().unwrap()),
        }
    }

    /// Parses an option list attached to a field or an enum value.
    fn parse_options(p: Pair<Rule>) -> Vec<Self>
    {
        p.into_inner()
            .map(|p| match p.as_rule() {
                Rule::fieldOption => Self::parse(p),
                r => unreachable!("{:?}: {:?}", r, p),
            })
            .collect()
    }
}

impl Constant
{
    fn parse(p: Pair<Rule>) -> Self
    {
        let p = p.into_inner().next().unwrap();
        match p.as_rule() {
            Rule::fullIdent => Constant::Ident(parse_ident(p)),
            Rule::intLit => Constant::Integer(parse_int_literal(p)),
            Rule::floatLit => Constant::Float(parse_float_literal(p)),
            Rule::strLit => Constant::String(parse_string_literal(p)),
            Rule::boolLit => Constant::Bool(p.as_str() == "true"),
            r => unreachable!("{:?}: {:?}", r, p),
        }
    }
}

fn parse_ident(p: Pair<Rule>) -> String
{
    let mut ident = vec![];
    let mut inner = p.into_inner();

    let first = inner.next().unwrap();
    match first.as_rule() {
        Rule::ident => ident.push(first.as_str().to_string()),
        Rule::fullIdent => ident.push(format!("({})", parse_ident(first))),
        r => unreachable!("{:?}: {:?}", r, first),
    }

    for other in inner {
        match other.as_rule() {
            Rule::ident => ident.push(other.as_str().to_string()),
            r => unreachable!("{:?}: {:?}", r, other),
        }
    }

    ident.join(".")
}

fn parse_string_literal(s: Pair<Rule>) -> Bytes
{
    let inner = s.into_inner();
    let mut output = BytesMut::new();
    for c in inner {
        let c = c.into_inner().next().unwrap();
        match c.as_rule() {
            Rule::hexEscape => {
                output.put_u8(
                    u8::from_str_radix(c.into_inner().next().unwrap().as_str(), 16).unwrap(),
                );
            }
            Rule::octEscape => {
                output.put_u8(
                    u8::from_str_radix(c.into_inner().next().unwrap().as_str(), 8).unwrap(),
                );
            }
            Rule::charEscape => match c.into_inner().next().unwrap().as_str() {
                "a" => output.put_u8(0x07),
                "b" => output.put_u8(0x08),
                "f" => output.put_u8(0x0C),
                "n" => output.put_u8(0x0A),
                "r" => output.put_u8(0x0D),
                "t" => output.put_u8(0x09),
                "v" => output.put_u8(0x0B),
                "\\" => output.put_u8(0x5C),
                "\'" => output.put_u8(0x27),
                "\"" => output.put_u8(0x22),
                o => unreachable!("Invalid escape sequence \\{}", o),
            },
            Rule::anyChar => output.put(c.as_str().as_bytes()),
            r => unreachable!("{:?}: {:?}", r, c),
        }
    }
    output.freeze()
}
