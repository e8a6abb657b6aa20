//! Reflection context describing a proto2 schema.
//!
//! The context is an arena of schema nodes. Entities refer to each other
//! through typed handles ([`MessageRef`], [`EnumRef`], ...) instead of owned
//! back pointers, which keeps the tree acyclic: a node's parent is a handle,
//! never an owning reference.

use bytes::Bytes;
use snafu::Snafu;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

mod api;
mod builder;
mod modify_api;
mod parse;

pub use parse::ParseOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InternalRef(usize);

/// A reference to a message. Can be resolved to `MessageInfo` through a `Context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(InternalRef);

/// A reference to an enum. Can be resolved to `EnumInfo` through a `Context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumRef(InternalRef);

/// A reference to a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageRef(InternalRef);

/// A reference to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceRef(InternalRef);

/// Protoreef schema construction error type.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ParseError
{
    /// Syntax error in the input files.
    #[snafu(display("Parsing error: {}", source))]
    SyntaxError
    {
        /// Source error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Duplicate type.
    #[snafu(display("Duplicate type: {}", name))]
    DuplicateType
    {
        /// Type.
        name: String,
    },

    /// Unknown type reference.
    #[snafu(display("Unknown type '{}' in '{}'", name, context))]
    TypeNotFound
    {
        /// Type name.
        name: String,
        /// Type that referred to the unknown type.
        context: String,
    },

    /// Wrong kind of type used in a specific context.
    #[snafu(display(
        "Invalid type '{}' ({:?}) for {}, expected {:?}",
        type_name,
        actual,
        context,
        expected
    ))]
    InvalidTypeKind
    {
        /// Type that is of the wrong kind.
        type_name: String,

        /// The context where the type was used.
        context: &'static str,

        /// Expected item type.
        expected: ItemType,

        /// Actual item type.
        actual: ItemType,
    },

    /// A field definition could not be added to its message.
    #[snafu(display("Invalid field '{}' in '{}': {:?}", name, message, detail))]
    InvalidField
    {
        /// Field name.
        name: String,

        /// Message the field belongs to.
        message: String,

        /// What went wrong.
        detail: MemberInsertError,
    },
}

/// Error modifying the context.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum InsertError
{
    /// A type conflicts with an existing type.
    TypeExists
    {
        /// The previous type that conflicts with the new one.
        original: TypeRef,
    },

    /// A service conflicts with an existing service.
    ServiceExists
    {
        /// Full name of the conflicting service.
        name: String,
    },
}

/// Error adding a member to a message or an enum.
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub enum MemberInsertError
{
    /// A field with the same number already exists.
    NumberConflict,

    /// A field with the same name already exists and the name-reversion rule
    /// did not apply.
    NameConflict,

    /// The field number lies outside the valid id range.
    NumberOutOfRange,

    /// The field number lies inside the extension range of the message.
    NumberInExtensionRange,
}

/// Type reference that references either message or enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef
{
    /// Message type reference.
    Message(MessageRef),

    /// Enum type reference.
    Enum(EnumRef),
}

/// Protobuf item type
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemType
{
    /// `message` item
    Message,

    /// `enum` item
    Enum,

    /// `service` item
    Service,
}

/// Protoreef reflection context.
///
/// Contains the schema information parsed from proto2 files or built by hand.
/// Required for constructing, encoding and decoding message values.
#[derive(Default, Debug, PartialEq)]
pub struct Context
{
    packages: Vec<Package>,
    types: Vec<TypeInfo>,
    types_by_name: HashMap<String, usize>,
    services: Vec<Service>,
    services_by_name: HashMap<String, usize>,
}

/// Package details.
#[derive(Debug, PartialEq)]
pub struct Package
{
    /// Package name. None for an anonymous package.
    name: Option<String>,

    /// Package self reference.
    self_ref: PackageRef,

    /// Top level types.
    types: Vec<TypeRef>,

    /// Services.
    services: Vec<usize>,
}

/// Message or enum type.
#[derive(Debug, PartialEq)]
pub enum TypeInfo
{
    /// Message.
    Message(MessageInfo),

    /// Enum.
    Enum(EnumInfo),
}

/// Message details
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub struct MessageInfo
{
    /// Message name.
    pub name: String,

    /// Full message name, including package and parent type names.
    pub full_name: String,

    /// Parent
    pub parent: TypeParent,

    /// `MessageRef` that references this message.
    pub self_ref: MessageRef,

    /// True when the message was declared through the legacy `group` syntax.
    ///
    /// Group values are framed with start/end tags on the wire instead of a
    /// length prefix.
    pub group: bool,

    /// Declared extension number range, inclusive on both ends.
    pub extensions: Option<(u64, u64)>,

    /// References to the inner types defined within this message.
    pub inner_types: Vec<TypeRef>,

    /// Message options.
    pub options: Vec<ProtoOption>,

    // Keyed by field number to keep iteration in canonical wire order.
    fields: BTreeMap<u64, MessageField>,
    fields_by_name: BTreeMap<String, u64>,
}

/// Reference to a type parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParent
{
    /// Reference to a package for top-level types.
    Package(PackageRef),

    /// Reference to a message for inner types.
    Message(MessageRef),
}

/// Enum details
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub struct EnumInfo
{
    /// Enum name.
    pub name: String,

    /// Full enum name, including package and parent type names.
    pub full_name: String,

    /// Parent
    pub parent: TypeParent,

    /// `EnumRef` that references this enum.
    pub self_ref: EnumRef,

    /// Enum options.
    pub options: Vec<ProtoOption>,

    // Declaration order is meaningful and preserved.
    values: Vec<EnumField>,
}

/// Message field details.
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub struct MessageField
{
    /// Field name. Equal to `original_name` unless camel-case conversion was
    /// requested at build time.
    pub name: String,

    /// Field name as written in the schema source.
    pub original_name: String,

    /// Field number.
    pub number: u64,

    /// Field type
    pub field_type: ValueType,

    /// Field rule: required, optional or repeated (optionally packed).
    pub multiplicity: Multiplicity,

    /// Field options.
    pub options: Vec<ProtoOption>,

    /// Declared `[default = ...]` constant, if any. Converted to a typed
    /// value when a message value is constructed.
    pub default: Option<Constant>,
}

/// Defines the rule and multiplicity of the field values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Multiplicity
{
    /// Field must be present exactly once.
    Required,

    /// Field may be present at most once.
    Optional,

    /// Field may be repeated; each element carries its own tag.
    Repeated,

    /// Field may be repeated and is encoded as a single packed run.
    RepeatedPacked,
}

impl Multiplicity
{
    /// True for both repeated forms.
    pub fn is_repeated(self) -> bool
    {
        match self {
            Multiplicity::Repeated | Multiplicity::RepeatedPacked => true,
            _ => false,
        }
    }
}

/// Enum value details.
#[derive(Debug, PartialEq, Clone)]
#[non_exhaustive]
pub struct EnumField
{
    /// Enum value name.
    pub name: String,

    /// Numeric id of the enum value.
    pub number: i64,

    /// Options.
    pub options: Vec<ProtoOption>,
}

/// Field value types.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueType
{
    /// `double`
    Double,

    /// `float`
    Float,

    /// `int32`
    Int32,

    /// `int64`
    Int64,

    /// `uint32`
    UInt32,

    /// `uint64`
    UInt64,

    /// `sint32`
    SInt32,

    /// `sint64`
    SInt64,

    /// `fixed32`
    Fixed32,

    /// `fixed64`
    Fixed64,

    /// `sfixed32`
    SFixed32,

    /// `sfixed64`
    SFixed64,

    /// `bool`
    Bool,

    /// `string`
    String,

    /// `bytes`
    Bytes,

    /// A message type.
    Message(MessageRef),

    /// A legacy group type. The referenced message is framed with
    /// start-group/end-group tags instead of a length prefix.
    Group(MessageRef),

    /// An enum type.
    Enum(EnumRef),
}

/// Service details
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub struct Service
{
    /// Service name.
    pub name: String,

    /// Full service name, including the package name.
    pub full_name: String,

    /// Service self reference.
    pub self_ref: ServiceRef,

    /// Package that contains the service.
    pub parent: PackageRef,

    /// List of `rpc` operations defined in the service.
    pub rpcs: Vec<Rpc>,

    /// Options.
    pub options: Vec<ProtoOption>,

    rpcs_by_name: HashMap<String, usize>,
}

/// Rpc operation
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub struct Rpc
{
    /// Operation name.
    pub name: String,

    /// Resolved request message type.
    pub input: MessageRef,

    /// Resolved response message type.
    pub output: MessageRef,

    /// Options.
    pub options: Vec<ProtoOption>,
}

/// A single option.
#[derive(Debug, PartialEq, Clone)]
pub struct ProtoOption
{
    /// Option name.
    pub name: String,

    /// Option value.
    pub value: Constant,
}

/// Constant value, used for options and field defaults.
#[derive(Debug, PartialEq, Clone)]
pub enum Constant
{
    /// An ident `foo.bar.baz`.
    Ident(String),

    /// An integer constant.
    Integer(i64),

    /// A floating point constant.
    Float(f64),

    /// A string constant.
    ///
    /// The string isn't guaranteed to be well formed UTF-8 so it's stored as
    /// Bytes here.
    String(Bytes),

    /// A boolean constant.
    Bool(bool),
}

impl fmt::Display for TypeInfo
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match self {
            TypeInfo::Message(m) if m.group => write!(f, "Group {}", m.full_name),
            TypeInfo::Message(m) => write!(f, "Message {}", m.full_name),
            TypeInfo::Enum(e) => write!(f, "Enum {}", e.full_name),
        }
    }
}

impl fmt::Display for Service
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        write!(f, "Service {}", self.full_name)
    }
}

/// Rewrites a `snake_case` name into `camelCase`.
///
/// An underscore is removed and the character that follows it is uppercased.
pub(crate) fn to_camel_case(name: &str) -> String
{
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
