use super::*;
use crate::wire;

impl Context
{
    /// Create a new, empty context.
    pub fn new() -> Self
    {
        Context {
            packages: Default::default(),
            types: Default::default(),
            types_by_name: Default::default(),
            services: Default::default(),
            services_by_name: Default::default(),
        }
    }

    /// Resolves a package reference.
    ///
    /// Will **panic** if the package defined by the `PackageRef` does not exist in this context.
    /// Such panic means the `PackageRef` came from a different context.
    pub fn resolve_package(&self, package_ref: PackageRef) -> &Package
    {
        &self.packages[package_ref.0 .0]
    }

    /// Gets type info by full name.
    pub fn get_type(&self, full_name: &str) -> Option<&TypeInfo>
    {
        self.types_by_name
            .get(full_name)
            .map(|idx| &self.types[*idx])
    }

    /// Gets a message type info by full name.
    pub fn get_message(&self, full_name: &str) -> Option<&MessageInfo>
    {
        match self.get_type(full_name) {
            Some(TypeInfo::Message(m)) => Some(m),
            _ => None,
        }
    }

    /// Gets an enum type info by full name.
    pub fn get_enum(&self, full_name: &str) -> Option<&EnumInfo>
    {
        match self.get_type(full_name) {
            Some(TypeInfo::Enum(e)) => Some(e),
            _ => None,
        }
    }

    fn resolve_type(&self, tr: InternalRef) -> Option<&TypeInfo>
    {
        self.types.get(tr.0)
    }

    /// Resolves a message reference.
    ///
    /// Will **panic** if the message defined by the `MessageRef` does not exist in this context.
    /// Such panic means the `MessageRef` came from a different context. The panic is not
    /// guaranteed, as a message with an equal `MessageRef` may exist in multiple contexts.
    pub fn resolve_message(&self, tr: MessageRef) -> &MessageInfo
    {
        match self.resolve_type(tr.0) {
            Some(TypeInfo::Message(msg)) => msg,
            _ => panic!("Message did not exist in this context"),
        }
    }

    /// Resolves an enum reference.
    ///
    /// Will **panic** if the enum defined by the `EnumRef` does not exist in this context.
    /// Such panic means the `EnumRef` came from a different context. The panic is not
    /// guaranteed, as an enum with an equal `EnumRef` may exist in multiple contexts.
    pub fn resolve_enum(&self, tr: EnumRef) -> &EnumInfo
    {
        match self.resolve_type(tr.0) {
            Some(TypeInfo::Enum(e)) => e,
            _ => panic!("Enum did not exist in this context"),
        }
    }

    /// Gets a service by full name.
    pub fn get_service(&self, full_name: &str) -> Option<&Service>
    {
        self.services_by_name
            .get(full_name)
            .map(|idx| &self.services[*idx])
    }

    /// Resolves a service reference.
    ///
    /// Will **panic** if the service defined by the `ServiceRef` does not exist in this context.
    /// Such panic means the `ServiceRef` came from a different context.
    pub fn resolve_service(&self, tr: ServiceRef) -> &Service
    {
        match self.services.get((tr.0).0) {
            Some(service) => service,
            None => panic!("Service did not exist in this context"),
        }
    }

    /// Resolves a symbolic type reference the way a field type reference is
    /// bound: relative to `scope`, with lexical fallback through the
    /// ancestor namespaces.
    ///
    /// `scope` is the full name of the namespace the reference appears in; an
    /// empty scope means the root. A reference starting with `.` is absolute
    /// and is looked up from the root only. Returns `None` when no ancestor
    /// scope contains a match; the caller decides whether that is an error.
    pub fn resolve_symbol(&self, scope: &str, reference: &str) -> Option<&TypeInfo>
    {
        if let Some(absolute) = reference.strip_prefix('.') {
            return self.get_type(absolute);
        }

        let mut current = scope;
        loop {
            let lookup = match current.is_empty() {
                true => reference.to_string(),
                false => format!("{}.{}", current, reference),
            };

            if let Some(t) = self.get_type(&lookup) {
                return Some(t);
            }

            if current.is_empty() {
                return None;
            }

            current = match current.rfind('.') {
                Some(i) => &current[..i],
                None => "",
            };
        }
    }
}

impl Package
{
    /// Package name. `None` for the anonymous package.
    pub fn name(&self) -> Option<&str>
    {
        self.name.as_deref()
    }
}

impl TypeInfo
{
    /// Get the local name of the type.
    pub fn name(&self) -> &str
    {
        match self {
            TypeInfo::Message(m) => &m.name,
            TypeInfo::Enum(e) => &e.name,
        }
    }

    /// Get the full name of the type.
    pub fn full_name(&self) -> &str
    {
        match self {
            TypeInfo::Message(m) => &m.full_name,
            TypeInfo::Enum(e) => &e.full_name,
        }
    }

    /// Get the parent information for the type.
    pub fn parent(&self) -> TypeParent
    {
        match self {
            TypeInfo::Message(m) => m.parent,
            TypeInfo::Enum(e) => e.parent,
        }
    }
}

impl MessageInfo
{
    /// Iterates all message fields in ascending field number order.
    pub fn iter_fields(&self) -> impl Iterator<Item = &MessageField>
    {
        self.fields.values()
    }

    /// Number of declared fields.
    pub fn field_count(&self) -> usize
    {
        self.fields.len()
    }

    /// Get a field by its number.
    pub fn get_field(&self, number: u64) -> Option<&MessageField>
    {
        self.fields.get(&number)
    }

    /// Get a field by its name.
    ///
    /// The active name is matched first; fields renamed by camel-case
    /// conversion remain reachable through their original name.
    pub fn get_field_by_name(&self, name: &str) -> Option<&MessageField>
    {
        if let Some(number) = self.fields_by_name.get(name) {
            return self.get_field(*number);
        }

        self.fields
            .values()
            .find(|f| f.original_name == name)
    }
}

impl EnumInfo
{
    /// Iterates the enum values in declaration order.
    pub fn iter_values(&self) -> impl Iterator<Item = &EnumField>
    {
        self.values.iter()
    }

    /// Gets a value by its declared name.
    pub fn value_by_name(&self, name: &str) -> Option<&EnumField>
    {
        self.values.iter().find(|v| v.name == name)
    }

    /// Gets a value by its numeric id.
    ///
    /// If values alias the same id, the first declared one is returned.
    pub fn value_by_number(&self, number: i64) -> Option<&EnumField>
    {
        self.values.iter().find(|v| v.number == number)
    }
}

impl Service
{
    /// Gets an `Rpc` info by operation name.
    pub fn rpc_by_name(&self, name: &str) -> Option<&Rpc>
    {
        self.rpcs_by_name.get(name).map(|idx| &self.rpcs[*idx])
    }

    /// Full dotted name of an operation of this service.
    pub fn rpc_full_name(&self, rpc: &Rpc) -> String
    {
        format!("{}.{}", self.full_name, rpc.name)
    }
}

impl ValueType
{
    /// Wire type used to frame values of this type.
    pub fn wire_type(&self) -> u8
    {
        match self {
            Self::Double => wire::WIRE_FIXED64,
            Self::Float => wire::WIRE_FIXED32,
            Self::Int32 => wire::WIRE_VARINT,
            Self::Int64 => wire::WIRE_VARINT,
            Self::UInt32 => wire::WIRE_VARINT,
            Self::UInt64 => wire::WIRE_VARINT,
            Self::SInt32 => wire::WIRE_VARINT,
            Self::SInt64 => wire::WIRE_VARINT,
            Self::Fixed32 => wire::WIRE_FIXED32,
            Self::Fixed64 => wire::WIRE_FIXED64,
            Self::SFixed32 => wire::WIRE_FIXED32,
            Self::SFixed64 => wire::WIRE_FIXED64,
            Self::Bool => wire::WIRE_VARINT,
            Self::String => wire::WIRE_LEN_DELIMITED,
            Self::Bytes => wire::WIRE_LEN_DELIMITED,
            Self::Message(..) => wire::WIRE_LEN_DELIMITED,
            Self::Group(..) => wire::WIRE_START_GROUP,
            Self::Enum(..) => wire::WIRE_VARINT,
        }
    }

    /// True for the scalar types that may be encoded as a packed run.
    pub fn packable(&self) -> bool
    {
        match self {
            Self::String | Self::Bytes | Self::Message(..) | Self::Group(..) => false,
            _ => true,
        }
    }
}
