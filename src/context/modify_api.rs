use super::*;
use crate::wire;

impl Context
{
    /// Insert a new message definition to the context.
    pub fn insert_message(&mut self, ty: MessageInfo) -> Result<MessageRef, InsertError>
    {
        self.insert_type(TypeInfo::Message(ty)).map(MessageRef)
    }

    /// Insert a new enum definition to the context.
    pub fn insert_enum(&mut self, ty: EnumInfo) -> Result<EnumRef, InsertError>
    {
        self.insert_type(TypeInfo::Enum(ty)).map(EnumRef)
    }

    /// Insert a new package to the context.
    ///
    /// Returns an error if a package with the same name already exists.
    pub fn insert_package(&mut self, mut pkg: Package) -> Result<PackageRef, PackageRef>
    {
        let pkg_ref = PackageRef(InternalRef(self.packages.len()));
        for existing in &self.packages {
            if existing.name == pkg.name {
                return Err(existing.self_ref);
            }
        }

        pkg.self_ref = pkg_ref;
        self.packages.push(pkg);
        Ok(pkg_ref)
    }

    /// Insert a new service definition to the context.
    pub fn insert_service(&mut self, mut service: Service) -> Result<ServiceRef, InsertError>
    {
        let full_name = {
            let package = &self.packages[(service.parent.0).0];
            match &package.name {
                Some(package_name) => format!("{}.{}", package_name, service.name),
                None => service.name.clone(),
            }
        };

        if self.services_by_name.contains_key(&full_name) {
            return Err(InsertError::ServiceExists { name: full_name });
        }

        let idx = self.services.len();
        service.self_ref = ServiceRef(InternalRef(idx));
        service.full_name = full_name.clone();

        self.packages[(service.parent.0).0].services.push(idx);
        self.services_by_name.insert(full_name, idx);
        self.services.push(service);

        Ok(ServiceRef(InternalRef(idx)))
    }

    fn insert_type(&mut self, mut ty: TypeInfo) -> Result<InternalRef, InsertError>
    {
        use std::collections::hash_map::Entry;

        // First validate the operation. We'll want to ensure the operation succeeds before we make
        // _any_ changes to the context to avoid making partial changes in case of a failure.

        let internal_ref = InternalRef(self.types.len());
        let parent = ty.parent();

        let full_name = match parent {
            TypeParent::Package(p) => {
                let package = &self.packages[(p.0).0];
                match &package.name {
                    Some(package_name) => format!("{}.{}", package_name, ty.name()),
                    None => ty.name().to_string(),
                }
            }
            TypeParent::Message(m) => {
                let msg = &self.types[(m.0).0];
                format!("{}.{}", msg.full_name(), ty.name())
            }
        };

        match &mut ty {
            TypeInfo::Message(m) => m.full_name = full_name.clone(),
            TypeInfo::Enum(e) => e.full_name = full_name.clone(),
        }

        let vacant = match self.types_by_name.entry(full_name) {
            Entry::Occupied(occupied) => {
                let original_ref = InternalRef(*occupied.get());
                let original = match self.types[original_ref.0] {
                    TypeInfo::Message(..) => TypeRef::Message(MessageRef(original_ref)),
                    TypeInfo::Enum(..) => TypeRef::Enum(EnumRef(original_ref)),
                };
                return Err(InsertError::TypeExists { original });
            }
            Entry::Vacant(vacant) => vacant,
        };

        let type_ref = match &mut ty {
            TypeInfo::Message(m) => {
                m.self_ref = MessageRef(internal_ref);
                TypeRef::Message(m.self_ref)
            }
            TypeInfo::Enum(e) => {
                e.self_ref = EnumRef(internal_ref);
                TypeRef::Enum(e.self_ref)
            }
        };

        // From here on, we're modifying the context.
        // All validations should be done now.

        // Add to the parent collection. Either to the package types or message inner types.
        match parent {
            TypeParent::Package(p) => {
                let package = &mut self.packages[(p.0).0];
                package.types.push(type_ref);
            }
            TypeParent::Message(m) => {
                let ty_info = &mut self.types[(m.0).0];
                match ty_info {
                    TypeInfo::Message(msg) => msg.inner_types.push(type_ref),
                    _ => panic!("Inner type for a non-Message"),
                }
            }
        };

        vacant.insert(internal_ref.0);
        self.types.push(ty);

        Ok(internal_ref)
    }
}

impl Package
{
    /// Create a new package.
    pub fn new(name: Option<String>) -> Self
    {
        Self {
            name,
            self_ref: PackageRef(InternalRef(0)),
            types: vec![],
            services: vec![],
        }
    }
}

impl MessageInfo
{
    /// Create a new message info.
    ///
    /// Before inserting the message info into a [`Context`] certain fields such as `self_ref` or
    /// `full_name` are not valid.
    pub fn new(name: String, parent: TypeParent) -> Self
    {
        MessageInfo {
            name,
            parent,

            full_name: String::new(),
            self_ref: MessageRef(InternalRef(0)),
            group: false,
            extensions: None,
            inner_types: vec![],
            options: vec![],

            fields: BTreeMap::new(),
            fields_by_name: BTreeMap::new(),
        }
    }

    /// Add a field to the message.
    ///
    /// The field number must be unique, lie within the valid id range and
    /// outside the declared extension range. A field whose name collides with
    /// an existing field falls back to the original (pre-camel-case) names on
    /// both sides; if the names still collide, the insert fails.
    pub fn add_field(&mut self, field: MessageField) -> Result<(), MemberInsertError>
    {
        let mut field = field;

        if field.number < wire::ID_MIN || field.number > wire::ID_MAX {
            return Err(MemberInsertError::NumberOutOfRange);
        }

        if let Some((min, max)) = self.extensions {
            if field.number >= min && field.number <= max {
                return Err(MemberInsertError::NumberInExtensionRange);
            }
        }

        if self.fields.contains_key(&field.number) {
            return Err(MemberInsertError::NumberConflict);
        }

        if field.default.is_none() {
            field.default = field
                .options
                .iter()
                .find(|o| o.name == "default")
                .map(|o| o.value.clone());
        }

        if let Some(&existing_number) = self.fields_by_name.get(&field.name) {
            // A renamed field may revert to its original name to resolve the
            // collision. Validate the outcome before touching either field.
            let existing = self
                .fields
                .get(&existing_number)
                .expect("field tables out of sync");

            let existing_target = existing.original_name.clone();
            let incoming_target = field.original_name.clone();

            let existing_renamed = existing.name != existing.original_name;
            let incoming_renamed = field.name != field.original_name;

            if !existing_renamed && !incoming_renamed {
                return Err(MemberInsertError::NameConflict);
            }

            if incoming_target == existing_target {
                return Err(MemberInsertError::NameConflict);
            }

            if existing_renamed && self.fields_by_name.contains_key(&existing_target) {
                return Err(MemberInsertError::NameConflict);
            }

            if incoming_renamed && self.fields_by_name.contains_key(&incoming_target) {
                return Err(MemberInsertError::NameConflict);
            }

            if existing_renamed {
                self.fields_by_name.remove(&existing.name.clone());
                let existing = self
                    .fields
                    .get_mut(&existing_number)
                    .expect("field tables out of sync");
                existing.name = existing_target.clone();
                self.fields_by_name.insert(existing_target, existing_number);
            }

            if incoming_renamed {
                field.name = incoming_target;
            }

            if self.fields_by_name.contains_key(&field.name) {
                return Err(MemberInsertError::NameConflict);
            }
        }

        self.fields_by_name.insert(field.name.clone(), field.number);
        self.fields.insert(field.number, field);

        Ok(())
    }

    /// Declare the extension number range of the message.
    pub fn set_extensions(&mut self, min: u64, max: u64)
    {
        self.extensions = Some((min, max));
    }
}

impl MessageField
{
    /// Create a new optional message field.
    pub fn new(name: String, number: u64, field_type: ValueType) -> Self
    {
        Self {
            original_name: name.clone(),
            name,
            number,
            field_type,
            multiplicity: Multiplicity::Optional,
            options: vec![],
            default: None,
        }
    }
}

impl EnumInfo
{
    /// Create a new enum info.
    pub fn new(name: String, parent: TypeParent) -> Self
    {
        Self {
            name,
            parent,
            full_name: String::new(),
            self_ref: EnumRef(InternalRef(0)),
            options: vec![],
            values: vec![],
        }
    }

    /// Add a value to the enum definition.
    ///
    /// Value names must be unique; numeric ids may alias.
    pub fn add_value(&mut self, value: EnumField) -> Result<(), MemberInsertError>
    {
        if self.values.iter().any(|v| v.name == value.name) {
            return Err(MemberInsertError::NameConflict);
        }

        self.values.push(value);
        Ok(())
    }
}

impl EnumField
{
    /// Create a new enum value.
    pub fn new(name: String, number: i64) -> Self
    {
        Self {
            name,
            number,
            options: vec![],
        }
    }
}

impl Service
{
    /// Create a new service.
    ///
    /// Before inserting the service into a [`Context`] the `self_ref` and
    /// `full_name` fields are not valid.
    pub fn new(name: String, parent: PackageRef) -> Self
    {
        Self {
            name,
            full_name: String::new(),
            self_ref: ServiceRef(InternalRef(0)),
            parent,
            rpcs: vec![],
            options: vec![],
            rpcs_by_name: HashMap::new(),
        }
    }

    /// Add an operation to the service.
    pub fn add_rpc(&mut self, rpc: Rpc) -> Result<(), MemberInsertError>
    {
        if self.rpcs_by_name.contains_key(&rpc.name) {
            return Err(MemberInsertError::NameConflict);
        }

        self.rpcs_by_name.insert(rpc.name.clone(), self.rpcs.len());
        self.rpcs.push(rpc);
        Ok(())
    }
}

impl Rpc
{
    /// Create a new rpc operation.
    pub fn new(name: String, input: MessageRef, output: MessageRef) -> Self
    {
        Self {
            name,
            input,
            output,
            options: vec![],
        }
    }
}
