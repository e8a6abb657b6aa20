use std::borrow::Cow;
use std::collections::BTreeMap;

use super::*;

#[derive(Default)]
pub(crate) struct ContextBuilder
{
    pub(crate) packages: Vec<PackageBuilder>,
}

#[derive(Default, Debug, PartialEq)]
pub(crate) struct PackageBuilder
{
    pub(crate) name: Option<String>,
    pub(crate) types: Vec<ProtobufItemBuilder>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum ProtobufItemBuilder
{
    Type(ProtobufTypeBuilder),
    Service(ServiceBuilder),
}

#[derive(Debug, PartialEq)]
pub(crate) enum ProtobufTypeBuilder
{
    Message(MessageBuilder),
    Enum(EnumBuilder),
}

#[derive(Default, Debug, PartialEq, Clone)]
pub(crate) struct MessageBuilder
{
    pub(crate) name: String,
    pub(crate) group: bool,
    pub(crate) extensions: Option<(u64, u64)>,
    pub(crate) fields: Vec<FieldBuilder>,
    pub(crate) inner_types: Vec<InnerTypeBuilder>,
    pub(crate) options: Vec<ProtoOption>,
}

#[derive(Debug, PartialEq, Clone)]
pub(crate) enum InnerTypeBuilder
{
    Message(MessageBuilder),
    Enum(EnumBuilder),
}

#[derive(Default, Debug, PartialEq, Clone)]
pub(crate) struct EnumBuilder
{
    pub(crate) name: String,
    pub(crate) values: Vec<EnumField>,
    pub(crate) options: Vec<ProtoOption>,
}

#[derive(Default, Debug, PartialEq)]
pub(crate) struct ServiceBuilder
{
    pub(crate) name: String,
    pub(crate) rpcs: Vec<RpcBuilder>,
    pub(crate) options: Vec<ProtoOption>,
}

/// Field rule as written in the schema source. Packing is decided later from
/// the resolved type and the field options.
#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) enum FieldRule
{
    Required,
    Optional,
    Repeated,
}

#[derive(Debug, PartialEq, Clone)]
pub(crate) struct FieldBuilder
{
    pub(crate) rule: FieldRule,
    pub(crate) field_type: FieldTypeBuilder,
    pub(crate) name: String,
    pub(crate) number: u64,
    pub(crate) options: Vec<ProtoOption>,
}

/// Two-phase field type: symbolic until the resolution pass binds it to a
/// concrete type in the arena.
#[derive(Debug, PartialEq, Clone)]
pub(crate) enum FieldTypeBuilder
{
    Builtin(ValueType),
    Unresolved(String),
    UnresolvedGroup(String),
}

#[derive(Default, Debug, PartialEq)]
pub(crate) struct RpcBuilder
{
    pub(crate) name: String,
    pub(crate) input: String,
    pub(crate) output: String,
    pub(crate) options: Vec<ProtoOption>,
}

impl ContextBuilder
{
    pub fn build(self, options: ParseOptions) -> Result<Context, ParseError>
    {
        let mut ctx = Context::new();

        // Packages first; same-named packages from different files merge.
        let mut pkg_refs = Vec::with_capacity(self.packages.len());
        for p in &self.packages {
            let pkg_ref = ctx
                .insert_package(Package::new(p.name.clone()))
                .unwrap_or_else(|existing| existing);
            pkg_refs.push(pkg_ref);
        }

        // First pass lists every type with its final arena index so that
        // symbolic references can be bound even when they point forward.
        let mut cache = BuildCache::default();
        for (i, p) in self.packages.iter().enumerate() {
            p.populate(&mut cache, pkg_refs[i], &mut vec![i])?;
        }

        // Second pass builds the types in cache order. The cache order was
        // also used to assign the final indices, so inserting in the same
        // order makes every reference line up.
        let mut builders = self;
        for cache_idx in 0..cache.types.len() {
            let cache_data = &cache.types[cache_idx];
            let ty = builders.take_type(&cache_data.idx_path);
            match ty.build(cache_data, &cache, options)? {
                TypeInfo::Message(m) => {
                    ctx.insert_message(m).map_err(|_| ParseError::DuplicateType {
                        name: cache_data.full_name.clone(),
                    })?;
                }
                TypeInfo::Enum(e) => {
                    ctx.insert_enum(e).map_err(|_| ParseError::DuplicateType {
                        name: cache_data.full_name.clone(),
                    })?;
                }
            }
        }

        for cache_idx in 0..cache.services.len() {
            let cache_data = &cache.services[cache_idx];
            let service = builders
                .take_service(&cache_data.idx_path)
                .build(cache_data, &cache)?;
            ctx.insert_service(service)
                .map_err(|_| ParseError::DuplicateType {
                    name: cache_data.full_name.clone(),
                })?;
        }

        Ok(ctx)
    }

    fn take_type(&mut self, idx: &[usize]) -> ProtobufTypeBuilder
    {
        self.packages[idx[0]].take_type(&idx[1..])
    }

    fn take_service(&mut self, idx: &[usize]) -> ServiceBuilder
    {
        self.packages[idx[0]].take_service(&idx[1..])
    }
}

impl PackageBuilder
{
    fn populate(
        &self,
        cache: &mut BuildCache,
        self_ref: PackageRef,
        idx: &mut Vec<usize>,
    ) -> Result<(), ParseError>
    {
        let mut path: Vec<&str> = match &self.name {
            Some(name) => name.split('.').collect(),
            None => vec![],
        };

        let parent = TypeParent::Package(self_ref);

        idx.push(0);
        for (i, t) in self.types.iter().enumerate() {
            *idx.last_mut().unwrap() = i;

            match t {
                ProtobufItemBuilder::Type(ProtobufTypeBuilder::Message(m)) => {
                    m.populate(cache, &mut path, idx, parent)?
                }
                ProtobufItemBuilder::Type(ProtobufTypeBuilder::Enum(e)) => {
                    e.populate(cache, &mut path, idx, parent)?
                }
                ProtobufItemBuilder::Service(s) => s.populate(cache, &mut path, idx, parent)?,
            }
        }
        idx.pop();

        Ok(())
    }

    fn take_type(&mut self, idx: &[usize]) -> ProtobufTypeBuilder
    {
        match &mut self.types[idx[0]] {
            ProtobufItemBuilder::Type(t) => match t {
                ProtobufTypeBuilder::Message(m) => m.take_type(&idx[1..]),
                ProtobufTypeBuilder::Enum(e) => e.take_type(&idx[1..]),
            },

            // Panic here means something went wrong in populating the cache
            ProtobufItemBuilder::Service(..) => {
                panic!("Trying to take a service as a type");
            }
        }
    }

    fn take_service(&mut self, idx: &[usize]) -> ServiceBuilder
    {
        match &mut self.types[idx[0]] {
            ProtobufItemBuilder::Service(s) => std::mem::take(s),

            // Panic here means something went wrong in populating the cache
            _ => panic!("Trying to take a non-service as a service"),
        }
    }
}

impl ProtobufTypeBuilder
{
    fn build(
        self,
        self_data: &CacheData,
        cache: &BuildCache,
        options: ParseOptions,
    ) -> Result<TypeInfo, ParseError>
    {
        Ok(match self {
            ProtobufTypeBuilder::Message(m) => TypeInfo::Message(m.build(self_data, cache, options)?),
            ProtobufTypeBuilder::Enum(e) => TypeInfo::Enum(e.build(self_data)?),
        })
    }
}

impl MessageBuilder
{
    /// Lists types found in this message builder recursively into the build cache.
    ///
    /// On error the `path` and `idx` will be left in an undefined state.
    fn populate<'a>(
        &'a self,
        cache: &mut BuildCache,
        path: &mut Vec<&'a str>,
        idx: &mut Vec<usize>,
        parent: TypeParent,
    ) -> Result<(), ParseError>
    {
        path.push(&self.name);
        let full_name = path.join(".");
        let cache_idx = cache.types.len();
        if cache
            .items
            .insert(full_name.clone(), (ItemType::Message, cache_idx))
            .is_some()
        {
            return Err(ParseError::DuplicateType { name: full_name });
        }

        cache.types.push(CacheData {
            item_type: ItemType::Message,
            full_name,
            idx_path: idx.clone(),
            final_idx: cache_idx,
            parent,
        });

        let self_parent = TypeParent::Message(MessageRef(InternalRef(cache_idx)));

        idx.push(0);
        for (i, t) in self.inner_types.iter().enumerate() {
            *idx.last_mut().unwrap() = i;
            t.populate(cache, path, idx, self_parent)?;
        }

        idx.pop();
        path.pop();

        Ok(())
    }

    fn take_type(&mut self, idx: &[usize]) -> ProtobufTypeBuilder
    {
        if idx.is_empty() {
            ProtobufTypeBuilder::Message(MessageBuilder {
                name: self.name.clone(),
                group: self.group,
                extensions: self.extensions.take(),
                fields: std::mem::take(&mut self.fields),
                options: std::mem::take(&mut self.options),
                inner_types: self
                    .inner_types
                    .iter()
                    .map(InnerTypeBuilder::clone_name)
                    .collect(),
            })
        } else {
            self.inner_types[idx[0]].take_type(&idx[1..])
        }
    }

    fn build(
        self,
        self_data: &CacheData,
        cache: &BuildCache,
        options: ParseOptions,
    ) -> Result<MessageInfo, ParseError>
    {
        let mut msg = MessageInfo::new(self.name, self_data.parent);
        msg.group = self.group;
        msg.extensions = self.extensions;
        msg.options = self.options;

        for field in self.fields {
            let field = field.build(self_data, cache, options)?;
            let field_name = field.name.clone();
            msg.add_field(field)
                .map_err(|detail| ParseError::InvalidField {
                    name: field_name,
                    message: self_data.full_name.clone(),
                    detail,
                })?;
        }

        Ok(msg)
    }
}

impl InnerTypeBuilder
{
    fn clone_name(&self) -> InnerTypeBuilder
    {
        match self {
            InnerTypeBuilder::Message(m) => InnerTypeBuilder::Message(MessageBuilder {
                name: m.name.clone(),
                ..Default::default()
            }),
            InnerTypeBuilder::Enum(e) => InnerTypeBuilder::Enum(EnumBuilder {
                name: e.name.clone(),
                ..Default::default()
            }),
        }
    }

    fn populate<'a>(
        &'a self,
        cache: &mut BuildCache,
        path: &mut Vec<&'a str>,
        idx: &mut Vec<usize>,
        parent: TypeParent,
    ) -> Result<(), ParseError>
    {
        match self {
            InnerTypeBuilder::Message(m) => m.populate(cache, path, idx, parent),
            InnerTypeBuilder::Enum(e) => e.populate(cache, path, idx, parent),
        }
    }

    fn take_type(&mut self, idx: &[usize]) -> ProtobufTypeBuilder
    {
        match self {
            InnerTypeBuilder::Message(m) => m.take_type(idx),
            InnerTypeBuilder::Enum(e) => e.take_type(idx),
        }
    }
}

impl FieldBuilder
{
    fn build(
        self,
        self_data: &CacheData,
        cache: &BuildCache,
        options: ParseOptions,
    ) -> Result<MessageField, ParseError>
    {
        let field_type = self.field_type.build(self_data, cache)?;
        let multiplicity = resolve_multiplicity(self.rule, &field_type, &self.options);

        let original_name = self.name;
        let name = match options.convert_fields_to_camel_case {
            true => to_camel_case(&original_name),
            false => original_name.clone(),
        };

        Ok(MessageField {
            name,
            original_name,
            number: self.number,
            field_type,
            multiplicity,
            options: self.options,
            default: None,
        })
    }
}

fn resolve_multiplicity(
    rule: FieldRule,
    field_type: &ValueType,
    options: &[ProtoOption],
) -> Multiplicity
{
    match rule {
        FieldRule::Required => Multiplicity::Required,
        FieldRule::Optional => Multiplicity::Optional,
        FieldRule::Repeated => {
            // Packing is opt-in and only valid for packable scalars.
            if !field_type.packable() {
                return Multiplicity::Repeated;
            }

            match options.iter().find(|o| o.name == "packed") {
                Some(ProtoOption {
                    value: Constant::Bool(true),
                    ..
                }) => Multiplicity::RepeatedPacked,
                _ => Multiplicity::Repeated,
            }
        }
    }
}

impl FieldTypeBuilder
{
    fn build(self, self_data: &CacheData, cache: &BuildCache) -> Result<ValueType, ParseError>
    {
        Ok(match self {
            FieldTypeBuilder::Builtin(vt) => vt,
            FieldTypeBuilder::Unresolved(s) => {
                let t = cache.resolve_type(&s, &self_data.full_name).ok_or_else(|| {
                    ParseError::TypeNotFound {
                        name: s.clone(),
                        context: self_data.full_name.to_string(),
                    }
                })?;

                match t.item_type {
                    ItemType::Message => ValueType::Message(MessageRef(InternalRef(t.final_idx))),
                    ItemType::Enum => ValueType::Enum(EnumRef(InternalRef(t.final_idx))),
                    _ => unreachable!("Service as field type"),
                }
            }
            FieldTypeBuilder::UnresolvedGroup(s) => {
                let t = cache.resolve_type(&s, &self_data.full_name).ok_or_else(|| {
                    ParseError::TypeNotFound {
                        name: s.clone(),
                        context: self_data.full_name.to_string(),
                    }
                })?;

                match t.item_type {
                    ItemType::Message => ValueType::Group(MessageRef(InternalRef(t.final_idx))),
                    other => {
                        return Err(ParseError::InvalidTypeKind {
                            type_name: s,
                            context: "group field",
                            expected: ItemType::Message,
                            actual: other,
                        })
                    }
                }
            }
        })
    }
}

impl EnumBuilder
{
    /// Lists this enum into the build cache.
    fn populate<'a>(
        &'a self,
        cache: &mut BuildCache,
        path: &mut Vec<&'a str>,
        idx: &mut Vec<usize>,
        parent: TypeParent,
    ) -> Result<(), ParseError>
    {
        path.push(&self.name);
        let full_name = path.join(".");
        path.pop();

        let cache_idx = cache.types.len();
        if cache
            .items
            .insert(full_name.clone(), (ItemType::Enum, cache_idx))
            .is_some()
        {
            return Err(ParseError::DuplicateType { name: full_name });
        }

        cache.types.push(CacheData {
            item_type: ItemType::Enum,
            full_name,
            idx_path: idx.clone(),
            final_idx: cache_idx,
            parent,
        });

        Ok(())
    }

    fn build(self, self_data: &CacheData) -> Result<EnumInfo, ParseError>
    {
        let mut info = EnumInfo::new(self.name, self_data.parent);
        info.options = self.options;

        for value in self.values {
            let value_name = value.name.clone();
            info.add_value(value)
                .map_err(|detail| ParseError::InvalidField {
                    name: value_name,
                    message: self_data.full_name.clone(),
                    detail,
                })?;
        }

        Ok(info)
    }

    fn take_type(&mut self, idx: &[usize]) -> ProtobufTypeBuilder
    {
        if !idx.is_empty() {
            panic!("Trying to take an inner type from an enum");
        }

        ProtobufTypeBuilder::Enum(std::mem::take(self))
    }
}

impl ServiceBuilder
{
    /// Lists this service into the build cache.
    fn populate<'a>(
        &'a self,
        cache: &mut BuildCache,
        path: &mut Vec<&'a str>,
        idx: &mut Vec<usize>,
        parent: TypeParent,
    ) -> Result<(), ParseError>
    {
        path.push(&self.name);
        let full_name = path.join(".");
        path.pop();

        let cache_idx = cache.services.len();
        if cache
            .items
            .insert(full_name.clone(), (ItemType::Service, cache_idx))
            .is_some()
        {
            return Err(ParseError::DuplicateType { name: full_name });
        }

        cache.services.push(CacheData {
            item_type: ItemType::Service,
            full_name,
            idx_path: idx.clone(),
            final_idx: cache_idx,
            parent,
        });

        Ok(())
    }

    fn build(self, self_data: &CacheData, cache: &BuildCache) -> Result<Service, ParseError>
    {
        let parent = match self_data.parent {
            TypeParent::Package(p) => p,
            TypeParent::Message(..) => unreachable!("Service nested in a message"),
        };

        let mut service = Service::new(self.name, parent);
        service.options = self.options;

        for rpc in self.rpcs {
            let rpc = rpc.build(self_data, cache)?;
            let rpc_name = rpc.name.clone();
            service
                .add_rpc(rpc)
                .map_err(|detail| ParseError::InvalidField {
                    name: rpc_name,
                    message: self_data.full_name.clone(),
                    detail,
                })?;
        }

        Ok(service)
    }
}

impl RpcBuilder
{
    fn build(self, self_data: &CacheData, cache: &BuildCache) -> Result<Rpc, ParseError>
    {
        let input = resolve_rpc_message(&self.input, self_data, cache)?;
        let output = resolve_rpc_message(&self.output, self_data, cache)?;

        let mut rpc = Rpc::new(self.name, input, output);
        rpc.options = self.options;
        Ok(rpc)
    }
}

fn resolve_rpc_message(
    name: &str,
    rpc_data: &CacheData,
    cache: &BuildCache,
) -> Result<MessageRef, ParseError>
{
    let self_data = match cache.resolve_type(name, &rpc_data.full_name) {
        Some(data) => data,
        None => {
            return Err(ParseError::TypeNotFound {
                name: name.to_string(),
                context: rpc_data.full_name.clone(),
            })
        }
    };

    // All rpc input/output types must be messages.
    if self_data.item_type != ItemType::Message {
        return Err(ParseError::InvalidTypeKind {
            type_name: name.to_string(),
            context: "service input/output",
            expected: ItemType::Message,
            actual: self_data.item_type,
        });
    }

    Ok(MessageRef(InternalRef(self_data.final_idx)))
}

#[derive(Default)]
struct BuildCache
{
    items: BTreeMap<String, (ItemType, usize)>,
    types: Vec<CacheData>,
    services: Vec<CacheData>,
}

struct CacheData
{
    item_type: ItemType,
    idx_path: Vec<usize>,
    final_idx: usize,
    full_name: String,
    parent: TypeParent,
}

impl BuildCache
{
    /// Resolves a symbolic reference relative to `current_path` with lexical
    /// fallback through the ancestor scopes. A leading dot makes the
    /// reference absolute.
    fn resolve_type(&self, relative_name: &str, mut current_path: &str) -> Option<&CacheData>
    {
        if let Some(absolute) = relative_name.strip_prefix('.') {
            return self.type_by_full_name(absolute);
        }

        loop {
            let lookup: Cow<str> = match current_path.is_empty() {
                true => relative_name.into(),
                false => format!("{}.{}", current_path, relative_name).into(),
            };

            if let Some(t) = self.type_by_full_name(&lookup) {
                return Some(t);
            }

            if current_path.is_empty() {
                return None;
            }

            match current_path.rfind('.') {
                Some(i) => {
                    let (start, _) = current_path.split_at(i);
                    current_path = start;
                }
                None => {
                    current_path = "";
                }
            }
        }
    }

    fn type_by_full_name(&self, full_name: &str) -> Option<&CacheData>
    {
        self.items
            .get(full_name)
            .and_then(|(ty, i)| self.type_by_idx(*ty, *i))
    }

    fn type_by_idx(&self, item_type: ItemType, idx: usize) -> Option<&CacheData>
    {
        match item_type {
            ItemType::Message => self.types.get(idx),
            ItemType::Enum => self.types.get(idx),
            ItemType::Service => self.services.get(idx),
        }
    }
}
