//! # Schema Binding
//!
//! ## Purpose
//!
//! Turns a validated [`Schema`] plus a [`Binding`] (runtime type names,
//! factories and field accessors) into a [`GroupTable`].
//!
//! ## Two Passes
//!
//! 1. Index every group: names, ids and runtime types, checking the
//!    binding against the schema. Each group gets a fixed table slot equal
//!    to its position in the schema.
//! 2. Compile field strategies. References become table indices, so a
//!    group may refer to itself or to groups declared later.

use crate::config::CodecConfig;
use crate::dispatch::GroupTable;
use crate::instruction::{FieldInstruction, GroupInstruction};
use crate::strategy::{IntKind, Strategy, SymbolTable};
use schema::{
    Accessor, Factory, GroupDef, QName, RefTarget, ResolvedType, Schema, SchemaError, TypeDef,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Runtime binding for one group
#[derive(Debug, Clone, Default)]
pub struct GroupBinding {
    type_name: Option<String>,
    factory: Option<Factory>,
    accessors: HashMap<String, Accessor>,
}

impl GroupBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime type name carried by instances of this group
    pub fn runtime_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Override how one of this group's own fields is read and written
    pub fn accessor(mut self, field: impl Into<String>, accessor: Accessor) -> Self {
        self.accessors.insert(field.into(), accessor);
        self
    }
}

/// Runtime bindings for a schema, keyed by qualified group name
///
/// Groups without an entry bind to a runtime type named after the group,
/// with `Direct` accessors keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    groups: HashMap<String, GroupBinding>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, name: impl Into<String>, binding: GroupBinding) -> Self {
        self.groups.insert(name.into(), binding);
        self
    }

    fn get(&self, group: &GroupDef) -> Option<&GroupBinding> {
        self.groups.get(&group.name.to_string())
    }
}

/// Build the instruction table for `schema`
pub fn build_table(
    schema: &Schema,
    binding: &Binding,
    config: CodecConfig,
) -> Result<GroupTable, SchemaError> {
    schema.validate()?;

    // Pass 1: runtime types and binding checks
    let type_names = index_runtime_types(schema, binding)?;

    // Pass 2: compile fields
    let mut compiler = Compiler {
        schema,
        config: &config,
        enums: HashMap::new(),
    };
    let mut groups = Vec::with_capacity(schema.groups().len());
    for (group, type_name) in schema.groups().iter().zip(type_names) {
        groups.push(compiler.compile_group(group, binding.get(group), type_name)?);
    }

    let dynamic = groups.iter().filter(|g| g.id.is_some()).count();
    debug!(
        "Bound {} groups ({} dynamic-capable, {} enums)",
        groups.len(),
        dynamic,
        compiler.enums.len()
    );

    Ok(GroupTable::new(groups, config))
}

fn index_runtime_types(schema: &Schema, binding: &Binding) -> Result<Vec<String>, SchemaError> {
    for (name, group_binding) in &binding.groups {
        let group = schema
            .group(&QName::parse(name))
            .ok_or_else(|| SchemaError::UnknownGroup { name: name.clone() })?;
        for field in group_binding.accessors.keys() {
            if !group.fields.iter().any(|f| &f.name == field) {
                return Err(SchemaError::UnknownField {
                    group: name.clone(),
                    field: field.clone(),
                });
            }
        }
    }

    let mut seen: HashMap<String, &QName> = HashMap::new();
    let mut type_names = Vec::with_capacity(schema.groups().len());
    for group in schema.groups() {
        let type_name = binding
            .get(group)
            .and_then(|b| b.type_name.clone())
            .unwrap_or_else(|| group.name.to_string());
        if let Some(first) = seen.insert(type_name.clone(), &group.name) {
            return Err(SchemaError::DuplicateRuntimeType {
                type_name,
                first: first.to_string(),
                second: group.name.to_string(),
            });
        }
        type_names.push(type_name);
    }
    Ok(type_names)
}

struct Compiler<'a> {
    schema: &'a Schema,
    config: &'a CodecConfig,
    /// Symbol tables shared by every field of the same enumeration
    enums: HashMap<String, Arc<SymbolTable>>,
}

impl Compiler<'_> {
    fn compile_group(
        &mut self,
        group: &GroupDef,
        binding: Option<&GroupBinding>,
        type_name: String,
    ) -> Result<GroupInstruction, SchemaError> {
        let namespace = group.namespace();
        let mut fields = Vec::with_capacity(group.fields.len());

        for field in &group.fields {
            let context = format!("field '{}.{}'", group.name, field.name);
            let strategy = self.compile_type(&field.ty, namespace, &context)?;
            let accessor = binding
                .and_then(|b| b.accessors.get(&field.name).cloned())
                .unwrap_or_else(|| Accessor::direct(field.name.clone()));

            fields.push(FieldInstruction {
                name: field.name.clone(),
                required: !field.optional,
                accessor,
                strategy,
            });
        }

        let factory = binding
            .and_then(|b| b.factory.clone())
            .unwrap_or_else(|| Factory::for_type(type_name.clone()));

        Ok(GroupInstruction {
            name: group.name.to_string(),
            id: group.id,
            super_group: self.schema.super_group(group).map(|(index, _)| index),
            fields,
            type_name,
            factory,
        })
    }

    fn compile_type(
        &mut self,
        ty: &TypeDef,
        namespace: Option<&str>,
        context: &str,
    ) -> Result<Strategy, SchemaError> {
        let strategy = match ty {
            TypeDef::I8 => Strategy::Int(IntKind::I8),
            TypeDef::U8 => Strategy::Int(IntKind::U8),
            TypeDef::I16 => Strategy::Int(IntKind::I16),
            TypeDef::U16 => Strategy::Int(IntKind::U16),
            TypeDef::I32 => Strategy::Int(IntKind::I32),
            TypeDef::U32 => Strategy::Int(IntKind::U32),
            TypeDef::I64 => Strategy::Int(IntKind::I64),
            TypeDef::U64 => Strategy::Int(IntKind::U64),
            TypeDef::BigInt => Strategy::BigInt,
            TypeDef::F32 => Strategy::F32,
            TypeDef::F64 => Strategy::F64,
            TypeDef::Decimal => Strategy::Decimal,
            TypeDef::BigDecimal => Strategy::BigDecimal,
            TypeDef::Bool => Strategy::Bool,
            TypeDef::String { max_size } => Strategy::String {
                max: self.config.string_limit(*max_size),
            },
            TypeDef::Binary { max_size } => Strategy::Binary {
                max: self.config.binary_limit(*max_size),
            },
            TypeDef::Fixed { size } => Strategy::Fixed {
                size: *size as usize,
            },
            TypeDef::Time { epoch, unit } => Strategy::Time {
                epoch: *epoch,
                unit: *unit,
            },
            TypeDef::Ref(_) => match self.schema.resolve_type(ty, namespace, context)? {
                ResolvedType::Concrete(aliased) => {
                    return self.compile_type(aliased, namespace, context)
                }
                ResolvedType::Group(index, _) => Strategy::Static(index),
                ResolvedType::Enum(name, def) => {
                    let table = self
                        .enums
                        .entry(name.to_string())
                        .or_insert_with(|| Arc::new(SymbolTable::new(name, def)));
                    Strategy::Enum(Arc::clone(table))
                }
            },
            TypeDef::DynRef(name) => match self.schema.lookup(name, namespace) {
                Some(RefTarget::Group(index, _)) => Strategy::Dynamic(Some(index)),
                Some(_) => {
                    return Err(SchemaError::NotAGroup {
                        name: name.to_string(),
                        context: context.to_owned(),
                    })
                }
                None => {
                    return Err(SchemaError::UnresolvedType {
                        name: name.to_string(),
                        context: context.to_owned(),
                    })
                }
            },
            TypeDef::Object => Strategy::Dynamic(None),
            TypeDef::Sequence(element) => Strategy::Sequence {
                element: Box::new(self.compile_type(element, namespace, context)?),
                max_len: self.config.max_sequence_len,
            },
        };
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{EnumDef, Symbol};

    fn schema() -> Schema {
        Schema::builder()
            .enumeration("Side", EnumDef::new([Symbol::new("Buy", 1), Symbol::new("Sell", 2)]))
            .alias("Qty", TypeDef::U32)
            .group(GroupDef::new("Base").with_id(1).required("id", TypeDef::U64))
            .group(
                GroupDef::new("Order")
                    .with_id(2)
                    .extends("Base")
                    .required("side", TypeDef::reference("Side"))
                    .required("qty", TypeDef::reference("Qty"))
                    .optional("next", TypeDef::dynamic("Order"))
                    .optional("hedge", TypeDef::reference("Side")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_binding() {
        let table = build_table(&schema(), &Binding::new(), CodecConfig::default()).unwrap();
        let order = table.group(1);
        assert_eq!(order.type_name, "Order");
        assert_eq!(order.super_group, Some(0));
        assert!(matches!(order.fields[1].strategy, Strategy::Int(IntKind::U32)));
        assert!(matches!(order.fields[2].strategy, Strategy::Dynamic(Some(1))));
        assert!(!order.fields[2].required);

        // Both Side fields share one symbol table
        match (&order.fields[0].strategy, &order.fields[3].strategy) {
            (Strategy::Enum(a), Strategy::Enum(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("unexpected strategies: {:?}", other),
        }
    }

    #[test]
    fn test_custom_runtime_type() {
        let binding = Binding::new().group("Order", GroupBinding::new().runtime_type("app::Order"));
        let table = build_table(&schema(), &binding, CodecConfig::default()).unwrap();
        assert_eq!(table.index_of_type("app::Order"), Some(1));
        assert_eq!(table.index_of_type("Order"), None);
        assert_eq!(table.group(1).factory.create().type_name(), "app::Order");
    }

    #[test]
    fn test_binding_errors() {
        let unknown_group = Binding::new().group("Missing", GroupBinding::new());
        assert!(matches!(
            build_table(&schema(), &unknown_group, CodecConfig::default()),
            Err(SchemaError::UnknownGroup { .. })
        ));

        // Inherited fields are bound on the group that declares them
        let inherited = Binding::new().group("Order", GroupBinding::new().accessor("id", Accessor::Ignore));
        assert!(matches!(
            build_table(&schema(), &inherited, CodecConfig::default()),
            Err(SchemaError::UnknownField { .. })
        ));

        let clash = Binding::new().group("Base", GroupBinding::new().runtime_type("Order"));
        assert!(matches!(
            build_table(&schema(), &clash, CodecConfig::default()),
            Err(SchemaError::DuplicateRuntimeType { .. })
        ));
    }

    #[test]
    fn test_string_limit_narrowed_by_schema() {
        let schema = Schema::builder()
            .group(GroupDef::new("Note").required(
                "text",
                TypeDef::String {
                    max_size: Some(10),
                },
            ))
            .build()
            .unwrap();
        let table = build_table(&schema, &Binding::new(), CodecConfig::default()).unwrap();
        assert!(matches!(table.group(0).fields[0].strategy, Strategy::String { max: 10 }));
    }
}
