//! # Schema Model
//!
//! ## Purpose
//!
//! Immutable description of the message types a codec can handle: groups
//! with ordered, typed fields, optional numeric ids and single inheritance,
//! plus auxiliary named types (enumerations and aliases).
//!
//! Schemas are produced by external tooling (a parser, reflection, a
//! build script) and handed to the codec read-only. [`SchemaBuilder`] is a
//! small programmatic front end for callers and tests.
//!
//! ## Resolution Rules
//!
//! - An unqualified reference from a group in namespace `ns` is looked up
//!   as `ns:Name` first, then as `Name`.
//! - `Ref` resolves to a group, an enumeration or an alias. Aliases are
//!   followed until a concrete type is reached.
//! - `DynRef` must resolve to a group.

pub mod group;
pub mod types;

use crate::errors::SchemaError;
use group::GroupDef;
use std::collections::{HashMap, HashSet};
use types::{EnumDef, NamedType, NamedTypeDef, QName, TypeDef};

use serde::{Deserialize, Serialize};

/// What a named reference points at
#[derive(Debug, Clone, Copy)]
pub enum RefTarget<'a> {
    /// Group at the given position in [`Schema::groups`]
    Group(usize, &'a GroupDef),
    Enum(&'a QName, &'a EnumDef),
    Alias(&'a QName, &'a TypeDef),
}

/// Immutable collection of group definitions and named types
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    groups: Vec<GroupDef>,
    #[serde(default)]
    types: Vec<NamedType>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse a schema shipped as a JSON document
    #[cfg(feature = "json")]
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let schema: Schema =
            serde_json::from_str(text).map_err(|e| SchemaError::InvalidDocument {
                reason: e.to_string(),
            })?;
        schema.validate()?;
        Ok(schema)
    }

    /// Render the schema as a JSON document
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, SchemaError> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::InvalidDocument {
            reason: e.to_string(),
        })
    }

    pub fn groups(&self) -> &[GroupDef] {
        &self.groups
    }

    pub fn types(&self) -> &[NamedType] {
        &self.types
    }

    /// Position of the group named exactly `name`
    pub fn group_index(&self, name: &QName) -> Option<usize> {
        self.groups.iter().position(|g| &g.name == name)
    }

    pub fn group(&self, name: &QName) -> Option<&GroupDef> {
        self.group_index(name).map(|i| &self.groups[i])
    }

    pub fn named_type(&self, name: &QName) -> Option<&NamedType> {
        self.types.iter().find(|t| &t.name == name)
    }

    /// Resolve a reference made from `namespace` to a group or named type
    ///
    /// Aliases are returned as-is; callers follow them with
    /// [`Schema::resolve_type`].
    pub fn lookup(&self, name: &QName, namespace: Option<&str>) -> Option<RefTarget<'_>> {
        let scoped = (name.namespace.is_none() && namespace.is_some())
            .then(|| name.within(namespace));

        scoped
            .iter()
            .chain(std::iter::once(name))
            .find_map(|candidate| self.lookup_exact(candidate))
    }

    fn lookup_exact(&self, name: &QName) -> Option<RefTarget<'_>> {
        if let Some(index) = self.group_index(name) {
            return Some(RefTarget::Group(index, &self.groups[index]));
        }
        self.named_type(name).map(|t| match &t.def {
            NamedTypeDef::Enum(e) => RefTarget::Enum(&t.name, e),
            NamedTypeDef::Alias(ty) => RefTarget::Alias(&t.name, ty),
        })
    }

    /// Follow alias indirection until `ty` is a concrete type or a
    /// reference to a group or enumeration
    pub fn resolve_type<'a>(
        &'a self,
        ty: &'a TypeDef,
        namespace: Option<&str>,
        context: &str,
    ) -> Result<ResolvedType<'a>, SchemaError> {
        let mut current = ty;
        let mut seen: Vec<&QName> = Vec::new();

        loop {
            let TypeDef::Ref(name) = current else {
                return Ok(ResolvedType::Concrete(current));
            };
            match self.lookup(name, namespace) {
                Some(RefTarget::Group(index, group)) => {
                    return Ok(ResolvedType::Group(index, group))
                }
                Some(RefTarget::Enum(qname, def)) => return Ok(ResolvedType::Enum(qname, def)),
                Some(RefTarget::Alias(qname, aliased)) => {
                    if seen.contains(&qname) {
                        return Err(SchemaError::AliasCycle {
                            name: qname.to_string(),
                        });
                    }
                    seen.push(qname);
                    current = aliased;
                }
                None => {
                    return Err(SchemaError::UnresolvedType {
                        name: name.to_string(),
                        context: context.to_string(),
                    })
                }
            }
        }
    }

    /// Super-group of `group`, if it declares one that exists
    pub fn super_group(&self, group: &GroupDef) -> Option<(usize, &GroupDef)> {
        let name = group.super_group.as_ref()?;
        match self.lookup(name, group.namespace())? {
            RefTarget::Group(index, g) => Some((index, g)),
            _ => None,
        }
    }

    /// Check the invariants the codec relies on
    ///
    /// Names and ids are unique, super-groups exist without cycles, no field
    /// shadows an inherited one, every type reference resolves, and every
    /// enumeration has unique symbol names and values. Every group must also
    /// have a finite encoding: required static references may not loop back
    /// to the group, and no sequence element may take zero bytes.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.validate_names()?;
        self.validate_inheritance()?;
        for group in &self.groups {
            self.validate_fields(group)?;
        }
        for named in &self.types {
            match &named.def {
                NamedTypeDef::Enum(def) => validate_enum(&named.name, def)?,
                NamedTypeDef::Alias(ty) => {
                    let context = format!("type '{}'", named.name);
                    self.validate_type(ty, named.name.namespace.as_deref(), &context)?;
                }
            }
        }
        self.validate_wire_widths()
    }

    fn validate_names(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        let mut ids: HashMap<u64, &QName> = HashMap::new();

        for group in &self.groups {
            if !names.insert(&group.name) {
                return Err(SchemaError::DuplicateGroup {
                    name: group.name.to_string(),
                });
            }
            if let Some(id) = group.id {
                if let Some(first) = ids.insert(id, &group.name) {
                    return Err(SchemaError::DuplicateGroupId {
                        id,
                        first: first.to_string(),
                        second: group.name.to_string(),
                    });
                }
            }
        }
        for named in &self.types {
            if !names.insert(&named.name) {
                return Err(SchemaError::DuplicateType {
                    name: named.name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_inheritance(&self) -> Result<(), SchemaError> {
        for group in &self.groups {
            let mut visited = HashSet::new();
            let mut current = group;
            while let Some(super_name) = &current.super_group {
                if !visited.insert(&current.name) {
                    return Err(SchemaError::InheritanceCycle {
                        group: group.name.to_string(),
                    });
                }
                current = match self.super_group(current) {
                    Some((_, parent)) => parent,
                    None => {
                        return Err(SchemaError::UnknownSuperGroup {
                            group: current.name.to_string(),
                            super_group: super_name.to_string(),
                        })
                    }
                };
            }
        }
        Ok(())
    }

    fn validate_fields(&self, group: &GroupDef) -> Result<(), SchemaError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for ancestor in self.ancestors(group) {
            for field in &ancestor.fields {
                seen.insert(&field.name);
            }
        }
        for field in &group.fields {
            if !seen.insert(&field.name) {
                return Err(SchemaError::DuplicateField {
                    group: group.name.to_string(),
                    field: field.name.clone(),
                });
            }
            let context = format!("field '{}.{}'", group.name, field.name);
            self.validate_type(&field.ty, group.namespace(), &context)?;
        }
        Ok(())
    }

    fn validate_type(
        &self,
        ty: &TypeDef,
        namespace: Option<&str>,
        context: &str,
    ) -> Result<(), SchemaError> {
        match ty {
            TypeDef::Ref(_) => match self.resolve_type(ty, namespace, context)? {
                ResolvedType::Concrete(inner) => self.validate_type(inner, namespace, context),
                ResolvedType::Group(..) | ResolvedType::Enum(..) => Ok(()),
            },
            TypeDef::DynRef(name) => match self.lookup(name, namespace) {
                Some(RefTarget::Group(..)) => Ok(()),
                Some(_) => Err(SchemaError::NotAGroup {
                    name: name.to_string(),
                    context: context.to_string(),
                }),
                None => Err(SchemaError::UnresolvedType {
                    name: name.to_string(),
                    context: context.to_string(),
                }),
            },
            TypeDef::Sequence(element) => self.validate_type(element, namespace, context),
            _ => Ok(()),
        }
    }

    /// Reject required static reference cycles and zero-width sequence
    /// elements
    ///
    /// Groups are walked depth first along required static references, so
    /// every group another group embeds is finished, with its width known,
    /// before the embedding group.
    fn validate_wire_widths(&self) -> Result<(), SchemaError> {
        let edges: Vec<Vec<usize>> = self
            .groups
            .iter()
            .map(|group| self.required_group_refs(group))
            .collect();
        let mut marks = vec![Mark::Unvisited; self.groups.len()];
        let mut zero_width = vec![false; self.groups.len()];

        for root in 0..self.groups.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::Open;
            let mut stack = vec![(root, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (index, next) = *top;
                match edges[index].get(next) {
                    Some(&child) => {
                        top.1 += 1;
                        match marks[child] {
                            Mark::Open => {
                                return Err(SchemaError::RequiredReferenceCycle {
                                    group: self.groups[child].name.to_string(),
                                })
                            }
                            Mark::Unvisited => {
                                marks[child] = Mark::Open;
                                stack.push((child, 0));
                            }
                            Mark::Done => {}
                        }
                    }
                    None => {
                        let zero = self.is_zero_width_group(&self.groups[index], &zero_width);
                        zero_width[index] = zero;
                        marks[index] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }

        for group in &self.groups {
            for field in &group.fields {
                let context = format!("field '{}.{}'", group.name, field.name);
                self.check_sequence_elements(&field.ty, group.namespace(), &context, &zero_width)?;
            }
        }
        Ok(())
    }

    /// Groups embedded through required static references of `group`,
    /// inherited fields included
    fn required_group_refs(&self, group: &GroupDef) -> Vec<usize> {
        std::iter::once(group)
            .chain(self.ancestors(group))
            .flat_map(|declaring| {
                declaring
                    .fields
                    .iter()
                    .filter(|field| !field.optional)
                    .filter_map(move |field| {
                        match self.resolve_type(&field.ty, declaring.namespace(), "") {
                            Ok(ResolvedType::Group(index, _)) => Some(index),
                            _ => None,
                        }
                    })
            })
            .collect()
    }

    fn is_zero_width_group(&self, group: &GroupDef, zero_width: &[bool]) -> bool {
        std::iter::once(group).chain(self.ancestors(group)).all(|declaring| {
            declaring.fields.iter().all(|field| {
                !field.optional && self.is_zero_width(&field.ty, declaring.namespace(), zero_width)
            })
        })
    }

    /// True if a required value of `ty` can take no bytes on the wire
    fn is_zero_width(&self, ty: &TypeDef, namespace: Option<&str>, zero_width: &[bool]) -> bool {
        match self.resolve_type(ty, namespace, "") {
            Ok(ResolvedType::Concrete(TypeDef::Fixed { size })) => *size == 0,
            Ok(ResolvedType::Group(index, _)) => zero_width[index],
            _ => false,
        }
    }

    fn check_sequence_elements(
        &self,
        ty: &TypeDef,
        namespace: Option<&str>,
        context: &str,
        zero_width: &[bool],
    ) -> Result<(), SchemaError> {
        let TypeDef::Sequence(element) = ty else {
            // An alias may name a sequence type
            return match self.resolve_type(ty, namespace, context)? {
                ResolvedType::Concrete(inner) if matches!(inner, TypeDef::Sequence(_)) => {
                    self.check_sequence_elements(inner, namespace, context, zero_width)
                }
                _ => Ok(()),
            };
        };
        if self.is_zero_width(element, namespace, zero_width) {
            return Err(SchemaError::ZeroWidthSequenceElement {
                context: context.to_owned(),
            });
        }
        self.check_sequence_elements(element, namespace, context, zero_width)
    }

    /// Super-groups of `group`, nearest first
    ///
    /// Stops early if a link does not resolve; [`Schema::validate`] reports
    /// that case.
    pub fn ancestors<'a>(&'a self, group: &'a GroupDef) -> impl Iterator<Item = &'a GroupDef> {
        let limit = self.groups.len();
        std::iter::successors(self.super_group(group).map(|(_, g)| g), move |g| {
            self.super_group(g).map(|(_, parent)| parent)
        })
        .take(limit)
    }
}

/// Depth-first visit state of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Open,
    Done,
}

/// A type after alias indirection has been removed
#[derive(Debug, Clone, Copy)]
pub enum ResolvedType<'a> {
    /// Anything other than `Ref`
    Concrete(&'a TypeDef),
    /// Static reference to the group at this index
    Group(usize, &'a GroupDef),
    Enum(&'a QName, &'a EnumDef),
}

fn validate_enum(name: &QName, def: &EnumDef) -> Result<(), SchemaError> {
    if def.symbols.is_empty() {
        return Err(SchemaError::EmptyEnum {
            enum_name: name.to_string(),
        });
    }
    let mut names = HashSet::new();
    let mut values = HashSet::new();
    for symbol in &def.symbols {
        if !names.insert(symbol.name.as_str()) {
            return Err(SchemaError::DuplicateSymbol {
                enum_name: name.to_string(),
                symbol: symbol.name.clone(),
            });
        }
        if !values.insert(symbol.value) {
            return Err(SchemaError::DuplicateSymbolValue {
                enum_name: name.to_string(),
                value: symbol.value,
            });
        }
    }
    Ok(())
}

/// Programmatic schema construction
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    groups: Vec<GroupDef>,
    types: Vec<NamedType>,
}

impl SchemaBuilder {
    pub fn group(mut self, group: GroupDef) -> Self {
        self.groups.push(group);
        self
    }

    pub fn enumeration(mut self, name: impl Into<QName>, def: EnumDef) -> Self {
        self.types.push(NamedType {
            name: name.into(),
            def: NamedTypeDef::Enum(def),
        });
        self
    }

    pub fn alias(mut self, name: impl Into<QName>, ty: TypeDef) -> Self {
        self.types.push(NamedType {
            name: name.into(),
            def: NamedTypeDef::Alias(ty),
        });
        self
    }

    /// Validate and freeze the schema
    pub fn build(self) -> Result<Schema, SchemaError> {
        let schema = Schema {
            groups: self.groups,
            types: self.types,
        };
        schema.validate()?;
        Ok(schema)
    }
}
