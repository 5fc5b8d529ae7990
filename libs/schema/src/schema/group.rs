//! Group and field definitions

use super::types::{QName, TypeDef};
use serde::{Deserialize, Serialize};

/// One field of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDef,
    #[serde(default)]
    pub optional: bool,
}

impl FieldDef {
    /// Field that must always carry a value
    pub fn required(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }

    /// Field that may be absent
    pub fn optional(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
        }
    }
}

/// A message type: ordered fields, optional id, optional super-group
///
/// A group without an id can only be used through static references; it
/// cannot be the concrete type of a dynamic reference or a top-level
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    pub name: QName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, rename = "super", skip_serializing_if = "Option::is_none")]
    pub super_group: Option<QName>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl GroupDef {
    pub fn new(name: impl Into<QName>) -> Self {
        Self {
            name: name.into(),
            id: None,
            super_group: None,
            fields: Vec::new(),
        }
    }

    /// Give the group a numeric id so it can be used dynamically
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Inherit the fields of `super_group`
    pub fn extends(mut self, super_group: impl Into<QName>) -> Self {
        self.super_group = Some(super_group.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn required(self, name: impl Into<String>, ty: TypeDef) -> Self {
        self.field(FieldDef::required(name, ty))
    }

    pub fn optional(self, name: impl Into<String>, ty: TypeDef) -> Self {
        self.field(FieldDef::optional(name, ty))
    }

    /// Namespace used to resolve unqualified references from this group
    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace.as_deref()
    }
}
