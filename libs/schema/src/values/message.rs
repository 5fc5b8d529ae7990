//! Dynamic group instances

use super::Value;
use std::collections::BTreeMap;

/// An instance of a bound runtime type
///
/// `type_name` is the runtime type the codec uses to find the instance's
/// group when encoding dynamically. Field values live in named slots; a
/// missing slot is an absent (null) value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Message {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style slot assignment
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Store `value`, or clear the slot when it is `None`
    pub fn set(&mut self, field: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.fields.insert(field.to_owned(), value);
            }
            None => {
                self.fields.remove(field);
            }
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Move a value out of its slot, for nested groups and sequences
    pub fn take(&mut self, field: &str) -> Option<Value> {
        self.remove(field)
    }

    /// Nested group stored in `field`, if that slot holds one
    pub fn group(&self, field: &str) -> Option<&Message> {
        self.get(field).and_then(Value::as_group)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Slots in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
