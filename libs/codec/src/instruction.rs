//! Group and field instructions
//!
//! A [`GroupInstruction`] is the compiled form of one schema group: its
//! own fields in declared order plus the table index of its super-group.
//! Inherited fields are not copied; encoding and decoding recurse into the
//! super-group first, so base fields always precede subgroup fields.

use crate::dispatch::GroupTable;
use crate::error::{DecodeErrorKind, DecodeResult, EncodeError, EncodeResult};
use crate::io::{ByteSink, ByteSource};
use crate::strategy::Strategy;
use crate::vlc;
use schema::{Accessor, Factory, Message};

/// One compiled field
#[derive(Debug, Clone)]
pub struct FieldInstruction {
    pub name: String,
    pub required: bool,
    pub accessor: Accessor,
    pub strategy: Strategy,
}

impl FieldInstruction {
    pub fn encode(
        &self,
        table: &GroupTable,
        sink: &mut dyn ByteSink,
        instance: &Message,
    ) -> EncodeResult<()> {
        let value = self.accessor.read(instance);
        if !self.required {
            return self.strategy.encode_optional(table, sink, value.as_deref());
        }
        match value {
            Some(value) => self.strategy.encode_value(table, sink, &value),
            None => Err(EncodeError::MissingRequired {
                field: self.name.clone(),
            }),
        }
    }

    /// Decode into `instance`, a group at nesting `depth`
    pub fn decode(
        &self,
        table: &GroupTable,
        src: &mut dyn ByteSource,
        instance: &mut Message,
        depth: usize,
    ) -> DecodeResult<()> {
        let value = self
            .strategy
            .decode(table, src, !self.required, depth)
            .map_err(|e| e.in_field(&self.name))?;
        self.accessor.write(instance, value);
        Ok(())
    }
}

/// One compiled group
#[derive(Debug, Clone)]
pub struct GroupInstruction {
    /// Qualified schema name, used in error paths
    pub name: String,
    pub id: Option<u64>,
    /// Table index of the super-group
    pub super_group: Option<usize>,
    pub fields: Vec<FieldInstruction>,
    /// Runtime type this group is bound to
    pub type_name: String,
    pub factory: Factory,
}

impl GroupInstruction {
    /// Encode inherited fields, then own fields, without id or framing
    pub fn encode_fields(
        &self,
        table: &GroupTable,
        sink: &mut dyn ByteSink,
        instance: &Message,
    ) -> EncodeResult<()> {
        if let Some(parent) = self.super_group {
            table.group(parent).encode_fields(table, sink, instance)?;
        }
        self.fields
            .iter()
            .try_for_each(|field| field.encode(table, sink, instance))
    }

    /// Decode inherited fields, then own fields, into `instance`
    pub fn decode_fields(
        &self,
        table: &GroupTable,
        src: &mut dyn ByteSource,
        instance: &mut Message,
        depth: usize,
    ) -> DecodeResult<()> {
        if let Some(parent) = self.super_group {
            table.group(parent).decode_fields(table, src, instance, depth)?;
        }
        self.fields
            .iter()
            .try_for_each(|field| field.decode(table, src, instance, depth))
    }

    /// Create an instance with the factory and decode into it
    ///
    /// `depth` counts this group and every group enclosing it; the
    /// outermost group is at depth 1.
    pub fn decode_new(
        &self,
        table: &GroupTable,
        src: &mut dyn ByteSource,
        depth: usize,
    ) -> DecodeResult<Message> {
        let max = table.config().max_depth;
        if depth > max {
            return Err(DecodeErrorKind::NestingTooDeep { max }.into());
        }
        let mut instance = self.factory.create();
        self.decode_fields(table, src, &mut instance, depth)
            .map_err(|e| e.in_group(&self.name))?;
        Ok(instance)
    }

    /// Write the group id that starts a dynamic frame
    pub fn write_id(&self, sink: &mut dyn ByteSink) -> EncodeResult<()> {
        let id = self.id.ok_or_else(|| EncodeError::NoGroupId {
            group: self.name.clone(),
        })?;
        vlc::write_u64(sink, id);
        Ok(())
    }
}
