//! Public codec entry points

use crate::binding::{build_table, Binding};
use crate::config::CodecConfig;
use crate::dispatch::GroupTable;
use crate::error::{CodecError, CodecResult, DecodeError, DecodeErrorKind};
use crate::io::{ByteSink, ByteSource, SliceSource};
use crate::vlc::null_not_allowed;
use schema::{Message, Schema, SchemaError};
use std::sync::Arc;

/// Encoder/decoder bound to one schema
///
/// Immutable after binding. Clones share the same instruction table, and a
/// single codec can be used from many threads at once.
#[derive(Debug, Clone)]
pub struct Codec {
    table: Arc<GroupTable>,
}

impl Codec {
    /// Bind with default runtime types, accessors and limits
    pub fn new(schema: &Schema) -> Result<Self, SchemaError> {
        Self::bind(schema, &Binding::default(), CodecConfig::default())
    }

    /// Bind with default runtime types and accessors
    pub fn with_config(schema: &Schema, config: CodecConfig) -> Result<Self, SchemaError> {
        Self::bind(schema, &Binding::default(), config)
    }

    pub fn bind(schema: &Schema, binding: &Binding, config: CodecConfig) -> Result<Self, SchemaError> {
        let table = build_table(schema, binding, config)?;
        Ok(Self {
            table: Arc::new(table),
        })
    }

    pub fn config(&self) -> &CodecConfig {
        self.table.config()
    }

    /// Encode `message` as one top-level frame
    pub fn encode(&self, message: &Message) -> CodecResult<Vec<u8>> {
        let mut out: Vec<u8> = Vec::new();
        self.encode_into(&mut out, message)?;
        Ok(out)
    }

    pub fn encode_into<W: ByteSink>(&self, sink: &mut W, message: &Message) -> CodecResult<()> {
        self.table.encode_dynamic(sink, message, None)?;
        Ok(())
    }

    /// Decode exactly one top-level frame
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<Message> {
        let mut src = SliceSource::new(bytes);
        let message = self.decode_from(&mut src)?;
        ensure_exhausted(&src)?;
        Ok(message)
    }

    /// Decode the next top-level frame from a stream
    pub fn decode_from<R: ByteSource>(&self, src: &mut R) -> CodecResult<Message> {
        let message = self
            .table
            .decode_dynamic(src, None, false, 1)?
            .ok_or_else(null_not_allowed)?;
        Ok(message)
    }

    /// Decode a concatenation of top-level frames
    pub fn decode_all(&self, bytes: &[u8]) -> CodecResult<Vec<Message>> {
        let mut src = SliceSource::new(bytes);
        let mut messages = Vec::new();
        while !src.is_exhausted() {
            messages.push(self.decode_from(&mut src)?);
        }
        Ok(messages)
    }

    /// Encode the fields of group `name` inline, without id or size prefix
    ///
    /// Works for groups without an id.
    pub fn encode_group(&self, name: &str, message: &Message) -> CodecResult<Vec<u8>> {
        let index = self.group_index(name)?;
        let mut out: Vec<u8> = Vec::new();
        self.table
            .group(index)
            .encode_fields(&self.table, &mut out, message)?;
        Ok(out)
    }

    /// Decode the inline fields of group `name`
    pub fn decode_group(&self, name: &str, bytes: &[u8]) -> CodecResult<Message> {
        let index = self.group_index(name)?;
        let mut src = SliceSource::new(bytes);
        let message = self.table.group(index).decode_new(&self.table, &mut src, 1)?;
        ensure_exhausted(&src)?;
        Ok(message)
    }

    /// Name of the group `message` would be encoded as
    pub fn group_for(&self, message: &Message) -> Option<&str> {
        self.table
            .index_of_type(message.type_name())
            .map(|index| self.table.group(index).name.as_str())
    }

    /// Name of the group with wire id `id`
    pub fn group_by_id(&self, id: u64) -> Option<&str> {
        self.table
            .index_of_id(id)
            .map(|index| self.table.group(index).name.as_str())
    }

    /// Wire id of group `name`, if it has one
    pub fn group_id(&self, name: &str) -> Option<u64> {
        self.table
            .index_of_name(name)
            .and_then(|index| self.table.group(index).id)
    }

    fn group_index(&self, name: &str) -> CodecResult<usize> {
        self.table
            .index_of_name(name)
            .ok_or_else(|| CodecError::UnknownGroup {
                name: name.to_owned(),
            })
    }
}

fn ensure_exhausted(src: &SliceSource<'_>) -> CodecResult<()> {
    let count = src.remaining().len();
    if count > 0 {
        return Err(DecodeError::from(DecodeErrorKind::TrailingBytes { count }).into());
    }
    Ok(())
}
