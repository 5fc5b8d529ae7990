//! # Dynamic Dispatcher
//!
//! ## Purpose
//!
//! Owns every compiled [`GroupInstruction`] and resolves between runtime
//! types, group ids and instructions. Implements the self-describing frame
//! used for dynamic references and top-level messages.
//!
//! ## Frame Layout
//!
//! ```text
//! ┌──────────────┬──────────────┬─────────────────────────────┐
//! │ size (VLC)   │ group id     │ inherited + own fields ...  │
//! │              │ (VLC)        │                             │
//! └──────────────┴──────────────┴─────────────────────────────┘
//!                 └──────────── size bytes ───────────────────┘
//! ```
//!
//! A null marker in place of the size is an absent nullable reference.
//!
//! ## Forward Compatibility
//!
//! The decoder limits the source to the declared size while the group is
//! decoded, then skips whatever the group did not consume. Older readers
//! can therefore decode messages from writers that appended fields. A
//! group that tries to read past its declared size fails with
//! `BeyondGroupSize`.

use crate::config::CodecConfig;
use crate::error::{DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeResult};
use crate::instruction::GroupInstruction;
use crate::io::{ByteSink, ByteSource};
use crate::vlc::{self, null_not_allowed};
use schema::Message;
use std::collections::HashMap;
use tracing::trace;

/// Immutable table of bound groups
#[derive(Debug)]
pub struct GroupTable {
    groups: Vec<GroupInstruction>,
    by_id: HashMap<u64, usize>,
    by_type: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    config: CodecConfig,
}

impl GroupTable {
    /// Index a set of instructions whose references point into `groups`
    pub fn new(groups: Vec<GroupInstruction>, config: CodecConfig) -> Self {
        let by_id = groups
            .iter()
            .enumerate()
            .filter_map(|(index, g)| g.id.map(|id| (id, index)))
            .collect();
        let by_type = groups
            .iter()
            .enumerate()
            .map(|(index, g)| (g.type_name.clone(), index))
            .collect();
        let by_name = groups
            .iter()
            .enumerate()
            .map(|(index, g)| (g.name.clone(), index))
            .collect();

        Self {
            groups,
            by_id,
            by_type,
            by_name,
            config,
        }
    }

    /// Instruction at `index`
    ///
    /// Indices come from binding and always refer to this table.
    #[inline]
    pub fn group(&self, index: usize) -> &GroupInstruction {
        &self.groups[index]
    }

    pub fn groups(&self) -> &[GroupInstruction] {
        &self.groups
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn index_of_id(&self, id: u64) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn index_of_type(&self, type_name: &str) -> Option<usize> {
        self.by_type.get(type_name).copied()
    }

    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// True if `index` is `ancestor` or inherits from it
    pub fn derives_from(&self, index: usize, ancestor: usize) -> bool {
        let mut current = Some(index);
        // Inheritance is acyclic after validation; the bound is a backstop
        for _ in 0..=self.groups.len() {
            match current {
                Some(i) if i == ancestor => return true,
                Some(i) => current = self.groups[i].super_group,
                None => return false,
            }
        }
        false
    }

    /// Write `message` as a size-prefixed frame
    ///
    /// `target` is the declared group of a dynamic reference, `None` for
    /// `Object` references and top-level messages.
    pub fn encode_dynamic(
        &self,
        sink: &mut dyn ByteSink,
        message: &Message,
        target: Option<usize>,
    ) -> EncodeResult<()> {
        let index =
            self.index_of_type(message.type_name())
                .ok_or_else(|| EncodeError::UnknownGroupType {
                    type_name: message.type_name().to_owned(),
                })?;

        if let Some(target) = target {
            if !self.derives_from(index, target) {
                return Err(EncodeError::NotSubgroup {
                    expected: self.groups[target].name.clone(),
                    actual: self.groups[index].name.clone(),
                });
            }
        }

        let group = &self.groups[index];
        let mut payload: Vec<u8> = Vec::new();
        group.write_id(&mut payload)?;
        group.encode_fields(self, &mut payload, message)?;

        if payload.len() > self.config.max_frame_size {
            return Err(EncodeError::LengthExceedsMax {
                what: "group",
                len: payload.len(),
                max: self.config.max_frame_size,
            });
        }

        vlc::write_u64(sink, payload.len() as u64);
        sink.write_all(&payload);
        Ok(())
    }

    /// Read one frame; `None` for a null marker when `nullable`
    ///
    /// `depth` is the nesting depth the framed group will have.
    pub fn decode_dynamic(
        &self,
        src: &mut dyn ByteSource,
        target: Option<usize>,
        nullable: bool,
        depth: usize,
    ) -> DecodeResult<Option<Message>> {
        match vlc::read_u64_null(src)? {
            Some(size) => self.decode_frame(src, size, target, depth).map(Some),
            None if nullable => Ok(None),
            None => Err(null_not_allowed()),
        }
    }

    fn decode_frame(
        &self,
        src: &mut dyn ByteSource,
        size: u64,
        target: Option<usize>,
        depth: usize,
    ) -> DecodeResult<Message> {
        let max = self.config.max_frame_size;
        if size > max as u64 {
            return Err(DecodeErrorKind::FrameTooLarge { size, max }.into());
        }
        let size = size as usize;

        let outer = src.limit();
        if let Some(outer) = outer {
            if size > outer {
                return Err(DecodeError::beyond_group_size(size - outer));
            }
        }
        if let Some(available) = src.available() {
            if size > available {
                return Err(DecodeErrorKind::TruncatedFrame {
                    declared: size,
                    available,
                }
                .into());
            }
        }

        src.set_limit(Some(size));
        let result = self.decode_frame_body(src, target, depth).and_then(|message| {
            let rest = src.limit().unwrap_or(0);
            if rest > 0 {
                trace!("Skipping {} unread bytes of {}", rest, message.type_name());
                src.skip(rest)?;
            }
            Ok(message)
        });
        // Restore the enclosing limit minus this frame, on every path
        src.set_limit(outer.map(|outer| outer - size));
        result
    }

    fn decode_frame_body(
        &self,
        src: &mut dyn ByteSource,
        target: Option<usize>,
        depth: usize,
    ) -> DecodeResult<Message> {
        let id = vlc::read_u64(src)?;
        let index = self
            .index_of_id(id)
            .ok_or(DecodeErrorKind::UnknownGroupId { id })?;

        if let Some(target) = target {
            if !self.derives_from(index, target) {
                return Err(DecodeErrorKind::IncompatibleGroup {
                    expected: self.groups[target].name.clone(),
                    actual: self.groups[index].name.clone(),
                }
                .into());
            }
        }

        self.groups[index].decode_new(self, src, depth)
    }
}
