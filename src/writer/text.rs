//! Deferred text-entry registry.
//!
//! Metadata strings are queued while the skeleton is built and written in a
//! single pass: an explicit collect-then-flush two-phase builder. Each
//! string becomes a uint16 dataset of UTF-16 code units inside the hidden
//! `#refs#` group; the destination field is a 1x1 cell dataset holding an
//! object reference to it.

use crate::store::{AttrValue, ContainerStore, ElementType, NodeId};
use crate::util::{Error, Result};

use super::constants::{
    CLASS_ATTR, CLASS_CELL, CLASS_CHAR, INT_DECODE_ATTR, REFS_GROUP, SLOT_ALPHABET,
    UTF16_INT_DECODE,
};

/// One queued metadata string: destination group, field key, value.
#[derive(Debug, Clone)]
struct TextEntry {
    group: NodeId,
    key: String,
    value: String,
}

/// Write-once staging buffer for metadata strings.
#[derive(Debug, Default)]
pub(crate) struct TextBlockRegistry {
    entries: Vec<TextEntry>,
    flushed: bool,
}

impl TextBlockRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a string for the flush pass. Slot names come from a fixed
    /// 64-symbol alphabet, so the 65th registration fails.
    pub(crate) fn add(
        &mut self,
        group: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        if self.flushed {
            return Err(Error::State("text registry already flushed"));
        }
        if self.entries.len() >= SLOT_ALPHABET.len() {
            return Err(Error::config(format!(
                "text registry full: at most {} entries per session",
                SLOT_ALPHABET.len()
            )));
        }
        self.entries.push(TextEntry {
            group,
            key: key.into(),
            value: value.into(),
        });
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Materialize every queued entry. Runs exactly once per session.
    pub(crate) fn flush<S: ContainerStore>(&mut self, store: &mut S) -> Result<()> {
        if self.flushed {
            return Err(Error::State("text registry already flushed"));
        }
        self.flushed = true;

        if self.entries.is_empty() {
            return Ok(());
        }

        let refs = store.ensure_group(store.root(), REFS_GROUP)?;
        for (index, entry) in self.entries.iter().enumerate() {
            let slot = (SLOT_ALPHABET[index] as char).to_string();
            let units: Vec<u16> = entry.value.encode_utf16().collect();
            let len = units.len() as u64;

            let text = store.create_dataset(refs, &slot, ElementType::Uint16, len, len.max(1))?;
            store.write_attr(text, CLASS_ATTR, AttrValue::Text(CLASS_CHAR.to_string()))?;
            store.write_attr(text, INT_DECODE_ATTR, AttrValue::Int(UTF16_INT_DECODE))?;
            store.write_u16(text, &units)?;

            let reference = store.object_ref(text)?;
            let cell = store.create_dataset(entry.group, &entry.key, ElementType::Reference, 1, 1)?;
            store.write_attr(cell, CLASS_ATTR, AttrValue::Text(CLASS_CELL.to_string()))?;
            store.write_ref(cell, reference)?;
        }
        Ok(())
    }
}
