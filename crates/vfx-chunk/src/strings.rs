//! Deduplicated pool of NUL-terminated strings addressed by byte offset.

use std::collections::HashMap;

use crate::error::{ChunkError, Result};

/// A string pool.
///
/// Tables built with [`StringTable::intern`] never hold two equal entries.
/// Tables read with [`StringTable::from_bytes`] keep the original bytes so
/// that any offset a file uses, including one into the middle of an entry,
/// resolves the same way it did for the writer. Tables seeded with
/// [`StringTable::with_prefix`] keep those bytes and reuse their entries.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the payload of a string segment read from a file.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            offsets: HashMap::new(),
        }
    }

    /// Start from an existing table's bytes, unchanged.
    ///
    /// Each whole entry of `data` is interned at its original offset (the
    /// first copy wins), so offsets held by content that is written back
    /// verbatim stay valid. An unterminated last entry gets a terminator.
    pub fn with_prefix(data: &[u8]) -> Self {
        let mut table = Self::from_bytes(data);
        if table.data.last().is_some_and(|&b| b != 0) {
            table.data.push(0);
        }
        let mut start = 0;
        for entry in table.data.split(|&b| b == 0) {
            if start >= table.data.len() {
                break;
            }
            if let Ok(s) = std::str::from_utf8(entry) {
                table.offsets.entry(s.to_string()).or_insert(start as u32);
            }
            start += entry.len() + 1;
        }
        table
    }

    /// Return the offset of `s`, appending it if not already present.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&offset) = self.offsets.get(s) {
            return offset;
        }
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.offsets.insert(s.to_string(), offset);
        offset
    }

    /// Read the string starting at `offset`.
    pub fn resolve(&self, offset: u32) -> Result<&str> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(ChunkError::BadStringOffset {
                offset: start,
                len: self.data.len(),
            });
        }
        let end = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .map_or(self.data.len(), |n| start + n);
        std::str::from_utf8(&self.data[start..end])
            .map_err(|_| ChunkError::InvalidString { offset: start })
    }

    /// Number of distinct interned strings.
    pub fn entry_count(&self) -> usize {
        self.offsets.len()
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_share_one_entry() {
        let mut table = StringTable::new();
        let a = table.intern("vfx/common/texture/dust.atex");
        let b = table.intern("vfx/common/texture/spark.atex");
        let c = table.intern("vfx/common/texture/dust.atex");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.entry_count(), 2);
        assert_eq!(table.resolve(c).unwrap(), "vfx/common/texture/dust.atex");
    }

    #[test]
    fn offsets_are_byte_positions() {
        let mut table = StringTable::new();
        assert_eq!(table.intern("ab"), 0);
        assert_eq!(table.intern("c"), 3);
        assert_eq!(table.as_bytes(), b"ab\0c\0");
    }

    #[test]
    fn read_tables_resolve_mid_entry_offsets() {
        let table = StringTable::from_bytes(b"hello\0world\0");
        assert_eq!(table.resolve(6).unwrap(), "world");
        assert_eq!(table.resolve(2).unwrap(), "llo");
    }

    #[test]
    fn prefixed_tables_reuse_existing_entries() {
        let mut table = StringTable::with_prefix(b"a.atex\0b.atex\0a.atex\0");
        assert_eq!(table.intern("b.atex"), 7);
        assert_eq!(table.intern("a.atex"), 0);
        assert_eq!(table.intern("c.atex"), 21);
        assert_eq!(table.entry_count(), 3);
        assert!(table.as_bytes().starts_with(b"a.atex\0b.atex\0a.atex\0"));
    }

    #[test]
    fn prefix_without_terminator_is_closed() {
        let mut table = StringTable::with_prefix(b"ab\0cd");
        assert_eq!(table.intern("cd"), 3);
        assert_eq!(table.intern("e"), 6);
        assert_eq!(table.as_bytes(), b"ab\0cd\0e\0");
    }

    #[test]
    fn out_of_range_offset_fails() {
        let table = StringTable::from_bytes(b"a\0");
        assert!(matches!(
            table.resolve(2),
            Err(ChunkError::BadStringOffset { offset: 2, len: 2 })
        ));
    }

    #[test]
    fn invalid_utf8_fails() {
        let table = StringTable::from_bytes(&[0xFF, 0xFE, 0]);
        assert!(matches!(
            table.resolve(0),
            Err(ChunkError::InvalidString { offset: 0 })
        ));
    }

    #[test]
    fn empty_string_interns_to_a_terminator() {
        let mut table = StringTable::new();
        let off = table.intern("");
        assert_eq!(table.resolve(off).unwrap(), "");
        assert_eq!(table.len(), 1);
    }
}
