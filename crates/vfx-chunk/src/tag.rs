//! Four-byte chunk identifiers.

use std::fmt;

use serde::{Serialize, Serializer};

/// A four-byte chunk or entry tag, compared bytewise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Build a tag from a literal; shorter names must already be NUL-padded.
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Tag(*bytes)
    }

    /// Build a tag from a name of at most four bytes, padding with NUL.
    pub fn from_name(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return None;
        }
        let mut out = [0u8; 4];
        out[..bytes.len()].copy_from_slice(bytes);
        Some(Tag(out))
    }

    pub fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// The tag with trailing NUL padding removed, for display.
    pub fn name(&self) -> String {
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        self.0[..end]
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '?'
                }
            })
            .collect()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", self.name())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}
