use thiserror::Error;

use crate::tag::Tag;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes, have {have})")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("chunk {tag} at offset {offset:#x} declares {declared} bytes but only {available} remain")]
    Truncated {
        tag: Tag,
        offset: usize,
        declared: usize,
        available: usize,
    },

    #[error("{trailing} trailing byte(s) at offset {offset:#x} are too short for a chunk header")]
    TrailingBytes { offset: usize, trailing: usize },

    #[error("string at offset {offset:#x} is not valid UTF-8")]
    InvalidString { offset: usize },

    #[error("string offset {offset:#x} is outside the string table ({len} bytes)")]
    BadStringOffset { offset: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, ChunkError>;
