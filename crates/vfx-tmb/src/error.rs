use thiserror::Error;
use vfx_chunk::Tag;

/// Structural failures that stop a timeline from decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("not a timeline file (magic {0})")]
    BadMagic(Tag),

    #[error("file header needs {need} bytes, have {have}")]
    TruncatedHeader { need: usize, have: usize },

    #[error("entry {index} at offset {offset:#x}: header needs 16 bytes, have {have}")]
    TruncatedEntry {
        index: usize,
        offset: usize,
        have: usize,
    },

    #[error("entry {index} ({tag}) declares {size} bytes, smaller than its header")]
    EntryTooSmall { index: usize, tag: Tag, size: u32 },

    #[error("entry {index} ({tag}) at offset {offset:#x} declares {size} bytes, past the end of the file")]
    EntryOutOfBounds {
        index: usize,
        tag: Tag,
        offset: usize,
        size: u32,
    },

    #[error("{segment} segment at offset {offset:#x} ({size} bytes) runs past the end of the file")]
    SegmentOutOfBounds {
        segment: &'static str,
        offset: usize,
        size: u32,
    },

    #[error("entry {index} ({tag}) extra block {offset:#x}+{size} exceeds the extra segment ({len} bytes)")]
    ExtraOutOfBounds {
        index: usize,
        tag: Tag,
        offset: u32,
        size: u32,
        len: usize,
    },
}
