//! Timeline files: a flat list of tagged entries with two shared segments.
//!
//! ## File Layout
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ TMLB                         │
//! │ u32 file size                │
//! │ u32 entry count              │
//! │ u32 extra segment size       │
//! │ u32 string segment size      │
//! ├──────────────────────────────┤
//! │ Entry*                       │  16-byte header, then i16 id, i16 time,
//! │                              │  then the tag's fixed fields
//! ├──────────────────────────────┤
//! │ Extra segment                │  variable-length entry payloads
//! ├──────────────────────────────┤
//! │ String segment               │  NUL-terminated UTF-8
//! └──────────────────────────────┘
//! ```
//!
//! An entry header is its tag, its size including the header, and the offset
//! and size of its block in the extra segment. Every offset and size is
//! recomputed on encode.

pub mod entry;
pub mod error;
pub mod file;

pub use entry::{EntryBody, TimelineEntry};
pub use error::TimelineError;
pub use file::{decode, encode, Timeline, TimelineIssue, TimelineReport, FILE_MAGIC};
