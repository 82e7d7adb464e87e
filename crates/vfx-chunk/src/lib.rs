//! Low-level binary plumbing shared by the VFX editor file formats.
//!
//! Everything here is structural: it knows how bytes are framed, never what
//! a chunk means.
//!
//! ## Chunk Layout
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Tag: 4 ASCII bytes           │  NUL-padded ("Tex\0")
//! │ Size: u32 little-endian      │  payload length only
//! ├──────────────────────────────┤
//! │ Payload                      │  raw data or further chunks
//! └──────────────────────────────┘
//! ```

pub mod chunk;
pub mod cursor;
pub mod error;
pub mod strings;
pub mod tag;

pub use chunk::{decode_chunks, encode_chunk, ChunkList, ChunkRef, CHUNK_HEADER_SIZE};
pub use cursor::{Cursor, Writer};
pub use error::{ChunkError, Result};
pub use strings::StringTable;
pub use tag::Tag;
