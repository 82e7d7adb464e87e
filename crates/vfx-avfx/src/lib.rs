//! Chunked VFX graph files: decoding, encoding, and sub-graph transfer.
//!
//! ## File Layout
//!
//! ```text
//! AVFX
//! ├── Ver\0 bDFP FcCl NcCl      header fields
//! ├── Strs                      string table (NUL-terminated UTF-8)
//! ├── ScCn TlCn ... MdCn        group member counts (u32)
//! ├── Schd* TmLn* Emit* Ptcl*   group members, one chunk per node
//! │   Efct* Bind* Tex\0* Modl*
//! ├── ????                      unknown chunks, kept verbatim
//! └── ExRt                      export root: group tag + u32 index
//! ```
//!
//! Inside a member, every attribute is a child chunk. Reference slots hold
//! an `i32` index into their target group, `-1` meaning none.

mod document;
mod fingerprint;
mod format;
mod parse;
mod serialize;
mod transfer;

pub use document::{copy_subtree, Document};
pub use fingerprint::{content_hash, hash_hex, node_fingerprint, ContentHash};
pub use format::{EXPORT_ROOT_TAG, KEYS_TAG, KEY_SIZE, ROOT_TAG, STRINGS_TAG};
pub use parse::{load, LoadError, Loaded, ParseIssue, ParseReport};
pub use serialize::{save, SaveError};
pub use transfer::{
    closure, export_subtree, import_subtree, ExportMode, ImportOutcome, ImportPolicy,
    TransferError,
};
