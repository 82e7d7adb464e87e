//! Content hashing for nodes and files.
//!
//! A node's fingerprint covers its kind and its encoded payload, with strings
//! resolved through a table local to the node, so equal content hashes equal
//! regardless of where the node sits in its graph.

use sha2::{Digest, Sha256};
use vfx_chunk::StringTable;
use vfx_core::Node;

use crate::serialize;

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Hash of arbitrary bytes, e.g. a whole file.
pub fn content_hash(bytes: &[u8]) -> ContentHash {
    Sha256::digest(bytes).into()
}

/// Hash of a node's content. Status, display name, and dependency flags are
/// not part of it.
pub fn node_fingerprint(node: &Node) -> ContentHash {
    let mut strings = StringTable::new();
    let payload = serialize::encode_node(node, &mut strings);

    let mut hasher = Sha256::new();
    hasher.update(node.kind.to_string().as_bytes());
    hasher.update([u8::from(node.assigned)]);
    hasher.update((payload.len() as u64).to_le_bytes());
    hasher.update(&payload);
    hasher.update(strings.as_bytes());
    hasher.finalize().into()
}

/// Format a content hash as a hex string.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
