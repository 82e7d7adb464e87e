//! Tag + size + payload framing.
//!
//! Decoding never looks inside a payload. Whether a payload holds raw data or
//! a further sequence of chunks is decided by the caller, which simply calls
//! [`decode_chunks`] again on it.

use crate::cursor::{Cursor, Writer};
use crate::error::ChunkError;
use crate::tag::Tag;

/// Bytes taken by the tag and size fields.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// One decoded chunk, borrowing its payload from the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRef<'a> {
    pub tag: Tag,
    /// Offset of the chunk header relative to the decoded buffer.
    pub offset: usize,
    pub payload: &'a [u8],
}

impl ChunkRef<'_> {
    /// Total encoded length including the header.
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.payload.len()
    }

    /// Re-encode this chunk exactly as it was read.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_chunk(self.tag, self.payload)
    }
}

/// The chunks decoded from one buffer, in order.
///
/// When a chunk declares more bytes than remain, decoding stops there and the
/// failure is kept in `truncated`; everything before it is still valid.
#[derive(Debug, Clone, Default)]
pub struct ChunkList<'a> {
    pub chunks: Vec<ChunkRef<'a>>,
    pub truncated: Option<ChunkError>,
}

impl<'a> ChunkList<'a> {
    pub fn is_complete(&self) -> bool {
        self.truncated.is_none()
    }

    /// Return the chunks, or the truncation error if there was one.
    pub fn into_complete(self) -> Result<Vec<ChunkRef<'a>>, ChunkError> {
        match self.truncated {
            Some(err) => Err(err),
            None => Ok(self.chunks),
        }
    }

    pub fn find(&self, tag: Tag) -> Option<&ChunkRef<'a>> {
        self.chunks.iter().find(|c| c.tag == tag)
    }
}

/// Split a buffer into consecutive chunks.
pub fn decode_chunks(data: &[u8]) -> ChunkList<'_> {
    let mut cursor = Cursor::new(data);
    let mut list = ChunkList::default();

    while !cursor.is_empty() {
        let offset = cursor.position();
        if cursor.remaining() < CHUNK_HEADER_SIZE {
            list.truncated = Some(ChunkError::TrailingBytes {
                offset,
                trailing: cursor.remaining(),
            });
            break;
        }
        // Both reads are covered by the header-length check above.
        let (tag, declared) = match (cursor.read_tag(), cursor.read_u32()) {
            (Ok(tag), Ok(size)) => (tag, size as usize),
            (Err(err), _) | (_, Err(err)) => {
                list.truncated = Some(err);
                break;
            }
        };
        let available = cursor.remaining();
        if declared > available {
            list.truncated = Some(ChunkError::Truncated {
                tag,
                offset,
                declared,
                available,
            });
            break;
        }
        match cursor.read_bytes(declared) {
            Ok(payload) => list.chunks.push(ChunkRef {
                tag,
                offset,
                payload,
            }),
            Err(err) => {
                list.truncated = Some(err);
                break;
            }
        }
    }

    list
}

/// Encode `tag || u32le(len) || payload`.
pub fn encode_chunk(tag: Tag, payload: &[u8]) -> Vec<u8> {
    let mut w = Writer::with_capacity(CHUNK_HEADER_SIZE + payload.len());
    w.write_chunk(tag, payload);
    w.into_bytes()
}
