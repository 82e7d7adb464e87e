//! Fixed tags and small record layouts of the VFX graph format.

use vfx_chunk::{Cursor, Tag, Writer};
use vfx_core::{Interpolation, Keyframe, NodeKind, NodeRef};

/// Tag of the root chunk.
pub const ROOT_TAG: Tag = Tag::new(b"AVFX");

/// Tag of the string table.
pub const STRINGS_TAG: Tag = Tag::new(b"Strs");

/// Tag of the export-root marker written into sub-files.
pub const EXPORT_ROOT_TAG: Tag = Tag::new(b"ExRt");

/// Tag of a curve's keyframe array.
pub const KEYS_TAG: Tag = Tag::new(b"Keys");

/// Encoded size of one keyframe: u16 time, u16 interpolation, 3 x f32.
pub const KEY_SIZE: usize = 16;

pub(crate) fn read_keys(payload: &[u8]) -> Result<Vec<Keyframe>, String> {
    if payload.len() % KEY_SIZE != 0 {
        return Err(format!(
            "keyframe array of {} bytes is not a multiple of {KEY_SIZE}",
            payload.len()
        ));
    }
    let mut cursor = Cursor::new(payload);
    let mut keys = Vec::with_capacity(payload.len() / KEY_SIZE);
    while !cursor.is_empty() {
        keys.push(read_key(&mut cursor).map_err(|e| e.to_string())?);
    }
    Ok(keys)
}

fn read_key(cursor: &mut Cursor<'_>) -> vfx_chunk::Result<Keyframe> {
    Ok(Keyframe {
        time: cursor.read_u16()?,
        interpolation: Interpolation::from_raw(cursor.read_u16()?),
        value: [cursor.read_f32()?, cursor.read_f32()?, cursor.read_f32()?],
    })
}

pub(crate) fn write_keys(w: &mut Writer, keys: &[Keyframe]) {
    for key in keys {
        w.write_u16(key.time);
        w.write_u16(key.interpolation.to_raw());
        for v in key.value {
            w.write_f32(v);
        }
    }
}

/// Decode an `ExRt` payload. Returns `None` for anything but a known group
/// tag followed by a u32.
pub(crate) fn read_export_root(payload: &[u8]) -> Option<NodeRef> {
    let mut cursor = Cursor::new(payload);
    let kind = NodeKind::from_group_tag(cursor.read_tag().ok()?)?;
    let index = cursor.read_u32().ok()?;
    cursor.is_empty().then_some(NodeRef::new(kind, index as usize))
}

pub(crate) fn write_export_root(root: NodeRef) -> Vec<u8> {
    let mut w = Writer::with_capacity(8);
    if let Some(tag) = root.kind.group_tag() {
        w.write_tag(tag);
        w.write_u32(root.index as u32);
    }
    w.into_bytes()
}
