//! Timeline entry types and their fixed-field encodings.

use std::fmt;

use serde::Serialize;
use vfx_chunk::{Cursor, StringTable, Tag, Writer};

pub const ACTOR_TAG: Tag = Tag::new(b"TMAC");
pub const TRACK_TAG: Tag = Tag::new(b"TMTR");
pub const C006_TAG: Tag = Tag::new(b"C006");
pub const C203_TAG: Tag = Tag::new(b"C203");
pub const SOUND_TAG: Tag = Tag::new(b"C063");
pub const C118_TAG: Tag = Tag::new(b"C118");

/// Entry header: tag, size, extra offset, extra size.
pub const ENTRY_HEADER_SIZE: usize = 16;
/// `id` and `time`, present in every entry.
pub const ENTRY_PREFIX_SIZE: usize = 4;

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub id: i16,
    pub time: i16,
    pub body: EntryBody,
}

impl TimelineEntry {
    pub fn new(id: i16, time: i16, body: EntryBody) -> Self {
        Self { id, time, body }
    }

    pub fn tag(&self) -> Tag {
        self.body.tag()
    }
}

/// The tag-specific part of an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EntryBody {
    /// `TMAC`: an actor and the tracks it owns.
    Actor { unk1: i32, unk2: i32, tracks: Vec<i16> },
    /// `TMTR`: a track and the entries on it.
    Track { entries: Vec<i16> },
    C006 { values: [i32; 3] },
    C203 { ints: [i32; 7], value: f32 },
    /// `C063`: a sound cue.
    Sound { path: String, volume: f32 },
    C118 { mode: i32, values: Vec<f32> },
    /// An entry kept as bytes: an unknown tag, or a known one whose layout
    /// did not match. `body` follows `id` and `time`.
    Raw { tag: Tag, body: Vec<u8>, extra: Vec<u8> },
}

impl EntryBody {
    pub fn tag(&self) -> Tag {
        match self {
            EntryBody::Actor { .. } => ACTOR_TAG,
            EntryBody::Track { .. } => TRACK_TAG,
            EntryBody::C006 { .. } => C006_TAG,
            EntryBody::C203 { .. } => C203_TAG,
            EntryBody::Sound { .. } => SOUND_TAG,
            EntryBody::C118 { .. } => C118_TAG,
            EntryBody::Raw { tag, .. } => *tag,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, EntryBody::Raw { .. })
    }

    /// Entry size (header included) for a known tag.
    pub fn expected_size(tag: Tag) -> Option<u32> {
        let fixed = match &tag.0 {
            b"TMAC" => 8,
            b"TMTR" => 0,
            b"C006" => 12,
            b"C203" => 32,
            b"C063" => 8,
            b"C118" => 4,
            _ => return None,
        };
        Some((ENTRY_HEADER_SIZE + ENTRY_PREFIX_SIZE + fixed) as u32)
    }

    /// Decode a known tag. `fixed` is everything after `id` and `time`.
    ///
    /// Returns a reason when the bytes do not fit the tag's layout.
    pub(crate) fn decode(
        tag: Tag,
        size: u32,
        fixed: &[u8],
        extra: &[u8],
        strings: &StringTable,
    ) -> Result<EntryBody, String> {
        let Some(expected) = Self::expected_size(tag) else {
            return Err(format!("unknown tag {tag}"));
        };
        if size != expected {
            return Err(format!("size is {size}, expected {expected}"));
        }
        let mut c = Cursor::new(fixed);
        let short = |e: vfx_chunk::ChunkError| e.to_string();

        let body = match &tag.0 {
            b"TMAC" => EntryBody::Actor {
                unk1: c.read_i32().map_err(short)?,
                unk2: c.read_i32().map_err(short)?,
                tracks: read_i16s(extra)?,
            },
            b"TMTR" => EntryBody::Track {
                entries: read_i16s(extra)?,
            },
            b"C006" => {
                let mut values = [0; 3];
                for v in &mut values {
                    *v = c.read_i32().map_err(short)?;
                }
                no_extra(extra)?;
                EntryBody::C006 { values }
            }
            b"C203" => {
                let mut ints = [0; 7];
                for v in &mut ints {
                    *v = c.read_i32().map_err(short)?;
                }
                let value = c.read_f32().map_err(short)?;
                no_extra(extra)?;
                EntryBody::C203 { ints, value }
            }
            b"C063" => {
                let offset = c.read_u32().map_err(short)?;
                let path = strings.resolve(offset).map_err(short)?.to_string();
                let volume = c.read_f32().map_err(short)?;
                no_extra(extra)?;
                EntryBody::Sound { path, volume }
            }
            b"C118" => EntryBody::C118 {
                mode: c.read_i32().map_err(short)?,
                values: read_f32s(extra)?,
            },
            _ => return Err(format!("unknown tag {tag}")),
        };
        Ok(body)
    }

    /// Encode the fixed fields and the extra block.
    pub(crate) fn encode(&self, strings: &mut StringTable) -> (Vec<u8>, Vec<u8>) {
        let mut fixed = Writer::new();
        let mut extra = Writer::new();
        match self {
            EntryBody::Actor { unk1, unk2, tracks } => {
                fixed.write_i32(*unk1);
                fixed.write_i32(*unk2);
                tracks.iter().for_each(|t| extra.write_i16(*t));
            }
            EntryBody::Track { entries } => {
                entries.iter().for_each(|e| extra.write_i16(*e));
            }
            EntryBody::C006 { values } => values.iter().for_each(|v| fixed.write_i32(*v)),
            EntryBody::C203 { ints, value } => {
                ints.iter().for_each(|v| fixed.write_i32(*v));
                fixed.write_f32(*value);
            }
            EntryBody::Sound { path, volume } => {
                fixed.write_u32(strings.intern(path));
                fixed.write_f32(*volume);
            }
            EntryBody::C118 { mode, values } => {
                fixed.write_i32(*mode);
                values.iter().for_each(|v| extra.write_f32(*v));
            }
            EntryBody::Raw { body, extra: raw, .. } => {
                fixed.write_bytes(body);
                extra.write_bytes(raw);
            }
        }
        (fixed.into_bytes(), extra.into_bytes())
    }
}

impl fmt::Display for EntryBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryBody::Actor { tracks, .. } => write!(f, "actor, {} track(s)", tracks.len()),
            EntryBody::Track { entries } => write!(f, "track, {} entry(ies)", entries.len()),
            EntryBody::C006 { values } => write!(f, "C006 {values:?}"),
            EntryBody::C203 { ints, value } => write!(f, "C203 {ints:?} {value}"),
            EntryBody::Sound { path, volume } => write!(f, "sound {path:?} at {volume}"),
            EntryBody::C118 { mode, values } => write!(f, "C118 mode {mode}, {} value(s)", values.len()),
            EntryBody::Raw { tag, body, extra } => {
                write!(f, "raw {tag}, {} + {} byte(s)", body.len(), extra.len())
            }
        }
    }
}

fn no_extra(extra: &[u8]) -> Result<(), String> {
    if extra.is_empty() {
        Ok(())
    } else {
        Err(format!("unexpected {}-byte extra block", extra.len()))
    }
}

fn read_i16s(extra: &[u8]) -> Result<Vec<i16>, String> {
    if extra.len() % 2 != 0 {
        return Err(format!("extra block of {} bytes is not a list of i16", extra.len()));
    }
    Ok(extra
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

fn read_f32s(extra: &[u8]) -> Result<Vec<f32>, String> {
    if extra.len() % 4 != 0 {
        return Err(format!("extra block of {} bytes is not a list of f32", extra.len()));
    }
    Ok(extra
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
