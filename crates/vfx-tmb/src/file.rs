//! Whole-file decode and encode.

use std::fmt;

use serde::Serialize;
use vfx_chunk::{Cursor, StringTable, Tag, Writer};

use crate::entry::{EntryBody, TimelineEntry, ENTRY_HEADER_SIZE, ENTRY_PREFIX_SIZE};
use crate::error::TimelineError;

pub const FILE_MAGIC: Tag = Tag::new(b"TMLB");
const FILE_HEADER_SIZE: usize = 20;

/// A decoded timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// First entry with the given id.
    pub fn find(&self, id: i16) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: i16) -> Option<&mut TimelineEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Entries listed on the track with id `track`, in track order.
    pub fn track_entries(&self, track: i16) -> Vec<&TimelineEntry> {
        match self.find(track).map(|t| &t.body) {
            Some(EntryBody::Track { entries }) => {
                entries.iter().filter_map(|id| self.find(*id)).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A non-fatal finding from [`decode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "kebab-case")]
pub enum TimelineIssue {
    /// A known tag whose bytes did not fit its layout; kept raw.
    SchemaMismatch {
        index: usize,
        tag: Tag,
        offset: usize,
        reason: String,
    },
    /// The header's file size disagrees with the buffer.
    FileSizeMismatch { declared: u32, actual: usize },
}

impl fmt::Display for TimelineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineIssue::SchemaMismatch {
                index,
                tag,
                offset,
                reason,
            } => write!(f, "entry {index} ({tag}) at {offset:#x} kept raw: {reason}"),
            TimelineIssue::FileSizeMismatch { declared, actual } => {
                write!(f, "header says {declared} bytes, file has {actual}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineReport {
    pub issues: Vec<TimelineIssue>,
}

impl TimelineReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

struct RawEntry<'a> {
    tag: Tag,
    offset: usize,
    size: u32,
    extra_offset: u32,
    extra_size: u32,
    id: i16,
    time: i16,
    fixed: &'a [u8],
}

/// Decode a timeline file.
pub fn decode(data: &[u8]) -> Result<(Timeline, TimelineReport), TimelineError> {
    let mut c = Cursor::new(data);
    let header_error = || TimelineError::TruncatedHeader {
        need: FILE_HEADER_SIZE,
        have: data.len(),
    };
    let magic = c.read_tag().map_err(|_| header_error())?;
    if magic != FILE_MAGIC {
        return Err(TimelineError::BadMagic(magic));
    }
    let mut header = [0u32; 4];
    for field in &mut header {
        *field = c.read_u32().map_err(|_| header_error())?;
    }
    let [file_size, count, extra_size, string_size] = header;

    let mut report = TimelineReport::default();
    if file_size as usize != data.len() {
        log::warn!("timeline header says {file_size} bytes, file has {}", data.len());
        report.issues.push(TimelineIssue::FileSizeMismatch {
            declared: file_size,
            actual: data.len(),
        });
    }

    let mut raw = Vec::with_capacity(count.min(4096) as usize);
    for index in 0..count as usize {
        raw.push(read_entry(&mut c, index)?);
    }

    let extra_start = c.position();
    let extra = segment(data, "extra", extra_start, extra_size)?;
    let strings_start = extra_start + extra.len();
    let strings = StringTable::from_bytes(segment(data, "string", strings_start, string_size)?);

    let mut timeline = Timeline::new();
    for (index, entry) in raw.into_iter().enumerate() {
        let start = entry.extra_offset as usize;
        let block = start
            .checked_add(entry.extra_size as usize)
            .and_then(|end| extra.get(start..end))
            .ok_or(TimelineError::ExtraOutOfBounds {
                index,
                tag: entry.tag,
                offset: entry.extra_offset,
                size: entry.extra_size,
                len: extra.len(),
            })?;

        let body = if EntryBody::expected_size(entry.tag).is_none() {
            log::debug!("unknown timeline entry {} at {:#x} kept raw", entry.tag, entry.offset);
            raw_body(&entry, block)
        } else {
            match EntryBody::decode(entry.tag, entry.size, entry.fixed, block, &strings) {
                Ok(body) => body,
                Err(reason) => {
                    log::warn!("timeline entry {index} ({}) kept raw: {reason}", entry.tag);
                    report.issues.push(TimelineIssue::SchemaMismatch {
                        index,
                        tag: entry.tag,
                        offset: entry.offset,
                        reason,
                    });
                    raw_body(&entry, block)
                }
            }
        };
        timeline.entries.push(TimelineEntry::new(entry.id, entry.time, body));
    }
    Ok((timeline, report))
}

fn read_entry<'a>(c: &mut Cursor<'a>, index: usize) -> Result<RawEntry<'a>, TimelineError> {
    let offset = c.position();
    let truncated = || TimelineError::TruncatedEntry {
        index,
        offset,
        have: c.remaining(),
    };
    if c.remaining() < ENTRY_HEADER_SIZE {
        return Err(truncated());
    }
    let mut h = c.clone();
    let (tag, size, extra_offset, extra_size) = read_entry_header(&mut h).map_err(|_| truncated())?;

    if (size as usize) < ENTRY_HEADER_SIZE + ENTRY_PREFIX_SIZE {
        return Err(TimelineError::EntryTooSmall { index, tag, size });
    }
    let out_of_bounds = TimelineError::EntryOutOfBounds {
        index,
        tag,
        offset,
        size,
    };
    let mut body = Cursor::new(h.read_bytes(size as usize - ENTRY_HEADER_SIZE).map_err(|_| out_of_bounds)?);
    *c = h;

    let (Ok(id), Ok(time)) = (body.read_i16(), body.read_i16()) else {
        return Err(TimelineError::EntryTooSmall { index, tag, size });
    };
    Ok(RawEntry {
        tag,
        offset,
        size,
        extra_offset,
        extra_size,
        id,
        time,
        fixed: body.read_rest(),
    })
}

fn read_entry_header(c: &mut Cursor<'_>) -> vfx_chunk::Result<(Tag, u32, u32, u32)> {
    Ok((c.read_tag()?, c.read_u32()?, c.read_u32()?, c.read_u32()?))
}

fn segment<'a>(data: &'a [u8], name: &'static str, start: usize, size: u32) -> Result<&'a [u8], TimelineError> {
    start
        .checked_add(size as usize)
        .and_then(|end| data.get(start..end))
        .ok_or(TimelineError::SegmentOutOfBounds {
            segment: name,
            offset: start,
            size,
        })
}

fn raw_body(entry: &RawEntry<'_>, extra: &[u8]) -> EntryBody {
    EntryBody::Raw {
        tag: entry.tag,
        body: entry.fixed.to_vec(),
        extra: extra.to_vec(),
    }
}

/// Encode a timeline, recomputing every size and offset.
///
/// Extra blocks are laid out in entry order; entries without one record
/// offset 0. The string segment is rebuilt from the entries that use it.
pub fn encode(timeline: &Timeline) -> Vec<u8> {
    let mut strings = StringTable::new();
    let encoded: Vec<(Vec<u8>, Vec<u8>)> = timeline
        .entries
        .iter()
        .map(|e| e.body.encode(&mut strings))
        .collect();

    let entries_size: usize = encoded
        .iter()
        .map(|(fixed, _)| ENTRY_HEADER_SIZE + ENTRY_PREFIX_SIZE + fixed.len())
        .sum();
    let extra_size: usize = encoded.iter().map(|(_, extra)| extra.len()).sum();
    let file_size = FILE_HEADER_SIZE + entries_size + extra_size + strings.len();

    let mut w = Writer::with_capacity(file_size);
    w.write_tag(FILE_MAGIC);
    w.write_u32(file_size as u32);
    w.write_u32(timeline.entries.len() as u32);
    w.write_u32(extra_size as u32);
    w.write_u32(strings.len() as u32);

    let mut extra_at = 0usize;
    for (entry, (fixed, extra)) in timeline.entries.iter().zip(&encoded) {
        w.write_tag(entry.tag());
        w.write_u32((ENTRY_HEADER_SIZE + ENTRY_PREFIX_SIZE + fixed.len()) as u32);
        w.write_u32(if extra.is_empty() { 0 } else { extra_at as u32 });
        w.write_u32(extra.len() as u32);
        w.write_i16(entry.id);
        w.write_i16(entry.time);
        w.write_bytes(fixed);
        extra_at += extra.len();
    }
    for (_, extra) in &encoded {
        w.write_bytes(extra);
    }
    w.write_bytes(strings.as_bytes());
    w.into_bytes()
}
