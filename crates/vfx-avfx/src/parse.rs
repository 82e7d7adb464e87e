//! Two-pass decoding of VFX graph files.
//!
//! The build pass turns every root child into a layout slot or a group
//! member, storing reference slots as plain indices. The link pass then
//! checks every index against the final group sizes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use vfx_chunk::{decode_chunks, ChunkError, ChunkRef, StringTable, Tag, CHUNK_HEADER_SIZE};
use vfx_core::schema::{self, FieldSpec, FieldType};
use vfx_core::{
    Curve, CurvePart, DanglingReference, Field, Graph, Node, NodeKind, NodeRef, RawChunk,
    Reference, Slot, Value, VerifyStatus,
};

use crate::format::{self, EXPORT_ROOT_TAG, KEYS_TAG, ROOT_TAG, STRINGS_TAG};

/// A non-fatal finding from [`load`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "kebab-case")]
pub enum ParseIssue {
    /// An unrecognized top-level chunk, kept as an opaque node.
    Opaque {
        node: NodeRef,
        tag: Tag,
        offset: usize,
        len: usize,
    },
    /// An unrecognized child chunk inside a known node, kept in position.
    UnknownField {
        owner: NodeRef,
        within: NodeKind,
        tag: Tag,
    },
    /// A chunk whose payload does not fit its schema. The node it belongs to
    /// is kept as raw bytes.
    SchemaMismatch {
        tag: Tag,
        node: Option<NodeRef>,
        offset: usize,
        reason: String,
    },
    /// A reference to a node that does not exist; it was cleared.
    DanglingReference(DanglingReference),
    /// A stored group count that disagrees with the members present.
    CountMismatch {
        kind: NodeKind,
        declared: u32,
        actual: usize,
    },
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseIssue::Opaque { tag, offset, len, .. } => {
                write!(f, "unknown chunk {tag} ({len} bytes at {offset:#x}) kept verbatim")
            }
            ParseIssue::UnknownField { owner, within, tag } => {
                write!(f, "unknown field {tag} in {within} of {owner} kept verbatim")
            }
            ParseIssue::SchemaMismatch {
                tag, offset, reason, ..
            } => write!(f, "{tag} at {offset:#x} kept as raw bytes: {reason}"),
            ParseIssue::DanglingReference(d) => write!(f, "{d}; cleared"),
            ParseIssue::CountMismatch {
                kind,
                declared,
                actual,
            } => write!(f, "{kind} count says {declared} but {actual} present"),
        }
    }
}

/// Everything [`load`] noticed without failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseReport {
    pub issues: Vec<ParseIssue>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, issue: ParseIssue) {
        self.issues.push(issue);
    }

    pub fn dangling(&self) -> impl Iterator<Item = &DanglingReference> {
        self.issues.iter().filter_map(|issue| match issue {
            ParseIssue::DanglingReference(d) => Some(d),
            _ => None,
        })
    }
}

/// A decoded graph together with its parse report.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub graph: Graph,
    pub report: ParseReport,
}

/// Errors that stop [`load`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file is empty")]
    Empty,

    #[error("not a VFX graph file: root chunk is {0}, expected {ROOT_TAG}")]
    NotVfx(Tag),

    #[error("unreadable root chunk: {0}")]
    Framing(ChunkError),

    #[error("{len} unexpected byte(s) after the root chunk at offset {offset}")]
    TrailingData { offset: usize, len: usize },

    /// The root chunk or its child list ends early. Everything decoded before
    /// the cut is returned in `partial`.
    #[error("file is truncated: {error}")]
    Truncated {
        error: ChunkError,
        partial: Box<Loaded>,
    },
}

impl LoadError {
    pub fn partial(&self) -> Option<&Loaded> {
        match self {
            LoadError::Truncated { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

/// Decode a VFX graph file.
pub fn load(data: &[u8]) -> Result<Loaded, LoadError> {
    if data.is_empty() {
        return Err(LoadError::Empty);
    }
    let top = decode_chunks(data);
    let Some(root) = top.chunks.first() else {
        return match top.truncated {
            Some(error) => match error {
                ChunkError::Truncated { tag, .. } if tag == ROOT_TAG => {
                    let (partial, _) = parse_root(&data[CHUNK_HEADER_SIZE..]);
                    log::warn!("root chunk truncated: {error}");
                    Err(LoadError::Truncated {
                        error,
                        partial: Box::new(partial),
                    })
                }
                ChunkError::Truncated { tag, .. } => Err(LoadError::NotVfx(tag)),
                other => Err(LoadError::Framing(other)),
            },
            None => Err(LoadError::Empty),
        };
    };
    if root.tag != ROOT_TAG {
        return Err(LoadError::NotVfx(root.tag));
    }
    let end = root.encoded_len();
    if end < data.len() {
        return Err(LoadError::TrailingData {
            offset: end,
            len: data.len() - end,
        });
    }

    let (loaded, truncated) = parse_root(root.payload);
    match truncated {
        Some(error) => {
            log::warn!("root children truncated: {error}");
            Err(LoadError::Truncated {
                error,
                partial: Box::new(loaded),
            })
        }
        None => Ok(loaded),
    }
}

struct Member<'a> {
    kind: NodeKind,
    chunk: ChunkRef<'a>,
    /// Why a chunk with a known tag ended up opaque.
    reason: Option<String>,
}

fn parse_root(payload: &[u8]) -> (Loaded, Option<ChunkError>) {
    let children = decode_chunks(payload);
    let strings = children
        .find(STRINGS_TAG)
        .map(|c| StringTable::from_bytes(c.payload))
        .unwrap_or_default();

    let mut layout = Vec::new();
    let mut members = Vec::new();
    let mut declared: BTreeMap<NodeKind, u32> = BTreeMap::new();
    let mut export_root = None;
    let mut seen_tags: HashSet<Tag> = HashSet::new();
    let mut seen_groups: HashSet<NodeKind> = HashSet::new();

    for chunk in &children.chunks {
        let tag = chunk.tag;
        if let Some(kind) = NodeKind::from_group_tag(tag) {
            if seen_groups.insert(kind) {
                layout.push(Slot::Members(kind));
            }
            members.push(Member {
                kind,
                chunk: *chunk,
                reason: None,
            });
            continue;
        }

        let header = schema::field_by_tag(schema::root_fields(), tag);
        let count = NodeKind::from_count_tag(tag);
        let singleton =
            tag == STRINGS_TAG || tag == EXPORT_ROOT_TAG || header.is_some() || count.is_some();

        let reason = if singleton && !seen_tags.insert(tag) {
            Some(format!("repeated {tag} chunk"))
        } else if tag == STRINGS_TAG {
            layout.push(Slot::Strings);
            continue;
        } else if tag == EXPORT_ROOT_TAG {
            match format::read_export_root(chunk.payload) {
                Some(root) => {
                    export_root = Some(root);
                    layout.push(Slot::ExportRoot);
                    continue;
                }
                None => Some("malformed export root".to_string()),
            }
        } else if let Some(kind) = count {
            match <[u8; 4]>::try_from(chunk.payload) {
                Ok(bytes) => {
                    declared.insert(kind, u32::from_le_bytes(bytes));
                    layout.push(Slot::Count(kind));
                    continue;
                }
                Err(_) => Some(format!(
                    "count is {} bytes, expected 4",
                    chunk.payload.len()
                )),
            }
        } else if let Some(spec) = header {
            match scalar(spec, chunk.payload, &strings) {
                Ok(value) => {
                    layout.push(Slot::Field(Field::new(tag, value)));
                    continue;
                }
                Err(reason) => Some(reason),
            }
        } else {
            None
        };

        let kind = NodeKind::Opaque(tag);
        if seen_groups.insert(kind) {
            layout.push(Slot::Members(kind));
        }
        members.push(Member {
            kind,
            chunk: *chunk,
            reason,
        });
    }

    let mut graph = Graph::from_layout(layout);
    graph.set_source_strings(children.find(STRINGS_TAG).map(|c| c.payload.to_vec()));
    let mut report = ParseReport::default();
    let mut negative = Vec::new();

    // Build pass
    for member in members {
        let Member { kind, chunk, reason } = member;
        let at = NodeRef::new(kind, graph.len(kind));
        let offset = chunk.offset + CHUNK_HEADER_SIZE;
        let node = match (kind, reason) {
            (NodeKind::Opaque(tag), Some(reason)) => {
                log::warn!("{tag} at {offset:#x} kept as raw bytes: {reason}");
                report.push(ParseIssue::SchemaMismatch {
                    tag,
                    node: Some(at),
                    offset,
                    reason,
                });
                Node::opaque(tag, chunk.payload.to_vec())
            }
            (NodeKind::Opaque(tag), None) => {
                log::debug!("unknown chunk {tag} at {offset:#x} kept verbatim");
                report.push(ParseIssue::Opaque {
                    node: at,
                    tag,
                    offset,
                    len: chunk.payload.len(),
                });
                Node::opaque(tag, chunk.payload.to_vec())
            }
            _ => {
                let mut decoder = Decoder::new(&strings, at);
                match decoder.node(kind, chunk.payload, "") {
                    Ok(node) => {
                        report.issues.append(&mut decoder.unknown);
                        negative.append(&mut decoder.negative);
                        node
                    }
                    Err(reason) => {
                        log::warn!("{at} kept as raw bytes: {reason}");
                        report.push(ParseIssue::SchemaMismatch {
                            tag: chunk.tag,
                            node: Some(at),
                            offset,
                            reason,
                        });
                        Node::degraded(kind, chunk.payload.to_vec())
                    }
                }
            }
        };
        if let Err(err) = graph.push_node(node) {
            log::warn!("dropped {at}: {err}");
        }
    }

    // Link pass
    for dangling in graph.verify() {
        report.push(ParseIssue::DanglingReference(dangling));
    }
    for dangling in negative {
        log::warn!("cleared dangling reference: {dangling}");
        if let Some(node) = graph.node_mut(dangling.owner) {
            node.status = VerifyStatus::Issue;
        }
        report.push(ParseIssue::DanglingReference(dangling));
    }
    for (kind, declared) in declared {
        let actual = graph.len(kind);
        if declared as usize != actual {
            log::warn!("{kind} count says {declared} but {actual} present");
            report.push(ParseIssue::CountMismatch {
                kind,
                declared,
                actual,
            });
        }
    }

    graph.set_export_root(export_root);
    if let Some(root) = export_root {
        if graph.node(root).is_none() {
            log::warn!("export root {root} does not exist");
            report.push(ParseIssue::SchemaMismatch {
                tag: EXPORT_ROOT_TAG,
                node: None,
                offset: 0,
                reason: format!("export root {root} does not exist"),
            });
            graph.set_export_root(None);
        }
    }

    (Loaded { graph, report }, children.truncated)
}

/// Decodes one top-level node, collecting findings that only count if the
/// whole node decodes.
struct Decoder<'a> {
    strings: &'a StringTable,
    owner: NodeRef,
    unknown: Vec<ParseIssue>,
    negative: Vec<DanglingReference>,
}

impl<'a> Decoder<'a> {
    fn new(strings: &'a StringTable, owner: NodeRef) -> Self {
        Self {
            strings,
            owner,
            unknown: Vec::new(),
            negative: Vec::new(),
        }
    }

    fn node(&mut self, kind: NodeKind, payload: &[u8], prefix: &str) -> Result<Node, String> {
        if payload.is_empty() {
            return Ok(Node::unassigned(kind));
        }
        let chunks = decode_chunks(payload)
            .into_complete()
            .map_err(|e| format!("in {kind}: {e}"))?;
        let specs = schema::fields(kind);
        let mut items: HashMap<Tag, usize> = HashMap::new();
        let mut fields = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let value = match schema::field_by_tag(specs, chunk.tag) {
                Some(spec) => {
                    let path = match spec.ty {
                        FieldType::Node(_) if spec.repeated => {
                            let n = items.entry(spec.tag).or_insert(0);
                            *n += 1;
                            format!("{prefix}{}[{}].", spec.name, *n - 1)
                        }
                        FieldType::Node(_) => format!("{prefix}{}.", spec.name),
                        _ => format!("{prefix}{}", spec.name),
                    };
                    self.value(spec, chunk.payload, &path)?
                }
                None => {
                    log::debug!("unknown field {} in {kind} of {}", chunk.tag, self.owner);
                    self.unknown.push(ParseIssue::UnknownField {
                        owner: self.owner,
                        within: kind,
                        tag: chunk.tag,
                    });
                    Value::Raw(chunk.payload.to_vec())
                }
            };
            fields.push(Field::new(chunk.tag, value));
        }
        Ok(Node::from_fields(kind, fields))
    }

    fn value(&mut self, spec: &FieldSpec, payload: &[u8], path: &str) -> Result<Value, String> {
        match spec.ty {
            FieldType::Curve => curve(spec, payload).map(Value::Curve),
            FieldType::Node(kind) => self
                .node(kind, payload, path)
                .map(|node| Value::Node(Box::new(node))),
            FieldType::Ref(target) => {
                let raw = i32::from_le_bytes(word(spec, payload)?);
                let index = match raw {
                    -1 => None,
                    i if i >= 0 => Some(i as usize),
                    i => {
                        self.negative.push(DanglingReference {
                            owner: self.owner,
                            slot: path.to_string(),
                            target,
                            index: i64::from(i),
                        });
                        None
                    }
                };
                Ok(Value::Ref(Reference { target, index }))
            }
            _ => scalar(spec, payload, self.strings),
        }
    }
}

fn word(spec: &FieldSpec, payload: &[u8]) -> Result<[u8; 4], String> {
    payload
        .try_into()
        .map_err(|_| format!("{} is {} bytes, expected 4", spec.tag, payload.len()))
}

/// Decode a field that holds no nested chunks.
fn scalar(spec: &FieldSpec, payload: &[u8], strings: &StringTable) -> Result<Value, String> {
    let value = match spec.ty {
        FieldType::Int => Value::Int(i32::from_le_bytes(word(spec, payload)?)),
        FieldType::Float => Value::Float(f32::from_le_bytes(word(spec, payload)?)),
        FieldType::Enum(ty) => Value::Enum(ty, i32::from_le_bytes(word(spec, payload)?)),
        FieldType::Count(_) => Value::Count(u32::from_le_bytes(word(spec, payload)?)),
        FieldType::Bool => match payload {
            [0] => Value::Bool(false),
            [1] => Value::Bool(true),
            _ => return Err(format!("{} is not a bool: {payload:02x?}", spec.tag)),
        },
        FieldType::Str => {
            let offset = u32::from_le_bytes(word(spec, payload)?);
            let s = strings
                .resolve(offset)
                .map_err(|e| format!("{}: {e}", spec.tag))?;
            Value::Str(s.to_string())
        }
        FieldType::Bytes => Value::Bytes(payload.to_vec()),
        FieldType::Curve | FieldType::Node(_) | FieldType::Ref(_) => {
            return Err(format!("{} cannot be decoded as a plain value", spec.tag))
        }
    };
    Ok(value)
}

fn curve(spec: &FieldSpec, payload: &[u8]) -> Result<Curve, String> {
    let chunks = decode_chunks(payload)
        .into_complete()
        .map_err(|e| format!("in curve {}: {e}", spec.tag))?;
    let mut curve = Curve::default();
    for chunk in chunks {
        let part = if chunk.tag == KEYS_TAG && !curve.has_keys() {
            let keys =
                format::read_keys(chunk.payload).map_err(|e| format!("curve {}: {e}", spec.tag))?;
            CurvePart::Keys(keys)
        } else {
            CurvePart::Unknown(RawChunk {
                tag: chunk.tag,
                payload: chunk.payload.to_vec(),
            })
        };
        curve.parts.push(part);
    }
    Ok(curve)
}
