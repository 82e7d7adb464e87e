//! Graph to bytes.
//!
//! Every payload is encoded before the envelope around it, so sizes are
//! known when each header is written. The string table is rebuilt from the
//! strings that are actually emitted, in emission order. A graph holding
//! raw-preserved nodes keeps the table it was read with as a prefix instead,
//! since those nodes may point into it.

use thiserror::Error;
use vfx_chunk::{encode_chunk, StringTable, Writer};
use vfx_core::schema::{self, FieldType};
use vfx_core::{Curve, CurvePart, DanglingReference, Graph, Node, Slot, Value};

use crate::format::{self, EXPORT_ROOT_TAG, KEYS_TAG, ROOT_TAG, STRINGS_TAG};

/// Errors that stop [`save`].
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(
        "{} dangling reference(s), first: {}",
        .0.len(),
        .0.first().map(ToString::to_string).unwrap_or_default()
    )]
    DanglingReferences(Vec<DanglingReference>),
}

/// Encode a graph.
///
/// Fails without producing any bytes if a reference points past the end of
/// its target group. Saving the same graph twice yields identical bytes.
pub fn save(graph: &Graph) -> Result<Vec<u8>, SaveError> {
    let dangling = graph.dangling_references();
    if !dangling.is_empty() {
        log::warn!("refusing to save: {} dangling reference(s)", dangling.len());
        return Err(SaveError::DanglingReferences(dangling));
    }
    Ok(encode_graph(graph))
}

/// Encode without checking references. Used for sub-files whose references
/// deliberately point outside them.
pub(crate) fn encode_graph(graph: &Graph) -> Vec<u8> {
    let mut strings = match graph.source_strings() {
        Some(bytes) if graph.has_raw_nodes() => StringTable::with_prefix(bytes),
        _ => StringTable::new(),
    };
    let mut pieces = Vec::with_capacity(graph.layout().len() + 1);

    for slot in graph.layout() {
        let piece = match slot {
            Slot::Strings => Piece::Strings,
            Slot::Field(field) => Piece::Bytes(encode_chunk(
                field.tag,
                &encode_value(&field.value, &mut strings),
            )),
            Slot::Count(kind) => Piece::Bytes(
                kind.count_tag()
                    .map(|tag| encode_chunk(tag, &(graph.len(*kind) as u32).to_le_bytes()))
                    .unwrap_or_default(),
            ),
            Slot::Members(kind) => {
                let mut w = Writer::new();
                if let (Some(tag), Some(group)) = (kind.group_tag(), graph.group(*kind)) {
                    for node in group.nodes() {
                        w.write_chunk(tag, &encode_node(node, &mut strings));
                    }
                }
                Piece::Bytes(w.into_bytes())
            }
            Slot::ExportRoot => Piece::Bytes(
                graph
                    .export_root()
                    .map(|root| encode_chunk(EXPORT_ROOT_TAG, &format::write_export_root(root)))
                    .unwrap_or_default(),
            ),
        };
        pieces.push(piece);
    }

    let has_table = pieces.iter().any(|p| matches!(p, Piece::Strings));
    if !has_table && !strings.is_empty() {
        let at = graph
            .layout()
            .iter()
            .position(|s| !matches!(s, Slot::Field(_)))
            .unwrap_or(pieces.len());
        pieces.insert(at, Piece::Strings);
    }

    let mut w = Writer::new();
    let root = w.begin_chunk(ROOT_TAG);
    for piece in pieces {
        match piece {
            Piece::Bytes(bytes) => w.write_bytes(&bytes),
            Piece::Strings => w.write_chunk(STRINGS_TAG, strings.as_bytes()),
        }
    }
    w.end_chunk(root);
    w.into_bytes()
}

/// One encoded root child. The string table is written last-minute since
/// its content depends on everything else.
enum Piece {
    Bytes(Vec<u8>),
    Strings,
}

/// Encode a node's payload (without its own chunk header).
pub(crate) fn encode_node(node: &Node, strings: &mut StringTable) -> Vec<u8> {
    if let Some(raw) = node.raw_payload() {
        return raw.to_vec();
    }
    if !node.assigned {
        return Vec::new();
    }
    let specs = node.schema();
    let mut w = Writer::new();
    for field in node.fields() {
        let payload = match (&field.value, schema::field_by_tag(specs, field.tag)) {
            (Value::Count(_), Some(spec)) => match spec.ty {
                FieldType::Count(of) => {
                    let n = node.fields().iter().filter(|f| f.tag == of).count() as u32;
                    n.to_le_bytes().to_vec()
                }
                _ => encode_value(&field.value, strings),
            },
            (value, _) => encode_value(value, strings),
        };
        w.write_chunk(field.tag, &payload);
    }
    w.into_bytes()
}

fn encode_value(value: &Value, strings: &mut StringTable) -> Vec<u8> {
    match value {
        Value::Int(v) | Value::Enum(_, v) => v.to_le_bytes().to_vec(),
        Value::Float(v) => v.to_le_bytes().to_vec(),
        Value::Bool(v) => vec![u8::from(*v)],
        Value::Count(n) => n.to_le_bytes().to_vec(),
        Value::Str(s) => strings.intern(s).to_le_bytes().to_vec(),
        Value::Ref(r) => r.index.map_or(-1, |i| i as i32).to_le_bytes().to_vec(),
        Value::Curve(curve) => encode_curve(curve),
        Value::Node(node) => encode_node(node, strings),
        Value::Bytes(bytes) | Value::Raw(bytes) => bytes.clone(),
    }
}

fn encode_curve(curve: &Curve) -> Vec<u8> {
    let mut w = Writer::new();
    for part in &curve.parts {
        match part {
            CurvePart::Keys(keys) => {
                let mark = w.begin_chunk(KEYS_TAG);
                format::write_keys(&mut w, keys);
                w.end_chunk(mark);
            }
            CurvePart::Unknown(chunk) => w.write_chunk(chunk.tag, &chunk.payload),
        }
    }
    w.into_bytes()
}
