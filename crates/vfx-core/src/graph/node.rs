//! The Node struct: one typed object in the editable graph.
//!
//! Nodes are built either by the decoder or by [`Node::create_default`], and
//! changed only through the setters here, which check every write against the
//! kind's schema.

use vfx_chunk::{decode_chunks, Tag, CHUNK_HEADER_SIZE};

use super::kind::NodeKind;
use super::value::{Reference, Value};
use super::GraphError;
use crate::schema::{self, FieldSpec, FieldType};
use crate::verify::VerifyStatus;

/// One attribute of a node, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub tag: Tag,
    pub value: Value,
}

impl Field {
    pub fn new(tag: Tag, value: Value) -> Self {
        Self { tag, value }
    }
}

/// A node in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Fixed for the node's lifetime.
    pub kind: NodeKind,
    /// Unassigned nodes are placeholders with no fields.
    pub assigned: bool,
    fields: Vec<Field>,
    /// Verbatim payload of an opaque node, or of a known node whose payload
    /// failed to decode.
    raw_payload: Option<Vec<u8>>,
    pub status: VerifyStatus,
    /// Set on an imported node whose dependencies were not all imported.
    pub has_dependencies: bool,
    /// User-facing name from workspace metadata. Never encoded.
    pub display_name: Option<String>,
}

impl Node {
    fn blank(kind: NodeKind) -> Self {
        Self {
            kind,
            assigned: false,
            fields: Vec::new(),
            raw_payload: None,
            status: VerifyStatus::Unverified,
            has_dependencies: false,
            display_name: None,
        }
    }

    /// A fully populated node with every schema default.
    ///
    /// Item lists start empty and optional sub-objects start unassigned.
    pub fn create_default(kind: NodeKind) -> Self {
        let mut node = Self::blank(kind);
        node.assign();
        node
    }

    pub fn unassigned(kind: NodeKind) -> Self {
        Self::blank(kind)
    }

    /// A node for an unrecognized top-level chunk.
    pub fn opaque(tag: Tag, payload: Vec<u8>) -> Self {
        Self {
            assigned: true,
            raw_payload: Some(payload),
            ..Self::blank(NodeKind::Opaque(tag))
        }
    }

    /// A known node whose payload could not be decoded; kept verbatim.
    pub fn degraded(kind: NodeKind, payload: Vec<u8>) -> Self {
        Self {
            assigned: true,
            raw_payload: Some(payload),
            status: VerifyStatus::Issue,
            ..Self::blank(kind)
        }
    }

    /// A node built from already decoded fields.
    pub fn from_fields(kind: NodeKind, fields: Vec<Field>) -> Self {
        Self {
            assigned: true,
            fields,
            ..Self::blank(kind)
        }
    }

    /// Fill every missing schema field with its default.
    ///
    /// A no-op on nodes that are already assigned.
    pub fn assign(&mut self) {
        if self.assigned {
            return;
        }
        self.assigned = true;
        self.raw_payload = None;
        self.fields = self
            .schema()
            .iter()
            .filter_map(|spec| spec.default_value().map(|v| Field::new(spec.tag, v)))
            .collect();
    }

    /// Drop every field, keeping the node as an empty placeholder.
    pub fn unassign(&mut self) {
        self.assigned = false;
        self.fields.clear();
        self.raw_payload = None;
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        schema::fields(self.kind)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn raw_payload(&self) -> Option<&[u8]> {
        self.raw_payload.as_deref()
    }

    pub fn is_raw(&self) -> bool {
        self.raw_payload.is_some()
    }

    /// First field carrying `tag`.
    pub fn field(&self, tag: Tag) -> Option<&Value> {
        self.fields.iter().find(|f| f.tag == tag).map(|f| &f.value)
    }

    /// Look up an attribute by schema name.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        let spec = schema::field_by_name(self.schema(), name)?;
        self.field(spec.tag)
    }

    fn writable_spec(&self, name: &str) -> Result<&'static FieldSpec, GraphError> {
        if self.is_raw() {
            return Err(GraphError::RawPayload(self.kind));
        }
        if !self.assigned {
            return Err(GraphError::NotAssigned(self.kind));
        }
        schema::field_by_name(self.schema(), name).ok_or_else(|| GraphError::UnknownAttribute {
            kind: self.kind,
            name: name.to_string(),
        })
    }

    /// Set an attribute, checking it against the schema.
    ///
    /// Derived counts and item lists cannot be set directly.
    pub fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), GraphError> {
        let spec = self.writable_spec(name)?;
        if spec.repeated {
            return Err(GraphError::Repeated(spec.name));
        }
        if matches!(spec.ty, FieldType::Count(_)) {
            return Err(GraphError::DerivedField(spec.name));
        }
        if !spec.accepts(&value) {
            return Err(GraphError::TypeMismatch {
                name: spec.name,
                expected: spec.type_description(),
                found: value.type_name(),
            });
        }
        match self.fields.iter_mut().find(|f| f.tag == spec.tag) {
            Some(field) => field.value = value,
            None => {
                let at = self.insertion_point(spec.tag);
                self.fields.insert(at, Field::new(spec.tag, value));
            }
        }
        Ok(())
    }

    pub fn reference(&self, name: &str) -> Option<Reference> {
        self.attribute(name).and_then(Value::as_reference).copied()
    }

    /// Point a reference slot at `index` in its target group, or clear it.
    pub fn set_reference(&mut self, name: &str, index: Option<usize>) -> Result<(), GraphError> {
        let spec = self.writable_spec(name)?;
        let FieldType::Ref(target) = spec.ty else {
            return Err(GraphError::TypeMismatch {
                name: spec.name,
                expected: spec.type_description(),
                found: "reference",
            });
        };
        self.set_attribute(name, Value::Ref(Reference { target, index }))
    }

    /// Nodes of the item list stored under `tag`.
    pub fn items(&self, tag: Tag) -> impl Iterator<Item = &Node> {
        self.fields
            .iter()
            .filter(move |f| f.tag == tag)
            .filter_map(|f| f.value.as_node())
    }

    fn repeated_spec(&self, tag: Tag) -> Result<(&'static FieldSpec, NodeKind), GraphError> {
        if self.is_raw() {
            return Err(GraphError::RawPayload(self.kind));
        }
        if !self.assigned {
            return Err(GraphError::NotAssigned(self.kind));
        }
        match schema::field_by_tag(self.schema(), tag) {
            Some(spec) if spec.repeated => match spec.ty {
                FieldType::Node(kind) => Ok((spec, kind)),
                _ => Err(GraphError::NotRepeated(tag)),
            },
            _ => Err(GraphError::NotRepeated(tag)),
        }
    }

    /// Append a default item to the list under `tag` and return its index.
    pub fn push_item(&mut self, tag: Tag) -> Result<usize, GraphError> {
        let (_, kind) = self.repeated_spec(tag)?;
        let index = self.items(tag).count();
        let at = match self.fields.iter().rposition(|f| f.tag == tag) {
            Some(last) => last + 1,
            None => self.insertion_point(tag),
        };
        let item = Node::create_default(kind);
        self.fields
            .insert(at, Field::new(tag, Value::Node(Box::new(item))));
        self.refresh_counts();
        Ok(index)
    }

    pub fn remove_item(&mut self, tag: Tag, index: usize) -> Result<Node, GraphError> {
        self.repeated_spec(tag)?;
        let len = self.items(tag).count();
        let pos = self
            .item_position(tag, index)
            .ok_or(GraphError::ItemOutOfRange { tag, index, len })?;
        let field = self.fields.remove(pos);
        self.refresh_counts();
        match field.value {
            Value::Node(node) => Ok(*node),
            _ => Err(GraphError::NotRepeated(tag)),
        }
    }

    pub fn item_mut(&mut self, tag: Tag, index: usize) -> Result<&mut Node, GraphError> {
        self.repeated_spec(tag)?;
        let len = self.items(tag).count();
        let pos = self
            .item_position(tag, index)
            .ok_or(GraphError::ItemOutOfRange { tag, index, len })?;
        match &mut self.fields[pos].value {
            Value::Node(node) => Ok(node),
            _ => Err(GraphError::NotRepeated(tag)),
        }
    }

    /// The fixed optional sub-object stored under attribute `name`.
    ///
    /// The slot is created unassigned if the node does not carry it yet.
    pub fn slot_mut(&mut self, name: &str) -> Result<&mut Node, GraphError> {
        let spec = self.writable_spec(name)?;
        let kind = match spec.ty {
            FieldType::Node(kind) if !spec.repeated => kind,
            _ => return Err(GraphError::NotASlot(spec.name)),
        };
        let pos = match self.fields.iter().position(|f| f.tag == spec.tag) {
            Some(pos) => pos,
            None => {
                let at = self.insertion_point(spec.tag);
                let slot = Value::Node(Box::new(Node::unassigned(kind)));
                self.fields.insert(at, Field::new(spec.tag, slot));
                at
            }
        };
        match &mut self.fields[pos].value {
            Value::Node(node) => Ok(node),
            _ => Err(GraphError::NotASlot(spec.name)),
        }
    }

    /// Set every count field to the number of sibling fields it counts.
    pub fn refresh_counts(&mut self) {
        let specs = self.schema();
        let counts: Vec<(usize, u32)> = self
            .fields
            .iter()
            .enumerate()
            .filter_map(|(i, f)| match schema::field_by_tag(specs, f.tag)?.ty {
                FieldType::Count(of) => {
                    Some((i, self.fields.iter().filter(|g| g.tag == of).count() as u32))
                }
                _ => None,
            })
            .collect();
        for (i, n) in counts {
            self.fields[i].value = Value::Count(n);
        }
    }

    /// Call `f` for every reference slot, nested ones included, with a path
    /// naming the slot (`Particles[0].Particle`).
    ///
    /// For a node kept as raw bytes, the slots are the reference fields that
    /// can still be located in the payload.
    pub fn visit_references(&self, f: &mut dyn FnMut(&str, &Reference)) {
        match &self.raw_payload {
            Some(payload) => {
                for site in raw_reference_sites(self.kind, payload) {
                    if let Some(r) = site.read(payload) {
                        f(&site.path, &r);
                    }
                }
            }
            None => self.walk_references("", f),
        }
    }

    fn walk_references(&self, prefix: &str, f: &mut dyn FnMut(&str, &Reference)) {
        let specs = self.schema();
        let mut seen: Vec<(Tag, usize)> = Vec::new();
        for field in &self.fields {
            let Some(spec) = schema::field_by_tag(specs, field.tag) else {
                continue;
            };
            match &field.value {
                Value::Ref(r) => f(&format!("{prefix}{}", spec.name), r),
                Value::Node(child) => {
                    let path = slot_path(prefix, spec, &mut seen);
                    child.walk_references(&path, f);
                }
                _ => {}
            }
        }
    }

    /// Like [`Node::visit_references`]; changes made by `f` are written back,
    /// into the payload for a node kept as raw bytes.
    pub fn visit_references_mut(&mut self, f: &mut dyn FnMut(&str, &mut Reference)) {
        if self.raw_payload.is_none() {
            self.walk_references_mut("", f);
            return;
        }
        let kind = self.kind;
        let Some(payload) = self.raw_payload.as_mut() else {
            return;
        };
        for site in raw_reference_sites(kind, payload) {
            let Some(mut r) = site.read(payload) else {
                continue;
            };
            let before = r;
            f(&site.path, &mut r);
            if r != before {
                site.write(payload, &r);
            }
        }
    }

    fn walk_references_mut(&mut self, prefix: &str, f: &mut dyn FnMut(&str, &mut Reference)) {
        let specs = self.schema();
        let mut seen: Vec<(Tag, usize)> = Vec::new();
        for field in &mut self.fields {
            let Some(spec) = schema::field_by_tag(specs, field.tag) else {
                continue;
            };
            match &mut field.value {
                Value::Ref(r) => f(&format!("{prefix}{}", spec.name), r),
                Value::Node(child) => {
                    let path = slot_path(prefix, spec, &mut seen);
                    child.walk_references_mut(&path, f);
                }
                _ => {}
            }
        }
    }

    /// Whether this node or anything nested in it has a reference slot.
    pub fn has_reference_slots(&self) -> bool {
        let mut found = false;
        self.visit_references(&mut |_, _| found = true);
        found
    }

    fn item_position(&self, tag: Tag, index: usize) -> Option<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.tag == tag && f.value.as_node().is_some())
            .nth(index)
            .map(|(i, _)| i)
    }

    /// Where a missing field belongs so the node keeps schema order.
    fn insertion_point(&self, tag: Tag) -> usize {
        let specs = self.schema();
        let Some(rank) = schema::rank(specs, tag) else {
            return self.fields.len();
        };
        self.fields
            .iter()
            .position(|f| schema::rank(specs, f.tag).is_some_and(|r| r > rank))
            .unwrap_or(self.fields.len())
    }
}

/// A reference field found inside a raw payload.
struct RawSite {
    path: String,
    target: NodeKind,
    /// Offset of the field's 4-byte value within the payload.
    at: usize,
}

impl RawSite {
    /// `None` for negative values other than -1, which name no slot index.
    fn read(&self, payload: &[u8]) -> Option<Reference> {
        let bytes: [u8; 4] = payload.get(self.at..self.at + 4)?.try_into().ok()?;
        let index = match i32::from_le_bytes(bytes) {
            -1 => None,
            i => Some(usize::try_from(i).ok()?),
        };
        Some(Reference {
            target: self.target,
            index,
        })
    }

    fn write(&self, payload: &mut [u8], r: &Reference) {
        let value = r.index.map_or(-1, |i| i as i32);
        if let Some(dst) = payload.get_mut(self.at..self.at + 4) {
            dst.copy_from_slice(&value.to_le_bytes());
        }
    }
}

/// Reference fields of `kind` in the complete chunks of `payload`, nested
/// sub-objects included. Decoding stops quietly at the first broken chunk.
fn raw_reference_sites(kind: NodeKind, payload: &[u8]) -> Vec<RawSite> {
    let mut sites = Vec::new();
    collect_raw_sites(kind, payload, 0, "", &mut sites);
    sites
}

fn collect_raw_sites(kind: NodeKind, payload: &[u8], base: usize, prefix: &str, out: &mut Vec<RawSite>) {
    let specs = schema::fields(kind);
    let mut seen: Vec<(Tag, usize)> = Vec::new();
    for chunk in &decode_chunks(payload).chunks {
        let Some(spec) = schema::field_by_tag(specs, chunk.tag) else {
            continue;
        };
        let at = base + chunk.offset + CHUNK_HEADER_SIZE;
        match spec.ty {
            FieldType::Ref(target) if chunk.payload.len() == 4 => out.push(RawSite {
                path: format!("{prefix}{}", spec.name),
                target,
                at,
            }),
            FieldType::Node(child) => {
                let path = slot_path(prefix, spec, &mut seen);
                collect_raw_sites(child, chunk.payload, at, &path, out);
            }
            _ => {}
        }
    }
}

fn slot_path(prefix: &str, spec: &FieldSpec, seen: &mut Vec<(Tag, usize)>) -> String {
    if !spec.repeated {
        return format!("{prefix}{}.", spec.name);
    }
    let index = match seen.iter_mut().find(|(t, _)| *t == spec.tag) {
        Some((_, n)) => {
            *n += 1;
            *n
        }
        None => {
            seen.push((spec.tag, 0));
            0
        }
    };
    format!("{prefix}{}[{index}].", spec.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::value::{Curve, EnumType, Keyframe};

    const ITPR: Tag = Tag::new(b"ItPr");

    #[test]
    fn default_particle_has_unassigned_texture_slots() {
        let node = Node::create_default(NodeKind::Particle);
        assert!(node.assigned);
        let slot = node.attribute("TextureColor1").unwrap().as_node().unwrap();
        assert_eq!(slot.kind, NodeKind::TextureSlot);
        assert!(!slot.assigned);
        assert_eq!(
            node.reference("Model"),
            Some(Reference::none(NodeKind::Model))
        );
    }

    #[test]
    fn default_emitter_has_empty_item_lists() {
        let node = Node::create_default(NodeKind::Emitter);
        assert_eq!(node.items(ITPR).count(), 0);
        assert_eq!(node.attribute("ParticleCount"), Some(&Value::Count(0)));
        assert_eq!(node.attribute("SoundNumber"), Some(&Value::Int(-1)));
    }

    #[test]
    fn set_attribute_checks_types() {
        let mut node = Node::create_default(NodeKind::Binder);
        node.set_attribute("StartDelay", Value::Int(12)).unwrap();
        assert_eq!(node.attribute("StartDelay"), Some(&Value::Int(12)));

        let err = node.set_attribute("StartDelay", Value::Float(1.0)).unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { name: "StartDelay", .. }));

        let err = node
            .set_attribute("BinderType", Value::Enum(EnumType::TextureFilter, 0))
            .unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));

        let err = node.set_attribute("Nope", Value::Int(0)).unwrap_err();
        assert!(matches!(err, GraphError::UnknownAttribute { .. }));
    }

    #[test]
    fn derived_counts_cannot_be_set() {
        let mut node = Node::create_default(NodeKind::Scheduler);
        let err = node.set_attribute("ItemCount", Value::Count(4)).unwrap_err();
        assert!(matches!(err, GraphError::DerivedField("ItemCount")));
    }

    #[test]
    fn missing_field_is_inserted_in_schema_order() {
        let mut node = Node::from_fields(
            NodeKind::Binder,
            vec![Field::new(Tag::new(b"StDS"), Value::Int(3))],
        );
        node.set_attribute("BinderType", Value::Enum(EnumType::BinderType, 2))
            .unwrap();
        let tags: Vec<Tag> = node.fields().iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![Tag::new(b"BnVT"), Tag::new(b"StDS")]);
    }

    #[test]
    fn items_update_their_count() {
        let mut node = Node::create_default(NodeKind::Emitter);
        assert_eq!(node.push_item(ITPR).unwrap(), 0);
        assert_eq!(node.push_item(ITPR).unwrap(), 1);
        node.item_mut(ITPR, 1)
            .unwrap()
            .set_reference("Particle", Some(4))
            .unwrap();
        assert_eq!(node.attribute("ParticleCount"), Some(&Value::Count(2)));

        let removed = node.remove_item(ITPR, 0).unwrap();
        assert_eq!(removed.kind, NodeKind::ParticleInstance);
        assert_eq!(node.attribute("ParticleCount"), Some(&Value::Count(1)));
        let left = node.items(ITPR).next().unwrap();
        assert_eq!(left.reference("Particle").unwrap().index, Some(4));
    }

    #[test]
    fn item_index_out_of_range() {
        let mut node = Node::create_default(NodeKind::Emitter);
        let err = node.remove_item(ITPR, 0).unwrap_err();
        assert!(matches!(err, GraphError::ItemOutOfRange { len: 0, .. }));
        let err = node.push_item(Tag::new(b"Life")).unwrap_err();
        assert!(matches!(err, GraphError::NotRepeated(_)));
    }

    #[test]
    fn assign_and_unassign_slot() {
        let mut particle = Node::create_default(NodeKind::Particle);
        let slot = particle.slot_mut("TextureNormal").unwrap();
        assert!(slot.set_reference("Texture", Some(0)).is_err());
        slot.assign();
        slot.set_reference("Texture", Some(0)).unwrap();
        slot.set_attribute("Offset", Value::Curve(Curve::from_keys(vec![Keyframe::new(0, 1.0)])))
            .unwrap();
        assert!(particle.has_reference_slots());

        let slot = particle.slot_mut("TextureNormal").unwrap();
        slot.unassign();
        assert!(slot.fields().is_empty());
        assert!(particle.slot_mut("Life").is_err());
    }

    #[test]
    fn reference_paths_name_nested_slots() {
        let mut emitter = Node::create_default(NodeKind::Emitter);
        emitter.push_item(ITPR).unwrap();
        emitter.push_item(ITPR).unwrap();
        emitter
            .item_mut(ITPR, 1)
            .unwrap()
            .set_reference("Particle", Some(2))
            .unwrap();

        let mut paths = Vec::new();
        emitter.visit_references(&mut |path, r| paths.push((path.to_string(), r.index)));
        assert_eq!(
            paths,
            vec![
                ("Particles[0].Particle".to_string(), None),
                ("Particles[1].Particle".to_string(), Some(2)),
            ]
        );

        let mut particle = Node::create_default(NodeKind::Particle);
        particle.slot_mut("TextureColor2").unwrap().assign();
        let mut paths = Vec::new();
        particle.visit_references(&mut |path, _| paths.push(path.to_string()));
        assert_eq!(paths, vec!["Model", "TextureColor2.Texture"]);
    }

    #[test]
    fn raw_nodes_refuse_edits() {
        let mut node = Node::degraded(NodeKind::Texture, vec![1, 2, 3]);
        assert_eq!(node.status, VerifyStatus::Issue);
        let err = node.set_attribute("Path", Value::Str("a".into())).unwrap_err();
        assert!(matches!(err, GraphError::RawPayload(NodeKind::Texture)));
        let opaque = Node::opaque(Tag::new(b"Zzzz"), vec![9]);
        assert_eq!(opaque.raw_payload(), Some(&[9u8][..]));
        assert!(!opaque.has_reference_slots());
    }

    #[test]
    fn raw_payload_references_are_visited_and_patched() {
        use vfx_chunk::encode_chunk;

        let slot = encode_chunk(Tag::new(b"TxNo"), &0i32.to_le_bytes());
        let mut payload = [
            encode_chunk(Tag::new(b"MdNo"), &2i32.to_le_bytes()),
            encode_chunk(Tag::new(b"TC1\0"), &slot),
        ]
        .concat();
        payload.extend_from_slice(b"Zz");
        let mut node = Node::degraded(NodeKind::Particle, payload);

        let mut seen = Vec::new();
        node.visit_references(&mut |path, r| seen.push((path.to_string(), r.index)));
        assert_eq!(
            seen,
            vec![
                ("Model".to_string(), Some(2)),
                ("TextureColor1.Texture".to_string(), Some(0)),
            ]
        );

        node.visit_references_mut(&mut |_, r| {
            if r.target == NodeKind::Model {
                r.index = None;
            }
        });
        let raw = node.raw_payload().unwrap();
        assert_eq!(&raw[8..12], &(-1i32).to_le_bytes());
        assert_eq!(&raw[raw.len() - 2..], b"Zz");
    }
}
