//! Core graph data structures: nodes, node groups, and the graph container.
//!
//! A VFX graph is a set of node groups, one per kind. A node's position in
//! its group is its index, and every reference slot in the graph is such an
//! index. Structural edits (insert, remove, move) therefore re-derive every
//! reference into the edited group before they return.

pub mod kind;
pub mod node;
pub mod value;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use vfx_chunk::Tag;

use self::kind::{NodeKind, GROUP_KINDS};
use self::node::{Field, Node};
use self::value::Value;
use crate::preview::PreviewSink;
use crate::schema;
use crate::verify::{DanglingReference, VerifyStatus};

/// Errors from graph and node edits.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{kind} has no attribute named {name:?}")]
    UnknownAttribute { kind: NodeKind, name: String },

    #[error("file header has no field named {0:?}")]
    UnknownHeaderField(String),

    #[error("type mismatch on {name}: expected {expected}, found {found}")]
    TypeMismatch {
        name: &'static str,
        expected: String,
        found: &'static str,
    },

    #[error("{0} is derived from the item list and cannot be set")]
    DerivedField(&'static str),

    #[error("{0} is an item list; use push_item/remove_item")]
    Repeated(&'static str),

    #[error("{0} is not a sub-object slot")]
    NotASlot(&'static str),

    #[error("{0} holds no item list")]
    NotRepeated(Tag),

    #[error("{0} node is unassigned; assign it before editing")]
    NotAssigned(NodeKind),

    #[error("{0} node is kept as raw bytes and cannot be edited")]
    RawPayload(NodeKind),

    #[error("{0} nodes do not live in a group")]
    NotAGroup(NodeKind),

    #[error("{kind} index {index} out of range (group has {len})")]
    IndexOutOfRange {
        kind: NodeKind,
        index: usize,
        len: usize,
    },

    #[error("item {index} of {tag} out of range (list has {len})")]
    ItemOutOfRange { tag: Tag, index: usize, len: usize },
}

/// Address of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub index: usize,
}

impl NodeRef {
    pub fn new(kind: NodeKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.index)
    }
}

/// One entry of the root chunk's layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// A header field, stored in place.
    Field(Field),
    /// The string table.
    Strings,
    /// The member count of a group.
    Count(NodeKind),
    /// Where a group's members are written.
    Members(NodeKind),
    /// Marker naming the top node of an exported sub-file.
    ExportRoot,
}

/// An ordered collection of same-kind nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGroup {
    kind: NodeKind,
    nodes: Vec<Node>,
}

impl NodeGroup {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// Result of [`Graph::remove_node`].
#[derive(Debug)]
pub struct Removed {
    pub node: Node,
    /// Nodes whose reference to the removed node was cleared.
    pub cleared: Vec<NodeRef>,
}

/// A slot pointing at a node, as returned by [`Graph::references_to`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomingReference {
    pub owner: NodeRef,
    pub slot: String,
}

/// The editable VFX graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    layout: Vec<Slot>,
    groups: BTreeMap<NodeKind, NodeGroup>,
    export_root: Option<NodeRef>,
    source_strings: Option<Vec<u8>>,
}

impl Graph {
    /// An empty graph with every header default and every known group.
    pub fn new() -> Self {
        let mut layout: Vec<Slot> = schema::root_fields()
            .iter()
            .filter_map(|spec| {
                spec.default_value()
                    .map(|v| Slot::Field(Field::new(spec.tag, v)))
            })
            .collect();
        layout.push(Slot::Strings);
        layout.extend(GROUP_KINDS.iter().map(|k| Slot::Count(*k)));
        layout.extend(GROUP_KINDS.iter().map(|k| Slot::Members(*k)));
        Self::from_layout(layout)
    }

    /// A graph with the given root layout and an empty group for every kind
    /// the layout mentions.
    pub fn from_layout(layout: Vec<Slot>) -> Self {
        let mut groups = BTreeMap::new();
        for slot in &layout {
            if let Slot::Count(kind) | Slot::Members(kind) = slot {
                groups
                    .entry(*kind)
                    .or_insert_with(|| NodeGroup::new(*kind));
            }
        }
        Self {
            layout,
            groups,
            export_root: None,
            source_strings: None,
        }
    }

    pub fn layout(&self) -> &[Slot] {
        &self.layout
    }

    pub fn export_root(&self) -> Option<NodeRef> {
        self.export_root
    }

    /// String table bytes of the file this graph was read from. Raw-preserved
    /// nodes may hold offsets into it.
    pub fn source_strings(&self) -> Option<&[u8]> {
        self.source_strings.as_deref()
    }

    pub fn set_source_strings(&mut self, bytes: Option<Vec<u8>>) {
        self.source_strings = bytes;
    }

    /// Whether any node is kept as raw bytes.
    pub fn has_raw_nodes(&self) -> bool {
        self.groups
            .values()
            .any(|group| group.nodes.iter().any(Node::is_raw))
    }

    /// Record (or clear) the top node of an exported sub-file.
    pub fn set_export_root(&mut self, root: Option<NodeRef>) {
        let has_slot = self.layout.iter().any(|s| matches!(s, Slot::ExportRoot));
        match (root.is_some(), has_slot) {
            (true, false) => self.layout.push(Slot::ExportRoot),
            (false, true) => self.layout.retain(|s| !matches!(s, Slot::ExportRoot)),
            _ => {}
        }
        self.export_root = root;
    }

    pub fn header_attribute(&self, name: &str) -> Option<&Value> {
        let spec = schema::field_by_name(schema::root_fields(), name)?;
        self.layout.iter().find_map(|slot| match slot {
            Slot::Field(f) if f.tag == spec.tag => Some(&f.value),
            _ => None,
        })
    }

    pub fn set_header_attribute(&mut self, name: &str, value: Value) -> Result<(), GraphError> {
        let spec = schema::field_by_name(schema::root_fields(), name)
            .ok_or_else(|| GraphError::UnknownHeaderField(name.to_string()))?;
        if !spec.accepts(&value) {
            return Err(GraphError::TypeMismatch {
                name: spec.name,
                expected: spec.type_description(),
                found: value.type_name(),
            });
        }
        for slot in &mut self.layout {
            if let Slot::Field(f) = slot {
                if f.tag == spec.tag {
                    f.value = value;
                    return Ok(());
                }
            }
        }
        let at = self
            .layout
            .iter()
            .position(|s| !matches!(s, Slot::Field(_)))
            .unwrap_or(self.layout.len());
        self.layout.insert(at, Slot::Field(Field::new(spec.tag, value)));
        Ok(())
    }

    pub fn group(&self, kind: NodeKind) -> Option<&NodeGroup> {
        self.groups.get(&kind)
    }

    /// Every group, in canonical kind order.
    pub fn groups(&self) -> impl Iterator<Item = &NodeGroup> {
        self.groups.values()
    }

    /// Number of members in the group of `kind` (zero if there is none).
    pub fn len(&self, kind: NodeKind) -> usize {
        self.groups.get(&kind).map_or(0, NodeGroup::len)
    }

    pub fn node(&self, at: NodeRef) -> Option<&Node> {
        self.groups.get(&at.kind)?.nodes.get(at.index)
    }

    /// Mutable access for setter calls. Structural edits go through the
    /// graph so references stay consistent.
    pub fn node_mut(&mut self, at: NodeRef) -> Option<&mut Node> {
        self.groups.get_mut(&at.kind)?.nodes.get_mut(at.index)
    }

    /// Every member address, in canonical kind order then index order.
    pub fn node_refs(&self) -> Vec<NodeRef> {
        self.groups
            .iter()
            .flat_map(|(kind, group)| (0..group.len()).map(move |i| NodeRef::new(*kind, i)))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.groups.values().map(NodeGroup::len).sum()
    }

    fn out_of_range(&self, kind: NodeKind, index: usize) -> GraphError {
        GraphError::IndexOutOfRange {
            kind,
            index,
            len: self.len(kind),
        }
    }

    /// Create the group of `kind` and its layout slots if missing.
    fn ensure_group(&mut self, kind: NodeKind) -> Result<&mut NodeGroup, GraphError> {
        if !kind.is_group() {
            return Err(GraphError::NotAGroup(kind));
        }
        if kind.count_tag().is_some() && !self.layout.contains(&Slot::Count(kind)) {
            let at = self
                .layout
                .iter()
                .position(|s| matches!(s, Slot::Count(k) if *k > kind))
                .or_else(|| {
                    self.layout
                        .iter()
                        .rposition(|s| matches!(s, Slot::Count(_)))
                        .map(|i| i + 1)
                })
                .or_else(|| {
                    self.layout
                        .iter()
                        .position(|s| matches!(s, Slot::Members(_) | Slot::ExportRoot))
                })
                .unwrap_or(self.layout.len());
            self.layout.insert(at, Slot::Count(kind));
        }
        if !self.layout.contains(&Slot::Members(kind)) {
            let at = self
                .layout
                .iter()
                .position(|s| matches!(s, Slot::Members(k) if *k > kind))
                .or_else(|| {
                    self.layout
                        .iter()
                        .position(|s| matches!(s, Slot::ExportRoot))
                })
                .unwrap_or(self.layout.len());
            self.layout.insert(at, Slot::Members(kind));
        }
        Ok(self
            .groups
            .entry(kind)
            .or_insert_with(|| NodeGroup::new(kind)))
    }

    /// Append a node to the group of its kind.
    pub fn push_node(&mut self, node: Node) -> Result<NodeRef, GraphError> {
        let kind = node.kind;
        let group = self.ensure_group(kind)?;
        group.nodes.push(node);
        Ok(NodeRef::new(kind, group.len() - 1))
    }

    /// Insert a node at `index`, shifting later members and every reference
    /// to them up by one.
    pub fn insert_node(&mut self, index: usize, node: Node) -> Result<NodeRef, GraphError> {
        let kind = node.kind;
        let len = self.len(kind);
        if index > len {
            return Err(self.out_of_range(kind, index));
        }
        self.ensure_group(kind)?.nodes.insert(index, node);
        self.remap_references(kind, |i| Some(if i >= index { i + 1 } else { i }));
        Ok(NodeRef::new(kind, index))
    }

    /// Remove a node.
    ///
    /// References to later members are decremented. References to the
    /// removed node are cleared and their owners marked [`VerifyStatus::Issue`].
    pub fn remove_node(&mut self, at: NodeRef) -> Result<Removed, GraphError> {
        if at.index >= self.len(at.kind) {
            return Err(self.out_of_range(at.kind, at.index));
        }
        let Some(node) = self
            .groups
            .get_mut(&at.kind)
            .map(|group| group.nodes.remove(at.index))
        else {
            return Err(self.out_of_range(at.kind, at.index));
        };
        let removed = at.index;
        let cleared = self.remap_references(at.kind, |i| match i.cmp(&removed) {
            std::cmp::Ordering::Less => Some(i),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(i - 1),
        });
        log::debug!("removed {at}; cleared {} reference owner(s)", cleared.len());
        Ok(Removed { node, cleared })
    }

    /// Move a member from `from` to `to`, keeping every reference on the
    /// node it pointed at.
    pub fn move_node(&mut self, kind: NodeKind, from: usize, to: usize) -> Result<(), GraphError> {
        let len = self.len(kind);
        if from >= len {
            return Err(self.out_of_range(kind, from));
        }
        if to >= len {
            return Err(self.out_of_range(kind, to));
        }
        if from == to {
            return Ok(());
        }
        if let Some(group) = self.groups.get_mut(&kind) {
            let node = group.nodes.remove(from);
            group.nodes.insert(to, node);
        }
        self.remap_references(kind, |i| {
            Some(if i == from {
                to
            } else if from < to && i > from && i <= to {
                i - 1
            } else if to < from && i >= to && i < from {
                i + 1
            } else {
                i
            })
        });
        Ok(())
    }

    /// Rewrite every reference into the group of `kind` through `map`.
    ///
    /// `map` returns `None` for indices that no longer exist; such references
    /// are cleared and their owners marked [`VerifyStatus::Issue`]. Returns
    /// the owners that lost a reference.
    fn remap_references(&mut self, kind: NodeKind, map: impl Fn(usize) -> Option<usize>) -> Vec<NodeRef> {
        let mut cleared = Vec::new();
        for (group_kind, group) in self.groups.iter_mut() {
            for (i, node) in group.nodes.iter_mut().enumerate() {
                let mut lost = false;
                node.visit_references_mut(&mut |_, r| {
                    if r.target != kind {
                        return;
                    }
                    if let Some(old) = r.index {
                        r.index = map(old);
                        lost |= r.index.is_none();
                    }
                });
                if lost {
                    node.status = VerifyStatus::Issue;
                    cleared.push(NodeRef::new(*group_kind, i));
                }
            }
        }
        if let Some(root) = self.export_root {
            if root.kind == kind {
                self.export_root = map(root.index).map(|index| NodeRef::new(kind, index));
            }
        }
        cleared
    }

    pub fn set_attribute(&mut self, at: NodeRef, name: &str, value: Value) -> Result<(), GraphError> {
        let missing = self.out_of_range(at.kind, at.index);
        match self.node_mut(at) {
            Some(node) => node.set_attribute(name, value),
            None => Err(missing),
        }
    }

    pub fn set_reference(
        &mut self,
        at: NodeRef,
        name: &str,
        index: Option<usize>,
    ) -> Result<(), GraphError> {
        let missing = self.out_of_range(at.kind, at.index);
        match self.node_mut(at) {
            Some(node) => node.set_reference(name, index),
            None => Err(missing),
        }
    }

    /// Every slot in the graph pointing at `target`.
    pub fn references_to(&self, target: NodeRef) -> Vec<IncomingReference> {
        let mut found = Vec::new();
        for (kind, group) in &self.groups {
            for (i, node) in group.nodes.iter().enumerate() {
                node.visit_references(&mut |slot, r| {
                    if r.target == target.kind && r.index == Some(target.index) {
                        found.push(IncomingReference {
                            owner: NodeRef::new(*kind, i),
                            slot: slot.to_string(),
                        });
                    }
                });
            }
        }
        found
    }

    /// References whose index is past the end of their target group.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut found = Vec::new();
        for (kind, group) in &self.groups {
            for (i, node) in group.nodes.iter().enumerate() {
                node.visit_references(&mut |slot, r| {
                    if let Some(index) = r.index {
                        if index >= self.len(r.target) {
                            found.push(DanglingReference {
                                owner: NodeRef::new(*kind, i),
                                slot: slot.to_string(),
                                target: r.target,
                                index: index as i64,
                            });
                        }
                    }
                });
            }
        }
        found
    }

    /// Re-validate every reference.
    ///
    /// Dangling references are cleared and their owners marked
    /// [`VerifyStatus::Issue`]; every other decoded node becomes
    /// [`VerifyStatus::Ok`]. Raw-preserved nodes have the references found in
    /// their payload checked too, but otherwise keep their status.
    pub fn verify(&mut self) -> Vec<DanglingReference> {
        let sizes: BTreeMap<NodeKind, usize> =
            self.groups.iter().map(|(k, g)| (*k, g.len())).collect();
        let mut found = Vec::new();
        for (kind, group) in self.groups.iter_mut() {
            for (i, node) in group.nodes.iter_mut().enumerate() {
                let owner = NodeRef::new(*kind, i);
                let mut bad = false;
                node.visit_references_mut(&mut |slot, r| {
                    let Some(index) = r.index else { return };
                    if index >= sizes.get(&r.target).copied().unwrap_or(0) {
                        found.push(DanglingReference {
                            owner,
                            slot: slot.to_string(),
                            target: r.target,
                            index: index as i64,
                        });
                        r.index = None;
                        bad = true;
                    }
                });
                if bad {
                    node.status = VerifyStatus::Issue;
                } else if !node.is_raw() {
                    node.status = VerifyStatus::Ok;
                }
            }
        }
        for d in &found {
            log::warn!("cleared dangling reference: {d}");
        }
        found
    }

    /// Identifier used by workspace metadata: group tag name plus index
    /// (`Emit0`). Opaque groups put a `:` between the two (`Tex1:0`), since
    /// their tag names may end in digits.
    pub fn workspace_id(&self, at: NodeRef) -> Option<String> {
        self.node(at)?;
        let name = at.kind.group_tag()?.name();
        if at.kind.is_opaque() {
            Some(format!("{name}:{}", at.index))
        } else {
            Some(format!("{name}{}", at.index))
        }
    }

    pub fn resolve_workspace_id(&self, id: &str) -> Option<NodeRef> {
        let (kind, index) = match id.rsplit_once(':') {
            Some((name, index)) => {
                let kind = NodeKind::Opaque(Tag::from_name(name)?);
                (kind, index)
            }
            None => GROUP_KINDS.into_iter().find_map(|kind| {
                let index = id.strip_prefix(kind.group_tag()?.name().as_str())?;
                Some((kind, index))
            })?,
        };
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index: usize = index.parse().ok()?;
        (index < self.len(kind)).then_some(NodeRef::new(kind, index))
    }

    /// Ask `sink` to preview every texture path. Returns how many were sent.
    pub fn request_previews(&self, sink: &mut dyn PreviewSink) -> usize {
        let Some(textures) = self.groups.get(&NodeKind::Texture) else {
            return 0;
        };
        let mut sent = 0;
        for path in textures
            .nodes
            .iter()
            .filter_map(|n| n.attribute("Path").and_then(Value::as_str))
            .filter(|p| !p.is_empty())
        {
            sink.request_preview(path);
            sent += 1;
        }
        sent
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
