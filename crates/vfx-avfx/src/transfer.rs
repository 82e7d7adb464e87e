//! Dependency-aware export and import of sub-graphs.
//!
//! A sub-file is an ordinary VFX graph file holding one node (the export
//! root, recorded in an `ExRt` chunk) plus, optionally, every node it reaches
//! through references. References inside a sub-file are local to it; any
//! reference that does not resolve there is a dependency left outside.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vfx_core::schema;
use vfx_core::{DanglingReference, Graph, GraphError, Node, NodeKind, NodeRef, Slot, VerifyStatus};

use crate::fingerprint::{node_fingerprint, ContentHash};
use crate::parse::{load, LoadError};
use crate::serialize::encode_graph;

/// Errors that can occur during export or import.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0} does not exist")]
    MissingNode(NodeRef),

    #[error("sub-file holds no nodes")]
    EmptySubFile,

    #[error("cannot read sub-file: {0}")]
    Load(#[from] LoadError),

    #[error("graph edit failed: {0}")]
    Graph(#[from] GraphError),
}

/// What [`export_subtree`] packs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    /// The node and everything it reaches.
    #[default]
    WithDependencies,
    /// Only the node; its references keep pointing outside the sub-file.
    NodeOnly,
}

/// How [`import_subtree`] treats nodes the host may already have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportPolicy {
    /// Every imported node is appended.
    #[default]
    #[serde(rename = "append")]
    AlwaysAppend,
    /// Nodes without reference slots reuse a host node with identical
    /// content instead of being appended.
    #[serde(rename = "deduplicate")]
    Deduplicate,
}

impl FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "with-dependencies" => Ok(ExportMode::WithDependencies),
            "node-only" => Ok(ExportMode::NodeOnly),
            other => Err(format!(
                "unknown export mode {other:?} (expected with-dependencies or node-only)"
            )),
        }
    }
}

impl FromStr for ImportPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(ImportPolicy::AlwaysAppend),
            "deduplicate" => Ok(ImportPolicy::Deduplicate),
            other => Err(format!(
                "unknown import policy {other:?} (expected append or deduplicate)"
            )),
        }
    }
}

impl fmt::Display for ImportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportPolicy::AlwaysAppend => write!(f, "append"),
            ImportPolicy::Deduplicate => write!(f, "deduplicate"),
        }
    }
}

/// Result of [`import_subtree`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    /// Where the sub-file's export root ended up in the host.
    pub root: NodeRef,
    /// Whether the sub-file referenced nodes it did not contain.
    pub has_dependencies: bool,
    /// Host addresses of newly appended nodes, in append order.
    pub appended: Vec<NodeRef>,
    /// Host nodes reused instead of appending a duplicate.
    pub reused: Vec<NodeRef>,
    /// References that pointed outside the sub-file, with the index they had
    /// in the exporting file. They arrive cleared.
    pub unresolved: Vec<DanglingReference>,
}

/// Every node reachable from `root` through references, `root` first, in
/// breadth-first order following fields in file order. Dangling references
/// are not followed.
pub fn closure(graph: &Graph, root: NodeRef) -> Result<Vec<NodeRef>, TransferError> {
    if graph.node(root).is_none() {
        return Err(TransferError::MissingNode(root));
    }
    let mut order = Vec::new();
    let mut visited = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);

    while let Some(at) = queue.pop_front() {
        order.push(at);
        let Some(node) = graph.node(at) else {
            continue;
        };
        node.visit_references(&mut |_, r| {
            let Some(index) = r.index else { return };
            let next = NodeRef::new(r.target, index);
            if graph.node(next).is_some() && visited.insert(next) {
                queue.push_back(next);
            }
        });
    }
    Ok(order)
}

/// Pack `root` (and, with [`ExportMode::WithDependencies`], its closure) into
/// a standalone sub-file.
///
/// A reference to a node left outside is written as its source index plus
/// the size of its target group in the sub-file, so it never resolves to a
/// packed node.
pub fn export_subtree(graph: &Graph, root: NodeRef, mode: ExportMode) -> Result<Vec<u8>, TransferError> {
    let members = match mode {
        ExportMode::WithDependencies => closure(graph, root)?,
        ExportMode::NodeOnly => match graph.node(root) {
            Some(_) => vec![root],
            None => return Err(TransferError::MissingNode(root)),
        },
    };

    // Local indices per group, in closure order.
    let mut local: BTreeMap<NodeRef, usize> = BTreeMap::new();
    let mut next: BTreeMap<NodeKind, usize> = BTreeMap::new();
    for at in &members {
        let n = next.entry(at.kind).or_insert(0);
        local.insert(*at, *n);
        *n += 1;
    }

    let mut sub = Graph::new();
    for slot in graph.layout() {
        if let Slot::Field(field) = slot {
            if let Some(spec) = schema::field_by_tag(schema::root_fields(), field.tag) {
                sub.set_header_attribute(spec.name, field.value.clone())?;
            }
        }
    }

    for at in &members {
        let Some(node) = graph.node(*at) else {
            continue;
        };
        let mut copy = detached(node);
        copy.visit_references_mut(&mut |_, r| {
            let Some(index) = r.index else { return };
            r.index = Some(match local.get(&NodeRef::new(r.target, index)) {
                Some(&mapped) => mapped,
                None => next.get(&r.target).copied().unwrap_or(0) + index,
            });
        });
        sub.push_node(copy)?;
    }
    if sub.has_raw_nodes() {
        sub.set_source_strings(graph.source_strings().map(<[u8]>::to_vec));
    }
    let local_root = local.get(&root).copied().ok_or(TransferError::MissingNode(root))?;
    sub.set_export_root(Some(NodeRef::new(root.kind, local_root)));

    log::debug!(
        "exported {root} with {} node(s) ({mode:?})",
        members.len()
    );
    Ok(encode_graph(&sub))
}

/// Append the nodes of a sub-file to `host`, remapping their references to
/// host indices.
///
/// Nodes are appended group by group in canonical kind order, each group in
/// sub-file order. References the sub-file could not resolve arrive cleared
/// and set `has_dependencies` on the imported root. A host without a string
/// table of its own adopts the sub-file's when raw-preserved nodes arrive.
pub fn import_subtree(host: &mut Graph, bytes: &[u8], policy: ImportPolicy) -> Result<ImportOutcome, TransferError> {
    let loaded = load(bytes)?;
    let sub = loaded.graph;
    let unresolved: Vec<DanglingReference> = loaded
        .report
        .dangling()
        .map(|d| outside_reference(&sub, d))
        .collect();
    let has_dependencies = !unresolved.is_empty();

    let root = match sub.export_root() {
        Some(root) => root,
        None => sub
            .node_refs()
            .into_iter()
            .next()
            .ok_or(TransferError::EmptySubFile)?,
    };

    let mut map: HashMap<NodeRef, NodeRef> = HashMap::new();
    let mut appended = Vec::new();
    let mut reused = Vec::new();
    let mut host_prints: HashMap<NodeKind, Vec<ContentHash>> = HashMap::new();

    for at in sub.node_refs() {
        let Some(node) = sub.node(at) else {
            continue;
        };
        if policy == ImportPolicy::Deduplicate && !node.has_reference_slots() {
            let prints = host_prints.entry(at.kind).or_insert_with(|| {
                host.group(at.kind)
                    .map(|g| g.nodes().iter().map(node_fingerprint).collect())
                    .unwrap_or_default()
            });
            let print = node_fingerprint(node);
            if let Some(index) = prints.iter().position(|p| *p == print) {
                let existing = NodeRef::new(at.kind, index);
                map.insert(at, existing);
                reused.push(existing);
                continue;
            }
        }
        let placed = host.push_node(detached(node))?;
        map.insert(at, placed);
        appended.push(placed);
    }

    let raw = appended
        .iter()
        .filter(|at| host.node(**at).is_some_and(Node::is_raw))
        .count();
    if raw > 0 {
        match (host.source_strings(), sub.source_strings()) {
            (None, Some(bytes)) => host.set_source_strings(Some(bytes.to_vec())),
            (Some(ours), Some(theirs)) if ours != theirs => log::warn!(
                "{raw} raw node(s) imported; string offsets inside them refer to the sub-file's table"
            ),
            _ => {}
        }
    }

    for placed in &appended {
        let Some(node) = host.node_mut(*placed) else {
            continue;
        };
        node.visit_references_mut(&mut |_, r| {
            if let Some(index) = r.index {
                r.index = map
                    .get(&NodeRef::new(r.target, index))
                    .map(|host_ref| host_ref.index);
            }
        });
    }

    let root = map.get(&root).copied().ok_or(TransferError::MissingNode(root))?;
    if has_dependencies {
        if let Some(node) = host.node_mut(root) {
            node.has_dependencies = true;
        }
        log::warn!(
            "imported {root} with {} reference(s) left outside the sub-file",
            unresolved.len()
        );
    }
    log::debug!(
        "import into host: {} appended, {} reused ({policy})",
        appended.len(),
        reused.len()
    );

    Ok(ImportOutcome {
        root,
        has_dependencies,
        appended,
        reused,
        unresolved,
    })
}

/// A dangling sub-file reference with its index taken back to the exporting
/// file's numbering.
fn outside_reference(sub: &Graph, dangling: &DanglingReference) -> DanglingReference {
    let len = sub.len(dangling.target) as i64;
    let index = if dangling.index >= len {
        dangling.index - len
    } else {
        dangling.index
    };
    DanglingReference {
        index,
        ..dangling.clone()
    }
}

/// A copy of `node` without its per-document state.
fn detached(node: &Node) -> Node {
    let mut copy = node.clone();
    copy.display_name = None;
    copy.has_dependencies = false;
    if copy.status == VerifyStatus::Ok {
        copy.status = VerifyStatus::Unverified;
    }
    copy
}
