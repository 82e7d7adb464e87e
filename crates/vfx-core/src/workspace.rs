//! Workspace metadata: display names kept beside a VFX file.
//!
//! Names are keyed by workspace id (`Emit0`, `Tex3`), so they follow a node
//! only as long as its index does.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, NodeRef};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl WorkspaceMeta {
    /// Gather the display names currently set on `graph`.
    pub fn collect(graph: &Graph) -> Self {
        let names = graph
            .node_refs()
            .into_iter()
            .filter_map(|at| {
                let name = graph.node(at)?.display_name.clone()?;
                Some((graph.workspace_id(at)?, name))
            })
            .collect();
        Self { names }
    }

    /// Set display names on `graph`. Returns how many ids matched a node.
    pub fn apply(&self, graph: &mut Graph) -> usize {
        let mut applied = 0;
        for (id, name) in &self.names {
            let Some(at) = graph.resolve_workspace_id(id) else {
                log::debug!("workspace id {id} matches no node");
                continue;
            };
            if let Some(node) = graph.node_mut(at) {
                node.display_name = Some(name.clone());
            }
            applied += 1;
        }
        applied
    }

    pub fn rename(&mut self, graph: &Graph, at: NodeRef, name: &str) -> Option<String> {
        let id = graph.workspace_id(at)?;
        self.names.insert(id.clone(), name.to_string());
        Some(id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::kind::NodeKind;
    use crate::graph::node::Node;

    fn graph() -> Graph {
        let mut graph = Graph::new();
        graph.push_node(Node::create_default(NodeKind::Emitter)).unwrap();
        graph.push_node(Node::create_default(NodeKind::Texture)).unwrap();
        graph.push_node(Node::create_default(NodeKind::Texture)).unwrap();
        graph
    }

    #[test]
    fn collect_then_apply_restores_names() {
        let mut source = graph();
        source
            .node_mut(NodeRef::new(NodeKind::Texture, 1))
            .unwrap()
            .display_name = Some("sparks".into());
        let meta = WorkspaceMeta::collect(&source);
        assert_eq!(meta.names.get("Tex1").map(String::as_str), Some("sparks"));

        let json = meta.to_json().unwrap();
        let back = WorkspaceMeta::from_json(&json).unwrap();
        let mut target = graph();
        assert_eq!(back.apply(&mut target), 1);
        let node = target.node(NodeRef::new(NodeKind::Texture, 1)).unwrap();
        assert_eq!(node.display_name.as_deref(), Some("sparks"));
    }

    #[test]
    fn stale_ids_are_skipped() {
        let mut meta = WorkspaceMeta::default();
        meta.names.insert("Modl4".into(), "gone".into());
        meta.names.insert("Emit0".into(), "main".into());
        let mut target = graph();
        assert_eq!(meta.apply(&mut target), 1);
    }

    #[test]
    fn rename_uses_workspace_id() {
        let source = graph();
        let mut meta = WorkspaceMeta::default();
        let id = meta
            .rename(&source, NodeRef::new(NodeKind::Emitter, 0), "burst")
            .unwrap();
        assert_eq!(id, "Emit0");
        assert!(meta
            .rename(&source, NodeRef::new(NodeKind::Model, 0), "x")
            .is_none());
        assert_eq!(WorkspaceMeta::from_json("{}").unwrap(), WorkspaceMeta::default());
    }
}
