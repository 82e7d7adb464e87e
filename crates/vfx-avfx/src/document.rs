//! An open graph shared between editor panes.

use std::ptr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vfx_core::{Graph, NodeRef};

use crate::parse::{load, LoadError, ParseReport};
use crate::serialize::{save, SaveError};
use crate::transfer::{export_subtree, import_subtree, ExportMode, ImportOutcome, ImportPolicy, TransferError};

/// A graph behind a reader/writer lock.
#[derive(Debug, Default)]
pub struct Document {
    graph: RwLock<Graph>,
}

impl Document {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: RwLock::new(graph),
        }
    }

    /// Decode `bytes` into a new document.
    pub fn load(bytes: &[u8]) -> Result<(Self, ParseReport), LoadError> {
        let loaded = load(bytes)?;
        Ok((Self::new(loaded.graph), loaded.report))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Graph> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Graph> {
        self.graph.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn save(&self) -> Result<Vec<u8>, SaveError> {
        save(&self.read())
    }

    pub fn into_inner(self) -> Graph {
        self.graph.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Copy `root` (and its dependencies, per `mode`) from one document into
/// another, or within a single document.
///
/// Both locks are held for the whole copy. When the two documents differ,
/// they are taken in address order so opposite copies cannot deadlock.
pub fn copy_subtree(
    source: &Document,
    root: NodeRef,
    target: &Document,
    mode: ExportMode,
    policy: ImportPolicy,
) -> Result<ImportOutcome, TransferError> {
    if ptr::eq(source, target) {
        let mut graph = source.write();
        let bytes = export_subtree(&graph, root, mode)?;
        return import_subtree(&mut graph, &bytes, policy);
    }

    let source_first = (source as *const Document) < (target as *const Document);
    let (source_guard, mut target_guard) = if source_first {
        let s = source.read();
        (s, target.write())
    } else {
        let t = target.write();
        (source.read(), t)
    };
    let bytes = export_subtree(&source_guard, root, mode)?;
    import_subtree(&mut target_guard, &bytes, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use vfx_core::{Node, NodeKind, Value};

    fn with_texture(path: &str) -> Document {
        let mut graph = Graph::new();
        let mut node = Node::create_default(NodeKind::Texture);
        node.set_attribute("Path", Value::Str(path.into())).unwrap();
        graph.push_node(node).unwrap();
        Document::new(graph)
    }

    #[test]
    fn copies_between_documents() {
        let a = with_texture("a.atex");
        let b = with_texture("b.atex");
        let outcome = copy_subtree(
            &a,
            NodeRef::new(NodeKind::Texture, 0),
            &b,
            ExportMode::WithDependencies,
            ImportPolicy::AlwaysAppend,
        )
        .unwrap();
        assert_eq!(outcome.root, NodeRef::new(NodeKind::Texture, 1));
        assert_eq!(a.read().len(NodeKind::Texture), 1);
        assert_eq!(b.read().len(NodeKind::Texture), 2);
    }

    #[test]
    fn copies_within_one_document() {
        let doc = with_texture("a.atex");
        let outcome = copy_subtree(
            &doc,
            NodeRef::new(NodeKind::Texture, 0),
            &doc,
            ExportMode::WithDependencies,
            ImportPolicy::AlwaysAppend,
        )
        .unwrap();
        assert_eq!(outcome.root, NodeRef::new(NodeKind::Texture, 1));
        assert_eq!(doc.read().len(NodeKind::Texture), 2);
    }

    #[test]
    fn opposite_copies_do_not_deadlock() {
        let a = Arc::new(with_texture("a.atex"));
        let b = Arc::new(with_texture("b.atex"));
        let handles: Vec<_> = [(a.clone(), b.clone()), (b.clone(), a.clone())]
            .into_iter()
            .map(|(from, to)| {
                thread::spawn(move || {
                    for _ in 0..20 {
                        copy_subtree(
                            &from,
                            NodeRef::new(NodeKind::Texture, 0),
                            &to,
                            ExportMode::NodeOnly,
                            ImportPolicy::AlwaysAppend,
                        )
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(a.read().len(NodeKind::Texture), 21);
        assert_eq!(b.read().len(NodeKind::Texture), 21);
    }

    #[test]
    fn load_and_save_round_trip() {
        let doc = with_texture("a.atex");
        let bytes = doc.save().unwrap();
        let (reopened, report) = Document::load(&bytes).unwrap();
        assert!(report.is_clean());
        assert_eq!(reopened.save().unwrap(), bytes);
        assert_eq!(reopened.into_inner().node_count(), 1);
    }
}
