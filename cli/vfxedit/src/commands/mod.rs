//! CLI command implementations.

pub mod check;
pub mod export;
pub mod import;
pub mod inspect;
pub mod remove;
pub mod rename;
pub mod timeline;

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use vfx_avfx::{load, save, Loaded};
use vfx_core::{Graph, NodeKind, NodeRef};

/// Read and decode a graph file.
pub fn read_graph(path: &Path) -> Result<Loaded> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    load(&bytes).with_context(|| format!("parsing {}", path.display()))
}

/// Encode `graph` and write it to `path`.
pub fn write_graph(path: &Path, graph: &Graph) -> Result<()> {
    let bytes = save(graph).with_context(|| format!("encoding {}", path.display()))?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Resolve a `<kind> <index>` pair given on the command line.
pub fn node_ref(graph: &Graph, kind: &str, index: usize) -> Result<NodeRef> {
    let kind = NodeKind::from_name(kind).ok_or_else(|| {
        anyhow!("unknown group {kind:?} (expected scheduler, timeline, emitter, particle, effector, binder, texture, or model)")
    })?;
    let at = NodeRef::new(kind, index);
    if graph.node(at).is_none() {
        anyhow::bail!("{at} does not exist ({} has {})", kind, graph.len(kind));
    }
    Ok(at)
}

/// Print parse findings to stderr.
pub fn print_issues(loaded: &Loaded) {
    for issue in &loaded.report.issues {
        eprintln!("warning: {issue}");
    }
}
