//! `vfxedit inspect`: groups, node statuses, and parse issues.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use vfx_avfx::{content_hash, hash_hex, load, LoadError, Loaded, ParseIssue};
use vfx_core::{Graph, NodeKind, VerifyStatus, WorkspaceMeta};

#[derive(Debug, Serialize)]
struct Summary<'a> {
    file: String,
    sha256: String,
    truncated: bool,
    groups: Vec<GroupSummary>,
    previews: Vec<String>,
    issues: &'a [ParseIssue],
}

#[derive(Debug, Serialize)]
struct GroupSummary {
    kind: NodeKind,
    nodes: Vec<NodeSummary>,
}

#[derive(Debug, Serialize)]
struct NodeSummary {
    index: usize,
    id: Option<String>,
    name: Option<String>,
    status: VerifyStatus,
    assigned: bool,
    raw: bool,
    has_dependencies: bool,
}

/// Print a summary of a graph file. A truncated file is summarized from
/// what could be read.
pub fn run(file: &Path, meta: Option<&Path>, json: bool) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let (mut loaded, truncated) = match load(&bytes) {
        Ok(loaded) => (loaded, false),
        Err(LoadError::Truncated { error, partial }) => {
            eprintln!("warning: {}: {error}; showing the readable part", file.display());
            (*partial, true)
        }
        Err(e) => return Err(e).with_context(|| format!("parsing {}", file.display())),
    };

    if let Some(meta) = meta.filter(|p| p.is_file()) {
        let json = fs::read_to_string(meta).with_context(|| format!("reading {}", meta.display()))?;
        let names = WorkspaceMeta::from_json(&json).with_context(|| format!("parsing {}", meta.display()))?;
        let applied = names.apply(&mut loaded.graph);
        log::debug!("applied {applied} display name(s) from {}", meta.display());
    }

    let Loaded { graph, report } = &loaded;
    let mut previews = Vec::new();
    graph.request_previews(&mut previews);

    let summary = Summary {
        file: file.display().to_string(),
        sha256: hash_hex(&content_hash(&bytes)),
        truncated,
        groups: summarize(graph),
        previews,
        issues: &report.issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} ({} bytes)", summary.file, bytes.len());
    println!("  sha256: {}", summary.sha256);
    if let Some(root) = graph.export_root() {
        println!("  export root: {root}");
    }
    for group in &summary.groups {
        println!("  {} ({})", group.kind, group.nodes.len());
        for node in &group.nodes {
            let mut line = format!("    #{:<3} {:<10}", node.index, node.status.to_string());
            if let Some(name) = &node.name {
                line.push_str(&format!(" {name:?}"));
            }
            if !node.assigned {
                line.push_str(" unassigned");
            }
            if node.raw {
                line.push_str(" raw");
            }
            if node.has_dependencies {
                line.push_str(" has-dependencies");
            }
            println!("{line}");
        }
    }
    if !summary.previews.is_empty() {
        println!("  textures:");
        for path in &summary.previews {
            println!("    {path}");
        }
    }
    if report.is_clean() {
        println!("  no issues");
    } else {
        println!("  issues ({}):", report.issues.len());
        for issue in &report.issues {
            println!("    {issue}");
        }
    }
    Ok(())
}

fn summarize(graph: &Graph) -> Vec<GroupSummary> {
    graph
        .groups()
        .filter(|g| !g.is_empty())
        .map(|group| GroupSummary {
            kind: group.kind(),
            nodes: group
                .nodes()
                .iter()
                .enumerate()
                .map(|(index, node)| NodeSummary {
                    index,
                    id: graph.workspace_id(vfx_core::NodeRef::new(group.kind(), index)),
                    name: node.display_name.clone(),
                    status: node.status,
                    assigned: node.assigned,
                    raw: node.is_raw(),
                    has_dependencies: node.has_dependencies,
                })
                .collect(),
        })
        .collect()
}
