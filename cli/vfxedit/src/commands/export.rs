//! `vfxedit export`: write a node and its dependencies to a sub-file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use vfx_avfx::{closure, export_subtree, ExportMode};

use super::{node_ref, print_issues, read_graph};

pub fn run(file: &Path, kind: &str, index: usize, output: &Path, mode: ExportMode) -> Result<()> {
    let loaded = read_graph(file)?;
    print_issues(&loaded);
    let root = node_ref(&loaded.graph, kind, index)?;

    let bytes = export_subtree(&loaded.graph, root, mode)
        .with_context(|| format!("exporting {root}"))?;
    fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;

    let count = match mode {
        ExportMode::WithDependencies => closure(&loaded.graph, root)?.len(),
        ExportMode::NodeOnly => 1,
    };
    println!(
        "exported {root} ({count} node(s), {} bytes) to {}",
        bytes.len(),
        output.display()
    );
    Ok(())
}
