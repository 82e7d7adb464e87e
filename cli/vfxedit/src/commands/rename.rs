//! `vfxedit rename`: set a display name in the workspace metadata.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use vfx_core::WorkspaceMeta;

use super::{node_ref, read_graph};

pub fn run(file: &Path, meta: &Path, kind: &str, index: usize, name: &str) -> Result<()> {
    let loaded = read_graph(file)?;
    let at = node_ref(&loaded.graph, kind, index)?;

    let mut names = if meta.is_file() {
        let json = fs::read_to_string(meta).with_context(|| format!("reading {}", meta.display()))?;
        WorkspaceMeta::from_json(&json).with_context(|| format!("parsing {}", meta.display()))?
    } else {
        WorkspaceMeta::collect(&loaded.graph)
    };

    let id = names
        .rename(&loaded.graph, at, name)
        .with_context(|| format!("{at} has no workspace id"))?;
    let json = names.to_json()?;
    fs::write(meta, json).with_context(|| format!("writing {}", meta.display()))?;
    println!("{id} is now {name:?} ({})", meta.display());
    Ok(())
}
