//! `vfxedit import`: append a sub-file to a host file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use vfx_avfx::{import_subtree, ImportPolicy};

use super::{print_issues, read_graph, write_graph};

pub fn run(host: &Path, sub: &Path, output: Option<&Path>, policy: ImportPolicy) -> Result<()> {
    let mut loaded = read_graph(host)?;
    print_issues(&loaded);
    let bytes = fs::read(sub).with_context(|| format!("reading {}", sub.display()))?;

    let outcome = import_subtree(&mut loaded.graph, &bytes, policy)
        .with_context(|| format!("importing {}", sub.display()))?;
    println!(
        "imported {} as {} ({} appended, {} reused, policy {policy})",
        sub.display(),
        outcome.root,
        outcome.appended.len(),
        outcome.reused.len()
    );
    if outcome.has_dependencies {
        println!("  {} reference(s) pointed outside the sub-file and were cleared:", outcome.unresolved.len());
        for dangling in &outcome.unresolved {
            println!("    {dangling}");
        }
    }

    let out = output.unwrap_or(host);
    write_graph(out, &loaded.graph)?;
    println!("wrote {}", out.display());
    Ok(())
}
