//! `vfxedit timeline`: list timeline entries or check a round trip.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use vfx_tmb::{decode, encode};

pub fn run(file: &Path, check: bool) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let (timeline, report) = decode(&bytes).with_context(|| format!("parsing {}", file.display()))?;
    for issue in &report.issues {
        eprintln!("warning: {issue}");
    }

    if check {
        let encoded = encode(&timeline);
        if encoded != bytes {
            bail!(
                "{}: re-encoded timeline differs ({} bytes read, {} written)",
                file.display(),
                bytes.len(),
                encoded.len()
            );
        }
        println!("{}: identical ({} entries)", file.display(), timeline.entries.len());
        return Ok(());
    }

    println!("{} ({} entries)", file.display(), timeline.entries.len());
    for entry in &timeline.entries {
        println!("  [{:>4}] t={:<5} {}", entry.id, entry.time, entry.body);
    }
    Ok(())
}
