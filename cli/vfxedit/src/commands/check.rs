//! `vfxedit check`: load and re-save a file without changing it.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use vfx_avfx::{content_hash, hash_hex, load, save};

pub fn run(file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let loaded = load(&bytes).with_context(|| format!("parsing {}", file.display()))?;
    super::print_issues(&loaded);

    let saved = save(&loaded.graph).with_context(|| format!("re-encoding {}", file.display()))?;
    if saved == bytes {
        println!("{}: identical ({} bytes, sha256 {})", file.display(), bytes.len(), hash_hex(&content_hash(&bytes)));
        Ok(())
    } else {
        let first = bytes
            .iter()
            .zip(&saved)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| bytes.len().min(saved.len()));
        bail!(
            "{}: re-saved bytes differ at offset {first:#x} ({} bytes read, {} written)",
            file.display(),
            bytes.len(),
            saved.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfx_chunk::{encode_chunk, Tag};
    use vfx_core::Graph;

    #[test]
    fn canonical_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.avfx");
        fs::write(&path, save(&Graph::new()).unwrap()).unwrap();
        run(&path).unwrap();
    }

    #[test]
    fn stale_count_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.avfx");
        let payload = encode_chunk(Tag::new(b"TxCn"), &3u32.to_le_bytes());
        fs::write(&path, encode_chunk(Tag::new(b"AVFX"), &payload)).unwrap();
        let err = run(&path).unwrap_err();
        assert!(format!("{err:#}").contains("differ"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = run(Path::new("/nonexistent/file.avfx")).unwrap_err();
        assert!(format!("{err:#}").contains("reading /nonexistent/file.avfx"));
    }
}
