//! `vfxedit.toml` parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use vfx_avfx::{ExportMode, ImportPolicy};

pub const CONFIG_FILE: &str = "vfxedit.toml";

/// The top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VfxConfig {
    #[serde(default)]
    pub import: Option<ImportConfig>,
    #[serde(default)]
    pub export: Option<ExportConfig>,
    #[serde(default)]
    pub workspace: Option<WorkspaceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub policy: ImportPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub mode: ExportMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Rename sidecar, relative to the directory holding `vfxedit.toml`.
    pub meta: PathBuf,
}

impl VfxConfig {
    /// Search upward from `start_dir` for `vfxedit.toml`, returning it with
    /// the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let config: VfxConfig = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                log::debug!("using {}", candidate.display());
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing vfxedit.toml")
    }

    pub fn import_policy(&self) -> ImportPolicy {
        self.import.as_ref().map(|i| i.policy).unwrap_or_default()
    }

    pub fn export_mode(&self) -> ExportMode {
        self.export.as_ref().map(|e| e.mode).unwrap_or_default()
    }

    /// Where workspace metadata for `file` lives: the configured sidecar, or
    /// `workspace.json` beside the file.
    pub fn meta_path(&self, config_dir: Option<&Path>, file: &Path) -> PathBuf {
        match (&self.workspace, config_dir) {
            (Some(ws), Some(dir)) => dir.join(&ws.meta),
            (Some(ws), None) => ws.meta.clone(),
            (None, _) => file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("workspace.json"),
        }
    }
}
