//! vfxedit: inspect and edit VFX graph and timeline files.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use vfx_avfx::ImportPolicy;

use config::VfxConfig;

#[derive(Parser)]
#[command(name = "vfxedit", version, about = "Inspect and edit VFX graph files")]
struct Cli {
    /// Log decode decisions (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show groups, node statuses, and parse issues
    Inspect {
        file: PathBuf,
        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },
    /// Load and re-save a file, reporting whether the bytes survive
    Check { file: PathBuf },
    /// Delete a node, remapping every reference into its group
    Remove {
        file: PathBuf,
        /// Group name (emitter, particle, texture, ...)
        kind: String,
        index: usize,
        /// Output path (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a node (and what it references) to a sub-file
    Export {
        file: PathBuf,
        kind: String,
        index: usize,
        #[arg(short, long)]
        output: PathBuf,
        /// Export only the node, leaving its references outside
        #[arg(long)]
        node_only: bool,
    },
    /// Append a sub-file's nodes to a host file
    Import {
        host: PathBuf,
        sub: PathBuf,
        /// Output path (default: overwrite the host)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Collision policy (append, deduplicate)
        #[arg(long)]
        policy: Option<ImportPolicy>,
    },
    /// Set a node's display name in the workspace metadata
    Rename {
        file: PathBuf,
        kind: String,
        index: usize,
        name: String,
    },
    /// List timeline entries
    Timeline {
        file: PathBuf,
        /// Re-encode and report whether the bytes survive
        #[arg(long)]
        check: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Inspect { file, json } => {
            let (config, config_dir) = load_config(&cwd)?;
            let meta = config.meta_path(config_dir.as_deref(), &file);
            commands::inspect::run(&file, Some(&meta), json)
        }

        Commands::Check { file } => commands::check::run(&file),

        Commands::Remove {
            file,
            kind,
            index,
            output,
        } => commands::remove::run(&file, &kind, index, output.as_deref()),

        Commands::Export {
            file,
            kind,
            index,
            output,
            node_only,
        } => {
            let (config, _) = load_config(&cwd)?;
            let mode = if node_only {
                vfx_avfx::ExportMode::NodeOnly
            } else {
                config.export_mode()
            };
            commands::export::run(&file, &kind, index, &output, mode)
        }

        Commands::Import {
            host,
            sub,
            output,
            policy,
        } => {
            let (config, _) = load_config(&cwd)?;
            let policy = policy.unwrap_or_else(|| config.import_policy());
            commands::import::run(&host, &sub, output.as_deref(), policy)
        }

        Commands::Rename {
            file,
            kind,
            index,
            name,
        } => {
            let (config, config_dir) = load_config(&cwd)?;
            let meta = config.meta_path(config_dir.as_deref(), &file);
            commands::rename::run(&file, &meta, &kind, index, &name)
        }

        Commands::Timeline { file, check } => commands::timeline::run(&file, check),
    }
}

/// Load `vfxedit.toml` from the current directory upward, falling back to
/// defaults when there is none.
fn load_config(cwd: &Path) -> anyhow::Result<(VfxConfig, Option<PathBuf>)> {
    match VfxConfig::find_and_load(cwd)? {
        Some((config, dir)) => Ok((config, Some(dir))),
        None => Ok((VfxConfig::default(), None)),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::fs;

    use vfx_core::{Graph, Node, NodeKind, NodeRef, Value};

    fn write_sample(path: &Path) {
        let mut graph = Graph::new();
        let mut texture = Node::create_default(NodeKind::Texture);
        texture
            .set_attribute("Path", Value::Str("fx/spark.atex".into()))
            .unwrap();
        graph.push_node(texture).unwrap();

        let mut particle = Node::create_default(NodeKind::Particle);
        let slot = particle.slot_mut("TextureColor1").unwrap();
        slot.assign();
        slot.set_reference("Texture", Some(0)).unwrap();
        graph.push_node(particle).unwrap();

        fs::write(path, vfx_avfx::save(&graph).unwrap()).unwrap();
    }

    /// Full workflow: check, export, import, remove, rename.
    #[test]
    fn export_import_remove_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let host = dir.path().join("host.avfx");
        let sub = dir.path().join("particle.vfxsub");
        let merged = dir.path().join("merged.avfx");
        write_sample(&host);

        commands::check::run(&host).unwrap();
        commands::export::run(
            &host,
            "particle",
            0,
            &sub,
            vfx_avfx::ExportMode::WithDependencies,
        )
        .unwrap();
        commands::import::run(&host, &sub, Some(&merged), ImportPolicy::AlwaysAppend).unwrap();

        let graph = vfx_avfx::load(&fs::read(&merged).unwrap()).unwrap().graph;
        assert_eq!(graph.len(NodeKind::Particle), 2);
        assert_eq!(graph.len(NodeKind::Texture), 2);

        commands::remove::run(&merged, "texture", 0, None).unwrap();
        let graph = vfx_avfx::load(&fs::read(&merged).unwrap()).unwrap().graph;
        assert_eq!(graph.len(NodeKind::Texture), 1);
        let first = graph.node(NodeRef::new(NodeKind::Particle, 0)).unwrap();
        let slot = first.attribute("TextureColor1").unwrap().as_node().unwrap();
        assert_eq!(slot.reference("Texture").unwrap().index, None);

        let meta = dir.path().join("workspace.json");
        commands::rename::run(&merged, &meta, "particle", 1, "Sparks").unwrap();
        commands::inspect::run(&merged, Some(&meta), true).unwrap();
        assert!(fs::read_to_string(&meta).unwrap().contains("Sparks"));
    }

    #[test]
    fn config_is_found_from_a_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("vfxedit.toml"),
            "[import]\npolicy = \"deduplicate\"\n",
        )
        .unwrap();
        let nested = dir.path().join("effects/weapons");
        fs::create_dir_all(&nested).unwrap();

        let (config, found) = load_config(&nested).unwrap();
        assert_eq!(found.as_deref(), Some(dir.path()));
        assert_eq!(config.import_policy(), ImportPolicy::Deduplicate);
    }
}
