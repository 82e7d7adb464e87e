//! `vfxedit remove`: delete a node and remap references into its group.

use std::path::Path;

use anyhow::Result;

use super::{node_ref, print_issues, read_graph, write_graph};

pub fn run(file: &Path, kind: &str, index: usize, output: Option<&Path>) -> Result<()> {
    let mut loaded = read_graph(file)?;
    print_issues(&loaded);
    let at = node_ref(&loaded.graph, kind, index)?;

    let removed = loaded.graph.remove_node(at)?;
    println!("removed {at}");
    for owner in &removed.cleared {
        println!("  cleared reference from {owner}");
    }

    let out = output.unwrap_or(file);
    write_graph(out, &loaded.graph)?;
    println!("wrote {}", out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use vfx_core::{Graph, Node, NodeKind, NodeRef};

    #[test]
    fn remove_shifts_later_references() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fx.avfx");
        let out = dir.path().join("out.avfx");

        let mut graph = Graph::new();
        for _ in 0..2 {
            graph.push_node(Node::create_default(NodeKind::Model)).unwrap();
        }
        let mut particle = Node::create_default(NodeKind::Particle);
        particle.set_reference("Model", Some(1)).unwrap();
        graph.push_node(particle).unwrap();
        fs::write(&path, vfx_avfx::save(&graph).unwrap()).unwrap();

        run(&path, "model", 0, Some(&out)).unwrap();
        let graph = vfx_avfx::load(&fs::read(&out).unwrap()).unwrap().graph;
        assert_eq!(graph.len(NodeKind::Model), 1);
        let particle = graph.node(NodeRef::new(NodeKind::Particle, 0)).unwrap();
        assert_eq!(particle.reference("Model").unwrap().index, Some(0));
    }

    #[test]
    fn unknown_group_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fx.avfx");
        fs::write(&path, vfx_avfx::save(&Graph::new()).unwrap()).unwrap();
        let err = run(&path, "sparkle", 0, None).unwrap_err();
        assert!(err.to_string().contains("unknown group"));
        let err = run(&path, "texture", 3, None).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
