//! End-to-end behavior of the graph file codec and sub-graph transfer.

use vfx_avfx::{
    export_subtree, import_subtree, load, save, ExportMode, ImportPolicy, LoadError, ParseIssue,
};
use vfx_chunk::{decode_chunks, encode_chunk, Tag};
use vfx_core::{Curve, CurvePart, Graph, Node, NodeKind, NodeRef, Value, VerifyStatus};

const TEX: Tag = Tag::new(b"Tex\0");
const ITPR: Tag = Tag::new(b"ItPr");
const ITEM: Tag = Tag::new(b"ItEm");

fn texture(path: &str) -> Node {
    let mut node = Node::create_default(NodeKind::Texture);
    node.set_attribute("Path", Value::Str(path.into())).unwrap();
    node
}

fn particle_with_texture(texture: usize) -> Node {
    let mut particle = Node::create_default(NodeKind::Particle);
    let slot = particle.slot_mut("TextureColor1").unwrap();
    slot.assign();
    slot.set_reference("Texture", Some(texture)).unwrap();
    particle
}

fn emitter_with_particle(particle: usize) -> Node {
    let mut emitter = Node::create_default(NodeKind::Emitter);
    emitter.push_item(ITPR).unwrap();
    emitter
        .item_mut(ITPR, 0)
        .unwrap()
        .set_reference("Particle", Some(particle))
        .unwrap();
    emitter
}

/// Emitter 0 -> Particle 2 -> Texture 1.
fn scenario() -> Graph {
    let mut graph = Graph::new();
    graph.push_node(texture("smoke.atex")).unwrap();
    graph.push_node(texture("fire.atex")).unwrap();
    graph.push_node(Node::create_default(NodeKind::Particle)).unwrap();
    graph.push_node(particle_with_texture(0)).unwrap();
    graph.push_node(particle_with_texture(1)).unwrap();
    graph.push_node(emitter_with_particle(2)).unwrap();
    graph
}

fn emitter_target(graph: &Graph) -> Option<usize> {
    let emitter = graph.node(NodeRef::new(NodeKind::Emitter, 0)).unwrap();
    let item = emitter.items(ITPR).next().unwrap();
    item.reference("Particle").unwrap().index
}

#[test]
fn saved_files_round_trip_byte_for_byte() {
    let bytes = save(&scenario()).unwrap();
    let loaded = load(&bytes).unwrap();
    assert!(loaded.report.is_clean(), "{:?}", loaded.report);
    assert_eq!(save(&loaded.graph).unwrap(), bytes);
    assert_eq!(save(&loaded.graph).unwrap(), save(&loaded.graph).unwrap());
}

#[test]
fn link_pass_marks_every_node() {
    let loaded = load(&save(&scenario()).unwrap()).unwrap();
    for at in loaded.graph.node_refs() {
        assert_eq!(loaded.graph.node(at).unwrap().status, VerifyStatus::Ok, "{at}");
    }
}

#[test]
fn unknown_chunks_survive_a_round_trip() {
    let texture = [
        encode_chunk(Tag::new(b"Path"), &0u32.to_le_bytes()),
        encode_chunk(Tag::new(b"Zzzz"), &[1, 2, 3]),
    ]
    .concat();
    let payload = [
        encode_chunk(Tag::new(b"Strs"), b"a.atex\0"),
        encode_chunk(Tag::new(b"TxCn"), &1u32.to_le_bytes()),
        encode_chunk(TEX, &texture),
        encode_chunk(Tag::new(b"Wxyz"), &[9; 5]),
    ]
    .concat();
    let bytes = encode_chunk(Tag::new(b"AVFX"), &payload);

    let mut loaded = load(&bytes).unwrap();
    assert!(loaded
        .report
        .issues
        .iter()
        .any(|i| matches!(i, ParseIssue::UnknownField { tag, .. } if *tag == Tag::new(b"Zzzz"))));
    assert!(loaded
        .report
        .issues
        .iter()
        .any(|i| matches!(i, ParseIssue::Opaque { tag, .. } if *tag == Tag::new(b"Wxyz"))));
    assert_eq!(save(&loaded.graph).unwrap(), bytes);

    // A second texture grows the root; the unknown chunks keep their bytes.
    loaded.graph.push_node(crate::texture("b.atex")).unwrap();
    let edited = save(&loaded.graph).unwrap();
    let root = decode_chunks(&edited).into_complete().unwrap();
    let children = decode_chunks(root[0].payload).into_complete().unwrap();
    let opaque = children.iter().find(|c| c.tag == Tag::new(b"Wxyz")).unwrap();
    assert_eq!(opaque.payload, [9; 5]);
    let first = children.iter().find(|c| c.tag == TEX).unwrap();
    assert_eq!(first.payload, texture.as_slice());
}

fn effector_file(life: &[u8]) -> Vec<u8> {
    let payload = [
        encode_chunk(Tag::new(b"EfCn"), &1u32.to_le_bytes()),
        encode_chunk(Tag::new(b"Efct"), &encode_chunk(Tag::new(b"Life"), life)),
    ]
    .concat();
    encode_chunk(Tag::new(b"AVFX"), &payload)
}

fn effector_life(graph: &Graph) -> Curve {
    match graph
        .node(NodeRef::new(NodeKind::Effector, 0))
        .unwrap()
        .attribute("Life")
    {
        Some(Value::Curve(curve)) => curve.clone(),
        other => panic!("Life is {other:?}"),
    }
}

#[test]
fn empty_curve_stays_empty() {
    let bytes = effector_file(&[]);
    let loaded = load(&bytes).unwrap();
    assert!(!effector_life(&loaded.graph).has_keys());
    assert_eq!(save(&loaded.graph).unwrap(), bytes);
}

#[test]
fn curve_children_keep_file_order() {
    let life = [
        encode_chunk(Tag::new(b"Rnd\0"), &[7, 7]),
        encode_chunk(Tag::new(b"Keys"), &[0; 16]),
    ]
    .concat();
    let bytes = effector_file(&life);
    let loaded = load(&bytes).unwrap();
    let curve = effector_life(&loaded.graph);
    assert!(matches!(curve.parts[..], [CurvePart::Unknown(_), CurvePart::Keys(_)]));
    assert_eq!(curve.keys().len(), 1);
    assert_eq!(save(&loaded.graph).unwrap(), bytes);
}

#[test]
fn deleting_a_node_remaps_references() {
    let mut graph = Graph::new();
    for _ in 0..3 {
        graph.push_node(Node::create_default(NodeKind::Model)).unwrap();
    }
    for model in 0..3 {
        let mut particle = Node::create_default(NodeKind::Particle);
        particle.set_reference("Model", Some(model)).unwrap();
        graph.push_node(particle).unwrap();
    }

    let removed = graph.remove_node(NodeRef::new(NodeKind::Model, 1)).unwrap();
    assert_eq!(removed.cleared, vec![NodeRef::new(NodeKind::Particle, 1)]);

    let model = |i: usize| {
        graph
            .node(NodeRef::new(NodeKind::Particle, i))
            .unwrap()
            .reference("Model")
            .unwrap()
            .index
    };
    assert_eq!(model(0), Some(0));
    assert_eq!(model(1), None);
    assert_eq!(model(2), Some(1));
    assert_eq!(
        graph.node(NodeRef::new(NodeKind::Particle, 1)).unwrap().status,
        VerifyStatus::Issue
    );
    assert!(save(&graph).is_ok());
}

#[test]
fn deleting_the_middle_of_a_chain() {
    let mut graph = scenario();
    assert_eq!(emitter_target(&graph), Some(2));

    graph.remove_node(NodeRef::new(NodeKind::Particle, 2)).unwrap();
    assert_eq!(emitter_target(&graph), None);
    assert_eq!(
        graph.node(NodeRef::new(NodeKind::Emitter, 0)).unwrap().status,
        VerifyStatus::Issue
    );

    let reloaded = load(&save(&graph).unwrap()).unwrap().graph;
    assert_eq!(reloaded.len(NodeKind::Particle), 2);
    assert_eq!(
        reloaded
            .node(NodeRef::new(NodeKind::Texture, 1))
            .unwrap()
            .attribute("Path"),
        Some(&Value::Str("fire.atex".into()))
    );
}

#[test]
fn closure_export_reproduces_the_chain() {
    let source = scenario();
    let bytes = export_subtree(
        &source,
        NodeRef::new(NodeKind::Emitter, 0),
        ExportMode::WithDependencies,
    )
    .unwrap();

    let mut target = Graph::new();
    let outcome = import_subtree(&mut target, &bytes, ImportPolicy::AlwaysAppend).unwrap();
    assert!(!outcome.has_dependencies);
    assert_eq!(target.len(NodeKind::Emitter), 1);
    assert_eq!(target.len(NodeKind::Particle), 1);
    assert_eq!(target.len(NodeKind::Texture), 1);
    assert_eq!(emitter_target(&target), Some(0));
    assert!(!target.node(outcome.root).unwrap().has_dependencies);
    assert!(save(&target).is_ok());
}

#[test]
fn node_only_export_flags_outside_references() {
    let source = scenario();
    let bytes = export_subtree(
        &source,
        NodeRef::new(NodeKind::Particle, 2),
        ExportMode::NodeOnly,
    )
    .unwrap();

    let mut target = Graph::new();
    let outcome = import_subtree(&mut target, &bytes, ImportPolicy::AlwaysAppend).unwrap();
    assert!(outcome.has_dependencies);
    assert_eq!(outcome.unresolved.len(), 1);
    assert!(target.node(outcome.root).unwrap().has_dependencies);
    assert!(target.dangling_references().is_empty());
}

#[test]
fn node_only_export_keeps_same_kind_references_outside() {
    let mut source = Graph::new();
    source.push_node(Node::create_default(NodeKind::Emitter)).unwrap();
    let mut emitter = Node::create_default(NodeKind::Emitter);
    emitter.push_item(ITEM).unwrap();
    emitter
        .item_mut(ITEM, 0)
        .unwrap()
        .set_reference("Emitter", Some(0))
        .unwrap();
    source.push_node(emitter).unwrap();

    let bytes = export_subtree(
        &source,
        NodeRef::new(NodeKind::Emitter, 1),
        ExportMode::NodeOnly,
    )
    .unwrap();
    let sub = load(&bytes).unwrap();
    assert_eq!(sub.graph.len(NodeKind::Emitter), 1);
    assert_eq!(sub.report.dangling().count(), 1);

    let mut target = scenario();
    let outcome = import_subtree(&mut target, &bytes, ImportPolicy::AlwaysAppend).unwrap();
    assert!(outcome.has_dependencies);
    assert_eq!(outcome.root, NodeRef::new(NodeKind::Emitter, 1));
    assert_eq!(outcome.unresolved.len(), 1);
    assert_eq!(outcome.unresolved[0].target, NodeKind::Emitter);
    assert_eq!(outcome.unresolved[0].index, 0);

    let imported = target.node(outcome.root).unwrap();
    let item = imported.items(ITEM).next().unwrap();
    assert_eq!(item.reference("Emitter").unwrap().index, None);
    assert!(target.references_to(NodeRef::new(NodeKind::Emitter, 1)).is_empty());
}

/// Texture 0 is kept raw and points at `b.atex`; texture 1 decodes to
/// `a.atex`.
fn file_with_raw_texture() -> Vec<u8> {
    let raw = [
        encode_chunk(Tag::new(b"Path"), &7u32.to_le_bytes()),
        // Declares eight payload bytes but carries none.
        [b"Zzzz".as_slice(), &8u32.to_le_bytes()].concat(),
    ]
    .concat();
    let payload = [
        encode_chunk(Tag::new(b"Strs"), b"a.atex\0b.atex\0"),
        encode_chunk(Tag::new(b"TxCn"), &2u32.to_le_bytes()),
        encode_chunk(TEX, &raw),
        encode_chunk(TEX, &encode_chunk(Tag::new(b"Path"), &0u32.to_le_bytes())),
    ]
    .concat();
    encode_chunk(Tag::new(b"AVFX"), &payload)
}

#[test]
fn raw_nodes_keep_their_string_table_entries() {
    let bytes = file_with_raw_texture();
    let mut loaded = load(&bytes).unwrap();
    assert!(loaded
        .graph
        .node(NodeRef::new(NodeKind::Texture, 0))
        .unwrap()
        .is_raw());
    assert_eq!(save(&loaded.graph).unwrap(), bytes);

    loaded
        .graph
        .set_attribute(
            NodeRef::new(NodeKind::Texture, 1),
            "Path",
            Value::Str("c.atex".into()),
        )
        .unwrap();
    let edited = save(&loaded.graph).unwrap();
    let root = decode_chunks(&edited).into_complete().unwrap();
    let children = decode_chunks(root[0].payload).into_complete().unwrap();
    let strings = children.iter().find(|c| c.tag == Tag::new(b"Strs")).unwrap();
    assert_eq!(strings.payload, b"a.atex\0b.atex\0c.atex\0");

    let reloaded = load(&edited).unwrap().graph;
    assert_eq!(
        reloaded
            .node(NodeRef::new(NodeKind::Texture, 1))
            .unwrap()
            .attribute("Path"),
        Some(&Value::Str("c.atex".into()))
    );
}

#[test]
fn imported_raw_nodes_bring_their_string_table() {
    let source = load(&file_with_raw_texture()).unwrap().graph;
    let bytes = export_subtree(
        &source,
        NodeRef::new(NodeKind::Texture, 0),
        ExportMode::NodeOnly,
    )
    .unwrap();

    let mut target = Graph::new();
    import_subtree(&mut target, &bytes, ImportPolicy::AlwaysAppend).unwrap();
    assert_eq!(target.source_strings(), Some(b"a.atex\0b.atex\0".as_slice()));
    target.push_node(texture("b.atex")).unwrap();

    let saved = save(&target).unwrap();
    let reloaded = load(&saved).unwrap().graph;
    assert!(reloaded
        .node(NodeRef::new(NodeKind::Texture, 0))
        .unwrap()
        .is_raw());
    let root = decode_chunks(&saved).into_complete().unwrap();
    let children = decode_chunks(root[0].payload).into_complete().unwrap();
    let strings = children.iter().find(|c| c.tag == Tag::new(b"Strs")).unwrap();
    assert_eq!(strings.payload, b"a.atex\0b.atex\0");
}

#[test]
fn deduplicate_shares_equal_textures() {
    let source = scenario();
    let bytes = export_subtree(
        &source,
        NodeRef::new(NodeKind::Particle, 2),
        ExportMode::WithDependencies,
    )
    .unwrap();

    let mut target = scenario();
    let outcome = import_subtree(&mut target, &bytes, ImportPolicy::Deduplicate).unwrap();
    assert_eq!(outcome.reused, vec![NodeRef::new(NodeKind::Texture, 1)]);
    assert_eq!(target.len(NodeKind::Texture), 2);
    assert_eq!(target.len(NodeKind::Particle), 4);

    let mut appended = scenario();
    import_subtree(&mut appended, &bytes, ImportPolicy::AlwaysAppend).unwrap();
    assert_eq!(appended.len(NodeKind::Texture), 3);
}

#[test]
fn truncated_root_returns_the_partial_graph() {
    let bytes = save(&scenario()).unwrap();
    let cut = &bytes[..bytes.len() - 3];
    let err = load(cut).unwrap_err();
    assert!(matches!(err, LoadError::Truncated { .. }));
    let partial = err.partial().unwrap();
    // Textures are the last group written, so the cut lands in texture 1.
    assert_eq!(partial.graph.len(NodeKind::Emitter), 1);
    assert_eq!(partial.graph.len(NodeKind::Particle), 3);
    assert_eq!(partial.graph.len(NodeKind::Texture), 1);
}

#[test]
fn truncated_node_degrades_only_itself() {
    let good = encode_chunk(Tag::new(b"Path"), &0u32.to_le_bytes());
    // Declares eight payload bytes but carries four.
    let bad = [b"Path".as_slice(), &8u32.to_le_bytes(), &0u32.to_le_bytes()].concat();
    let payload = [
        encode_chunk(TEX, &good),
        encode_chunk(TEX, &bad),
        encode_chunk(Tag::new(b"Strs"), b"a\0"),
    ]
    .concat();
    let bytes = encode_chunk(Tag::new(b"AVFX"), &payload);

    let loaded = load(&bytes).unwrap();
    let first = loaded.graph.node(NodeRef::new(NodeKind::Texture, 0)).unwrap();
    let second = loaded.graph.node(NodeRef::new(NodeKind::Texture, 1)).unwrap();
    assert_eq!(first.attribute("Path"), Some(&Value::Str("a".into())));
    assert!(second.is_raw());
    assert_eq!(second.status, VerifyStatus::Issue);
    assert!(loaded
        .report
        .issues
        .iter()
        .any(|i| matches!(i, ParseIssue::SchemaMismatch { .. })));
    assert_eq!(save(&loaded.graph).unwrap(), bytes);
}

#[test]
fn trailing_bytes_after_the_root_are_rejected() {
    let mut bytes = save(&Graph::new()).unwrap();
    bytes.extend_from_slice(&[0; 4]);
    assert!(matches!(load(&bytes), Err(LoadError::TrailingData { len: 4, .. })));
}
