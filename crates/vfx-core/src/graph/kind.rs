//! Node kinds and their group tags.

use std::fmt;

use serde::Serialize;
use vfx_chunk::Tag;

/// The kind of object a node represents.
///
/// Group kinds live in a [`NodeGroup`](super::NodeGroup) and are addressed by
/// index. Nested kinds only ever appear as a field value inside another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeKind {
    // Group kinds, in canonical file order
    Scheduler,
    Timeline,
    Emitter,
    Particle,
    Effector,
    Binder,
    Texture,
    Model,

    // Nested kinds
    SchedulerItem,
    TimelineItem,
    ParticleInstance,
    EmitterInstance,
    TextureSlot,

    /// An unrecognized top-level chunk, kept byte-for-byte.
    Opaque(Tag),
}

/// Known group kinds in the order their chunks appear in a canonical file.
pub const GROUP_KINDS: [NodeKind; 8] = [
    NodeKind::Scheduler,
    NodeKind::Timeline,
    NodeKind::Emitter,
    NodeKind::Particle,
    NodeKind::Effector,
    NodeKind::Binder,
    NodeKind::Texture,
    NodeKind::Model,
];

impl NodeKind {
    /// Chunk tag used for members of this group.
    pub fn group_tag(&self) -> Option<Tag> {
        let tag = match self {
            NodeKind::Scheduler => b"Schd",
            NodeKind::Timeline => b"TmLn",
            NodeKind::Emitter => b"Emit",
            NodeKind::Particle => b"Ptcl",
            NodeKind::Effector => b"Efct",
            NodeKind::Binder => b"Bind",
            NodeKind::Texture => b"Tex\0",
            NodeKind::Model => b"Modl",
            NodeKind::Opaque(tag) => return Some(*tag),
            _ => return None,
        };
        Some(Tag::new(tag))
    }

    /// Tag of the root-level chunk holding this group's member count.
    pub fn count_tag(&self) -> Option<Tag> {
        let tag = match self {
            NodeKind::Scheduler => b"ScCn",
            NodeKind::Timeline => b"TlCn",
            NodeKind::Emitter => b"EmCn",
            NodeKind::Particle => b"PrCn",
            NodeKind::Effector => b"EfCn",
            NodeKind::Binder => b"BdCn",
            NodeKind::Texture => b"TxCn",
            NodeKind::Model => b"MdCn",
            _ => return None,
        };
        Some(Tag::new(tag))
    }

    pub fn from_group_tag(tag: Tag) -> Option<NodeKind> {
        GROUP_KINDS
            .into_iter()
            .find(|k| k.group_tag() == Some(tag))
    }

    pub fn from_count_tag(tag: Tag) -> Option<NodeKind> {
        GROUP_KINDS
            .into_iter()
            .find(|k| k.count_tag() == Some(tag))
    }

    /// Whether nodes of this kind are addressed by index in a group.
    pub fn is_group(&self) -> bool {
        GROUP_KINDS.contains(self) || self.is_opaque()
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, NodeKind::Opaque(_))
    }

    /// Parse a user-facing group name such as `emitter` or `tex`.
    pub fn from_name(name: &str) -> Option<NodeKind> {
        let lower = name.to_ascii_lowercase();
        let kind = match lower.as_str() {
            "scheduler" | "schd" => NodeKind::Scheduler,
            "timeline" | "tmln" => NodeKind::Timeline,
            "emitter" | "emit" => NodeKind::Emitter,
            "particle" | "ptcl" => NodeKind::Particle,
            "effector" | "efct" => NodeKind::Effector,
            "binder" | "bind" => NodeKind::Binder,
            "texture" | "tex" => NodeKind::Texture,
            "model" | "modl" => NodeKind::Model,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Scheduler => write!(f, "Scheduler"),
            NodeKind::Timeline => write!(f, "Timeline"),
            NodeKind::Emitter => write!(f, "Emitter"),
            NodeKind::Particle => write!(f, "Particle"),
            NodeKind::Effector => write!(f, "Effector"),
            NodeKind::Binder => write!(f, "Binder"),
            NodeKind::Texture => write!(f, "Texture"),
            NodeKind::Model => write!(f, "Model"),
            NodeKind::SchedulerItem => write!(f, "SchedulerItem"),
            NodeKind::TimelineItem => write!(f, "TimelineItem"),
            NodeKind::ParticleInstance => write!(f, "ParticleInstance"),
            NodeKind::EmitterInstance => write!(f, "EmitterInstance"),
            NodeKind::TextureSlot => write!(f, "TextureSlot"),
            NodeKind::Opaque(tag) => write!(f, "Opaque({tag})"),
        }
    }
}
