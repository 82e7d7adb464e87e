//! Attribute schemas for every node kind.
//!
//! A schema lists the fields a kind knows about, in the order a freshly
//! created node writes them. Fields found in a file but missing from the
//! schema are kept as raw chunks; they are never an error.

use vfx_chunk::Tag;

use crate::graph::kind::NodeKind;
use crate::graph::node::Node;
use crate::graph::value::{Curve, EnumType, Reference, Value};

/// The wire type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Enum(EnumType),
    Str,
    Curve,
    /// A nested object of the given kind.
    Node(NodeKind),
    /// An index into the group of the given kind.
    Ref(NodeKind),
    /// Number of sibling fields with the given tag.
    Count(Tag),
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Int(i32),
    Float(f32),
    Bool(bool),
    Enum(i32),
    Str(&'static str),
    /// Empty curve, empty bytes, unset reference, zero count, unassigned node.
    Empty,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub tag: Tag,
    pub name: &'static str,
    pub ty: FieldType,
    pub default: FieldDefault,
    /// Repeated fields form an item list and start with no entries.
    pub repeated: bool,
}

impl FieldSpec {
    const fn new(tag: &[u8; 4], name: &'static str, ty: FieldType, default: FieldDefault) -> Self {
        Self {
            tag: Tag::new(tag),
            name,
            ty,
            default,
            repeated: false,
        }
    }

    const fn items(tag: &[u8; 4], name: &'static str, kind: NodeKind) -> Self {
        Self {
            tag: Tag::new(tag),
            name,
            ty: FieldType::Node(kind),
            default: FieldDefault::Empty,
            repeated: true,
        }
    }

    /// The value a new node starts with for this field.
    ///
    /// Nested single objects start unassigned; item lists start empty and
    /// have no default.
    pub fn default_value(&self) -> Option<Value> {
        if self.repeated {
            return None;
        }
        let value = match (self.ty, self.default) {
            (FieldType::Int, FieldDefault::Int(v)) => Value::Int(v),
            (FieldType::Float, FieldDefault::Float(v)) => Value::Float(v),
            (FieldType::Bool, FieldDefault::Bool(v)) => Value::Bool(v),
            (FieldType::Enum(ty), FieldDefault::Enum(v)) => Value::Enum(ty, v),
            (FieldType::Str, FieldDefault::Str(s)) => Value::Str(s.to_string()),
            (FieldType::Int, _) => Value::Int(0),
            (FieldType::Float, _) => Value::Float(0.0),
            (FieldType::Bool, _) => Value::Bool(false),
            (FieldType::Enum(ty), _) => Value::Enum(ty, 0),
            (FieldType::Str, _) => Value::Str(String::new()),
            (FieldType::Curve, _) => Value::Curve(Curve::from_keys(Vec::new())),
            (FieldType::Node(kind), _) => Value::Node(Box::new(Node::unassigned(kind))),
            (FieldType::Ref(target), _) => Value::Ref(Reference::none(target)),
            (FieldType::Count(_), _) => Value::Count(0),
            (FieldType::Bytes, _) => Value::Bytes(Vec::new()),
        };
        Some(value)
    }

    /// Whether `value` can be stored in this field.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self.ty, value) {
            (FieldType::Int, Value::Int(_))
            | (FieldType::Float, Value::Float(_))
            | (FieldType::Bool, Value::Bool(_))
            | (FieldType::Str, Value::Str(_))
            | (FieldType::Curve, Value::Curve(_))
            | (FieldType::Count(_), Value::Count(_))
            | (FieldType::Bytes, Value::Bytes(_)) => true,
            (FieldType::Enum(ty), Value::Enum(other, _)) => ty == *other,
            (FieldType::Node(kind), Value::Node(node)) => node.kind == kind,
            (FieldType::Ref(target), Value::Ref(r)) => r.target == target,
            _ => false,
        }
    }

    pub fn type_description(&self) -> String {
        match self.ty {
            FieldType::Enum(ty) => format!("enum {ty:?}"),
            FieldType::Node(kind) => format!("node {kind}"),
            FieldType::Ref(kind) => format!("reference to {kind}"),
            FieldType::Count(tag) => format!("count of {tag}"),
            other => format!("{other:?}").to_lowercase(),
        }
    }
}

use FieldDefault as D;
use FieldType as T;

static ROOT: &[FieldSpec] = &[
    FieldSpec::new(b"Ver\0", "Version", T::Int, D::Int(0x2011_0913)),
    FieldSpec::new(b"bDFP", "IsDelayFastParticle", T::Bool, D::Bool(false)),
    FieldSpec::new(b"FcCl", "FarClip", T::Float, D::Float(0.0)),
    FieldSpec::new(b"NcCl", "NearClip", T::Float, D::Float(0.0)),
];

static SCHEDULER: &[FieldSpec] = &[
    FieldSpec::new(b"ItCn", "ItemCount", T::Count(Tag::new(b"Item")), D::Empty),
    FieldSpec::items(b"Item", "Items", NodeKind::SchedulerItem),
];

static SCHEDULER_ITEM: &[FieldSpec] = &[
    FieldSpec::new(b"bEna", "Enabled", T::Bool, D::Bool(true)),
    FieldSpec::new(b"StTm", "StartTime", T::Int, D::Int(0)),
    FieldSpec::new(b"TlNo", "Timeline", T::Ref(NodeKind::Timeline), D::Empty),
];

static TIMELINE: &[FieldSpec] = &[
    FieldSpec::new(b"LpSt", "LoopStart", T::Int, D::Int(0)),
    FieldSpec::new(b"LpEd", "LoopEnd", T::Int, D::Int(-1)),
    FieldSpec::new(b"BnNo", "Binder", T::Ref(NodeKind::Binder), D::Empty),
    FieldSpec::new(b"TICn", "ItemCount", T::Count(Tag::new(b"Item")), D::Empty),
    FieldSpec::items(b"Item", "Items", NodeKind::TimelineItem),
];

static TIMELINE_ITEM: &[FieldSpec] = &[
    FieldSpec::new(b"bEna", "Enabled", T::Bool, D::Bool(true)),
    FieldSpec::new(b"StTm", "StartTime", T::Int, D::Int(0)),
    FieldSpec::new(b"EdTm", "EndTime", T::Int, D::Int(30)),
    FieldSpec::new(b"EfNo", "Effector", T::Ref(NodeKind::Effector), D::Empty),
    FieldSpec::new(b"EmNo", "Emitter", T::Ref(NodeKind::Emitter), D::Empty),
];

static EMITTER: &[FieldSpec] = &[
    FieldSpec::new(b"EVT\0", "EmitterType", T::Enum(EnumType::EmitterType), D::Enum(0)),
    FieldSpec::new(b"SdNo", "SoundNumber", T::Int, D::Int(-1)),
    FieldSpec::new(b"Life", "Life", T::Curve, D::Empty),
    FieldSpec::new(b"CEmC", "CreateCount", T::Curve, D::Empty),
    FieldSpec::new(b"PrCn", "ParticleCount", T::Count(Tag::new(b"ItPr")), D::Empty),
    FieldSpec::new(b"EmCn", "EmitterCount", T::Count(Tag::new(b"ItEm")), D::Empty),
    FieldSpec::items(b"ItPr", "Particles", NodeKind::ParticleInstance),
    FieldSpec::items(b"ItEm", "Emitters", NodeKind::EmitterInstance),
];

static PARTICLE_INSTANCE: &[FieldSpec] = &[
    FieldSpec::new(b"bEnb", "Enabled", T::Bool, D::Bool(true)),
    FieldSpec::new(b"PrNo", "Particle", T::Ref(NodeKind::Particle), D::Empty),
    FieldSpec::new(b"LpSt", "LocalStart", T::Int, D::Int(0)),
];

static EMITTER_INSTANCE: &[FieldSpec] = &[
    FieldSpec::new(b"bEnb", "Enabled", T::Bool, D::Bool(true)),
    FieldSpec::new(b"EmNo", "Emitter", T::Ref(NodeKind::Emitter), D::Empty),
    FieldSpec::new(b"LpSt", "LocalStart", T::Int, D::Int(0)),
];

static PARTICLE: &[FieldSpec] = &[
    FieldSpec::new(b"PrVT", "ParticleType", T::Enum(EnumType::ParticleType), D::Enum(0)),
    FieldSpec::new(b"Life", "Life", T::Curve, D::Empty),
    FieldSpec::new(b"SclX", "ScaleX", T::Curve, D::Empty),
    FieldSpec::new(b"MdNo", "Model", T::Ref(NodeKind::Model), D::Empty),
    FieldSpec::new(b"TC1\0", "TextureColor1", T::Node(NodeKind::TextureSlot), D::Empty),
    FieldSpec::new(b"TC2\0", "TextureColor2", T::Node(NodeKind::TextureSlot), D::Empty),
    FieldSpec::new(b"TN\0\0", "TextureNormal", T::Node(NodeKind::TextureSlot), D::Empty),
    FieldSpec::new(b"TP\0\0", "TexturePalette", T::Node(NodeKind::TextureSlot), D::Empty),
];

static TEXTURE_SLOT: &[FieldSpec] = &[
    FieldSpec::new(b"bEna", "Enabled", T::Bool, D::Bool(true)),
    FieldSpec::new(b"TxNo", "Texture", T::Ref(NodeKind::Texture), D::Empty),
    FieldSpec::new(b"TFT\0", "TextureFilter", T::Enum(EnumType::TextureFilter), D::Enum(0)),
    FieldSpec::new(b"TBT\0", "TextureBorder", T::Enum(EnumType::TextureBorder), D::Enum(0)),
    FieldSpec::new(b"Offs", "Offset", T::Curve, D::Empty),
];

static EFFECTOR: &[FieldSpec] = &[
    FieldSpec::new(b"EfVT", "EffectorType", T::Enum(EnumType::EffectorType), D::Enum(0)),
    FieldSpec::new(b"Life", "Life", T::Curve, D::Empty),
    FieldSpec::new(b"Strn", "Strength", T::Curve, D::Empty),
];

static BINDER: &[FieldSpec] = &[
    FieldSpec::new(b"BnVT", "BinderType", T::Enum(EnumType::BinderType), D::Enum(0)),
    FieldSpec::new(b"bStl", "StopAtEnd", T::Bool, D::Bool(false)),
    FieldSpec::new(b"StDS", "StartDelay", T::Int, D::Int(0)),
];

static TEXTURE: &[FieldSpec] = &[FieldSpec::new(b"Path", "Path", T::Str, D::Str(""))];

static MODEL: &[FieldSpec] = &[
    FieldSpec::new(b"VDrw", "Vertices", T::Bytes, D::Empty),
    FieldSpec::new(b"VIdx", "Indices", T::Bytes, D::Empty),
    FieldSpec::new(b"VEmt", "EmitVertices", T::Bytes, D::Empty),
];

/// Fields of the file header (children of the root chunk).
pub fn root_fields() -> &'static [FieldSpec] {
    ROOT
}

/// Fields known for `kind`. Opaque kinds have none.
pub fn fields(kind: NodeKind) -> &'static [FieldSpec] {
    match kind {
        NodeKind::Scheduler => SCHEDULER,
        NodeKind::SchedulerItem => SCHEDULER_ITEM,
        NodeKind::Timeline => TIMELINE,
        NodeKind::TimelineItem => TIMELINE_ITEM,
        NodeKind::Emitter => EMITTER,
        NodeKind::ParticleInstance => PARTICLE_INSTANCE,
        NodeKind::EmitterInstance => EMITTER_INSTANCE,
        NodeKind::Particle => PARTICLE,
        NodeKind::TextureSlot => TEXTURE_SLOT,
        NodeKind::Effector => EFFECTOR,
        NodeKind::Binder => BINDER,
        NodeKind::Texture => TEXTURE,
        NodeKind::Model => MODEL,
        NodeKind::Opaque(_) => &[],
    }
}

pub fn field_by_tag(specs: &'static [FieldSpec], tag: Tag) -> Option<&'static FieldSpec> {
    specs.iter().find(|s| s.tag == tag)
}

pub fn field_by_name(specs: &'static [FieldSpec], name: &str) -> Option<&'static FieldSpec> {
    specs.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Position of `tag` in the schema, used to keep inserted fields in order.
pub fn rank(specs: &[FieldSpec], tag: Tag) -> Option<usize> {
    specs.iter().position(|s| s.tag == tag)
}
