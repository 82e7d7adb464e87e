//! Attribute values: scalars, enumerations, curves, references.

use std::fmt;

use serde::Serialize;
use vfx_chunk::Tag;

use super::kind::NodeKind;
use super::node::Node;

/// Enumerations used by attribute schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EnumType {
    EmitterType,
    ParticleType,
    EffectorType,
    BinderType,
    TextureFilter,
    TextureBorder,
}

impl EnumType {
    /// Choice names, indexed by their encoded value.
    pub fn choices(&self) -> &'static [&'static str] {
        match self {
            EnumType::EmitterType => &[
                "Point",
                "Cone",
                "ConeModel",
                "SphereModel",
                "CylinderModel",
                "Model",
            ],
            EnumType::ParticleType => &[
                "Parameter",
                "Powder",
                "Windmill",
                "Line",
                "Model",
                "Polyline",
                "Quad",
                "Polygon",
                "Decal",
                "DecalRing",
                "Disc",
                "LightModel",
                "Laser",
                "ModelSkin",
                "Dissolve",
            ],
            EnumType::EffectorType => &[
                "PointLight",
                "DirectionalLight",
                "RadialBlur",
                "BlackHole",
                "CameraQuake",
            ],
            EnumType::BinderType => &["Point", "Linear", "Spline", "Camera"],
            EnumType::TextureFilter => &["Linear", "Point", "Anisotropic"],
            EnumType::TextureBorder => &["Wrap", "Clamp", "Repeat", "Mirror"],
        }
    }

    /// Name of a choice, if the value is one this editor knows.
    pub fn choice_name(&self, value: i32) -> Option<&'static str> {
        usize::try_from(value)
            .ok()
            .and_then(|i| self.choices().get(i).copied())
    }

    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.choices()
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| i as i32)
    }
}

/// How a curve moves from one keyframe to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Interpolation {
    Linear,
    Spline,
    Step,
    /// A value this editor does not name; kept so it round-trips.
    Other(u16),
}

impl Interpolation {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Interpolation::Linear,
            1 => Interpolation::Spline,
            2 => Interpolation::Step,
            other => Interpolation::Other(other),
        }
    }

    pub fn to_raw(self) -> u16 {
        match self {
            Interpolation::Linear => 0,
            Interpolation::Spline => 1,
            Interpolation::Step => 2,
            Interpolation::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keyframe {
    pub time: u16,
    pub interpolation: Interpolation,
    pub value: [f32; 3],
}

impl Keyframe {
    pub fn new(time: u16, value: f32) -> Self {
        Self {
            time,
            interpolation: Interpolation::Linear,
            value: [value, 0.0, 0.0],
        }
    }
}

/// A child chunk this editor does not model, kept verbatim in position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub tag: Tag,
    pub payload: Vec<u8>,
}

/// One child chunk of a curve.
#[derive(Debug, Clone, PartialEq)]
pub enum CurvePart {
    /// The `Keys` array.
    Keys(Vec<Keyframe>),
    /// A child this editor does not model.
    Unknown(RawChunk),
}

/// An ordered keyframe sequence, owned by exactly one attribute.
///
/// The curve's child chunks are kept in file order, so an unknown child
/// written before the keys stays before them. A curve read without a `Keys`
/// chunk has no [`CurvePart::Keys`] entry and is written back without one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    pub parts: Vec<CurvePart>,
}

impl Curve {
    pub fn from_keys(keys: Vec<Keyframe>) -> Self {
        Self {
            parts: vec![CurvePart::Keys(keys)],
        }
    }

    pub fn has_keys(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, CurvePart::Keys(_)))
    }

    pub fn keys(&self) -> &[Keyframe] {
        self.parts
            .iter()
            .find_map(|p| match p {
                CurvePart::Keys(keys) => Some(keys.as_slice()),
                CurvePart::Unknown(_) => None,
            })
            .unwrap_or(&[])
    }

    /// Replace the keyframes in place, or add a `Keys` entry first if the
    /// curve has none.
    pub fn set_keys(&mut self, keys: Vec<Keyframe>) {
        for part in &mut self.parts {
            if let CurvePart::Keys(existing) = part {
                *existing = keys;
                return;
            }
        }
        self.parts.insert(0, CurvePart::Keys(keys));
    }

    pub fn unknown(&self) -> impl Iterator<Item = &RawChunk> {
        self.parts.iter().filter_map(|p| match p {
            CurvePart::Unknown(chunk) => Some(chunk),
            CurvePart::Keys(_) => None,
        })
    }
}

/// A reference slot: an index into the group of kind `target`.
///
/// Indices carry no validity guarantee; they are checked when the graph is
/// linked, verified, or saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub target: NodeKind,
    pub index: Option<usize>,
}

impl Reference {
    pub fn none(target: NodeKind) -> Self {
        Self {
            target,
            index: None,
        }
    }

    pub fn to(target: NodeKind, index: usize) -> Self {
        Self {
            target,
            index: Some(index),
        }
    }
}

/// The value of one attribute field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    Enum(EnumType, i32),
    Str(String),
    Curve(Curve),
    Node(Box<Node>),
    Ref(Reference),
    /// Number of sibling fields with a given tag; recomputed on save.
    Count(u32),
    /// Known data this editor does not interpret (vertex buffers).
    Bytes(Vec<u8>),
    /// An unknown child chunk's payload.
    Raw(Vec<u8>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Enum(..) => "enum",
            Value::Str(_) => "string",
            Value::Curve(_) => "curve",
            Value::Node(_) => "node",
            Value::Ref(_) => "reference",
            Value::Count(_) => "count",
            Value::Bytes(_) => "bytes",
            Value::Raw(_) => "raw",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Enum(ty, v) => match ty.choice_name(*v) {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "{ty:?}({v})"),
            },
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Curve(c) => write!(f, "curve[{} keys]", c.keys().len()),
            Value::Node(n) if !n.assigned => write!(f, "{} (unassigned)", n.kind),
            Value::Node(n) => write!(f, "{}", n.kind),
            Value::Ref(r) => match r.index {
                Some(i) => write!(f, "{} #{i}", r.target),
                None => write!(f, "{} (none)", r.target),
            },
            Value::Count(n) => write!(f, "{n}"),
            Value::Bytes(b) => write!(f, "{} bytes", b.len()),
            Value::Raw(b) => write!(f, "raw {} bytes", b.len()),
        }
    }
}
