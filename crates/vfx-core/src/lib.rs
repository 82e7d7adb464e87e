//! Node graph model for VFX editor files.
//!
//! The graph holds one [`NodeGroup`] per node kind. Nodes reference each other
//! by `(group kind, index)`, and every structural edit on [`Graph`] keeps those
//! indices pointing at the same nodes, clearing the ones whose target is gone.
//!
//! Encoding and decoding live in `vfx-avfx`; this crate has no format logic
//! beyond the static attribute schemas.

pub mod graph;
pub mod preview;
pub mod schema;
pub mod verify;
pub mod workspace;

pub use graph::kind::{NodeKind, GROUP_KINDS};
pub use graph::node::{Field, Node};
pub use graph::value::{Curve, CurvePart, EnumType, Interpolation, Keyframe, RawChunk, Reference, Value};
pub use graph::{Graph, GraphError, IncomingReference, NodeGroup, NodeRef, Removed, Slot};
pub use preview::PreviewSink;
pub use schema::{FieldSpec, FieldType};
pub use verify::{DanglingReference, VerifyStatus};
pub use workspace::WorkspaceMeta;
