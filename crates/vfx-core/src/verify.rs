//! Verification status and reference findings.

use std::fmt;

use serde::Serialize;

use crate::graph::kind::NodeKind;
use crate::graph::NodeRef;

/// Per-node result of the most recent link or verify pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum VerifyStatus {
    Ok,
    Issue,
    /// Not checked yet. Opaque nodes stay here since nothing in them is known.
    #[default]
    Unverified,
}

impl fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyStatus::Ok => write!(f, "ok"),
            VerifyStatus::Issue => write!(f, "issue"),
            VerifyStatus::Unverified => write!(f, "unverified"),
        }
    }
}

/// A reference slot whose index has no node behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub owner: NodeRef,
    /// Path of the slot inside the owner, e.g. `Particles[0].Particle`.
    pub slot: String,
    pub target: NodeKind,
    /// The offending index as stored in the file; may be negative.
    pub index: i64,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} points at {} #{}, which does not exist",
            self.owner, self.slot, self.target, self.index
        )
    }
}
