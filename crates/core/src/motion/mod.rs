//! Per-joint spring-damper motion driven by target poses and audio features.

use serde::{Deserialize, Serialize};

mod joint;
pub mod perturb;
mod solver;

pub use joint::{JointId, JointLimits, JointState, JointStates, Side};
pub use perturb::MotionContext;
pub use solver::JointSolver;

/// Mutually exclusive sources of the target pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotionMode {
    /// Manual pose override; perturbations are suppressed.
    Editing,
    /// Poses from the selected sequence, one step per beat.
    SequencePlayback,
    /// Poses from the built-in cycle, chosen at random on beats.
    ProceduralDance,
}

impl MotionMode {
    pub fn perturbs(self) -> bool {
        !matches!(self, MotionMode::Editing)
    }
}
