//! Target poses, saved sequences and the built-in procedural cycle.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{JointId, PuppetError, Result};

mod selector;

pub use selector::{PoseSelector, Selection};

/// Desired rotations of the six primary joints. Forearms, shins and the hips
/// are derived procedurally by the solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetPose {
    pub head: Vec3,
    pub spine: Vec3,
    pub left_arm: Vec3,
    pub right_arm: Vec3,
    pub left_leg: Vec3,
    pub right_leg: Vec3,
}

impl TargetPose {
    pub const PRIMARY_JOINTS: [JointId; 6] = [
        JointId::Head,
        JointId::Spine,
        JointId::LeftArm,
        JointId::RightArm,
        JointId::LeftLeg,
        JointId::RightLeg,
    ];

    /// Stored target for `joint`, or `None` for procedurally derived joints.
    pub fn get(&self, joint: JointId) -> Option<Vec3> {
        match joint {
            JointId::Head => Some(self.head),
            JointId::Spine => Some(self.spine),
            JointId::LeftArm => Some(self.left_arm),
            JointId::RightArm => Some(self.right_arm),
            JointId::LeftLeg => Some(self.left_leg),
            JointId::RightLeg => Some(self.right_leg),
            _ => None,
        }
    }

    /// Sets the target for a primary joint. Returns `false` (and changes
    /// nothing) for joints a pose does not store.
    pub fn set(&mut self, joint: JointId, rotation: Vec3) -> bool {
        let slot = match joint {
            JointId::Head => &mut self.head,
            JointId::Spine => &mut self.spine,
            JointId::LeftArm => &mut self.left_arm,
            JointId::RightArm => &mut self.right_arm,
            JointId::LeftLeg => &mut self.left_leg,
            JointId::RightLeg => &mut self.right_leg,
            _ => return false,
        };
        *slot = rotation;
        true
    }

    /// Copy with every stored rotation clamped into its joint's limits.
    pub fn clamped(&self) -> Self {
        let mut pose = *self;
        for joint in Self::PRIMARY_JOINTS {
            if let Some(rotation) = pose.get(joint) {
                let limits = joint.limits();
                pose.set(joint, rotation.clamp(limits.min, limits.max));
            }
        }
        pose
    }
}

/// The fixed four-pose dance cycle. Index 1 is the energetic "hands up" pose.
pub fn procedural_cycle() -> Vec<TargetPose> {
    let groove = TargetPose {
        head: Vec3::new(0.1, 0.0, 0.0),
        left_arm: Vec3::new(0.0, 0.0, 0.3),
        right_arm: Vec3::new(0.0, 0.0, -0.3),
        ..Default::default()
    };
    let hands_up = TargetPose {
        head: Vec3::new(-0.2, 0.0, 0.0),
        spine: Vec3::new(-0.1, 0.0, 0.0),
        left_arm: Vec3::new(0.0, 0.0, 2.4),
        right_arm: Vec3::new(0.0, 0.0, -2.4),
        left_leg: Vec3::new(0.0, 0.0, 0.15),
        right_leg: Vec3::new(0.0, 0.0, -0.15),
    };
    let lean_left = TargetPose {
        head: Vec3::new(0.0, -0.2, 0.1),
        spine: Vec3::new(0.0, 0.3, 0.2),
        left_arm: Vec3::new(0.8, 0.0, 1.2),
        right_arm: Vec3::new(-0.4, 0.0, -0.6),
        left_leg: Vec3::new(0.3, 0.0, 0.3),
        right_leg: Vec3::ZERO,
    };
    let lean_right = TargetPose {
        head: Vec3::new(0.0, 0.2, -0.1),
        spine: Vec3::new(0.0, -0.3, -0.2),
        left_arm: Vec3::new(-0.4, 0.0, 0.6),
        right_arm: Vec3::new(0.8, 0.0, -1.2),
        left_leg: Vec3::ZERO,
        right_leg: Vec3::new(0.3, 0.0, -0.3),
    };
    vec![groove, hands_up, lean_left, lean_right]
}

/// A named, immutable, non-empty list of poses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    id: String,
    name: String,
    poses: Vec<TargetPose>,
}

impl Sequence {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn poses(&self) -> &[TargetPose] {
        &self.poses
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// Catalog of the procedural cycle and the sequences saved this session.
#[derive(Debug, Clone)]
pub struct PoseLibrary {
    procedural: Vec<TargetPose>,
    sequences: Vec<Sequence>,
}

impl Default for PoseLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseLibrary {
    pub fn new() -> Self {
        Self {
            procedural: procedural_cycle(),
            sequences: Vec::new(),
        }
    }

    pub fn procedural(&self) -> &[TargetPose] {
        &self.procedural
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn get(&self, id: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|sequence| sequence.id == id)
    }

    /// Appends a new sequence and returns its generated id. An empty pose list
    /// is rejected and leaves the catalog untouched.
    pub fn save_sequence(
        &mut self,
        name: impl Into<String>,
        poses: Vec<TargetPose>,
    ) -> Result<String> {
        let name = name.into();
        if poses.is_empty() {
            tracing::warn!(%name, "refusing to save an empty sequence");
            return Err(PuppetError::EmptySequence);
        }

        let id = self.fresh_id();
        tracing::info!(%id, %name, poses = poses.len(), "sequence saved");
        self.sequences.push(Sequence {
            id: id.clone(),
            name,
            poses,
        });
        Ok(id)
    }

    pub fn remove_sequence(&mut self, id: &str) -> Result<Sequence> {
        let position = self
            .sequences
            .iter()
            .position(|sequence| sequence.id == id)
            .ok_or_else(|| PuppetError::UnknownSequence(id.to_string()))?;
        tracing::info!(%id, "sequence removed");
        Ok(self.sequences.remove(position))
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedural_cycle_has_four_poses_within_limits() {
        let cycle = procedural_cycle();
        assert_eq!(cycle.len(), 4);
        for pose in &cycle {
            assert_eq!(pose.clamped(), *pose);
        }
    }

    #[test]
    fn saving_an_empty_sequence_fails_without_side_effects() {
        let mut library = PoseLibrary::new();
        let err = library.save_sequence("Test", Vec::new()).unwrap_err();
        assert!(matches!(err, PuppetError::EmptySequence));
        assert!(library.sequences().is_empty());
    }

    #[test]
    fn saving_assigns_unique_ids() {
        let mut library = PoseLibrary::new();
        let first = library.save_sequence("Test", vec![TargetPose::default()]).unwrap();
        let second = library.save_sequence("Test", vec![TargetPose::default()]).unwrap();

        assert_ne!(first, second);
        assert_eq!(library.sequences().len(), 2);
        let saved = library.get(&first).unwrap();
        assert_eq!(saved.name(), "Test");
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn removing_sequences() {
        let mut library = PoseLibrary::new();
        let id = library.save_sequence("A", vec![TargetPose::default()]).unwrap();
        assert!(library.remove_sequence("nope").is_err());
        assert_eq!(library.remove_sequence(&id).unwrap().id(), id);
        assert!(library.get(&id).is_none());
    }

    #[test]
    fn pose_accessors_skip_derived_joints() {
        let mut pose = TargetPose::default();
        assert!(pose.set(JointId::Head, Vec3::X));
        assert_eq!(pose.get(JointId::Head), Some(Vec3::X));
        assert!(!pose.set(JointId::LeftShin, Vec3::X));
        assert_eq!(pose.get(JointId::LeftShin), None);
        assert_eq!(pose.get(JointId::Hips), None);
    }

    #[test]
    fn clamping_respects_limits() {
        let pose = TargetPose {
            head: Vec3::splat(5.0),
            ..Default::default()
        };
        let clamped = pose.clamped();
        assert!(JointId::Head.limits().contains(clamped.head));
        assert_eq!(clamped.head, JointId::Head.limits().max);
    }
}
