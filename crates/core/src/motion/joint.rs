use std::{fmt, ops::Index};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Closed set of articulated joints driven by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JointId {
    /// Vertical offset of the pelvis, carried on the `y` axis.
    Hips,
    Spine,
    Head,
    LeftArm,
    RightArm,
    LeftForearm,
    RightForearm,
    LeftLeg,
    RightLeg,
    LeftShin,
    RightShin,
}

/// Side of the body, used to mirror procedural terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Centre,
    Left,
    Right,
}

impl Side {
    /// +1 on the left and centre, -1 on the right.
    pub fn mirror(self) -> f32 {
        match self {
            Side::Right => -1.0,
            Side::Centre | Side::Left => 1.0,
        }
    }

    /// Phase offset that keeps left and right limbs in antiphase.
    pub fn phase(self) -> f32 {
        match self {
            Side::Right => std::f32::consts::PI,
            Side::Centre | Side::Left => 0.0,
        }
    }
}

impl JointId {
    pub const COUNT: usize = 11;

    pub const ALL: [JointId; JointId::COUNT] = [
        JointId::Hips,
        JointId::Spine,
        JointId::Head,
        JointId::LeftArm,
        JointId::RightArm,
        JointId::LeftForearm,
        JointId::RightForearm,
        JointId::LeftLeg,
        JointId::RightLeg,
        JointId::LeftShin,
        JointId::RightShin,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            JointId::Hips => "hips",
            JointId::Spine => "spine",
            JointId::Head => "head",
            JointId::LeftArm => "leftArm",
            JointId::RightArm => "rightArm",
            JointId::LeftForearm => "leftForearm",
            JointId::RightForearm => "rightForearm",
            JointId::LeftLeg => "leftLeg",
            JointId::RightLeg => "rightLeg",
            JointId::LeftShin => "leftShin",
            JointId::RightShin => "rightShin",
        }
    }

    /// Looks a joint up by its camelCase name; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        JointId::ALL.into_iter().find(|joint| joint.name() == name)
    }

    pub fn side(self) -> Side {
        match self {
            JointId::Hips | JointId::Spine | JointId::Head => Side::Centre,
            JointId::LeftArm | JointId::LeftForearm | JointId::LeftLeg | JointId::LeftShin => {
                Side::Left
            }
            JointId::RightArm | JointId::RightForearm | JointId::RightLeg | JointId::RightShin => {
                Side::Right
            }
        }
    }

    /// Static per-axis range the joint is clamped into after every step.
    pub fn limits(self) -> JointLimits {
        match self {
            JointId::Hips => {
                JointLimits::new(Vec3::new(0.0, -0.15, 0.0), Vec3::new(0.0, 0.15, 0.0))
            }
            JointId::Spine => JointLimits::symmetric(Vec3::new(0.5, 0.8, 0.4)),
            JointId::Head => JointLimits::symmetric(Vec3::new(0.6, 1.0, 0.4)),
            JointId::LeftArm => {
                JointLimits::new(Vec3::new(-2.5, -1.0, -0.3), Vec3::new(2.5, 1.0, 2.8))
            }
            JointId::RightArm => {
                JointLimits::new(Vec3::new(-2.5, -1.0, -2.8), Vec3::new(2.5, 1.0, 0.3))
            }
            JointId::LeftForearm => {
                JointLimits::new(Vec3::new(-0.5, -2.5, -0.3), Vec3::new(0.5, 0.0, 0.3))
            }
            JointId::RightForearm => {
                JointLimits::new(Vec3::new(-0.5, 0.0, -0.3), Vec3::new(0.5, 2.5, 0.3))
            }
            JointId::LeftLeg => {
                JointLimits::new(Vec3::new(-1.5, -0.5, -0.2), Vec3::new(1.2, 0.5, 0.8))
            }
            JointId::RightLeg => {
                JointLimits::new(Vec3::new(-1.5, -0.5, -0.8), Vec3::new(1.2, 0.5, 0.2))
            }
            JointId::LeftShin | JointId::RightShin => {
                JointLimits::new(Vec3::new(0.0, -0.1, -0.1), Vec3::new(2.0, 0.1, 0.1))
            }
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive per-axis `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub min: Vec3,
    pub max: Vec3,
}

impl JointLimits {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn symmetric(extent: Vec3) -> Self {
        Self::new(-extent, extent)
    }

    pub fn contains(&self, value: Vec3) -> bool {
        value.cmpge(self.min).all() && value.cmple(self.max).all()
    }
}

/// Rotation (or, for the hips, offset) and velocity of one joint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    pub rotation: Vec3,
    pub velocity: Vec3,
}

/// Fixed table of per-joint state indexed by [`JointId`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointStates([JointState; JointId::COUNT]);

impl JointStates {
    pub fn get(&self, joint: JointId) -> &JointState {
        &self.0[joint.index()]
    }

    pub fn get_mut(&mut self, joint: JointId) -> &mut JointState {
        &mut self.0[joint.index()]
    }

    /// Name-based lookup for callers that only have a string.
    pub fn by_name(&self, name: &str) -> Option<&JointState> {
        JointId::from_name(name).map(|joint| self.get(joint))
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointId, &JointState)> {
        JointId::ALL.into_iter().zip(self.0.iter())
    }
}

impl Index<JointId> for JointStates {
    type Output = JointState;

    fn index(&self, joint: JointId) -> &Self::Output {
        self.get(joint)
    }
}
