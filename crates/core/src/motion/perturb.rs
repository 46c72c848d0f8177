//! Deterministic, feature-driven oscillations layered on top of the base pose.
//!
//! Each joint's behaviour is one arm of [`perturbation`]; the solver itself is
//! generic and only sees the resulting offsets.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::{FeatureFrame, JointId, MotionChannel, MotionMapping, TargetPose};

const BOUNCE_DEPTH: f32 = 0.12;
const BOUNCE_HZ: f32 = 2.0;
const SPINE_TWIST: f32 = 0.4;
const SPINE_SWAY: f32 = 0.1;
const HEAD_NOD: f32 = 0.3;
const ARM_WIGGLE: f32 = 0.5;
const ARM_SWING: f32 = 0.2;
const ELBOW_REST: f32 = 0.3;
const ELBOW_PULSE: f32 = 0.4;
const ELBOW_FLEX: f32 = 1.0;
const LEG_KICK: f32 = 0.4;
const KNEE_REST: f32 = 0.1;
const KNEE_BEAT: f32 = 0.8;
const KNEE_KICK: f32 = 0.2;

/// Everything a perturbation may depend on for one tick.
#[derive(Debug, Clone, Copy)]
pub struct MotionContext<'a> {
    pub frame: &'a FeatureFrame,
    pub mapping: &'a MotionMapping,
    /// Solver time in seconds.
    pub time: f32,
    /// Beat envelope in [0, 1]: 1 on a beat, relaxing towards 0 afterwards.
    pub knee_bend: f32,
}

impl MotionContext<'_> {
    fn drive(&self, channel: MotionChannel) -> f32 {
        self.mapping.drive(channel, self.frame)
    }
}

/// Base target before perturbation: the pose's stored rotation for primary
/// joints, a fixed rest bend for the derived ones.
pub fn base_target(joint: JointId, pose: &TargetPose) -> Vec3 {
    if let Some(rotation) = pose.get(joint) {
        return rotation;
    }
    let mirror = joint.side().mirror();
    match joint {
        JointId::LeftForearm | JointId::RightForearm => Vec3::new(0.0, -mirror * ELBOW_REST, 0.0),
        JointId::LeftShin | JointId::RightShin => Vec3::new(KNEE_REST, 0.0, 0.0),
        _ => Vec3::ZERO,
    }
}

/// Offset added to [`base_target`] for `joint`.
pub fn perturbation(joint: JointId, ctx: &MotionContext<'_>) -> Vec3 {
    let t = ctx.time;
    let side = joint.side();
    let mirror = side.mirror();
    let phase = side.phase();

    match joint {
        JointId::Hips => {
            let bounce = ctx.drive(MotionChannel::Bounce);
            let pulse = 0.5 + 0.5 * (t * TAU * BOUNCE_HZ).sin();
            Vec3::new(0.0, -BOUNCE_DEPTH * bounce * pulse, 0.0)
        }
        JointId::Spine => {
            let twist = ctx.drive(MotionChannel::SpineTwist);
            Vec3::new(
                0.0,
                SPINE_TWIST * twist * (t * 2.0).sin(),
                SPINE_SWAY * twist * (t * 1.3).sin(),
            )
        }
        JointId::Head => {
            let nod = ctx.drive(MotionChannel::HeadNod);
            Vec3::new(HEAD_NOD * nod * (t * 8.0).sin(), 0.0, 0.0)
        }
        JointId::LeftArm | JointId::RightArm => {
            let wiggle = ctx.drive(MotionChannel::ArmWiggle);
            Vec3::new(
                ARM_SWING * wiggle * (t * 3.0 + phase).cos(),
                0.0,
                mirror * ARM_WIGGLE * wiggle * (t * 5.0 + phase).sin(),
            )
        }
        JointId::LeftForearm | JointId::RightForearm => {
            let flex = ctx.drive(MotionChannel::ElbowFlex);
            let envelope = 0.5 + 0.5 * (t * 4.0 + phase).sin();
            Vec3::new(0.0, -mirror * (ELBOW_PULSE * envelope + ELBOW_FLEX * flex), 0.0)
        }
        JointId::LeftLeg | JointId::RightLeg => {
            let kick = ctx.drive(MotionChannel::LegKick);
            Vec3::new(LEG_KICK * kick * (t * 4.0 + phase).sin(), 0.0, 0.0)
        }
        JointId::LeftShin | JointId::RightShin => {
            let kick = ctx.drive(MotionChannel::LegKick);
            Vec3::new(KNEE_BEAT * ctx.knee_bend + KNEE_KICK * kick, 0.0, 0.0)
        }
    }
}
