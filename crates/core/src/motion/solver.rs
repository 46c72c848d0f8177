use glam::Vec3;

use super::perturb::{base_target, perturbation, MotionContext};
use crate::{
    FeatureFrame, JointId, JointState, JointStates, MotionConfig, MotionMapping, MotionMode,
    SpringParams, TargetPose,
};

/// Integrates one spring-damper system per joint and clamps the result into
/// each joint's static limits.
///
/// Hitting a limit is an inelastic stop: the position is clamped and the
/// velocity on that axis is zeroed.
#[derive(Debug, Clone)]
pub struct JointSolver {
    states: JointStates,
    time: f32,
    knee_bend: f32,
    max_dt: f32,
    max_substep: f32,
    knee_release: f32,
}

impl JointSolver {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            states: JointStates::default(),
            time: 0.0,
            knee_bend: 0.0,
            max_dt: config.max_dt,
            max_substep: config.max_substep.max(MotionConfig::MIN_SUBSTEP),
            knee_release: config.knee_release,
        }
    }

    pub fn states(&self) -> &JointStates {
        &self.states
    }

    /// Looks a joint up by name; unknown names yield `None`.
    pub fn joint(&self, name: &str) -> Option<&JointState> {
        self.states.by_name(name)
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn knee_bend(&self) -> f32 {
        self.knee_bend
    }

    /// Returns every joint to rest with zero velocity.
    pub fn reset(&mut self) {
        self.states = JointStates::default();
        self.time = 0.0;
        self.knee_bend = 0.0;
    }

    /// Advances all joints by one host tick.
    ///
    /// `dt` is clamped to the configured maximum and integrated in equal
    /// sub-steps no longer than the configured sub-step. A non-positive or
    /// non-finite `dt` leaves the state untouched.
    pub fn step(
        &mut self,
        pose: &TargetPose,
        frame: &FeatureFrame,
        dt: f32,
        spring: SpringParams,
        mode: MotionMode,
        mapping: &MotionMapping,
    ) -> &JointStates {
        if !(dt.is_finite() && dt > 0.0) {
            return &self.states;
        }
        if dt > self.max_dt {
            tracing::warn!(dt, max = self.max_dt, "clamping stalled tick");
        }
        let dt = dt.min(self.max_dt);

        self.time += dt;
        self.knee_bend = if frame.is_beat {
            1.0
        } else {
            self.knee_bend * (-self.knee_release * dt).exp()
        };

        let targets = self.targets(pose, frame, mode, mapping);
        let substeps = (dt / self.max_substep).ceil().max(1.0) as usize;
        let h = dt / substeps as f32;

        for _ in 0..substeps {
            for joint in JointId::ALL {
                integrate(
                    self.states.get_mut(joint),
                    targets[joint.index()],
                    joint,
                    spring,
                    h,
                );
            }
        }

        &self.states
    }

    fn targets(
        &self,
        pose: &TargetPose,
        frame: &FeatureFrame,
        mode: MotionMode,
        mapping: &MotionMapping,
    ) -> [Vec3; JointId::COUNT] {
        let ctx = MotionContext {
            frame,
            mapping,
            time: self.time,
            knee_bend: self.knee_bend,
        };
        let mut targets = [Vec3::ZERO; JointId::COUNT];
        for joint in JointId::ALL {
            let mut target = base_target(joint, pose);
            if mode.perturbs() {
                target += perturbation(joint, &ctx);
            }
            targets[joint.index()] = sanitize(target);
        }
        targets
    }
}

/// One semi-implicit Euler step followed by the limit clamp.
fn integrate(state: &mut JointState, target: Vec3, joint: JointId, spring: SpringParams, h: f32) {
    let accel = (target - state.rotation) * spring.stiffness - state.velocity * spring.damping;
    state.velocity += accel * h;
    state.rotation += state.velocity * h;

    let limits = joint.limits();
    let clamped = state.rotation.clamp(limits.min, limits.max);
    let stopped = clamped.cmpne(state.rotation);
    state.velocity = Vec3::select(stopped, Vec3::ZERO, state.velocity);
    state.rotation = clamped;
}

fn sanitize(target: Vec3) -> Vec3 {
    if target.is_finite() {
        target
    } else {
        Vec3::ZERO
    }
}
