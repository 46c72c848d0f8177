use serde::{Deserialize, Serialize};

use crate::{FeatureFrame, MotionChannel, MotionMapping};

/// How far the `scale` channel can grow the figure at full drive.
const SCALE_RANGE: f32 = 0.3;

/// Whole-figure visual parameters handed to the renderer next to the joints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FigureStyle {
    /// Uniform scale, 1.0 at rest.
    pub scale: f32,
    /// Hue offset in [0, 1].
    pub color_shift: f32,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            scale: 1.0,
            color_shift: 0.0,
        }
    }
}

impl FigureStyle {
    pub fn from_frame(frame: &FeatureFrame, mapping: &MotionMapping) -> Self {
        Self {
            scale: 1.0 + SCALE_RANGE * mapping.drive(MotionChannel::Scale, frame),
            color_shift: mapping.drive(MotionChannel::ColorShift, frame),
        }
    }
}
