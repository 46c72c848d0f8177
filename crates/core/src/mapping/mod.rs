use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{FeatureFrame, FeatureKind, PuppetError};

/// Pitch at which a pitch-driven channel reaches full scale.
pub const PITCH_REFERENCE_HZ: f32 = 2_000.0;

/// Motion and visual channels whose drive signal is user-routable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotionChannel {
    Bounce,
    SpineTwist,
    ArmWiggle,
    HeadNod,
    Scale,
    ColorShift,
    LegKick,
    ElbowFlex,
}

impl MotionChannel {
    pub const ALL: [MotionChannel; 8] = [
        MotionChannel::Bounce,
        MotionChannel::SpineTwist,
        MotionChannel::ArmWiggle,
        MotionChannel::HeadNod,
        MotionChannel::Scale,
        MotionChannel::ColorShift,
        MotionChannel::LegKick,
        MotionChannel::ElbowFlex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MotionChannel::Bounce => "bounce",
            MotionChannel::SpineTwist => "spineTwist",
            MotionChannel::ArmWiggle => "armWiggle",
            MotionChannel::HeadNod => "headNod",
            MotionChannel::Scale => "scale",
            MotionChannel::ColorShift => "colorShift",
            MotionChannel::LegKick => "legKick",
            MotionChannel::ElbowFlex => "elbowFlex",
        }
    }
}

impl fmt::Display for MotionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MotionChannel {
    type Err = PuppetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MotionChannel::ALL
            .into_iter()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| PuppetError::msg(format!("unknown motion channel `{s}`")))
    }
}

/// Routing table from each [`MotionChannel`] to the feature that drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MotionMapping {
    pub bounce: FeatureKind,
    pub spine_twist: FeatureKind,
    pub arm_wiggle: FeatureKind,
    pub head_nod: FeatureKind,
    pub scale: FeatureKind,
    pub color_shift: FeatureKind,
    pub leg_kick: FeatureKind,
    pub elbow_flex: FeatureKind,
}

impl Default for MotionMapping {
    fn default() -> Self {
        Self {
            bounce: FeatureKind::Bass,
            spine_twist: FeatureKind::Mid,
            arm_wiggle: FeatureKind::Treble,
            head_nod: FeatureKind::Rms,
            scale: FeatureKind::Energy,
            color_shift: FeatureKind::SpectralCentroid,
            leg_kick: FeatureKind::Bass,
            elbow_flex: FeatureKind::SpectralFlux,
        }
    }
}

impl MotionMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, channel: MotionChannel) -> FeatureKind {
        match channel {
            MotionChannel::Bounce => self.bounce,
            MotionChannel::SpineTwist => self.spine_twist,
            MotionChannel::ArmWiggle => self.arm_wiggle,
            MotionChannel::HeadNod => self.head_nod,
            MotionChannel::Scale => self.scale,
            MotionChannel::ColorShift => self.color_shift,
            MotionChannel::LegKick => self.leg_kick,
            MotionChannel::ElbowFlex => self.elbow_flex,
        }
    }

    pub fn set(&mut self, channel: MotionChannel, feature: FeatureKind) {
        let slot = match channel {
            MotionChannel::Bounce => &mut self.bounce,
            MotionChannel::SpineTwist => &mut self.spine_twist,
            MotionChannel::ArmWiggle => &mut self.arm_wiggle,
            MotionChannel::HeadNod => &mut self.head_nod,
            MotionChannel::Scale => &mut self.scale,
            MotionChannel::ColorShift => &mut self.color_shift,
            MotionChannel::LegKick => &mut self.leg_kick,
            MotionChannel::ElbowFlex => &mut self.elbow_flex,
        };
        *slot = feature;
    }

    /// Drive level in [0, 1] for `channel` given the current frame. Pitch is
    /// scaled against [`PITCH_REFERENCE_HZ`].
    pub fn drive(&self, channel: MotionChannel, frame: &FeatureFrame) -> f32 {
        let feature = self.get(channel);
        let raw = frame.value(feature);
        let value = match feature {
            FeatureKind::Pitch => raw / PITCH_REFERENCE_HZ,
            _ => raw,
        };
        if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bands;

    fn frame() -> FeatureFrame {
        FeatureFrame {
            bands: Bands {
                bass: 0.8,
                mid: 0.4,
                treble: 0.2,
            },
            energy: 0.5,
            pitch: 1_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn routes_channels_to_features() {
        let mut mapping = MotionMapping::new();
        assert_eq!(mapping.drive(MotionChannel::Bounce, &frame()), 0.8);

        mapping.set(MotionChannel::Bounce, FeatureKind::Treble);
        assert_eq!(mapping.get(MotionChannel::Bounce), FeatureKind::Treble);
        assert_eq!(mapping.drive(MotionChannel::Bounce, &frame()), 0.2);
    }

    #[test]
    fn pitch_is_normalised() {
        let mut mapping = MotionMapping::new();
        mapping.set(MotionChannel::Scale, FeatureKind::Pitch);
        assert_eq!(mapping.drive(MotionChannel::Scale, &frame()), 0.5);

        let shrill = FeatureFrame {
            pitch: 9_000.0,
            ..Default::default()
        };
        assert_eq!(mapping.drive(MotionChannel::Scale, &shrill), 1.0);
    }

    #[test]
    fn deserialises_user_edits() {
        let mapping: MotionMapping =
            serde_json::from_str(r#"{ "spineTwist": "spectralFlux", "headNod": "pitch" }"#)
                .unwrap();
        assert_eq!(mapping.spine_twist, FeatureKind::SpectralFlux);
        assert_eq!(mapping.head_nod, FeatureKind::Pitch);
        assert_eq!(mapping.bounce, FeatureKind::Bass);
    }

    #[test]
    fn channel_names_parse() {
        for channel in MotionChannel::ALL {
            assert_eq!(channel.name().parse::<MotionChannel>().unwrap(), channel);
        }
        assert!("wobble".parse::<MotionChannel>().is_err());
    }
}
