use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{FeatureFrame, MotionConfig, MotionMode, PoseLibrary, PuppetError, Result, TargetPose};

/// Target pose chosen for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub mode: MotionMode,
    pub pose: TargetPose,
    /// Cursor into the active sequence or the procedural cycle; 0 while editing.
    pub index: usize,
}

/// Decides the active mode and target pose each tick.
///
/// Precedence: an editor pose wins, then a selected sequence, then the
/// procedural cycle. Cursors only move on beat frames.
#[derive(Debug, Clone)]
pub struct PoseSelector {
    rng: StdRng,
    energetic_threshold: f32,
    energetic_bias: f64,
    energetic_pose: usize,
    active_sequence: Option<String>,
    sequence_cursor: usize,
    procedural_index: usize,
    editor_pose: Option<TargetPose>,
}

impl PoseSelector {
    pub fn new(config: &MotionConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Selector whose procedural choices repeat bit for bit across runs.
    pub fn with_seed(config: &MotionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &MotionConfig, rng: StdRng) -> Self {
        Self {
            rng,
            energetic_threshold: config.energetic_threshold,
            energetic_bias: config.energetic_bias.clamp(0.0, 1.0),
            energetic_pose: config.energetic_pose,
            active_sequence: None,
            sequence_cursor: 0,
            procedural_index: 0,
            editor_pose: None,
        }
    }

    pub fn active_sequence(&self) -> Option<&str> {
        self.active_sequence.as_deref()
    }

    pub fn editor_pose(&self) -> Option<&TargetPose> {
        self.editor_pose.as_ref()
    }

    pub fn procedural_index(&self) -> usize {
        self.procedural_index
    }

    /// Points playback at a saved sequence, or back at the procedural cycle
    /// with `None`. Unknown ids are rejected and change nothing.
    pub fn select_sequence(&mut self, library: &PoseLibrary, id: Option<&str>) -> Result<()> {
        match id {
            None => {
                tracing::info!("playback returned to the procedural cycle");
                self.active_sequence = None;
            }
            Some(id) => {
                if library.get(id).is_none() {
                    tracing::warn!(%id, "cannot select unknown sequence");
                    return Err(PuppetError::UnknownSequence(id.to_string()));
                }
                tracing::info!(%id, "sequence selected");
                self.active_sequence = Some(id.to_string());
            }
        }
        self.sequence_cursor = 0;
        Ok(())
    }

    /// Supplies (or clears) the manual pose that overrides playback.
    pub fn set_editor_pose(&mut self, pose: Option<TargetPose>) {
        self.editor_pose = pose;
    }

    /// Rewinds cursors. The selected sequence and editor pose are kept.
    pub fn reset(&mut self) {
        self.sequence_cursor = 0;
        self.procedural_index = 0;
    }

    pub fn mode(&self, library: &PoseLibrary) -> MotionMode {
        if self.editor_pose.is_some() {
            MotionMode::Editing
        } else if self.playable_sequence(library).is_some() {
            MotionMode::SequencePlayback
        } else {
            MotionMode::ProceduralDance
        }
    }

    pub fn select(&mut self, library: &PoseLibrary, frame: &FeatureFrame) -> Selection {
        if let Some(pose) = self.editor_pose {
            return Selection {
                mode: MotionMode::Editing,
                pose,
                index: 0,
            };
        }

        if let Some(poses) = self.playable_sequence(library).map(|sequence| sequence.poses()) {
            if frame.is_beat {
                self.sequence_cursor = (self.sequence_cursor + 1) % poses.len();
                tracing::debug!(cursor = self.sequence_cursor, "sequence advanced");
            }
            let index = self.sequence_cursor % poses.len();
            return Selection {
                mode: MotionMode::SequencePlayback,
                pose: poses[index],
                index,
            };
        }

        let cycle = library.procedural();
        if cycle.is_empty() {
            return Selection {
                mode: MotionMode::ProceduralDance,
                pose: TargetPose::default(),
                index: 0,
            };
        }
        if frame.is_beat {
            self.procedural_index = self.next_procedural_index(frame.energy, cycle.len());
            tracing::debug!(index = self.procedural_index, "procedural pose chosen");
        }
        let index = self.procedural_index % cycle.len();
        Selection {
            mode: MotionMode::ProceduralDance,
            pose: cycle[index],
            index,
        }
    }

    fn playable_sequence<'a>(&self, library: &'a PoseLibrary) -> Option<&'a crate::Sequence> {
        self.active_sequence
            .as_deref()
            .and_then(|id| library.get(id))
            .filter(|sequence| !sequence.is_empty())
    }

    /// Loud passages force the energetic pose with probability `energetic_bias`;
    /// everything else draws uniformly from the whole cycle.
    fn next_procedural_index(&mut self, energy: f32, len: usize) -> usize {
        if energy > self.energetic_threshold && self.rng.gen_bool(self.energetic_bias) {
            return self.energetic_pose.min(len - 1);
        }
        self.rng.gen_range(0..len)
    }
}
