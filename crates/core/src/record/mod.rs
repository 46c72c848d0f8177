use crate::{PuppetError, Result, TargetPose};

/// Captures editor poses frame by frame so they can be saved as a sequence.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    frames: Vec<TargetPose>,
    is_recording: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new take, discarding any frames from the previous one.
    pub fn start(&mut self) {
        self.frames.clear();
        self.is_recording = true;
    }

    /// Stops capturing; the captured frames stay available.
    pub fn stop(&mut self) {
        self.is_recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn capture(&mut self, pose: TargetPose) -> Result<usize> {
        if !self.is_recording {
            return Err(PuppetError::NotRecording);
        }
        self.frames.push(pose);
        Ok(self.frames.len())
    }

    pub fn frames(&self) -> &[TargetPose] {
        &self.frames
    }

    /// Hands the captured frames over and ends the take.
    pub fn take_frames(&mut self) -> Vec<TargetPose> {
        self.is_recording = false;
        std::mem::take(&mut self.frames)
    }
}
