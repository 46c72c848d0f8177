use serde::Serialize;

use crate::{
    AnalysisSummary, AppConfig, FeatureExtractor, FeatureFrame, FeatureKind, FigureStyle,
    JointSolver, JointStates, MotionChannel, MotionMapping, MotionMode, PlaybackClock,
    PoseLibrary, PoseSelector, Recorder, Result, Selection, SpectrumAnalyser, TargetPose,
};

/// Everything the presentation layer needs after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickOutput {
    pub frame: FeatureFrame,
    pub mode: MotionMode,
    /// Cursor into the active sequence or procedural cycle.
    pub pose_index: usize,
    pub joints: JointStates,
    pub style: FigureStyle,
}

/// All state belonging to one live audio source.
///
/// Create one when the source starts and drop it when the source stops. Each
/// tick runs analysis, pose selection and joint integration in that order.
#[derive(Debug)]
pub struct Session {
    config: AppConfig,
    extractor: FeatureExtractor,
    analyser: SpectrumAnalyser,
    library: PoseLibrary,
    selector: PoseSelector,
    solver: JointSolver,
    recorder: Recorder,
    clock: PlaybackClock,
    last_selection: Option<Selection>,
}

impl Session {
    pub fn new(config: AppConfig) -> Result<Self> {
        let selector = PoseSelector::new(&config.motion);
        Self::with_selector(config, selector)
    }

    /// Session whose procedural pose choices are reproducible.
    pub fn with_seed(config: AppConfig, seed: u64) -> Result<Self> {
        let selector = PoseSelector::with_seed(&config.motion, seed);
        Self::with_selector(config, selector)
    }

    fn with_selector(config: AppConfig, selector: PoseSelector) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            sample_rate = config.audio.sample_rate,
            bins = config.audio.bin_count(),
            "session created"
        );
        let analyser =
            SpectrumAnalyser::from_config(&config.audio, config.analysis.max_magnitude)?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.audio.sample_rate, config.analysis.clone()),
            analyser,
            library: PoseLibrary::new(),
            solver: JointSolver::new(&config.motion),
            recorder: Recorder::new(),
            clock: PlaybackClock::new(),
            last_selection: None,
            selector,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn library(&self) -> &PoseLibrary {
        &self.library
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn joints(&self) -> &JointStates {
        self.solver.states()
    }

    pub fn summary(&self) -> &AnalysisSummary {
        self.extractor.summary()
    }

    pub fn mode(&self) -> MotionMode {
        self.selector.mode(&self.library)
    }

    pub fn mapping(&self) -> &MotionMapping {
        &self.config.mapping
    }

    pub fn set_mapping(&mut self, mapping: MotionMapping) {
        self.config.mapping = mapping;
    }

    pub fn map_channel(&mut self, channel: MotionChannel, feature: FeatureKind) {
        tracing::info!(%channel, %feature, "motion channel remapped");
        self.config.mapping.set(channel, feature);
    }

    /// Runs one tick from analyser buffers supplied by the host.
    pub fn tick(&mut self, spectrum: &[f32], time_domain: &[f32], dt: f32) -> TickOutput {
        let advance = if dt.is_finite() && dt > 0.0 {
            dt.min(self.config.motion.max_dt)
        } else {
            0.0
        };
        self.clock.advance(advance);

        let frame = self
            .extractor
            .analyze(spectrum, time_domain, self.clock.time_seconds);
        let selection = self.selector.select(&self.library, &frame);
        let spring = self.config.motion.spring_for(selection.mode);
        let joints = *self.solver.step(
            &selection.pose,
            &frame,
            dt,
            spring,
            selection.mode,
            &self.config.mapping,
        );
        if self.last_selection.map(|last| last.mode) != Some(selection.mode) {
            tracing::info!(mode = ?selection.mode, "motion mode changed");
        }
        self.last_selection = Some(selection);

        TickOutput {
            style: FigureStyle::from_frame(&frame, &self.config.mapping),
            frame,
            mode: selection.mode,
            pose_index: selection.index,
            joints,
        }
    }

    /// Runs one tick from raw PCM, deriving the analyser buffers internally.
    pub fn tick_samples(&mut self, samples: &[f32], dt: f32) -> Result<TickOutput> {
        self.analyser.process(samples)?;
        let spectrum = self.analyser.spectrum().to_vec();
        let time_domain = self.analyser.time_domain().to_vec();
        Ok(self.tick(&spectrum, &time_domain, dt))
    }

    pub fn save_sequence(
        &mut self,
        name: impl Into<String>,
        poses: Vec<TargetPose>,
    ) -> Result<String> {
        self.library.save_sequence(name, poses)
    }

    pub fn select_sequence(&mut self, id: Option<&str>) -> Result<()> {
        self.selector.select_sequence(&self.library, id)
    }

    pub fn remove_sequence(&mut self, id: &str) -> Result<()> {
        self.library.remove_sequence(id)?;
        if self.selector.active_sequence() == Some(id) {
            self.selector.select_sequence(&self.library, None)?;
        }
        Ok(())
    }

    pub fn set_editor_pose(&mut self, pose: Option<TargetPose>) {
        self.selector.set_editor_pose(pose);
    }

    pub fn start_recording(&mut self) {
        tracing::info!("recording started");
        self.recorder.start();
    }

    pub fn stop_recording(&mut self) {
        self.recorder.stop();
    }

    /// Captures the editor pose, or the last selected target when no editor
    /// pose is set. Returns the number of frames captured so far.
    pub fn capture_frame(&mut self) -> Result<usize> {
        let pose = self
            .selector
            .editor_pose()
            .copied()
            .or_else(|| self.last_selection.map(|selection| selection.pose))
            .unwrap_or_default();
        self.recorder.capture(pose)
    }

    /// Saves the captured frames as a new sequence. An empty take is rejected
    /// and left in place.
    pub fn save_recording(&mut self, name: impl Into<String>) -> Result<String> {
        let id = self
            .library
            .save_sequence(name, self.recorder.frames().to_vec())?;
        self.recorder.take_frames();
        Ok(id)
    }

    /// Returns analysis, motion and the clock to their idle baseline. Saved
    /// sequences, the selection and the editor pose survive.
    pub fn reset(&mut self) {
        tracing::info!("session reset");
        self.extractor.reset();
        self.solver.reset();
        self.selector.reset();
        self.clock.reset();
        self.last_selection = None;
    }
}
