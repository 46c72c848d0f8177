//! Core library for the Audio Puppet application.
//!
//! A live audio stream is turned into motion of an eleven-joint figure. Each
//! host tick flows through three stages owned by a [`Session`]:
//! the [`FeatureExtractor`] condenses analyser buffers into a
//! [`FeatureFrame`], the [`PoseSelector`] picks a [`TargetPose`] for the
//! active [`MotionMode`], and the [`JointSolver`] integrates spring-damper
//! dynamics towards it under per-joint limits.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod figure;
pub mod mapping;
pub mod motion;
pub mod pose;
pub mod record;
pub mod session;
pub mod timeline;

pub use analysis::{
    AnalysisSummary, Bands, BeatDetector, BeatDetectorState, FeatureExtractor, FeatureFrame,
    FeatureKind,
};
pub use audio::{SpectrumAnalyser, TestSignal};
pub use config::{AnalysisConfig, AppConfig, AudioConfig, BeatConfig, MotionConfig, SpringParams};
pub use error::{PuppetError, Result};
pub use figure::FigureStyle;
pub use mapping::{MotionChannel, MotionMapping};
pub use motion::{JointId, JointLimits, JointSolver, JointState, JointStates, MotionMode};
pub use pose::{PoseLibrary, PoseSelector, Selection, Sequence, TargetPose};
pub use record::Recorder;
pub use session::{Session, TickOutput};
pub use timeline::PlaybackClock;
