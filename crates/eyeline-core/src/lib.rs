//! Eyeline core: per-frame eye-contact scoring from facial landmarks.
//!
//! Landmarks flow one way through two layers:
//!
//! 1. [`features`] turns a [`LandmarkFrame`] into scalar geometry (eye aspect
//!    ratios, head-angle proxy, iris offsets).
//! 2. [`EyeContactEngine`] applies the configured [`ContactPolicy`], smooths
//!    decisions over a [`ContactHistory`], times the current streak and counts
//!    blinks, producing one [`FrameResult`] per frame.
//!
//! Landmark detection, capture and rendering live outside this crate.

pub mod blink;
pub mod config;
pub mod engine;
pub mod features;
pub mod history;
pub mod landmarks;
pub mod placement;
pub mod policy;
pub mod scoring;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timer;

pub use blink::{BlinkDetector, BlinkPhase, BlinkSignal};
pub use config::{ConfigError, EngineConfig};
pub use engine::{EyeContactEngine, FrameResult, RawFeatures, SessionSummary};
pub use features::{EyeGeometry, FaceFeatures, FeatureError, HeadDirection, HeadPose};
pub use history::ContactHistory;
pub use landmarks::{LandmarkFrame, Point};
pub use policy::{decide, ContactPolicy, GazeState, PupilRule};
pub use scoring::{BlendWeights, ConfidencePolicy, PenaltyWeights};
pub use timer::{CaptureClock, ContactTimer};
