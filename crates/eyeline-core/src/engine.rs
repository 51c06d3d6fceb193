//! Per-stream eye-contact engine.
//!
//! One [`EyeContactEngine`] owns all temporal state for one video stream: the
//! decision history, the streak timer, the blink detector and the head
//! stability window. Engines are never shared between streams; create one per
//! stream.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::blink::BlinkDetector;
use crate::config::{ConfigError, EngineConfig};
use crate::features::{FaceFeatures, HeadDirection};
use crate::history::ContactHistory;
use crate::landmarks::LandmarkFrame;
use crate::placement::{face_centering, face_scale, StabilityTracker};
use crate::policy::GazeState;
use crate::scoring::ConfidencePolicy;
use crate::timer::ContactTimer;

/// Geometric intermediates for one frame, for overlays and diagnostics.
///
/// `None` marks a feature whose landmarks were missing or invalid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeatures {
    pub left_ear: Option<f32>,
    pub right_ear: Option<f32>,
    pub head_angle: Option<f32>,
    pub left_pupil_offset: Option<f32>,
    pub right_pupil_offset: Option<f32>,
    pub face_centering: Option<f32>,
    pub face_scale: Option<f32>,
    /// Mean nose displacement over the stability window.
    pub head_motion: Option<f32>,
}

/// Output of one [`EyeContactEngine::process`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub is_eye_contact: bool,
    /// `[0, 100]` under the penalty policy, `[0, 1]` under the others.
    pub confidence: f32,
    /// Length of the current unbroken eye-contact streak.
    pub duration_secs: f64,
    pub blink_count: u32,
    pub head_direction: HeadDirection,
    pub face_detected: bool,
    /// A blink was counted on this frame.
    pub blink_detected: bool,
    pub features: RawFeatures,
}

/// Whole-session counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub face_frames: u64,
    pub contact_frames: u64,
    pub longest_streak_secs: f64,
    pub blink_count: u32,
    /// `contact_frames / frames`, 0 before the first frame.
    pub contact_ratio: f64,
}

pub struct EyeContactEngine {
    config: EngineConfig,
    history: ContactHistory,
    timer: ContactTimer,
    blink: BlinkDetector,
    stability: StabilityTracker,

    frames: u64,
    face_frames: u64,
    contact_frames: u64,
    longest_streak: Duration,
    face_present: bool,
    last: Option<FrameResult>,
}

impl EyeContactEngine {
    /// Validate `config` and build a fresh engine.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            history: ContactHistory::new(config.history_len),
            timer: ContactTimer::new(),
            blink: BlinkDetector::from_config(&config),
            stability: StabilityTracker::new(config.stability_window),
            frames: 0,
            face_frames: 0,
            contact_frames: 0,
            longest_streak: Duration::ZERO,
            face_present: false,
            last: None,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process one frame stamped with the current time.
    pub fn process(&mut self, frame: Option<&LandmarkFrame>) -> FrameResult {
        self.process_at(frame, Instant::now())
    }

    /// Process one frame stamped with `now`. Timestamps must not go backwards
    /// for streak durations to be meaningful.
    pub fn process_at(&mut self, frame: Option<&LandmarkFrame>, now: Instant) -> FrameResult {
        self.frames += 1;

        let face = frame
            .filter(|f| !f.is_empty())
            .map(|f| (f, FaceFeatures::extract(f)))
            .filter(|(_, features)| features.is_usable());
        self.note_face_presence(face.is_some());

        let result = match face {
            Some((frame, features)) => self.process_face(frame, features, now),
            None => self.process_no_face(),
        };

        if result.is_eye_contact {
            self.contact_frames += 1;
        }
        tracing::trace!(
            frame = self.frames,
            contact = result.is_eye_contact,
            confidence = result.confidence,
            duration_secs = result.duration_secs,
            "frame processed"
        );

        self.last = Some(result.clone());
        result
    }

    fn process_face(
        &mut self,
        frame: &LandmarkFrame,
        features: FaceFeatures,
        now: Instant,
    ) -> FrameResult {
        self.face_frames += 1;

        let gaze = GazeState::evaluate(&features, &self.config);
        let decision = self.config.contact_policy.decide(&gaze);

        self.history.push(decision);
        let duration = self.track_streak(decision, now);

        let blink_detected = match features.eyes() {
            Some((left, right)) => self.blink.observe(left, right),
            None => false,
        };

        if let Ok(nose) = frame.point(crate::landmarks::NOSE_TIP) {
            self.stability.push(nose);
        }

        let centering = face_centering(frame).ok();
        let confidence = match self.config.confidence_policy {
            ConfidencePolicy::Ratio => self.history.ratio(),
            ConfidencePolicy::Penalty => {
                self.config
                    .penalties
                    .score(&features, &gaze, self.config.eye_open_threshold)
            }
            ConfidencePolicy::Blended => {
                self.config
                    .blend
                    .score(centering.unwrap_or(0.0), decision, blink_detected)
            }
        };

        FrameResult {
            is_eye_contact: decision,
            confidence,
            duration_secs: duration.as_secs_f64(),
            blink_count: self.blink.blink_count(),
            head_direction: gaze.head_direction,
            face_detected: true,
            blink_detected,
            features: RawFeatures {
                left_ear: features.left.as_ref().ok().map(|e| e.aspect_ratio),
                right_ear: features.right.as_ref().ok().map(|e| e.aspect_ratio),
                head_angle: gaze.head_angle,
                left_pupil_offset: features.left_pupil.ok(),
                right_pupil_offset: features.right_pupil.ok(),
                face_centering: centering,
                face_scale: face_scale(frame).ok(),
                head_motion: self.stability.mean_displacement(),
            },
        }
    }

    /// No usable face: record a negative decision, end any streak, leave the blink
    /// detector untouched.
    fn process_no_face(&mut self) -> FrameResult {
        self.history.push(false);
        if self.timer.is_active() {
            tracing::debug!("eye contact streak ended (no face)");
        }
        self.timer.reset();
        self.stability.clear();

        let confidence = match self.config.confidence_policy {
            ConfidencePolicy::Ratio => self.history.ratio(),
            ConfidencePolicy::Penalty | ConfidencePolicy::Blended => 0.0,
        };

        FrameResult {
            is_eye_contact: false,
            confidence,
            duration_secs: 0.0,
            blink_count: self.blink.blink_count(),
            head_direction: HeadDirection::Center,
            face_detected: false,
            blink_detected: false,
            features: RawFeatures::default(),
        }
    }

    fn track_streak(&mut self, decision: bool, now: Instant) -> Duration {
        let was_active = self.timer.is_active();
        let duration = self.timer.update(decision, now);
        if decision && !was_active {
            tracing::debug!("eye contact streak started");
        } else if !decision && was_active {
            tracing::debug!(
                longest_secs = self.longest_streak.as_secs_f64(),
                "eye contact streak ended"
            );
        }
        self.longest_streak = self.longest_streak.max(duration);
        duration
    }

    fn note_face_presence(&mut self, present: bool) {
        if present != self.face_present {
            if present {
                tracing::debug!(frame = self.frames, "face acquired");
            } else {
                tracing::debug!(frame = self.frames, "face lost");
            }
            self.face_present = present;
        }
    }

    /// The most recent frame result, if any frame has been processed.
    pub fn last_result(&self) -> Option<&FrameResult> {
        self.last.as_ref()
    }

    pub fn history(&self) -> &ContactHistory {
        &self.history
    }

    pub fn blink_detector(&self) -> &BlinkDetector {
        &self.blink
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            frames: self.frames,
            face_frames: self.face_frames,
            contact_frames: self.contact_frames,
            longest_streak_secs: self.longest_streak.as_secs_f64(),
            blink_count: self.blink.blink_count(),
            contact_ratio: if self.frames == 0 {
                0.0
            } else {
                self.contact_frames as f64 / self.frames as f64
            },
        }
    }

    /// Drop all temporal state, keeping the configuration.
    pub fn reset(&mut self) {
        self.history.clear();
        self.timer.reset();
        self.blink.reset();
        self.stability.clear();
        self.frames = 0;
        self.face_frames = 0;
        self.contact_frames = 0;
        self.longest_streak = Duration::ZERO;
        self.face_present = false;
        self.last = None;
    }
}
