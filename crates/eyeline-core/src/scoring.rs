//! Confidence scoring policies.
//!
//! An engine reports exactly one kind of confidence, chosen at construction:
//! the smoothed ratio of positive decisions in the history window (`[0, 1]`),
//! an instantaneous additive-penalty score (`[0, 100]`), or a blend of face
//! placement and the frame decision (`[0, 1]`).

use serde::{Deserialize, Serialize};

use crate::features::{FaceFeatures, HeadDirection};
use crate::policy::GazeState;

pub const PENALTY_SCORE_MAX: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidencePolicy {
    /// Fraction of positive decisions in the history window, `[0, 1]`.
    #[default]
    Ratio,
    /// 100 minus the configured penalties, clamped to `[0, 100]`.
    Penalty,
    /// Weighted face centering plus the frame decision, damped on blinks, `[0, 1]`.
    Blended,
}

impl ConfidencePolicy {
    pub fn max(self) -> f32 {
        match self {
            ConfidencePolicy::Ratio | ConfidencePolicy::Blended => 1.0,
            ConfidencePolicy::Penalty => PENALTY_SCORE_MAX,
        }
    }
}

impl std::str::FromStr for ConfidencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ratio" => Ok(ConfidencePolicy::Ratio),
            "penalty" => Ok(ConfidencePolicy::Penalty),
            "blended" => Ok(ConfidencePolicy::Blended),
            other => Err(format!(
                "unknown confidence policy '{other}' (expected ratio, penalty or blended)"
            )),
        }
    }
}

/// Penalty magnitudes and the extra thresholds only the penalty policy uses.
///
/// The defaults are illustrative, not calibrated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    /// Applied when the mean EAR is at or below the eye-open threshold, or
    /// when the eyes could not be measured.
    pub eyes_closed: f32,
    /// Applied when the mean EAR exceeds `wide_eye_threshold`.
    pub eyes_wide: f32,
    pub wide_eye_threshold: f32,
    /// Applied when the EAR difference reaches the symmetry threshold.
    pub asymmetric: f32,
    pub head_down: f32,
    pub head_up: f32,
    pub head_side: f32,
    /// Applied when the pupils are not centered. Skipped when no iris landmarks exist.
    pub pupils_off_center: f32,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            eyes_closed: 40.0,
            eyes_wide: 15.0,
            wide_eye_threshold: 0.35,
            asymmetric: 10.0,
            head_down: 30.0,
            head_up: 25.0,
            head_side: 30.0,
            pupils_off_center: 15.0,
        }
    }
}

impl PenaltyWeights {
    pub fn is_valid(&self) -> bool {
        [
            self.eyes_closed,
            self.eyes_wide,
            self.wide_eye_threshold,
            self.asymmetric,
            self.head_down,
            self.head_up,
            self.head_side,
            self.pupils_off_center,
        ]
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0)
    }

    /// Score one frame. Missing eye or head landmarks incur the matching penalty.
    ///
    /// Eye openness is judged on the mean EAR of both eyes against
    /// `eye_open_threshold`; a single shut eye shows up as asymmetry instead.
    pub fn score(&self, features: &FaceFeatures, gaze: &GazeState, eye_open_threshold: f32) -> f32 {
        let mut score = PENALTY_SCORE_MAX;

        match features.mean_aspect_ratio() {
            Some(ear) if ear <= eye_open_threshold => score -= self.eyes_closed,
            Some(ear) if ear > self.wide_eye_threshold => score -= self.eyes_wide,
            Some(_) => {}
            None => score -= self.eyes_closed,
        }

        if features.eyes().is_some() && !gaze.eyes_symmetric {
            score -= self.asymmetric;
        }

        if features.head.is_err() {
            score -= self.head_side;
        } else {
            score -= match gaze.head_direction {
                HeadDirection::Center => 0.0,
                HeadDirection::Down => self.head_down,
                HeadDirection::Up => self.head_up,
                HeadDirection::Side => self.head_side,
            };
        }

        let has_iris = features.left_pupil.is_ok() || features.right_pupil.is_ok();
        if has_iris && !gaze.pupils_centered {
            score -= self.pupils_off_center;
        }

        score.clamp(0.0, PENALTY_SCORE_MAX)
    }
}

/// Weights for [`ConfidencePolicy::Blended`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    /// Weight of the face-centering term.
    pub face: f32,
    /// Weight of the eye-contact term (1 on a positive decision, else 0).
    pub contact: f32,
    /// Multiplier on the eye-contact term for a frame that counted a blink.
    pub blink_factor: f32,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            face: 0.4,
            contact: 0.6,
            blink_factor: 0.5,
        }
    }
}

impl BlendWeights {
    /// Weights must be non-negative, sum to at most 1, and the blink factor
    /// must lie in `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        let finite = [self.face, self.contact, self.blink_factor]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0);
        finite && self.face + self.contact <= 1.0 + f32::EPSILON && self.blink_factor <= 1.0
    }

    pub fn score(&self, face_centering: f32, is_eye_contact: bool, blink_detected: bool) -> f32 {
        let mut contact = if is_eye_contact { 1.0 } else { 0.0 };
        if blink_detected {
            contact *= self.blink_factor;
        }
        (self.face * face_centering.clamp(0.0, 1.0) + self.contact * contact).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::testing::FaceBuilder;

    fn score(builder: FaceBuilder) -> f32 {
        let config = EngineConfig::default();
        let features = FaceFeatures::extract(&builder.build());
        let gaze = GazeState::evaluate(&features, &config);
        PenaltyWeights::default().score(&features, &gaze, config.eye_open_threshold)
    }

    #[test]
    fn test_ideal_face_scores_full() {
        assert_eq!(score(FaceBuilder::new()), 100.0);
    }

    #[test]
    fn test_closed_eyes_penalised() {
        assert_eq!(score(FaceBuilder::new().ear(0.1)), 60.0);
    }

    #[test]
    fn test_wide_eyes_penalised() {
        assert_eq!(score(FaceBuilder::new().ear(0.4)), 85.0);
    }

    #[test]
    fn test_asymmetric_eyes_penalised() {
        assert_eq!(score(FaceBuilder::new().left_ear(0.25).right_ear(0.32)), 90.0);
    }

    #[test]
    fn test_head_direction_penalties_are_distinct() {
        let down = score(FaceBuilder::new().head_angle(std::f32::consts::FRAC_PI_2));
        let up = score(FaceBuilder::new().head_angle(-std::f32::consts::FRAC_PI_2));
        let side = score(FaceBuilder::new().head_angle(std::f32::consts::PI));
        assert_eq!(down, 70.0);
        assert_eq!(up, 75.0);
        assert_eq!(side, 70.0);
    }

    #[test]
    fn test_off_center_pupils_penalised() {
        assert_eq!(score(FaceBuilder::new().iris_shift(0.05)), 85.0);
    }

    #[test]
    fn test_missing_iris_not_penalised() {
        assert_eq!(score(FaceBuilder::new().without_iris()), 100.0);
    }

    #[test]
    fn test_score_clamped_at_zero() {
        let weights = PenaltyWeights {
            eyes_closed: 80.0,
            head_side: 80.0,
            ..PenaltyWeights::default()
        };
        let config = EngineConfig::default();
        let features =
            FaceFeatures::extract(&FaceBuilder::new().ear(0.05).head_angle(3.0).build());
        let gaze = GazeState::evaluate(&features, &config);
        assert_eq!(weights.score(&features, &gaze, config.eye_open_threshold), 0.0);
    }

    #[test]
    fn test_closed_eye_judged_on_mean_aspect_ratio() {
        // Mean EAR 0.25 is open; the 0.3 difference only costs the asymmetry penalty.
        assert_eq!(score(FaceBuilder::new().left_ear(0.1).right_ear(0.4)), 90.0);
        // Mean EAR 0.375 is wide, plus asymmetry.
        assert_eq!(score(FaceBuilder::new().left_ear(0.05).right_ear(0.7)), 75.0);
        // Mean EAR 0.15 is closed, plus asymmetry.
        assert_eq!(score(FaceBuilder::new().left_ear(0.05).right_ear(0.25)), 50.0);
    }

    #[test]
    fn test_missing_eyes_penalised_as_closed() {
        let weights = PenaltyWeights::default();
        let config = EngineConfig::default();
        let mut features = FaceFeatures::extract(&FaceBuilder::new().build());
        features.left = Err(crate::features::FeatureError::MissingLandmark { index: 33, len: 0 });
        let gaze = GazeState::evaluate(&features, &config);
        // Closed 40; the pupils remain centered and the head faces the camera.
        assert_eq!(weights.score(&features, &gaze, config.eye_open_threshold), 60.0);
    }

    #[test]
    fn test_blended_score() {
        let blend = BlendWeights::default();
        assert!((blend.score(1.0, true, false) - 1.0).abs() < 1e-6);
        assert!((blend.score(1.0, false, false) - 0.4).abs() < 1e-6);
        assert!((blend.score(0.5, true, false) - 0.8).abs() < 1e-6);
        // A counted blink halves the contact term: 0.4 + 0.3.
        assert!((blend.score(1.0, true, true) - 0.7).abs() < 1e-6);
        assert_eq!(blend.score(0.0, false, true), 0.0);
    }

    #[test]
    fn test_blended_score_clamps_centering() {
        let blend = BlendWeights::default();
        assert!(blend.score(3.0, true, false) <= 1.0);
        assert!(blend.score(-2.0, false, false) >= 0.0);
    }

    #[test]
    fn test_blend_weights_validation() {
        assert!(BlendWeights::default().is_valid());
        let heavy = BlendWeights {
            face: 0.7,
            contact: 0.6,
            ..BlendWeights::default()
        };
        assert!(!heavy.is_valid());
        let amplifying = BlendWeights {
            blink_factor: 1.5,
            ..BlendWeights::default()
        };
        assert!(!amplifying.is_valid());
    }

    #[test]
    fn test_blended_policy_parses() {
        assert_eq!("blended".parse::<ConfidencePolicy>(), Ok(ConfidencePolicy::Blended));
        assert_eq!(ConfidencePolicy::Blended.max(), 1.0);
    }

    #[test]
    fn test_negative_weight_invalid() {
        let weights = PenaltyWeights {
            head_up: -1.0,
            ..PenaltyWeights::default()
        };
        assert!(!weights.is_valid());
        assert!(PenaltyWeights::default().is_valid());
    }
}
