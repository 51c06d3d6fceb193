//! Per-frame eye-contact decision.
//!
//! Features are first reduced to a [`GazeState`] of boolean checks against
//! the configured thresholds, then a [`ContactPolicy`] combines those checks
//! into the frame's decision. An invalid feature never confirms a check.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::features::{FaceFeatures, HeadDirection};

/// Rule combining the per-frame checks into one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPolicy {
    /// Eyes open and head facing the camera.
    #[default]
    HeadPose,
    /// Eyes open and pupils centered (needs iris landmarks).
    Iris,
    /// Eyes open, facing the camera, eyes symmetric and pupils centered.
    Strict,
}

impl ContactPolicy {
    pub fn decide(self, gaze: &GazeState) -> bool {
        match self {
            ContactPolicy::HeadPose => gaze.eyes_open && gaze.is_facing_camera,
            ContactPolicy::Iris => gaze.eyes_open && gaze.pupils_centered,
            ContactPolicy::Strict => {
                gaze.eyes_open
                    && gaze.is_facing_camera
                    && gaze.eyes_symmetric
                    && gaze.pupils_centered
            }
        }
    }

    pub fn uses_iris(self) -> bool {
        matches!(self, ContactPolicy::Iris | ContactPolicy::Strict)
    }
}

impl std::str::FromStr for ContactPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head_pose" | "head-pose" | "baseline" => Ok(ContactPolicy::HeadPose),
            "iris" => Ok(ContactPolicy::Iris),
            "strict" => Ok(ContactPolicy::Strict),
            other => Err(format!(
                "unknown contact policy '{other}' (expected head_pose, iris or strict)"
            )),
        }
    }
}

/// How the two per-eye pupil checks combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PupilRule {
    #[default]
    Both,
    Either,
}

/// Threshold checks for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GazeState {
    /// Head-angle proxy in radians, when the head landmarks were valid.
    pub head_angle: Option<f32>,
    pub head_direction: HeadDirection,
    pub is_facing_camera: bool,
    pub eyes_open: bool,
    pub eyes_symmetric: bool,
    pub left_pupil_centered: bool,
    pub right_pupil_centered: bool,
    pub pupils_centered: bool,
}

impl GazeState {
    /// Gaze state for a frame without a usable face: every check false.
    pub fn undetected() -> Self {
        Self::default()
    }

    pub fn evaluate(features: &FaceFeatures, config: &EngineConfig) -> Self {
        let (eyes_open, eyes_symmetric) = match features.eyes() {
            Some((l, r)) => (
                l.aspect_ratio > config.eye_open_threshold
                    && r.aspect_ratio > config.eye_open_threshold,
                (l.aspect_ratio - r.aspect_ratio).abs() < config.symmetry_threshold,
            ),
            None => (false, false),
        };

        let (head_angle, head_direction, is_facing_camera) = match &features.head {
            Ok(pose) => (
                Some(pose.angle),
                pose.direction(config.head_angle_threshold),
                pose.is_facing(config.head_angle_threshold),
            ),
            Err(_) => (None, HeadDirection::Center, false),
        };

        let centered = |offset: &Result<f32, _>| {
            offset
                .as_ref()
                .map(|o| *o < config.centering_ratio)
                .unwrap_or(false)
        };
        let left_pupil_centered = centered(&features.left_pupil);
        let right_pupil_centered = centered(&features.right_pupil);
        let pupils_centered = match config.pupil_rule {
            PupilRule::Both => left_pupil_centered && right_pupil_centered,
            PupilRule::Either => left_pupil_centered || right_pupil_centered,
        };

        Self {
            head_angle,
            head_direction,
            is_facing_camera,
            eyes_open,
            eyes_symmetric,
            left_pupil_centered,
            right_pupil_centered,
            pupils_centered,
        }
    }
}

/// Evaluate and decide in one step.
pub fn decide(features: &FaceFeatures, config: &EngineConfig) -> bool {
    config
        .contact_policy
        .decide(&GazeState::evaluate(features, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FaceBuilder;

    fn features(builder: FaceBuilder) -> FaceFeatures {
        FaceFeatures::extract(&builder.build())
    }

    #[test]
    fn test_symmetric_open_eyes_facing_camera() {
        let config = EngineConfig::default();
        assert_eq!(config.eye_open_threshold, 0.2);
        assert_eq!(config.head_angle_threshold, 0.3);
        assert!(decide(&features(FaceBuilder::new().ear(0.3)), &config));
    }

    #[test]
    fn test_closed_eyes_rejected() {
        let config = EngineConfig::default();
        assert!(!decide(&features(FaceBuilder::new().ear(0.1)), &config));
    }

    #[test]
    fn test_one_closed_eye_rejected() {
        let config = EngineConfig::default();
        let f = features(FaceBuilder::new().left_ear(0.3).right_ear(0.1));
        assert!(!decide(&f, &config));
    }

    #[test]
    fn test_turned_head_rejected_by_head_pose_policy() {
        let config = EngineConfig::default();
        let f = features(FaceBuilder::new().head_angle(0.8));
        let gaze = GazeState::evaluate(&f, &config);
        assert!(gaze.eyes_open);
        assert!(!gaze.is_facing_camera);
        assert!(!ContactPolicy::HeadPose.decide(&gaze));
        // The iris policy ignores head angle.
        assert!(ContactPolicy::Iris.decide(&gaze));
    }

    #[test]
    fn test_iris_policy_requires_centered_pupils() {
        let config = EngineConfig {
            contact_policy: ContactPolicy::Iris,
            ..EngineConfig::default()
        };
        assert!(decide(&features(FaceBuilder::new()), &config));
        // 0.05 / 0.1 = 0.5 offset, over the 0.4 ratio.
        assert!(!decide(&features(FaceBuilder::new().iris_shift(0.05)), &config));
    }

    #[test]
    fn test_iris_policy_without_iris_landmarks() {
        let config = EngineConfig {
            contact_policy: ContactPolicy::Iris,
            ..EngineConfig::default()
        };
        assert!(!decide(&features(FaceBuilder::new().without_iris()), &config));
    }

    #[test]
    fn test_either_pupil_rule() {
        // Push only the right iris off-center.
        let mut points = FaceBuilder::new().build().points().to_vec();
        for &i in &crate::landmarks::RIGHT_EYE.iris {
            points[i].x += 0.05;
        }
        let f = FaceFeatures::extract(&crate::landmarks::LandmarkFrame::new(points));

        let mut config = EngineConfig {
            pupil_rule: PupilRule::Either,
            ..EngineConfig::default()
        };
        let gaze = GazeState::evaluate(&f, &config);
        assert!(gaze.left_pupil_centered);
        assert!(!gaze.right_pupil_centered);
        assert!(gaze.pupils_centered);

        config.pupil_rule = PupilRule::Both;
        assert!(!GazeState::evaluate(&f, &config).pupils_centered);
    }

    #[test]
    fn test_strict_policy_requires_symmetry() {
        let config = EngineConfig {
            contact_policy: ContactPolicy::Strict,
            ..EngineConfig::default()
        };
        assert!(decide(&features(FaceBuilder::new()), &config));
        let lopsided = features(FaceBuilder::new().left_ear(0.25).right_ear(0.38));
        assert!(!decide(&lopsided, &config));
    }

    #[test]
    fn test_undetected_gaze_never_decides_true() {
        let gaze = GazeState::undetected();
        for policy in [ContactPolicy::HeadPose, ContactPolicy::Iris, ContactPolicy::Strict] {
            assert!(!policy.decide(&gaze));
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("baseline".parse::<ContactPolicy>(), Ok(ContactPolicy::HeadPose));
        assert_eq!("iris".parse::<ContactPolicy>(), Ok(ContactPolicy::Iris));
        assert!("pupil".parse::<ContactPolicy>().is_err());
    }
}
