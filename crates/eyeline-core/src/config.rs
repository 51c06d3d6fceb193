use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blink::BlinkSignal;
use crate::placement::DEFAULT_STABILITY_WINDOW;
use crate::policy::{ContactPolicy, PupilRule};
use crate::scoring::{BlendWeights, ConfidencePolicy, PenaltyWeights};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("history_len must be at least 1")]
    EmptyHistory,
    #[error("blink_window_frames must be at least 1")]
    EmptyBlinkWindow,
    #[error("{field} must be a positive finite number (got {value})")]
    InvalidThreshold { field: &'static str, value: f32 },
    #[error("penalty weights must be non-negative finite numbers")]
    InvalidPenalties,
    #[error("blend weights must be non-negative, sum to at most 1, with blink_factor in [0, 1]")]
    InvalidBlend,
    #[error("failed to read config file: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine tuning. Every field has a default; partial TOML files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of recent decisions kept for the smoothed ratio.
    pub history_len: usize,
    /// Both EARs must exceed this for the eyes to count as open.
    pub eye_open_threshold: f32,
    /// Maximum |head angle| (radians) still counted as facing the camera.
    pub head_angle_threshold: f32,
    /// Maximum EAR difference still counted as symmetric.
    pub symmetry_threshold: f32,
    /// Maximum iris offset, as a fraction of eye width, still counted as centered.
    pub centering_ratio: f32,
    pub pupil_rule: PupilRule,
    pub contact_policy: ContactPolicy,
    pub blink_signal: BlinkSignal,
    /// Signal value below which an eye reads closed.
    pub blink_closure_threshold: f32,
    /// Consecutive closed frames needed for a blink.
    pub blink_window_frames: usize,
    /// Minimum number of detector updates between two counted blinks.
    pub blink_cooldown_frames: u32,
    /// Nose positions kept for the head-stability estimate.
    pub stability_window: usize,
    pub confidence_policy: ConfidencePolicy,
    /// Only read under [`ConfidencePolicy::Penalty`].
    pub penalties: PenaltyWeights,
    /// Only read under [`ConfidencePolicy::Blended`].
    pub blend: BlendWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_len: 10,
            eye_open_threshold: 0.2,
            head_angle_threshold: 0.3,
            symmetry_threshold: 0.05,
            centering_ratio: 0.4,
            pupil_rule: PupilRule::Both,
            contact_policy: ContactPolicy::HeadPose,
            blink_signal: BlinkSignal::LidGap,
            blink_closure_threshold: 0.02,
            blink_window_frames: 3,
            blink_cooldown_frames: 30,
            stability_window: DEFAULT_STABILITY_WINDOW,
            confidence_policy: ConfidencePolicy::Ratio,
            penalties: PenaltyWeights::default(),
            blend: BlendWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Reject values that would make per-frame processing meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_len == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        if self.blink_window_frames == 0 {
            return Err(ConfigError::EmptyBlinkWindow);
        }

        let thresholds = [
            ("eye_open_threshold", self.eye_open_threshold),
            ("head_angle_threshold", self.head_angle_threshold),
            ("symmetry_threshold", self.symmetry_threshold),
            ("centering_ratio", self.centering_ratio),
            ("blink_closure_threshold", self.blink_closure_threshold),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidThreshold { field, value });
            }
        }

        if !self.penalties.is_valid() {
            return Err(ConfigError::InvalidPenalties);
        }
        if !self.blend.is_valid() {
            return Err(ConfigError::InvalidBlend);
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_zero_history_rejected() {
        let config = EngineConfig {
            history_len: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyHistory)));
    }

    #[test]
    fn test_zero_blink_window_rejected() {
        let config = EngineConfig {
            blink_window_frames: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyBlinkWindow)));
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let config = EngineConfig {
            head_angle_threshold: -0.1,
            ..EngineConfig::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidThreshold { field, .. }) => {
                assert_eq!(field, "head_angle_threshold")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let config = EngineConfig {
            centering_ratio: f32::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            history_len = 30
            contact_policy = "iris"
            confidence_policy = "penalty"

            [penalties]
            head_down = 35.0
            "#,
        )
        .unwrap();
        assert_eq!(config.history_len, 30);
        assert_eq!(config.contact_policy, ContactPolicy::Iris);
        assert_eq!(config.confidence_policy, ConfidencePolicy::Penalty);
        assert_eq!(config.penalties.head_down, 35.0);
        assert_eq!(config.penalties.head_up, 25.0);
        assert_eq!(config.eye_open_threshold, 0.2);
    }

    #[test]
    fn test_blend_table_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            confidence_policy = "blended"

            [blend]
            face = 0.3
            contact = 0.7
            "#,
        )
        .unwrap();
        assert_eq!(config.confidence_policy, ConfidencePolicy::Blended);
        assert_eq!(config.blend.face, 0.3);
        assert_eq!(config.blend.contact, 0.7);
        assert_eq!(config.blend.blink_factor, 0.5);
    }

    #[test]
    fn test_overweight_blend_rejected() {
        let err = EngineConfig::from_toml_str("[blend]\nface = 0.9\ncontact = 0.9").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBlend));
    }

    #[test]
    fn test_invalid_toml_value_rejected_at_load() {
        let err = EngineConfig::from_toml_str("history_len = 0").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyHistory));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = EngineConfig::from_toml_str(r#"contact_policy = "psychic""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_reported() {
        let path = std::env::temp_dir().join("eyeline-config-test-does-not-exist.toml");
        let err = EngineConfig::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = EngineConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }
}
