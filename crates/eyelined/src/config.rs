use std::path::PathBuf;

use eyeline_core::{ConfigError, EngineConfig};

/// Default upper bound on concurrently open sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 8;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine tuning applied to every new session.
    pub engine: EngineConfig,
    /// TOML file the engine config was read from, if any.
    pub config_path: Option<PathBuf>,
    /// Maximum number of sessions open at once.
    pub max_sessions: usize,
    /// Whether the daemon is running on the session bus (development mode).
    pub session_bus: bool,
}

impl Config {
    /// Load configuration from `EYELINE_*` environment variables with defaults.
    ///
    /// `EYELINE_CONFIG` names a TOML file for the engine; individual
    /// `EYELINE_*` variables then override single fields of it.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config_path = var("EYELINE_CONFIG").map(PathBuf::from);
        let mut engine = match &config_path {
            Some(path) => EngineConfig::from_toml_file(path)?,
            None => EngineConfig::default(),
        };

        engine.history_len = parse_or(&var, "EYELINE_HISTORY_LEN", engine.history_len);
        engine.eye_open_threshold =
            parse_or(&var, "EYELINE_EYE_OPEN_THRESHOLD", engine.eye_open_threshold);
        engine.head_angle_threshold =
            parse_or(&var, "EYELINE_HEAD_ANGLE_THRESHOLD", engine.head_angle_threshold);
        engine.centering_ratio = parse_or(&var, "EYELINE_CENTERING_RATIO", engine.centering_ratio);
        engine.blink_closure_threshold = parse_or(
            &var,
            "EYELINE_BLINK_CLOSURE_THRESHOLD",
            engine.blink_closure_threshold,
        );
        engine.blink_cooldown_frames = parse_or(
            &var,
            "EYELINE_BLINK_COOLDOWN_FRAMES",
            engine.blink_cooldown_frames,
        );
        engine.contact_policy = parse_or(&var, "EYELINE_CONTACT_POLICY", engine.contact_policy);
        engine.confidence_policy =
            parse_or(&var, "EYELINE_CONFIDENCE_POLICY", engine.confidence_policy);
        engine.validate()?;

        Ok(Self {
            engine,
            config_path,
            max_sessions: parse_or(&var, "EYELINE_MAX_SESSIONS", DEFAULT_MAX_SESSIONS).max(1),
            session_bus: var("EYELINE_SESSION_BUS").is_some(),
        })
    }
}

/// Parse `key` if set and well-formed, otherwise keep `default`.
fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match var(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
                default
            }
        },
        None => default,
    }
}
