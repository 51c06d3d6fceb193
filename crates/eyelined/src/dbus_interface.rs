use std::sync::Arc;

use eyeline_core::{LandmarkFrame, Point};
use serde::Serialize;
use tokio::sync::Mutex;
use zbus::interface;

use crate::config::Config;
use crate::registry::{RegistryError, SessionRegistry};
use crate::session::SessionHandle;

/// Frames larger than this are rejected before they reach an engine.
pub const MAX_LANDMARKS: usize = 1024;

/// Shared state accessible by D-Bus method handlers.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionRegistry,
}

/// D-Bus interface for the Eyeline scoring daemon.
///
/// Bus name: org.freedesktop.Eyeline1
/// Object path: /org/freedesktop/Eyeline1
pub struct EyelineService {
    pub state: Arc<Mutex<AppState>>,
}

impl EyelineService {
    pub fn new(config: Config) -> Self {
        let sessions = SessionRegistry::new(config.max_sessions);
        Self {
            state: Arc::new(Mutex::new(AppState { config, sessions })),
        }
    }

    async fn session(&self, session_id: &str) -> zbus::fdo::Result<SessionHandle> {
        let state = self.state.lock().await;
        state.sessions.get(session_id).ok_or_else(|| {
            zbus::fdo::Error::InvalidArgs(format!("unknown session: {session_id}"))
        })
    }
}

/// An empty landmark array means the detector found no face.
fn landmark_frame(landmarks: Vec<(f64, f64)>) -> zbus::fdo::Result<Option<LandmarkFrame>> {
    if landmarks.len() > MAX_LANDMARKS {
        return Err(zbus::fdo::Error::InvalidArgs(format!(
            "too many landmarks: {} (max {MAX_LANDMARKS})",
            landmarks.len()
        )));
    }
    if landmarks.is_empty() {
        return Ok(None);
    }
    let points = landmarks
        .into_iter()
        .map(|(x, y)| Point::new(x as f32, y as f32))
        .collect();
    Ok(Some(LandmarkFrame::new(points)))
}

fn to_json<T: Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

fn failed(e: impl std::fmt::Display) -> zbus::fdo::Error {
    tracing::error!(error = %e, "session request failed");
    zbus::fdo::Error::Failed(e.to_string())
}

#[interface(name = "org.freedesktop.Eyeline1")]
impl EyelineService {
    /// Open a new scoring session. Returns its UUID.
    async fn open_session(&self) -> zbus::fdo::Result<String> {
        let mut state = self.state.lock().await;
        let engine_config = state.config.engine.clone();
        match state.sessions.open(engine_config) {
            Ok(id) => {
                tracing::info!(session = %id, open = state.sessions.len(), "session opened");
                Ok(id)
            }
            Err(RegistryError::Full { max }) => {
                tracing::warn!(max, "session limit reached");
                Err(zbus::fdo::Error::LimitsExceeded(format!(
                    "session limit reached ({max} open)"
                )))
            }
            Err(e) => Err(failed(e)),
        }
    }

    /// Score one frame of landmarks. Returns the frame result as JSON.
    async fn submit_frame(
        &self,
        session_id: &str,
        landmarks: Vec<(f64, f64)>,
    ) -> zbus::fdo::Result<String> {
        let frame = landmark_frame(landmarks)?;
        // Release the lock before waiting on the engine thread
        let session = self.session(session_id).await?;
        let result = session.process(frame).await.map_err(failed)?;
        to_json(&result)
    }

    /// Like `SubmitFrame`, timed by the client's capture timestamp `t_ms`
    /// (milliseconds on any monotonic clock) instead of arrival time.
    async fn submit_frame_at(
        &self,
        session_id: &str,
        t_ms: u64,
        landmarks: Vec<(f64, f64)>,
    ) -> zbus::fdo::Result<String> {
        let frame = landmark_frame(landmarks)?;
        let session = self.session(session_id).await?;
        let result = session
            .process_captured(frame, t_ms)
            .await
            .map_err(failed)?;
        to_json(&result)
    }

    /// Most recent frame result as JSON, or an empty string before the first frame.
    async fn latest(&self, session_id: &str) -> zbus::fdo::Result<String> {
        let session = self.session(session_id).await?;
        match session.latest().await.map_err(failed)? {
            Some(result) => to_json(&result),
            None => Ok(String::new()),
        }
    }

    async fn summary(&self, session_id: &str) -> zbus::fdo::Result<String> {
        let session = self.session(session_id).await?;
        let summary = session.summary().await.map_err(failed)?;
        to_json(&summary)
    }

    /// Clear a session's history, timer, blink state and summary.
    async fn reset_session(&self, session_id: &str) -> zbus::fdo::Result<()> {
        let session = self.session(session_id).await?;
        session.reset().await.map_err(failed)
    }

    /// Close a session. Returns false if it was not open.
    async fn close_session(&self, session_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let closed = state.sessions.close(session_id);
        if closed {
            tracing::info!(session = %session_id, "session closed");
        }
        closed
    }

    /// Daemon status as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let state = self.state.lock().await;
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "contact_policy": state.config.engine.contact_policy,
            "confidence_policy": state.config.engine.confidence_policy,
            "max_sessions": state.sessions.max_sessions(),
            "sessions": state.sessions.list(),
        });
        Ok(status.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyeline_core::testing::FaceBuilder;
    use eyeline_core::{EngineConfig, FrameResult, SessionSummary};

    fn service(max_sessions: usize) -> EyelineService {
        EyelineService::new(Config {
            engine: EngineConfig::default(),
            config_path: None,
            max_sessions,
            session_bus: true,
        })
    }

    fn wire(frame: &LandmarkFrame) -> Vec<(f64, f64)> {
        frame
            .points()
            .iter()
            .map(|p| (p.x as f64, p.y as f64))
            .collect()
    }

    #[test]
    fn test_empty_landmarks_mean_no_face() {
        assert!(landmark_frame(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let landmarks = vec![(0.5, 0.5); MAX_LANDMARKS + 1];
        assert!(matches!(
            landmark_frame(landmarks),
            Err(zbus::fdo::Error::InvalidArgs(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_frame_round_trip() {
        let service = service(2);
        let id = service.open_session().await.unwrap();

        let json = service
            .submit_frame(&id, wire(&FaceBuilder::new().build()))
            .await
            .unwrap();
        let result: FrameResult = serde_json::from_str(&json).unwrap();
        assert!(result.face_detected);
        assert!(result.is_eye_contact);

        let json = service.submit_frame(&id, Vec::new()).await.unwrap();
        let result: FrameResult = serde_json::from_str(&json).unwrap();
        assert!(!result.face_detected);

        let summary: SessionSummary =
            serde_json::from_str(&service.summary(&id).await.unwrap()).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.face_frames, 1);
    }

    #[tokio::test]
    async fn test_submit_frame_at_uses_capture_time() {
        let service = service(1);
        let id = service.open_session().await.unwrap();
        let face = wire(&FaceBuilder::new().build());

        service.submit_frame_at(&id, 0, face.clone()).await.unwrap();
        let json = service.submit_frame_at(&id, 2_000, face).await.unwrap();
        let result: FrameResult = serde_json::from_str(&json).unwrap();
        assert!((result.duration_secs - 2.0).abs() < 1e-6);

        let json = service.submit_frame_at(&id, 2_033, Vec::new()).await.unwrap();
        let result: FrameResult = serde_json::from_str(&json).unwrap();
        assert!(!result.face_detected);
        assert_eq!(result.duration_secs, 0.0);
    }

    #[tokio::test]
    async fn test_latest_before_first_frame_is_empty() {
        let service = service(2);
        let id = service.open_session().await.unwrap();
        assert_eq!(service.latest(&id).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let service = service(2);
        assert!(matches!(
            service.summary("missing").await,
            Err(zbus::fdo::Error::InvalidArgs(_))
        ));
        assert!(!service.close_session("missing").await);
    }

    #[tokio::test]
    async fn test_session_limit() {
        let service = service(1);
        let id = service.open_session().await.unwrap();
        assert!(matches!(
            service.open_session().await,
            Err(zbus::fdo::Error::LimitsExceeded(_))
        ));
        assert!(service.close_session(&id).await);
        assert!(service.open_session().await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_session() {
        let service = service(1);
        let id = service.open_session().await.unwrap();
        service
            .submit_frame(&id, wire(&FaceBuilder::new().build()))
            .await
            .unwrap();
        service.reset_session(&id).await.unwrap();
        assert_eq!(service.latest(&id).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_status_lists_sessions() {
        let service = service(3);
        let id = service.open_session().await.unwrap();
        let status: serde_json::Value =
            serde_json::from_str(&service.status().await.unwrap()).unwrap();
        assert_eq!(status["max_sessions"], 3);
        assert_eq!(status["contact_policy"], "head_pose");
        assert_eq!(status["sessions"][0]["id"], id.as_str());
    }
}
