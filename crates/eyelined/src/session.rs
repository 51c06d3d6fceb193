use std::time::Instant;

use eyeline_core::{
    CaptureClock, ConfigError, EngineConfig, EyeContactEngine, FrameResult, LandmarkFrame,
    SessionSummary,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn session thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("session thread exited")]
    ChannelClosed,
}

/// When a frame happened.
#[derive(Debug, Clone, Copy)]
enum FrameTime {
    /// No client timestamp: the time the request arrived.
    Received(Instant),
    /// Client capture timestamp in milliseconds.
    Captured(u64),
}

/// Messages sent from D-Bus handlers to a session thread.
enum SessionRequest {
    Process {
        frame: Option<LandmarkFrame>,
        time: FrameTime,
        reply: oneshot::Sender<FrameResult>,
    },
    Latest {
        reply: oneshot::Sender<Option<FrameResult>>,
    },
    Summary {
        reply: oneshot::Sender<SessionSummary>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

/// Clone-safe handle to one session's engine thread.
///
/// The thread exits once every handle has been dropped.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    /// Score one frame timed on arrival. `None` means the detector found no face.
    pub async fn process(&self, frame: Option<LandmarkFrame>) -> Result<FrameResult, SessionError> {
        let time = FrameTime::Received(Instant::now());
        self.request(|reply| SessionRequest::Process { frame, time, reply })
            .await
    }

    /// Score one frame timed by its capture timestamp, so frames submitted in
    /// a burst keep their original spacing.
    pub async fn process_captured(
        &self,
        frame: Option<LandmarkFrame>,
        t_ms: u64,
    ) -> Result<FrameResult, SessionError> {
        let time = FrameTime::Captured(t_ms);
        self.request(|reply| SessionRequest::Process { frame, time, reply })
            .await
    }

    pub async fn latest(&self) -> Result<Option<FrameResult>, SessionError> {
        self.request(|reply| SessionRequest::Latest { reply }).await
    }

    pub async fn summary(&self) -> Result<SessionSummary, SessionError> {
        self.request(|reply| SessionRequest::Summary { reply }).await
    }

    pub async fn reset(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionRequest::Reset { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionRequest,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }
}

/// Spawn a session engine on a dedicated OS thread.
///
/// The configuration is validated before the thread starts, so a bad config
/// fails here and never at frame time.
pub fn spawn_session(session_id: &str, config: EngineConfig) -> Result<SessionHandle, SessionError> {
    let mut engine = EyeContactEngine::new(config)?;
    let (tx, mut rx) = mpsc::channel::<SessionRequest>(16);
    let id = session_id.to_string();

    std::thread::Builder::new()
        .name(format!("eyeline-{}", short_id(&id)))
        .spawn(move || {
            tracing::debug!(session = %id, "session thread started");
            // Anchored on the first captured frame.
            let mut clock: Option<CaptureClock> = None;
            while let Some(req) = rx.blocking_recv() {
                match req {
                    SessionRequest::Process { frame, time, reply } => {
                        let at = match time {
                            FrameTime::Received(at) => at,
                            FrameTime::Captured(t_ms) => {
                                let clock =
                                    clock.get_or_insert_with(|| CaptureClock::new(Instant::now()));
                                if clock.is_behind(t_ms) {
                                    tracing::warn!(
                                        session = %id,
                                        t_ms,
                                        previous = ?clock.latest_ms(),
                                        "capture timestamp went backwards; holding previous time"
                                    );
                                }
                                clock.at(t_ms)
                            }
                        };
                        let result = engine.process_at(frame.as_ref(), at);
                        if result.blink_detected {
                            tracing::debug!(
                                session = %id,
                                blink_count = result.blink_count,
                                "blink"
                            );
                        }
                        let _ = reply.send(result);
                    }
                    SessionRequest::Latest { reply } => {
                        let _ = reply.send(engine.last_result().cloned());
                    }
                    SessionRequest::Summary { reply } => {
                        let _ = reply.send(engine.summary());
                    }
                    SessionRequest::Reset { reply } => {
                        engine.reset();
                        clock = None;
                        tracing::info!(session = %id, "session reset");
                        let _ = reply.send(());
                    }
                }
            }
            let summary = engine.summary();
            tracing::info!(
                session = %id,
                frames = summary.frames,
                contact_ratio = summary.contact_ratio,
                blinks = summary.blink_count,
                "session thread exiting"
            );
        })
        .map_err(SessionError::Spawn)?;

    Ok(SessionHandle { tx })
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
