use std::collections::HashMap;

use chrono::{DateTime, Utc};
use eyeline_core::EngineConfig;
use serde::Serialize;
use thiserror::Error;

use crate::session::{spawn_session, SessionError, SessionHandle};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("session limit reached ({max} open)")]
    Full { max: usize },
    #[error(transparent)]
    Session(#[from] SessionError),
}

struct SessionRecord {
    handle: SessionHandle,
    opened_at: DateTime<Utc>,
}

/// Listing entry for `Status`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub opened_at: String,
}

/// Open sessions keyed by UUID.
///
/// Closing a session drops its handle, which ends the engine thread.
pub struct SessionRegistry {
    sessions: HashMap<String, SessionRecord>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Start a new engine session and return its id.
    pub fn open(&mut self, config: EngineConfig) -> Result<String, RegistryError> {
        if self.sessions.len() >= self.max_sessions {
            return Err(RegistryError::Full {
                max: self.max_sessions,
            });
        }
        let id = uuid::Uuid::new_v4().to_string();
        let handle = spawn_session(&id, config)?;
        self.sessions.insert(
            id.clone(),
            SessionRecord {
                handle,
                opened_at: Utc::now(),
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).map(|record| record.handle.clone())
    }

    /// Returns false if no session had this id.
    pub fn close(&mut self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Open sessions, oldest first.
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut records: Vec<_> = self.sessions.iter().collect();
        records.sort_by_key(|(_, record)| record.opened_at);
        records
            .into_iter()
            .map(|(id, record)| SessionInfo {
                id: id.clone(),
                opened_at: record.opened_at.to_rfc3339(),
            })
            .collect()
    }
}
