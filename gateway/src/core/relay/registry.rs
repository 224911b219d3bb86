use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info};

use super::session::RelaySession;
use super::state::SessionPhase;
use super::transport::{CloseReason, INTERNAL_RELAY_ERROR_REASON};
use crate::errors::{RelayError, RelayResult};

struct SessionEntry {
    call_sid: String,
    started: Instant,
    phase: watch::Receiver<SessionPhase>,
}

/// Point-in-time view of one live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub call_sid: String,
    pub phase: SessionPhase,
    pub age_ms: u64,
}

/// Live relay sessions, keyed by session id.
///
/// Sessions are supervised here: a panic inside a session task is caught and
/// the caller's connection is closed with an internal error instead of being
/// left open.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn snapshot(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|entry| SessionSummary {
                session_id: entry.key().clone(),
                call_sid: entry.call_sid.clone(),
                phase: *entry.phase.borrow(),
                age_ms: entry.started.elapsed().as_millis() as u64,
            })
            .collect();
        summaries.sort_by(|a, b| b.age_ms.cmp(&a.age_ms));
        summaries
    }

    /// Run a session to completion while it is listed in the registry.
    pub async fn run(&self, session: RelaySession) -> RelayResult<()> {
        let session_id = session.id().to_string();
        let call_sid = session.context().call_sid.clone();
        let telephony = session.telephony_sink();

        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                call_sid: call_sid.clone(),
                started: Instant::now(),
                phase: session.subscribe(),
            },
        );
        let _guard = Deregister {
            sessions: &self.sessions,
            session_id: &session_id,
        };
        info!(%session_id, %call_sid, active = self.sessions.len(), "Relay session registered");

        match tokio::spawn(session.run()).await {
            Ok(result) => result,
            Err(join_error) => {
                error!(%session_id, %call_sid, error = %join_error, "Relay session task crashed");
                telephony
                    .close_with(CloseReason::internal_error(INTERNAL_RELAY_ERROR_REASON))
                    .await;
                Err(RelayError::TaskFailed(join_error.to_string()))
            }
        }
    }
}

/// Removes a session from the registry however `run` exits.
struct Deregister<'a> {
    sessions: &'a DashMap<String, SessionEntry>,
    session_id: &'a str,
}

impl Drop for Deregister<'_> {
    fn drop(&mut self) {
        self.sessions.remove(self.session_id);
    }
}
