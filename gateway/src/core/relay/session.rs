use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::forward::{AgentToTelephony, Direction, LoopExit, TelephonyToAgent};
use super::state::{LinkStatus, SessionPhase, StreamState};
use super::transport::{
    CLEANUP_REASON, CloseReason, Connection, Frame, FrameStream, INTERNAL_RELAY_ERROR_REASON,
    SharedSink, Side, TELEPHONY_ENDED_REASON,
};
use crate::core::agent::{
    AGENT_INPUT_SAMPLE_RATE, AGENT_OUTPUT_SAMPLE_RATE, AgentClientMessage, AgentConnector,
    AgentProfile, SettingsConfiguration,
};
use crate::core::context::CallContext;
use crate::errors::{RelayError, RelayResult};

/// Default time allowed for the second loop to finish after the first one.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Settings shared by every session.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub agent: AgentProfile,
    pub grace_period: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            agent: AgentProfile::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// One call's bridge between a telephony connection and an agent connection.
///
/// Built around an accepted telephony connection; [`RelaySession::run`] opens
/// the agent connection and drives the session to `Closed` or `Failed`.
pub struct RelaySession {
    id: String,
    context: CallContext,
    settings: RelaySettings,
    connector: Arc<dyn AgentConnector>,
    telephony_tx: SharedSink,
    telephony_rx: FrameStream,
    phase: watch::Sender<SessionPhase>,
}

impl RelaySession {
    pub fn new(
        context: CallContext,
        telephony: Connection,
        connector: Arc<dyn AgentConnector>,
        settings: RelaySettings,
    ) -> Self {
        let (telephony_sink, telephony_rx) = telephony.split();
        let (phase, _) = watch::channel(SessionPhase::Initializing);

        Self {
            id: Uuid::new_v4().to_string(),
            context,
            settings,
            connector,
            telephony_tx: SharedSink::new(telephony_sink, Side::Telephony),
            telephony_rx,
            phase,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Follow phase changes from outside the session.
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Handle for closing the telephony connection if the session dies.
    pub fn telephony_sink(&self) -> SharedSink {
        self.telephony_tx.clone()
    }

    /// Run the session to completion.
    ///
    /// Returns `Ok` when the call ended normally, including when the agent hung
    /// up first. Errors mean the session ended in `Failed`.
    pub async fn run(self) -> RelayResult<()> {
        let Self {
            id,
            context,
            settings,
            connector,
            telephony_tx,
            telephony_rx,
            phase,
        } = self;
        let lifecycle = Lifecycle {
            session_id: id,
            call_sid: context.call_sid.clone(),
            phase,
        };

        lifecycle.transition(SessionPhase::ConnectingUpstream);

        let agent = match connector.connect(&context).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(
                    session_id = %lifecycle.session_id,
                    call_sid = %lifecycle.call_sid,
                    error = %e,
                    "Failed to open voice agent connection"
                );
                lifecycle.transition(SessionPhase::Failed);
                telephony_tx.close_with(e.telephony_close_reason()).await;
                return Err(e);
            }
        };

        let (agent_sink, agent_rx) = agent.split();
        let agent_tx = SharedSink::new(agent_sink, Side::Agent);

        let settings_frame = AgentClientMessage::SettingsConfiguration(
            SettingsConfiguration::for_call(&context, &settings.agent),
        )
        .to_json()
        .map_err(|e| RelayError::Decode(format!("failed to encode agent settings: {e}")));

        let sent = match settings_frame {
            Ok(json) => agent_tx
                .send(Frame::Text(json))
                .await
                .map_err(RelayError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            error!(
                session_id = %lifecycle.session_id,
                call_sid = %lifecycle.call_sid,
                error = %e,
                "Failed to configure voice agent"
            );
            lifecycle.transition(SessionPhase::Failed);
            agent_tx.close_with(CloseReason::normal(CLEANUP_REASON)).await;
            telephony_tx.close_with(e.telephony_close_reason()).await;
            return Err(e);
        }

        let state = StreamState::new();
        let view = state.view();
        let (telephony_link, agent_link) = state.into_writers();
        agent_link.set_status(LinkStatus::Connected);

        lifecycle.transition(SessionPhase::Streaming);

        let mut inbound = tokio::spawn(
            TelephonyToAgent {
                call_sid: context.call_sid.clone(),
                telephony_rx,
                agent_tx: agent_tx.clone(),
                link: telephony_link,
                agent_rate: AGENT_INPUT_SAMPLE_RATE,
            }
            .run(),
        );
        let mut outbound = tokio::spawn(
            AgentToTelephony {
                call_sid: context.call_sid.clone(),
                agent_rx,
                telephony_tx: telephony_tx.clone(),
                link: agent_link,
                view,
                agent_rate: AGENT_OUTPUT_SAMPLE_RATE,
            }
            .run(),
        );

        let (direction, first) = tokio::select! {
            result = &mut inbound => (Direction::TelephonyToAgent, result),
            result = &mut outbound => (Direction::AgentToTelephony, result),
        };
        let remaining = match direction {
            Direction::TelephonyToAgent => outbound,
            Direction::AgentToTelephony => inbound,
        };

        lifecycle.transition(SessionPhase::Closing);

        let cleanup = Cleanup {
            telephony_tx: &telephony_tx,
            agent_tx: &agent_tx,
        };

        let first_exit = match first {
            Ok(exit) => exit,
            Err(join_error) => {
                return lifecycle
                    .fail(direction, join_error, Some(remaining), &cleanup)
                    .await;
            }
        };
        info!(
            session_id = %lifecycle.session_id,
            call_sid = %lifecycle.call_sid,
            %direction,
            exit = ?first_exit,
            "First forwarding loop finished"
        );

        let other = match direction {
            Direction::TelephonyToAgent => Direction::AgentToTelephony,
            Direction::AgentToTelephony => Direction::TelephonyToAgent,
        };
        let mut remaining = remaining;
        match tokio::time::timeout(settings.grace_period, &mut remaining).await {
            Ok(Ok(exit)) => {
                info!(
                    session_id = %lifecycle.session_id,
                    call_sid = %lifecycle.call_sid,
                    direction = %other,
                    exit = ?exit,
                    "Second forwarding loop finished"
                );
            }
            Ok(Err(join_error)) => {
                return lifecycle.fail(other, join_error, None, &cleanup).await;
            }
            Err(_) => {
                warn!(
                    session_id = %lifecycle.session_id,
                    call_sid = %lifecycle.call_sid,
                    direction = %other,
                    grace_ms = settings.grace_period.as_millis() as u64,
                    "Forwarding loop did not finish within grace period, cancelling"
                );
                remaining.abort();
                let _ = remaining.await;
            }
        }

        cleanup.close_both(CloseReason::normal(CLEANUP_REASON)).await;
        lifecycle.transition(SessionPhase::Closed);
        Ok(())
    }
}

struct Lifecycle {
    session_id: String,
    call_sid: String,
    phase: watch::Sender<SessionPhase>,
}

impl Lifecycle {
    fn transition(&self, next: SessionPhase) {
        let current = *self.phase.borrow();
        if !current.can_transition_to(next) {
            warn!(
                session_id = %self.session_id,
                call_sid = %self.call_sid,
                from = %current,
                to = %next,
                "Ignoring invalid session transition"
            );
            return;
        }
        self.phase.send_replace(next);
        info!(
            session_id = %self.session_id,
            call_sid = %self.call_sid,
            from = %current,
            to = %next,
            "Session state changed"
        );
    }

    async fn fail(
        &self,
        direction: Direction,
        join_error: JoinError,
        remaining: Option<JoinHandle<LoopExit>>,
        cleanup: &Cleanup<'_>,
    ) -> RelayResult<()> {
        error!(
            session_id = %self.session_id,
            call_sid = %self.call_sid,
            %direction,
            error = %join_error,
            "Forwarding loop crashed"
        );
        self.transition(SessionPhase::Failed);

        if let Some(remaining) = remaining {
            remaining.abort();
            let _ = remaining.await;
        }
        cleanup
            .close_both(CloseReason::internal_error(INTERNAL_RELAY_ERROR_REASON))
            .await;

        Err(RelayError::TaskFailed(format!("{direction} loop: {join_error}")))
    }
}

struct Cleanup<'a> {
    telephony_tx: &'a SharedSink,
    agent_tx: &'a SharedSink,
}

impl Cleanup<'_> {
    async fn close_both(&self, telephony_reason: CloseReason) {
        self.agent_tx
            .close_with(CloseReason::normal(TELEPHONY_ENDED_REASON))
            .await;
        self.telephony_tx.close_with(telephony_reason).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::{mulaw, samples_to_pcm_bytes};
    use crate::core::context::CompanyProfile;
    use crate::core::relay::transport::testing::{Peer, connection_pair};
    use crate::core::relay::transport::{AGENT_CLOSED_REASON, CLOSE_INTERNAL_ERROR, CLOSE_NORMAL};
    use async_trait::async_trait;
    use base64::{Engine, prelude::BASE64_STANDARD};
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Hands out a prepared agent connection once, or fails.
    struct StubConnector {
        connection: Mutex<Option<RelayResult<Connection>>>,
    }

    impl StubConnector {
        fn ok(connection: Connection) -> Arc<Self> {
            Arc::new(Self {
                connection: Mutex::new(Some(Ok(connection))),
            })
        }

        fn failing(error: RelayError) -> Arc<Self> {
            Arc::new(Self {
                connection: Mutex::new(Some(Err(error))),
            })
        }
    }

    #[async_trait]
    impl AgentConnector for StubConnector {
        async fn connect(&self, _context: &CallContext) -> RelayResult<Connection> {
            self.connection
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(RelayError::UpstreamConnect("already used".into())))
        }
    }

    fn context() -> CallContext {
        CallContext::from_profile(
            "CA-session",
            "Emma",
            &CompanyProfile::new(Some("Acme".into()), None),
        )
    }

    fn settings(grace: Duration) -> RelaySettings {
        RelaySettings {
            agent: AgentProfile::default(),
            grace_period: grace,
        }
    }

    fn start(stream_sid: &str) -> String {
        format!(r#"{{"event":"start","streamSid":"{stream_sid}"}}"#)
    }

    fn media(bytes: &[u8]) -> String {
        format!(
            r#"{{"event":"media","media":{{"payload":"{}"}}}}"#,
            BASE64_STANDARD.encode(bytes)
        )
    }

    const STOP: &str = r#"{"event":"stop","streamSid":"MZ-A"}"#;

    async fn expect_settings(agent: &mut Peer) {
        match agent.recv().await {
            Some(Frame::Text(text)) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["type"], "SettingsConfiguration");
            }
            other => panic!("expected settings frame, got {other:?}"),
        }
    }

    fn expected_agent_pcm(mulaw_bytes: &[u8]) -> Bytes {
        let samples = mulaw::decode(mulaw_bytes);
        let resampled =
            crate::core::audio::resample_linear(&samples, 8_000, AGENT_INPUT_SAMPLE_RATE).unwrap();
        Bytes::from(samples_to_pcm_bytes(&resampled))
    }

    #[tokio::test]
    async fn test_start_media_media_stop_forwards_in_order() {
        let (telephony, mut caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();

        let p1: Vec<u8> = (0..160).map(|i| i as u8).collect();
        let p2: Vec<u8> = (0..160).map(|i| 255 - i as u8).collect();

        caller.send_text(start("MZ-A"));
        caller.send_text(media(&p1));
        caller.send_text(media(&p2));
        caller.send_text(STOP);
        // Anything after stop must not reach the agent
        caller.send_text(media(&[0x00; 160]));

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let mut phases = session.subscribe();
        let task = tokio::spawn(session.run());

        expect_settings(&mut agent_peer).await;
        assert_eq!(
            agent_peer.recv().await,
            Some(Frame::Binary(expected_agent_pcm(&p1)))
        );
        assert_eq!(
            agent_peer.recv().await,
            Some(Frame::Binary(expected_agent_pcm(&p2)))
        );
        assert_eq!(
            agent_peer.recv().await,
            Some(Frame::Close(Some(CloseReason::normal(TELEPHONY_ENDED_REASON))))
        );
        assert_eq!(agent_peer.recv().await, None);

        // The agent acknowledges by hanging up
        agent_peer.hang_up();

        task.await.unwrap().unwrap();
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Closed);

        // Caller gets a normal close since it ended the stream itself
        match caller.recv().await {
            Some(Frame::Close(Some(reason))) => assert_eq!(reason.code, CLOSE_NORMAL),
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_envelopes_do_not_end_session() {
        let (telephony, mut caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();

        caller.send_text(start("MZ-A"));
        caller.send_text("not json at all");
        caller.send_text(r#"{"event":"media"}"#);
        caller.send_text(r#"{"event":"media","media":{"payload":"***"}}"#);
        caller.send_text(r#"{"event":"media","media":{"payload":""}}"#);
        caller.send_text(r#"{"event":"mark","mark":{"name":"m1"}}"#);
        caller.send_text(r#"{"event":"dtmf","dtmf":{"digit":"5"}}"#);
        caller.send_text(media(&[0xFF; 80]));
        caller.send_text(STOP);

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let task = tokio::spawn(session.run());

        expect_settings(&mut agent_peer).await;
        assert_eq!(
            agent_peer.recv().await,
            Some(Frame::Binary(expected_agent_pcm(&[0xFF; 80])))
        );
        assert!(matches!(agent_peer.recv().await, Some(Frame::Close(_))));

        agent_peer.hang_up();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_loosely_typed_start_and_stop_drive_the_session() {
        let (telephony, mut caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();

        caller.send_text(
            r#"{"event":"start","sequenceNumber":1,"start":{"streamSid":"MZ-A","mediaFormat":{"encoding":"audio/x-mulaw"}}}"#,
        );
        caller.send_text(media(&[0xFF; 160]));
        caller.send_text(r#"{"event":"stop","streamSid":42}"#);

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let task = tokio::spawn(session.run());

        expect_settings(&mut agent_peer).await;
        assert_eq!(
            agent_peer.recv().await,
            Some(Frame::Binary(expected_agent_pcm(&[0xFF; 160])))
        );
        assert_eq!(
            agent_peer.recv().await,
            Some(Frame::Close(Some(CloseReason::normal(TELEPHONY_ENDED_REASON))))
        );

        agent_peer.hang_up();
        task.await.unwrap().unwrap();
        assert!(matches!(
            caller.recv().await,
            Some(Frame::Close(Some(reason))) if reason.code == CLOSE_NORMAL
        ));
    }

    #[tokio::test]
    async fn test_agent_audio_reaches_caller_as_mulaw() {
        let (telephony, mut caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();

        caller.send_text(start("MZ-A"));

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let task = tokio::spawn(session.run());
        expect_settings(&mut agent_peer).await;

        // Wait until the start event has been processed before sending audio
        tokio::time::sleep(Duration::from_millis(50)).await;

        agent_peer
            .tx
            .unbounded_send(Frame::Text(r#"{"type":"ConversationText","role":"assistant","content":"Hi"}"#.into()))
            .unwrap();
        agent_peer
            .tx
            .unbounded_send(Frame::Binary(Bytes::from(vec![0u8; 960])))
            .unwrap();
        agent_peer.tx.unbounded_send(Frame::Binary(Bytes::new())).unwrap();

        match caller.recv().await {
            Some(Frame::Text(text)) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["event"], "media");
                assert_eq!(value["streamSid"], "MZ-A");
                let payload = BASE64_STANDARD
                    .decode(value["media"]["payload"].as_str().unwrap())
                    .unwrap();
                assert_eq!(payload, vec![0xFF; 160]);
            }
            other => panic!("expected media envelope, got {other:?}"),
        }

        caller.send_text(STOP);
        assert!(matches!(agent_peer.recv().await, Some(Frame::Close(_))));
        agent_peer.hang_up();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_agent_close_closes_caller_with_error_code() {
        let (telephony, mut caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();
        caller.send_text(start("MZ-A"));

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let task = tokio::spawn(session.run());
        expect_settings(&mut agent_peer).await;

        agent_peer
            .tx
            .unbounded_send(Frame::Close(Some(CloseReason::normal("bye"))))
            .unwrap();

        assert_eq!(
            caller.recv().await,
            Some(Frame::Close(Some(CloseReason::internal_error(AGENT_CLOSED_REASON))))
        );

        // Caller acknowledges the close
        caller.hang_up();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unresponsive_caller_is_cancelled_after_grace_period() {
        let (telephony, mut caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_millis(100)),
        );
        let mut phases = session.subscribe();
        let task = tokio::spawn(session.run());
        expect_settings(&mut agent_peer).await;

        agent_peer.hang_up();

        // The caller never hangs up, so the inbound loop is cancelled
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("session should finish within the grace period")
            .unwrap()
            .unwrap();
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Closed);

        match caller.recv().await {
            Some(Frame::Close(Some(reason))) => assert_eq!(reason.code, CLOSE_INTERNAL_ERROR),
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_caller_hangup_closes_agent() {
        let (telephony, mut caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();
        caller.send_text(start("MZ-A"));

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let task = tokio::spawn(session.run());
        expect_settings(&mut agent_peer).await;

        caller.hang_up();

        assert!(matches!(
            agent_peer.recv().await,
            Some(Frame::Close(Some(reason))) if reason.code == CLOSE_NORMAL
        ));
        agent_peer.hang_up();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_caller_disconnect_reaches_closed() {
        let (telephony, caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();
        caller.send_text(start("MZ-A"));

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let mut phases = session.subscribe();
        let task = tokio::spawn(session.run());
        expect_settings(&mut agent_peer).await;

        // Both directions of the caller's socket go away at once, so every
        // close attempt on the telephony side fails
        drop(caller);

        assert!(matches!(
            agent_peer.recv().await,
            Some(Frame::Close(Some(reason))) if reason.code == CLOSE_NORMAL
        ));
        agent_peer.hang_up();

        task.await
            .expect("session task must not panic")
            .unwrap();
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Closed);
    }

    #[tokio::test]
    async fn test_upstream_failure_closes_caller_and_fails() {
        let (telephony, mut caller) = connection_pair();
        caller.send_text(start("MZ-A"));

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::failing(RelayError::UpstreamConnect("connection refused".into())),
            settings(Duration::from_secs(2)),
        );
        let mut phases = session.subscribe();

        let result = session.run().await;
        assert!(matches!(result, Err(RelayError::UpstreamConnect(_))));
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Failed);

        assert_eq!(
            caller.recv().await,
            Some(Frame::Close(Some(CloseReason::internal_error(
                "Failed to connect to AI Agent"
            ))))
        );
        assert_eq!(caller.recv().await, None);
    }

    #[tokio::test]
    async fn test_settings_send_failure_is_transport_error() {
        let (telephony, mut caller) = connection_pair();
        let (agent, agent_peer) = connection_pair();
        // The agent is gone before the settings frame can be written
        drop(agent_peer);

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let mut phases = session.subscribe();

        assert!(matches!(session.run().await, Err(RelayError::Transport(_))));
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Failed);
        assert_eq!(
            caller.recv().await,
            Some(Frame::Close(Some(CloseReason::internal_error(AGENT_CLOSED_REASON))))
        );
    }

    #[tokio::test]
    async fn test_missing_credential_fails_with_config_reason() {
        let (telephony, mut caller) = connection_pair();
        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::failing(crate::errors::ConfigError::missing("DEEPGRAM_API_KEY").into()),
            RelaySettings::default(),
        );

        assert!(matches!(session.run().await, Err(RelayError::Config(_))));
        assert_eq!(
            caller.recv().await,
            Some(Frame::Close(Some(CloseReason::internal_error(
                "Internal configuration error"
            ))))
        );
    }

    #[tokio::test]
    async fn test_audio_before_start_is_dropped() {
        let (telephony, mut caller) = connection_pair();
        let (agent, mut agent_peer) = connection_pair();

        let session = RelaySession::new(
            context(),
            telephony,
            StubConnector::ok(agent),
            settings(Duration::from_secs(2)),
        );
        let task = tokio::spawn(session.run());
        expect_settings(&mut agent_peer).await;

        agent_peer
            .tx
            .unbounded_send(Frame::Binary(Bytes::from(vec![0u8; 480])))
            .unwrap();
        agent_peer.hang_up();

        // Only the close arrives; the early audio had no stream to go to
        assert!(matches!(caller.recv().await, Some(Frame::Close(_))));
        caller.hang_up();
        task.await.unwrap().unwrap();
    }
}
