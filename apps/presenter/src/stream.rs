//! Push-stream handling: typed events, the reconnect state machine and
//! fan-out to the page presenters.
//!
//! The machine never touches timers or sockets. Callers feed it
//! [`ConnectionEvent`]s together with the current time in milliseconds and
//! execute the [`Directive`]s it returns.

use std::fmt;

use crate::dto::{IncidentUpdate, NewIncident, ResourceAllocation, StatusChange, StreamNotice};
use crate::error::{PresenterError, Result};

pub const NEW_INCIDENT: &str = "new-incident";
pub const INCIDENT_UPDATE: &str = "incident-update";
pub const RESOURCE_ALLOCATION: &str = "resource-allocation";
pub const STATUS_CHANGE: &str = "status-change";
pub const MESSAGE: &str = "message";

/// Every named channel the client subscribes to.
pub const CHANNELS: [&str; 5] = [
    NEW_INCIDENT,
    INCIDENT_UPDATE,
    RESOURCE_ALLOCATION,
    STATUS_CHANGE,
    MESSAGE,
];

#[derive(Clone, Debug)]
pub enum StreamEvent {
    NewIncident(NewIncident),
    IncidentUpdate(IncidentUpdate),
    ResourceAllocation(ResourceAllocation),
    StatusChange(StatusChange),
    Notice(StreamNotice),
}

impl StreamEvent {
    pub const fn channel(&self) -> &'static str {
        match self {
            Self::NewIncident(_) => NEW_INCIDENT,
            Self::IncidentUpdate(_) => INCIDENT_UPDATE,
            Self::ResourceAllocation(_) => RESOURCE_ALLOCATION,
            Self::StatusChange(_) => STATUS_CHANGE,
            Self::Notice(_) => MESSAGE,
        }
    }
}

pub fn parse_event(channel: &str, data: &str) -> Result<StreamEvent> {
    let parse_err = |source| PresenterError::parse(format!("{channel} payload"), source);
    let event = match channel {
        NEW_INCIDENT => StreamEvent::NewIncident(serde_json::from_str(data).map_err(parse_err)?),
        INCIDENT_UPDATE => {
            StreamEvent::IncidentUpdate(serde_json::from_str(data).map_err(parse_err)?)
        }
        RESOURCE_ALLOCATION => {
            StreamEvent::ResourceAllocation(serde_json::from_str(data).map_err(parse_err)?)
        }
        STATUS_CHANGE => StreamEvent::StatusChange(serde_json::from_str(data).map_err(parse_err)?),
        MESSAGE => StreamEvent::Notice(serde_json::from_str(data).map_err(parse_err)?),
        other => return Err(PresenterError::UnknownChannel(other.to_string())),
    };
    Ok(event)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// `min(base × 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Backoff,
    GivenUp,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Backoff => write!(f, "Backoff"),
            Self::GivenUp => write!(f, "GivenUp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connect,
    MessageReceived,
    ServerTimeout,
    TransportError,
    ResumeDue,
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "Connect"),
            Self::MessageReceived => write!(f, "MessageReceived"),
            Self::ServerTimeout => write!(f, "ServerTimeout"),
            Self::TransportError => write!(f, "TransportError"),
            Self::ResumeDue => write!(f, "ResumeDue"),
        }
    }
}

/// Side effects the owner of the socket has to carry out, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Open,
    Close,
    /// Call [`StreamMachine::poll`] again after this many milliseconds.
    ScheduleResume { delay_ms: u64 },
    /// Reconnect attempts are exhausted; tell the user once.
    GiveUp,
}

struct Transition {
    next: ConnectionState,
    attempts: u32,
    resume_at: Option<u64>,
    directives: Vec<Directive>,
}

#[derive(Debug, Clone)]
pub struct StreamMachine {
    state: ConnectionState,
    attempts: u32,
    resume_at: Option<u64>,
    policy: ReconnectPolicy,
}

impl StreamMachine {
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            resume_at: None,
            policy,
        }
    }

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub const fn resume_at(&self) -> Option<u64> {
        self.resume_at
    }

    pub const fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn connect(&mut self, now_ms: u64) -> Result<Vec<Directive>> {
        self.process_event(ConnectionEvent::Connect, now_ms)
    }

    /// Resumes a backed-off connection once its delay has elapsed.
    pub fn poll(&mut self, now_ms: u64) -> Vec<Directive> {
        if self.state != ConnectionState::Backoff {
            return Vec::new();
        }
        self.process_event(ConnectionEvent::ResumeDue, now_ms)
            .unwrap_or_default()
    }

    pub fn process_event(
        &mut self,
        event: ConnectionEvent,
        now_ms: u64,
    ) -> Result<Vec<Directive>> {
        let transition = self.transition(event, now_ms)?;

        if transition.next != self.state {
            log::debug!("stream: {} -> {} on {event}", self.state, transition.next);
        }

        self.state = transition.next;
        self.attempts = transition.attempts;
        self.resume_at = transition.resume_at;
        Ok(transition.directives)
    }

    fn transition(&self, event: ConnectionEvent, now_ms: u64) -> Result<Transition> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        let stay = |directives| Transition {
            next: self.state,
            attempts: self.attempts,
            resume_at: self.resume_at,
            directives,
        };

        let transition = match (self.state, event) {
            (S::Disconnected, E::Connect) => Transition {
                next: S::Connecting,
                attempts: self.attempts,
                resume_at: None,
                directives: vec![Directive::Open],
            },
            (S::Connecting | S::Connected, E::MessageReceived) => Transition {
                next: S::Connected,
                attempts: 0,
                resume_at: None,
                directives: Vec::new(),
            },
            (S::Disconnected | S::Connecting | S::Connected | S::Backoff, E::ServerTimeout) => {
                Transition {
                    next: S::Connecting,
                    attempts: 0,
                    resume_at: None,
                    directives: vec![Directive::Close, Directive::Open],
                }
            }
            (S::Connecting | S::Connected, E::TransportError) => {
                let attempts = self.attempts.saturating_add(1);
                if attempts <= self.policy.max_attempts {
                    let delay_ms = self.policy.delay_for(attempts);
                    log::info!(
                        "stream attempt {attempts}/{}, retrying in {delay_ms} ms",
                        self.policy.max_attempts
                    );
                    Transition {
                        next: S::Backoff,
                        attempts,
                        resume_at: Some(now_ms.saturating_add(delay_ms)),
                        directives: vec![Directive::Close, Directive::ScheduleResume { delay_ms }],
                    }
                } else {
                    log::error!("maximum stream reconnection attempts reached");
                    Transition {
                        next: S::GivenUp,
                        attempts,
                        resume_at: None,
                        directives: vec![Directive::Close, Directive::GiveUp],
                    }
                }
            }
            (S::Backoff, E::ResumeDue) => match self.resume_at {
                Some(at) if now_ms < at => stay(vec![Directive::ScheduleResume {
                    delay_ms: at - now_ms,
                }]),
                _ => Transition {
                    next: S::Connecting,
                    attempts: self.attempts,
                    resume_at: None,
                    directives: vec![Directive::Open],
                },
            },
            (from, event) => return Err(PresenterError::InvalidTransition { from, event }),
        };

        Ok(transition)
    }
}

/// A presenter that wants stream events. Every hook defaults to a no-op.
pub trait EventSink {
    fn name(&self) -> &'static str;

    fn on_new_incident(&mut self, _incident: &NewIncident) -> Result<()> {
        Ok(())
    }

    fn on_incident_update(&mut self, _update: &IncidentUpdate) -> Result<()> {
        Ok(())
    }

    fn on_resource_allocation(&mut self, _allocation: &ResourceAllocation) -> Result<()> {
        Ok(())
    }

    fn on_status_change(&mut self, _change: &StatusChange) -> Result<()> {
        Ok(())
    }
}

/// Delivers `event` to every sink in order. A failing sink is logged and
/// skipped; the rest still see the event. Returns how many sinks failed.
pub fn dispatch(event: &StreamEvent, sinks: &mut [&mut dyn EventSink]) -> usize {
    let mut failures = 0;
    for sink in sinks.iter_mut() {
        let outcome = match event {
            StreamEvent::NewIncident(incident) => sink.on_new_incident(incident),
            StreamEvent::IncidentUpdate(update) => sink.on_incident_update(update),
            StreamEvent::ResourceAllocation(allocation) => sink.on_resource_allocation(allocation),
            StreamEvent::StatusChange(change) => sink.on_status_change(change),
            StreamEvent::Notice(_) => Ok(()),
        };
        if let Err(error) = outcome {
            failures += 1;
            log::error!("{} failed to handle {}: {error}", sink.name(), event.channel());
        }
    }
    failures
}

/// What became of one frame read off the push connection.
#[derive(Debug, Default)]
pub struct FrameOutcome {
    pub event: Option<StreamEvent>,
    pub directives: Vec<Directive>,
}

/// The reconnect machine plus frame parsing: one per page.
#[derive(Debug, Clone)]
pub struct StreamClient {
    url: String,
    machine: StreamMachine,
}

impl StreamClient {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            machine: StreamMachine::new(policy),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub const fn machine(&self) -> &StreamMachine {
        &self.machine
    }

    pub fn connect(&mut self, now_ms: u64) -> Result<Vec<Directive>> {
        log::info!("connecting to event stream at {}", self.url);
        self.machine.connect(now_ms)
    }

    pub fn poll(&mut self, now_ms: u64) -> Vec<Directive> {
        self.machine.poll(now_ms)
    }

    pub fn on_transport_error(&mut self, now_ms: u64) -> Vec<Directive> {
        match self
            .machine
            .process_event(ConnectionEvent::TransportError, now_ms)
        {
            Ok(directives) => directives,
            Err(error) => {
                log::debug!("ignoring stream error: {error}");
                Vec::new()
            }
        }
    }

    /// Parses one frame. Unparseable payloads are logged and dropped; the
    /// connection is kept.
    pub fn on_frame(&mut self, channel: &str, data: &str, now_ms: u64) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        // Only a frame that parses counts as a healthy connection.
        let event = match parse_event(channel, data) {
            Ok(event) => event,
            Err(error) => {
                log::warn!("dropping stream frame: {error}");
                return outcome;
            }
        };

        if let Err(error) = self
            .machine
            .process_event(ConnectionEvent::MessageReceived, now_ms)
        {
            log::debug!("frame on {channel} arrived while {error}");
            return outcome;
        }

        if let StreamEvent::Notice(notice) = &event {
            if let Some(error) = &notice.error {
                log::warn!("stream reported an error: {error}");
            }
            if notice.is_timeout() {
                log::info!("server-side timeout received, reconnecting");
                outcome.directives = self
                    .machine
                    .process_event(ConnectionEvent::ServerTimeout, now_ms)
                    .unwrap_or_default();
            }
        }

        outcome.event = Some(event);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_machine() -> StreamMachine {
        let mut machine = StreamMachine::new(ReconnectPolicy::default());
        machine.connect(0).unwrap();
        machine
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (1..=5).map(|attempt| policy.delay_for(attempt)).collect();
        assert_eq!(delays, vec![2000, 4000, 8000, 16000, 30000]);
        assert_eq!(policy.delay_for(60), 30000);
    }

    #[test]
    fn consecutive_failures_follow_the_backoff_sequence() {
        let mut machine = failing_machine();
        let mut now = 0;
        let mut seen = Vec::new();

        for _ in 0..5 {
            let directives = machine
                .process_event(ConnectionEvent::TransportError, now)
                .unwrap();
            let Some(Directive::ScheduleResume { delay_ms }) = directives.last().copied() else {
                panic!("expected a scheduled resume, got {directives:?}");
            };
            seen.push(delay_ms);
            assert_eq!(machine.state(), ConnectionState::Backoff);

            now += delay_ms;
            assert_eq!(machine.poll(now), vec![Directive::Open]);
            assert_eq!(machine.state(), ConnectionState::Connecting);
        }

        assert_eq!(seen, vec![2000, 4000, 8000, 16000, 30000]);
    }

    #[test]
    fn sixth_failure_gives_up_exactly_once() {
        let mut machine = failing_machine();
        let mut now = 0;
        for _ in 0..5 {
            machine
                .process_event(ConnectionEvent::TransportError, now)
                .unwrap();
            now += 30_000;
            machine.poll(now);
        }

        let directives = machine
            .process_event(ConnectionEvent::TransportError, now)
            .unwrap();
        assert_eq!(directives, vec![Directive::Close, Directive::GiveUp]);
        assert_eq!(machine.state(), ConnectionState::GivenUp);

        assert!(machine
            .process_event(ConnectionEvent::TransportError, now)
            .is_err());
        assert!(machine.poll(now + 60_000).is_empty());
        assert!(machine.connect(now).is_err());
    }

    #[test]
    fn early_poll_reschedules_the_remaining_delay() {
        let mut machine = failing_machine();
        machine
            .process_event(ConnectionEvent::TransportError, 1_000)
            .unwrap();

        assert_eq!(
            machine.poll(2_500),
            vec![Directive::ScheduleResume { delay_ms: 500 }]
        );
        assert_eq!(machine.state(), ConnectionState::Backoff);
    }

    #[test]
    fn messages_reset_the_retry_counter() {
        let mut machine = failing_machine();
        machine
            .process_event(ConnectionEvent::TransportError, 0)
            .unwrap();
        machine.poll(2_000);
        machine
            .process_event(ConnectionEvent::MessageReceived, 2_100)
            .unwrap();

        assert_eq!(machine.state(), ConnectionState::Connected);
        assert_eq!(machine.attempts(), 0);

        let directives = machine
            .process_event(ConnectionEvent::TransportError, 3_000)
            .unwrap();
        assert_eq!(
            directives,
            vec![Directive::Close, Directive::ScheduleResume { delay_ms: 2000 }]
        );
    }

    #[test]
    fn server_timeout_reconnects_immediately_and_resets_attempts() {
        let mut client = StreamClient::new("/stream/stream", ReconnectPolicy::default());
        client.connect(0).unwrap();
        client.on_transport_error(10);
        client.poll(2_010);

        let outcome = client.on_frame(
            MESSAGE,
            r#"{"message": "Connection ended, client should reconnect"}"#,
            2_500,
        );

        assert_eq!(outcome.directives, vec![Directive::Close, Directive::Open]);
        assert_eq!(client.machine().state(), ConnectionState::Connecting);
        assert_eq!(client.machine().attempts(), 0);
    }

    #[test]
    fn malformed_frames_are_dropped_without_closing() {
        let mut client = StreamClient::new("/stream", ReconnectPolicy::default());
        client.connect(0).unwrap();

        let outcome = client.on_frame(NEW_INCIDENT, "{not json", 5);

        assert!(outcome.event.is_none());
        assert!(outcome.directives.is_empty());
        assert_eq!(client.machine().state(), ConnectionState::Connecting);
    }

    #[test]
    fn malformed_frames_do_not_reset_the_retry_counter() {
        let mut client = StreamClient::new("/stream", ReconnectPolicy::default());
        client.connect(0).unwrap();
        client.on_transport_error(10);
        client.poll(2_010);
        assert_eq!(client.machine().attempts(), 1);

        client.on_frame(NEW_INCIDENT, "{not json", 2_100);
        assert_eq!(client.machine().attempts(), 1);
        assert_eq!(client.machine().state(), ConnectionState::Connecting);

        let directives = client.on_transport_error(2_200);
        assert_eq!(
            directives,
            vec![Directive::Close, Directive::ScheduleResume { delay_ms: 4000 }]
        );

        client.poll(6_200);
        let outcome = client.on_frame(
            STATUS_CHANGE,
            r#"{"incident_id": 3, "new_status": "validated"}"#,
            6_300,
        );
        assert!(outcome.event.is_some());
        assert_eq!(client.machine().attempts(), 0);
    }

    #[test]
    fn typed_frames_parse() {
        let mut client = StreamClient::new("/stream", ReconnectPolicy::default());
        client.connect(0).unwrap();

        let outcome = client.on_frame(
            STATUS_CHANGE,
            r#"{"incident_id": 12, "new_status": "resolved"}"#,
            1,
        );

        match outcome.event {
            Some(StreamEvent::StatusChange(change)) => {
                assert_eq!(change.incident_id, 12);
                assert_eq!(change.new_status, "resolved");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            parse_event("weather", "{}"),
            Err(PresenterError::UnknownChannel(_))
        ));
    }

    struct Recorder {
        seen: Vec<i64>,
    }

    impl EventSink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn on_status_change(&mut self, change: &StatusChange) -> Result<()> {
            self.seen.push(change.incident_id);
            Ok(())
        }
    }

    struct Broken;

    impl EventSink for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn on_status_change(&mut self, _change: &StatusChange) -> Result<()> {
            Err(PresenterError::MissingElement("incidents-list".into()))
        }
    }

    #[test]
    fn a_failing_sink_does_not_starve_the_others() {
        let event = StreamEvent::StatusChange(StatusChange {
            incident_id: 4,
            new_status: "validated".into(),
        });
        let mut broken = Broken;
        let mut recorder = Recorder { seen: Vec::new() };

        let mut sinks: [&mut dyn EventSink; 2] = [&mut broken, &mut recorder];
        let failures = dispatch(&event, &mut sinks);

        assert_eq!(failures, 1);
        assert_eq!(recorder.seen, vec![4]);
    }
}
