//! Chat Orchestrator: the send/receive protocol for one conversation.
//!
//! A turn goes `Idle → Sending → AwaitingResponse → Idle`. At most one
//! request is in flight per conversation; a second send while one is pending
//! is queued or rejected per [`BusyPolicy`], never fired concurrently. That
//! is what keeps a conversation without a session from minting two backend
//! sessions: the queued message only goes out once the first reply has
//! established (and [`SessionManager::adopt`]ed) the id.
//!
//! Every request carries a [`RequestTicket`] naming the conversation it
//! belongs to. A reply whose ticket no longer matches is dropped without
//! touching the transcript.

pub mod transcript;

use std::collections::VecDeque;

use crate::activity::ActivityLog;
use crate::api::{ApiError, ChatReply, Message, Role, SessionId};
use crate::charts::{ChartRegistry, ChartSpec, ChartSurface, RenderOutcome, SlotId};
use crate::config::schema::BusyPolicy;
use crate::session::{Conversation, SessionManager};

pub use transcript::{Entry, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    id: u64,
    pub conversation: Conversation,
}

/// A request ready to be handed to a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub ticket: RequestTicket,
    pub message: String,
    pub session_id: Option<SessionId>,
}

#[derive(Debug, PartialEq)]
pub enum SendOutcome {
    /// Empty after trimming; nothing happened.
    Ignored,
    Dispatched(ChatRequest),
    /// Held until the pending reply resolves.
    Queued { position: usize },
    /// Refused; the user has to wait for the pending reply.
    Rejected,
}

/// Side effects the caller still has to carry out after a reply.
#[derive(Debug, Default, PartialEq)]
pub struct ChatEffects {
    /// A session was just established; refresh the session list.
    pub refresh_sessions: bool,
    pub chart: Option<RenderOutcome>,
    /// The next queued message, already moved to `Sending`.
    pub next: Option<ChatRequest>,
}

#[derive(Debug, PartialEq)]
pub enum ChatCompletion {
    Applied(ChatEffects),
    /// The reply belonged to a conversation the user has left.
    Stale,
}

#[derive(Debug)]
pub struct ChatOrchestrator {
    transcript: Transcript,
    state: TurnState,
    in_flight: Option<RequestTicket>,
    queue: VecDeque<String>,
    policy: BusyPolicy,
    next_id: u64,
    log: ActivityLog,
}

impl ChatOrchestrator {
    pub fn new(policy: BusyPolicy, log: ActivityLog) -> Self {
        Self {
            transcript: Transcript::default(),
            state: TurnState::Idle,
            in_flight: None,
            queue: VecDeque::new(),
            policy,
            next_id: 0,
            log,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Begin a turn.
    ///
    /// The user message and the typing placeholder are appended before the
    /// request is returned, so they are always visible first.
    pub fn send(&mut self, sessions: &SessionManager, message: &str) -> SendOutcome {
        let message = message.trim();
        if message.is_empty() {
            return SendOutcome::Ignored;
        }

        if self.state != TurnState::Idle {
            return match self.policy {
                BusyPolicy::Queue => {
                    self.queue.push_back(message.to_string());
                    self.log
                        .record("chat", "send", "queued", Some(&self.queue.len().to_string()));
                    SendOutcome::Queued {
                        position: self.queue.len(),
                    }
                }
                BusyPolicy::Reject => {
                    self.log.record("chat", "send", "rejected", None);
                    SendOutcome::Rejected
                }
            };
        }

        SendOutcome::Dispatched(self.begin(sessions, message.to_string()))
    }

    /// The request has been handed to a worker.
    pub fn dispatched(&mut self, ticket: &RequestTicket) {
        if self.in_flight.as_ref() == Some(ticket) && self.state == TurnState::Sending {
            self.state = TurnState::AwaitingResponse;
        }
    }

    /// Apply the result of a `POST /chat`.
    pub fn complete<S: ChartSurface>(
        &mut self,
        sessions: &mut SessionManager,
        charts: &mut ChartRegistry<S>,
        ticket: RequestTicket,
        result: Result<ChatReply, ApiError>,
    ) -> ChatCompletion {
        if self.in_flight != Some(ticket) || ticket.conversation != sessions.conversation() {
            self.log
                .discarded("chat", "reply", "conversation changed while the reply was pending");
            return ChatCompletion::Stale;
        }

        self.in_flight = None;
        self.state = TurnState::Idle;
        self.transcript.remove_typing();

        let mut effects = ChatEffects::default();
        match result {
            Ok(reply) => {
                if let Some(id) = &reply.session_id
                    && sessions.current().is_none()
                {
                    effects.refresh_sessions = sessions.adopt(ticket.conversation, id);
                }

                self.transcript
                    .push(Entry::Message(Message::assistant(reply.response)));
                if !reply.tools_used.is_empty() {
                    self.transcript.push(Entry::Notice(format!(
                        "tools used: {}",
                        reply.tools_used.join(", ")
                    )));
                }

                if let Some(wire) = reply.chart {
                    effects.chart = self.render_chart(charts, wire);
                }
                self.log.record("chat", "reply", "ok", None);
            }
            Err(e) => {
                self.transcript.push(Entry::Error(format!("Error: {e}")));
                self.log.record("chat", "reply", "error", Some(&e.to_string()));
            }
        }

        if let Some(message) = self.queue.pop_front() {
            effects.next = Some(self.begin(sessions, message));
        }

        ChatCompletion::Applied(effects)
    }

    /// Start over for a newly bound conversation: empty transcript, no
    /// pending turn, queued messages dropped. A reply still in flight for
    /// the previous conversation will come back stale.
    pub fn rebind(&mut self) {
        if !self.queue.is_empty() {
            self.log.record(
                "chat",
                "queue",
                "dropped",
                Some(&self.queue.len().to_string()),
            );
        }
        self.queue.clear();
        self.in_flight = None;
        self.state = TurnState::Idle;
        self.transcript.clear();
    }

    /// Replace the transcript with a session's stored history.
    ///
    /// A turn still awaiting its reply stays at the end, so the reply lands
    /// after the question it answers.
    pub fn load_history(&mut self, messages: Vec<Message>) {
        let pending = self.in_flight.and_then(|_| self.pending_question());
        self.transcript.replace_with(messages);
        if let Some(question) = pending {
            if self.transcript.messages().last() != Some(&question) {
                self.transcript.push(Entry::Message(question));
            }
            self.transcript.push(Entry::Typing);
        }
    }

    /// Record a failure that is not tied to a turn (history fetch, session
    /// creation).
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.transcript.push(Entry::Error(message.into()));
    }

    fn begin(&mut self, sessions: &SessionManager, message: String) -> ChatRequest {
        self.state = TurnState::Sending;
        self.transcript
            .push(Entry::Message(Message::user(message.clone())));
        self.transcript.push(Entry::Typing);

        self.next_id += 1;
        let ticket = RequestTicket {
            id: self.next_id,
            conversation: sessions.conversation(),
        };
        self.in_flight = Some(ticket);

        ChatRequest {
            ticket,
            message,
            session_id: sessions.current().cloned(),
        }
    }

    /// The user message the typing placeholder is answering.
    fn pending_question(&self) -> Option<Message> {
        let entries = self.transcript.entries();
        let typing = entries.iter().position(|e| matches!(e, Entry::Typing))?;
        entries[..typing].iter().rev().find_map(|e| match e {
            Entry::Message(m) if m.role == Role::User => Some(m.clone()),
            _ => None,
        })
    }

    fn render_chart<S: ChartSurface>(
        &mut self,
        charts: &mut ChartRegistry<S>,
        wire: crate::charts::WireChart,
    ) -> Option<RenderOutcome> {
        let slot = SlotId::dynamic();
        let spec = match ChartSpec::try_from(wire) {
            Ok(spec) => spec,
            Err(e) => {
                self.transcript
                    .push(Entry::Notice(format!("chart omitted: {e}")));
                return None;
            }
        };

        match charts.render(&slot, &spec) {
            Ok(RenderOutcome::Rendered) => {
                charts.show(&slot);
                Some(RenderOutcome::Rendered)
            }
            Ok(RenderOutcome::Detached) => {
                self.log
                    .discarded("chart", "render", "dynamic panel is not mounted");
                Some(RenderOutcome::Detached)
            }
            Err(e) => {
                self.transcript
                    .push(Entry::Notice(format!("chart could not be rendered: {e}")));
                None
            }
        }
    }
}
