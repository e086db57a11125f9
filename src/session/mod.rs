//! Session Manager: the known sessions and which one is current.
//!
//! The current session id is a single-writer register. It changes only
//! through this type: explicit creation, explicit selection, or a one-time
//! [`SessionManager::adopt`] when the first chat reply of a fresh
//! conversation establishes the backend session.
//!
//! Each rebinding starts a new [`Conversation`]. Requests are tagged with the
//! conversation they were issued for, so anything that resolves after the
//! user moved on is recognisably stale.

use thiserror::Error;

use crate::activity::ActivityLog;
use crate::api::{ApiError, Message, Session, SessionId};

/// Label of the synthetic head entry that starts a fresh conversation.
pub const PLACEHOLDER_NAME: &str = "+ New investigation";

/// Generation of the bound conversation. Bumped on every rebind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Conversation(u64);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend unavailable: {0}")]
    BackendUnavailable(#[source] ApiError),
}

/// Issued by [`SessionManager::begin_listing`]; only the newest one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTicket {
    pub session: SessionId,
    pub conversation: Conversation,
}

/// What selecting a session requires next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Placeholder chosen: empty transcript, no session until the first reply.
    Fresh(Conversation),
    /// Fetch this session's history and replace the transcript with it.
    LoadHistory(HistoryTicket),
}

#[derive(Debug)]
pub enum HistoryOutcome {
    Loaded(Vec<Message>),
    Failed(ApiError),
    /// The user selected something else while the fetch was in flight.
    Stale,
}

#[derive(Debug)]
pub enum ListingOutcome {
    Updated(usize),
    Failed(ApiError),
    Stale,
}

#[derive(Debug)]
pub struct SessionManager {
    known: Vec<Session>,
    current: Option<SessionId>,
    conversation: Conversation,
    listing_seq: u64,
    log: ActivityLog,
}

impl SessionManager {
    pub fn new(log: ActivityLog) -> Self {
        Self {
            known: Vec::new(),
            current: None,
            conversation: Conversation(0),
            listing_seq: 0,
            log,
        }
    }

    /// Known sessions, placeholder first.
    pub fn list(&self) -> Vec<Session> {
        let placeholder = Session {
            id: SessionId::new(""),
            display_name: PLACEHOLDER_NAME.to_string(),
            created_at: None,
        };
        std::iter::once(placeholder)
            .chain(self.known.iter().cloned())
            .collect()
    }

    pub fn current(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }

    pub fn conversation(&self) -> Conversation {
        self.conversation
    }

    /// Resolve `:open` input: a list index (0 is the placeholder) or an id
    /// prefix that matches exactly one known session.
    pub fn resolve(&self, input: &str) -> Option<SessionId> {
        let input = input.trim();
        if let Ok(index) = input.parse::<usize>() {
            return self.list().get(index).map(|s| s.id.clone());
        }
        if input.is_empty() {
            return None;
        }
        let mut matches = self
            .known
            .iter()
            .filter(|s| s.id.as_str().starts_with(input));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.id.clone()),
            _ => None,
        }
    }

    // -- listing ------------------------------------------------------------

    pub fn begin_listing(&mut self) -> ListingTicket {
        self.listing_seq += 1;
        ListingTicket(self.listing_seq)
    }

    /// Apply a `GET /chat/sessions` result. An older listing that lands after
    /// a newer one was issued is dropped.
    pub fn apply_listing(
        &mut self,
        ticket: ListingTicket,
        result: Result<Vec<Session>, ApiError>,
    ) -> ListingOutcome {
        if ticket.0 != self.listing_seq {
            self.log
                .discarded("session", "list", "a newer listing was requested");
            return ListingOutcome::Stale;
        }
        match result {
            Ok(sessions) => {
                self.known = sessions
                    .into_iter()
                    .filter(|s| !s.id.is_placeholder())
                    .collect();
                ListingOutcome::Updated(self.known.len())
            }
            Err(e) => ListingOutcome::Failed(e),
        }
    }

    // -- creation -----------------------------------------------------------

    /// Apply a `POST /chat/session/new` result. On success the new session
    /// becomes current in a fresh conversation; the caller refreshes the list.
    pub fn on_created(&mut self, result: Result<Session, ApiError>) -> Result<Session, SessionError> {
        let session = result.map_err(SessionError::BackendUnavailable)?;
        self.rebind(Some(session.id.clone()));
        if !self.known.iter().any(|s| s.id == session.id) {
            self.known.insert(0, session.clone());
        }
        self.log
            .record("session", "create", "ok", Some(session.id.as_str()));
        Ok(session)
    }

    // -- selection ----------------------------------------------------------

    /// Bind `id`. Reselecting the current session keeps its conversation, so
    /// a reply still pending for it is not made stale; only the history is
    /// fetched again.
    pub fn select(&mut self, id: &SessionId) -> Selection {
        if id.is_placeholder() {
            self.rebind(None);
            return Selection::Fresh(self.conversation);
        }
        if self.current.as_ref() != Some(id) {
            self.rebind(Some(id.clone()));
        }
        Selection::LoadHistory(HistoryTicket {
            session: id.clone(),
            conversation: self.conversation,
        })
    }

    pub fn on_history(
        &mut self,
        ticket: &HistoryTicket,
        result: Result<Vec<Message>, ApiError>,
    ) -> HistoryOutcome {
        if ticket.conversation != self.conversation {
            self.log.discarded(
                "session",
                "history",
                &format!("session {} is no longer current", ticket.session),
            );
            return HistoryOutcome::Stale;
        }
        match result {
            Ok(messages) => HistoryOutcome::Loaded(messages),
            Err(e) => HistoryOutcome::Failed(e),
        }
    }

    // -- adoption -----------------------------------------------------------

    /// Record the session id the backend minted for `conversation`.
    ///
    /// Write-once: succeeds only while that conversation is still bound and
    /// has no session yet.
    pub fn adopt(&mut self, conversation: Conversation, id: &SessionId) -> bool {
        if conversation != self.conversation || self.current.is_some() || id.is_placeholder() {
            return false;
        }
        self.current = Some(id.clone());
        self.log.record("session", "adopt", "ok", Some(id.as_str()));
        true
    }

    fn rebind(&mut self, current: Option<SessionId>) {
        self.current = current;
        self.conversation = Conversation(self.conversation.0 + 1);
    }
}
