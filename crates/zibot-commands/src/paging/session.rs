//! Per-message paging state machine.
//!
//! [`PagingSession`] holds no I/O. It decides what a navigation event means
//! and reports the side effect the caller must perform as a [`Transition`].

use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;
use zibot_common::{MessageRef, UserId};

use super::{Page, PageSet};

/// Stand-in deadline for an idle budget too large to add to an instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Lifecycle of a paging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Accepting navigation input.
    Active,
    /// Teardown decided, cleanup not finished.
    Closing,
    /// Terminal.
    Closed,
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// Owner pressed forward.
    Next,
    /// Owner pressed backward.
    Prev,
    /// Owner pressed stop.
    Stop,
    /// The idle deadline passed.
    Timeout,
    /// The supervisor is shutting down.
    Shutdown,
    /// Someone other than the owner reacted.
    ForeignReaction,
}

/// Why a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// The owner pressed stop.
    Stopped,
    /// Nobody navigated for the whole inactivity budget.
    TimedOut,
    /// The supervisor shut down.
    Shutdown,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing happened.
    Ignored,
    /// Owner input accepted but the index did not move (page boundary).
    Unchanged,
    /// The index moved; re-render the page at this index.
    Render(usize),
    /// Begin teardown. Reported exactly once per session.
    Teardown(CloseReason),
}

/// Snapshot of a session, returned to callers that route events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Hosting message.
    pub message: MessageRef,
    /// Owning user.
    pub owner: UserId,
    /// Current page index.
    pub index: usize,
    /// Total number of pages.
    pub page_count: usize,
    /// Lifecycle state.
    pub state: SessionState,
}

/// A live paged message.
#[derive(Debug)]
pub struct PagingSession {
    id: Uuid,
    message: MessageRef,
    owner: UserId,
    pages: PageSet,
    index: usize,
    state: SessionState,
    created_at: Instant,
    last_activity: Instant,
    idle_budget: Duration,
}

impl PagingSession {
    /// Creates an active session showing the first page.
    pub fn new(
        message: MessageRef,
        owner: UserId,
        pages: PageSet,
        idle_budget: Duration,
        now: Instant,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
            owner,
            pages,
            index: 0,
            state: SessionState::Active,
            created_at: now,
            last_activity: now,
            idle_budget,
        }
    }

    /// Applies an event and returns the side effect to perform.
    pub fn apply(&mut self, event: SessionEvent, now: Instant) -> Transition {
        if self.state != SessionState::Active {
            return Transition::Ignored;
        }

        match event {
            SessionEvent::ForeignReaction => Transition::Ignored,
            SessionEvent::Next => {
                self.last_activity = now;
                if self.index + 1 < self.pages.len() {
                    self.index += 1;
                    Transition::Render(self.index)
                } else {
                    Transition::Unchanged
                }
            }
            SessionEvent::Prev => {
                self.last_activity = now;
                if self.index > 0 {
                    self.index -= 1;
                    Transition::Render(self.index)
                } else {
                    Transition::Unchanged
                }
            }
            SessionEvent::Stop => self.begin_teardown(CloseReason::Stopped),
            // A timer armed before the last navigation may fire late.
            SessionEvent::Timeout if !self.is_idle(now) => Transition::Ignored,
            SessionEvent::Timeout => self.begin_teardown(CloseReason::TimedOut),
            SessionEvent::Shutdown => self.begin_teardown(CloseReason::Shutdown),
        }
    }

    fn begin_teardown(&mut self, reason: CloseReason) -> Transition {
        self.state = SessionState::Closing;
        Transition::Teardown(reason)
    }

    /// Completes teardown. Returns `true` only for the call that moved the
    /// session from `Closing` to `Closed`.
    pub fn finish(&mut self) -> bool {
        if self.state == SessionState::Closing {
            self.state = SessionState::Closed;
            true
        } else {
            false
        }
    }

    /// Whether the inactivity budget has elapsed at `now`.
    pub fn is_idle(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) >= self.idle_budget
    }

    /// Instant at which the session times out if nothing else happens.
    pub fn deadline(&self) -> Instant {
        self.last_activity
            .checked_add(self.idle_budget)
            .unwrap_or_else(|| self.last_activity + FAR_FUTURE)
    }

    /// The current page as shown to users.
    pub fn current_page(&self) -> Page {
        self.pages.render(self.index)
    }

    /// Unique id used to correlate log lines.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Hosting message.
    pub const fn message(&self) -> MessageRef {
        self.message
    }

    /// Owning user.
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    /// Current page index.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Total number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Lifecycle state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// When the session was created.
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Last owner navigation, or creation.
    pub const fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            message: self.message,
            owner: self.owner,
            index: self.index,
            page_count: self.pages.len(),
            state: self.state,
        }
    }
}
