//! Process-wide registry of live paging sessions.
//!
//! Every registered session runs as its own task that owns the
//! [`PagingSession`] and consumes events from a queue, so transitions on one
//! message are serialized and processed in arrival order while different
//! messages proceed concurrently. The task also owns the idle deadline: it
//! waits for the next event or the deadline, whichever comes first.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zibot_common::{ChannelId, MessageRef, UserId};
use zibot_config::PagingConfig;

use super::{CloseReason, PageSet, PagingSession, SessionEvent, SessionSnapshot, SessionState, Transition};
use crate::transport::{Affordance, Transport, TransportError};

/// Errors raised by the supervisor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupervisorError {
    /// A session already exists for this message; reuse it.
    #[error("Message {0} already has a paging session")]
    AlreadyPaging(MessageRef),

    /// Sending the first page failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    /// Message the reaction is on.
    pub message: MessageRef,
    /// User who reacted.
    pub reactor: UserId,
    /// Emoji as sent by the platform.
    pub emoji: String,
    /// `false` when the reaction was removed.
    pub added: bool,
}

/// What happened to a routed reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No live session on that message.
    NoSession,
    /// Not part of the navigation vocabulary, or a removal while removals are ignored.
    Ignored,
    /// The session was idle; it has been told to time out.
    Expired,
    /// Delivered; the session state after processing.
    Delivered(SessionSnapshot),
}

struct Envelope {
    event: SessionEvent,
    mark: Option<(UserId, Affordance)>,
    ack: Option<oneshot::Sender<SessionSnapshot>>,
}

impl Envelope {
    const fn signal(event: SessionEvent) -> Self {
        Self {
            event,
            mark: None,
            ack: None,
        }
    }
}

struct SessionEntry {
    id: Uuid,
    owner: UserId,
    tx: mpsc::UnboundedSender<Envelope>,
    last_activity: Arc<Mutex<Instant>>,
}

struct Inner {
    sessions: DashMap<MessageRef, SessionEntry>,
    transport: Arc<dyn Transport>,
    config: PagingConfig,
    closed: AtomicU64,
}

/// Registry of live paging sessions keyed by hosting message.
#[derive(Clone)]
pub struct SessionSupervisor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSupervisor")
            .field("sessions", &self.inner.sessions.len())
            .field("closed", &self.closed_count())
            .finish_non_exhaustive()
    }
}

impl SessionSupervisor {
    /// Create a new supervisor sending through `transport`
    pub fn new(transport: Arc<dyn Transport>, config: PagingConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                transport,
                config,
                closed: AtomicU64::new(0),
            }),
        }
    }

    /// Sends the first page with navigation affordances and registers a session for it.
    pub async fn open(
        &self,
        destination: ChannelId,
        owner: UserId,
        pages: PageSet,
    ) -> Result<MessageRef, SupervisorError> {
        let first = pages.render(0);
        let message = self
            .inner
            .transport
            .send_page(destination, &first, &Affordance::ALL)
            .await?;

        let session = PagingSession::new(
            message,
            owner,
            pages,
            self.inner.config.inactivity_timeout(),
            Instant::now(),
        );
        self.register(session)?;
        Ok(message)
    }

    /// Registers a session and starts its event loop.
    pub fn register(&self, session: PagingSession) -> Result<(), SupervisorError> {
        let message = session.message();
        match self.inner.sessions.entry(message) {
            Entry::Occupied(_) => Err(SupervisorError::AlreadyPaging(message)),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let last_activity = Arc::new(Mutex::new(session.last_activity()));
                slot.insert(SessionEntry {
                    id: session.id(),
                    owner: session.owner(),
                    tx,
                    last_activity: last_activity.clone(),
                });

                debug!(
                    session = %session.id(),
                    message = %message,
                    owner = %session.owner(),
                    pages = session.page_count(),
                    "Paging session opened"
                );
                tokio::spawn(run_session(self.inner.clone(), session, rx, last_activity));
                Ok(())
            }
        }
    }

    /// Routes a reaction to the session hosted on the reacted message.
    pub async fn route_reaction(&self, event: ReactionEvent) -> RouteOutcome {
        let Some((tx, owner, last_activity)) = self.inner.sessions.get(&event.message).map(|entry| {
            (
                entry.tx.clone(),
                entry.owner,
                *entry.last_activity.lock(),
            )
        }) else {
            return RouteOutcome::NoSession;
        };

        if !event.added && !self.inner.config.navigate_on_removal {
            return RouteOutcome::Ignored;
        }

        let Some(affordance) = Affordance::from_emoji(&event.emoji) else {
            return RouteOutcome::Ignored;
        };

        let now = Instant::now();
        if now.saturating_duration_since(last_activity) >= self.inner.config.inactivity_timeout() {
            let _ = tx.send(Envelope::signal(SessionEvent::Timeout));
            return RouteOutcome::Expired;
        }

        let (session_event, mark) = if event.reactor == owner {
            let mark = event.added.then_some((event.reactor, affordance));
            (navigation_event(affordance), mark)
        } else {
            (SessionEvent::ForeignReaction, None)
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        let envelope = Envelope {
            event: session_event,
            mark,
            ack: Some(ack_tx),
        };
        if tx.send(envelope).is_err() {
            return RouteOutcome::NoSession;
        }

        ack_rx.await.map_or(RouteOutcome::NoSession, RouteOutcome::Delivered)
    }

    /// Tells every session idle at `now` to time out. Returns how many were signalled.
    pub fn sweep(&self, now: Instant) -> usize {
        let budget = self.inner.config.inactivity_timeout();
        let idle: Vec<_> = self
            .inner
            .sessions
            .iter()
            .filter(|entry| now.saturating_duration_since(*entry.last_activity.lock()) >= budget)
            .map(|entry| entry.tx.clone())
            .collect();

        let signalled = idle
            .into_iter()
            .filter(|tx| tx.send(Envelope::signal(SessionEvent::Timeout)).is_ok())
            .count();
        if signalled > 0 {
            debug!("Sweep signalled {} idle paging sessions", signalled);
        }
        signalled
    }

    /// Runs [`sweep`](Self::sweep) every `interval` until `shutdown` is cancelled.
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        supervisor.sweep(Instant::now());
                    }
                }
            }
            debug!("Paging sweeper stopped");
        })
    }

    /// Tears down every live session and clears the registry.
    pub async fn shutdown(&self) {
        let senders: Vec<_> = self
            .inner
            .sessions
            .iter()
            .map(|entry| entry.tx.clone())
            .collect();

        let mut acks = Vec::with_capacity(senders.len());
        for tx in senders {
            let (ack_tx, ack_rx) = oneshot::channel();
            let envelope = Envelope {
                event: SessionEvent::Shutdown,
                mark: None,
                ack: Some(ack_tx),
            };
            if tx.send(envelope).is_ok() {
                acks.push(ack_rx);
            }
        }

        let count = acks.len();
        futures::future::join_all(acks).await;
        self.inner.sessions.clear();
        info!("Paging supervisor shut down ({} sessions closed)", count);
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    /// Whether a session is live on `message`.
    pub fn contains(&self, message: &MessageRef) -> bool {
        self.inner.sessions.contains_key(message)
    }

    /// Number of sessions removed since startup.
    pub fn closed_count(&self) -> u64 {
        self.inner.closed.load(Ordering::Relaxed)
    }
}

const fn navigation_event(affordance: Affordance) -> SessionEvent {
    match affordance {
        Affordance::Backward => SessionEvent::Prev,
        Affordance::Forward => SessionEvent::Next,
        Affordance::Stop => SessionEvent::Stop,
    }
}

async fn run_session(
    inner: Arc<Inner>,
    mut session: PagingSession,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    last_activity: Arc<Mutex<Instant>>,
) {
    loop {
        let envelope = match timeout_at(session.deadline(), rx.recv()).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => Envelope::signal(SessionEvent::Shutdown),
            Err(_) => Envelope::signal(SessionEvent::Timeout),
        };

        let transition = session.apply(envelope.event, Instant::now());
        *last_activity.lock() = session.last_activity();

        match transition {
            Transition::Render(index) => {
                debug!(session = %session.id(), index, "Paging session navigated");
                if let Err(e) = inner.transport.edit_page(session.message(), &session.current_page()).await {
                    warn!(session = %session.id(), "Failed to re-render page: {}", e);
                }
            }
            Transition::Teardown(reason) => inner.teardown(&mut session, reason).await,
            Transition::Ignored | Transition::Unchanged => {}
        }

        if session.state() == SessionState::Active && inner.config.remove_user_marks {
            if let Some((user, affordance)) = envelope.mark {
                if let Err(e) = inner.transport.remove_mark(session.message(), user, affordance).await {
                    debug!(session = %session.id(), "Could not remove reaction: {}", e);
                }
            }
        }

        if let Some(ack) = envelope.ack {
            let _ = ack.send(session.snapshot());
        }

        if session.state() == SessionState::Closed {
            break;
        }
    }
}

impl Inner {
    async fn teardown(&self, session: &mut PagingSession, reason: CloseReason) {
        let message = session.message();
        if let Err(e) = self.transport.retract_affordances(message).await {
            warn!(session = %session.id(), message = %message, "Failed to retract affordances: {}", e);
        }

        if session.finish() {
            let id = session.id();
            if self.sessions.remove_if(&message, |_, entry| entry.id == id).is_some() {
                self.closed.fetch_add(1, Ordering::Relaxed);
            }
            info!(
                session = %id,
                message = %message,
                reason = ?reason,
                lifetime_secs = session.created_at().elapsed().as_secs(),
                "Paging session closed"
            );
        }
    }
}
