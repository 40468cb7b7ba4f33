//! In-memory transport for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use zibot_common::{ChannelId, MessageId, MessageRef, UserId};

use crate::paging::Page;
use crate::transport::{Affordance, Transport, TransportError};

/// One recorded outbound operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `send_text`
    SendText {
        /// Created message.
        message: MessageRef,
        /// Text sent.
        content: String,
    },
    /// `send_page`
    SendPage {
        /// Created message.
        message: MessageRef,
        /// Page sent.
        page: Page,
        /// Affordances attached.
        affordances: Vec<Affordance>,
    },
    /// `edit_page`
    EditPage {
        /// Edited message.
        message: MessageRef,
        /// New content.
        page: Page,
    },
    /// `retract_affordances`
    Retract(MessageRef),
    /// `remove_mark`
    RemoveMark {
        /// Message the mark was on.
        message: MessageRef,
        /// User whose mark was removed.
        user: UserId,
        /// Affordance unmarked.
        affordance: Affordance,
    },
    /// `delete_message`
    Delete(MessageRef),
}

/// A [`Transport`] that records every call and fabricates message ids.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<TransportCall>>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
}

impl RecordingTransport {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with a platform error
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    /// Texts sent so far
    pub fn texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::SendText { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    /// Pages sent or edited onto `message`, in order
    pub fn pages_on(&self, message: MessageRef) -> Vec<Page> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::SendPage { message: m, page, .. }
                | TransportCall::EditPage { message: m, page } if *m == message => Some(page.clone()),
                _ => None,
            })
            .collect()
    }

    /// How many times affordances were retracted from `message`
    pub fn retractions(&self, message: MessageRef) -> usize {
        self.count(|call| *call == TransportCall::Retract(message))
    }

    /// How many messages were deleted
    pub fn deletions(&self) -> usize {
        self.count(|call| matches!(call, TransportCall::Delete(_)))
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Calls grouped by message
    pub fn by_message(&self) -> HashMap<MessageRef, usize> {
        let mut counts = HashMap::new();
        for call in self.calls.lock().iter() {
            let message = match call {
                TransportCall::SendText { message, .. }
                | TransportCall::SendPage { message, .. }
                | TransportCall::EditPage { message, .. }
                | TransportCall::RemoveMark { message, .. }
                | TransportCall::Retract(message)
                | TransportCall::Delete(message) => *message,
            };
            *counts.entry(message).or_insert(0) += 1;
        }
        counts
    }

    fn allocate(&self, channel: ChannelId) -> Result<MessageRef, TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Platform("send disabled".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageRef::new(channel, MessageId(id)))
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, destination: ChannelId, content: &str) -> Result<MessageRef, TransportError> {
        let message = self.allocate(destination)?;
        self.record(TransportCall::SendText {
            message,
            content: content.to_string(),
        });
        Ok(message)
    }

    async fn send_page(
        &self,
        destination: ChannelId,
        page: &Page,
        affordances: &[Affordance],
    ) -> Result<MessageRef, TransportError> {
        let message = self.allocate(destination)?;
        self.record(TransportCall::SendPage {
            message,
            page: page.clone(),
            affordances: affordances.to_vec(),
        });
        Ok(message)
    }

    async fn edit_page(&self, message: MessageRef, page: &Page) -> Result<(), TransportError> {
        self.record(TransportCall::EditPage {
            message,
            page: page.clone(),
        });
        Ok(())
    }

    async fn retract_affordances(&self, message: MessageRef) -> Result<(), TransportError> {
        self.record(TransportCall::Retract(message));
        Ok(())
    }

    async fn remove_mark(
        &self,
        message: MessageRef,
        user: UserId,
        affordance: Affordance,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::RemoveMark {
            message,
            user,
            affordance,
        });
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), TransportError> {
        self.record(TransportCall::Delete(message));
        Ok(())
    }
}
