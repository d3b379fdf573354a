use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pm2_integration::{ProcessSupervisor, SupervisorError};
use shared::{
    domain::{ChannelId, LifecycleAction, MessageId, ProcessId, ProcessRecord, ProcessStatus},
    protocol::{ChannelMessage, OutgoingMessage},
};
use tokio::time::Instant;

use crate::{
    error::TransportError,
    transport::{ChannelTransport, InteractionReplier, ReplyState},
};

pub(crate) const PANEL_CHANNEL: ChannelId = ChannelId(42);

pub(crate) fn record(id: u32, name: &str, status: ProcessStatus) -> ProcessRecord {
    ProcessRecord {
        id: ProcessId::from(id),
        name: name.to_string(),
        status,
    }
}

#[derive(Default)]
pub(crate) struct FakeSupervisor {
    pub records: StdMutex<Vec<ProcessRecord>>,
    pub list_error: StdMutex<Option<SupervisorError>>,
    pub action_errors: StdMutex<HashMap<(LifecycleAction, String), SupervisorError>>,
    pub actions: StdMutex<Vec<(LifecycleAction, String)>>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl FakeSupervisor {
    pub fn with_records(records: Vec<ProcessRecord>) -> Arc<Self> {
        let fake = Self::default();
        *fake.records.lock().expect("lock") = records;
        Arc::new(fake)
    }

    pub fn fail_list(&self, error: SupervisorError) {
        *self.list_error.lock().expect("lock") = Some(error);
    }

    pub fn fail_action(&self, action: LifecycleAction, id: &str, error: SupervisorError) {
        self.action_errors
            .lock()
            .expect("lock")
            .insert((action, id.to_string()), error);
    }

    pub fn actions(&self) -> Vec<(LifecycleAction, String)> {
        self.actions.lock().expect("lock").clone()
    }

    fn apply_action(&self, action: LifecycleAction, id: &ProcessId) -> Result<(), SupervisorError> {
        self.actions
            .lock()
            .expect("lock")
            .push((action, id.as_str().to_string()));
        match self
            .action_errors
            .lock()
            .expect("lock")
            .get(&(action, id.as_str().to_string()))
        {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProcessSupervisor for FakeSupervisor {
    async fn connect(&self) -> Result<(), SupervisorError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProcessRecord>, SupervisorError> {
        if let Some(error) = self.list_error.lock().expect("lock").clone() {
            return Err(error);
        }
        Ok(self.records.lock().expect("lock").clone())
    }

    async fn start(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.apply_action(LifecycleAction::Start, id)
    }

    async fn stop(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.apply_action(LifecycleAction::Stop, id)
    }

    async fn restart(&self, id: &ProcessId) -> Result<(), SupervisorError> {
        self.apply_action(LifecycleAction::Restart, id)
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory channel. `publish_delay` makes sends and edits slow so tests can
/// force interleavings; `publish_log` records when each publish ran.
#[derive(Default)]
pub(crate) struct FakeTransport {
    pub messages: StdMutex<Vec<ChannelMessage>>,
    pub sent: StdMutex<Vec<OutgoingMessage>>,
    pub edits: AtomicUsize,
    pub bulk_deletes: AtomicUsize,
    pub single_deletes: AtomicUsize,
    pub publish_delay: Option<Duration>,
    pub fail_edits_with: StdMutex<Option<TransportError>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub publish_log: StdMutex<Vec<(Instant, Instant)>>,
    next_id: AtomicU64,
}

impl FakeTransport {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            publish_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seed_message(&self, id: u64, created_at: DateTime<Utc>) {
        self.messages.lock().expect("lock").push(ChannelMessage {
            message_id: MessageId(id),
            created_at,
        });
    }

    pub fn sends(&self) -> usize {
        self.sent.lock().expect("lock").len()
    }

    pub fn remaining_ids(&self) -> Vec<u64> {
        self.messages
            .lock()
            .expect("lock")
            .iter()
            .map(|message| message.message_id.0)
            .collect()
    }

    async fn publish_window<T>(&self, op: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.publish_delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        let result = op();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.publish_log
            .lock()
            .expect("lock")
            .push((started, Instant::now()));
        result
    }
}

#[async_trait]
impl ChannelTransport for FakeTransport {
    async fn send_message(
        &self,
        _channel: ChannelId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        let id = self
            .publish_window(|| {
                let id = MessageId(1_000_000 + self.next_id.fetch_add(1, Ordering::SeqCst));
                self.sent.lock().expect("lock").push(message.clone());
                self.messages.lock().expect("lock").insert(
                    0,
                    ChannelMessage {
                        message_id: id,
                        created_at: Utc::now(),
                    },
                );
                id
            })
            .await;
        Ok(id)
    }

    async fn edit_message(
        &self,
        _channel: ChannelId,
        message_id: MessageId,
        _message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.publish_window(|| {
            if let Some(error) = self.fail_edits_with.lock().expect("lock").clone() {
                return Err(error);
            }
            let exists = self
                .messages
                .lock()
                .expect("lock")
                .iter()
                .any(|message| message.message_id == message_id);
            if !exists {
                return Err(TransportError::NotFound);
            }
            self.edits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
    }

    async fn fetch_messages(
        &self,
        _channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, TransportError> {
        Ok(self
            .messages
            .lock()
            .expect("lock")
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn bulk_delete(
        &self,
        _channel: ChannelId,
        message_ids: &[MessageId],
    ) -> Result<(), TransportError> {
        assert!((2..=100).contains(&message_ids.len()), "bulk delete size");
        self.bulk_deletes.fetch_add(1, Ordering::SeqCst);
        self.messages
            .lock()
            .expect("lock")
            .retain(|message| !message_ids.contains(&message.message_id));
        Ok(())
    }

    async fn delete_message(
        &self,
        _channel: ChannelId,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        self.single_deletes.fetch_add(1, Ordering::SeqCst);
        self.messages
            .lock()
            .expect("lock")
            .retain(|message| message.message_id != message_id);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Reply(OutgoingMessage),
    Update(OutgoingMessage),
    Defer,
    FollowUp(OutgoingMessage),
}

/// Records every response. Enforces the one-initial-response rule the way
/// the real transport does.
pub(crate) struct FakeReplier {
    pub state: StdMutex<ReplyState>,
    pub sent: StdMutex<Vec<Sent>>,
    pub fail_sends: bool,
}

impl FakeReplier {
    pub fn new() -> Self {
        Self::with_state(ReplyState::Unanswered)
    }

    pub fn with_state(state: ReplyState) -> Self {
        Self {
            state: StdMutex::new(state),
            sent: StdMutex::new(Vec::new()),
            fail_sends: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("lock").clone()
    }

    fn initial(&self, next: ReplyState, sent: Sent) -> Result<(), TransportError> {
        let mut state = self.state.lock().expect("lock");
        if *state != ReplyState::Unanswered {
            return Err(TransportError::AlreadyAnswered);
        }
        if self.fail_sends {
            return Err(TransportError::Request("connection reset".into()));
        }
        *state = next;
        self.sent.lock().expect("lock").push(sent);
        Ok(())
    }
}

#[async_trait]
impl InteractionReplier for FakeReplier {
    fn state(&self) -> ReplyState {
        *self.state.lock().expect("lock")
    }

    async fn reply(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        self.initial(ReplyState::Replied, Sent::Reply(message))
    }

    async fn update(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        self.initial(ReplyState::Replied, Sent::Update(message))
    }

    async fn defer(&self) -> Result<(), TransportError> {
        if self.fail_sends {
            // Deferral is an HTTP response in the real transport and does not fail separately.
            let mut state = self.state.lock().expect("lock");
            *state = ReplyState::Deferred;
            self.sent.lock().expect("lock").push(Sent::Defer);
            return Ok(());
        }
        self.initial(ReplyState::Deferred, Sent::Defer)
    }

    async fn follow_up(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        let mut state = self.state.lock().expect("lock");
        if *state == ReplyState::Unanswered {
            return Err(TransportError::Request("nothing to follow up".into()));
        }
        if self.fail_sends {
            return Err(TransportError::Request("connection reset".into()));
        }
        *state = ReplyState::Replied;
        self.sent.lock().expect("lock").push(Sent::FollowUp(message));
        Ok(())
    }
}
