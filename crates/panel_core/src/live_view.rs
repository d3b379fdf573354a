use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shared::{
    domain::{ChannelId, MessageId},
    protocol::{ChannelMessage, OutgoingMessage},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::TransportError,
    render::SummaryView,
    transport::{ChannelTransport, BULK_DELETE_HORIZON_DAYS, BULK_DELETE_MIN, FETCH_LIMIT},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveView {
    pub handle: MessageId,
    pub last_rendered_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Slot {
    bound: bool,
    view: Option<LiveView>,
}

/// Sole owner of the live summary message in the panel channel.
///
/// Every create-or-edit decision happens while holding `slot`, so concurrent
/// publishers can never both observe "no message yet" and create two.
pub struct LiveViewStore {
    transport: Arc<dyn ChannelTransport>,
    channel: ChannelId,
    slot: Mutex<Slot>,
}

impl LiveViewStore {
    pub fn new(transport: Arc<dyn ChannelTransport>, channel: ChannelId) -> Self {
        Self {
            transport,
            channel,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub async fn current(&self) -> Option<LiveView> {
        self.slot.lock().await.view
    }

    /// One-time channel setup: removes earlier messages (except the live view
    /// itself) and publishes `initial`. Later calls return the existing view.
    pub async fn bind_channel(&self, initial: &SummaryView) -> Result<LiveView, TransportError> {
        let mut slot = self.slot.lock().await;
        if slot.bound {
            if let Some(view) = slot.view {
                return Ok(view);
            }
        } else {
            let keep = slot.view.map(|view| view.handle);
            match self.clear_channel(keep).await {
                Ok(deleted) => info!(channel_id = %self.channel, deleted, "cleared panel channel"),
                Err(error) => {
                    warn!(channel_id = %self.channel, %error, "failed to clear panel channel")
                }
            }
            slot.bound = true;
        }
        self.publish_locked(&mut slot, &OutgoingMessage::from(initial))
            .await
    }

    pub async fn publish_or_update(&self, view: &SummaryView) -> Result<LiveView, TransportError> {
        let mut slot = self.slot.lock().await;
        self.publish_locked(&mut slot, &OutgoingMessage::from(view))
            .await
    }

    async fn publish_locked(
        &self,
        slot: &mut Slot,
        message: &OutgoingMessage,
    ) -> Result<LiveView, TransportError> {
        if let Some(current) = slot.view {
            match self
                .transport
                .edit_message(self.channel, current.handle, message)
                .await
            {
                Ok(()) => {
                    let view = LiveView {
                        handle: current.handle,
                        last_rendered_at: Utc::now(),
                    };
                    slot.view = Some(view);
                    return Ok(view);
                }
                Err(TransportError::NotFound) => {
                    warn!(
                        channel_id = %self.channel,
                        message_id = %current.handle,
                        "live view message vanished; publishing a replacement"
                    );
                    slot.view = None;
                }
                Err(error) => return Err(error),
            }
        }

        let handle = self.transport.send_message(self.channel, message).await?;
        info!(channel_id = %self.channel, message_id = %handle, "published live view");
        let view = LiveView {
            handle,
            last_rendered_at: Utc::now(),
        };
        slot.view = Some(view);
        Ok(view)
    }

    /// Deletes recent messages in rounds until fewer than two deletable ones
    /// remain. Messages past the bulk-delete horizon are left in place.
    async fn clear_channel(&self, keep: Option<MessageId>) -> Result<usize, TransportError> {
        let mut deleted = 0;
        loop {
            let horizon = Utc::now() - Duration::days(BULK_DELETE_HORIZON_DAYS);
            let batch = self
                .transport
                .fetch_messages(self.channel, FETCH_LIMIT)
                .await?;
            let fetched = batch.len();
            let deletable: Vec<MessageId> = batch
                .into_iter()
                .filter(|message| is_deletable(message, keep, horizon))
                .map(|message| message.message_id)
                .collect();
            let retained = fetched - deletable.len();

            match deletable.as_slice() {
                [] => {
                    if retained > 0 {
                        info!(
                            channel_id = %self.channel,
                            retained,
                            "leaving messages that cannot be bulk deleted"
                        );
                    }
                    return Ok(deleted);
                }
                [single] => {
                    self.transport.delete_message(self.channel, *single).await?;
                    return Ok(deleted + 1);
                }
                many => {
                    debug_assert!(many.len() >= BULK_DELETE_MIN);
                    self.transport.bulk_delete(self.channel, many).await?;
                    deleted += many.len();
                    info!(channel_id = %self.channel, count = many.len(), "deleted messages");
                }
            }
        }
    }
}

fn is_deletable(message: &ChannelMessage, keep: Option<MessageId>, horizon: DateTime<Utc>) -> bool {
    Some(message.message_id) != keep && message.created_at > horizon
}

#[cfg(test)]
#[path = "tests/live_view_tests.rs"]
mod tests;
