use async_trait::async_trait;
use shared::{
    domain::{ChannelId, MessageId},
    protocol::{ChannelMessage, OutgoingMessage},
};

use crate::error::TransportError;

/// History page size for channel fetches.
pub const FETCH_LIMIT: usize = 100;
/// Bulk deletion accepts between 2 and 100 messages per call.
pub const BULK_DELETE_MIN: usize = 2;
pub const BULK_DELETE_MAX: usize = 100;
/// Messages older than this cannot be bulk deleted.
pub const BULK_DELETE_HORIZON_DAYS: i64 = 14;

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn send_message(
        &self,
        channel: ChannelId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError>;
    async fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError>;
    /// Most recent messages first.
    async fn fetch_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, TransportError>;
    async fn bulk_delete(
        &self,
        channel: ChannelId,
        message_ids: &[MessageId],
    ) -> Result<(), TransportError>;
    async fn delete_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
    ) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    Unanswered,
    Deferred,
    Replied,
}

/// Reply channel for exactly one inbound interaction.
///
/// `reply`, `update` and `defer` are initial responses and fail with
/// [`TransportError::AlreadyAnswered`] once any initial response was given;
/// `follow_up` requires one.
#[async_trait]
pub trait InteractionReplier: Send + Sync {
    fn state(&self) -> ReplyState;
    async fn reply(&self, message: OutgoingMessage) -> Result<(), TransportError>;
    /// Replaces the message carrying the activated control.
    async fn update(&self, message: OutgoingMessage) -> Result<(), TransportError>;
    async fn defer(&self) -> Result<(), TransportError>;
    async fn follow_up(&self, message: OutgoingMessage) -> Result<(), TransportError>;
}
