use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use panel_core::{InteractionReplier, ReplyState, TransportError};
use shared::protocol::OutgoingMessage;
use tokio::sync::oneshot;

use super::{
    wire::{InteractionResponse, ResponseType},
    DiscordRest,
};

struct Inner {
    state: ReplyState,
    initial: Option<oneshot::Sender<InteractionResponse>>,
    /// Set when the endpoint acknowledged on the controller's behalf.
    acknowledged_by_endpoint: bool,
}

enum Route {
    Initial(oneshot::Sender<InteractionResponse>),
    Webhook,
}

/// Answers one HTTP interaction. The first answer becomes the HTTP response
/// body; follow-ups go through the interaction webhook.
pub struct HttpInteractionReplier {
    inner: Mutex<Inner>,
    rest: Arc<DiscordRest>,
    interaction_token: String,
    deferred_kind: ResponseType,
}

impl HttpInteractionReplier {
    /// `deferred_kind` is the acknowledgement valid for the interaction type:
    /// a deferred update for components, a deferred message for commands.
    pub fn new(
        rest: Arc<DiscordRest>,
        interaction_token: impl Into<String>,
        deferred_kind: ResponseType,
    ) -> (Self, oneshot::Receiver<InteractionResponse>) {
        let (tx, rx) = oneshot::channel();
        let replier = Self {
            inner: Mutex::new(Inner {
                state: ReplyState::Unanswered,
                initial: Some(tx),
                acknowledged_by_endpoint: false,
            }),
            rest,
            interaction_token: interaction_token.into(),
            deferred_kind,
        };
        (replier, rx)
    }

    /// Called by the endpoint when its response deadline passes. Returns
    /// true if the interaction was still unanswered and is now deferred;
    /// later answers are then delivered through the webhook.
    pub fn acknowledge_pending(&self) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        if inner.state != ReplyState::Unanswered {
            return false;
        }
        inner.initial = None;
        inner.state = ReplyState::Deferred;
        inner.acknowledged_by_endpoint = true;
        true
    }

    /// Drops the pending HTTP response so the endpoint stops waiting for it.
    pub fn finish(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.initial = None;
        }
    }

    fn claim(&self, next: ReplyState) -> Result<Route, TransportError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| TransportError::Request("reply state poisoned".into()))?;
        match inner.state {
            ReplyState::Unanswered => {
                let sender = inner.initial.take().ok_or_else(|| {
                    TransportError::Request("interaction response already taken".into())
                })?;
                inner.state = next;
                Ok(Route::Initial(sender))
            }
            ReplyState::Deferred if inner.acknowledged_by_endpoint => {
                inner.state = next;
                Ok(Route::Webhook)
            }
            _ => Err(TransportError::AlreadyAnswered),
        }
    }

    fn respond(
        sender: oneshot::Sender<InteractionResponse>,
        response: InteractionResponse,
    ) -> Result<(), TransportError> {
        sender
            .send(response)
            .map_err(|_| TransportError::Request("interaction request closed".into()))
    }
}

#[async_trait]
impl InteractionReplier for HttpInteractionReplier {
    fn state(&self) -> ReplyState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(ReplyState::Replied)
    }

    async fn reply(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        match self.claim(ReplyState::Replied)? {
            Route::Initial(sender) => Self::respond(
                sender,
                InteractionResponse::with_message(ResponseType::ChannelMessage, &message),
            ),
            Route::Webhook => self.rest.follow_up(&self.interaction_token, &message).await,
        }
    }

    async fn update(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        match self.claim(ReplyState::Replied)? {
            Route::Initial(sender) => Self::respond(
                sender,
                InteractionResponse::with_message(ResponseType::UpdateMessage, &message),
            ),
            Route::Webhook => self.rest.edit_original(&self.interaction_token, &message).await,
        }
    }

    async fn defer(&self) -> Result<(), TransportError> {
        match self.claim(ReplyState::Deferred)? {
            Route::Initial(sender) => {
                Self::respond(sender, InteractionResponse::deferred(self.deferred_kind))
            }
            Route::Webhook => Ok(()),
        }
    }

    async fn follow_up(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        if self.state() == ReplyState::Unanswered {
            return Err(TransportError::Request(
                "follow-up before the interaction was answered".into(),
            ));
        }
        self.rest.follow_up(&self.interaction_token, &message).await?;
        if let Ok(mut inner) = self.inner.lock() {
            inner.state = ReplyState::Replied;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/replier_tests.rs"]
mod tests;
