//! Discord REST adapter for the panel's channel and follow-up traffic.

use async_trait::async_trait;
use panel_core::{ChannelTransport, TransportError};
use reqwest::{header::AUTHORIZATION, Client, Method, RequestBuilder, Response, StatusCode};
use shared::{
    domain::{ApplicationId, ChannelId, MessageId},
    protocol::{ChannelMessage, OutgoingMessage},
};
use tracing::{debug, warn};
use url::Url;

pub mod replier;
pub mod wire;

pub use replier::HttpInteractionReplier;

use wire::{BulkDeleteBody, CreatedMessage, HistoryMessage, MessagePayload};

pub struct DiscordRest {
    http: Client,
    api_base: String,
    token: String,
    application_id: ApplicationId,
}

impl DiscordRest {
    pub fn new(api_base: &Url, token: impl Into<String>, application_id: ApplicationId) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.as_str().trim_end_matches('/').to_string(),
            token: token.into(),
            application_id,
        }
    }

    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    fn bot(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_base))
            .header(AUTHORIZATION, format!("Bot {}", self.token))
    }

    /// Webhook calls authenticate with the interaction token in the path.
    fn webhook(&self, method: Method, interaction_token: &str, suffix: &str) -> RequestBuilder {
        self.http.request(
            method,
            format!(
                "{}/webhooks/{}/{interaction_token}{suffix}",
                self.api_base, self.application_id
            ),
        )
    }

    /// Posts a follow-up message for an interaction that was already answered.
    pub async fn follow_up(
        &self,
        interaction_token: &str,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        let request = self
            .webhook(Method::POST, interaction_token, "")
            .json(&MessagePayload::from(message));
        execute(request).await?;
        Ok(())
    }

    /// Replaces the message the interaction originally answered with.
    pub async fn edit_original(
        &self,
        interaction_token: &str,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        let request = self
            .webhook(Method::PATCH, interaction_token, "/messages/@original")
            .json(&MessagePayload::from(message));
        execute(request).await?;
        Ok(())
    }
}

async fn execute(request: RequestBuilder) -> Result<Response, TransportError> {
    let response = request
        .send()
        .await
        .map_err(|error| TransportError::Request(error.to_string()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(TransportError::NotFound);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %body, "discord request rejected");
        return Err(TransportError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn decode_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    response
        .json()
        .await
        .map_err(|error| TransportError::Request(format!("invalid response body: {error}")))
}

#[async_trait]
impl ChannelTransport for DiscordRest {
    async fn send_message(
        &self,
        channel: ChannelId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        let request = self
            .bot(Method::POST, &format!("/channels/{channel}/messages"))
            .json(&MessagePayload::from(message));
        let created: CreatedMessage = decode_json(execute(request).await?).await?;
        let id = wire::parse_snowflake(&created.id)
            .map_err(|error| TransportError::Request(error.to_string()))?;
        debug!(%channel, message_id = id, "message created");
        Ok(MessageId(id))
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        let request = self
            .bot(
                Method::PATCH,
                &format!("/channels/{channel}/messages/{message_id}"),
            )
            .json(&MessagePayload::from(message));
        execute(request).await?;
        Ok(())
    }

    async fn fetch_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, TransportError> {
        let request = self
            .bot(Method::GET, &format!("/channels/{channel}/messages"))
            .query(&[("limit", limit)]);
        let history: Vec<HistoryMessage> = decode_json(execute(request).await?).await?;
        history
            .into_iter()
            .map(|message| {
                message
                    .into_channel_message()
                    .map_err(|error| TransportError::Request(error.to_string()))
            })
            .collect()
    }

    async fn bulk_delete(
        &self,
        channel: ChannelId,
        message_ids: &[MessageId],
    ) -> Result<(), TransportError> {
        let body = BulkDeleteBody {
            messages: message_ids.iter().map(ToString::to_string).collect(),
        };
        let request = self
            .bot(
                Method::POST,
                &format!("/channels/{channel}/messages/bulk-delete"),
            )
            .json(&body);
        execute(request).await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        let request = self.bot(
            Method::DELETE,
            &format!("/channels/{channel}/messages/{message_id}"),
        );
        execute(request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
