//! Discord JSON shapes and their mapping to the panel's protocol types.

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{ChannelId, MessageId, UserId},
    protocol::{
        ActionRow, ButtonStyle, ChannelMessage, Component, Embed, InteractionEvent,
        InteractionKind, OutgoingMessage,
    },
};

pub const EPHEMERAL_FLAG: u64 = 1 << 6;

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_COMMAND: u8 = 2;
pub const INTERACTION_COMPONENT: u8 = 3;

const COMPONENT_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const COMPONENT_STRING_SELECT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum ResponseType {
    Pong = 1,
    ChannelMessage = 4,
    DeferredChannelMessage = 5,
    DeferredUpdate = 6,
    UpdateMessage = 7,
}

impl From<ResponseType> for u8 {
    fn from(kind: ResponseType) -> Self {
        kind as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessagePayload>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: ResponseType::Pong,
            data: None,
        }
    }

    /// Acknowledgement without content. A deferred channel message decides
    /// the visibility of the follow-up that replaces it, so it is ephemeral.
    pub fn deferred(kind: ResponseType) -> Self {
        let data = (kind == ResponseType::DeferredChannelMessage).then(|| MessagePayload {
            content: None,
            embeds: Vec::new(),
            components: Vec::new(),
            flags: Some(EPHEMERAL_FLAG),
        });
        Self { kind, data }
    }

    pub fn with_message(kind: ResponseType, message: &OutgoingMessage) -> Self {
        Self {
            kind,
            data: Some(MessagePayload::from(message)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<EmbedPayload>,
    pub components: Vec<RowPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedPayload {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPayload {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<ComponentPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComponentPayload {
    Button {
        #[serde(rename = "type")]
        kind: u8,
        style: u8,
        label: String,
        custom_id: String,
        disabled: bool,
    },
    StringSelect {
        #[serde(rename = "type")]
        kind: u8,
        custom_id: String,
        placeholder: String,
        options: Vec<OptionPayload>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionPayload {
    pub label: String,
    pub value: String,
}

fn button_style(style: ButtonStyle) -> u8 {
    match style {
        ButtonStyle::Primary => 1,
        ButtonStyle::Secondary => 2,
        ButtonStyle::Success => 3,
        ButtonStyle::Danger => 4,
    }
}

impl From<&Embed> for EmbedPayload {
    fn from(embed: &Embed) -> Self {
        Self {
            title: embed.title.clone(),
            description: embed.description.clone(),
            color: embed.color,
            timestamp: embed.timestamp.to_rfc3339(),
        }
    }
}

impl From<&ActionRow> for RowPayload {
    fn from(row: &ActionRow) -> Self {
        let components = row
            .components
            .iter()
            .map(|component| match component {
                Component::Button(button) => ComponentPayload::Button {
                    kind: COMPONENT_BUTTON,
                    style: button_style(button.style),
                    label: button.label.clone(),
                    custom_id: button.custom_id.clone(),
                    disabled: button.disabled,
                },
                Component::Select(menu) => ComponentPayload::StringSelect {
                    kind: COMPONENT_STRING_SELECT,
                    custom_id: menu.custom_id.clone(),
                    placeholder: menu.placeholder.clone(),
                    options: menu
                        .options
                        .iter()
                        .map(|option| OptionPayload {
                            label: option.label.clone(),
                            value: option.value.clone(),
                        })
                        .collect(),
                },
            })
            .collect();
        Self {
            kind: COMPONENT_ROW,
            components,
        }
    }
}

impl From<&OutgoingMessage> for MessagePayload {
    fn from(message: &OutgoingMessage) -> Self {
        Self {
            content: message.content.clone(),
            embeds: message.embeds.iter().map(EmbedPayload::from).collect(),
            components: message.rows.iter().map(RowPayload::from).collect(),
            flags: message.ephemeral.then_some(EPHEMERAL_FLAG),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatedMessage {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryMessage {
    pub fn into_channel_message(self) -> anyhow::Result<ChannelMessage> {
        Ok(ChannelMessage {
            message_id: MessageId(parse_snowflake(&self.id)?),
            created_at: self.timestamp,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteBody {
    pub messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub member: Option<MemberPayload>,
    #[serde(default)]
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub message: Option<MessageRef>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub component_type: Option<u8>,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberPayload {
    pub user: UserPayload,
}

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRef {
    #[serde(default)]
    pub content: String,
}

impl InteractionPayload {
    /// Guild interactions carry the invoker under `member`, DMs under `user`.
    fn invoker(&self) -> Option<&UserPayload> {
        self.member
            .as_ref()
            .map(|member| &member.user)
            .or(self.user.as_ref())
    }

    pub fn to_event(&self) -> anyhow::Result<InteractionEvent> {
        let data = self.data.as_ref().context("interaction has no data")?;
        let kind = match self.kind {
            INTERACTION_COMMAND => InteractionKind::Command {
                name: data.name.clone().context("command interaction without name")?,
            },
            INTERACTION_COMPONENT => match data.component_type {
                Some(COMPONENT_BUTTON) => InteractionKind::Button,
                Some(COMPONENT_STRING_SELECT) => InteractionKind::SelectMenu,
                other => bail!("unsupported component type {other:?}"),
            },
            other => bail!("unsupported interaction type {other}"),
        };

        let user = self.invoker().ok_or_else(|| anyhow!("interaction without invoker"))?;
        let channel_id = self
            .channel_id
            .as_deref()
            .map(parse_snowflake)
            .transpose()?
            .map(ChannelId);

        Ok(InteractionEvent {
            interaction_id: self.id.clone(),
            kind,
            custom_id: data.custom_id.clone().unwrap_or_default(),
            values: data.values.clone(),
            user_id: UserId(parse_snowflake(&user.id)?),
            channel_id,
            message_content: self.message.as_ref().map(|message| message.content.clone()),
        })
    }
}

pub fn parse_snowflake(raw: &str) -> anyhow::Result<u64> {
    raw.parse()
        .with_context(|| format!("invalid snowflake '{raw}'"))
}

#[cfg(test)]
#[path = "tests/wire_tests.rs"]
mod tests;
