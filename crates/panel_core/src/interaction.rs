//! Per-event state machine for the guided selection flow.
//!
//! Every event is handled from what it carries plus a fresh snapshot; the
//! controller keeps no session state between events.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use pm2_integration::ProcessSupervisor;
use shared::{
    domain::{ChannelId, LifecycleAction, ProcessId},
    protocol::{InteractionEvent, InteractionKind, OutgoingMessage},
};
use tracing::{error, info, warn};

use crate::{
    codec::{decode, ActionToken, PageIndicator},
    error::{DecodeError, PanelError},
    render::{render_action_choices, render_outcome, render_page},
    transport::{InteractionReplier, ReplyState},
};

pub const PANEL_COMMAND: &str = "pm2";

pub const INVALID_ACTION: &str = "Invalid action. Please try again.";
pub const LOAD_FAILED: &str = "Error loading process list.";
pub const WRONG_CHANNEL: &str = "This panel only works in its configured channel.";
pub const GENERIC_FAILURE: &str =
    "There was an issue processing the request. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Back,
    Forward,
}

/// Maps an inbound event to the action it requests. Pure.
pub fn classify(event: &InteractionEvent) -> Result<ActionToken, DecodeError> {
    match &event.kind {
        InteractionKind::Command { name } if name == PANEL_COMMAND => Ok(ActionToken::OpenMenu),
        InteractionKind::Command { name } => Err(DecodeError::UnknownKind(name.clone())),
        InteractionKind::Button => match decode(&event.custom_id)? {
            ActionToken::SelectProcess { target: None } => {
                Err(DecodeError::MalformedToken(event.custom_id.clone()))
            }
            token => Ok(token),
        },
        InteractionKind::SelectMenu => match decode(&event.custom_id)? {
            ActionToken::SelectProcess { target: Some(target) } => {
                Ok(ActionToken::SelectProcess {
                    target: Some(target),
                })
            }
            ActionToken::SelectProcess { target: None } => {
                let value = event
                    .values
                    .first()
                    .ok_or_else(|| DecodeError::MalformedToken(event.custom_id.clone()))?;
                let target = ProcessId::parse(value)
                    .map_err(|_| DecodeError::MalformedToken(value.clone()))?;
                Ok(ActionToken::SelectProcess {
                    target: Some(target),
                })
            }
            _ => Err(DecodeError::MalformedToken(event.custom_id.clone())),
        },
    }
}

pub struct InteractionController {
    supervisor: Arc<dyn ProcessSupervisor>,
    channel: ChannelId,
}

impl InteractionController {
    pub fn new(supervisor: Arc<dyn ProcessSupervisor>, channel: ChannelId) -> Self {
        Self {
            supervisor,
            channel,
        }
    }

    /// Single entry point for inbound events. Never fails: every error ends
    /// here, and the invoking user gets at most one reply.
    pub async fn handle(&self, event: &InteractionEvent, replier: &dyn InteractionReplier) {
        let started = Instant::now();
        if replier.state() != ReplyState::Unanswered {
            info!(
                custom_id = %event.custom_id,
                user_id = %event.user_id,
                "interaction already answered; ignoring"
            );
            return;
        }

        info!(
            custom_id = %event.custom_id,
            user_id = %event.user_id,
            kind = ?event.kind,
            "interaction received"
        );

        if let Err(error) = self.dispatch(event, replier).await {
            error!(
                custom_id = %event.custom_id,
                user_id = %event.user_id,
                elapsed_ms = whole_millis(started.elapsed()),
                %error,
                "failed to process interaction"
            );
            report_failure(replier).await;
            return;
        }

        info!(
            custom_id = %event.custom_id,
            elapsed_ms = whole_millis(started.elapsed()),
            "interaction processed"
        );
    }

    async fn dispatch(
        &self,
        event: &InteractionEvent,
        replier: &dyn InteractionReplier,
    ) -> Result<(), PanelError> {
        if event.channel_id != Some(self.channel) {
            warn!(channel_id = ?event.channel_id, "interaction outside the panel channel");
            replier
                .reply(OutgoingMessage::ephemeral_text(WRONG_CHANNEL))
                .await?;
            return Ok(());
        }

        let token = match classify(event) {
            Ok(token) => token,
            Err(error) => {
                warn!(%error, "rejecting interaction");
                replier
                    .reply(OutgoingMessage::ephemeral_text(INVALID_ACTION))
                    .await?;
                return Ok(());
            }
        };

        match token {
            ActionToken::OpenMenu => self.open_menu(replier).await,
            ActionToken::PaginatePrev { page } => {
                self.paginate(event, page, Step::Back, replier).await
            }
            ActionToken::PaginateNext { page } => {
                self.paginate(event, page, Step::Forward, replier).await
            }
            ActionToken::SelectProcess {
                target: Some(target),
            } => {
                replier
                    .reply(render_action_choices(&target).into())
                    .await?;
                Ok(())
            }
            ActionToken::SelectProcess { target: None } => {
                replier
                    .reply(OutgoingMessage::ephemeral_text(INVALID_ACTION))
                    .await?;
                Ok(())
            }
            ActionToken::Lifecycle { action, target } => {
                self.run_lifecycle(action, &target, replier).await
            }
        }
    }

    async fn open_menu(&self, replier: &dyn InteractionReplier) -> Result<(), PanelError> {
        match pm2_integration::snapshot(&self.supervisor).await {
            Ok(snapshot) => replier.reply(render_page(&snapshot, 0).into()).await?,
            Err(error) => {
                error!(%error, "failed to load process list");
                replier
                    .reply(OutgoingMessage::ephemeral_text(LOAD_FAILED))
                    .await?;
            }
        }
        Ok(())
    }

    async fn paginate(
        &self,
        event: &InteractionEvent,
        page: Option<usize>,
        step: Step,
        replier: &dyn InteractionReplier,
    ) -> Result<(), PanelError> {
        let current = match page {
            Some(page) => page,
            None => match event
                .message_content
                .as_deref()
                .map(PageIndicator::parse)
            {
                Some(Ok(indicator)) => indicator.page,
                Some(Err(error)) => {
                    warn!(%error, "unreadable page indicator");
                    replier
                        .reply(OutgoingMessage::ephemeral_text(INVALID_ACTION))
                        .await?;
                    return Ok(());
                }
                None => {
                    warn!("navigation without page or displayed view");
                    replier
                        .reply(OutgoingMessage::ephemeral_text(INVALID_ACTION))
                        .await?;
                    return Ok(());
                }
            },
        };

        let snapshot = match pm2_integration::snapshot(&self.supervisor).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                error!(%error, "failed to load process list");
                replier
                    .reply(OutgoingMessage::ephemeral_text(LOAD_FAILED))
                    .await?;
                return Ok(());
            }
        };

        let target = match step {
            Step::Back => current.saturating_sub(1),
            Step::Forward => current.saturating_add(1),
        };
        replier.update(render_page(&snapshot, target).into()).await?;
        Ok(())
    }

    async fn run_lifecycle(
        &self,
        action: LifecycleAction,
        target: &ProcessId,
        replier: &dyn InteractionReplier,
    ) -> Result<(), PanelError> {
        replier.defer().await?;

        let message = match pm2_integration::run_action(&self.supervisor, action, target).await {
            Ok(()) => {
                info!(%action, process_id = %target, "lifecycle action succeeded");
                render_outcome(action, target, true, None)
            }
            Err(error) => {
                error!(%action, process_id = %target, %error, "lifecycle action failed");
                render_outcome(action, target, false, Some(error.detail()))
            }
        };
        replier
            .follow_up(OutgoingMessage::ephemeral_text(message))
            .await?;
        Ok(())
    }
}

/// Best-effort error notice. A failure here is logged and dropped.
async fn report_failure(replier: &dyn InteractionReplier) {
    let notice = OutgoingMessage::ephemeral_text(GENERIC_FAILURE);
    let sent = match replier.state() {
        ReplyState::Unanswered => replier.reply(notice).await,
        ReplyState::Deferred => replier.follow_up(notice).await,
        ReplyState::Replied => {
            warn!("interaction already replied; not sending error notice");
            return;
        }
    };
    if let Err(error) = sent {
        error!(%error, "failed to send error reply");
    }
}

/// Milliseconds for log fields, saturating at `u64::MAX`.
fn whole_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "tests/interaction_tests.rs"]
mod tests;
