use std::{sync::Arc, time::Duration};

use ed25519_dalek::VerifyingKey;
use panel_core::InteractionController;

use crate::discord::DiscordRest;

/// Discord drops an interaction that is not answered within three seconds.
pub(crate) const ACK_DEADLINE: Duration = Duration::from_millis(2500);

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) controller: Arc<InteractionController>,
    pub(crate) rest: Arc<DiscordRest>,
    pub(crate) public_key: VerifyingKey,
    pub(crate) ack_deadline: Duration,
}
