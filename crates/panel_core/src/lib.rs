//! Session and synchronization controller for the pm2 control panel.
//!
//! Keeps one live summary message per channel in sync with the supervisor and
//! drives the stateless list → page → select → act interaction flow.

use std::time::Duration;

pub mod codec;
pub mod error;
pub mod interaction;
pub mod live_view;
pub mod refresh;
pub mod render;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use codec::{ActionKind, ActionToken, PageIndicator};
pub use error::{DecodeError, PanelError, RefreshCycleError, TransportError};
pub use interaction::InteractionController;
pub use live_view::{LiveView, LiveViewStore};
pub use refresh::{RefreshLoop, RefreshPhase};
pub use transport::{ChannelTransport, InteractionReplier, ReplyState};

/// Menu entries per page; the transport caps select menus at 25 options.
pub const PAGE_SIZE: usize = 25;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);
