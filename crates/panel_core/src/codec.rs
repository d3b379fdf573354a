//! Action identifiers carried by interactive controls.
//!
//! Grammar: `pm2:<kind>[:<arg>]`. The argument is a zero-based page for
//! navigation and a [`ProcessId`] for selection and lifecycle actions. Ids are
//! restricted to delimiter-free characters, so no escaping is needed.

use std::fmt;

use shared::domain::{LifecycleAction, ProcessId};

use crate::error::DecodeError;

pub const TOKEN_PREFIX: &str = "pm2";
pub const TOKEN_DELIMITER: char = ':';
/// Transport ceiling for control identifiers.
pub const MAX_TOKEN_LEN: usize = 100;

const PAGE_LABEL: &str = "Page ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    OpenMenu,
    PaginatePrev,
    PaginateNext,
    SelectProcess,
    Start,
    Stop,
    Restart,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenMenu => "menu",
            Self::PaginatePrev => "prev",
            Self::PaginateNext => "next",
            Self::SelectProcess => "select",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        Some(match segment {
            "menu" => Self::OpenMenu,
            "prev" => Self::PaginatePrev,
            "next" => Self::PaginateNext,
            "select" => Self::SelectProcess,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "restart" => Self::Restart,
            _ => return None,
        })
    }
}

impl From<LifecycleAction> for ActionKind {
    fn from(action: LifecycleAction) -> Self {
        match action {
            LifecycleAction::Start => Self::Start,
            LifecycleAction::Stop => Self::Stop,
            LifecycleAction::Restart => Self::Restart,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionToken {
    OpenMenu,
    /// `page` is the page currently shown; `None` defers to the displayed page indicator.
    PaginatePrev { page: Option<usize> },
    PaginateNext { page: Option<usize> },
    /// Select menus carry no target in their identifier; it arrives as the selected value.
    SelectProcess { target: Option<ProcessId> },
    Lifecycle {
        action: LifecycleAction,
        target: ProcessId,
    },
}

impl ActionToken {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::OpenMenu => ActionKind::OpenMenu,
            Self::PaginatePrev { .. } => ActionKind::PaginatePrev,
            Self::PaginateNext { .. } => ActionKind::PaginateNext,
            Self::SelectProcess { .. } => ActionKind::SelectProcess,
            Self::Lifecycle { action, .. } => (*action).into(),
        }
    }

    pub fn target(&self) -> Option<&ProcessId> {
        match self {
            Self::SelectProcess { target } => target.as_ref(),
            Self::Lifecycle { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn page(&self) -> Option<usize> {
        match self {
            Self::PaginatePrev { page } | Self::PaginateNext { page } => *page,
            _ => None,
        }
    }
}

pub fn encode(token: &ActionToken) -> String {
    let kind = token.kind().as_str();
    let arg = match token {
        ActionToken::OpenMenu => None,
        ActionToken::PaginatePrev { page } | ActionToken::PaginateNext { page } => {
            page.map(|page| page.to_string())
        }
        ActionToken::SelectProcess { target } => target.as_ref().map(|id| id.to_string()),
        ActionToken::Lifecycle { target, .. } => Some(target.to_string()),
    };
    match arg {
        Some(arg) => format!("{TOKEN_PREFIX}{TOKEN_DELIMITER}{kind}{TOKEN_DELIMITER}{arg}"),
        None => format!("{TOKEN_PREFIX}{TOKEN_DELIMITER}{kind}"),
    }
}

pub fn decode(raw: &str) -> Result<ActionToken, DecodeError> {
    let malformed = || DecodeError::MalformedToken(raw.to_string());
    if raw.len() > MAX_TOKEN_LEN {
        return Err(malformed());
    }

    let fields: Vec<&str> = raw.split(TOKEN_DELIMITER).collect();
    if fields.len() < 2 || fields[0] != TOKEN_PREFIX {
        return Err(DecodeError::UnknownKind(raw.to_string()));
    }
    let kind =
        ActionKind::from_segment(fields[1]).ok_or_else(|| DecodeError::UnknownKind(raw.to_string()))?;
    let arg = match fields.len() {
        2 => None,
        3 => Some(fields[2]),
        _ => return Err(malformed()),
    };

    let parse_page = |arg: &str| parse_decimal(arg).ok_or_else(malformed);
    let parse_target = |arg: &str| ProcessId::parse(arg).map_err(|_| malformed());

    match (kind, arg) {
        (ActionKind::OpenMenu, None) => Ok(ActionToken::OpenMenu),
        (ActionKind::PaginatePrev, arg) => Ok(ActionToken::PaginatePrev {
            page: arg.map(parse_page).transpose()?,
        }),
        (ActionKind::PaginateNext, arg) => Ok(ActionToken::PaginateNext {
            page: arg.map(parse_page).transpose()?,
        }),
        (ActionKind::SelectProcess, arg) => Ok(ActionToken::SelectProcess {
            target: arg.map(parse_target).transpose()?,
        }),
        (ActionKind::Start, Some(arg)) => lifecycle(LifecycleAction::Start, parse_target(arg)?),
        (ActionKind::Stop, Some(arg)) => lifecycle(LifecycleAction::Stop, parse_target(arg)?),
        (ActionKind::Restart, Some(arg)) => {
            lifecycle(LifecycleAction::Restart, parse_target(arg)?)
        }
        _ => Err(malformed()),
    }
}

fn lifecycle(action: LifecycleAction, target: ProcessId) -> Result<ActionToken, DecodeError> {
    Ok(ActionToken::Lifecycle { action, target })
}

/// Canonical decimal only: no sign, no leading zeros.
fn parse_decimal(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return None;
    }
    raw.parse().ok()
}

/// Visible `Page n/total` marker on a paginated view, one-based when shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageIndicator {
    pub page: usize,
    pub total_pages: usize,
}

impl PageIndicator {
    pub fn new(page: usize, total_pages: usize) -> Self {
        Self { page, total_pages }
    }

    /// Recovers the indicator from rendered text. Fails closed: a missing
    /// marker, non-numeric parts or an out-of-range page are all errors.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let malformed = || DecodeError::MalformedToken(text.to_string());
        let start = text.rfind(PAGE_LABEL).ok_or_else(malformed)? + PAGE_LABEL.len();
        let rest = &text[start..];
        let end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '/'))
            .unwrap_or(rest.len());

        let (shown, total) = rest[..end].split_once('/').ok_or_else(malformed)?;
        let shown = parse_decimal(shown).ok_or_else(malformed)?;
        let total = parse_decimal(total).ok_or_else(malformed)?;
        if shown == 0 || total == 0 || shown > total {
            return Err(malformed());
        }
        Ok(Self::new(shown - 1, total))
    }
}

impl fmt::Display for PageIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PAGE_LABEL}{}/{}", self.page + 1, self.total_pages)
    }
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
