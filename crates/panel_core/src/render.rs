//! Pure view builders. Nothing here performs I/O or touches shared state.

use chrono::{DateTime, Utc};
use shared::{
    domain::{LifecycleAction, ProcessId, ProcessRecord},
    protocol::{
        ActionRow, Button, ButtonStyle, Component, Embed, OutgoingMessage, SelectMenu,
        SelectOption,
    },
};

use crate::{
    codec::{encode, ActionToken, PageIndicator},
    PAGE_SIZE,
};

pub const SUMMARY_TITLE: &str = "Current PM2 Processes";
pub const SUMMARY_COLOR: u32 = 0x0099FF;
pub const NO_PROCESSES: &str = "No processes found.";
pub const MANAGE_LABEL: &str = "Manage PM2";

/// Embed descriptions are capped at 4096 characters by the transport.
const MAX_DESCRIPTION_LEN: usize = 4096;
const MAX_OPTION_LABEL_LEN: usize = 100;
const OVERFLOW_FOOTER_RESERVE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub rendered_at: DateTime<Utc>,
    pub manage: Button,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub indicator: PageIndicator,
    pub caption: String,
    /// Absent when there is nothing to choose from.
    pub select: Option<SelectMenu>,
    pub prev: Button,
    pub next: Button,
}

impl PageView {
    pub fn choices(&self) -> &[SelectOption] {
        self.select
            .as_ref()
            .map(|menu| menu.options.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionChoiceView {
    pub process_id: ProcessId,
    pub caption: String,
    pub buttons: Vec<Button>,
}

pub fn total_pages(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE).max(1)
}

pub fn clamp_page(page: usize, count: usize) -> usize {
    page.min(total_pages(count) - 1)
}

pub fn summary_line(record: &ProcessRecord) -> String {
    format!(
        "ID: {} | Name: {} | Status: `{}`",
        record.id,
        single_line(&record.name),
        record.status
    )
}

pub fn render_summary(snapshot: &[ProcessRecord], rendered_at: DateTime<Utc>) -> SummaryView {
    let description = if snapshot.is_empty() {
        NO_PROCESSES.to_string()
    } else {
        bounded_lines(&snapshot.iter().map(summary_line).collect::<Vec<_>>())
    };

    SummaryView {
        title: SUMMARY_TITLE.to_string(),
        description,
        color: SUMMARY_COLOR,
        rendered_at,
        manage: Button {
            custom_id: encode(&ActionToken::OpenMenu),
            label: MANAGE_LABEL.to_string(),
            style: ButtonStyle::Primary,
            disabled: false,
        },
    }
}

pub fn render_page(snapshot: &[ProcessRecord], page: usize) -> PageView {
    let total = total_pages(snapshot.len());
    let page = clamp_page(page, snapshot.len());
    let indicator = PageIndicator::new(page, total);

    let first = page * PAGE_SIZE;
    let last = (first + PAGE_SIZE).min(snapshot.len());
    let slice = &snapshot[first.min(snapshot.len())..last];

    let (caption, select) = if slice.is_empty() {
        (format!("{NO_PROCESSES} ({indicator})"), None)
    } else {
        let options = slice
            .iter()
            .map(|record| SelectOption {
                label: truncate(
                    &format!("{} - {}", record.id, single_line(&record.name)),
                    MAX_OPTION_LABEL_LEN,
                ),
                value: record.id.to_string(),
            })
            .collect();
        (
            format!("Select a process ({indicator}):"),
            Some(SelectMenu {
                custom_id: encode(&ActionToken::SelectProcess { target: None }),
                placeholder: format!("Processes {}-{}", first + 1, last),
                options,
            }),
        )
    };

    PageView {
        indicator,
        caption,
        select,
        prev: Button {
            custom_id: encode(&ActionToken::PaginatePrev { page: Some(page) }),
            label: "Previous".to_string(),
            style: ButtonStyle::Secondary,
            disabled: page == 0,
        },
        next: Button {
            custom_id: encode(&ActionToken::PaginateNext { page: Some(page) }),
            label: "Next".to_string(),
            style: ButtonStyle::Secondary,
            disabled: page + 1 >= total,
        },
    }
}

pub fn render_action_choices(process_id: &ProcessId) -> ActionChoiceView {
    let buttons = LifecycleAction::ALL
        .into_iter()
        .map(|action| {
            let (label, style) = match action {
                LifecycleAction::Start => ("Start", ButtonStyle::Success),
                LifecycleAction::Stop => ("Stop", ButtonStyle::Danger),
                LifecycleAction::Restart => ("Restart", ButtonStyle::Primary),
            };
            Button {
                custom_id: encode(&ActionToken::Lifecycle {
                    action,
                    target: process_id.clone(),
                }),
                label: label.to_string(),
                style,
                disabled: false,
            }
        })
        .collect();

    ActionChoiceView {
        process_id: process_id.clone(),
        caption: format!("You selected process **{process_id}**. What would you like to do?"),
        buttons,
    }
}

pub fn render_outcome(
    action: LifecycleAction,
    process_id: &ProcessId,
    ok: bool,
    detail: Option<&str>,
) -> String {
    if ok {
        return format!(
            "Process **{process_id}** has been {}.",
            action.past_tense()
        );
    }
    match detail.map(str::trim).filter(|detail| !detail.is_empty()) {
        Some(detail) => format!("Error during action {action} for process {process_id}: {detail}"),
        None => format!("Error during action {action} for process {process_id}."),
    }
}

impl From<&SummaryView> for OutgoingMessage {
    fn from(view: &SummaryView) -> Self {
        Self {
            content: None,
            embeds: vec![Embed {
                title: view.title.clone(),
                description: view.description.clone(),
                color: view.color,
                timestamp: view.rendered_at,
            }],
            rows: vec![ActionRow::new(vec![Component::Button(view.manage.clone())])],
            ephemeral: false,
        }
    }
}

impl From<PageView> for OutgoingMessage {
    fn from(view: PageView) -> Self {
        let mut rows = Vec::with_capacity(2);
        if let Some(select) = view.select {
            rows.push(ActionRow::new(vec![Component::Select(select)]));
        }
        rows.push(ActionRow::new(vec![
            Component::Button(view.prev),
            Component::Button(view.next),
        ]));
        Self {
            content: Some(view.caption),
            embeds: Vec::new(),
            rows,
            ephemeral: true,
        }
    }
}

impl From<ActionChoiceView> for OutgoingMessage {
    fn from(view: ActionChoiceView) -> Self {
        Self {
            content: Some(view.caption),
            embeds: Vec::new(),
            rows: vec![ActionRow::new(
                view.buttons.into_iter().map(Component::Button).collect(),
            )],
            ephemeral: true,
        }
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/// Joins lines, replacing the tail with a count once the transport's
/// description limit would be exceeded.
fn bounded_lines(lines: &[String]) -> String {
    let mut out = String::new();
    let mut used = 0;
    for (index, line) in lines.iter().enumerate() {
        let cost = line.chars().count() + usize::from(index > 0);
        let budget = if index + 1 == lines.len() {
            MAX_DESCRIPTION_LEN
        } else {
            MAX_DESCRIPTION_LEN - OVERFLOW_FOOTER_RESERVE
        };
        if index > 0 {
            out.push('\n');
        }
        if used + cost > budget {
            out.push_str(&format!("…and {} more", lines.len() - index));
            return out;
        }
        out.push_str(line);
        used += cost;
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
