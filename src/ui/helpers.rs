use anyhow::Error;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::CategoryFilter;

fn key_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Render `[key] Action` pairs as one footer line.
pub(crate) fn hint_line(hints: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (index, (key, action)) in hints.iter().enumerate() {
        spans.push(Span::styled(format!("[{key}]"), key_style()));
        let gap = if index + 1 == hints.len() { "" } else { "   " };
        spans.push(Span::raw(format!(" {action}{gap}")));
    }
    Line::from(spans)
}

/// Radio-group rendering of the category filter, e.g. `(•) ALL  ( ) ETF`.
pub(crate) fn category_line(active: CategoryFilter) -> Line<'static> {
    let mut spans = Vec::new();
    for category in CategoryFilter::OPTIONS {
        let selected = category == active;
        let marker = if selected { "(•)" } else { "( )" };
        let style = if selected {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!("{marker} {}", category.label()), style));
        spans.push(Span::raw("   "));
    }
    spans.pop();
    Line::from(spans)
}

/// Readable name for the server's market tag. Unknown tags are shown as-is.
pub(crate) fn market_label(market: &str) -> &str {
    match market.trim() {
        "1" => "KOSPI",
        "2" => "KOSDAQ",
        "" => "-",
        other => other,
    }
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Column of the text cursor after `prefix` and `query` inside `inner`,
/// kept on the bar's last cell when the text runs past it.
pub(crate) fn input_cursor_x(inner: Rect, prefix: &str, query: &str) -> u16 {
    let typed = u16::try_from(prefix.chars().count() + query.chars().count())
        .unwrap_or(u16::MAX);
    inner
        .x
        .saturating_add(typed)
        .min(inner.right().saturating_sub(1).max(inner.x))
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
