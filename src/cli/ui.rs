use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::calc::SPREAD_WARNING_PCT;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Online,
    Cached,
    Offline,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Online => style(text).green().bold(),
        StyleType::Cached => style(text).yellow(),
        StyleType::Offline => style(text).red().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn right_cell(text: impl Into<String>) -> Cell {
    Cell::new(text.into()).set_alignment(CellAlignment::Right)
}

/// Signed spread, red with a warning sign above the threshold and green
/// when the office rate beats the market.
pub fn spread_cell(spread: f64) -> Cell {
    let text = format_spread(spread);
    if spread > SPREAD_WARNING_PCT {
        right_cell(format!("⚠ {text}"))
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    } else if spread < 0.0 {
        right_cell(text).fg(Color::Green)
    } else {
        right_cell(text)
    }
}

pub fn format_spread(spread: f64) -> String {
    let sign = if spread >= 0.0 { "+" } else { "" };
    format!("{sign}{spread:.2}%")
}

/// Inserts `,` between groups of three digits: `1234567` -> `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Formats a fiat amount with grouped thousands and two decimals.
pub fn format_fiat(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{}.{:02}", group_thousands(cents / 100), cents % 100)
}

/// Creates a spinner shown while waiting on the price endpoint.
pub fn new_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
