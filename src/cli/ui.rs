use crate::core::price::TradeAction;
use crate::core::recommendation::Signal;
use crate::core::sentiment::SentimentLabel;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Good,
    Error,
    Warning,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Good => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Warning => style(text).yellow().bold(),
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

pub fn number_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Creates a cell for displaying percentage change with color coding.
pub fn change_cell(change: f64) -> Cell {
    let text = format!("{change:+.2}%");
    let color = if change >= 0.0 { Color::Green } else { Color::Red };
    Cell::new(text).fg(color).set_alignment(CellAlignment::Right)
}

pub fn action_cell(action: TradeAction) -> Cell {
    let color = match action {
        TradeAction::Buy => Color::Green,
        TradeAction::Sell => Color::Red,
    };
    Cell::new(action.to_string())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

pub fn signal_cell(signal: Signal) -> Cell {
    let color = match signal {
        Signal::StrongBuy | Signal::Buy => Color::Green,
        Signal::Hold => Color::Yellow,
        Signal::Sell | Signal::StrongSell => Color::Red,
    };
    Cell::new(signal.to_string())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

pub fn sentiment_cell(label: SentimentLabel, score: f64) -> Cell {
    let color = match label {
        SentimentLabel::Positive => Color::Green,
        SentimentLabel::Neutral => Color::DarkGrey,
        SentimentLabel::Negative => Color::Red,
    };
    Cell::new(format!("{label} ({score:+.2})")).fg(color)
}

/// Confidence in `[0, 1]` rendered as a percentage.
pub fn confidence_cell(confidence: f64) -> Cell {
    number_cell(format!("{:.0}%", confidence * 100.0))
}

/// Creates a spinner shown while the first data is on its way.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_cell_sign() {
        assert_eq!(change_cell(1.234).content(), "+1.23%");
        assert_eq!(change_cell(-0.5).content(), "-0.50%");
    }

    #[test]
    fn test_confidence_and_signal_cells() {
        assert_eq!(confidence_cell(0.856).content(), "86%");
        assert_eq!(signal_cell(Signal::StrongBuy).content(), "STRONG_BUY");
        assert_eq!(action_cell(TradeAction::Sell).content(), "SELL");
        assert_eq!(
            sentiment_cell(SentimentLabel::Positive, 0.42).content(),
            "Positive (+0.42)"
        );
    }
}
