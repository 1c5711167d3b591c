use super::ui;
use crate::core::config::PollingConfig;
use crate::core::market::MarketDataSource;
use crate::core::timestamp::{parse_timestamp, time_ago};
use crate::scheduler::{PollScheduler, View};
use crate::store::{SyncState, SyncStatus, SyncStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use std::sync::Arc;
use tracing::debug;

/// Feed entries shown below the sentiment table.
const FEED_LIMIT: usize = 15;

fn render_prices(state: &SyncState) -> String {
    if state.prices().is_empty() {
        return ui::style_text("No price data yet.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Ticker"),
        ui::header_cell("Price"),
        ui::header_cell("Change"),
        ui::header_cell("Volume"),
    ]);
    for point in state.prices() {
        table.add_row(vec![
            Cell::new(&point.fund_id),
            Cell::new(&point.ticker),
            ui::number_cell(format!("{:.2}", point.price)),
            ui::change_cell(point.change_pct),
            ui::number_cell(point.volume.to_string()),
        ]);
    }
    table.to_string()
}

fn render_opportunities(state: &SyncState) -> Option<String> {
    if state.opportunities().is_empty() {
        return None;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Signal"),
        ui::header_cell("Move"),
        ui::header_cell("Action"),
        ui::header_cell("Confidence"),
    ]);
    for opportunity in state.opportunities() {
        table.add_row(vec![
            Cell::new(&opportunity.fund_id),
            Cell::new(&opportunity.kind),
            ui::change_cell(opportunity.magnitude_pct),
            ui::action_cell(opportunity.action),
            ui::confidence_cell(opportunity.confidence),
        ]);
    }
    Some(table.to_string())
}

fn render_sentiment(state: &SyncState) -> String {
    if state.sentiments().is_empty() {
        return ui::style_text("No sentiment data yet.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Sentiment"),
        ui::header_cell("Pos / Neu / Neg"),
        ui::header_cell("Sources"),
        ui::header_cell("Trending"),
    ]);
    for summary in state.sentiments() {
        let dist = &summary.distribution;
        table.add_row(vec![
            Cell::new(&summary.fund_id),
            ui::sentiment_cell(summary.label(), summary.overall_score),
            ui::number_cell(format!(
                "{:.0}% / {:.0}% / {:.0}%",
                dist.positive_pct, dist.neutral_pct, dist.negative_pct
            )),
            ui::number_cell(summary.source_count.to_string()),
            Cell::new(if summary.trending { "yes" } else { "" }),
        ]);
    }
    table.to_string()
}

fn render_alerts(state: &SyncState) -> Option<String> {
    if state.alerts().is_empty() {
        return None;
    }
    let lines: Vec<String> = state
        .alerts()
        .iter()
        .map(|alert| {
            format!(
                "  {} {}",
                ui::style_text(&alert.fund_id, ui::StyleType::Warning),
                alert.message
            )
        })
        .collect();
    Some(lines.join("\n"))
}

fn render_feed(state: &SyncState, now: DateTime<Utc>) -> String {
    let feed = state.feed();
    if feed.is_empty() {
        return ui::style_text("No recent posts.", ui::StyleType::Subtle);
    }

    feed.iter()
        .take(FEED_LIMIT)
        .map(|entry| {
            let age = entry
                .item
                .observed_at
                .as_deref()
                .and_then(parse_timestamp)
                .map_or_else(|| "unknown time".to_string(), |at| time_ago(at, now));
            format!(
                "  [{}] {} {} {}",
                entry.fund_id,
                ui::style_text(&entry.item.source_label, ui::StyleType::Label),
                entry.item.text,
                ui::style_text(&format!("({age})"), ui::StyleType::Subtle)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_status(state: &SyncState, now: DateTime<Utc>) -> Option<String> {
    match state.status() {
        SyncStatus::Loading => Some(ui::style_text(
            "Loading market data...",
            ui::StyleType::Subtle,
        )),
        SyncStatus::Fresh => None,
        SyncStatus::Stale | SyncStatus::Offline => state.error.as_ref().map(|error| {
            format!(
                "{} {}",
                ui::style_text("⚠", ui::StyleType::Warning),
                ui::style_text(
                    &format!("{} ({})", error.message, time_ago(error.occurred_at, now)),
                    ui::StyleType::Error
                )
            )
        }),
    }
}

/// Renders one frame of the dashboard for `view`.
pub fn render(state: &SyncState, view: View, now: DateTime<Utc>) -> String {
    let mut sections = Vec::new();

    sections.push(format!(
        "{}  {}",
        ui::style_text(&format!("Fund monitor: {view}"), ui::StyleType::Title),
        ui::style_text(&format!("updated {}", now.format("%H:%M:%S")), ui::StyleType::Subtle)
    ));
    if let Some(status) = render_status(state, now) {
        sections.push(status);
    }

    if matches!(view, View::Split | View::Prices) {
        sections.push(ui::style_text("Prices", ui::StyleType::Label));
        sections.push(render_prices(state));
        if let Some(opportunities) = render_opportunities(state) {
            sections.push(ui::style_text("Opportunities", ui::StyleType::Label));
            sections.push(opportunities);
        }
    }

    if matches!(view, View::Split | View::Sentiment) {
        sections.push(ui::style_text("Sentiment", ui::StyleType::Label));
        sections.push(render_sentiment(state));
        if let Some(alerts) = render_alerts(state) {
            sections.push(ui::style_text("Alerts", ui::StyleType::Label));
            sections.push(alerts);
        }
        sections.push(ui::style_text("Live feed", ui::StyleType::Label));
        sections.push(render_feed(state, now));
    }

    sections.join("\n\n")
}

/// Runs a single cycle and prints it. Fails only when nothing could be fetched.
async fn run_once(scheduler: &PollScheduler, store: &SyncStore) -> Result<()> {
    let spinner = ui::new_spinner("Fetching market data...");
    scheduler.poll_once().await;
    spinner.finish_and_clear();

    let state = store.snapshot();
    println!("{}", render(&state, scheduler.view(), Utc::now()));

    match (state.status(), state.error) {
        (SyncStatus::Offline, Some(error)) => anyhow::bail!(error.message),
        _ => Ok(()),
    }
}

pub async fn run(
    source: Arc<dyn MarketDataSource>,
    view: View,
    polling: &PollingConfig,
    once: bool,
) -> Result<()> {
    let store = Arc::new(SyncStore::new());
    let mut scheduler = PollScheduler::for_view(view, polling, source, Arc::clone(&store));

    if once {
        return run_once(&scheduler, &store).await;
    }

    let term = console::Term::stdout();
    let mut revisions = store.subscribe();
    let spinner = ui::new_spinner("Connecting to market data...");
    scheduler.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let revision = *revisions.borrow_and_update();
                debug!(revision, "Redrawing dashboard");

                spinner.finish_and_clear();
                let state = store.snapshot();
                term.clear_screen().context("Failed to clear terminal")?;
                println!("{}", render(&state, view, Utc::now()));
                let footer = format!(
                    "Refreshing every {}s. Press Ctrl+C to exit.",
                    scheduler.period().as_secs()
                );
                println!("\n{}", ui::style_text(&footer, ui::StyleType::Subtle));
            }
            _ = &mut ctrl_c => break,
        }
    }

    if let Some(handle) = scheduler.stop() {
        handle.abort();
    }
    Ok(())
}
