use super::ui;
use crate::core::error::TransportError;
use crate::core::price::{PriceHistory, PricePoint};
use crate::core::recommendation::RiskAssessment;
use crate::core::sentiment::{SentimentSummary, TrendingKeywords};
use crate::providers::ApiGateway;
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::warn;

/// Everything known about one fund. Only the price is required.
pub struct FundDetail {
    pub price: PricePoint,
    pub sentiment: Option<SentimentSummary>,
    pub trending: Option<TrendingKeywords>,
    pub risk: Option<RiskAssessment>,
    pub history: Option<PriceHistory>,
}

fn optional<T>(what: &str, result: Result<T, TransportError>) -> Option<T> {
    result
        .inspect_err(|e| warn!(error = %e, "Skipping {what}"))
        .ok()
}

pub async fn fetch(gateway: &ApiGateway, fund_id: &str, days: Option<u32>) -> Result<FundDetail> {
    let (price, sentiment, trending, risk, history) = futures::join!(
        gateway.fund_price(fund_id),
        gateway.fund_sentiment(fund_id),
        gateway.trending_keywords(fund_id),
        gateway.risk_assessment(fund_id),
        gateway.price_history(fund_id, days),
    );

    let price = match price {
        Err(TransportError::NotFound { .. }) => anyhow::bail!("Fund '{fund_id}' not found"),
        other => other.with_context(|| format!("Failed to fetch price for {fund_id}"))?,
    };

    Ok(FundDetail {
        price,
        sentiment: optional("sentiment", sentiment),
        trending: optional("trending keywords", trending),
        risk: optional("risk assessment", risk),
        history: optional("price history", history),
    })
}

impl FundDetail {
    pub fn display(&self) -> String {
        let price = &self.price;
        let mut output = format!(
            "Fund: {} ({})\n\n",
            ui::style_text(&price.fund_id, ui::StyleType::Title),
            price.ticker
        );

        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
        table.add_row(vec![
            Cell::new("Price"),
            ui::number_cell(format!("{:.2}", price.price)),
        ]);
        table.add_row(vec![Cell::new("Change"), ui::change_cell(price.change_pct)]);
        table.add_row(vec![
            Cell::new("Volume"),
            ui::number_cell(price.volume.to_string()),
        ]);
        if let Some(sentiment) = &self.sentiment {
            table.add_row(vec![
                Cell::new("Sentiment"),
                ui::sentiment_cell(sentiment.label(), sentiment.overall_score),
            ]);
            table.add_row(vec![
                Cell::new("Sources"),
                ui::number_cell(sentiment.source_count.to_string()),
            ]);
        }
        if let Some(risk) = &self.risk {
            table.add_row(vec![
                Cell::new("Risk"),
                Cell::new(format!("{} ({:.2})", risk.risk_level, risk.risk_score)),
            ]);
            table.add_row(vec![
                Cell::new("Volatility"),
                ui::number_cell(format!("{:.2}", risk.volatility)),
            ]);
        }
        output.push_str(&table.to_string());

        if let Some(trending) = self.trending.as_ref().filter(|t| !t.keywords.is_empty()) {
            output.push_str(&format!(
                "\n\n{} {}",
                ui::style_text("Trending:", ui::StyleType::Label),
                trending.keywords.join(", ")
            ));
        }

        if let Some(history) = self.history.as_ref().filter(|h| !h.points.is_empty()) {
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("Date"),
                ui::header_cell("Price"),
                ui::header_cell("Change"),
            ]);
            for point in &history.points {
                let date = point.observed_at.map_or_else(
                    || "N/A".to_string(),
                    |at| at.format("%Y-%m-%d %H:%M").to_string(),
                );
                table.add_row(vec![
                    Cell::new(date),
                    ui::number_cell(format!("{:.2}", point.price)),
                    ui::change_cell(point.change_pct),
                ]);
            }
            output.push_str(&format!(
                "\n\n{}\n{}",
                ui::style_text(&format!("Last {} days", history.days), ui::StyleType::Label),
                table
            ));
        }

        output
    }
}

pub async fn run(gateway: &ApiGateway, fund_id: &str, days: Option<u32>) -> Result<()> {
    let pb = ui::new_spinner(&format!("Fetching {fund_id}..."));
    let detail = fetch(gateway, fund_id, days).await;
    pb.finish_and_clear();

    println!("{}", detail?.display());
    Ok(())
}
