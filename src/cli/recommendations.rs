use super::ui;
use crate::core::recommendation::Recommendation;
use crate::providers::ApiGateway;
use anyhow::{Context, Result};
use comfy_table::Cell;

fn recommendations_table(recommendations: &[Recommendation]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Signal"),
        ui::header_cell("Confidence"),
        ui::header_cell("Change"),
        ui::header_cell("Sentiment"),
        ui::header_cell("Target"),
        ui::header_cell("Reason"),
    ]);
    for rec in recommendations {
        table.add_row(vec![
            Cell::new(&rec.fund_id),
            ui::signal_cell(rec.signal),
            ui::confidence_cell(rec.confidence),
            ui::change_cell(rec.price_change_pct),
            ui::number_cell(format!("{:+.2}", rec.sentiment_score)),
            ui::number_cell(format!("{:.2}", rec.target_price)),
            Cell::new(&rec.reason),
        ]);
    }
    table.to_string()
}

pub fn display(all: &[Recommendation], top: &[Recommendation]) -> String {
    let mut output = format!(
        "{}\n\n",
        ui::style_text("Recommendations", ui::StyleType::Title)
    );
    if all.is_empty() {
        output.push_str(&ui::style_text("No recommendations available.", ui::StyleType::Subtle));
    } else {
        output.push_str(&recommendations_table(all));
    }

    if !top.is_empty() {
        output.push_str(&format!(
            "\n\n{}\n\n{}",
            ui::style_text("Top opportunities", ui::StyleType::Title),
            recommendations_table(top)
        ));
    }
    output
}

pub async fn run(gateway: &ApiGateway) -> Result<()> {
    let pb = ui::new_spinner("Fetching recommendations...");
    let (all, top) = futures::join!(gateway.recommendations(), gateway.top_opportunities());
    pb.finish_and_clear();

    let all = all.context("Failed to fetch recommendations")?;
    let top = top.context("Failed to fetch top opportunities")?;
    println!("{}", display(&all, &top));
    Ok(())
}
