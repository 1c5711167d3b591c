use super::ui;
use crate::providers::ApiGateway;
use anyhow::{Context, Result};

pub async fn run(gateway: &ApiGateway) -> Result<()> {
    let status = gateway
        .health()
        .await
        .with_context(|| format!("Backend at {} is unreachable", gateway.transport().base_url()))?;

    let service = status.service.as_deref().unwrap_or("backend");
    if status.is_healthy() {
        println!(
            "{} {}",
            ui::style_text(service, ui::StyleType::Label),
            ui::style_text(&status.status, ui::StyleType::Good)
        );
        Ok(())
    } else {
        anyhow::bail!("{service} reported status '{}'", status.status)
    }
}
