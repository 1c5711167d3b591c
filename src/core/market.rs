//! The resources a poll cycle draws from

use crate::core::error::TransportError;
use crate::core::price::{PriceOpportunity, PricePoint};
use crate::core::sentiment::{SentimentAlert, SentimentSummary};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One independently refreshed slot in the sync store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum DataKind {
    Prices,
    Opportunities,
    Sentiments,
    Alerts,
}

impl Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataKind::Prices => "prices",
                DataKind::Opportunities => "opportunities",
                DataKind::Sentiments => "sentiment",
                DataKind::Alerts => "alerts",
            }
        )
    }
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn current_prices(&self) -> Result<Vec<PricePoint>, TransportError>;
    async fn price_opportunities(&self) -> Result<Vec<PriceOpportunity>, TransportError>;
    async fn all_sentiment(&self) -> Result<Vec<SentimentSummary>, TransportError>;
    async fn sentiment_alerts(&self) -> Result<Vec<SentimentAlert>, TransportError>;
}
