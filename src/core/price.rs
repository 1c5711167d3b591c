//! Price domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub fund_id: String,
    pub ticker: String,
    pub price: f64,
    pub change_pct: f64,
    pub volume: u64,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TradeAction::Buy => "BUY",
                TradeAction::Sell => "SELL",
            }
        )
    }
}

impl FromStr for TradeAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            _ => Err(anyhow::anyhow!("Invalid trade action: {}", s)),
        }
    }
}

impl TradeAction {
    /// A falling price is a buying opportunity, a rising one a selling opportunity.
    pub fn from_magnitude(magnitude_pct: f64) -> Self {
        if magnitude_pct < 0.0 {
            TradeAction::Buy
        } else {
            TradeAction::Sell
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOpportunity {
    pub fund_id: String,
    pub kind: String,
    pub magnitude_pct: f64,
    pub action: TradeAction,
    pub confidence: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub price: f64,
    pub change_pct: f64,
    pub volume: u64,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub fund_id: String,
    pub days: u32,
    pub points: Vec<HistoryPoint>,
}
