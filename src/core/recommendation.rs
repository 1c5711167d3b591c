use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Signal::StrongBuy => "STRONG_BUY",
                Signal::Buy => "BUY",
                Signal::Hold => "HOLD",
                Signal::Sell => "SELL",
                Signal::StrongSell => "STRONG_SELL",
            }
        )
    }
}

impl From<&str> for Signal {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().replace(' ', "_").as_str() {
            "STRONG_BUY" => Signal::StrongBuy,
            "BUY" => Signal::Buy,
            "SELL" => Signal::Sell,
            "STRONG_SELL" => Signal::StrongSell,
            _ => Signal::Hold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub fund_id: String,
    pub signal: Signal,
    pub confidence: f64,
    pub price_change_pct: f64,
    pub sentiment_score: f64,
    pub target_price: f64,
    pub reason: String,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub fund_id: String,
    pub risk_score: f64,
    pub risk_level: String,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}
