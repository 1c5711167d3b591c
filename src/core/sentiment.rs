//! Sentiment domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Scores above this are reported as positive, below its negation as negative.
pub const SENTIMENT_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SentimentLabel::Positive => "Positive",
                SentimentLabel::Neutral => "Neutral",
                SentimentLabel::Negative => "Negative",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive_pct: f64,
    pub neutral_pct: f64,
    pub negative_pct: f64,
}

impl SentimentDistribution {
    /// Builds a distribution with every share clamped at zero.
    pub fn clamped(positive_pct: f64, neutral_pct: f64, negative_pct: f64) -> Self {
        Self {
            positive_pct: positive_pct.max(0.0),
            neutral_pct: neutral_pct.max(0.0),
            negative_pct: negative_pct.max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub source_label: String,
    pub text: String,
    pub url: Option<String>,
    /// Raw ISO-8601 string as received; feed ordering compares this text.
    pub observed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub fund_id: String,
    pub distribution: SentimentDistribution,
    pub overall_score: f64,
    pub source_count: u64,
    pub trending: bool,
    pub recent_items: Vec<FeedItem>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl SentimentSummary {
    pub fn label(&self) -> SentimentLabel {
        if self.overall_score > SENTIMENT_THRESHOLD {
            SentimentLabel::Positive
        } else if self.overall_score < -SENTIMENT_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentAlert {
    pub fund_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingKeywords {
    pub fund_id: String,
    pub keywords: Vec<String>,
}
