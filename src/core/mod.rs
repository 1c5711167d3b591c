//! Core domain types and abstractions

pub mod config;
pub mod error;
pub mod feed;
pub mod log;
pub mod market;
pub mod price;
pub mod recommendation;
pub mod sentiment;
pub mod timestamp;

// Re-export main types for cleaner imports
pub use error::TransportError;
pub use feed::{AggregatedFeedItem, aggregate_feed};
pub use market::{DataKind, MarketDataSource};
pub use price::{HistoryPoint, PriceHistory, PriceOpportunity, PricePoint, TradeAction};
pub use recommendation::{HealthStatus, Recommendation, RiskAssessment, Signal};
pub use sentiment::{
    FeedItem, SentimentAlert, SentimentDistribution, SentimentSummary, TrendingKeywords,
};
