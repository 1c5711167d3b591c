//! Merges per-fund feed fragments into one stream, newest first.

use crate::core::sentiment::{FeedItem, SentimentSummary};
use serde::Serialize;

/// A feed item tagged with the fund whose summary it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedFeedItem {
    pub fund_id: String,
    #[serde(flatten)]
    pub item: FeedItem,
}

impl AggregatedFeedItem {
    fn sort_key(&self) -> &str {
        self.item.observed_at.as_deref().unwrap_or("")
    }
}

/// Flattens the `recent_items` of every summary and orders them by timestamp, descending.
///
/// Timestamps are compared as strings, so items without one sort last. Equal
/// timestamps keep fund order, then the order within each fund.
pub fn aggregate_feed(summaries: &[SentimentSummary]) -> Vec<AggregatedFeedItem> {
    let mut items: Vec<AggregatedFeedItem> = summaries
        .iter()
        .flat_map(|summary| {
            summary.recent_items.iter().map(|item| AggregatedFeedItem {
                fund_id: summary.fund_id.clone(),
                item: item.clone(),
            })
        })
        .collect();

    // sort_by is stable
    items.sort_by(|a, b| b.sort_key().cmp(a.sort_key()));
    items
}
