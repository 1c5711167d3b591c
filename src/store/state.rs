use crate::core::error::TransportError;
use crate::core::feed::{AggregatedFeedItem, aggregate_feed};
use crate::core::market::DataKind;
use crate::core::price::{PriceOpportunity, PricePoint};
use crate::core::sentiment::{SentimentAlert, SentimentSummary};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Last-known-good data for one kind, with the time it was fetched.
#[derive(Debug)]
pub struct Slot<T> {
    pub data: Arc<Vec<T>>,
    pub refreshed_at: DateTime<Utc>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            refreshed_at: self.refreshed_at,
        }
    }
}

impl<T> Slot<T> {
    pub fn new(data: Vec<T>, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            data: Arc::new(data),
            refreshed_at,
        }
    }
}

/// Set while the most recent cycle had at least one failed kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncError {
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub failed_kinds: Vec<DataKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing fetched yet and nothing failed.
    Loading,
    /// The last cycle succeeded for every kind.
    Fresh,
    /// The last cycle failed but earlier data is still shown.
    Stale,
    /// The last cycle failed and there is nothing to show.
    Offline,
}

/// Everything one poll cycle produced. `None` means the kind was not part of the cycle.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub prices: Option<Result<Vec<PricePoint>, TransportError>>,
    pub opportunities: Option<Result<Vec<PriceOpportunity>, TransportError>>,
    pub sentiments: Option<Result<Vec<SentimentSummary>, TransportError>>,
    pub alerts: Option<Result<Vec<SentimentAlert>, TransportError>>,
}

impl CycleOutcome {
    /// Failed kinds with their errors, in slot order.
    pub fn failures(&self) -> Vec<(DataKind, &TransportError)> {
        fn failed<T>(
            kind: DataKind,
            result: &Option<Result<T, TransportError>>,
        ) -> Option<(DataKind, &TransportError)> {
            match result {
                Some(Err(e)) => Some((kind, e)),
                _ => None,
            }
        }

        [
            failed(DataKind::Prices, &self.prices),
            failed(DataKind::Opportunities, &self.opportunities),
            failed(DataKind::Sentiments, &self.sentiments),
            failed(DataKind::Alerts, &self.alerts),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// One user-facing line describing every failed kind, or `None` when all succeeded.
    pub fn error_message(&self) -> Option<String> {
        let failures = self.failures();
        if failures.is_empty() {
            return None;
        }
        let details = failures
            .iter()
            .map(|(kind, err)| format!("{kind}: {err}"))
            .collect::<Vec<_>>()
            .join("; ");
        Some(format!(
            "Unable to refresh {details}. Showing last known data, reconnecting..."
        ))
    }
}

/// A consistent view of the store at one revision.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub prices: Option<Slot<PricePoint>>,
    pub opportunities: Option<Slot<PriceOpportunity>>,
    pub sentiments: Option<Slot<SentimentSummary>>,
    pub alerts: Option<Slot<SentimentAlert>>,
    pub error: Option<SyncError>,
    pub revision: u64,
}

fn slice_of<T>(slot: &Option<Slot<T>>) -> &[T] {
    slot.as_ref()
        .map(|s| s.data.as_slice())
        .unwrap_or_default()
}

impl SyncState {
    pub fn prices(&self) -> &[PricePoint] {
        slice_of(&self.prices)
    }

    pub fn opportunities(&self) -> &[PriceOpportunity] {
        slice_of(&self.opportunities)
    }

    pub fn sentiments(&self) -> &[SentimentSummary] {
        slice_of(&self.sentiments)
    }

    pub fn alerts(&self) -> &[SentimentAlert] {
        slice_of(&self.alerts)
    }

    /// The merged live feed, derived fresh from the current sentiment slot.
    pub fn feed(&self) -> Vec<AggregatedFeedItem> {
        aggregate_feed(self.sentiments())
    }

    pub fn has_data(&self) -> bool {
        self.prices.is_some()
            || self.opportunities.is_some()
            || self.sentiments.is_some()
            || self.alerts.is_some()
    }

    pub fn status(&self) -> SyncStatus {
        match (&self.error, self.has_data()) {
            (None, false) => SyncStatus::Loading,
            (None, true) => SyncStatus::Fresh,
            (Some(_), true) => SyncStatus::Stale,
            (Some(_), false) => SyncStatus::Offline,
        }
    }

    /// Replaces each slot that succeeded, keeps the others, and sets or clears the error.
    pub(crate) fn apply(&mut self, outcome: CycleOutcome, now: DateTime<Utc>) {
        let error = outcome.error_message().map(|message| SyncError {
            message,
            occurred_at: now,
            failed_kinds: outcome.failures().into_iter().map(|(k, _)| k).collect(),
        });

        if let Some(Ok(data)) = outcome.prices {
            self.prices = Some(Slot::new(data, now));
        }
        if let Some(Ok(data)) = outcome.opportunities {
            self.opportunities = Some(Slot::new(data, now));
        }
        if let Some(Ok(data)) = outcome.sentiments {
            self.sentiments = Some(Slot::new(data, now));
        }
        if let Some(Ok(data)) = outcome.alerts {
            self.alerts = Some(Slot::new(data, now));
        }

        self.error = error;
        self.revision += 1;
    }
}
