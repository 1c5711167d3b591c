//! Typed accessors for each backend resource.
//!
//! Every accessor issues exactly one transport call. Wire payloads are decoded
//! into lenient shapes first and then normalized into domain types, so absent
//! or out-of-range fields get a fixed default instead of failing the cycle.

use super::transport::{ApiRequest, TransportClient};
use crate::core::error::TransportError;
use crate::core::market::MarketDataSource;
use crate::core::price::{HistoryPoint, PriceHistory, PriceOpportunity, PricePoint, TradeAction};
use crate::core::recommendation::{HealthStatus, Recommendation, RiskAssessment, Signal};
use crate::core::sentiment::{
    FeedItem, SentimentAlert, SentimentDistribution, SentimentSummary, TrendingKeywords,
};
use crate::core::timestamp::parse_timestamp;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

pub const DEFAULT_HISTORY_DAYS: u32 = 7;

#[derive(Deserialize, Debug)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize, Debug)]
struct ListEnvelope<T> {
    data: Option<Vec<T>>,
}

#[derive(Deserialize, Debug)]
struct PriceWire {
    fund: String,
    ticker: Option<String>,
    price: Option<f64>,
    change: Option<f64>,
    volume: Option<f64>,
    timestamp: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpportunitiesWire {
    opportunities: Option<Vec<OpportunityWire>>,
}

#[derive(Deserialize, Debug)]
struct OpportunityWire {
    fund: String,
    opportunity: Option<String>,
    magnitude: Option<f64>,
    action: Option<String>,
    confidence: Option<f64>,
    timestamp: Option<String>,
}

#[derive(Deserialize, Debug)]
struct HistoryWire {
    fund: String,
    days: Option<u32>,
    data: Option<Vec<HistoryPointWire>>,
}

#[derive(Deserialize, Debug)]
struct HistoryPointWire {
    price: Option<f64>,
    change: Option<f64>,
    volume: Option<f64>,
    timestamp: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct DistributionWire {
    positive: Option<f64>,
    neutral: Option<f64>,
    negative: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct SentimentWire {
    fund: String,
    sentiment_distribution: Option<DistributionWire>,
    overall_score: Option<f64>,
    trending: Option<bool>,
    source_count: Option<f64>,
    recent_items: Option<Vec<FeedItemWire>>,
    timestamp: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FeedItemWire {
    source: Option<String>,
    text: Option<String>,
    url: Option<String>,
    timestamp: Option<String>,
}

#[derive(Deserialize, Debug)]
struct AlertsWire {
    alerts: Option<Vec<AlertWire>>,
}

#[derive(Deserialize, Debug)]
struct AlertWire {
    fund: String,
    alert: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TrendingWire {
    fund: String,
    trending_keywords: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct RecommendationsWire {
    recommendations: Option<Vec<RecommendationWire>>,
}

#[derive(Deserialize, Debug)]
struct TopOpportunitiesWire {
    top_opportunities: Option<Vec<RecommendationWire>>,
}

#[derive(Deserialize, Debug)]
struct RecommendationWire {
    fund: String,
    recommendation: Option<String>,
    confidence: Option<f64>,
    price_change: Option<f64>,
    sentiment_score: Option<f64>,
    target_price: Option<f64>,
    reason: Option<String>,
    timestamp: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RiskWire {
    fund: String,
    risk_score: Option<f64>,
    risk_level: Option<String>,
    volatility: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct HealthWire {
    status: String,
    service: Option<String>,
}

fn count(value: Option<f64>) -> u64 {
    value.filter(|v| v.is_finite() && *v > 0.0).map_or(0, |v| v as u64)
}

fn timestamp(raw: Option<&str>) -> Option<chrono::DateTime<chrono::Utc>> {
    raw.and_then(parse_timestamp)
}

/// Ticker to show when upstream omits one: `az_gold` becomes `AZ`.
fn default_ticker(fund_id: &str) -> String {
    fund_id
        .split('_')
        .next()
        .unwrap_or(fund_id)
        .to_uppercase()
}

impl From<PriceWire> for PricePoint {
    fn from(wire: PriceWire) -> Self {
        let ticker = wire
            .ticker
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| default_ticker(&wire.fund));
        PricePoint {
            ticker,
            price: wire.price.unwrap_or(0.0),
            change_pct: wire.change.unwrap_or(0.0),
            volume: count(wire.volume),
            observed_at: timestamp(wire.timestamp.as_deref()),
            fund_id: wire.fund,
        }
    }
}

impl From<OpportunityWire> for PriceOpportunity {
    fn from(wire: OpportunityWire) -> Self {
        let magnitude_pct = wire.magnitude.unwrap_or(0.0);
        let action = wire
            .action
            .as_deref()
            .and_then(|a| a.parse::<TradeAction>().ok())
            .unwrap_or_else(|| TradeAction::from_magnitude(magnitude_pct));
        PriceOpportunity {
            kind: wire.opportunity.unwrap_or_else(|| "price_swing".to_string()),
            magnitude_pct,
            action,
            confidence: wire.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
            observed_at: timestamp(wire.timestamp.as_deref()),
            fund_id: wire.fund,
        }
    }
}

impl From<HistoryPointWire> for HistoryPoint {
    fn from(wire: HistoryPointWire) -> Self {
        HistoryPoint {
            price: wire.price.unwrap_or(0.0),
            change_pct: wire.change.unwrap_or(0.0),
            volume: count(wire.volume),
            observed_at: timestamp(wire.timestamp.as_deref()),
        }
    }
}

impl From<FeedItemWire> for FeedItem {
    fn from(wire: FeedItemWire) -> Self {
        FeedItem {
            source_label: wire.source.unwrap_or_else(|| "Unknown".to_string()),
            text: wire.text.unwrap_or_default(),
            url: wire.url.filter(|u| !u.trim().is_empty()),
            observed_at: wire.timestamp,
        }
    }
}

impl From<SentimentWire> for SentimentSummary {
    fn from(wire: SentimentWire) -> Self {
        let dist = wire.sentiment_distribution.unwrap_or_default();
        SentimentSummary {
            distribution: SentimentDistribution::clamped(
                dist.positive.unwrap_or(0.0),
                dist.neutral.unwrap_or(0.0),
                dist.negative.unwrap_or(0.0),
            ),
            overall_score: wire.overall_score.unwrap_or(0.0).clamp(-1.0, 1.0),
            source_count: count(wire.source_count),
            trending: wire.trending.unwrap_or(false),
            recent_items: wire
                .recent_items
                .unwrap_or_default()
                .into_iter()
                .map(FeedItem::from)
                .collect(),
            observed_at: timestamp(wire.timestamp.as_deref()),
            fund_id: wire.fund,
        }
    }
}

impl From<RecommendationWire> for Recommendation {
    fn from(wire: RecommendationWire) -> Self {
        Recommendation {
            signal: wire
                .recommendation
                .as_deref()
                .map_or(Signal::Hold, Signal::from),
            confidence: wire.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
            price_change_pct: wire.price_change.unwrap_or(0.0),
            sentiment_score: wire.sentiment_score.unwrap_or(0.0).clamp(-1.0, 1.0),
            target_price: wire.target_price.unwrap_or(0.0),
            reason: wire.reason.unwrap_or_default(),
            observed_at: timestamp(wire.timestamp.as_deref()),
            fund_id: wire.fund,
        }
    }
}

fn normalize<W, T: From<W>>(items: Option<Vec<W>>) -> Vec<T> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(T::from)
        .collect()
}

#[derive(Clone)]
pub struct ApiGateway {
    transport: TransportClient,
}

impl ApiGateway {
    pub fn new(transport: TransportClient) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &TransportClient {
        &self.transport
    }

    #[instrument(name = "CurrentPrices", skip(self))]
    pub async fn current_prices(&self) -> Result<Vec<PricePoint>, TransportError> {
        let wire: ListEnvelope<PriceWire> = self
            .transport
            .fetch_json(&ApiRequest::get("/prices/current"))
            .await?;
        let prices: Vec<PricePoint> = normalize(wire.data);
        debug!(count = prices.len(), "Fetched current prices");
        Ok(prices)
    }

    #[instrument(name = "FundPrice", skip(self))]
    pub async fn fund_price(&self, fund_id: &str) -> Result<PricePoint, TransportError> {
        let wire: DataEnvelope<PriceWire> = self
            .transport
            .fetch_json(&ApiRequest::get("/prices/fund").segment(fund_id))
            .await?;
        Ok(wire.data.into())
    }

    #[instrument(name = "PriceOpportunities", skip(self))]
    pub async fn price_opportunities(&self) -> Result<Vec<PriceOpportunity>, TransportError> {
        let wire: OpportunitiesWire = self
            .transport
            .fetch_json(&ApiRequest::get("/prices/opportunities"))
            .await?;
        Ok(normalize(wire.opportunities))
    }

    /// Price history for the last `days` days, seven when not given.
    #[instrument(name = "PriceHistory", skip(self))]
    pub async fn price_history(
        &self,
        fund_id: &str,
        days: Option<u32>,
    ) -> Result<PriceHistory, TransportError> {
        let days = days.unwrap_or(DEFAULT_HISTORY_DAYS);
        let request = ApiRequest::get("/prices/history")
            .segment(fund_id)
            .query("days", days);
        let wire: HistoryWire = self.transport.fetch_json(&request).await?;
        Ok(PriceHistory {
            fund_id: wire.fund,
            days: wire.days.unwrap_or(days),
            points: normalize(wire.data),
        })
    }

    #[instrument(name = "AllSentiment", skip(self))]
    pub async fn all_sentiment(&self) -> Result<Vec<SentimentSummary>, TransportError> {
        let wire: ListEnvelope<SentimentWire> = self
            .transport
            .fetch_json(&ApiRequest::get("/sentiment/all"))
            .await?;
        let summaries: Vec<SentimentSummary> = normalize(wire.data);
        debug!(count = summaries.len(), "Fetched sentiment summaries");
        Ok(summaries)
    }

    #[instrument(name = "FundSentiment", skip(self))]
    pub async fn fund_sentiment(&self, fund_id: &str) -> Result<SentimentSummary, TransportError> {
        let wire: DataEnvelope<SentimentWire> = self
            .transport
            .fetch_json(&ApiRequest::get("/sentiment/fund").segment(fund_id))
            .await?;
        Ok(wire.data.into())
    }

    #[instrument(name = "TrendingKeywords", skip(self))]
    pub async fn trending_keywords(
        &self,
        fund_id: &str,
    ) -> Result<TrendingKeywords, TransportError> {
        let wire: TrendingWire = self
            .transport
            .fetch_json(&ApiRequest::get("/sentiment/trending").segment(fund_id))
            .await?;
        Ok(TrendingKeywords {
            fund_id: wire.fund,
            keywords: wire.trending_keywords.unwrap_or_default(),
        })
    }

    #[instrument(name = "SentimentAlerts", skip(self))]
    pub async fn sentiment_alerts(&self) -> Result<Vec<SentimentAlert>, TransportError> {
        let wire: AlertsWire = self
            .transport
            .fetch_json(&ApiRequest::get("/sentiment/alerts"))
            .await?;
        Ok(wire
            .alerts
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                a.alert
                    .filter(|m| !m.trim().is_empty())
                    .map(|message| SentimentAlert {
                        fund_id: a.fund,
                        message,
                    })
            })
            .collect())
    }

    #[instrument(name = "Recommendations", skip(self))]
    pub async fn recommendations(&self) -> Result<Vec<Recommendation>, TransportError> {
        let wire: RecommendationsWire = self
            .transport
            .fetch_json(&ApiRequest::get("/recommendations/all"))
            .await?;
        Ok(normalize(wire.recommendations))
    }

    #[instrument(name = "TopOpportunities", skip(self))]
    pub async fn top_opportunities(&self) -> Result<Vec<Recommendation>, TransportError> {
        let wire: TopOpportunitiesWire = self
            .transport
            .fetch_json(&ApiRequest::get("/recommendations/opportunities"))
            .await?;
        Ok(normalize(wire.top_opportunities))
    }

    #[instrument(name = "RiskAssessment", skip(self))]
    pub async fn risk_assessment(&self, fund_id: &str) -> Result<RiskAssessment, TransportError> {
        let wire: RiskWire = self
            .transport
            .fetch_json(&ApiRequest::get("/recommendations/risk").segment(fund_id))
            .await?;
        Ok(RiskAssessment {
            fund_id: wire.fund,
            risk_score: wire.risk_score.unwrap_or(0.0),
            risk_level: wire.risk_level.unwrap_or_else(|| "UNKNOWN".to_string()),
            volatility: wire.volatility.unwrap_or(0.0),
        })
    }

    /// Liveness probe; served outside the `/api` prefix and never retried.
    #[instrument(name = "Health", skip(self))]
    pub async fn health(&self) -> Result<HealthStatus, TransportError> {
        let wire: HealthWire = self
            .transport
            .fetch_json(&ApiRequest::get("/health").at_service_root().no_retry())
            .await?;
        Ok(HealthStatus {
            status: wire.status,
            service: wire.service,
        })
    }
}

#[async_trait]
impl MarketDataSource for ApiGateway {
    async fn current_prices(&self) -> Result<Vec<PricePoint>, TransportError> {
        ApiGateway::current_prices(self).await
    }

    async fn price_opportunities(&self) -> Result<Vec<PriceOpportunity>, TransportError> {
        ApiGateway::price_opportunities(self).await
    }

    async fn all_sentiment(&self) -> Result<Vec<SentimentSummary>, TransportError> {
        ApiGateway::all_sentiment(self).await
    }

    async fn sentiment_alerts(&self) -> Result<Vec<SentimentAlert>, TransportError> {
        ApiGateway::sentiment_alerts(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RetryConfig;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(request_path: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn gateway(server: &MockServer) -> ApiGateway {
        let retry = RetryConfig {
            base_delay_ms: 1,
            ..RetryConfig::default()
        };
        let base_url = format!("{}/api", server.uri());
        ApiGateway::new(TransportClient::new(&base_url, Duration::from_secs(5), retry).unwrap())
    }

    #[tokio::test]
    async fn test_current_prices() {
        let mock_response = r#"{
            "data": [
                {
                    "fund": "halan_saving",
                    "ticker": "HALAN",
                    "price": 105.42,
                    "change": -1.25,
                    "volume": 1250000,
                    "timestamp": "2025-03-01T10:15:00.123Z"
                },
                {
                    "fund": "az_gold",
                    "price": 98.1
                }
            ],
            "timestamp": "2025-03-01T10:15:00.200Z"
        }"#;
        let server = create_mock_server("/api/prices/current", mock_response).await;

        let prices = gateway(&server).current_prices().await.unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].fund_id, "halan_saving");
        assert_eq!(prices[0].ticker, "HALAN");
        assert_eq!(prices[0].price, 105.42);
        assert_eq!(prices[0].change_pct, -1.25);
        assert_eq!(prices[0].volume, 1_250_000);
        assert!(prices[0].observed_at.is_some());

        // Missing fields are filled in
        assert_eq!(prices[1].ticker, "AZ");
        assert_eq!(prices[1].change_pct, 0.0);
        assert_eq!(prices[1].volume, 0);
        assert!(prices[1].observed_at.is_none());
    }

    #[tokio::test]
    async fn test_price_without_fund_is_rejected() {
        let server =
            create_mock_server("/api/prices/current", r#"{"data": [{"price": 1.0}]}"#).await;

        let result = gateway(&server).current_prices().await;
        assert!(matches!(result, Err(TransportError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_fund_price_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices/fund/unknown_fund"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"detail": "Fund not found"}"#),
            )
            .mount(&server)
            .await;

        let result = gateway(&server).fund_price("unknown_fund").await;
        assert_eq!(
            result.unwrap_err(),
            TransportError::NotFound {
                path: "/prices/fund/unknown_fund".to_string()
            }
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fund_id_cannot_change_the_route() {
        let server = create_mock_server(
            "/api/sentiment/trending/a%2Fb%3Fx=1",
            r#"{"fund": "a/b?x=1", "trending_keywords": ["gold"]}"#,
        )
        .await;

        let trending = gateway(&server)
            .trending_keywords("a/b?x=1")
            .await
            .unwrap();
        assert_eq!(trending.keywords, vec!["gold".to_string()]);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn test_fund_price() {
        let server = create_mock_server(
            "/api/prices/fund/az_gold",
            r#"{"data": {"fund": "az_gold", "ticker": "AZG", "price": 98.7, "change": 0.4, "volume": 10}}"#,
        )
        .await;

        let price = gateway(&server).fund_price("az_gold").await.unwrap();
        assert_eq!(price.ticker, "AZG");
        assert_eq!(price.price, 98.7);
    }

    #[tokio::test]
    async fn test_price_opportunities() {
        let mock_response = r#"{
            "opportunities": [
                {"fund": "az_gold", "opportunity": "price_swing", "magnitude": -2.7, "action": "BUY", "confidence": 0.75},
                {"fund": "az_shariah", "magnitude": 3.1, "confidence": 1.4},
                {"fund": "az_opportunity", "magnitude": -2.2, "action": "HODL", "confidence": -0.2}
            ],
            "count": 3
        }"#;
        let server = create_mock_server("/api/prices/opportunities", mock_response).await;

        let opps = gateway(&server).price_opportunities().await.unwrap();

        assert_eq!(opps.len(), 3);
        assert_eq!(opps[0].action, TradeAction::Buy);
        assert_eq!(opps[0].confidence, 0.75);
        assert_eq!(opps[1].action, TradeAction::Sell);
        assert_eq!(opps[1].kind, "price_swing");
        assert_eq!(opps[1].confidence, 1.0);
        assert_eq!(opps[2].action, TradeAction::Buy);
        assert_eq!(opps[2].confidence, 0.0);
    }

    #[tokio::test]
    async fn test_price_history_defaults_to_seven_days() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/prices/history/az_gold"))
            .and(query_param("days", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"fund": "az_gold", "days": 7, "data": [
                    {"price": 97.5, "change": -0.3, "volume": 900, "timestamp": "2025-02-27T10:00:00"}
                ]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/prices/history/az_gold"))
            .and(query_param("days", "30"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"fund": "az_gold", "data": []}"#),
            )
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let history = gateway.price_history("az_gold", None).await.unwrap();
        assert_eq!(history.days, 7);
        assert_eq!(history.points.len(), 1);
        assert_eq!(history.points[0].price, 97.5);
        assert!(history.points[0].observed_at.is_some());

        let history = gateway.price_history("az_gold", Some(30)).await.unwrap();
        assert_eq!(history.days, 30);
        assert!(history.points.is_empty());
    }

    #[tokio::test]
    async fn test_all_sentiment() {
        let mock_response = r#"{
            "data": [
                {
                    "fund": "az_gold",
                    "sentiment_distribution": {"positive": 62.5, "neutral": -3.0, "negative": 12.0},
                    "overall_score": 1.7,
                    "trending": true,
                    "source_count": 184,
                    "recent_items": [
                        {"source": "Reddit r/EgyptInvest", "text": "Gold fund up again", "url": "https://example.com/1", "timestamp": "2025-03-01T10:00:00"},
                        {"text": "No source here", "url": ""}
                    ],
                    "timestamp": "2025-03-01T10:15:00"
                },
                {"fund": "az_shariah"}
            ],
            "timestamp": "2025-03-01T10:15:00"
        }"#;
        let server = create_mock_server("/api/sentiment/all", mock_response).await;

        let summaries = gateway(&server).all_sentiment().await.unwrap();

        assert_eq!(summaries.len(), 2);
        let gold = &summaries[0];
        assert_eq!(gold.distribution.positive_pct, 62.5);
        assert_eq!(gold.distribution.neutral_pct, 0.0);
        assert_eq!(gold.overall_score, 1.0);
        assert!(gold.trending);
        assert_eq!(gold.source_count, 184);
        assert_eq!(gold.recent_items.len(), 2);
        assert_eq!(gold.recent_items[0].source_label, "Reddit r/EgyptInvest");
        assert_eq!(
            gold.recent_items[0].observed_at.as_deref(),
            Some("2025-03-01T10:00:00")
        );
        assert_eq!(gold.recent_items[1].source_label, "Unknown");
        assert!(gold.recent_items[1].url.is_none());
        assert!(gold.recent_items[1].observed_at.is_none());

        let shariah = &summaries[1];
        assert_eq!(shariah.overall_score, 0.0);
        assert_eq!(shariah.source_count, 0);
        assert!(shariah.recent_items.is_empty());
    }

    #[tokio::test]
    async fn test_sentiment_alerts_and_trending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sentiment/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"alerts": [{"fund": "az_gold", "alert": "Strong positive sentiment"}, {"fund": "az_shariah", "alert": ""}]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/sentiment/trending/az_gold"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"fund": "az_gold", "trending_keywords": ["gold", "hedge"], "timestamp": "2025-03-01T10:15:00"}"#,
            ))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let alerts = gateway.sentiment_alerts().await.unwrap();
        assert_eq!(
            alerts,
            vec![SentimentAlert {
                fund_id: "az_gold".to_string(),
                message: "Strong positive sentiment".to_string()
            }]
        );

        let trending = gateway.trending_keywords("az_gold").await.unwrap();
        assert_eq!(trending.keywords, vec!["gold", "hedge"]);
    }

    #[tokio::test]
    async fn test_recommendations_and_risk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/recommendations/all"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"recommendations": [
                    {"fund": "az_gold", "recommendation": "STRONG_BUY", "confidence": 0.9, "price_change": -1.2,
                     "sentiment_score": 0.6, "target_price": 104.2, "reason": "Based on price and sentiment analysis"}
                ]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/recommendations/opportunities"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"top_opportunities": [{"fund": "halan_saving", "recommendation": "MAYBE"}], "count": 1}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/recommendations/risk/az_gold"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"fund": "az_gold", "risk_score": 42.5, "risk_level": "MEDIUM", "volatility": 0.031}"#,
            ))
            .mount(&server)
            .await;

        let gateway = gateway(&server);

        let recs = gateway.recommendations().await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].signal, Signal::StrongBuy);
        assert_eq!(recs[0].target_price, 104.2);

        let top = gateway.top_opportunities().await.unwrap();
        assert_eq!(top[0].signal, Signal::Hold);
        assert_eq!(top[0].reason, "");

        let risk = gateway.risk_assessment("az_gold").await.unwrap();
        assert_eq!(risk.risk_level, "MEDIUM");
        assert_eq!(risk.risk_score, 42.5);
    }

    #[tokio::test]
    async fn test_health_is_outside_api_prefix() {
        let server = create_mock_server(
            "/health",
            r#"{"status": "healthy", "service": "halan-invest-mock-api"}"#,
        )
        .await;

        let health = gateway(&server).health().await.unwrap();
        assert!(health.is_healthy());
        assert_eq!(health.service.as_deref(), Some("halan-invest-mock-api"));
    }

    #[tokio::test]
    async fn test_errors_propagate_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sentiment/all"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = gateway(&server).all_sentiment().await;
        assert_eq!(
            result.unwrap_err(),
            TransportError::Server {
                path: "/sentiment/all".to_string(),
                status: 500,
                attempts: 4
            }
        );
    }
}
