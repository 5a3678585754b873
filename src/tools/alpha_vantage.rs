//! Alpha Vantage market data client
//!
//! Serves both quote and daily-series lookups. Provider notes
//! (rate limits, plan information) come back as [`ProviderReply::Signal`].

use super::{HistoricalProvider, QuoteProvider};
use crate::error::OrchestrationError;
use crate::models::{DailyClose, DailySeries, ProviderReply, ProviderSignal, Quote, TickerSymbol};
use crate::Result;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Series longer than this are requested with `outputsize=full`.
const COMPACT_SERIES_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, function: &str, symbol: &str, extra: &[(&str, &str)]) -> Result<Value> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            OrchestrationError::CollaboratorError(
                "ALPHA_VANTAGE_API_KEY is not configured".to_string(),
            )
        })?;

        let mut params = vec![("function", function), ("symbol", symbol), ("apikey", api_key)];
        params.extend_from_slice(extra);

        debug!(function, symbol, "Calling Alpha Vantage");

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                OrchestrationError::CollaboratorError(format!(
                    "Failed to connect to Alpha Vantage: {}",
                    e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrchestrationError::CollaboratorError(format!(
                "Alpha Vantage returned {} for {} {}",
                status, function, symbol
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| OrchestrationError::MalformedPayload(format!("Invalid JSON response: {}", e)))?;

        if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
            warn!(function, symbol, "Alpha Vantage error: {}", message);
            return Err(OrchestrationError::CollaboratorError(message.to_string()));
        }

        Ok(body)
    }
}

#[async_trait::async_trait]
impl QuoteProvider for AlphaVantageClient {
    async fn quote(&self, ticker: &TickerSymbol) -> Result<ProviderReply<Quote>> {
        let body = self.fetch("GLOBAL_QUOTE", ticker.as_str(), &[]).await?;
        Ok(parse_quote(&body))
    }
}

#[async_trait::async_trait]
impl HistoricalProvider for AlphaVantageClient {
    async fn daily_closes(
        &self,
        ticker: &TickerSymbol,
        size: usize,
    ) -> Result<ProviderReply<DailySeries>> {
        let output_size = if size > COMPACT_SERIES_LIMIT { "full" } else { "compact" };
        let body = self
            .fetch("TIME_SERIES_DAILY", ticker.as_str(), &[("outputsize", output_size)])
            .await?;
        parse_daily_series(&body)
    }
}

/// `Note` and `Information` carry rate-limit and plan messages.
fn provider_signal(body: &Value) -> Option<ProviderSignal> {
    ["Note", "Information"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(|message| ProviderSignal(message.to_string()))
}

fn field(object: &Value, key: &str, fallback: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

pub fn parse_quote(body: &Value) -> ProviderReply<Quote> {
    if let Some(signal) = provider_signal(body) {
        return ProviderReply::Signal(signal);
    }

    let Some(quote) = body.get("Global Quote").filter(|q| q.as_object().is_some_and(|o| !o.is_empty())) else {
        return ProviderReply::Empty;
    };

    ProviderReply::Data(Quote {
        open: field(quote, "02. open", "N/A"),
        high: field(quote, "03. high", "N/A"),
        low: field(quote, "04. low", "N/A"),
        price: field(quote, "05. price", "N/A"),
        volume: field(quote, "06. volume", "N/A"),
        latest_trading_day: field(quote, "07. latest trading day", "N/A"),
        change: field(quote, "09. change", "N/A"),
    })
}

pub fn parse_daily_series(body: &Value) -> Result<ProviderReply<DailySeries>> {
    if let Some(signal) = provider_signal(body) {
        return Ok(ProviderReply::Signal(signal));
    }

    let Some(series) = body.get("Time Series (Daily)").and_then(Value::as_object) else {
        return Ok(ProviderReply::Empty);
    };
    if series.is_empty() {
        return Ok(ProviderReply::Empty);
    }

    let points = series
        .iter()
        .map(|(date, bar)| {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                OrchestrationError::MalformedPayload(format!("bad series date '{}': {}", date, e))
            })?;
            let close = bar
                .get("4. close")
                .and_then(Value::as_str)
                .and_then(|c| c.parse::<f64>().ok())
                .ok_or_else(|| {
                    OrchestrationError::MalformedPayload(format!("missing close for {}", date))
                })?;
            Ok(DailyClose { date, close })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ProviderReply::Data(DailySeries::new(points)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quote_payload() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "TSLA",
                "02. open": "180.0000",
                "03. high": "185.5000",
                "04. low": "178.1000",
                "05. price": "184.2000",
                "06. volume": "91234567",
                "07. latest trading day": "2024-05-10",
                "09. change": "3.1000"
            }
        });

        let ProviderReply::Data(quote) = parse_quote(&body) else {
            panic!("expected quote data");
        };
        assert_eq!(quote.price, "184.2000");
        assert_eq!(quote.latest_trading_day, "2024-05-10");
        assert_eq!(quote.change, "3.1000");
    }

    #[test]
    fn test_parse_quote_signals_and_empty() {
        let note = json!({ "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute." });
        assert!(matches!(parse_quote(&note), ProviderReply::Signal(_)));

        let info = json!({ "Information": "Premium endpoint." });
        assert_eq!(
            parse_quote(&info),
            ProviderReply::Signal(ProviderSignal("Premium endpoint.".to_string()))
        );

        assert_eq!(parse_quote(&json!({ "Global Quote": {} })), ProviderReply::Empty);
        assert_eq!(parse_quote(&json!({})), ProviderReply::Empty);
    }

    #[test]
    fn test_parse_daily_series_sorted_newest_first() {
        let body = json!({
            "Meta Data": {},
            "Time Series (Daily)": {
                "2024-05-08": { "4. close": "100.0" },
                "2024-05-10": { "4. close": "110.0" },
                "2024-05-09": { "4. close": "105.0" }
            }
        });

        let ProviderReply::Data(series) = parse_daily_series(&body).unwrap() else {
            panic!("expected series");
        };
        assert_eq!(series.len(), 3);
        assert_eq!(series.recent_closes(3), vec![110.0, 105.0, 100.0]);
    }

    #[test]
    fn test_parse_daily_series_rejects_bad_close() {
        let body = json!({
            "Time Series (Daily)": { "2024-05-08": { "4. close": "n/a" } }
        });
        assert!(parse_daily_series(&body).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_collaborator_error() {
        let client = AlphaVantageClient::new(None).unwrap();
        let ticker = TickerSymbol::parse("AAPL").unwrap();
        let err = client.quote(&ticker).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::CollaboratorError(_)));
        assert!(err.to_string().contains("ALPHA_VANTAGE_API_KEY"));
    }
}
