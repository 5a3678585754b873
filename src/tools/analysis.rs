//! Statistical analyzer
//!
//! Return, volatility and risk metrics over a bundled table of recent
//! closing prices. Tickers outside the table report insufficient data.

use super::AnalysisProvider;
use crate::models::{AnalysisReport, RiskLevel, TickerAnalysis, TickerMetrics, TickerSymbol};
use crate::Result;
use std::collections::HashMap;
use tracing::debug;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Seven consecutive daily closes per ticker, oldest first.
const SAMPLE_PRICES: &[(&str, [f64; 7])] = &[
    ("AAPL", [150.0, 152.0, 151.0, 155.0, 153.0, 158.0, 160.0]),
    ("GOOGL", [100.0, 101.0, 99.0, 103.0, 102.0, 105.0, 104.0]),
    ("MSFT", [200.0, 203.0, 201.0, 205.0, 204.0, 208.0, 210.0]),
    ("TSLA", [250.0, 245.0, 260.0, 255.0, 270.0, 265.0, 280.0]),
    ("NVDA", [300.0, 310.0, 305.0, 320.0, 315.0, 330.0, 325.0]),
];

pub struct StatisticalAnalyzer {
    prices: HashMap<String, Vec<f64>>,
}

impl StatisticalAnalyzer {
    pub fn new() -> Self {
        Self::with_prices(
            SAMPLE_PRICES
                .iter()
                .map(|(ticker, closes)| (ticker.to_string(), closes.to_vec())),
        )
    }

    /// Analyzer over caller-supplied closes (oldest first).
    pub fn with_prices<I>(prices: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        Self {
            prices: prices.into_iter().collect(),
        }
    }

    fn analyze_one(&self, ticker: &TickerSymbol) -> TickerAnalysis {
        match self.prices.get(ticker.as_str()) {
            Some(closes) => metrics(closes)
                .map(TickerAnalysis::Metrics)
                .unwrap_or(TickerAnalysis::InsufficientData),
            None => TickerAnalysis::InsufficientData,
        }
    }
}

impl Default for StatisticalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for StatisticalAnalyzer {
    async fn analyze(&self, tickers: &[TickerSymbol]) -> Result<AnalysisReport> {
        debug!(count = tickers.len(), "Analyzing tickers");
        Ok(AnalysisReport {
            entries: tickers
                .iter()
                .map(|t| (t.clone(), self.analyze_one(t)))
                .collect(),
        })
    }
}

fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// `None` when fewer than two daily returns exist.
pub fn metrics(closes: &[f64]) -> Option<TickerMetrics> {
    let returns = daily_returns(closes);
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let annualized_volatility_pct = variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;

    Some(TickerMetrics {
        average_daily_return_pct: mean * 100.0,
        annualized_volatility_pct,
        risk: RiskLevel::from_volatility(annualized_volatility_pct),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(t: &str) -> TickerSymbol {
        TickerSymbol::parse(t).unwrap()
    }

    #[test]
    fn test_flat_prices_are_low_risk() {
        let m = metrics(&[10.0, 10.0, 10.0, 10.0]).unwrap();
        assert_eq!(m.average_daily_return_pct, 0.0);
        assert_eq!(m.annualized_volatility_pct, 0.0);
        assert_eq!(m.risk, RiskLevel::Low);
    }

    #[test]
    fn test_known_series() {
        // Returns: +10%, -10%
        let m = metrics(&[100.0, 110.0, 99.0]).unwrap();
        assert!(m.average_daily_return_pct.abs() < 1e-9);
        // sample std of [0.1, -0.1] = 0.1414..., annualized ≈ 224.5%
        assert!((m.annualized_volatility_pct - 224.4994).abs() < 1e-3);
        assert_eq!(m.risk, RiskLevel::High);
    }

    #[test]
    fn test_too_few_points() {
        assert!(metrics(&[100.0]).is_none());
        assert!(metrics(&[100.0, 101.0]).is_none());
    }

    #[tokio::test]
    async fn test_report_keeps_request_order_and_flags_unknowns() {
        let analyzer = StatisticalAnalyzer::new();
        let report = analyzer
            .analyze(&[ticker("TSLA"), ticker("ZZZZ"), ticker("AAPL")])
            .await
            .unwrap();

        let names: Vec<_> = report.entries.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["TSLA", "ZZZZ", "AAPL"]);
        assert!(matches!(report.entries[0].1, TickerAnalysis::Metrics(_)));
        assert_eq!(report.entries[1].1, TickerAnalysis::InsufficientData);
    }

    #[tokio::test]
    async fn test_sample_aapl_is_medium_risk() {
        let report = StatisticalAnalyzer::new().analyze(&[ticker("AAPL")]).await.unwrap();
        let TickerAnalysis::Metrics(m) = &report.entries[0].1 else {
            panic!("expected metrics");
        };
        assert!(m.average_daily_return_pct > 1.0 && m.average_daily_return_pct < 1.2);
        assert_eq!(m.risk, RiskLevel::Medium);
    }
}
