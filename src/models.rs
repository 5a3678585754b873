//! Core data models for the query orchestrator

use crate::error::OrchestrationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Ticker =================
//

/// 1–5 uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

impl TickerSymbol {
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let valid = (1..=5).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_uppercase());
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(OrchestrationError::InvalidTicker(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = OrchestrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TickerSymbol> for String {
    fn from(value: TickerSymbol) -> Self {
        value.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comma-joined ticker list, e.g. `AAPL, GOOGL`.
pub fn join_tickers(tickers: &[TickerSymbol]) -> String {
    tickers
        .iter()
        .map(TickerSymbol::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

//
// ================= Intent =================
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Intent {
    Quote(TickerSymbol),
    Historical(TickerSymbol),
    News(String),
    Analysis(Vec<TickerSymbol>),
    Explain(String),
    Unclassified,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Quote(_) => "quote",
            Intent::Historical(_) => "historical",
            Intent::News(_) => "news",
            Intent::Analysis(_) => "analysis",
            Intent::Explain(_) => "explain",
            Intent::Unclassified => "unclassified",
        }
    }
}

//
// ================= Provider replies =================
//

/// Rate-limit or informational message from a data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSignal(pub String);

impl fmt::Display for ProviderSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a data-provider call that did not fail at the transport level.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply<T> {
    Signal(ProviderSignal),
    Data(T),
    Empty,
}

//
// ================= Market data =================
//

/// Quote fields as reported by the provider, kept verbatim for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub open: String,
    pub high: String,
    pub low: String,
    pub price: String,
    pub volume: String,
    pub latest_trading_day: String,
    pub change: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes ordered most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    points: Vec<DailyClose>,
}

impl DailySeries {
    pub fn new(mut points: Vec<DailyClose>) -> Self {
        points.sort_by(|a, b| b.date.cmp(&a.date));
        Self { points }
    }

    pub fn latest(&self) -> Option<&DailyClose> {
        self.points.first()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The `n` most recent closes, newest first.
    pub fn recent_closes(&self, n: usize) -> Vec<f64> {
        self.points.iter().take(n).map(|p| p.close).collect()
    }
}

//
// ================= Analysis =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_volatility(annualized_volatility_pct: f64) -> Self {
        if annualized_volatility_pct > 30.0 {
            RiskLevel::High
        } else if annualized_volatility_pct > 15.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMetrics {
    pub average_daily_return_pct: f64,
    pub annualized_volatility_pct: f64,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickerAnalysis {
    Metrics(TickerMetrics),
    InsufficientData,
}

/// Per-ticker analysis in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisReport {
    pub entries: Vec<(TickerSymbol, TickerAnalysis)>,
}

//
// ================= Retrieval =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub text: String,
    pub distance: f32,
}

/// Trust metric in `[0, 1]` derived from retrieval distance.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ConfidenceScore(f32);

impl ConfidenceScore {
    pub const ZERO: ConfidenceScore = ConfidenceScore(0.0);

    /// `max(0, 1 - distance / reference)`, clamped to `[0, 1]`.
    /// A NaN distance scores zero.
    pub fn from_distance(distance: f32, reference: f32) -> Self {
        if distance.is_nan() {
            return Self::ZERO;
        }
        let raw = 1.0 - distance.max(0.0) / reference;
        if raw.is_nan() {
            return Self::ZERO;
        }
        Self(raw.clamp(0.0, 1.0))
    }

    /// Arithmetic mean; an empty sequence scores zero.
    pub fn mean<I: IntoIterator<Item = ConfidenceScore>>(scores: I) -> Self {
        let (sum, count) = scores
            .into_iter()
            .fold((0.0f32, 0usize), |(sum, count), s| (sum + s.0, count + 1));
        if count == 0 {
            Self::ZERO
        } else {
            Self((sum / count as f32).clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

//
// ================= Composite response =================
//

/// Append-only list of fragments, joined once at the end of assembly.
#[derive(Debug, Clone, Default)]
pub struct CompositeResponse {
    parts: Vec<String>,
}

impl CompositeResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            parts: vec![header.into()],
        }
    }

    pub fn push(&mut self, part: impl Into<String>) {
        self.parts.push(part.into());
    }

    pub fn extend<I, S>(&mut self, parts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parts.extend(parts.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn join(self, separator: &str) -> String {
        self.parts.join(separator)
    }
}
