//! Runtime settings
//!
//! Read from the process environment (after `dotenv` has loaded `.env`).

use crate::error::OrchestrationError;
use crate::models::TickerSymbol;
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_DISTANCE_REFERENCE: f32 = 1.0;
pub const DEFAULT_RETRIEVAL_K: usize = 2;
pub const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BRIEF_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_ANALYSIS_TICKERS: &[&str] = &["AAPL", "GOOGL"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub port: u16,
    pub confidence_threshold: f32,
    pub distance_reference: f32,
    pub retrieval_k: usize,
    pub collaborator_timeout: Duration,
    pub brief_refresh_interval: Duration,
    pub analysis_default_tickers: Vec<TickerSymbol>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            alpha_vantage_api_key: None,
            port: DEFAULT_PORT,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            distance_reference: DEFAULT_DISTANCE_REFERENCE,
            retrieval_k: DEFAULT_RETRIEVAL_K,
            collaborator_timeout: Duration::from_secs(DEFAULT_COLLABORATOR_TIMEOUT_SECS),
            brief_refresh_interval: Duration::from_secs(DEFAULT_BRIEF_INTERVAL_SECS),
            analysis_default_tickers: default_analysis_tickers(),
        }
    }
}

fn default_analysis_tickers() -> Vec<TickerSymbol> {
    DEFAULT_ANALYSIS_TICKERS
        .iter()
        .filter_map(|t| TickerSymbol::parse(t).ok())
        .collect()
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_value("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let confidence_threshold: f32 = parse_or("RAG_CONFIDENCE_THRESHOLD", get("RAG_CONFIDENCE_THRESHOLD"), DEFAULT_CONFIDENCE_THRESHOLD)?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(OrchestrationError::ConfigError(format!(
                "RAG_CONFIDENCE_THRESHOLD must be within [0, 1], got {}",
                confidence_threshold
            )));
        }

        let distance_reference: f32 = parse_or("RAG_DISTANCE_REFERENCE", get("RAG_DISTANCE_REFERENCE"), DEFAULT_DISTANCE_REFERENCE)?;
        if distance_reference <= 0.0 || !distance_reference.is_finite() {
            return Err(OrchestrationError::ConfigError(format!(
                "RAG_DISTANCE_REFERENCE must be positive, got {}",
                distance_reference
            )));
        }

        let retrieval_k: usize = parse_or("RAG_TOP_K", get("RAG_TOP_K"), DEFAULT_RETRIEVAL_K)?;
        if retrieval_k == 0 {
            return Err(OrchestrationError::ConfigError(
                "RAG_TOP_K must be at least 1".to_string(),
            ));
        }

        let timeout_secs: u64 = parse_or("COLLABORATOR_TIMEOUT_SECS", get("COLLABORATOR_TIMEOUT_SECS"), DEFAULT_COLLABORATOR_TIMEOUT_SECS)?;
        let interval_secs: u64 = parse_or("MARKET_BRIEF_INTERVAL_SECS", get("MARKET_BRIEF_INTERVAL_SECS"), DEFAULT_BRIEF_INTERVAL_SECS)?;
        if timeout_secs == 0 || interval_secs == 0 {
            return Err(OrchestrationError::ConfigError(
                "timeouts and intervals must be at least one second".to_string(),
            ));
        }

        let analysis_default_tickers = match get("ANALYSIS_DEFAULT_TICKERS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| {
                    TickerSymbol::parse(t).map_err(|_| {
                        OrchestrationError::ConfigError(format!(
                            "ANALYSIS_DEFAULT_TICKERS contains invalid ticker '{}'",
                            t
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => default_analysis_tickers(),
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").filter(|k| k != "your_gemini_api_key_here"),
            alpha_vantage_api_key: get("ALPHA_VANTAGE_API_KEY"),
            port,
            confidence_threshold,
            distance_reference,
            retrieval_k,
            collaborator_timeout: Duration::from_secs(timeout_secs),
            brief_refresh_interval: Duration::from_secs(interval_secs),
            analysis_default_tickers,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        OrchestrationError::ConfigError(format!("{} has an invalid value: '{}'", key, raw))
    })
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
