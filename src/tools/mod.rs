//! Collaborator contracts
//!
//! Every external data source the orchestrator talks to sits behind one of
//! these traits. The bundled adapters live in the submodules; tests swap in
//! stubs.

use crate::models::{AnalysisReport, DailySeries, ProviderReply, Quote, TickerSymbol};
use crate::Result;
use std::sync::Arc;

pub mod alpha_vantage;
pub mod analysis;
pub mod news;

pub use alpha_vantage::AlphaVantageClient;
pub use analysis::StatisticalAnalyzer;
pub use news::HeadlineFeed;

/// Number of daily points requested for historical lookups.
pub const DEFAULT_SERIES_SIZE: usize = 100;

#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, ticker: &TickerSymbol) -> Result<ProviderReply<Quote>>;
}

#[async_trait::async_trait]
pub trait HistoricalProvider: Send + Sync {
    async fn daily_closes(
        &self,
        ticker: &TickerSymbol,
        size: usize,
    ) -> Result<ProviderReply<DailySeries>>;
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    /// Headlines for a topic, most relevant first; may be empty.
    async fn headlines(&self, topic: &str) -> Result<Vec<String>>;
}

#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Per-ticker metrics; tickers without enough data are reported, not dropped.
    async fn analyze(&self, tickers: &[TickerSymbol]) -> Result<AnalysisReport>;
}

/// Generation Adapter boundary.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// The set of collaborators a dispatcher routes to.
#[derive(Clone)]
pub struct Collaborators {
    pub quotes: Arc<dyn QuoteProvider>,
    pub history: Arc<dyn HistoricalProvider>,
    pub news: Arc<dyn NewsProvider>,
    pub analysis: Arc<dyn AnalysisProvider>,
    pub generator: Arc<dyn TextGenerator>,
}

/// Generator used when no LLM key is configured. Fails every call so the
/// HTTP layer reports the misconfiguration instead of inventing an answer.
pub struct UnconfiguredGenerator;

#[async_trait::async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(crate::error::OrchestrationError::GenerationError(
            "GEMINI_API_KEY not configured. Please set it in your .env file.".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_generator_reports_missing_key() {
        let result = UnconfiguredGenerator.generate("hello").await;
        let message = result.unwrap_err().to_string();
        assert!(message.contains("GEMINI_API_KEY"));
    }
}
