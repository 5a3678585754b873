//! Query dispatcher
//!
//! QUERY → CLASSIFY → DISPATCH → (collaborators, sequential) → COMPOSE
//!
//! Every collaborator call is bounded by a timeout. Data collaborators that
//! time out are treated as having no data; generation and retrieval time-outs
//! are failures because there is no truthful fallback text for them.

use crate::classifier::IntentClassifier;
use crate::composer;
use crate::config::Settings;
use crate::error::OrchestrationError;
use crate::models::{CompositeResponse, Intent, ProviderReply, ProviderSignal, TickerSymbol};
use crate::gemini::GeminiClient;
use crate::retrieval::{ConfidencePolicy, Embedder, FlatIndex, GateDecision, HashingEmbedder, RetrievalGate};
use crate::tools::{
    AlphaVantageClient, Collaborators, HeadlineFeed, StatisticalAnalyzer, TextGenerator,
    UnconfiguredGenerator, DEFAULT_SERIES_SIZE,
};
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Index ETFs summarized in the market brief, in reporting order.
pub const MARKET_INDEX_TICKERS: &[&str] = &["SPY", "QQQ", "DIA"];
const BRIEF_NEWS_TOPIC: &str = "market";
const BRIEF_HEADLINE_LIMIT: usize = 3;

#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    pub retrieval_k: usize,
    pub collaborator_timeout: Duration,
    pub brief_tickers: Vec<TickerSymbol>,
}

impl DispatchPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            retrieval_k: settings.retrieval_k,
            collaborator_timeout: settings.collaborator_timeout,
            brief_tickers: MARKET_INDEX_TICKERS
                .iter()
                .filter_map(|t| TickerSymbol::parse(t).ok())
                .collect(),
        }
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Result of a brief generation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BriefOutcome {
    Summary(String),
    /// A provider signal aborted the brief; the signal is the whole answer.
    Signal(ProviderSignal),
}

impl BriefOutcome {
    pub fn into_text(self) -> String {
        match self {
            BriefOutcome::Summary(text) => text,
            BriefOutcome::Signal(signal) => signal.0,
        }
    }
}

/// Routes classified queries to collaborators and composes the answer
pub struct Orchestrator {
    classifier: IntentClassifier,
    collaborators: Collaborators,
    retrieval: RetrievalGate,
    policy: DispatchPolicy,
}

impl Orchestrator {
    pub fn new(
        classifier: IntentClassifier,
        collaborators: Collaborators,
        retrieval: RetrievalGate,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            classifier,
            collaborators,
            retrieval,
            policy,
        }
    }

    /// Wire the bundled adapters. Without a Gemini key, generation fails
    /// per call and retrieval embeds offline.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let market = Arc::new(AlphaVantageClient::new(settings.alpha_vantage_api_key.clone())?);
        if settings.alpha_vantage_api_key.is_none() {
            warn!("ALPHA_VANTAGE_API_KEY not set; quote and historical lookups will fail");
        }

        let (generator, embedder): (Arc<dyn TextGenerator>, Arc<dyn Embedder>) =
            match &settings.gemini_api_key {
                Some(key) => {
                    let gemini = Arc::new(GeminiClient::new(key.clone())?);
                    (gemini.clone(), gemini)
                }
                None => {
                    warn!("GEMINI_API_KEY not set; using offline embeddings, generation disabled");
                    (Arc::new(UnconfiguredGenerator), Arc::new(HashingEmbedder::default()))
                }
            };

        let collaborators = Collaborators {
            quotes: market.clone(),
            history: market,
            news: Arc::new(HeadlineFeed::new()),
            analysis: Arc::new(StatisticalAnalyzer::new()),
            generator,
        };
        let retrieval = RetrievalGate::new(
            Arc::new(FlatIndex::new(embedder)),
            ConfidencePolicy {
                threshold: settings.confidence_threshold,
                distance_reference: settings.distance_reference,
            },
        );

        Ok(Self::new(
            IntentClassifier::new(settings.analysis_default_tickers.clone()),
            collaborators,
            retrieval,
            DispatchPolicy::from_settings(settings),
        ))
    }

    pub fn retrieval(&self) -> &RetrievalGate {
        &self.retrieval
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Answer a free-text query.
    pub async fn handle(&self, query: &str) -> Result<String> {
        let span = info_span!("handle", request_id = %Uuid::new_v4());
        async {
            let start = Instant::now();
            let intent = self.classifier.classify(query);
            info!(intent = intent.label(), query = %query, "Routing query");

            let result = self.dispatch(intent, query).await;

            match &result {
                Ok(answer) => info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    answer_len = answer.len(),
                    "Query handled"
                ),
                Err(e) => warn!(error = %e, "Query failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run the handling path for an already classified intent.
    pub async fn dispatch(&self, intent: Intent, query: &str) -> Result<String> {
        match intent {
            Intent::Quote(ticker) => self.answer_quote(&ticker).await,
            Intent::Historical(ticker) => self.answer_historical(&ticker).await,
            Intent::News(topic) => self.answer_news(&topic).await,
            Intent::Analysis(tickers) => self.answer_analysis(&tickers).await,
            Intent::Explain(topic) => self.answer_explain(&topic).await,
            Intent::Unclassified => {
                debug!("Default route to generation");
                self.generate(&composer::assistant_prompt(query)).await
            }
        }
    }

    async fn answer_quote(&self, ticker: &TickerSymbol) -> Result<String> {
        debug!(ticker = %ticker, "Fetching live quote");
        let reply = self
            .bounded("quote", self.collaborators.quotes.quote(ticker))
            .await?;

        Ok(match reply {
            Some(ProviderReply::Signal(signal)) => signal.0,
            Some(ProviderReply::Data(quote)) => composer::quote_summary(ticker, &quote),
            Some(ProviderReply::Empty) | None => composer::quote_unavailable(ticker),
        })
    }

    async fn answer_historical(&self, ticker: &TickerSymbol) -> Result<String> {
        debug!(ticker = %ticker, "Fetching historical series");
        let reply = self
            .bounded(
                "historical series",
                self.collaborators.history.daily_closes(ticker, DEFAULT_SERIES_SIZE),
            )
            .await?;

        Ok(match reply {
            Some(ProviderReply::Signal(signal)) => signal.0,
            Some(ProviderReply::Data(series)) if !series.is_empty() => {
                composer::historical_summary(ticker, &series)
            }
            Some(_) | None => composer::historical_unavailable(ticker),
        })
    }

    async fn answer_news(&self, topic: &str) -> Result<String> {
        debug!(topic, "Fetching news");
        let headlines = self
            .bounded("news", self.collaborators.news.headlines(topic))
            .await?
            .unwrap_or_default();
        Ok(composer::news_digest(&headlines))
    }

    async fn answer_analysis(&self, tickers: &[TickerSymbol]) -> Result<String> {
        debug!(tickers = %crate::models::join_tickers(tickers), "Running analysis");
        let report = self
            .bounded("analysis", self.collaborators.analysis.analyze(tickers))
            .await?;

        Ok(match report {
            Some(report) => composer::analysis_summary(tickers, &report),
            None => composer::analysis_unavailable(tickers),
        })
    }

    async fn answer_explain(&self, topic: &str) -> Result<String> {
        let decision = self
            .bounded(
                "semantic index",
                self.retrieval.decide(topic, self.policy.retrieval_k),
            )
            .await?
            .ok_or_else(|| OrchestrationError::Timeout("semantic index".to_string()))?;

        match decision {
            GateDecision::Grounded { context, confidence } => {
                info!(confidence = confidence.value(), "Grounding generation on retrieved context");
                let answer = self.generate(&composer::grounded_prompt(&context, topic)).await?;
                Ok(composer::grounded_answer(&answer))
            }
            GateDecision::Fallback { confidence } => {
                info!(
                    confidence = confidence.value(),
                    threshold = self.retrieval.policy().threshold,
                    "Low retrieval confidence, answering from general knowledge"
                );
                let answer = self.generate(&composer::open_prompt(topic)).await?;
                Ok(composer::fallback_answer(&answer))
            }
        }
    }

    /// Build a fresh market brief. A provider signal on any index ticker
    /// abandons the brief.
    pub async fn market_brief(&self) -> Result<BriefOutcome> {
        info!("Generating market brief");
        let mut brief = CompositeResponse::new();

        for ticker in &self.policy.brief_tickers {
            let reply = self
                .bounded("quote", self.collaborators.quotes.quote(ticker))
                .await?;

            match reply {
                Some(ProviderReply::Signal(signal)) => {
                    warn!(ticker = %ticker, "Provider signal during market brief, abandoning");
                    return Ok(BriefOutcome::Signal(signal));
                }
                Some(ProviderReply::Data(quote)) => brief.push(composer::brief_quote_line(ticker, &quote)),
                Some(ProviderReply::Empty) | None => brief.push(composer::brief_quote_unavailable(ticker)),
            }
        }

        let headlines = self
            .bounded("news", self.collaborators.news.headlines(BRIEF_NEWS_TOPIC))
            .await?
            .unwrap_or_default();
        brief.extend(composer::brief_news_block(&headlines, BRIEF_HEADLINE_LIMIT));

        let summary = self.generate(&composer::brief_prompt(brief)).await?;
        Ok(BriefOutcome::Summary(summary))
    }

    /// Market brief as text: the summary, or the provider signal that stopped it.
    pub async fn get_market_brief(&self) -> Result<String> {
        self.market_brief().await.map(BriefOutcome::into_text)
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.bounded("text generation", self.collaborators.generator.generate(prompt))
            .await?
            .ok_or_else(|| OrchestrationError::Timeout("text generation".to_string()))
    }

    /// Await a collaborator call; `Ok(None)` when it exceeds the timeout.
    async fn bounded<T, F>(&self, collaborator: &'static str, call: F) -> Result<Option<T>>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        match tokio::time::timeout(self.policy.collaborator_timeout, call).await {
            Ok(result) => {
                debug!(
                    collaborator,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    ok = result.is_ok(),
                    "Collaborator returned"
                );
                result.map(Some)
            }
            Err(_) => {
                warn!(
                    collaborator,
                    timeout_ms = self.policy.collaborator_timeout.as_millis() as u64,
                    "Collaborator timed out"
                );
                Ok(None)
            }
        }
    }
}
