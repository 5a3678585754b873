//! Confidence-gated retrieval
//!
//! Turns the top-k semantic matches for a query into a context block and a
//! confidence score, and decides whether that context is trusted for
//! grounded generation or bypassed in favor of open generation.

use crate::error::OrchestrationError;
use crate::models::{ConfidenceScore, RetrievalMatch};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub mod embed;
pub mod index;

pub use embed::HashingEmbedder;
pub use index::FlatIndex;

/// Context returned when the index has nothing to offer.
pub const NO_DOCUMENTS: &str = "No relevant documents found.";

/// Documents loaded into an empty index on first use.
pub const SEED_CORPUS: &[&str] = &[
    "Federated learning is a machine learning approach that trains an algorithm across multiple decentralized edge devices or servers holding local data samples, without exchanging the samples themselves.",
    "Blockchain technology, fundamentally a decentralized, distributed ledger, records transactions across many computers so that any involved record cannot be altered retroactively.",
    "Quantum computing in finance is an emerging field exploring how quantum algorithms could speed up portfolio optimization, option pricing and risk simulation.",
    "The concept of 'Efficient Market Hypothesis' suggests that financial markets are 'informationally efficient', meaning asset prices fully reflect all available information.",
    "Algorithmic trading uses computer programs to execute trades according to predefined rules on timing, price and volume.",
    "Risk management in finance involves identifying, analyzing, and mitigating financial risks such as market, credit, liquidity and operational risk.",
    "ESG investing refers to a set of standards for a company's operations that socially conscious investors use to screen potential investments: environmental, social and governance criteria.",
    "Diversification is a strategy employed to minimize risk by investing in a variety of assets, so that the poor performance of one holding is offset by others.",
];

/// Produces dense vectors for texts.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbour store consumed by the gate.
#[async_trait::async_trait]
pub trait SemanticIndex: Send + Sync {
    /// Up to `k` matches, nearest first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalMatch>>;

    /// Add documents; re-adding known content is a no-op. Returns the number
    /// of new entries.
    async fn upsert(&self, documents: &[String]) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}

/// Trust threshold and distance normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub threshold: f32,
    pub distance_reference: f32,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            threshold: crate::config::DEFAULT_CONFIDENCE_THRESHOLD,
            distance_reference: crate::config::DEFAULT_DISTANCE_REFERENCE,
        }
    }
}

impl ConfidencePolicy {
    /// Mean of the per-match confidences; zero for no matches.
    pub fn score(&self, matches: &[RetrievalMatch]) -> ConfidenceScore {
        ConfidenceScore::mean(
            matches
                .iter()
                .map(|m| ConfidenceScore::from_distance(m.distance, self.distance_reference)),
        )
    }

    pub fn trusts(&self, confidence: ConfidenceScore) -> bool {
        confidence.value() >= self.threshold
    }
}

#[derive(Debug, Clone)]
pub struct Retrieval {
    pub context: String,
    pub confidence: ConfidenceScore,
    pub matches: Vec<RetrievalMatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Context is trusted and should ground generation.
    Grounded {
        context: String,
        confidence: ConfidenceScore,
    },
    /// Context was discarded; answer from general knowledge.
    Fallback { confidence: ConfidenceScore },
}

pub struct RetrievalGate {
    index: Arc<dyn SemanticIndex>,
    seed: Vec<String>,
    seeded: OnceCell<()>,
    policy: ConfidencePolicy,
}

impl RetrievalGate {
    pub fn new(index: Arc<dyn SemanticIndex>, policy: ConfidencePolicy) -> Self {
        Self::with_seed(
            index,
            policy,
            SEED_CORPUS.iter().map(|d| d.to_string()).collect(),
        )
    }

    pub fn with_seed(index: Arc<dyn SemanticIndex>, policy: ConfidencePolicy, seed: Vec<String>) -> Self {
        Self {
            index,
            seed,
            seeded: OnceCell::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ConfidencePolicy {
        self.policy
    }

    /// Populate an empty index from the seed corpus, once per gate.
    pub async fn ensure_seeded(&self) -> Result<()> {
        self.seeded
            .get_or_try_init(|| async {
                if self.index.len().await? == 0 {
                    let added = self.index.upsert(&self.seed).await?;
                    info!(added, "Semantic index seeded");
                }
                Ok::<(), OrchestrationError>(())
            })
            .await?;
        Ok(())
    }

    pub async fn add_documents(&self, documents: &[String]) -> Result<usize> {
        self.ensure_seeded().await?;
        self.index.upsert(documents).await
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval> {
        if k == 0 {
            return Err(OrchestrationError::InvalidInput(
                "k must be at least 1".to_string(),
            ));
        }

        self.ensure_seeded().await?;

        let start = Instant::now();
        let matches = self.index.query(query, k).await?;

        if matches.is_empty() {
            debug!("No semantic matches");
            return Ok(Retrieval {
                context: NO_DOCUMENTS.to_string(),
                confidence: ConfidenceScore::ZERO,
                matches,
            });
        }

        for m in &matches {
            debug!(
                distance = m.distance,
                confidence = ConfidenceScore::from_distance(m.distance, self.policy.distance_reference).value(),
                preview = %m.text.chars().take(50).collect::<String>(),
                "Semantic match"
            );
        }

        let confidence = self.policy.score(&matches);
        let context = matches
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        info!(
            matches = matches.len(),
            confidence = confidence.value(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Retrieval completed"
        );

        Ok(Retrieval {
            context,
            confidence,
            matches,
        })
    }

    /// Retrieve and apply the trust threshold.
    pub async fn decide(&self, query: &str, k: usize) -> Result<GateDecision> {
        let retrieval = self.retrieve(query, k).await?;
        if self.policy.trusts(retrieval.confidence) {
            Ok(GateDecision::Grounded {
                context: retrieval.context,
                confidence: retrieval.confidence,
            })
        } else {
            Ok(GateDecision::Fallback {
                confidence: retrieval.confidence,
            })
        }
    }
}
