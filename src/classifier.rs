//! Intent Classifier
//!
//! Maps a free-text query to exactly one [`Intent`]. Rules are evaluated in
//! priority order and the first match wins:
//! - Ticker after a lower-case price/quote trigger word → Quote or Historical
//! - News keywords → News
//! - Analysis keywords → Analysis
//! - Explanation phrasing → Explain
//! - Anything else → Unclassified

use crate::models::{Intent, TickerSymbol};
use lazy_static::lazy_static;
use regex::Regex;

/// Static keyword lists — zero allocation
const HISTORICAL_KEYWORDS: &[&str] = &["historical", "performance"];

const NEWS_KEYWORDS: &[&str] = &["news", "headlines", "filings"];

const NEWS_PREFIXES: &[&str] = &["news about", "latest news on"];

const ANALYSIS_KEYWORDS: &[&str] = &["analyze", "risk", "volatility", "returns", "portfolio"];

const EXPLAIN_KEYWORDS: &[&str] = &["explain", "what is", "tell me about", "define"];

/// Single-letter English words that read as tickers in upper case.
const TICKER_STOPWORDS: &[&str] = &["I", "A"];

lazy_static! {
    static ref TRIGGERED_TICKER: Regex =
        Regex::new(r"(?:price|quote|stock|performance|historical).*?\b([A-Z]{1,5})\b")
            .expect("ticker pattern is valid");
    static ref STANDALONE_TICKER: Regex =
        Regex::new(r"\b([A-Z]{1,5})\b").expect("standalone ticker pattern is valid");
}

/// Query with its lower-cased form computed once.
pub struct Query<'a> {
    pub raw: &'a str,
    pub lowered: String,
}

impl<'a> Query<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lowered: raw.to_lowercase(),
        }
    }

    fn mentions_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| self.lowered.contains(kw))
    }
}

/// One predicate+extractor pair.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&IntentClassifier, &Query<'_>) -> Option<Intent>,
}

/// Priority-ordered rule table.
pub const RULES: &[Rule] = &[
    Rule { name: "ticker", apply: ticker_rule },
    Rule { name: "news", apply: news_rule },
    Rule { name: "analysis", apply: analysis_rule },
    Rule { name: "explain", apply: explain_rule },
];

/// Intent classifier
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    default_analysis_tickers: Vec<TickerSymbol>,
}

impl IntentClassifier {
    pub fn new(default_analysis_tickers: Vec<TickerSymbol>) -> Self {
        Self {
            default_analysis_tickers,
        }
    }

    /// Classify a query. Never fails; unmatched input is `Unclassified`.
    pub fn classify(&self, query: &str) -> Intent {
        let query = Query::new(query);
        RULES
            .iter()
            .find_map(|rule| (rule.apply)(self, &query))
            .unwrap_or(Intent::Unclassified)
    }

    /// Name of the rule that would fire, for diagnostics.
    pub fn matching_rule(&self, query: &str) -> Option<&'static str> {
        let query = Query::new(query);
        RULES
            .iter()
            .find(|rule| (rule.apply)(self, &query).is_some())
            .map(|rule| rule.name)
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(crate::config::Settings::default().analysis_default_tickers)
    }
}

fn ticker_rule(_: &IntentClassifier, query: &Query<'_>) -> Option<Intent> {
    let captures = TRIGGERED_TICKER.captures(query.raw)?;
    let ticker = TickerSymbol::parse(captures.get(1)?.as_str()).ok()?;

    if query.mentions_any(HISTORICAL_KEYWORDS) {
        Some(Intent::Historical(ticker))
    } else {
        Some(Intent::Quote(ticker))
    }
}

fn news_rule(_: &IntentClassifier, query: &Query<'_>) -> Option<Intent> {
    if !query.mentions_any(NEWS_KEYWORDS) {
        return None;
    }

    let topic = NEWS_PREFIXES
        .iter()
        .fold(query.lowered.clone(), |topic, prefix| topic.replace(prefix, ""));

    Some(Intent::News(topic.trim().to_string()))
}

fn analysis_rule(classifier: &IntentClassifier, query: &Query<'_>) -> Option<Intent> {
    if !query.mentions_any(ANALYSIS_KEYWORDS) {
        return None;
    }

    let mentioned = standalone_tickers(query.raw);
    let tickers = if mentioned.is_empty() {
        classifier.default_analysis_tickers.clone()
    } else {
        mentioned
    };

    Some(Intent::Analysis(tickers))
}

fn explain_rule(_: &IntentClassifier, query: &Query<'_>) -> Option<Intent> {
    query
        .mentions_any(EXPLAIN_KEYWORDS)
        .then(|| Intent::Explain(query.raw.to_string()))
}

/// Every standalone uppercase token of 1–5 letters, first occurrence order.
fn standalone_tickers(text: &str) -> Vec<TickerSymbol> {
    let mut tickers: Vec<TickerSymbol> = Vec::new();
    for token in STANDALONE_TICKER.captures_iter(text).filter_map(|c| c.get(1)) {
        let token = token.as_str();
        if TICKER_STOPWORDS.contains(&token) {
            continue;
        }
        if let Ok(ticker) = TickerSymbol::parse(token) {
            if !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }
    }
    tickers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> Intent {
        IntentClassifier::default().classify(q)
    }

    fn ticker(t: &str) -> TickerSymbol {
        TickerSymbol::parse(t).unwrap()
    }

    #[test]
    fn test_quote_queries() {
        assert_eq!(classify("What's the price of TSLA?"), Intent::Quote(ticker("TSLA")));
        assert_eq!(classify("quote for MSFT please"), Intent::Quote(ticker("MSFT")));
        assert_eq!(classify("Stock price of NVDA"), Intent::Quote(ticker("NVDA")));
    }

    #[test]
    fn test_historical_queries() {
        let cases = vec![
            "Show historical prices for AAPL",
            "How is the performance of GOOGL",
            "stock performance of TSLA this week",
        ];

        for c in cases {
            assert!(
                matches!(classify(c), Intent::Historical(_)),
                "expected historical for {}",
                c
            );
        }
    }

    #[test]
    fn test_ticker_never_taken_from_before_trigger() {
        assert_eq!(
            classify("AMZN vs the price of META"),
            Intent::Quote(ticker("META"))
        );
        // No ticker after the trigger word at all.
        assert_ne!(
            classify("IBM has a nice stock"),
            Intent::Quote(ticker("IBM"))
        );
    }

    #[test]
    fn test_capitalised_trigger_words_do_not_select_a_ticker() {
        let q = "Tell me about Performance fees in an ETF";
        assert_eq!(classify(q), Intent::Explain(q.to_string()));

        let q = "Explain Price to book PB ratio";
        assert_eq!(classify(q), Intent::Explain(q.to_string()));

        assert_eq!(
            classify("Historical volatility of SPY"),
            Intent::Analysis(vec![ticker("SPY")])
        );
        // A lower-case trigger later in the sentence still counts.
        assert_eq!(classify("Stock price of NVDA"), Intent::Quote(ticker("NVDA")));
    }

    #[test]
    fn test_ticker_rule_wins_over_news() {
        assert_eq!(
            classify("stock news for AAPL"),
            Intent::Quote(ticker("AAPL"))
        );
    }

    #[test]
    fn test_news_topic_is_cleaned() {
        assert_eq!(classify("news about AAPL"), Intent::News("aapl".to_string()));
        assert_eq!(
            classify("Latest news on the market"),
            Intent::News("the market".to_string())
        );
        assert_eq!(classify("any headlines today?"), Intent::News("any headlines today?".to_string()));
    }

    #[test]
    fn test_analysis_uses_mentioned_tickers() {
        assert_eq!(
            classify("analyze risk for MSFT and NVDA and MSFT"),
            Intent::Analysis(vec![ticker("MSFT"), ticker("NVDA")])
        );
    }

    #[test]
    fn test_analysis_falls_back_to_defaults() {
        assert_eq!(
            classify("Can I see the volatility of my portfolio"),
            Intent::Analysis(vec![ticker("AAPL"), ticker("GOOGL")])
        );
    }

    #[test]
    fn test_explain_queries() {
        let q = "Tell me about diversification";
        assert_eq!(classify(q), Intent::Explain(q.to_string()));
        assert!(matches!(classify("what is an ETF"), Intent::Explain(_)));
        assert!(matches!(classify("define beta"), Intent::Explain(_)));
    }

    #[test]
    fn test_unclassified_is_total() {
        for q in ["hi", "", "should I buy a house?", "🚀🚀🚀"] {
            assert_eq!(classify(q), Intent::Unclassified);
        }
    }

    #[test]
    fn test_rule_order_is_observable() {
        let classifier = IntentClassifier::default();
        assert_eq!(classifier.matching_rule("price of TSLA news"), Some("ticker"));
        assert_eq!(classifier.matching_rule("explain the news"), Some("news"));
        assert_eq!(classifier.matching_rule("explain risk"), Some("analysis"));
        assert_eq!(classifier.matching_rule("hello"), None);
    }
}
