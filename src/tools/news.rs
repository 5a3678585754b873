//! Headline feed
//!
//! Static headline sets keyed by topic. Company topics win over the general
//! market set; anything unrecognised gets the default set.

use super::NewsProvider;
use crate::Result;
use tracing::debug;

const MARKET_HEADLINES: &[&str] = &[
    "Global markets show mixed signals as inflation concerns persist.",
    "Tech stocks lead rally; S&P 500 hits new high.",
    "Oil prices surge amidst geopolitical tensions.",
    "Central banks hint at potential interest rate changes.",
];

const COMPANY_HEADLINES: &[(&str, &[&str])] = &[
    (
        "aapl",
        &[
            "Apple announces record quarterly earnings, driven by iPhone sales.",
            "Analysts raise price targets for AAPL after new product unveiling.",
            "Apple faces antitrust scrutiny in Europe.",
        ],
    ),
    (
        "googl",
        &[
            "Google invests heavily in AI research and development.",
            "Alphabet beats revenue estimates, cloud growth impresses.",
            "Google's ad business shows resilience despite market slowdown.",
        ],
    ),
    (
        "msft",
        &[
            "Microsoft expands cloud services, invests in AI partnerships.",
            "Windows 12 rumors surface ahead of major Microsoft event.",
            "Microsoft acquires leading gaming studio for undisclosed sum.",
        ],
    ),
];

const DEFAULT_HEADLINES: &[&str] = &[
    "Top financial analysts share their 2024 predictions.",
    "Understanding the basics of personal finance and investment.",
    "Cryptocurrency market experiences high volatility.",
    "Real estate market trends: What to expect next quarter.",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlineFeed;

impl HeadlineFeed {
    pub fn new() -> Self {
        Self
    }

    fn select(topic: &str) -> &'static [&'static str] {
        let topic = topic.to_lowercase();

        if let Some((_, headlines)) = COMPANY_HEADLINES
            .iter()
            .find(|(ticker, _)| topic.contains(ticker))
        {
            return headlines;
        }

        if topic.contains("market") {
            MARKET_HEADLINES
        } else {
            DEFAULT_HEADLINES
        }
    }
}

#[async_trait::async_trait]
impl NewsProvider for HeadlineFeed {
    async fn headlines(&self, topic: &str) -> Result<Vec<String>> {
        debug!(topic, "Looking up headlines");
        Ok(Self::select(topic).iter().map(|h| h.to_string()).collect())
    }
}
