//! Response Composer
//!
//! Formats collaborator outputs into the final user-facing text. All
//! fallback wording lives here so every path says "could not retrieve" the
//! same way.

use crate::models::{
    join_tickers, AnalysisReport, CompositeResponse, DailySeries, Quote, TickerAnalysis, TickerSymbol,
};

/// Number of most recent closes used for the performance window.
pub const PERFORMANCE_WINDOW: usize = 7;

pub const LOW_CONFIDENCE_HEADER: &str =
    "I couldn't find very specific info, but here's what I know:";
pub const GROUNDED_HEADER: &str = "📘 Here's what I found:";
pub const NEWS_HEADER: &str = "📰 Latest News:";
pub const NEWS_UNAVAILABLE: &str = "⚠️ Could not retrieve financial news at this time.";

pub fn quote_summary(ticker: &TickerSymbol, quote: &Quote) -> String {
    format!(
        "📈 {} Stock Quote:\nOpen: {}\nHigh: {}\nLow: {}\nPrice: {}\nVolume: {}\nLast Trading Day: {}",
        ticker, quote.open, quote.high, quote.low, quote.price, quote.volume, quote.latest_trading_day
    )
}

pub fn quote_unavailable(ticker: &TickerSymbol) -> String {
    format!("⚠️ Could not retrieve live quote for {}.", ticker)
}

/// `(first - last) / last * 100` over the given closes, newest first.
/// `None` with fewer than two closes or a zero base; callers then report the
/// latest close without a change figure.
pub fn percentage_change(closes: &[f64]) -> Option<f64> {
    if closes.len() < 2 {
        return None;
    }
    let first = closes[0];
    let last = closes[closes.len() - 1];
    if last == 0.0 {
        return None;
    }
    Some((first - last) / last * 100.0)
}

pub fn historical_summary(ticker: &TickerSymbol, series: &DailySeries) -> String {
    let Some(latest) = series.latest() else {
        return historical_unavailable(ticker);
    };

    let closes = series.recent_closes(PERFORMANCE_WINDOW);
    match percentage_change(&closes) {
        Some(change) => format!(
            "Historical performance for {}: Latest close on {} was {:.2}. Over the last {} days, it changed by {:.2}%.",
            ticker,
            latest.date,
            latest.close,
            closes.len(),
            change
        ),
        None => format!(
            "Latest close for {} on {} was {:.2}.",
            ticker, latest.date, latest.close
        ),
    }
}

pub fn historical_unavailable(ticker: &TickerSymbol) -> String {
    format!("⚠️ Could not retrieve historical data for {}.", ticker)
}

pub fn news_digest(headlines: &[String]) -> String {
    if headlines.is_empty() {
        return NEWS_UNAVAILABLE.to_string();
    }
    let mut response = CompositeResponse::with_header(NEWS_HEADER);
    response.extend(headlines.iter().map(|h| format!("- {}", h)));
    response.join("\n")
}

pub fn analysis_summary(tickers: &[TickerSymbol], report: &AnalysisReport) -> String {
    let mut response =
        CompositeResponse::with_header(format!("📊 Financial Analysis for {}:", join_tickers(tickers)));

    for (ticker, analysis) in &report.entries {
        let line = match analysis {
            TickerAnalysis::Metrics(m) => format!(
                "- {}: Average Daily Returns: {:.2}%, Annualized Volatility: {:.2}%, Risk Assessment: {}",
                ticker, m.average_daily_return_pct, m.annualized_volatility_pct, m.risk
            ),
            TickerAnalysis::InsufficientData => {
                format!("- {}: Insufficient data for analysis.", ticker)
            }
        };
        response.push(line);
    }

    response.join("\n")
}

pub fn analysis_unavailable(tickers: &[TickerSymbol]) -> String {
    format!("⚠️ Could not retrieve analysis for {}.", join_tickers(tickers))
}

pub fn grounded_prompt(context: &str, query: &str) -> String {
    format!("Explain this based on context:\n\n{}\n\nUser asked: {}", context, query)
}

pub fn open_prompt(query: &str) -> String {
    format!("Explain this concept: {}", query)
}

pub fn grounded_answer(answer: &str) -> String {
    format!("{}\n\n{}", GROUNDED_HEADER, answer)
}

pub fn fallback_answer(answer: &str) -> String {
    format!("{}\n\n{}", LOW_CONFIDENCE_HEADER, answer)
}

pub fn assistant_prompt(query: &str) -> String {
    format!("User asked: {}. Please respond as a financial assistant.", query)
}

pub fn brief_quote_line(ticker: &TickerSymbol, quote: &Quote) -> String {
    format!("{}: ${} (Change: {})", ticker, quote.price, quote.change)
}

pub fn brief_quote_unavailable(ticker: &TickerSymbol) -> String {
    format!("{}: Quote unavailable.", ticker)
}

pub fn brief_news_block(headlines: &[String], limit: usize) -> Vec<String> {
    if headlines.is_empty() {
        return Vec::new();
    }
    std::iter::once("\n🗞️ News:".to_string())
        .chain(headlines.iter().take(limit).map(|h| format!("- {}", h)))
        .collect()
}

pub fn brief_prompt(brief: CompositeResponse) -> String {
    format!("Summarize this market brief:\n{}", brief.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyClose, RiskLevel, TickerMetrics};
    use chrono::NaiveDate;

    fn ticker(t: &str) -> TickerSymbol {
        TickerSymbol::parse(t).unwrap()
    }

    fn series(closes: &[f64]) -> DailySeries {
        // closes given newest first
        let newest = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        DailySeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, close)| DailyClose {
                    date: newest - chrono::Duration::days(i as i64),
                    close: *close,
                })
                .collect(),
        )
    }

    #[test]
    fn test_quote_summary_field_order() {
        let quote = Quote {
            open: "1".into(),
            high: "2".into(),
            low: "3".into(),
            price: "4".into(),
            volume: "5".into(),
            latest_trading_day: "2024-05-10".into(),
            change: "0.5".into(),
        };
        let text = quote_summary(&ticker("TSLA"), &quote);
        assert!(text.starts_with("📈 TSLA Stock Quote:"));
        let labels: Vec<&str> = text.lines().skip(1).map(|l| l.split(':').next().unwrap()).collect();
        assert_eq!(labels, vec!["Open", "High", "Low", "Price", "Volume", "Last Trading Day"]);
    }

    #[test]
    fn test_percentage_change_formula() {
        assert_eq!(percentage_change(&[110.0, 100.0]), Some(10.0));
        assert_eq!(percentage_change(&[90.0, 95.0, 100.0]), Some(-10.0));
        assert_eq!(percentage_change(&[100.0]), None);
        assert_eq!(percentage_change(&[]), None);
        assert_eq!(percentage_change(&[5.0, 0.0]), None);
    }

    #[test]
    fn test_historical_uses_seven_point_window() {
        // Ten closes; only the newest seven count: (120 - 100) / 100.
        let s = series(&[120.0, 119.0, 118.0, 117.0, 116.0, 115.0, 100.0, 50.0, 40.0, 30.0]);
        let text = historical_summary(&ticker("AAPL"), &s);
        assert!(text.contains("Latest close on 2024-05-31 was 120.00"));
        assert!(text.contains("Over the last 7 days, it changed by 20.00%"));
    }

    #[test]
    fn test_historical_short_series() {
        let two = historical_summary(&ticker("AAPL"), &series(&[99.0, 100.0]));
        assert!(two.contains("Over the last 2 days, it changed by -1.00%"));

        let one = historical_summary(&ticker("AAPL"), &series(&[42.5]));
        assert_eq!(one, "Latest close for AAPL on 2024-05-31 was 42.50.");
        assert!(!one.contains('%'));
    }

    #[test]
    fn test_historical_zero_base_reports_latest_close_only() {
        let text = historical_summary(&ticker("AAPL"), &series(&[12.0, 0.0]));
        assert_eq!(text, "Latest close for AAPL on 2024-05-31 was 12.00.");
    }

    #[test]
    fn test_news_digest() {
        let headlines = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let text = news_digest(&headlines);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], NEWS_HEADER);
        assert_eq!(lines.len(), 4);
        assert!(lines[1..].iter().all(|l| l.starts_with("- ")));

        assert_eq!(news_digest(&[]), NEWS_UNAVAILABLE);
    }

    #[test]
    fn test_analysis_summary() {
        let report = AnalysisReport {
            entries: vec![
                (
                    ticker("AAPL"),
                    TickerAnalysis::Metrics(TickerMetrics {
                        average_daily_return_pct: 1.0947,
                        annualized_volatility_pct: 28.384,
                        risk: RiskLevel::Medium,
                    }),
                ),
                (ticker("ZZZ"), TickerAnalysis::InsufficientData),
            ],
        };
        let text = analysis_summary(&[ticker("AAPL"), ticker("ZZZ")], &report);
        assert!(text.starts_with("📊 Financial Analysis for AAPL, ZZZ:"));
        assert!(text.contains("AAPL: Average Daily Returns: 1.09%, Annualized Volatility: 28.38%, Risk Assessment: Medium Risk"));
        assert!(text.contains("ZZZ: Insufficient data for analysis."));
    }

    #[test]
    fn test_brief_news_block_caps_headlines() {
        let headlines: Vec<String> = (1..=5).map(|i| format!("h{}", i)).collect();
        let block = brief_news_block(&headlines, 3);
        assert_eq!(block.len(), 4);
        assert_eq!(block[3], "- h3");
        assert!(brief_news_block(&[], 3).is_empty());
    }
}
