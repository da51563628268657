//! Plain-text rendering of analysis passes, meme coin boards and the coin list.
//!
//! Renderers return strings; the binary decides where they go.

use crate::application::meme_coins::MemeCoinSnapshot;
use crate::domain::analysis::{AnalysisResult, Signal};
use crate::domain::market::CoinInfo;
use std::fmt::Write;

const TABLE_WIDTH: usize = 110;

/// `$1,234.56` at or above 1000, `$1.2345` at or above 1, else 8 decimals.
pub fn format_price(price: f64) -> String {
    if price >= 1000.0 {
        format!("${}", group_thousands(&format!("{:.2}", price)))
    } else if price >= 1.0 {
        format!("${:.4}", price)
    } else {
        format!("${:.8}", price)
    }
}

/// Signed percentage with two decimals, e.g. `+2.45%`
pub fn format_change(change: f64) -> String {
    if change >= 0.0 {
        format!("+{:.2}%", change)
    } else {
        format!("{:.2}%", change)
    }
}

pub fn format_market_cap(market_cap: f64) -> String {
    if market_cap >= 1e9 {
        format!("${:.2}B", market_cap / 1e9)
    } else if market_cap >= 1e6 {
        format!("${:.2}M", market_cap / 1e6)
    } else {
        format!("${:.0}", market_cap)
    }
}

fn group_thousands(fixed: &str) -> String {
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed, ""));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalCounts {
    pub long: usize,
    pub short: usize,
    pub hold: usize,
}

pub fn signal_counts(results: &[AnalysisResult]) -> SignalCounts {
    results
        .iter()
        .fold(SignalCounts::default(), |mut counts, result| {
            match result.signal {
                Signal::Long => counts.long += 1,
                Signal::Short => counts.short += 1,
                Signal::Hold => counts.hold += 1,
            }
            counts
        })
}

pub fn render_analysis(results: &[AnalysisResult]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "No analysis results available.");
        return out;
    }

    let _ = writeln!(out, "{}", "=".repeat(TABLE_WIDTH));
    let _ = writeln!(
        out,
        "{:<12} | {:>16} | {:>8} | {:<6} | {:>6} | {:>16} | {:>16} | {:<11}",
        "Asset", "Price", "24h", "Signal", "RSI", "SMA20", "SMA50", "Trend"
    );
    let _ = writeln!(out, "{}", "-".repeat(TABLE_WIDTH));

    for result in results {
        let _ = writeln!(
            out,
            "{:<12} | {:>16} | {:>8} | {:<6} | {:>6.1} | {:>16} | {:>16} | {:<11}",
            result.name,
            format_price(result.price),
            format_change(result.price_change_24h),
            result.signal.to_string(),
            result.rsi,
            format_price(result.sma20),
            format_price(result.sma50),
            result.trend.to_string()
        );
        let _ = writeln!(out, "{:<12}   {}", "", result.signal_reason);
    }

    let counts = signal_counts(results);
    let _ = writeln!(out, "{}", "=".repeat(TABLE_WIDTH));
    let _ = writeln!(
        out,
        "Long: {}  Short: {}  Hold: {}",
        counts.long, counts.short, counts.hold
    );
    out
}

pub fn render_meme_coins(snapshot: &MemeCoinSnapshot) -> String {
    let mut out = String::new();
    if snapshot.using_fallback {
        let _ = writeln!(out, "Live data unavailable, showing last known snapshot.");
    }
    let _ = writeln!(
        out,
        "{:>4} | {:<14} | {:<6} | {:>16} | {:>8} | {:>10}",
        "Rank", "Name", "Symbol", "Price", "24h", "Mkt Cap"
    );
    let _ = writeln!(out, "{}", "-".repeat(74));

    for coin in &snapshot.coins {
        let rank = coin
            .market_cap_rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>4} | {:<14} | {:<6} | {:>16} | {:>8} | {:>10}",
            rank,
            coin.name,
            coin.symbol.to_uppercase(),
            format_price(coin.current_price),
            format_change(coin.price_change_percentage_24h),
            format_market_cap(coin.market_cap)
        );
    }
    out
}

pub fn render_coin_list(coins: &[CoinInfo]) -> String {
    coins
        .iter()
        .map(|coin| format!("{:<6} {:<14} {}\n", coin.symbol, coin.name, coin.id))
        .collect()
}
