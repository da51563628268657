//! Ordered decision tables for signal and trend classification.
//!
//! Each table is evaluated top to bottom and the first matching rule wins,
//! so rule order is the tie-break. "Above" and "below" are strict.

use crate::domain::analysis::{Signal, SignalDecision, Trend};

pub const OVERBOUGHT_RSI: f64 = 70.0;
pub const OVERSOLD_RSI: f64 = 30.0;

/// 24h change (percent) needed for a strong trend
pub const STRONG_MOVE_PCT: f64 = 5.0;

/// Inputs shared by both tables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalInputs {
    pub price: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub rsi: f64,
    pub change_24h: f64,
}

impl SignalInputs {
    fn above_sma20(&self) -> bool {
        self.price > self.sma20
    }

    fn above_sma50(&self) -> bool {
        self.price > self.sma50
    }

    fn above_both(&self) -> bool {
        self.above_sma20() && self.above_sma50()
    }

    fn below_sma20(&self) -> bool {
        self.price < self.sma20
    }

    fn below_sma50(&self) -> bool {
        self.price < self.sma50
    }

    fn below_both(&self) -> bool {
        self.below_sma20() && self.below_sma50()
    }

    fn below_either(&self) -> bool {
        self.below_sma20() || self.below_sma50()
    }

    fn golden_alignment(&self) -> bool {
        self.sma20 > self.sma50
    }

    fn overbought(&self) -> bool {
        self.rsi > OVERBOUGHT_RSI
    }

    fn oversold(&self) -> bool {
        self.rsi < OVERSOLD_RSI
    }
}

/// A `(predicate, outcome)` row in a decision table
pub struct Rule<T> {
    pub name: &'static str,
    pub matches: fn(&SignalInputs) -> bool,
    pub outcome: T,
}

pub const SIGNAL_RULES: &[Rule<SignalDecision>] = &[
    Rule {
        name: "oversold_bounce",
        matches: |i| i.oversold() && i.above_both() && i.golden_alignment(),
        outcome: SignalDecision {
            signal: Signal::Long,
            reason: "oversold bounce in uptrend",
        },
    },
    Rule {
        name: "uptrend_momentum",
        matches: |i| i.above_both() && i.golden_alignment() && !i.overbought(),
        outcome: SignalDecision {
            signal: Signal::Long,
            reason: "strong uptrend momentum",
        },
    },
    Rule {
        name: "overbought_downtrend",
        matches: |i| i.overbought() && i.below_either(),
        outcome: SignalDecision {
            signal: Signal::Short,
            reason: "overbought in downtrend",
        },
    },
    Rule {
        name: "strong_downtrend",
        matches: |i| i.below_both() && !i.golden_alignment() && !i.oversold(),
        outcome: SignalDecision {
            signal: Signal::Short,
            reason: "strong downtrend",
        },
    },
];

pub const HOLD: SignalDecision = SignalDecision {
    signal: Signal::Hold,
    reason: "no clear signal",
};

pub const TREND_RULES: &[Rule<Trend>] = &[
    Rule {
        name: "strong_up",
        matches: |i| i.above_both() && i.golden_alignment() && i.change_24h > STRONG_MOVE_PCT,
        outcome: Trend::StrongUp,
    },
    Rule {
        name: "up",
        matches: |i| i.above_sma20() && i.golden_alignment(),
        outcome: Trend::Up,
    },
    Rule {
        name: "strong_down",
        matches: |i| i.below_both() && i.change_24h < -STRONG_MOVE_PCT,
        outcome: Trend::StrongDown,
    },
    Rule {
        name: "down",
        matches: |i| i.below_either(),
        outcome: Trend::Down,
    },
];

fn first_match<T: Copy>(rules: &[Rule<T>], inputs: &SignalInputs, fallback: T) -> T {
    rules
        .iter()
        .find(|rule| (rule.matches)(inputs))
        .map(|rule| rule.outcome)
        .unwrap_or(fallback)
}

pub fn classify_signal(
    price: f64,
    sma20: f64,
    sma50: f64,
    rsi: f64,
    change_24h: f64,
) -> SignalDecision {
    let inputs = SignalInputs {
        price,
        sma20,
        sma50,
        rsi,
        change_24h,
    };
    first_match(SIGNAL_RULES, &inputs, HOLD)
}

pub fn classify_trend(price: f64, sma20: f64, sma50: f64, change_24h: f64) -> Trend {
    let inputs = SignalInputs {
        price,
        sma20,
        sma50,
        rsi: 50.0,
        change_24h,
    };
    first_match(TREND_RULES, &inputs, Trend::Neutral)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_oversold_bounce() {
        let decision = classify_signal(110.0, 105.0, 100.0, 25.0, 2.0);
        assert_eq!(decision.signal, Signal::Long);
        assert_eq!(decision.reason, "oversold bounce in uptrend");
    }

    #[test]
    fn test_golden_overbought_in_downtrend() {
        let decision = classify_signal(90.0, 95.0, 100.0, 75.0, -1.0);
        assert_eq!(decision.signal, Signal::Short);
        assert_eq!(decision.reason, "overbought in downtrend");
    }

    #[test]
    fn test_golden_flat_market_holds() {
        let decision = classify_signal(100.0, 100.0, 100.0, 50.0, 0.0);
        assert_eq!(decision, HOLD);
        assert_eq!(classify_trend(100.0, 100.0, 100.0, 0.0), Trend::Neutral);
    }

    #[test]
    fn test_uptrend_momentum() {
        let decision = classify_signal(110.0, 105.0, 100.0, 55.0, 1.0);
        assert_eq!(decision.signal, Signal::Long);
        assert_eq!(decision.reason, "strong uptrend momentum");
    }

    #[test]
    fn test_overbought_uptrend_holds() {
        // Above both SMAs but RSI > 70: neither long rule nor short rule fits
        let decision = classify_signal(110.0, 105.0, 100.0, 80.0, 1.0);
        assert_eq!(decision, HOLD);
    }

    #[test]
    fn test_strong_downtrend() {
        let decision = classify_signal(90.0, 95.0, 100.0, 45.0, -2.0);
        assert_eq!(decision.signal, Signal::Short);
        assert_eq!(decision.reason, "strong downtrend");
    }

    #[test]
    fn test_oversold_downtrend_holds() {
        let decision = classify_signal(90.0, 95.0, 100.0, 20.0, -8.0);
        assert_eq!(decision, HOLD);
    }

    #[test]
    fn test_rule_order_breaks_ties() {
        // Matches both long rules; the first one wins
        let decision = classify_signal(120.0, 110.0, 100.0, 29.9, 0.0);
        assert_eq!(decision.reason, "oversold bounce in uptrend");
    }

    #[test]
    fn test_rsi_boundaries() {
        // rsi == 70 is not overbought
        assert_eq!(
            classify_signal(110.0, 105.0, 100.0, 70.0, 0.0).reason,
            "strong uptrend momentum"
        );
        // rsi == 30 is not oversold
        assert_eq!(
            classify_signal(90.0, 95.0, 100.0, 30.0, 0.0).reason,
            "strong downtrend"
        );
    }

    #[test]
    fn test_trend_table() {
        assert_eq!(classify_trend(110.0, 105.0, 100.0, 6.0), Trend::StrongUp);
        assert_eq!(classify_trend(110.0, 105.0, 100.0, 5.0), Trend::Up);
        // Small move above aligned SMAs
        assert_eq!(classify_trend(103.0, 102.0, 101.0, 0.0), Trend::Up);
        assert_eq!(classify_trend(90.0, 95.0, 100.0, -6.0), Trend::StrongDown);
        assert_eq!(classify_trend(90.0, 95.0, 100.0, -1.0), Trend::Down);
        // Below SMA50 only, without golden alignment
        assert_eq!(classify_trend(99.0, 98.0, 100.0, 0.0), Trend::Down);
        assert_eq!(classify_trend(100.0, 100.0, 100.0, 0.0), Trend::Neutral);
    }

    #[test]
    fn test_rule_names_unique() {
        let mut names: Vec<&str> = SIGNAL_RULES.iter().map(|r| r.name).collect();
        names.extend(TREND_RULES.iter().map(|r| r.name));
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }
}
