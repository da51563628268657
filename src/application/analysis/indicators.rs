//! Moving average and oscillator math over plain price slices.
//!
//! Both functions are total: short or empty inputs produce a defined
//! fallback instead of an error, so the signal rules never see NaN.

use ta::Next;
use ta::indicators::SimpleMovingAverage;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Neutral RSI returned when there is not enough data
pub const NEUTRAL_RSI: f64 = 50.0;

/// Arithmetic mean of the last `period` prices.
///
/// With fewer than `period` prices the most recent price is returned (a
/// single-point average); an empty slice yields 0.
pub fn sma(prices: &[f64], period: usize) -> f64 {
    let Some(&last) = prices.last() else {
        return 0.0;
    };
    if prices.len() < period {
        return last;
    }

    match SimpleMovingAverage::new(period) {
        Ok(mut indicator) => prices[prices.len() - period..]
            .iter()
            .fold(last, |_, price| indicator.next(*price)),
        // period == 0
        Err(_) => last,
    }
}

/// Relative strength index over the trailing `period` price changes.
///
/// Gains and losses are plain averages over the window (no Wilder
/// smoothing). Returns 100 when there were no losses and 50 when fewer than
/// `period + 1` prices are available.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let window = &prices[prices.len() - (period + 1)..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses - change)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sma_single_point_fallback() {
        assert_eq!(sma(&[100.0], 20), 100.0);
        assert_eq!(sma(&[90.0, 95.0, 101.5], 50), 101.5);
    }

    #[test]
    fn test_sma_full_window() {
        assert!(approx_eq(sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 5), 3.0));
        // Only the last `period` values count
        assert!(approx_eq(sma(&[100.0, 1.0, 2.0, 3.0], 3), 2.0));
    }

    #[test]
    fn test_sma_degenerate_inputs() {
        assert_eq!(sma(&[], 20), 0.0);
        assert_eq!(sma(&[4.0, 7.0], 0), 7.0);
    }

    #[test]
    fn test_rsi_no_losses_is_max() {
        let rising: Vec<f64> = (1..=15).map(|i| i as f64).collect();
        assert_eq!(rsi(&rising, DEFAULT_RSI_PERIOD), 100.0);
    }

    #[test]
    fn test_rsi_short_history_is_neutral() {
        let prices: Vec<f64> = (1..=14).map(|i| i as f64).collect();
        assert_eq!(rsi(&prices, DEFAULT_RSI_PERIOD), NEUTRAL_RSI);
        assert_eq!(rsi(&[], DEFAULT_RSI_PERIOD), NEUTRAL_RSI);
    }

    #[test]
    fn test_rsi_no_gains_is_zero() {
        let falling: Vec<f64> = (1..=15).rev().map(|i| i as f64).collect();
        assert!(approx_eq(rsi(&falling, DEFAULT_RSI_PERIOD), 0.0));
    }

    #[test]
    fn test_rsi_balanced_moves() {
        // Alternating +1 / -1 over 14 changes: equal gains and losses
        let prices: Vec<f64> = (0..15)
            .map(|i| if i % 2 == 0 { 10.0 } else { 11.0 })
            .collect();
        assert!(approx_eq(rsi(&prices, DEFAULT_RSI_PERIOD), 50.0));
    }

    #[test]
    fn test_rsi_uses_trailing_window_only() {
        // Early crash followed by 14 straight gains
        let mut prices = vec![100.0, 50.0, 10.0];
        prices.extend((1..=15).map(|i| 10.0 + i as f64));
        assert_eq!(rsi(&prices, DEFAULT_RSI_PERIOD), 100.0);
    }

    #[test]
    fn test_rsi_known_value() {
        // 14 changes: 10 gains of +2, 4 losses of -1 -> RS = 20/4 = 5
        let mut prices = vec![100.0];
        for i in 0..14 {
            let last = *prices.last().unwrap();
            prices.push(if i < 10 { last + 2.0 } else { last - 1.0 });
        }
        let expected = 100.0 - 100.0 / (1.0 + 5.0);
        assert!(approx_eq(rsi(&prices, DEFAULT_RSI_PERIOD), expected));
    }
}
