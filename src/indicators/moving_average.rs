/// Calculate Simple Moving Average (SMA) over the trailing `period` prices
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Trailing SMA for every index of `values`
///
/// Entry `i` averages `values[i + 1 - period..=i]` and is `None` until
/// `period` observations exist.
pub fn rolling_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| calculate_sma(&values[..=i], period))
        .collect()
}
