use crate::models::{AssetChange, DaySignal, RebalanceSummary};

/// True when any strategic asset's scalar differs between the two days
///
/// Scalars come from a finite lookup table, so exact comparison is used.
pub fn needs_rebalance(yesterday: &[f64], today: &[f64]) -> bool {
    yesterday != today
}

/// Per-asset changes between yesterday's and today's allocations
pub fn summarize(yesterday: &DaySignal, today: &DaySignal) -> RebalanceSummary {
    let changes = today
        .assets
        .iter()
        .map(|t| {
            let before = yesterday.asset(&t.asset);
            let yesterday_weight = before.map(|y| y.weight).unwrap_or(0.0);
            AssetChange {
                asset: t.asset.clone(),
                scalar_changed: before.map(|y| y.scalar != t.scalar).unwrap_or(true),
                yesterday_weight,
                today_weight: t.weight,
                delta: t.weight - yesterday_weight,
            }
        })
        .collect();

    RebalanceSummary {
        needed: needs_rebalance(&yesterday.scalars(), &today.scalars()),
        changes,
        yesterday_cash: yesterday.cash,
        today_cash: today.cash,
        cash_delta: today.cash - yesterday.cash,
    }
}
