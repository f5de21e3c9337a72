use hysteresis_taa::data::{MarketScenario, SyntheticPriceGenerator};
use hysteresis_taa::models::{BondMode, SignalResult};
use hysteresis_taa::{compute_signals, Result, StrategySettings};

const DAYS: usize = 400;
const SEED: u64 = 42;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("hysteresis_taa=warn")
        .init();

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║          HYSTERESIS TAA SIGNAL DEMO                   ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    let scenarios = [
        (MarketScenario::Uptrend, "Uptrend"),
        (MarketScenario::Downtrend, "Downtrend"),
        (MarketScenario::Sideways, "Sideways (mean-reverting)"),
        (MarketScenario::Volatile, "Volatile (±3% swings)"),
        (MarketScenario::RateFlip, "Rate flip (up, then down)"),
    ];

    let mut results = Vec::new();
    for (scenario, name) in scenarios {
        let table = SyntheticPriceGenerator::new(SEED).generate(scenario, DAYS)?;

        for mode in [BondMode::PriceSplice, BondMode::RealAsset] {
            let mut settings = StrategySettings::default();
            settings.tactical_bond.mode = mode;

            match compute_signals(&table, &settings) {
                Ok(result) => results.push((name, result)),
                Err(e) => eprintln!("Signal failed for {} ({}): {}", name, mode, e),
            }
        }
    }

    print_comparison(&results);

    Ok(())
}

fn print_comparison(results: &[(&str, SignalResult)]) {
    println!(
        "\n{:<28} {:<13} {:>6} {:>6} {:>10} {:>7} {:>10}",
        "Scenario", "Mode", "QQQ", "GLD", "Bond", "Cash", "Rebalance"
    );
    println!("{}", "─".repeat(86));

    for (name, result) in results {
        let today = &result.today;
        let weight = |asset: &str| today.asset(asset).map(|a| a.weight).unwrap_or(0.0);
        let bond = weight(&StrategySettings::default().tactical_bond.asset);

        println!(
            "{:<28} {:<13} {:>5.1}% {:>5.1}% {:>4} {:>4.1}% {:>6.1}% {:>10}",
            name,
            result.mode.to_string(),
            weight("QQQ") * 100.0,
            weight("GLD") * 100.0,
            today.bond_instrument,
            bond * 100.0,
            today.cash * 100.0,
            if result.needs_rebalance() { "yes" } else { "no" }
        );
    }

    println!("\n═══════════════════════════════════════════════════════\n");
}
