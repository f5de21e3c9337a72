use anyhow::Context;
use clap::Parser;
use hysteresis_taa::data::{load_csv, PriceValidator};
use hysteresis_taa::models::{BondMode, SignalResult, WindowTransition};
use hysteresis_taa::settings::{self, StrategySettings};
use hysteresis_taa::strategy::compute_signals;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// Deltas smaller than this print as "hold"
const DISPLAY_TOLERANCE: f64 = 0.0001;

/// Daily hysteresis-banded allocation signal
#[derive(Debug, Parser)]
#[command(name = "taa-signal", version, about)]
struct Cli {
    /// Wide CSV of closing prices: a `date` column, then one column per instrument
    #[arg(long, env = "TAA_PRICES")]
    prices: PathBuf,

    /// TOML settings file (defaults apply to anything it leaves out)
    #[arg(long, env = "TAA_CONFIG")]
    config: Option<PathBuf>,

    /// Override the tactical bond mode (price-splice or real-asset)
    #[arg(long)]
    mode: Option<BondMode>,

    /// Only use the most recent N rows of the price file
    #[arg(long)]
    tail: Option<usize>,

    /// Print the full result as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let mut settings = settings::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        settings.tactical_bond.mode = mode;
    }

    let (mut table, report) = load_csv(&cli.prices)?;
    tracing::info!(
        "Loaded {} rows ({} leading rows dropped, {} cells forward-filled)",
        table.len(),
        report.leading_rows_dropped,
        report.cells_filled
    );
    if let Some(rows) = cli.tail {
        table = table.tail(rows);
    }

    PriceValidator::new()
        .allow_signed(settings.tactical_bond.rate_instrument.clone())
        .validate(&table)
        .context("Price table failed validation")?;

    let result = compute_signals(&table, &settings).context("Failed to compute signals")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result, &settings);
    }

    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hysteresis_taa=info,taa_signal=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Report
// ============================================================================

fn print_report(result: &SignalResult, settings: &StrategySettings) {
    let today = &result.today;
    let bond = &settings.tactical_bond;

    println!("Adaptive Hysteresis TAA ({})", result.mode);
    println!("Close of {}", today.date.format("%Y-%m-%d %A"));
    println!("{}", "=".repeat(36));

    if result.needs_rebalance() {
        println!("REBALANCE: trade required");
        println!("(signal change moved today's target weights)");
    } else {
        println!("REBALANCE: no trade");
        println!("(every scalar matches yesterday)");
    }

    println!("\n[1] Target weights");
    for asset in &today.assets {
        let marker = change_marker(result, &asset.asset);
        if asset.asset == bond.asset {
            for leg in [&bond.rising_instrument, &bond.falling_instrument] {
                if *leg == today.bond_instrument {
                    println!(" {} {} (bond): {:.1}%", marker, leg, asset.weight * 100.0);
                } else {
                    println!(" * {} (bond): 0.0%", leg);
                }
            }
        } else {
            println!(" {} {}: {:.1}%", marker, asset.asset, asset.weight * 100.0);
        }
    }
    let cash_marker = if result.rebalance.cash_delta != 0.0 { "->" } else { "*" };
    println!(" {} Cash: {:.1}%", cash_marker, today.cash * 100.0);

    println!("\n[2] Weight changes");
    println!("{:<6} {:>8} {:>8}  {:>10}", "Asset", "Before", "After", "Change");
    println!("{}", "-".repeat(36));
    for change in &result.rebalance.changes {
        let label = if change.asset == bond.asset {
            today.bond_instrument.as_str()
        } else {
            change.asset.as_str()
        };
        print_change_row(label, change.yesterday_weight, change.today_weight);
    }
    print_change_row("Cash", result.rebalance.yesterday_cash, result.rebalance.today_cash);

    println!("\n[3] Market");
    for quote in &result.market {
        match quote.change {
            Some(change) => println!(
                "  {}: {:.2} ({:+.2}%)",
                quote.instrument,
                quote.close,
                change * 100.0
            ),
            None => println!("  {}: {:.2}", quote.instrument, quote.close),
        }
    }
    if let Some(bond_return) = result.bond_return {
        println!(
            "  {} via {}: {:+.2}%",
            bond.asset,
            today.bond_instrument,
            bond_return * 100.0
        );
    }

    println!(
        "\n[4] Band signals (+/- {:.1}% envelope)",
        settings.band_fraction * 100.0
    );
    for asset in &today.assets {
        let backing = if asset.instrument == asset.asset {
            String::new()
        } else {
            format!(" -> {}", asset.instrument)
        };
        println!(
            "\n{}{} ({}/{} ON, scalar {:.2})",
            asset.asset,
            backing,
            asset.score,
            asset.windows.len(),
            asset.scalar
        );

        let transitions = result.transitions(&asset.asset);
        for (window, (_, transition)) in asset.windows.iter().zip(transitions) {
            let disparity = window
                .disparity
                .map(|d| format!("{:+.1}%", d * 100.0))
                .unwrap_or_else(|| "n/a".to_string());
            let label = match transition {
                WindowTransition::NewOn => "[new ON]",
                WindowTransition::NewOff => "[new OFF]",
                WindowTransition::Unchanged => "[held]",
            };
            println!(
                "  {:>4}d: {:<3} (disparity {}) {}",
                window.window, window.state, disparity, label
            );
        }
    }
}

fn change_marker(result: &SignalResult, asset: &str) -> &'static str {
    let changed = result
        .rebalance
        .changes
        .iter()
        .any(|c| c.asset == asset && c.scalar_changed);
    if changed {
        "->"
    } else {
        "*"
    }
}

fn print_change_row(label: &str, before: f64, after: f64) {
    let delta = after - before;
    let change = if delta.abs() < DISPLAY_TOLERANCE {
        "(hold)".to_string()
    } else {
        format!("{:+.1}%", delta * 100.0)
    };
    println!(
        "{:<6} {:>7.1}% {:>7.1}%  {:>10}",
        label,
        before * 100.0,
        after * 100.0,
        change
    );
}
