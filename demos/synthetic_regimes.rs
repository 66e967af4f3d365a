//! Example: Regime detection on a synthetic macro panel
//!
//! Builds a panel with an expansion/slowdown cycle and two crisis episodes,
//! classifies every month and prints the regime distributions.
//!
//! Run with: cargo run --example synthetic_regimes

use chrono::{Months, NaiveDate};
use colored::Colorize;
use macro_regime::prelude::*;
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing_subscriber::EnvFilter;

const N_MONTHS: usize = 240;

fn synthetic_panel() -> anyhow::Result<(MacroPanel, TransformTable)> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let noise = Normal::new(0.0, 1.0)?;

    let names = ["INDPRO", "PAYEMS", "UNRATE", "CPIAUCSL", "FEDFUNDS", "UMCSENT"];
    let mut values = Array2::zeros((N_MONTHS, names.len()));

    let mut indpro = 100.0;
    let mut payems = 130_000.0;
    let mut cpi = 200.0;

    for t in 0..N_MONTHS {
        let crisis = (60..72).contains(&t) || (170..178).contains(&t);
        // Slow sine cycle between expansion and slowdown
        let cycle = (t as f64 * std::f64::consts::TAU / 84.0).sin();

        let growth = if crisis { -0.012 } else { 0.002 + 0.002 * cycle };
        let jobs = if crisis { -0.004 } else { 0.0012 + 0.0008 * cycle };
        let unrate = if crisis { 9.0 } else { 5.0 - 1.0 * cycle };
        let inflation = if crisis { 0.0005 } else { 0.002 + 0.001 * cycle };
        let rate = if crisis { 0.5 } else { 3.0 + 1.5 * cycle };
        let sentiment = if crisis { 60.0 } else { 88.0 + 6.0 * cycle };

        indpro *= 1.0 + growth + 0.002 * noise.sample(&mut rng);
        payems *= 1.0 + jobs + 0.0005 * noise.sample(&mut rng);
        cpi *= 1.0 + inflation + 0.0007 * noise.sample(&mut rng);

        values[[t, 0]] = indpro;
        values[[t, 1]] = payems;
        values[[t, 2]] = unrate + 0.2 * noise.sample(&mut rng);
        values[[t, 3]] = cpi;
        values[[t, 4]] = rate + 0.15 * noise.sample(&mut rng);
        values[[t, 5]] = sentiment + 2.0 * noise.sample(&mut rng);
    }

    let start = NaiveDate::from_ymd_opt(2000, 1, 1).ok_or_else(|| anyhow::anyhow!("bad start"))?;
    let months = (0..N_MONTHS)
        .map(|i| {
            start
                .checked_add_months(Months::new(i as u32))
                .ok_or_else(|| anyhow::anyhow!("month overflow"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let panel = MacroPanel::new(months, names.iter().map(|s| s.to_string()).collect(), values)?;

    let table: TransformTable = [
        ("INDPRO", TransformCode::LogDiff),
        ("PAYEMS", TransformCode::LogDiff),
        ("UNRATE", TransformCode::Diff),
        ("CPIAUCSL", TransformCode::SecondLogDiff),
        ("FEDFUNDS", TransformCode::Diff),
        ("UMCSENT", TransformCode::Level),
    ]
    .into_iter()
    .map(|(name, code)| (name.to_string(), code))
    .collect();

    Ok((panel, table))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("macro_regime=info".parse()?),
        )
        .init();

    println!("{}", "=== Synthetic Macro Regime Detection ===".bold());

    let (panel, table) = synthetic_panel()?;
    println!(
        "Panel: {} months x {} variables ({} to {})",
        panel.n_months(),
        panel.n_variables(),
        panel.months()[0],
        panel.months()[panel.n_months() - 1]
    );

    let detector = RegimeDetector::new(RegimeConfig::default())?;
    let result = detector.detect(&panel, &table)?;
    result.print_summary();

    println!("\n{}", "Regime 0 months:".bold());
    for &i in &result.outliers.regime0_indices {
        let p0 = result.distributions[i].probability(0);
        println!("  {}  P(Regime 0) = {}", result.months[i], format!("{:.3}", p0).red());
    }

    println!("\n{}", "Last 6 months:".bold());
    for d in result.distributions.iter().rev().take(6).rev() {
        let probs: Vec<String> = d.probabilities.iter().map(|p| format!("{:.2}", p)).collect();
        println!(
            "  {}  regime {}  [{}]",
            d.month,
            d.most_likely().to_string().green(),
            probs.join(", ")
        );
    }

    let next = result.next_month_distribution()?;
    println!("\n{}", "Naive next-month forecast:".bold());
    for (i, p) in next.iter().enumerate() {
        let bar = "█".repeat((p * 40.0) as usize);
        println!("  Regime {}: {:5.1}% {}", i, p * 100.0, bar.cyan());
    }

    println!("\n{}", "Profiles:".bold());
    for profile in &result.profiles {
        print!("{}", profile);
    }

    let json = serde_json::to_string_pretty(&result.transitions)?;
    println!("\n{}\n{}", "Transition matrix (JSON):".bold(), json);

    Ok(())
}
