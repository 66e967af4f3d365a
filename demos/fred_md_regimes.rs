//! Example: Regime detection on a FRED-MD vintage
//!
//! Download a monthly vintage (e.g. `current.csv`) from the FRED-MD site,
//! then run with:
//!
//!   cargo run --example fred_md_regimes -- path/to/current.csv [config.json] [--rolling]
//!
//! FRED-MD contains missing values in early and late rows; trim them before
//! running, the loader rejects blank cells.

use colored::Colorize;
use macro_regime::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("macro_regime=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let rolling = args.iter().any(|a| a == "--rolling");
    let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let Some(csv_path) = paths.first() else {
        anyhow::bail!("usage: fred_md_regimes <fred-md.csv> [config.json] [--rolling]");
    };

    let config = match paths.get(1) {
        Some(path) => RegimeConfig::from_json_file(path)?,
        None => RegimeConfig::default(),
    };

    println!("{}", "=== FRED-MD Regime Detection ===".bold());
    let (panel, table) = load_fred_md(csv_path)?;
    println!(
        "Loaded {} months x {} variables",
        panel.n_months(),
        panel.n_variables()
    );

    let detector = RegimeDetector::new(config)?;
    let result = detector.detect(&panel, &table)?;
    result.print_summary();

    if let Some(current) = result.current() {
        println!(
            "\nCurrent month {}: most likely regime {}",
            current.month,
            current.most_likely().to_string().green().bold()
        );
    }

    for i in 0..result.n_regimes {
        if let Some(duration) = result.transitions.expected_duration(i) {
            println!("  Regime {} expected duration: {:.1} months", i, duration);
        }
    }

    if rolling {
        let window = 48;
        println!("\n{}", format!("Rolling {}-month windows:", window).bold());
        for w in detector.detect_rolling(&panel, &table, window)? {
            match &w.result {
                Ok(r) => {
                    let label = r.current().map(|d| d.most_likely()).unwrap_or(0);
                    println!(
                        "  {} .. {}  k={}  current regime {}",
                        w.start_month,
                        w.end_month,
                        r.chosen_k(),
                        label
                    );
                }
                Err(e) => println!("  {} .. {}  {}", w.start_month, w.end_month, e.to_string().red()),
            }
        }
    }

    Ok(())
}
