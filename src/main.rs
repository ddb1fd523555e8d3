//! sn-fatigue: CLI entry point.
//!
//! Fits, compares and reports on S-N fatigue data files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use tracing::Level;

use sn_fatigue::engine::Engine;
use sn_fatigue::loader::parse_delimiter;
use sn_fatigue::report::{
    format_analysis, format_comparison, render_report, DecimalStyle, ReportPayload,
};
use sn_fatigue::settings::{load_settings, Settings};
use sn_fatigue::types::{ComparisonResult, Constraint, DataSet, Slot};

#[derive(Parser)]
#[command(name = "sn-fatigue")]
#[command(about = "Statistical analysis of S-N fatigue test data")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    shared: SharedOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SharedOptions {
    /// YAML settings file. Flags given on the command line take priority.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Field delimiter in data files: a character, '\t', or 'tab'.
    #[arg(long, global = true, value_parser = parse_delimiter)]
    delimiter: Option<char>,

    /// Runout marker: '*', '^' or '&'.
    #[arg(long, global = true)]
    runout: Option<char>,

    /// Number of header lines before the data.
    #[arg(long, global = true)]
    header_lines: Option<usize>,

    /// Confidence level for intervals and tests, e.g. 0.95.
    #[arg(long, global = true)]
    confidence: Option<f64>,

    /// Fix the slope instead of estimating it (3 and -3 are equivalent).
    #[arg(long, global = true, allow_negative_numbers = true)]
    slope: Option<f64>,

    /// Increase log output (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Fit an S-N curve to one data file, or to two.
    Analyze {
        file: PathBuf,

        /// Second data file, loaded into slot 1.
        #[arg(long)]
        second: Option<PathBuf>,

        /// Fit both files as one population.
        #[arg(long, requires = "second")]
        merge: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Test whether two data sets can be treated as one population.
    Compare {
        file_a: PathBuf,
        file_b: PathBuf,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the full analysis report for one data file.
    Report {
        file: PathBuf,

        /// Also write the templating payload as JSON to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Decimal separator in the payload: point or comma.
        #[arg(long)]
        decimal: Option<DecimalStyle>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.shared.verbose);

    let settings = resolve_settings(&cli.shared)?;

    match cli.command {
        Command::Analyze {
            file,
            second,
            merge,
            json,
        } => run_analyze(&settings, &file, second.as_deref(), merge, json),
        Command::Compare {
            file_a,
            file_b,
            json,
        } => run_compare(&settings, &file_a, &file_b, json),
        Command::Report {
            file,
            output,
            decimal,
        } => run_report(
            &settings,
            &file,
            output.as_deref(),
            decimal.unwrap_or(settings.decimal),
        ),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Settings file first, then command-line overrides.
fn resolve_settings(shared: &SharedOptions) -> anyhow::Result<Settings> {
    let mut settings = match &shared.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            load_settings(&content)
                .with_context(|| format!("Invalid settings file {}", path.display()))?
        }
        None => Settings::default(),
    };

    if let Some(delimiter) = shared.delimiter {
        settings.loader.delimiter = delimiter;
    }
    if let Some(marker) = shared.runout {
        settings.loader.runout_marker = marker;
    }
    if let Some(header_lines) = shared.header_lines {
        settings.loader.header_lines = header_lines;
    }
    if let Some(confidence) = shared.confidence {
        settings.confidence = confidence;
    }
    if shared.slope.is_some() {
        settings.slope = shared.slope;
    }
    Ok(settings)
}

fn engine_for(settings: &Settings, files: &[(&Path, Slot)]) -> anyhow::Result<Engine> {
    let mut engine = Engine::new(settings.engine_settings())?;
    for &(path, slot) in files {
        engine
            .load(path, slot, &settings.loader)
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }
    Ok(engine)
}

fn label_of(engine: &Engine, slot: Slot) -> String {
    engine
        .dataset(slot)
        .map_or_else(|| slot.to_string(), DataSet::label)
}

fn run_analyze(
    settings: &Settings,
    file: &Path,
    second: Option<&Path>,
    merge: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut files = vec![(file, Slot::First)];
    if let Some(path) = second {
        files.push((path, Slot::Second));
    }
    let mut engine = engine_for(settings, &files)?;
    engine.set_merge(merge);

    let mut analyses = Vec::new();
    if merge {
        let label = format!(
            "{} + {}",
            label_of(&engine, Slot::First),
            label_of(&engine, Slot::Second)
        );
        analyses.push((label, engine.fit(Slot::First, Constraint::Free)?));
    } else {
        for &(_, slot) in &files {
            analyses.push((label_of(&engine, slot), engine.fit(slot, Constraint::Free)?));
        }
    }

    if json {
        let output: Vec<_> = analyses
            .iter()
            .map(|(label, result)| serde_json::json!({ "label": label, "result": result }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "sn-fatigue analysis".bold());
    if let Some(slope) = engine.settings().regression_slope() {
        println!("  Slope fixed at {slope}");
    }
    for (label, result) in &analyses {
        println!();
        let mut lines = format_analysis(label, result).into_iter();
        if let Some(title) = lines.next() {
            println!("{}", title.cyan());
        }
        for line in lines {
            println!("{line}");
        }
    }
    Ok(())
}

fn run_compare(settings: &Settings, file_a: &Path, file_b: &Path, json: bool) -> anyhow::Result<()> {
    let engine = engine_for(settings, &[(file_a, Slot::First), (file_b, Slot::Second)])?;
    let result = engine.compare(Slot::First, Slot::Second)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let name_a = label_of(&engine, Slot::First);
    let name_b = label_of(&engine, Slot::Second);
    let lines = format_comparison(&name_a, &name_b, &result);
    println!("{}", lines[0].bold());
    print_comparison(&result);

    println!();
    if result.mergeable() {
        println!("  {}", "Data sets may be merged".green());
    } else {
        println!("  {}", "Data sets should not be merged".red());
    }
    Ok(())
}

fn print_comparison(result: &ComparisonResult) {
    let checks = [
        (
            "Equal variances",
            result.variances_equal,
            format!(
                "ratio {:.4} in [{:.4}, {:.4}]",
                result.variance_ratio, result.variance_bounds.0, result.variance_bounds.1
            ),
        ),
        (
            "Parallel curves",
            result.curves_parallel,
            format!(
                "statistic {:.4} vs critical {:.4}",
                result.parallel_statistic, result.parallel_critical
            ),
        ),
        (
            "Coincident curves",
            result.curves_coincident,
            format!(
                "statistic {:.4} vs critical {:.4}",
                result.coincident_statistic, result.coincident_critical
            ),
        ),
    ];
    for (name, accepted, detail) in checks {
        if accepted {
            println!("  {} {name}: {}", "✓".green(), detail.dimmed());
        } else {
            println!("  {} {name}: {}", "✗".red(), detail.dimmed());
        }
    }
}

fn run_report(
    settings: &Settings,
    file: &Path,
    output: Option<&Path>,
    decimal: DecimalStyle,
) -> anyhow::Result<()> {
    let engine = engine_for(settings, &[(file, Slot::First)])?;
    let data = engine.active_data(Slot::First, false)?;
    let result = engine.fit(Slot::First, Constraint::Free)?;

    print!("{}", render_report(&label_of(&engine, Slot::First), &result, &data));

    if let Some(path) = output {
        let payload = ReportPayload::new(&result, &data, decimal).to_json()?;
        fs::write(path, payload)
            .with_context(|| format!("Failed to write report payload {}", path.display()))?;
        eprintln!("{} {}", "Payload written to".green(), path.display());
    }
    Ok(())
}
