use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use priceaudit::analysis::{overview, GroupStatistics};
use priceaudit::config::{AuditConfig, LoggingConfig};
use priceaudit::records::loader::load_csv_file;
use priceaudit::reference::{compare, ReferenceTable};
use priceaudit::{report, AuditEngine, FilterCriteria, PriceBasis, ThresholdRule};

#[derive(Parser)]
#[command(
    name = "priceaudit",
    about = "Procurement price anomaly detection for audit review",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $PRICEAUDIT_CONFIG, then ./priceaudit.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Purchase export (CSV)
    #[arg(long, short)]
    input: PathBuf,

    /// JSON output for machine parsing
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank unstable SKU/location groups and list their outlier purchases
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Restrict to these SKUs (repeatable)
        #[arg(long)]
        sku: Vec<String>,

        /// Restrict to these locations (repeatable)
        #[arg(long)]
        location: Vec<String>,

        /// Restrict to these suppliers (repeatable)
        #[arg(long)]
        supplier: Vec<String>,

        /// Restrict to these merchandise groups (repeatable)
        #[arg(long)]
        group: Vec<String>,

        /// Restrict to these group descriptions (repeatable)
        #[arg(long)]
        group_description: Vec<String>,

        /// First document date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last document date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Keep only purchases of groups that are suspect in the full dataset
        #[arg(long)]
        suspects_only: bool,

        /// Number of ranked groups to show
        #[arg(long)]
        top: Option<usize>,

        /// List at most N of the filtered purchases (all of them with --json)
        #[arg(long)]
        limit: Option<usize>,

        /// CV threshold in percent
        #[arg(long)]
        threshold: Option<f64>,

        /// Tukey fence multiplier
        #[arg(long)]
        multiplier: Option<f64>,
    },

    /// Flag purchases above the taxed market reference price
    CheckPrices {
        #[command(flatten)]
        input: InputArgs,

        /// Market reference price
        #[arg(long)]
        market_price: Option<f64>,

        /// Tax rate in percent
        #[arg(long)]
        tax_rate: Option<f64>,

        /// Which purchase value is compared
        #[arg(long, value_enum)]
        basis: Option<PriceBasis>,
    },

    /// Spend by location, busiest groups and available filter values
    Overview {
        #[command(flatten)]
        input: InputArgs,

        /// Number of groups to list
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Compare internal prices against an external reference table
    Compare {
        #[command(flatten)]
        input: InputArgs,

        /// Reference table (TOML)
        #[arg(long)]
        reference: PathBuf,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::load_or_default(),
    };
    init_tracing(&config.logging);

    match cli.command {
        Commands::Analyze {
            input,
            sku,
            location,
            supplier,
            group,
            group_description,
            from,
            to,
            suspects_only,
            top,
            limit,
            threshold,
            multiplier,
        } => {
            let mut params = config.query_params();
            if let Some(t) = threshold {
                params.suspicion_threshold = t;
            }
            if let Some(m) = multiplier {
                params.outlier_multiplier = m;
            }
            let engine = AuditEngine::new(params).context("invalid detection parameters")?;

            let records = load_csv_file(&input.input)?;
            let criteria = FilterCriteria::new()
                .skus(sku)
                .locations(location)
                .suppliers(supplier)
                .merchandise_groups(group)
                .group_descriptions(group_description)
                .date_range(from, to)
                .suspects_only(suspects_only);

            tracing::info!(records = records.len(), ?params, "Running price analysis");
            let outcome = engine.run(&records, Some(&criteria));
            let untested = outcome.single_sample.len();

            if input.json {
                let listed = &outcome.records[..limit.unwrap_or(usize::MAX).min(outcome.records.len())];
                print_json(&json!({
                    "params": params,
                    "filtered_records": outcome.records.len(),
                    "records": listed,
                    "single_sample": outcome.single_sample,
                    "suspects": outcome.suspects,
                }))?;
            } else {
                let top = top.unwrap_or(config.report.top);
                println!("{} purchases after filters", outcome.records.len());
                print!(
                    "{}",
                    report::format_suspects(&outcome.suspects, top, config.report.outliers_per_group)
                );
                if untested > 0 {
                    println!(
                        "\n{} single-purchase group{} not tested for dispersion.",
                        untested,
                        if untested == 1 { "" } else { "s" }
                    );
                }
                if let Some(limit) = limit {
                    println!("\nFiltered purchases");
                    print!("{}", report::format_records(&outcome.records, limit));
                }
            }
        }
        Commands::CheckPrices {
            input,
            market_price,
            tax_rate,
            basis,
        } => {
            let market_price = market_price.unwrap_or(config.threshold.market_reference_price);
            let tax_rate = tax_rate.unwrap_or(config.threshold.tax_rate_percent);
            let rule = ThresholdRule::new(basis.unwrap_or(config.threshold.basis));

            let records = load_csv_file(&input.input)?;
            tracing::info!(%market_price, %tax_rate, basis = %rule.basis(), "Checking purchases against market reference");
            let alerts = rule.scan(&records, market_price, tax_rate);

            if input.json {
                print_json(&alerts)?;
            } else {
                print!("{}", report::format_alerts(&alerts));
            }
        }
        Commands::Overview { input, top } => {
            let records = load_csv_file(&input.input)?;
            let spend = overview::spend_by_location(&records);
            let busiest = overview::busiest_groups(&records, top);
            let trends = overview::monthly_trends(&records, &busiest, overview::TREND_GROUPS);
            let options = overview::filter_options(&records);

            if input.json {
                print_json(&json!({
                    "spend_by_location": spend,
                    "busiest_groups": busiest,
                    "monthly_trends": trends,
                    "filter_options": options,
                }))?;
            } else {
                print!("{}", report::format_overview(&spend, &busiest, &trends, &options));
            }
        }
        Commands::Compare { input, reference } => {
            let table = ReferenceTable::load(&reference)?;
            let records = load_csv_file(&input.input)?;
            let aggregates: Vec<_> = GroupStatistics::compute(&records, config.detection.outlier_multiplier)
                .into_iter()
                .map(|g| g.aggregate)
                .collect();
            let comparisons = compare(&table, &aggregates);

            if input.json {
                print_json(&comparisons)?;
            } else {
                print!("{}", report::format_comparisons(&comparisons));
            }
        }
    }

    Ok(())
}
