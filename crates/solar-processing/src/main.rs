//! CLI entry point for the solar processing pipeline.

use anyhow::{Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use serde_json::json;
use solar_processing::aggregation::{rank_by_mean, summary_table};
use solar_processing::config::OUTPUT_DIR_ENV;
use solar_processing::reporting::render_cleaning_summary;
use solar_processing::{
    CleanDataStore, CleaningSummary, DataCleaner, DataProfiler, EdaAnalyzer, MissingValueStrategy,
    PipelineConfig, ReportGenerator, SolarDataLoader,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// CLI-compatible missing-value strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingStrategy {
    /// Fill numeric columns with their median
    Median,
    /// Fill numeric columns with their mean
    Mean,
    /// Propagate the last valid value forward
    ForwardFill,
    /// Drop rows with missing values
    Drop,
}

impl From<CliMissingStrategy> for MissingValueStrategy {
    fn from(cli: CliMissingStrategy) -> Self {
        match cli {
            CliMissingStrategy::Median => MissingValueStrategy::Median,
            CliMissingStrategy::Mean => MissingValueStrategy::Mean,
            CliMissingStrategy::ForwardFill => MissingValueStrategy::ForwardFill,
            CliMissingStrategy::Drop => MissingValueStrategy::Drop,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Solar irradiance cleaning and quality profiling",
    long_about = "Cleans raw solar measurement logs, profiles their quality and compares \
                  countries.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  SOLAR_DATA_DIR       Raw data directory (default: data)\n  \
                  SOLAR_OUTPUT_DIR     Cleaned output directory (default: data)\n  \
                  SOLAR_REPORTS_DIR    Reports directory (default: reports)\n\n\
                  EXAMPLES:\n  \
                  solar-processing clean benin\n  \
                  solar-processing clean togo --strategy forward-fill --keep-outliers\n  \
                  solar-processing profile \"sierra leone\"\n  \
                  solar-processing compare --metric DNI --json"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct GlobalArgs {
    /// Directory holding raw data files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory receiving cleaned CSV files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory receiving cleaning logs and profile reports
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs so stdout only carries the JSON document.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean a country's raw file and save the cleaned table and log
    Clean {
        /// Country name, matched case- and punctuation-insensitively
        country: String,

        /// Skip Z-score outlier removal
        #[arg(long)]
        keep_outliers: bool,

        /// Strategy for missing values
        #[arg(long, value_enum)]
        strategy: Option<CliMissingStrategy>,

        /// Drop columns whose missing ratio exceeds this value (0.0 - 1.0)
        #[arg(long)]
        missing_col_threshold: Option<f64>,

        /// Absolute Z-score above which a row is an outlier
        #[arg(long)]
        zscore_threshold: Option<f64>,
    },

    /// Profile a country's table and write the profile reports
    Profile {
        country: String,

        /// Profile the cleaned table instead of the raw file
        #[arg(long)]
        cleaned: bool,
    },

    /// Compare cleaned tables across countries
    Compare {
        /// Countries to compare (default: every known country)
        countries: Vec<String>,

        /// Metric used for the ranking
        #[arg(long)]
        metric: Option<String>,
    },

    /// Print exploratory findings for a country's cleaned table
    Insights { country: String },

    /// List known countries that have a cleaned table
    Countries,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Environment configuration with the directory flags applied on top.
fn build_config(global: &GlobalArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(dir) = &global.data_dir {
        config.data_dir = dir.clone();
        // Cleaned files live next to raw files unless redirected.
        if global.output_dir.is_none() && std::env::var(OUTPUT_DIR_ENV).is_err() {
            config.output_dir = dir.clone();
        }
    }
    if let Some(dir) = &global.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &global.reports_dir {
        config.reports_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.global.log_level, cli.global.quiet, cli.global.json);

    // Load environment variables from .env file
    dotenv().ok();

    let config = build_config(&cli.global)?;
    let json_output = cli.global.json;

    let outcome = match cli.command {
        Command::Clean {
            country,
            keep_outliers,
            strategy,
            missing_col_threshold,
            zscore_threshold,
        } => {
            let mut config = config;
            if keep_outliers {
                config.remove_outliers = false;
            }
            if let Some(strategy) = strategy {
                config.missing_strategy = strategy.into();
            }
            if let Some(threshold) = missing_col_threshold {
                config.missing_column_threshold = threshold;
            }
            if let Some(threshold) = zscore_threshold {
                config.zscore_threshold = threshold;
            }
            config.validate()?;
            run_clean(&config, &country, json_output)
        }
        Command::Profile { country, cleaned } => {
            run_profile(&config, &country, cleaned, json_output)
        }
        Command::Compare { countries, metric } => {
            run_compare(&config, countries, metric, json_output)
        }
        Command::Insights { country } => run_insights(&config, &country, json_output),
        Command::Countries => run_countries(&config, json_output),
    };

    if let Err(e) = &outcome {
        error!("{e:#}");
    }
    outcome
}

/// Load, clean and persist one country.
fn run_clean(config: &PipelineConfig, country: &str, json_output: bool) -> Result<()> {
    let loader = SolarDataLoader::from_config(config)?;
    let raw = loader.load_country(country)?;
    let missing = loader.validate_columns(&raw);
    let original_shape = raw.shape();

    info!(
        country,
        strategy = %config.missing_strategy,
        remove_outliers = config.remove_outliers,
        "Starting cleaning pipeline"
    );
    let mut cleaner = DataCleaner::with_config(&raw, config.clone());
    let cleaned = cleaner.clean_pipeline(config.remove_outliers)?;

    let generator = ReportGenerator::from_config(config);
    let clean_path = generator.save_clean_data(&cleaned, country)?;
    let log_path = generator.save_cleaning_log(cleaner.report(), country)?;
    let summary = CleaningSummary::new(country, original_shape, cleaned.shape());

    if json_output {
        let document = json!({
            "summary": summary,
            "cleaning_log": cleaner.report(),
            "missing_columns": missing,
            "clean_file": clean_path,
            "log_file": log_path,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("{}", render_cleaning_summary(&summary));
    if cleaner.report().is_empty() {
        println!("No changes were needed");
    }
    for entry in cleaner.report() {
        println!("  - {}: {}", entry.action, entry.details);
    }
    println!("Cleaned data: {}", clean_path.display());
    println!("Cleaning log: {}", log_path.display());
    Ok(())
}

/// Profile one country and write the profile artifacts.
fn run_profile(
    config: &PipelineConfig,
    country: &str,
    cleaned: bool,
    json_output: bool,
) -> Result<()> {
    let loader = SolarDataLoader::from_config(config)?;
    let df = if cleaned {
        CleanDataStore::from_config(config).load_clean_country(country)?
    } else {
        loader.load_country(country)?
    };

    let profiler = DataProfiler::with_schema(&df, config.schema.clone());
    let report = profiler.generate_profile_report()?;
    let info = loader.data_info(&df)?;

    let generator = ReportGenerator::from_config(config);
    let artifacts = generator.write_profile_report(
        country,
        &report,
        info.date_range.clone(),
        &profiler.summary_statistics_frame()?,
        &profiler.missing_values_frame()?,
    )?;

    if json_output {
        let document = json!({
            "dataset": info,
            "report": report,
            "files": artifacts,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!(
        "{}",
        solar_processing::reporting::render_profile_text(country, &report, info.date_range.as_ref())
    );
    println!("Report written to: {}", artifacts.text_report.display());
    Ok(())
}

/// Summarize and rank cleaned tables across countries.
fn run_compare(
    config: &PipelineConfig,
    countries: Vec<String>,
    metric: Option<String>,
    json_output: bool,
) -> Result<()> {
    let schema = &config.schema;
    let countries = if countries.is_empty() {
        schema.known_countries.clone()
    } else {
        countries
    };
    let metric = metric.unwrap_or_else(|| schema.ranking_metric.clone());

    let store = CleanDataStore::from_config(config);
    let all = store.load_countries(countries.as_slice())?;
    let summary = summary_table(
        &all,
        schema.comparison_metrics.as_slice(),
        &schema.country_column,
    )?;
    let ranking = rank_by_mean(&all, &metric, &schema.country_column)?;

    if json_output {
        let document = json!({
            "metric": metric,
            "summary": summary,
            "ranking": ranking,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("{}", "=".repeat(60));
    println!("CROSS-COUNTRY SUMMARY");
    println!("{}", "=".repeat(60));
    for row in &summary {
        println!("{}", row.country);
        for m in &row.metrics {
            println!(
                "  {:<6} mean {:>10} median {:>10} std {:>10}",
                m.metric,
                fmt_opt(m.mean),
                fmt_opt(m.median),
                fmt_opt(m.std)
            );
        }
    }
    println!();
    println!("RANKING BY MEAN {metric}");
    println!("{}", "-".repeat(40));
    for (rank, entry) in ranking.iter().enumerate() {
        println!("  {}. {:<16} {:>10}", rank + 1, entry.country, fmt_opt(entry.mean));
    }
    Ok(())
}

/// Print exploratory findings for one cleaned table.
fn run_insights(config: &PipelineConfig, country: &str, json_output: bool) -> Result<()> {
    let df = CleanDataStore::from_config(config).load_clean_country(country)?;
    let analyzer = EdaAnalyzer::with_schema(&df, config.schema.clone());
    let insights = analyzer.insights()?;

    if json_output {
        let document = json!({
            "country": country,
            "time_span": analyzer.time_span()?,
            "irradiance": analyzer.irradiance_summary()?,
            "wind": analyzer.wind_summary()?,
            "cleaning_impact": analyzer.cleaning_impact()?,
            "insights": insights,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    if insights.is_empty() {
        warn!(country, "No insights could be derived");
    }
    println!("KEY INSIGHTS: {}", country.to_uppercase());
    println!("{}", "-".repeat(40));
    for insight in insights {
        println!("  - {insight}");
    }
    Ok(())
}

/// List known countries with a cleaned table on disk.
fn run_countries(config: &PipelineConfig, json_output: bool) -> Result<()> {
    let available = CleanDataStore::from_config(config).available_countries()?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&available)?);
        return Ok(());
    }
    if available.is_empty() {
        return Err(anyhow!(
            "No cleaned data found in {}; run `clean <country>` first",
            config.output_dir.display()
        ));
    }
    for country in available {
        println!("{country}");
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}
