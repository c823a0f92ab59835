//! Solar Irradiance Processing Library
//!
//! Cleaning, quality profiling and cross-country comparison of solar
//! measurement logs, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Loading**: locate a country's raw export and parse it, tolerating
//!   Latin-1 files and a units row under the header
//! - **Profiling**: descriptive statistics, missing-value report, Z-score and
//!   IQR outliers, and a weighted data-quality score
//! - **Cleaning**: an ordered pipeline of deduplication, numeric coercion,
//!   missing-value handling, irradiance clipping and outlier removal, with an
//!   audit log of every change
//! - **Aggregation**: load cleaned tables for several countries, summarize
//!   and rank them
//! - **EDA**: correlations, cleaning impact, seasonal and diurnal means
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use solar_processing::{DataCleaner, DataProfiler, PipelineConfig, SolarDataLoader};
//!
//! let config = PipelineConfig::builder().data_dir("data").build()?;
//! let loader = SolarDataLoader::from_config(&config)?;
//! let raw = loader.load_country("Benin")?;
//!
//! let mut cleaner = DataCleaner::with_config(&raw, config);
//! let cleaned = cleaner.clean_pipeline(true)?;
//! for entry in cleaner.report() {
//!     println!("{}: {}", entry.action, entry.details);
//! }
//!
//! let score = DataProfiler::new(&cleaned).data_quality_score()?;
//! println!("Overall quality: {:.2}%", score.overall_quality);
//! ```
//!
//! # Comparing countries
//!
//! ```rust,ignore
//! use solar_processing::{CleanDataStore, SolarSchema};
//! use solar_processing::aggregation::{rank_by_mean, summary_table};
//!
//! let store = CleanDataStore::new("data", SolarSchema::default());
//! let all = store.load_countries(&["Benin", "Togo"])?;
//! let summary = summary_table(&all, &["GHI", "DNI", "DHI"], "Country")?;
//! let ranking = rank_by_mean(&all, "GHI", "Country")?;
//! ```

pub mod aggregation;
pub mod cleaner;
pub mod config;
pub mod eda;
pub mod error;
pub mod loader;
pub mod profiler;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use aggregation::{CleanDataStore, CountryMean, CountrySummary, MetricSummary};
pub use cleaner::{DataCleaner, StepOutcome};
pub use config::{
    ConfigValidationError, MissingValueStrategy, PipelineConfig, PipelineConfigBuilder,
    SolarSchema,
};
pub use eda::EdaAnalyzer;
pub use error::{Result as SolarResult, ResultExt, SolarError};
pub use loader::SolarDataLoader;
pub use profiler::DataProfiler;
pub use reporting::{ProfileArtifacts, ReportGenerator};
pub use types::{
    CleaningLogEntry, CleaningStage, CleaningSummary, ColumnStatistics, DatasetInfo, IqrOutliers,
    MissingValueEntry, ProfileReport, QualityScore, ZScoreOutliers,
};
