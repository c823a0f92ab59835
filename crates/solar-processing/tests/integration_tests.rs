//! Integration tests for the solar processing pipeline.
//!
//! These tests drive the public API end to end: raw files on disk through
//! loading, cleaning, persistence and cross-country aggregation.

use polars::prelude::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use solar_processing::aggregation::{rank_by_mean, summary_table};
use solar_processing::utils;
use solar_processing::{
    CleanDataStore, CleaningLogEntry, DataCleaner, DataProfiler, PipelineConfig, ReportGenerator,
    SolarDataLoader, SolarError, SolarSchema,
};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// 95 distinct rows followed by copies of the first five. Rows 10-12 carry
/// a negative GHI reading.
fn scenario_csv() -> String {
    let mut csv = String::from("Timestamp,GHI,DNI,DHI,Tamb\n");
    let mut rows = Vec::new();
    for i in 0..95 {
        let ghi = if (10..13).contains(&i) {
            -5.0
        } else {
            100.0 + i as f64 * 4.0
        };
        rows.push(format!(
            "2021-08-09 {:02}:{:02},{ghi},{},{},{}",
            i / 60,
            i % 60,
            50.0 + i as f64,
            20.0 + (i % 7) as f64,
            25.0 + (i % 5) as f64 * 0.5
        ));
    }
    for i in 0..5 {
        let row = rows[i].clone();
        rows.push(row);
    }
    for row in rows {
        let _ = writeln!(csv, "{row}");
    }
    csv
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn scenario_frame(dir: &Path) -> DataFrame {
    write(dir, "benin-malanville.csv", &scenario_csv());
    SolarDataLoader::new(dir).unwrap().load_country("Benin").unwrap()
}

/// Standard normal sample via the Box-Muller transform.
fn normal(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    mean + std * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

// ============================================================================
// Cleaning Pipeline
// ============================================================================

#[test]
fn test_pipeline_scenario_duplicates_and_negative_ghi() {
    let tmp = TempDir::new().unwrap();
    let raw = scenario_frame(tmp.path());
    assert_eq!(raw.height(), 100);

    let mut cleaner = DataCleaner::new(&raw);
    let cleaned = cleaner.clean_pipeline(false).unwrap();

    assert_eq!(cleaned.height(), 95);
    assert_eq!(
        cleaner.report(),
        &[
            CleaningLogEntry::new("Removed duplicates", "5 duplicate rows removed"),
            CleaningLogEntry::new("Fixed negative values", "GHI: 3 values set to 0"),
        ]
    );

    let ghi = utils::non_null_f64(&cleaned, "GHI").unwrap();
    assert_eq!(ghi.iter().filter(|v| **v == 0.0).count(), 3);
}

#[test]
fn test_pipeline_is_idempotent_on_row_count() {
    let tmp = TempDir::new().unwrap();
    let raw = scenario_frame(tmp.path());

    let once = DataCleaner::new(&raw).clean_pipeline(true).unwrap();
    let mut second = DataCleaner::new(&once);
    let twice = second.clean_pipeline(true).unwrap();

    assert_eq!(once.height(), twice.height());
    assert!(second.report().is_empty());
}

#[test]
fn test_cleaned_table_has_no_negative_irradiance_or_duplicates() {
    let tmp = TempDir::new().unwrap();
    let raw = scenario_frame(tmp.path());
    let schema = SolarSchema::default();

    let cleaned = DataCleaner::new(&raw).clean_pipeline(true).unwrap();

    for column in &schema.irradiance_columns {
        if utils::has_column(&cleaned, column) {
            let values = utils::non_null_f64(&cleaned, column).unwrap();
            assert!(values.iter().all(|v| *v >= 0.0), "{column} has negatives");
        }
    }
    assert_eq!(utils::duplicate_row_count(&cleaned).unwrap(), 0);
}

#[test]
fn test_unparsable_cells_become_missing_then_filled() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "togo-dapaong_qc.csv",
        "Timestamp,GHI,Tamb\n2021-08-09 00:01,10,25\n2021-08-09 00:02,#VALUE!,26\n2021-08-09 00:03,30,27\n",
    );
    let raw = SolarDataLoader::new(tmp.path()).unwrap().load_country("togo").unwrap();

    let mut cleaner = DataCleaner::new(&raw);
    let cleaned = cleaner.clean_pipeline(false).unwrap();

    assert_eq!(cleaned.height(), 3);
    assert_eq!(
        utils::non_null_f64(&cleaned, "GHI").unwrap(),
        vec![10.0, 20.0, 30.0]
    );
    assert_eq!(
        cleaner.report()[0],
        CleaningLogEntry::new("Coerced numeric", "GHI: 1 unparsable values set to missing")
    );
}

// ============================================================================
// Persistence and Loading
// ============================================================================

#[test]
fn test_clean_csv_round_trip_preserves_rows_and_values() {
    let tmp = TempDir::new().unwrap();
    let raw = scenario_frame(tmp.path());
    let cleaned = DataCleaner::new(&raw).clean_pipeline(false).unwrap();

    let generator = ReportGenerator::new(tmp.path(), tmp.path().join("reports"));
    let path = generator.save_clean_data(&cleaned, "Benin").unwrap();
    assert_eq!(path.file_name().unwrap(), "benin_clean.csv");

    let store = CleanDataStore::new(tmp.path(), SolarSchema::default());
    let reloaded = store.load_clean_country("Benin").unwrap();

    assert_eq!(reloaded.height(), cleaned.height());
    assert_eq!(
        utils::non_null_f64(&reloaded, "GHI").unwrap(),
        utils::non_null_f64(&cleaned, "GHI").unwrap()
    );
    assert_eq!(
        utils::column_millis(&reloaded, "Timestamp").unwrap(),
        utils::column_millis(&cleaned, "Timestamp").unwrap()
    );
}

#[test]
fn test_loader_skips_units_row() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "sierraleone-bumbuna.csv",
        "Timestamp,GHI,Tamb\nyyyy-mm-dd hh:mm,W/m2,C\n2021-10-30 00:01,1.5,24\n2021-10-30 00:02,2.5,25\n",
    );
    let loader = SolarDataLoader::new(tmp.path()).unwrap();
    let df = loader.load_country("Sierra Leone").unwrap();

    assert_eq!(df.height(), 2);
    assert_eq!(utils::non_null_f64(&df, "GHI").unwrap(), vec![1.5, 2.5]);
    assert_eq!(df.column("Timestamp").unwrap().null_count(), 0);
}

#[test]
fn test_loader_reads_latin1_file() {
    let tmp = TempDir::new().unwrap();
    let mut bytes = b"Timestamp,GHI,Comments\n2021-08-09 00:01,5,ensoleill".to_vec();
    bytes.push(0xe9);
    bytes.push(b'\n');
    fs::write(tmp.path().join("benin.csv"), bytes).unwrap();

    let df = SolarDataLoader::new(tmp.path())
        .unwrap()
        .load_country("benin")
        .unwrap();
    let comment = df
        .column("Comments")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .get(0)
        .map(str::to_string);
    assert_eq!(comment.as_deref(), Some("ensoleillé"));
}

#[test]
fn test_loader_not_found_is_distinct() {
    let tmp = TempDir::new().unwrap();
    let loader = SolarDataLoader::new(tmp.path()).unwrap();
    let err = loader.load_country("Kenya").unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[test]
fn test_cleaning_log_written_to_reports_dir() {
    let tmp = TempDir::new().unwrap();
    let raw = scenario_frame(tmp.path());
    let mut cleaner = DataCleaner::new(&raw);
    cleaner.clean_pipeline(false).unwrap();

    let config = PipelineConfig::builder()
        .data_dir(tmp.path())
        .reports_dir(tmp.path().join("reports"))
        .build()
        .unwrap();
    let path = ReportGenerator::from_config(&config)
        .save_cleaning_log(cleaner.report(), "Benin")
        .unwrap();

    assert_eq!(path, tmp.path().join("reports").join("benin_cleaning_log.csv"));
    let written = fs::read_to_string(path).unwrap();
    assert_eq!(
        written,
        "action,details\nRemoved duplicates,5 duplicate rows removed\nFixed negative values,GHI: 3 values set to 0\n"
    );
}

// ============================================================================
// Multi-country Aggregation
// ============================================================================

#[test]
fn test_load_countries_skips_missing_country() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "benin_clean.csv",
        "Timestamp,GHI,DNI,DHI\n2021-08-09 00:01:00,10,5,2\n2021-08-09 00:02:00,20,6,3\n",
    );
    let store = CleanDataStore::new(tmp.path(), SolarSchema::default());

    let all = store.load_countries(&["Benin", "Togo"]).unwrap();
    assert_eq!(all.height(), 2);
    let countries = all
        .column("Country")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect::<Vec<_>>();
    assert_eq!(countries, vec!["Benin", "Benin"]);

    let err = store.load_countries(&["Togo", "Kenya"]).unwrap_err();
    assert!(matches!(err, SolarError::NoCountriesLoaded(_)));
}

#[test]
fn test_compare_countries_end_to_end() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "benin_clean.csv",
        "Timestamp,GHI\n2021-08-09 00:01:00,200\n2021-08-09 00:02:00,300\n",
    );
    write(
        tmp.path(),
        "togo_clean.csv",
        "Timestamp,GHI\n2021-08-09 00:01:00,100\n2021-08-09 00:02:00,101\n",
    );
    let store = CleanDataStore::new(tmp.path(), SolarSchema::default());
    let all = store.load_countries(&["Togo", "Benin"]).unwrap();

    let summary = summary_table(&all, &["GHI", "DNI"], "Country").unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].country, "Benin");
    assert_eq!(summary[0].metrics.len(), 1);
    assert_eq!(summary[0].metrics[0].mean, Some(250.0));
    assert_eq!(summary[1].metrics[0].median, Some(100.5));

    let ranking = rank_by_mean(&all, "GHI", "Country").unwrap();
    let order: Vec<&str> = ranking.iter().map(|r| r.country.as_str()).collect();
    assert_eq!(order, vec!["Benin", "Togo"]);

    assert!(rank_by_mean(&all, "XYZ", "Country").unwrap_err().is_not_found());
}

#[test]
fn test_integer_and_fractional_exports_compare_without_truncation() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "benin-malanville.csv",
        "Timestamp,GHI\n2021-08-09 00:01,200\n2021-08-09 00:02,300\n",
    );
    write(
        tmp.path(),
        "togo-dapaong_qc.csv",
        "Timestamp,GHI\n2021-08-09 00:01,100.5\n2021-08-09 00:02,101.5\n",
    );
    let loader = SolarDataLoader::new(tmp.path()).unwrap();
    let reports = ReportGenerator::new(tmp.path(), tmp.path());

    for country in ["Benin", "Togo"] {
        let raw = loader.load_country(country).unwrap();
        let cleaned = DataCleaner::new(&raw).clean_pipeline(false).unwrap();
        assert_eq!(cleaned.column("GHI").unwrap().dtype(), &DataType::Float64);
        reports.save_clean_data(&cleaned, country).unwrap();
    }

    let store = CleanDataStore::new(tmp.path(), SolarSchema::default());
    let all = store.load_countries(&["Benin", "Togo"]).unwrap();
    assert_eq!(
        utils::column_f64(&all, "GHI").unwrap(),
        vec![Some(200.0), Some(300.0), Some(100.5), Some(101.5)]
    );

    let ranking = rank_by_mean(&all, "GHI", "Country").unwrap();
    assert_eq!(ranking[1].country, "Togo");
    assert_eq!(ranking[1].mean, Some(101.0));
}

#[test]
fn test_available_countries_after_cleaning() {
    let tmp = TempDir::new().unwrap();
    let raw = scenario_frame(tmp.path());
    let cleaned = DataCleaner::new(&raw).clean_pipeline(true).unwrap();
    ReportGenerator::new(tmp.path(), tmp.path())
        .save_clean_data(&cleaned, "Benin")
        .unwrap();

    let store = CleanDataStore::new(tmp.path(), SolarSchema::default());
    assert_eq!(store.available_countries().unwrap(), vec!["Benin"]);
}

// ============================================================================
// Profiling
// ============================================================================

#[test]
fn test_perfect_table_scores_100() {
    let df = df![
        "Timestamp" => ["a", "b", "c"],
        "GHI" => [1.0, 2.0, 3.0],
        "Tamb" => [20.0, 21.0, 22.0],
    ]
    .unwrap();
    let score = DataProfiler::new(&df).data_quality_score().unwrap();

    assert_eq!(score.completeness, 100.0);
    assert_eq!(score.validity, 100.0);
    assert_eq!(score.uniqueness, 100.0);
    assert_eq!(score.overall_quality, 100.0);
}

#[test]
fn test_missing_report_percentages() {
    let n = 40;
    let k = 7;
    let ghi: Vec<Option<f64>> = (0..n)
        .map(|i| if i < k { None } else { Some(i as f64) })
        .collect();
    let tamb: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let df = df!["GHI" => ghi, "Tamb" => tamb].unwrap();

    let report = DataProfiler::new(&df).missing_value_report().unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report[0].column, "GHI");
    assert_eq!(report[0].missing_count, k);
    assert!((report[0].missing_percent - 100.0 * k as f64 / n as f64).abs() < 1e-9);
}

#[test]
fn test_single_far_outlier_among_normal_values() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut values: Vec<f64> = (0..999).map(|_| normal(&mut rng, 500.0, 50.0)).collect();
    values.push(50_000.0);
    let df = df!["GHI" => values].unwrap();

    let outliers = DataProfiler::new(&df)
        .detect_outliers_zscore(Some(&["GHI".to_string()]), 3.0)
        .unwrap();

    assert_eq!(outliers.len(), 1);
    assert_eq!(outliers[0].count, 1);
    assert_eq!(outliers[0].indices, vec![999]);
}

#[test]
fn test_profile_report_written_for_loaded_country() {
    let tmp = TempDir::new().unwrap();
    let raw = scenario_frame(tmp.path());
    let loader = SolarDataLoader::new(tmp.path()).unwrap();
    let info = loader.data_info(&raw).unwrap();
    assert_eq!(info.rows, 100);

    let profiler = DataProfiler::new(&raw);
    let report = profiler.generate_profile_report().unwrap();
    let artifacts = ReportGenerator::new(tmp.path(), tmp.path().join("reports"))
        .write_profile_report(
            "Benin",
            &report,
            info.date_range.clone(),
            &profiler.summary_statistics_frame().unwrap(),
            &profiler.missing_values_frame().unwrap(),
        )
        .unwrap();

    let text = fs::read_to_string(&artifacts.text_report).unwrap();
    assert!(text.starts_with("DATA PROFILING REPORT: BENIN"));
    assert!(text.contains("Date Range: 2021-08-09 00:00:00 to 2021-08-09 01:34:00"));
    assert!(text.contains("No missing values"));
    assert!(artifacts.missing_values.is_none());
}
