// Content checks for generated billing files
use crate::dataset::{self, ChunkReader};
use crate::error::Result;
use crate::focus::{BILLING_PERIOD_END, BILLING_PERIOD_START, FOCUS_COLUMNS, PROVIDER_NAME, PROVIDERS, Schema};
use crate::months::parse_timestamp;

use chrono::{Months, NaiveDateTime};
use csv::StringRecord;
use rand::Rng;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

const VALIDATE_CHUNK: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Uniform random rows across the whole file.
    Random,
    /// The first rows of the file.
    Head,
}

#[derive(Debug, Clone)]
pub struct ValidateConfig {
    pub path: PathBuf,
    pub sample_size: usize,
    pub mode: SampleMode,
    /// Length of the window, in months, that billing periods must fall in.
    pub months: u32,
    pub now: NaiveDateTime,
}

impl ValidateConfig {
    pub fn new(path: impl Into<PathBuf>, now: NaiveDateTime) -> Self {
        ValidateConfig {
            path: path.into(),
            sample_size: 1_000,
            mode: SampleMode::Random,
            months: 6,
            now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub total_rows: u64,
    pub sampled_rows: usize,
    pub missing_columns: Vec<String>,
    pub invalid_dates: usize,
    pub out_of_range: usize,
    pub missing_providers: Vec<String>,
}

impl ValidationReport {
    pub fn findings(&self) -> usize {
        self.missing_columns.len()
            + usize::from(self.invalid_dates > 0)
            + usize::from(self.out_of_range > 0)
            + self.missing_providers.len()
            + usize::from(self.sampled_rows == 0)
    }

    pub fn is_valid(&self) -> bool {
        self.findings() == 0
    }
}

fn head(config: &ValidateConfig) -> Result<(StringRecord, Vec<StringRecord>, u64)> {
    let mut reader = ChunkReader::open(&config.path, config.sample_size.max(1))?;
    let headers = reader.headers().clone();
    let mut sample = reader.next().transpose()?.unwrap_or_default();
    sample.truncate(config.sample_size);

    let mut total = sample.len() as u64;
    for chunk in reader {
        total += chunk?.len() as u64;
    }
    Ok((headers, sample, total))
}

/// Samples the file and checks columns, billing-period window and provider coverage.
pub fn validate_file<R: Rng>(config: &ValidateConfig, rng: &mut R) -> Result<ValidationReport> {
    info!("Validating file: {}", config.path.display());

    let (headers, sample, total_rows) = match config.mode {
        SampleMode::Head => head(config)?,
        SampleMode::Random => {
            let reader = ChunkReader::open(&config.path, VALIDATE_CHUNK)?;
            let headers = reader.headers().clone();
            let (sample, total) = dataset::reservoir_sample(reader, config.sample_size, rng)?;
            (headers, sample, total)
        }
    };
    info!("Total rows in file: {}, sampled {}", total_rows, sample.len());

    let schema = Schema::new(&headers);
    let mut report = ValidationReport {
        total_rows,
        sampled_rows: sample.len(),
        missing_columns: schema.missing(&FOCUS_COLUMNS).into_iter().map(String::from).collect(),
        ..Default::default()
    };
    if !report.missing_columns.is_empty() {
        warn!("Missing columns in the file: {:?}", report.missing_columns);
    }

    let window_start = config
        .now
        .checked_sub_months(Months::new(config.months))
        .unwrap_or(config.now);
    if let (Some(s), Some(e)) = (schema.position(BILLING_PERIOD_START), schema.position(BILLING_PERIOD_END)) {
        for record in &sample {
            match (parse_timestamp(&record[s]), parse_timestamp(&record[e])) {
                (Some(start), Some(end)) => {
                    if start < window_start || end > config.now {
                        report.out_of_range += 1;
                    }
                }
                _ => report.invalid_dates += 1,
            }
        }
    }
    if report.invalid_dates > 0 {
        warn!("{} sampled rows have invalid or missing billing dates", report.invalid_dates);
    }
    if report.out_of_range > 0 {
        warn!(
            "{} sampled rows fall outside {} to {}",
            report.out_of_range,
            window_start.date(),
            config.now.date()
        );
    }

    let seen: BTreeSet<&str> = match schema.position(PROVIDER_NAME) {
        Some(p) => sample.iter().map(|r| &r[p]).collect(),
        None => BTreeSet::new(),
    };
    report.missing_providers = PROVIDERS
        .iter()
        .filter(|p| !seen.contains(**p))
        .map(|p| p.to_string())
        .collect();
    if !report.missing_providers.is_empty() {
        warn!("Some providers are missing: {:?}", report.missing_providers);
    }
    if report.sampled_rows == 0 {
        warn!("The file contains no rows.");
    }

    if report.is_valid() {
        info!("Validation completed successfully. The file passed all checks.");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::seeded_rng;
    use chrono::NaiveDate;
    use std::path::Path;
    use tempfile::tempdir;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }

    /// A full-width FOCUS file; `dates` cycles over the rows.
    fn write_focus_file(path: &Path, providers: &[&str], dates: &[(&str, &str)], rows: usize) {
        let mut w = csv::Writer::from_path(path).unwrap();
        w.write_record(FOCUS_COLUMNS).unwrap();
        let schema = Schema::new(&StringRecord::from(FOCUS_COLUMNS.to_vec()));
        for i in 0..rows {
            let mut row = schema.row_from(&StringRecord::new());
            let (start, end) = dates[i % dates.len()];
            row.set(&schema, PROVIDER_NAME, providers[i % providers.len()]);
            row.set(&schema, BILLING_PERIOD_START, start);
            row.set(&schema, BILLING_PERIOD_END, end);
            w.write_record(row.fields()).unwrap();
        }
        w.flush().unwrap();
    }

    #[test]
    fn well_formed_file_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("good.csv");
        write_focus_file(&path, &PROVIDERS, &[("2024-08-01 00:00:00", "2024-09-01 00:00:00")], 40);

        let config = ValidateConfig::new(&path, now());
        let report = validate_file(&config, &mut seeded_rng(Some(1))).unwrap();

        assert_eq!(report.total_rows, 40);
        assert_eq!(report.sampled_rows, 40);
        assert!(report.is_valid(), "{report:?}");
    }

    #[test]
    fn reports_every_kind_of_finding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        write_focus_file(
            &path,
            &["AWS", "Oracle"],
            &[("2023-01-01", "2023-02-01"), ("garbage", "2024-09-01 00:00:00")],
            10,
        );

        let mut config = ValidateConfig::new(&path, now());
        config.mode = SampleMode::Head;
        config.sample_size = 4;
        let report = validate_file(&config, &mut seeded_rng(Some(1))).unwrap();

        assert_eq!(report.total_rows, 10);
        assert_eq!(report.sampled_rows, 4);
        assert_eq!(report.invalid_dates, 2);
        assert_eq!(report.out_of_range, 2);
        assert_eq!(report.missing_providers, vec!["Google Cloud", "Microsoft"]);
        assert_eq!(report.findings(), 4);
    }

    #[test]
    fn missing_columns_and_empty_files_fail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thin.csv");
        dataset::tests::write_fixture(&path, 0);

        let report = validate_file(&ValidateConfig::new(&path, now()), &mut seeded_rng(Some(1))).unwrap();

        assert_eq!(report.missing_columns.len(), FOCUS_COLUMNS.len() - 3);
        assert_eq!(report.sampled_rows, 0);
        assert!(!report.is_valid());
    }
}
