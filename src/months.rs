// Month/provider replication of billing rows
use crate::dataset::{ChunkReader, CsvSink};
use crate::error::{FocusError, Result};
use crate::fake::{Faker, seeded_rng, timestamp};
use crate::focus::{
    BILLING_PERIOD_END, BILLING_PERIOD_START, DATE_FORMAT, PROVIDER_NAME, PROVIDERS, Row, Schema,
    TIMESTAMP_FORMAT,
};
use crate::generate::{load_templates, par_blocks};

use chrono::{Duration, Months, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rand::Rng;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ExtendConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub rows_per_provider: usize,
    pub months: u32,
    pub chunk_size: usize,
    pub seed: Option<u64>,
}

impl ExtendConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        ExtendConfig {
            input_path: input_path.into(),
            output_path: output_path.into(),
            rows_per_provider: 1_000,
            months: 6,
            chunk_size: 10_000,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtendReport {
    pub rows_written: u64,
    pub rows_skipped: u64,
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Shifts the billing period of `row` back by `days`; `None` if either date is unparseable.
fn shift_billing_period(row: &mut Row, schema: &Schema, days: i64) -> Option<()> {
    let start = parse_timestamp(row.get(schema, BILLING_PERIOD_START)?)?;
    let end = parse_timestamp(row.get(schema, BILLING_PERIOD_END)?)?;

    row.set(schema, BILLING_PERIOD_START, timestamp(start - Duration::days(days)));
    row.set(schema, BILLING_PERIOD_END, timestamp(end - Duration::days(days)));
    Some(())
}

/// Replicates each input chunk across `months` 30-day offsets and every provider.
pub fn extend_months(config: &ExtendConfig) -> Result<ExtendReport> {
    let start = Instant::now();
    let mut reader = ChunkReader::open(&config.input_path, config.chunk_size)?;
    let schema = Schema::new(reader.headers());
    schema.require(BILLING_PERIOD_START)?;
    schema.require(BILLING_PERIOD_END)?;
    let schema = schema.with_columns(&[PROVIDER_NAME, "ConsumedQuantity", "BilledCost"]);

    let mut rng = seeded_rng(config.seed);
    let mut sink = CsvSink::with_schema(&config.output_path, &schema)?;
    let mut report = ExtendReport::default();

    for chunk in reader.by_ref() {
        let chunk = chunk?;
        for month in 0..config.months {
            for provider in PROVIDERS {
                for _ in 0..config.rows_per_provider {
                    let source = &chunk[rng.random_range(0..chunk.len())];
                    let mut row = schema.row_from(source);

                    if shift_billing_period(&mut row, &schema, i64::from(month) * 30).is_none() {
                        report.rows_skipped += 1;
                        continue;
                    }
                    let mut fake = Faker::new(&mut rng);
                    row.set(&schema, PROVIDER_NAME, provider);
                    row.set(&schema, "ConsumedQuantity", fake.amount(1.0, 1000.0, 2));
                    row.set(&schema, "BilledCost", fake.amount(0.1, 100.0, 2));
                    sink.write_row(&row)?;
                }
            }
        }
        info!("Processed a chunk, {} rows written so far", sink.rows());
    }

    if report.rows_skipped > 0 {
        warn!("Skipped {} rows with unparseable billing dates", report.rows_skipped);
    }
    report.rows_written = sink.finish()?;
    info!(
        "Mock data generation completed ({} rows from {} input rows) in {:?}. File saved to {}",
        report.rows_written,
        reader.rows_read(),
        start.elapsed(),
        config.output_path.display()
    );

    Ok(report)
}

#[derive(Debug, Clone)]
pub struct DateRangeConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows_per_provider: usize,
    pub seed: Option<u64>,
}

impl DateRangeConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        DateRangeConfig {
            input_path: input_path.into(),
            output_path: output_path.into(),
            start: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            rows_per_provider: 5_000,
            seed: None,
        }
    }
}

pub const DATE_RANGE_COLUMNS: [&str; 19] = [
    "ProviderName", "BillingPeriodStart", "BillingPeriodEnd", "BilledCost", "ConsumedQuantity",
    "ServiceName", "RegionName", "ChargeCategory", "ChargeDescription", "ChargeFrequency",
    "ContractedCost", "EffectiveCost", "InvoiceIssuerName", "ListCost", "ListUnitPrice",
    "PricingCategory", "PricingQuantity", "PricingUnit", "PublisherName",
];

/// `start` stepped one calendar month at a time, up to and including `end`.
pub fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        months.push(current);
        match current.checked_add_months(Months::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    months
}

fn date_range_row<R: Rng>(
    schema: &Schema,
    templates: &[StringRecord],
    provider: &str,
    month: NaiveDate,
    rng: &mut R,
) -> Row {
    let template = &templates[rng.random_range(0..templates.len())];
    let mut row = schema.row_from(template);
    let period_start = month.and_hms_opt(0, 0, 0).unwrap_or_default();
    let period_end = period_start
        .checked_add_months(Months::new(1))
        .unwrap_or(period_start);
    let mut fake = Faker::new(rng);

    row.set(schema, PROVIDER_NAME, provider);
    row.set(schema, BILLING_PERIOD_START, timestamp(period_start));
    row.set(schema, BILLING_PERIOD_END, timestamp(period_end));
    row.set(schema, "BilledCost", fake.amount(0.01, 100.0, 2));
    row.set(schema, "ConsumedQuantity", fake.amount(0.1, 1000.0, 2));
    row.set(
        schema,
        "ServiceName",
        fake.element(&[
            "Amazon EC2",
            "Google Cloud Storage",
            "Oracle Database",
            "Microsoft Azure Functions",
        ]),
    );
    row.set(
        schema,
        "RegionName",
        fake.element(&[
            "US East (N. Virginia)",
            "EU (Frankfurt)",
            "Asia Pacific (Singapore)",
            "US West (Oregon)",
        ]),
    );
    row.set(schema, "ChargeCategory", fake.job_descriptor());
    let description = format!("{} in {}", fake.sentence(6).trim_end_matches('.'), fake.city());
    row.set(schema, "ChargeDescription", description);
    row.set(
        schema,
        "ChargeFrequency",
        fake.element(&["Usage-Based", "Monthly", "One-Time"]),
    );
    row.set(schema, "ContractedCost", fake.amount(0.0, 100.0, 2));
    row.set(schema, "EffectiveCost", fake.amount(0.0, 100.0, 2));
    row.set(schema, "InvoiceIssuerName", provider);
    row.set(schema, "ListCost", fake.amount(0.0, 100.0, 2));
    row.set(schema, "ListUnitPrice", fake.amount(0.0, 100.0, 2));
    row.set(schema, "PricingCategory", fake.element(&["Standard", "Premium"]));
    row.set(schema, "PricingQuantity", fake.amount(0.0, 10.0, 2));
    row.set(schema, "PricingUnit", fake.element(&["Requests", "GB", "Hours"]));
    row.set(schema, "PublisherName", provider);

    row
}

/// Generates `rows_per_provider` rows for every provider in every month of the range.
pub fn generate_date_range(config: &DateRangeConfig) -> Result<u64> {
    if config.start > config.end {
        return Err(FocusError::InvalidConfig(format!(
            "start {} is after end {}",
            config.start, config.end
        )));
    }
    let start = Instant::now();
    let (headers, templates) = load_templates(&config.input_path)?;
    let schema = Schema::new(&headers).with_columns(&DATE_RANGE_COLUMNS);
    let mut rng = seeded_rng(config.seed);
    let mut sink = CsvSink::with_schema(&config.output_path, &schema)?;

    for month in month_starts(config.start, config.end) {
        // One block per provider, fabricated in parallel
        let blocks = par_blocks(&mut rng, PROVIDERS.len(), |b, block_rng| {
            (0..config.rows_per_provider)
                .map(|_| date_range_row(&schema, &templates, PROVIDERS[b], month, block_rng))
                .collect()
        });

        for row in blocks.iter().flatten() {
            sink.write_row(row)?;
        }
        info!("Month {} done, {} rows written so far...", month.format("%Y-%m"), sink.rows());
    }

    let rows = sink.finish()?;
    info!(
        "Generated {} rows of mock data and saved to {} in {:?}",
        rows,
        config.output_path.display(),
        start.elapsed()
    );

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_billing_fixture(path: &Path, rows: &[(&str, &str)]) {
        let mut w = csv::Writer::from_path(path).unwrap();
        w.write_record(["Id", "BillingPeriodStart", "BillingPeriodEnd", "ProviderName", "BilledCost"])
            .unwrap();
        for (i, &(s, e)) in rows.iter().enumerate() {
            w.write_record([i.to_string().as_str(), s, e, "AWS", "1.00"]).unwrap();
        }
        w.flush().unwrap();
    }

    fn column(headers: &StringRecord, name: &str) -> usize {
        Schema::new(headers).require(name).unwrap()
    }

    #[test]
    fn parses_both_timestamp_shapes() {
        assert!(parse_timestamp("2024-07-01 12:30:00").is_some());
        assert!(parse_timestamp("2024-07-01").is_some());
        assert!(parse_timestamp("July 1st").is_none());
    }

    #[test]
    fn month_starts_cover_the_range() {
        let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();

        assert_eq!(month_starts(d(7, 1), d(12, 31)).len(), 6);
        assert_eq!(month_starts(d(7, 1), d(7, 1)), vec![d(7, 1)]);
        assert_eq!(month_starts(d(1, 31), d(3, 31)), vec![d(1, 31), d(2, 28), d(3, 28)]);
    }

    #[test]
    fn extend_shifts_dates_per_month_and_provider() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("month.csv");
        let output = dir.path().join("extended.csv");
        write_billing_fixture(&input, &[("2024-12-01 00:00:00", "2024-12-31 00:00:00")]);

        let mut config = ExtendConfig::new(&input, &output);
        config.rows_per_provider = 3;
        config.months = 2;
        config.seed = Some(4);
        let report = extend_months(&config).unwrap();

        assert_eq!(report, ExtendReport { rows_written: 2 * 4 * 3, rows_skipped: 0 });

        let (headers, rows) = dataset::load(&output).unwrap();
        let start = column(&headers, BILLING_PERIOD_START);
        let provider = column(&headers, PROVIDER_NAME);
        let mut per_start: HashMap<String, usize> = HashMap::new();
        for r in &rows {
            *per_start.entry(r[start].to_string()).or_default() += 1;
            assert!(PROVIDERS.contains(&&r[provider]));
        }

        assert_eq!(per_start["2024-12-01 00:00:00"], 12);
        assert_eq!(per_start["2024-11-01 00:00:00"], 12);
    }

    #[test]
    fn extend_skips_unparseable_dates() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("month.csv");
        write_billing_fixture(&input, &[("not a date", "2024-12-31 00:00:00")]);

        let mut config = ExtendConfig::new(&input, dir.path().join("out.csv"));
        config.rows_per_provider = 2;
        config.months = 1;
        let report = extend_months(&config).unwrap();

        assert_eq!(report, ExtendReport { rows_written: 0, rows_skipped: 8 });
    }

    #[test]
    fn extend_requires_billing_columns() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("month.csv");
        dataset::tests::write_fixture(&input, 3);

        let config = ExtendConfig::new(&input, dir.path().join("out.csv"));
        assert!(matches!(extend_months(&config), Err(FocusError::MissingColumn(_))));
    }

    #[test]
    fn date_range_emits_every_month_and_provider() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.csv");
        let output = dir.path().join("range.csv");
        write_billing_fixture(&input, &[("2020-01-01 00:00:00", "2020-02-01 00:00:00")]);

        let mut config = DateRangeConfig::new(&input, &output);
        config.start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        config.end = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        config.rows_per_provider = 5;
        config.seed = Some(21);
        assert_eq!(generate_date_range(&config).unwrap(), 3 * 4 * 5);

        let (headers, rows) = dataset::load(&output).unwrap();
        let start = column(&headers, BILLING_PERIOD_START);
        let end = column(&headers, BILLING_PERIOD_END);
        let provider = column(&headers, PROVIDER_NAME);
        let issuer = column(&headers, "InvoiceIssuerName");

        assert_eq!(&rows[0][start], "2024-07-01 00:00:00");
        assert_eq!(&rows[0][end], "2024-08-01 00:00:00");
        assert_eq!(&rows[0][provider], "AWS");
        assert_eq!(&rows[5][provider], "Google Cloud");
        assert_eq!(&rows[59][start], "2024-09-01 00:00:00");
        assert!(rows.iter().all(|r| r[provider] == r[issuer]));
    }

    #[test]
    fn date_range_rejects_inverted_range() {
        let dir = tempdir().unwrap();
        let mut config = DateRangeConfig::new(dir.path().join("in.csv"), dir.path().join("out.csv"));
        config.start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        config.end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert!(matches!(generate_date_range(&config), Err(FocusError::InvalidConfig(_))));
    }
}
