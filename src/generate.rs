// Mock row generation from sample templates
use crate::dataset::{self, CsvSink};
use crate::error::{FocusError, Result};
use crate::fake::{Faker, seeded_rng};
use crate::focus::{Row, Schema};

use csv::StringRecord;
use rand::{Rng, RngCore, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Rows fabricated per parallel block.
pub const BLOCK_ROWS: usize = 10_000;

/// Columns overwritten on every mock row.
pub const MOCK_COLUMNS: [&str; 36] = [
    "AvailabilityZone", "BilledCost", "BillingAccountId", "BillingAccountName", "BillingCurrency",
    "BillingPeriodEnd", "BillingPeriodStart", "ChargeCategory", "ChargeDescription", "ChargeFrequency",
    "ChargePeriodEnd", "ChargePeriodStart", "ConsumedQuantity", "ConsumedUnit", "ContractedCost",
    "EffectiveCost", "InvoiceIssuerName", "ListCost", "ListUnitPrice", "PricingCategory",
    "PricingQuantity", "PricingUnit", "ProviderName", "PublisherName", "RegionId", "RegionName",
    "ResourceId", "ResourceName", "ResourceType", "ServiceCategory", "ServiceName", "SkuId",
    "SkuPriceId", "SubAccountId", "SubAccountName", "Tags",
];

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub rows: usize,
    /// Year the billing and charge timestamps fall in.
    pub year: i32,
    pub seed: Option<u64>,
}

impl MockConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        MockConfig {
            input_path: input_path.into(),
            output_path: output_path.into(),
            rows: 1_000_000,
            year: 2024,
            seed: None,
        }
    }
}

/// Loads a template file, failing if it has no data rows.
pub fn load_templates(path: &Path) -> Result<(StringRecord, Vec<StringRecord>)> {
    let (headers, rows) = dataset::load(path)?;
    if rows.is_empty() {
        return Err(FocusError::EmptyInput(path.to_path_buf()));
    }
    Ok((headers, rows))
}

/// Runs `fill` over `n_blocks` blocks in parallel, each with its own RNG drawn from `rng`.
///
/// Block order in the result is the block index order, so output is fixed for a fixed seed.
pub fn par_blocks<R, F>(rng: &mut R, n_blocks: usize, fill: F) -> Vec<Vec<Row>>
where
    R: RngCore,
    F: Fn(usize, &mut SmallRng) -> Vec<Row> + Sync,
{
    let seeds: Vec<u64> = (0..n_blocks).map(|_| rng.next_u64()).collect();

    seeds
        .into_par_iter()
        .enumerate()
        .map(|(block, seed)| {
            let mut block_rng = SmallRng::seed_from_u64(seed);
            fill(block, &mut block_rng)
        })
        .collect()
}

/// Copies a random template and overwrites every mock column.
pub fn mock_row<R: Rng>(schema: &Schema, templates: &[StringRecord], year: i32, rng: &mut R) -> Row {
    let template = &templates[rng.random_range(0..templates.len())];
    let mut row = schema.row_from(template);
    let mut fake = Faker::new(rng);

    let zones = ["us-east-1", "us-west-2", "eu-central-1"];
    let units = ["Requests", "GB", "Hours"];

    row.set(schema, "AvailabilityZone", fake.element(&zones));
    row.set(schema, "BilledCost", fake.amount(0.0, 1.0, 10));
    row.set(schema, "BillingAccountId", fake.digits(13));
    row.set(schema, "BillingAccountName", fake.company());
    row.set(schema, "BillingCurrency", "USD");
    row.set(schema, "BillingPeriodEnd", fake.date_time_in_year(year));
    row.set(schema, "BillingPeriodStart", fake.date_time_in_year(year));
    row.set(schema, "ChargeCategory", "Usage");
    row.set(schema, "ChargeDescription", fake.sentence(6));
    row.set(schema, "ChargeFrequency", "Usage-Based");
    row.set(schema, "ChargePeriodEnd", fake.date_time_in_year(year));
    row.set(schema, "ChargePeriodStart", fake.date_time_in_year(year));
    row.set(schema, "ConsumedQuantity", fake.amount(0.0, 10.0, 10));
    row.set(schema, "ConsumedUnit", fake.element(&units));
    row.set(schema, "ContractedCost", fake.amount(0.0, 1.0, 10));
    row.set(schema, "EffectiveCost", fake.amount(0.0, 1.0, 10));
    row.set(schema, "InvoiceIssuerName", "Amazon Web Services, Inc.");
    row.set(schema, "ListCost", fake.amount(0.0, 1.0, 10));
    row.set(schema, "ListUnitPrice", fake.amount(0.0, 1.0, 10));
    row.set(schema, "PricingCategory", "Standard");
    row.set(schema, "PricingQuantity", fake.amount(0.0, 10.0, 10));
    row.set(schema, "PricingUnit", fake.element(&units));
    row.set(schema, "ProviderName", "AWS");
    row.set(schema, "PublisherName", "Amazon Web Services, Inc.");
    row.set(schema, "RegionId", fake.element(&["us-west-2", "us-east-1", "eu-central-1"]));
    row.set(
        schema,
        "RegionName",
        fake.element(&["US West (Oregon)", "US East (N. Virginia)", "EU (Frankfurt)"]),
    );
    row.set(schema, "ResourceId", fake.uuid());
    row.set(schema, "ResourceName", fake.word());
    row.set(schema, "ResourceType", fake.element(&["Compute", "Storage", "Networking"]));
    row.set(schema, "ServiceCategory", fake.element(&["Integration", "Compute", "Storage"]));
    row.set(
        schema,
        "ServiceName",
        fake.element(&[
            "Amazon Simple Queue Service",
            "Elastic Load Balancing",
            "Amazon Elastic Compute Cloud",
        ]),
    );
    row.set(schema, "SkuId", fake.uuid());
    row.set(schema, "SkuPriceId", fake.uuid());
    row.set(schema, "SubAccountId", fake.digits(11));
    row.set(schema, "SubAccountName", fake.company());
    row.set(schema, "Tags", fake.tags());

    row
}

/// Writes `config.rows` mock rows built from random templates. Returns the row count.
pub fn generate_mock(config: &MockConfig) -> Result<u64> {
    let start = Instant::now();
    let (headers, templates) = load_templates(&config.input_path)?;
    let schema = Schema::new(&headers).with_columns(&MOCK_COLUMNS);
    let mut rng = seeded_rng(config.seed);

    info!(
        "Generating {} mock rows from {} templates",
        config.rows,
        templates.len()
    );

    let mut sink = CsvSink::with_schema(&config.output_path, &schema)?;
    let n_blocks = config.rows.div_ceil(BLOCK_ROWS);

    // Bound memory: fabricate a batch of blocks in parallel, then write it out
    let para_limit = rayon::current_num_threads().max(1);
    let mut done_blocks = 0;
    while done_blocks < n_blocks {
        let batch = para_limit.min(n_blocks - done_blocks);
        let blocks = par_blocks(&mut rng, batch, |b, block_rng| {
            let first = (done_blocks + b) * BLOCK_ROWS;
            let len = BLOCK_ROWS.min(config.rows - first);
            (0..len)
                .map(|_| mock_row(&schema, &templates, config.year, block_rng))
                .collect()
        });

        for row in blocks.iter().flatten() {
            sink.write_row(row)?;
        }
        done_blocks += batch;
        info!("Written {} rows so far...", sink.rows());
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
