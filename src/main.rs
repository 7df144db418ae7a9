// Synthetic FOCUS billing data toolkit
mod cli;
mod dataset;
mod error;
mod extract;
mod fake;
mod focus;
mod generate;
mod months;
mod pq;
mod reduce;
mod validate;

use crate::{
    cli::{Cli, Commands},
    error::FocusError,
    fake::seeded_rng,
    generate::MockConfig,
    months::{DateRangeConfig, ExtendConfig},
    reduce::{ReduceConfig, SizeTargetingSampler},
    validate::{SampleMode, ValidateConfig},
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), FocusError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Reduce {
            input,
            output,
            target_size,
            initial_fraction,
            chunk_size,
            seed,
            temp_dir,
        } => {
            let mut config = ReduceConfig::new(input, output, target_size);
            config.initial_fraction = initial_fraction;
            config.chunk_size = chunk_size;
            config.seed = seed;
            config.temp_dir = temp_dir;

            let report = SizeTargetingSampler::from_config(config).run()?;
            info!(
                "Estimated from {} of {} rows ({} bytes); scaling factor {:.4}, final fraction {:.4}, {} rows / {} bytes written",
                report.estimation_rows,
                report.input_rows,
                report.estimation_bytes,
                report.scaling_factor,
                report.final_fraction,
                report.output_rows,
                report.output_bytes
            );
        }
        Commands::Generate {
            input,
            output,
            rows,
            year,
            seed,
        } => {
            let mut config = MockConfig::new(input, output);
            config.rows = rows;
            config.year = year;
            config.seed = seed;
            generate::generate_mock(&config)?;
        }
        Commands::Extend {
            input,
            output,
            rows_per_provider,
            months,
            chunk_size,
            seed,
        } => {
            let mut config = ExtendConfig::new(input, output);
            config.rows_per_provider = rows_per_provider;
            config.months = months;
            config.chunk_size = chunk_size;
            config.seed = seed;
            months::extend_months(&config)?;
        }
        Commands::DateRange {
            input,
            output,
            start,
            end,
            rows_per_provider,
            seed,
        } => {
            let mut config = DateRangeConfig::new(input, output);
            config.start = start;
            config.end = end;
            config.rows_per_provider = rows_per_provider;
            config.seed = seed;
            months::generate_date_range(&config)?;
        }
        Commands::Extract {
            input,
            output,
            rows,
            seed,
        } => {
            extract::extract_random_rows(&input, &output, rows, &mut seeded_rng(seed))?;
        }
        Commands::Convert { input, output } => {
            pq::convert_csv(&input, &output)?;
        }
        Commands::Validate {
            path,
            sample_size,
            head,
            months,
            seed,
        } => {
            let mut config = ValidateConfig::new(path, chrono::Local::now().naive_local());
            config.sample_size = sample_size;
            config.months = months;
            if head {
                config.mode = SampleMode::Head;
            }

            let report = validate::validate_file(&config, &mut seeded_rng(seed))?;
            if !report.is_valid() {
                return Err(FocusError::ValidationFailed(report.findings()));
            }
            println!("File is valid! ({} of {} rows checked)", report.sampled_rows, report.total_rows);
        }
    }

    Ok(())
}
