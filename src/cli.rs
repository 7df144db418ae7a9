use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "focus-mock", version, about = "Synthetic FOCUS billing data toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Downsample a CSV to approximately a target size
    Reduce {
        #[arg(long, default_value = "focus-data-full.csv")]
        input: PathBuf,

        #[arg(long, default_value = "mock-data-reduced.csv")]
        output: PathBuf,

        #[arg(
            long,
            default_value = "1.5GiB",
            value_parser = parse_byte_size,
            help = "Target output size in bytes; accepts KB, KiB, MB, MiB, GB, GiB suffixes"
        )]
        target_size: u64,

        #[arg(long, default_value_t = 0.1, help = "Starting guess for the sampling fraction")]
        initial_fraction: f64,

        #[arg(long, default_value_t = 1_000_000, help = "Rows per streaming chunk")]
        chunk_size: usize,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, help = "Directory for the estimation file (defaults to the output's)")]
        temp_dir: Option<PathBuf>,
    },
    /// Fabricate mock rows from random template rows
    Generate {
        #[arg(long, default_value = "focus_sample-data-new.csv")]
        input: PathBuf,

        #[arg(long, default_value = "focus-mock-data-1M.csv")]
        output: PathBuf,

        #[arg(long, default_value_t = 1_000_000)]
        rows: usize,

        #[arg(long, default_value_t = 2024, help = "Year the generated timestamps fall in")]
        year: i32,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Replicate one month of data across several months and every provider
    Extend {
        #[arg(long, default_value = "focus-data-full.csv")]
        input: PathBuf,

        #[arg(long, default_value = "mock-data-6-months.csv")]
        output: PathBuf,

        #[arg(long, default_value_t = 1_000)]
        rows_per_provider: usize,

        #[arg(long, default_value_t = 6)]
        months: u32,

        #[arg(long, default_value_t = 10_000)]
        chunk_size: usize,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate rows for every month of a date range and every provider
    DateRange {
        #[arg(long, default_value = "focus_sample_data.csv")]
        input: PathBuf,

        #[arg(long, default_value = "mock_data_with_custom_date_range.csv")]
        output: PathBuf,

        #[arg(long, default_value = "2023-07-01", help = "First month, YYYY-MM-DD")]
        start: NaiveDate,

        #[arg(long, default_value = "2023-12-31", help = "Last day, YYYY-MM-DD")]
        end: NaiveDate,

        #[arg(long, default_value_t = 5_000)]
        rows_per_provider: usize,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Copy a fixed number of random rows into a new file
    Extract {
        #[arg(long, default_value = "focus-data-full.csv")]
        input: PathBuf,

        #[arg(long, default_value = "random_sample.csv")]
        output: PathBuf,

        #[arg(long, default_value_t = 1_000)]
        rows: usize,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Convert a CSV file to Parquet with string columns
    Convert {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },
    /// Check columns, billing dates and provider coverage of a generated file
    Validate {
        #[arg(long, default_value = "mock-data-6-months.csv")]
        path: PathBuf,

        #[arg(long, default_value_t = 1_000)]
        sample_size: usize,

        #[arg(long, help = "Check the first rows instead of a random sample")]
        head: bool,

        #[arg(long, default_value_t = 6)]
        months: u32,

        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Parses `1500`, `200MB`, `1.5GiB` and similar into a byte count.
pub fn parse_byte_size(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let number: f64 = number
        .parse()
        .map_err(|_| format!("invalid size '{value}'"))?;
    let multiplier: f64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "kb" => 1e3,
        "kib" => 1024.0,
        "mb" => 1e6,
        "mib" => 1024f64.powi(2),
        "gb" => 1e9,
        "gib" => 1024f64.powi(3),
        other => return Err(format!("unknown size unit '{other}'")),
    };

    let bytes = number * multiplier;
    if !bytes.is_finite() || bytes < 1.0 {
        return Err(format!("size '{value}' must be at least one byte"));
    }
    Ok(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_byte_sizes() {
        assert_eq!(parse_byte_size("1500"), Ok(1500));
        assert_eq!(parse_byte_size("200MB"), Ok(200_000_000));
        assert_eq!(parse_byte_size("1.5GiB"), Ok(1_610_612_736));
        assert_eq!(parse_byte_size("64 KiB"), Ok(65_536));
        assert!(parse_byte_size("12 parsecs").is_err());
        assert!(parse_byte_size("0").is_err());
    }

    #[test]
    fn reduce_defaults_match_the_documented_ones() {
        let cli = Cli::try_parse_from(["focus-mock", "reduce"]).unwrap();
        match cli.command {
            Commands::Reduce {
                target_size,
                initial_fraction,
                chunk_size,
                seed,
                ..
            } => {
                assert_eq!(target_size, 1_610_612_736);
                assert_eq!(initial_fraction, 0.1);
                assert_eq!(chunk_size, 1_000_000);
                assert_eq!(seed, None);
            }
            _ => panic!("expected reduce"),
        }
    }
}
