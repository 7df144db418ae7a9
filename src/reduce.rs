// Size-targeting downsampler
use crate::dataset::{self, ChunkReader, CsvSink};
use crate::error::{FocusError, Result};
use crate::fake::seeded_rng;

use rand::{Rng, SeedableRng, rngs::SmallRng};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_INITIAL_FRACTION: f64 = 0.1;
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;
pub const TEMP_PREFIX: &str = "focus-sample-";

#[derive(Debug, Clone)]
pub struct ReduceConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub target_size_bytes: u64,
    pub initial_fraction: f64,
    pub chunk_size: usize,
    /// Unset means the sampler is seeded from OS entropy.
    pub seed: Option<u64>,
    /// Where the estimation file goes; defaults to the output's directory.
    pub temp_dir: Option<PathBuf>,
}

impl ReduceConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>, target_size_bytes: u64) -> Self {
        ReduceConfig {
            input_path: input_path.into(),
            output_path: output_path.into(),
            target_size_bytes,
            initial_fraction: DEFAULT_INITIAL_FRACTION,
            chunk_size: DEFAULT_CHUNK_SIZE,
            seed: None,
            temp_dir: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_fraction) {
            return Err(FocusError::InvalidConfig(format!(
                "initial fraction must be within [0, 1], got {}",
                self.initial_fraction
            )));
        }
        if self.target_size_bytes == 0 {
            return Err(FocusError::InvalidConfig("target size must be positive".into()));
        }
        if self.chunk_size == 0 {
            return Err(FocusError::InvalidConfig("chunk size must be positive".into()));
        }
        if same_file(&self.input_path, &self.output_path) {
            return Err(FocusError::InvalidConfig(format!(
                "output {} would overwrite the input",
                self.output_path.display()
            )));
        }
        Ok(())
    }

    fn temp_dir(&self) -> PathBuf {
        match &self.temp_dir {
            Some(dir) => dir.clone(),
            None => match self.output_path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReduceReport {
    pub input_rows: u64,
    pub estimation_rows: u64,
    pub estimation_bytes: u64,
    pub scaling_factor: f64,
    pub final_fraction: f64,
    pub output_rows: u64,
    pub output_bytes: u64,
}

/// Two-pass sampler: estimate bytes per retained row, then resample to hit a target size.
///
/// The output only approximates the target. Without a seed, two runs over the
/// same input keep different rows.
pub struct SizeTargetingSampler<R: Rng> {
    config: ReduceConfig,
    rng: R,
}

impl SizeTargetingSampler<SmallRng> {
    pub fn from_config(config: ReduceConfig) -> Self {
        let rng = seeded_rng(config.seed);
        SizeTargetingSampler::new(config, rng)
    }
}

impl<R: Rng> SizeTargetingSampler<R> {
    pub fn new(config: ReduceConfig, rng: R) -> Self {
        SizeTargetingSampler { config, rng }
    }

    pub fn run(self) -> Result<ReduceReport> {
        let SizeTargetingSampler { config, mut rng } = self;
        config.validate()?;
        let start = Instant::now();

        // One child generator per pass so each pass replays on its own under a seed
        let mut estimate_rng = SmallRng::from_rng(&mut rng);
        let mut final_rng = SmallRng::from_rng(&mut rng);

        // Pass 1 : estimation sample into a temporary file
        info!(
            "Sampling {} at fraction {} for size estimation",
            config.input_path.display(),
            config.initial_fraction
        );
        let temp_dir = config.temp_dir();
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".csv")
            .tempfile_in(&temp_dir)
            .map_err(|e| FocusError::output(&temp_dir, e))?;

        let mut sink = CsvSink::from_writer(temp.path(), BufWriter::new(temp.as_file()));
        let (input_rows, estimation_rows) = sample_pass(
            &config.input_path,
            config.chunk_size,
            config.initial_fraction,
            &mut sink,
            &mut estimate_rng,
        )?;
        sink.finish()?;

        let estimation_bytes = temp
            .as_file()
            .metadata()
            .map_err(|e| FocusError::output(temp.path(), e))?
            .len();
        info!("Temporary file size: {:.2} GB", gib(estimation_bytes));

        let temp_path = temp.path().to_path_buf();
        if let Err(e) = temp.close() {
            warn!("Failed to remove {}: {e}", temp_path.display());
        }

        if estimation_rows == 0 {
            return Err(FocusError::EmptySample {
                fraction: config.initial_fraction,
                rows: estimation_rows,
            });
        }

        let scaling_factor = config.target_size_bytes as f64 / estimation_bytes as f64;
        let input_bytes = dataset::file_size(&config.input_path)?;
        // Header bytes skew the estimate near full size
        let fraction = if config.target_size_bytes >= input_bytes {
            1.0
        } else {
            final_fraction(config.initial_fraction, config.target_size_bytes, estimation_bytes)?
        };
        info!("Adjusted sampling fraction: {:.4}", fraction);
        if fraction >= 1.0 {
            debug!("Target {} covers the input ({} bytes); keeping every row", config.target_size_bytes, input_bytes);
        }

        // Pass 2 : final output
        let mut out = CsvSink::create(&config.output_path)?;
        let (_, output_rows) = sample_pass(
            &config.input_path,
            config.chunk_size,
            fraction,
            &mut out,
            &mut final_rng,
        )?;
        out.finish()?;

        let output_bytes = dataset::file_size(&config.output_path)?;
        info!(
            "Reduced file saved to {} ({} of {} rows, {:.2} GB) in {:?}",
            config.output_path.display(),
            output_rows,
            input_rows,
            gib(output_bytes),
            start.elapsed()
        );

        Ok(ReduceReport {
            input_rows,
            estimation_rows,
            estimation_bytes,
            scaling_factor,
            final_fraction: fraction,
            output_rows,
            output_bytes,
        })
    }
}

/// `initial × target / measured`, capped at 1.0.
pub fn final_fraction(initial_fraction: f64, target_size_bytes: u64, measured_bytes: u64) -> Result<f64> {
    if measured_bytes == 0 {
        return Err(FocusError::EmptySample {
            fraction: initial_fraction,
            rows: 0,
        });
    }
    let scaling_factor = target_size_bytes as f64 / measured_bytes as f64;

    Ok((initial_fraction * scaling_factor).min(1.0))
}

/// Positions of the rows kept from a chunk of `n`, in input order.
///
/// Keeps `floor(fraction × n)` rows plus one more with probability equal to the
/// remainder, so the expected count is `fraction × n` whatever the chunk size.
pub fn sample_indices<R: Rng>(rng: &mut R, n: usize, fraction: f64) -> Vec<usize> {
    let expected = fraction.clamp(0.0, 1.0) * n as f64;
    let whole = expected.floor();
    let extra = usize::from(rng.random_bool(expected - whole));
    let k = (whole as usize + extra).min(n);
    if k == n {
        return (0..n).collect();
    }

    let mut idx = rand::seq::index::sample(rng, n, k).into_vec();
    idx.sort_unstable();
    idx
}

/// Streams `input` once, writing its header and an independent per-chunk sample.
///
/// Returns (rows read, rows written).
fn sample_pass<W: Write, R: Rng>(
    input: &Path,
    chunk_size: usize,
    fraction: f64,
    sink: &mut CsvSink<W>,
    rng: &mut R,
) -> Result<(u64, u64)> {
    let mut reader = ChunkReader::open_bytes(input, chunk_size)?;
    sink.write_header(reader.headers())?;

    let mut written: u64 = 0;
    for (n, chunk) in reader.by_ref().enumerate() {
        let chunk = chunk?;
        let keep = sample_indices(rng, chunk.len(), fraction);
        for &i in &keep {
            sink.write_record(&chunk[i])?;
        }
        written += keep.len() as u64;
        debug!("Chunk {} : kept {} of {} rows", n + 1, keep.len(), chunk.len());
    }

    Ok((reader.rows_read(), written))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}
