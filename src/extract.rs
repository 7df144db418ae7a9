// Fixed-count random extraction
use crate::dataset::{self, ChunkReader, CsvSink};
use crate::error::{FocusError, Result};

use rand::Rng;
use std::path::Path;
use tracing::info;

const EXTRACT_CHUNK: usize = 100_000;

/// Copies exactly `rows` uniformly chosen rows of `input` (plus header) to `output`.
pub fn extract_random_rows<R: Rng>(input: &Path, output: &Path, rows: usize, rng: &mut R) -> Result<u64> {
    let reader = ChunkReader::open_bytes(input, EXTRACT_CHUNK)?;
    let headers = reader.headers().clone();
    let (sample, seen) = dataset::reservoir_sample(reader, rows, rng)?;

    if (seen as usize) < rows {
        return Err(FocusError::NotEnoughRows {
            requested: rows,
            available: seen as usize,
        });
    }

    let mut sink = CsvSink::create(output)?;
    sink.write_header(&headers)?;
    for record in &sample {
        sink.write_record(record)?;
    }
    let written = sink.finish()?;
    info!("Extracted {} random rows to {}.", written, output.display());

    Ok(written)
}
