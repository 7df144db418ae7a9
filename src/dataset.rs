// CSV I/O shared by every subcommand
use crate::error::{FocusError, Result};
use crate::focus::{Row, Schema};
use csv::{ByteRecord, Reader, StringRecord, Writer};
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Record types a [`ChunkReader`] can yield.
pub trait CsvRecord: Clone + Default {
    fn read_headers(reader: &mut Reader<File>) -> csv::Result<Self>;
    fn read_next(reader: &mut Reader<File>, record: &mut Self) -> csv::Result<bool>;
}

impl CsvRecord for StringRecord {
    fn read_headers(reader: &mut Reader<File>) -> csv::Result<Self> {
        reader.headers().cloned()
    }

    fn read_next(reader: &mut Reader<File>, record: &mut Self) -> csv::Result<bool> {
        reader.read_record(record)
    }
}

// Fields are never decoded, so any byte content passes through
impl CsvRecord for ByteRecord {
    fn read_headers(reader: &mut Reader<File>) -> csv::Result<Self> {
        reader.byte_headers().cloned()
    }

    fn read_next(reader: &mut Reader<File>, record: &mut Self) -> csv::Result<bool> {
        reader.read_byte_record(record)
    }
}

/// Streams a CSV file in fixed-size chunks of records.
pub struct ChunkReader<T: CsvRecord = StringRecord> {
    path: PathBuf,
    reader: Reader<File>,
    headers: T,
    chunk_size: usize,
    rows_read: u64,
    done: bool,
}

impl ChunkReader {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        ChunkReader::open_with(path, chunk_size)
    }
}

impl ChunkReader<ByteRecord> {
    /// Like [`ChunkReader::open`], but fields stay raw bytes.
    pub fn open_bytes(path: &Path, chunk_size: usize) -> Result<Self> {
        ChunkReader::open_with(path, chunk_size)
    }
}

impl<T: CsvRecord> ChunkReader<T> {
    fn open_with(path: &Path, chunk_size: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| FocusError::input(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);
        let headers = T::read_headers(&mut reader).map_err(|e| FocusError::malformed(path, e))?;

        Ok(ChunkReader {
            path: path.to_path_buf(),
            reader,
            headers,
            chunk_size: chunk_size.max(1),
            rows_read: 0,
            done: false,
        })
    }

    pub fn headers(&self) -> &T {
        &self.headers
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn read_chunk(&mut self) -> Result<Vec<T>> {
        let mut chunk = Vec::with_capacity(self.chunk_size.min(64 * 1024));
        let mut record = T::default();

        while chunk.len() < self.chunk_size {
            let more = T::read_next(&mut self.reader, &mut record)
                .map_err(|e| FocusError::malformed(&self.path, e))?;
            if !more {
                self.done = true;
                break;
            }
            chunk.push(record.clone());
        }
        self.rows_read += chunk.len() as u64;

        Ok(chunk)
    }
}

impl<T: CsvRecord> Iterator for ChunkReader<T> {
    type Item = Result<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(chunk) if chunk.is_empty() => None,
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Reads a whole (small) CSV file, e.g. a template sample.
pub fn load(path: &Path) -> Result<(StringRecord, Vec<StringRecord>)> {
    let mut reader = ChunkReader::open(path, usize::MAX)?;
    let headers = reader.headers().clone();
    let rows = reader.next().transpose()?.unwrap_or_default();

    Ok((headers, rows))
}

/// CSV writer that tags every failure with its destination path.
pub struct CsvSink<W: Write> {
    path: PathBuf,
    writer: Writer<W>,
    rows: u64,
}

impl CsvSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| FocusError::output(path, e))?;
        Ok(CsvSink::from_writer(path, BufWriter::new(file)))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(path: &Path, inner: W) -> Self {
        CsvSink {
            path: path.to_path_buf(),
            writer: Writer::from_writer(inner),
            rows: 0,
        }
    }

    pub fn write_header<I, T>(&mut self, header: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(header)
            .map_err(|e| FocusError::output(&self.path, e))
    }

    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(record)
            .map_err(|e| FocusError::output(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.writer
            .write_record(row.fields())
            .map_err(|e| FocusError::output(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes all buffered output and returns the data row count.
    pub fn finish(self) -> Result<u64> {
        let path = self.path;
        let mut inner = self
            .writer
            .into_inner()
            .map_err(|e| FocusError::output(&path, e.into_error()))?;
        inner.flush().map_err(|e| FocusError::output(&path, e))?;
        Ok(self.rows)
    }
}

impl CsvSink<BufWriter<File>> {
    pub fn with_schema(path: &Path, schema: &Schema) -> Result<Self> {
        let mut sink = CsvSink::create(path)?;
        sink.write_header(schema.headers())?;
        Ok(sink)
    }
}

/// Uniform sample of exactly `n` records in one pass (Algorithm R).
///
/// Returns the reservoir together with the number of records seen.
pub fn reservoir_sample<T: CsvRecord, R: Rng>(
    reader: ChunkReader<T>,
    n: usize,
    rng: &mut R,
) -> Result<(Vec<T>, u64)> {
    let mut reservoir: Vec<T> = Vec::with_capacity(n);
    let mut seen: u64 = 0;

    for chunk in reader {
        for record in chunk? {
            seen += 1;
            if reservoir.len() < n {
                reservoir.push(record);
            } else {
                let j = rng.random_range(0..seen);
                if (j as usize) < n {
                    reservoir[j as usize] = record;
                }
            }
        }
    }

    Ok((reservoir, seen))
}

pub fn file_size(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| FocusError::input(path, e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use std::collections::HashSet;
    use tempfile::tempdir;

    /// Writes `rows` records of the form `id,name,cost`.
    pub(crate) fn write_fixture(path: &Path, rows: usize) {
        let mut w = csv::Writer::from_path(path).unwrap();
        w.write_record(["Id", "ResourceName", "BilledCost"]).unwrap();
        for i in 0..rows {
            w.write_record([i.to_string(), format!("resource-{i:06}"), format!("{:.4}", i as f64 / 7.0)])
                .unwrap();
        }
        w.flush().unwrap();
    }

    #[test]
    fn chunks_cover_every_row_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        write_fixture(&path, 25);

        let reader = ChunkReader::open(&path, 10).unwrap();
        let sizes: Vec<usize> = reader.map(|c| c.unwrap().len()).collect();

        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn missing_input_is_reported_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.csv");

        match ChunkReader::open(&path, 10) {
            Err(FocusError::InputNotFound { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected InputNotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn reservoir_draws_distinct_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        write_fixture(&path, 500);
        let mut rng = SmallRng::seed_from_u64(7);

        let (rows, seen) = reservoir_sample(ChunkReader::open(&path, 64).unwrap(), 50, &mut rng).unwrap();
        let ids: HashSet<&str> = rows.iter().map(|r| &r[0]).collect();

        assert_eq!(seen, 500);
        assert_eq!(rows.len(), 50);
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn byte_chunks_keep_non_utf8_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        std::fs::write(&path, b"Id,Name\n1,caf\xe9\n2,plain\n").unwrap();

        let rows: Vec<ByteRecord> = ChunkReader::open_bytes(&path, 10)
            .unwrap()
            .flat_map(|c| c.unwrap())
            .collect();
        assert_eq!(&rows[0][1], b"caf\xe9");

        let strict = ChunkReader::open(&path, 10).unwrap().next().unwrap();
        assert!(matches!(strict, Err(FocusError::MalformedInput { .. })));
    }

    #[test]
    fn sink_counts_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.write_header(["a", "b"]).unwrap();
        sink.write_record(&StringRecord::from(vec!["1", "2"])).unwrap();

        assert_eq!(sink.finish().unwrap(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,2\n");
    }
}
