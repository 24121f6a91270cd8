use crate::errors::{AppError, ResultExt};
use crate::models::{OutputRecord, OUTPUT_HEADER};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Ordered CSV writer for one pipeline run.
///
/// Appends go through a lock owned by the sink and every append is flushed,
/// so rows never interleave and partial progress survives a crash.
pub struct OutputSink<W: Write> {
    writer: Mutex<csv::Writer<W>>,
}

impl OutputSink<File> {
    /// Creates `path`, refusing to overwrite an existing file.
    pub fn create_new(path: &Path) -> Result<Self, AppError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("creating output file {}", path.display()))?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> OutputSink<W> {
    pub fn from_writer(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Writes the fixed column header. Called once, before any append.
    pub fn write_header(&self) -> Result<(), AppError> {
        self.write_fields(&OUTPUT_HEADER)
    }

    pub fn append(&self, record: &OutputRecord) -> Result<(), AppError> {
        self.write_fields(&record.to_fields())
    }

    fn write_fields<T: AsRef<[u8]>>(&self, fields: &[T]) -> Result<(), AppError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AppError::OutputWrite("output writer lock poisoned".to_string()))?;

        writer
            .write_record(fields)
            .map_err(|e| AppError::OutputWrite(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| AppError::OutputWrite(e.to_string()))
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, AppError> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| AppError::OutputWrite("output writer lock poisoned".to_string()))?;
        writer
            .into_inner()
            .map_err(|e| AppError::OutputWrite(e.to_string()))
    }
}
