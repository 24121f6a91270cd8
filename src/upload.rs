use crate::errors::{AppError, ResultExt};
use crate::models::{InputRow, PipelineSummary};
use crate::output::OutputSink;
use crate::pipeline::RecordPipeline;
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::Instrument;
use uuid::Uuid;

/// Prefix of every generated output file.
pub const OUTPUT_FILE_PREFIX: &str = "empresas_capital_maior_50000_";

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Result of one completed upload run.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub input_name: String,
    pub output_path: PathBuf,
    pub summary: PipelineSummary,
}

impl UploadReport {
    pub fn output_file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Decodes a semicolon-delimited export without a header row.
///
/// Rows may have any number of fields and stray quotes inside fields are
/// kept. Bytes that are not valid UTF-8 are replaced rather than rejected.
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<InputRow>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows: Vec<InputRow> = Vec::new();
    for (index, result) in reader.byte_records().enumerate() {
        let record = result.map_err(|e| {
            AppError::CsvDecode(format!("Failed to parse CSV row {}: {}", index + 1, e))
        })?;
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }

    Ok(rows)
}

/// `empresas_capital_maior_50000_<YYYYMMDDHHMMSS>.csv`, with `_<n>` before the
/// extension for the n-th attempt after the first.
pub fn output_file_name(started_at: DateTime<Local>, attempt: u32) -> String {
    let stamp = started_at.format("%Y%m%d%H%M%S");
    if attempt <= 1 {
        format!("{}{}.csv", OUTPUT_FILE_PREFIX, stamp)
    } else {
        format!("{}{}_{}.csv", OUTPUT_FILE_PREFIX, stamp, attempt)
    }
}

/// Creates a fresh output file in `dir`, never overwriting an earlier run's.
pub fn create_output(
    dir: &Path,
    started_at: DateTime<Local>,
) -> Result<(PathBuf, OutputSink<File>), AppError> {
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let path = dir.join(output_file_name(started_at, attempt));
        match OutputSink::create_new(&path) {
            Ok(sink) => return Ok((path, sink)),
            Err(_) if path.exists() => continue,
            Err(e) => return Err(e),
        }
    }

    Err(AppError::FileAccess(format!(
        "could not find a free output file name in {}",
        dir.display()
    )))
}

/// Decodes `bytes`, creates the output file and runs the pipeline to completion.
pub async fn process_upload(
    pipeline: &RecordPipeline,
    output_dir: &Path,
    input_name: &str,
    bytes: &[u8],
) -> Result<UploadReport, AppError> {
    let started_at = Local::now();
    let rows = decode_rows(bytes).context(format!("reading {}", input_name))?;

    let (output_path, sink) = create_output(output_dir, started_at)?;
    sink.write_header()
        .context(format!("writing header to {}", output_path.display()))?;

    let span = tracing::info_span!("pipeline_run", run_id = %Uuid::new_v4(), input = %input_name);
    let summary = async {
        tracing::info!("Processing started: {} ({} rows)", input_name, rows.len());
        let summary = pipeline.run(&rows, &sink).await;
        tracing::info!(
            "Processing complete: {} rows, {} lookups, {} written, {} skipped. Results saved to: {}",
            summary.rows,
            summary.lookups,
            summary.written,
            summary.skipped(),
            output_path.display()
        );
        let cached = pipeline.cache().entry_count().await;
        tracing::debug!("Run summary: {:?}; dedup cache holds {} entries", summary, cached);
        summary
    }
    .instrument(span)
    .await;

    Ok(UploadReport {
        input_name: input_name.to_string(),
        output_path,
        summary,
    })
}

/// Reads a CSV file from disk and processes it like an upload.
pub async fn process_file(
    pipeline: &RecordPipeline,
    output_dir: &Path,
    input: &Path,
) -> Result<UploadReport, AppError> {
    let bytes = tokio::fs::read(input).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::FileAccess(format!("{} not found", input.display())),
        _ => AppError::FileAccess(format!("reading {}: {}", input.display(), e)),
    })?;

    let input_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    process_upload(pipeline, output_dir, &input_name, &bytes).await
}
