//! CSV append sink.

use std::fs::OpenOptions;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Delivery, Sink, SinkContext};
use crate::error::SinkError;

/// Appends one row of field values per submission.
#[derive(Default)]
pub struct CsvSink {
    // Serializes appends from concurrent requests.
    write_lock: Mutex<()>,
}

impl CsvSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Sink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn deliver(&self, ctx: &SinkContext<'_>) -> Result<Delivery, SinkError> {
        if !ctx.params.get_bool("CSV.enabled", false) {
            return Ok(Delivery::Skipped("CSV.enabled is false"));
        }
        let Some(path) = ctx.params.get_path("CSV.path") else {
            return Ok(Delivery::Skipped("CSV.path not set"));
        };

        let header: Option<Vec<String>> = ctx
            .params
            .get_bool("CSV.headers", false)
            .then(|| ctx.submission.csv_header().into_iter().map(str::to_string).collect());
        let row: Vec<String> = ctx.submission.csv_row().into_iter().map(str::to_string).collect();

        let _guard = self.write_lock.lock().await;
        let target = path.clone();
        tokio::task::spawn_blocking(move || append_row(&target, header.as_deref(), &row))
            .await
            .map_err(|e| SinkError::SendFailed {
                sink: "csv".into(),
                reason: format!("CSV task panicked: {e}"),
            })??;

        tracing::debug!(path = %path.display(), "Appended CSV row");
        Ok(Delivery::Delivered)
    }
}

/// Append `row` to the file at `path`, writing `header` first if the file is empty.
pub fn append_row(path: &Path, header: Option<&[String]>, row: &[String]) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
    if is_empty && let Some(header) = header {
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}
