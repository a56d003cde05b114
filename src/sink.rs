use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::{write::GzEncoder, Compression};
use ulid::Ulid;

use crate::error::{Error, FailureReason, SinkError};
use crate::extract::ExtractedRecord;
use crate::request::RequestSpec;

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn store(&self, record: &ExtractedRecord) -> Result<(), SinkError>;
}

#[async_trait]
pub trait FailureReporter: Send + Sync {
    async fn notify(&self, request: &RequestSpec, reason: &FailureReason);
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct DatasetOptions {
    pub output_path: PathBuf,
    pub gzip: bool,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            output_path: "./storage/datasets/default".into(),
            gzip: true,
        }
    }
}

/// Writes one JSON document per record into a directory.
#[derive(Debug)]
pub struct DatasetSink {
    output_path: PathBuf,
    gzip: bool,
}

impl DatasetSink {
    pub fn new(options: DatasetOptions) -> Result<Self, Error> {
        let DatasetOptions { output_path, gzip } = options;
        std::fs::create_dir_all(&output_path)?;
        let output_path = output_path.canonicalize()?;
        tracing::info!(gzip, "configuring dataset {:?}", output_path);
        Ok(Self { output_path, gzip })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn encode(&self, record: &ExtractedRecord) -> Result<Vec<u8>, SinkError> {
        let json = serde_json::to_vec(record)?;
        if !self.gzip {
            return Ok(json);
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }
}

#[async_trait]
impl ResultSink for DatasetSink {
    #[tracing::instrument(skip(self, record), fields(url = %record.source_url))]
    async fn store(&self, record: &ExtractedRecord) -> Result<(), SinkError> {
        let extension = if self.gzip { "json.gz" } else { "json" };
        let path = self
            .output_path
            .join(format!("{}.{}", Ulid::new(), extension));
        let bytes = self.encode(record)?;
        tracing::debug!("creating file {:?}", path);
        tokio::fs::write(&path, bytes).await.map_err(|err| {
            tracing::error!("failed creating file='{}'", path.display());
            err
        })?;
        Ok(())
    }
}

/// Reports failed requests through `tracing`.
#[derive(Debug, Default)]
pub struct LogFailureReporter;

#[async_trait]
impl FailureReporter for LogFailureReporter {
    async fn notify(&self, request: &RequestSpec, reason: &FailureReason) {
        tracing::warn!(
            url = request.url(),
            method = request.method(),
            "request failed: {}",
            reason
        );
    }
}
