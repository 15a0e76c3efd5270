//! `docmind upload`: extract a file's text and ingest it.

use std::path::Path;

use anyhow::{Context, Result};
use docmind_core::{PipelineError, Stage};

use crate::config::{Config, Credentials};
use crate::extract::load_document;
use crate::pipeline;

/// Default source identifier: the file name.
pub fn default_source_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn run_upload(
    config: &Config,
    credentials: &Credentials,
    file: &Path,
    source: Option<&str>,
) -> Result<()> {
    let source_id = source
        .map(str::to_string)
        .unwrap_or_else(|| default_source_id(file));

    let text = load_document(file).with_context(|| format!("Cannot upload {}", file.display()))?;
    let ingestor = pipeline::build_ingestor(config, credentials).await?;

    match ingestor.ingest(&source_id, &text).await {
        Ok(result) => {
            println!(
                "Uploaded {}: {} chunks stored",
                source_id, result.chunks_stored
            );
            Ok(())
        }
        Err(e) => {
            let stored = match &e {
                PipelineError::Ingestion { chunks_stored, .. } => *chunks_stored,
                _ => 0,
            };
            if stored > 0 {
                eprintln!(
                    "Warning: {} chunks of {} were stored before the failure",
                    stored, source_id
                );
            }
            Err(anyhow::Error::new(e).context(format!("{} stage failed", Stage::Ingestion)))
        }
    }
}
