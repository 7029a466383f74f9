use std::path::{Path, PathBuf};

use tracing::debug;

use super::{PipelineError, Stage};
use crate::events::ObjectRef;
use crate::records::{self, DELIVERED_STATUS, Normalization, RecordSet, STATUS_FIELD};
use crate::storage::StorageGateway;

const WORKDIR_PREFIX: &str = "delivery-filter-";

/// Where the source and result documents live between fetch and write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staging {
    /// Bytes are passed straight through memory; nested fields are flattened
    InMemory,
    /// Source and result are staged as files in a per-invocation directory
    /// created under `dir`
    LocalDisk { dir: PathBuf },
}

/// Record counts for a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub input_records: usize,
    pub output_records: usize,
}

fn filter_delivered(
    data: Vec<u8>,
    source: &ObjectRef,
    normalization: Normalization,
) -> Result<(Vec<u8>, FilterSummary), PipelineError> {
    let data = records::decompress_if_needed(data, &source.key)?;
    let mut set = RecordSet::parse(&data, normalization)?;
    let input_records = set.len();

    set.retain_status(STATUS_FIELD, DELIVERED_STATUS);

    let body = set.to_json_bytes().map_err(PipelineError::Serialize)?;

    debug!(
        input_records,
        output_records = set.len(),
        "Filtered records by status"
    );

    Ok((
        body,
        FilterSummary {
            input_records,
            output_records: set.len(),
        },
    ))
}

pub(crate) async fn run_in_memory<S>(
    storage: &S,
    source: &ObjectRef,
    destination: &ObjectRef,
) -> Result<FilterSummary, PipelineError>
where
    S: StorageGateway + ?Sized,
{
    let data = storage
        .get_object(&source.bucket, &source.key)
        .await
        .map_err(PipelineError::Fetch)?;

    let (body, summary) = filter_delivered(data, source, Normalization::Flatten)?;

    storage
        .put_object(&destination.bucket, &destination.key, body)
        .await
        .map_err(PipelineError::Write)?;

    Ok(summary)
}

pub(crate) async fn run_local_disk<S>(
    storage: &S,
    dir: &Path,
    source: &ObjectRef,
    destination: &ObjectRef,
) -> Result<FilterSummary, PipelineError>
where
    S: StorageGateway + ?Sized,
{
    // Removed when dropped at the end of the invocation
    let workdir = tempfile::Builder::new()
        .prefix(WORKDIR_PREFIX)
        .tempdir_in(dir)
        .map_err(|e| PipelineError::Staging {
            stage: Stage::Fetch,
            source: e,
        })?;

    let input_path = workdir.path().join(source.file_name());
    let output_path = workdir.path().join(destination.file_name());

    storage
        .download_to(&source.bucket, &source.key, &input_path)
        .await
        .map_err(PipelineError::Fetch)?;

    debug!(path = %input_path.display(), "Staged source object on disk");

    let data = tokio::fs::read(&input_path)
        .await
        .map_err(|e| PipelineError::Staging {
            stage: Stage::Fetch,
            source: e,
        })?;

    let (body, summary) = filter_delivered(data, source, Normalization::Tabular)?;

    tokio::fs::write(&output_path, body)
        .await
        .map_err(|e| PipelineError::Staging {
            stage: Stage::Write,
            source: e,
        })?;

    storage
        .upload_from(&output_path, &destination.bucket, &destination.key)
        .await
        .map_err(PipelineError::Write)?;

    Ok(summary)
}
