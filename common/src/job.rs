use std::sync::Arc;

use tracing::instrument;

use crate::backend::Backend;
use crate::discover;
use crate::entry::State;
use crate::errors;
use crate::pool::{CompletionQueue, WorkerPool};
use crate::schedule;
use crate::upload::{self, JobControl};

pub const DEFAULT_LARGEST: usize = 4;
pub const DEFAULT_THREADS: usize = 16;

/// Tunables for one upload job.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Worker pool width.
    pub threads: usize,
    /// Number of biggest files submitted ahead of the shuffled pass.
    pub largest: usize,
    /// Allow replacing existing destination files.
    pub overwrite: bool,
    /// Do not fail the whole job on per-file errors.
    pub ignore_failures: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            largest: DEFAULT_LARGEST,
            overwrite: true,
            ignore_failures: true,
        }
    }
}

/// Aggregated totals for one job.
#[derive(Copy, Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Summary {
    pub files_discovered: usize,
    pub files_submitted: usize,
    pub bytes_submitted: u64,
    pub files_copied: usize,
    pub bytes_copied: u64,
    pub files_failed: usize,
    pub files_not_attempted: usize,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "files discovered: {}\n\
            files submitted: {}\n\
            bytes submitted: {}\n\
            files copied: {}\n\
            bytes copied: {}\n\
            files failed: {}\n\
            files not attempted: {}",
            self.files_discovered,
            self.files_submitted,
            bytesize::ByteSize(self.bytes_submitted),
            self.files_copied,
            bytesize::ByteSize(self.bytes_copied),
            self.files_failed,
            self.files_not_attempted,
        )
    }
}

/// Error type for upload jobs that preserves the job summary even on failure.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct Error {
    #[source]
    pub source: errors::Error,
    pub summary: Summary,
}

impl Error {
    #[must_use]
    pub fn new(source: errors::Error, summary: Summary) -> Self {
        Error { source, summary }
    }
}

fn internal(error: &anyhow::Error, summary: Summary) -> Error {
    Error::new(errors::Error::Internal(format!("{error:#}")), summary)
}

/// Run one upload job end to end: discover the source tree and prepare the
/// destination on the worker pool, submit the uploads (priority pass then
/// shuffled pass), drain the completion queue exactly once per submission and
/// fold the outcomes into a [Summary].
#[instrument(skip(backend))]
pub async fn run_upload<B: Backend>(
    backend: Arc<B>,
    src_root: &std::path::Path,
    dst_root: &std::path::Path,
    settings: &Settings,
) -> Result<Summary, Error> {
    tracing::info!(
        "uploading from {:?} to {:?}; threads={}; large files={}; overwrite={}, ignore failures={}",
        src_root,
        dst_root,
        settings.threads,
        settings.largest,
        settings.overwrite,
        settings.ignore_failures
    );
    if settings.threads == 0 {
        return Err(Error::new(
            errors::Error::InvalidConfig("worker pool needs at least one thread".to_string()),
            Summary::default(),
        ));
    }
    let pool = WorkerPool::new(settings.threads);
    let control = Arc::new(JobControl::new(settings.ignore_failures));
    // discovery and destination preparation run on the pool itself; it has
    // spare capacity before the uploads start
    let list_rx = pool
        .call(discover::list_files(
            src_root.to_path_buf(),
            dst_root.to_path_buf(),
        ))
        .await
        .map_err(|error| internal(&error, Summary::default()))?;
    let prepare_rx = pool
        .call(prepare_dest(backend.clone(), dst_root.to_path_buf()))
        .await
        .map_err(|error| internal(&error, Summary::default()))?;
    let info = prepare_rx
        .await
        .map_err(|error| internal(&error.into(), Summary::default()))?
        .map_err(|source| Error::new(source, Summary::default()))?;
    tracing::info!("destination prepared: {}", info);
    let mut entries = list_rx
        .await
        .map_err(|error| internal(&error.into(), Summary::default()))?
        .map_err(|source| Error::new(source, Summary::default()))?;
    let mut summary = Summary {
        files_discovered: entries.len(),
        ..Default::default()
    };
    tracing::info!(
        "files to upload = {}; preparation duration = {:?}",
        entries.len(),
        control.progress.get_duration()
    );
    let completion = CompletionQueue::new();
    let submitted = schedule::schedule_uploads(
        &pool,
        &completion,
        &backend,
        &control,
        &mut entries,
        settings.largest,
        settings.overwrite,
    )
    .await
    .map_err(|error| internal(&error, summary))?;
    summary.files_submitted = submitted.files;
    summary.bytes_submitted = submitted.bytes;
    if submitted.files == 0 {
        tracing::info!("no files submitted");
        pool.shutdown().await;
        return Ok(summary);
    }
    // one take per submitted task, in completion order
    tracing::info!("awaiting completion of {} operations", submitted.files);
    for idx in 0..submitted.files {
        let outcome = completion
            .take()
            .await
            .map_err(|error| internal(&error, summary))?;
        let ops = control.progress.ops.get();
        tracing::debug!(
            "operation {} completed, {} in flight: {}",
            idx + 1,
            ops.started - ops.finished,
            &outcome.entry
        );
        summary.bytes_copied += upload::naturalize(outcome.bytes);
        match outcome.entry.state() {
            State::Succeeded => summary.files_copied += 1,
            State::Failed => summary.files_failed += 1,
            _ => summary.files_not_attempted += 1,
        }
    }
    pool.shutdown().await;
    let elapsed = control.progress.get_duration();
    let bytes_copied = control.progress.bytes_copied.get();
    let rate = bytes_copied as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    tracing::info!(
        "uploads completed, duration: {:?}, copied {} files, {} ({}/s)",
        elapsed,
        control.progress.files_copied.get(),
        bytesize::ByteSize(bytes_copied),
        bytesize::ByteSize(rate as u64)
    );
    tracing::info!("number of errors: {}", control.progress.files_failed.get());
    if !settings.ignore_failures
        && let Some(failure) = control.first_failure()
    {
        return Err(Error::new(failure, summary));
    }
    Ok(summary)
}

/// Probe the destination root; missing is fine, anything else readable is
/// reported for logging.
async fn prepare_dest<B: Backend>(
    backend: Arc<B>,
    dst_root: std::path::PathBuf,
) -> Result<String, errors::Error> {
    let found = backend.exists(&dst_root).await?;
    Ok(match found {
        Some(kind) => format!("{} ({} at {dst_root:?})", backend.describe(), kind.describe()),
        None => format!("{} (nothing at {dst_root:?} yet)", backend.describe()),
    })
}
