use std::sync::atomic::{AtomicBool, Ordering};

use tracing::instrument;

use crate::backend::{Backend, FileKind};
use crate::entry::{State, UploadEntry};
use crate::errors::Error;
use crate::progress;

/// Byte sentinel for "no upload attempted" outcomes.
pub const NOT_ATTEMPTED: i64 = -1;

/// Cross-task mutable state for one job: the cooperative cancellation flag
/// and the first-recorded failure, "first" meaning first in wall-clock
/// completion order. Everything else is task-local.
pub struct JobControl {
    ignore_failures: bool,
    cancelled: AtomicBool,
    first_failure: std::sync::Mutex<Option<Error>>,
    pub progress: progress::Progress,
}

impl JobControl {
    #[must_use]
    pub fn new(ignore_failures: bool) -> Self {
        Self {
            ignore_failures,
            cancelled: AtomicBool::new(false),
            first_failure: std::sync::Mutex::new(None),
            progress: progress::Progress::new(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn ignore_failures(&self) -> bool {
        self.ignore_failures
    }

    /// Record a per-file failure. Only the first one is retained; when
    /// failures are not ignored it also flips the cancellation flag so that
    /// not-yet-started tasks abort early. In-flight tasks are never
    /// interrupted.
    pub fn note_failure(&self, failure: &Error) {
        let mut first = self.first_failure.lock().unwrap();
        if first.is_none() {
            *first = Some(failure.clone());
            if !self.ignore_failures {
                self.cancelled.store(true, Ordering::Release);
            }
        }
    }

    #[must_use]
    pub fn first_failure(&self) -> Option<Error> {
        self.first_failure.lock().unwrap().clone()
    }
}

/// Result of one upload task, returned to the aggregator over the completion
/// queue. `bytes` follows the upstream convention: bytes written on success,
/// `0` on failure, negative for "not attempted".
#[derive(Debug)]
pub struct Outcome {
    pub entry: UploadEntry,
    pub bytes: i64,
}

/// Clamp the byte-count sentinel to natural numbers so that "not attempted"
/// outcomes never subtract from totals.
#[must_use]
pub fn naturalize(input: i64) -> u64 {
    if input > 0 { input as u64 } else { 0 }
}

/// Execute the copy protocol for one entry.
#[instrument(skip(backend, control, entry), fields(source = ?entry.source()))]
pub async fn upload_entry<B: Backend>(
    backend: &B,
    control: &JobControl,
    mut entry: UploadEntry,
    overwrite: bool,
) -> Outcome {
    let _ops_guard = control.progress.ops.guard();
    // fail fast once the job is being cancelled; the destination is untouched
    if control.is_cancelled() {
        tracing::debug!("job cancelled, not attempting {}", &entry);
        return Outcome {
            entry,
            bytes: NOT_ATTEMPTED,
        };
    }
    // guard against duplicate scheduling
    if !entry.in_state(State::Ready) && !entry.in_state(State::Queued) {
        tracing::warn!("skipping upload of {}", &entry);
        return Outcome {
            entry,
            bytes: NOT_ATTEMPTED,
        };
    }
    entry.mark_started();
    tracing::info!(
        "uploading {:?} to {:?} (size: {})",
        entry.source(),
        entry.dest(),
        bytesize::ByteSize(entry.size())
    );
    match copy_one(backend, &entry, overwrite).await {
        Ok(bytes) => {
            control.progress.files_copied.inc();
            control.progress.bytes_copied.add(bytes);
            entry.mark_finished(State::Succeeded);
            tracing::info!("successful upload of {:?}", entry.source());
            // the sentinel type caps the representable byte count
            Outcome {
                entry,
                bytes: i64::try_from(bytes).unwrap_or(i64::MAX),
            }
        }
        Err(failure) => {
            control.progress.files_failed.inc();
            tracing::warn!("failed to upload {:?}: {}", entry.source(), &failure);
            entry.set_failure(failure.clone());
            entry.mark_finished(State::Failed);
            control.note_failure(&failure);
            // aggregation is by entry state, not by error propagation
            Outcome { entry, bytes: 0 }
        }
    }
}

async fn copy_one<B: Backend>(
    backend: &B,
    entry: &UploadEntry,
    overwrite: bool,
) -> Result<u64, Error> {
    if let Some(kind) = backend.exists(entry.dest()).await?
        && (kind == FileKind::Directory || !overwrite)
    {
        return Err(Error::AlreadyExists {
            path: entry.dest().to_path_buf(),
            kind: kind.describe(),
        });
    }
    backend.copy(entry.source(), entry.dest(), overwrite).await
}
