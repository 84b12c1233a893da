use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::backend::Backend;
use crate::entry::UploadEntry;
use crate::pool::{CompletionQueue, WorkerPool};
use crate::upload::{self, JobControl, Outcome};

/// What the scheduler actually handed to the pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct Submitted {
    pub files: usize,
    pub bytes: u64,
}

/// Submit the uploads in two passes: the `largest` biggest files first, in
/// descending size order, so the longest transfers never become a tail
/// latency bottleneck; then the whole list shuffled, which only picks up the
/// still-`ready` remainder but in an order that does not mirror the original
/// directory listing.
pub async fn schedule_uploads<B: Backend>(
    pool: &WorkerPool,
    completion: &CompletionQueue<Outcome>,
    backend: &Arc<B>,
    control: &Arc<JobControl>,
    entries: &mut [UploadEntry],
    largest: usize,
    overwrite: bool,
) -> anyhow::Result<Submitted> {
    // reverse sort to get the largest first; stable, so listing order breaks ties
    entries.sort_by(|a, b| b.size().cmp(&a.size()));
    let priority_count = largest.min(entries.len());
    let mut submitted = Submitted::default();
    for (idx, entry) in entries.iter_mut().take(priority_count).enumerate() {
        tracing::info!(
            "large file {}: size = {}: {:?}",
            idx + 1,
            bytesize::ByteSize(entry.size()),
            entry.source()
        );
        if let Some(size) = submit(pool, completion, backend, control, entry, overwrite).await? {
            submitted.files += 1;
            submitted.bytes += size;
        }
    }
    tracing::info!(
        "largest {} uploads commenced, total size = {}",
        submitted.files,
        bytesize::ByteSize(submitted.bytes)
    );
    if entries.len() > priority_count {
        {
            let mut rng = rand::thread_rng();
            entries.shuffle(&mut rng);
        }
        let mut shuffled = Submitted::default();
        for entry in entries.iter_mut() {
            // priority entries are already queued; submit skips them
            if let Some(size) = submit(pool, completion, backend, control, entry, overwrite).await?
            {
                shuffled.files += 1;
                shuffled.bytes += size;
            }
        }
        tracing::info!(
            "shuffled uploads commenced: {}, total size = {}",
            shuffled.files,
            bytesize::ByteSize(shuffled.bytes)
        );
        submitted.files += shuffled.files;
        submitted.bytes += shuffled.bytes;
    }
    Ok(submitted)
}

/// Queue one entry for upload. Returns the submitted size, or `None` when the
/// entry was not in `ready` state - the "not submitted" sentinel, not an
/// error.
async fn submit<B: Backend>(
    pool: &WorkerPool,
    completion: &CompletionQueue<Outcome>,
    backend: &Arc<B>,
    control: &Arc<JobControl>,
    entry: &mut UploadEntry,
    overwrite: bool,
) -> anyhow::Result<Option<u64>> {
    tracing::debug!("submit {}", &*entry);
    if !entry.mark_queued() {
        return Ok(None);
    }
    tracing::debug!("queued {}", &*entry);
    let task_entry = entry.clone();
    let backend = backend.clone();
    let control = control.clone();
    let results = completion.sender();
    pool.submit(async move {
        let outcome =
            upload::upload_entry(backend.as_ref(), control.as_ref(), task_entry, overwrite).await;
        let _ = results.send(outcome).await;
    })
    .await?;
    Ok(Some(entry.size()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::State;
    use crate::testutils::StubBackend;
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;

    fn entries(sizes: &[u64]) -> Vec<UploadEntry> {
        sizes
            .iter()
            .enumerate()
            .map(|(idx, size)| {
                UploadEntry::new(
                    format!("/src/file-{idx}").into(),
                    format!("/dst/file-{idx}").into(),
                    *size,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn every_entry_is_submitted_exactly_once() -> anyhow::Result<()> {
        let pool = WorkerPool::new(4);
        let completion = CompletionQueue::new();
        let backend = Arc::new(StubBackend::default());
        let control = Arc::new(JobControl::new(true));
        let mut list = entries(&[100, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10]);
        let submitted = schedule_uploads(
            &pool,
            &completion,
            &backend,
            &control,
            &mut list,
            4,
            true,
        )
        .await?;
        assert_eq!(submitted.files, 11);
        assert_eq!(submitted.bytes, 200);
        let mut sources = HashSet::new();
        for _ in 0..submitted.files {
            let outcome = completion.take().await?;
            assert_eq!(outcome.entry.state(), State::Succeeded);
            assert!(sources.insert(outcome.entry.source().to_path_buf()));
        }
        assert_eq!(sources.len(), 11);
        assert_eq!(backend.copy_calls.load(Ordering::SeqCst), 11);
        pool.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn second_schedule_pass_submits_nothing() -> anyhow::Result<()> {
        let pool = WorkerPool::new(2);
        let completion = CompletionQueue::new();
        let backend = Arc::new(StubBackend::default());
        let control = Arc::new(JobControl::new(true));
        let mut list = entries(&[5, 4, 3, 2, 1]);
        let first =
            schedule_uploads(&pool, &completion, &backend, &control, &mut list, 2, true).await?;
        assert_eq!(first.files, 5);
        let second =
            schedule_uploads(&pool, &completion, &backend, &control, &mut list, 2, true).await?;
        assert_eq!(second.files, 0);
        assert_eq!(second.bytes, 0);
        for _ in 0..first.files {
            completion.take().await?;
        }
        assert_eq!(backend.copy_calls.load(Ordering::SeqCst), 5);
        pool.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn largest_file_goes_out_in_the_priority_pass() -> anyhow::Result<()> {
        // width 1 makes execution order equal submission order, so the
        // biggest file must be the first outcome even though it was listed last
        let pool = WorkerPool::new(1);
        let completion = CompletionQueue::new();
        let backend = Arc::new(StubBackend::default());
        let control = Arc::new(JobControl::new(true));
        let mut list = entries(&[10, 10, 10, 100]);
        let submitted =
            schedule_uploads(&pool, &completion, &backend, &control, &mut list, 1, true).await?;
        assert_eq!(submitted.files, 4);
        let first = completion.take().await?;
        assert_eq!(first.entry.size(), 100);
        for _ in 1..submitted.files {
            completion.take().await?;
        }
        pool.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn zero_entries_is_a_no_op() -> anyhow::Result<()> {
        let pool = WorkerPool::new(2);
        let completion = CompletionQueue::new();
        let backend = Arc::new(StubBackend::default());
        let control = Arc::new(JobControl::new(true));
        let mut list = entries(&[]);
        let submitted =
            schedule_uploads(&pool, &completion, &backend, &control, &mut list, 4, true).await?;
        assert_eq!(submitted.files, 0);
        pool.shutdown().await;
        Ok(())
    }
}
