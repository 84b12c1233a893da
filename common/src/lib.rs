//! Engine for `cloudup`: parallel upload of a local file tree to a
//! destination root.
//!
//! The pieces, in the order a job uses them:
//! - [discover] lists the source tree and pairs every regular file with its
//!   re-rooted destination path;
//! - [schedule] submits the entries to the worker pool, biggest files first,
//!   then the shuffled remainder;
//! - [pool] is the bounded worker pool plus the completion-ordered result
//!   queue;
//! - [upload] runs the per-file copy protocol against a [backend::Backend];
//! - [job] ties it all together and folds the outcomes into a
//!   [job::Summary].

pub mod backend;
pub mod config;
pub mod discover;
pub mod entry;
pub mod errors;
pub mod job;
pub mod pool;
pub mod progress;
pub mod schedule;
pub mod testutils;
pub mod upload;

/// Set up logging, build the tokio runtime and drive `func` to completion.
/// Returns the job summary, or `None` after logging the failure - callers
/// turn `None` into a non-zero exit.
pub fn run<Fut>(
    output: &config::OutputConfig,
    runtime: &config::RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> Option<job::Summary>
where
    Fut: std::future::Future<Output = Result<job::Summary, job::Error>>,
{
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(error) => {
            eprintln!("failed to create tokio runtime: {error}");
            return None;
        }
    };
    match rt.block_on(func()) {
        Ok(summary) => {
            if output.print_summary {
                println!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("upload failed: {}", &error);
            if output.print_summary {
                println!("{}", &error.summary);
            }
            None
        }
    }
}
