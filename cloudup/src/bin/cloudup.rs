use std::sync::Arc;

use clap::Parser;

use cloudup_tools_cloudup::path;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cloudup",
    version,
    about = "Upload a local directory tree to a destination root, largest files first",
    long_about = "`cloudup` copies every regular file under a source directory to the \
corresponding path under a destination root, using a bounded worker pool.

The biggest files are submitted first so they never become a tail latency \
bottleneck, and the remainder goes out in shuffled order to avoid saturating \
the pool with many small files from a single directory.

EXAMPLES:
    # Basic upload with a summary at the end
    cloudup -s /data/staging -d /mnt/archive/staging --summary

    # Narrow pool, more priority slots for big files
    cloudup -s src -d dest -t 4 -l 8

    # Strict mode: never replace files, abort the job on the first failure
    cloudup -s src -d dest --overwrite false --ignore-failures false"
)]
struct Args {
    // Upload options
    /// Local directory (or single file) to upload from
    #[arg(short, long, value_name = "PATH", help_heading = "Upload options")]
    source: std::path::PathBuf,

    /// Destination root to upload to
    #[arg(short, long, value_name = "PATH", help_heading = "Upload options")]
    dest: std::path::PathBuf,

    /// Worker pool width
    #[arg(
        short,
        long,
        default_value_t = common::job::DEFAULT_THREADS,
        value_name = "N",
        help_heading = "Upload options"
    )]
    threads: usize,

    /// Number of biggest files submitted ahead of the shuffled pass
    #[arg(
        short,
        long,
        default_value_t = common::job::DEFAULT_LARGEST,
        value_name = "N",
        help_heading = "Upload options"
    )]
    largest: usize,

    /// Allow replacing existing destination files
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_name = "BOOL",
        help_heading = "Upload options"
    )]
    overwrite: bool,

    /// Do not fail the whole job on per-file errors
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_name = "BOOL",
        help_heading = "Upload options"
    )]
    ignore_failures: bool,

    // Progress & output
    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Number of tokio worker threads (0 = number of CPU cores)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,
}

async fn async_main(args: Args) -> Result<common::job::Summary, common::job::Error> {
    let settings = common::job::Settings {
        threads: args.threads,
        largest: args.largest,
        overwrite: args.overwrite,
        ignore_failures: args.ignore_failures,
    };
    tracing::debug!("upload settings: {:?}", &settings);
    common::job::run_upload(
        Arc::new(common::backend::LocalFs),
        &args.source,
        &args.dest,
        &settings,
    )
    .await
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    if args.threads == 0 {
        return Err(anyhow::anyhow!("--threads must be at least 1"));
    }
    // source and destination are both local paths here, so the overlap check
    // always applies
    path::validate_roots(&args.source, &args.dest)?;
    let output = common::config::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::config::RuntimeConfig {
        max_workers: args.max_workers,
    };
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let res = common::run(&output, &runtime, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
