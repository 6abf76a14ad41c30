//! tickq CLI: runs a synthetic batch of flaky tasks through the queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rand::Rng;
use tickq_core::{QueueConfig, TaskError, TaskQueue};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "tickq")]
#[command(about = "Bounded-retry task queue demo")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (RUST_LOG takes precedence)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Submit N tasks that fail their first K calls, run them, print the report as JSON.
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Number of tasks in the batch
    #[arg(short = 'n', long, default_value = "10")]
    tasks: usize,

    /// Maximum attempts per task
    #[arg(short, long, env = "TICKQ_RETRIES", default_value = "3")]
    retries: u32,

    /// Tick period in milliseconds
    #[arg(short, long, env = "TICKQ_INTERVAL_MS", default_value = "10")]
    interval_ms: u64,

    /// Cap on concurrently running tasks (unbounded when omitted)
    #[arg(long, env = "TICKQ_MAX_IN_FLIGHT")]
    max_in_flight: Option<usize>,

    /// Each task fails this many times before succeeding
    #[arg(long, default_value = "2")]
    fail_first: u32,

    /// Upper bound of the random per-call latency in milliseconds
    #[arg(long, default_value = "200")]
    max_latency_ms: u64,
}

impl DemoArgs {
    fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            interval: Duration::from_millis(self.interval_ms),
            retries: self.retries,
            max_in_flight: self.max_in_flight,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    match cli.command {
        Command::Demo(args) => demo(args).await,
    }
}

async fn demo(args: DemoArgs) -> anyhow::Result<()> {
    let fail_first = args.fail_first;
    let max_latency_ms = args.max_latency_ms.max(1);

    let works = (0..args.tasks).map(|i| {
        let calls = Arc::new(AtomicU32::new(0));
        move || {
            let calls = Arc::clone(&calls);
            async move {
                let latency = rand::thread_rng().gen_range(0..max_latency_ms);
                tokio::time::sleep(Duration::from_millis(latency)).await;

                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= fail_first {
                    return Err(TaskError::new(format!("task {i}: failed on try {n}")));
                }
                tracing::info!(task = i, tries = n, "task done");
                Ok(())
            }
        }
    });

    let queue = TaskQueue::builder()
        .config(args.queue_config())
        .tasks(works)
        .build()?;

    let report = queue.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
