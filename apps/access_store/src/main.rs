use anyhow::Result;
use clap::Parser;
use logmill::constants::{ACCESS_LOG_CONTAINER, DEFAULT_STORE_DIR, ENV_STORE_DIR};
use logmill::utils::env_string;
use logmill::{parse_line, run_map_only, AccessLogRecord, Document, JsonlStore, SinkAdapter};
use tracing::info;

/// Map-only pipeline: every parsed record goes straight into the
/// ACCESS_LOG container, no grouping involved. Each scan task owns its
/// store handle and buffers up to the batch bound before writing.
#[derive(Parser, Debug)]
struct Args {
    /// Log file or directory to load
    input: String,
    /// Directory receiving the run's part files
    output: String,
}

struct StoreTask {
    adapter: SinkAdapter<JsonlStore>,
    pending: Vec<Document>,
    stored: u64,
}

impl StoreTask {
    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        self.stored += batch.len() as u64;
        self.adapter.bulk_insert(ACCESS_LOG_CONTAINER, &batch)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let store_dir = env_string(ENV_STORE_DIR, DEFAULT_STORE_DIR);
    logmill::io::ensure_dir(&args.output)?;

    // Provision up front; the per-task probe below then never creates.
    SinkAdapter::new(JsonlStore::new(store_dir.clone())).ensure_container(ACCESS_LOG_CONTAINER)?;

    let tasks = run_map_only(
        &[args.input],
        |_task_id| -> Result<StoreTask> {
            let adapter = SinkAdapter::new(JsonlStore::new(store_dir.clone()));
            adapter.ensure_container(ACCESS_LOG_CONTAINER)?;
            Ok(StoreTask {
                adapter,
                pending: Vec::new(),
                stored: 0,
            })
        },
        |task, line| {
            if line.trim().is_empty() {
                return Ok(());
            }
            let record = AccessLogRecord::from_fields(&parse_line(line));
            task.pending.push(serde_json::to_value(&record)?);
            if task.pending.len() >= task.adapter.max_batch() {
                task.flush()?;
            }
            Ok(())
        },
        |task| task.flush(),
    )?;

    let stored: u64 = tasks.iter().map(|t| t.stored).sum();
    info!(container = ACCESS_LOG_CONTAINER, stored, "access log loaded");
    Ok(())
}
