use anyhow::Result;
use clap::Parser;
use logmill::constants::{ACCESS_LOG_CACHE_FILE, DEFAULT_STORE_DIR, ENV_STORE_DIR};
use logmill::extract::month_of;
use logmill::utils::env_string;
use logmill::{
    parse_line, AccessLogRecord, BucketDomain, ContainerDomain, DomainPartitioner, JsonlStore,
    Mapper, Month, RuntimePipeline, SinkAdapter, SinkReducer,
};
use tracing::warn;

/// Persists every parsed record into the document store, one container
/// per calendar month (LOG_01..LOG_12).
#[derive(Parser, Debug)]
struct Args {
    /// Log file or directory to analyze
    input: String,
    /// Directory receiving the run's part files
    output: String,
}

struct MonthStoreMapper;

impl Mapper for MonthStoreMapper {
    type Input = String;
    type Key = Month;
    type Value = String;

    fn do_map<I, F>(&self, input: I, emit: &mut F)
    where
        I: IntoIterator<Item = String>,
        F: FnMut(Month, String),
    {
        for line in input {
            let fields = parse_line(&line);
            let month = match month_of(&fields.timestamp) {
                Some(m) => m,
                None => continue,
            };
            match AccessLogRecord::from_fields(&fields).to_wire() {
                Ok(wire) => emit(month, wire),
                Err(e) => warn!("record not serializable: {}", e),
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let store_dir = env_string(ENV_STORE_DIR, DEFAULT_STORE_DIR);

    // Provision the whole container table before any reduce task starts,
    // so concurrently-starting tasks never race through probe-then-create.
    SinkAdapter::new(JsonlStore::new(store_dir.clone())).ensure_containers(Month::containers())?;

    let mut pipeline = RuntimePipeline::new("Month Store");
    pipeline.add_cache_file(ACCESS_LOG_CACHE_FILE);
    pipeline.add_input(&args.input);
    pipeline.set_output(&args.output);
    pipeline.set_num_reduce_tasks(Month::SIZE);
    pipeline.map_reduce(
        MonthStoreMapper,
        DomainPartitioner::<Month>::default(),
        move |_| SinkReducer::<Month, _>::new(SinkAdapter::new(JsonlStore::new(store_dir.clone()))),
    )
}
