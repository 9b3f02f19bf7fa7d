use anyhow::Result;
use clap::Parser;
use logmill::constants::ACCESS_LOG_CACHE_FILE;
use logmill::extract::hour_of;
use logmill::{
    parse_line, BucketDomain, DomainPartitioner, Hour, Mapper, RuntimePipeline, ValueTallyReducer,
};

/// Requests per client address, one output bucket per hour of day.
#[derive(Parser, Debug)]
struct Args {
    /// Log file or directory to analyze
    input: String,
    /// Directory receiving one part file per hour bucket
    output: String,
}

struct TimeLogMapper;

impl Mapper for TimeLogMapper {
    type Input = String;
    type Key = Hour;
    type Value = String;

    fn do_map<I, F>(&self, input: I, emit: &mut F)
    where
        I: IntoIterator<Item = String>,
        F: FnMut(Hour, String),
    {
        for line in input {
            let fields = parse_line(&line);
            if fields.client_addr.is_empty() {
                continue;
            }
            if let Some(hour) = hour_of(&fields.timestamp) {
                emit(hour, fields.client_addr);
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let mut pipeline = RuntimePipeline::new("Time Log");
    pipeline.add_cache_file(ACCESS_LOG_CACHE_FILE);
    pipeline.add_input(&args.input);
    pipeline.set_output(&args.output);
    pipeline.set_num_reduce_tasks(Hour::SIZE);
    pipeline.map_reduce(
        TimeLogMapper,
        DomainPartitioner::<Hour>::default(),
        |_| ValueTallyReducer::<Hour>::default(),
    )
}
