use anyhow::Result;
use clap::Parser;
use logmill::extract::month_of;
use logmill::{
    parse_line, BucketDomain, DomainPartitioner, Mapper, Month, RuntimePipeline, ValueTallyReducer,
};

/// Requests per client address, one output bucket per calendar month.
/// Records whose month token is missing or unrecognized are dropped.
#[derive(Parser, Debug)]
struct Args {
    /// Log file or directory to analyze
    input: String,
    /// Directory receiving one part file per month bucket
    output: String,
}

struct MonthLogMapper;

impl Mapper for MonthLogMapper {
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
            if fields.client_addr.is_empty() {
                continue;
            }
            if let Some(month) = month_of(&fields.timestamp) {
                emit(month, fields.client_addr);
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let mut pipeline = RuntimePipeline::new("Month Log");
    pipeline.add_input(&args.input);
    pipeline.set_output(&args.output);
    pipeline.set_num_reduce_tasks(Month::SIZE);
    pipeline.map_reduce(
        MonthLogMapper,
        DomainPartitioner::<Month>::default(),
        |_| ValueTallyReducer::<Month>::default(),
    )
}
