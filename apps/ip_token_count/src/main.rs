use anyhow::Result;
use clap::Parser;
use logmill::extract::octet_run_ips;
use logmill::{HashPartitioner, Mapper, RuntimePipeline, SumCombiner, SumReducer};
use std::time::Instant;
use tracing::info;

/// Requests per client address, reconstructing addresses from token runs.
/// Pre-combines counts on the map side to shrink the grouped handoff.
#[derive(Parser, Debug)]
struct Args {
    /// Log file or directory to analyze
    input: String,
    /// Directory receiving the count part files
    output: String,
}

struct TokenRunIpMapper;

impl Mapper for TokenRunIpMapper {
    type Input = String;
    type Key = String;
    type Value = u64;

    fn do_map<I, F>(&self, input: I, emit: &mut F)
    where
        I: IntoIterator<Item = String>,
        F: FnMut(String, u64),
    {
        for line in input {
            for ip in octet_run_ips(&line) {
                emit(ip, 1);
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let start = Instant::now();

    let mut pipeline = RuntimePipeline::new("Combined IP Count");
    pipeline.add_input(&args.input);
    pipeline.set_output(&args.output);
    pipeline.map_reduce_combined(
        TokenRunIpMapper,
        SumCombiner::default(),
        HashPartitioner,
        |_| SumReducer::<String>::default(),
    )?;

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "combined count finished");
    Ok(())
}
