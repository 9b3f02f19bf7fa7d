use anyhow::Result;
use clap::Parser;
use logmill::extract::Ipv4Pattern;
use logmill::{HashPartitioner, Mapper, RuntimePipeline, SumReducer};

/// Requests per client address. Lines carrying several addresses count
/// toward the last one.
#[derive(Parser, Debug)]
struct Args {
    /// Log file or directory to analyze
    input: String,
    /// Directory receiving the count part files
    output: String,
}

struct IpCountMapper {
    pattern: Ipv4Pattern,
}

impl Mapper for IpCountMapper {
    type Input = String;
    type Key = String;
    type Value = u64;

    fn do_map<I, F>(&self, input: I, emit: &mut F)
    where
        I: IntoIterator<Item = String>,
        F: FnMut(String, u64),
    {
        for line in input {
            if let Some(ip) = self.pattern.last_match(&line) {
                emit(ip.to_string(), 1);
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let mut pipeline = RuntimePipeline::new("IP Count");
    pipeline.add_input(&args.input);
    pipeline.set_output(&args.output);
    pipeline.map_reduce(
        IpCountMapper {
            pattern: Ipv4Pattern::new(),
        },
        HashPartitioner,
        |_| SumReducer::<String>::default(),
    )
}
