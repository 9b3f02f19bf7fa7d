use anyhow::Result;
use clap::Parser;
use logmill::extract::status_token;
use logmill::{HashPartitioner, Mapper, RuntimePipeline, SumReducer};

/// Counts requests whose response code matches a literal given on the
/// command line (200, 403, 404, ...).
#[derive(Parser, Debug)]
struct Args {
    /// Log file or directory to analyze
    input: String,
    /// Directory receiving the count part files
    output: String,
    /// Response code to count
    result_code: String,
}

/// The filter literal is fixed per run and handed to the mapper at
/// construction.
struct StatusFilterMapper {
    result_code: String,
}

impl Mapper for StatusFilterMapper {
    type Input = String;
    type Key = String;
    type Value = u64;

    fn do_map<I, F>(&self, input: I, emit: &mut F)
    where
        I: IntoIterator<Item = String>,
        F: FnMut(String, u64),
    {
        for line in input {
            if status_token(&line) == Some(self.result_code.as_str()) {
                emit(self.result_code.clone(), 1);
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let mut pipeline = RuntimePipeline::new("Send Result Count");
    pipeline.add_input(&args.input);
    pipeline.set_output(&args.output);
    pipeline.map_reduce(
        StatusFilterMapper {
            result_code: args.result_code,
        },
        HashPartitioner,
        |_| SumReducer::<String>::default(),
    )
}
