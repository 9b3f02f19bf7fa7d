use anyhow::Result;
use clap::Parser;
use logmill::constants::ANALYSIS_CACHE_FILE;
use logmill::extract::word_tokens;
use logmill::{HashPartitioner, Mapper, RuntimePipeline, SumReducer};

/// Word frequencies over the pre-loaded analysis file. The input is fixed;
/// only the result location is taken from the command line.
#[derive(Parser, Debug)]
struct Args {
    /// Directory receiving the count part files
    output: String,
}

struct WordCountMapper;

impl Mapper for WordCountMapper {
    type Input = String;
    type Key = String;
    type Value = u64;

    fn do_map<I, F>(&self, input: I, emit: &mut F)
    where
        I: IntoIterator<Item = String>,
        F: FnMut(String, u64),
    {
        for line in input {
            for word in word_tokens(&line) {
                emit(word.to_string(), 1);
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let mut pipeline = RuntimePipeline::new("Word Count");
    pipeline.add_cache_file(ANALYSIS_CACHE_FILE);
    pipeline.add_input(ANALYSIS_CACHE_FILE);
    pipeline.set_output(&args.output);
    pipeline.map_reduce(WordCountMapper, HashPartitioner, |_| {
        SumReducer::<String>::default()
    })
}
