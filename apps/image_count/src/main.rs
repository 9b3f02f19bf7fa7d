use anyhow::Result;
use clap::Parser;
use logmill::io::open_writer;
use logmill::{parse_line, run_map_only, Counters};
use std::io::Write;
use tracing::info;

const COUNTER_GROUP: &str = "imageCount";

/// Classifies request targets by image extension and tallies them. Each
/// scan task keeps its own counters; the totals are merged at the end.
#[derive(Parser, Debug)]
struct Args {
    /// Log file or directory to analyze
    input: String,
    /// Directory receiving the tally file
    output: String,
}

fn classify(target: &str) -> &'static str {
    let name = target.to_lowercase();
    if name.ends_with(".jpg") {
        "jpg"
    } else if name.ends_with(".gif") {
        "gif"
    } else {
        "other"
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let tallies = run_map_only(
        &[args.input],
        |_task_id| Ok(Counters::new()),
        |counters, line| {
            let fields = parse_line(line);
            if !fields.request_target.is_empty() {
                counters.increment(COUNTER_GROUP, classify(&fields.request_target), 1);
            }
            Ok(())
        },
        |_counters| Ok(()),
    )?;

    let mut total = Counters::new();
    for task_counters in tallies {
        total.merge(task_counters);
    }

    let mut out = open_writer(format!("{}/part-00000.tsv", args.output))?;
    for (group, name, count) in total.iter() {
        info!(group, name, count, "tally");
        writeln!(out, "{}.{}\t{}", group, name, count)?;
    }
    out.flush()?;
    Ok(())
}
