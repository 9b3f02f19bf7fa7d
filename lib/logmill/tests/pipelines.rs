use anyhow::Result;
use logmill::extract::{hour_of, month_of, octet_run_ips, Ipv4Pattern};
use logmill::{
    parse_line, AccessLogRecord, BucketDomain, ContainerDomain, DomainPartitioner, HashPartitioner,
    Hour, Mapper, MemoryStore, Month, NoCombiner, RuntimePipeline, SinkAdapter, SinkReducer,
    SumCombiner, SumReducer, ValueTallyReducer,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

const APRIL_LINES: &[&str] = &[
    r#"10.0.0.1 - - [24/Apr/2011:04:20:11 -0400] "GET /a.html HTTP/1.1" 200 120"#,
    r#"10.0.0.1 - - [25/Apr/2011:09:15:02 -0400] "GET /b.html HTTP/1.1" 200 88"#,
    r#"10.0.0.2 - - [26/Apr/2011:04:59:59 -0400] "POST /c HTTP/1.1" 404 12"#,
];

fn workdir(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_fixture(dir: &PathBuf, name: &str, lines: &[&str]) -> String {
    let input_dir = dir.join("input");
    fs::create_dir_all(&input_dir).unwrap();
    let path = input_dir.join(name);
    fs::write(&path, lines.join("\n")).unwrap();
    input_dir.to_str().unwrap().to_string()
}

fn read_output(dir: &PathBuf) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for entry in fs::read_dir(dir.join("out")).unwrap() {
        let text = fs::read_to_string(entry.unwrap().path()).unwrap();
        for line in text.lines() {
            let (key, count) = line.split_once('\t').unwrap();
            *counts.entry(key.to_string()).or_insert(0) += count.parse::<u64>().unwrap();
        }
    }
    counts
}

struct MonthIpMapper;

impl Mapper for MonthIpMapper {
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

struct HourIpMapper;

impl Mapper for HourIpMapper {
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

struct LastIpMapper {
    pattern: Ipv4Pattern,
}

impl Mapper for LastIpMapper {
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

struct MonthRecordMapper;

impl Mapper for MonthRecordMapper {
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
            if let Some(month) = month_of(&fields.timestamp) {
                if let Ok(wire) = AccessLogRecord::from_fields(&fields).to_wire() {
                    emit(month, wire);
                }
            }
        }
    }
}

#[test]
fn month_buckets_receive_their_records() -> Result<()> {
    let dir = workdir("month_buckets");
    let input = write_fixture(&dir, "access_log", APRIL_LINES);

    let mut pipeline = RuntimePipeline::new("month buckets");
    pipeline.add_input(&input);
    pipeline.set_output(dir.join("out").to_str().unwrap());
    pipeline.set_num_reduce_tasks(Month::SIZE);
    pipeline.map_reduce(MonthIpMapper, DomainPartitioner::<Month>::default(), |_| {
        ValueTallyReducer::<Month>::default()
    })?;

    // All three April records land in the April bucket, none elsewhere.
    let april = fs::read_to_string(dir.join("out").join("part-00003.tsv"))?;
    let mut lines: Vec<&str> = april.lines().collect();
    lines.sort_unstable();
    assert_eq!(lines, vec!["10.0.0.1\t2", "10.0.0.2\t1"]);
    for bucket in 0..Month::SIZE {
        if bucket == Month::Apr.bucket() {
            continue;
        }
        let other = fs::read_to_string(dir.join("out").join(format!("part-{:05}.tsv", bucket)))?;
        assert!(other.is_empty(), "bucket {} should be empty", bucket);
    }
    Ok(())
}

#[test]
fn ip_counts_match_expected_totals() -> Result<()> {
    let dir = workdir("ip_counts");
    let input = write_fixture(&dir, "access_log", APRIL_LINES);

    let mut pipeline = RuntimePipeline::new("ip counts");
    pipeline.add_input(&input);
    pipeline.set_output(dir.join("out").to_str().unwrap());
    pipeline.map_reduce(
        LastIpMapper {
            pattern: Ipv4Pattern::new(),
        },
        HashPartitioner,
        |_| SumReducer::<String>::default(),
    )?;

    let counts = read_output(&dir);
    assert_eq!(counts.get("10.0.0.1"), Some(&2));
    assert_eq!(counts.get("10.0.0.2"), Some(&1));
    assert_eq!(counts.values().sum::<u64>(), 3);
    Ok(())
}

#[test]
fn combiner_leaves_final_counts_unchanged() -> Result<()> {
    let dir = workdir("combiner_parity");
    // Many duplicate addresses across two files so the pre-combine
    // actually folds something.
    let lines_a: Vec<String> = (0..40)
        .map(|i| format!("10.1.1.{} - - [15/Jul/2009:14:58:59 -0700] \"GET / HTTP/1.1\" 200 1", i % 4))
        .collect();
    let lines_b: Vec<String> = (0..25)
        .map(|i| format!("10.1.1.{} - - [15/Jul/2009:14:58:59 -0700] \"GET / HTTP/1.1\" 200 1", i % 5))
        .collect();
    let refs_a: Vec<&str> = lines_a.iter().map(|s| s.as_str()).collect();
    let input = write_fixture(&dir, "log_a", &refs_a);
    let refs_b: Vec<&str> = lines_b.iter().map(|s| s.as_str()).collect();
    write_fixture(&dir, "log_b", &refs_b);

    let run = |out: &str, combined: bool| -> Result<BTreeMap<String, u64>> {
        let mut pipeline = RuntimePipeline::new("combiner parity");
        pipeline.add_input(&input);
        pipeline.set_output(dir.join(out).to_str().unwrap());
        if combined {
            pipeline.map_reduce_combined(
                TokenRunIpMapper,
                SumCombiner::default(),
                HashPartitioner,
                |_| SumReducer::<String>::default(),
            )?;
        } else {
            pipeline.map_reduce_combined(
                TokenRunIpMapper,
                NoCombiner::default(),
                HashPartitioner,
                |_| SumReducer::<String>::default(),
            )?;
        }
        let mut counts = BTreeMap::new();
        for entry in fs::read_dir(dir.join(out))? {
            let text = fs::read_to_string(entry?.path())?;
            for line in text.lines() {
                let (key, count) = line.split_once('\t').unwrap();
                *counts.entry(key.to_string()).or_insert(0) += count.parse::<u64>()?;
            }
        }
        Ok(counts)
    };

    let with_combiner = run("out_combined", true)?;
    let without = run("out_plain", false)?;
    assert_eq!(with_combiner, without);
    assert_eq!(with_combiner.get("10.1.1.0"), Some(&15));
    Ok(())
}

#[test]
fn sink_pipeline_routes_records_to_month_containers() -> Result<()> {
    let dir = workdir("sink_routing");
    let mut lines = APRIL_LINES.to_vec();
    let july = r#"10.0.0.9 - - [15/Jul/2009:14:58:59 -0700] "GET / HTTP/1.1" 403 202"#;
    lines.push(july);
    let input = write_fixture(&dir, "access_log", &lines);

    let store = MemoryStore::new();
    let reducer_store = store.clone();
    let mut pipeline = RuntimePipeline::new("sink routing");
    pipeline.add_input(&input);
    pipeline.set_output(dir.join("out").to_str().unwrap());
    pipeline.set_num_reduce_tasks(Month::SIZE);
    // Containers are provisioned before the parallel reduce phase.
    SinkAdapter::new(store.clone()).ensure_containers(Month::containers())?;
    pipeline.map_reduce(
        MonthRecordMapper,
        DomainPartitioner::<Month>::default(),
        move |_| SinkReducer::<Month, _>::new(SinkAdapter::new(reducer_store.clone())),
    )?;

    assert_eq!(store.container_names().len(), Month::SIZE);
    assert_eq!(store.documents("LOG_04").len(), 3);
    assert_eq!(store.documents("LOG_07").len(), 1);
    assert_eq!(store.documents("LOG_01").len(), 0);

    let july_docs = store.documents("LOG_07");
    let july_doc = &july_docs[0];
    assert_eq!(july_doc["ip"], "10.0.0.9");
    assert_eq!(july_doc["reqTime"], "15/Jul/2009:14:58:59");
    assert_eq!(july_doc["reqMethod"], "GET");
    assert_eq!(july_doc["reqURI"], "/");
    Ok(())
}

#[test]
fn malformed_lines_are_dropped_not_fatal() -> Result<()> {
    let dir = workdir("malformed");
    let lines = vec![
        "short line",
        "",
        "10.0.0.5 -",
        r#"10.0.0.5 - - [24/Apr/2011:13:01:02 -0400] "GET /x HTTP/1.1" 200 10"#,
        "complete garbage with no structure at all",
    ];
    let input = write_fixture(&dir, "access_log", &lines);

    let mut pipeline = RuntimePipeline::new("malformed tolerance");
    pipeline.add_input(&input);
    pipeline.set_output(dir.join("out").to_str().unwrap());
    pipeline.set_num_reduce_tasks(Hour::SIZE);
    pipeline.map_reduce(HourIpMapper, DomainPartitioner::<Hour>::default(), |_| {
        ValueTallyReducer::<Hour>::default()
    })?;

    // Only the well-formed record survives, in the 13:00 bucket.
    let counts = read_output(&dir);
    assert_eq!(counts.len(), 1);
    assert_eq!(counts.get("10.0.0.5"), Some(&1));
    let bucket = fs::read_to_string(dir.join("out").join("part-00013.tsv"))?;
    assert_eq!(bucket.trim_end(), "10.0.0.5\t1");
    Ok(())
}
