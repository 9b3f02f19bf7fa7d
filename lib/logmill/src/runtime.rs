//! Local, in-process execution of the pipeline contract.
//!
//! Stands in for the external engine: splits inputs across data-parallel
//! map tasks, performs the grouped-by-key handoff, and runs one reduce
//! task per partition. Map tasks share nothing; each reduce task owns its
//! reducer instance and processes key groups sequentially in key order.
//! A failed task fails the whole run; there is no partial retry here.

use crate::aggregate::NoCombiner;
use crate::api::{Combiner, Mapper, Partitioner, Reducer};
use crate::io::{ensure_dir, list_files_recursive, open_writer, read_lines};
use crate::stats::{MapStats, MapTaskStats, ReduceStats, ReduceTaskStats};
use crate::utils::default_map_tasks;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

pub struct RuntimePipeline {
    job_name: String,
    inputs: Vec<String>,
    output: Option<String>,
    num_reduce_tasks: usize,
    cache_files: Vec<String>,
}

impl RuntimePipeline {
    pub fn new(job_name: impl Into<String>) -> Self {
        RuntimePipeline {
            job_name: job_name.into(),
            inputs: Vec::new(),
            output: None,
            num_reduce_tasks: 1,
            cache_files: Vec::new(),
        }
    }

    pub fn add_input(&mut self, input_path: impl Into<String>) {
        self.inputs.push(input_path.into());
    }

    pub fn set_output(&mut self, output_path: impl Into<String>) {
        self.output = Some(output_path.into());
    }

    /// Partitioned pipelines set this to the partition domain size; the
    /// domain partitioner asserts the match.
    pub fn set_num_reduce_tasks(&mut self, n: usize) {
        self.num_reduce_tasks = n.max(1);
    }

    /// Static declaration of a pre-loaded file reference. The local
    /// runtime reads inputs directly; the declaration is recorded for
    /// parity with engine-managed runs.
    pub fn add_cache_file(&mut self, path: impl Into<String>) {
        self.cache_files.push(path.into());
    }

    pub fn map_reduce<M, P, R, FR>(&mut self, mapper: M, partitioner: P, reducer_factory: FR) -> Result<()>
    where
        M: Mapper<Input = String> + Send + Sync,
        P: Partitioner<M::Key> + Send + Sync,
        R: Reducer<Key = M::Key, ValueIn = M::Value>,
        FR: Fn(usize) -> R + Send + Sync,
    {
        self.map_reduce_combined(mapper, NoCombiner::default(), partitioner, reducer_factory)
    }

    pub fn map_reduce_combined<M, C, P, R, FR>(
        &mut self,
        mapper: M,
        combiner: C,
        partitioner: P,
        reducer_factory: FR,
    ) -> Result<()>
    where
        M: Mapper<Input = String> + Send + Sync,
        C: Combiner<Key = M::Key, Value = M::Value> + Send + Sync,
        P: Partitioner<M::Key> + Send + Sync,
        R: Reducer<Key = M::Key, ValueIn = M::Value>,
        FR: Fn(usize) -> R + Send + Sync,
    {
        let job_start = Instant::now();
        let output_dir = self.output.clone().context("output not set")?;
        let num_reducers = self.num_reduce_tasks;
        for cache_file in &self.cache_files {
            info!(job = %self.job_name, cache_file = %cache_file, "cache file declared");
        }

        // Fresh output directory per run.
        let _ = std::fs::remove_dir_all(&output_dir);
        ensure_dir(&output_dir)?;

        let mut all_files = Vec::new();
        for input in &self.inputs {
            let mut files = list_files_recursive(input)?;
            all_files.append(&mut files);
        }
        let num_map_tasks = default_map_tasks(all_files.len());
        let chunks = split_round_robin(&all_files, num_map_tasks);

        info!(
            job = %self.job_name,
            files = all_files.len(),
            map_tasks = num_map_tasks,
            num_reducers,
            "starting map phase"
        );

        // Map phase: each task parses its own file split and pre-combines
        // its per-partition output before the handoff.
        let map_start = Instant::now();
        let task_outputs: Vec<(Vec<Vec<(M::Key, M::Value)>>, MapTaskStats)> = (0..num_map_tasks)
            .into_par_iter()
            .map(|task_id| -> Result<(Vec<Vec<(M::Key, M::Value)>>, MapTaskStats)> {
                let task_start = Instant::now();
                let files = &chunks[task_id];
                debug!(task_id, files = files.len(), "map task starting");

                let mut buckets: Vec<Vec<(M::Key, M::Value)>> =
                    (0..num_reducers).map(|_| Vec::new()).collect();
                let mut emits: u64 = 0;
                for file in files {
                    let lines = read_lines(file)?;
                    let mut emit = |k: M::Key, v: M::Value| {
                        let part = partitioner.partition(&k, num_reducers);
                        buckets[part].push((k, v));
                        emits += 1;
                    };
                    mapper.do_map(lines.filter_map(|l| l.ok()), &mut emit);
                }

                let mut emits_after_combine: u64 = 0;
                for bucket in &mut buckets {
                    if bucket.is_empty() {
                        continue;
                    }
                    let mut groups: HashMap<M::Key, Vec<M::Value>> = HashMap::new();
                    for (k, v) in bucket.drain(..) {
                        groups.entry(k).or_default().push(v);
                    }
                    for (k, vals) in groups {
                        for v in combiner.combine(&k, vals) {
                            bucket.push((k.clone(), v));
                            emits_after_combine += 1;
                        }
                    }
                }

                let stats = MapTaskStats {
                    task_id,
                    files: files.len() as u64,
                    emits,
                    emits_after_combine,
                    wall_ms: task_start.elapsed().as_millis() as u64,
                };
                Ok((buckets, stats))
            })
            .collect::<Result<Vec<_>>>()?;

        let map_task_stats: Vec<MapTaskStats> =
            task_outputs.iter().map(|(_, s)| s.clone()).collect();
        let map_stats = MapStats::aggregate(&map_task_stats, map_start.elapsed().as_millis() as u64);
        info!(
            phase = "map",
            tasks = map_stats.tasks,
            total_emits = map_stats.total_emits,
            emits_after_combine = map_stats.emits_after_combine,
            min_task_ms = map_stats.min_task_ms,
            max_task_ms = map_stats.max_task_ms,
            wall_ms = map_stats.wall_ms,
            "map phase complete"
        );

        // Grouped handoff: every contribution for a key lands in exactly
        // one partition because the partition function is pure and stable.
        let mut partitions: Vec<Vec<(M::Key, M::Value)>> =
            (0..num_reducers).map(|_| Vec::new()).collect();
        for (buckets, _) in task_outputs {
            for (r, bucket) in buckets.into_iter().enumerate() {
                partitions[r].extend(bucket);
            }
        }

        // Reduce phase: one task instance per partition, sequential over
        // its key groups, cleanup on every exit path.
        let reduce_start = Instant::now();
        let reduce_task_stats: Mutex<Vec<ReduceTaskStats>> = Mutex::new(Vec::new());
        partitions
            .into_par_iter()
            .enumerate()
            .try_for_each(|(r, pairs)| -> Result<()> {
                let task_start = Instant::now();
                let pairs_in = pairs.len() as u64;
                let mut groups: BTreeMap<M::Key, Vec<M::Value>> = BTreeMap::new();
                for (k, v) in pairs {
                    groups.entry(k).or_default().push(v);
                }

                let mut out = open_writer(format!("{}/part-{:05}.tsv", output_dir, r))?;
                let mut write_err: Option<anyhow::Error> = None;
                let mut reducer = reducer_factory(r);
                let run: Result<u64> = (|| {
                    reducer.setup()?;
                    let mut done: u64 = 0;
                    for (key, vals) in groups {
                        let mut emit = |line: String| {
                            if write_err.is_none() {
                                if let Err(e) = writeln!(out, "{}", line) {
                                    write_err = Some(e.into());
                                }
                            }
                        };
                        reducer.do_reduce(&key, vals, &mut emit)?;
                        done += 1;
                    }
                    Ok(done)
                })();
                let cleaned = reducer.cleanup();
                let groups_done = run?;
                cleaned?;
                if let Some(e) = write_err {
                    return Err(e);
                }
                out.flush()?;

                reduce_task_stats.lock().unwrap().push(ReduceTaskStats {
                    reducer: r,
                    pairs_in,
                    groups: groups_done,
                    wall_ms: task_start.elapsed().as_millis() as u64,
                });
                Ok(())
            })?;

        let reduce_stats = ReduceStats::aggregate(
            &reduce_task_stats.into_inner().unwrap(),
            reduce_start.elapsed().as_millis() as u64,
        );
        info!(
            phase = "reduce",
            reducers = reduce_stats.reducers,
            total_pairs = reduce_stats.total_pairs,
            total_groups = reduce_stats.total_groups,
            min_task_ms = reduce_stats.min_task_ms,
            max_task_ms = reduce_stats.max_task_ms,
            wall_ms = reduce_stats.wall_ms,
            "reduce phase complete"
        );
        info!(job = %self.job_name, wall_ms = job_start.elapsed().as_millis() as u64, "pipeline complete");

        Ok(())
    }
}

/// Reducer-less execution: each task owns private state built by `setup`,
/// is fed every line of its split, and is finished on every exit path.
/// The per-task states come back to the caller for merging.
pub fn run_map_only<S, FS, FL, FF>(
    inputs: &[String],
    setup: FS,
    on_line: FL,
    finish: FF,
) -> Result<Vec<S>>
where
    S: Send,
    FS: Fn(usize) -> Result<S> + Send + Sync,
    FL: Fn(&mut S, &str) -> Result<()> + Send + Sync,
    FF: Fn(&mut S) -> Result<()> + Send + Sync,
{
    let start = Instant::now();
    let mut all_files = Vec::new();
    for input in inputs {
        let mut files = list_files_recursive(input)?;
        all_files.append(&mut files);
    }
    let num_tasks = default_map_tasks(all_files.len());
    let chunks = split_round_robin(&all_files, num_tasks);
    info!(files = all_files.len(), tasks = num_tasks, "starting map-only scan");

    let states = (0..num_tasks)
        .into_par_iter()
        .map(|task_id| -> Result<S> {
            let mut state = setup(task_id)?;
            let run: Result<()> = (|| {
                for file in &chunks[task_id] {
                    for line in read_lines(file)?.filter_map(|l| l.ok()) {
                        on_line(&mut state, &line)?;
                    }
                }
                Ok(())
            })();
            let finished = finish(&mut state);
            run.and(finished)?;
            Ok(state)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        tasks = num_tasks,
        wall_ms = start.elapsed().as_millis() as u64,
        "map-only scan complete"
    );
    Ok(states)
}

fn split_round_robin(files: &[PathBuf], num_tasks: usize) -> Vec<Vec<PathBuf>> {
    (0..num_tasks)
        .map(|i| {
            files
                .iter()
                .enumerate()
                .filter(|(idx, _)| idx % num_tasks == i)
                .map(|(_, p)| p.clone())
                .collect()
        })
        .collect()
}
