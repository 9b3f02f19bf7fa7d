use serde::Serialize;

#[derive(Clone, Debug)]
pub struct MapTaskStats {
    pub task_id: usize,
    pub files: u64,
    pub emits: u64,
    pub emits_after_combine: u64,
    pub wall_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ReduceTaskStats {
    pub reducer: usize,
    pub pairs_in: u64,
    pub groups: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct MapStats {
    pub tasks: usize,
    pub files: u64,
    pub total_emits: u64,
    pub emits_after_combine: u64,
    pub min_task_ms: u64,
    pub max_task_ms: u64,
    pub wall_ms: u64,
}

impl MapStats {
    pub fn aggregate(per_task: &[MapTaskStats], wall_ms: u64) -> MapStats {
        MapStats {
            tasks: per_task.len(),
            files: per_task.iter().map(|t| t.files).sum(),
            total_emits: per_task.iter().map(|t| t.emits).sum(),
            emits_after_combine: per_task.iter().map(|t| t.emits_after_combine).sum(),
            min_task_ms: per_task.iter().map(|t| t.wall_ms).min().unwrap_or(0),
            max_task_ms: per_task.iter().map(|t| t.wall_ms).max().unwrap_or(0),
            wall_ms,
        }
    }
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct ReduceStats {
    pub reducers: usize,
    pub total_pairs: u64,
    pub total_groups: u64,
    pub min_task_ms: u64,
    pub max_task_ms: u64,
    pub wall_ms: u64,
}

impl ReduceStats {
    pub fn aggregate(per_task: &[ReduceTaskStats], wall_ms: u64) -> ReduceStats {
        ReduceStats {
            reducers: per_task.len(),
            total_pairs: per_task.iter().map(|t| t.pairs_in).sum(),
            total_groups: per_task.iter().map(|t| t.groups).sum(),
            min_task_ms: per_task.iter().map(|t| t.wall_ms).min().unwrap_or(0),
            max_task_ms: per_task.iter().map(|t| t.wall_ms).max().unwrap_or(0),
            wall_ms,
        }
    }
}
