use crate::constants::ENV_MAP_TASKS;

pub fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse::<usize>().ok())
}

pub fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Map task count: env override or available cores, never more than one
/// task per input file.
pub fn default_map_tasks(num_files: usize) -> usize {
    let n = env_usize(ENV_MAP_TASKS).unwrap_or_else(num_cpus::get);
    n.max(1).min(num_files.max(1))
}
