//! Centralized environment variable names and fixed policy values.

/// Upper bound on documents per single bulk write to the document store.
/// The external store rejects oversized writes; larger batches are sliced.
pub const MAX_SINK_BATCH: usize = 50_000;

/// Container receiving every parsed record in the map-only store pipeline.
pub const ACCESS_LOG_CONTAINER: &str = "ACCESS_LOG";

/// Pre-loaded analysis file used by the cache-backed word count pipeline.
pub const ANALYSIS_CACHE_FILE: &str = "/comedies";

/// Pre-load reference declared by the access-log pipelines.
pub const ACCESS_LOG_CACHE_FILE: &str = "/access_log";

// Environment variable names
pub const ENV_MAP_TASKS: &str = "LOGMILL_MAP_TASKS";
pub const ENV_STORE_DIR: &str = "LOGMILL_STORE_DIR";

/// Default root directory of the file-backed document store.
pub const DEFAULT_STORE_DIR: &str = "map_reduce_db";
