pub mod aggregate;
pub mod api;
pub mod constants;
pub mod counters;
pub mod domain;
pub mod extract;
pub mod io;
pub mod parser;
pub mod partition;
pub mod runtime;
pub mod sink;
pub mod stats;
pub mod utils;

pub use aggregate::{NoCombiner, SumCombiner, SumReducer, ValueTallyReducer};
pub use api::{Combiner, Mapper, Partitioner, Reducer};
pub use counters::Counters;
pub use domain::{BucketDomain, ContainerDomain, Hour, Month};
pub use parser::{parse_line, AccessLogRecord, ParsedFields};
pub use partition::{DomainPartitioner, HashPartitioner};
pub use runtime::{run_map_only, RuntimePipeline};
pub use sink::{Document, DocumentStore, JsonlStore, MemoryStore, SinkAdapter, SinkReducer};
