pub mod api;
pub mod barrier;
pub mod collector;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod model;
pub mod naive;
pub mod runtime;
pub mod stats;
pub mod utils;

pub use api::{Mapper, OccurrenceReducer, Reducer, WhitespaceMapper};
pub use config::{GroupStrategy, PipelineConfig, ReduceMode};
pub use error::{Phase, PipelineError, Result, TaskFailure};
pub use io::{load_work_items, write_results, OutputFormat};
pub use model::{FinalResult, GroupedItems, MappedItem, SourceCounts, WorkItemStore};
pub use runtime::{word_count, PipelineOutput, RuntimePipeline};
pub use stats::{PhaseStats, PipelineStats};
