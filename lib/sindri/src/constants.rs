//! Centralized environment variable names and default values for pipeline tuning.

// Environment variable names
pub const ENV_POOL_SIZE: &str = "SINDRI_POOL_SIZE";
pub const ENV_REDUCE_POOL_SIZE: &str = "SINDRI_REDUCE_POOL_SIZE";
pub const ENV_REDUCE_THREAD_PER_TOKEN: &str = "SINDRI_REDUCE_THREAD_PER_TOKEN";
pub const ENV_PARALLEL_GROUP: &str = "SINDRI_PARALLEL_GROUP";
pub const ENV_GROUP_BATCH: &str = "SINDRI_GROUP_BATCH";
pub const ENV_COLLECTOR_CAPACITY: &str = "SINDRI_COLLECTOR_CAPACITY";

// Defaults
/// Mapped items handed to one task by the pool-parallel group strategy.
pub const DEFAULT_GROUP_BATCH: usize = 4096;
/// Queue depth in front of the reduce collector thread before producers block.
pub const DEFAULT_COLLECTOR_CAPACITY: usize = 1024;
