use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::utils::{cpu_count, is_truthy, parse_trimmed};
use serde::Serialize;

/// How the Group phase folds mapped items into `GroupedItems`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStrategy {
    /// Single pass on the calling thread. Deterministic.
    #[default]
    Sequential,
    /// Batches of mapped items folded on a map-sized pool into one shared table.
    Parallel,
}

/// Where the one-task-per-token reduce work runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceMode {
    /// Bounded pool, sized independently of the map pool.
    Pooled { pool_size: usize },
    /// One OS thread per distinct token, no upper bound.
    ThreadPerToken,
}

impl Default for ReduceMode {
    fn default() -> Self { ReduceMode::Pooled { pool_size: cpu_count() } }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    /// Width of the map pool (and of the group pool in `GroupStrategy::Parallel`).
    pub pool_size: usize,
    pub group_strategy: GroupStrategy,
    pub reduce_mode: ReduceMode,
    pub group_batch: usize,
    pub collector_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self { Self::new(cpu_count()) }
}

impl PipelineConfig {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            group_strategy: GroupStrategy::default(),
            reduce_mode: ReduceMode::default(),
            group_batch: DEFAULT_GROUP_BATCH,
            collector_capacity: DEFAULT_COLLECTOR_CAPACITY,
        }
    }

    /// Defaults overridden by any `SINDRI_*` variables that are set and parse.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |name: &str| lookup(name).and_then(|v| parse_trimmed::<usize>(&v));
        let truthy = |name: &str| lookup(name).map_or(false, |v| is_truthy(&v));

        let mut config = Self::default();
        if let Some(n) = parsed(ENV_POOL_SIZE) { config.pool_size = n; }
        if truthy(ENV_REDUCE_THREAD_PER_TOKEN) {
            config.reduce_mode = ReduceMode::ThreadPerToken;
        } else if let Some(n) = parsed(ENV_REDUCE_POOL_SIZE) {
            config.reduce_mode = ReduceMode::Pooled { pool_size: n };
        }
        if truthy(ENV_PARALLEL_GROUP) { config.group_strategy = GroupStrategy::Parallel; }
        if let Some(n) = parsed(ENV_GROUP_BATCH) { config.group_batch = n; }
        if let Some(n) = parsed(ENV_COLLECTOR_CAPACITY) { config.collector_capacity = n; }
        config
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self { self.pool_size = pool_size; self }

    pub fn with_group_strategy(mut self, strategy: GroupStrategy) -> Self { self.group_strategy = strategy; self }

    pub fn with_reduce_mode(mut self, mode: ReduceMode) -> Self { self.reduce_mode = mode; self }

    pub fn with_group_batch(mut self, batch: usize) -> Self { self.group_batch = batch; self }

    pub fn with_collector_capacity(mut self, capacity: usize) -> Self { self.collector_capacity = capacity; self }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(PipelineError::InvalidConfig("pool_size must be at least 1".into()));
        }
        if let ReduceMode::Pooled { pool_size: 0 } = self.reduce_mode {
            return Err(PipelineError::InvalidConfig("reduce pool_size must be at least 1".into()));
        }
        if self.group_batch == 0 {
            return Err(PipelineError::InvalidConfig("group_batch must be at least 1".into()));
        }
        if self.collector_capacity == 0 {
            return Err(PipelineError::InvalidConfig("collector_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::new(2);
        assert!(config.validate().is_ok());
        assert_eq!(config.group_strategy, GroupStrategy::Sequential);
        assert!(matches!(config.reduce_mode, ReduceMode::Pooled { pool_size } if pool_size >= 1));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(PipelineConfig::new(0).validate(), Err(PipelineError::InvalidConfig(_))));
        let reduce = PipelineConfig::new(1).with_reduce_mode(ReduceMode::Pooled { pool_size: 0 });
        assert!(reduce.validate().is_err());
        assert!(PipelineConfig::new(1).with_group_batch(0).validate().is_err());
        assert!(PipelineConfig::new(1).with_collector_capacity(0).validate().is_err());
    }

    #[test]
    fn thread_per_token_needs_no_reduce_pool() {
        let config = PipelineConfig::new(1).with_reduce_mode(ReduceMode::ThreadPerToken);
        assert!(config.validate().is_ok());
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn env_overrides_defaults() {
        let env = vars(&[
            (ENV_POOL_SIZE, "3"),
            (ENV_PARALLEL_GROUP, "yes"),
            (ENV_REDUCE_POOL_SIZE, "5"),
            (ENV_GROUP_BATCH, "not-a-number"),
        ]);
        let config = PipelineConfig::from_lookup(|name| env.get(name).cloned());
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.group_strategy, GroupStrategy::Parallel);
        assert_eq!(config.reduce_mode, ReduceMode::Pooled { pool_size: 5 });
        assert_eq!(config.group_batch, DEFAULT_GROUP_BATCH);
    }

    #[test]
    fn thread_per_token_env_wins_over_reduce_pool_size() {
        let env = vars(&[(ENV_REDUCE_THREAD_PER_TOKEN, "1"), (ENV_REDUCE_POOL_SIZE, "4"), (ENV_COLLECTOR_CAPACITY, " 8 ")]);
        let config = PipelineConfig::from_lookup(|name| env.get(name).cloned());
        assert_eq!(config.reduce_mode, ReduceMode::ThreadPerToken);
        assert_eq!(config.collector_capacity, 8);
    }

    #[test]
    fn empty_lookup_gives_defaults() {
        assert_eq!(PipelineConfig::from_lookup(|_| None), PipelineConfig::default());
    }
}
