use crate::api::{Mapper, OccurrenceReducer, Reducer, WhitespaceMapper};
use crate::barrier::{Executor, PhaseBarrier, PhaseReport};
use crate::collector::{MapCollector, ResultCollector, SharedGroups};
use crate::config::{GroupStrategy, PipelineConfig, ReduceMode};
use crate::error::{Phase, PipelineError, Result};
use crate::model::{FinalResult, GroupedItems, MappedItem, WorkItemStore};
use crate::stats::{PipelineStats, StatsCollector};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub result: FinalResult,
    pub stats: PipelineStats,
}

/// Map -> Group -> Reduce, each phase fully drained before the next starts.
///
/// Every structure a run touches (pools, collectors, intermediate tables) is
/// created inside `run` and dropped before it returns.
pub struct RuntimePipeline {
    config: PipelineConfig,
}

impl RuntimePipeline {
    pub fn new(config: PipelineConfig) -> Self { Self { config } }

    pub fn run<M, R>(&self, store: &WorkItemStore, mapper: &M, reducer: &R) -> Result<PipelineOutput>
    where
        M: Mapper + Sync,
        R: Reducer + Sync,
    {
        self.config.validate()?;
        let started = Instant::now();
        let pool_size = self.config.pool_size;
        let mut stats = StatsCollector::new(started, pool_size);
        info!(
            sources = store.len(), bytes = store.total_bytes(), pool_size,
            group = ?self.config.group_strategy, reduce = ?self.config.reduce_mode,
            "Pipeline starting"
        );

        // Map phase
        let map_pool = Executor::pool(Phase::Map, pool_size)?;
        let (mapped, map_report) = map_phase(&map_pool, started, store, mapper)?;
        drop(map_pool);
        stats.record_map(&map_report, store.len() as u64, mapped.len() as u64);
        info!(phase = "map", pool_size, mapped_items = mapped.len(),
              wall_ms = map_report.wall_ms, since_start_ms = map_report.since_start_ms,
              "Map phase complete");

        // Group phase
        let (grouped, group_report) = match self.config.group_strategy {
            GroupStrategy::Sequential => group_sequential(started, &mapped),
            GroupStrategy::Parallel => {
                // Same width as the map pool, but its own threads so they carry the group name.
                let group_pool = Executor::pool(Phase::Group, pool_size)?;
                group_parallel(&group_pool, started, &mapped, self.config.group_batch)?
            }
        };
        stats.record_group(&group_report, mapped.len() as u64, grouped.len() as u64);
        info!(phase = "group", tokens = grouped.len(), occurrences = grouped.total_occurrences(),
              wall_ms = group_report.wall_ms, since_start_ms = group_report.since_start_ms,
              "Group phase complete");
        if grouped.total_occurrences() != mapped.len() {
            warn!(mapped = mapped.len(), grouped = grouped.total_occurrences(), "group phase occurrence count mismatch");
        }
        drop(mapped);

        // Reduce phase
        let reduce_exec = match self.config.reduce_mode {
            ReduceMode::Pooled { pool_size } => Executor::pool(Phase::Reduce, pool_size)?,
            ReduceMode::ThreadPerToken => Executor::ThreadPerTask,
        };
        let tokens = grouped.len() as u64;
        let (result, reduce_report) = reduce_phase(&reduce_exec, started, grouped, reducer, self.config.collector_capacity)?;
        let entries: u64 = result.values().map(|c| c.len() as u64).sum();
        let counted: u64 = result.values().flat_map(|c| c.values()).sum();
        stats.record_reduce(&reduce_report, tokens, entries);
        info!(phase = "reduce", tokens, entries, counted,
              wall_ms = reduce_report.wall_ms, since_start_ms = reduce_report.since_start_ms,
              "Reduce phase complete");

        let stats = stats.finish();
        info!(pool_size, total_ms = stats.total_ms, "Pipeline complete");
        Ok(PipelineOutput { result, stats })
    }

    pub fn word_count(&self, store: &WorkItemStore) -> Result<PipelineOutput> {
        self.run(store, &WhitespaceMapper, &OccurrenceReducer)
    }
}

/// Whitespace word count with default settings and the given map pool width.
pub fn word_count(store: &WorkItemStore, pool_size: usize) -> Result<FinalResult> {
    let pipeline = RuntimePipeline::new(PipelineConfig::new(pool_size));
    Ok(pipeline.word_count(store)?.result)
}

/// One task per source on `executor`; every task's items go through a single `MapCollector`.
pub fn map_phase<M>(executor: &Executor, started: Instant, store: &WorkItemStore, mapper: &M) -> Result<(Vec<MappedItem>, PhaseReport)>
where
    M: Mapper + Sync,
{
    let collector = MapCollector::new();
    let tasks: Vec<(String, &str)> = store.iter().map(|(source, content)| (source.to_string(), content)).collect();
    let report = PhaseBarrier::new(Phase::Map, started).run(executor, tasks, |source, content| {
        let mut results = Vec::new();
        mapper.do_map(source, content, &mut |item| results.push(item));
        collector.map_done(source, results);
    })?;
    Ok((collector.into_items(), report))
}

/// Single pass on the calling thread; token lists mirror `mapped` order.
pub fn group_sequential(started: Instant, mapped: &[MappedItem]) -> (GroupedItems, PhaseReport) {
    let phase_start = Instant::now();
    let mut grouped = GroupedItems::new();
    for item in mapped {
        grouped.append(&item.token, &item.source);
    }
    let wall_ms = phase_start.elapsed().as_millis() as u64;
    let report = PhaseReport {
        tasks: 1,
        min_task_ms: wall_ms,
        max_task_ms: wall_ms,
        wall_ms,
        since_start_ms: started.elapsed().as_millis() as u64,
    };
    (grouped, report)
}

/// Batches of `mapped` folded on `executor` into one `SharedGroups` table.
/// Order of sources within a token's list depends on scheduling.
pub fn group_parallel(executor: &Executor, started: Instant, mapped: &[MappedItem], batch: usize) -> Result<(GroupedItems, PhaseReport)> {
    let shared = SharedGroups::new();
    let tasks: Vec<(String, &[MappedItem])> = mapped
        .chunks(batch.max(1))
        .enumerate()
        .map(|(i, chunk)| (format!("batch-{}", i), chunk))
        .collect();
    let report = PhaseBarrier::new(Phase::Group, started).run(executor, tasks, |_, chunk| {
        for item in chunk {
            shared.append(&item.token, &item.source);
        }
    })?;
    Ok((shared.into_grouped(), report))
}

/// One task per distinct token. Counts reach the result only through the collector thread.
///
/// When some reduce tasks fail, the tokens that did reduce are handed back in
/// the error's `partial` result. A collector that dies loses everything.
pub fn reduce_phase<R>(executor: &Executor, started: Instant, grouped: GroupedItems, reducer: &R, collector_capacity: usize) -> Result<(FinalResult, PhaseReport)>
where
    R: Reducer + Sync,
{
    let (sender, collector) = ResultCollector::spawn(collector_capacity).map_err(|e| PipelineError::Interrupted {
        phase: Phase::Reduce,
        reason: format!("could not start result collector: {}", e),
    })?;
    let tasks: Vec<(String, Vec<String>)> = grouped.into_iter().collect();
    let barrier = PhaseBarrier::new(Phase::Reduce, started).run(executor, tasks, |token, sources| {
        let counts = reducer.do_reduce(token, sources.iter().map(String::as_str));
        sender.reduce_done(token.to_string(), counts);
    });
    // The collector sees end-of-stream only once the last sender is gone.
    drop(sender);
    let result = collector.finish().map_err(|_| PipelineError::Interrupted {
        phase: Phase::Reduce,
        reason: "result collector panicked".into(),
    })?;
    match barrier {
        Ok(report) => Ok((result, report)),
        Err(PipelineError::TaskFailed { phase, failures, succeeded, .. }) => {
            warn!(kept_tokens = result.len(), failed = failures.len(), "reduce failed; keeping tokens that completed");
            Err(PipelineError::TaskFailed { phase, failures, succeeded, partial: Some(result) })
        }
        Err(e) => Err(e),
    }
}
