use crate::barrier::PhaseReport;
use crate::error::Phase;
use serde::Serialize;
use std::time::Instant;

#[derive(Clone, Debug, Serialize)]
pub struct PhaseStats {
    pub phase: Phase,
    pub tasks: usize,
    pub items_in: u64,
    pub items_out: u64,
    pub min_task_ms: u64,
    pub max_task_ms: u64,
    pub wall_ms: u64,
    pub since_start_ms: u64,
}

impl PhaseStats {
    pub fn from_report(phase: Phase, report: &PhaseReport, items_in: u64, items_out: u64) -> Self {
        Self {
            phase,
            tasks: report.tasks,
            items_in,
            items_out,
            min_task_ms: report.min_task_ms,
            max_task_ms: report.max_task_ms,
            wall_ms: report.wall_ms,
            since_start_ms: report.since_start_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PipelineStats {
    pub pool_size: usize,
    pub map: Option<PhaseStats>,
    pub group: Option<PhaseStats>,
    pub reduce: Option<PhaseStats>,
    pub total_ms: u64,
}

pub struct StatsCollector {
    started: Instant,
    pool_size: usize,
    map: Option<PhaseStats>,
    group: Option<PhaseStats>,
    reduce: Option<PhaseStats>,
}

impl StatsCollector {
    pub fn new(started: Instant, pool_size: usize) -> Self {
        Self { started, pool_size, map: None, group: None, reduce: None }
    }

    pub fn record_map(&mut self, report: &PhaseReport, sources: u64, mapped_items: u64) {
        self.map = Some(PhaseStats::from_report(Phase::Map, report, sources, mapped_items));
    }

    pub fn record_group(&mut self, report: &PhaseReport, mapped_items: u64, tokens: u64) {
        self.group = Some(PhaseStats::from_report(Phase::Group, report, mapped_items, tokens));
    }

    pub fn record_reduce(&mut self, report: &PhaseReport, tokens: u64, entries: u64) {
        self.reduce = Some(PhaseStats::from_report(Phase::Reduce, report, tokens, entries));
    }

    pub fn finish(self) -> PipelineStats {
        PipelineStats {
            pool_size: self.pool_size,
            map: self.map,
            group: self.group,
            reduce: self.reduce,
            total_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
