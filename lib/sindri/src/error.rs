use crate::model::FinalResult;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Load,
    Map,
    Group,
    Reduce,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Map => "map",
            Phase::Group => "group",
            Phase::Reduce => "reduce",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single task that faulted while its phase was running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Source key for map tasks, token for reduce tasks, batch label for group tasks.
    pub label: String,
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.message)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A work item's content could not be read.
    #[error("input unavailable: {path}: {source}")]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two inputs map to the same source key.
    #[error("duplicate source key {key:?} ({first} and {second})")]
    DuplicateSource {
        key: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build {phase} pool: {source}")]
    PoolBuild {
        phase: Phase,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    /// One or more tasks of a phase faulted. Raised only after the barrier.
    ///
    /// `partial` carries what the successful tasks produced when that output
    /// is already a final result (reduce phase); it is `None` otherwise.
    #[error("{} of {} {phase} task(s) failed: {}", .failures.len(), .failures.len() + .succeeded, summarize(.failures))]
    TaskFailed {
        phase: Phase,
        failures: Vec<TaskFailure>,
        succeeded: usize,
        partial: Option<FinalResult>,
    },

    /// The wait on a phase barrier was abandoned; partial results are discarded.
    #[error("{phase} barrier interrupted: {reason}")]
    Interrupted { phase: Phase, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            PipelineError::InputUnavailable { .. } | PipelineError::DuplicateSource { .. } => Some(Phase::Load),
            PipelineError::PoolBuild { phase, .. }
            | PipelineError::TaskFailed { phase, .. }
            | PipelineError::Interrupted { phase, .. } => Some(*phase),
            PipelineError::InvalidConfig(_) | PipelineError::Io(_) => None,
        }
    }

    /// Tokens that were fully reduced before the run failed, if any were kept.
    pub fn partial_result(&self) -> Option<&FinalResult> {
        match self {
            PipelineError::TaskFailed { partial, .. } => partial.as_ref(),
            _ => None,
        }
    }
}

fn summarize(failures: &[TaskFailure]) -> String {
    const SHOWN: usize = 3;
    let mut parts: Vec<String> = failures.iter().take(SHOWN).map(|f| f.to_string()).collect();
    if failures.len() > SHOWN {
        parts.push(format!("... and {} more", failures.len() - SHOWN));
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_failed_message_lists_failures() {
        let err = PipelineError::TaskFailed {
            phase: Phase::Map,
            failures: vec![TaskFailure { label: "a.txt".into(), message: "boom".into() }],
            succeeded: 2,
            partial: None,
        };
        assert_eq!(err.to_string(), "1 of 3 map task(s) failed: a.txt: boom");
        assert_eq!(err.phase(), Some(Phase::Map));
        assert!(err.partial_result().is_none());
    }

    #[test]
    fn interrupted_never_carries_partial_results() {
        let err = PipelineError::Interrupted { phase: Phase::Reduce, reason: "collector died".into() };
        assert!(err.partial_result().is_none());
    }

    #[test]
    fn summary_is_truncated() {
        let failures: Vec<TaskFailure> = (0..5)
            .map(|i| TaskFailure { label: format!("t{}", i), message: "x".into() })
            .collect();
        let s = summarize(&failures);
        assert!(s.starts_with("t0: x; t1: x; t2: x"));
        assert!(s.ends_with("... and 2 more"));
    }
}
