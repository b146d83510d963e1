use crate::error::{Phase, PipelineError, Result, TaskFailure};
use crate::utils::lock;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info};

/// Where a phase's tasks run.
pub enum Executor {
    /// Fixed-width rayon pool, torn down when dropped.
    Pool(rayon::ThreadPool),
    /// One scoped OS thread per task.
    ThreadPerTask,
}

impl Executor {
    /// A pool of exactly `size` threads. rayon reads 0 as "pick for me", so it is rejected here.
    pub fn pool(phase: Phase, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(PipelineError::InvalidConfig(format!("{} pool size must be at least 1", phase)));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(move |i| format!("sindri-{}-{}", phase, i))
            .build()
            .map_err(|source| PipelineError::PoolBuild { phase, source })?;
        Ok(Executor::Pool(pool))
    }

    /// `None` means unbounded.
    pub fn width(&self) -> Option<usize> {
        match self {
            Executor::Pool(pool) => Some(pool.current_num_threads()),
            Executor::ThreadPerTask => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PhaseReport {
    pub tasks: usize,
    pub min_task_ms: u64,
    pub max_task_ms: u64,
    pub wall_ms: u64,
    /// Elapsed time from pipeline start to the moment the barrier was crossed.
    pub since_start_ms: u64,
}

struct TaskOutcome {
    wall_ms: u64,
    failure: Option<TaskFailure>,
}

/// Submit N tasks, block until all N finished, then release the caller.
///
/// The wait is a blocking join (rayon's scope latch or `JoinHandle::join`);
/// the calling thread sleeps while tasks run. Task panics are caught and
/// reported together once every task of the phase has completed.
pub struct PhaseBarrier {
    phase: Phase,
    pipeline_start: Instant,
}

impl PhaseBarrier {
    pub fn new(phase: Phase, pipeline_start: Instant) -> Self { Self { phase, pipeline_start } }

    pub fn run<T, F>(&self, executor: &Executor, tasks: Vec<(String, T)>, task_fn: F) -> Result<PhaseReport>
    where
        T: Send,
        F: Fn(&str, T) + Sync,
    {
        let phase = self.phase;
        let phase_start = Instant::now();
        let task_count = tasks.len();
        let outcomes: Mutex<Vec<TaskOutcome>> = Mutex::new(Vec::with_capacity(task_count));

        let run_one = |label: String, item: T| {
            let task_start = Instant::now();
            let result = panic::catch_unwind(AssertUnwindSafe(|| task_fn(&label, item)));
            let wall_ms = task_start.elapsed().as_millis() as u64;
            let failure = match result {
                Ok(()) => {
                    debug!(phase = phase.as_str(), task = %label, wall_ms, "task done");
                    None
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(phase = phase.as_str(), task = %label, %message, "task failed");
                    Some(TaskFailure { label, message })
                }
            };
            lock(&outcomes).push(TaskOutcome { wall_ms, failure });
        };

        info!(phase = phase.as_str(), tasks = task_count, width = ?executor.width(), "phase starting");
        match executor {
            Executor::Pool(pool) => pool.scope(|s| {
                let run_one = &run_one;
                for (label, item) in tasks {
                    s.spawn(move |_| run_one(label, item));
                }
            }),
            Executor::ThreadPerTask => self.join_per_task(tasks, &run_one)?,
        }

        let outcomes = outcomes.into_inner().unwrap_or_else(|e| e.into_inner());
        let min_task_ms = outcomes.iter().map(|o| o.wall_ms).min().unwrap_or(0);
        let max_task_ms = outcomes.iter().map(|o| o.wall_ms).max().unwrap_or(0);
        let failures: Vec<TaskFailure> = outcomes.into_iter().filter_map(|o| o.failure).collect();
        let report = PhaseReport {
            tasks: task_count,
            min_task_ms,
            max_task_ms,
            wall_ms: phase_start.elapsed().as_millis() as u64,
            since_start_ms: self.pipeline_start.elapsed().as_millis() as u64,
        };

        if !failures.is_empty() {
            error!(phase = phase.as_str(), failed = failures.len(), tasks = task_count, "phase barrier crossed with failures");
            return Err(PipelineError::TaskFailed { phase, succeeded: task_count - failures.len(), failures, partial: None });
        }
        info!(phase = phase.as_str(), tasks = task_count, min_task_ms, max_task_ms,
              wall_ms = report.wall_ms, since_start_ms = report.since_start_ms,
              "phase barrier crossed");
        Ok(report)
    }

    fn join_per_task<T, G>(&self, tasks: Vec<(String, T)>, run_one: &G) -> Result<()>
    where
        T: Send,
        G: Fn(String, T) + Sync,
    {
        let phase = self.phase;
        thread::scope(|s| {
            let mut handles = Vec::with_capacity(tasks.len());
            let mut spawn_error = None;
            for (i, (label, item)) in tasks.into_iter().enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("sindri-{}-{}", phase, i))
                    .spawn_scoped(s, move || run_one(label, item));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        break;
                    }
                }
            }
            // Every spawned thread is joined before any error is reported.
            let unjoined = handles.into_iter().map(|h| h.join()).filter(|r| r.is_err()).count();
            if let Some(e) = spawn_error {
                return Err(PipelineError::Interrupted { phase, reason: format!("could not spawn task thread: {}", e) });
            }
            if unjoined > 0 {
                return Err(PipelineError::Interrupted { phase, reason: format!("{} task thread(s) did not join cleanly", unjoined) });
            }
            Ok(())
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn labelled(n: usize) -> Vec<(String, usize)> {
        (0..n).map(|i| (format!("t{}", i), i)).collect()
    }

    #[test]
    fn pool_barrier_waits_for_every_task() {
        let executor = Executor::pool(Phase::Map, 2).unwrap();
        let done = AtomicUsize::new(0);
        let barrier = PhaseBarrier::new(Phase::Map, Instant::now());
        let report = barrier
            .run(&executor, labelled(16), |_, i| {
                thread::sleep(Duration::from_millis((i % 3) as u64));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 16);
        assert_eq!(report.tasks, 16);
        assert!(report.min_task_ms <= report.max_task_ms);
        assert_eq!(executor.width(), Some(2));
    }

    #[test]
    fn thread_per_task_barrier_waits_for_every_task() {
        let done = AtomicUsize::new(0);
        let barrier = PhaseBarrier::new(Phase::Reduce, Instant::now());
        let report = barrier
            .run(&Executor::ThreadPerTask, labelled(8), |_, _| {
                thread::sleep(Duration::from_millis(2));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert_eq!(report.tasks, 8);
    }

    #[test]
    fn failures_are_reported_after_all_tasks_ran() {
        let executor = Executor::pool(Phase::Map, 3).unwrap();
        let done = AtomicUsize::new(0);
        let barrier = PhaseBarrier::new(Phase::Map, Instant::now());
        let err = barrier
            .run(&executor, labelled(10), |label, i| {
                if i == 4 {
                    panic!("bad input in {}", label);
                }
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();
        assert_eq!(done.load(Ordering::SeqCst), 9);
        match err {
            PipelineError::TaskFailed { phase, failures, succeeded, partial } => {
                assert_eq!(phase, Phase::Map);
                assert_eq!(succeeded, 9);
                assert_eq!(failures, vec![TaskFailure { label: "t4".into(), message: "bad input in t4".into() }]);
                assert!(partial.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_phase_crosses_immediately() {
        let barrier = PhaseBarrier::new(Phase::Reduce, Instant::now());
        let report = barrier.run(&Executor::ThreadPerTask, Vec::<(String, ())>::new(), |_, _| {}).unwrap();
        assert_eq!(report.tasks, 0);
        assert_eq!(report.max_task_ms, 0);
    }

    #[test]
    fn zero_width_pool_is_rejected() {
        let err = Executor::pool(Phase::Group, 0).err().expect("zero-width pool must not build");
        assert!(matches!(err, PipelineError::InvalidConfig(ref msg) if msg.contains("group")), "{err:?}");
        assert_eq!(Executor::pool(Phase::Group, 1).unwrap().width(), Some(1));
    }

    #[test]
    fn panic_message_handles_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "task panicked");
    }
}
