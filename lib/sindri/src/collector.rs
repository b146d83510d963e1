use crate::model::{FinalResult, GroupedItems, MappedItem, SourceCounts};
use crate::utils::lock;
use crossbeam_channel as channel;
use std::sync::Mutex;
use std::thread;
use tracing::{debug, warn};

// ============== Map aggregation point ==============

/// Shared sink for map task output. Each delivery lands under one lock, so
/// batches never interleave and keep their own token order.
#[derive(Default)]
pub struct MapCollector {
    items: Mutex<Vec<MappedItem>>,
}

impl MapCollector {
    pub fn new() -> Self { Self::default() }

    pub fn map_done(&self, source: &str, mut results: Vec<MappedItem>) {
        let mut guard = lock(&self.items);
        debug!(source, items = results.len(), merged_before = guard.len(), "map results merged");
        guard.append(&mut results);
    }

    pub fn into_items(self) -> Vec<MappedItem> {
        self.items.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

// ============== Group aggregation point ==============

/// Token table shared by pool-parallel group tasks.
#[derive(Default)]
pub struct SharedGroups {
    inner: Mutex<GroupedItems>,
}

impl SharedGroups {
    pub fn new() -> Self { Self::default() }

    /// Lookup-or-insert and append happen inside one critical section, so two
    /// first writers of the same token cannot each install a fresh list.
    pub fn append(&self, token: &str, source: &str) {
        lock(&self.inner).append(token, source);
    }

    pub fn into_grouped(self) -> GroupedItems {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

// ============== Reduce aggregation point ==============

enum CollectorMsg {
    Reduced(String, SourceCounts),
}

/// Producer side handed to reduce tasks. Cloned freely; the collector stops
/// once every clone has been dropped.
#[derive(Clone)]
pub struct ResultSender {
    tx: channel::Sender<CollectorMsg>,
}

impl ResultSender {
    pub fn reduce_done(&self, token: String, counts: SourceCounts) {
        if self.tx.send(CollectorMsg::Reduced(token, counts)).is_err() {
            // Only possible if the collector thread itself died.
            warn!("result collector is gone; reduce output dropped");
        }
    }
}

pub struct CollectorHandle {
    handle: thread::JoinHandle<FinalResult>,
}

impl CollectorHandle {
    /// Blocks until all senders are dropped and the collector has drained its queue.
    pub fn finish(self) -> thread::Result<FinalResult> { self.handle.join() }
}

/// Single consumer that owns the final result and applies merges one at a time.
pub struct ResultCollector;

impl ResultCollector {
    pub fn spawn(capacity: usize) -> std::io::Result<(ResultSender, CollectorHandle)> {
        let (tx, rx) = channel::bounded::<CollectorMsg>(capacity);
        let handle = thread::Builder::new()
            .name("sindri-reduce-collector".into())
            .spawn(move || {
                let mut result = FinalResult::new();
                for msg in rx {
                    match msg {
                        CollectorMsg::Reduced(token, counts) => {
                            if let Some(previous) = result.insert(token, counts) {
                                warn!(sources = previous.len(), "token reduced twice; earlier counts replaced");
                            }
                        }
                    }
                }
                result
            })?;
        Ok((ResultSender { tx }, CollectorHandle { handle }))
    }
}
