// Background batch pipeline.
// A bounded queue of observed batches drained by a fixed pool of cancellable workers.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{Coordinates, StatsFetcher, Store};
use crate::cache::CacheMerger;
use crate::extract::Observation;
use crate::geocode::LocalityResolver;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_WORKERS: usize = 2;

/// Stations from one intercepted response, waiting to be merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub locality: Option<String>,
    pub anchor: Option<Coordinates>,
    pub channel: i64,
    pub stores: Vec<Store>,
}

impl From<Observation> for Batch {
    fn from(observation: Observation) -> Self {
        Self {
            locality: observation.locality,
            anchor: observation.anchor,
            channel: observation.channel,
            stores: observation.stores,
        }
    }
}

/// Sending half of the batch queue. Never waits.
#[derive(Debug, Clone)]
pub struct BatchQueue {
    tx: mpsc::Sender<Batch>,
}

/// Receiving half, shared by the workers.
pub type BatchReceiver = Arc<Mutex<mpsc::Receiver<Batch>>>;

impl BatchQueue {
    /// Create a queue holding at most `capacity` pending batches.
    pub fn bounded(capacity: usize) -> (Self, BatchReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, Arc::new(Mutex::new(rx)))
    }

    /// Enqueue a batch without waiting. Returns false if it was dropped.
    pub fn submit(&self, batch: Batch) -> bool {
        match self.tx.try_send(batch) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(batch)) => {
                warn!(stores = batch.stores.len(), "batch queue full, dropping observation");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("batch queue closed, dropping observation");
                false
            }
        }
    }
}

/// Start `count` workers that merge queued batches until shutdown or queue close.
pub fn spawn_workers<F>(
    count: usize,
    merger: Arc<CacheMerger<F>>,
    resolver: LocalityResolver,
    rx: BatchReceiver,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>>
where
    F: StatsFetcher + 'static,
{
    (0..count.max(1))
        .map(|id| {
            let worker = Worker {
                id,
                merger: merger.clone(),
                resolver: resolver.clone(),
                rx: rx.clone(),
            };
            tokio::spawn(worker.run(shutdown.clone()))
        })
        .collect()
}

struct Worker<F> {
    id: usize,
    merger: Arc<CacheMerger<F>>,
    resolver: LocalityResolver,
    rx: BatchReceiver,
}

impl<F: StatsFetcher + 'static> Worker<F> {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        debug!(worker = self.id, "worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                batch = self.next_batch() => {
                    let Some(batch) = batch else { break };
                    tokio::select! {
                        _ = shutdown.changed() => {
                            warn!(worker = self.id, "shutdown while merging, batch abandoned");
                            break;
                        }
                        _ = self.process(batch) => {}
                    }
                }
            }
        }
        info!(worker = self.id, "worker stopped");
    }

    async fn next_batch(&self) -> Option<Batch> {
        self.rx.lock().await.recv().await
    }

    async fn process(&self, batch: Batch) {
        if batch.stores.is_empty() {
            return;
        }
        let locality = self
            .resolver
            .resolve(batch.locality.as_deref(), batch.anchor)
            .await;
        self.merger
            .process_batch(&locality, batch.channel, &batch.stores)
            .await;
    }
}
