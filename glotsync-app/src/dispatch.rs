//! In-process dispatch queue: a bounded tokio channel drained by a worker pool.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use glotsync_core::error::{CoreError, CoreResult};
use glotsync_core::services::BatchDispatcher;
use glotsync_core::traits::DispatchQueue;
use glotsync_core::types::{DispatchChunk, DispatchReport};

/// Receiving half handed to [`WorkerPool::start`]
pub type ChunkReceiver = mpsc::Receiver<DispatchChunk>;

/// `DispatchQueue` backed by a bounded mpsc channel.
///
/// `enqueue` never waits: a full or closed channel is reported as `QueueError`.
pub struct ChannelDispatchQueue {
    sender: mpsc::Sender<DispatchChunk>,
}

impl ChannelDispatchQueue {
    #[must_use]
    pub fn new(capacity: usize) -> (Self, ChunkReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl DispatchQueue for ChannelDispatchQueue {
    async fn enqueue(&self, chunk: DispatchChunk) -> CoreResult<()> {
        let chunk_id = chunk.id.clone();
        self.sender.try_send(chunk).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                CoreError::QueueError(format!("Dispatch queue is full, chunk {chunk_id} rejected"))
            }
            mpsc::error::TrySendError::Closed(_) => CoreError::QueueError(format!(
                "Dispatch queue is closed, chunk {chunk_id} rejected"
            )),
        })?;
        log::debug!("Enqueued chunk {chunk_id}");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolSignal {
    Running,
    /// Finish whatever is queued, then exit
    Drain,
    /// Exit after the current chunk
    Stop,
}

/// Fixed set of tokio tasks running `BatchDispatcher::run_chunk`.
pub struct WorkerPool {
    signal: watch::Sender<PoolSignal>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks on the current runtime.
    ///
    /// Finished reports are sent to `reports` when given.
    pub fn start(
        receiver: ChunkReceiver,
        dispatcher: Arc<BatchDispatcher>,
        workers: usize,
        reports: Option<mpsc::UnboundedSender<DispatchReport>>,
    ) -> Self {
        let (signal, _) = watch::channel(PoolSignal::Running);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&receiver),
                    Arc::clone(&dispatcher),
                    signal.subscribe(),
                    reports.clone(),
                ))
            })
            .collect::<Vec<_>>();

        log::info!("Started {} dispatch worker(s)", handles.len());
        Self { signal, handles }
    }

    /// Run every chunk already queued, then stop.
    pub async fn drain(self) {
        self.finish(PoolSignal::Drain).await;
    }

    /// Stop after in-flight chunks. Chunks still queued keep their leases until they expire.
    pub async fn shutdown(self) {
        self.finish(PoolSignal::Stop).await;
    }

    async fn finish(self, signal: PoolSignal) {
        self.signal.send_replace(signal);
        for handle in self.handles {
            if let Err(e) = handle.await {
                log::error!("Dispatch worker panicked: {e}");
            }
        }
        log::info!("Dispatch workers stopped ({signal:?})");
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<ChunkReceiver>>,
    dispatcher: Arc<BatchDispatcher>,
    mut signal: watch::Receiver<PoolSignal>,
    reports: Option<mpsc::UnboundedSender<DispatchReport>>,
) {
    loop {
        let next = {
            let mut rx = receiver.lock().await;
            let current = *signal.borrow_and_update();
            match current {
                PoolSignal::Stop => None,
                PoolSignal::Drain => rx.try_recv().ok(),
                PoolSignal::Running => tokio::select! {
                    biased;
                    changed = signal.changed() => {
                        if changed.is_err() {
                            None
                        } else {
                            continue;
                        }
                    }
                    chunk = rx.recv() => chunk,
                },
            }
        };

        let Some(chunk) = next else {
            break;
        };
        log::debug!("Worker {worker_id} picked chunk {}", chunk.id);
        let report = dispatcher.run_chunk(&chunk).await;
        if let Some(tx) = &reports {
            // Receiver gone just means nobody is listening any more
            let _ = tx.send(report);
        }
    }
    log::debug!("Worker {worker_id} exiting");
}
