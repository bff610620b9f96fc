//! Work queue between listing traversal and the detail workers
//!
//! A bounded mpsc channel shared by several consumers, plus an explicit count
//! of in-flight items. Every pushed record is pending until the worker that
//! took it drops its [`WorkTicket`]; [`QueueConsumer::wait_drained`] resolves
//! once that count reaches zero. Dropping every producer closes the queue, and
//! consumers see `None` after the remaining items are taken.

use crate::state::JobRecord;
use crate::TrawlError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};

#[derive(Debug, Default)]
struct Completion {
    pending: AtomicUsize,
    drained: Notify,
}

impl Completion {
    fn queued(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn completed(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Creates a work queue holding at most `capacity` unclaimed records
pub fn work_queue(capacity: usize) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let completion = Arc::new(Completion::default());
    (
        QueueProducer {
            tx,
            completion: Arc::clone(&completion),
        },
        QueueConsumer {
            rx: Arc::new(Mutex::new(rx)),
            completion,
        },
    )
}

/// Sending half; cloned per producer, the queue closes when all are dropped
#[derive(Debug, Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<JobRecord>,
    completion: Arc<Completion>,
}

impl QueueProducer {
    /// Enqueues a basic record, waiting while the queue is full
    pub async fn push(&self, record: JobRecord) -> Result<(), TrawlError> {
        self.completion.queued();
        if self.tx.send(record).await.is_err() {
            self.completion.completed();
            return Err(TrawlError::QueueClosed);
        }
        Ok(())
    }
}

/// Receiving half, shared by every worker
#[derive(Debug, Clone)]
pub struct QueueConsumer {
    rx: Arc<Mutex<mpsc::Receiver<JobRecord>>>,
    completion: Arc<Completion>,
}

impl QueueConsumer {
    /// Takes the next record, or `None` once the queue is closed and empty
    pub async fn next(&self) -> Option<WorkTicket> {
        let record = self.rx.lock().await.recv().await?;
        Some(WorkTicket {
            record,
            completion: Arc::clone(&self.completion),
        })
    }

    /// Records pushed but not yet acknowledged
    pub fn pending(&self) -> usize {
        self.completion.pending()
    }

    /// Waits until every pushed record has been acknowledged
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.completion.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a completion in between is not missed
            notified.as_mut().enable();
            if self.completion.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// A claimed record; acknowledged when dropped
#[derive(Debug)]
pub struct WorkTicket {
    record: JobRecord,
    completion: Arc<Completion>,
}

impl WorkTicket {
    pub fn record(&self) -> &JobRecord {
        &self.record
    }
}

impl Drop for WorkTicket {
    fn drop(&mut self) {
        self.completion.completed();
    }
}
