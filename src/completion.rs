//! Completion queue for non-blocking registry operations.
//!
//! Every owning context runs one queue task. Callbacks are pushed after the
//! operation they report on has taken effect and are run one at a time, in
//! submission order, on that task.
//!
//! Once the context shuts down the queue is closed: already-queued callbacks
//! still run, later ones are delivered inline on the submitting thread. Both
//! paths take the same lock, so callbacks never overlap. A callback that
//! submits another operation never runs it nested: the inner callback waits
//! until the outer one has returned.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    /// Jobs submitted by a callback running on this thread. `None` when no callback is running.
    static DEFERRED: RefCell<Option<VecDeque<(Job, Arc<Mutex<()>>)>>> = const { RefCell::new(None) };
}

#[derive(Clone)]
pub(crate) struct CompletionQueue {
    tx: mpsc::UnboundedSender<Job>,
    fallback: Arc<Mutex<()>>,
}

impl CompletionQueue {
    /// Spawn the queue task on `handle`; it drains and exits when `shutdown` fires.
    pub(crate) fn spawn(handle: &Handle, shutdown: CancellationToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let fallback = Arc::new(Mutex::new(()));
        handle.spawn(run(rx, shutdown, Arc::clone(&fallback)));
        Self { tx, fallback }
    }

    /// Queue `callback(result)` for delivery.
    pub(crate) fn deliver<T, F>(&self, result: T, callback: F)
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let job: Job = Box::new(move || callback(result));
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            debug!("Completion queue closed, delivering inline");
            run_job(job, &self.fallback);
        }
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Job>,
    shutdown: CancellationToken,
    fallback: Arc<Mutex<()>>,
) {
    loop {
        tokio::select! {
            biased;
            job = rx.recv() => match job {
                Some(job) => run_job(job, &fallback),
                None => return,
            },
            _ = shutdown.cancelled() => break,
        }
    }

    // Refuse new work, then drain what was accepted before the close.
    rx.close();
    while let Some(job) = rx.recv().await {
        run_job(job, &fallback);
    }
}

/// Run one callback under its queue's lock, then anything it submitted.
fn run_job(job: Job, lock: &Arc<Mutex<()>>) {
    let nested = DEFERRED.with(|deferred| match deferred.borrow_mut().as_mut() {
        Some(pending) => {
            pending.push_back((job, Arc::clone(lock)));
            None
        }
        None => Some(job),
    });
    let Some(job) = nested else {
        return;
    };

    DEFERRED.with(|deferred| *deferred.borrow_mut() = Some(VecDeque::new()));
    run_guarded(job, lock);
    while let Some((job, lock)) =
        DEFERRED.with(|deferred| deferred.borrow_mut().as_mut().and_then(VecDeque::pop_front))
    {
        run_guarded(job, &lock);
    }
    DEFERRED.with(|deferred| *deferred.borrow_mut() = None);
}

fn run_guarded(job: Job, lock: &Mutex<()>) {
    let _guard = lock.lock();
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!("Completion callback panicked");
    }
}
