//! Fixed-size worker pool with dynamic task submission and stage gates.
//!
//! Tasks may enqueue follow-on tasks through the [`Spawner`] they are handed.
//! A stage is a batch of tasks plus a completion handler; the handler runs
//! once, on the worker that finishes the stage's last task, and is where the
//! next stage gets enqueued. A stage with a failed task never completes. [`Scheduler::run`] returns once every
//! task, including ones added along the way, has finished.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

type TaskFn<'env> = Box<dyn FnOnce(&Spawner<'env>) -> Result<()> + Send + 'env>;

/// A labelled unit of work
pub struct Job<'env> {
    label: String,
    run: TaskFn<'env>,
}

impl<'env> Job<'env> {
    pub fn new(
        label: impl Into<String>,
        run: impl FnOnce(&Spawner<'env>) -> Result<()> + Send + 'env,
    ) -> Self {
        Self {
            label: label.into(),
            run: Box::new(run),
        }
    }
}

/// Shared start-order log, used to observe scheduling in tests and diagnostics
pub type Trace = Arc<Mutex<Vec<String>>>;

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct Scheduler {
    workers: usize,
    trace: Option<Trace>,
}

impl Scheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            trace: None,
        }
    }

    /// Record every task label, in start order, into `trace`
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Seed the queue, then block until it drains.
    ///
    /// Every task runs even after one fails; the first failure is returned.
    pub fn run<'env>(&self, seed: impl FnOnce(&Spawner<'env>)) -> Result<()> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job<'env>>();
        let spawner = Spawner {
            sender: Mutex::new(Some(sender)),
            pending: AtomicUsize::new(0),
            failure: Mutex::new(None),
            trace: self.trace.clone(),
        };

        seed(&spawner);
        if spawner.pending.load(Ordering::Acquire) == 0 {
            spawner.close();
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.workers)
                .map(|_| {
                    let receiver = receiver.clone();
                    let spawner = &spawner;
                    scope.spawn(move || work(spawner, receiver))
                })
                .collect();

            for handle in handles {
                if handle.join().is_err() {
                    spawner.fail(Error::Worker("worker thread exited abnormally".into()));
                }
            }
        });

        match spawner.failure.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn work<'env>(spawner: &Spawner<'env>, receiver: Receiver<Job<'env>>) {
    while let Ok(job) = receiver.recv() {
        let Job { label, run } = job;
        if let Some(trace) = &spawner.trace {
            trace.lock().push(label.clone());
        }
        debug!(task = %label, "task started");

        match catch_unwind(AssertUnwindSafe(|| run(spawner))) {
            Ok(Ok(())) => debug!(task = %label, "task finished"),
            Ok(Err(err)) => {
                warn!(task = %label, error = %err, "task failed");
                spawner.fail(err);
            }
            Err(_) => spawner.fail(Error::Worker(format!("task {label} panicked"))),
        }
        spawner.finish();
    }
}

/// Handle for submitting work to a running [`Scheduler`]
pub struct Spawner<'env> {
    sender: Mutex<Option<Sender<Job<'env>>>>,
    pending: AtomicUsize,
    failure: Mutex<Option<Error>>,
    trace: Option<Trace>,
}

impl<'env> Spawner<'env> {
    pub fn spawn(
        &self,
        label: impl Into<String>,
        run: impl FnOnce(&Spawner<'env>) -> Result<()> + Send + 'env,
    ) {
        self.submit(Job::new(label, run));
    }

    fn submit(&self, job: Job<'env>) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if let Some(sender) = self.sender.lock().as_ref() {
            // The receivers outlive the sender, so this can't fail
            let _ = sender.send(job);
        }
    }

    /// Enqueue `jobs` as one stage; `on_complete` runs after the last of them finishes.
    ///
    /// An empty stage completes immediately, on the calling thread. Once any
    /// task has failed, `on_complete` is skipped so follow-on stages never run
    /// against incomplete input.
    pub fn spawn_stage(
        &self,
        jobs: Vec<Job<'env>>,
        on_complete: impl FnOnce(&Spawner<'env>) -> Result<()> + Send + 'env,
    ) -> Result<()> {
        if jobs.is_empty() {
            return on_complete(self);
        }

        let gate = Arc::new(StageGate::new(jobs.len()));
        let on_complete: Arc<Mutex<Option<TaskFn<'env>>>> =
            Arc::new(Mutex::new(Some(Box::new(on_complete))));

        for Job { label, run } in jobs {
            let gate = Arc::clone(&gate);
            let on_complete = Arc::clone(&on_complete);
            self.spawn(label.clone(), move |spawner| {
                // Failure must be on record before the gate can open
                if let Err(err) = run(spawner) {
                    warn!(task = %label, error = %err, "task failed");
                    spawner.fail(err);
                }
                if gate.arrive() && !spawner.has_failed() {
                    let next = on_complete.lock().take();
                    if let Some(next) = next {
                        next(spawner)?;
                    }
                }
                Ok(())
            });
        }
        Ok(())
    }

    fn fail(&self, err: Error) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(err);
        }
    }

    fn has_failed(&self) -> bool {
        self.failure.lock().is_some()
    }

    fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.close();
        }
    }

    /// Dropping the sender lets idle workers fall out of `recv`
    fn close(&self) {
        self.sender.lock().take();
    }
}

/// Countdown that opens once every task of a stage has arrived
#[derive(Debug)]
pub struct StageGate {
    remaining: AtomicUsize,
}

impl StageGate {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
        }
    }

    /// Mark one task done; true only for the task that completes the stage
    pub fn arrive(&self) -> bool {
        self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }
}
