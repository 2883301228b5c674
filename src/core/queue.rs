//! Sequential command queue.
//!
//! Runs queued commands strictly one at a time, in submission order. Each
//! job's handler receives the captured [`JobOutcome`] and decides whether
//! the queue may advance to the next job, so a multi-step chain can be
//! short-circuited at any step. Handlers may also enqueue follow-up jobs
//! whose text depends on output parsed from the previous command.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use super::runner::{CommandRunner, JobOutcome};

/// A handler's decision after processing one job outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Dequeue and run the next pending job
    Continue,
    /// Stop the chain; remaining jobs never run
    Halt,
}

/// Completion handler for one job.
///
/// Receives the captured outcome and the queue itself, so follow-up jobs
/// can be enqueued before the decision is returned.
pub type JobHandler = Box<dyn FnOnce(&JobOutcome, &mut CommandQueue) -> Advance + Send>;

/// One queued command plus its completion handler.
struct Job {
    command: String,
    handler: JobHandler,
}

/// How a queue run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueReport {
    /// Every job ran and every handler chose to continue
    Drained {
        /// Number of jobs executed
        executed: usize,
    },
    /// A handler halted the chain with jobs still pending
    Halted {
        /// Number of jobs executed (including the halting one)
        executed: usize,
        /// Number of jobs left unexecuted
        remaining: usize,
    },
}

impl QueueReport {
    /// Check if the queue drained completely.
    pub fn is_drained(&self) -> bool {
        matches!(self, Self::Drained { .. })
    }
}

/// Ordered queue of commands executed one at a time.
///
/// Jobs run in the exact order they were enqueued (FIFO), including jobs
/// enqueued by an earlier job's handler: those are appended to the tail,
/// behind anything already pending. At most one subprocess is ever in
/// flight; the await on the runner is the only suspension point.
///
/// Nothing runs at enqueue time. Execution starts when [`run`] is invoked,
/// so a caller can finish building a multi-step chain first. Each queue
/// value is fully independent; nothing is shared between instances.
///
/// [`run`]: CommandQueue::run
pub struct CommandQueue {
    pending: VecDeque<Job>,
    runner: Arc<dyn CommandRunner>,
}

impl CommandQueue {
    /// Create an empty queue backed by the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { pending: VecDeque::new(), runner }
    }

    /// Append a command and its completion handler to the tail of the queue.
    ///
    /// Returns `&mut Self` so submissions can be chained.
    ///
    /// # Panics
    ///
    /// Panics if `command` is empty. An empty command is a programming
    /// error, not a runtime condition a handler could act on.
    pub fn enqueue<F>(&mut self, command: impl Into<String>, handler: F) -> &mut Self
    where
        F: FnOnce(&JobOutcome, &mut CommandQueue) -> Advance + Send + 'static,
    {
        let command = command.into();
        assert!(
            !command.trim().is_empty(),
            "CommandQueue::enqueue requires a non-empty command"
        );
        self.pending.push_back(Job { command, handler: Box::new(handler) });
        self
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if no jobs are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain the queue, one job at a time.
    ///
    /// Each command runs to completion before its handler is invoked, and
    /// the next job starts only if the handler returned
    /// [`Advance::Continue`]. A [`Advance::Halt`] leaves the remaining jobs
    /// unexecuted and is reported in the returned [`QueueReport`].
    pub async fn run(&mut self) -> QueueReport {
        let mut executed = 0;

        while let Some(job) = self.pending.pop_front() {
            debug!(command = %job.command, pending = self.pending.len(), "exec");

            let runner = Arc::clone(&self.runner);
            let outcome = runner.run(&job.command).await;
            executed += 1;

            match (job.handler)(&outcome, self) {
                Advance::Continue => {}
                Advance::Halt => {
                    let remaining = self.pending.len();
                    debug!(executed, remaining, "chain halted");
                    self.pending.clear();
                    return QueueReport::Halted { executed, remaining };
                }
            }
        }

        QueueReport::Drained { executed }
    }
}
