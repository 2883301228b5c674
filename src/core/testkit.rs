//! Scripted command runner for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::runner::{CommandRunner, JobOutcome};

/// Runner that replays canned outcomes and records every dispatched command.
///
/// Outcomes are consumed front-first; once the script is exhausted every
/// further command succeeds with empty output.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    outcomes: Mutex<VecDeque<JobOutcome>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a canned outcome to the script.
    pub(crate) fn push(&self, outcome: JobOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Commands dispatched so far, in order.
    pub(crate) fn dispatched(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> JobOutcome {
        self.log.lock().unwrap().push(command.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| JobOutcome::success(""))
    }
}
