//! Repository state discovery.
//!
//! Before any operation dispatches, a fixed chain of structured git queries
//! runs through the sequential queue and fills in [`WorkflowState`]: the
//! current branch, whether the tree is dirty, and whether release or hotfix
//! branches exist. Porcelain / `--format` output modes are used throughout
//! so no free-form text is scraped.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::core::{Advance, CommandQueue, CommandRunner, JobOutcome};

/// Branch name prefix for release branches.
pub const RELEASE_PREFIX: &str = "release-";

/// Branch name prefix for hotfix branches.
pub const HOTFIX_PREFIX: &str = "hotfix-";

/// Facts about the repository, discovered once per invocation.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    /// Branch currently checked out
    pub current_branch: String,

    /// Whether the working tree has uncommitted changes
    pub dirty: bool,

    /// Name of the release branch, if one exists
    pub release: Option<String>,

    /// Name of the hotfix branch, if one exists
    pub hotfix: Option<String>,
}

impl WorkflowState {
    /// Check if the current branch is a release branch.
    pub fn on_release(&self) -> bool {
        self.current_branch.starts_with(RELEASE_PREFIX)
    }

    /// Check if the current branch is a hotfix branch.
    pub fn on_hotfix(&self) -> bool {
        self.current_branch.starts_with(HOTFIX_PREFIX)
    }
}

/// First branch name in a `git branch --list --format=%(refname:short)`
/// listing, if any.
fn first_branch(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}

/// Run the preload chain and return the discovered state.
///
/// Fails if the working directory is not inside a git repository or if any
/// of the discovery commands cannot run.
pub async fn preload(runner: &Arc<dyn CommandRunner>) -> Result<WorkflowState> {
    let state = Arc::new(Mutex::new(WorkflowState::default()));
    let fault: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let mut queue = CommandQueue::new(Arc::clone(runner));

    let record_fault = |fault: &Arc<Mutex<Option<String>>>, message: String| {
        *fault.lock().unwrap() = Some(message);
    };

    {
        let fault = Arc::clone(&fault);
        queue.enqueue("git rev-parse --is-inside-work-tree", move |outcome, _| {
            if outcome.failure.is_some() {
                record_fault(
                    &fault,
                    "git says this isn't a repository. Are you in the right folder?".to_string(),
                );
                return Advance::Halt;
            }
            Advance::Continue
        });
    }

    {
        let state = Arc::clone(&state);
        let fault = Arc::clone(&fault);
        queue.enqueue("git status --porcelain", move |outcome, _| {
            if let Some(failure) = &outcome.failure {
                record_fault(&fault, format!("could not read repository status: {failure}"));
                return Advance::Halt;
            }
            state.lock().unwrap().dirty = !outcome.stdout_trimmed().is_empty();
            Advance::Continue
        });
    }

    {
        let state = Arc::clone(&state);
        let fault = Arc::clone(&fault);
        queue.enqueue("git rev-parse --abbrev-ref HEAD", move |outcome, _| {
            if let Some(failure) = &outcome.failure {
                record_fault(&fault, format!("could not determine the current branch: {failure}"));
                return Advance::Halt;
            }
            state.lock().unwrap().current_branch = outcome.stdout_trimmed().to_string();
            Advance::Continue
        });
    }

    {
        let state = Arc::clone(&state);
        queue.enqueue(
            r#"git branch --list "release-*" --format="%(refname:short)""#,
            move |outcome: &JobOutcome, _: &mut CommandQueue| {
                // An empty listing is not a failure.
                state.lock().unwrap().release = first_branch(&outcome.stdout);
                Advance::Continue
            },
        );
    }

    {
        let state = Arc::clone(&state);
        queue.enqueue(
            r#"git branch --list "hotfix-*" --format="%(refname:short)""#,
            move |outcome: &JobOutcome, _: &mut CommandQueue| {
                state.lock().unwrap().hotfix = first_branch(&outcome.stdout);
                Advance::Continue
            },
        );
    }

    queue.run().await;

    if let Some(message) = fault.lock().unwrap().take() {
        bail!(message);
    }

    let discovered = state.lock().unwrap().clone();
    Ok(discovered)
}
