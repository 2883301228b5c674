//! Core types and functionality for Ripple.
//!
//! This module contains the sequential command queue and the subprocess
//! runner it drives.

mod queue;
mod runner;

#[cfg(test)]
pub(crate) mod testkit;

pub use queue::{Advance, CommandQueue, JobHandler, QueueReport};
pub use runner::{sh_quote, CommandRunner, JobFailure, JobOutcome, ShellRunner};
