//! # Ripple
//!
//! Git-flow release assistant - start, bump, and finish release branches
//! from your terminal.
//!
//! Ripple automates a git-flow-style release process: it creates and
//! finishes feature, release, and hotfix branches, bumps the semantic
//! version recorded in the project manifest, and commits, tags, and merges
//! as each step completes. Every git invocation flows through a sequential
//! command queue that guarantees strictly ordered, one-at-a-time execution,
//! so overlapping git operations can never corrupt repository state.
//!
//! ## Quick Start
//!
//! ```bash
//! # Install
//! cargo install ripple
//!
//! # See where the project stands
//! ripple status
//!
//! # Cut a release branch from develop
//! ripple start release
//!
//! # Merge it into master and develop, tag it, clean up
//! ripple finish release
//! ```

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::items_after_statements)]

pub mod core;
pub mod manifest;
pub mod version;
pub mod workflow;

// Re-export commonly used types
pub use core::{
    sh_quote, Advance, CommandQueue, CommandRunner, JobFailure, JobOutcome, QueueReport,
    ShellRunner,
};
pub use manifest::{Manifest, ManifestError};
pub use version::{BumpPart, Version, VersionError};
pub use workflow::{init, preload, BranchKind, Workflow, WorkflowOptions, WorkflowState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "ripple";
