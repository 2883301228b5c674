//! Branching workflow: discovered repository state and the operations
//! dispatched against it.

mod ops;
mod state;

pub use ops::{init, BranchKind, Workflow, WorkflowOptions, DEVELOP_BRANCH, MASTER_BRANCH};
pub use state::{preload, WorkflowState, HOTFIX_PREFIX, RELEASE_PREFIX};
