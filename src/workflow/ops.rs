//! Branching workflow operations.
//!
//! Each top-level operation (status, start, bump, finish, init) builds a
//! chain of git commands and manifest read/write steps on a
//! [`CommandQueue`], then drives it to completion. Guards run before
//! anything is enqueued, so a refused operation never spawns a subprocess.
//! A mid-chain command failure is printed with its raw output and the rest
//! of the chain is abandoned.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::ValueEnum;

use crate::core::{sh_quote, Advance, CommandQueue, CommandRunner, JobOutcome, QueueReport};
use crate::manifest::Manifest;
use crate::version::{BumpPart, Version};
use crate::workflow::state::{WorkflowState, HOTFIX_PREFIX, RELEASE_PREFIX};

/// Long-lived production branch; releases and hotfixes merge (and tag) here.
pub const MASTER_BRANCH: &str = "master";

/// Long-lived integration branch; features merge here and releases cut from it.
pub const DEVELOP_BRANCH: &str = "develop";

/// Branch types the workflow manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BranchKind {
    /// Short-lived branch cut from (and merged back into) develop
    Feature,
    /// Versioned branch cut from develop, finished into master + develop
    Release,
    /// Versioned branch cut from master, finished into master + develop/release
    Hotfix,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature => write!(f, "feature"),
            Self::Release => write!(f, "release"),
            Self::Hotfix => write!(f, "hotfix"),
        }
    }
}

/// Settings shared by all operations.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Path of the manifest file to read and write
    pub manifest_path: PathBuf,

    /// Whether manifest changes are committed automatically
    pub commit: bool,

    /// Whether raw git output is echoed
    pub verbose: bool,
}

/// Print a failed outcome (message plus raw command output).
///
/// Returns true when the outcome is a failure, so call sites read as
/// `if report_failure(outcome) { return Advance::Halt; }`.
fn report_failure(outcome: &JobOutcome) -> bool {
    let Some(failure) = &outcome.failure else {
        return false;
    };
    eprintln!("error: {failure}");
    let raw = outcome.combined_output();
    if !raw.trim().is_empty() {
        eprintln!("{}", raw.trim_end());
    }
    true
}

/// Echo raw git output when verbose mode is on.
fn echo_verbose(verbose: bool, outcome: &JobOutcome) {
    if verbose && !outcome.stdout.trim().is_empty() {
        println!("{}", outcome.stdout.trim_end());
    }
}

/// Load the manifest and its version, printing a user-facing error on
/// failure. `None` means the caller should halt its chain.
fn load_manifest(path: &Path) -> Option<(Manifest, Version)> {
    let result = Manifest::load(path).and_then(|manifest| {
        let version = manifest.version()?;
        Ok((manifest, version))
    });
    match result {
        Ok(pair) => Some(pair),
        Err(e) => {
            eprintln!("error: {e}");
            None
        }
    }
}

/// Write the manifest to disk and enqueue the follow-up commit (or, with
/// auto-commit off, a stage-and-status step). When `rename_prefix` is set,
/// the current branch is renamed to `<prefix><version>` after the commit.
fn write_manifest(
    queue: &mut CommandQueue,
    manifest: Manifest,
    version: Version,
    opts: WorkflowOptions,
    rename_prefix: Option<&'static str>,
) -> Advance {
    if let Err(e) = manifest.save() {
        eprintln!("error: {e}");
        return Advance::Halt;
    }

    let path = sh_quote(&manifest.path().display().to_string());
    let verbose = opts.verbose;

    if opts.commit {
        println!("  committing changes");
        let message = sh_quote(&format!("bump version to {version}"));
        queue.enqueue(
            format!("git add {path} && git commit -m {message}"),
            move |outcome, queue| {
                if report_failure(outcome) {
                    return Advance::Halt;
                }
                echo_verbose(verbose, outcome);
                if let Some(prefix) = rename_prefix {
                    let branch = sh_quote(&format!("{prefix}{version}"));
                    queue.enqueue(format!("git branch -m {branch}"), move |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        println!("ok.");
                        Advance::Continue
                    });
                } else {
                    println!("ok.");
                }
                Advance::Continue
            },
        );
    } else {
        queue.enqueue(format!("git add {path} && git status"), move |outcome, _| {
            if report_failure(outcome) {
                return Advance::Halt;
            }
            println!("{}", outcome.stdout.trim_end());
            println!("ok.");
            Advance::Continue
        });
    }

    Advance::Continue
}

/// Create a fresh manifest for a new project.
///
/// The only operation that needs neither a git repository nor the preload
/// chain.
pub fn init(opts: &WorkflowOptions, name: &str, version: &str) -> Result<()> {
    let version: Version = version.parse()?;
    let manifest = Manifest::create(&opts.manifest_path, name, version)?;
    println!(
        "Initialized {name} {version} at {}",
        manifest.path().display()
    );
    println!("ok.");
    Ok(())
}

/// The workflow controller: dispatches operations against discovered state.
pub struct Workflow {
    runner: Arc<dyn CommandRunner>,
    state: WorkflowState,
    opts: WorkflowOptions,
}

impl Workflow {
    /// Create a controller over a runner, discovered state, and options.
    pub fn new(runner: Arc<dyn CommandRunner>, state: WorkflowState, opts: WorkflowOptions) -> Self {
        Self { runner, state, opts }
    }

    fn queue(&self) -> CommandQueue {
        CommandQueue::new(Arc::clone(&self.runner))
    }

    /// Run a built chain; a halted chain is a failed operation.
    async fn drive(&self, mut queue: CommandQueue) -> Result<()> {
        match queue.run().await {
            QueueReport::Drained { .. } => Ok(()),
            QueueReport::Halted { .. } => bail!("operation aborted"),
        }
    }

    /// Print the current status of the active project.
    pub fn status(&self) -> Result<()> {
        let manifest = Manifest::load(&self.opts.manifest_path)?;
        let name = manifest.name()?.to_string();
        let version = manifest.version()?;

        println!("Status");
        println!("  Current release: {name} {version}");
        println!("  Manifest: {}", manifest.path().display());
        println!(
            "  Working tree is {}, current branch is {}.",
            if self.state.dirty { "dirty" } else { "clean" },
            self.state.current_branch
        );
        if !self.state.dirty {
            if self.state.release.is_some() {
                println!("  You cannot create a release branch, one already exists.");
            } else {
                println!("  You may create a release branch with \"ripple start release\".");
            }
            if self.state.hotfix.is_some() {
                println!("  You cannot create a hotfix branch, one already exists.");
            } else {
                println!("  You may create a hotfix branch with \"ripple start hotfix\".");
            }
        }
        println!("ok.");
        Ok(())
    }

    /// Create a new feature, release, or hotfix branch.
    pub async fn start(&self, kind: BranchKind, name: Option<&str>) -> Result<()> {
        println!("Starting {kind} branch");

        // Features may start on a dirty tree; version branches may not.
        if self.state.dirty && kind != BranchKind::Feature {
            bail!("can't start on a dirty working tree. Stash or commit your changes, then try again.");
        }

        match kind {
            BranchKind::Feature => {
                let Some(name) = name else {
                    bail!("when starting a new feature, include a name, e.g. \"ripple start feature my_feature\"");
                };
                if self.state.on_release()
                    || self.state.on_hotfix()
                    || self.state.current_branch == MASTER_BRANCH
                {
                    bail!(
                        "the new feature would start from the current HEAD; check out a feature branch or \"{DEVELOP_BRANCH}\" first"
                    );
                }

                let base = self.state.current_branch.clone();
                println!("  creating new branch \"{name}\" from \"{base}\"");

                let mut queue = self.queue();
                queue.enqueue(
                    format!("git checkout -b {} {}", sh_quote(name), sh_quote(&base)),
                    |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        println!("ok.");
                        Advance::Continue
                    },
                );
                self.drive(queue).await
            }
            BranchKind::Release => {
                if self.state.release.is_some() {
                    bail!("you already have a release branch");
                }
                self.cut_version_branch(kind).await
            }
            BranchKind::Hotfix => {
                if self.state.hotfix.is_some() {
                    bail!("you already have a hotfix branch");
                }
                self.cut_version_branch(kind).await
            }
        }
    }

    /// Cut a release or hotfix branch from its base, bumping the revision.
    async fn cut_version_branch(&self, kind: BranchKind) -> Result<()> {
        let (prefix, base, other_exists) = match kind {
            BranchKind::Release => (RELEASE_PREFIX, DEVELOP_BRANCH, self.state.hotfix.is_some()),
            BranchKind::Hotfix => (HOTFIX_PREFIX, MASTER_BRANCH, self.state.release.is_some()),
            BranchKind::Feature => unreachable!("features carry no version"),
        };

        let opts = self.opts.clone();
        let mut queue = self.queue();

        queue.enqueue(format!("git checkout {base}"), move |outcome, queue| {
            if report_failure(outcome) {
                return Advance::Halt;
            }
            let Some((mut manifest, from)) = load_manifest(&opts.manifest_path) else {
                return Advance::Halt;
            };

            let to = from.bump(BumpPart::Revision);
            println!("  creating new {kind} branch from \"{base}\"");
            println!("  updating version: {from} -> {to}");
            if other_exists {
                println!("warning: you must finish the hotfix before finalizing the release.");
            }
            manifest.set_version(to);

            let branch = sh_quote(&format!("{prefix}{to}"));
            queue.enqueue(
                format!("git checkout -b {branch} {base}"),
                move |outcome, queue| {
                    if report_failure(outcome) {
                        return Advance::Halt;
                    }
                    write_manifest(queue, manifest, to, opts, None)
                },
            );
            Advance::Continue
        });

        self.drive(queue).await
    }

    /// Bump the version while on a release branch, then rename the branch
    /// to match.
    pub async fn bump(&self, part: BumpPart) -> Result<()> {
        println!("Bumping version number");
        if !self.state.on_release() {
            bail!("versions can only be bumped manually on a release branch");
        }

        let release = sh_quote(&self.state.current_branch);
        let opts = self.opts.clone();
        let mut queue = self.queue();

        queue.enqueue(format!("git checkout {release}"), move |outcome, queue| {
            if report_failure(outcome) {
                return Advance::Halt;
            }
            let Some((mut manifest, from)) = load_manifest(&opts.manifest_path) else {
                return Advance::Halt;
            };

            let to = from.bump(part);
            println!("  updating version: {from} -> {to}");
            manifest.set_version(to);
            write_manifest(queue, manifest, to, opts, Some(RELEASE_PREFIX))
        });

        self.drive(queue).await
    }

    /// Finish and merge the current feature, release, or hotfix branch.
    pub async fn finish(&self, kind: BranchKind) -> Result<()> {
        println!("Finishing {kind} branch");
        if self.state.dirty {
            bail!("can't finish on a dirty working tree. Stash or commit your changes, then try again.");
        }
        match kind {
            BranchKind::Feature => self.finish_feature().await,
            BranchKind::Release => self.finish_release().await,
            BranchKind::Hotfix => self.finish_hotfix().await,
        }
    }

    /// Merge the checked-out feature into develop and delete it.
    async fn finish_feature(&self) -> Result<()> {
        let feature = self.state.current_branch.clone();
        if self.state.on_release()
            || self.state.on_hotfix()
            || feature == MASTER_BRANCH
            || feature == DEVELOP_BRANCH
        {
            bail!("finishing a feature requires that its branch is checked out");
        }

        let verbose = self.opts.verbose;
        let quoted = sh_quote(&feature);
        let mut queue = self.queue();

        {
            let feature = feature.clone();
            queue.enqueue(format!("git checkout {DEVELOP_BRANCH}"), move |outcome, _| {
                if report_failure(outcome) {
                    return Advance::Halt;
                }
                println!("  merging {feature} into {DEVELOP_BRANCH}");
                Advance::Continue
            });
        }
        {
            let feature = feature.clone();
            queue.enqueue(format!("git merge --no-ff {quoted}"), move |outcome, _| {
                if report_failure(outcome) {
                    return Advance::Halt;
                }
                echo_verbose(verbose, outcome);
                println!("  removing {feature} branch");
                Advance::Continue
            });
        }
        queue.enqueue(format!("git branch -d {quoted}"), move |outcome, _| {
            if report_failure(outcome) {
                return Advance::Halt;
            }
            echo_verbose(verbose, outcome);
            println!("ok.");
            Advance::Continue
        });

        self.drive(queue).await
    }

    /// Merge the release into master, tag it, merge into develop, delete it.
    async fn finish_release(&self) -> Result<()> {
        let Some(release) = self.state.release.clone() else {
            bail!("there is no release branch to finish");
        };
        if self.state.hotfix.is_some() {
            bail!("you must finish your hotfix before finishing your release");
        }

        let opts = self.opts.clone();
        let verbose = opts.verbose;
        let quoted = sh_quote(&release);
        let mut queue = self.queue();

        // The tag name comes from the release branch's manifest, so check
        // the branch out and read it before integrating.
        queue.enqueue(format!("git checkout {quoted}"), {
            let release = release.clone();
            let quoted = quoted.clone();
            move |outcome, queue| {
                if report_failure(outcome) {
                    return Advance::Halt;
                }
                let Some((_, version)) = load_manifest(&opts.manifest_path) else {
                    return Advance::Halt;
                };

                {
                    let release = release.clone();
                    queue.enqueue(format!("git checkout {MASTER_BRANCH}"), move |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        println!("  merging {release} into {MASTER_BRANCH}");
                        Advance::Continue
                    });
                }
                queue.enqueue(
                    format!("git merge --no-ff -s recursive -Xtheirs {quoted}"),
                    move |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        echo_verbose(verbose, outcome);
                        println!("  tagging version {version} on {MASTER_BRANCH}");
                        Advance::Continue
                    },
                );
                queue.enqueue(
                    format!(
                        "git tag -a {version} -m {}",
                        sh_quote(&format!("version {version}"))
                    ),
                    |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        Advance::Continue
                    },
                );
                {
                    let release = release.clone();
                    queue.enqueue(format!("git checkout {DEVELOP_BRANCH}"), move |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        println!("  merging {release} into {DEVELOP_BRANCH}");
                        Advance::Continue
                    });
                }
                {
                    let release = release.clone();
                    queue.enqueue(format!("git merge --no-ff {quoted}"), move |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        echo_verbose(verbose, outcome);
                        println!("  removing {release} branch");
                        Advance::Continue
                    });
                }
                queue.enqueue(format!("git branch -d {quoted}"), move |outcome, _| {
                    if report_failure(outcome) {
                        return Advance::Halt;
                    }
                    echo_verbose(verbose, outcome);
                    println!("ok.");
                    Advance::Continue
                });
                Advance::Continue
            }
        });

        self.drive(queue).await
    }

    /// Merge the hotfix into master and tag it; then fold it into the
    /// release branch (if one exists) or into develop.
    async fn finish_hotfix(&self) -> Result<()> {
        let Some(hotfix) = self.state.hotfix.clone() else {
            bail!("there is no hotfix branch to finish");
        };

        let release = self.state.release.clone();
        let opts = self.opts.clone();
        let verbose = opts.verbose;
        let quoted_hotfix = sh_quote(&hotfix);
        let mut queue = self.queue();

        queue.enqueue(format!("git checkout {quoted_hotfix}"), {
            let hotfix = hotfix.clone();
            let quoted_hotfix = quoted_hotfix.clone();
            move |outcome, queue| {
                if report_failure(outcome) {
                    return Advance::Halt;
                }
                let Some((_, version)) = load_manifest(&opts.manifest_path) else {
                    return Advance::Halt;
                };

                {
                    let hotfix = hotfix.clone();
                    queue.enqueue(format!("git checkout {MASTER_BRANCH}"), move |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        println!("  merging {hotfix} into {MASTER_BRANCH}");
                        Advance::Continue
                    });
                }
                queue.enqueue(
                    format!("git merge --no-ff -s recursive -Xtheirs {quoted_hotfix}"),
                    move |outcome, _| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        echo_verbose(verbose, outcome);
                        println!("  tagging version {version} on {MASTER_BRANCH}");
                        Advance::Continue
                    },
                );
                queue.enqueue(
                    format!(
                        "git tag -a {version} -m {}",
                        sh_quote(&format!("version {version}"))
                    ),
                    move |outcome, queue| {
                        if report_failure(outcome) {
                            return Advance::Halt;
                        }
                        match release {
                            Some(release) => {
                                fold_hotfix_into_release(queue, &hotfix, &release, opts)
                            }
                            None => fold_hotfix_into_develop(queue, &hotfix, verbose),
                        }
                    },
                );
                Advance::Continue
            }
        });

        self.drive(queue).await
    }
}

/// After tagging: merge the hotfix into the open release branch, delete the
/// hotfix, and auto-increment the release version (commit + branch rename).
fn fold_hotfix_into_release(
    queue: &mut CommandQueue,
    hotfix: &str,
    release: &str,
    opts: WorkflowOptions,
) -> Advance {
    let verbose = opts.verbose;
    let quoted_hotfix = sh_quote(hotfix);
    let quoted_release = sh_quote(release);

    {
        let hotfix = hotfix.to_string();
        let release = release.to_string();
        queue.enqueue(format!("git checkout {quoted_release}"), move |outcome, _| {
            if report_failure(outcome) {
                return Advance::Halt;
            }
            println!("  merging {hotfix} into {release}");
            Advance::Continue
        });
    }
    {
        let hotfix = hotfix.to_string();
        queue.enqueue(
            format!("git merge --no-ff -s recursive -Xtheirs {quoted_hotfix}"),
            move |outcome, _| {
                if report_failure(outcome) {
                    return Advance::Halt;
                }
                echo_verbose(verbose, outcome);
                println!("warning: check the results of this merge carefully; conflicts may be auto-resolved using the hotfix.");
                println!("  removing {hotfix} branch");
                Advance::Continue
            },
        );
    }
    queue.enqueue(format!("git branch -d {quoted_hotfix}"), move |outcome, queue| {
        if report_failure(outcome) {
            return Advance::Halt;
        }
        echo_verbose(verbose, outcome);
        println!("  auto-incrementing release branch");
        println!("note: if you would prefer a different release version, run \"ripple bump <major/minor/revision>\".");

        let Some((mut manifest, from)) = load_manifest(&opts.manifest_path) else {
            return Advance::Halt;
        };
        let to = from.bump(BumpPart::Revision);
        println!("  updating version: {from} -> {to}");
        manifest.set_version(to);
        write_manifest(queue, manifest, to, opts, Some(RELEASE_PREFIX))
    });

    Advance::Continue
}

/// After tagging with no release branch open: merge the hotfix into develop
/// and delete it.
fn fold_hotfix_into_develop(queue: &mut CommandQueue, hotfix: &str, verbose: bool) -> Advance {
    let quoted = sh_quote(hotfix);

    {
        let hotfix = hotfix.to_string();
        queue.enqueue(format!("git checkout {DEVELOP_BRANCH}"), move |outcome, _| {
            if report_failure(outcome) {
                return Advance::Halt;
            }
            println!("  merging {hotfix} into {DEVELOP_BRANCH}");
            Advance::Continue
        });
    }
    {
        let hotfix = hotfix.to_string();
        queue.enqueue(format!("git merge --no-ff {quoted}"), move |outcome, _| {
            if report_failure(outcome) {
                return Advance::Halt;
            }
            echo_verbose(verbose, outcome);
            println!("  removing {hotfix} branch");
            Advance::Continue
        });
    }
    queue.enqueue(format!("git branch -d {quoted}"), move |outcome, _| {
        if report_failure(outcome) {
            return Advance::Halt;
        }
        println!("ok.");
        Advance::Continue
    });

    Advance::Continue
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::core::testkit::ScriptedRunner;
    use crate::core::JobFailure;

    use super::*;

    fn temp_manifest(version: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.json");
        fs::write(
            &path,
            format!(r#"{{"name": "demo", "version": "{version}"}}"#),
        )
        .unwrap();
        (temp, path)
    }

    fn options(path: &Path) -> WorkflowOptions {
        WorkflowOptions { manifest_path: path.to_path_buf(), commit: true, verbose: false }
    }

    fn state_on(branch: &str) -> WorkflowState {
        WorkflowState {
            current_branch: branch.to_string(),
            dirty: false,
            release: None,
            hotfix: None,
        }
    }

    fn workflow(
        runner: &Arc<ScriptedRunner>,
        state: WorkflowState,
        path: &Path,
    ) -> Workflow {
        Workflow::new(runner.clone(), state, options(path))
    }

    #[tokio::test]
    async fn start_release_is_refused_when_one_exists() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());
        let mut state = state_on("develop");
        state.release = Some("release-1.2.3".to_string());

        let err = workflow(&runner, state, &path)
            .start(BranchKind::Release, None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("already have a release branch"));
        // Refused before anything was enqueued: no subprocess ran.
        assert!(runner.dispatched().is_empty());
    }

    #[tokio::test]
    async fn start_refuses_dirty_tree_for_version_branches() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());
        let mut state = state_on("develop");
        state.dirty = true;

        let err = workflow(&runner, state, &path)
            .start(BranchKind::Hotfix, None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("dirty working tree"));
        assert!(runner.dispatched().is_empty());
    }

    #[tokio::test]
    async fn start_feature_requires_a_name() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());

        let err = workflow(&runner, state_on("develop"), &path)
            .start(BranchKind::Feature, None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("include a name"));
        assert!(runner.dispatched().is_empty());
    }

    #[tokio::test]
    async fn start_feature_branches_from_current_head() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());

        workflow(&runner, state_on("develop"), &path)
            .start(BranchKind::Feature, Some("my_feature"))
            .await
            .unwrap();

        assert_eq!(runner.dispatched(), vec!["git checkout -b my_feature develop"]);
    }

    #[tokio::test]
    async fn start_feature_is_refused_on_master() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());

        let err = workflow(&runner, state_on("master"), &path)
            .start(BranchKind::Feature, Some("my_feature"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("check out a feature branch"));
        assert!(runner.dispatched().is_empty());
    }

    #[tokio::test]
    async fn start_release_cuts_branch_and_commits_bump() {
        let (_temp, path) = temp_manifest("1.4.7");
        let runner = Arc::new(ScriptedRunner::new());

        workflow(&runner, state_on("develop"), &path)
            .start(BranchKind::Release, None)
            .await
            .unwrap();

        let quoted_path = sh_quote(&path.display().to_string());
        assert_eq!(
            runner.dispatched(),
            vec![
                "git checkout develop".to_string(),
                "git checkout -b release-1.4.8 develop".to_string(),
                format!("git add {quoted_path} && git commit -m 'bump version to 1.4.8'"),
            ]
        );

        // The manifest on disk carries the bumped revision.
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("1.4.8"));
    }

    #[tokio::test]
    async fn start_release_without_commit_stages_only() {
        let (_temp, path) = temp_manifest("0.3.0");
        let runner = Arc::new(ScriptedRunner::new());
        let mut opts = options(&path);
        opts.commit = false;
        let workflow = Workflow::new(runner.clone(), state_on("develop"), opts);

        workflow.start(BranchKind::Release, None).await.unwrap();

        let dispatched = runner.dispatched();
        assert_eq!(dispatched.len(), 3);
        assert!(dispatched[2].ends_with("&& git status"));
        assert!(!dispatched.iter().any(|c| c.contains("git commit")));
    }

    #[tokio::test]
    async fn bump_is_refused_off_release_branch() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());

        let err = workflow(&runner, state_on("develop"), &path)
            .bump(BumpPart::Minor)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("release branch"));
        assert!(runner.dispatched().is_empty());
    }

    #[tokio::test]
    async fn bump_commits_and_renames_the_release_branch() {
        let (_temp, path) = temp_manifest("1.4.8");
        let runner = Arc::new(ScriptedRunner::new());
        let mut state = state_on("release-1.4.8");
        state.release = Some("release-1.4.8".to_string());

        workflow(&runner, state, &path).bump(BumpPart::Minor).await.unwrap();

        let dispatched = runner.dispatched();
        assert_eq!(dispatched[0], "git checkout release-1.4.8");
        assert!(dispatched[1].contains("git commit -m 'bump version to 1.5.0'"));
        assert_eq!(dispatched[2], "git branch -m release-1.5.0");

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("1.5.0"));
    }

    #[tokio::test]
    async fn failed_command_halts_the_chain() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());
        runner.push(JobOutcome::success("")); // checkout develop
        runner.push(JobOutcome::failed(
            JobFailure::Exit(Some(128)),
            "",
            "fatal: a branch named 'release-1.2.4' already exists\n",
        ));

        let err = workflow(&runner, state_on("develop"), &path)
            .start(BranchKind::Release, None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("aborted"));
        // The commit step pre-built by the chain never ran.
        assert_eq!(runner.dispatched().len(), 2);
    }

    #[tokio::test]
    async fn finish_feature_merges_into_develop() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());

        workflow(&runner, state_on("my_feature"), &path)
            .finish(BranchKind::Feature)
            .await
            .unwrap();

        assert_eq!(
            runner.dispatched(),
            vec![
                "git checkout develop",
                "git merge --no-ff my_feature",
                "git branch -d my_feature",
            ]
        );
    }

    #[tokio::test]
    async fn finish_feature_is_refused_on_trunk_branches() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());

        let err = workflow(&runner, state_on("develop"), &path)
            .finish(BranchKind::Feature)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("requires"));
        assert!(runner.dispatched().is_empty());
    }

    #[tokio::test]
    async fn finish_release_runs_the_full_integration_chain() {
        let (_temp, path) = temp_manifest("1.4.8");
        let runner = Arc::new(ScriptedRunner::new());
        let mut state = state_on("release-1.4.8");
        state.release = Some("release-1.4.8".to_string());

        workflow(&runner, state, &path).finish(BranchKind::Release).await.unwrap();

        assert_eq!(
            runner.dispatched(),
            vec![
                "git checkout release-1.4.8",
                "git checkout master",
                "git merge --no-ff -s recursive -Xtheirs release-1.4.8",
                "git tag -a 1.4.8 -m 'version 1.4.8'",
                "git checkout develop",
                "git merge --no-ff release-1.4.8",
                "git branch -d release-1.4.8",
            ]
        );
    }

    #[tokio::test]
    async fn finish_release_waits_for_open_hotfix() {
        let (_temp, path) = temp_manifest("1.4.8");
        let runner = Arc::new(ScriptedRunner::new());
        let mut state = state_on("release-1.4.8");
        state.release = Some("release-1.4.8".to_string());
        state.hotfix = Some("hotfix-1.4.7".to_string());

        let err = workflow(&runner, state, &path)
            .finish(BranchKind::Release)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("finish your hotfix"));
        assert!(runner.dispatched().is_empty());
    }

    #[tokio::test]
    async fn finish_hotfix_without_release_merges_into_develop() {
        let (_temp, path) = temp_manifest("1.4.8");
        let runner = Arc::new(ScriptedRunner::new());
        let mut state = state_on("hotfix-1.4.8");
        state.hotfix = Some("hotfix-1.4.8".to_string());

        workflow(&runner, state, &path).finish(BranchKind::Hotfix).await.unwrap();

        assert_eq!(
            runner.dispatched(),
            vec![
                "git checkout hotfix-1.4.8",
                "git checkout master",
                "git merge --no-ff -s recursive -Xtheirs hotfix-1.4.8",
                "git tag -a 1.4.8 -m 'version 1.4.8'",
                "git checkout develop",
                "git merge --no-ff hotfix-1.4.8",
                "git branch -d hotfix-1.4.8",
            ]
        );
    }

    #[tokio::test]
    async fn finish_hotfix_with_open_release_folds_and_rebumps() {
        let (_temp, path) = temp_manifest("1.4.8");
        let runner = Arc::new(ScriptedRunner::new());
        let mut state = state_on("hotfix-1.4.8");
        state.hotfix = Some("hotfix-1.4.8".to_string());
        state.release = Some("release-1.4.8".to_string());

        workflow(&runner, state, &path).finish(BranchKind::Hotfix).await.unwrap();

        let dispatched = runner.dispatched();
        assert_eq!(dispatched[0], "git checkout hotfix-1.4.8");
        assert_eq!(dispatched[3], "git tag -a 1.4.8 -m 'version 1.4.8'");
        assert_eq!(dispatched[4], "git checkout release-1.4.8");
        assert_eq!(
            dispatched[5],
            "git merge --no-ff -s recursive -Xtheirs hotfix-1.4.8"
        );
        assert_eq!(dispatched[6], "git branch -d hotfix-1.4.8");
        assert!(dispatched[7].contains("git commit -m 'bump version to 1.4.9'"));
        assert_eq!(dispatched[8], "git branch -m release-1.4.9");

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("1.4.9"));
    }

    #[test]
    fn init_writes_a_fresh_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.json");

        init(&options(&path), "newproject", "0.1.0").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"newproject\""));
        assert!(text.contains("\"0.1.0\""));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let (_temp, path) = temp_manifest("1.0.0");
        let err = init(&options(&path), "other", "0.1.0").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn status_reports_without_running_commands() {
        let (_temp, path) = temp_manifest("1.2.3");
        let runner = Arc::new(ScriptedRunner::new());

        workflow(&runner, state_on("develop"), &path).status().unwrap();

        assert!(runner.dispatched().is_empty());
    }
}
