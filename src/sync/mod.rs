//! The sync procedure: merge upstream, detect a version bump, propagate it
//! into the downstream package, publish.
//!
//! A merge that GitHub rejects with a conflict opens (or refreshes) a tracking
//! issue before the error is returned; see [`conflict`].

pub mod conflict;

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::git::{Git, Identity, run_checked};
use crate::github::{GitHubApi, GitHubRepo};
use crate::http::is_conflict;
use crate::package::Manifest;
use crate::runtime::Runtime;

pub use conflict::{CONFLICT_ISSUE_TITLE, IssueAction, conflict_issue_body, report_conflict};

pub const DEFAULT_INSTALL_COMMAND: &str = "pnpm install --no-frozen-lockfile";

/// Everything the sync procedure needs to know about the two repositories.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// The fork being kept in sync.
    pub repo: GitHubRepo,
    /// Upstream repository; discovered from the fork's parent when absent.
    pub upstream: Option<GitHubRepo>,
    /// Upstream branch the conflict report points at; defaults to `branch`.
    pub upstream_branch: Option<String>,
    /// Fork branch that receives the merge, the bump commit and the dispatch.
    pub branch: String,
    pub workdir: PathBuf,
    pub upstream_manifest: PathBuf,
    pub downstream_manifest: PathBuf,
    /// Upstream packages whose constraints track the upstream version.
    pub dependencies: Vec<String>,
    /// Prepended to the version in dependency constraints, e.g. `^`.
    pub range_prefix: String,
    /// Program and arguments that refresh lockfiles; empty skips the step.
    pub install_command: Vec<String>,
    /// Lockfiles staged alongside the downstream descriptor when present.
    pub lockfiles: Vec<PathBuf>,
    pub workflow: String,
    pub identity: Identity,
}

impl SyncConfig {
    pub fn new(repo: GitHubRepo, downstream_manifest: PathBuf, dependencies: Vec<String>) -> Self {
        Self {
            repo,
            upstream: None,
            upstream_branch: None,
            branch: "main".to_string(),
            workdir: PathBuf::from("."),
            upstream_manifest: PathBuf::from("package.json"),
            downstream_manifest,
            dependencies,
            range_prefix: String::new(),
            install_command: split_command(DEFAULT_INSTALL_COMMAND),
            lockfiles: vec![
                PathBuf::from("pnpm-workspace.yaml"),
                PathBuf::from("pnpm-lock.yaml"),
            ],
            workflow: "publish.yml".to_string(),
            identity: Identity::default(),
        }
    }
}

/// Splits a command line on whitespace. Quoting is not supported.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The merge did not change the upstream version; nothing was published.
    Unchanged { version: String },
    /// The downstream package was bumped, pushed and the publish workflow dispatched.
    Updated { from: String, to: String },
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOutcome::Unchanged { version } => {
                write!(f, "Upstream version unchanged ({})", version)
            }
            SyncOutcome::Updated { from, to } => {
                write!(f, "Upstream version changed: {} -> {}", from, to)
            }
        }
    }
}

pub struct Syncer<R: Runtime, G: GitHubApi> {
    runtime: R,
    github: G,
    config: SyncConfig,
}

impl<R: Runtime, G: GitHubApi> Syncer<R, G> {
    pub fn new(runtime: R, github: G, config: SyncConfig) -> Self {
        Self {
            runtime,
            github,
            config,
        }
    }

    /// Runs the whole procedure once.
    ///
    /// Errors are returned as they occurred. A merge conflict additionally
    /// files the tracking issue first; a failure while filing it is logged and
    /// does not replace the merge error.
    #[tracing::instrument(skip(self), fields(repo = %self.config.repo))]
    pub async fn run(&self) -> Result<SyncOutcome> {
        let before = self.upstream_version()?;
        info!("Upstream version before merge: {}", before);

        if let Err(err) = self.merge_upstream().await {
            if is_conflict(&err) {
                warn!("Upstream merge conflicts, filing tracking issue: {:#}", err);
                match self.report_conflict().await {
                    Ok(action) => info!("Conflict issue: {:?}", action),
                    Err(report_err) => warn!("Failed to file conflict issue: {:#}", report_err),
                }
            }
            return Err(err);
        }

        let after = self.upstream_version()?;
        if after == before {
            info!("Upstream version unchanged ({}), nothing to do", after);
            return Ok(SyncOutcome::Unchanged { version: after });
        }

        info!("Upstream version changed: {} -> {}", before, after);
        self.propagate(&after).await?;

        Ok(SyncOutcome::Updated {
            from: before,
            to: after,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.config.workdir.join(path)
    }

    fn upstream_version(&self) -> Result<String> {
        let manifest = Manifest::load(&self.runtime, &self.resolve(&self.config.upstream_manifest))?;
        Ok(manifest.version()?.to_string())
    }

    async fn merge_upstream(&self) -> Result<()> {
        let merged = self
            .github
            .merge_upstream(&self.config.repo, &self.config.branch)
            .await?;
        info!(
            "Merge upstream: {} ({})",
            merged.message,
            merged.merge_type.as_deref().unwrap_or("unknown")
        );

        Git::new(&self.runtime, &self.config.workdir).pull(&self.config.branch)
    }

    /// The upstream repository and branch a conflict report refers to.
    async fn resolve_upstream(&self) -> Result<(GitHubRepo, String)> {
        if let Some(upstream) = &self.config.upstream {
            let branch = self
                .config
                .upstream_branch
                .clone()
                .unwrap_or_else(|| self.config.branch.clone());
            return Ok((upstream.clone(), branch));
        }

        let info = self.github.get_repo_info(&self.config.repo).await?;
        let parent = info
            .parent
            .ok_or_else(|| anyhow!("{} is not a fork; pass --upstream", self.config.repo))?;
        let upstream = parent.full_name.parse::<GitHubRepo>()?;
        let branch = self
            .config
            .upstream_branch
            .clone()
            .unwrap_or(parent.default_branch);
        Ok((upstream, branch))
    }

    async fn report_conflict(&self) -> Result<IssueAction> {
        let (upstream, branch) = self.resolve_upstream().await?;
        report_conflict(&self.github, &self.config.repo, &upstream, &branch).await
    }

    async fn propagate(&self, version: &str) -> Result<()> {
        let package_name = self.bump_downstream(version)?;
        self.install()?;
        self.commit_and_push(&package_name, version)?;

        info!("Dispatching workflow {}...", self.config.workflow);
        self.github
            .dispatch_workflow(&self.config.repo, &self.config.workflow, &self.config.branch)
            .await?;

        Ok(())
    }

    /// Rewrites the downstream descriptor; returns its package name.
    fn bump_downstream(&self, version: &str) -> Result<String> {
        let path = self.resolve(&self.config.downstream_manifest);
        let mut manifest = Manifest::load(&self.runtime, &path)?;

        let undeclared: Vec<&str> = self
            .config
            .dependencies
            .iter()
            .map(String::as_str)
            .filter(|dep| manifest.groups_declaring(dep).is_empty())
            .collect();
        if !undeclared.is_empty() {
            bail!(
                "{:?} does not declare tracked dependencies: {}",
                path,
                undeclared.join(", ")
            );
        }

        let constraint = format!("{}{}", self.config.range_prefix, version);
        manifest.set_version(version);
        for dep in &self.config.dependencies {
            let groups = manifest.pin_dependency(dep, &constraint);
            info!("{} -> {} ({} group(s))", dep, constraint, groups);
        }
        manifest.save(&self.runtime)?;

        Ok(manifest.name().unwrap_or("package").to_string())
    }

    fn install(&self) -> Result<()> {
        let Some((program, args)) = self.config.install_command.split_first() else {
            info!("No install command configured, skipping lockfile refresh");
            return Ok(());
        };
        info!("Refreshing lockfiles with {}...", self.config.install_command.join(" "));
        run_checked(&self.runtime, program, args, &self.config.workdir)
            .context("Failed to refresh lockfiles")?;
        Ok(())
    }

    fn commit_and_push(&self, package_name: &str, version: &str) -> Result<()> {
        let mut paths = vec![self.config.downstream_manifest.clone()];
        paths.extend(
            self.config
                .lockfiles
                .iter()
                .filter(|lockfile| self.runtime.exists(&self.resolve(lockfile)))
                .cloned(),
        );

        let git = Git::new(&self.runtime, &self.config.workdir);
        git.configure_identity(&self.config.identity)?;
        git.add(&paths)?;
        git.commit(&format!("chore: sync {} to {}", package_name, version))?;
        git.push(&self.config.branch)
    }
}
