//! Git working-tree operations, executed through the `git` command line.

use anyhow::{Result, bail};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::runtime::{CommandOutput, Runtime};

/// Name and email recorded on commits made by the sync job.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "github-actions[bot]".to_string(),
            email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

pub struct Git<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
    workdir: PathBuf,
}

impl<'a, R: Runtime + ?Sized> Git<'a, R> {
    pub fn new(runtime: &'a R, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            workdir: workdir.into(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn pull(&self, branch: &str) -> Result<()> {
        info!("Pulling origin/{}...", branch);
        self.git(&["pull", "origin", branch])?;
        Ok(())
    }

    /// Sets the global git identity.
    #[tracing::instrument(skip(self))]
    pub fn configure_identity(&self, identity: &Identity) -> Result<()> {
        self.git(&["config", "--global", "user.name", &identity.name])?;
        self.git(&["config", "--global", "user.email", &identity.email])?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn add(&self, paths: &[PathBuf]) -> Result<()> {
        let mut args = vec!["add".to_string(), "--".to_string()];
        args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
        self.run_git(&args)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn commit(&self, message: &str) -> Result<()> {
        info!("Committing: {}", message);
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn push(&self, branch: &str) -> Result<()> {
        info!("Pushing to origin/{}...", branch);
        self.git(&["push", "origin", &format!("HEAD:{}", branch)])?;
        Ok(())
    }

    fn git(&self, args: &[&str]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.run_git(&args)
    }

    fn run_git(&self, args: &[String]) -> Result<CommandOutput> {
        run_checked(self.runtime, "git", args, &self.workdir)
    }
}

/// Runs a command and fails unless it exits successfully.
pub fn run_checked<R: Runtime + ?Sized>(
    runtime: &R,
    program: &str,
    args: &[String],
    cwd: &Path,
) -> Result<CommandOutput> {
    debug!("$ {} {}", program, args.join(" "));
    let output = runtime.run(program, args, cwd)?;
    if !output.success {
        let code = output
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        bail!(
            "`{} {}` failed (exit {}): {}",
            program,
            args.join(" "),
            code,
            output.stderr.trim()
        );
    }
    Ok(output)
}
