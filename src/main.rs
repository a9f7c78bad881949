use anyhow::Result;
use clap::Parser;
use forksync::{
    config::Config,
    git::Identity,
    github::GitHubRepo,
    sync::{DEFAULT_INSTALL_COMMAND, SyncConfig, Syncer, split_command},
};
use std::path::PathBuf;

/// forksync - keep a fork's package metadata in step with upstream
///
/// Merges the upstream branch into the fork, and when the upstream package
/// version moved, bumps the downstream package, commits, pushes and dispatches
/// the publish workflow. A merge conflict opens or refreshes a tracking issue.
///
/// GITHUB_TOKEN is used for authentication when set.
///
/// Examples:
///   forksync --repo acme/widgets --downstream-manifest react/package.json \
///            --dependency @upstream/core,@upstream/dom,@upstream/testing
#[derive(Parser, Debug)]
#[command(author, version = env!("FORKSYNC_VERSION"), about)]
struct Cli {
    /// The fork, as "owner/repo"
    #[arg(long, env = "GITHUB_REPOSITORY", value_name = "OWNER/REPO")]
    repo: GitHubRepo,

    /// Upstream repository (defaults to the fork's parent)
    #[arg(long, env = "FORKSYNC_UPSTREAM", value_name = "OWNER/REPO")]
    upstream: Option<GitHubRepo>,

    /// Upstream branch referenced by conflict reports (defaults to the parent's default branch)
    #[arg(long, env = "FORKSYNC_UPSTREAM_BRANCH", value_name = "BRANCH")]
    upstream_branch: Option<String>,

    /// Fork branch to merge into, push to and dispatch on
    #[arg(long, env = "FORKSYNC_BRANCH", default_value = "main")]
    branch: String,

    /// Git working tree of the fork
    #[arg(long, env = "FORKSYNC_WORKDIR", default_value = ".", value_name = "PATH")]
    workdir: PathBuf,

    /// Upstream package descriptor, relative to the working tree
    #[arg(long, default_value = "package.json", value_name = "PATH")]
    upstream_manifest: PathBuf,

    /// Downstream package descriptor, relative to the working tree
    #[arg(long, env = "FORKSYNC_DOWNSTREAM_MANIFEST", value_name = "PATH")]
    downstream_manifest: PathBuf,

    /// Upstream packages pinned to the upstream version (repeat or comma separate)
    #[arg(
        long = "dependency",
        env = "FORKSYNC_DEPENDENCIES",
        value_name = "NAME",
        value_delimiter = ',',
        required = true,
        num_args = 1..
    )]
    dependencies: Vec<String>,

    /// Prefix for pinned constraints, e.g. "^"
    #[arg(long, default_value = "", value_name = "PREFIX")]
    range_prefix: String,

    /// Command that refreshes lockfiles; empty to skip
    #[arg(long, default_value = DEFAULT_INSTALL_COMMAND, value_name = "COMMAND")]
    install_command: String,

    /// Lockfiles committed with the descriptor when present
    #[arg(
        long = "lockfile",
        default_values = ["pnpm-workspace.yaml", "pnpm-lock.yaml"],
        value_name = "PATH"
    )]
    lockfiles: Vec<PathBuf>,

    /// Workflow file name or ID dispatched after a bump
    #[arg(long, env = "FORKSYNC_WORKFLOW", default_value = "publish.yml")]
    workflow: String,

    /// Commit author name
    #[arg(long, default_value_t = Identity::default().name)]
    git_user_name: String,

    /// Commit author email
    #[arg(long, default_value_t = Identity::default().email)]
    git_user_email: String,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", env = "GITHUB_API_URL", value_name = "URL")]
    api_url: Option<String>,
}

impl Cli {
    fn into_sync_config(self) -> SyncConfig {
        let mut config = SyncConfig::new(self.repo, self.downstream_manifest, self.dependencies);
        config.upstream = self.upstream;
        config.upstream_branch = self.upstream_branch;
        config.branch = self.branch;
        config.workdir = self.workdir;
        config.upstream_manifest = self.upstream_manifest;
        config.range_prefix = self.range_prefix;
        config.install_command = split_command(&self.install_command);
        config.lockfiles = self.lockfiles;
        config.workflow = self.workflow;
        config.identity = Identity {
            name: self.git_user_name,
            email: self.git_user_email,
        };
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let api_url = cli.api_url.clone();

    let config = Config::new(forksync::runtime::RealRuntime, api_url)?;
    let syncer = Syncer::new(config.runtime, config.github, cli.into_sync_config());
    let outcome = syncer.run().await?;

    println!("{}", outcome);
    Ok(())
}
