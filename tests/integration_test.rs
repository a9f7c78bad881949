use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use std::path::Path;
use tempfile::{TempDir, tempdir};

const ISSUE_TITLE: &str = "Upstream sync blocked by merge conflict";

fn workdir_with_upstream_version(version: &str) -> TempDir {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("package.json"),
        format!(
            r#"{{"name": "upstream-monorepo", "private": true, "version": "{}"}}"#,
            version
        ),
    )
    .unwrap();
    dir
}

fn forksync(workdir: &Path, api_url: &str) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("forksync"));
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("FORKSYNC_UPSTREAM_BRANCH")
        .env("RUST_LOG", "info")
        .arg("--repo")
        .arg("acme/widgets")
        .arg("--upstream")
        .arg("upstream/widgets")
        .arg("--workdir")
        .arg(workdir)
        .arg("--downstream-manifest")
        .arg("react/package.json")
        .arg("--dependency")
        .arg("@upstream/core,@upstream/dom,@upstream/testing")
        .arg("--api-url")
        .arg(api_url);
    cmd
}

fn mock_merge_conflict(server: &mut Server) -> mockito::Mock {
    server
        .mock("POST", "/repos/acme/widgets/merge-upstream")
        .match_body(Matcher::Json(serde_json::json!({"branch": "main"})))
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "There are merge conflicts"}"#)
        .create()
}

fn mock_upstream_commit(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", "/repos/upstream/widgets/commits/main")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"sha": "f00dcafe", "html_url": "https://github.com/upstream/widgets/commit/f00dcafe"}"#,
        )
        .create()
}

#[test]
fn test_conflict_creates_tracking_issue_and_fails() {
    let mut server = Server::new();
    let url = server.url();
    let workdir = workdir_with_upstream_version("1.2.0");

    let merge = mock_merge_conflict(&mut server);
    let commit = mock_upstream_commit(&mut server);
    let list = server
        .mock(
            "GET",
            "/repos/acme/widgets/issues?state=open&per_page=100&page=1",
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"number": 4, "title": "Unrelated", "body": "x"}]"#)
        .create();
    let create = server
        .mock("POST", "/repos/acme/widgets/issues")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(serde_json::json!({ "title": ISSUE_TITLE })),
            Matcher::Regex("upstream/widgets/commit/f00dcafe".to_string()),
        ]))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"number": 12, "title": "{}", "body": "b"}}"#,
            ISSUE_TITLE
        ))
        .expect(1)
        .create();
    let update = server
        .mock("PATCH", Matcher::Regex(r"^/repos/acme/widgets/issues/\d+$".to_string()))
        .expect(0)
        .create();

    forksync(workdir.path(), &url)
        .assert()
        .failure()
        .stderr(predicate::str::contains("409"));

    merge.assert();
    commit.assert();
    list.assert();
    create.assert();
    update.assert();
}

#[test]
fn test_conflict_refreshes_stale_tracking_issue() {
    let mut server = Server::new();
    let url = server.url();
    let workdir = workdir_with_upstream_version("1.2.0");

    let _merge = mock_merge_conflict(&mut server);
    let _commit = mock_upstream_commit(&mut server);
    let _list = server
        .mock(
            "GET",
            "/repos/acme/widgets/issues?state=open&per_page=100&page=1",
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"[{{"number": 9, "title": "{}", "body": "points at an older commit"}}]"#,
            ISSUE_TITLE
        ))
        .create();
    let update = server
        .mock("PATCH", "/repos/acme/widgets/issues/9")
        .match_body(Matcher::Regex("f00dcafe".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"number": 9, "title": "{}", "body": "b"}}"#,
            ISSUE_TITLE
        ))
        .expect(1)
        .create();
    let create = server
        .mock("POST", "/repos/acme/widgets/issues")
        .expect(0)
        .create();

    forksync(workdir.path(), &url).assert().failure();

    update.assert();
    create.assert();
}

#[test]
fn test_other_merge_failure_leaves_issues_alone() {
    let mut server = Server::new();
    let url = server.url();
    let workdir = workdir_with_upstream_version("1.2.0");

    let merge = server
        .mock("POST", "/repos/acme/widgets/merge-upstream")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "Branch not found"}"#)
        .expect(1)
        .create();
    let commit = server
        .mock("GET", Matcher::Regex("/commits/".to_string()))
        .expect(0)
        .create();
    let list = server
        .mock("GET", Matcher::Regex("/issues".to_string()))
        .expect(0)
        .create();
    let create = server
        .mock("POST", "/repos/acme/widgets/issues")
        .expect(0)
        .create();

    forksync(workdir.path(), &url)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Branch not found"));

    merge.assert();
    commit.assert();
    list.assert();
    create.assert();
}

#[test]
fn test_missing_upstream_manifest_fails_before_merge() {
    let mut server = Server::new();
    let url = server.url();
    let workdir = tempdir().unwrap();

    let merge = server
        .mock("POST", "/repos/acme/widgets/merge-upstream")
        .expect(0)
        .create();

    forksync(workdir.path(), &url)
        .assert()
        .failure()
        .stderr(predicate::str::contains("package.json"));

    merge.assert();
}

#[test]
fn test_help_lists_options() {
    Command::new(cargo::cargo_bin!("forksync"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--downstream-manifest"))
        .stdout(predicate::str::contains("--dependency"));
}

#[test]
fn test_missing_repo_is_usage_error() {
    Command::new(cargo::cargo_bin!("forksync"))
        .env_remove("GITHUB_REPOSITORY")
        .arg("--downstream-manifest")
        .arg("react/package.json")
        .arg("--dependency")
        .arg("a")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--repo"));
}

#[test]
fn test_missing_dependency_is_usage_error() {
    Command::new(cargo::cargo_bin!("forksync"))
        .env_remove("FORKSYNC_DEPENDENCIES")
        .arg("--repo")
        .arg("acme/widgets")
        .arg("--downstream-manifest")
        .arg("react/package.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dependency"));
}
