//! End-to-end CLI tests against a scratch project.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let write = |rel: &str, content: &str| {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    };
    write("content/contents.str", "title: Home\n");
    write("content/blog/contents.str", "title: Blog\n");
    write(
        "content/blog/first/contents.str",
        "title: First Post\n---\npub_date: 2024-01-01\n",
    );
    write(
        "content/blog/hidden/contents.str",
        "title: Secret\n---\n_hidden: yes\n",
    );
    write("assets/site.css", "body {}");
    dir
}

fn strata(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.arg("--project").arg(dir.path()).arg("--quiet");
    cmd
}

#[test]
fn test_ls_lists_children() {
    let dir = project();
    strata(&dir)
        .args(["ls", "/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/blog"));
}

#[test]
fn test_ls_hides_hidden_by_default() {
    let dir = project();
    strata(&dir)
        .args(["ls", "/blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/blog/first"))
        .stdout(predicate::str::contains("/blog/hidden").not());
    strata(&dir)
        .args(["ls", "/blog", "--hidden"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/blog/hidden"));
}

#[test]
fn test_show_emits_json() {
    let dir = project();
    strata(&dir)
        .args(["show", "/blog/first"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"url_path\": \"/blog/first/\""))
        .stdout(predicate::str::contains("First Post"));
}

#[test]
fn test_show_missing_record_fails() {
    let dir = project();
    strata(&dir)
        .args(["show", "/nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no record"));
}

#[test]
fn test_resolve_record_and_asset() {
    let dir = project();
    strata(&dir)
        .args(["resolve", "/blog/first/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"path\": \"/blog/first\""));
    strata(&dir)
        .args(["resolve", "/site.css"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"asset\": \"site.css\""));
    strata(&dir)
        .args(["resolve", "/nope/"])
        .assert()
        .failure();
}

#[test]
fn test_deps_lists_source_files() {
    let dir = project();
    strata(&dir)
        .args(["deps", "/blog/first"])
        .assert()
        .success()
        .stdout(predicate::str::contains("contents.str"));
}
