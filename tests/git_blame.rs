//! Blame and change markers against a real git repository
//!
//! Tests return early when no `git` executable is available.

use std::fs;
use std::path::Path;
use std::process::Command;

use markweave::git::{GitError, GitRepo, GitSettings};
use markweave::{Pipeline, PipelineSettings, RenderContext};
use predicates::prelude::*;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Ann Author", "-c", "user.email=ann@example.com"])
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// A repository with a two-commit history of `page.md`
///
/// Returns the repository and the hash of the first commit.
fn setup_repo() -> Option<(TempDir, String)> {
    if !git_available() {
        return None;
    }

    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);

    fs::write(dir.path().join("page.md"), "# One\n\nfirst\n\n# Two\n\nsecond\n").unwrap();
    git(dir.path(), &["add", "page.md"]);
    git(dir.path(), &["commit", "-q", "-m", "Initial pages"]);
    let first = git(dir.path(), &["rev-parse", "HEAD"]);

    fs::write(dir.path().join("page.md"), "# One\n\nfirst\n\n# Two\n\nrewritten\n").unwrap();
    git(dir.path(), &["commit", "-q", "-am", "Rewrite second section"]);

    Some((dir, first))
}

#[test]
fn test_blame_covers_every_line() {
    let Some((dir, first)) = setup_repo() else {
        return;
    };
    let repo = GitRepo::discover(dir.path(), GitSettings::default()).unwrap();

    let blame = repo.blame_file(Path::new("page.md"), None).unwrap();

    assert_eq!(blame.len(), 7);
    assert_eq!(blame[&1].hash, first);
    assert_eq!(blame[&7].summary, "Rewrite second section");
    assert_eq!(blame[&7].author, "Ann Author");
    assert_eq!(blame[&7].date.len(), 10);
}

#[test]
fn test_since_keeps_only_later_commits() {
    let Some((dir, first)) = setup_repo() else {
        return;
    };
    let repo = GitRepo::discover(dir.path(), GitSettings::default()).unwrap();

    let blame = repo.blame_file(Path::new("page.md"), Some(&first)).unwrap();

    assert_eq!(blame.keys().copied().collect::<Vec<_>>(), vec![7]);
}

#[test]
fn test_unknown_ref_is_an_error() {
    let Some((dir, _)) = setup_repo() else {
        return;
    };
    let repo = GitRepo::discover(dir.path(), GitSettings::default()).unwrap();

    let err = repo.blame_file(Path::new("page.md"), Some("no-such-ref")).unwrap_err();

    assert!(matches!(err, GitError::RefNotFound(r) if r == "no-such-ref"));
}

#[test]
fn test_changed_sections_are_marked_in_html() {
    let Some((dir, first)) = setup_repo() else {
        return;
    };
    let page = dir.path().join("page.md").canonicalize().unwrap();
    let source = format!(
        "---\nshow-changes-since: \"{}\"\n---\n{}",
        first,
        fs::read_to_string(&page).unwrap()
    );
    // Front matter lines are blamed too but precede the first heading
    fs::write(&page, &source).unwrap();
    git(dir.path(), &["commit", "-q", "-am", "Add front matter"]);

    let pipeline = Pipeline::standard(&PipelineSettings::default());
    let mut ctx = RenderContext::for_path(&page);
    let converted = pipeline.convert_document(&source, &mut ctx).unwrap();

    assert!(converted.html.contains("Rewrite second section"));
    assert!(!converted.html.contains("Add front matter"));
    let changes = converted.html.matches("tooltip change").count();
    assert_eq!(changes, 1);
    let two = converted.html.find("id=\"two\"").unwrap();
    let marker = converted.html.find("tooltip change").unwrap();
    assert!(marker > two);
}

#[test]
fn test_blame_command_lists_lines() {
    let Some((dir, first)) = setup_repo() else {
        return;
    };

    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("markweave"))
        .current_dir(dir.path())
        .args(["blame", "--since", &first, "page.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rewrite second section"))
        .stdout(predicate::str::contains("Initial pages").not());
}
