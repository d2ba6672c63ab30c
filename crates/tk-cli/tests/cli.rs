//! End-to-end tests for the threadkeeper binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn threadkeeper(data: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("threadkeeper").unwrap();
    cmd.env_remove("THREADKEEPER_CONFIG")
        .env_remove("THREADKEEPER_DATA_DIR")
        .arg("--no-color")
        .arg("--data-dir")
        .arg(data.path());
    cmd
}

fn run(data: &TempDir, args: &[&str]) -> String {
    let output = threadkeeper(data).args(args).assert().success();
    String::from_utf8(output.get_output().stdout.clone()).unwrap()
}

fn setup() -> TempDir {
    let data = TempDir::new().unwrap();
    run(&data, &["init"]);
    run(&data, &["post", "register", "welcome"]);
    run(&data, &["user", "add", "alice", "--display-name", "Alice"]);
    run(&data, &["user", "add", "bob"]);
    data
}

fn add(data: &TempDir, user: &str, parent: Option<u64>, content: &str) -> u64 {
    let mut args = vec!["comment", "add", "--post", "welcome", "--user", user, "--json"];
    let parent = parent.map(|p| p.to_string());
    if let Some(parent) = &parent {
        args.extend(["--parent", parent.as_str()]);
    }
    args.push(content);

    let json: serde_json::Value = serde_json::from_str(&run(data, &args)).unwrap();
    json["id"].as_u64().unwrap()
}

#[test]
fn test_help() {
    Command::cargo_bin("threadkeeper")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("comment"));
}

#[test]
fn test_init_writes_files() {
    let data = TempDir::new().unwrap();
    threadkeeper(&data)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(data.path().join("comments.json").exists());
    assert!(data.path().join("config.toml").exists());

    // Second run keeps the existing configuration
    threadkeeper(&data)
        .arg("init")
        .assert()
        .success()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_thread_listing() {
    let data = setup();
    let a = add(&data, "alice", None, "Top level");
    let b = add(&data, "bob", Some(a), "A reply");
    add(&data, "alice", Some(b), "A nested reply");

    let out = run(&data, &["comment", "list", "welcome"]);
    assert!(out.contains("Alice"));
    assert!(out.contains("    A nested reply"));
    assert!(out.contains("3 comment(s)"));

    let json: serde_json::Value =
        serde_json::from_str(&run(&data, &["comment", "list", "welcome", "--json"])).unwrap();
    assert_eq!(json["total"], 3);
    assert_eq!(json["comments"][0]["replies"][0]["author"]["username"], "bob");
}

#[test]
fn test_delete_modes() {
    let data = setup();
    let a = add(&data, "alice", None, "A");
    let b = add(&data, "bob", Some(a), "B");
    let c = add(&data, "alice", Some(b), "C");

    let out = run(&data, &["comment", "delete", &b.to_string(), "--yes", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["count"], 1);

    let listing: serde_json::Value =
        serde_json::from_str(&run(&data, &["comment", "list", "welcome", "--json"])).unwrap();
    assert_eq!(listing["comments"][1]["id"], c);

    run(&data, &["comment", "delete", &a.to_string(), "--cascade", "--yes"]);
    assert_eq!(run(&data, &["comment", "count", "welcome"]).trim(), "0");
}

#[test]
fn test_errors_exit_nonzero() {
    let data = setup();

    threadkeeper(&data)
        .args(["comment", "add", "--post", "missing", "--user", "alice", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Post not found"));

    threadkeeper(&data)
        .args(["comment", "add", "--post", "welcome", "--user", "nobody", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("User not found"));

    threadkeeper(&data)
        .args(["comment", "add", "--post", "welcome", "--user", "alice", "   "])
        .assert()
        .failure();

    threadkeeper(&data)
        .args(["comment", "delete", "99", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("99"));

    assert_eq!(run(&data, &["comment", "count", "welcome"]).trim(), "0");
}

#[test]
fn test_pagination_flags() {
    let data = setup();
    for i in 0..4 {
        add(&data, "bob", None, &format!("root {}", i));
    }

    let json: serde_json::Value = serde_json::from_str(&run(
        &data,
        &["comment", "list", "welcome", "--page", "2", "--limit", "3", "--json"],
    ))
    .unwrap();
    assert_eq!(json["comments"].as_array().unwrap().len(), 1);
    assert_eq!(json["total"], 4);

    threadkeeper(&data)
        .args(["comment", "list", "welcome", "--page", "0"])
        .assert()
        .failure();
}

#[test]
fn test_config_show_json() {
    let data = setup();
    let json: serde_json::Value =
        serde_json::from_str(&run(&data, &["config", "show", "--json"])).unwrap();
    assert_eq!(json["listing"]["default_limit"], 50);

    threadkeeper(&data)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}
