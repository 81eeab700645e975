//! CLI integration tests for taskfn
//!
//! These tests run the binary against task fixtures written to a temporary
//! directory, checking both output formats and error reporting.

use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get a command instance for the taskfn binary
fn taskfn_cmd(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("taskfn"));
    cmd.current_dir(dir.path()).env_remove("TASKFN_LOG");
    cmd
}

const TASKS: &str = r##"
files:
  work/apollo.md:
    frontmatter:
      project: Apollo
tasks:
  - description: "Write launch notes #work"
    due: 2023-06-12
    path: work/apollo.md
    line: 3
  - description: "Call the plumber #home"
    due: 2023-06-09
    priority: high
    path: inbox.md
  - description: "Archive old files #work"
    status: x
    path: work/apollo.md
    line: 7
  - description: "Someday"
"##;

/// Create a temporary directory containing `tasks.yaml`
fn setup_tasks() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.yaml");
    fs::write(&path, TASKS).unwrap();
    (dir, path)
}

// =============================================================================
// Group Tests
// =============================================================================

#[test]
fn test_group_by_due_date() {
    let (dir, tasks) = setup_tasks();

    taskfn_cmd(&dir)
        .args(["group", "--now", "2023-06-10 20:00", "--ungrouped", "omit", "-t"])
        .arg(&tasks)
        .args(["-g", "task.due.format('YYYY-MM-DD dddd')"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#### 2023-06-09 Friday\n- [ ] Call the plumber #home"))
        .stdout(predicate::str::contains("#### 2023-06-12 Monday\n- [ ] Write launch notes #work"))
        .stdout(predicate::str::contains("Someday").not());
}

#[test]
fn test_group_hides_sort_markers() {
    let (dir, tasks) = setup_tasks();

    taskfn_cmd(&dir)
        .args(["group", "--now", "2023-06-10 20:00", "-t"])
        .arg(&tasks)
        .args(["-g", "task.due.category.groupText"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#### Overdue"))
        .stdout(predicate::str::contains("#### Undated"))
        .stdout(predicate::str::contains("%%").not());
}

#[test]
fn test_group_with_query_file() {
    let (dir, tasks) = setup_tasks();
    let query = dir.path().join("query.txt");
    fs::write(
        &query,
        "# open work by project\n\
         filter by function !task.isDone\n\
         group by function task.file.property('project') ?? 'No project'\n",
    )
    .unwrap();

    taskfn_cmd(&dir)
        .args(["group", "--now", "2023-06-10", "-t"])
        .arg(&tasks)
        .arg("--query")
        .arg(&query)
        .assert()
        .success()
        .stdout(predicate::str::contains("#### Apollo\n- [ ] Write launch notes #work"))
        .stdout(predicate::str::contains("#### No project"))
        .stdout(predicate::str::contains("Archive old files").not());
}

#[test]
fn test_group_json_format() {
    let (dir, tasks) = setup_tasks();

    let output = taskfn_cmd(&dir)
        .args(["--format", "json", "group", "--now", "2023-06-10 20:00", "-t"])
        .arg(&tasks)
        .args(["-g", "task.tags", "--sort", "task.description"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let groups = json["groups"].as_array().unwrap();
    assert_eq!(groups[0]["heading"], serde_json::Value::Null);
    assert_eq!(groups[1]["heading"]["display_text"], "#home");
    assert_eq!(groups[2]["heading"]["display_text"], "#work");
    assert_eq!(groups[2]["tasks"][0]["description"], "Archive old files #work");
    assert_eq!(json["errors"], serde_json::json!([]));
}

#[test]
fn test_group_reports_evaluation_errors() {
    let (dir, tasks) = setup_tasks();

    taskfn_cmd(&dir)
        .args(["group", "--now", "2023-06-10", "-t"])
        .arg(&tasks)
        .args(["-g", "task.tags[0].toUpperCase()"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#### #WORK"))
        .stderr(predicate::str::contains("Warning: Failed evaluating"))
        .stderr(predicate::str::contains("'Someday'"));
}

#[test]
fn test_group_skips_invalid_expression() {
    let (dir, tasks) = setup_tasks();

    taskfn_cmd(&dir)
        .args(["group", "--now", "2023-06-10", "-t"])
        .arg(&tasks)
        .args(["-g", "task.due.format((", "-g", "task.tags"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#### #home\n- [ ] Call the plumber #home"))
        .stderr(predicate::str::contains("Warning: Skipping instruction"))
        .stderr(predicate::str::contains("task.due.format(("));
}

#[test]
fn test_query_file_skips_invalid_line() {
    let (dir, tasks) = setup_tasks();
    let query = dir.path().join("query.txt");
    fs::write(
        &query,
        "group by function task.due.format((\ngroup by function task.tags\n",
    )
    .unwrap();

    taskfn_cmd(&dir)
        .args(["group", "--now", "2023-06-10", "-t"])
        .arg(&tasks)
        .arg("--query")
        .arg(&query)
        .assert()
        .success()
        .stdout(predicate::str::contains("#### #work"))
        .stderr(predicate::str::contains("line 1"));
}

#[test]
fn test_project_config_sets_ungrouped_placement() {
    let (dir, tasks) = setup_tasks();
    fs::create_dir_all(dir.path().join(".taskfn")).unwrap();
    fs::write(
        dir.path().join(".taskfn/config.toml"),
        "[grouping]\nungrouped = \"omit\"\n",
    )
    .unwrap();

    taskfn_cmd(&dir)
        .args(["group", "--now", "2023-06-10", "-t"])
        .arg(&tasks)
        .args(["-g", "task.due.formatAsDate()"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Someday").not());
}

// =============================================================================
// Eval and Check Tests
// =============================================================================

#[test]
fn test_eval_prints_value_per_task() {
    let (dir, tasks) = setup_tasks();

    taskfn_cmd(&dir)
        .args(["eval", "--now", "2023-06-10 20:00", "-t"])
        .arg(&tasks)
        .arg("task.file.folder + task.file.filename")
        .assert()
        .success()
        .stdout(predicate::str::contains("'Write launch notes #work' (work/apollo.md:4): work/apollo.md"))
        .stdout(predicate::str::contains("'Call the plumber #home' (inbox.md:1): /inbox.md"));
}

#[test]
fn test_eval_json_format() {
    let (dir, tasks) = setup_tasks();

    let output = taskfn_cmd(&dir)
        .args(["-f", "json", "eval", "--now", "2023-06-10 20:00", "-t"])
        .arg(&tasks)
        .arg("task.priorityNumber")
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["value"], 3.0);
    assert_eq!(rows[1]["value"], 1.0);
}

#[test]
fn test_check_accepts_valid_expressions() {
    let dir = TempDir::new().unwrap();

    taskfn_cmd(&dir)
        .args(["check", "task.tags.sort().join(', ')", "task.urgency > 5 ? 'hot' : 'cold'"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: task.tags.sort().join(', ')"));
}

#[test]
fn test_check_reports_compile_errors() {
    let dir = TempDir::new().unwrap();

    taskfn_cmd(&dir)
        .args(["check", "task.description", "window.location"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("unknown name 'window'"))
        .stderr(predicate::str::contains("1 of 2 expressions failed to compile"));
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_missing_tasks_file() {
    let dir = TempDir::new().unwrap();

    taskfn_cmd(&dir)
        .args(["group", "-t", "nope.yaml", "-g", "task.tags"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read tasks"));
}

#[test]
fn test_invalid_now() {
    let (dir, tasks) = setup_tasks();

    taskfn_cmd(&dir)
        .args(["group", "--now", "next tuesday", "-t"])
        .arg(&tasks)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --now value"));
}

#[test]
fn test_verbose_flag() {
    let (dir, tasks) = setup_tasks();

    taskfn_cmd(&dir)
        .args(["--verbose", "group", "--now", "2023-06-10", "-t"])
        .arg(&tasks)
        .args(["-g", "task.tags"])
        .assert()
        .success()
        .stderr(predicate::str::contains("[verbose:group] Loaded 4 tasks"));
}
