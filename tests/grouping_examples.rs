//! End-to-end grouping scenarios through the public library API

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use taskfn::domain::{CachedMetadata, Priority, Status, Task, TasksFile};
use taskfn::query::{GroupInstruction, Query, UngroupedPlacement};
use taskfn::scripting::{CompiledExpression, EvaluationContext, ExpressionCache};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 6, 10)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 6, d).unwrap()
}

fn run(query: &str, tasks: &[Task]) -> Vec<(String, Vec<String>)> {
    let cache = ExpressionCache::new();
    let query = Query::parse(query, &cache, UngroupedPlacement::First).unwrap();
    let result = query.execute(tasks, &EvaluationContext::new(now()));
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    result
        .groups
        .iter()
        .map(|g| {
            (
                g.display_text().to_string(),
                g.all_tasks().iter().map(|t| t.description.clone()).collect(),
            )
        })
        .collect()
}

fn headings(query: &str, tasks: &[Task]) -> Vec<String> {
    run(query, tasks).into_iter().map(|(h, _)| h).collect()
}

// =============================================================================
// Headings from single instructions
// =============================================================================

#[test]
fn due_date_with_weekday() {
    let tasks = [Task::new("due").with_due(day(12)), Task::new("undated")];
    let groups = run(
        r#"group by function ungrouped omit task.due.format("YYYY-MM-DD dddd")"#,
        &tasks,
    );
    assert_eq!(groups, vec![("2023-06-12 Monday".to_string(), vec!["due".to_string()])]);
}

#[test]
fn sorted_tags_joined() {
    let tasks = [Task::new("t #b #a").with_tags(["#b", "#a"])];
    assert_eq!(headings(r#"group by function task.tags.sort().join(", ")"#, &tasks), ["#a, #b"]);
}

#[test]
fn context_tags_fan_out() {
    let tasks = [
        Task::new("both").with_tags(["#context/home", "#context/phone", "#big"]),
        Task::new("home").with_tags(["#context/home"]),
        Task::new("none").with_tags(["#big"]),
    ];
    let groups = run(
        r##"group by function ungrouped last task.tags.filter(t => t.includes("#context/")).map(t => t.replace("#context/", ""))"##,
        &tasks,
    );
    assert_eq!(
        groups,
        vec![
            ("home".to_string(), vec!["both".to_string(), "home".to_string()]),
            ("phone".to_string(), vec!["both".to_string()]),
            (String::new(), vec!["none".to_string()]),
        ]
    );
}

#[test]
fn due_categories_order_by_hidden_prefix() {
    let tasks = [
        Task::new("later").with_due(day(20)),
        Task::new("undated"),
        Task::new("today").with_due(day(10)),
        Task::new("late").with_due(day(1)),
    ];
    assert_eq!(
        headings("group by function task.due.category.groupText", &tasks),
        [" Overdue", " Today", " Future", " Undated"]
    );
}

#[test]
fn relative_due_buckets() {
    let tasks = [
        Task::new("next week").with_due(day(17)),
        Task::new("this week").with_due(day(9)),
        Task::new("spring").with_due(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()),
    ];
    assert_eq!(
        headings("group by function task.due.fromNow.groupText", &tasks),
        [" 3 months ago", " 2 days ago", " in 6 days"]
    );
}

#[test]
fn status_type_groups_in_workflow_order() {
    let tasks = [
        Task::new("d").with_status(Status::done()),
        Task::new("t"),
        Task::new("p").with_status(Status::in_progress()),
    ];
    let shown = headings("group by function task.status.typeGroupText", &tasks);
    assert_eq!(shown, ["IN_PROGRESS", "TODO", "DONE"]);
}

#[test]
fn folders_and_frontmatter() {
    let mut frontmatter = serde_json::Map::new();
    frontmatter.insert("project".to_string(), json!("Apollo"));
    let with_meta = TasksFile::with_metadata("work/apollo.md", CachedMetadata::with_frontmatter(frontmatter));
    let tasks = [
        Task::new("a").with_file(with_meta),
        Task::new("b").with_file(TasksFile::new("inbox.md")),
    ];
    assert_eq!(headings("group by function task.file.folder", &tasks), ["/", "work/"]);
    assert_eq!(
        headings(r#"group by function task.file.property("project") ?? "No project""#, &tasks),
        ["Apollo", "No project"]
    );
}

#[test]
fn numbers_and_booleans_render_like_javascript() {
    let tasks = [
        Task::new("hi").with_priority(Priority::Highest),
        Task::new("lo").with_priority(Priority::Low),
    ];
    assert_eq!(headings("group by function task.priorityNumber / 2", &tasks), ["0", "2"]);
    assert_eq!(headings("group by function task.priorityNumber < 2", &tasks), ["false", "true"]);
}

// =============================================================================
// Queries combining instructions
// =============================================================================

#[test]
fn nested_groups_with_sorting_and_filtering() {
    let tasks = vec![
        Task::new("b work").with_tags(["#work"]).with_due(day(12)),
        Task::new("a work").with_tags(["#work"]).with_due(day(9)),
        Task::new("done").with_tags(["#work"]).with_status(Status::done()),
        Task::new("home").with_tags(["#home"]),
    ];
    let cache = ExpressionCache::new();
    let query = Query::parse(
        "filter by function !task.isDone\n\
         sort by function task.due\n\
         group by function task.tags\n\
         group by function task.due.category.name",
        &cache,
        UngroupedPlacement::First,
    )
    .unwrap();
    let result = query.execute(&tasks, &EvaluationContext::new(now()));

    let work = &result.groups[1];
    assert_eq!(work.display_text(), "#work");
    let sub: Vec<&str> = work.subgroups.iter().map(|g| g.display_text()).collect();
    assert_eq!(sub, ["Future", "Overdue"]);
    assert_eq!(work.subgroups[1].tasks[0].description, "a work");
    assert_eq!(result.task_count(), 3);
}

#[test]
fn invalid_instruction_leaves_others_working() {
    let tasks = [Task::new("t").with_due(day(12))];
    let cache = ExpressionCache::new();

    let err = cache.get_or_compile("task.due.format((").unwrap_err();
    assert_eq!(err.instruction, "task.due.format((");

    let good = cache.get_or_compile("task.due.formatAsDate()").unwrap();
    let query = Query {
        groups: vec![GroupInstruction::new(good)],
        ..Query::default()
    };
    let result = query.execute(&tasks, &EvaluationContext::new(now()));
    assert_eq!(result.groups[0].display_text(), "2023-06-12");
}

#[test]
fn runtime_errors_are_reported_per_task() {
    let tasks = vec![
        Task::new("ok").with_tags(["#a"]),
        Task::new("broken").with_id("t2").with_file(TasksFile::new("notes/x.md")),
    ];
    let cache = ExpressionCache::new();
    let query = Query::parse("group by function task.tags[0].slice(1)", &cache, UngroupedPlacement::First).unwrap();
    let result = query.execute(&tasks, &EvaluationContext::new(now()));

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].display_text(), "a");
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.task_id, "t2");
    assert_eq!(error.path, "notes/x.md");
    assert_eq!(error.instruction, "task.tags[0].slice(1)");
}

#[test]
fn grouped_result_serializes_to_json() {
    let tasks = vec![Task::new("a").with_tags(["#x"])];
    let cache = ExpressionCache::new();
    let query = Query::parse("group by function task.tags", &cache, UngroupedPlacement::First).unwrap();
    let result = query.execute(&tasks, &EvaluationContext::new(now()));
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["groups"][0]["heading"]["display_text"], "#x");
    assert_eq!(value["groups"][0]["tasks"][0]["description"], "a");
    assert_eq!(value["errors"], json!([]));
}

#[test]
fn compiled_expression_is_reused_across_tasks() {
    let expr = CompiledExpression::compile("task.description.toUpperCase()").unwrap();
    let ctx = EvaluationContext::new(now());
    let a = Task::new("a");
    let b = Task::new("b");
    assert_eq!(expr.evaluate(&a, &ctx).unwrap().to_js_string(), "A");
    assert_eq!(expr.evaluate(&b, &ctx).unwrap().to_js_string(), "B");
}
