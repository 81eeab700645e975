//! Nested grouping of tasks by expression headings

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Task;
use crate::scripting::{CompiledExpression, EvaluationContext, EvaluationError};

use super::heading::{render, Heading};

/// Where tasks without a heading go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UngroupedPlacement {
    /// Before all headed groups
    #[default]
    First,
    /// After all headed groups
    Last,
    /// Dropped from the output
    Omit,
}

impl UngroupedPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            UngroupedPlacement::First => "first",
            UngroupedPlacement::Last => "last",
            UngroupedPlacement::Omit => "omit",
        }
    }
}

impl fmt::Display for UngroupedPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UngroupedPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(UngroupedPlacement::First),
            "last" => Ok(UngroupedPlacement::Last),
            "omit" => Ok(UngroupedPlacement::Omit),
            other => Err(format!(
                "unknown ungrouped placement '{}' (expected first, last or omit)",
                other
            )),
        }
    }
}

/// One `group by function` level
#[derive(Debug, Clone)]
pub struct GroupInstruction {
    pub expression: Arc<CompiledExpression>,
    pub reverse: bool,
    pub ungrouped: UngroupedPlacement,
}

impl GroupInstruction {
    pub fn new(expression: Arc<CompiledExpression>) -> Self {
        Self {
            expression,
            reverse: false,
            ungrouped: UngroupedPlacement::default(),
        }
    }

    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn with_ungrouped(mut self, ungrouped: UngroupedPlacement) -> Self {
        self.ungrouped = ungrouped;
        self
    }
}

/// A bucket of tasks under one heading
///
/// Leaf groups hold tasks; groups above the last level hold subgroups.
#[derive(Debug, Clone, Serialize)]
pub struct Group<'t> {
    /// `None` for the ungrouped bucket
    pub heading: Option<Heading>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<&'t Task>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subgroups: Vec<Group<'t>>,
}

impl<'t> Group<'t> {
    /// Every task under this group, in order, once per leaf it appears in
    pub fn all_tasks(&self) -> Vec<&'t Task> {
        let mut tasks = self.tasks.clone();
        for subgroup in &self.subgroups {
            tasks.extend(subgroup.all_tasks());
        }
        tasks
    }

    pub fn display_text(&self) -> &str {
        self.heading.as_ref().map_or("", |h| h.display_text.as_str())
    }
}

/// Groups `tasks` by each level in turn.
///
/// With no levels, everything lands in one ungrouped group. Tasks whose
/// evaluation fails at a level are left out of that level and reported
/// once, even when the task sits in several buckets of the level above.
pub fn group<'t>(
    tasks: &[&'t Task],
    levels: &[GroupInstruction],
    context: &EvaluationContext,
    errors: &mut Vec<EvaluationError>,
) -> Vec<Group<'t>> {
    let mut grouper = Grouper {
        tasks,
        levels,
        context,
        errors,
        memo: vec![vec![None; tasks.len()]; levels.len()],
    };
    let all: Vec<usize> = (0..tasks.len()).collect();
    grouper.level(&all, 0)
}

struct Grouper<'g, 't> {
    tasks: &'g [&'t Task],
    levels: &'g [GroupInstruction],
    context: &'g EvaluationContext,
    errors: &'g mut Vec<EvaluationError>,
    /// `memo[depth][task]`, filled on first use; the inner `None` marks a failure
    memo: Vec<Vec<Option<Option<Vec<Heading>>>>>,
}

impl<'t> Grouper<'_, 't> {
    fn headings(&mut self, depth: usize, index: usize) -> Option<Vec<Heading>> {
        if self.memo[depth][index].is_none() {
            let (levels, task) = (self.levels, self.tasks[index]);
            let evaluated = match levels[depth].expression.evaluate(task, self.context) {
                Ok(value) => Some(render(&value)),
                Err(error) => {
                    self.errors.push(error);
                    None
                }
            };
            self.memo[depth][index] = Some(evaluated);
        }
        self.memo[depth][index].clone().flatten()
    }

    fn level(&mut self, indices: &[usize], depth: usize) -> Vec<Group<'t>> {
        let Some(level) = self.levels.get(depth) else {
            return vec![Group {
                heading: None,
                tasks: indices.iter().map(|&i| self.tasks[i]).collect(),
                subgroups: Vec::new(),
            }];
        };

        let mut ungrouped: Vec<usize> = Vec::new();
        let mut headed: BTreeMap<String, (Heading, Vec<usize>)> = BTreeMap::new();

        for &index in indices {
            let Some(headings) = self.headings(depth, index) else {
                continue;
            };
            if headings.is_empty() {
                ungrouped.push(index);
            }
            for heading in headings {
                headed
                    .entry(heading.sort_key.clone())
                    .or_insert_with(|| (heading, Vec::new()))
                    .1
                    .push(index);
            }
        }

        debug!(
            instruction = level.expression.text(),
            groups = headed.len(),
            ungrouped = ungrouped.len(),
            "grouped level"
        );

        let mut buckets: Vec<(Option<Heading>, Vec<usize>)> = headed
            .into_values()
            .map(|(heading, members)| (Some(heading), members))
            .collect();
        if level.reverse {
            buckets.reverse();
        }
        if !ungrouped.is_empty() {
            match level.ungrouped {
                UngroupedPlacement::First => buckets.insert(0, (None, ungrouped)),
                UngroupedPlacement::Last => buckets.push((None, ungrouped)),
                UngroupedPlacement::Omit => {}
            }
        }

        let innermost = depth + 1 == self.levels.len();
        let mut groups = Vec::with_capacity(buckets.len());
        for (heading, members) in buckets {
            if innermost {
                groups.push(Group {
                    heading,
                    tasks: members.iter().map(|&i| self.tasks[i]).collect(),
                    subgroups: Vec::new(),
                });
                continue;
            }
            let subgroups = self.level(&members, depth + 1);
            // Every task in the bucket may have failed below.
            if !subgroups.is_empty() {
                groups.push(Group {
                    heading,
                    tasks: Vec::new(),
                    subgroups,
                });
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 10)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn level(text: &str) -> GroupInstruction {
        GroupInstruction::new(Arc::new(CompiledExpression::compile(text).unwrap()))
    }

    fn titles(groups: &[Group<'_>]) -> Vec<String> {
        groups
            .iter()
            .map(|g| g.heading.as_ref().map_or("<none>".to_string(), |h| h.display_text.clone()))
            .collect()
    }

    fn descriptions(group: &Group<'_>) -> Vec<String> {
        group.tasks.iter().map(|t| t.description.clone()).collect()
    }

    #[test]
    fn no_levels_is_one_ungrouped_group() {
        let tasks = [Task::new("a"), Task::new("b")];
        let refs: Vec<&Task> = tasks.iter().collect();
        let groups = group(&refs, &[], &EvaluationContext::new(now()), &mut Vec::new());
        assert_eq!(groups.len(), 1);
        assert!(groups[0].heading.is_none());
        assert_eq!(groups[0].tasks.len(), 2);
    }

    #[test]
    fn groups_sort_by_key_and_keep_task_order() {
        let tasks = [
            Task::new("b1").with_tags(["#b"]),
            Task::new("a1").with_tags(["#a"]),
            Task::new("b2").with_tags(["#b"]),
            Task::new("none"),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();
        let groups = group(&refs, &[level("task.tags")], &EvaluationContext::new(now()), &mut Vec::new());
        assert_eq!(titles(&groups), ["<none>", "#a", "#b"]);
        assert_eq!(descriptions(&groups[2]), ["b1", "b2"]);
    }

    #[test]
    fn ungrouped_placement_and_reverse() {
        let tasks = [Task::new("x").with_tags(["#a"]), Task::new("y").with_tags(["#b"]), Task::new("z")];
        let refs: Vec<&Task> = tasks.iter().collect();
        let ctx = EvaluationContext::new(now());

        let last = level("task.tags").with_ungrouped(UngroupedPlacement::Last).reversed(true);
        assert_eq!(titles(&group(&refs, &[last], &ctx, &mut Vec::new())), ["#b", "#a", "<none>"]);

        let omit = level("task.tags").with_ungrouped(UngroupedPlacement::Omit);
        assert_eq!(titles(&group(&refs, &[omit], &ctx, &mut Vec::new())), ["#a", "#b"]);
    }

    #[test]
    fn multi_valued_results_place_task_in_each_group() {
        let tasks = [Task::new("both").with_tags(["#a", "#b", "#a"])];
        let refs: Vec<&Task> = tasks.iter().collect();
        let groups = group(&refs, &[level("task.tags")], &EvaluationContext::new(now()), &mut Vec::new());
        assert_eq!(titles(&groups), ["#a", "#b"]);
        assert!(groups.iter().all(|g| g.tasks.len() == 1));
    }

    #[test]
    fn nested_levels_subdivide() {
        let tasks = [
            Task::new("a").with_tags(["#work"]).with_priority(crate::domain::Priority::High),
            Task::new("b").with_tags(["#work"]),
            Task::new("c").with_tags(["#home"]),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();
        let groups = group(
            &refs,
            &[level("task.tags"), level("task.priorityName")],
            &EvaluationContext::new(now()),
            &mut Vec::new(),
        );
        assert_eq!(titles(&groups), ["#home", "#work"]);
        assert_eq!(titles(&groups[1].subgroups), ["High", "Normal"]);
        assert!(groups[1].tasks.is_empty());
        assert_eq!(groups[1].all_tasks().len(), 2);
    }

    #[test]
    fn failing_tasks_are_reported_and_excluded() {
        let tasks = [Task::new("ok").with_tags(["#a"]), Task::new("bad")];
        let refs: Vec<&Task> = tasks.iter().collect();
        let mut errors = Vec::new();
        let groups = group(
            &refs,
            &[level("task.tags[0].toUpperCase()")],
            &EvaluationContext::new(now()),
            &mut errors,
        );
        assert_eq!(titles(&groups), ["#A"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].task, "bad");
    }

    #[test]
    fn fanned_out_task_fails_once_per_level() {
        let tasks = [Task::new("spread").with_tags(["#a", "#b", "#c"])];
        let refs: Vec<&Task> = tasks.iter().collect();
        let mut errors = Vec::new();
        let groups = group(
            &refs,
            &[level("task.tags"), level("task.tags[5].toUpperCase()")],
            &EvaluationContext::new(now()),
            &mut errors,
        );
        assert!(groups.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].task, "spread");
    }

    #[test]
    fn placement_parses_case_insensitively() {
        assert_eq!("LAST".parse::<UngroupedPlacement>(), Ok(UngroupedPlacement::Last));
        assert!("middle".parse::<UngroupedPlacement>().is_err());
    }
}
