//! Output formatting for CLI commands

use serde::Serialize;

use crate::query::{Group, GroupedTasks};
use crate::storage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a warning to stderr
    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Warning: {}", message),
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({ "warning": message }));
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        let rendered = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        if let Ok(json) = rendered {
            println!("{}", json);
        }
    }

    /// Prints a grouping result: JSON as is, text as markdown headings
    /// with task lines underneath. Per-task failures go to stderr.
    pub fn grouped(&self, result: &GroupedTasks<'_>) {
        if self.is_json() {
            self.data(result);
            return;
        }

        let mut text = String::new();
        for group in &result.groups {
            render_group(group, 0, &mut text);
        }
        print!("{}", text);
        for error in &result.errors {
            self.warning(&error.to_string());
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}

/// Headings start at `####` and go one level deeper per grouping level
fn render_group(group: &Group<'_>, depth: usize, out: &mut String) {
    if let Some(heading) = &group.heading {
        let level = (4 + depth).min(6);
        out.push_str(&format!("{} {}\n", "#".repeat(level), heading.display_text.trim()));
    }
    for task in &group.tasks {
        out.push_str(&task.original_markdown);
        out.push('\n');
    }
    for subgroup in &group.subgroups {
        render_group(subgroup, depth + 1, out);
    }
    if depth == 0 {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use crate::query::Heading;

    #[test]
    fn renders_nested_groups_as_headings() {
        let a = Task::new("a");
        let b = Task::new("b");
        let group = Group {
            heading: Some(Heading::new("%%1%% Work")),
            tasks: Vec::new(),
            subgroups: vec![
                Group {
                    heading: None,
                    tasks: vec![&a],
                    subgroups: Vec::new(),
                },
                Group {
                    heading: Some(Heading::new("High")),
                    tasks: vec![&b],
                    subgroups: Vec::new(),
                },
            ],
        };
        let mut out = String::new();
        render_group(&group, 0, &mut out);
        assert_eq!(out, "#### Work\n- [ ] a\n##### High\n- [ ] b\n\n");
    }
}
