//! Task priority

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Priority of a task, from highest to lowest
///
/// `None` is the priority of a task without a priority marker; expressions
/// see it as `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Highest,
    High,
    Medium,
    #[default]
    None,
    Low,
    Lowest,
}

impl Priority {
    /// Returns the priority number: 0 for highest, 5 for lowest
    pub fn number(&self) -> u8 {
        match self {
            Priority::Highest => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::None => 3,
            Priority::Low => 4,
            Priority::Lowest => 5,
        }
    }

    /// Returns the name exposed as `task.priorityName`
    pub fn name(&self) -> &'static str {
        match self {
            Priority::Highest => "Highest",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::None => "Normal",
            Priority::Low => "Low",
            Priority::Lowest => "Lowest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "highest" | "0" => Ok(Priority::Highest),
            "high" | "1" => Ok(Priority::High),
            "medium" | "2" => Ok(Priority::Medium),
            "none" | "normal" | "" | "3" => Ok(Priority::None),
            "low" | "4" => Ok(Priority::Low),
            "lowest" | "5" => Ok(Priority::Lowest),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}
