//! Task statuses and the configurable status cycle
//!
//! A task only stores the symbol between the checkbox brackets (`[ ]`, `[x]`,
//! ...). Everything else about a status - its name, its type and the symbol it
//! moves to when toggled - comes from a [`StatusRegistry`], which starts from
//! the built-in set and can be extended or overridden through configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Broad category of a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    #[default]
    Todo,
    InProgress,
    Done,
    Cancelled,
    NonTask,
    Empty,
}

impl StatusType {
    /// Returns the name exposed to expressions (`TODO`, `IN_PROGRESS`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusType::Todo => "TODO",
            StatusType::InProgress => "IN_PROGRESS",
            StatusType::Done => "DONE",
            StatusType::Cancelled => "CANCELLED",
            StatusType::NonTask => "NON_TASK",
            StatusType::Empty => "EMPTY",
        }
    }

    /// Sort position used by `status.typeGroupText`
    ///
    /// Active work first, finished work after, non-tasks last.
    pub fn sort_order(&self) -> u8 {
        match self {
            StatusType::InProgress => 1,
            StatusType::Todo => 2,
            StatusType::Done => 3,
            StatusType::Cancelled => 4,
            StatusType::NonTask => 5,
            StatusType::Empty => 6,
        }
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "TODO" => Ok(StatusType::Todo),
            "IN_PROGRESS" | "INPROGRESS" => Ok(StatusType::InProgress),
            "DONE" => Ok(StatusType::Done),
            "CANCELLED" | "CANCELED" => Ok(StatusType::Cancelled),
            "NON_TASK" | "NONTASK" => Ok(StatusType::NonTask),
            "EMPTY" => Ok(StatusType::Empty),
            _ => Err(format!("Unknown status type: {}", s)),
        }
    }
}

/// A fully resolved status, as attached to a [`Task`](super::Task)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Character between the checkbox brackets
    pub symbol: String,

    /// Human-readable name
    pub name: String,

    /// Symbol the task cycles to when toggled
    pub next_symbol: String,

    /// Category of the status
    #[serde(rename = "type")]
    pub status_type: StatusType,
}

impl Status {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        next_symbol: impl Into<String>,
        status_type: StatusType,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            next_symbol: next_symbol.into(),
            status_type,
        }
    }

    pub fn todo() -> Self {
        Self::new(" ", "Todo", "x", StatusType::Todo)
    }

    pub fn done() -> Self {
        Self::new("x", "Done", " ", StatusType::Done)
    }

    pub fn in_progress() -> Self {
        Self::new("/", "In Progress", "x", StatusType::InProgress)
    }

    pub fn cancelled() -> Self {
        Self::new("-", "Cancelled", " ", StatusType::Cancelled)
    }

    /// Status for a symbol nobody configured
    pub fn unknown(symbol: impl Into<String>) -> Self {
        Self::new(symbol, "Unknown", "x", StatusType::Todo)
    }

    /// Returns true if a task with this status needs no further action
    pub fn is_completed(&self) -> bool {
        matches!(
            self.status_type,
            StatusType::Done | StatusType::Cancelled | StatusType::NonTask
        )
    }

    /// Heading text that orders statuses by type, e.g. `%%2%%TODO`
    pub fn type_group_text(&self) -> String {
        format!(
            "%%{}%%{}",
            self.status_type.sort_order(),
            self.status_type.as_str()
        )
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::todo()
    }
}

/// The set of known statuses, keyed by symbol
///
/// Lookups for an unregistered symbol never fail; they yield
/// [`Status::unknown`] so every task always has a status.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRegistry {
    statuses: Vec<Status>,
}

impl StatusRegistry {
    /// Creates a registry with only the built-in statuses
    pub fn new() -> Self {
        Self {
            statuses: vec![
                Status::todo(),
                Status::done(),
                Status::in_progress(),
                Status::cancelled(),
            ],
        }
    }

    /// Creates a registry from the built-in statuses plus custom entries
    ///
    /// A custom entry with an existing symbol replaces the built-in one.
    pub fn with_custom(custom: impl IntoIterator<Item = Status>) -> Self {
        let mut registry = Self::new();
        for status in custom {
            registry.register(status);
        }
        registry
    }

    /// Adds or replaces the status for `status.symbol`
    pub fn register(&mut self, status: Status) {
        match self.statuses.iter_mut().find(|s| s.symbol == status.symbol) {
            Some(existing) => *existing = status,
            None => self.statuses.push(status),
        }
    }

    /// Looks up a status by symbol, falling back to [`Status::unknown`]
    pub fn by_symbol(&self, symbol: &str) -> Status {
        self.get(symbol)
            .cloned()
            .unwrap_or_else(|| Status::unknown(symbol))
    }

    /// Looks up a registered status by symbol
    pub fn get(&self, symbol: &str) -> Option<&Status> {
        self.statuses.iter().find(|s| s.symbol == symbol)
    }

    /// Returns the status a task moves to when toggled
    pub fn next(&self, status: &Status) -> Status {
        self.by_symbol(&status.next_symbol)
    }

    /// Iterates over all registered statuses in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Status> {
        self.statuses.iter()
    }

    /// Returns the number of registered statuses
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns true if no status is registered
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}
