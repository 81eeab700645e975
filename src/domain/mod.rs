//! Domain models for taskfn
//!
//! Plain task data as handed over by the host: the task record, its status
//! and priority, and the file it lives in. No expression or I/O concerns.

mod file;
mod priority;
mod status;
mod task;
mod urgency;

pub use file::{CachedMetadata, Loc, Span, TagCache, TasksFile};
pub use priority::Priority;
pub use status::{Status, StatusRegistry, StatusType};
pub use task::{extract_tags, Recurrence, Task, TaskDates};
pub use urgency::urgency;
