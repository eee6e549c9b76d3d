pub mod assignment;
pub mod completion;
pub mod task;

pub use assignment::{AssignmentCategory, AssignmentRecord};
pub use completion::{CompletionResult, CompletionStatus, DocumentOutcome};
pub use task::{TaskEntry, TaskStatus};
