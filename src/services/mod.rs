//! 业务能力层
//!
//! 描述"我能做什么"：分类、分发处理、重试、缓存、排序、进度、门户访问、文档填写。

pub mod cache;
pub mod classifier;
pub mod documents;
pub mod handlers;
pub mod portal;
pub mod prioritizer;
pub mod progress;
pub mod retry;

pub use cache::DiskCache;
pub use classifier::{classify, Rule, RULES};
pub use documents::DocumentFiller;
pub use handlers::{AssignmentHandler, HandlerRegistry};
pub use portal::{CanvasPortal, Portal};
pub use prioritizer::Prioritizer;
pub use progress::{ProgressStep, ProgressTracker};
pub use retry::{with_retry, with_retry_sleeping, RetryPolicy};
