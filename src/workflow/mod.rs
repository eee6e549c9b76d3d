//! 流程层
//!
//! `SessionContext` 是贯穿整个流程的显式上下文；`SessionDriver` 定义一份作业的完整流程。

pub mod session_ctx;
pub mod session_driver;

pub use session_ctx::SessionContext;
pub use session_driver::{RunReport, SessionDriver, SessionState};
