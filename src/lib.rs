//! # Coursework Pilot
//!
//! 登录学习门户，找到作业，判断作业类型，用 LLM 生成答案并填入页面的自动化程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（页面、LLM 客户端），只暴露能力
//! - `PageDriver` / `PageElement` - 浏览器自动化能力，`CdpPage` 为 chromiumoxide 实现
//! - `LanguageModel` - 文本生成能力，`OpenAiModel` 为 async-openai 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `classify` - 关键词规则分类
//! - `HandlerRegistry` - 作业类型到处理例程的分发表
//! - `with_retry` - 重试包装器
//! - `Portal` / `CanvasPortal` - 门户步骤
//! - `DocumentFiller` - 链接文档的并发复制和填写
//! - `DiskCache` / `Prioritizer` / `ProgressTracker` - 工具
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份作业"的完整处理流程
//! - `SessionContext` - 显式传递的会话上下文
//! - `SessionDriver` - 状态机 + 单次恢复
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/App` - 初始化资源、运行流程、记录进度、输出统计

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

/// 测试替身，集成测试通过 `testing` feature 使用
#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AssignmentCategory, AssignmentRecord, CompletionResult, CompletionStatus};
pub use orchestrator::App;
pub use services::{classify, with_retry, HandlerRegistry, RetryPolicy};
pub use workflow::{RunReport, SessionContext, SessionDriver, SessionState};
