//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (初始化资源、运行、统计)
//!     ↓
//! workflow::SessionDriver (一份作业的完整流程 + 恢复)
//!     ↓
//! services (能力层：classifier / handlers / retry / portal / documents / cache)
//!     ↓
//! infrastructure (基础设施：PageDriver / LanguageModel)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层创建浏览器和 LLM 客户端
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计

pub mod app;

pub use app::App;
