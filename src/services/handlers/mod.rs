//! 作业处理例程与分发表
//!
//! 每种作业类型对应一个 `AssignmentHandler`，由 `HandlerRegistry` 按类型查表分发。
//! 处理例程从不向上返回错误：失败会被转换为 `CompletionStatus::Failed`。

mod file_upload;
mod quiz;
mod text_entry;
mod unknown;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::models::{AssignmentCategory, AssignmentRecord, CompletionResult};
use crate::workflow::SessionContext;

pub use file_upload::FileUploadHandler;
pub use quiz::{pick_best_option, AnswerShape, QuizHandler};
pub use text_entry::{TextEntryHandler, TextEntryProfile, SUBMIT_BUTTON};
pub use unknown::{UnknownHandler, ABSTAIN_MESSAGE};

/// 单一作业类型的处理例程
#[async_trait]
pub trait AssignmentHandler: Send + Sync {
    fn category(&self) -> AssignmentCategory;

    /// 处理例程自己是否已经点击了提交/发布
    fn submits_on_completion(&self) -> bool {
        false
    }

    async fn complete(&self, record: &AssignmentRecord, ctx: &SessionContext) -> CompletionResult;
}

/// 把内部步骤的结果转换为处理结果
pub(crate) fn finish(
    category: AssignmentCategory,
    record: &AssignmentRecord,
    outcome: AppResult<String>,
) -> CompletionResult {
    match outcome {
        Ok(message) => {
            info!("[作业 {}] ✓ {} 处理完成: {}", record.id, category, message);
            CompletionResult::completed(category, message)
        }
        Err(e) => {
            error!("[作业 {}] ❌ {} 处理失败: {}", record.id, category, e);
            CompletionResult::failed(category, e.to_string())
        }
    }
}

/// 作业类型到处理例程的分发表
pub struct HandlerRegistry {
    handlers: HashMap<AssignmentCategory, Arc<dyn AssignmentHandler>>,
    fallback: Arc<dyn AssignmentHandler>,
}

impl HandlerRegistry {
    /// 空表，所有类型都落到弃权例程
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(UnknownHandler),
        }
    }

    /// 注册全部内置例程
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(QuizHandler));
        registry.register(Arc::new(FileUploadHandler));
        registry.register(Arc::new(UnknownHandler));
        for handler in TextEntryHandler::all() {
            registry.register(Arc::new(handler));
        }
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn AssignmentHandler>) {
        self.handlers.insert(handler.category(), handler);
    }

    /// 查找处理例程，未注册的类型返回弃权例程
    pub fn handler_for(&self, category: AssignmentCategory) -> Arc<dyn AssignmentHandler> {
        self.handlers
            .get(&category)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// 分发到对应例程
    ///
    /// 已完成的作业在没有 `allow_recompletion` 时直接跳过；
    /// 未启用的类型交给弃权例程。
    pub async fn handle(
        &self,
        category: AssignmentCategory,
        record: &AssignmentRecord,
        ctx: &SessionContext,
    ) -> CompletionResult {
        if record.completed && !ctx.config.allow_recompletion {
            info!("[作业 {}] ⏭️ 作业已完成，跳过", record.id);
            return CompletionResult::skipped(category, "Assignment already completed");
        }

        let handler = if ctx.config.is_enabled(category) {
            self.handler_for(category)
        } else {
            warn!("[作业 {}] ⚠️ 类型 {} 未启用", record.id, category);
            self.handler_for(AssignmentCategory::Unknown)
        };

        info!("[作业 {}] 🚀 开始处理 ({})", record.id, handler.category());
        handler.complete(record, ctx).await
    }
}
