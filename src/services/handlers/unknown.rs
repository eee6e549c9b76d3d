use async_trait::async_trait;
use tracing::warn;

use super::AssignmentHandler;
use crate::models::{AssignmentCategory, AssignmentRecord, CompletionResult};
use crate::workflow::SessionContext;

pub const ABSTAIN_MESSAGE: &str = "Unable to determine assignment type. Please complete manually.";

/// 无法判断类型时弃权，不写入任何内容
pub struct UnknownHandler;

#[async_trait]
impl AssignmentHandler for UnknownHandler {
    fn category(&self) -> AssignmentCategory {
        AssignmentCategory::Unknown
    }

    async fn complete(&self, record: &AssignmentRecord, _ctx: &SessionContext) -> CompletionResult {
        warn!("[作业 {}] ⚠️ 无法判断作业类型，请手动完成", record.id);
        CompletionResult::abstained(AssignmentCategory::Unknown, ABSTAIN_MESSAGE)
    }
}
