use serde::{Deserialize, Serialize};

use crate::models::AssignmentCategory;

/// 处理结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// 已生成并写入
    Completed,
    /// 处理过程中出错
    Failed,
    /// 已完成且不允许重新完成
    Skipped,
    /// 无法判断类型，需手动完成
    Abstained,
}

/// 单个处理例程的返回值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub category: AssignmentCategory,
    pub status: CompletionStatus,
    pub message: String,
}

impl CompletionResult {
    pub fn completed(category: AssignmentCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: CompletionStatus::Completed,
            message: message.into(),
        }
    }

    pub fn failed(category: AssignmentCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: CompletionStatus::Failed,
            message: message.into(),
        }
    }

    pub fn skipped(category: AssignmentCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: CompletionStatus::Skipped,
            message: message.into(),
        }
    }

    pub fn abstained(category: AssignmentCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: CompletionStatus::Abstained,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CompletionStatus::Completed
    }
}

/// 单个在线文档的处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub source_url: String,
    /// 副本地址，复制失败时为空
    pub copy_url: Option<String>,
    pub result: CompletionResult,
}
