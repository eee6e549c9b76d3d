//! 进度跟踪
//!
//! 有序的步骤列表，可以整体保存为一个 JSON 数组。

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{AppError, AppResult};
use crate::models::TaskStatus;

/// 一个步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStep {
    pub name: String,
    pub total_steps: u32,
    pub completed_steps: u32,
    pub status: TaskStatus,
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    steps: Vec<ProgressStep>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    /// 添加步骤，返回其索引
    pub fn add_step(&mut self, name: impl Into<String>, total_steps: u32) -> usize {
        self.steps.push(ProgressStep {
            name: name.into(),
            total_steps,
            completed_steps: 0,
            status: TaskStatus::Pending,
        });
        self.steps.len() - 1
    }

    /// 更新步骤完成数，索引越界时忽略
    pub fn update_step(&mut self, index: usize, completed_steps: u32) {
        if let Some(step) = self.steps.get_mut(index) {
            step.completed_steps = completed_steps.min(step.total_steps);
            step.status = if completed_steps >= step.total_steps {
                TaskStatus::Completed
            } else {
                TaskStatus::InProgress
            };
        }
    }

    pub fn complete_step(&mut self, index: usize) {
        if let Some(total) = self.steps.get(index).map(|s| s.total_steps) {
            self.update_step(index, total);
        }
    }

    /// 总体进度，范围 [0, 1]
    pub fn overall_progress(&self) -> f64 {
        let total: u32 = self.steps.iter().map(|s| s.total_steps).sum();
        if total == 0 {
            return 0.0;
        }
        let completed: u32 = self.steps.iter().map(|s| s.completed_steps).sum();
        completed as f64 / total as f64
    }

    /// 第一个待处理的步骤
    pub fn next_pending(&self) -> Option<&ProgressStep> {
        self.steps.iter().find(|s| s.status == TaskStatus::Pending)
    }

    pub async fn save(&self, path: &Path) -> AppResult<()> {
        let body = serde_json::to_string_pretty(&self.steps)?;
        fs::write(path, body)
            .await
            .map_err(|e| AppError::io(path.display().to_string(), e))
    }

    /// 从文件加载，文件不存在时返回空的跟踪器
    pub async fn load(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Self {
                steps: serde_json::from_str(&content)?,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(AppError::io(path.display().to_string(), e)),
        }
    }
}
