use std::io::Write;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{finish, AssignmentHandler};
use crate::error::{AppError, AppResult};
use crate::models::{AssignmentCategory, AssignmentRecord, CompletionResult};
use crate::workflow::SessionContext;

const FILE_INPUT: &str = "input[type=\"file\"]";

/// 生成内容写入临时文件后上传
pub struct FileUploadHandler;

impl FileUploadHandler {
    /// 写入临时文件（阻塞 I/O 放到阻塞线程池），文件随返回值 drop 删除
    async fn write_temp_file(record_id: &str, content: String) -> AppResult<NamedTempFile> {
        let prefix = format!("assignment_{}_", sanitize(record_id));

        tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".txt")
                .tempfile()?;
            file.write_all(content.as_bytes())?;
            file.as_file().sync_all()?;
            Ok(file)
        })
        .await
        .map_err(|e| AppError::Submission(format!("临时文件写入任务异常: {}", e)))?
        .map_err(|e| AppError::io(std::env::temp_dir().display().to_string(), e))
    }

    async fn run(&self, record: &AssignmentRecord, ctx: &SessionContext) -> AppResult<String> {
        let prompt = format!("File upload assignment: {}", record.description);
        let content = ctx.generate(&prompt).await?;

        let file = Self::write_temp_file(&record.id, content).await?;
        debug!("[作业 {}] 临时文件: {}", record.id, file.path().display());

        let upload = ctx.page.set_input_files(FILE_INPUT, file.path()).await;

        if let Err(e) = file.close() {
            warn!("[作业 {}] ⚠️ 删除临时文件失败: {}", record.id, e);
        }

        upload.map_err(|e| AppError::fill(FILE_INPUT, e))?;
        Ok("file uploaded".to_string())
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[async_trait]
impl AssignmentHandler for FileUploadHandler {
    fn category(&self) -> AssignmentCategory {
        AssignmentCategory::FileUpload
    }

    async fn complete(&self, record: &AssignmentRecord, ctx: &SessionContext) -> CompletionResult {
        let outcome = self.run(record, ctx).await;
        finish(AssignmentCategory::FileUpload, record, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::CompletionStatus;
    use crate::testing::{FakeElement, FakePage, PageAction, ScriptedModel};
    use std::sync::Arc;

    fn ctx(page: &FakePage) -> SessionContext {
        SessionContext::new(
            Arc::new(Config::default()),
            Arc::new(page.clone()),
            Arc::new(ScriptedModel::new("uploaded body")),
        )
        .with_cache(None)
    }

    fn record() -> AssignmentRecord {
        AssignmentRecord {
            id: "up/1".into(),
            description: "Upload a summary".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upload_sets_file_and_removes_it() {
        let page = FakePage::new().with_element(FILE_INPUT, FakeElement::new("file", ""));

        let result = FileUploadHandler.complete(&record(), &ctx(&page)).await;

        assert_eq!(result.status, CompletionStatus::Completed);
        let uploaded = page.writes().into_iter().find_map(|action| match action {
            PageAction::SetInputFiles { path, .. } => Some(path),
            _ => None,
        });
        let uploaded = uploaded.unwrap();
        assert!(uploaded.contains("assignment_up_1_"));
        assert!(uploaded.ends_with(".txt"));
        assert!(!std::path::Path::new(&uploaded).exists());
    }

    #[tokio::test]
    async fn test_temp_files_for_same_record_do_not_collide() {
        let first = FileUploadHandler::write_temp_file("up/1", "a".into()).await.unwrap();
        let second = FileUploadHandler::write_temp_file("up/1", "b".into()).await.unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read_to_string(first.path()).unwrap(), "a");
        assert_eq!(std::fs::read_to_string(second.path()).unwrap(), "b");

        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_file_input_fails() {
        let page = FakePage::new();
        let result = FileUploadHandler.complete(&record(), &ctx(&page)).await;
        assert_eq!(result.status, CompletionStatus::Failed);
    }
}
