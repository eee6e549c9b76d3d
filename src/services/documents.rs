//! 在线文档填写
//!
//! 作业中链接的每份文档：复制一份，读取模板内容，生成答案后写入副本。
//! 每份文档使用独立的页面句柄并发处理，结果按完成顺序返回。

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AssignmentCategory, AssignmentRecord, CompletionResult, DocumentOutcome};
use crate::workflow::SessionContext;

const GOOGLE_SIGNIN_URL: &str = "https://accounts.google.com/signin";
const EMAIL_INPUT: &str = "input[type=\"email\"]";
const PASSWORD_INPUT: &str = "input[type=\"password\"]";
/// 登录的"下一步"和复制对话框的"确定"是同一种按钮
const CONFIRM_BUTTON: &str = "button[jsname=\"LgbsSe\"]";
const TITLE_INPUT: &str = "input[name=\"title\"]";
const EDITOR: &str = "div[role='textbox']";

/// 文档填写器
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentFiller;

impl DocumentFiller {
    /// 要处理的文档：作业中的文档链接，没有时使用配置的文档
    pub fn targets(record: &AssignmentRecord, ctx: &SessionContext) -> Vec<String> {
        let links = record.document_links();
        if !links.is_empty() {
            return links;
        }
        ctx.config.provided_doc_url.iter().cloned().collect()
    }

    /// 并发处理全部文档，单个文档失败不影响其他文档
    pub async fn fill_all(
        &self,
        record: &AssignmentRecord,
        category: AssignmentCategory,
        ctx: &SessionContext,
    ) -> Vec<DocumentOutcome> {
        let targets = Self::targets(record, ctx);
        if targets.is_empty() {
            return Vec::new();
        }
        info!("[作业 {}] 📄 需要处理 {} 份文档", record.id, targets.len());

        if let Err(e) = Self::login_google(ctx).await {
            warn!("[作业 {}] ⚠️ 文档账号登录失败，继续尝试: {}", record.id, e);
        }

        let semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_documents.max(1)));
        let mut pending = FuturesUnordered::new();

        for source_url in targets {
            let semaphore = semaphore.clone();
            let ctx = ctx.clone();
            let record = record.clone();
            let url = source_url.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                Self::fill_one(&record, category, &url, &ctx).await
            });
            pending.push(async move { (source_url, handle.await) });
        }

        let mut outcomes = Vec::new();
        while let Some((source_url, joined)) = pending.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("[作业 {}] 文档任务异常: {}", record.id, e);
                    DocumentOutcome {
                        source_url,
                        copy_url: None,
                        result: CompletionResult::failed(category, e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|o| o.result.is_success()).count();
        info!(
            "[作业 {}] 📄 文档处理完成: 成功 {}/{}",
            record.id,
            succeeded,
            outcomes.len()
        );
        outcomes
    }

    /// 配置了账号时登录一次
    ///
    /// 在独立页面上登录，门户页面保持在作业页，登录状态由浏览器共享。
    async fn login_google(ctx: &SessionContext) -> AppResult<()> {
        let (Some(email), Some(password)) = (&ctx.config.google_email, &ctx.config.google_password)
        else {
            return Ok(());
        };

        info!("🔐 登录文档账号");
        let page = ctx.page.open_page(GOOGLE_SIGNIN_URL).await?;
        page.fill(EMAIL_INPUT, email).await?;
        page.click(CONFIRM_BUTTON).await?;
        page.wait_for(PASSWORD_INPUT, ctx.element_timeout())
            .await
            .map_err(|e| AppError::Login(e.to_string()))?;
        page.fill(PASSWORD_INPUT, password).await?;
        page.click(CONFIRM_BUTTON).await?;
        ctx.settle().await;
        Ok(())
    }

    async fn fill_one(
        record: &AssignmentRecord,
        category: AssignmentCategory,
        source_url: &str,
        ctx: &SessionContext,
    ) -> DocumentOutcome {
        let mut copy_url = None;
        let outcome = Self::copy_and_fill(record, source_url, ctx, &mut copy_url).await;

        let result = match outcome {
            Ok(()) => {
                info!("[作业 {}] ✓ 文档已填写: {}", record.id, source_url);
                CompletionResult::completed(category, "document filled")
            }
            Err(e) => {
                error!("[作业 {}] ❌ 文档处理失败 ({}): {}", record.id, source_url, e);
                CompletionResult::failed(category, e.to_string())
            }
        };

        DocumentOutcome {
            source_url: source_url.to_string(),
            copy_url,
            result,
        }
    }

    async fn copy_and_fill(
        record: &AssignmentRecord,
        source_url: &str,
        ctx: &SessionContext,
        copy_url: &mut Option<String>,
    ) -> AppResult<()> {
        let copy_page_url = format!("{}/copy", source_url.trim_end_matches('/'));
        let page = ctx.page.open_page(&copy_page_url).await?;
        let doc_ctx = ctx.with_page(page.clone());

        if let Some(title) = page.query(TITLE_INPUT).await? {
            title.fill(&format!("{} (completed)", record.title)).await?;
        }
        page.click(CONFIRM_BUTTON).await?;
        doc_ctx.settle().await;

        let editor = page
            .wait_for(EDITOR, doc_ctx.element_timeout())
            .await
            .map_err(|e| AppError::fill(EDITOR, e))?;
        *copy_url = Some(page.current_url().await?);

        let template = editor.text().await?;
        let prompt = format!(
            "Complete the following assignment document.\nAssignment: {}\nDocument:\n{}",
            record.description,
            template.trim()
        );
        let content = doc_ctx.generate(&prompt).await?;

        editor.click().await?;
        editor
            .fill(&content)
            .await
            .map_err(|e| AppError::fill(EDITOR, e))?;
        Ok(())
    }
}
