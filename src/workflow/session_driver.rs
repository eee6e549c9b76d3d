//! 会话驱动器 - 流程层
//!
//! 定义"一份作业"的完整流程：
//! 登录 → 进入课程 → 进入作业 → 提取 → 分类 → 处理 → （可选）提交。
//!
//! 正常步骤都包在重试里。重试耗尽后进入恢复：页面显示已登出时先重新登录，
//! 再重新进入课程和作业并重新提取，然后从分类开始继续。
//! 每次运行只恢复一次，恢复失败或恢复后再次失败都会终止运行。

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AssignmentCategory, AssignmentRecord, CompletionResult, DocumentOutcome};
use crate::services::{classify, with_retry, DocumentFiller, HandlerRegistry, Portal, RetryPolicy};
use crate::workflow::SessionContext;

/// 流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotLoggedIn,
    LoggedIn,
    OnCourse,
    OnAssignment,
    Classified,
    Completed,
    Submitted,
    Recovering,
}

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub record: AssignmentRecord,
    pub category: AssignmentCategory,
    pub result: CompletionResult,
    pub documents: Vec<DocumentOutcome>,
    pub final_state: SessionState,
    /// 本次运行是否经历过恢复
    pub recovered: bool,
}

/// 会话驱动器
pub struct SessionDriver {
    ctx: SessionContext,
    portal: Arc<dyn Portal>,
    registry: HandlerRegistry,
    documents: DocumentFiller,
    policy: RetryPolicy,
    state: SessionState,
}

impl SessionDriver {
    pub fn new(ctx: SessionContext, portal: Arc<dyn Portal>, registry: HandlerRegistry) -> Self {
        let policy = RetryPolicy::from_config(&ctx.config);
        Self {
            ctx,
            portal,
            registry,
            documents: DocumentFiller,
            policy,
            state: SessionState::NotLoggedIn,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!("状态: {:?} → {:?}", self.state, next);
        self.state = next;
    }

    /// 执行完整流程
    ///
    /// 只有恢复失败时返回错误（`AppError::Recovery`）。
    pub async fn run(&mut self) -> AppResult<RunReport> {
        let mut recovered_from: Option<String> = None;

        let mut record = match self.reach_assignment().await {
            Ok(record) => record,
            Err(e) => {
                let record = self.recover(&e).await?;
                recovered_from = Some(e.to_string());
                record
            }
        };

        loop {
            match self.complete_and_submit(&record).await {
                Ok(mut report) => {
                    report.recovered = recovered_from.is_some();
                    return Ok(report);
                }
                Err(e) => match recovered_from {
                    Some(original) => {
                        error!("❌ 恢复后再次失败，终止运行: {}", e);
                        return Err(AppError::Recovery {
                            original,
                            cause: e.to_string(),
                        });
                    }
                    None => {
                        record = self.recover(&e).await?;
                        recovered_from = Some(e.to_string());
                    }
                },
            }
        }
    }

    /// 登录并进入作业页，返回提取到的作业
    async fn reach_assignment(&mut self) -> AppResult<AssignmentRecord> {
        let portal = self.portal.clone();
        let policy = self.policy;

        with_retry(&policy, "登录", || portal.login()).await?;
        self.transition(SessionState::LoggedIn);

        with_retry(&policy, "进入课程", || portal.open_course()).await?;
        self.transition(SessionState::OnCourse);

        with_retry(&policy, "进入作业", || portal.open_assignment()).await?;
        self.transition(SessionState::OnAssignment);

        with_retry(&policy, "提取作业详情", || portal.extract_assignment()).await
    }

    /// 单次恢复，不重试
    async fn recover(&mut self, failure: &AppError) -> AppResult<AssignmentRecord> {
        warn!("⚠️ 流程失败，开始恢复: {}", failure);
        self.transition(SessionState::Recovering);

        let attempt = async {
            if self.portal.is_logged_out().await? {
                info!("🔐 页面显示已登出，重新登录");
                self.portal.login().await?;
            }
            self.portal.open_course().await?;
            self.portal.open_assignment().await?;
            self.portal.extract_assignment().await
        };

        match attempt.await {
            Ok(record) => {
                info!("[作业 {}] ✓ 恢复成功", record.id);
                self.transition(SessionState::OnAssignment);
                Ok(record)
            }
            Err(cause) => {
                error!("❌ 恢复失败: {}", cause);
                Err(AppError::Recovery {
                    original: failure.to_string(),
                    cause: cause.to_string(),
                })
            }
        }
    }

    /// 从分类开始的后半段流程
    async fn complete_and_submit(&mut self, record: &AssignmentRecord) -> AppResult<RunReport> {
        let category = classify(&record.title, &record.description);
        self.transition(SessionState::Classified);
        info!("[作业 {}] 📋 类型: {} ({})", record.id, category, record.title);

        let result = self.registry.handle(category, record, &self.ctx).await;
        self.transition(SessionState::Completed);

        let documents = if result.is_success() {
            self.documents.fill_all(record, category, &self.ctx).await
        } else {
            Vec::new()
        };

        if self.ctx.config.submit_after_completion && result.is_success() {
            self.submit(record, category, &documents).await?;
        }

        Ok(RunReport {
            record: record.clone(),
            category,
            result,
            documents,
            final_state: self.state,
            recovered: false,
        })
    }

    async fn submit(
        &mut self,
        record: &AssignmentRecord,
        category: AssignmentCategory,
        documents: &[DocumentOutcome],
    ) -> AppResult<()> {
        let portal = self.portal.clone();
        let policy = self.policy;

        let copies: Vec<&str> = documents
            .iter()
            .filter(|d| d.result.is_success())
            .filter_map(|d| d.copy_url.as_deref())
            .collect();

        if !copies.is_empty() {
            // 按完成顺序提交
            for url in copies {
                with_retry(&policy, "提交文档", || portal.submit_document_url(url)).await?;
                info!("[作业 {}] 📤 已提交文档: {}", record.id, url);
            }
        } else if self.registry.handler_for(category).submits_on_completion() {
            debug!("[作业 {}] 处理例程已自行提交", record.id);
        } else {
            with_retry(&policy, "提交作业", || portal.submit_text()).await?;
            info!("[作业 {}] 📤 已提交", record.id);
        }

        self.transition(SessionState::Submitted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::CompletionStatus;
    use crate::testing::{FakeElement, FakePage, FakePortal, ScriptedModel};
    use std::time::Duration;

    fn writing_record() -> AssignmentRecord {
        AssignmentRecord {
            id: "11".into(),
            title: "Essay 1".into(),
            description: "Write an essay on tides".into(),
            ..Default::default()
        }
    }

    fn driver(portal: Arc<FakePortal>, config: Config) -> (SessionDriver, FakePage) {
        let page = FakePage::new()
            .with_element("textarea[name=\"submission[body]\"]", FakeElement::new("body", ""));
        let config = Config {
            settle_delay_ms: 0,
            ..config
        };
        let ctx = SessionContext::new(
            Arc::new(config),
            Arc::new(page.clone()),
            Arc::new(ScriptedModel::new("an essay")),
        )
        .with_cache(None);
        let driver = SessionDriver::new(ctx, portal, HandlerRegistry::standard())
            .with_retry_policy(RetryPolicy::fixed(2, Duration::from_millis(1)));
        (driver, page)
    }

    #[tokio::test]
    async fn test_happy_path_reaches_completed() {
        let portal = Arc::new(FakePortal::new(writing_record()));
        let (mut driver, _page) = driver(portal.clone(), Config::default());

        let report = driver.run().await.unwrap();

        assert_eq!(report.category, AssignmentCategory::Writing);
        assert_eq!(report.result.status, CompletionStatus::Completed);
        assert_eq!(report.final_state, SessionState::Completed);
        assert!(!report.recovered);
        assert_eq!(
            portal.calls(),
            vec!["login", "open_course", "open_assignment", "extract_assignment"]
        );
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_without_recovery() {
        let portal = Arc::new(FakePortal::new(writing_record()).fail("open_course", 1));
        let (mut driver, _page) = driver(portal.clone(), Config::default());

        let report = driver.run().await.unwrap();

        assert!(!report.recovered);
        assert_eq!(portal.count("open_course"), 2);
        assert_eq!(portal.count("is_logged_out"), 0);
    }

    #[tokio::test]
    async fn test_submit_after_completion() {
        let portal = Arc::new(FakePortal::new(writing_record()));
        let config = Config {
            submit_after_completion: true,
            ..Config::default()
        };
        let (mut driver, _page) = driver(portal.clone(), config);

        let report = driver.run().await.unwrap();

        assert_eq!(report.final_state, SessionState::Submitted);
        assert_eq!(portal.submitted(), vec!["text".to_string()]);
    }

    #[tokio::test]
    async fn test_submission_failure_recovers_once_then_aborts() {
        // 重试两次都失败 → 恢复；恢复后两次都失败 → 终止
        let portal = Arc::new(FakePortal::new(writing_record()).fail("submit_text", 4));
        let config = Config {
            submit_after_completion: true,
            ..Config::default()
        };
        let (mut driver, _page) = driver(portal.clone(), config);

        let err = driver.run().await.unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(portal.count("submit_text"), 4);
        assert_eq!(portal.count("is_logged_out"), 1);
        assert_eq!(portal.count("login"), 1);
    }

    #[tokio::test]
    async fn test_abstained_assignment_is_not_submitted() {
        let record = AssignmentRecord {
            id: "12".into(),
            title: "Week 2".into(),
            description: "Read chapter 2".into(),
            ..Default::default()
        };
        let portal = Arc::new(FakePortal::new(record));
        let config = Config {
            submit_after_completion: true,
            ..Config::default()
        };
        let (mut driver, page) = driver(portal.clone(), config);

        let report = driver.run().await.unwrap();

        assert_eq!(report.result.status, CompletionStatus::Abstained);
        assert_eq!(report.final_state, SessionState::Completed);
        assert!(portal.submitted().is_empty());
        assert!(page.writes().is_empty());
    }
}
