//! 应用 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写日志文件头、连接或启动浏览器、创建 LLM 客户端
//! 2. **构造会话上下文**：配置、页面句柄、模型、缓存
//! 3. **运行流程**：委托 `SessionDriver` 处理作业
//! 4. **记录进度**：把本次运行的步骤写入进度文件
//! 5. **全局统计**：输出最终结果
//!
//! 不处理单个作业的细节。

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{LanguageModel, OpenAiModel, PageDriver};
use crate::models::{TaskEntry, TaskStatus};
use crate::services::{CanvasPortal, HandlerRegistry, Portal, Prioritizer, ProgressTracker};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};
use crate::workflow::{RunReport, SessionContext, SessionDriver, SessionState};

/// 截止提醒的天数
const DUE_SOON_DAYS: i64 = 3;
/// 没有更多信息时的默认权重和预计耗时
const DEFAULT_WEIGHT: f64 = 1.0;
const DEFAULT_ESTIMATED_MINUTES: u32 = 60;

/// 应用主结构
pub struct App {
    ctx: SessionContext,
    portal: Arc<dyn Portal>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        let login_url = config.login_url();
        let page = if config.launch_headless {
            browser::launch_headless_browser(&login_url, config.chrome_executable.as_deref()).await?
        } else {
            browser::connect_to_browser_and_page(
                config.browser_debug_port,
                Some(login_url.as_str()),
                config.reuse_page_title.as_deref(),
            )
            .await?
        };

        let llm = OpenAiModel::new(&config);
        Ok(Self::from_parts(Arc::new(config), Arc::new(page), Arc::new(llm)))
    }

    /// 用现成的页面和模型组装（门户为 Canvas）
    pub fn from_parts(
        config: Arc<Config>,
        page: Arc<dyn PageDriver>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let portal = Arc::new(CanvasPortal::new(config.clone(), page.clone()));
        Self {
            ctx: SessionContext::new(config, page, llm),
            portal,
        }
    }

    pub fn with_portal(mut self, portal: Arc<dyn Portal>) -> Self {
        self.portal = portal;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<RunReport> {
        let config = &self.ctx.config;
        let mut driver = SessionDriver::new(
            self.ctx.clone(),
            self.portal.clone(),
            HandlerRegistry::standard(),
        );

        let report = driver.run().await?;

        log_due_soon(&report);

        let progress = record_progress(&report, config);
        if let Err(e) = progress.save(Path::new(&config.progress_file)).await {
            warn!("⚠️ 保存进度失败: {}", e);
        }

        print_final_stats(&report, progress.overall_progress(), &config.output_log_file);
        Ok(report)
    }
}

/// 把运行结果整理成进度步骤
fn record_progress(report: &RunReport, config: &Config) -> ProgressTracker {
    let mut progress = ProgressTracker::new();

    let assignment = progress.add_step(format!("assignment {}", report.record.id), 1);
    if report.result.is_success() {
        progress.complete_step(assignment);
    }

    if !report.documents.is_empty() {
        let documents = progress.add_step("documents", report.documents.len() as u32);
        let filled = report.documents.iter().filter(|d| d.result.is_success()).count();
        progress.update_step(documents, filled as u32);
    }

    if config.submit_after_completion {
        let submission = progress.add_step("submission", 1);
        if report.final_state == SessionState::Submitted {
            progress.complete_step(submission);
        }
    }

    progress
}

/// 作业即将截止时提醒
fn log_due_soon(report: &RunReport) {
    let Some(mut task) = TaskEntry::from_record(&report.record, DEFAULT_WEIGHT, DEFAULT_ESTIMATED_MINUTES)
    else {
        return;
    };
    if report.result.is_success() {
        task.status = TaskStatus::Completed;
    }

    let mut prioritizer = Prioritizer::new();
    prioritizer.add(task);
    let now = Utc::now();
    for due in prioritizer.mark_due_soon(DUE_SOON_DAYS, now) {
        info!("[作业 {}] ⏰ 将在 {} 截止 ({:?})", due.id, due.due, due.status);
    }
}
