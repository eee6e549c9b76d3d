//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use std::fs;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::workflow::RunReport;

/// 初始化 tracing 订阅器
///
/// 设置了 `RUST_LOG` 时以它为准，否则按 `verbose` 选择 debug 或 info。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n作业处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| AppError::io(log_file_path, e))
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 作业自动完成模式");
    info!("🌐 门户: {}", config.portal_base_url);
    info!("📚 课程: {} / 作业: {}", config.course_selector, config.assignment_selector);
    info!("🤖 模型: {}", config.llm_model_name);
    if !config.enabled_categories.is_empty() {
        let tags: Vec<&str> = config.enabled_categories.iter().map(|c| c.as_tag()).collect();
        info!("🧩 启用的类型: {}", tags.join(", "));
    }
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `report`: 本次运行结果
/// - `progress`: 总体进度 [0, 1]
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(report: &RunReport, progress: f64, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📝 作业: {} ({})", truncate_text(&report.record.title, 40), report.category);
    info!("📌 结果: {:?} - {}", report.result.status, truncate_text(&report.result.message, 80));
    info!("🔚 最终状态: {:?}", report.final_state);
    if !report.documents.is_empty() {
        let succeeded = report.documents.iter().filter(|d| d.result.is_success()).count();
        info!("📄 文档: 成功 {}/{}", succeeded, report.documents.len());
    }
    if report.recovered {
        info!("🔁 本次运行经历过一次恢复");
    }
    info!("📈 总体进度: {:.0}%", progress * 100.0);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
