use anyhow::{Context, Result};
use coursework_pilot::utils::logging;
use coursework_pilot::{App, Config};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load().context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    config.validate().context("配置不完整")?;

    // 初始化并运行应用
    let app = App::initialize(config).await?;

    tokio::select! {
        result = app.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("⚠️ 收到中断信号，程序退出");
        }
    }

    Ok(())
}
