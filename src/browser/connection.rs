use std::sync::Arc;

use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppResult, BrowserError};
use crate::infrastructure::CdpPage;

/// 连接到调试端口上已运行的浏览器并获取页面
///
/// 如果指定了 `target_title`，优先复用标题匹配的已有页面（保留登录状态），
/// 否则新建页面并导航到 `target_url`。
pub async fn connect_to_browser_and_page(
    port: u16,
    target_url: Option<&str>,
    target_title: Option<&str>,
) -> AppResult<CdpPage> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);
    debug!("目标 URL: {:?}, 目标标题: {:?}", target_url, target_title);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::ConnectionFailed {
            port,
            message: e.to_string(),
        }
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    if let Some(title) = target_title {
        for p in pages.iter() {
            if let Ok(Some(page_title)) = p.get_title().await {
                if page_title.contains(title) {
                    info!("✓ 复用已有页面: {}", page_title);
                    let page = p.clone();
                    return Ok(CdpPage::new(Arc::new(browser), page));
                }
            }
        }
        debug!("未找到匹配的页面，将创建新页面");
    }

    let page = browser
        .new_page(target_url.unwrap_or("about:blank"))
        .await
        .map_err(|e| {
            error!("创建新页面失败: {}", e);
            BrowserError::PageCreationFailed(e.to_string())
        })?;
    if let Some(url) = target_url {
        info!("已导航到: {}", url);
    }

    Ok(CdpPage::new(Arc::new(browser), page))
}
