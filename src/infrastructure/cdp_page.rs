//! CDP 页面 - 基础设施层
//!
//! 持有 chromiumoxide 的 `Page`，实现 `PageDriver` / `PageElement`。
//! 不认识作业，不处理业务流程。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::{Browser, Element, Page};
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::page::{PageDriver, PageElement};

/// 轮询等待元素的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 清空输入框并聚焦；富文本编辑区只聚焦不清空
const CLEAR_AND_FOCUS_JS: &str =
    "function() { if ('value' in this) { this.value = ''; } this.focus(); }";

/// 单选项的标签文本：优先 <label>，其次紧随其后的文本节点
const OPTION_LABEL_JS: &str = r#"function() {
    if (this.labels && this.labels.length > 0) { return this.labels[0].innerText; }
    if (this.nextSibling && this.nextSibling.textContent) { return this.nextSibling.textContent; }
    return this.parentElement ? this.parentElement.innerText : '';
}"#;

/// chromiumoxide 页面句柄
pub struct CdpPage {
    browser: Arc<Browser>,
    page: Page,
}

impl CdpPage {
    pub fn new(browser: Arc<Browser>, page: Page) -> Self {
        Self { browser, page }
    }

    /// 获取 page 的引用
    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn find(&self, selector: &str) -> AppResult<Element> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()).into())
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::navigation(url, e))?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> AppResult<Box<dyn PageElement>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(Box::new(CdpElement::new(element)));
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }
                .into());
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn fill(&self, selector: &str, text: &str) -> AppResult<()> {
        let element = self.find(selector).await?;
        CdpElement::new(element)
            .fill(text)
            .await
            .map_err(|e| AppError::fill(selector, e))
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        let element = self.find(selector).await?;
        element.click().await?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> AppResult<JsonValue> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    async fn query_all(&self, selector: &str) -> AppResult<Vec<Box<dyn PageElement>>> {
        let elements = self.page.find_elements(selector).await?;
        Ok(elements
            .into_iter()
            .map(|e| Box::new(CdpElement::new(e)) as Box<dyn PageElement>)
            .collect())
    }

    async fn current_url(&self) -> AppResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn open_page(&self, url: &str) -> AppResult<Arc<dyn PageDriver>> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        Ok(Arc::new(CdpPage::new(self.browser.clone(), page)))
    }

    async fn set_input_files(&self, selector: &str, path: &Path) -> AppResult<()> {
        let element = self.find(selector).await?;
        let params = SetFileInputFilesParams::builder()
            .files(vec![path.display().to_string()])
            .backend_node_id(element.backend_node_id.clone())
            .build()
            .map_err(BrowserError::Protocol)?;
        self.page.execute(params).await?;
        Ok(())
    }
}

/// chromiumoxide 元素
pub struct CdpElement {
    element: Element,
}

impl CdpElement {
    pub fn new(element: Element) -> Self {
        Self { element }
    }
}

#[async_trait]
impl PageElement for CdpElement {
    async fn text(&self) -> AppResult<String> {
        Ok(self.element.inner_text().await?.unwrap_or_default())
    }

    async fn fill(&self, text: &str) -> AppResult<()> {
        self.element.call_js_fn(CLEAR_AND_FOCUS_JS, false).await?;
        self.element.type_str(text).await?;
        Ok(())
    }

    async fn click(&self) -> AppResult<()> {
        self.element.click().await?;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> AppResult<Vec<Box<dyn PageElement>>> {
        let elements = self.element.find_elements(selector).await?;
        Ok(elements
            .into_iter()
            .map(|e| Box::new(CdpElement::new(e)) as Box<dyn PageElement>)
            .collect())
    }

    async fn label(&self) -> AppResult<String> {
        let returns = self.element.call_js_fn(OPTION_LABEL_JS, false).await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }
}
