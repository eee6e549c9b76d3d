//! 页面能力 - 基础设施层
//!
//! 浏览器自动化协作方的抽象。业务代码只依赖这两个 trait，
//! 真实实现见 `cdp_page`，测试使用 `testing` 中的假实现。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::AppResult;

/// 页面上的单个元素
#[async_trait]
pub trait PageElement: Send + Sync {
    /// 元素的可见文本
    async fn text(&self) -> AppResult<String>;

    /// 清空后写入文本
    async fn fill(&self, text: &str) -> AppResult<()>;

    async fn click(&self) -> AppResult<()>;

    /// 在元素内部查询子元素
    async fn query_all(&self, selector: &str) -> AppResult<Vec<Box<dyn PageElement>>>;

    /// 描述选项输入框的文本（单选项的标签）
    async fn label(&self) -> AppResult<String> {
        self.text().await
    }
}

/// 一个页面句柄
///
/// 同一个句柄同一时间只能被一个任务驱动；并发处理时通过 `open_page` 打开独立句柄。
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> AppResult<()>;

    /// 等待元素出现，超时返回 `BrowserError::Timeout`
    async fn wait_for(&self, selector: &str, timeout: Duration) -> AppResult<Box<dyn PageElement>>;

    async fn fill(&self, selector: &str, text: &str) -> AppResult<()>;

    async fn click(&self, selector: &str) -> AppResult<()>;

    async fn evaluate(&self, script: &str) -> AppResult<JsonValue>;

    async fn query_all(&self, selector: &str) -> AppResult<Vec<Box<dyn PageElement>>>;

    async fn current_url(&self) -> AppResult<String>;

    /// 打开一个独立的新页面句柄
    async fn open_page(&self, url: &str) -> AppResult<Arc<dyn PageDriver>>;

    /// 为文件输入框设置文件
    async fn set_input_files(&self, selector: &str, path: &Path) -> AppResult<()>;

    /// 第一个匹配的元素
    async fn query(&self, selector: &str) -> AppResult<Option<Box<dyn PageElement>>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }
}

/// 执行脚本并反序列化为指定类型
pub async fn evaluate_as<T: DeserializeOwned>(page: &dyn PageDriver, script: &str) -> AppResult<T> {
    let value = page.evaluate(script).await?;
    Ok(serde_json::from_value(value)?)
}
