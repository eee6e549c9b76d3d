//! 会话上下文
//!
//! 启动时构造一次，显式传给每个处理步骤，代替全局的浏览器和 LLM 单例。

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{LanguageModel, PageDriver};
use crate::services::DiskCache;

/// 一次运行的会话上下文
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<Config>,
    /// 当前页面句柄，同一时间只由一个任务驱动
    pub page: Arc<dyn PageDriver>,
    pub llm: Arc<dyn LanguageModel>,
    pub cache: Option<DiskCache>,
}

impl SessionContext {
    pub fn new(config: Arc<Config>, page: Arc<dyn PageDriver>, llm: Arc<dyn LanguageModel>) -> Self {
        let cache = config
            .use_cache
            .then(|| DiskCache::new(config.cache_dir.clone()));
        Self {
            config,
            page,
            llm,
            cache,
        }
    }

    pub fn with_cache(mut self, cache: Option<DiskCache>) -> Self {
        self.cache = cache;
        self
    }

    /// 换一个页面句柄，其余共享
    pub fn with_page(&self, page: Arc<dyn PageDriver>) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.config.element_timeout_ms)
    }

    /// 页面动作后的等待
    pub async fn settle(&self) {
        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }
    }

    /// 调用模型生成文本，启用缓存时相同参数只调用一次
    pub async fn generate(&self, prompt: &str) -> AppResult<String> {
        let max_tokens = self.config.llm_max_tokens;
        let temperature = self.config.llm_temperature;

        match &self.cache {
            Some(cache) => {
                let args = (self.llm.model_name(), prompt, max_tokens, temperature);
                cache
                    .get_or_compute("generate", &args, || async {
                        self.llm.generate(prompt, max_tokens, temperature).await
                    })
                    .await
            }
            None => {
                debug!("缓存未启用，直接调用模型");
                self.llm.generate(prompt, max_tokens, temperature).await
            }
        }
    }
}
