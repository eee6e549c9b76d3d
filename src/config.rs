use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};
use crate::models::AssignmentCategory;

/// 程序配置
///
/// 启动时加载一次，之后只读。加载顺序：默认值 → `COURSEWORK_CONFIG` 指向的 TOML 文件 → 环境变量。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 门户配置 ---
    pub portal_base_url: String,
    pub login_path: String,
    pub username: String,
    pub password: String,
    /// 课程链接文本
    pub course_selector: String,
    /// 作业链接文本
    pub assignment_selector: String,
    /// 已完成的作业是否重新完成
    pub allow_recompletion: bool,
    pub quiz_access_code: Option<String>,
    /// 完成后是否提交
    pub submit_after_completion: bool,
    /// 启用的作业类型，为空表示全部启用
    pub enabled_categories: Vec<AssignmentCategory>,

    // --- 文档配置 ---
    pub google_email: Option<String>,
    pub google_password: Option<String>,
    /// 作业中没有文档链接时使用的文档
    pub provided_doc_url: Option<String>,
    pub max_concurrent_documents: usize,

    // --- 浏览器配置 ---
    pub browser_debug_port: u16,
    /// 为 true 时启动无头浏览器，否则连接调试端口上已运行的浏览器
    pub launch_headless: bool,
    pub chrome_executable: Option<String>,
    /// 连接已运行的浏览器时，优先复用标题包含该文本的页面
    pub reuse_page_title: Option<String>,
    pub element_timeout_ms: u64,
    /// 页面动作之间的等待时间
    pub settle_delay_ms: u64,

    // --- 重试配置 ---
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_backoff: f64,

    // --- 持久化 ---
    pub cache_dir: String,
    pub use_cache: bool,
    pub progress_file: String,
    pub output_log_file: String,
    pub verbose_logging: bool,

    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    pub llm_system_prompt: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_base_url: "https://canvas.instructure.com".to_string(),
            login_path: "/login".to_string(),
            username: String::new(),
            password: String::new(),
            course_selector: String::new(),
            assignment_selector: String::new(),
            allow_recompletion: false,
            quiz_access_code: None,
            submit_after_completion: false,
            enabled_categories: Vec::new(),
            google_email: None,
            google_password: None,
            provided_doc_url: None,
            max_concurrent_documents: 4,
            browser_debug_port: 9222,
            launch_headless: false,
            chrome_executable: None,
            reuse_page_title: None,
            element_timeout_ms: 5000,
            settle_delay_ms: 1000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 1000,
            retry_backoff: 2.0,
            cache_dir: ".cache".to_string(),
            use_cache: true,
            progress_file: "progress.json".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_max_tokens: 500,
            llm_temperature: 0.7,
            llm_system_prompt: None,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → 配置文件（可选）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("COURSEWORK_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.apply_env()
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::AppError::io(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            crate::error::AppError::Config(ConfigError::ParseFailed { message, .. }) => {
                ConfigError::ParseFailed {
                    path: path.display().to_string(),
                    message,
                }
                .into()
            }
            other => other,
        })
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str::<Config>(content).map_err(|e| {
            ConfigError::ParseFailed {
                path: String::new(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// 用环境变量覆盖已有值
    pub fn apply_env(self) -> AppResult<Self> {
        Ok(Self {
            portal_base_url: env_or("PORTAL_BASE_URL", self.portal_base_url),
            login_path: env_or("PORTAL_LOGIN_PATH", self.login_path),
            username: env_or("PORTAL_USERNAME", self.username),
            password: env_or("PORTAL_PASSWORD", self.password),
            course_selector: env_or("COURSE_SELECTOR", self.course_selector),
            assignment_selector: env_or("ASSIGNMENT_SELECTOR", self.assignment_selector),
            allow_recompletion: env_parse("ALLOW_RECOMPLETION", self.allow_recompletion)?,
            quiz_access_code: env_opt("QUIZ_ACCESS_CODE", self.quiz_access_code),
            submit_after_completion: env_parse(
                "SUBMIT_AFTER_COMPLETION",
                self.submit_after_completion,
            )?,
            enabled_categories: match std::env::var("ENABLED_CATEGORIES") {
                Ok(v) => parse_categories(&v)?,
                Err(_) => self.enabled_categories,
            },
            google_email: env_opt("GOOGLE_EMAIL", self.google_email),
            google_password: env_opt("GOOGLE_PASSWORD", self.google_password),
            provided_doc_url: env_opt("PROVIDED_GOOGLE_DOC_URL", self.provided_doc_url),
            max_concurrent_documents: env_parse(
                "MAX_CONCURRENT_DOCUMENTS",
                self.max_concurrent_documents,
            )?,
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", self.browser_debug_port)?,
            launch_headless: env_parse("LAUNCH_HEADLESS", self.launch_headless)?,
            chrome_executable: env_opt("CHROME_EXECUTABLE", self.chrome_executable),
            reuse_page_title: env_opt("REUSE_PAGE_TITLE", self.reuse_page_title),
            element_timeout_ms: env_parse("ELEMENT_TIMEOUT_MS", self.element_timeout_ms)?,
            settle_delay_ms: env_parse("SETTLE_DELAY_MS", self.settle_delay_ms)?,
            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS", self.retry_max_attempts)?,
            retry_base_delay_ms: env_parse("RETRY_BASE_DELAY_MS", self.retry_base_delay_ms)?,
            retry_backoff: env_parse("RETRY_BACKOFF", self.retry_backoff)?,
            cache_dir: env_or("CACHE_DIR", self.cache_dir),
            use_cache: env_parse("USE_CACHE", self.use_cache)?,
            progress_file: env_or("PROGRESS_FILE", self.progress_file),
            output_log_file: env_or("OUTPUT_LOG_FILE", self.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging)?,
            llm_api_key: env_or("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_or("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_model_name: env_or("LLM_MODEL_NAME", self.llm_model_name),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", self.llm_max_tokens)?,
            llm_temperature: env_parse("LLM_TEMPERATURE", self.llm_temperature)?,
            llm_system_prompt: env_opt("LLM_SYSTEM_PROMPT", self.llm_system_prompt),
        })
    }

    /// 检查必填项
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("username", &self.username),
            ("password", &self.password),
            ("course_selector", &self.course_selector),
            ("assignment_selector", &self.assignment_selector),
            ("llm_api_key", &self.llm_api_key),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }
        if !self.retry_backoff.is_finite() || self.retry_backoff < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_backoff",
                message: format!("{} 不是非负有限数", self.retry_backoff),
            });
        }
        Ok(())
    }

    /// 登录页完整地址
    pub fn login_url(&self) -> String {
        format!(
            "{}{}",
            self.portal_base_url.trim_end_matches('/'),
            self.login_path
        )
    }

    /// 某个作业类型是否启用
    pub fn is_enabled(&self, category: AssignmentCategory) -> bool {
        self.enabled_categories.is_empty() || self.enabled_categories.contains(&category)
    }
}

fn env_or(var: &str, default: String) -> String {
    std::env::var(var).unwrap_or(default)
}

fn env_opt(var: &str, default: Option<String>) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty()).or(default)
}

fn env_parse<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var.to_string(),
            value,
            expected_type: std::any::type_name::<T>(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_categories(value: &str) -> Result<Vec<AssignmentCategory>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|tag| {
            AssignmentCategory::from_tag(tag).ok_or_else(|| ConfigError::EnvVarParseFailed {
                var_name: "ENABLED_CATEGORIES".to_string(),
                value: tag.to_string(),
                expected_type: "AssignmentCategory",
            })
        })
        .collect()
}
