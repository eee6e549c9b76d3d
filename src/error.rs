use thiserror::Error;

/// 应用程序错误类型
///
/// 每个变体对应流水线中的一个阶段。除 `Recovery` 外，其余错误都会在调用点被
/// 捕获：要么交给重试包装器，要么转换为 `CompletionResult`，要么触发一次恢复。
#[derive(Debug, Error)]
pub enum AppError {
    /// 登录门户失败
    #[error("登录失败: {0}")]
    Login(String),

    /// 导航到课程/作业失败
    #[error("导航失败 ({target}): {message}")]
    Navigation { target: String, message: String },

    /// 提取作业详情失败
    #[error("提取作业详情失败: {0}")]
    Extraction(String),

    /// LLM 生成失败
    #[error("LLM 生成失败 (模型: {model}): {message}")]
    Generation { model: String, message: String },

    /// 目标输入框缺失或不可写
    #[error("填写失败 ({selector}): {message}")]
    Fill { selector: String, message: String },

    /// 提交失败
    #[error("提交失败: {0}")]
    Submission(String),

    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),

    /// 恢复失败（唯一的致命错误）
    #[error("恢复失败，终止运行: 原始错误: {original}; 恢复错误: {cause}")]
    Recovery { original: String, cause: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 文件读写错误
    #[error("文件错误 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析失败
    #[error("JSON解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 缓存读写失败
    #[error("缓存错误: {0}")]
    Cache(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {message}")]
    ConnectionFailed { port: u16, message: String },

    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),

    /// 创建页面失败
    #[error("创建页面失败: {0}")]
    PageCreationFailed(String),

    /// 等待元素超时
    #[error("等待元素 {selector} 超时 ({timeout_ms}ms)")]
    Timeout { selector: String, timeout_ms: u64 },

    /// 元素不存在
    #[error("未找到元素: {0}")]
    ElementNotFound(String),

    /// 执行脚本或 CDP 命令失败
    #[error("执行脚本失败: {0}")]
    Protocol(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填字段为空
    #[error("缺少必填配置项: {0}")]
    MissingField(&'static str),

    /// 配置文件解析失败
    #[error("配置文件 {path} 解析失败: {message}")]
    ParseFailed { path: String, message: String },

    /// 配置值超出允许范围
    #[error("配置项 {field} 的值无效: {message}")]
    InvalidValue { field: &'static str, message: String },

    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::Protocol(err.to_string()))
    }
}

impl From<async_openai::error::OpenAIError> for AppError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        AppError::Generation {
            model: String::new(),
            message: err.to_string(),
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建导航错误
    pub fn navigation(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Navigation {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// 创建填写错误
    pub fn fill(selector: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Fill {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// 创建 LLM 生成错误
    pub fn generation(model: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Generation {
            model: model.into(),
            message: message.to_string(),
        }
    }

    /// 创建文件错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// 是否为致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Recovery { .. })
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
