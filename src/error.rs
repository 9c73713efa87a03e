use thiserror::Error;

use crate::infrastructure::ElementHandle;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器启动/连接相关错误
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
    /// 页面交互错误（Driver 层）
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
    /// 配置错误
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// 会话是否已经不可用
    ///
    /// 只有会话级错误会终止整个运行，其余错误都只影响单道题目。
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::Driver(e) => e.is_fatal(),
            AppError::Browser(_) => true,
            AppError::Config(_) => false,
        }
    }
}

/// 浏览器启动/连接错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("cannot connect to browser on port {port}: {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    #[error("cannot launch browser: {0}")]
    LaunchFailed(String),
    /// 导航失败
    #[error("navigation to {url} failed: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 页面交互错误
///
/// "元素不存在" 不属于错误，由 `Option` / 空 `Vec` 表示。
#[derive(Debug, Error)]
pub enum DriverError {
    /// 句柄指向的元素已经离开文档（页面刷新或跳转）
    #[error("element {0} is no longer attached to the document")]
    Detached(ElementHandle),
    /// 直接点击被其他元素拦截
    #[error("click on element {0} was intercepted")]
    Intercepted(ElementHandle),
    /// 页面脚本执行失败（例如选择器语法错误）
    #[error("page script failed: {0}")]
    Script(String),
    /// 浏览器会话本身不可用
    #[error("browser session failed: {0}")]
    Session(String),
}

impl DriverError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Session(_))
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("cannot read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("cannot parse config file {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 数值配置不合法
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Session(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Script(format!("unexpected script result: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建配置值错误
    pub fn invalid_config(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::Invalid {
            name: name.into(),
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// Driver 结果类型
pub type DriverResult<T> = Result<T, DriverError>;
