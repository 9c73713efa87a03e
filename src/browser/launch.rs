use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::connection::open_page;
use crate::error::{AppError, AppResult, BrowserError};

/// 启动一个可见的 Chrome 窗口并导航到 `url`
///
/// 窗口保持可见：登录和进入具体章节需要用户自己操作。
pub async fn launch_browser(url: &str, chrome_executable: Option<&str>) -> AppResult<(Browser, Page)> {
    info!("🚀 Launching browser...");
    debug!("target url: {}", url);

    let mut builder = BrowserConfig::builder().with_head().args(vec![
        "--start-maximized",
        "--disable-blink-features=AutomationControlled",
    ]);
    if let Some(executable) = chrome_executable {
        builder = builder.chrome_executable(Path::new(executable));
    }
    let config = builder.build().map_err(|e| {
        error!("Invalid browser configuration: {}", e);
        AppError::Browser(BrowserError::LaunchFailed(e))
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("Failed to launch browser: {}", e);
        AppError::Browser(BrowserError::LaunchFailed(e.to_string()))
    })?;
    debug!("browser launched");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = open_page(&browser, url).await?;
    info!("✅ Browser ready at: {}", url);
    Ok((browser, page))
}
