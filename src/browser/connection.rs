use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, BrowserError};

/// 连接到已经开启远程调试端口的浏览器，并取得目标页面
///
/// 优先复用地址以 `target_url` 开头的已有标签页（通常是已登录的课程页面），
/// 找不到时新开一个标签页并导航过去。
pub async fn connect_to_browser_and_page(port: u16, target_url: &str) -> AppResult<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("Connecting to browser: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("Failed to connect to browser: {}", e);
        AppError::browser_connection_failed(port, e)
    })?;
    debug!("browser connected");

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

    let pages = browser
        .pages()
        .await
        .map_err(|e| AppError::browser_connection_failed(port, e))?;
    debug!("{} open pages", pages.len());

    for page in pages.iter() {
        if let Ok(Some(url)) = page.url().await {
            debug!("checking page: {}", url);
            if url.starts_with(target_url) {
                info!("✓ Found open page: {}", url);
                return Ok((browser, page.clone()));
            }
        }
    }

    debug!("no open page matches {}, opening a new one", target_url);
    let page = open_page(&browser, target_url).await?;
    Ok((browser, page))
}

/// 新开标签页并导航到 `url`
pub(crate) async fn open_page(browser: &Browser, url: &str) -> AppResult<Page> {
    let navigation_failed = |e: chromiumoxide::error::CdpError| {
        error!("Navigation to {} failed: {}", url, e);
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.to_string(),
            source: Box::new(e),
        })
    };

    let page = browser.new_page("about:blank").await.map_err(navigation_failed)?;
    page.goto(url).await.map_err(navigation_failed)?;
    info!("Navigated to: {}", url);
    Ok(page)
}
