use zybooks_solver::browser::connect_to_browser_and_page;
use zybooks_solver::config::Config;
use zybooks_solver::infrastructure::JsExecutor;
use zybooks_solver::services::scan;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    let _ = tracing_subscriber::fmt::try_init();

    let config = Config::from_env().expect("配置无效");

    let result = connect_to_browser_and_page(config.browser_debug_port, &config.target_url).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore] // 需要浏览器已打开一个章节页面
async fn test_scan_live_page() {
    let _ = tracing_subscriber::fmt::try_init();

    let config = Config::from_env().expect("配置无效");
    let (_browser, page) = connect_to_browser_and_page(config.browser_debug_port, &config.target_url)
        .await
        .expect("连接浏览器失败");
    let executor = JsExecutor::new(page);

    let result = scan(&executor, &config.selectors).await.expect("扫描失败");

    for (idx, record) in result.records.iter().enumerate() {
        assert_eq!(record.index, idx);
    }
}
