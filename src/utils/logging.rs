//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use std::fs::{self, OpenOptions};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::models::{QuestionKind, ScanResult};

/// 控制台与日志文件共用的时间格式，例如 `03:04:05 PM`
const TIME_FORMAT: &str = "%I:%M:%S %p";

/// 横幅宽度
pub const RULE_WIDTH: usize = 50;

/// 初始化全局日志
///
/// - 级别默认 `info`（`VERBOSE_LOGGING=true` 时为 `debug`），可用 `RUST_LOG` 覆盖
/// - 配置了日志文件时，同时把每一行追加到文件
pub fn init(config: &Config) -> Result<()> {
    let default_level = if config.verbose_logging { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},chromiumoxide=warn")));

    let console = fmt::layer()
        .with_target(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()));

    let file = if config.output_log_file.is_empty() {
        None
    } else {
        init_log_file(&config.output_log_file)?;
        let handle = OpenOptions::new().append(true).open(&config.output_log_file)?;
        Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_writer(Arc::new(handle)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(())
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nZybooks Solver Log - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 输出一条分隔线
pub fn log_rule(width: usize) {
    info!("{}", "=".repeat(width));
}

/// 输出带上下分隔线的阶段横幅
///
/// # 参数
/// - `title`: 横幅标题，例如 `PHASE 1: SCANNING PAGE`
/// - `width`: 分隔线宽度
pub fn log_banner(title: &str, width: usize) {
    log_rule(width);
    info!("{}", title);
    log_rule(width);
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 Zybooks Solver started");
    if config.launch_browser {
        info!("🌐 Launching browser at {}", config.target_url);
    } else {
        info!("🌐 Attaching to browser on port {}", config.browser_debug_port);
    }
    info!(
        "⏱ Between questions: {}-{} ms, max retries: {}",
        config.timing.min_between_questions_ms, config.timing.max_between_questions_ms, config.timing.max_retries
    );
    info!("{}", "=".repeat(60));
}

/// 输出扫描结果表格和按类型的汇总
///
/// ```text
///  1. [Animation    ] ✓ Completed
///  2. [Choice       ] ✗ Incomplete
/// ```
pub fn log_scan_results(scan: &ScanResult) {
    log_banner("[SCAN RESULTS]", RULE_WIDTH);
    info!("Found {} questions on page:", scan.len());

    if scan.is_empty() {
        info!("No questions found!");
        log_rule(RULE_WIDTH);
        return;
    }

    for (idx, record) in scan.records.iter().enumerate() {
        info!("{}", scan_row(idx + 1, record.kind, record.completed));
    }

    info!("Summary:");
    for kind in QuestionKind::ALL {
        let (total, completed) = scan.counts(kind);
        if total == 0 {
            continue;
        }
        info!(
            "- {}: {} total ({} completed, {} incomplete)",
            kind.label(),
            total,
            completed,
            total - completed
        );
    }
    log_rule(RULE_WIDTH);
}

/// 表格中的一行
pub fn scan_row(number: usize, kind: QuestionKind, completed: bool) -> String {
    let status = if completed { "✓ Completed" } else { "✗ Incomplete" };
    format!("{:2}. [{:13}] {}", number, kind.label(), status)
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_row_layout() {
        assert_eq!(
            scan_row(1, QuestionKind::Animation, true),
            " 1. [Animation    ] ✓ Completed"
        );
        assert_eq!(
            scan_row(12, QuestionKind::ShortAnswer, false),
            "12. [Short Answer ] ✗ Incomplete"
        );
    }

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("短文本", 5), "短文本");
    }

    #[test]
    fn test_log_file_header() {
        let path = std::env::temp_dir().join(format!("zybooks_solver_log_{}.txt", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        init_log_file(&path_str).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("Zybooks Solver Log - "));
        fs::remove_file(&path).unwrap();
    }
}
