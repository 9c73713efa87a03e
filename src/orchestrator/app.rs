//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：输出启动信息、连接或启动浏览器、创建 JsExecutor
//! 2. **控制台**：逐行读取 stdin 命令（运行模式、stop、status、help、quit）
//! 3. **运行调度**：每次运行放到独立的 tokio 任务中执行，控制台保持响应
//! 4. **资源管理**：唯一持有 Browser 的模块
//!
//! 同一时间只允许一个运行；停止信号在新运行开始时清除。

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chromiumoxide::Browser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::JsExecutor;
use crate::models::{QuestionKind, RunReport, RunRequest, UnknownMode};
use crate::orchestrator::pipeline;
use crate::services::Pacer;
use crate::utils::logging::{log_rule, RULE_WIDTH};
use crate::workflow::{CancellationSignal, SolveCtx};

/// 控制台命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Run(RunRequest),
    Stop,
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = UnknownMode;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop" => Ok(ConsoleCommand::Stop),
            "status" => Ok(ConsoleCommand::Status),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            _ => s.parse().map(ConsoleCommand::Run),
        }
    }
}

impl fmt::Display for ConsoleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleCommand::Run(request) if request.force_mode => write!(f, "{} (force)", request.mode),
            ConsoleCommand::Run(request) => write!(f, "{}", request.mode),
            ConsoleCommand::Stop => f.write_str("stop"),
            ConsoleCommand::Status => f.write_str("status"),
            ConsoleCommand::Help => f.write_str("help"),
            ConsoleCommand::Quit => f.write_str("quit"),
        }
    }
}

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    _browser: Browser,
    executor: Arc<JsExecutor>,
    pacer: Arc<Pacer>,
    cancel: CancellationSignal,
    worker: Option<JoinHandle<()>>,
    last_report: Arc<Mutex<Option<RunReport>>>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        crate::utils::logging::log_startup(&config);

        let (browser, page) = if config.launch_browser {
            browser::launch_browser(&config.target_url, config.chrome_executable.as_deref()).await?
        } else {
            browser::connect_to_browser_and_page(config.browser_debug_port, &config.target_url).await?
        };

        // 创建 JsExecutor（持有 page）
        let executor = JsExecutor::new(page);

        Ok(Self {
            config: Arc::new(config),
            _browser: browser,
            executor: Arc::new(executor),
            pacer: Arc::new(Pacer::new()),
            cancel: CancellationSignal::new(),
            worker: None,
            last_report: Arc::new(Mutex::new(None)),
        })
    }

    /// 运行控制台，直到 `quit` 或 stdin 关闭
    pub async fn run(mut self) -> Result<()> {
        log_help();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<ConsoleCommand>() {
                Ok(ConsoleCommand::Run(request)) => self.start_run(request),
                Ok(ConsoleCommand::Stop) => self.stop(),
                Ok(ConsoleCommand::Status) => self.log_status(),
                Ok(ConsoleCommand::Help) => log_help(),
                Ok(ConsoleCommand::Quit) => break,
                Err(e) => warn!("{} (type 'help' for the list of commands)", e),
            }
        }

        self.shutdown().await;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// 在独立任务中执行一次运行
    fn start_run(&mut self, request: RunRequest) {
        if self.is_running() {
            warn!("A run is already in progress; type 'stop' to end it first");
            return;
        }

        self.cancel.clear();

        let executor = Arc::clone(&self.executor);
        let pacer = Arc::clone(&self.pacer);
        let config = Arc::clone(&self.config);
        let cancel = self.cancel.clone();
        let last_report = Arc::clone(&self.last_report);

        self.worker = Some(tokio::spawn(async move {
            let ctx = SolveCtx::new(executor.as_ref(), &pacer, &config, &cancel);
            match pipeline::run(&ctx, request).await {
                Ok(report) => {
                    log_run_summary(&report);
                    if let Ok(json) = serde_json::to_string(&report) {
                        debug!("run report: {}", json);
                    }
                    if let Ok(mut slot) = last_report.lock() {
                        *slot = Some(report);
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!("✗ Run aborted: session error");
                    error!("{}", e);
                }
                Err(e) => error!("✗ Run failed: {}", e),
            }
        }));
    }

    fn stop(&self) {
        self.cancel.set();
        info!("Stop signal sent to solvers");
    }

    fn log_status(&self) {
        if self.is_running() {
            info!("A run is in progress (type 'stop' to end it)");
        } else {
            info!("Idle");
        }

        let last = self.last_report.lock().ok().and_then(|slot| slot.clone());
        if let Some(report) = last {
            info!(
                "Last run: {} - solved {}/{} attempted over {} page(s){}",
                report.mode,
                report.solved(),
                report.attempted(),
                report.pages,
                if report.cancelled { " (stopped)" } else { "" }
            );
        }
    }

    /// 停止正在进行的运行并等待其结束
    async fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            if !worker.is_finished() {
                self.stop();
            }
            if let Err(e) = worker.await {
                error!("Run task failed: {}", e);
            }
        }
        info!("Bye");
    }
}

fn log_help() {
    log_rule(RULE_WIDTH);
    info!("Commands:");
    info!("  scan                 scan the page and list questions");
    info!("  all                  solve every question on this page");
    info!("  continuous           solve every page, following next-section links");
    info!("  choice | animation | short");
    info!("                       solve one kind of question on this page");
    info!("  <mode> force         also re-solve completed questions");
    info!("  stop | status | help | quit");
    log_rule(RULE_WIDTH);
}

fn log_run_summary(report: &RunReport) {
    log_rule(RULE_WIDTH);
    info!("Run finished: {}", report.mode);
    for kind in QuestionKind::ALL {
        let totals = report.totals(kind);
        if totals.attempted == 0 {
            continue;
        }
        info!(
            "  - {}: solved {}/{} ({} unconfirmed)",
            kind.label(),
            totals.solved,
            totals.attempted,
            totals.unconfirmed
        );
    }
    if report.cancelled {
        info!("Run was stopped before finishing");
    }
    log_rule(RULE_WIDTH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunMode;

    #[test]
    fn test_console_commands() {
        assert_eq!("stop".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Stop);
        assert_eq!(" Status ".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Status);
        assert_eq!("exit".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Quit);
        assert_eq!(
            "all force".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Run(RunRequest::new(RunMode::SolveAllOnPage, true))
        );
        assert_eq!(
            "Solve Animations".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Run(RunRequest::new(RunMode::SolveAnimation, false))
        );
        assert!("dance".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_command_display() {
        let cmd = ConsoleCommand::Run(RunRequest::new(RunMode::SolveShortAnswer, true));
        assert_eq!(cmd.to_string(), "Solve Short Answer (force)");
    }
}
