//! # Zybooks Solver
//!
//! 自动完成在线教材中的交互练习：扫描页面、识别题目类型和完成状态，
//! 再按类型驱动每道题，直到平台自己的界面显示完成。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露 `Driver` 能力
//! - `JsExecutor` - 唯一的 page owner，通过页面脚本和 CDP 鼠标事件操作元素
//!
//! ### ② 业务能力层（Services）
//! - `scanner` - 题目识别（类型 + 完成状态）
//! - `interaction` - 滚动后点击、被拦截时程序化点击、按层向上查找完成标记
//! - `pacing` - 钟形分布的随机停顿
//!
//! ### ③ 流程层（Workflow）
//! - `SolveCtx` - 上下文封装（会话 + 节奏 + 配置 + 停止信号）
//! - `ChoiceSolver` / `AnimationSolver` / `ShortAnswerSolver` - 每种题目一个状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 扫描 → 筛选 → 分派 → 求解，连续模式逐页翻页
//! - `orchestrator/app` - 应用生命周期和控制台
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{connect_to_browser_and_page, launch_browser};
pub use config::Config;
pub use error::{AppError, AppResult, DriverError};
pub use infrastructure::{Driver, ElementHandle, JsExecutor};
pub use models::{QuestionKind, QuestionRecord, RunMode, RunReport, RunRequest, ScanResult};
pub use orchestrator::App;
pub use workflow::{CancellationSignal, SolveCtx, SolveOutcome, Solver};
