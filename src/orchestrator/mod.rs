//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用与控制台
//! - 管理应用生命周期（初始化、控制台循环、退出）
//! - 持有 Browser、JsExecutor 和停止信号
//! - 每次运行放到独立任务中执行，同一时间只允许一个运行
//!
//! ### `pipeline` - 页面流水线
//! - 扫描 → 筛选 → 分派 → 求解
//! - 连续模式：逐页求解并点击下一节链接
//!
//! ## 层次关系
//!
//! ```text
//! app (控制台、RunRequest)
//!     ↓
//! pipeline (ScanResult → Vec<QuestionRecord>)
//!     ↓
//! workflow::Solver (处理单个 QuestionRecord)
//!     ↓
//! services (能力层：scanner / interaction / pacing)
//!     ↓
//! infrastructure (基础设施：Driver / JsExecutor)
//! ```

pub mod app;
pub mod pipeline;

pub use app::{App, ConsoleCommand};
pub use pipeline::{filter_records, run, solver_for};
