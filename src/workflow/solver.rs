//! 求解器抽象与批量处理
//!
//! 每种题目类型一个求解器，统一实现 [`Solver`]；
//! [`solve_batch`] 负责逐条调度、题间停顿、停止检查和汇总。

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::AppResult;
use crate::models::{BatchReport, QuestionKind, QuestionRecord};
use crate::workflow::solve_ctx::SolveCtx;

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// 平台确认完成
    Solved,
    /// 重试/选项耗尽仍未完成
    Exhausted,
    /// 缺少必要元素或某一步失败，放弃该记录
    Abandoned(String),
    /// 答案已提交，但没有观察到完成标记
    Unconfirmed,
    /// 处理途中收到停止信号
    Cancelled,
}

impl SolveOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveOutcome::Solved)
    }
}

/// 某一类题目的求解器
#[async_trait]
pub trait Solver: Send + Sync {
    fn kind(&self) -> QuestionKind;

    /// 日志中使用的名称
    fn name(&self) -> &'static str;

    /// 处理一条记录
    ///
    /// 记录级失败通过 [`SolveOutcome`] 表达；只有会话级错误才返回 `Err`。
    async fn solve(&self, ctx: &SolveCtx<'_>, record: &QuestionRecord) -> AppResult<SolveOutcome>;
}

/// 按顺序处理同一类型的一批记录
///
/// 单条记录失败不影响后续记录；致命错误立即向上传递。
pub async fn solve_batch(
    solver: &dyn Solver,
    ctx: &SolveCtx<'_>,
    records: &[QuestionRecord],
) -> AppResult<BatchReport> {
    let kind = solver.kind();
    let total = records.len();
    let mut report = BatchReport::new(kind, total);

    info!("Starting {}", solver.name());
    info!("Processing {} {}", total, batch_noun(kind));

    if records.is_empty() {
        info!("No {} to solve", batch_noun(kind));
        return Ok(report);
    }

    for (idx, record) in records.iter().enumerate() {
        if ctx.should_stop() {
            report.cancelled = true;
            return Ok(report);
        }

        info!("{} {}/{}", kind.item(), idx + 1, total);
        report.attempted += 1;

        match solver.solve(ctx, record).await {
            Ok(SolveOutcome::Solved) => report.solved += 1,
            Ok(SolveOutcome::Unconfirmed) => report.unconfirmed += 1,
            Ok(SolveOutcome::Cancelled) => {
                report.cancelled = true;
                return Ok(report);
            }
            Ok(SolveOutcome::Exhausted) | Ok(SolveOutcome::Abandoned(_)) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => error!("✗ Error solving {}: {}", kind.item().to_lowercase(), e),
        }

        if idx + 1 < total {
            ctx.pause_between_questions().await;
        }
    }

    info!("✓ {}", report.summary_line());
    Ok(report)
}

fn batch_noun(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::ChoiceQuestion => "radio questions",
        QuestionKind::Animation => "animation questions",
        QuestionKind::ShortAnswer => "short answer questions",
    }
}
