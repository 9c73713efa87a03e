//! 简答题求解流程
//!
//! 线性流水线：定位控件 → 两次点击 Show answer → 读取答案 → 填写 → 提交 → 确认完成。
//! 任意一步失败只放弃当前记录。

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{error, info};

use crate::error::{AppResult, DriverResult};
use crate::infrastructure::ElementHandle;
use crate::models::{QuestionKind, QuestionRecord};
use crate::services::interaction::{find_indicator, Indicator};
use crate::services::pacing::DelayModel;
use crate::utils::logging::truncate_text;
use crate::workflow::solve_ctx::SolveCtx;
use crate::workflow::solver::{SolveOutcome, Solver};

/// 提交后向上查找完成标记的层数
const COMPLETION_LEVELS: usize = 3;

const BETWEEN_REVEALS: DelayModel = DelayModel::bell(150.0, 30.0, 100.0, 250.0);
const AFTER_REVEAL: DelayModel = DelayModel::bell(300.0, 75.0, 200.0, 500.0);
const FOCUS_SETTLE: DelayModel = DelayModel::bell(200.0, 50.0, 100.0, 350.0);
const CLEAR_SETTLE: DelayModel = DelayModel::bell(100.0, 30.0, 50.0, 200.0);
const TYPED_SETTLE: DelayModel = DelayModel::bell(200.0, 60.0, 100.0, 350.0);
const SUBMIT_SETTLE: DelayModel = DelayModel::bell(600.0, 150.0, 400.0, 1000.0);

/// 一道简答题需要的三个控件
struct Controls {
    show_answer: ElementHandle,
    input: ElementHandle,
    check: ElementHandle,
}

/// 简答题求解器
#[derive(Debug, Default)]
pub struct ShortAnswerSolver;

impl ShortAnswerSolver {
    pub fn new() -> Self {
        Self
    }

    async fn locate(&self, ctx: &SolveCtx<'_>, question: ElementHandle) -> DriverResult<Option<Controls>> {
        let selectors = ctx.selectors();
        let driver = ctx.driver;

        let show_answer = driver.find_first(Some(question), &selectors.show_answer).await?;
        let input = find_input(ctx, question).await?;
        let check = driver.find_first(Some(question), &selectors.check).await?;

        Ok(match (show_answer, input, check) {
            (Some(show_answer), Some(input), Some(check)) => Some(Controls {
                show_answer,
                input,
                check,
            }),
            _ => None,
        })
    }

    /// 平台需要点两次才会完整显示答案；收到停止信号时返回 `false`
    async fn reveal(&self, ctx: &SolveCtx<'_>, show_answer: ElementHandle) -> DriverResult<bool> {
        info!("Revealing answer...");

        info!("First click on 'Show answer'...");
        ctx.activate(show_answer, "Show answer button").await?;
        ctx.pause(&BETWEEN_REVEALS).await;
        if ctx.should_stop() {
            return Ok(false);
        }

        info!("Second click on 'Show answer'...");
        ctx.activate(show_answer, "Show answer button").await?;
        ctx.pause(&AFTER_REVEAL).await;
        Ok(true)
    }

    async fn extract_answer(&self, ctx: &SolveCtx<'_>, question: ElementHandle) -> DriverResult<Option<String>> {
        let selectors = ctx.selectors();

        for selector in [&selectors.answer, &selectors.answer_fallback] {
            if let Some(element) = ctx.driver.find_first(Some(question), selector).await? {
                let text = ctx.driver.text(element).await?;
                if !text.is_empty() {
                    return Ok(Some(text));
                }
            }
        }
        Ok(None)
    }

    /// 先清空再填入，`set_value` 会触发页面自己的 input/change 监听
    ///
    /// 收到停止信号时返回 `false`。
    async fn type_answer(&self, ctx: &SolveCtx<'_>, input: ElementHandle, answer: &str) -> DriverResult<bool> {
        ctx.driver.scroll_into_view(input).await?;
        ctx.pause(&FOCUS_SETTLE).await;
        if ctx.should_stop() {
            return Ok(false);
        }

        ctx.driver.set_value(input, "").await?;
        ctx.pause(&CLEAR_SETTLE).await;
        if ctx.should_stop() {
            return Ok(false);
        }

        info!("Typing answer into field...");
        ctx.driver.set_value(input, answer).await?;
        ctx.pause(&TYPED_SETTLE).await;
        Ok(!ctx.should_stop())
    }

    async fn submit(&self, ctx: &SolveCtx<'_>, check: ElementHandle) -> DriverResult<()> {
        info!("Submitting answer...");
        ctx.activate(check, "Check button").await?;
        ctx.pause(&SUBMIT_SETTLE).await;
        Ok(())
    }

    /// 在时间预算内轮询完成标记
    async fn await_completion(&self, ctx: &SolveCtx<'_>, question: ElementHandle) -> DriverResult<SolveOutcome> {
        let selectors = ctx.selectors();
        let filled = Indicator::filled(&selectors.chevron, &selectors.filled_marker);
        let budget = Duration::from_millis(ctx.timing().completion_budget_ms);
        let start = Instant::now();

        while start.elapsed() < budget {
            if ctx.should_stop() {
                return Ok(SolveOutcome::Cancelled);
            }
            if find_indicator(ctx.driver, question, COMPLETION_LEVELS, &filled).await? {
                info!("✓ Question completed successfully!");
                return Ok(SolveOutcome::Solved);
            }
            ctx.pause_poll().await;
        }

        error!("✗ Answer submitted but question not marked as complete");
        Ok(SolveOutcome::Unconfirmed)
    }

    async fn run_pipeline(&self, ctx: &SolveCtx<'_>, question: ElementHandle) -> DriverResult<SolveOutcome> {
        let Some(controls) = self.locate(ctx, question).await? else {
            error!("✗ Missing required elements (show answer/input/check button)");
            return Ok(SolveOutcome::Abandoned("missing controls".to_string()));
        };

        if !self.reveal(ctx, controls.show_answer).await? {
            return Ok(SolveOutcome::Cancelled);
        }

        let Some(answer) = self.extract_answer(ctx, question).await? else {
            error!("✗ Could not find answer after revealing");
            return Ok(SolveOutcome::Abandoned("answer not revealed".to_string()));
        };
        info!("Answer found: '{}'", truncate_text(&answer, 50));

        if ctx.should_stop() {
            return Ok(SolveOutcome::Cancelled);
        }

        if !self.type_answer(ctx, controls.input, &answer).await? {
            return Ok(SolveOutcome::Cancelled);
        }
        self.submit(ctx, controls.check).await?;
        self.await_completion(ctx, question).await
    }
}

/// 按候选顺序取第一个存在的输入框
async fn find_input(ctx: &SolveCtx<'_>, question: ElementHandle) -> DriverResult<Option<ElementHandle>> {
    for selector in &ctx.selectors().answer_inputs {
        if let Some(input) = ctx.driver.find_first(Some(question), selector).await? {
            return Ok(Some(input));
        }
    }
    Ok(None)
}

#[async_trait]
impl Solver for ShortAnswerSolver {
    fn kind(&self) -> QuestionKind {
        QuestionKind::ShortAnswer
    }

    fn name(&self) -> &'static str {
        "Short Answer Solver"
    }

    async fn solve(&self, ctx: &SolveCtx<'_>, record: &QuestionRecord) -> AppResult<SolveOutcome> {
        match self.run_pipeline(ctx, record.handle).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                error!("✗ Error solving short answer question: {}", e);
                Ok(SolveOutcome::Abandoned(e.to_string()))
            }
        }
    }
}
