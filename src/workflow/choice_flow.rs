//! 选择题求解流程
//!
//! 按文档顺序逐个尝试选项，依靠平台的反馈判断对错：
//! 点击前记录页面上已有的反馈文本，点击后只认新出现的反馈。
//!
//! ```text
//! Untried → Trying(i) → Solved
//!              ↓ 错误 / 无反馈
//!           Trying(i+1) → ... → Exhausted
//! ```

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::error::{AppResult, DriverResult};
use crate::infrastructure::ElementHandle;
use crate::models::{QuestionKind, QuestionRecord};
use crate::services::interaction;
use crate::services::pacing::DelayModel;
use crate::workflow::solve_ctx::SolveCtx;
use crate::workflow::solver::{SolveOutcome, Solver};

/// 点击后等待反馈出现
const FEEDBACK_SETTLE: DelayModel = DelayModel::bell(500.0, 100.0, 300.0, 800.0);

/// 单个选项的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionResult {
    Correct,
    Incorrect,
    NoFeedback,
    Cancelled,
}

/// 选择题求解器
#[derive(Debug, Default)]
pub struct ChoiceSolver;

impl ChoiceSolver {
    pub fn new() -> Self {
        Self
    }

    async fn try_option(&self, ctx: &SolveCtx<'_>, radio: ElementHandle, number: usize) -> DriverResult<OptionResult> {
        let selectors = ctx.selectors();

        let label = option_label(ctx, radio, number).await?;
        info!("Trying: {}", label);

        let old_messages = feedback_messages(ctx, &selectors.feedback).await?;

        interaction::activate(ctx.driver, ctx.pacer, radio, &DelayModel::quick_click(), "radio button").await?;
        ctx.pause(&FEEDBACK_SETTLE).await;

        self.await_feedback(ctx, &old_messages).await
    }

    /// 在时间预算内轮询新的反馈
    async fn await_feedback(&self, ctx: &SolveCtx<'_>, old_messages: &HashSet<String>) -> DriverResult<OptionResult> {
        let selectors = ctx.selectors();
        let budget = Duration::from_millis(ctx.timing().feedback_budget_ms);
        let start = Instant::now();

        while start.elapsed() < budget {
            if ctx.should_stop() {
                return Ok(OptionResult::Cancelled);
            }

            if has_new_message(ctx, &selectors.feedback_correct, old_messages).await? {
                info!("✓ Correct answer found!");
                return Ok(OptionResult::Correct);
            }
            if has_new_message(ctx, &selectors.feedback_incorrect, old_messages).await? {
                info!("✗ Incorrect, trying next option");
                return Ok(OptionResult::Incorrect);
            }

            ctx.pause_poll().await;
        }

        info!("No feedback received, trying next option");
        Ok(OptionResult::NoFeedback)
    }
}

#[async_trait]
impl Solver for ChoiceSolver {
    fn kind(&self) -> QuestionKind {
        QuestionKind::ChoiceQuestion
    }

    fn name(&self) -> &'static str {
        "Radio Question Solver"
    }

    async fn solve(&self, ctx: &SolveCtx<'_>, record: &QuestionRecord) -> AppResult<SolveOutcome> {
        let radios = ctx
            .driver
            .find_all(Some(record.handle), &ctx.selectors().radio_input)
            .await?;

        if radios.is_empty() {
            error!("✗ No radio buttons found in question");
            return Ok(SolveOutcome::Abandoned("no radio buttons".to_string()));
        }
        info!("Found {} radio buttons", radios.len());

        for (idx, radio) in radios.into_iter().enumerate() {
            if ctx.should_stop() {
                return Ok(SolveOutcome::Cancelled);
            }

            match self.try_option(ctx, radio, idx + 1).await {
                Ok(OptionResult::Correct) => return Ok(SolveOutcome::Solved),
                Ok(OptionResult::Cancelled) => return Ok(SolveOutcome::Cancelled),
                Ok(OptionResult::Incorrect) | Ok(OptionResult::NoFeedback) => {}
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => error!("✗ Error clicking radio button: {}", e),
            }
        }

        error!("✗ No correct answer found for question");
        Ok(SolveOutcome::Exhausted)
    }
}

/// 选项文字取自 radio 的父元素，为空时用序号代替
async fn option_label(ctx: &SolveCtx<'_>, radio: ElementHandle, number: usize) -> DriverResult<String> {
    let text = match ctx.driver.parent(radio).await? {
        Some(parent) => ctx.driver.text(parent).await?,
        None => String::new(),
    };
    if text.is_empty() {
        Ok(format!("Option {}", number))
    } else {
        Ok(text)
    }
}

/// 页面上所有匹配容器中的反馈文本
///
/// 单个容器读取失败（例如刚被替换）时跳过该容器。
async fn message_texts(ctx: &SolveCtx<'_>, container_selector: &str) -> DriverResult<Vec<String>> {
    let message_selector = &ctx.selectors().feedback_message;
    let mut texts = Vec::new();

    for container in ctx.driver.find_all(None, container_selector).await? {
        let text = match ctx.driver.find_first(Some(container), message_selector).await {
            Ok(Some(message)) => ctx.driver.text(message).await,
            Ok(None) => continue,
            Err(e) => Err(e),
        };
        match text {
            Ok(text) if !text.is_empty() => texts.push(text),
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!("feedback container {} unreadable: {}", container, e),
        }
    }
    Ok(texts)
}

async fn feedback_messages(ctx: &SolveCtx<'_>, selector: &str) -> DriverResult<HashSet<String>> {
    Ok(message_texts(ctx, selector).await?.into_iter().collect())
}

async fn has_new_message(ctx: &SolveCtx<'_>, selector: &str, old_messages: &HashSet<String>) -> DriverResult<bool> {
    Ok(message_texts(ctx, selector)
        .await?
        .iter()
        .any(|text| !old_messages.contains(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::Pacer;
    use crate::testing::FakePage;
    use crate::workflow::cancel::CancellationSignal;

    const QUESTION: &str = r#"
        <div id="q" role="radiogroup">
            <label><input id="o1" type="radio"> Paris</label>
            <label><input id="o2" type="radio"> Lyon</label>
            <label><input id="o3" type="radio"></label>
        </div>
        <div id="fb"></div>"#;

    fn incorrect(text: &str) -> String {
        format!(r#"<div class="zb-explanation incorrect"><h3>Incorrect</h3><div>{text}</div></div>"#)
    }

    fn correct(text: &str) -> String {
        format!(r#"<div class="zb-explanation correct"><h3>Correct</h3><div>{text}</div></div>"#)
    }

    fn record(page: &FakePage) -> QuestionRecord {
        QuestionRecord::new(0, QuestionKind::ChoiceQuestion, page.handle("#q").unwrap(), false)
    }

    async fn run(page: &FakePage, cancel: &CancellationSignal) -> SolveOutcome {
        let (pacer, config) = (Pacer::from_seed(5), Config::default());
        let ctx = SolveCtx::new(page, &pacer, &config, cancel);
        ChoiceSolver::new().solve(&ctx, &record(page)).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_correct_option() {
        let page = FakePage::new(QUESTION);
        let wrong = incorrect("Paris is wrong here.");
        let right = correct("Lyon it is.");
        page.on_click("#o1", move |dom| dom.append_html("#fb", &wrong));
        page.on_click("#o2", move |dom| dom.append_html("#fb", &right));

        let outcome = run(&page, &CancellationSignal::new()).await;

        assert_eq!(outcome, SolveOutcome::Solved);
        assert_eq!(page.clicks_on("#o1"), 1);
        assert_eq!(page.clicks_on("#o2"), 1);
        assert_eq!(page.clicks_on("#o3"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_feedback_is_ignored() {
        // 上一道题留下的"正确"反馈，以及点击后重复出现的同一段文字，都不算新反馈
        let page = FakePage::new(&format!("{QUESTION}{}", correct("Earlier question done.")));
        let repeat = correct("Earlier question done.");
        page.on_click("#o1", move |dom| dom.append_html("#fb", &repeat));

        let outcome = run(&page, &CancellationSignal::new()).await;

        assert_eq!(outcome, SolveOutcome::Exhausted);
        assert_eq!(page.click_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_feedback_moves_on_within_budget() {
        let page = FakePage::new(QUESTION);
        let start = Instant::now();

        let outcome = run(&page, &CancellationSignal::new()).await;

        assert_eq!(outcome, SolveOutcome::Exhausted);
        assert_eq!(page.click_count(), 3);
        // 每个选项：滚动停顿 ≤ 400ms，等待反馈 ≤ 800ms，轮询约 2s
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(11), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_intercepted_option_uses_programmatic_click() {
        let page = FakePage::new(QUESTION);
        page.intercept("input");
        let right = correct("Yes.");
        page.on_click("#o1", move |dom| dom.append_html("#fb", &right));

        assert_eq!(run(&page, &CancellationSignal::new()).await, SolveOutcome::Solved);
        assert_eq!(page.clicks_on("#o1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_feedback_wait() {
        let page = FakePage::new(QUESTION);
        let cancel = CancellationSignal::new();
        let remote = cancel.clone();
        page.on_click("#o1", move |_| remote.set());

        let outcome = run(&page, &cancel).await;

        assert_eq!(outcome, SolveOutcome::Cancelled);
        assert_eq!(page.click_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_question_without_radios_is_abandoned() {
        let page = FakePage::new(r#"<div id="q" role="radiogroup"><p>empty</p></div>"#);
        let outcome = run(&page, &CancellationSignal::new()).await;
        assert!(matches!(outcome, SolveOutcome::Abandoned(_)));
        assert_eq!(page.click_count(), 0);
    }
}
