//! 动画求解流程
//!
//! ```text
//! Idle → Started → SpeedBoosted → Playing → Completed
//!                                    ↓ 超过重试上限
//!                                 Exhausted
//! ```
//!
//! 播放阶段每一轮：等待 → 尝试点击一次 Play → 短暂等待 → 严格判定。
//! 严格判定要求完成标记同时带有 filled class 和 "Activity completed" 标签。

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::{AppResult, DriverResult};
use crate::infrastructure::ElementHandle;
use crate::models::{QuestionKind, QuestionRecord};
use crate::services::interaction::{find_indicator, Indicator};
use crate::services::pacing::DelayModel;
use crate::services::scanner::ANIMATION_INDICATOR_LEVELS;
use crate::workflow::solve_ctx::SolveCtx;
use crate::workflow::solver::{SolveOutcome, Solver};

const START_SETTLE: DelayModel = DelayModel::bell(400.0, 100.0, 250.0, 650.0);
const SPEED_SETTLE: DelayModel = DelayModel::bell(150.0, 40.0, 80.0, 250.0);
/// 每轮点击 Play 之前
const CYCLE_WAIT: DelayModel = DelayModel::bell(2000.0, 100.0, 1800.0, 2200.0);
/// 点击 Play 之后、判定之前
const AFTER_PLAY: DelayModel = DelayModel::bell(200.0, 50.0, 100.0, 300.0);

/// 动画求解器
#[derive(Debug, Default)]
pub struct AnimationSolver;

impl AnimationSolver {
    pub fn new() -> Self {
        Self
    }

    /// 没有 Start 按钮视为已经开始
    async fn start(&self, ctx: &SolveCtx<'_>, animation: ElementHandle) -> DriverResult<()> {
        match ctx.driver.find_first(Some(animation), &ctx.selectors().start_button).await? {
            Some(button) => {
                info!("Clicking Start button...");
                ctx.activate(button, "Start button").await?;
                ctx.pause(&START_SETTLE).await;
            }
            None => info!("Start button not found (may already be started)"),
        }
        Ok(())
    }

    async fn enable_speed(&self, ctx: &SolveCtx<'_>, animation: ElementHandle) -> DriverResult<()> {
        let Some(checkbox) = ctx
            .driver
            .find_first(Some(animation), &ctx.selectors().speed_checkbox)
            .await?
        else {
            info!("2x speed checkbox not found (may not be available)");
            return Ok(());
        };

        if ctx.driver.is_selected(checkbox).await? {
            info!("2x speed already enabled");
            return Ok(());
        }

        info!("Enabling 2x speed...");
        ctx.activate(checkbox, "2x speed checkbox").await?;
        ctx.pause(&SPEED_SETTLE).await;
        Ok(())
    }

    /// 只尝试一次，失败留到下一轮
    async fn click_play(&self, ctx: &SolveCtx<'_>, animation: ElementHandle) -> DriverResult<()> {
        match ctx.driver.find_first(Some(animation), &ctx.selectors().play_button).await {
            Ok(Some(button)) => match ctx.activate(button, "Play button").await {
                Ok(()) => Ok(()),
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => {
                    info!("Could not click play button: {}, will retry in next cycle", e);
                    Ok(())
                }
            },
            Ok(None) => {
                info!("Play button not found, will retry in next cycle");
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                info!("Could not click play button: {}, will retry in next cycle", e);
                Ok(())
            }
        }
    }

    async fn is_complete(&self, ctx: &SolveCtx<'_>, animation: ElementHandle) -> DriverResult<bool> {
        let selectors = ctx.selectors();
        let strict = Indicator::filled(&selectors.animation_chevron, &selectors.filled_marker)
            .with_label(&selectors.animation_completed_label);

        match find_indicator(ctx.driver, animation, ANIMATION_INDICATOR_LEVELS, &strict).await {
            Ok(done) => Ok(done),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("✗ Error checking completion: {}", e);
                Ok(false)
            }
        }
    }

    async fn play_until_complete(&self, ctx: &SolveCtx<'_>, animation: ElementHandle) -> DriverResult<SolveOutcome> {
        let max_attempts = ctx.timing().max_retries;

        for attempt in 1..=max_attempts {
            if ctx.should_stop() {
                return Ok(SolveOutcome::Cancelled);
            }

            info!("Play cycle {}/{}...", attempt, max_attempts);
            ctx.pause(&CYCLE_WAIT).await;
            if ctx.should_stop() {
                return Ok(SolveOutcome::Cancelled);
            }

            self.click_play(ctx, animation).await?;
            ctx.pause(&AFTER_PLAY).await;

            if self.is_complete(ctx, animation).await? {
                info!("✓ Animation completed after {} play cycles", attempt);
                return Ok(SolveOutcome::Solved);
            }
        }

        error!("✗ Animation did not complete after {} attempts", max_attempts);
        Ok(SolveOutcome::Exhausted)
    }
}

#[async_trait]
impl Solver for AnimationSolver {
    fn kind(&self) -> QuestionKind {
        QuestionKind::Animation
    }

    fn name(&self) -> &'static str {
        "Animation Solver"
    }

    async fn solve(&self, ctx: &SolveCtx<'_>, record: &QuestionRecord) -> AppResult<SolveOutcome> {
        let animation = record.handle;

        if let Err(e) = self.start(ctx, animation).await {
            if e.is_fatal() {
                return Err(e.into());
            }
            error!("✗ Error clicking start button: {}", e);
            return Ok(SolveOutcome::Abandoned(e.to_string()));
        }

        if ctx.should_stop() {
            return Ok(SolveOutcome::Cancelled);
        }

        if let Err(e) = self.enable_speed(ctx, animation).await {
            if e.is_fatal() {
                return Err(e.into());
            }
            error!("✗ Error enabling 2x speed: {}", e);
        }

        let outcome = self.play_until_complete(ctx, animation).await?;
        if outcome.is_solved() {
            info!("✓ Animation completed successfully!");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::services::Pacer;
    use crate::testing::{Dom, FakePage};
    use crate::workflow::cancel::CancellationSignal;

    const PLAYER: &str = r#"
        <div class="interactive-activity-container animation-player-content-resource">
            <div class="activity-title-bar">
                <div class="zb-chevron title-bar-chevron" aria-label="Activity not completed"></div>
            </div>
            <div id="anim" class="animation-player">
                <div class="animation-controls">
                    <button class="start-button start-graphic">Start</button>
                    <div class="speed-control"><input id="speed" type="checkbox"></div>
                    <button id="play" aria-label="Play">Play</button>
                </div>
            </div>
        </div>"#;

    const CHEVRON: &str = "div.zb-chevron";

    fn mark_filled(dom: &mut Dom) {
        dom.add_class(CHEVRON, "filled");
    }

    fn mark_labelled(dom: &mut Dom) {
        dom.set_attr(CHEVRON, "aria-label", "Activity completed");
    }

    /// 第 `n` 次点击 Play 时执行 `finish`
    fn complete_on_play(page: &FakePage, n: usize, finish: fn(&mut Dom)) {
        let clicks = Arc::new(AtomicUsize::new(0));
        page.on_click("#play", move |dom| {
            if clicks.fetch_add(1, Ordering::SeqCst) + 1 == n {
                finish(dom);
            }
        });
    }

    async fn run(page: &FakePage, max_retries: usize, cancel: &CancellationSignal) -> SolveOutcome {
        let pacer = Pacer::from_seed(11);
        let mut config = Config::default();
        config.timing.max_retries = max_retries;
        let ctx = SolveCtx::new(page, &pacer, &config, cancel);
        let record = QuestionRecord::new(0, QuestionKind::Animation, page.handle("#anim").unwrap(), false);
        AnimationSolver::new().solve(&ctx, &record).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_until_strict_completion() {
        let page = FakePage::new(PLAYER);
        complete_on_play(&page, 3, |dom| {
            mark_filled(dom);
            mark_labelled(dom);
        });

        let outcome = run(&page, 60, &CancellationSignal::new()).await;

        assert_eq!(outcome, SolveOutcome::Solved);
        assert_eq!(page.clicks_on("button.start-button"), 1);
        assert_eq!(page.clicks_on("#speed"), 1);
        assert_eq!(page.clicks_on("#play"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filled_without_label_is_not_complete() {
        let page = FakePage::new(PLAYER);
        complete_on_play(&page, 1, mark_filled);

        let outcome = run(&page, 5, &CancellationSignal::new()).await;

        assert_eq!(outcome, SolveOutcome::Exhausted);
        assert_eq!(page.clicks_on("#play"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_label_without_filled_is_not_complete() {
        let page = FakePage::new(PLAYER);
        complete_on_play(&page, 1, mark_labelled);

        let outcome = run(&page, 4, &CancellationSignal::new()).await;

        assert_eq!(outcome, SolveOutcome::Exhausted);
        assert_eq!(page.clicks_on("#play"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_start_and_speed_are_not_fatal() {
        let page = FakePage::new(PLAYER);
        page.with_dom(|dom| {
            dom.remove("button.start-button");
            dom.remove("div.speed-control");
        });
        complete_on_play(&page, 1, |dom| {
            mark_filled(dom);
            mark_labelled(dom);
        });

        assert_eq!(run(&page, 60, &CancellationSignal::new()).await, SolveOutcome::Solved);
        assert_eq!(page.click_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_already_enabled_is_left_alone() {
        let page = FakePage::new(&PLAYER.replace(r#"type="checkbox""#, r#"type="checkbox" checked"#));
        complete_on_play(&page, 2, |dom| {
            mark_filled(dom);
            mark_labelled(dom);
        });

        assert_eq!(run(&page, 60, &CancellationSignal::new()).await, SolveOutcome::Solved);
        assert_eq!(page.clicks_on("#speed"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_play_button_retries_until_cap() {
        let page = FakePage::new(PLAYER);
        page.with_dom(|dom| dom.remove("#play"));

        let start = tokio::time::Instant::now();
        assert_eq!(run(&page, 3, &CancellationSignal::new()).await, SolveOutcome::Exhausted);
        // 每轮至少等待 1.8s + 0.1s
        assert!(start.elapsed() >= std::time::Duration::from_millis(3 * 1900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_play_loop() {
        let page = FakePage::new(PLAYER);
        let cancel = CancellationSignal::new();
        let remote = cancel.clone();
        page.on_click("#play", move |_| remote.set());

        let outcome = run(&page, 60, &cancel).await;

        assert_eq!(outcome, SolveOutcome::Cancelled);
        assert_eq!(page.clicks_on("#play"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_start_skips_speed_and_play() {
        let page = FakePage::new(PLAYER);
        let cancel = CancellationSignal::new();
        let remote = cancel.clone();
        page.on_click("button.start-button", move |_| remote.set());

        let outcome = run(&page, 60, &cancel).await;

        assert_eq!(outcome, SolveOutcome::Cancelled);
        assert_eq!(page.clicks_on("button.start-button"), 1);
        assert_eq!(page.clicks_on("#speed"), 0);
        assert_eq!(page.clicks_on("#play"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_cycle_wait_skips_play() {
        let page = FakePage::new(PLAYER);
        let cancel = CancellationSignal::new();
        let remote = cancel.clone();
        // 开始播放循环后，在第一轮等待期间收到停止
        page.on_click("#speed", move |_| {
            let remote = remote.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
                remote.set();
            });
        });

        let outcome = run(&page, 60, &cancel).await;

        assert_eq!(outcome, SolveOutcome::Cancelled);
        assert_eq!(page.clicks_on("#speed"), 1);
        assert_eq!(page.clicks_on("#play"), 0);
    }
}
