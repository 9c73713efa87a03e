//! 求解上下文
//!
//! 封装"用哪个会话、按什么节奏、在什么配置下、是否已被要求停止"这一信息，
//! 显式传入每个长时间运行的调用。

use tracing::info;

use crate::config::{Config, Selectors, Timing};
use crate::error::DriverResult;
use crate::infrastructure::{Driver, ElementHandle};
use crate::services::interaction::{self, SCROLL_SETTLE};
use crate::services::pacing::{DelayModel, Pacer};
use crate::workflow::cancel::CancellationSignal;

/// 求解上下文（只包含借用，可随意复制）
#[derive(Clone, Copy)]
pub struct SolveCtx<'a> {
    pub driver: &'a dyn Driver,
    pub pacer: &'a Pacer,
    pub config: &'a Config,
    pub cancel: &'a CancellationSignal,
}

impl<'a> SolveCtx<'a> {
    pub fn new(driver: &'a dyn Driver, pacer: &'a Pacer, config: &'a Config, cancel: &'a CancellationSignal) -> Self {
        Self {
            driver,
            pacer,
            config,
            cancel,
        }
    }

    pub fn selectors(&self) -> &'a Selectors {
        &self.config.selectors
    }

    pub fn timing(&self) -> &'a Timing {
        &self.config.timing
    }

    /// 检查停止信号，已设置时记录一行日志
    pub fn should_stop(&self) -> bool {
        if self.cancel.is_set() {
            info!("Stop requested by user");
            return true;
        }
        false
    }

    pub async fn pause(&self, model: &DelayModel) {
        self.pacer.pause(model).await;
    }

    /// 两道题之间的停顿
    pub async fn pause_between_questions(&self) {
        let timing = self.timing();
        self.pacer
            .pause_between(timing.min_between_questions_ms, timing.max_between_questions_ms)
            .await;
    }

    /// 轮询间隔：以 `check_interval_ms` 为均值的短停顿
    pub async fn pause_poll(&self) {
        let interval = self.timing().check_interval_ms as f64;
        let model = DelayModel::bell(interval, interval / 4.0, interval / 2.0, interval * 1.5);
        self.pacer.pause(&model).await;
    }

    /// 滚动、停顿后点击，被拦截时改用程序化点击
    pub async fn activate(&self, element: ElementHandle, name: &str) -> DriverResult<()> {
        interaction::activate(self.driver, self.pacer, element, &SCROLL_SETTLE, name).await
    }
}
