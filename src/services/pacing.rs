//! 随机等待 - 能力层
//!
//! 所有交互之间的停顿都从这里取值：正态分布采样后截断到 `[min, max]`，
//! 大部分取值靠近均值，偶尔出现偏长或偏短的停顿。
//!
//! 随机源可注入（`Pacer::from_seed`），测试里用固定种子得到可复现的结果。

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::trace;

/// 分布形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// 截断正态分布
    Bell,
    /// 均匀分布
    Uniform,
}

/// 一种停顿的分布参数（毫秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayModel {
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub shape: Shape,
}

impl DelayModel {
    /// 指定均值与标准差的截断正态分布
    pub const fn bell(mean_ms: f64, std_dev_ms: f64, min_ms: f64, max_ms: f64) -> Self {
        Self {
            mean_ms,
            std_dev_ms,
            min_ms,
            max_ms,
            shape: Shape::Bell,
        }
    }

    /// 以区间中点为均值、区间宽度的 1/6 为标准差
    ///
    /// 约 99.7% 的采样天然落在区间内，截断只处理极少数离群值。
    pub fn between(min_ms: u64, max_ms: u64) -> Self {
        let (lo, hi) = if min_ms <= max_ms { (min_ms, max_ms) } else { (max_ms, min_ms) };
        let (lo, hi) = (lo as f64, hi as f64);
        Self::bell((lo + hi) / 2.0, (hi - lo) / 6.0, lo, hi)
    }

    pub fn uniform(min_ms: u64, max_ms: u64) -> Self {
        let (lo, hi) = if min_ms <= max_ms { (min_ms, max_ms) } else { (max_ms, min_ms) };
        Self {
            mean_ms: (lo + hi) as f64 / 2.0,
            std_dev_ms: 0.0,
            min_ms: lo as f64,
            max_ms: hi as f64,
            shape: Shape::Uniform,
        }
    }

    // ========== 预设 ==========

    /// 同一题目内两次点击之间
    pub const fn quick_click() -> Self {
        Self::bell(200.0, 50.0, 100.0, 400.0)
    }

    /// 两道题之间
    pub const fn between_questions() -> Self {
        Self::bell(1250.0, 300.0, 500.0, 2000.0)
    }

    /// 页面加载或动画播放
    pub const fn page_load() -> Self {
        Self::bell(2000.0, 500.0, 1000.0, 4000.0)
    }

    /// 轮询反馈的间隔
    pub const fn feedback_check() -> Self {
        Self::bell(100.0, 25.0, 50.0, 200.0)
    }

    /// 从分布中取一个值
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        let ms = match self.shape {
            // 标准差不是正的有限值时直接取均值
            Shape::Bell if !(self.std_dev_ms.is_finite() && self.std_dev_ms > 0.0) => self.mean_ms,
            Shape::Bell => match Normal::new(self.mean_ms, self.std_dev_ms) {
                Ok(normal) => normal.sample(rng),
                Err(_) => self.mean_ms,
            },
            Shape::Uniform if self.min_ms < self.max_ms => rng.random_range(self.min_ms..=self.max_ms),
            Shape::Uniform => self.min_ms,
        };
        // 参数为 NaN 时取下界
        let ms = ms.min(self.max_ms).max(self.min_ms).max(0.0);
        Duration::from_micros((ms * 1000.0).round() as u64)
    }
}

/// 停顿发生器
///
/// 在整个运行中共享一个随机源。
pub struct Pacer {
    rng: Mutex<StdRng>,
}

impl Pacer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn sample(&self, model: &DelayModel) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        model.sample(&mut *rng)
    }

    /// 按分布取值并等待，返回实际等待的时长
    ///
    /// 等待过程中不响应取消，取消在下一个检查点生效。
    pub async fn pause(&self, model: &DelayModel) -> Duration {
        let delay = self.sample(model);
        trace!("pause {:?}", delay);
        tokio::time::sleep(delay).await;
        delay
    }

    /// `pause(&DelayModel::between(min, max))` 的简写
    pub async fn pause_between(&self, min_ms: u64, max_ms: u64) -> Duration {
        self.pause(&DelayModel::between(min_ms, max_ms)).await
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(d: Duration) -> f64 {
        d.as_micros() as f64 / 1000.0
    }

    #[test]
    fn test_samples_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        // 标准差远大于区间，大量采样会落在区间外，必须被截断
        let model = DelayModel::bell(500.0, 10_000.0, 300.0, 800.0);
        let mut hit_min = false;
        let mut hit_max = false;
        for _ in 0..2000 {
            let v = ms(model.sample(&mut rng));
            assert!((300.0..=800.0).contains(&v), "{v} out of bounds");
            hit_min |= v == 300.0;
            hit_max |= v == 800.0;
        }
        assert!(hit_min && hit_max);
    }

    #[test]
    fn test_between_derives_mean_and_spread() {
        let model = DelayModel::between(500, 1700);
        assert_eq!(model.mean_ms, 1100.0);
        assert_eq!(model.std_dev_ms, 200.0);
        assert_eq!((model.min_ms, model.max_ms), (500.0, 1700.0));

        let swapped = DelayModel::between(1700, 500);
        assert_eq!(swapped, model);
    }

    #[test]
    fn test_degenerate_models() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(ms(DelayModel::between(250, 250).sample(&mut rng)), 250.0);
        assert_eq!(ms(DelayModel::uniform(40, 40).sample(&mut rng)), 40.0);
        // 标准差为负、为零或为 NaN 时都退化为均值
        assert_eq!(ms(DelayModel::bell(120.0, -1.0, 50.0, 200.0).sample(&mut rng)), 120.0);
        assert_eq!(ms(DelayModel::bell(120.0, 0.0, 50.0, 200.0).sample(&mut rng)), 120.0);
        assert_eq!(ms(DelayModel::bell(120.0, f64::NAN, 50.0, 200.0).sample(&mut rng)), 120.0);
    }

    #[test]
    fn test_uniform_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let model = DelayModel::uniform(100, 200);
        for _ in 0..500 {
            let v = ms(model.sample(&mut rng));
            assert!((100.0..=200.0).contains(&v));
        }
    }

    #[test]
    fn test_seeded_pacers_are_reproducible() {
        let a = Pacer::from_seed(42);
        let b = Pacer::from_seed(42);
        let model = DelayModel::between_questions();
        let xs: Vec<_> = (0..20).map(|_| a.sample(&model)).collect();
        let ys: Vec<_> = (0..20).map(|_| b.sample(&model)).collect();
        assert_eq!(xs, ys);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_for_sampled_duration() {
        let pacer = Pacer::from_seed(9);
        let start = tokio::time::Instant::now();
        let slept = pacer.pause(&DelayModel::quick_click()).await;
        assert!(start.elapsed() >= slept);
        assert!((100.0..=400.0).contains(&ms(slept)));
    }
}
