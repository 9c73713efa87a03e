//! 停止信号
//!
//! 一旦设置就保持设置状态，直到下一次运行开始时被清除。
//! 所有循环和轮询在每一轮开始前检查它。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    stop: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求停止
    pub fn set(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// 新的运行开始时清除
    pub fn clear(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
