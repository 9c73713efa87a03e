use serde::Serialize;

use crate::models::question::QuestionKind;
use crate::models::request::RunMode;

/// 单个求解器一次批量处理的统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub kind: QuestionKind,
    /// 实际开始处理的记录数
    pub attempted: usize,
    pub solved: usize,
    /// 已提交但未观察到完成标记
    pub unconfirmed: usize,
    /// 批次总记录数
    pub total: usize,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn new(kind: QuestionKind, total: usize) -> Self {
        Self {
            kind,
            attempted: 0,
            solved: 0,
            unconfirmed: 0,
            total,
            cancelled: false,
        }
    }

    /// 例如 `Completed! Solved 2/3 questions`
    pub fn summary_line(&self) -> String {
        format!("Completed! Solved {}/{} {}", self.solved, self.total, self.kind.noun())
    }
}

/// 每种题目类型的累计统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    pub attempted: usize,
    pub solved: usize,
    pub unconfirmed: usize,
}

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub force_mode: bool,
    /// 扫描过的页面数
    pub pages: usize,
    /// 最近一次扫描识别出的题目数
    pub scanned: usize,
    pub choice: KindTotals,
    pub animation: KindTotals,
    pub short_answer: KindTotals,
    pub cancelled: bool,
}

impl RunReport {
    pub fn new(mode: RunMode, force_mode: bool) -> Self {
        Self {
            mode,
            force_mode,
            pages: 0,
            scanned: 0,
            choice: KindTotals::default(),
            animation: KindTotals::default(),
            short_answer: KindTotals::default(),
            cancelled: false,
        }
    }

    pub fn totals(&self, kind: QuestionKind) -> &KindTotals {
        match kind {
            QuestionKind::ChoiceQuestion => &self.choice,
            QuestionKind::Animation => &self.animation,
            QuestionKind::ShortAnswer => &self.short_answer,
        }
    }

    /// 合并一个批次的统计
    pub fn absorb(&mut self, batch: &BatchReport) {
        let totals = match batch.kind {
            QuestionKind::ChoiceQuestion => &mut self.choice,
            QuestionKind::Animation => &mut self.animation,
            QuestionKind::ShortAnswer => &mut self.short_answer,
        };
        totals.attempted += batch.attempted;
        totals.solved += batch.solved;
        totals.unconfirmed += batch.unconfirmed;
        self.cancelled |= batch.cancelled;
    }

    pub fn solved(&self) -> usize {
        QuestionKind::ALL.iter().map(|&k| self.totals(k).solved).sum()
    }

    pub fn attempted(&self) -> usize {
        QuestionKind::ALL.iter().map(|&k| self.totals(k).attempted).sum()
    }
}
