use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::infrastructure::ElementHandle;

/// 题目类型
///
/// 声明顺序即"全部求解"时的分组顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum QuestionKind {
    ChoiceQuestion,
    Animation,
    ShortAnswer,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 3] = [
        QuestionKind::ChoiceQuestion,
        QuestionKind::Animation,
        QuestionKind::ShortAnswer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::ChoiceQuestion => "Choice",
            QuestionKind::Animation => "Animation",
            QuestionKind::ShortAnswer => "Short Answer",
        }
    }

    /// 批量汇总行里使用的复数名词
    pub fn noun(self) -> &'static str {
        match self {
            QuestionKind::Animation => "animations",
            QuestionKind::ChoiceQuestion | QuestionKind::ShortAnswer => "questions",
        }
    }

    /// 单条记录日志行的前缀
    pub fn item(self) -> &'static str {
        match self {
            QuestionKind::Animation => "Animation",
            QuestionKind::ChoiceQuestion | QuestionKind::ShortAnswer => "Question",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次扫描识别出的一个题目
///
/// `handle` 只在本轮 扫描→筛选→求解 内有效，不能跨页面或跨扫描缓存。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionRecord {
    /// 扫描顺序中的位置（从 0 开始）
    pub index: usize,
    pub kind: QuestionKind,
    pub handle: ElementHandle,
    /// 扫描时刻的完成状态
    pub completed: bool,
    /// 预留的扩展信息，目前始终为空
    pub details: BTreeMap<String, String>,
}

impl QuestionRecord {
    pub fn new(index: usize, kind: QuestionKind, handle: ElementHandle, completed: bool) -> Self {
        Self {
            index,
            kind,
            handle,
            completed,
            details: BTreeMap::new(),
        }
    }
}

/// 扫描结果：按文档顺序排列的题目
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    pub records: Vec<QuestionRecord>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn of_kind(&self, kind: QuestionKind) -> impl Iterator<Item = &QuestionRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    /// (总数, 已完成数)
    pub fn counts(&self, kind: QuestionKind) -> (usize, usize) {
        let total = self.of_kind(kind).count();
        let completed = self.of_kind(kind).filter(|r| r.completed).count();
        (total, completed)
    }
}

impl IntoIterator for ScanResult {
    type Item = QuestionRecord;
    type IntoIter = std::vec::IntoIter<QuestionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_order_follows_declaration() {
        let mut kinds = vec![QuestionKind::ShortAnswer, QuestionKind::ChoiceQuestion, QuestionKind::Animation];
        kinds.sort();
        assert_eq!(kinds, QuestionKind::ALL.to_vec());
    }

    #[test]
    fn test_counts_per_kind() {
        let scan = ScanResult {
            records: vec![
                QuestionRecord::new(0, QuestionKind::Animation, ElementHandle(1), true),
                QuestionRecord::new(1, QuestionKind::Animation, ElementHandle(2), false),
                QuestionRecord::new(2, QuestionKind::ChoiceQuestion, ElementHandle(3), false),
            ],
        };
        assert_eq!(scan.counts(QuestionKind::Animation), (2, 1));
        assert_eq!(scan.counts(QuestionKind::ChoiceQuestion), (1, 0));
        assert_eq!(scan.counts(QuestionKind::ShortAnswer), (0, 0));
        assert!(scan.records.iter().all(|r| r.details.is_empty()));
    }
}
