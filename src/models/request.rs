use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::question::QuestionKind;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunMode {
    ScanOnly,
    SolveAllOnPage,
    SolveAllContinuous,
    SolveChoice,
    SolveAnimation,
    SolveShortAnswer,
}

impl RunMode {
    /// 单一类型模式对应的题目类型，"全部"类模式返回 `None`
    pub fn target_kind(self) -> Option<QuestionKind> {
        match self {
            RunMode::SolveChoice => Some(QuestionKind::ChoiceQuestion),
            RunMode::SolveAnimation => Some(QuestionKind::Animation),
            RunMode::SolveShortAnswer => Some(QuestionKind::ShortAnswer),
            RunMode::ScanOnly | RunMode::SolveAllOnPage | RunMode::SolveAllContinuous => None,
        }
    }

    pub fn is_solve_all(self) -> bool {
        matches!(self, RunMode::SolveAllOnPage | RunMode::SolveAllContinuous)
    }

    pub fn label(self) -> &'static str {
        match self {
            RunMode::ScanOnly => "Scan Only",
            RunMode::SolveAllOnPage => "Solve All On Page",
            RunMode::SolveAllContinuous => "Solve All (Continuous)",
            RunMode::SolveChoice => "Solve Radio Questions",
            RunMode::SolveAnimation => "Solve Animations",
            RunMode::SolveShortAnswer => "Solve Short Answer",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 无法识别的模式名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action '{}'", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for RunMode {
    type Err = UnknownMode;

    /// 接受控制台短命令，也接受完整的菜单名称（不区分大小写）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let mode = match normalized.as_str() {
            "scan" | "scan only" => RunMode::ScanOnly,
            "all" | "solve all on page" => RunMode::SolveAllOnPage,
            "continuous" | "solve all (continuous)" => RunMode::SolveAllContinuous,
            "choice" | "radio" | "solve radio questions" => RunMode::SolveChoice,
            "animation" | "animations" | "solve animations" => RunMode::SolveAnimation,
            "short" | "short_answer" | "solve short answer" => RunMode::SolveShortAnswer,
            _ => return Err(UnknownMode(s.trim().to_string())),
        };
        Ok(mode)
    }
}

/// 操作员的一次运行请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunRequest {
    pub mode: RunMode,
    /// 为 true 时已完成的题目也会重新求解
    pub force_mode: bool,
}

impl RunRequest {
    pub fn new(mode: RunMode, force_mode: bool) -> Self {
        Self { mode, force_mode }
    }
}

impl FromStr for RunRequest {
    type Err = UnknownMode;

    /// `<mode> [force]`，例如 `all force`、`Solve All On Page`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (mode, force_mode) = match trimmed.rsplit_once(char::is_whitespace) {
            Some((head, tail)) if tail.eq_ignore_ascii_case("force") => (head, true),
            _ => (trimmed, false),
        };
        Ok(Self::new(mode.parse()?, force_mode))
    }
}
