use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置
///
/// 启动时读取一次，运行期间只读。
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标URL
    pub target_url: String,
    /// 是否启动新的浏览器窗口（否则连接已打开的浏览器）
    pub launch_browser: bool,
    /// 浏览器可执行文件路径（仅启动模式使用）
    pub chrome_executable: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 节奏与重试参数
    pub timing: Timing,
    /// 页面结构选择器
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: "https://learn.zybooks.com".to_string(),
            launch_browser: false,
            chrome_executable: None,
            verbose_logging: false,
            output_log_file: "solver_log.txt".to_string(),
            timing: Timing::default(),
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        let mut config = Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            launch_browser: std::env::var("LAUNCH_BROWSER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.launch_browser),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            timing: default.timing,
            selectors: default.selectors,
        };

        if let Ok(path) = std::env::var("SOLVER_CONFIG") {
            config.apply_file(Path::new(&path))?;
        }

        config.timing.validate()?;
        Ok(config)
    }

    /// 用 TOML 文件中的 `[timing]` / `[selectors]` 覆盖默认值
    pub fn apply_file(&mut self, path: &Path) -> AppResult<()> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        self.apply_toml(&content).map_err(|e| match e {
            AppError::Config(ConfigError::TomlParseFailed { source, .. }) => {
                AppError::Config(ConfigError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    pub fn apply_toml(&mut self, content: &str) -> AppResult<()> {
        let file: ConfigFile = toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: String::new(),
            source,
        })?;
        if let Some(timing) = file.timing {
            self.timing = timing;
        }
        if let Some(selectors) = file.selectors {
            self.selectors = selectors;
        }
        self.timing.validate()
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    timing: Option<Timing>,
    selectors: Option<Selectors>,
}

/// 节奏与重试参数（毫秒）
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timing {
    pub min_between_questions_ms: u64,
    pub max_between_questions_ms: u64,
    pub check_interval_ms: u64,
    /// 选择题等待新反馈的总时长
    pub feedback_budget_ms: u64,
    /// 简答题提交后等待完成标记的总时长
    pub completion_budget_ms: u64,
    pub max_retries: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            min_between_questions_ms: 500,
            max_between_questions_ms: 1700,
            check_interval_ms: 100,
            feedback_budget_ms: 2000,
            completion_budget_ms: 2000,
            max_retries: 60,
        }
    }
}

impl Timing {
    fn validate(&self) -> AppResult<()> {
        if self.min_between_questions_ms > self.max_between_questions_ms {
            return Err(AppError::invalid_config(
                "min_between_questions_ms",
                "must not exceed max_between_questions_ms",
            ));
        }
        if self.max_retries == 0 {
            return Err(AppError::invalid_config("max_retries", "must be at least 1"));
        }
        if self.check_interval_ms == 0 {
            return Err(AppError::invalid_config("check_interval_ms", "must be at least 1"));
        }
        Ok(())
    }
}

/// 页面结构选择器
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Selectors {
    // --- 扫描 ---
    /// 候选元素（逗号分隔的多个选择器）
    pub candidates: String,
    pub animation_container_marker: String,
    pub animation_player_marker: String,
    pub animation_controls: String,
    pub short_answer_marker: String,
    pub choice_container_marker: String,
    pub choice_group_role: String,
    /// 单个选项包装元素的 class 标记，命中即不是题目
    pub option_wrapper_markers: Vec<String>,
    pub filled_marker: String,

    // --- 动画 ---
    pub animation_chevron: String,
    pub animation_completed_label: String,
    pub speed_checkbox: String,
    pub start_button: String,
    pub play_button: String,

    // --- 选择题 ---
    pub radio_input: String,
    pub question_chevron: String,
    pub feedback: String,
    pub feedback_correct: String,
    pub feedback_incorrect: String,
    pub feedback_message: String,

    // --- 简答题 ---
    pub chevron: String,
    pub show_answer: String,
    pub check: String,
    pub answer_inputs: Vec<String>,
    pub answer: String,
    pub answer_fallback: String,

    // --- 导航 ---
    pub next_section_icon: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            candidates: "div.animation-player, div.animation-player-content-resource, \
                         div.interactive-activity-container, div[role=\"radiogroup\"], \
                         div.question-choices, div.short-answer-question"
                .to_string(),
            animation_container_marker: "animation-player-content-resource".to_string(),
            animation_player_marker: "animation-player".to_string(),
            animation_controls: "div.animation-controls".to_string(),
            short_answer_marker: "short-answer-question".to_string(),
            choice_container_marker: "question-choices".to_string(),
            choice_group_role: "radiogroup".to_string(),
            option_wrapper_markers: vec!["zb-radio-button".to_string(), "radio-button".to_string()],
            filled_marker: "filled".to_string(),

            animation_chevron: "div[class*=\"zb-chevron\"][class*=\"title-bar-chevron\"]".to_string(),
            animation_completed_label: "Activity completed".to_string(),
            speed_checkbox: "div[class*=\"speed-control\"] input[type=\"checkbox\"]".to_string(),
            start_button: "button[class*=\"start-button\"]".to_string(),
            play_button: "button[aria-label=\"Play\"]".to_string(),

            radio_input: "input[type=\"radio\"]".to_string(),
            question_chevron: "div.zb-chevron.question-chevron".to_string(),
            feedback: "div.zb-explanation".to_string(),
            feedback_correct: "div.zb-explanation.correct".to_string(),
            feedback_incorrect: "div.zb-explanation.incorrect".to_string(),
            feedback_message: "div".to_string(),

            chevron: "div.zb-chevron".to_string(),
            show_answer: "button.show-answer-button".to_string(),
            check: "button.check-button".to_string(),
            answer_inputs: vec![
                "textarea.zb-text-area".to_string(),
                "textarea".to_string(),
                "input.zb-input".to_string(),
                "input[type=\"text\"]".to_string(),
            ],
            answer: "div.answers span.forfeit-answer".to_string(),
            answer_fallback: "span.forfeit-answer".to_string(),

            next_section_icon: "a.nav-link i[aria-label=\"arrow_downward\"]".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_platform() {
        let config = Config::default();
        assert_eq!(config.timing.max_retries, 60);
        assert_eq!(config.timing.min_between_questions_ms, 500);
        assert_eq!(config.timing.max_between_questions_ms, 1700);
        assert!(config.selectors.candidates.contains("div[role=\"radiogroup\"]"));
    }

    #[test]
    fn test_toml_overrides_only_given_fields() {
        let mut config = Config::default();
        config
            .apply_toml(
                r#"
                [timing]
                max_retries = 5

                [selectors]
                play_button = "button.play"
                "#,
            )
            .unwrap();

        assert_eq!(config.timing.max_retries, 5);
        assert_eq!(config.timing.check_interval_ms, 100);
        assert_eq!(config.selectors.play_button, "button.play");
        assert_eq!(config.selectors.check, "button.check-button");
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_toml(
                r#"
                [timing]
                min_between_questions_ms = 900
                max_between_questions_ms = 100
                "#,
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let mut config = Config::default();
        let err = config.apply_toml("[timing\nmax_retries = ").unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::TomlParseFailed { .. })));
    }
}
