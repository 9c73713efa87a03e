//! 题目识别 - 能力层
//!
//! 在当前页面中查询少量候选元素，逐个判定类型和完成状态，按文档顺序返回。
//!
//! 判定顺序固定为 Animation → ShortAnswer → ChoiceQuestion：
//! 结构标记并不完全互斥，更具体的规则必须先于宽松的规则。

use tracing::{debug, info};

use crate::config::Selectors;
use crate::error::{AppResult, DriverResult};
use crate::infrastructure::{Driver, ElementHandle};
use crate::models::{QuestionKind, QuestionRecord, ScanResult};
use crate::services::interaction::{find_indicator, nearest_indicator, Indicator};
use crate::utils::logging::log_scan_results;

/// 动画完成标记最多向上查找的层数
pub const ANIMATION_INDICATOR_LEVELS: usize = 5;
/// 选择题从父元素开始查找的层数（父、祖父）
pub const CHOICE_INDICATOR_LEVELS: usize = 2;

/// 扫描当前页面
///
/// 单个候选元素判定失败只会丢弃该元素；会话错误向上传递。
pub async fn scan(driver: &dyn Driver, selectors: &Selectors) -> AppResult<ScanResult> {
    info!("Scanning page for all questions...");

    let candidates = driver.find_all(None, &selectors.candidates).await?;
    debug!("{} candidate elements", candidates.len());

    let mut records = Vec::new();
    for element in candidates {
        match classify(driver, selectors, element).await {
            Ok(Some((kind, completed))) => {
                records.push(QuestionRecord::new(records.len(), kind, element, completed));
            }
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => debug!("skipping candidate {}: {}", element, e),
        }
    }

    let result = ScanResult { records };
    log_scan_results(&result);
    Ok(result)
}

/// 判定单个候选元素，不是题目时返回 `None`
pub async fn classify(
    driver: &dyn Driver,
    selectors: &Selectors,
    element: ElementHandle,
) -> DriverResult<Option<(QuestionKind, bool)>> {
    let class = driver.class_name(element).await?;

    if is_animation(driver, selectors, element, &class).await? {
        let completed = is_animation_complete(driver, selectors, element).await?;
        return Ok(Some((QuestionKind::Animation, completed)));
    }

    if class.contains(&selectors.short_answer_marker) {
        let filled = Indicator::filled(&selectors.chevron, &selectors.filled_marker);
        let completed = find_indicator(driver, element, 1, &filled).await?;
        return Ok(Some((QuestionKind::ShortAnswer, completed)));
    }

    if is_choice_question(driver, selectors, element, &class).await? {
        let completed = is_choice_complete(driver, selectors, element).await?;
        return Ok(Some((QuestionKind::ChoiceQuestion, completed)));
    }

    Ok(None)
}

async fn is_animation(
    driver: &dyn Driver,
    selectors: &Selectors,
    element: ElementHandle,
    class: &str,
) -> DriverResult<bool> {
    if class.contains(&selectors.animation_container_marker) {
        return Ok(true);
    }
    if !class.contains(&selectors.animation_player_marker) {
        return Ok(false);
    }
    // 播放器 class 还不够，必须带有控制区
    if driver.find_first(Some(element), &selectors.start_button).await?.is_some() {
        return Ok(true);
    }
    Ok(driver
        .find_first(Some(element), &selectors.animation_controls)
        .await?
        .is_some())
}

/// 宽松判定：最近的完成标记带有 filled
///
/// 从元素起最多向上五层，每层取第一个完成标记，不限定在本活动的容器内；
/// 几个活动共用同一父元素时可能读到相邻活动的标记。求解时由严格判定复核。
async fn is_animation_complete(driver: &dyn Driver, selectors: &Selectors, element: ElementHandle) -> DriverResult<bool> {
    match nearest_indicator(driver, element, ANIMATION_INDICATOR_LEVELS, &selectors.chevron).await? {
        Some(chevron) => Ok(driver.class_name(chevron).await?.contains(&selectors.filled_marker)),
        None => Ok(false),
    }
}

async fn is_choice_question(
    driver: &dyn Driver,
    selectors: &Selectors,
    element: ElementHandle,
    class: &str,
) -> DriverResult<bool> {
    // 单个选项的包装元素不是题目
    if selectors.option_wrapper_markers.iter().any(|m| class.contains(m.as_str())) {
        return Ok(false);
    }

    let role = driver.attribute(element, "role").await?;
    let is_group = role.as_deref() == Some(selectors.choice_group_role.as_str())
        || class.contains(&selectors.choice_container_marker);
    if !is_group {
        return Ok(false);
    }

    Ok(driver
        .find_first(Some(element), &selectors.radio_input)
        .await?
        .is_some())
}

async fn is_choice_complete(driver: &dyn Driver, selectors: &Selectors, element: ElementHandle) -> DriverResult<bool> {
    if let Some(parent) = driver.parent(element).await? {
        let filled = Indicator::filled(&selectors.question_chevron, &selectors.filled_marker);
        if find_indicator(driver, parent, CHOICE_INDICATOR_LEVELS, &filled).await? {
            return Ok(true);
        }
    }

    // 找不到标记时，以"是否已有选项被选中"为准
    for radio in driver.find_all(Some(element), &selectors.radio_input).await? {
        if driver.is_selected(radio).await? {
            return Ok(true);
        }
    }
    Ok(false)
}
