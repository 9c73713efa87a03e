//! 单个元素的交互能力 - 能力层
//!
//! - `activate`：滚动到视口中央 → 短暂停顿 → 直接点击，被遮挡时改用程序化点击
//! - `find_indicator` / `nearest_indicator`：从某个元素出发逐级向上查找完成标记

use tracing::{debug, info};

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::{Driver, ElementHandle};
use crate::services::pacing::{DelayModel, Pacer};

/// 滚动后、点击前的停顿
pub const SCROLL_SETTLE: DelayModel = DelayModel::bell(150.0, 40.0, 80.0, 250.0);

/// 点击元素
///
/// 拦截在这里消化掉；元素失效和会话错误原样返回。
pub async fn activate(
    driver: &dyn Driver,
    pacer: &Pacer,
    element: ElementHandle,
    settle: &DelayModel,
    name: &str,
) -> DriverResult<()> {
    driver.scroll_into_view(element).await?;
    pacer.pause(settle).await;

    match driver.click(element).await {
        Ok(()) => Ok(()),
        Err(DriverError::Intercepted(_)) => {
            info!("Using JavaScript click for {}", name);
            driver.js_click(element).await
        }
        Err(e) => Err(e),
    }
}

/// 完成标记的判定条件
#[derive(Debug, Clone, Copy)]
pub struct Indicator<'a> {
    /// 标记元素的选择器
    pub selector: &'a str,
    /// class 中必须包含的片段
    pub class_marker: &'a str,
    /// aria-label 中必须包含的片段（严格判定时使用）
    pub label: Option<&'a str>,
}

impl<'a> Indicator<'a> {
    pub fn filled(selector: &'a str, class_marker: &'a str) -> Self {
        Self {
            selector,
            class_marker,
            label: None,
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// 标记元素是否同时满足所有条件
    pub async fn satisfied_by(&self, driver: &dyn Driver, element: ElementHandle) -> DriverResult<bool> {
        let class = driver.class_name(element).await?;
        if !class.contains(self.class_marker) {
            return Ok(false);
        }
        match self.label {
            Some(label) => {
                let aria = driver.attribute(element, "aria-label").await?.unwrap_or_default();
                Ok(aria.contains(label))
            }
            None => Ok(true),
        }
    }
}

/// 从 `start`（含自身）开始最多向上 `levels` 层，每层取范围内第一个标记元素判定
///
/// 任意一层满足即返回 `true`；到达文档根或层数用尽返回 `false`。
pub async fn find_indicator(
    driver: &dyn Driver,
    start: ElementHandle,
    levels: usize,
    indicator: &Indicator<'_>,
) -> DriverResult<bool> {
    let mut current = start;
    for level in 0..levels {
        if let Some(mark) = driver.find_first(Some(current), indicator.selector).await? {
            if indicator.satisfied_by(driver, mark).await? {
                debug!("indicator satisfied {} level(s) above {}", level, start);
                return Ok(true);
            }
        }
        match driver.parent(current).await? {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Ok(false)
}

/// 从 `start`（含自身）开始最多向上 `levels` 层，返回遇到的第一个标记元素
pub async fn nearest_indicator(
    driver: &dyn Driver,
    start: ElementHandle,
    levels: usize,
    selector: &str,
) -> DriverResult<Option<ElementHandle>> {
    let mut current = start;
    for _ in 0..levels {
        if let Some(mark) = driver.find_first(Some(current), selector).await? {
            return Ok(Some(mark));
        }
        match driver.parent(current).await? {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePage, InteractionKind};

    // 四层嵌套，标记放在第三层
    const TREE: &str = r#"
        <div id="l3">
            <div class="zb-chevron filled" aria-label="Activity completed"></div>
            <div id="l2">
                <div id="l1">
                    <div id="l0"><span id="leaf">x</span></div>
                </div>
            </div>
        </div>"#;

    #[tokio::test]
    async fn test_indicator_found_within_depth() {
        let page = FakePage::new(TREE);
        let leaf = page.handle("#l0").unwrap();
        let filled = Indicator::filled("div.zb-chevron", "filled");

        // l0 → l1 → l2 → l3：第 4 层才能看到标记
        assert!(!find_indicator(&page, leaf, 3, &filled).await.unwrap());
        assert!(find_indicator(&page, leaf, 4, &filled).await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_levels_never_matches() {
        let page = FakePage::new(TREE);
        let l3 = page.handle("#l3").unwrap();
        let filled = Indicator::filled("div.zb-chevron", "filled");
        assert!(!find_indicator(&page, l3, 0, &filled).await.unwrap());
    }

    #[tokio::test]
    async fn test_strict_indicator_needs_both_signals() {
        let page = FakePage::new(
            r#"<div id="a"><div class="zb-chevron filled" aria-label="Activity not completed"></div></div>
               <div id="b"><div class="zb-chevron" aria-label="Activity completed"></div></div>
               <div id="c"><div class="zb-chevron filled" aria-label="Activity completed"></div></div>"#,
        );
        let strict = Indicator::filled("div.zb-chevron", "filled").with_label("Activity completed");

        for (id, expected) in [("#a", false), ("#b", false), ("#c", true)] {
            let el = page.handle(id).unwrap();
            assert_eq!(find_indicator(&page, el, 1, &strict).await.unwrap(), expected, "{id}");
        }
    }

    #[tokio::test]
    async fn test_walk_stops_at_document_root() {
        let page = FakePage::new(r#"<div id="only"></div>"#);
        let el = page.handle("#only").unwrap();
        let filled = Indicator::filled("div.zb-chevron", "filled");
        assert!(!find_indicator(&page, el, 50, &filled).await.unwrap());
        assert_eq!(nearest_indicator(&page, el, 50, "div.zb-chevron").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_nearest_indicator_prefers_closest_level() {
        let page = FakePage::new(
            r#"<div><div id="far" class="zb-chevron filled"></div>
                 <div id="box"><div id="near" class="zb-chevron"></div><p id="w"></p></div></div>"#,
        );
        let w = page.handle("#w").unwrap();
        let near = page.handle("#near").unwrap();
        assert_eq!(nearest_indicator(&page, w, 5, "div.zb-chevron").await.unwrap(), Some(near));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_falls_back_to_programmatic_click() {
        let page = FakePage::new(r#"<button id="b">Go</button><button id="c">Ok</button>"#);
        page.intercept("#b");
        let pacer = Pacer::from_seed(1);

        let b = page.handle("#b").unwrap();
        let c = page.handle("#c").unwrap();
        activate(&page, &pacer, b, &SCROLL_SETTLE, "button").await.unwrap();
        activate(&page, &pacer, c, &SCROLL_SETTLE, "button").await.unwrap();

        let kinds: Vec<_> = page.interactions().into_iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InteractionKind::Scroll,
                InteractionKind::JsClick,
                InteractionKind::Scroll,
                InteractionKind::Click,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_reports_detached_element() {
        let page = FakePage::new(r#"<button id="b">Go</button>"#);
        let b = page.handle("#b").unwrap();
        page.with_dom(|dom| dom.remove("#b"));

        let err = activate(&page, &Pacer::from_seed(1), b, &SCROLL_SETTLE, "button")
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Detached(_)));
    }
}
