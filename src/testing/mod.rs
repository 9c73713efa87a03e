//! 测试辅助：内存页面
//!
//! `FakePage` 用内存文档树实现 [`Driver`]，点击时按选择器触发预先注册的反应，
//! 用来模拟平台的反馈、完成标记和翻页。所有交互都会记录下来，便于断言。
//!
//! 只在测试或启用 `testing` feature 时编译。

pub mod dom;

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use scraper::Selector;

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::{Driver, ElementHandle};

pub use dom::{parse_selector, Dom, InvalidSelector};

/// 点击后对文档的修改
pub type Reaction = Arc<dyn Fn(&mut Dom) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Scroll,
    Click,
    JsClick,
    SetValue,
}

/// 一次已送达页面的交互
#[derive(Debug, Clone)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub generation: u64,
    pub node: usize,
    pub value: Option<String>,
}

struct FakeState {
    dom: Dom,
    generation: u64,
    reactions: Vec<(Selector, Reaction)>,
    intercepted: Vec<Selector>,
    log: Vec<Interaction>,
}

/// 内存页面
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(html: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                dom: Dom::parse(html),
                generation: 1,
                reactions: Vec::new(),
                intercepted: Vec::new(),
                log: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 注册点击反应：点击（直接或程序化）到匹配元素时执行
    pub fn on_click(&self, selector: &str, reaction: impl Fn(&mut Dom) + Send + Sync + 'static) {
        let selector = parse_selector(selector).expect("valid reaction selector");
        self.lock().reactions.push((selector, Arc::new(reaction)));
    }

    /// 点击匹配元素时翻到新页面（旧句柄全部失效）
    pub fn navigates_to(&self, selector: &str, html: &str) {
        let html = html.to_string();
        self.on_click(selector, move |dom| dom.load(&html));
    }

    /// 匹配元素的直接点击会被拦截
    pub fn intercept(&self, selector: &str) {
        let selector = parse_selector(selector).expect("valid intercept selector");
        self.lock().intercepted.push(selector);
    }

    pub fn with_dom<R>(&self, f: impl FnOnce(&mut Dom) -> R) -> R {
        f(&mut self.lock().dom)
    }

    /// 当前页面上第一个匹配元素的句柄
    pub fn handle(&self, selector: &str) -> Option<ElementHandle> {
        let mut state = self.lock();
        let index = state.dom.query_str(Dom::ROOT, selector).ok()?.into_iter().next()?;
        Some(encode(state.generation, index))
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.lock().log.clone()
    }

    /// 送达匹配元素（当前页面）的点击次数，直接与程序化都计入
    pub fn clicks_on(&self, selector: &str) -> usize {
        let state = self.lock();
        let selector = parse_selector(selector).expect("valid selector");
        state
            .log
            .iter()
            .filter(|i| matches!(i.kind, InteractionKind::Click | InteractionKind::JsClick))
            .filter(|i| i.generation == state.generation && state.dom.matches(i.node, &selector))
            .count()
    }

    pub fn click_count(&self) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|i| matches!(i.kind, InteractionKind::Click | InteractionKind::JsClick))
            .count()
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        let mut state = self.lock();
        let index = state.dom.query_str(Dom::ROOT, selector).ok()?.into_iter().next()?;
        Some(state.dom.value(index))
    }
}

fn encode(generation: u64, index: usize) -> ElementHandle {
    ElementHandle((generation << 32) | index as u64)
}

impl FakeState {
    fn check_session(&self) -> DriverResult<()> {
        if self.dom.session_broken {
            return Err(DriverError::Session("browser window closed".to_string()));
        }
        Ok(())
    }

    fn resolve(&self, handle: ElementHandle) -> DriverResult<usize> {
        self.check_session()?;
        let generation = handle.0 >> 32;
        let index = (handle.0 & 0xffff_ffff) as usize;
        if generation != self.generation || !self.dom.is_connected(index) {
            return Err(DriverError::Detached(handle));
        }
        Ok(index)
    }

    fn record(&mut self, kind: InteractionKind, node: usize, value: Option<String>) {
        self.log.push(Interaction {
            kind,
            generation: self.generation,
            node,
            value,
        });
    }

    fn activate(&mut self, index: usize) {
        if self.dom.tag(index) == Some("input") {
            match self.dom.attr(index, "type").as_deref() {
                Some("radio") => self.dom.set_checked(index, true),
                Some("checkbox") => {
                    let checked = self.dom.is_checked(index);
                    self.dom.set_checked(index, !checked);
                }
                _ => {}
            }
        }

        let reactions: Vec<Reaction> = self
            .reactions
            .iter()
            .filter(|(selector, _)| self.dom.matches(index, selector))
            .map(|(_, reaction)| reaction.clone())
            .collect();

        for reaction in reactions {
            reaction(&mut self.dom);
        }

        if std::mem::take(&mut self.dom.navigated) {
            self.generation += 1;
        }
    }
}

#[async_trait]
impl Driver for FakePage {
    async fn find_all(&self, scope: Option<ElementHandle>, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        let mut state = self.lock();
        state.check_session()?;
        let root = match scope {
            Some(handle) => state.resolve(handle)?,
            None => Dom::ROOT,
        };
        let found = state
            .dom
            .query_str(root, selector)
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(found.into_iter().map(|i| encode(state.generation, i)).collect())
    }

    async fn parent(&self, element: ElementHandle) -> DriverResult<Option<ElementHandle>> {
        let mut state = self.lock();
        let index = state.resolve(element)?;
        let generation = state.generation;
        Ok(state.dom.parent(index).map(|p| encode(generation, p)))
    }

    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let state = self.lock();
        let index = state.resolve(element)?;
        Ok(state.dom.attr(index, name))
    }

    async fn text(&self, element: ElementHandle) -> DriverResult<String> {
        let state = self.lock();
        let index = state.resolve(element)?;
        Ok(state.dom.text_of(index))
    }

    async fn is_selected(&self, element: ElementHandle) -> DriverResult<bool> {
        let state = self.lock();
        let index = state.resolve(element)?;
        Ok(state.dom.is_checked(index))
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> DriverResult<()> {
        let mut state = self.lock();
        let index = state.resolve(element)?;
        state.record(InteractionKind::Scroll, index, None);
        Ok(())
    }

    async fn click(&self, element: ElementHandle) -> DriverResult<()> {
        let mut state = self.lock();
        let index = state.resolve(element)?;
        if state.intercepted.iter().any(|s| state.dom.matches(index, s)) {
            return Err(DriverError::Intercepted(element));
        }
        state.record(InteractionKind::Click, index, None);
        state.activate(index);
        Ok(())
    }

    async fn js_click(&self, element: ElementHandle) -> DriverResult<()> {
        let mut state = self.lock();
        let index = state.resolve(element)?;
        state.record(InteractionKind::JsClick, index, None);
        state.activate(index);
        Ok(())
    }

    async fn set_value(&self, element: ElementHandle, value: &str) -> DriverResult<()> {
        let mut state = self.lock();
        let index = state.resolve(element)?;
        state.record(InteractionKind::SetValue, index, Some(value.to_string()));
        state.dom.set_value(index, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scoped_queries_and_parent() {
        let page = FakePage::new(r#"<div id="q"><input type="radio"><input type="radio"></div><input type="radio">"#);
        let q = page.handle("#q").unwrap();

        let all = page.find_all(None, "input").await.unwrap();
        let scoped = page.find_all(Some(q), "input").await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(scoped.len(), 2);
        assert_eq!(page.parent(scoped[0]).await.unwrap(), Some(q));
    }

    #[tokio::test]
    async fn test_intercepted_click_is_not_delivered() {
        let page = FakePage::new(r#"<button id="b">Go</button>"#);
        page.intercept("#b");
        let b = page.handle("#b").unwrap();

        let err = page.click(b).await.unwrap_err();
        assert!(matches!(err, DriverError::Intercepted(_)));
        assert_eq!(page.click_count(), 0);

        page.js_click(b).await.unwrap();
        assert_eq!(page.clicks_on("#b"), 1);
    }

    #[tokio::test]
    async fn test_navigation_detaches_old_handles() {
        let page = FakePage::new(r#"<a id="next">Next</a>"#);
        page.navigates_to("#next", r#"<p id="fresh">New page</p>"#);
        let next = page.handle("#next").unwrap();

        page.click(next).await.unwrap();

        let err = page.text(next).await.unwrap_err();
        assert!(matches!(err, DriverError::Detached(_)));
        assert!(page.handle("#fresh").is_some());
    }

    #[tokio::test]
    async fn test_broken_session_is_fatal() {
        let page = FakePage::new(r#"<button id="b"></button>"#);
        page.on_click("#b", |dom| dom.break_session());
        let b = page.handle("#b").unwrap();
        page.click(b).await.unwrap();

        let err = page.find_all(None, "button").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_bad_selector_is_script_error() {
        let page = FakePage::new("<div></div>");
        let err = page.find_all(None, "div[").await.unwrap_err();
        assert!(matches!(err, DriverError::Script(_)));
        assert!(!err.is_fatal());
    }
}
