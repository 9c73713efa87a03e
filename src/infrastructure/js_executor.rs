//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，通过页面脚本实现 [`Driver`] 能力。
//!
//! 元素句柄是页面内注册表分配的编号（`window.__zbSolver`），注册表随页面刷新一起消失，
//! 因此旧句柄在跳转后自然失效，返回 `DriverError::Detached`。

use async_trait::async_trait;
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::driver::{Driver, ElementHandle};

const PRELUDE: &str = r#"
const __s = (window.__zbSolver = window.__zbSolver || { seq: 0, ids: new WeakMap(), nodes: new Map() });
const __reg = (el) => {
    let id = __s.ids.get(el);
    if (id === undefined) {
        id = ++__s.seq;
        __s.ids.set(el, id);
        __s.nodes.set(id, new WeakRef(el));
    }
    return id;
};
const __get = (id) => {
    const ref = __s.nodes.get(id);
    const el = ref && ref.deref();
    return el && el.isConnected ? el : null;
};
"#;

/// 页面脚本的统一返回格式
#[derive(Debug, Deserialize)]
struct ScriptReply<T> {
    value: Option<T>,
    #[serde(default)]
    detached: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClickPoint {
    x: f64,
    y: f64,
}

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 实现 Driver，不认识题目类型
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> DriverResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> DriverResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 在注册表上下文中执行一段脚本体
    async fn run<T: DeserializeOwned>(&self, target: Option<ElementHandle>, body: &str) -> DriverResult<Option<T>> {
        let script = format!(
            "(() => {{ {PRELUDE} try {{ {body} }} catch (e) {{ return {{ error: String(e) }}; }} }})()"
        );
        let reply: ScriptReply<T> = self.eval_as(script).await?;

        if let Some(error) = reply.error {
            debug!("page script error: {}", error);
            return Err(DriverError::Script(error));
        }
        if reply.detached {
            return Err(DriverError::Detached(target.unwrap_or(ElementHandle(0))));
        }
        Ok(reply.value)
    }

    /// 针对单个元素执行脚本体，`el` 为目标元素
    async fn run_on<T: DeserializeOwned>(&self, element: ElementHandle, body: &str) -> DriverResult<Option<T>> {
        let body = format!(
            "const el = __get({}); if (!el) {{ return {{ detached: true }}; }} {}",
            element.0, body
        );
        self.run(Some(element), &body).await
    }
}

#[async_trait]
impl Driver for JsExecutor {
    async fn find_all(&self, scope: Option<ElementHandle>, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        let selector = serde_json::to_string(selector)?;
        let query = format!("return {{ value: Array.from(root.querySelectorAll({selector})).map(__reg) }};");

        let ids: Option<Vec<u64>> = match scope {
            Some(handle) => self.run_on(handle, &format!("const root = el; {query}")).await?,
            None => self.run(None, &format!("const root = document; {query}")).await?,
        };
        Ok(ids.unwrap_or_default().into_iter().map(ElementHandle).collect())
    }

    async fn parent(&self, element: ElementHandle) -> DriverResult<Option<ElementHandle>> {
        let id: Option<u64> = self
            .run_on(element, "const p = el.parentElement; return { value: p ? __reg(p) : null };")
            .await?;
        Ok(id.map(ElementHandle))
    }

    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let name = serde_json::to_string(name)?;
        self.run_on(element, &format!("return {{ value: el.getAttribute({name}) }};"))
            .await
    }

    async fn text(&self, element: ElementHandle) -> DriverResult<String> {
        let text: Option<String> = self
            .run_on(element, "return { value: (el.innerText || '').trim() };")
            .await?;
        Ok(text.unwrap_or_default())
    }

    async fn is_selected(&self, element: ElementHandle) -> DriverResult<bool> {
        let selected: Option<bool> = self
            .run_on(element, "return { value: el.checked === true || el.selected === true };")
            .await?;
        Ok(selected.unwrap_or(false))
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> DriverResult<()> {
        self.run_on::<bool>(element, "el.scrollIntoView({ block: 'center' }); return { value: true };")
            .await?;
        Ok(())
    }

    async fn click(&self, element: ElementHandle) -> DriverResult<()> {
        // 与 WebDriver 一致：元素中心点被其他元素覆盖时视为拦截
        let point: Option<ClickPoint> = self
            .run_on(
                element,
                r#"
                const r = el.getBoundingClientRect();
                if (r.width === 0 || r.height === 0) { return { value: null }; }
                const x = r.left + r.width / 2;
                const y = r.top + r.height / 2;
                const top = document.elementFromPoint(x, y);
                if (!top || !(top === el || el.contains(top))) { return { value: null }; }
                return { value: { x, y } };
                "#,
            )
            .await?;

        let point = point.ok_or(DriverError::Intercepted(element))?;
        self.page.click(Point { x: point.x, y: point.y }).await?;
        Ok(())
    }

    async fn js_click(&self, element: ElementHandle) -> DriverResult<()> {
        self.run_on::<bool>(element, "el.click(); return { value: true };").await?;
        Ok(())
    }

    async fn set_value(&self, element: ElementHandle, value: &str) -> DriverResult<()> {
        let value = serde_json::to_string(value)?;
        // 使用原生 setter，保证页面框架能观察到变化
        let body = format!(
            r#"
            el.focus();
            const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
            const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
            setter.call(el, {value});
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return {{ value: true }};
            "#
        );
        self.run_on::<bool>(element, &body).await?;
        Ok(())
    }
}
