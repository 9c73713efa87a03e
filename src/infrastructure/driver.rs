//! 页面交互能力
//!
//! 求解器只依赖这里定义的最小能力集合，不直接接触浏览器。

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DriverResult;

/// 页面元素的不透明句柄
///
/// 只在产生它的那次扫描/求解周期内有效，页面刷新或跳转后即失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementHandle(pub u64);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 浏览器会话能力
///
/// - 查询：`None` 表示在整个文档中查询，`Some(h)` 表示在 `h` 的后代中查询
/// - 找不到元素是正常分支（空 `Vec` / `None`），不是错误
/// - `click` 在被遮挡时返回 `DriverError::Intercepted`，由调用方改用 `js_click`
#[async_trait]
pub trait Driver: Send + Sync {
    /// 按文档顺序返回所有匹配元素
    async fn find_all(&self, scope: Option<ElementHandle>, selector: &str) -> DriverResult<Vec<ElementHandle>>;

    /// 第一个匹配元素
    async fn find_first(&self, scope: Option<ElementHandle>, selector: &str) -> DriverResult<Option<ElementHandle>> {
        Ok(self.find_all(scope, selector).await?.into_iter().next())
    }

    async fn parent(&self, element: ElementHandle) -> DriverResult<Option<ElementHandle>>;

    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>>;

    /// 可见文本（已去除首尾空白）
    async fn text(&self, element: ElementHandle) -> DriverResult<String>;

    /// 单选框/复选框是否处于选中状态
    async fn is_selected(&self, element: ElementHandle) -> DriverResult<bool>;

    async fn scroll_into_view(&self, element: ElementHandle) -> DriverResult<()>;

    /// 直接交互（真实鼠标事件）
    async fn click(&self, element: ElementHandle) -> DriverResult<()>;

    /// 程序化交互（`element.click()`）
    async fn js_click(&self, element: ElementHandle) -> DriverResult<()>;

    /// 设置输入框的值并触发 input/change 事件
    async fn set_value(&self, element: ElementHandle, value: &str) -> DriverResult<()>;

    async fn class_name(&self, element: ElementHandle) -> DriverResult<String> {
        Ok(self.attribute(element, "class").await?.unwrap_or_default())
    }
}
