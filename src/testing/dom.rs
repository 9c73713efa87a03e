//! 可变的内存文档树
//!
//! HTML 由 `scraper` 解析，选择器也交给 `scraper` 匹配；修改直接作用在底层的 `ego_tree` 上，
//! 改属性时整体替换元素节点的值，节点本身和子树保持不动。
//! 元素按首次被查到的顺序编号，整页重新加载之前编号不变。

use std::collections::HashMap;

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;

/// 选择器无法解析
#[derive(Debug, Clone, Error)]
#[error("invalid selector '{selector}': {reason}")]
pub struct InvalidSelector {
    pub selector: String,
    pub reason: String,
}

pub fn parse_selector(selector: &str) -> Result<Selector, InvalidSelector> {
    Selector::parse(selector).map_err(|e| InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// 文档树，编号 0 为片段的根元素
pub struct Dom {
    html: Html,
    ids: Vec<NodeId>,
    numbers: HashMap<NodeId, usize>,
    /// 表单状态，没有记录时取 HTML 属性
    checked: HashMap<NodeId, bool>,
    values: HashMap<NodeId, String>,
    pub(crate) session_broken: bool,
    pub(crate) navigated: bool,
}

impl Dom {
    pub const ROOT: usize = 0;

    pub fn parse(html: &str) -> Self {
        let html = Html::parse_fragment(html);
        let root = html.root_element().id();
        Self {
            html,
            ids: vec![root],
            numbers: HashMap::from([(root, Self::ROOT)]),
            checked: HashMap::new(),
            values: HashMap::new(),
            session_broken: false,
            navigated: false,
        }
    }

    fn number(&mut self, id: NodeId) -> usize {
        if let Some(&n) = self.numbers.get(&id) {
            return n;
        }
        let n = self.ids.len();
        self.ids.push(id);
        self.numbers.insert(id, n);
        n
    }

    fn element(&self, index: usize) -> Option<ElementRef<'_>> {
        let id = *self.ids.get(index)?;
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    /// 节点是否仍挂在文档上
    pub fn is_connected(&self, index: usize) -> bool {
        let Some(element) = self.element(index) else {
            return false;
        };
        let root = self.html.tree.root().id();
        element.ancestors().any(|a| a.id() == root)
    }

    /// `root` 的后代中匹配的元素，按文档顺序（不含 `root` 自身）
    pub fn query(&mut self, root: usize, selector: &Selector) -> Vec<usize> {
        let found: Vec<NodeId> = match self.element(root) {
            Some(scope) => scope
                .select(selector)
                .map(|e| e.id())
                .filter(|&id| id != scope.id())
                .collect(),
            None => Vec::new(),
        };
        found.into_iter().map(|id| self.number(id)).collect()
    }

    pub fn query_str(&mut self, root: usize, selector: &str) -> Result<Vec<usize>, InvalidSelector> {
        let selector = parse_selector(selector)?;
        Ok(self.query(root, &selector))
    }

    pub fn matches(&self, index: usize, selector: &Selector) -> bool {
        self.element(index).is_some_and(|e| selector.matches(&e))
    }

    /// 父元素；片段根元素没有父元素
    pub fn parent(&mut self, index: usize) -> Option<usize> {
        let parent = self.element(index)?.parent().and_then(ElementRef::wrap)?.id();
        Some(self.number(parent))
    }

    pub fn tag(&self, index: usize) -> Option<&str> {
        self.element(index).map(|e| e.value().name())
    }

    pub fn attr(&self, index: usize, name: &str) -> Option<String> {
        self.element(index)?.value().attr(name).map(str::to_string)
    }

    /// 元素及其后代的全部文本，空白折叠
    pub fn text_of(&self, index: usize) -> String {
        let Some(element) = self.element(index) else {
            return String::new();
        };
        let joined = element.text().collect::<Vec<_>>().join(" ");
        joined.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn is_checked(&self, index: usize) -> bool {
        let Some(&id) = self.ids.get(index) else {
            return false;
        };
        match self.checked.get(&id) {
            Some(&checked) => checked,
            None => self.attr(index, "checked").is_some(),
        }
    }

    pub fn set_checked(&mut self, index: usize, checked: bool) {
        if let Some(&id) = self.ids.get(index) {
            self.checked.insert(id, checked);
        }
    }

    pub fn value(&self, index: usize) -> String {
        let Some(&id) = self.ids.get(index) else {
            return String::new();
        };
        match self.values.get(&id) {
            Some(value) => value.clone(),
            None => self.attr(index, "value").unwrap_or_default(),
        }
    }

    pub fn set_value(&mut self, index: usize, value: &str) {
        if let Some(&id) = self.ids.get(index) {
            self.values.insert(id, value.to_string());
        }
    }

    // ========== 修改（点击反应里使用）==========

    fn all(&mut self, selector: &str) -> Vec<NodeId> {
        self.query_str(Self::ROOT, selector)
            .unwrap_or_default()
            .into_iter()
            .map(|n| self.ids[n])
            .collect()
    }

    /// 给所有匹配元素追加 class
    pub fn add_class(&mut self, selector: &str, class: &str) {
        for id in self.all(selector) {
            self.rewrite_attrs(id, |attrs| match attrs.iter_mut().find(|(name, _)| name == "class") {
                Some((_, value)) if value.split_whitespace().any(|c| c == class) => {}
                Some((_, value)) if value.trim().is_empty() => *value = class.to_string(),
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(class);
                }
                None => attrs.push(("class".to_string(), class.to_string())),
            });
        }
    }

    pub fn set_attr(&mut self, selector: &str, name: &str, value: &str) {
        for id in self.all(selector) {
            self.rewrite_attrs(id, |attrs| match attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            });
        }
    }

    /// 用一段纯文本替换所有匹配元素的内容
    pub fn set_text(&mut self, selector: &str, text: &str) {
        for id in self.all(selector) {
            let children: Vec<NodeId> = match self.html.tree.get(id) {
                Some(node) => node.children().map(|c| c.id()).collect(),
                None => continue,
            };
            for child in children {
                if let Some(mut child) = self.html.tree.get_mut(child) {
                    child.detach();
                }
            }
            self.append_fragment(id, &escape_text(text));
        }
    }

    /// 在第一个匹配元素末尾追加 HTML 片段
    pub fn append_html(&mut self, selector: &str, html: &str) {
        if let Some(&id) = self.all(selector).first() {
            self.append_fragment(id, html);
        }
    }

    /// 把所有匹配元素从文档中摘除
    pub fn remove(&mut self, selector: &str) {
        for id in self.all(selector) {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    /// 加载新页面，替换整棵树
    pub fn load(&mut self, html: &str) {
        let session_broken = self.session_broken;
        *self = Dom::parse(html);
        self.session_broken = session_broken;
        self.navigated = true;
    }

    /// 之后的所有调用都返回会话错误
    pub fn break_session(&mut self) {
        self.session_broken = true;
    }

    fn append_fragment(&mut self, parent: NodeId, html: &str) {
        let fragment = Html::parse_fragment(html);
        graft(&mut self.html.tree, *fragment.root_element(), parent);
    }

    /// 按新的属性表重建元素节点的值，节点编号和子树不变
    fn rewrite_attrs(&mut self, id: NodeId, edit: impl FnOnce(&mut Vec<(String, String)>)) {
        let Some(element) = self.html.tree.get(id).and_then(ElementRef::wrap) else {
            return;
        };
        let name = element.value().name().to_string();
        let mut attrs: Vec<(String, String)> = element
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        edit(&mut attrs);

        let Some(replacement) = build_element(&name, &attrs) else {
            return;
        };
        if let Some(mut node) = self.html.tree.get_mut(id) {
            *node.value() = replacement;
        }
    }
}

/// 把 `source` 的子树逐个复制到 `target` 下
fn graft(tree: &mut Tree<Node>, source: NodeRef<'_, Node>, target: NodeId) {
    for child in source.children() {
        let Some(mut parent) = tree.get_mut(target) else {
            return;
        };
        let copied = parent.append(child.value().clone()).id();
        graft(tree, child, copied);
    }
}

/// 解析一个只有开始标签的片段，取出其中的元素节点
fn build_element(name: &str, attrs: &[(String, String)]) -> Option<Node> {
    let mut html = format!("<{}", name);
    for (key, value) in attrs {
        html.push_str(&format!(" {}=\"{}\"", key, escape_attr(value)));
    }
    html.push_str(&format!("></{}>", name));

    let fragment = Html::parse_fragment(&html);
    let node = fragment
        .root_element()
        .children()
        .find(|n| n.value().is_element())
        .map(|n| n.value().clone());
    node
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
