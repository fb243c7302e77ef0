//! An in-memory document.
//!
//! Elements live in an arena and are never freed; detaching an element takes
//! its subtree out of every lookup until it is attached again, which is how
//! ajax-style removal and re-insertion are modelled.

use std::collections::{BTreeMap, HashSet};

use crate::config::{ClassNames, MarkupPosition};

use super::model::{ElementId, Listener, Page};

/// Nominal pixel width given to the scrubber rendered by
/// [`Page::render_default_controls`]; a memory page has no layout engine.
pub const DEFAULT_SCRUBBER_WIDTH: f64 = 100.0;

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    left: f64,
    width: f64,
    width_percent: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MemoryPage {
    nodes: Vec<Node>,
    root: ElementId,
    body: ElementId,
    listeners: HashSet<Listener>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// Create a document holding an empty `body`.
    pub fn new() -> Self {
        let mut page = Self {
            nodes: vec![Node {
                tag: "html".to_string(),
                ..Node::default()
            }],
            root: ElementId(0),
            body: ElementId(0),
            listeners: HashSet::new(),
        };
        page.body = page.append(page.root, "body");
        page
    }

    /// Append a new element as the last child of `parent`.
    pub fn append(&mut self, parent: ElementId, tag: &str) -> ElementId {
        let len = self.node(parent).map_or(0, |n| n.children.len());
        self.insert(parent, len, tag)
    }

    /// Insert a new element as child number `index` of `parent` (clamped).
    pub fn insert(&mut self, parent: ElementId, index: usize, tag: &str) -> ElementId {
        let id = ElementId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            ..Node::default()
        });
        self.attach(parent, id, index);
        id
    }

    /// Append an anchor with the given `href` and text.
    pub fn append_link(&mut self, parent: ElementId, href: &str, text: &str) -> ElementId {
        let a = self.append(parent, "a");
        self.set_attr(a, "href", href);
        self.set_text(a, text);
        a
    }

    /// Take `el` and its subtree out of the document. Returns its former
    /// parent and position so it can be put back with [`MemoryPage::attach`].
    pub fn detach(&mut self, el: ElementId) -> Option<(ElementId, usize)> {
        let parent = self.node(el)?.parent?;
        let siblings = &mut self.nodes[parent.0].children;
        let pos = siblings.iter().position(|&c| c == el)?;
        siblings.remove(pos);
        self.nodes[el.0].parent = None;
        Some((parent, pos))
    }

    /// Attach a detached element as child number `index` of `parent` (clamped).
    pub fn attach(&mut self, parent: ElementId, el: ElementId, index: usize) {
        if self.node(parent).is_none() || self.node(el).is_none() || el == self.root {
            return;
        }
        if self.nodes[el.0].parent.is_some() {
            self.detach(el);
        }
        let siblings = &mut self.nodes[parent.0].children;
        let index = index.min(siblings.len());
        siblings.insert(index, el);
        self.nodes[el.0].parent = Some(parent);
    }

    /// Whether `el` is reachable from the document root.
    pub fn is_attached(&self, el: ElementId) -> bool {
        let mut cur = Some(el);
        while let Some(e) = cur {
            if e == self.root {
                return true;
            }
            cur = self.node(e).and_then(|n| n.parent);
        }
        false
    }

    pub fn set_geometry(&mut self, el: ElementId, left: f64, width: f64) {
        if let Some(n) = self.node_mut(el) {
            n.left = left;
            n.width = width;
        }
    }

    pub fn children(&self, el: ElementId) -> &[ElementId] {
        self.node(el).map_or(&[], |n| n.children.as_slice())
    }

    pub fn classes(&self, el: ElementId) -> &[String] {
        self.node(el).map_or(&[], |n| n.classes.as_slice())
    }

    /// Width last set through [`Page::set_width_percent`].
    pub fn width_percent(&self, el: ElementId) -> Option<f64> {
        self.node(el).and_then(|n| n.width_percent)
    }

    pub fn is_listening(&self, listener: &Listener) -> bool {
        self.listeners.contains(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn node(&self, el: ElementId) -> Option<&Node> {
        self.nodes.get(el.0)
    }

    fn node_mut(&mut self, el: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(el.0)
    }

    /// Pre-order walk of the subtree below `root`, `root` included.
    fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if self.node(root).is_none() {
            return out;
        }
        let mut stack = vec![root];
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(self.nodes[el.0].children.iter().rev().copied());
        }
        out
    }

    fn attached(&self) -> Vec<ElementId> {
        self.descendants(self.root)
    }
}

impl Page for MemoryPage {
    fn body(&self) -> ElementId {
        self.body
    }

    fn elements_by_class(&self, class: &str) -> Vec<ElementId> {
        self.attached()
            .into_iter()
            .filter(|&e| self.has_class(e, class))
            .collect()
    }

    fn elements_with_attr(&self, name: &str) -> Vec<ElementId> {
        self.attached()
            .into_iter()
            .filter(|&e| self.nodes[e.0].attrs.contains_key(name))
            .collect()
    }

    fn links_within(&self, root: ElementId) -> Vec<ElementId> {
        if !self.is_attached(root) {
            return Vec::new();
        }
        self.descendants(root)
            .into_iter()
            .filter(|&e| self.is_link(e))
            .collect()
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.node(el).and_then(|n| n.parent)
    }

    fn is_link(&self, el: ElementId) -> bool {
        self.node(el).is_some_and(|n| n.tag == "a")
    }

    fn has_children(&self, el: ElementId) -> bool {
        self.node(el).is_some_and(|n| !n.children.is_empty())
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.node(el)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if class.is_empty() || self.has_class(el, class) {
            return;
        }
        if let Some(n) = self.node_mut(el) {
            n.classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(n) = self.node_mut(el) {
            n.classes.retain(|c| c != class);
        }
    }

    fn attr(&self, el: ElementId, name: &str) -> Option<String> {
        self.node(el).and_then(|n| n.attrs.get(name).cloned())
    }

    fn set_attr(&mut self, el: ElementId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(el) {
            n.attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attr(&mut self, el: ElementId, name: &str) {
        if let Some(n) = self.node_mut(el) {
            n.attrs.remove(name);
        }
    }

    fn text(&self, el: ElementId) -> String {
        self.descendants(el)
            .into_iter()
            .map(|e| self.nodes[e.0].text.as_str())
            .collect()
    }

    fn set_text(&mut self, el: ElementId, text: &str) {
        if let Some(n) = self.node_mut(el) {
            n.text = text.to_string();
        }
    }

    fn set_width_percent(&mut self, el: ElementId, percent: f64) {
        if let Some(n) = self.node_mut(el) {
            n.width_percent = Some(percent);
        }
    }

    fn offset_left(&self, el: ElementId) -> f64 {
        self.node(el).map_or(0.0, |n| n.left)
    }

    fn offset_width(&self, el: ElementId) -> f64 {
        self.node(el).map_or(0.0, |n| n.width)
    }

    fn create_wrapper(
        &mut self,
        parent: ElementId,
        class: &str,
        position: MarkupPosition,
    ) -> ElementId {
        let index = match position {
            MarkupPosition::Top => 0,
            MarkupPosition::Bottom => usize::MAX,
        };
        let wrapper = self.insert(parent, index, "div");
        self.add_class(wrapper, class);
        wrapper
    }

    fn render_default_controls(&mut self, wrapper: ElementId, classes: &ClassNames) {
        let controls = self.append(wrapper, "div");
        self.add_class(controls, "td-controls");
        self.add_class(controls, &classes.hide);

        let play = self.append_link(controls, "#", "▶");
        self.add_class(play, &classes.play_pause);
        let next = self.append_link(controls, "#", "»");
        self.add_class(next, &classes.next);
        let previous = self.append_link(controls, "#", "«");
        self.add_class(previous, &classes.previous);

        let permalink = self.append_link(controls, "", "");
        self.add_class(permalink, &classes.permalink);
        let title = self.append(permalink, "span");
        self.add_class(title, &classes.track_title);

        let scrubber = self.append(controls, "div");
        self.add_class(scrubber, &classes.scrubber);
        self.set_geometry(scrubber, 0.0, DEFAULT_SCRUBBER_WIDTH);
        let status_bar = self.append(scrubber, "div");
        self.add_class(status_bar, &classes.status_bar);
        let loading = self.append(status_bar, "div");
        self.add_class(loading, &classes.loading);
        let position = self.append(status_bar, "div");
        self.add_class(position, &classes.position);
        let handle = self.append(position, "div");
        self.add_class(handle, "td-handle");

        let time = self.append(controls, "div");
        self.add_class(time, "td-time");
        let current = self.append(time, "span");
        self.add_class(current, &classes.current_time);
        self.set_text(current, "--:--");
        let duration = self.append(time, "span");
        self.add_class(duration, &classes.duration);
        self.set_text(duration, "--:--");
    }

    fn listen(&mut self, listener: Listener) {
        self.listeners.insert(listener);
    }

    fn unlisten(&mut self, listener: Listener) {
        self.listeners.remove(&listener);
    }
}
