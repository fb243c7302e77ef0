use crate::config::{ClassNames, MarkupPosition};

/// Attribute holding a link's position in the current playlist.
pub const INDEX_ATTR: &str = "data-tapedeck-index";
/// Attribute holding a link's stable sound identifier.
pub const SOUND_ID_ATTR: &str = "data-tapedeck-sound-id";
/// Optional attribute with a page describing the track.
pub const PERMALINK_ATTR: &str = "data-tapedeck-permalink";
/// Written on transport controls: sound id of the active track.
pub const CURRENT_SOUND_ID_ATTR: &str = "data-tapedeck-current-sound-id";
/// Written on transport controls: index of the active track.
pub const CURRENT_INDEX_ATTR: &str = "data-tapedeck-current-index";

/// Opaque reference to an element of the page.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// The global transport controls that accept clicks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ControlKind {
    PlayPause,
    PlayAll,
    Next,
    Previous,
}

/// Event subscriptions the player asks the page to deliver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Listener {
    DocumentClick,
    PointerDown,
    PointerMove,
    PointerUp,
    Control(ControlKind),
    /// Subtree mutations below the given element.
    Mutations(ElementId),
}

/// Document collaborator.
///
/// Lookups return elements in document order. Mutating calls on an element
/// that no longer exists are ignored.
pub trait Page {
    /// The document-level element that carries global state tags.
    fn body(&self) -> ElementId;

    /// All attached elements carrying `class`, in document order.
    fn elements_by_class(&self, class: &str) -> Vec<ElementId>;

    fn first_by_class(&self, class: &str) -> Option<ElementId> {
        self.elements_by_class(class).into_iter().next()
    }

    /// All attached elements carrying the attribute `name`, in document order.
    fn elements_with_attr(&self, name: &str) -> Vec<ElementId>;

    /// Anchor elements inside `root` (inclusive), in document order.
    fn links_within(&self, root: ElementId) -> Vec<ElementId>;

    fn parent(&self, el: ElementId) -> Option<ElementId>;
    fn is_link(&self, el: ElementId) -> bool;
    fn has_children(&self, el: ElementId) -> bool;

    fn has_class(&self, el: ElementId, class: &str) -> bool;
    fn add_class(&mut self, el: ElementId, class: &str);
    fn remove_class(&mut self, el: ElementId, class: &str);

    fn attr(&self, el: ElementId, name: &str) -> Option<String>;
    fn set_attr(&mut self, el: ElementId, name: &str, value: &str);
    fn remove_attr(&mut self, el: ElementId, name: &str);

    /// Rendered text content.
    fn text(&self, el: ElementId) -> String;
    fn set_text(&mut self, el: ElementId, text: &str);

    /// Sets the element's width as a percentage of its parent.
    fn set_width_percent(&mut self, el: ElementId, percent: f64);
    /// Horizontal offset of the element from the page origin, in pixels.
    fn offset_left(&self, el: ElementId) -> f64;
    fn offset_width(&self, el: ElementId) -> f64;

    /// Creates an empty `div` with `class` as first or last child of `parent`.
    fn create_wrapper(
        &mut self,
        parent: ElementId,
        class: &str,
        position: MarkupPosition,
    ) -> ElementId;

    /// Fills `wrapper` with the default transport markup.
    fn render_default_controls(&mut self, wrapper: ElementId, classes: &ClassNames);

    fn listen(&mut self, listener: Listener);
    fn unlisten(&mut self, listener: Listener);
}

/// Walks from `el` up to the nearest anchor, `el` included.
pub fn closest_link<P: Page + ?Sized>(page: &P, el: ElementId) -> Option<ElementId> {
    let mut cur = Some(el);
    while let Some(e) = cur {
        if page.is_link(e) {
            return Some(e);
        }
        cur = page.parent(e);
    }
    None
}

/// Walks from `el` up to the nearest element carrying `class`, `el` included.
pub fn closest_with_class<P: Page + ?Sized>(
    page: &P,
    el: ElementId,
    class: &str,
) -> Option<ElementId> {
    let mut cur = Some(el);
    while let Some(e) = cur {
        if page.has_class(e, class) {
            return Some(e);
        }
        cur = page.parent(e);
    }
    None
}
