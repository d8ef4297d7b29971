use crate::geom::{Point, Rect, Size};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ElementId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tag {
    Img,
    P,
    A,
    Button,
    Other,
}

impl Tag {
    /// Tags the pet will walk to.
    pub(crate) fn is_destination(self) -> bool {
        matches!(self, Tag::Img | Tag::P | Tag::A | Tag::Button)
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Tag::Img => "img",
            Tag::P => "p",
            Tag::A => "a",
            Tag::Button => "button",
            Tag::Other => "div",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Positioning {
    Flow,
    Fixed,
    Sticky,
}

impl Positioning {
    pub(crate) fn is_pinned(self) -> bool {
        matches!(self, Positioning::Fixed | Positioning::Sticky)
    }
}

/// A measured element, in viewport coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ElementBox {
    pub(crate) id: ElementId,
    pub(crate) tag: Tag,
    pub(crate) rect: Rect,
    pub(crate) positioning: Positioning,
    /// Inside a region marked as off-limits for the pet.
    pub(crate) ignored: bool,
}

/// What the anchor element displays: rendered text at a viewport position.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Sprite {
    pub(crate) text: String,
    pub(crate) pos: Point,
    pub(crate) speech: Option<String>,
    pub(crate) walking: bool,
    pub(crate) asleep: bool,
}

/// The agent's view of the document it lives on.
pub(crate) trait Page {
    fn viewport(&self) -> Size;

    /// Every element currently laid out, measured against the viewport.
    fn elements(&self) -> Vec<ElementBox>;

    /// Re-measure one element. `None` once it is gone.
    fn measure(&self, id: ElementId) -> Option<ElementBox>;

    fn find_anchor(&self, name: &str) -> Option<ElementId>;

    fn write_anchor(&mut self, id: ElementId, sprite: &Sprite);
}
