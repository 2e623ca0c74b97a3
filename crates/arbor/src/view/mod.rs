//! The view tree.
//!
//! Views live in an arena owned by [`Views`] and are addressed by [`ViewId`].
//! A view owns its ordered subview list; the superview link is a plain id
//! used for coordinate translation and damage propagation only.
//!
//! Every normal view carries three adornment nodes (margin, border and
//! padding). Adornments are not subviews: they are addressed through
//! [`Views::adornments`] and occupy nested rings of the owner's frame,
//! outside-in. The content area left inside the padding is the view's
//! *bounds*.

/// Adornment geometry.
mod adornment;
/// Coordinate translation.
mod coords;
/// Damage tracking.
mod damage;
/// Drawing.
mod draw;
/// Focus management.
mod focus;
/// Mouse hit-testing.
mod hit;
/// Frame computation.
mod layout;
/// Attaching and detaching views.
mod tree;

use std::{
    any::{Any, type_name},
    fmt,
};

use bitflags::bitflags;
use geom::{Rect, Thickness};
use slotmap::{SlotMap, new_key_type};

pub use adornment::AdornmentKind;
pub use draw::DrawContext;

use crate::{
    error::{Error, Result},
    layout::Placement,
    widget::Widget,
};

new_key_type! {
    /// Identifier of a view in the arena.
    pub struct ViewId;
}

bitflags! {
    /// Arrangement flags altering hit-testing and redraw z-order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Arrangement: u8 {
        /// The view can be dragged by the user.
        const MOVABLE = 1;
        /// The view can be resized by the user.
        const RESIZABLE = 1 << 1;
        /// The view may overlap its siblings; later siblings are on top.
        const OVERLAPPED = 1 << 2;
    }
}

/// The structural role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// An ordinary view.
    Normal,
    /// A view eligible to be the root of a run stack entry.
    Toplevel,
    /// One of the three adornment rings of `owner`.
    Adornment {
        /// Which ring.
        kind: AdornmentKind,
        /// The view this adornment decorates.
        owner: ViewId,
    },
}

/// Ids of a view's adornment nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adornments {
    /// Outermost ring.
    pub margin: ViewId,
    /// Middle ring, drawn as a box when non-zero.
    pub border: ViewId,
    /// Innermost ring.
    pub padding: ViewId,
}

impl Adornments {
    /// The adornment id for a ring.
    pub fn get(&self, kind: AdornmentKind) -> ViewId {
        match kind {
            AdornmentKind::Margin => self.margin,
            AdornmentKind::Border => self.border,
            AdornmentKind::Padding => self.padding,
        }
    }
}

/// A node in the view arena.
pub struct ViewNode {
    /// Debug name.
    pub(crate) name: String,
    /// Structural role.
    pub(crate) kind: ViewKind,
    /// Frame in the superview's content coordinates.
    pub(crate) frame: Rect,
    /// Relative placement; `None` means the frame is set directly.
    pub(crate) placement: Option<Placement>,
    /// Ordered subviews: paint and focus order.
    pub(crate) subviews: Vec<ViewId>,
    /// Non-owning back reference.
    pub(crate) superview: Option<ViewId>,
    /// The subview on the focus chain, if any.
    pub(crate) focused: Option<ViewId>,
    /// Accumulated damage, in frame-local coordinates.
    pub(crate) need_display: Rect,
    /// A descendant has pending damage.
    pub(crate) child_needs_display: bool,
    /// Subview frames must be recomputed.
    pub(crate) layout_needed: bool,
    /// Adornment nodes; `None` on adornments themselves.
    pub(crate) adornments: Option<Adornments>,
    /// Ring thickness; only meaningful on adornment nodes.
    pub(crate) thickness: Thickness,
    /// Arrangement flags.
    pub(crate) arrangement: Arrangement,
    /// Visibility.
    pub(crate) visible: bool,
    /// Input enablement.
    pub(crate) enabled: bool,
    /// Whether the view may take focus.
    pub(crate) can_focus: bool,
    /// Value of `can_focus` before a superview cascaded `false` over it.
    pub(crate) saved_can_focus: Option<bool>,
    /// Whether the view is on the focus chain.
    pub(crate) has_focus: bool,
    /// Attached behavior; taken out while it runs.
    pub(crate) widget: Option<Box<dyn Widget>>,
}

impl fmt::Debug for ViewNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("frame", &self.frame)
            .field("subviews", &self.subviews)
            .field("focused", &self.focused)
            .field("has_focus", &self.has_focus)
            .finish_non_exhaustive()
    }
}

impl ViewNode {
    /// A fresh, visible, enabled node.
    fn new(name: &str, kind: ViewKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            frame: Rect::zero(),
            placement: None,
            subviews: Vec::new(),
            superview: None,
            focused: None,
            need_display: Rect::zero(),
            child_needs_display: false,
            layout_needed: true,
            adornments: None,
            thickness: Thickness::default(),
            arrangement: Arrangement::empty(),
            visible: true,
            enabled: true,
            can_focus: false,
            saved_can_focus: None,
            has_focus: false,
            widget: None,
        }
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural role.
    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    /// Frame in superview content coordinates.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Relative placement, if the view is laid out relatively.
    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    /// Ordered subviews.
    pub fn subviews(&self) -> &[ViewId] {
        &self.subviews
    }

    /// The superview, if attached.
    pub fn superview(&self) -> Option<ViewId> {
        self.superview
    }

    /// The focused subview, if any.
    pub fn focused(&self) -> Option<ViewId> {
        self.focused
    }

    /// Pending damage in frame-local coordinates.
    pub fn need_display(&self) -> Rect {
        self.need_display
    }

    /// True if a descendant has pending damage.
    pub fn child_needs_display(&self) -> bool {
        self.child_needs_display
    }

    /// True if this view or a descendant must be redrawn.
    pub fn is_dirty(&self) -> bool {
        !self.need_display.is_empty() || self.child_needs_display
    }

    /// True if subview frames must be recomputed.
    pub fn layout_needed(&self) -> bool {
        self.layout_needed
    }

    /// Arrangement flags.
    pub fn arrangement(&self) -> Arrangement {
        self.arrangement
    }

    /// Visibility.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Input enablement.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the view may take focus.
    pub fn can_focus(&self) -> bool {
        self.can_focus
    }

    /// Whether the view is on the focus chain.
    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Ring thickness of an adornment node.
    pub fn thickness(&self) -> Thickness {
        self.thickness
    }

    /// True if the node can be focused right now.
    pub(crate) fn focusable(&self) -> bool {
        self.can_focus && self.visible && self.enabled
    }
}

/// The view arena.
#[derive(Default)]
pub struct Views {
    /// All nodes, adornments included.
    nodes: SlotMap<ViewId, ViewNode>,
}

impl fmt::Debug for Views {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Views")
            .field("len", &self.nodes.len())
            .finish()
    }
}

impl Views {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes, adornments included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True if `id` is live.
    pub fn contains(&self, id: ViewId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Create a detached view with its three zero-thickness adornments.
    pub fn create(&mut self, name: &str) -> ViewId {
        self.insert(name, ViewKind::Normal)
    }

    /// Create a detached view with an attached widget.
    pub fn create_with(&mut self, name: &str, widget: impl Widget + 'static) -> ViewId {
        let id = self.create(name);
        if let Some(n) = self.nodes.get_mut(id) {
            n.widget = Some(Box::new(widget));
        }
        id
    }

    /// Create a toplevel view that fills the screen.
    pub fn create_toplevel(&mut self, name: &str) -> ViewId {
        let id = self.insert(name, ViewKind::Toplevel);
        if let Some(n) = self.nodes.get_mut(id) {
            n.placement = Some(Placement::fill());
        }
        id
    }

    /// Insert a node and its adornments.
    fn insert(&mut self, name: &str, kind: ViewKind) -> ViewId {
        let id = self.nodes.insert(ViewNode::new(name, kind));
        let mut ring = |kind: AdornmentKind| {
            self.nodes.insert(ViewNode::new(
                &format!("{name}.{}", kind.label()),
                ViewKind::Adornment { kind, owner: id },
            ))
        };
        let adornments = Adornments {
            margin: ring(AdornmentKind::Margin),
            border: ring(AdornmentKind::Border),
            padding: ring(AdornmentKind::Padding),
        };
        if let Some(n) = self.nodes.get_mut(id) {
            n.adornments = Some(adornments);
        }
        id
    }

    /// Get a node.
    pub fn get(&self, id: ViewId) -> Result<&ViewNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::ViewNotFound(format!("{id:?}")))
    }

    /// Get a node mutably.
    pub(crate) fn get_mut(&mut self, id: ViewId) -> Result<&mut ViewNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::ViewNotFound(format!("{id:?}")))
    }

    /// The debug name of a view, or a placeholder for stale ids.
    pub fn name(&self, id: ViewId) -> &str {
        self.nodes.get(id).map_or("<stale>", |n| n.name.as_str())
    }

    /// The adornment ids of a view.
    pub fn adornments(&self, id: ViewId) -> Result<Adornments> {
        self.get(id)?
            .adornments
            .ok_or_else(|| Error::InvalidArgument(format!("{} has no adornments", self.name(id))))
    }

    /// The frame of a view.
    pub fn frame(&self, id: ViewId) -> Result<Rect> {
        Ok(self.get(id)?.frame)
    }

    /// Ordered subviews of a view.
    pub fn subviews(&self, id: ViewId) -> Result<&[ViewId]> {
        Ok(&self.get(id)?.subviews)
    }

    /// The superview of a view.
    pub fn superview(&self, id: ViewId) -> Result<Option<ViewId>> {
        Ok(self.get(id)?.superview)
    }

    /// The view that receives coordinate and damage propagation from `id`:
    /// the superview, or the owner for an adornment.
    pub(crate) fn container(&self, id: ViewId) -> Option<ViewId> {
        let n = self.nodes.get(id)?;
        match n.kind {
            ViewKind::Adornment { owner, .. } => Some(owner),
            _ => n.superview,
        }
    }

    /// The outermost ancestor of a view.
    pub fn root_of(&self, id: ViewId) -> ViewId {
        let mut cur = id;
        while let Some(p) = self.container(cur) {
            cur = p;
        }
        cur
    }

    /// Set arrangement flags.
    pub fn set_arrangement(&mut self, id: ViewId, arrangement: Arrangement) -> Result<()> {
        self.get_mut(id)?.arrangement = arrangement;
        Ok(())
    }

    /// Attach a widget, replacing any existing one.
    pub fn set_widget(&mut self, id: ViewId, widget: impl Widget + 'static) -> Result<()> {
        self.get_mut(id)?.widget = Some(Box::new(widget));
        self.set_needs_display(id)
    }

    /// Borrow a view's widget as a concrete type.
    pub fn widget<W: Widget + 'static>(&self, id: ViewId) -> Result<&W> {
        let w = self
            .get(id)?
            .widget
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument(format!("{} has no widget", self.name(id))))?;
        (w as &dyn Any)
            .downcast_ref::<W>()
            .ok_or_else(|| Error::InvalidArgument(format!("expected widget type {}", type_name::<W>())))
    }

    /// Mutably borrow a view's widget as a concrete type.
    pub fn widget_mut<W: Widget + 'static>(&mut self, id: ViewId) -> Result<&mut W> {
        let name = self.name(id).to_string();
        let w = self
            .get_mut(id)?
            .widget
            .as_deref_mut()
            .ok_or_else(|| Error::InvalidArgument(format!("{name} has no widget")))?;
        (w as &mut dyn Any)
            .downcast_mut::<W>()
            .ok_or_else(|| Error::InvalidArgument(format!("expected widget type {}", type_name::<W>())))
    }

    /// Temporarily take a widget out of its node.
    pub(crate) fn take_widget(&mut self, id: ViewId) -> Option<Box<dyn Widget>> {
        self.nodes.get_mut(id).and_then(|n| n.widget.take())
    }

    /// Return a widget taken with `take_widget`. Dropped if the view was
    /// destroyed in the meantime.
    pub(crate) fn restore_widget(&mut self, id: ViewId, widget: Box<dyn Widget>) {
        if let Some(n) = self.nodes.get_mut(id)
            && n.widget.is_none()
        {
            n.widget = Some(widget);
        }
    }

    /// Pre-order traversal of the visible, enabled subtree rooted at `id`.
    pub fn preorder(&self, id: ViewId) -> Vec<ViewId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(n) = self.nodes.get(cur) else {
                continue;
            };
            if !(n.visible && n.enabled) {
                continue;
            }
            out.push(cur);
            stack.extend(n.subviews.iter().rev());
        }
        out
    }

    /// Check the tree's structural and focus invariants for the subtree at
    /// `id`, returning a description of the first violation.
    pub fn check_invariants(&self, id: ViewId) -> Result<()> {
        let n = self.get(id)?;
        let fail = |msg: String| Err(Error::Internal(format!("{}: {msg}", self.name(id))));
        if n.has_focus && !n.can_focus {
            return fail("has focus but cannot focus".into());
        }
        if n.has_focus
            && let Some(p) = n.superview
            && !self.get(p)?.has_focus
        {
            return fail("has focus but superview does not".into());
        }
        if let Some(f) = n.focused {
            if !n.subviews.contains(&f) {
                return fail("focused view is not a subview".into());
            }
            if !self.get(f)?.can_focus {
                return fail("focused view cannot focus".into());
            }
        }
        for &c in &n.subviews {
            if self.get(c)?.superview != Some(id) {
                return fail(format!("subview {} has a different superview", self.name(c)));
            }
            self.check_invariants(c)?;
        }
        Ok(())
    }
}
