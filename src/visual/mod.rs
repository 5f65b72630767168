//! Minimal visual-tree adapter consumed by the screen stack.
//!
//! Nothing here renders. A [`VisualNode`] only records what the stack needs
//! to coordinate with whatever scene graph hosts the screens: whether the
//! node is attached, who its parent is, and when it may be cleaned up.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use crate::screen::ScreenEntry;
use crate::stack::StackInner;

/// Deadline after which the host may destroy a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemovalTime {
    /// Keep the node indefinitely.
    #[default]
    Never,
    /// Clock time at which the node stops being alive.
    At(Duration),
}

impl RemovalTime {
    pub fn is_due(&self, now: Duration) -> bool {
        match self {
            RemovalTime::Never => false,
            RemovalTime::At(deadline) => *deadline <= now,
        }
    }
}

/// Time source shared by a stack and its nodes.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced explicitly by the owner, typically once per frame.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Non-owning back-reference from a node to whatever contains it.
#[derive(Clone)]
pub struct Parent(pub(crate) ParentRef);

#[derive(Clone)]
pub(crate) enum ParentRef {
    Stack(Weak<StackInner>),
    Screen(Weak<ScreenEntry>),
    Container(Weak<ContainerInner>),
}

impl fmt::Debug for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.0 {
            ParentRef::Stack(_) => "stack",
            ParentRef::Screen(_) => "screen",
            ParentRef::Container(_) => "container",
        };
        f.debug_tuple("Parent").field(&kind).finish()
    }
}

/// Per-component state the stack reads and writes on the hosting tree.
#[derive(Debug, Default)]
pub struct VisualNode {
    parent: RefCell<Option<Parent>>,
    attached: Cell<bool>,
    loaded: Cell<bool>,
    lifetime_end: Cell<RemovalTime>,
    remove_when_expired: Cell<bool>,
    latest_transform_end: Cell<Duration>,
}

impl VisualNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(&self) -> Option<Parent> {
        self.parent.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub fn attach(&self, parent: Parent) {
        *self.parent.borrow_mut() = Some(parent);
        self.attached.set(true);
    }

    pub fn detach(&self) {
        self.parent.borrow_mut().take();
        self.attached.set(false);
    }

    /// Whether the node's subtree has been prepared by a loader.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub(crate) fn mark_loaded(&self) {
        self.loaded.set(true);
    }

    pub fn lifetime_end(&self) -> RemovalTime {
        self.lifetime_end.get()
    }

    pub fn set_lifetime_end(&self, end: RemovalTime) {
        self.lifetime_end.set(end);
    }

    /// Ends the node's lifetime once its pending transforms have played out.
    pub fn expire(&self, now: Duration) {
        let end = now.max(self.latest_transform_end.get());
        self.lifetime_end.set(RemovalTime::At(end));
    }

    /// Set when the node has left its stack; the host detaches it once the
    /// lifetime ends and it can never be pushed again.
    pub fn is_marked_for_removal(&self) -> bool {
        self.remove_when_expired.get()
    }

    pub(crate) fn mark_for_removal(&self) {
        self.remove_when_expired.set(true);
    }

    pub fn latest_transform_end(&self) -> Duration {
        self.latest_transform_end.get()
    }

    /// Keep the node alive at least until `end`, e.g. for an exit animation.
    pub fn extend_transforms_to(&self, end: Duration) {
        if end > self.latest_transform_end.get() {
            self.latest_transform_end.set(end);
        }
    }

    pub fn is_alive(&self, now: Duration) -> bool {
        !self.lifetime_end.get().is_due(now)
    }
}

/// Anything that can sit in the component hierarchy and host children.
pub trait Component {
    fn node(&self) -> &VisualNode;

    fn as_parent(&self) -> Parent;

    fn add_child(&self, child: &dyn Component) {
        child.node().attach(self.as_parent());
    }
}

pub(crate) struct ContainerInner {
    name: String,
    node: VisualNode,
}

impl ContainerInner {
    pub(crate) fn node(&self) -> &VisualNode {
        &self.node
    }
}

/// Plain grouping component with no navigation semantics of its own.
#[derive(Clone)]
pub struct Container {
    inner: Rc<ContainerInner>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                name: name.into(),
                node: VisualNode::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.inner.name)
            .field("attached", &self.inner.node.is_attached())
            .finish()
    }
}

impl Component for Container {
    fn node(&self) -> &VisualNode {
        &self.inner.node
    }

    fn as_parent(&self) -> Parent {
        Parent(ParentRef::Container(Rc::downgrade(&self.inner)))
    }
}
