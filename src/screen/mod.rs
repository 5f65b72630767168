//! Screen contract and the shared handle the stack passes around.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::Result;
use crate::stack::ScreenStack;
use crate::visual::{Component, Parent, ParentRef, VisualNode};

/// Outcome of [`Screen::on_exiting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitFlow {
    /// Let the exit proceed.
    #[default]
    Continue,
    /// Keep the screen on the stack and current; nothing else changes.
    Cancel,
}

/// Contract implemented by every navigable page.
///
/// Callbacks take `&self` because they may re-enter the stack (and through it
/// this very screen). Keep mutable state behind `Cell`/`RefCell`.
pub trait Screen {
    fn name(&self) -> &str {
        "screen"
    }

    /// Builds the screen's content. Called by a loader at most once, before
    /// the stack is told the load finished.
    fn prepare(&self) {}

    /// The screen became attached and current for the first time.
    fn on_entering(&self, _ctx: &ScreenContext<'_>, _previous: Option<&ScreenHandle>) {}

    /// The screen is being removed; `next` is what will become current.
    fn on_exiting(&self, _ctx: &ScreenContext<'_>, _next: Option<&ScreenHandle>) -> ExitFlow {
        ExitFlow::Continue
    }

    /// The screen is current again because `previous` exited.
    fn on_resuming(&self, _ctx: &ScreenContext<'_>, _previous: &ScreenHandle) {}

    /// `next` was pushed on top of this screen.
    fn on_suspending(&self, _ctx: &ScreenContext<'_>, _next: &ScreenHandle) {}
}

static NEXT_SCREEN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(u64);

impl ScreenId {
    fn next() -> Self {
        Self(NEXT_SCREEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

pub(crate) struct ScreenEntry {
    id: ScreenId,
    name: String,
    behavior: Box<dyn Screen>,
    valid_for_resume: Cell<bool>,
    valid_for_push: Cell<bool>,
    entered: Cell<bool>,
    node: VisualNode,
}

impl ScreenEntry {
    pub(crate) fn node(&self) -> &VisualNode {
        &self.node
    }
}

/// Shared, identity-compared reference to a screen.
///
/// Cloning is cheap and every clone refers to the same screen; two handles
/// are equal only when they point at the same instance.
#[derive(Clone)]
pub struct ScreenHandle {
    inner: Rc<ScreenEntry>,
}

impl ScreenHandle {
    pub fn new<S>(screen: S) -> Self
    where
        S: Screen + 'static,
    {
        let name = screen.name().to_string();
        Self {
            inner: Rc::new(ScreenEntry {
                id: ScreenId::next(),
                name,
                behavior: Box::new(screen),
                valid_for_resume: Cell::new(true),
                valid_for_push: Cell::new(true),
                entered: Cell::new(false),
                node: VisualNode::new(),
            }),
        }
    }

    pub fn id(&self) -> ScreenId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// `name#id`, used in errors and log fields.
    pub fn label(&self) -> String {
        format!("{}#{}", self.inner.name, self.inner.id.0)
    }

    pub fn behavior(&self) -> &dyn Screen {
        self.inner.behavior.as_ref()
    }

    pub fn valid_for_resume(&self) -> bool {
        self.inner.valid_for_resume.get()
    }

    pub fn set_valid_for_resume(&self, valid: bool) {
        self.inner.valid_for_resume.set(valid);
    }

    pub fn valid_for_push(&self) -> bool {
        self.inner.valid_for_push.get()
    }

    pub fn set_valid_for_push(&self, valid: bool) {
        self.inner.valid_for_push.set(valid);
    }

    /// Whether `on_entering` has already run for this screen.
    pub fn has_entered(&self) -> bool {
        self.inner.entered.get()
    }

    pub(crate) fn mark_entered(&self) -> bool {
        !self.inner.entered.replace(true)
    }

    /// Runs [`Screen::prepare`] once and marks the node loaded.
    pub fn prepare(&self) {
        if self.inner.node.is_loaded() {
            return;
        }
        self.inner.behavior.prepare();
        self.inner.node.mark_loaded();
    }

    pub fn ptr_eq(&self, other: &ScreenHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Component for ScreenHandle {
    fn node(&self) -> &VisualNode {
        &self.inner.node
    }

    fn as_parent(&self) -> Parent {
        Parent(ParentRef::Screen(Rc::downgrade(&self.inner)))
    }
}

impl PartialEq for ScreenHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ScreenHandle {}

impl Hash for ScreenHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for ScreenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenHandle")
            .field("label", &self.label())
            .field("valid_for_resume", &self.valid_for_resume())
            .field("valid_for_push", &self.valid_for_push())
            .field("entered", &self.has_entered())
            .finish()
    }
}

impl fmt::Display for ScreenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.inner.name, self.inner.id.0)
    }
}

/// Passed to every lifecycle callback: the screen being notified plus the
/// stack driving the notification.
pub struct ScreenContext<'a> {
    screen: &'a ScreenHandle,
    stack: &'a ScreenStack,
}

impl<'a> ScreenContext<'a> {
    pub(crate) fn new(screen: &'a ScreenHandle, stack: &'a ScreenStack) -> Self {
        Self { screen, stack }
    }

    pub fn screen(&self) -> &ScreenHandle {
        self.screen
    }

    pub fn stack(&self) -> &ScreenStack {
        self.stack
    }

    pub fn now(&self) -> Duration {
        self.stack.now()
    }

    /// Push `next` on top of this screen.
    pub fn push(&self, next: &ScreenHandle) -> Result<()> {
        self.stack.push(Some(self.screen), next)
    }

    pub fn exit(&self) -> Result<()> {
        self.stack.exit(self.screen)
    }

    pub fn make_current(&self) {
        self.stack.make_current(self.screen);
    }

    pub fn is_current(&self) -> bool {
        self.stack.is_current_screen(self.screen)
    }

    pub fn child(&self) -> Option<ScreenHandle> {
        self.stack.get_child_screen(self.screen)
    }

    /// Keep this screen's node alive for `duration` past now, covering a
    /// transition started from the callback.
    pub fn hold_for(&self, duration: Duration) {
        self.screen
            .node()
            .extend_transforms_to(self.now() + duration);
    }
}
