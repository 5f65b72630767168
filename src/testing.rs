//! Recording screen shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::screen::{ExitFlow, Screen, ScreenContext, ScreenHandle};
use crate::stack::{NavigationEvent, ScreenStack};

pub(crate) type Journal = Rc<RefCell<Vec<String>>>;

pub(crate) fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn take(journal: &Journal) -> Vec<String> {
    std::mem::take(&mut *journal.borrow_mut())
}

type Hook = Box<dyn Fn(&ScreenContext<'_>)>;

/// Appends `name.callback(other)` to a shared journal for every lifecycle
/// call, and optionally runs a hook from inside the callback.
pub(crate) struct Recorder {
    name: String,
    journal: Journal,
    cancel_exit: Rc<Cell<bool>>,
    on_enter: Option<Hook>,
    on_resume: Option<Hook>,
    on_suspend: Option<Hook>,
}

impl Recorder {
    pub(crate) fn new(journal: &Journal, name: &str) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            cancel_exit: Rc::new(Cell::new(false)),
            on_enter: None,
            on_resume: None,
            on_suspend: None,
        }
    }

    /// Shared switch: while set, `on_exiting` vetoes the exit.
    pub(crate) fn cancel_switch(&self) -> Rc<Cell<bool>> {
        self.cancel_exit.clone()
    }

    pub(crate) fn on_enter(mut self, hook: impl Fn(&ScreenContext<'_>) + 'static) -> Self {
        self.on_enter = Some(Box::new(hook));
        self
    }

    pub(crate) fn on_resume(mut self, hook: impl Fn(&ScreenContext<'_>) + 'static) -> Self {
        self.on_resume = Some(Box::new(hook));
        self
    }

    pub(crate) fn on_suspend(mut self, hook: impl Fn(&ScreenContext<'_>) + 'static) -> Self {
        self.on_suspend = Some(Box::new(hook));
        self
    }

    pub(crate) fn handle(self) -> ScreenHandle {
        ScreenHandle::new(self)
    }

    fn note(&self, callback: &str, other: Option<&ScreenHandle>) {
        let other = other.map_or("-", |screen| screen.name());
        self.journal
            .borrow_mut()
            .push(format!("{}.{}({})", self.name, callback, other));
    }
}

impl Screen for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_entering(&self, ctx: &ScreenContext<'_>, previous: Option<&ScreenHandle>) {
        self.note("entering", previous);
        if let Some(hook) = &self.on_enter {
            hook(ctx);
        }
    }

    fn on_exiting(&self, _ctx: &ScreenContext<'_>, next: Option<&ScreenHandle>) -> ExitFlow {
        self.note("exiting", next);
        if self.cancel_exit.get() {
            ExitFlow::Cancel
        } else {
            ExitFlow::Continue
        }
    }

    fn on_resuming(&self, ctx: &ScreenContext<'_>, previous: &ScreenHandle) {
        self.note("resuming", Some(previous));
        if let Some(hook) = &self.on_resume {
            hook(ctx);
        }
    }

    fn on_suspending(&self, ctx: &ScreenContext<'_>, next: &ScreenHandle) {
        self.note("suspending", Some(next));
        if let Some(hook) = &self.on_suspend {
            hook(ctx);
        }
    }
}

pub(crate) fn recorder(journal: &Journal, name: &str) -> ScreenHandle {
    Recorder::new(journal, name).handle()
}

/// Mirrors the stack's navigation events into the journal.
pub(crate) fn record_events(stack: &ScreenStack, journal: &Journal) {
    let journal = journal.clone();
    stack.subscribe(move |event| {
        let line = match event {
            NavigationEvent::Pushed { source, screen } => format!(
                "pushed({}->{})",
                source.as_ref().map_or("-", |s| s.name()),
                screen.name()
            ),
            NavigationEvent::Exited { screen, current } => format!(
                "exited({}->{})",
                screen.name(),
                current.as_ref().map_or("-", |s| s.name())
            ),
        };
        journal.borrow_mut().push(line);
    });
}
