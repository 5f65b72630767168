use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::screen::ScreenHandle;

/// Navigation notifications fired synchronously by a `ScreenStack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// `screen` joined the stack on top of `source` (`None` for a root push).
    Pushed {
        source: Option<ScreenHandle>,
        screen: ScreenHandle,
    },
    /// `screen` left the stack; `current` is the top at the time of firing.
    Exited {
        screen: ScreenHandle,
        current: Option<ScreenHandle>,
    },
}

impl NavigationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NavigationEvent::Pushed { .. } => "screen_pushed",
            NavigationEvent::Exited { .. } => "screen_exited",
        }
    }
}

/// Token returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&NavigationEvent)>;

/// Observer list owned by a single stack.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, Listener)>>,
}

impl Listeners {
    pub(crate) fn subscribe(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Listeners are snapshotted first so they may subscribe, unsubscribe,
    /// or navigate while being notified.
    pub(crate) fn emit(&self, event: &NavigationEvent) {
        let snapshot: Vec<Listener> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }
}
