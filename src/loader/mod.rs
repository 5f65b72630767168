//! Loaders prepare a pushed screen and report back when it may be attached.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::screen::ScreenHandle;
use crate::visual::Component;

/// Continuation handed to a loader. Must be invoked exactly once, on the
/// thread that owns the stack.
pub type LoadCallback = Box<dyn FnOnce()>;

pub trait Loader {
    fn load(&self, screen: &ScreenHandle, on_complete: LoadCallback);
}

/// Prepares and completes inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateLoader;

impl Loader for ImmediateLoader {
    fn load(&self, screen: &ScreenHandle, on_complete: LoadCallback) {
        screen.prepare();
        on_complete();
    }
}

struct PendingLoad {
    screen: ScreenHandle,
    on_complete: LoadCallback,
}

/// Queues loads until the owning update loop drains them.
///
/// Screens whose node is already prepared complete immediately.
#[derive(Clone, Default)]
pub struct DeferredLoader {
    queue: Rc<RefCell<VecDeque<PendingLoad>>>,
}

impl DeferredLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_pending(&self, screen: &ScreenHandle) -> bool {
        self.queue
            .borrow()
            .iter()
            .any(|pending| pending.screen == *screen)
    }

    /// Completes the oldest pending load. Returns false when nothing was queued.
    pub fn complete_next(&self) -> bool {
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some(pending) => {
                Self::finish(pending);
                true
            }
            None => false,
        }
    }

    /// Completes the pending load for `screen`, if any.
    pub fn complete(&self, screen: &ScreenHandle) -> bool {
        let pending = {
            let mut queue = self.queue.borrow_mut();
            queue
                .iter()
                .position(|pending| pending.screen == *screen)
                .and_then(|idx| queue.remove(idx))
        };
        match pending {
            Some(pending) => {
                Self::finish(pending);
                true
            }
            None => false,
        }
    }

    /// Drains the queue, including loads scheduled by the completions
    /// themselves. Returns how many loads completed.
    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next() {
            completed += 1;
        }
        completed
    }

    fn finish(pending: PendingLoad) {
        pending.screen.prepare();
        (pending.on_complete)();
    }
}

impl Loader for DeferredLoader {
    fn load(&self, screen: &ScreenHandle, on_complete: LoadCallback) {
        if screen.node().is_loaded() {
            on_complete();
            return;
        }
        self.queue.borrow_mut().push_back(PendingLoad {
            screen: screen.clone(),
            on_complete,
        });
    }
}
