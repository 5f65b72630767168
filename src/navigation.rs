//! Navigation from a screen's point of view.
//!
//! Each function finds the stack owning `screen` by walking up the component
//! hierarchy and delegates to it. A screen that is not (yet) attached under a
//! stack is treated as a plain component: pushes and `make_current` do
//! nothing, queries answer negatively, and `exit` only marks the screen
//! invalid for push so a load still in flight is abandoned.

use crate::Result;
use crate::screen::ScreenHandle;
use crate::stack::ScreenStack;
use crate::visual::{Component, ParentRef, VisualNode};

/// Walks at most this many parents before giving up.
const MAX_HIERARCHY_DEPTH: usize = 256;

/// The closest stack above `screen` in the component hierarchy.
pub fn owning_stack(screen: &ScreenHandle) -> Option<ScreenStack> {
    find_stack(screen.node())
}

pub(crate) fn find_stack(node: &VisualNode) -> Option<ScreenStack> {
    let mut parent = node.parent();
    for _ in 0..MAX_HIERARCHY_DEPTH {
        parent = match parent?.0 {
            ParentRef::Stack(stack) => return stack.upgrade().map(ScreenStack::from_inner),
            ParentRef::Screen(screen) => screen.upgrade()?.node().parent(),
            ParentRef::Container(container) => container.upgrade()?.node().parent(),
        };
    }
    None
}

/// Push `next` on top of `screen`.
pub fn push(screen: &ScreenHandle, next: &ScreenHandle) -> Result<()> {
    match owning_stack(screen) {
        Some(stack) => stack.push(Some(screen), next),
        None => Ok(()),
    }
}

pub fn exit(screen: &ScreenHandle) -> Result<()> {
    match owning_stack(screen) {
        Some(stack) => stack.exit(screen),
        None => {
            screen.set_valid_for_push(false);
            Ok(())
        }
    }
}

pub fn make_current(screen: &ScreenHandle) {
    if let Some(stack) = owning_stack(screen) {
        stack.make_current(screen);
    }
}

pub fn is_current_screen(screen: &ScreenHandle) -> bool {
    owning_stack(screen).is_some_and(|stack| stack.is_current_screen(screen))
}

pub fn get_child_screen(screen: &ScreenHandle) -> Option<ScreenHandle> {
    owning_stack(screen)?.get_child_screen(screen)
}
