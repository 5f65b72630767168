use thiserror::Error;

/// Unified result type for the screen stack crate.
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Misuse of the navigation API. Every variant is returned before the stack
/// is touched, so the caller observes the stack exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("screen `{screen}` has already been entered into this stack")]
    AlreadyEntered { screen: String },
    #[error("screen `{screen}` is scheduled for removal and cannot be pushed again")]
    ScheduledForRemoval { screen: String },
    #[error("cannot {operation}: screen `{screen}` is not the current screen")]
    NotCurrent {
        operation: &'static str,
        screen: String,
    },
    #[error("cannot {operation}: screen `{screen}` has a child screen; use make_current instead")]
    ScreenHasChild {
        operation: &'static str,
        screen: String,
    },
    #[error("cannot push `{screen}` as a root screen onto a non-empty stack")]
    RootOccupied { screen: String },
}

impl NavigationError {
    /// Short machine-friendly identifier used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            NavigationError::AlreadyEntered { .. } => "already_entered",
            NavigationError::ScheduledForRemoval { .. } => "scheduled_for_removal",
            NavigationError::NotCurrent { .. } => "not_current",
            NavigationError::ScreenHasChild { .. } => "screen_has_child",
            NavigationError::RootOccupied { .. } => "root_occupied",
        }
    }
}
