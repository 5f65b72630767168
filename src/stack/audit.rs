//! Navigation audit trail.
//!
//! Every state transition the stack drives is offered to a [`StackAudit`]
//! sink as a stage plus structured details, so callers can buffer, log, or
//! assert on the exact order of lifecycle steps.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Distinct transitions recorded by `ScreenStack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackAuditStage {
    /// A screen joined the stack (before its load completed).
    ScreenPushed,
    /// A push was refused with an error.
    PushRejected,
    /// The screen's load was handed to the loader.
    LoadScheduled,
    /// The loader reported completion.
    LoadCompleted,
    /// `on_entering` ran.
    ScreenEntered,
    /// `on_suspending` ran on the previous current screen.
    ScreenSuspended,
    /// `on_exiting` vetoed an exit.
    ExitCancelled,
    /// A screen left the stack.
    ScreenExited,
    /// `on_resuming` ran on the new current screen.
    ScreenResumed,
    /// Load completed but the screen was no longer valid for push.
    PushAbandoned,
    /// An exited screen's node was detached after its removal deadline.
    ScreenDetached,
}

/// Structured audit entry.
#[derive(Debug, Clone)]
pub struct StackAuditEvent {
    pub timestamp: SystemTime,
    pub stage: StackAuditStage,
    pub screen: String,
    pub details: Vec<(String, Value)>,
}

impl StackAuditEvent {
    fn new(stage: StackAuditStage, screen: String) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            screen,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Builder helper to append fields ergonomically.
pub struct StackAuditEventBuilder {
    event: StackAuditEvent,
}

impl StackAuditEventBuilder {
    pub fn new(stage: StackAuditStage, screen: impl Into<String>) -> Self {
        Self {
            event: StackAuditEvent::new(stage, screen.into()),
        }
    }

    pub fn detail(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> StackAuditEvent {
        self.event
    }
}

/// Trait implemented by any audit sink.
pub trait StackAudit: Send + Sync {
    fn record(&self, event: StackAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullStackAudit;

impl StackAudit for NullStackAudit {
    fn record(&self, _event: StackAuditEvent) {}
}

/// Keeps every audit event in arrival order.
#[derive(Debug, Default)]
pub struct BufferedStackAudit {
    events: Mutex<Vec<StackAuditEvent>>,
}

impl BufferedStackAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StackAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// `(stage, screen)` pairs, the usual shape for ordering assertions.
    pub fn trail(&self) -> Vec<(StackAuditStage, String)> {
        self.events()
            .into_iter()
            .map(|event| (event.stage, event.screen))
            .collect()
    }

    pub fn stages(&self) -> Vec<StackAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.events.lock() {
            guard.clear();
        }
    }
}

impl StackAudit for BufferedStackAudit {
    fn record(&self, event: StackAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
