use crate::logging::{LogEvent, LogFields, LogLevel};
use serde::Serialize;
use serde_json::json;

/// Counters accumulated by a [`crate::ScreenStack`] over its lifetime.
#[derive(Debug, Default, Clone)]
pub struct NavigationMetrics {
    pushes: u64,
    rejected: u64,
    loads_completed: u64,
    entries: u64,
    suspends: u64,
    resumes: u64,
    exits: u64,
    cascaded_exits: u64,
    cancelled_exits: u64,
    detaches: u64,
}

impl NavigationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_push(&mut self) {
        self.pushes = self.pushes.saturating_add(1);
    }

    pub fn record_rejected(&mut self) {
        self.rejected = self.rejected.saturating_add(1);
    }

    pub fn record_load_completed(&mut self) {
        self.loads_completed = self.loads_completed.saturating_add(1);
    }

    pub fn record_entry(&mut self) {
        self.entries = self.entries.saturating_add(1);
    }

    pub fn record_suspend(&mut self) {
        self.suspends = self.suspends.saturating_add(1);
    }

    pub fn record_resume(&mut self) {
        self.resumes = self.resumes.saturating_add(1);
    }

    /// `cascaded` marks exits driven by a resume attempt rather than a caller.
    pub fn record_exit(&mut self, cascaded: bool) {
        self.exits = self.exits.saturating_add(1);
        if cascaded {
            self.cascaded_exits = self.cascaded_exits.saturating_add(1);
        }
    }

    pub fn record_cancelled_exit(&mut self) {
        self.cancelled_exits = self.cancelled_exits.saturating_add(1);
    }

    pub fn record_detach(&mut self, count: usize) {
        self.detaches = self.detaches.saturating_add(count as u64);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            pushes: self.pushes,
            rejected: self.rejected,
            loads_completed: self.loads_completed,
            entries: self.entries,
            suspends: self.suspends,
            resumes: self.resumes,
            exits: self.exits,
            cascaded_exits: self.cascaded_exits,
            cancelled_exits: self.cancelled_exits,
            detaches: self.detaches,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub pushes: u64,
    pub rejected: u64,
    pub loads_completed: u64,
    pub entries: u64,
    pub suspends: u64,
    pub resumes: u64,
    pub exits: u64,
    pub cascaded_exits: u64,
    pub cancelled_exits: u64,
    pub detaches: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "navigation_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("pushes".to_string(), json!(self.pushes));
        map.insert("rejected".to_string(), json!(self.rejected));
        map.insert("loads_completed".to_string(), json!(self.loads_completed));
        map.insert("entries".to_string(), json!(self.entries));
        map.insert("suspends".to_string(), json!(self.suspends));
        map.insert("resumes".to_string(), json!(self.resumes));
        map.insert("exits".to_string(), json!(self.exits));
        map.insert("cascaded_exits".to_string(), json!(self.cascaded_exits));
        map.insert("cancelled_exits".to_string(), json!(self.cancelled_exits));
        map.insert("detaches".to_string(), json!(self.detaches));
        map
    }
}
