//! Screen navigation for component trees.
//!
//! A [`ScreenStack`] keeps a LIFO stack of full-page [`Screen`]s and drives
//! their lifecycle (entering, suspending, resuming, exiting) in a fixed order,
//! including cancellable exits and cascading exits of screens that can no
//! longer be resumed. The [`navigation`] functions let a screen navigate
//! without holding its stack, by walking up the component hierarchy.
//!
//! Rendering is left to the host: the stack only flips attachment and writes
//! removal deadlines on each screen's [`VisualNode`].

pub mod error;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod navigation;
pub mod screen;
pub mod stack;
pub mod visual;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{NavigationError, Result};
pub use loader::{DeferredLoader, ImmediateLoader, LoadCallback, Loader};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{MetricSnapshot, NavigationMetrics};
pub use screen::{ExitFlow, Screen, ScreenContext, ScreenHandle, ScreenId};
pub use stack::{
    BufferedStackAudit, ListenerId, NavigationEvent, NullStackAudit, ScreenStack, StackAudit,
    StackAuditEvent, StackAuditEventBuilder, StackAuditStage, StackConfig,
};
pub use visual::{
    Clock, Component, Container, ManualClock, Parent, RemovalTime, SystemClock, VisualNode,
};
