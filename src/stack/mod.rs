//! The screen stack state machine.
//!
//! A [`ScreenStack`] owns an ordered stack of [`ScreenHandle`]s and drives
//! their lifecycle: suspending the current screen when something is pushed
//! on top, entering new screens once their load completes, consulting
//! `on_exiting` before removal, and resuming (or cascading past) whatever is
//! uncovered by an exit.
//!
//! All mutation happens on one thread. Callbacks may re-enter the stack;
//! no `RefCell` borrow is held while a callback, listener, or loader runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::logging::{LogFields, LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::{MetricSnapshot, NavigationMetrics};
use crate::screen::{ExitFlow, ScreenContext, ScreenHandle};
use crate::visual::{Clock, Component, Parent, ParentRef, RemovalTime, SystemClock, VisualNode};
use crate::{ImmediateLoader, Loader, NavigationError, Result};

pub mod audit;
pub mod events;

pub use audit::{
    BufferedStackAudit, NullStackAudit, StackAudit, StackAuditEvent, StackAuditEventBuilder,
    StackAuditStage,
};
pub use events::{ListenerId, NavigationEvent};

use events::Listeners;

/// Configuration knobs for a stack.
#[derive(Clone)]
pub struct StackConfig {
    /// Label attached to every log event.
    pub name: String,
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Counters updated on every transition when present.
    pub metrics: Option<Arc<Mutex<NavigationMetrics>>>,
    /// Target field used for log events.
    pub log_target: String,
    /// Sink receiving every state transition.
    pub audit: Arc<dyn StackAudit>,
    /// Prepares pushed screens once the stack is ready.
    pub loader: Rc<dyn Loader>,
    /// Time source for removal deadlines.
    pub clock: Rc<dyn Clock>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            name: "screen_stack".to_string(),
            logger: None,
            metrics: None,
            log_target: "screen_stack::stack".to_string(),
            audit: Arc::new(NullStackAudit),
            loader: Rc::new(ImmediateLoader),
            clock: Rc::new(SystemClock::new()),
        }
    }
}

impl StackConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn StackAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_loader(mut self, loader: Rc<dyn Loader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(NavigationMetrics::new())));
        }
    }

    /// Disable metrics collection.
    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<NavigationMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

pub(crate) struct StackInner {
    screens: RefCell<Vec<ScreenHandle>>,
    // Left the stack, node still attached until its deadline passes.
    exited: RefCell<Vec<ScreenHandle>>,
    listeners: Listeners,
    config: StackConfig,
    ready: Cell<bool>,
    node: VisualNode,
}

/// Cloneable handle to a stack of screens. Clones share the same stack.
///
/// Exited screens stay attached until their removal deadline passes and
/// [`ScreenStack::update`] detaches them. Hosts call `update` once per frame;
/// without it the exited list only grows.
#[derive(Clone)]
pub struct ScreenStack {
    inner: Rc<StackInner>,
}

impl Default for ScreenStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenStack {
    pub fn new() -> Self {
        Self::with_config(StackConfig::default())
    }

    pub fn with_config(config: StackConfig) -> Self {
        Self {
            inner: Rc::new(StackInner {
                screens: RefCell::new(Vec::new()),
                exited: RefCell::new(Vec::new()),
                listeners: Listeners::default(),
                config,
                ready: Cell::new(false),
                node: VisualNode::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<StackInner>) -> Self {
        Self { inner }
    }

    fn downgrade(&self) -> Weak<StackInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &StackConfig {
        &self.inner.config
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Until the stack is ready, pushed screens are prepared and entered
    /// synchronously instead of going through the loader.
    pub fn mark_ready(&self) {
        self.inner.ready.set(true);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.get()
    }

    pub fn now(&self) -> Duration {
        self.inner.config.clock.now()
    }

    pub fn current_screen(&self) -> Option<ScreenHandle> {
        self.inner.screens.borrow().last().cloned()
    }

    /// Bottom-to-top snapshot of the stack.
    pub fn screens(&self) -> Vec<ScreenHandle> {
        self.inner.screens.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.screens.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.screens.borrow().is_empty()
    }

    pub fn contains(&self, screen: &ScreenHandle) -> bool {
        self.inner.screens.borrow().iter().any(|s| s == screen)
    }

    pub fn is_current_screen(&self, screen: &ScreenHandle) -> bool {
        self.inner.screens.borrow().last() == Some(screen)
    }

    /// The screen pushed directly on top of `screen`, if any.
    pub fn get_child_screen(&self, screen: &ScreenHandle) -> Option<ScreenHandle> {
        let screens = self.inner.screens.borrow();
        let idx = screens.iter().position(|s| s == screen)?;
        screens.get(idx + 1).cloned()
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&NavigationEvent) + 'static,
    {
        self.inner.listeners.subscribe(Rc::new(listener))
    }

    pub fn on_screen_pushed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Option<&ScreenHandle>, &ScreenHandle) + 'static,
    {
        self.subscribe(move |event| {
            if let NavigationEvent::Pushed { source, screen } = event {
                listener(source.as_ref(), screen);
            }
        })
    }

    pub fn on_screen_exited<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ScreenHandle, Option<&ScreenHandle>) + 'static,
    {
        self.subscribe(move |event| {
            if let NavigationEvent::Exited { screen, current } = event {
                listener(screen, current.as_ref());
            }
        })
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Pushes `screen` on top of `source`, or as the root screen when
    /// `source` is `None`.
    ///
    /// Fails with `AlreadyEntered` or `ScheduledForRemoval` for a screen that
    /// is in the stack or on its way out, with `NotCurrent` when `source` is
    /// not the entered top (checked again after `on_suspending` returns), and
    /// with `RootOccupied` for a root push onto a non-empty stack.
    ///
    /// The screen joins the stack (and `Pushed` fires) immediately; it is
    /// attached and entered only once its load completes.
    pub fn push(&self, source: Option<&ScreenHandle>, screen: &ScreenHandle) -> Result<()> {
        if let Err(err) = self.validate_push(source, screen) {
            self.reject("push", screen, &err);
            return Err(err);
        }

        if let Some(source) = source {
            self.record_metric(NavigationMetrics::record_suspend);
            self.audit(
                StackAuditStage::ScreenSuspended,
                source,
                [("next", json!(screen.label()))],
            );
            self.log(
                LogLevel::Debug,
                "screen_suspended",
                [
                    json_kv("screen", source.label()),
                    json_kv("next", screen.label()),
                ],
            );
            source
                .behavior()
                .on_suspending(&ScreenContext::new(source, self), screen);
            source.node().expire(self.now());

            // on_suspending may have navigated on its own.
            let moved = if self.contains(screen) {
                Some(NavigationError::AlreadyEntered {
                    screen: screen.label(),
                })
            } else if !self.is_current_screen(source) {
                Some(NavigationError::NotCurrent {
                    operation: "push",
                    screen: source.label(),
                })
            } else {
                None
            };
            if let Some(err) = moved {
                self.reject("push", screen, &err);
                return Err(err);
            }
        }

        screen.node().set_lifetime_end(RemovalTime::Never);
        self.inner.screens.borrow_mut().push(screen.clone());

        self.record_metric(NavigationMetrics::record_push);
        self.audit(
            StackAuditStage::ScreenPushed,
            screen,
            [("source", label_or_null(source))],
        );
        self.log(
            LogLevel::Debug,
            "screen_pushed",
            [
                json_kv("screen", screen.label()),
                json_kv("source", label_or_null(source)),
                json_kv("depth", self.len()),
            ],
        );
        self.inner.listeners.emit(&NavigationEvent::Pushed {
            source: source.cloned(),
            screen: screen.clone(),
        });

        if self.is_ready() {
            self.schedule_load(source, screen);
        } else {
            screen.prepare();
            self.finish_load(source, screen);
        }
        Ok(())
    }

    /// Exits `screen`, which must be the current screen.
    ///
    /// A veto from `on_exiting` is not an error: the call succeeds and the
    /// stack is left as it was.
    pub fn exit(&self, screen: &ScreenHandle) -> Result<()> {
        let check = if !self.contains(screen) {
            Err(NavigationError::NotCurrent {
                operation: "exit",
                screen: screen.label(),
            })
        } else if !self.is_current_screen(screen) {
            Err(NavigationError::ScreenHasChild {
                operation: "exit",
                screen: screen.label(),
            })
        } else {
            Ok(())
        };

        if let Err(err) = check {
            self.reject("exit", screen, &err);
            return Err(err);
        }

        self.exit_from(None, None);
        Ok(())
    }

    /// Exits everything above `target` so it becomes current again.
    ///
    /// Does nothing when `target` is already current or is not in this
    /// stack.
    pub fn make_current(&self, target: &ScreenHandle) {
        if self.is_current_screen(target) {
            return;
        }
        if !self.contains(target) {
            self.log(
                LogLevel::Debug,
                "make_current_ignored",
                [json_kv("screen", target.label())],
            );
            return;
        }

        let invalidate_above = || {
            for screen in self.screens().iter().rev() {
                if screen == target {
                    break;
                }
                screen.set_valid_for_resume(false);
            }
        };
        let hook: &dyn Fn() = &invalidate_above;
        self.exit_from(None, Some(hook));
    }

    /// Detaches exited screens whose removal deadline has passed. Returns the
    /// number of nodes detached.
    pub fn update(&self) -> usize {
        let now = self.now();
        let due: Vec<ScreenHandle> = {
            let mut exited = self.inner.exited.borrow_mut();
            let (due, keep): (Vec<_>, Vec<_>) = exited
                .drain(..)
                .partition(|screen| screen.node().lifetime_end().is_due(now));
            *exited = keep;
            due
        };

        for screen in &due {
            screen.node().detach();
            self.audit(StackAuditStage::ScreenDetached, screen, std::iter::empty());
            self.log(
                LogLevel::Debug,
                "screen_detached",
                [json_kv("screen", screen.label())],
            );
        }
        if !due.is_empty() {
            let count = due.len();
            self.record_metric(|metrics| metrics.record_detach(count));
        }
        due.len()
    }

    /// Exited screens whose nodes are still attached.
    pub fn pending_removal(&self) -> Vec<ScreenHandle> {
        self.inner.exited.borrow().clone()
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.inner.config.metrics.as_ref()?;
        metrics.lock().ok().map(|guard| guard.snapshot())
    }

    /// Emits the current metrics snapshot through the logger.
    pub fn log_metrics(&self) {
        let (Some(logger), Some(snapshot)) =
            (self.inner.config.logger.as_ref(), self.metrics_snapshot())
        else {
            return;
        };
        let target = format!("{}.metrics", self.inner.config.log_target);
        let _ = logger.log_event(snapshot.to_log_event(&target));
    }

    fn validate_push(&self, source: Option<&ScreenHandle>, screen: &ScreenHandle) -> Result<()> {
        if self.contains(screen) {
            return Err(NavigationError::AlreadyEntered {
                screen: screen.label(),
            });
        }
        if screen.node().is_marked_for_removal() {
            return Err(NavigationError::ScheduledForRemoval {
                screen: screen.label(),
            });
        }
        match source {
            // A source still loading has not entered yet and cannot be suspended.
            Some(source) if !self.is_current_screen(source) || !source.has_entered() => {
                Err(NavigationError::NotCurrent {
                    operation: "push",
                    screen: source.label(),
                })
            }
            None if !self.is_empty() => Err(NavigationError::RootOccupied {
                screen: screen.label(),
            }),
            _ => Ok(()),
        }
    }

    fn schedule_load(&self, source: Option<&ScreenHandle>, screen: &ScreenHandle) {
        self.audit(StackAuditStage::LoadScheduled, screen, std::iter::empty());
        self.log(
            LogLevel::Debug,
            "load_scheduled",
            [json_kv("screen", screen.label())],
        );

        let stack = self.downgrade();
        let source = source.cloned();
        let pending = screen.clone();
        let loader = Rc::clone(&self.inner.config.loader);
        loader.load(
            screen,
            Box::new(move || {
                if let Some(inner) = stack.upgrade() {
                    ScreenStack::from_inner(inner).finish_load(source.as_ref(), &pending);
                }
            }),
        );
    }

    fn finish_load(&self, source: Option<&ScreenHandle>, screen: &ScreenHandle) {
        self.record_metric(NavigationMetrics::record_load_completed);
        self.audit(StackAuditStage::LoadCompleted, screen, std::iter::empty());

        // Pushes onto a loading screen are refused, so only the top can be loading.
        if !self.is_current_screen(screen) {
            self.log(
                LogLevel::Debug,
                "load_discarded",
                [json_kv("screen", screen.label())],
            );
            return;
        }

        if !screen.valid_for_push() {
            self.audit(StackAuditStage::PushAbandoned, screen, std::iter::empty());
            self.log(
                LogLevel::Info,
                "push_abandoned",
                [json_kv("screen", screen.label())],
            );
            self.exit_from(None, None);
            return;
        }

        screen
            .node()
            .attach(Parent(ParentRef::Stack(self.downgrade())));

        if screen.mark_entered() {
            self.record_metric(NavigationMetrics::record_entry);
            self.audit(
                StackAuditStage::ScreenEntered,
                screen,
                [("previous", label_or_null(source))],
            );
            self.log(
                LogLevel::Debug,
                "screen_entered",
                [
                    json_kv("screen", screen.label()),
                    json_kv("previous", label_or_null(source)),
                ],
            );
            screen
                .behavior()
                .on_entering(&ScreenContext::new(screen, self), source);
        }
    }

    /// Pops the current screen. `source` is the screen whose exit led here
    /// (`None` for the first exit of a chain). Returns false when the exit
    /// was vetoed or the stack was empty.
    fn exit_from(&self, source: Option<&ScreenHandle>, on_exiting: Option<&dyn Fn()>) -> bool {
        let popped = self.inner.screens.borrow_mut().pop();
        let Some(to_exit) = popped else {
            return false;
        };
        let next = self.current_screen();

        // Screens that never entered have nothing to veto with.
        if to_exit.has_entered() {
            let flow = to_exit
                .behavior()
                .on_exiting(&ScreenContext::new(&to_exit, self), next.as_ref());
            if flow == ExitFlow::Cancel {
                self.inner.screens.borrow_mut().push(to_exit.clone());
                self.record_metric(NavigationMetrics::record_cancelled_exit);
                self.audit(StackAuditStage::ExitCancelled, &to_exit, std::iter::empty());
                self.log(
                    LogLevel::Info,
                    "exit_cancelled",
                    [json_kv("screen", to_exit.label())],
                );
                return false;
            }
        }

        if let Some(hook) = on_exiting {
            hook();
        }

        match source {
            None => to_exit.node().expire(self.now()),
            // Cascaded exits share the deadline of the screen that started them.
            Some(source) => to_exit.node().set_lifetime_end(source.node().lifetime_end()),
        }
        to_exit.node().mark_for_removal();
        self.inner.exited.borrow_mut().push(to_exit.clone());

        let current = self.current_screen();
        let cascaded = source.is_some();
        self.record_metric(|metrics| metrics.record_exit(cascaded));
        self.audit(
            StackAuditStage::ScreenExited,
            &to_exit,
            [
                ("next", label_or_null(current.as_ref())),
                ("cascaded", json!(cascaded)),
            ],
        );
        self.log(
            LogLevel::Debug,
            "screen_exited",
            [
                json_kv("screen", to_exit.label()),
                json_kv("next", label_or_null(current.as_ref())),
                json_kv("cascaded", cascaded),
                json_kv("depth", self.len()),
            ],
        );
        self.inner.listeners.emit(&NavigationEvent::Exited {
            screen: to_exit.clone(),
            current,
        });

        self.resume_from(&to_exit);
        true
    }

    fn resume_from(&self, source: &ScreenHandle) {
        let Some(current) = self.current_screen() else {
            return;
        };

        if !current.valid_for_resume() {
            self.exit_from(Some(source), None);
            return;
        }

        // Reset first so a push made from on_resuming can expire it again.
        current.node().set_lifetime_end(RemovalTime::Never);
        self.record_metric(NavigationMetrics::record_resume);
        self.audit(
            StackAuditStage::ScreenResumed,
            &current,
            [("previous", json!(source.label()))],
        );
        self.log(
            LogLevel::Debug,
            "screen_resumed",
            [
                json_kv("screen", current.label()),
                json_kv("previous", source.label()),
            ],
        );
        current
            .behavior()
            .on_resuming(&ScreenContext::new(&current, self), source);
    }

    fn reject(&self, operation: &str, screen: &ScreenHandle, err: &NavigationError) {
        self.record_metric(NavigationMetrics::record_rejected);
        if operation == "push" {
            self.audit(
                StackAuditStage::PushRejected,
                screen,
                [("reason", json!(err.kind()))],
            );
        }
        self.log(
            LogLevel::Warn,
            &format!("{operation}_rejected"),
            [
                json_kv("screen", screen.label()),
                json_kv("kind", err.kind()),
                json_kv("reason", err.to_string()),
            ],
        );
    }

    fn audit<I>(&self, stage: StackAuditStage, screen: &ScreenHandle, details: I)
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        let mut builder = StackAuditEventBuilder::new(stage, screen.label());
        for (key, value) in details {
            builder.detail(key, value);
        }
        self.inner.config.audit.record(builder.finish());
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let Some(logger) = self.inner.config.logger.as_ref() else {
            return;
        };
        if !logger.enabled(level) {
            return;
        }
        let mut fields: LogFields = fields.into_iter().collect();
        fields.insert("stack".to_string(), json!(self.inner.config.name));
        let event = event_with_fields(level, &self.inner.config.log_target, message, fields);
        let _ = logger.log_event(event);
    }

    fn record_metric(&self, record: impl FnOnce(&mut NavigationMetrics)) {
        if let Some(metrics) = self.inner.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }
}

fn label_or_null(screen: Option<&ScreenHandle>) -> Value {
    screen.map_or(Value::Null, |screen| json!(screen.label()))
}

impl Component for ScreenStack {
    fn node(&self) -> &VisualNode {
        &self.inner.node
    }

    fn as_parent(&self) -> Parent {
        Parent(ParentRef::Stack(self.downgrade()))
    }
}

impl PartialEq for ScreenStack {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ScreenStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenStack")
            .field("name", &self.inner.config.name)
            .field("ready", &self.is_ready())
            .field("screens", &self.screens())
            .finish()
    }
}
