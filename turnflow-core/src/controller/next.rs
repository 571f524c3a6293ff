//! Continuation handed to every handler, and the per-turn bookkeeping it
//! threads through the chains.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::controller::activity_router::{ActivityRouter, TurnReport};
use crate::controller::event_label::EventLabel;
use crate::controller::route::LabelPath;
use crate::model::turn_context::TurnContext;

/// Resumes the chain a handler was invoked from.
///
/// Consumed by [`Next::run`], so a handler can continue at most once. Dropping
/// it without running short-circuits the turn: no later handler on this label
/// and no handler on any label below it executes.
pub struct Next<'a> {
    router: &'a ActivityRouter,
    scope: &'a TurnScope,
    label: EventLabel,
    index: usize,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        router: &'a ActivityRouter,
        scope: &'a TurnScope,
        label: EventLabel,
        index: usize,
    ) -> Self {
        Self {
            router,
            scope,
            label,
            index,
        }
    }

    /// Label of the chain this continuation belongs to.
    pub fn label(&self) -> EventLabel {
        self.label
    }

    /// Run the rest of the turn: remaining handlers on this label, then every
    /// stage below it. Any value produced down there is captured by the router
    /// and is not visible here. A handler failure comes back as `Err` and
    /// should be propagated with `?`.
    pub async fn run(self, ctx: &mut TurnContext) -> anyhow::Result<()> {
        self.router
            .run_chain(ctx, self.scope, self.label, self.index)
            .await
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("label", &self.label)
            .field("index", &self.index)
            .finish()
    }
}

/// State shared by every chain of one dispatch call.
#[derive(Debug, Default)]
pub(crate) struct TurnScope {
    captured: Mutex<Option<Value>>,
    path: Mutex<LabelPath>,
    completed: AtomicBool,
    pub(crate) trace_handlers: bool,
}

impl TurnScope {
    pub(crate) fn new(trace_handlers: bool) -> Self {
        Self {
            trace_handlers,
            ..Self::default()
        }
    }

    /// First-write-wins: a value is kept only if nothing was captured before.
    pub(crate) fn offer(&self, value: Option<Value>) {
        if let Some(value) = value {
            let mut slot = self.captured.lock();

            if slot.is_none() {
                *slot = Some(value);
            }
        }
    }

    pub(crate) fn enter(&self, label: EventLabel) {
        self.path.lock().push(label);
    }

    /// The terminal chain ran out of handlers.
    pub(crate) fn mark_completed(&self) {
        self.completed.store(true, Ordering::Release);
    }

    pub(crate) fn into_report(self) -> TurnReport {
        TurnReport {
            value: self.captured.into_inner(),
            path: self.path.into_inner(),
            completed: self.completed.into_inner(),
        }
    }
}
