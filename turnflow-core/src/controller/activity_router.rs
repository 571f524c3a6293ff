//! ActivityRouter: runs one turn through the classification tree.
//!
//! Every stage is a handler chain. A chain hands over to the stage chosen by
//! [`route::descend`] once its last handler continues; any handler may stop
//! the turn by not continuing. The first non-empty value produced anywhere
//! in the turn, counting from the innermost completed handler outwards, is
//! what the caller receives.

use std::fmt;
use std::time::Instant;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{Instrument, debug, info_span, trace, warn};

use crate::config::DispatchConfig;
use crate::controller::event_label::EventLabel;
use crate::controller::handler_registry::HandlerRegistry;
use crate::controller::metrics::DispatchMetrics;
use crate::controller::next::{Next, TurnScope};
use crate::controller::route::{self, LabelPath};
use crate::error::DispatchError;
use crate::model::turn_context::TurnContext;

/// Outcome of a completed dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Captured handler value, if any handler produced one.
    pub value: Option<Value>,

    /// Labels whose chain was entered, in order.
    pub path: LabelPath,

    /// The `Dialog` chain ran out of handlers.
    pub completed: bool,
}

impl TurnReport {
    pub fn short_circuited(&self) -> bool {
        !self.completed
    }

    pub fn reached(&self, label: EventLabel) -> bool {
        self.path.contains(&label)
    }

    /// Last label entered.
    pub fn stopped_at(&self) -> Option<EventLabel> {
        self.path.last().copied()
    }
}

/// Frozen handler registry plus the dispatch loop over it.
pub struct ActivityRouter {
    registry: HandlerRegistry,
    config: DispatchConfig,
    metrics: DispatchMetrics,
}

impl ActivityRouter {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            config: DispatchConfig::default(),
            metrics: DispatchMetrics::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Read-only view of the bound handlers.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// Dispatch one turn and return the captured value.
    ///
    /// Fails before any handler runs when the context is absent, carries no
    /// activity, or the activity has no type. A handler failure aborts the
    /// turn and is returned as [`DispatchError::Handler`].
    pub async fn run<'c>(
        &self,
        context: impl Into<Option<&'c mut TurnContext>>,
    ) -> Result<Option<Value>, DispatchError> {
        self.dispatch(context).await.map(|report| report.value)
    }

    /// Like [`run`](Self::run), but also reports the path taken.
    pub async fn dispatch<'c>(
        &self,
        context: impl Into<Option<&'c mut TurnContext>>,
    ) -> Result<TurnReport, DispatchError> {
        let ctx: &mut TurnContext = match Self::check_preconditions(context.into()) {
            Ok(ctx) => ctx,

            Err(e) => {
                self.metrics.record_rejected();
                warn!(
                    marker = "TURN_REJECTED",
                    operation_type = e.operation_type(),
                    error = %e,
                    "Dispatch refused"
                );
                return Err(e);
            }
        };

        let span = {
            let activity = ctx.activity();
            info_span!(
                "turn",
                activity_type = activity.and_then(|a| a.type_str()).unwrap_or_default(),
                activity_id = activity.and_then(|a| a.id.as_deref()).unwrap_or_default(),
            )
        };

        self.run_turn(ctx).instrument(span).await
    }

    fn check_preconditions(
        context: Option<&mut TurnContext>,
    ) -> Result<&mut TurnContext, DispatchError> {
        let ctx: &mut TurnContext = context.ok_or(DispatchError::MissingContext)?;

        match ctx.activity() {
            None => return Err(DispatchError::MissingActivity),

            Some(activity) if activity.type_str().is_none() => {
                return Err(DispatchError::MissingActivityType);
            }

            Some(_) => {}
        }

        Ok(ctx)
    }

    async fn run_turn(&self, ctx: &mut TurnContext) -> Result<TurnReport, DispatchError> {
        let started: Instant = Instant::now();
        let scope = TurnScope::new(self.config.trace_handlers);

        let outcome = self.run_chain(ctx, &scope, EventLabel::Turn, 0).await;
        let elapsed = started.elapsed();

        if let Err(e) = outcome {
            self.metrics.record_failed(elapsed);
            warn!(
                marker = "TURN_FAILED",
                operation_type = "handler_failure",
                error = %e,
                duration_us = elapsed.as_micros() as u64,
                "Handler failed, turn aborted"
            );
            return Err(DispatchError::Handler(e));
        }

        let report: TurnReport = scope.into_report();
        self.metrics.record_turn(report.completed, elapsed);

        if report.short_circuited() {
            debug!(
                marker = "TURN_SHORT_CIRCUITED",
                operation_type = "dispatch",
                stopped_at = ?report.stopped_at(),
                "Handler ended the turn early"
            );
        }

        if elapsed > self.config.slow_turn_threshold {
            warn!(
                marker = "SLOW_TURN",
                operation_type = "dispatch",
                duration_us = elapsed.as_micros() as u64,
                threshold_us = self.config.slow_turn_threshold.as_micros() as u64,
                "Slow turn"
            );
        }

        Ok(report)
    }

    /// Run `label`'s chain from `index`, then descend. Boxed because stages
    /// recurse through [`Next::run`].
    pub(crate) fn run_chain<'s>(
        &'s self,
        ctx: &'s mut TurnContext,
        scope: &'s TurnScope,
        label: EventLabel,
        index: usize,
    ) -> BoxFuture<'s, anyhow::Result<()>> {
        Box::pin(async move {
            if index == 0 {
                scope.enter(label);
                self.metrics.record_chain(label);
                debug!(
                    marker = "CHAIN_ENTERED",
                    operation_type = "dispatch",
                    label = %label,
                    handlers = self.registry.handlers_for(label).len(),
                    "Entering chain"
                );
            }

            if let Some(handler) = self.registry.handlers_for(label).get(index) {
                if scope.trace_handlers {
                    trace!(
                        marker = "HANDLER_INVOKED",
                        operation_type = "dispatch",
                        label = %label,
                        position = index,
                        handler = handler.name(),
                        "Invoking handler"
                    );
                }

                let next = Next::new(self, scope, label, index + 1);
                let value: Option<Value> = handler.handle(ctx, next).await?;
                scope.offer(value);

                return Ok(());
            }

            match route::descend(label, ctx.activity()) {
                Some(child) => self.run_chain(ctx, scope, child, 0).await,

                None => {
                    scope.mark_completed();
                    Ok(())
                }
            }
        })
    }
}

impl fmt::Debug for ActivityRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRouter")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
