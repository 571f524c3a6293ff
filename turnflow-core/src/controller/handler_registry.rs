//! HandlerRegistry: ordered handler chains, one per event label.
//!
//! Pure bookkeeping. Binding happens during setup; handing the registry to
//! [`ActivityRouter::new`] freezes it, since the router offers no way to bind
//! further handlers. Labels nobody bound to simply have an empty chain.

use std::fmt;
use std::sync::Arc;

use enum_map::EnumMap;
use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::controller::activity_router::ActivityRouter;
use crate::controller::event_label::EventLabel;
use crate::controller::next::Next;
use crate::controller::traits::{ActivityHandler, HandlerResult, handler_fn};
use crate::model::turn_context::TurnContext;

#[derive(Default)]
pub struct HandlerRegistry {
    chains: EnumMap<EventLabel, Vec<Arc<dyn ActivityHandler>>>,
}

impl HandlerRegistry {
    /// Create new empty handler registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the chain for `label`. Chains run in bind order.
    pub fn bind<H>(&mut self, label: EventLabel, handler: H) -> &mut Self
    where
        H: ActivityHandler + 'static,
    {
        self.bind_arc(label, Arc::new(handler))
    }

    /// Append an already shared handler; the same instance may sit on several labels.
    pub fn bind_arc(&mut self, label: EventLabel, handler: Arc<dyn ActivityHandler>) -> &mut Self {
        debug!(
            marker = "HANDLER_BOUND",
            operation_type = "registry",
            label = %label,
            handler = handler.name(),
            position = self.chains[label].len(),
            "Bound handler"
        );

        self.chains[label].push(handler);
        self
    }

    /// Bind a closure. See [`handler_fn`].
    pub fn bind_fn<F>(&mut self, label: EventLabel, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut TurnContext, Next<'a>) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.bind(label, handler_fn(f))
    }

    /// Chain for `label` in execution order; empty when nothing was bound.
    pub fn handlers_for(&self, label: EventLabel) -> &[Arc<dyn ActivityHandler>] {
        &self.chains[label]
    }

    pub fn handler_names(&self, label: EventLabel) -> Vec<&'static str> {
        self.chains[label].iter().map(|h| h.name()).collect()
    }

    /// Labels with at least one handler, in taxonomy order.
    pub fn bound_labels(&self) -> impl Iterator<Item = EventLabel> + '_ {
        self.chains
            .iter()
            .filter(|(_, chain)| !chain.is_empty())
            .map(|(label, _)| label)
    }

    /// Get handler count
    pub fn handler_count(&self) -> usize {
        self.chains.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handler_count() == 0
    }

    /// Finish setup and produce the router.
    pub fn freeze(self) -> ActivityRouter {
        info!(
            marker = "REGISTRY_FROZEN",
            operation_type = "registry",
            handler_count = self.handler_count(),
            "HandlerRegistry frozen"
        );

        ActivityRouter::new(self)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();

        for (label, chain) in self.chains.iter() {
            if !chain.is_empty() {
                map.entry(&label, &chain.iter().map(|h| h.name()).collect::<Vec<_>>());
            }
        }

        map.finish()
    }
}
