//! SharedRouter: a hot-swappable [`ActivityRouter`].
//!
//! A router is immutable once frozen. To change the bound handlers at runtime
//! build a new registry, freeze it and [`reload`](SharedRouter::reload) it
//! here. The swap goes through an [`ArcSwap`](https://docs.rs/arc-swap): turns
//! already in flight finish on the router they started with, later turns see
//! the new one. Metrics belong to each router and start from zero after a
//! reload.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::info;

use crate::controller::activity_router::{ActivityRouter, TurnReport};
use crate::error::DispatchError;
use crate::model::turn_context::TurnContext;

#[derive(Debug)]
pub struct SharedRouter {
    current: ArcSwap<ActivityRouter>,
}

impl SharedRouter {
    pub fn new(router: ActivityRouter) -> Self {
        Self {
            current: ArcSwap::from_pointee(router),
        }
    }

    /// Router currently serving new turns.
    pub fn snapshot(&self) -> Arc<ActivityRouter> {
        self.current.load_full()
    }

    /// Install `router` for subsequent turns; returns the one it replaced.
    pub fn reload(&self, router: ActivityRouter) -> Arc<ActivityRouter> {
        info!(
            marker = "ROUTER_RELOADED",
            operation_type = "registry",
            handler_count = router.registry().handler_count(),
            "Swapped active router"
        );

        self.current.swap(Arc::new(router))
    }

    pub async fn run<'c>(
        &self,
        context: impl Into<Option<&'c mut TurnContext>>,
    ) -> Result<Option<Value>, DispatchError> {
        let router: Arc<ActivityRouter> = self.current.load_full();
        router.run(context).await
    }

    pub async fn dispatch<'c>(
        &self,
        context: impl Into<Option<&'c mut TurnContext>>,
    ) -> Result<TurnReport, DispatchError> {
        let router: Arc<ActivityRouter> = self.current.load_full();
        router.dispatch(context).await
    }
}

impl From<ActivityRouter> for SharedRouter {
    fn from(router: ActivityRouter) -> Self {
        Self::new(router)
    }
}
