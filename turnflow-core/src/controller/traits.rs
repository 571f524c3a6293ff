use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::controller::next::Next;
use crate::model::turn_context::TurnContext;

/// What a handler produces: `Ok(None)` when it has nothing to return.
pub type HandlerResult = anyhow::Result<Option<Value>>;

/// A callback bound to one [`EventLabel`](crate::controller::event_label::EventLabel).
///
/// The handler decides whether the turn goes on: awaiting `next.run(ctx)`
/// resumes the chain (next handler, or the next tree stage once the chain is
/// exhausted); returning without it stops the turn right here.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult;

    /// Handler name for debugging.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Adapter turning a closure into an [`ActivityHandler`]. See [`handler_fn`].
pub struct FnHandler<F> {
    name: &'static str,
    f: F,
}

impl<F> FnHandler<F> {
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

/// Wrap a closure as a handler.
///
/// ```rust,ignore
/// registry.bind(
///     EventLabel::Message,
///     handler_fn(|ctx, next| Box::pin(async move {
///         ctx.send_text("typing...");
///         next.run(ctx).await?;
///         Ok(None)
///     })),
/// );
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut TurnContext, Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    FnHandler {
        name: "closure",
        f,
    }
}

#[async_trait]
impl<F> ActivityHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut TurnContext, Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult {
        (self.f)(ctx, next).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
