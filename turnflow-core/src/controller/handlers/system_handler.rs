//! Handlers at the edges of the tree: turn logging on entry, unknown activity
//! types, and the `Dialog` fallback that closes every turn.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::controller::next::Next;
use crate::controller::traits::{ActivityHandler, HandlerResult};
use crate::model::turn_context::TurnContext;

/// Logs every inbound activity and continues.
#[derive(Debug, Clone, Default)]
pub struct TurnLogger;

#[async_trait]
impl ActivityHandler for TurnLogger {
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult {
        if let Some(activity) = ctx.activity() {
            info!(
                marker = "TURN_RECEIVED",
                operation_type = "handler",
                activity_type = activity.type_str().unwrap_or_default(),
                activity_id = activity.id.as_deref().unwrap_or_default(),
                channel_id = activity.channel_id.as_deref().unwrap_or_default(),
                "Activity received"
            );
        }

        next.run(ctx).await?;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "turn_logger"
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnrecognizedHandler;

#[async_trait]
impl ActivityHandler for UnrecognizedHandler {
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult {
        warn!(
            marker = "UNRECOGNIZED_ACTIVITY",
            operation_type = "handler",
            activity_type = ctx
                .activity()
                .and_then(|a| a.type_str())
                .unwrap_or_default(),
            "No dedicated handling for activity type"
        );

        next.run(ctx).await?;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "unrecognized"
    }
}

/// Last handler of a turn. Returns an invoke-style status body
/// `{"status": 200, "responded": <bool>}`.
#[derive(Debug, Clone, Default)]
pub struct DialogFallback;

#[async_trait]
impl ActivityHandler for DialogFallback {
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult {
        next.run(ctx).await?;

        Ok(Some(json!({
            "status": 200,
            "responded": ctx.responded(),
        })))
    }

    fn name(&self) -> &'static str {
        "dialog_fallback"
    }
}
