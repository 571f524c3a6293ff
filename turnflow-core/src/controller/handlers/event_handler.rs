// turnflow-core/src/controller/handlers/event_handler.rs
// OAuth token responses delivered as `tokens/response` events

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::controller::next::Next;
use crate::controller::traits::{ActivityHandler, HandlerResult};
use crate::model::turn_context::TurnContext;

/// Turn state key holding the token payload for handlers further down.
pub const TOKEN_RESPONSE_STATE_KEY: &str = "tokenResponse";

/// Copies the event's `value` into turn state under
/// [`TOKEN_RESPONSE_STATE_KEY`], so `Dialog` can resume a pending sign-in.
#[derive(Debug, Clone, Default)]
pub struct TokenResponseHandler;

/// OAuth connection the token belongs to, or `""` when the payload has none.
fn connection_name(token: &Value) -> &str {
    token
        .get("connectionName")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

#[async_trait]
impl ActivityHandler for TokenResponseHandler {
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult {
        let payload: Option<Value> = ctx.activity().and_then(|a| a.value.clone());

        match payload {
            Some(token) => {
                let connection: &str = connection_name(&token);
                info!(
                    marker = "TOKEN_RESPONSE_RECEIVED",
                    operation_type = "handler",
                    connection,
                    "Token response received"
                );
                ctx.set_state(TOKEN_RESPONSE_STATE_KEY, token);
            }

            None => {
                warn!(
                    marker = "TOKEN_RESPONSE_EMPTY",
                    operation_type = "handler",
                    "Token response event without a value"
                );
            }
        }

        next.run(ctx).await?;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "token_response"
    }
}
