// turnflow-core/src/controller/handlers/message_handler.rs
// Plain echo for text messages

use async_trait::async_trait;
use tracing::debug;

use crate::controller::next::Next;
use crate::controller::traits::{ActivityHandler, HandlerResult};
use crate::model::turn_context::TurnContext;

/// Replies `You said: <text>` to every message that carries text, then
/// continues so `Dialog` still sees the turn.
#[derive(Debug, Clone, Default)]
pub struct EchoHandler {
    prefix: Option<String>,
}

impl EchoHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default `You said: ` prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn reply_for(&self, text: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{text}"),
            None => format!("You said: {text}"),
        }
    }
}

#[async_trait]
impl ActivityHandler for EchoHandler {
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult {
        let text: Option<String> = ctx
            .activity()
            .and_then(|a| a.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);

        if let Some(text) = text {
            debug!(marker = "ECHO", operation_type = "handler", len = text.len());
            ctx.send_text(self.reply_for(&text));
        }

        next.run(ctx).await?;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}
