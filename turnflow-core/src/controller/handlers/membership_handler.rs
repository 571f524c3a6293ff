// turnflow-core/src/controller/handlers/membership_handler.rs
// Greetings and departures on conversationUpdate

use async_trait::async_trait;
use tracing::info;

use crate::controller::next::Next;
use crate::controller::traits::{ActivityHandler, HandlerResult};
use crate::model::activity::ChannelAccount;
use crate::model::turn_context::TurnContext;

fn display_name(account: &ChannelAccount) -> &str {
    account.name.as_deref().unwrap_or(&account.id)
}

/// Greets every added member except the bot itself (the activity recipient).
#[derive(Debug, Clone, Default)]
pub struct WelcomeHandler;

#[async_trait]
impl ActivityHandler for WelcomeHandler {
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult {
        let greetings: Vec<String> = match ctx.activity() {
            Some(activity) => {
                let bot_id: Option<&str> = activity.recipient.as_ref().map(|r| r.id.as_str());

                activity
                    .members_added
                    .iter()
                    .flatten()
                    .filter(|member| Some(member.id.as_str()) != bot_id)
                    .map(|member| format!("Welcome, {}!", display_name(member)))
                    .collect()
            }

            None => Vec::new(),
        };

        info!(
            marker = "MEMBERS_WELCOMED",
            operation_type = "handler",
            count = greetings.len(),
            "Greeting new members"
        );

        for greeting in greetings {
            ctx.send_text(greeting);
        }

        next.run(ctx).await?;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "welcome"
    }
}

/// Logs members leaving the conversation. Sends nothing.
#[derive(Debug, Clone, Default)]
pub struct FarewellHandler;

#[async_trait]
impl ActivityHandler for FarewellHandler {
    async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> HandlerResult {
        if let Some(activity) = ctx.activity() {
            for member in activity.members_removed.iter().flatten() {
                info!(
                    marker = "MEMBER_LEFT",
                    operation_type = "handler",
                    member_id = %member.id,
                    member_name = display_name(member),
                    "Member left conversation"
                );
            }
        }

        next.run(ctx).await?;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "farewell"
    }
}
