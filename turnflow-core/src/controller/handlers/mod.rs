pub mod event_handler;
pub mod membership_handler;
pub mod message_handler;
pub mod system_handler;

pub use event_handler::{TOKEN_RESPONSE_STATE_KEY, TokenResponseHandler};
pub use membership_handler::{FarewellHandler, WelcomeHandler};
pub use message_handler::EchoHandler;
pub use system_handler::{DialogFallback, TurnLogger, UnrecognizedHandler};

use crate::controller::event_label::EventLabel;
use crate::controller::handler_registry::HandlerRegistry;

/// Bind the stock handler set, one per label that has something to do.
pub fn register_default_handlers(registry: &mut HandlerRegistry) -> &mut HandlerRegistry {
    registry
        .bind(EventLabel::Turn, TurnLogger)
        .bind(EventLabel::Message, EchoHandler::new())
        .bind(EventLabel::MembersAdded, WelcomeHandler)
        .bind(EventLabel::MembersRemoved, FarewellHandler)
        .bind(EventLabel::TokenResponseEvent, TokenResponseHandler)
        .bind(EventLabel::UnrecognizedActivityType, UnrecognizedHandler)
        .bind(EventLabel::Dialog, DialogFallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::activity::Activity;
    use crate::model::turn_context::TurnContext;
    use serde_json::json;

    #[test]
    fn test_default_set_covers_leaf_labels() {
        let mut registry = HandlerRegistry::new();
        register_default_handlers(&mut registry);

        assert_eq!(registry.handler_count(), 7);
        assert!(registry.handlers_for(EventLabel::ConversationUpdate).is_empty());
        assert!(registry.handlers_for(EventLabel::Event).is_empty());
        assert_eq!(registry.handler_names(EventLabel::Dialog), vec!["dialog_fallback"]);
    }

    #[tokio::test]
    async fn test_default_message_turn() {
        let mut registry = HandlerRegistry::new();
        register_default_handlers(&mut registry);
        let router = registry.freeze();

        let mut ctx = TurnContext::new(Activity::message("ping"));
        let value = router.run(&mut ctx).await.unwrap();

        assert_eq!(value, Some(json!({ "status": 200, "responded": true })));
        assert_eq!(ctx.responses()[0].text.as_deref(), Some("You said: ping"));
    }
}
