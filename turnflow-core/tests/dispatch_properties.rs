//! End-to-end dispatch behavior through the public API.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use turnflow_core::{
    Activity, ActivityHandler, ActivityRouter, DispatchError, EventLabel, HandlerRegistry,
    TurnContext,
    controller::handler_fn,
    model::{ChannelAccount, TOKEN_RESPONSE_EVENT_NAME},
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

/// Records `<tag>` on entry and `<tag>/done` on return. Continues only when
/// `proceed` is set, and returns `value`.
fn recorder(
    log: &Log,
    tag: &'static str,
    proceed: bool,
    value: Option<Value>,
) -> impl ActivityHandler + use<> {
    let log = log.clone();

    handler_fn(move |ctx, next| {
        let log = log.clone();
        let value = value.clone();

        Box::pin(async move {
            log.lock().push(tag.to_string());

            if proceed {
                next.run(ctx).await?;
            }

            log.lock().push(format!("{tag}/done"));
            Ok(value)
        })
    })
    .named(tag)
}

fn pass(log: &Log, tag: &'static str) -> impl ActivityHandler + use<> {
    recorder(log, tag, true, None)
}

/// One pass-through recorder on every label, tagged with the label name.
fn trace_all_labels(log: &Log) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    for label in EventLabel::ALL {
        registry.bind(label, pass(log, label.as_str()));
    }

    registry
}

fn entered(log: &Log) -> Vec<String> {
    entries(log)
        .into_iter()
        .filter(|e| !e.ends_with("/done"))
        .collect()
}

#[tokio::test]
async fn empty_chains_still_reach_dialog() {
    let log = new_log();
    let mut registry = HandlerRegistry::new();
    registry.bind(EventLabel::Dialog, pass(&log, "dialog"));
    let router = registry.freeze();

    let activities = vec![
        Activity::message("hi"),
        Activity::conversation_update(Vec::new(), Vec::new()),
        Activity::conversation_update(vec![ChannelAccount::new("a")], Vec::new()),
        Activity::event("custom", None),
        Activity::event(TOKEN_RESPONSE_EVENT_NAME, Some(json!({}))),
        Activity::new("typing"),
    ];
    let count = activities.len();

    for activity in activities {
        let mut ctx = TurnContext::new(activity);
        let report = router.dispatch(&mut ctx).await.unwrap();

        assert!(report.completed);
        assert_eq!(report.stopped_at(), Some(EventLabel::Dialog));
    }

    assert_eq!(entered(&log).len(), count);
}

#[tokio::test]
async fn no_handlers_at_all_completes_with_no_value() {
    let router: ActivityRouter = HandlerRegistry::new().freeze();
    let mut ctx = TurnContext::new(Activity::message("hi"));

    let report = router.dispatch(&mut ctx).await.unwrap();

    assert_eq!(report.value, None);
    assert!(report.completed);
    assert_eq!(
        report.path.to_vec(),
        vec![EventLabel::Turn, EventLabel::Message, EventLabel::Dialog]
    );
}

#[tokio::test]
async fn registration_order_is_preserved() {
    let log = new_log();
    let mut registry = HandlerRegistry::new();
    registry
        .bind(EventLabel::Message, pass(&log, "h1"))
        .bind(EventLabel::Message, pass(&log, "h2"))
        .bind(EventLabel::Dialog, pass(&log, "dialog"));
    let router = registry.freeze();

    let mut ctx = TurnContext::new(Activity::message("hi"));
    router.run(&mut ctx).await.unwrap();

    assert_eq!(
        entries(&log),
        vec!["h1", "h2", "dialog", "dialog/done", "h2/done", "h1/done"]
    );
}

#[tokio::test]
async fn omitted_continuation_stops_the_turn() {
    let log = new_log();
    let mut registry = HandlerRegistry::new();
    registry
        .bind(EventLabel::Turn, pass(&log, "turn"))
        .bind(EventLabel::Message, pass(&log, "h1"))
        .bind(EventLabel::Message, recorder(&log, "gate", false, None))
        .bind(EventLabel::Message, pass(&log, "h3"))
        .bind(EventLabel::Dialog, pass(&log, "dialog"));
    let router = registry.freeze();

    let mut ctx = TurnContext::new(Activity::message("hi"));
    let report = router.dispatch(&mut ctx).await.unwrap();

    assert!(report.short_circuited());
    assert!(!report.reached(EventLabel::Dialog));
    assert_eq!(
        entries(&log),
        vec!["turn", "h1", "gate", "gate/done", "h1/done", "turn/done"]
    );
}

#[tokio::test]
async fn innermost_value_wins() {
    let log = new_log();
    let mut registry = HandlerRegistry::new();
    registry
        .bind(EventLabel::Turn, recorder(&log, "turn", true, Some(json!("outer"))))
        .bind(EventLabel::Message, pass(&log, "message"))
        .bind(EventLabel::Dialog, recorder(&log, "dialog", true, Some(json!("X"))));
    let router = registry.freeze();

    let mut ctx = TurnContext::new(Activity::message("hi"));
    let value = router.run(&mut ctx).await.unwrap();

    assert_eq!(value, Some(json!("X")));
    assert_eq!(entries(&log).last().map(String::as_str), Some("turn/done"));
}

#[tokio::test]
async fn earlier_handler_on_same_label_does_not_override() {
    let log = new_log();
    let mut registry = HandlerRegistry::new();
    registry
        .bind(EventLabel::Dialog, recorder(&log, "first", true, Some(json!(1))))
        .bind(EventLabel::Dialog, recorder(&log, "second", true, Some(json!(2))));
    let router = registry.freeze();

    let mut ctx = TurnContext::new(Activity::message("hi"));

    assert_eq!(router.run(&mut ctx).await.unwrap(), Some(json!(2)));
}

#[tokio::test]
async fn short_circuiting_handler_value_is_captured() {
    let log = new_log();
    let mut registry = HandlerRegistry::new();
    registry
        .bind(EventLabel::Turn, recorder(&log, "turn", true, Some(json!("outer"))))
        .bind(
            EventLabel::Message,
            recorder(&log, "gate", false, Some(json!({ "handled": true }))),
        );
    let router = registry.freeze();

    let mut ctx = TurnContext::new(Activity::message("hi"));

    assert_eq!(
        router.run(&mut ctx).await.unwrap(),
        Some(json!({ "handled": true }))
    );
}

#[tokio::test]
async fn members_added_takes_precedence_over_removed() {
    let log = new_log();
    let router = trace_all_labels(&log).freeze();

    let activity = Activity::conversation_update(
        vec![ChannelAccount::new("a")],
        vec![ChannelAccount::new("b")],
    );
    let mut ctx = TurnContext::new(activity);
    router.run(&mut ctx).await.unwrap();

    assert_eq!(
        entered(&log),
        vec!["Turn", "ConversationUpdate", "MembersAdded", "Dialog"]
    );
}

#[tokio::test]
async fn members_removed_branch_and_plain_update() {
    let log = new_log();
    let router = trace_all_labels(&log).freeze();

    let mut ctx = TurnContext::new(Activity::conversation_update(
        Vec::new(),
        vec![ChannelAccount::new("b")],
    ));
    router.run(&mut ctx).await.unwrap();
    assert_eq!(
        entered(&log),
        vec!["Turn", "ConversationUpdate", "MembersRemoved", "Dialog"]
    );

    log.lock().clear();

    let mut ctx = TurnContext::new(Activity::conversation_update(Vec::new(), Vec::new()));
    router.run(&mut ctx).await.unwrap();
    assert_eq!(entered(&log), vec!["Turn", "ConversationUpdate", "Dialog"]);
}

#[tokio::test]
async fn token_response_event_is_sub_typed() {
    let log = new_log();
    let router = trace_all_labels(&log).freeze();

    let mut ctx = TurnContext::new(Activity::event(TOKEN_RESPONSE_EVENT_NAME, None));
    router.run(&mut ctx).await.unwrap();
    assert_eq!(
        entered(&log),
        vec!["Turn", "Event", "TokenResponseEvent", "Dialog"]
    );

    log.lock().clear();

    let mut ctx = TurnContext::new(Activity::event("tokens/exchange", None));
    router.run(&mut ctx).await.unwrap();
    assert_eq!(entered(&log), vec!["Turn", "Event", "Dialog"]);
}

#[tokio::test]
async fn unknown_type_routes_to_unrecognized() {
    let log = new_log();
    let router = trace_all_labels(&log).freeze();

    let mut ctx = TurnContext::new(Activity::new("SomeVendorSpecificType"));
    router.run(&mut ctx).await.unwrap();

    assert_eq!(
        entered(&log),
        vec!["Turn", "UnrecognizedActivityType", "Dialog"]
    );
}

#[tokio::test]
async fn type_match_is_case_sensitive() {
    let log = new_log();
    let router = trace_all_labels(&log).freeze();

    let mut ctx = TurnContext::new(Activity::new("Message"));
    router.run(&mut ctx).await.unwrap();

    assert_eq!(
        entered(&log),
        vec!["Turn", "UnrecognizedActivityType", "Dialog"]
    );
}

#[tokio::test]
async fn missing_type_is_rejected_before_any_handler() {
    let log = new_log();
    let router = trace_all_labels(&log).freeze();

    let mut typeless = Activity::message("hi");
    typeless.activity_type = None;
    let mut ctx = TurnContext::new(typeless);

    let err = router.run(&mut ctx).await.unwrap_err();

    assert!(matches!(err, DispatchError::MissingActivityType));
    assert!(err.is_precondition());
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn missing_context_and_activity_are_distinct_failures() {
    let log = new_log();
    let router = trace_all_labels(&log).freeze();

    let err = router.run(None::<&mut TurnContext>).await.unwrap_err();
    assert!(matches!(err, DispatchError::MissingContext));

    let mut ctx = TurnContext::empty();
    let err = router.run(&mut ctx).await.unwrap_err();
    assert!(matches!(err, DispatchError::MissingActivity));

    assert!(entries(&log).is_empty());
}

#[derive(Debug, thiserror::Error)]
#[error("search backend unavailable")]
struct BackendDown;

#[tokio::test]
async fn handler_failure_propagates_unchanged() {
    let log = new_log();
    let mut registry = HandlerRegistry::new();
    registry
        .bind(EventLabel::Turn, pass(&log, "turn"))
        .bind_fn(EventLabel::Message, |_ctx, _next| {
            Box::pin(async move { Err(anyhow::Error::new(BackendDown)) })
        })
        .bind(EventLabel::Dialog, pass(&log, "dialog"));
    let router = registry.freeze();

    let mut ctx = TurnContext::new(Activity::message("hi"));
    let err = router.run(&mut ctx).await.unwrap_err();

    let source = err.handler_error().unwrap();
    assert!(source.downcast_ref::<BackendDown>().is_some());
    assert_eq!(entries(&log), vec!["turn"]);
}

#[tokio::test]
async fn routing_reads_the_activity_at_descent_time() {
    let log = new_log();
    let mut registry = trace_all_labels(&log);
    registry.bind_fn(EventLabel::Turn, |ctx, next| {
        Box::pin(async move {
            if let Some(activity) = ctx.activity_mut() {
                activity.activity_type = Some("message".to_string());
            }
            next.run(ctx).await?;
            Ok(None)
        })
    });
    let router = registry.freeze();

    let mut ctx = TurnContext::new(Activity::new("typing"));
    router.run(&mut ctx).await.unwrap();

    assert_eq!(entered(&log), vec!["Turn", "Message", "Dialog"]);
}

#[tokio::test]
async fn concurrent_turns_share_one_router() {
    let mut registry = HandlerRegistry::new();
    registry.bind_fn(EventLabel::Dialog, |ctx, next| {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let text = ctx.activity().and_then(|a| a.text.clone());
            next.run(ctx).await?;
            Ok(text.map(Value::String))
        })
    });
    let router = Arc::new(registry.freeze());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let router = router.clone();
            tokio::spawn(async move {
                let mut ctx = TurnContext::new(Activity::message(format!("turn-{i}")));
                router.run(&mut ctx).await
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let value = task.await.unwrap().unwrap();
        assert_eq!(value, Some(json!(format!("turn-{i}"))));
    }

    assert_eq!(router.metrics().snapshot().completed_turns, 16);
}
