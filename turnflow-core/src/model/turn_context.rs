//! TurnContext: everything one dispatch call works on.
//!
//! Created by the transport for each inbound activity and handed to
//! `ActivityRouter::run`. Handlers may edit the activity, queue replies and
//! stash turn-scoped values; the router itself only reads the activity.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::activity::Activity;

#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    activity: Option<Activity>,
    responses: Vec<Activity>,
    state: HashMap<String, Value>,
}

impl TurnContext {
    pub fn new(activity: Activity) -> Self {
        Self {
            activity: Some(activity),
            ..Self::default()
        }
    }

    /// Context without an activity. Dispatching it is a precondition failure.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn activity(&self) -> Option<&Activity> {
        self.activity.as_ref()
    }

    pub fn activity_mut(&mut self) -> Option<&mut Activity> {
        self.activity.as_mut()
    }

    /// Replace the inbound activity.
    pub fn set_activity(&mut self, activity: Activity) {
        self.activity = Some(activity);
    }

    /// Queue an outbound activity; returns its id.
    pub fn send_activity(&mut self, activity: Activity) -> Option<String> {
        let id = activity.id.clone();
        self.responses.push(activity);
        id
    }

    /// Queue a text reply addressed back to the sender of the inbound activity.
    pub fn send_text(&mut self, text: impl Into<String>) -> Option<String> {
        let reply = match &self.activity {
            Some(inbound) => inbound.create_reply(text),
            None => Activity::message(text),
        };

        self.send_activity(reply)
    }

    pub fn responses(&self) -> &[Activity] {
        &self.responses
    }

    /// Drain queued replies, leaving the queue empty.
    pub fn take_responses(&mut self) -> Vec<Activity> {
        std::mem::take(&mut self.responses)
    }

    pub fn responded(&self) -> bool {
        !self.responses.is_empty()
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    pub fn state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn take_state(&mut self, key: &str) -> Option<Value> {
        self.state.remove(key)
    }
}
