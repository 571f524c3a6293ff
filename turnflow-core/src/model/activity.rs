//! Activity: one inbound (or outbound) event on a conversational channel.
//!
//! The JSON shape follows the Bot Framework activity schema with camelCase
//! keys. Only `type`, `text`, `name`, `membersAdded` and `membersRemoved` take
//! part in routing; every other field is carried for handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Activity type strings understood by the router. Matching is exact.
pub mod activity_types {
    pub const MESSAGE: &str = "message";
    pub const CONVERSATION_UPDATE: &str = "conversationUpdate";
    pub const EVENT: &str = "event";
}

/// Event name carrying an OAuth token response.
pub const TOKEN_RESPONSE_EVENT_NAME: &str = "tokens/response";

/// A user or bot taking part in a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Conversation the activity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
}

impl ConversationAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub members_added: Option<Vec<ChannelAccount>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub members_removed: Option<Vec<ChannelAccount>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

impl Activity {
    /// Fresh activity of the given type with a generated id and timestamp.
    pub fn new(activity_type: impl Into<String>) -> Self {
        Self {
            activity_type: Some(activity_type.into()),
            id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(activity_types::MESSAGE)
        }
    }

    pub fn conversation_update(added: Vec<ChannelAccount>, removed: Vec<ChannelAccount>) -> Self {
        Self {
            members_added: Some(added),
            members_removed: Some(removed),
            ..Self::new(activity_types::CONVERSATION_UPDATE)
        }
    }

    pub fn event(name: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value,
            ..Self::new(activity_types::EVENT)
        }
    }

    #[must_use]
    pub fn with_from(mut self, from: ChannelAccount) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: ChannelAccount) -> Self {
        self.recipient = Some(recipient);
        self
    }

    #[must_use]
    pub fn with_conversation(mut self, conversation: ConversationAccount) -> Self {
        self.conversation = Some(conversation);
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    /// The activity type, if present and non-empty.
    pub fn type_str(&self) -> Option<&str> {
        self.activity_type.as_deref().filter(|t| !t.is_empty())
    }

    /// Exact, case-sensitive type comparison.
    pub fn is_type(&self, activity_type: &str) -> bool {
        self.type_str() == Some(activity_type)
    }

    pub fn has_members_added(&self) -> bool {
        self.members_added.as_ref().is_some_and(|m| !m.is_empty())
    }

    pub fn has_members_removed(&self) -> bool {
        self.members_removed.as_ref().is_some_and(|m| !m.is_empty())
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    /// Text message answering this activity: sender and recipient swapped,
    /// same channel and conversation, `replyToId` pointing back here.
    pub fn create_reply(&self, text: impl Into<String>) -> Self {
        Self {
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            reply_to_id: self.id.clone(),
            ..Self::message(text)
        }
    }
}
