//! EventLabel: the closed set of routing labels handlers bind to.

use std::fmt;
use std::str::FromStr;

use enum_map::Enum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Routing label. Each label owns one handler chain in the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Enum, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum EventLabel {
    /// Fires for every activity, wrapping the whole tree.
    Turn = 0,
    Message = 1,
    ConversationUpdate = 2,
    MembersAdded = 3,
    MembersRemoved = 4,
    Event = 5,
    TokenResponseEvent = 6,
    UnrecognizedActivityType = 7,
    /// Terminal stage reached from every path.
    Dialog = 8,
}

impl EventLabel {
    pub const ALL: [EventLabel; 9] = [
        EventLabel::Turn,
        EventLabel::Message,
        EventLabel::ConversationUpdate,
        EventLabel::MembersAdded,
        EventLabel::MembersRemoved,
        EventLabel::Event,
        EventLabel::TokenResponseEvent,
        EventLabel::UnrecognizedActivityType,
        EventLabel::Dialog,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Turn => "Turn",
            Self::Message => "Message",
            Self::ConversationUpdate => "ConversationUpdate",
            Self::MembersAdded => "MembersAdded",
            Self::MembersRemoved => "MembersRemoved",
            Self::Event => "Event",
            Self::TokenResponseEvent => "TokenResponseEvent",
            Self::UnrecognizedActivityType => "UnrecognizedActivityType",
            Self::Dialog => "Dialog",
        }
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dialog)
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventLabel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| AppError::invalid_input("label", format!("unknown event label '{s}'")))
    }
}
