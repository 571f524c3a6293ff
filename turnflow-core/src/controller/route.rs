//! Classification tree for inbound activities.
//!
//! Each label owns an ordered branch table. Leaving a label's chain moves to
//! the child of the first branch whose condition holds; `Dialog` has no
//! branches and ends the walk.
//!
//! ```text
//! Turn ─┬─ Message ─────────────────────────────── Dialog
//!       ├─ ConversationUpdate ─┬─ MembersAdded ──── Dialog
//!       │                      ├─ MembersRemoved ── Dialog
//!       │                      └─────────────────── Dialog
//!       ├─ Event ─┬─ TokenResponseEvent ─────────── Dialog
//!       │         └──────────────────────────────── Dialog
//!       └─ UnrecognizedActivityType ─────────────── Dialog
//! ```

use smallvec::SmallVec;

use crate::controller::event_label::EventLabel;
use crate::model::activity::{Activity, TOKEN_RESPONSE_EVENT_NAME, activity_types};

/// Inline capacity covers the deepest path (Turn → branch → sub-branch → Dialog).
pub type LabelPath = SmallVec<[EventLabel; 4]>;

/// Child-selection predicate of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// `activity.type` equals the given string exactly.
    TypeIs(&'static str),
    /// `membersAdded` is present and non-empty.
    MembersAdded,
    /// `membersRemoved` is present and non-empty.
    MembersRemoved,
    /// `activity.name` equals the given string.
    NameIs(&'static str),
    Always,
}

impl Condition {
    /// Without an activity only `Always` holds.
    pub fn matches(self, activity: Option<&Activity>) -> bool {
        match (self, activity) {
            (Self::Always, _) => true,

            (Self::TypeIs(activity_type), Some(a)) => a.is_type(activity_type),

            (Self::MembersAdded, Some(a)) => a.has_members_added(),

            (Self::MembersRemoved, Some(a)) => a.has_members_removed(),

            (Self::NameIs(name), Some(a)) => a.is_named(name),

            (_, None) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub when: Condition,
    pub child: EventLabel,
}

const fn branch(when: Condition, child: EventLabel) -> Branch {
    Branch { when, child }
}

const TURN: &[Branch] = &[
    branch(
        Condition::TypeIs(activity_types::MESSAGE),
        EventLabel::Message,
    ),
    branch(
        Condition::TypeIs(activity_types::CONVERSATION_UPDATE),
        EventLabel::ConversationUpdate,
    ),
    branch(Condition::TypeIs(activity_types::EVENT), EventLabel::Event),
    branch(Condition::Always, EventLabel::UnrecognizedActivityType),
];

const CONVERSATION_UPDATE: &[Branch] = &[
    branch(Condition::MembersAdded, EventLabel::MembersAdded),
    branch(Condition::MembersRemoved, EventLabel::MembersRemoved),
    branch(Condition::Always, EventLabel::Dialog),
];

const EVENT: &[Branch] = &[
    branch(
        Condition::NameIs(TOKEN_RESPONSE_EVENT_NAME),
        EventLabel::TokenResponseEvent,
    ),
    branch(Condition::Always, EventLabel::Dialog),
];

const TO_DIALOG: &[Branch] = &[branch(Condition::Always, EventLabel::Dialog)];

/// Branch table of a label, in evaluation order.
pub const fn branches(label: EventLabel) -> &'static [Branch] {
    match label {
        EventLabel::Turn => TURN,

        EventLabel::ConversationUpdate => CONVERSATION_UPDATE,

        EventLabel::Event => EVENT,

        EventLabel::Message
        | EventLabel::MembersAdded
        | EventLabel::MembersRemoved
        | EventLabel::TokenResponseEvent
        | EventLabel::UnrecognizedActivityType => TO_DIALOG,

        EventLabel::Dialog => &[],
    }
}

/// Next label once `label`'s chain is exhausted, or `None` past `Dialog`.
pub fn descend(label: EventLabel, activity: Option<&Activity>) -> Option<EventLabel> {
    branches(label)
        .iter()
        .find(|b| b.when.matches(activity))
        .map(|b| b.child)
}

/// Full label path an activity takes when no handler short-circuits.
pub fn classify(activity: &Activity) -> LabelPath {
    let mut path = LabelPath::new();
    let mut current = Some(EventLabel::Turn);

    while let Some(label) = current {
        path.push(label);
        current = descend(label, Some(activity));
    }

    path
}
