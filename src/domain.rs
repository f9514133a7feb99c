//! Core data model: the ledger of users and their consumption events.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The ledger maps opaque Telegram user ids to user records. It is the
/// system's sole durable state.
pub type Ledger = HashMap<String, User>;

/// Roles a user can have. Admin unlocks user management, broadcast and
/// artifact download.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Which multi-step dialog (if any) is in progress for a user. Reset to
/// `Idle` at the start of every dispatch, so dialogs are exactly one
/// exchange deep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingCumulativeRange,
    AwaitingPerHourRange,
    AwaitingNewName,
}

/// The reply keyboard currently shown to a user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardKind {
    #[default]
    Default,
    Extended,
    Stats,
    DateChooser,
}

/// The two kinds of consumption events the ledger tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrinkKind {
    Coffee,
    Tea,
}

impl DrinkKind {
    pub fn emoji(self) -> &'static str {
        match self {
            DrinkKind::Coffee => "\u{2615}",
            DrinkKind::Tea => "\u{1F375}",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DrinkKind::Coffee => "Coffee",
            DrinkKind::Tea => "Tea",
        }
    }
}

/// A user record within the ledger. Event vectors are append-only except
/// for pop-tail, so they stay chronologically non-decreasing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub role: Role,
    pub coffees: Vec<DateTime<Local>>,
    pub teas: Vec<DateTime<Local>>,
    pub notify_coffee: bool,
    pub notify_tea: bool,
    #[serde(default)]
    pub conversation: ConversationState,
    #[serde(default)]
    pub keyboard: KeyboardKind,
}

impl User {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        User {
            name: name.into(),
            role,
            coffees: Vec::new(),
            teas: Vec::new(),
            notify_coffee: true,
            notify_tea: true,
            conversation: ConversationState::default(),
            keyboard: KeyboardKind::default(),
        }
    }

    pub fn events(&self, kind: DrinkKind) -> &[DateTime<Local>] {
        match kind {
            DrinkKind::Coffee => &self.coffees,
            DrinkKind::Tea => &self.teas,
        }
    }

    /// Append a consumption event with the current wall-clock time.
    pub fn record(&mut self, kind: DrinkKind, at: DateTime<Local>) {
        match kind {
            DrinkKind::Coffee => self.coffees.push(at),
            DrinkKind::Tea => self.teas.push(at),
        }
    }

    /// Pop the most recent event of the given kind. Popping an empty
    /// sequence is a no-op, not an error.
    pub fn remove_last(&mut self, kind: DrinkKind) {
        match kind {
            DrinkKind::Coffee => self.coffees.pop(),
            DrinkKind::Tea => self.teas.pop(),
        };
    }

    pub fn notify_enabled(&self, kind: DrinkKind) -> bool {
        match kind {
            DrinkKind::Coffee => self.notify_coffee,
            DrinkKind::Tea => self.notify_tea,
        }
    }

    pub fn set_notify(&mut self, kind: DrinkKind, enabled: bool) {
        match kind {
            DrinkKind::Coffee => self.notify_coffee = enabled,
            DrinkKind::Tea => self.notify_tea = enabled,
        }
    }
}

/// A month selection from the date-chooser dialog, or the whole history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateRange {
    All,
    Month { year: i32, month: u32 },
}

impl DateRange {
    pub fn contains(&self, ts: &DateTime<Local>) -> bool {
        use chrono::Datelike;
        match *self {
            DateRange::All => true,
            DateRange::Month { year, month } => ts.year() == year && ts.month() == month,
        }
    }

    /// Human-readable month label ("March 2026"), `None` for `All`.
    pub fn month_label(&self) -> Option<String> {
        match *self {
            DateRange::All => None,
            DateRange::Month { year, month } => chrono::NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%B %Y").to_string()),
        }
    }
}

/// Contact payload shared through the chat, used to register a new user.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactPayload {
    pub id: String,
    pub name: String,
}

/// A parsed inbound chat event, as delivered by the transport adapter.
#[derive(Clone, Debug, Default)]
pub struct InboundMessage {
    pub sender_id: String,
    pub text: Option<String>,
    pub contact: Option<ContactPayload>,
}

impl InboundMessage {
    pub fn text(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        InboundMessage {
            sender_id: sender_id.into(),
            text: Some(text.into()),
            contact: None,
        }
    }

    pub fn contact(sender_id: impl Into<String>, contact: ContactPayload) -> Self {
        InboundMessage {
            sender_id: sender_id.into(),
            text: None,
            contact: Some(contact),
        }
    }
}
