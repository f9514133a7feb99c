//! Command resolution and permission gating.
//!
//! `resolve` turns a raw inbound message plus the sender's conversation
//! state into a `(Command, Argument)` pair. It is total: every message in
//! every state yields a command, falling back to `Command::Invalid`.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::config::MAX_NAME_LEN;
use crate::domain::{ContactPayload, ConversationState, DateRange, InboundMessage, Role};

/// Every command a user can issue to the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    AddCoffee,
    RemoveCoffee,
    AddTea,
    RemoveTea,
    CurrentStateCoffee,
    CurrentStateTea,
    ToggleNotifyCoffee,
    ToggleNotifyTea,
    AddUser,
    Broadcast,
    GetFile,
    ExtendedKeyboard,
    DefaultKeyboard,
    StatsKeyboard,
    StartRename,
    FinishRename,
    PlotMenu,
    RenderCumulativePlot,
    RenderPerHourPlot,
    Invalid,
}

/// The argument attached to a resolved command. A tagged union keeps the
/// shapes apart instead of funnelling everything through one string.
#[derive(Clone, Debug, PartialEq)]
pub enum Argument {
    None,
    Text(String),
    Range(DateRange),
    Contact(ContactPayload),
}

// Maps the leading message token to the command it stands for. The emoji
// tokens are the keyboard button labels themselves.
static TOKEN_TABLE: LazyLock<HashMap<&'static str, Command>> = LazyLock::new(|| {
    HashMap::from([
        ("\u{2615}", Command::AddCoffee),
        ("\u{1F375}", Command::AddTea),
        ("-\u{2615}", Command::RemoveCoffee),
        ("-\u{1F375}", Command::RemoveTea),
        ("?", Command::CurrentStateCoffee),
        ("\u{2615}?", Command::CurrentStateCoffee),
        ("\u{1F375}?", Command::CurrentStateTea),
        ("\u{2615}Updates", Command::ToggleNotifyCoffee),
        ("\u{1F375}Updates", Command::ToggleNotifyTea),
        ("broadcast", Command::Broadcast),
        ("get", Command::GetFile),
        ("more", Command::ExtendedKeyboard),
        ("back", Command::DefaultKeyboard),
        ("statistics", Command::StatsKeyboard),
        ("plot", Command::PlotMenu),
        ("rename", Command::StartRename),
    ])
});

/// Commands which require the admin role.
pub const ADMIN_COMMANDS: &[Command] = &[Command::AddUser, Command::Broadcast, Command::GetFile];

/// Whether the given role may execute the command. Rejection is a normal
/// outcome, reported by the dispatcher, not an error.
pub fn is_authorized(command: Command, role: Role) -> bool {
    !ADMIN_COMMANDS.contains(&command) || role == Role::Admin
}

/// Resolve an inbound message against the sender's conversation state.
pub fn resolve(message: &InboundMessage, state: ConversationState) -> (Command, Argument) {
    match state {
        ConversationState::Idle => resolve_idle(message),
        ConversationState::AwaitingCumulativeRange => {
            resolve_range(message, Command::RenderCumulativePlot)
        }
        ConversationState::AwaitingPerHourRange => {
            resolve_range(message, Command::RenderPerHourPlot)
        }
        ConversationState::AwaitingNewName => resolve_rename(message),
    }
}

fn resolve_idle(message: &InboundMessage) -> (Command, Argument) {
    if let Some(text) = message.text.as_deref() {
        let trimmed = text.trim_start();
        let Some(first) = trimmed.split_whitespace().next() else {
            return (Command::Invalid, Argument::None);
        };
        // tolerate colons in the command token ("get:" style)
        let token = first.replace(':', "");
        match TOKEN_TABLE.get(token.as_str()) {
            Some(&command) => {
                let rest = trimmed[first.len()..].trim();
                if rest.is_empty() {
                    (command, Argument::None)
                } else {
                    (command, Argument::Text(rest.to_string()))
                }
            }
            None => (Command::Invalid, Argument::None),
        }
    } else if let Some(contact) = &message.contact {
        (Command::AddUser, Argument::Contact(contact.clone()))
    } else {
        (Command::Invalid, Argument::None)
    }
}

fn resolve_range(message: &InboundMessage, command: Command) -> (Command, Argument) {
    let Some(text) = message.text.as_deref().map(str::trim) else {
        return (Command::Invalid, Argument::None);
    };
    if text == "All" {
        return (command, Argument::Range(DateRange::All));
    }
    match parse_month(text) {
        Some((year, month)) => (command, Argument::Range(DateRange::Month { year, month })),
        None => {
            // the date chooser's own "back" button lands here as well
            info!(text, "unparsable date selection, dropping exchange");
            (Command::Invalid, Argument::None)
        }
    }
}

fn resolve_rename(message: &InboundMessage) -> (Command, Argument) {
    match message.text.as_deref() {
        Some(text) if !text.is_empty() => {
            let name: String = text.chars().take(MAX_NAME_LEN).collect();
            (Command::FinishRename, Argument::Text(name))
        }
        _ => (Command::Invalid, Argument::None),
    }
}

/// Parse a month selection like "Mar 2026", "March 2026" or "2026-03".
fn parse_month(text: &str) -> Option<(i32, u32)> {
    for fmt in ["%d %b %Y", "%d %B %Y", "%d %Y-%m"] {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("1 {text}"), fmt) {
            return Some((date.year(), date.month()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_msg(text: &str) -> InboundMessage {
        InboundMessage::text("42", text)
    }

    #[test]
    fn test_idle_resolves_known_tokens() {
        let cases = [
            ("\u{2615}", Command::AddCoffee),
            ("\u{1F375}", Command::AddTea),
            ("-\u{2615}", Command::RemoveCoffee),
            ("-\u{1F375}", Command::RemoveTea),
            ("?", Command::CurrentStateCoffee),
            ("\u{2615}?", Command::CurrentStateCoffee),
            ("\u{1F375}?", Command::CurrentStateTea),
            ("more", Command::ExtendedKeyboard),
            ("back", Command::DefaultKeyboard),
            ("statistics", Command::StatsKeyboard),
            ("rename", Command::StartRename),
        ];
        for (token, expected) in cases {
            let (command, argument) = resolve(&text_msg(token), ConversationState::Idle);
            assert_eq!(command, expected, "token {token:?}");
            assert_eq!(argument, Argument::None);
        }
    }

    #[test]
    fn test_idle_extracts_trailing_argument() {
        let (command, argument) = resolve(&text_msg("broadcast hello all"), ConversationState::Idle);
        assert_eq!(command, Command::Broadcast);
        assert_eq!(argument, Argument::Text("hello all".to_string()));

        let (command, argument) = resolve(&text_msg("get state"), ConversationState::Idle);
        assert_eq!(command, Command::GetFile);
        assert_eq!(argument, Argument::Text("state".to_string()));
    }

    #[test]
    fn test_idle_strips_colon_from_token() {
        let (command, _) = resolve(&text_msg("get: state"), ConversationState::Idle);
        assert_eq!(command, Command::GetFile);
    }

    #[test]
    fn test_idle_toggle_carries_displayed_label() {
        let (command, argument) =
            resolve(&text_msg("\u{2615}Updates [on]"), ConversationState::Idle);
        assert_eq!(command, Command::ToggleNotifyCoffee);
        assert_eq!(argument, Argument::Text("[on]".to_string()));
    }

    #[test]
    fn test_idle_unknown_token_is_invalid() {
        let (command, argument) = resolve(&text_msg("espresso"), ConversationState::Idle);
        assert_eq!(command, Command::Invalid);
        assert_eq!(argument, Argument::None);
    }

    #[test]
    fn test_idle_contact_resolves_to_add_user() {
        let contact = ContactPayload {
            id: "777".to_string(),
            name: "Dana".to_string(),
        };
        let message = InboundMessage::contact("42", contact.clone());
        let (command, argument) = resolve(&message, ConversationState::Idle);
        assert_eq!(command, Command::AddUser);
        assert_eq!(argument, Argument::Contact(contact));
    }

    #[test]
    fn test_range_state_accepts_all_sentinel() {
        let (command, argument) =
            resolve(&text_msg("All"), ConversationState::AwaitingCumulativeRange);
        assert_eq!(command, Command::RenderCumulativePlot);
        assert_eq!(argument, Argument::Range(DateRange::All));
    }

    #[test]
    fn test_range_state_parses_month_formats() {
        for input in ["Mar 2026", "March 2026", "2026-03"] {
            let (command, argument) =
                resolve(&text_msg(input), ConversationState::AwaitingPerHourRange);
            assert_eq!(command, Command::RenderPerHourPlot, "input {input:?}");
            assert_eq!(
                argument,
                Argument::Range(DateRange::Month { year: 2026, month: 3 })
            );
        }
    }

    #[test]
    fn test_range_state_parse_failure_is_silent_invalid() {
        for input in ["back", "yesterday", ""] {
            let (command, argument) =
                resolve(&text_msg(input), ConversationState::AwaitingCumulativeRange);
            assert_eq!(command, Command::Invalid, "input {input:?}");
            assert_eq!(argument, Argument::None);
        }
    }

    #[test]
    fn test_rename_state_truncates_to_fifteen_chars() {
        let (command, argument) = resolve(
            &text_msg("ABCDEFGHIJKLMNOPQRST"),
            ConversationState::AwaitingNewName,
        );
        assert_eq!(command, Command::FinishRename);
        assert_eq!(argument, Argument::Text("ABCDEFGHIJKLMNO".to_string()));
    }

    #[test]
    fn test_rename_state_without_text_is_invalid() {
        let contact = InboundMessage::contact(
            "42",
            ContactPayload {
                id: "1".to_string(),
                name: "X".to_string(),
            },
        );
        let (command, _) = resolve(&contact, ConversationState::AwaitingNewName);
        assert_eq!(command, Command::Invalid);

        let (command, _) = resolve(&text_msg(""), ConversationState::AwaitingNewName);
        assert_eq!(command, Command::Invalid);
    }

    #[test]
    fn test_resolver_is_total_over_states() {
        let states = [
            ConversationState::Idle,
            ConversationState::AwaitingCumulativeRange,
            ConversationState::AwaitingPerHourRange,
            ConversationState::AwaitingNewName,
        ];
        let messages = [
            text_msg("\u{2615}"),
            text_msg("no such command"),
            text_msg(""),
            InboundMessage {
                sender_id: "42".to_string(),
                text: None,
                contact: None,
            },
            InboundMessage::contact(
                "42",
                ContactPayload {
                    id: "9".to_string(),
                    name: "Eve".to_string(),
                },
            ),
        ];
        for state in states {
            for message in &messages {
                // must not panic; every pair yields some command
                let _ = resolve(message, state);
            }
        }
    }

    #[test]
    fn test_admin_gate_rejects_exactly_the_admin_set() {
        let all = [
            Command::AddCoffee,
            Command::RemoveCoffee,
            Command::AddTea,
            Command::RemoveTea,
            Command::CurrentStateCoffee,
            Command::CurrentStateTea,
            Command::ToggleNotifyCoffee,
            Command::ToggleNotifyTea,
            Command::AddUser,
            Command::Broadcast,
            Command::GetFile,
            Command::ExtendedKeyboard,
            Command::DefaultKeyboard,
            Command::StatsKeyboard,
            Command::StartRename,
            Command::FinishRename,
            Command::PlotMenu,
            Command::RenderCumulativePlot,
            Command::RenderPerHourPlot,
            Command::Invalid,
        ];
        for command in all {
            let expect_reject = ADMIN_COMMANDS.contains(&command);
            assert_eq!(is_authorized(command, Role::User), !expect_reject);
            assert!(is_authorized(command, Role::Admin));
        }
    }
}
