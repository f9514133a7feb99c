//! Keyboard builder: the four fixed reply-keyboard layouts shown to users.
//!
//! The core builds keyboards as plain rows of button labels so the layouts
//! stay testable without Telegram types; the transport adapter converts them
//! into the wire representation.

use chrono::{Datelike, Months, NaiveDate};

use crate::domain::{DrinkKind, KeyboardKind, User};

/// The UI affordance attached to an outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplySpec {
    /// A reply keyboard, as rows of button labels.
    Keyboard(Vec<Vec<String>>),
    /// Remove any visible reply keyboard.
    Remove,
}

fn notify_button(kind: DrinkKind, enabled: bool) -> String {
    let state = if enabled { "[on]" } else { "[off]" };
    format!("{}Updates {}", kind.emoji(), state)
}

/// Build the keyboard for a user from their active affordance and live
/// notify flags. `today` anchors the rolling months of the date chooser.
pub fn for_user(user: &User, today: NaiveDate) -> ReplySpec {
    let coffee = DrinkKind::Coffee.emoji();
    let tea = DrinkKind::Tea.emoji();
    let rows = match user.keyboard {
        KeyboardKind::Extended => vec![
            vec![format!("-{coffee}"), format!("-{tea}")],
            vec!["statistics".to_string(), "rename".to_string()],
            vec!["back".to_string()],
        ],
        KeyboardKind::Stats => vec![
            vec!["plot cumulative count".to_string()],
            vec!["plot coffee per time of day".to_string()],
            vec!["back".to_string()],
        ],
        KeyboardKind::DateChooser => {
            // first of the current month, then the two months before it
            let current = today.with_day(1).unwrap_or(today);
            let mut rows = vec![vec!["All".to_string()]];
            for back in 0..3 {
                if let Some(month) = current.checked_sub_months(Months::new(back)) {
                    rows.push(vec![month.format("%b %Y").to_string()]);
                }
            }
            rows.push(vec!["back".to_string()]);
            rows
        }
        KeyboardKind::Default => vec![
            vec![coffee.to_string(), tea.to_string()],
            vec![format!("{coffee}?"), format!("{tea}?")],
            vec![
                notify_button(DrinkKind::Coffee, user.notify_coffee),
                notify_button(DrinkKind::Tea, user.notify_tea),
            ],
            vec!["more".to_string()],
        ],
    };
    ReplySpec::Keyboard(rows)
}
