//! Command execution and the conversation state machine.
//!
//! `handle_inbound` is the single entry point for an inbound chat event. It
//! resolves the command against the sender's conversation state, resets that
//! state at one explicit point, gates on permissions and then executes. The
//! whole path runs under the caller's state lock, so executions never
//! interleave their read-modify-write of the ledger or the snapshot file.

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use rand::seq::SliceRandom;
use tracing::{debug, error, info, warn};

use crate::commands::{self, Argument, Command};
use crate::config::{Settings, COFFEE_PHRASES, TEA_PHRASES};
use crate::domain::{
    ConversationState, DateRange, DrinkKind, InboundMessage, KeyboardKind, Ledger, Role, User,
};
use crate::keyboard::{self, ReplySpec};
use crate::outbound::{ChartRenderer, Notifier, UserScatter, UserSeries};
use crate::reporting;
use crate::storage::Repository;

/// Collaborators shared by every dispatch.
pub struct AppContext {
    pub notifier: Arc<dyn Notifier>,
    pub renderer: Arc<dyn ChartRenderer>,
    pub repository: Arc<dyn Repository>,
    pub settings: Settings,
}

/// Handle one inbound chat event end to end. Messages from unknown senders
/// are dropped without creating a record.
pub async fn handle_inbound(
    ctx: &AppContext,
    ledger: &mut Ledger,
    message: InboundMessage,
) -> Result<()> {
    let Some(user) = ledger.get_mut(&message.sender_id) else {
        info!(sender_id = %message.sender_id, "ignoring message from unregistered sender");
        return Ok(());
    };

    let (command, argument) = commands::resolve(&message, user.conversation);

    // The one place conversation state and keyboard reset. Commands that
    // open a dialog (StartRename, PlotMenu) set their own state afterwards.
    user.conversation = ConversationState::Idle;
    user.keyboard = KeyboardKind::Default;

    if !commands::is_authorized(command, user.role) {
        info!(command = ?command, sender_id = %message.sender_id, "command not allowed");
        deliver_text(ctx, ledger, &message.sender_id, "Command not allowed").await;
        return Ok(());
    }

    debug!(command = ?command, sender_id = %message.sender_id, "executing command");
    execute(ctx, ledger, command, argument, &message.sender_id).await;
    Ok(())
}

async fn execute(
    ctx: &AppContext,
    ledger: &mut Ledger,
    command: Command,
    argument: Argument,
    user_id: &str,
) {
    match (command, argument) {
        (Command::AddCoffee, _) => add_event(ctx, ledger, user_id, DrinkKind::Coffee).await,
        (Command::AddTea, _) => add_event(ctx, ledger, user_id, DrinkKind::Tea).await,
        (Command::RemoveCoffee, _) => {
            remove_last_event(ctx, ledger, user_id, DrinkKind::Coffee).await
        }
        (Command::RemoveTea, _) => remove_last_event(ctx, ledger, user_id, DrinkKind::Tea).await,
        (Command::CurrentStateCoffee, _) => {
            let summary = reporting::summary_text(ledger, DrinkKind::Coffee, Local::now());
            deliver_text(ctx, ledger, user_id, &summary).await;
        }
        (Command::CurrentStateTea, _) => {
            let summary = reporting::summary_text(ledger, DrinkKind::Tea, Local::now());
            deliver_text(ctx, ledger, user_id, &summary).await;
        }
        (Command::ToggleNotifyCoffee, argument) => {
            toggle_notify(ctx, ledger, user_id, DrinkKind::Coffee, argument).await
        }
        (Command::ToggleNotifyTea, argument) => {
            toggle_notify(ctx, ledger, user_id, DrinkKind::Tea, argument).await
        }
        (Command::AddUser, Argument::Contact(contact)) => {
            info!(new_id = %contact.id, name = %contact.name, "adding user");
            // overwriting an existing id is allowed and acts as a reset
            ledger.insert(contact.id.clone(), User::new(contact.name.clone(), Role::User));
            persist(ctx, ledger).await;
            deliver_text(ctx, ledger, &contact.id, "You have been added to the coffeebot").await;
            let announcement = format!("Successfully added {} to the Bot. Welcome!", contact.name);
            let others: Vec<String> =
                ledger.keys().filter(|id| **id != contact.id).cloned().collect();
            for id in others {
                deliver_text(ctx, ledger, &id, &announcement).await;
            }
        }
        (Command::ExtendedKeyboard, _) => {
            set_keyboard(ctx, ledger, user_id, KeyboardKind::Extended, "showing more options").await
        }
        (Command::DefaultKeyboard, _) => {
            set_keyboard(ctx, ledger, user_id, KeyboardKind::Default, "back to default menu").await
        }
        (Command::StatsKeyboard, _) => {
            set_keyboard(ctx, ledger, user_id, KeyboardKind::Stats, "statistics").await
        }
        (Command::StartRename, _) => {
            if let Some(user) = ledger.get_mut(user_id) {
                user.conversation = ConversationState::AwaitingNewName;
                user.keyboard = KeyboardKind::Default;
            }
            deliver_with(ctx, user_id, "please enter the new name", ReplySpec::Remove).await;
        }
        (Command::FinishRename, Argument::Text(name)) => {
            if let Some(user) = ledger.get_mut(user_id) {
                user.name = name.clone();
            }
            persist(ctx, ledger).await;
            deliver_text(ctx, ledger, user_id, &format!("renamed to {name}")).await;
        }
        (Command::Broadcast, Argument::Text(text)) => {
            info!(sender_id = %user_id, "sending broadcast");
            let everyone: Vec<String> = ledger.keys().cloned().collect();
            for id in everyone {
                deliver_text(ctx, ledger, &id, &text).await;
            }
        }
        (Command::GetFile, Argument::Text(selector)) => {
            let path = match selector.as_str() {
                "state" => ctx.settings.state_file.clone(),
                "log" => ctx.settings.log_file.clone(),
                other => {
                    debug!(selector = other, "unknown file selector, ignoring");
                    return;
                }
            };
            let spec = keyboard_for(ledger, user_id);
            if let Err(e) = ctx.notifier.send_file(user_id, &path, spec).await {
                warn!(error = %e, to = %user_id, "failed to deliver file");
            }
        }
        (Command::PlotMenu, Argument::Text(selection)) => {
            if selection.starts_with("cumulative") {
                open_date_chooser(ctx, ledger, user_id, ConversationState::AwaitingCumulativeRange)
                    .await;
            } else if selection.starts_with("coffee") {
                open_date_chooser(ctx, ledger, user_id, ConversationState::AwaitingPerHourRange)
                    .await;
            } else {
                debug!(selection = %selection, "invalid plot selection");
                deliver_text(ctx, ledger, user_id, "invalid selection").await;
            }
        }
        (Command::PlotMenu, _) => {
            deliver_text(ctx, ledger, user_id, "invalid selection").await;
        }
        (Command::RenderCumulativePlot, Argument::Range(range)) => {
            render_cumulative(ctx, ledger, user_id, range).await
        }
        (Command::RenderPerHourPlot, Argument::Range(range)) => {
            render_per_hour(ctx, ledger, user_id, range).await
        }
        (Command::Invalid, _) => {}
        (command, argument) => {
            // resolver never pairs these shapes; drop rather than crash
            debug!(command = ?command, argument = ?argument, "unexpected argument shape, ignoring");
        }
    }
}

fn phrases(kind: DrinkKind) -> &'static [&'static str] {
    match kind {
        DrinkKind::Coffee => COFFEE_PHRASES,
        DrinkKind::Tea => TEA_PHRASES,
    }
}

fn fanout_line(kind: DrinkKind, actor: &str) -> String {
    match kind {
        DrinkKind::Coffee => format!("{actor} just had coffee. And that is great."),
        DrinkKind::Tea => format!("{actor} just had tea. And that is splendid."),
    }
}

async fn add_event(ctx: &AppContext, ledger: &mut Ledger, user_id: &str, kind: DrinkKind) {
    let now = Local::now();
    let Some(user) = ledger.get_mut(user_id) else {
        return;
    };
    user.record(kind, now);
    let actor = user.name.clone();
    persist(ctx, ledger).await;

    let summary = reporting::summary_text(ledger, kind, now);
    let phrase = phrases(kind)
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Enjoy :)");
    deliver_text(ctx, ledger, user_id, &format!("{phrase}\n\n{summary}")).await;

    // fan out to every other user subscribed to this drink
    let update = format!("{}\n\n{}", fanout_line(kind, &actor), summary);
    let recipients: Vec<String> = ledger
        .iter()
        .filter(|(id, other)| id.as_str() != user_id && other.notify_enabled(kind))
        .map(|(id, _)| id.clone())
        .collect();
    for id in recipients {
        deliver_text(ctx, ledger, &id, &update).await;
    }
}

async fn remove_last_event(ctx: &AppContext, ledger: &mut Ledger, user_id: &str, kind: DrinkKind) {
    if let Some(user) = ledger.get_mut(user_id) {
        user.remove_last(kind);
    }
    persist(ctx, ledger).await;
    let summary = reporting::summary_text(ledger, kind, Local::now());
    deliver_text(ctx, ledger, user_id, &summary).await;
}

async fn toggle_notify(
    ctx: &AppContext,
    ledger: &mut Ledger,
    user_id: &str,
    kind: DrinkKind,
    argument: Argument,
) {
    // The argument is the label the user saw: "[on]" means the flag is
    // currently set, so pressing the button turns it off, and vice versa.
    let reply = match argument {
        Argument::Text(label) if label == "[off]" => {
            if let Some(user) = ledger.get_mut(user_id) {
                user.set_notify(kind, true);
            }
            Some(format!("{} updates enabled", kind.label()))
        }
        Argument::Text(label) if label == "[on]" => {
            if let Some(user) = ledger.get_mut(user_id) {
                user.set_notify(kind, false);
            }
            Some(format!("{} updates disabled", kind.label()))
        }
        other => {
            debug!(argument = ?other, "unrecognized toggle label, ignoring");
            None
        }
    };
    persist(ctx, ledger).await;
    if let Some(reply) = reply {
        deliver_text(ctx, ledger, user_id, &reply).await;
    }
}

async fn set_keyboard(
    ctx: &AppContext,
    ledger: &mut Ledger,
    user_id: &str,
    kind: KeyboardKind,
    ack: &str,
) {
    if let Some(user) = ledger.get_mut(user_id) {
        user.keyboard = kind;
    }
    deliver_text(ctx, ledger, user_id, ack).await;
}

async fn open_date_chooser(
    ctx: &AppContext,
    ledger: &mut Ledger,
    user_id: &str,
    state: ConversationState,
) {
    if let Some(user) = ledger.get_mut(user_id) {
        user.conversation = state;
        user.keyboard = KeyboardKind::DateChooser;
    }
    deliver_text(ctx, ledger, user_id, "please specify the date range").await;
}

async fn render_cumulative(ctx: &AppContext, ledger: &Ledger, user_id: &str, range: DateRange) {
    let mut series = Vec::new();
    for user in ledger.values() {
        let events = reporting::filter_range(&user.coffees, range);
        if !events.is_empty() {
            series.push(UserSeries {
                label: user.name.clone(),
                points: reporting::cumulative_series(&events),
            });
        }
    }
    if series.is_empty() {
        deliver_text(ctx, ledger, user_id, "no data for the given time interval").await;
        return;
    }
    let title = match range.month_label() {
        None => "coffee counts over time".to_string(),
        Some(label) => format!("coffee count in {label}"),
    };
    match ctx.renderer.render_cumulative(&series, &title) {
        Ok(png) => deliver_image(ctx, ledger, user_id, "coffee_count.png", png).await,
        Err(e) => error!(error = %e, "failed to render cumulative chart"),
    }
}

async fn render_per_hour(ctx: &AppContext, ledger: &Ledger, user_id: &str, range: DateRange) {
    let mut series = Vec::new();
    for user in ledger.values() {
        let events = reporting::filter_range(&user.coffees, range);
        if !events.is_empty() {
            series.push(UserScatter {
                label: user.name.clone(),
                points: reporting::hour_of_day_scatter(&events),
            });
        }
    }
    if series.is_empty() {
        deliver_text(ctx, ledger, user_id, "no data for the given time interval").await;
        return;
    }
    let title = match range.month_label() {
        None => "coffee consumption by time of day".to_string(),
        Some(label) => format!("coffee consumption by time of day in {label}"),
    };
    match ctx.renderer.render_per_hour(&series, &title) {
        Ok(png) => deliver_image(ctx, ledger, user_id, "coffee_per_hour.png", png).await,
        Err(e) => error!(error = %e, "failed to render per-hour chart"),
    }
}

/// Persist the whole ledger. Failures are logged; the in-memory mutation
/// stands either way.
async fn persist(ctx: &AppContext, ledger: &Ledger) {
    if let Err(e) = ctx.repository.save_all(ledger).await {
        error!(error = %e, "failed to persist ledger snapshot");
    }
}

fn keyboard_for(ledger: &Ledger, user_id: &str) -> ReplySpec {
    match ledger.get(user_id) {
        Some(user) => keyboard::for_user(user, Local::now().date_naive()),
        None => ReplySpec::Remove,
    }
}

async fn deliver_text(ctx: &AppContext, ledger: &Ledger, to: &str, text: &str) {
    let spec = keyboard_for(ledger, to);
    deliver_with(ctx, to, text, spec).await;
}

async fn deliver_with(ctx: &AppContext, to: &str, text: &str, spec: ReplySpec) {
    if let Err(e) = ctx.notifier.send_text(to, text, spec).await {
        warn!(error = %e, to = %to, "failed to deliver message");
    }
}

async fn deliver_image(ctx: &AppContext, ledger: &Ledger, to: &str, filename: &str, png: Vec<u8>) {
    let spec = keyboard_for(ledger, to);
    if let Err(e) = ctx.notifier.send_image(to, filename, png, spec).await {
        warn!(error = %e, to = %to, "failed to deliver image");
    }
}
