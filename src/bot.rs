//! Telegram transport adapter: maps incoming teloxide messages onto the
//! core's inbound type and implements the outbound `Notifier` over the
//! Bot API.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{ContactPayload, InboundMessage, Ledger};
use crate::executor::{self, AppContext};
use crate::keyboard::ReplySpec;
use crate::outbound::Notifier;

/// Entry point wired into the teloxide dispatcher. The state lock is held
/// across the whole dispatch, serializing command executions.
pub async fn message_handler(
    msg: Message,
    ctx: Arc<AppContext>,
    state: Arc<Mutex<Ledger>>,
) -> Result<()> {
    let Some(inbound) = to_inbound(&msg) else {
        debug!(chat_id = %msg.chat.id, "message without a sender, ignoring");
        return Ok(());
    };
    let mut ledger = state.lock().await;
    executor::handle_inbound(&ctx, &mut ledger, inbound).await
}

fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let sender_id = msg.from.as_ref()?.id.0.to_string();
    let contact = msg.contact().and_then(|contact| {
        // contacts without a Telegram id cannot be registered
        contact.user_id.map(|id| ContactPayload {
            id: id.0.to_string(),
            name: contact.first_name.clone(),
        })
    });
    Some(InboundMessage {
        sender_id,
        text: msg.text().map(str::to_owned),
        contact,
    })
}

fn to_reply_markup(spec: ReplySpec) -> ReplyMarkup {
    match spec {
        ReplySpec::Keyboard(rows) => {
            let buttons: Vec<Vec<KeyboardButton>> = rows
                .into_iter()
                .map(|row| row.into_iter().map(KeyboardButton::new).collect())
                .collect();
            let mut markup = KeyboardMarkup::new(buttons);
            markup.resize_keyboard = true;
            ReplyMarkup::Keyboard(markup)
        }
        ReplySpec::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

fn chat_id(user_id: &str) -> Result<ChatId> {
    let id = user_id
        .parse::<i64>()
        .with_context(|| format!("invalid chat id {user_id:?}"))?;
    Ok(ChatId(id))
}

/// Sends text, photos and documents through the Telegram Bot API.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        TelegramNotifier { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, user_id: &str, text: &str, keyboard: ReplySpec) -> Result<()> {
        self.bot
            .send_message(chat_id(user_id)?, text)
            .reply_markup(to_reply_markup(keyboard))
            .await
            .context("sendMessage failed")?;
        Ok(())
    }

    async fn send_image(
        &self,
        user_id: &str,
        filename: &str,
        png: Vec<u8>,
        keyboard: ReplySpec,
    ) -> Result<()> {
        let photo = InputFile::memory(png).file_name(filename.to_owned());
        self.bot
            .send_photo(chat_id(user_id)?, photo)
            .reply_markup(to_reply_markup(keyboard))
            .await
            .context("sendPhoto failed")?;
        Ok(())
    }

    async fn send_file(&self, user_id: &str, path: &Path, keyboard: ReplySpec) -> Result<()> {
        self.bot
            .send_document(chat_id(user_id)?, InputFile::file(path.to_path_buf()))
            .reply_markup(to_reply_markup(keyboard))
            .await
            .context("sendDocument failed")?;
        Ok(())
    }
}
