use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serenity::http::Http;
use serenity::model::prelude::{Channel, UserId};
use serenity::{
    model::{channel::Message, gateway::Ready},
    prelude::*,
};
use tracing::{debug, error, info};

use crate::communication_channel::CommunicationChannel;
use crate::conversation_manager::ConversationManager;
use crate::error::ChannelError;


/// Discord gateway handler. Direct messages feed the conversation manager.
pub struct Handler {
    manager: Arc<ConversationManager>,
}


impl Handler {
    pub fn new(manager: Arc<ConversationManager>) -> Self {
        Self { manager }
    }
}


#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, context: Context, msg: Message) {
        // Ignore bot's own messages
        if msg.author.bot {
            return;
        }

        match msg.channel(&context).await {
            Ok(Channel::Private(_)) => {}
            Ok(_) => return,
            Err(why) => {
                error!(error = %why, "could not resolve message channel");
                return;
            }
        }

        if is_start_command(&msg.content) {
            if let Err(why) = msg.channel_id.say(&context.http, self.manager.greeting()).await {
                error!(error = %why, "error sending greeting");
            }
            return;
        }

        if !is_conversation_text(&msg.content) {
            debug!(author = %msg.author.id, "ignoring empty or command message");
            return;
        }

        self.manager
            .on_message(&msg.author.id.to_string(), &msg.author.name, &msg.content);
    }


    async fn ready(&self, _: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}


/// Returns true for `!start` or `/start`, optionally addressed as `/start@name`.
pub fn is_start_command(text: &str) -> bool {
    static START: OnceLock<Regex> = OnceLock::new();
    START
        .get_or_init(|| Regex::new(r"^\s*[!/]start(@\S+)?\s*$").expect("start command pattern"))
        .is_match(text)
}


/// Returns true for text that belongs in a conversation turn.
///
/// Attachment or sticker only messages arrive with empty content, and other
/// `!`/`/` commands are not meant for the model.
pub fn is_conversation_text(text: &str) -> bool {
    static COMMAND: OnceLock<Regex> = OnceLock::new();
    let command = COMMAND
        .get_or_init(|| Regex::new(r"^\s*[!/]\w+").expect("command pattern"));

    !text.trim().is_empty() && !command.is_match(text)
}


/// Delivers replies as Discord direct messages.
pub struct DiscordChannel {
    http: Arc<Http>,
}


impl DiscordChannel {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}


#[async_trait]
impl CommunicationChannel for DiscordChannel {
    async fn send_message(&self, recipient: &str, message: &str) -> Result<(), ChannelError> {
        let id = recipient
            .parse::<u64>()
            .map_err(|_| ChannelError::InvalidRecipient(recipient.to_string()))?;

        let http: &Http = &self.http;
        let dm = UserId(id).create_dm_channel(http).await?;
        dm.id.say(http, message).await?;
        Ok(())
    }
}
