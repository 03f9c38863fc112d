//! This module aggregates all the command modules for the bot.

use poise::serenity_prelude::GuildId;

use crate::utils::error::BotError;
use crate::{Context, Error};

/// Maintainer-only debug panel and sandboxed console.
pub mod debug;
/// The `customcontroller` embed builder panel.
pub mod embed_builder;
/// Audio node management panel opened from the debug panel.
pub mod nodes_panel;
/// Guild settings commands (requires Manage Server).
pub mod settings;

/// The guild a command runs in; every command here is guild only.
pub(crate) fn guild_id(ctx: Context<'_>) -> Result<GuildId, BotError> {
    ctx.guild_id()
        .ok_or_else(|| BotError::NotFound("This command can only be used in a server".into()))
}

/// Command check restricting a command to the configured bot maintainers.
pub async fn is_bot_maintainer(ctx: Context<'_>) -> Result<bool, Error> {
    if ctx.data().config.has_debug_access(ctx.author().id.get()) {
        Ok(true)
    } else {
        Err(BotError::PermissionDenied("You can't use this command!".into()).into())
    }
}
