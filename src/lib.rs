//! Guild settings, audio node management and the administrative commands of a
//! Discord music bot.

use futures::future::BoxFuture;
use poise::CreateReply;
use poise::serenity_prelude::GatewayIntents;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

pub mod commands;
pub mod nodes;
pub mod players;
pub mod settings;
pub mod utils;

use nodes::registry::NodeRegistry;
use players::PlayerRegistry;
use settings::store::SettingsStore;
use utils::config::BotConfig;
use utils::cooldown::CooldownTracker;
use utils::error::BotError;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// Shared handles, accessible in all command invocations
pub struct Data {
    pub config: Arc<BotConfig>,
    pub store: Arc<SettingsStore>,
    pub registry: Arc<NodeRegistry>,
    pub players: Arc<PlayerRegistry>,
    pub cooldowns: Arc<CooldownTracker>,
    /// Gateway intents the client was started with.
    pub intents: GatewayIntents,
    pub started: Instant,
}

impl Data {
    pub fn new(config: BotConfig, store: SettingsStore, registry: Arc<NodeRegistry>) -> Self {
        let cooldowns = CooldownTracker::new(config.cooldown, config.cooldown_overrides());
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            registry,
            players: Arc::new(PlayerRegistry::new()),
            cooldowns: Arc::new(cooldowns),
            intents: GatewayIntents::non_privileged(),
            started: Instant::now(),
        }
    }

    pub fn with_intents(mut self, intents: GatewayIntents) -> Self {
        self.intents = intents;
        self
    }
}

#[poise::command(slash_command, prefix_command, category = "General")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

/// Per-guild cooldown applied to every settings command before it runs.
pub fn cooldown_check(ctx: Context<'_>) -> BoxFuture<'_, Result<bool, Error>> {
    Box::pin(async move {
        if ctx.command().category.as_deref() != Some(commands::settings::CATEGORY) {
            return Ok(true);
        }
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(true);
        };

        match ctx
            .data()
            .cooldowns
            .try_use(guild_id, &ctx.command().qualified_name)
        {
            Ok(()) => Ok(true),
            Err(remaining) => Err(BotError::Cooldown(remaining).into()),
        }
    })
}

/// Message command prefix of the guild the message was sent in.
pub fn guild_prefix(
    ctx: poise::PartialContext<'_, Data, Error>,
) -> BoxFuture<'_, Result<Option<String>, Error>> {
    Box::pin(async move {
        let data = ctx.framework.user_data;
        let prefix = match ctx.guild_id {
            Some(guild_id) => data.store.get(guild_id)?.prefix,
            None => data.config.bot_prefix.clone(),
        };
        Ok(Some(prefix))
    })
}

async fn reply_ephemeral(ctx: Context<'_>, text: String) {
    if let Err(e) = ctx
        .send(CreateReply::default().content(text).ephemeral(true))
        .await
    {
        warn!("Failed to send error reply: {}", e);
    }
}

/// Report a failed command back to whoever invoked it.
async fn report(ctx: Context<'_>, error: Error) {
    let command = ctx.command().qualified_name.clone();
    let text = match error.downcast_ref::<BotError>() {
        Some(
            e @ (BotError::PermissionDenied(_) | BotError::Validation(_) | BotError::Cooldown(_)),
        ) => {
            debug!("{} rejected: {}", command, e);
            e.user_message()
        }
        Some(e) if e.is_retryable() => {
            error!("{} failed: {}", command, e);
            e.user_message()
        }
        Some(e) => {
            warn!("{} failed: {}", command, e);
            e.user_message()
        }
        None => {
            error!("{} failed: {}", command, error);
            "Something went wrong while running this command.".to_string()
        }
    };
    reply_ephemeral(ctx, text).await;
}

pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => report(ctx, error).await,
        poise::FrameworkError::CommandCheckFailed {
            error: Some(error),
            ctx,
            ..
        } => report(ctx, error).await,
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            debug!(
                "{} lacks {:?} for {}",
                ctx.author().name,
                missing_permissions,
                ctx.command().qualified_name
            );
            let text = match missing_permissions {
                Some(permissions) => format!("You need the {permissions} permission to do that."),
                None => "You are not allowed to do that.".to_string(),
            };
            reply_ephemeral(ctx, text).await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}
