//! Guild settings commands. Each one is a single read-modify-write against the
//! settings store; the poise handlers below only translate between Discord and the
//! plain functions at the bottom of the file.

use futures::Stream;
use poise::CreateReply;
use poise::serenity_prelude::{
    ChannelId, ChannelType, CreateChannel, CreateEmbed, CreateEmbedAuthor, CreateMessage,
    GatewayIntents, GuildChannel, GuildId, Mentionable, PermissionOverwrite,
    PermissionOverwriteType, Permissions, Role, RoleId, UserId,
};
use tracing::{debug, info, warn};

use super::{embed_builder, guild_id};
use crate::players::PlayerRegistry;
use crate::settings::embed::{ControllerState, Placeholders, render};
use crate::settings::store::SettingsStore;
use crate::settings::toggle::{self, Toggle};
use crate::settings::{GuildSettings, QueueMode, RequestChannel, SettingKey, SettingsPatch};
use crate::utils::config::BotConfig;
use crate::utils::error::{BotError, BotResult};
use crate::utils::format::format_duration;
use crate::{CommandResult, Context};

/// Category shared by every settings command; the cooldown check keys off it.
pub const CATEGORY: &str = "Settings";

pub const MIN_COMMAND_VOLUME: i64 = 1;
pub const MAX_COMMAND_VOLUME: i64 = 150;

/// Server settings, available to members with Manage Server
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Settings",
    subcommands(
        "prefix",
        "language",
        "dj",
        "queue",
        "always_on",
        "bypassvote",
        "view",
        "volume",
        "togglecontroller",
        "duplicatetrack",
        "customcontroller",
        "controllermsg",
        "stageannounce",
        "setupchannel"
    )
)]
pub async fn settings(ctx: Context<'_>) -> CommandResult {
    poise::builtins::help(ctx, Some("settings"), Default::default()).await?;
    Ok(())
}

/// Change the prefix of message commands
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn prefix(
    ctx: Context<'_>,
    #[description = "The new prefix"] prefix: String,
) -> CommandResult {
    // Ensure the command is used within a guild.
    let guild_id = guild_id(ctx)?;
    // Prefix commands can't be read without the message content intent.
    require_message_content(ctx)?;

    let prefix = set_prefix(&ctx.data().store, guild_id, &prefix)?;
    ctx.say(format!("The prefix is now `{prefix}`, try `{prefix}help`."))
        .await?;
    Ok(())
}

/// Choose the language the bot replies in
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn language(
    ctx: Context<'_>,
    #[description = "Language code"]
    #[autocomplete = "autocomplete_language"]
    language: String,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;

    let language = set_language(&ctx.data().store, guild_id, &language)?;
    ctx.say(format!("The language is now `{language}`.")).await?;
    Ok(())
}

async fn autocomplete_language<'a>(
    ctx: Context<'a>,
    partial: &'a str,
) -> impl Stream<Item = String> + 'a {
    futures::stream::iter(matching_languages(&ctx.data().config.languages, partial))
}

/// Set or remove the DJ role
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn dj(
    ctx: Context<'_>,
    #[description = "Role allowed to control playback, leave empty to remove"] role: Option<Role>,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;

    // No role given clears the setting.
    set_dj_role(&ctx.data().store, guild_id, role.as_ref().map(|r| r.id.get()))?;
    let shown = role.map_or_else(|| "None".to_string(), |r| r.mention().to_string());
    ctx.say(format!("The DJ role is now {shown}.")).await?;
    Ok(())
}

/// Change how the queue orders requests
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Queue or FairQueue"] mode: String,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;

    // Anything other than FairQueue falls back to a plain queue.
    let mode = set_queue_mode(&ctx.data().store, guild_id, &mode)?;
    ctx.say(format!("The queue mode is now `{mode}`.")).await?;
    Ok(())
}

/// Toggle 24/7 mode, which keeps the bot in the voice channel when idle
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    rename = "247",
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn always_on(ctx: Context<'_>) -> CommandResult {
    run_toggle(ctx, Toggle::AlwaysOn).await
}

/// Toggle whether skip and stop need a vote
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn bypassvote(ctx: Context<'_>) -> CommandResult {
    run_toggle(ctx, Toggle::BypassVote).await
}

/// Toggle the messages sent when controller buttons are pressed
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn controllermsg(ctx: Context<'_>) -> CommandResult {
    run_toggle(ctx, Toggle::ControllerMsg).await
}

/// Toggle the music controller
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn togglecontroller(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    // Turning it off also removes the controller of a live player.
    let enabled = toggle_controller(&data.store, &data.players, guild_id).await?;
    ctx.say(Toggle::Controller.describe(enabled)).await?;
    Ok(())
}

/// Toggle whether the same track may be queued twice
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn duplicatetrack(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    // The live queue follows the stored flag.
    let allowed = toggle_duplicate_tracks(&data.store, &data.players, guild_id)?;
    ctx.say(Toggle::DuplicateTrack.describe(allowed)).await?;
    Ok(())
}

/// Set the player volume
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "A whole number from 1 to 150"]
    #[min = 1]
    #[max = 150]
    value: i64,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();

    // The live player is adjusted before the new default is stored.
    let volume = set_volume(&data.store, &data.players, guild_id, value, ctx.author().id).await?;
    ctx.say(format!("The volume is now {volume}%.")).await?;
    Ok(())
}

/// Show the current settings of this server
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn view(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let settings = ctx.data().store.get(guild_id)?;

    let bot_id = ctx.framework().bot_id;
    let bot_icon = ctx.cache().current_user().face();
    // Read everything needed from the cached guild before the next await.
    let (summary, dj_role_name) = {
        let guild = ctx
            .guild()
            .ok_or_else(|| BotError::NotFound("This server is not cached yet".into()))?;
        let permissions = guild
            .members
            .get(&bot_id)
            .map(|member| guild.member_permissions(member))
            .unwrap_or_else(Permissions::empty);
        // A deleted role shows as None.
        let dj_role_name = settings
            .dj_role_id
            .filter(|id| *id != 0)
            .and_then(|id| guild.roles.get(&RoleId::new(id)).map(|role| role.name.clone()));
        let summary = GuildSummary {
            name: guild.name.clone(),
            icon_url: guild.icon_url(),
            bot_icon,
            bot_permissions: permissions,
        };
        (summary, dj_role_name)
    };

    let embed = settings_embed(&settings, ctx.data().config.as_ref(), &summary, dj_role_name);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Customize the music controller embed
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn customcontroller(ctx: Context<'_>) -> CommandResult {
    embed_builder::run(ctx).await
}

/// Set the stage channel topic template, leave empty to remove it
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn stageannounce(
    ctx: Context<'_>,
    #[description = "Template, e.g. Now playing @@track_name@@"]
    #[rest]
    template: Option<String>,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;

    let template = set_stage_template(&ctx.data().store, guild_id, template)?;
    let reply = match template {
        Some(template) => format!("The stage announcement template is now ```{template}```"),
        None => "The stage announcement template was removed.".to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Pick a dedicated song request channel, one is created when none is given
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Settings"
)]
pub async fn setupchannel(
    ctx: Context<'_>,
    #[description = "Existing text channel to use"]
    #[channel_types("Text")]
    channel: Option<GuildChannel>,
) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    require_message_content(ctx)?;
    // Creating the channel can take longer than the interaction deadline.
    ctx.defer().await?;

    // Use the given channel or find/create the default one.
    let bot_user = ctx.cache().current_user().clone();
    let channel_id = match channel {
        Some(channel) => channel.id,
        None => request_channel(ctx, guild_id, &bot_user.name, bot_user.id).await?,
    };

    let data = ctx.data();
    let settings = data.store.get(guild_id)?;
    let placeholders = Placeholders::idle(
        &bot_user.name,
        &bot_user.face(),
        &data.config.default_embed_image,
    );
    // Post the idle controller; its message id is stored with the channel.
    let message = channel_id
        .send_message(
            ctx,
            CreateMessage::new().embed(render(
                settings.default_controller.get(ControllerState::Inactive),
                &placeholders,
            )),
        )
        .await
        .map_err(|e| {
            warn!("Failed to post controller in {}: {}", channel_id, e);
            BotError::PermissionDenied(format!("I can't send messages in <#{channel_id}>"))
        })?;

    save_request_channel(&data.store, guild_id, channel_id, message.id.get())?;
    ctx.say(format!(
        "Song requests now go to {}. Send a song name or link there to play it.",
        channel_id.mention()
    ))
    .await?;
    Ok(())
}

/// The existing `<bot>-song-requests` channel, or a new one.
async fn request_channel(
    ctx: Context<'_>,
    guild_id: GuildId,
    bot_name: &str,
    bot_id: UserId,
) -> BotResult<ChannelId> {
    let name = request_channel_name(bot_name);

    // Reuse a channel left over from a previous setup.
    let existing = {
        ctx.guild().and_then(|guild| {
            guild
                .channels
                .values()
                .find(|c| c.kind == ChannelType::Text && c.name == name)
                .map(|c| c.id)
        })
    };
    if let Some(id) = existing {
        debug!("Reusing request channel {} in {}", id, guild_id);
        return Ok(id);
    }

    // The bot must be able to read requests and clean them up.
    let overwrite = PermissionOverwrite {
        allow: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES,
        deny: Permissions::empty(),
        kind: PermissionOverwriteType::Member(bot_id),
    };
    let channel = guild_id
        .create_channel(
            ctx,
            CreateChannel::new(name)
                .kind(ChannelType::Text)
                .permissions(vec![overwrite]),
        )
        .await
        .map_err(|e| {
            warn!("Failed to create request channel in {}: {}", guild_id, e);
            BotError::PermissionDenied("I don't have permission to create channels".into())
        })?;

    info!("Created request channel {} in {}", channel.id, guild_id);
    Ok(channel.id)
}

fn require_message_content(ctx: Context<'_>) -> BotResult<()> {
    if ctx.data().intents.contains(GatewayIntents::MESSAGE_CONTENT) {
        Ok(())
    } else {
        Err(BotError::Validation(
            "This needs the `MESSAGE_CONTENT` intent, which the bot was started without".into(),
        ))
    }
}

async fn run_toggle(ctx: Context<'_>, which: Toggle) -> CommandResult {
    let guild_id = guild_id(ctx)?;

    let stored = toggle::flip(&ctx.data().store, guild_id, which)?;
    ctx.say(which.describe(stored)).await?;
    Ok(())
}

pub fn set_prefix(store: &SettingsStore, guild_id: GuildId, prefix: &str) -> BotResult<String> {
    let prefix = prefix.trim();
    if prefix.is_empty() || prefix.contains(char::is_whitespace) {
        return Err(BotError::Validation(
            "The prefix can't be empty or contain spaces".into(),
        ));
    }

    store.update(guild_id, &SettingsPatch::new().set(SettingKey::Prefix, prefix))?;
    Ok(prefix.to_string())
}

/// Codes are case-insensitive; the stored form is upper case.
pub fn set_language(store: &SettingsStore, guild_id: GuildId, input: &str) -> BotResult<String> {
    let language = input.trim().to_uppercase();
    store.update(
        guild_id,
        &SettingsPatch::new().set(SettingKey::Lang, language.as_str()),
    )?;
    Ok(language)
}

/// Supported codes containing `partial`, all of them when it is empty.
pub fn matching_languages(languages: &[String], partial: &str) -> Vec<String> {
    let needle = partial.trim().to_uppercase();
    languages
        .iter()
        .filter(|lang| lang.contains(&needle))
        .cloned()
        .collect()
}

pub fn set_dj_role(store: &SettingsStore, guild_id: GuildId, role_id: Option<u64>) -> BotResult<()> {
    store.update(
        guild_id,
        &SettingsPatch::new().set_or_unset(SettingKey::DjRole, role_id),
    )?;
    Ok(())
}

pub fn set_queue_mode(store: &SettingsStore, guild_id: GuildId, input: &str) -> BotResult<QueueMode> {
    let mode = QueueMode::from_input(input);
    store.update(
        guild_id,
        &SettingsPatch::new().set(SettingKey::QueueType, mode.as_str()),
    )?;
    Ok(mode)
}

/// Apply the volume to the live player, then store it. Out-of-range values are
/// rejected before either happens.
pub async fn set_volume(
    store: &SettingsStore,
    players: &PlayerRegistry,
    guild_id: GuildId,
    value: i64,
    actor: UserId,
) -> BotResult<u8> {
    if !(MIN_COMMAND_VOLUME..=MAX_COMMAND_VOLUME).contains(&value) {
        return Err(BotError::Validation(format!(
            "Volume must be between {MIN_COMMAND_VOLUME} and {MAX_COMMAND_VOLUME}"
        )));
    }
    let volume = value as u8;

    if let Some(player) = players.get(guild_id) {
        player.set_volume(volume, actor).await?;
    }

    store.update(guild_id, &SettingsPatch::new().set(SettingKey::Volume, volume))?;
    Ok(volume)
}

/// Flip the controller; turning it off also removes the live controller message.
pub async fn toggle_controller(
    store: &SettingsStore,
    players: &PlayerRegistry,
    guild_id: GuildId,
) -> BotResult<bool> {
    let enabled = toggle::flip(store, guild_id, Toggle::Controller)?;

    if !enabled {
        if let Some(player) = players.get(guild_id) {
            if let Err(e) = player.delete_controller().await {
                warn!("Failed to delete controller in {}: {}", guild_id, e);
            }
        }
    }
    Ok(enabled)
}

/// Flip duplicate tracks and push the new policy to the live queue.
pub fn toggle_duplicate_tracks(
    store: &SettingsStore,
    players: &PlayerRegistry,
    guild_id: GuildId,
) -> BotResult<bool> {
    let allowed = toggle::flip(store, guild_id, Toggle::DuplicateTrack)?;

    if let Some(player) = players.get(guild_id) {
        player.set_allow_duplicates(allowed);
    }
    Ok(allowed)
}

pub fn set_stage_template(
    store: &SettingsStore,
    guild_id: GuildId,
    template: Option<String>,
) -> BotResult<Option<String>> {
    let template = template
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    store.update(
        guild_id,
        &SettingsPatch::new().set_or_unset(SettingKey::StageAnnounceTemplate, template.clone()),
    )?;
    Ok(template)
}

pub fn save_request_channel(
    store: &SettingsStore,
    guild_id: GuildId,
    channel_id: ChannelId,
    controller_msg_id: u64,
) -> BotResult<RequestChannel> {
    let channel = RequestChannel {
        text_channel_id: channel_id.get(),
        controller_msg_id,
    };
    store.update(
        guild_id,
        &SettingsPatch::new().set(SettingKey::MusicRequestChannel, serde_json::to_value(&channel)?),
    )?;
    info!("Guild {} now takes requests in {}", guild_id, channel_id);
    Ok(channel)
}

pub fn request_channel_name(bot_name: &str) -> String {
    let slug: String = bot_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}-song-requests", slug.trim_matches('-'))
}

/// What the settings overview needs to know about the server.
pub struct GuildSummary {
    pub name: String,
    pub icon_url: Option<String>,
    pub bot_icon: String,
    pub bot_permissions: Permissions,
}

fn status_icon(status: bool) -> &'static str {
    if status { "✅" } else { "❌" }
}

pub fn settings_embed(
    settings: &GuildSettings,
    config: &BotConfig,
    guild: &GuildSummary,
    dj_role_name: Option<String>,
) -> CreateEmbed {
    let general = format!(
        "```Prefix: {}\nLanguage: {}\nController: {}\nDJ role: {}\nVote bypass: {}\n24/7: {}\nDefault volume: {}%\nPlay time: {}```",
        settings.prefix,
        settings.lang,
        settings.controller_enabled,
        dj_role_name.as_deref().unwrap_or("None"),
        !settings.vote_required,
        settings.always_on,
        settings.volume,
        // Stored minutes are unbounded; clamp instead of overflowing.
        format_duration(std::time::Duration::from_secs(
            settings.play_time_minutes.saturating_mul(60)
        )),
    );
    let queue = format!(
        "```Queue type: {}\nMax songs: {}\nDuplicate tracks: {}```",
        settings.queue_mode, config.max_queue, settings.duplicate_tracks_allowed
    );
    let perms = guild.bot_permissions;
    let permissions = format!(
        "```{} Administrator\n{} Manage Server\n{} Manage Channels\n{} Manage Messages```",
        status_icon(perms.administrator()),
        status_icon(perms.manage_guild()),
        status_icon(perms.manage_channels()),
        status_icon(perms.manage_messages()),
    );

    let mut embed = CreateEmbed::new()
        .color(config.embed_color)
        .author(
            CreateEmbedAuthor::new(format!("Settings of {}", guild.name)).icon_url(&guild.bot_icon),
        )
        .field("General", general, true)
        .field("Queue", queue, true);

    if let Some(template) = &settings.stage_announce_template {
        embed = embed.field("Stage announcement", format!("```{template}```"), false);
    }
    embed = embed.field("Bot permissions", permissions, false);

    if let Some(icon) = &guild.icon_url {
        embed = embed.thumbnail(icon);
    }
    embed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::MockPlayer;
    use crate::settings::SettingsDefaults;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn store() -> SettingsStore {
        SettingsStore::open_in_memory(SettingsDefaults {
            languages: vec!["EN".into(), "PL".into(), "DE".into()],
            ..Default::default()
        })
        .unwrap()
    }

    fn guild() -> GuildId {
        GuildId::new(4242)
    }

    #[test]
    fn test_unknown_language_is_rejected_without_writing() {
        let store = store();
        set_language(&store, guild(), "pl").unwrap();

        let err = set_language(&store, guild(), "fr").unwrap_err();

        assert_eq!(err.user_message(), "Invalid input: Language `FR` was not found");
        assert_eq!(store.get(guild()).unwrap().lang, "PL");
    }

    #[test]
    fn test_language_autocomplete_matches_substrings() {
        let languages = vec!["EN".to_string(), "PL".to_string(), "DE".to_string()];
        assert_eq!(matching_languages(&languages, "e"), vec!["EN", "DE"]);
        assert_eq!(matching_languages(&languages, ""), languages);
    }

    #[test]
    fn test_queue_mode_falls_back_to_queue() {
        let store = store();
        assert_eq!(set_queue_mode(&store, guild(), "fairqueue").unwrap(), QueueMode::FairQueue);
        assert_eq!(set_queue_mode(&store, guild(), "shuffle").unwrap(), QueueMode::Queue);
        assert_eq!(store.get(guild()).unwrap().queue_mode, QueueMode::Queue);
    }

    #[test]
    fn test_dj_role_can_be_cleared() {
        let store = store();
        set_dj_role(&store, guild(), Some(77)).unwrap();
        assert_eq!(store.get(guild()).unwrap().dj_role_id, Some(77));

        set_dj_role(&store, guild(), None).unwrap();
        assert!(!store.raw(guild()).unwrap().contains_key("dj"));
    }

    #[tokio::test]
    async fn test_volume_out_of_range_touches_nothing() {
        let store = store();
        let players = PlayerRegistry::new();
        let mut player = MockPlayer::new();
        player.expect_guild_id().return_const(guild());
        player.expect_set_volume().never();
        players.register(Arc::new(player));

        for value in [0, 151, -5] {
            assert_matches!(
                set_volume(&store, &players, guild(), value, UserId::new(1)).await,
                Err(BotError::Validation(_))
            );
        }
        assert!(store.raw(guild()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_volume_reaches_the_live_player_first() {
        let store = store();
        let players = PlayerRegistry::new();
        let mut player = MockPlayer::new();
        player.expect_guild_id().return_const(guild());
        player
            .expect_set_volume()
            .withf(|volume, actor| *volume == 80 && *actor == UserId::new(9))
            .times(1)
            .returning(|_, _| Ok(()));
        players.register(Arc::new(player));

        assert_eq!(set_volume(&store, &players, guild(), 80, UserId::new(9)).await.unwrap(), 80);
        assert_eq!(store.get(guild()).unwrap().volume, 80);
    }

    #[tokio::test]
    async fn test_disabling_controller_deletes_live_controller() {
        let store = store();
        let players = PlayerRegistry::new();
        let mut player = MockPlayer::new();
        player.expect_guild_id().return_const(guild());
        player.expect_delete_controller().times(1).returning(|| Ok(()));
        players.register(Arc::new(player));

        assert!(!toggle_controller(&store, &players, guild()).await.unwrap());
        assert!(toggle_controller(&store, &players, guild()).await.unwrap());
    }

    #[test]
    fn test_duplicate_toggle_updates_live_queue() {
        let store = store();
        let players = PlayerRegistry::new();
        let mut player = MockPlayer::new();
        player.expect_guild_id().return_const(guild());
        player
            .expect_set_allow_duplicates()
            .withf(|allow| !*allow)
            .times(1)
            .return_const(());
        players.register(Arc::new(player));

        assert!(!toggle_duplicate_tracks(&store, &players, guild()).unwrap());
    }

    #[test]
    fn test_blank_stage_template_is_removed() {
        let store = store();
        set_stage_template(&store, guild(), Some("Now playing @@track_name@@".into())).unwrap();
        assert_eq!(set_stage_template(&store, guild(), Some("  ".into())).unwrap(), None);
        assert_eq!(store.get(guild()).unwrap().stage_announce_template, None);
    }

    #[test]
    fn test_request_channel_is_stored() {
        let store = store();
        save_request_channel(&store, guild(), ChannelId::new(10), 20).unwrap();

        assert_eq!(
            store.get(guild()).unwrap().music_request_channel,
            Some(RequestChannel {
                text_channel_id: 10,
                controller_msg_id: 20
            })
        );
    }

    #[test]
    fn test_request_channel_name_is_slugged() {
        assert_eq!(request_channel_name("Setlist Bot!"), "setlist-bot-song-requests");
    }

    #[test]
    fn test_settings_embed_lists_values() {
        let config = BotConfig::default();
        let mut settings = GuildSettings::defaults(&config.settings_defaults());
        settings.stage_announce_template = Some("@@track_name@@".into());
        let summary = GuildSummary {
            name: "Jazz Club".into(),
            icon_url: None,
            bot_icon: "https://cdn.example.com/bot.png".into(),
            bot_permissions: Permissions::MANAGE_GUILD,
        };

        let embed = serde_json::to_value(settings_embed(&settings, &config, &summary, None)).unwrap();

        assert_eq!(embed["author"]["name"], "Settings of Jazz Club");
        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 4);
        assert!(fields[0]["value"].as_str().unwrap().contains("Default volume: 100%"));
        assert!(fields[3]["value"].as_str().unwrap().contains("✅ Manage Server"));
        assert!(fields[3]["value"].as_str().unwrap().contains("❌ Administrator"));
    }

    #[test]
    fn test_settings_embed_survives_huge_play_time() {
        let config = BotConfig::default();
        let store = SettingsStore::open_in_memory(config.settings_defaults()).unwrap();
        store
            .update(
                guild(),
                &SettingsPatch::new().set(SettingKey::PlayTime, u64::MAX),
            )
            .unwrap();
        let summary = GuildSummary {
            name: "Marathon".into(),
            icon_url: None,
            bot_icon: "https://cdn.example.com/bot.png".into(),
            bot_permissions: Permissions::empty(),
        };

        let settings = store.get(guild()).unwrap();
        assert_eq!(settings.play_time_minutes, u64::MAX);
        let embed = serde_json::to_value(settings_embed(&settings, &config, &summary, None)).unwrap();

        let general = embed["fields"][0]["value"].as_str().unwrap();
        assert!(general.contains(&format!("Play time: {}:", u64::MAX / 3600)));
    }
}
