//! Maintainer-only debug panel: host and bot vitals, node status, the sandboxed
//! console and the shutdown button.

use poise::CreateReply;
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, ComponentInteraction, ComponentInteractionCollector,
    CreateActionRow, CreateButton, CreateEmbed, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateQuickModal, EditInteractionResponse, InputTextStyle,
};
use std::path::Path;
use std::time::Duration;
use sysinfo::{Disks, System};
use tracing::{debug, error, info, warn};

use super::nodes_panel::{MAX_EMBED_FIELDS, NodePanel, disable_all, with_node_fields};
use crate::nodes::NodeSnapshot;
use crate::utils::evaluator::{Evaluation, Evaluator};
use crate::utils::format::{format_bytes, format_count};
use crate::{CommandResult, Context, Error};

/// Host resource usage at the time the panel was opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemInfo {
    pub cpu_percent: f32,
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
}

impl SystemInfo {
    /// Sample the host. CPU usage needs two readings, so this waits briefly.
    pub async fn collect() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        system.refresh_cpu_usage();
        system.refresh_memory();

        let (disk_used, disk_total) = working_disk_usage();
        Self {
            cpu_percent: system.global_cpu_usage(),
            memory_used: system.used_memory(),
            memory_total: system.total_memory(),
            disk_used,
            disk_total,
        }
    }
}

/// Used and total space of the disk holding the working directory.
fn working_disk_usage() -> (u64, u64) {
    let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new("/").to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| cwd.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| {
            (
                disk.total_space().saturating_sub(disk.available_space()),
                disk.total_space(),
            )
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotInfo {
    pub version: String,
    pub latency: Option<Duration>,
    pub guilds: usize,
    pub members: u64,
    pub players: usize,
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

pub fn debug_embed(
    system: &SystemInfo,
    bot: &BotInfo,
    nodes: &[NodeSnapshot],
    color: u32,
) -> CreateEmbed {
    let description = format!(
        "```==    System info    ==\n• CPU:     {:.1}%\n• RAM:     {}/{} ({:.1}%)\n• DISK:    {}/{} ({:.1}%)```",
        system.cpu_percent,
        format_bytes(system.memory_used),
        format_bytes(system.memory_total),
        percent(system.memory_used, system.memory_total),
        format_bytes(system.disk_used),
        format_bytes(system.disk_total),
        percent(system.disk_used, system.disk_total),
    );
    let latency = bot
        .latency
        .map(|l| format!("{:.2}ms", l.as_secs_f64() * 1000.0))
        .unwrap_or_else(|| "unknown".to_string());
    let bot_block = format!(
        "```• VERSION: {}\n• LATENCY: {}\n• SERVERS: {}\n• MEMBERS: {}\n• PLAYERS: {}```",
        bot.version,
        latency,
        format_count(bot.guilds),
        format_count(bot.members),
        format_count(bot.players),
    );

    let embed = CreateEmbed::new()
        .title("📄 Debug panel")
        .color(color)
        .description(description)
        .field("🤖 Bot info", bot_block, false);
    let nodes: Vec<&NodeSnapshot> = nodes.iter().collect();
    // The bot info field takes one slot.
    with_node_fields(embed, &nodes, MAX_EMBED_FIELDS - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugAction {
    Command,
    Sync,
    Nodes,
    Stop,
    End,
    Rerun,
    Error,
}

impl DebugAction {
    const ALL: [DebugAction; 7] = [
        DebugAction::Command,
        DebugAction::Sync,
        DebugAction::Nodes,
        DebugAction::Stop,
        DebugAction::End,
        DebugAction::Rerun,
        DebugAction::Error,
    ];

    pub fn custom_id(&self) -> &'static str {
        match self {
            DebugAction::Command => "debug_command",
            DebugAction::Sync => "debug_sync",
            DebugAction::Nodes => "debug_nodes",
            DebugAction::Stop => "debug_stop",
            DebugAction::End => "debug_console_end",
            DebugAction::Rerun => "debug_console_rerun",
            DebugAction::Error => "debug_console_error",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.custom_id() == id)
    }
}

/// Console state kept between runs: the last script and what it produced.
#[derive(Debug, Default)]
pub struct Console {
    script: Option<String>,
    last: Option<Evaluation>,
}

impl Console {
    pub fn is_enabled(&self, action: DebugAction) -> bool {
        match action {
            DebugAction::End => self.last.is_some(),
            DebugAction::Rerun => self.script.is_some(),
            DebugAction::Error => self.last.as_ref().is_some_and(Evaluation::failed),
            _ => true,
        }
    }

    /// Text shown above the panel.
    pub fn output(&self) -> String {
        match &self.last {
            Some(evaluation) => format!("```{}```", evaluation.rendered),
            None => String::new(),
        }
    }

    /// Full detail of the last failure, for the Error button.
    pub fn error_detail(&self) -> Option<String> {
        let error = self.last.as_ref()?.error.as_ref()?;
        Some(format!("```rust\n{error:#?}\n```"))
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    fn record(&mut self, script: String, evaluation: Evaluation) {
        self.script = Some(script);
        self.last = Some(evaluation);
    }
}

fn components(console: &Console) -> Vec<CreateActionRow> {
    let button = |action: DebugAction, label: &str, emoji: char, style: ButtonStyle| {
        CreateButton::new(action.custom_id())
            .label(label)
            .emoji(emoji)
            .style(style)
            .disabled(!console.is_enabled(action))
    };

    vec![
        CreateActionRow::Buttons(vec![
            button(DebugAction::Command, "Command", '▶', ButtonStyle::Success),
            button(DebugAction::Sync, "Sync", '🔄', ButtonStyle::Secondary),
            button(DebugAction::Nodes, "Audio nodes", '📡', ButtonStyle::Secondary),
            button(DebugAction::Stop, "Stop bot", '🔴', ButtonStyle::Danger),
        ]),
        CreateActionRow::Buttons(vec![
            button(DebugAction::End, "End", '🗑', ButtonStyle::Secondary),
            button(DebugAction::Rerun, "Rerun", '🔁', ButtonStyle::Secondary),
            button(DebugAction::Error, "Error", '👾', ButtonStyle::Secondary),
        ]),
    ]
}

fn ephemeral(text: impl Into<String>) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(text)
            .ephemeral(true),
    )
}

async fn shard_latency(ctx: Context<'_>) -> Option<Duration> {
    let shard_manager = ctx.framework().shard_manager();
    let runners = shard_manager.runners.lock().await;
    runners
        .get(&serenity::ShardId(ctx.serenity_context().shard_id.0))?
        .latency
}

async fn bot_info(ctx: Context<'_>) -> BotInfo {
    let data = ctx.data();
    let (guilds, members) = {
        let cache = ctx.cache();
        let guild_ids = cache.guilds();
        let members = guild_ids
            .iter()
            .filter_map(|id| cache.guild(*id).map(|guild| guild.member_count))
            .sum::<u64>();
        (guild_ids.len(), members)
    };

    BotInfo {
        version: data.config.version.clone(),
        latency: shard_latency(ctx).await,
        guilds,
        members,
        players: data.players.len(),
    }
}

/// Bot vitals, audio nodes and maintenance tools
#[poise::command(
    slash_command,
    prefix_command,
    hide_in_help,
    category = "Settings",
    check = "crate::commands::is_bot_maintainer"
)]
pub async fn debug(ctx: Context<'_>) -> CommandResult {
    // Sampling CPU usage takes a moment, so acknowledge first.
    ctx.defer_ephemeral().await?;
    let data = ctx.data();

    // Gather host, bot and node state once; the panel shows this snapshot.
    let system = SystemInfo::collect().await;
    let bot = bot_info(ctx).await;
    let embed = debug_embed(&system, &bot, &data.registry.list(), data.config.embed_color);

    let mut console = Console::default();
    let handle = ctx.send(panel(&embed, &console).ephemeral(true)).await?;
    let message_id = handle.message().await?.id;

    while let Some(interaction) = ComponentInteractionCollector::new(ctx)
        .author_id(ctx.author().id)
        .message_id(message_id)
        .timeout(data.config.panel_timeout)
        .await
    {
        let Some(action) = DebugAction::from_custom_id(&interaction.data.custom_id) else {
            continue;
        };
        debug!("Debug panel action {:?} by {}", action, interaction.user.name);

        match action {
            DebugAction::Command | DebugAction::Rerun => {
                run_console(ctx, &handle, &embed, &interaction, &mut console).await?;
            }
            DebugAction::End => {
                console.clear();
                update_panel(ctx, &interaction, &embed, &console).await?;
            }
            DebugAction::Error => {
                let detail = console
                    .error_detail()
                    .unwrap_or_else(|| "The last run succeeded.".to_string());
                interaction.create_response(ctx, ephemeral(detail)).await?;
            }
            DebugAction::Sync => sync_commands(ctx, &interaction).await?,
            // Runs beside this loop so the debug buttons stay responsive.
            DebugAction::Nodes => {
                NodePanel::new(ctx).spawn(interaction);
            }
            DebugAction::Stop => {
                stop_bot(ctx, &interaction).await?;
                return Ok(());
            }
        }
    }

    let mut rows = components(&console);
    disable_all(&mut rows);
    handle
        .edit(
            ctx,
            CreateReply::default()
                .content(console.output())
                .embed(embed)
                .components(rows),
        )
        .await?;
    Ok(())
}

fn panel(embed: &CreateEmbed, console: &Console) -> CreateReply {
    CreateReply::default()
        .content(console.output())
        .embed(embed.clone())
        .components(components(console))
}

async fn update_panel(
    ctx: Context<'_>,
    interaction: &ComponentInteraction,
    embed: &CreateEmbed,
    console: &Console,
) -> Result<(), Error> {
    interaction
        .create_response(
            ctx,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content(console.output())
                    .embed(embed.clone())
                    .components(components(console)),
            ),
        )
        .await?;
    Ok(())
}

async fn run_console(
    ctx: Context<'_>,
    handle: &poise::ReplyHandle<'_>,
    embed: &CreateEmbed,
    interaction: &ComponentInteraction,
    console: &mut Console,
) -> Result<(), Error> {
    let mut input = CreateInputText::new(InputTextStyle::Paragraph, "Debug console", "script")
        .placeholder("Type `help` to list commands");
    if let Some(script) = &console.script {
        input = input.value(script);
    }
    let modal = CreateQuickModal::new("Debug console")
        .timeout(ctx.data().config.panel_timeout)
        .field(input);

    // A dismissed modal yields nothing.
    let Some(response) = interaction.quick_modal(ctx.serenity_context(), modal).await? else {
        return Ok(());
    };
    let script = response.inputs.first().cloned().unwrap_or_default();

    // Failed scripts still render; only a refused caller gets a separate reply.
    match Evaluator::new(ctx.data()).run(interaction.user.id, &script) {
        Ok(evaluation) => {
            if evaluation.failed() {
                debug!("Console run by {} failed", interaction.user.name);
            }
            console.record(script, evaluation);
            response
                .interaction
                .create_response(ctx, CreateInteractionResponse::Acknowledge)
                .await?;
            handle.edit(ctx, panel(embed, console)).await?;
        }
        Err(e) => {
            response
                .interaction
                .create_response(ctx, ephemeral(e.user_message()))
                .await?;
        }
    }
    Ok(())
}

async fn sync_commands(ctx: Context<'_>, interaction: &ComponentInteraction) -> Result<(), Error> {
    interaction
        .create_response(ctx, ephemeral("🔄 Syncing application commands..."))
        .await?;

    // Global registration can take a while to propagate.
    let text = match poise::builtins::register_globally(ctx.http(), &ctx.framework().options().commands)
        .await
    {
        Ok(()) => {
            info!("Application commands re-registered by {}", interaction.user.name);
            "✅ All application commands were synced!".to_string()
        }
        Err(e) => {
            warn!("Command sync failed: {}", e);
            format!("❌ Syncing failed: {e}")
        }
    };
    interaction
        .edit_response(ctx, EditInteractionResponse::new().content(text))
        .await?;
    Ok(())
}

/// Save resumable players, tear everything down and stop every shard.
async fn stop_bot(ctx: Context<'_>, interaction: &ComponentInteraction) -> Result<(), Error> {
    let data = ctx.data();
    interaction
        .create_response(
            ctx,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content("🔴 Shutting down...")
                    .components(Vec::new()),
            ),
        )
        .await?;

    info!("Shutdown requested by {}", interaction.user.name);
    // Save active players so they can be resumed after restart.
    match data.players.save_and_teardown(&data.config.session_file).await {
        Ok(saved) => debug!("Shutdown kept {} player session(s)", saved),
        Err(e) => error!("Failed to save player sessions: {}", e),
    }

    // Closing every shard ends `client.start()` in main.
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}
