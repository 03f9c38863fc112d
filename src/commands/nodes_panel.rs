//! Audio node management panel, opened from the debug panel.

use poise::serenity_prelude::{
    self as serenity, ButtonStyle, ComponentInteraction, ComponentInteractionCollector,
    ComponentInteractionDataKind, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
    CreateInputText, CreateInteractionResponse, CreateInteractionResponseMessage,
    CreateQuickModal, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption,
    EditInteractionResponse, InputTextStyle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::nodes::registry::NodeRegistry;
use crate::nodes::{NodeConfig, NodeSnapshot};
use crate::players::PlayerRegistry;
use crate::utils::error::BotResult;
use crate::utils::format::{format_bytes, format_uptime};
use crate::{Context, Error};

/// Discord select menus hold at most this many options.
const MAX_MENU_OPTIONS: usize = 25;
/// Discord rejects embeds with more fields than this.
pub(crate) const MAX_EMBED_FIELDS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Select,
    Add,
    Remove,
    Reconnect,
    Connect,
    Disconnect,
}

impl NodeAction {
    const ALL: [NodeAction; 6] = [
        NodeAction::Select,
        NodeAction::Add,
        NodeAction::Remove,
        NodeAction::Reconnect,
        NodeAction::Connect,
        NodeAction::Disconnect,
    ];

    pub fn custom_id(&self) -> &'static str {
        match self {
            NodeAction::Select => "nodes_select",
            NodeAction::Add => "nodes_add",
            NodeAction::Remove => "nodes_remove",
            NodeAction::Reconnect => "nodes_reconnect",
            NodeAction::Connect => "nodes_connect",
            NodeAction::Disconnect => "nodes_disconnect",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.custom_id() == id)
    }
}

/// Everything but Add needs a selected node.
pub fn is_enabled(action: NodeAction, selected: Option<&str>) -> bool {
    matches!(action, NodeAction::Add | NodeAction::Select) || selected.is_some()
}

/// Embed field title and body describing one node.
pub(crate) fn node_field(node: &NodeSnapshot) -> (String, String) {
    if !node.available {
        return (
            format!("Node {} - 🔴 Disconnected", node.identifier),
            format!(
                "```• ADDRESS: {}\n• PLAYERS: {}\nNo other data to display```",
                node.address(),
                node.player_count
            ),
        );
    }

    let mut body = format!(
        "```• ADDRESS: {}\n• PLAYERS: {}\n",
        node.address(),
        node.player_count
    );
    if let Some(stats) = &node.stats {
        body.push_str(&format!(
            "• CPU:     {:.1}%\n• RAM:     {}/{} ({:.1}%)\n",
            stats.process_load_percent(),
            format_bytes(stats.memory.free),
            format_bytes(stats.memory_total()),
            stats.free_memory_percent()
        ));
    }
    body.push_str(&format!("• LATENCY: {:.2}ms\n", node.latency_ms()));
    if let Some(stats) = &node.stats {
        body.push_str(&format!("• UPTIME:  {}\n", format_uptime(stats.uptime())));
    }
    body.push_str("```");

    (format!("Node {} - 🟢 Connected", node.identifier), body)
}

/// All nodes, or only the selected one.
pub fn nodes_embed(nodes: &[NodeSnapshot], selected: Option<&str>, color: u32) -> CreateEmbed {
    let embed = CreateEmbed::new().title("📡 Audio nodes").color(color);
    if nodes.is_empty() {
        return embed.description("```No audio nodes are registered!```");
    }

    let shown: Vec<&NodeSnapshot> = nodes
        .iter()
        .filter(|node| selected.is_none_or(|id| id == node.identifier))
        .collect();
    with_node_fields(embed, &shown, MAX_EMBED_FIELDS)
}

/// Append one field per node, at most `room` of them; the rest are counted in the footer.
pub(crate) fn with_node_fields(
    mut embed: CreateEmbed,
    nodes: &[&NodeSnapshot],
    room: usize,
) -> CreateEmbed {
    for node in nodes.iter().take(room) {
        let (name, value) = node_field(node);
        embed = embed.field(name, value, true);
    }

    let hidden = nodes.len().saturating_sub(room);
    if hidden > 0 {
        embed = embed.footer(CreateEmbedFooter::new(format!("+{hidden} more node(s)")));
    }
    embed
}

fn menu_option(node: &NodeSnapshot, selected: Option<&str>) -> CreateSelectMenuOption {
    let status = if node.available { "🟢 Connected" } else { "🔴 Disconnected" };
    CreateSelectMenuOption::new(&node.identifier, &node.identifier)
        .description(format!(
            "{} - Players: {} ({:.2}ms)",
            status,
            node.player_count,
            node.latency_ms()
        ))
        .default_selection(selected == Some(node.identifier.as_str()))
}

fn components(nodes: &[NodeSnapshot], selected: Option<&str>) -> Vec<CreateActionRow> {
    let menu = if nodes.is_empty() {
        CreateSelectMenu::new(
            NodeAction::Select.custom_id(),
            CreateSelectMenuKind::String {
                options: vec![CreateSelectMenuOption::new("No audio nodes found", "none")],
            },
        )
        .disabled(true)
    } else {
        CreateSelectMenu::new(
            NodeAction::Select.custom_id(),
            CreateSelectMenuKind::String {
                options: nodes
                    .iter()
                    .take(MAX_MENU_OPTIONS)
                    .map(|node| menu_option(node, selected))
                    .collect(),
            },
        )
    }
    .placeholder("Pick a node to manage...");

    let button = |action: NodeAction, label: &str, style: ButtonStyle| {
        CreateButton::new(action.custom_id())
            .label(label)
            .style(style)
            .disabled(!is_enabled(action, selected))
    };

    vec![
        CreateActionRow::SelectMenu(menu),
        CreateActionRow::Buttons(vec![
            button(NodeAction::Add, "Add", ButtonStyle::Success),
            button(NodeAction::Remove, "Remove", ButtonStyle::Danger),
        ]),
        CreateActionRow::Buttons(vec![
            button(NodeAction::Reconnect, "Reconnect", ButtonStyle::Secondary),
            button(NodeAction::Connect, "Connect", ButtonStyle::Secondary),
            button(NodeAction::Disconnect, "Disconnect", ButtonStyle::Danger),
        ]),
    ]
}

fn panel_message(
    registry: &NodeRegistry,
    selected: Option<&str>,
    color: u32,
) -> CreateInteractionResponseMessage {
    let nodes = registry.list();
    CreateInteractionResponseMessage::new()
        .embed(nodes_embed(&nodes, selected, color))
        .components(components(&nodes, selected))
}

/// Deregister a node and tear down the players that were on it.
pub async fn remove_node(
    registry: &NodeRegistry,
    players: &PlayerRegistry,
    identifier: &str,
) -> BotResult<usize> {
    let orphaned = registry.remove(identifier).await?;
    players.teardown_guilds(&orphaned).await;
    Ok(orphaned.len())
}

fn ephemeral(text: String) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(text)
            .ephemeral(true),
    )
}

fn add_node_modal() -> CreateQuickModal {
    let field = |label: &str, id: &str, placeholder: &str| {
        CreateInputText::new(InputTextStyle::Short, label, id)
            .placeholder(placeholder)
            .required(true)
    };
    CreateQuickModal::new("Add an audio node")
        .field(field("Host", "host", "Address of the node, e.g. 127.0.0.1"))
        .field(field("Port", "port", "Port of the node, e.g. 2333"))
        .field(field("Password", "password", "Password of the node"))
        .field(field("SSL", "secure", "Type 'true' or 'false'"))
        .field(field("Identifier", "identifier", "A friendly name for the node"))
}

fn selected_node(kind: &ComponentInteractionDataKind) -> Option<String> {
    match kind {
        ComponentInteractionDataKind::StringSelect { values } => values.first().cloned(),
        _ => None,
    }
}

/// Reply to `opener` with the panel and run it until it idles out.
/// Owned handles of a node panel, so it can outlive the command that opened it.
#[derive(Clone)]
pub struct NodePanel {
    ctx: serenity::Context,
    registry: Arc<NodeRegistry>,
    players: Arc<PlayerRegistry>,
    color: u32,
    timeout: Duration,
}

impl NodePanel {
    pub fn new(ctx: Context<'_>) -> Self {
        let data = ctx.data();
        Self {
            ctx: ctx.serenity_context().clone(),
            registry: Arc::clone(&data.registry),
            players: Arc::clone(&data.players),
            color: data.config.embed_color,
            timeout: data.config.panel_timeout,
        }
    }

    /// Answer `opener` with the panel and drive it on its own task. Failures are logged.
    pub fn spawn(self, opener: ComponentInteraction) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run(&opener).await {
                error!("Node panel opened by {} failed: {}", opener.user.name, e);
            }
        })
    }

    async fn run(&self, opener: &ComponentInteraction) -> Result<(), Error> {
        let ctx = &self.ctx;
        let mut selected: Option<String> = None;

        // The panel is its own ephemeral message, separate from the debug panel.
        opener
            .create_response(
                ctx,
                CreateInteractionResponse::Message(
                    panel_message(&self.registry, None, self.color).ephemeral(true),
                ),
            )
            .await?;
        let message_id = opener.get_response(ctx).await?.id;

        while let Some(interaction) = ComponentInteractionCollector::new(ctx)
            .author_id(opener.user.id)
            .message_id(message_id)
            .timeout(self.timeout)
            .await
        {
            let Some(action) = NodeAction::from_custom_id(&interaction.data.custom_id) else {
                continue;
            };
            debug!("Node panel action {:?} by {}", action, interaction.user.name);

            if action == NodeAction::Add {
                self.add_node(opener, &interaction, selected.as_deref()).await?;
                continue;
            }
            if action == NodeAction::Select {
                // Drop selections of nodes removed since the menu was rendered.
                selected =
                    selected_node(&interaction.data.kind).filter(|id| self.registry.contains(id));
                interaction
                    .create_response(
                        ctx,
                        CreateInteractionResponse::UpdateMessage(panel_message(
                            &self.registry,
                            selected.as_deref(),
                            self.color,
                        )),
                    )
                    .await?;
                continue;
            }

            let Some(identifier) = selected.clone() else {
                interaction
                    .create_response(ctx, ephemeral("Pick a node first!".into()))
                    .await?;
                continue;
            };
            let outcome = match action {
                NodeAction::Remove => remove_node(&self.registry, &self.players, &identifier)
                    .await
                    .map(|orphaned| {
                        selected = None;
                        Some(format!(
                            "Removed node {identifier} ({orphaned} player(s) stopped)"
                        ))
                    }),
                NodeAction::Reconnect => self.registry.reconnect(&identifier).await.map(|_| None),
                NodeAction::Connect => self.registry.connect(&identifier).await.map(|_| None),
                NodeAction::Disconnect => {
                    self.registry.disconnect(&identifier).await.map(|_| None)
                }
                NodeAction::Add | NodeAction::Select => Ok(None),
            };

            // Re-render on success, otherwise tell the maintainer privately.
            match outcome {
                Ok(notice) => {
                    let mut message =
                        panel_message(&self.registry, selected.as_deref(), self.color);
                    if let Some(notice) = notice {
                        message = message.content(notice);
                    }
                    interaction
                        .create_response(ctx, CreateInteractionResponse::UpdateMessage(message))
                        .await?;
                }
                Err(e) => {
                    warn!("Node panel {:?} on {} failed: {}", action, identifier, e);
                    interaction
                        .create_response(ctx, ephemeral(e.user_message()))
                        .await?;
                }
            }
        }

        // Timed out: leave the panel visible but inert.
        let nodes = self.registry.list();
        let mut rows = components(&nodes, selected.as_deref());
        disable_all(&mut rows);
        opener
            .edit_response(ctx, EditInteractionResponse::new().components(rows))
            .await?;
        Ok(())
    }

    async fn add_node(
        &self,
        opener: &ComponentInteraction,
        interaction: &ComponentInteraction,
        selected: Option<&str>,
    ) -> Result<(), Error> {
        let ctx = &self.ctx;
        // A dismissed modal yields nothing.
        let Some(response) = interaction.quick_modal(ctx, add_node_modal()).await? else {
            return Ok(());
        };
        let inputs = &response.inputs;
        let field = |i: usize| inputs.get(i).map(String::as_str).unwrap_or_default();

        let config = match NodeConfig::from_form(field(0), field(1), field(2), field(3), field(4))
        {
            Ok(config) => config,
            Err(e) => {
                response
                    .interaction
                    .create_response(ctx, ephemeral(e.user_message()))
                    .await?;
                return Ok(());
            }
        };

        // Connecting may take a while; keep the modal interaction alive meanwhile.
        response.interaction.defer_ephemeral(ctx).await?;
        let text = match self.registry.add(config).await {
            Ok(node) => {
                info!("{} added node {}", interaction.user.name, node.identifier);
                let nodes = self.registry.list();
                opener
                    .edit_response(
                        ctx,
                        EditInteractionResponse::new()
                            .embed(nodes_embed(&nodes, selected, self.color))
                            .components(components(&nodes, selected)),
                    )
                    .await?;
                format!("Connected to node {}!", node.identifier)
            }
            Err(e) => {
                warn!("Adding a node failed: {}", e);
                e.user_message()
            }
        };
        response
            .interaction
            .edit_response(ctx, EditInteractionResponse::new().content(text))
            .await?;
        Ok(())
    }
}

/// Rebuild `rows` with every component disabled.
pub(crate) fn disable_all(rows: &mut [CreateActionRow]) {
    for row in rows.iter_mut() {
        match row {
            CreateActionRow::Buttons(buttons) => {
                for button in buttons.iter_mut() {
                    *button = button.clone().disabled(true);
                }
            }
            CreateActionRow::SelectMenu(menu) => {
                *menu = menu.clone().disabled(true);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{CpuStats, MemoryStats, NodeStats};
    use pretty_assertions::assert_eq;

    fn snapshot(identifier: &str, available: bool) -> NodeSnapshot {
        NodeSnapshot {
            identifier: identifier.to_string(),
            host: "10.0.0.5".to_string(),
            port: 2333,
            secure: false,
            available,
            stats: available.then(|| NodeStats {
                players: 2,
                playing_players: 1,
                uptime: 90_061_000,
                memory: MemoryStats {
                    free: 1024,
                    used: 3072,
                    ..Default::default()
                },
                cpu: CpuStats {
                    cores: 4,
                    system_load: 0.5,
                    lavalink_load: 0.125,
                },
            }),
            latency: Some(Duration::from_millis(42)),
            player_count: 2,
        }
    }

    #[test]
    fn test_panel_can_run_on_its_own_task() {
        fn detachable<T: Clone + Send + Sync + 'static>() {}
        detachable::<NodePanel>();
        detachable::<ComponentInteraction>();
    }

    #[test]
    fn test_only_add_works_without_selection() {
        assert!(is_enabled(NodeAction::Add, None));
        assert!(!is_enabled(NodeAction::Remove, None));
        assert!(!is_enabled(NodeAction::Disconnect, None));
        assert!(is_enabled(NodeAction::Remove, Some("main")));
    }

    #[test]
    fn test_connected_node_shows_stats() {
        let (name, value) = node_field(&snapshot("main", true));

        assert_eq!(name, "Node main - 🟢 Connected");
        assert!(value.contains("• ADDRESS: 10.0.0.5:2333"));
        assert!(value.contains("• CPU:     12.5%"));
        assert!(value.contains("(25.0%)"));
        assert!(value.contains("• LATENCY: 42.00ms"));
    }

    #[test]
    fn test_disconnected_node_has_no_stats() {
        let (name, value) = node_field(&snapshot("backup", false));

        assert_eq!(name, "Node backup - 🔴 Disconnected");
        assert!(value.contains("No other data to display"));
        assert!(!value.contains("LATENCY"));
    }

    #[test]
    fn test_embed_caps_fields_and_counts_the_rest() {
        let nodes: Vec<NodeSnapshot> = (0..30)
            .map(|i| snapshot(&format!("node-{i:02}"), i % 2 == 0))
            .collect();

        let embed = serde_json::to_value(nodes_embed(&nodes, None, 0)).unwrap();

        assert_eq!(embed["fields"].as_array().unwrap().len(), MAX_EMBED_FIELDS);
        assert_eq!(embed["footer"]["text"], "+5 more node(s)");
    }

    #[test]
    fn test_embed_narrows_to_selected_node() {
        let nodes = vec![snapshot("backup", false), snapshot("main", true)];

        let all = serde_json::to_value(nodes_embed(&nodes, None, 0)).unwrap();
        let one = serde_json::to_value(nodes_embed(&nodes, Some("main"), 0)).unwrap();
        let none = serde_json::to_value(nodes_embed(&[], None, 0)).unwrap();

        assert_eq!(all["fields"].as_array().unwrap().len(), 2);
        assert_eq!(one["fields"].as_array().unwrap().len(), 1);
        assert_eq!(one["fields"][0]["name"], "Node main - 🟢 Connected");
        assert_eq!(none["description"], "```No audio nodes are registered!```");
    }

    #[test]
    fn test_custom_ids_round_trip() {
        for action in NodeAction::ALL {
            assert_eq!(NodeAction::from_custom_id(action.custom_id()), Some(action));
        }
    }
}
