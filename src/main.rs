use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use setlist::commands::{debug::debug, settings::settings};
use setlist::nodes::connector::HttpNodeConnector;
use setlist::nodes::heartbeat;
use setlist::nodes::registry::NodeRegistry;
use setlist::settings::store::SettingsStore;
use setlist::utils::config::BotConfig;
use setlist::utils::cooldown;
use setlist::utils::session::load_sessions;
use setlist::{Data, Error, cooldown_check, guild_prefix, help, on_error, register};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("setlist=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = BotConfig::from_env()?;
    let store = SettingsStore::open(&config.database_path, config.settings_defaults())?;

    let connector = Arc::new(HttpNodeConnector::new(config.node_timeout)?);
    let registry = Arc::new(NodeRegistry::new(connector));
    for node in config.nodes.clone() {
        let identifier = node.identifier.clone();
        if let Err(e) = registry.add(node).await {
            warn!("Could not connect to node {}: {}", identifier, e);
        }
    }
    heartbeat::spawn(registry.clone(), config.stats_interval);

    match load_sessions(&config.session_file) {
        Ok(sessions) if !sessions.is_empty() => info!(
            "Found {} saved player session(s) in {}",
            sessions.len(),
            config.session_file.display()
        ),
        Ok(_) => {}
        Err(e) => warn!("Ignoring unreadable session file: {}", e),
    }

    let token = env::var("DISCORD_TOKEN").map_err(|_| "Missing DISCORD_TOKEN")?;

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let commands = vec![
        // Default commands
        register(),
        help(),
        // Administration
        settings(),
        debug(),
    ];

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            on_error: |error| Box::pin(on_error(error)),
            command_check: Some(cooldown_check),
            prefix_options: poise::PrefixFrameworkOptions {
                dynamic_prefix: Some(guild_prefix),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let prune_every = config.stats_interval;
                let data = Data::new(config, store, registry).with_intents(intents);
                // Forget expired cooldowns alongside the node heartbeat.
                cooldown::spawn_pruner(Arc::clone(&data.cooldowns), prune_every);
                Ok(data)
            })
        });

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework.build())
        .await?;
    client.start().await.map_err(Into::into)
}
