//! The debug console. Input is a script of read-only introspection commands, one per
//! line; nothing typed here is ever compiled or executed as code.

use serenity::model::id::{GuildId, UserId};
use std::fmt::Write;
use tracing::{debug, info};

use super::error::{BotError, BotResult};
use super::format::{format_bytes, format_uptime, number_lines};
use crate::Data;

const HELP: &str = "\
help              list console commands
nodes             every registered node
node <id>         details of one node
players           live players by guild
settings <guild>  stored settings document of a guild
languages         supported languages
uptime            time since the bot started
echo <text>       print text";

/// Result of one console run.
#[derive(Debug)]
pub struct Evaluation {
    /// Line-numbered output, or the error line when a command failed.
    pub rendered: String,
    /// The error that stopped the script, kept for the "Error" button.
    pub error: Option<BotError>,
}

impl Evaluation {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

pub struct Evaluator<'a> {
    data: &'a Data,
}

impl<'a> Evaluator<'a> {
    pub fn new(data: &'a Data) -> Self {
        Self { data }
    }

    /// Run `input` on behalf of `user`. Only the access check can fail; errors inside
    /// the script are captured in the returned [`Evaluation`].
    pub fn run(&self, user: UserId, input: &str) -> BotResult<Evaluation> {
        if !self.data.config.has_debug_access(user.get()) {
            return Err(BotError::PermissionDenied(
                "The debug console is restricted to bot maintainers".into(),
            ));
        }

        let script = strip_code_block(input);
        info!("Debug console run by {}: {:?}", user, script);

        let mut output = String::new();
        for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match self.execute(line) {
                Ok(text) => {
                    output.push_str(&text);
                    output.push('\n');
                }
                Err(e) => {
                    debug!("Console command {:?} failed: {}", line, e);
                    return Ok(Evaluation {
                        rendered: format!("{}: {}", error_name(&e), e),
                        error: Some(e),
                    });
                }
            }
        }
        output.push_str("-- ok");

        Ok(Evaluation {
            rendered: number_lines(&output),
            error: None,
        })
    }

    fn execute(&self, line: &str) -> BotResult<String> {
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };

        match command.to_ascii_lowercase().as_str() {
            "help" => Ok(HELP.to_string()),
            "nodes" => Ok(self.nodes()),
            "node" => self.node(argument),
            "players" => Ok(self.players()),
            "settings" => self.settings(argument),
            "languages" => Ok(self.data.config.languages.join(", ")),
            "uptime" => Ok(format_uptime(self.data.started.elapsed())),
            "echo" => Ok(argument.to_string()),
            other => Err(BotError::Validation(format!(
                "Unknown command `{other}`, try `help`"
            ))),
        }
    }

    fn nodes(&self) -> String {
        let nodes = self.data.registry.list();
        if nodes.is_empty() {
            return "no nodes registered".to_string();
        }

        nodes
            .iter()
            .map(|node| {
                format!(
                    "{} {} {} players={} latency={:.2}ms",
                    if node.available { "UP  " } else { "DOWN" },
                    node.identifier,
                    node.address(),
                    node.player_count,
                    node.latency_ms()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn node(&self, identifier: &str) -> BotResult<String> {
        let node = self
            .data
            .registry
            .get(identifier)
            .ok_or_else(|| BotError::NotFound(format!("Node `{identifier}` was not found")))?;

        let mut text = format!(
            "identifier: {}\naddress:    {}\nsecure:     {}\navailable:  {}\nplayers:    {}",
            node.identifier,
            node.address(),
            node.secure,
            node.available,
            node.player_count
        );
        if let Some(stats) = &node.stats {
            let _ = write!(
                text,
                "\ncpu:        {:.1}%\nmemory:     {} used / {} free\nuptime:     {}",
                stats.process_load_percent(),
                format_bytes(stats.memory.used),
                format_bytes(stats.memory.free),
                format_uptime(stats.uptime())
            );
        }
        Ok(text)
    }

    fn players(&self) -> String {
        let players = self.data.players.all();
        if players.is_empty() {
            return "no active players".to_string();
        }

        players
            .iter()
            .map(|player| {
                format!(
                    "{} {}",
                    player.guild_id(),
                    if player.is_active() { "playing" } else { "idle" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn settings(&self, argument: &str) -> BotResult<String> {
        let guild_id = argument
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(GuildId::new)
            .ok_or_else(|| BotError::Validation(format!("`{argument}` is not a guild id")))?;

        let document = self.data.store.raw(guild_id)?;
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

/// Remove surrounding markdown code fences from console input.
pub fn strip_code_block(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.len() >= 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() >= 2 {
            return lines[1..lines.len() - 1].join("\n");
        }
    }
    trimmed.trim_matches(|c| c == '`' || c == ' ' || c == '\n').to_string()
}

fn error_name(error: &BotError) -> &'static str {
    match error {
        BotError::PermissionDenied(_) => "PermissionDenied",
        BotError::Validation(_) => "ValidationError",
        BotError::Conflict(_) => "ConflictError",
        BotError::BackendUnavailable(_) => "BackendUnavailable",
        BotError::NotFound(_) => "NotFound",
        BotError::SessionClosed => "SessionClosed",
        BotError::Cooldown(_) => "Cooldown",
    }
}
