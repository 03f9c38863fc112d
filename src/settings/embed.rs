//! Controller embed templates as they are stored in the guild settings document,
//! plus rendering them into Discord embeds.

use poise::serenity_prelude::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Discord refuses embeds with more fields than this.
pub const MAX_EMBED_FIELDS: usize = 25;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@([A-Za-z0-9_]+)@@").expect("placeholder pattern is valid"));

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FooterTemplate {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldTemplate {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// A single controller embed, every part optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<TitleTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<FooterTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Which controller state a template is shown in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Active,
    Inactive,
}

impl ControllerState {
    pub const ALL: [ControllerState; 2] = [ControllerState::Active, ControllerState::Inactive];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Active => "active",
            ControllerState::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "active" => Some(ControllerState::Active),
            "inactive" => Some(ControllerState::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pair of controller embeds stored under `default_controller`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EmbedTemplateSet {
    #[serde(default)]
    pub active: EmbedTemplate,
    #[serde(default)]
    pub inactive: EmbedTemplate,
}

impl EmbedTemplateSet {
    pub fn get(&self, state: ControllerState) -> &EmbedTemplate {
        match state {
            ControllerState::Active => &self.active,
            ControllerState::Inactive => &self.inactive,
        }
    }

    pub fn get_mut(&mut self, state: ControllerState) -> &mut EmbedTemplate {
        match state {
            ControllerState::Active => &mut self.active,
            ControllerState::Inactive => &mut self.inactive,
        }
    }
}

impl Default for EmbedTemplateSet {
    fn default() -> Self {
        Self {
            active: EmbedTemplate {
                title: Some(TitleTemplate {
                    name: Some("@@track_name@@".to_string()),
                    url: Some("@@track_url@@".to_string()),
                }),
                author: Some(AuthorTemplate {
                    name: "Music Controller | @@channel_name@@".to_string(),
                    url: None,
                    icon_url: Some("@@bot_icon@@".to_string()),
                }),
                description: Some("**Requester:** @@requester@@ | **Duration:** `@@track_duration@@`".to_string()),
                color: Some(0xb3b3b3),
                fields: Vec::new(),
                footer: Some(FooterTemplate {
                    text: "Queue length: @@queue_length@@ | Volume: @@volume@@%".to_string(),
                    icon_url: None,
                }),
                thumbnail: None,
                image: Some("@@track_thumbnail@@".to_string()),
            },
            inactive: EmbedTemplate {
                title: Some(TitleTemplate {
                    name: Some("There are no songs playing right now".to_string()),
                    url: None,
                }),
                author: None,
                description: Some("Send a song link or query to play.".to_string()),
                color: Some(0xb3b3b3),
                fields: Vec::new(),
                footer: None,
                thumbnail: None,
                image: Some("@@default_embed_image@@".to_string()),
            },
        }
    }
}

/// Values substituted for `@@key@@` tokens when an embed template is rendered.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: HashMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Values known while nothing is playing.
    pub fn idle(bot_name: &str, bot_icon: &str, default_image: &str) -> Self {
        Self::new()
            .with("bot_name", bot_name)
            .with("bot_icon", bot_icon)
            .with("default_embed_image", default_image)
            .with("channel_name", "None")
            .with("queue_length", "0")
    }

    /// Stand-in track values for previewing the active controller.
    pub fn with_sample_track(self) -> Self {
        self.with("track_name", "Never Gonna Give You Up")
            .with("track_url", "https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .with("track_thumbnail", "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg")
            .with("artist", "Rick Astley")
            .with("track_duration", "3:33")
            .with("requester", "@someone")
            .with("volume", "100")
    }

    /// Unknown tokens are left as-is so a typo stays visible in the preview.
    pub fn replace(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                self.values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Links whose placeholders did not resolve to a web URL are dropped; Discord rejects
/// the whole embed otherwise.
fn resolved_url(value: &Option<String>, ph: &Placeholders) -> Option<String> {
    let url = ph.replace(non_empty(value)?.trim());
    (url.starts_with("https://") || url.starts_with("http://")).then_some(url)
}

/// Build a Discord embed out of a stored template.
pub fn render(template: &EmbedTemplate, ph: &Placeholders) -> CreateEmbed {
    let mut embed = CreateEmbed::new();

    if let Some(title) = &template.title {
        if let Some(name) = non_empty(&title.name) {
            embed = embed.title(ph.replace(name));
        }
        if let Some(url) = resolved_url(&title.url, ph) {
            embed = embed.url(url);
        }
    }

    if let Some(author) = &template.author {
        if !author.name.trim().is_empty() {
            let mut create_author = CreateEmbedAuthor::new(ph.replace(&author.name));
            if let Some(url) = resolved_url(&author.url, ph) {
                create_author = create_author.url(url);
            }
            if let Some(icon) = resolved_url(&author.icon_url, ph) {
                create_author = create_author.icon_url(icon);
            }
            embed = embed.author(create_author);
        }
    }

    if let Some(description) = non_empty(&template.description) {
        embed = embed.description(ph.replace(description));
    }

    if let Some(color) = template.color {
        embed = embed.color(color);
    }

    for field in &template.fields {
        embed = embed.field(ph.replace(&field.name), ph.replace(&field.value), field.inline);
    }

    if let Some(footer) = &template.footer {
        if !footer.text.trim().is_empty() {
            let mut create_footer = CreateEmbedFooter::new(ph.replace(&footer.text));
            if let Some(icon) = resolved_url(&footer.icon_url, ph) {
                create_footer = create_footer.icon_url(icon);
            }
            embed = embed.footer(create_footer);
        }
    }

    if let Some(thumbnail) = resolved_url(&template.thumbnail, ph) {
        embed = embed.thumbnail(thumbnail);
    }
    if let Some(image) = resolved_url(&template.image, ph) {
        embed = embed.image(image);
    }

    embed
}
