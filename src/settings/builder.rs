//! Working-copy editor behind the `customcontroller` panel.
//!
//! The session snapshots the stored template set when it opens. Edits only touch the
//! working copy; `apply` writes the whole copy in one patch, `reset` restores the
//! snapshot, and once applied or discarded the session refuses further edits.

use poise::serenity_prelude::{CreateEmbed, UserId};
use serenity::model::id::GuildId;
use tracing::{debug, info};
use url::Url;

use super::embed::{
    self, AuthorTemplate, ControllerState, EmbedTemplate, EmbedTemplateSet, FieldTemplate,
    FooterTemplate, MAX_EMBED_FIELDS, Placeholders, TitleTemplate,
};
use super::store::SettingsStore;
use super::{GuildSettings, SettingKey, SettingsPatch};
use crate::utils::error::{BotError, BotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    /// The working copy was written to the store.
    Persisted,
    /// Closed or timed out without applying.
    Discarded,
}

/// Inputs of the "Edit content" modal.
#[derive(Debug, Clone, Default)]
pub struct ContentEdit {
    pub title: String,
    pub url: String,
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct EmbedBuilderSession {
    author_id: UserId,
    original: EmbedTemplateSet,
    working: EmbedTemplateSet,
    selected: ControllerState,
    state: SessionState,
}

impl EmbedBuilderSession {
    pub fn open(author_id: UserId, stored: EmbedTemplateSet) -> Self {
        Self {
            author_id,
            original: stored.clone(),
            working: stored,
            selected: ControllerState::Active,
            state: SessionState::Editing,
        }
    }

    /// Open a session on the guild's current controller templates.
    pub fn from_store(
        store: &SettingsStore,
        guild_id: GuildId,
        author_id: UserId,
    ) -> BotResult<Self> {
        let settings = store.get(guild_id)?;
        debug!("Opening embed builder for guild {} by {}", guild_id, author_id);
        Ok(Self::open(author_id, settings.default_controller))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selected(&self) -> ControllerState {
        self.selected
    }

    pub fn working(&self) -> &EmbedTemplateSet {
        &self.working
    }

    pub fn original(&self) -> &EmbedTemplateSet {
        &self.original
    }

    /// Only the administrator who opened the panel may drive it.
    pub fn is_author(&self, user_id: UserId) -> bool {
        self.author_id == user_id
    }

    pub fn is_dirty(&self) -> bool {
        self.working != self.original
    }

    fn ensure_editing(&self) -> BotResult<()> {
        match self.state {
            SessionState::Editing => Ok(()),
            _ => Err(BotError::SessionClosed),
        }
    }

    fn current_mut(&mut self) -> BotResult<&mut EmbedTemplate> {
        self.ensure_editing()?;
        Ok(self.working.get_mut(self.selected))
    }

    pub fn current(&self) -> &EmbedTemplate {
        self.working.get(self.selected)
    }

    pub fn select(&mut self, state: ControllerState) -> BotResult<()> {
        self.ensure_editing()?;
        self.selected = state;
        Ok(())
    }

    /// Title, title URL, color and description. Nothing changes if any input is invalid.
    pub fn edit_content(&mut self, edit: ContentEdit) -> BotResult<()> {
        let color = parse_color(&edit.color)?;
        let url = check_url("Title URL", &edit.url)?;
        let template = self.current_mut()?;

        template.description = non_empty(edit.description);
        template.color = color;
        template.title = Some(TitleTemplate {
            name: non_empty(edit.title),
            url,
        });
        Ok(())
    }

    /// An empty author name removes the author block.
    pub fn edit_author(&mut self, name: String, url: String, icon_url: String) -> BotResult<()> {
        let url = check_url("Author URL", &url)?;
        let icon_url = check_url("Author icon URL", &icon_url)?;
        let template = self.current_mut()?;

        template.author = if name.trim().is_empty() {
            None
        } else {
            Some(AuthorTemplate {
                name,
                url,
                icon_url,
            })
        };
        Ok(())
    }

    pub fn edit_image(&mut self, thumbnail: String, image: String) -> BotResult<()> {
        let thumbnail = check_url("Thumbnail URL", &thumbnail)?;
        let image = check_url("Image URL", &image)?;
        let template = self.current_mut()?;

        template.thumbnail = thumbnail;
        template.image = image;
        Ok(())
    }

    pub fn edit_footer(&mut self, text: String, icon_url: String) -> BotResult<()> {
        let icon_url = check_url("Footer icon URL", &icon_url)?;
        let template = self.current_mut()?;

        template.footer = Some(FooterTemplate { text, icon_url });
        Ok(())
    }

    /// `inline` is true only for the literal text `true` (any case).
    pub fn add_field(&mut self, name: String, value: String, inline: &str) -> BotResult<()> {
        let template = self.current_mut()?;
        if template.fields.len() >= MAX_EMBED_FIELDS {
            return Err(BotError::Validation(format!(
                "An embed can hold at most {MAX_EMBED_FIELDS} fields"
            )));
        }
        if name.trim().is_empty() || value.trim().is_empty() {
            return Err(BotError::Validation("A field needs a name and a value".into()));
        }

        template.fields.push(FieldTemplate {
            name,
            value,
            inline: inline.trim().eq_ignore_ascii_case("true"),
        });
        Ok(())
    }

    /// Remove a field by its 1-based position as shown in the preview.
    pub fn remove_field(&mut self, position: usize) -> BotResult<FieldTemplate> {
        let template = self.current_mut()?;
        if template.fields.is_empty() {
            return Err(BotError::NotFound("There are no fields to remove".into()));
        }
        if position == 0 || position > template.fields.len() {
            return Err(BotError::NotFound(format!("Field #{position} does not exist")));
        }
        Ok(template.fields.remove(position - 1))
    }

    /// Restore the working copy from the snapshot taken at open; the session stays open.
    pub fn reset(&mut self) -> BotResult<()> {
        self.ensure_editing()?;
        self.working = self.original.clone();
        Ok(())
    }

    /// Persist the whole working copy. On failure the session stays open so the
    /// administrator can retry.
    pub fn apply(&mut self, store: &SettingsStore, guild_id: GuildId) -> BotResult<GuildSettings> {
        self.ensure_editing()?;

        let patch = SettingsPatch::new().set(
            SettingKey::DefaultController,
            serde_json::to_value(&self.working)?,
        );
        let settings = store.update(guild_id, &patch)?;

        self.state = SessionState::Persisted;
        info!("Applied custom controller for guild {}", guild_id);
        Ok(settings)
    }

    /// Close without saving. Closing an already closed session is a no-op.
    pub fn discard(&mut self) {
        if self.state == SessionState::Editing {
            self.state = SessionState::Discarded;
        }
    }

    /// Render the selected template for the panel preview.
    pub fn preview(&self, ph: &Placeholders) -> CreateEmbed {
        embed::render(self.current(), ph)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Hex color with an optional `#` or `0x` prefix; empty clears the color.
pub fn parse_color(input: &str) -> BotResult<Option<u32>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let digits = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    match u32::from_str_radix(digits, 16) {
        Ok(color) if color <= 0xFFFFFF => Ok(Some(color)),
        _ => Err(BotError::Validation(format!(
            "`{trimmed}` is not a hex color like #1DB954"
        ))),
    }
}

/// Empty means unset; placeholder tokens are accepted as-is, anything else must be
/// an http(s) URL.
fn check_url(label: &str, input: &str) -> BotResult<Option<String>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.contains("@@") {
        return Ok(Some(trimmed.to_string()));
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(trimmed.to_string())),
        _ => Err(BotError::Validation(format!("{label} `{trimmed}` is not a valid URL"))),
    }
}
