//! The `customcontroller` panel: a live preview of the controller embed with buttons
//! opening small forms for each part of it.

use poise::serenity_prelude::{
    ButtonStyle, ComponentInteraction, ComponentInteractionCollector,
    ComponentInteractionDataKind, CreateActionRow, CreateButton, CreateInputText,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateQuickModal,
    CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, GuildId, InputTextStyle,
};
use poise::{CreateReply, ReplyHandle};
use std::time::Duration;
use tracing::{debug, info};

use super::guild_id;
use crate::settings::builder::{ContentEdit, EmbedBuilderSession, SessionState};
use crate::settings::embed::{ControllerState, EmbedTemplate, Placeholders};
use crate::utils::error::{BotError, BotResult};
use crate::{CommandResult, Context, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderAction {
    Select,
    Content,
    Author,
    Image,
    Footer,
    AddField,
    RemoveField,
    Apply,
    Reset,
    Close,
}

impl BuilderAction {
    const ALL: [BuilderAction; 10] = [
        BuilderAction::Select,
        BuilderAction::Content,
        BuilderAction::Author,
        BuilderAction::Image,
        BuilderAction::Footer,
        BuilderAction::AddField,
        BuilderAction::RemoveField,
        BuilderAction::Apply,
        BuilderAction::Reset,
        BuilderAction::Close,
    ];

    pub fn custom_id(&self) -> &'static str {
        match self {
            BuilderAction::Select => "embed_builder_state",
            BuilderAction::Content => "embed_builder_content",
            BuilderAction::Author => "embed_builder_author",
            BuilderAction::Image => "embed_builder_image",
            BuilderAction::Footer => "embed_builder_footer",
            BuilderAction::AddField => "embed_builder_add_field",
            BuilderAction::RemoveField => "embed_builder_remove_field",
            BuilderAction::Apply => "embed_builder_apply",
            BuilderAction::Reset => "embed_builder_reset",
            BuilderAction::Close => "embed_builder_close",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.custom_id() == id)
    }

    fn label(&self) -> &'static str {
        match self {
            BuilderAction::Select => "Controller state",
            BuilderAction::Content => "Edit content",
            BuilderAction::Author => "Edit author",
            BuilderAction::Image => "Edit image",
            BuilderAction::Footer => "Edit footer",
            BuilderAction::AddField => "Add field",
            BuilderAction::RemoveField => "Remove field",
            BuilderAction::Apply => "Apply",
            BuilderAction::Reset => "Reset",
            BuilderAction::Close => "Close",
        }
    }

    fn style(&self) -> ButtonStyle {
        match self {
            BuilderAction::Apply => ButtonStyle::Success,
            BuilderAction::Reset => ButtonStyle::Secondary,
            BuilderAction::Close => ButtonStyle::Danger,
            _ => ButtonStyle::Primary,
        }
    }
}

/// Whether `action` can be used in the session's current state.
pub fn is_enabled(session: &EmbedBuilderSession, action: BuilderAction) -> bool {
    if session.state() != SessionState::Editing {
        return false;
    }
    match action {
        BuilderAction::RemoveField => !session.current().fields.is_empty(),
        BuilderAction::Apply | BuilderAction::Reset => session.is_dirty(),
        _ => true,
    }
}

fn components(session: &EmbedBuilderSession) -> Vec<CreateActionRow> {
    let selected = session.selected();
    let options = [ControllerState::Active, ControllerState::Inactive]
        .into_iter()
        .map(|state| {
            CreateSelectMenuOption::new(state.to_string(), state.as_str())
                .default_selection(state == selected)
        })
        .collect();
    let menu = CreateSelectMenu::new(
        BuilderAction::Select.custom_id(),
        CreateSelectMenuKind::String { options },
    )
    .placeholder("Controller state")
    .disabled(!is_enabled(session, BuilderAction::Select));

    let button = |action: BuilderAction| {
        CreateButton::new(action.custom_id())
            .label(action.label())
            .style(action.style())
            .disabled(!is_enabled(session, action))
    };

    vec![
        CreateActionRow::SelectMenu(menu),
        CreateActionRow::Buttons(vec![
            button(BuilderAction::Content),
            button(BuilderAction::Author),
            button(BuilderAction::Image),
            button(BuilderAction::Footer),
        ]),
        CreateActionRow::Buttons(vec![
            button(BuilderAction::AddField),
            button(BuilderAction::RemoveField),
        ]),
        CreateActionRow::Buttons(vec![
            button(BuilderAction::Apply),
            button(BuilderAction::Reset),
            button(BuilderAction::Close),
        ]),
    ]
}

fn status_line(session: &EmbedBuilderSession) -> String {
    match session.state() {
        SessionState::Editing if session.is_dirty() => {
            format!("Editing the **{}** controller (unsaved changes)", session.selected())
        }
        SessionState::Editing => format!("Editing the **{}** controller", session.selected()),
        SessionState::Persisted => "The custom controller was saved.".to_string(),
        SessionState::Discarded => "This panel is closed, nothing was saved.".to_string(),
    }
}

fn panel(session: &EmbedBuilderSession, ph: &Placeholders) -> CreateReply {
    CreateReply::default()
        .content(status_line(session))
        .embed(session.preview(ph))
        .components(components(session))
}

fn panel_update(session: &EmbedBuilderSession, ph: &Placeholders) -> CreateInteractionResponse {
    CreateInteractionResponse::UpdateMessage(
        CreateInteractionResponseMessage::new()
            .content(status_line(session))
            .embed(session.preview(ph))
            .components(components(session)),
    )
}

fn ephemeral(text: String) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(text)
            .ephemeral(true),
    )
}

fn input(style: InputTextStyle, label: &str, id: &str, current: Option<&str>) -> CreateInputText {
    let input = CreateInputText::new(style, label, id).required(false);
    match current.filter(|v| !v.is_empty()) {
        Some(value) => input.value(value),
        None => input,
    }
}

/// The form opened by `action`, prefilled with the selected template.
fn modal_for(action: BuilderAction, template: &EmbedTemplate, timeout: Duration) -> Option<CreateQuickModal> {
    use InputTextStyle::{Paragraph, Short};

    let title = template.title.as_ref();
    let author = template.author.as_ref();
    let footer = template.footer.as_ref();
    let color = template.color.map(|c| format!("#{c:06X}"));

    let modal = match action {
        BuilderAction::Content => CreateQuickModal::new("Edit content")
            .field(input(Short, "Title", "title", title.and_then(|t| t.name.as_deref())))
            .field(input(Short, "Title URL", "url", title.and_then(|t| t.url.as_deref())))
            .field(input(Short, "Color (hex)", "color", color.as_deref()))
            .field(input(Paragraph, "Description", "description", template.description.as_deref())),
        BuilderAction::Author => CreateQuickModal::new("Edit author")
            .field(input(Short, "Name", "name", author.map(|a| a.name.as_str())))
            .field(input(Short, "URL", "url", author.and_then(|a| a.url.as_deref())))
            .field(input(Short, "Icon URL", "icon_url", author.and_then(|a| a.icon_url.as_deref()))),
        BuilderAction::Image => CreateQuickModal::new("Edit image")
            .field(input(Short, "Thumbnail URL", "thumbnail", template.thumbnail.as_deref()))
            .field(input(Short, "Image URL", "image", template.image.as_deref())),
        BuilderAction::Footer => CreateQuickModal::new("Edit footer")
            .field(input(Paragraph, "Text", "text", footer.map(|f| f.text.as_str())))
            .field(input(Short, "Icon URL", "icon_url", footer.and_then(|f| f.icon_url.as_deref()))),
        BuilderAction::AddField => CreateQuickModal::new("Add field")
            .field(input(Short, "Name", "name", None).required(true))
            .field(input(Paragraph, "Value", "value", None).required(true))
            .field(input(Short, "Inline (true/false)", "inline", Some("false"))),
        BuilderAction::RemoveField => CreateQuickModal::new("Remove field").field(
            input(Short, "Position (1 is the first field)", "position", None).required(true),
        ),
        _ => return None,
    };
    Some(modal.timeout(timeout))
}

fn take(inputs: &[String], index: usize) -> String {
    inputs.get(index).cloned().unwrap_or_default()
}

/// Apply submitted form `inputs`, in field order, to the session.
pub fn apply_form(
    session: &mut EmbedBuilderSession,
    action: BuilderAction,
    inputs: &[String],
) -> BotResult<()> {
    match action {
        BuilderAction::Content => session.edit_content(ContentEdit {
            title: take(inputs, 0),
            url: take(inputs, 1),
            color: take(inputs, 2),
            description: take(inputs, 3),
        }),
        BuilderAction::Author => session.edit_author(take(inputs, 0), take(inputs, 1), take(inputs, 2)),
        BuilderAction::Image => session.edit_image(take(inputs, 0), take(inputs, 1)),
        BuilderAction::Footer => session.edit_footer(take(inputs, 0), take(inputs, 1)),
        BuilderAction::AddField => session.add_field(take(inputs, 0), take(inputs, 1), &take(inputs, 2)),
        BuilderAction::RemoveField => {
            let raw = take(inputs, 0);
            let position = raw.trim().parse::<usize>().map_err(|_| {
                BotError::Validation(format!("`{}` is not a field number", raw.trim()))
            })?;
            session.remove_field(position).map(|_| ())
        }
        other => Err(BotError::Validation(format!(
            "{} does not take a form",
            other.label()
        ))),
    }
}

fn selected_state(kind: &ComponentInteractionDataKind) -> BotResult<ControllerState> {
    match kind {
        ComponentInteractionDataKind::StringSelect { values } => values
            .first()
            .and_then(|value| ControllerState::parse(value))
            .ok_or_else(|| BotError::Validation("Unknown controller state".into())),
        _ => Err(BotError::Validation("Unknown controller state".into())),
    }
}

enum Flow {
    Continue,
    Done,
}

/// Open the panel and drive it until it is applied, closed or times out.
pub async fn run(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();
    // Edits happen on a copy of the stored templates until Apply.
    let mut session = EmbedBuilderSession::from_store(&data.store, guild_id, ctx.author().id)?;

    // Preview with a sample track so every placeholder shows something.
    let placeholders = {
        let bot = ctx.cache().current_user();
        Placeholders::idle(&bot.name, &bot.face(), &data.config.default_embed_image)
            .with_sample_track()
    };

    let handle = ctx.send(panel(&session, &placeholders)).await?;
    let message_id = handle.message().await?.id;
    let timeout = data.config.embed_builder_timeout;

    while let Some(interaction) = ComponentInteractionCollector::new(ctx)
        .message_id(message_id)
        .timeout(timeout)
        .await
    {
        let Some(action) = BuilderAction::from_custom_id(&interaction.data.custom_id) else {
            continue;
        };
        // Only the opener may drive the panel.
        if !session.is_author(interaction.user.id) {
            interaction
                .create_response(
                    ctx,
                    ephemeral("Only the person who opened this panel can use it.".into()),
                )
                .await?;
            continue;
        }

        let flow = handle_action(
            ctx,
            &handle,
            &mut session,
            &interaction,
            action,
            guild_id,
            &placeholders,
        )
        .await?;
        if let Flow::Done = flow {
            return Ok(());
        }
    }

    // Idle too long: drop unsaved edits and disable the panel.
    session.discard();
    debug!("Embed builder in guild {} timed out", guild_id);
    handle.edit(ctx, panel(&session, &placeholders)).await?;
    Ok(())
}

async fn handle_action(
    ctx: Context<'_>,
    handle: &ReplyHandle<'_>,
    session: &mut EmbedBuilderSession,
    interaction: &ComponentInteraction,
    action: BuilderAction,
    guild_id: GuildId,
    ph: &Placeholders,
) -> Result<Flow, Error> {
    let timeout = ctx.data().config.embed_builder_timeout;

    if let Some(modal) = modal_for(action, session.current(), timeout) {
        let Some(response) = interaction.quick_modal(ctx.serenity_context(), modal).await? else {
            return Ok(Flow::Continue);
        };
        match apply_form(session, action, &response.inputs) {
            Ok(()) => {
                response
                    .interaction
                    .create_response(ctx, CreateInteractionResponse::Acknowledge)
                    .await?;
                handle.edit(ctx, panel(session, ph)).await?;
            }
            Err(e) => {
                response
                    .interaction
                    .create_response(ctx, ephemeral(e.user_message()))
                    .await?;
            }
        }
        return Ok(Flow::Continue);
    }

    let (outcome, flow) = match action {
        BuilderAction::Select => (
            selected_state(&interaction.data.kind).and_then(|state| session.select(state)),
            Flow::Continue,
        ),
        BuilderAction::Reset => (session.reset(), Flow::Continue),
        BuilderAction::Apply => match session.apply(&ctx.data().store, guild_id) {
            Ok(_) => {
                info!("{} saved a custom controller in {}", interaction.user.name, guild_id);
                (Ok(()), Flow::Done)
            }
            Err(e) => (Err(e), Flow::Continue),
        },
        BuilderAction::Close => {
            session.discard();
            (Ok(()), Flow::Done)
        }
        _ => (Ok(()), Flow::Continue),
    };

    let response = match outcome {
        Ok(()) => panel_update(session, ph),
        Err(e) => ephemeral(e.user_message()),
    };
    interaction.create_response(ctx, response).await?;
    Ok(flow)
}
