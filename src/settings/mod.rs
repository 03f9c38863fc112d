//! Per-guild configuration: the typed view of a stored settings document, the keys it
//! may contain, and the partial-update patch applied by [`store::SettingsStore`].

pub mod builder;
pub mod embed;
pub mod store;
pub mod toggle;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

use crate::utils::error::{BotError, BotResult};
use embed::EmbedTemplateSet;

pub const MIN_VOLUME: i64 = 0;
pub const MAX_VOLUME: i64 = 150;
pub const DEFAULT_VOLUME: u8 = 100;

/// A stored settings document: only keys an administrator explicitly set.
pub type SettingsDocument = Map<String, Value>;

/// How tracks requested by different members are ordered.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueueMode {
    #[default]
    Queue,
    FairQueue,
}

impl QueueMode {
    /// Anything that is not `fairqueue` (in any case) selects the plain queue.
    pub fn from_input(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("fairqueue") {
            QueueMode::FairQueue
        } else {
            QueueMode::Queue
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueMode::Queue => "Queue",
            QueueMode::FairQueue => "FairQueue",
        }
    }
}

impl fmt::Display for QueueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dedicated song-request channel and the controller message pinned in it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestChannel {
    pub text_channel_id: u64,
    pub controller_msg_id: u64,
}

/// Every key a settings document may hold, with its stored name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    Prefix,
    Lang,
    DjRole,
    QueueType,
    AlwaysOn,
    VoteDisabled,
    Volume,
    Controller,
    ControllerMsg,
    DuplicateTrack,
    DefaultController,
    StageAnnounceTemplate,
    MusicRequestChannel,
    PlayTime,
}

impl SettingKey {
    pub const ALL: [SettingKey; 14] = [
        SettingKey::Prefix,
        SettingKey::Lang,
        SettingKey::DjRole,
        SettingKey::QueueType,
        SettingKey::AlwaysOn,
        SettingKey::VoteDisabled,
        SettingKey::Volume,
        SettingKey::Controller,
        SettingKey::ControllerMsg,
        SettingKey::DuplicateTrack,
        SettingKey::DefaultController,
        SettingKey::StageAnnounceTemplate,
        SettingKey::MusicRequestChannel,
        SettingKey::PlayTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Prefix => "prefix",
            SettingKey::Lang => "lang",
            SettingKey::DjRole => "dj",
            SettingKey::QueueType => "queueType",
            SettingKey::AlwaysOn => "24/7",
            SettingKey::VoteDisabled => "votedisable",
            SettingKey::Volume => "volume",
            SettingKey::Controller => "controller",
            SettingKey::ControllerMsg => "controller_msg",
            SettingKey::DuplicateTrack => "duplicateTrack",
            SettingKey::DefaultController => "default_controller",
            SettingKey::StageAnnounceTemplate => "stage_announce_template",
            SettingKey::MusicRequestChannel => "music_request_channel",
            SettingKey::PlayTime => "playTime",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// Check that `value` decodes into this key's type and honours its range.
    pub fn validate(&self, value: &Value, defaults: &SettingsDefaults) -> BotResult<()> {
        match self {
            SettingKey::Prefix | SettingKey::StageAnnounceTemplate => {
                decode::<String>(*self, value).map(|_| ())
            }
            SettingKey::Lang => {
                let lang = decode::<String>(*self, value)?;
                if defaults.is_supported_language(&lang) {
                    Ok(())
                } else {
                    Err(BotError::Validation(format!(
                        "Language `{lang}` was not found"
                    )))
                }
            }
            SettingKey::DjRole | SettingKey::PlayTime => decode::<u64>(*self, value).map(|_| ()),
            SettingKey::QueueType => decode::<QueueMode>(*self, value).map(|_| ()),
            SettingKey::AlwaysOn
            | SettingKey::VoteDisabled
            | SettingKey::Controller
            | SettingKey::ControllerMsg
            | SettingKey::DuplicateTrack => decode::<bool>(*self, value).map(|_| ()),
            SettingKey::Volume => {
                let volume = decode::<i64>(*self, value)?;
                if (MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
                    Ok(())
                } else {
                    Err(BotError::Validation(format!(
                        "Volume must be between {MIN_VOLUME} and {MAX_VOLUME}, got {volume}"
                    )))
                }
            }
            SettingKey::DefaultController => {
                decode::<EmbedTemplateSet>(*self, value).map(|_| ())
            }
            SettingKey::MusicRequestChannel => {
                decode::<RequestChannel>(*self, value).map(|_| ())
            }
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode<T: DeserializeOwned>(key: SettingKey, value: &Value) -> BotResult<T> {
    T::deserialize(value)
        .map_err(|e| BotError::Validation(format!("`{key}` has an invalid value: {e}")))
}

/// A partial update: keys to assign and keys to remove. Assignment happens first,
/// so a key listed in both ends up removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    assign: BTreeMap<SettingKey, Value>,
    remove: BTreeSet<SettingKey>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: SettingKey, value: impl Into<Value>) -> Self {
        self.assign.insert(key, value.into());
        self
    }

    pub fn unset(mut self, key: SettingKey) -> Self {
        self.remove.insert(key);
        self
    }

    /// Assign `Some` values, remove the key for `None`.
    pub fn set_or_unset<V: Into<Value>>(self, key: SettingKey, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self.unset(key),
        }
    }

    pub fn assigned(&self) -> impl Iterator<Item = (&SettingKey, &Value)> {
        self.assign.iter()
    }

    pub fn removed(&self) -> impl Iterator<Item = &SettingKey> {
        self.remove.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.assign.is_empty() && self.remove.is_empty()
    }

    /// Validate every assigned value; a patch that fails here must not be written.
    pub fn validate(&self, defaults: &SettingsDefaults) -> BotResult<()> {
        for (key, value) in &self.assign {
            key.validate(value, defaults)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, document: &mut SettingsDocument) {
        for (key, value) in &self.assign {
            document.insert(key.as_str().to_string(), value.clone());
        }
        for key in &self.remove {
            document.remove(key.as_str());
        }
    }
}

/// Values used for keys a guild never set.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDefaults {
    pub prefix: String,
    pub lang: String,
    pub languages: Vec<String>,
    pub controller: EmbedTemplateSet,
}

impl SettingsDefaults {
    pub fn is_supported_language(&self, code: &str) -> bool {
        self.languages.iter().any(|lang| lang == code)
    }
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            prefix: "?".to_string(),
            lang: "EN".to_string(),
            languages: vec!["EN".to_string()],
            controller: EmbedTemplateSet::default(),
        }
    }
}

/// A guild's settings with defaults filled in for everything not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildSettings {
    pub prefix: String,
    pub lang: String,
    pub dj_role_id: Option<u64>,
    pub queue_mode: QueueMode,
    pub always_on: bool,
    pub vote_required: bool,
    pub volume: u8,
    pub controller_enabled: bool,
    pub controller_msg_enabled: bool,
    pub duplicate_tracks_allowed: bool,
    pub default_controller: EmbedTemplateSet,
    pub stage_announce_template: Option<String>,
    pub music_request_channel: Option<RequestChannel>,
    pub play_time_minutes: u64,
}

impl GuildSettings {
    pub fn defaults(defaults: &SettingsDefaults) -> Self {
        Self::from_document(&SettingsDocument::new(), defaults)
    }

    /// Merge a stored document with the defaults. Values that no longer decode (or a
    /// language that is no longer offered) fall back to the default instead of failing.
    pub fn from_document(document: &SettingsDocument, defaults: &SettingsDefaults) -> Self {
        let lang = read::<String>(document, SettingKey::Lang)
            .filter(|lang| {
                let supported = defaults.is_supported_language(lang);
                if !supported {
                    warn!("Stored language `{}` is no longer supported", lang);
                }
                supported
            })
            .unwrap_or_else(|| defaults.lang.clone());

        let volume = read::<i64>(document, SettingKey::Volume)
            .map(|v| v.clamp(MIN_VOLUME, MAX_VOLUME) as u8)
            .unwrap_or(DEFAULT_VOLUME);

        Self {
            prefix: read(document, SettingKey::Prefix).unwrap_or_else(|| defaults.prefix.clone()),
            lang,
            dj_role_id: read(document, SettingKey::DjRole),
            queue_mode: read(document, SettingKey::QueueType).unwrap_or_default(),
            always_on: read(document, SettingKey::AlwaysOn).unwrap_or(false),
            vote_required: !read(document, SettingKey::VoteDisabled).unwrap_or(false),
            volume,
            controller_enabled: read(document, SettingKey::Controller).unwrap_or(true),
            controller_msg_enabled: read(document, SettingKey::ControllerMsg).unwrap_or(true),
            duplicate_tracks_allowed: read(document, SettingKey::DuplicateTrack).unwrap_or(true),
            default_controller: read(document, SettingKey::DefaultController)
                .unwrap_or_else(|| defaults.controller.clone()),
            stage_announce_template: read(document, SettingKey::StageAnnounceTemplate),
            music_request_channel: read(document, SettingKey::MusicRequestChannel),
            play_time_minutes: read(document, SettingKey::PlayTime).unwrap_or(0),
        }
    }
}

fn read<T: DeserializeOwned>(document: &SettingsDocument, key: SettingKey) -> Option<T> {
    let value = document.get(key.as_str())?;
    if value.is_null() {
        return None;
    }
    match T::deserialize(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring stored `{}`: {}", key, e);
            None
        }
    }
}
