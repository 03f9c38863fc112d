//! SQLite-backed store for guild settings documents.
//!
//! Each guild owns one JSON document holding only the keys an administrator set.
//! Reads merge the document with [`SettingsDefaults`]; writes apply a
//! [`SettingsPatch`] inside an immediate transaction so two patches to the same guild
//! never interleave.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serenity::model::id::GuildId;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{GuildSettings, SettingsDefaults, SettingsDocument, SettingsPatch};
use crate::utils::error::{BotError, BotResult};

/// Persistent per-guild settings with read-time defaults.
pub struct SettingsStore {
    conn: Mutex<Connection>,
    defaults: SettingsDefaults,
}

impl SettingsStore {
    /// Open (or create) the settings database at `path`.
    pub fn open(path: impl AsRef<Path>, defaults: SettingsDefaults) -> BotResult<Self> {
        let path = path.as_ref();
        info!("Opening settings database at {}", path.display());
        Self::from_connection(Connection::open(path)?, defaults)
    }

    /// A throwaway store, used by tests and dry runs.
    pub fn open_in_memory(defaults: SettingsDefaults) -> BotResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, defaults)
    }

    fn from_connection(conn: Connection, defaults: SettingsDefaults) -> BotResult<Self> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            defaults,
        })
    }

    pub fn defaults(&self) -> &SettingsDefaults {
        &self.defaults
    }

    fn lock(&self) -> BotResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BotError::BackendUnavailable("settings connection poisoned".into()))
    }

    /// The guild's settings merged with defaults. A guild with nothing stored gets
    /// the defaults; only backend failures are errors.
    pub fn get(&self, guild_id: GuildId) -> BotResult<GuildSettings> {
        let document = self.raw(guild_id)?;
        Ok(GuildSettings::from_document(&document, &self.defaults))
    }

    /// The stored document without defaults.
    pub fn raw(&self, guild_id: GuildId) -> BotResult<SettingsDocument> {
        let conn = self.lock()?;
        read_document(&conn, guild_id)
    }

    /// Apply `patch` atomically and return the resulting settings.
    ///
    /// The patch is validated before anything is written; an invalid patch leaves the
    /// stored document untouched.
    pub fn update(&self, guild_id: GuildId, patch: &SettingsPatch) -> BotResult<GuildSettings> {
        patch.validate(&self.defaults)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut document = read_document(&tx, guild_id)?;
        patch.apply_to(&mut document);

        if document.is_empty() {
            tx.execute(
                "DELETE FROM guild_settings WHERE guild_id = ?1",
                params![guild_id.get() as i64],
            )?;
        } else {
            tx.execute(
                "INSERT INTO guild_settings (guild_id, document) VALUES (?1, ?2)
                 ON CONFLICT(guild_id) DO UPDATE SET document = excluded.document",
                params![guild_id.get() as i64, serde_json::to_string(&document)?],
            )?;
        }
        tx.commit()?;

        debug!(
            "Updated settings for guild {}: set {:?}, unset {:?}",
            guild_id,
            patch.assigned().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            patch.removed().map(|k| k.as_str()).collect::<Vec<_>>()
        );

        Ok(GuildSettings::from_document(&document, &self.defaults))
    }

    /// Drop everything stored for a guild. Returns whether a document existed.
    pub fn delete(&self, guild_id: GuildId) -> BotResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM guild_settings WHERE guild_id = ?1",
            params![guild_id.get() as i64],
        )?;
        Ok(removed > 0)
    }

    /// Number of guilds with at least one stored setting.
    pub fn guild_count(&self) -> BotResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM guild_settings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS guild_settings (
            guild_id INTEGER PRIMARY KEY,
            document TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

fn read_document(conn: &Connection, guild_id: GuildId) -> BotResult<SettingsDocument> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT document FROM guild_settings WHERE guild_id = ?1",
            params![guild_id.get() as i64],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(SettingsDocument::new()),
    }
}
