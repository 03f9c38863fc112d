//! The session-resume file written on shutdown and read back at startup.

use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use super::error::BotResult;

/// Replace the session file with `snapshots`. A stale file is removed first so a
/// failed write never leaves the previous run's sessions behind.
pub fn save_sessions(path: &Path, snapshots: &[Value]) -> BotResult<()> {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed stale session file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let contents = serde_json::to_string_pretty(snapshots)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Sessions saved by the previous run; empty when there is no file.
pub fn load_sessions(path: &Path) -> BotResult<Vec<Value>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No session file at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let sessions: Vec<Value> = serde_json::from_str(&contents)?;
    info!("Loaded {} saved session(s)", sessions.len());
    Ok(sessions)
}
