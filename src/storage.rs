//! The in-progress session survives between invocations as a JSON snapshot.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{Result, session::CurrentTraining};

const SESSION_FILE: &str = "session.json";

pub fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SESSION_FILE)
}

/// Load the snapshot at `path`. No file means no session.
pub fn load_session(path: &Path) -> Result<CurrentTraining> {
    if !path.exists() {
        return Ok(CurrentTraining::new());
    }
    let content = fs::read_to_string(path)?;
    let session: CurrentTraining = serde_json::from_str(&content)?;
    debug!(path = %path.display(), active = session.is_active(), "session snapshot loaded");
    Ok(session)
}

/// Persist `session`. An idle session removes the snapshot.
pub fn save_session(path: &Path, session: &CurrentTraining) -> Result<()> {
    if !session.is_active() {
        return clear_session(path);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(session)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "session snapshot saved");
    Ok(())
}

pub fn clear_session(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not remove session snapshot");
            Err(e.into())
        }
    }
}
