use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

pub const APPLICATION_DIR: &str = "focuslog";

/// Default directory for records and logs. On Linux `$XDG_STATE_HOME/focuslog` or
/// `$HOME/.local/state/focuslog`, on Windows `%APPDATA%\focuslog`.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = default_base_path()?;
    path.push(APPLICATION_DIR);

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(windows)]
fn default_base_path() -> Result<PathBuf> {
    env::var("APPDATA")
        .map(PathBuf::from)
        .context("APPDATA should be present on Windows")
}

#[cfg(not(windows))]
fn default_base_path() -> Result<PathBuf> {
    env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/state");
                path
            })
        })
        .context("Couldn't find neither XDG_STATE_HOME nor HOME")
}
