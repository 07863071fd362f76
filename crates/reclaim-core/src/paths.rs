use dirs::home_dir;
use std::path::PathBuf;

/// Returns the engine's state directory, or None if the user's home cannot be resolved.
pub fn try_reclaim_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("RECLAIM_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".reclaim"))
}

/// The user's home directory, root of every well-known cleanup target.
pub fn user_home() -> Option<PathBuf> {
    home_dir()
}

/// Config path: ~/.reclaim/config.toml
pub fn config_path() -> Option<PathBuf> {
    try_reclaim_home().map(|h| h.join("config.toml"))
}

/// Undo journal path: ~/.reclaim/undo.json
pub fn journal_path() -> Option<PathBuf> {
    try_reclaim_home().map(|h| h.join("undo.json"))
}

/// Platform trash location.
///
/// `~/.Trash` on macOS, `$XDG_DATA_HOME/Trash` elsewhere.
pub fn default_trash_root() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        home_dir().map(|h| h.join(".Trash"))
    } else {
        dirs::data_dir().map(|d| d.join("Trash"))
    }
}
