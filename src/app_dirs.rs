use directories::ProjectDirs;
use std::path::PathBuf;

/// Resolves where the portal keeps its registry database.
pub struct AppDirs;

impl AppDirs {
    /// Default registry location: the XDG state dir when HOME is known,
    /// the platform-local data dir otherwise.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("invigil");
            Some(state_dir.join("portal.db"))
        } else {
            ProjectDirs::from("", "", "invigil")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("portal.db"))
        }
    }
}
