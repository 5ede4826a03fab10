// ── File-backed session persistence ──
//
// One JSON file per profile under the platform cache directory. Every
// failure degrades to "no session": a missing, unreadable or corrupt file
// just means the next request logs in again.

use std::io::Write;
use std::path::{Path, PathBuf};

use audtek_api::{Session, SessionPersistence};
use tracing::{debug, warn};

use crate::session_dir;

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for a named profile in the default session directory.
    pub fn for_profile(profile: &str) -> Self {
        Self::new(session_dir().join(format!("{profile}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, session: &Session) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(session).map_err(std::io::Error::other)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(&json)?;
        file.sync_all()
    }
}

impl SessionPersistence for FileSessionStore {
    fn load(&self) -> Option<Session> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read stored session");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt stored session");
                None
            }
        }
    }

    fn store(&self, session: &Session) {
        match self.write(session) {
            Ok(()) => debug!(path = %self.path.display(), "session saved"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to save session"),
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "stored session removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove stored session"),
        }
    }
}
