use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::workflows::onboarding::{AuthGrant, Role, UserProfile};

/// An authenticated actor as the client remembers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub user: UserProfile,
}

impl From<AuthGrant> for Session {
    fn from(grant: AuthGrant) -> Self {
        Self {
            token: grant.token,
            role: grant.user.role,
            user: grant.user,
        }
    }
}

/// The whole persisted value. Token, role and profile only ever change together.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Empty,
    Active(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Empty => None,
            SessionState::Active(session) => Some(session),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.session().map(|session| session.token.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.session().map(|session| session.role)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("session lock poisoned")]
    Poisoned,
}

/// Client-local session persistence. Every method reads or writes the state
/// as one value; `clear` is a single write of [`SessionState::Empty`].
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Result<SessionState, SessionStoreError>;
    fn set(&self, session: Session) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;

    /// Clear only while the stored session still carries `token`. Returns
    /// whether anything was cleared.
    fn clear_if(&self, token: &str) -> Result<bool, SessionStoreError>;

    fn token(&self) -> Result<Option<String>, SessionStoreError> {
        Ok(self.get()?.token().map(str::to_string))
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    state: Arc<RwLock<SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, state: SessionState) -> Result<(), SessionStoreError> {
        *self.state.write().map_err(|_| SessionStoreError::Poisoned)? = state;
        Ok(())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<SessionState, SessionStoreError> {
        self.state
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SessionStoreError::Poisoned)
    }

    fn set(&self, session: Session) -> Result<(), SessionStoreError> {
        self.write(SessionState::Active(session))
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        self.write(SessionState::Empty)
    }

    fn clear_if(&self, token: &str) -> Result<bool, SessionStoreError> {
        let mut guard = self.state.write().map_err(|_| SessionStoreError::Poisoned)?;
        if guard.token() != Some(token) {
            return Ok(false);
        }
        *guard = SessionState::Empty;
        Ok(true)
    }
}

/// JSON document on disk, replaced atomically through a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store for `<dir>/<name>.json`; the directory is created on demand.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{name}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, state: &SessionState) -> Result<(), SessionStoreError> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)?;

        let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut staged, state)?;
        staged.flush()?;
        staged
            .persist(&self.path)
            .map_err(|err| SessionStoreError::Io(err.error))?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<SessionState, SessionStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SessionState::Empty),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, session: Session) -> Result<(), SessionStoreError> {
        self.write(&SessionState::Active(session))
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        self.write(&SessionState::Empty)
    }

    // Callers serialise writers; the file itself has no lock.
    fn clear_if(&self, token: &str) -> Result<bool, SessionStoreError> {
        if self.get()?.token() != Some(token) {
            return Ok(false);
        }
        self.write(&SessionState::Empty)?;
        Ok(true)
    }
}
