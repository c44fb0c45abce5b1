//! Session token carrier.
//!
//! A token obtained at login lives in two places: a durable [`TokenStore`]
//! that survives restarts, and the in-memory [`Session`] that callers consult
//! before every gateway call. Logout clears both and tells nobody upstream;
//! the token stays valid on the server until it expires on its own.
//!
//! [`Session::rehydrate`] is the only way to build a session, so nothing can
//! act on behalf of the user before the durable store has been read.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::SessionError;

/// Durable storage for a single session token.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing store cannot be read.
    fn load(&self) -> Result<Option<String>, SessionError>;

    /// Persist `token`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing store cannot be written.
    fn save(&self, token: &str) -> Result<(), SessionError>;

    /// Remove the stored token. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing store cannot be modified.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Token kept in one file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_owned()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| self.io_err(e))?;
        // `mode` only applies on create; tighten an existing file before writing.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_err(e))?;
        }
        file.write_all(token.as_bytes())
            .map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

/// Token kept in process memory. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token`, as if a previous run had logged in.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        let slot = self.slot.lock().map_err(|_| SessionError::Poisoned)?;
        Ok(slot.clone())
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        let mut slot = self.slot.lock().map_err(|_| SessionError::Poisoned)?;
        *slot = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut slot = self.slot.lock().map_err(|_| SessionError::Poisoned)?;
        *slot = None;
        Ok(())
    }
}

/// The caller's session: the token (if any) plus the store backing it.
pub struct Session<S: TokenStore> {
    store: S,
    token: Option<String>,
}

impl<S: TokenStore> Session<S> {
    /// Build a session from whatever the durable store holds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the store cannot be read.
    pub fn rehydrate(store: S) -> Result<Self, SessionError> {
        let token = store.load()?;
        debug!(authenticated = token.is_some(), "session rehydrated");
        Ok(Self { store, token })
    }

    /// Record a freshly issued token in the durable store and in memory.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the store cannot be written; the in-memory
    /// state is left unchanged in that case.
    pub fn login(&mut self, token: impl Into<String>) -> Result<(), SessionError> {
        let token = token.into();
        self.store.save(&token)?;
        self.token = Some(token);
        debug!("session token stored");
        Ok(())
    }

    /// Forget the token locally. No upstream call is made.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the store cannot be cleared. The in-memory
    /// token is dropped regardless.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.token = None;
        self.store.clear()?;
        debug!("session cleared");
        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The token, or [`SessionError::NotAuthenticated`] when logged out.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] if no token is held.
    pub fn require(&self) -> Result<&str, SessionError> {
        self.token().ok_or(SessionError::NotAuthenticated)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: TokenStore> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn rehydrate_from_empty_store_is_logged_out() {
        let session = Session::rehydrate(MemoryTokenStore::new()).unwrap();
        assert!(!session.is_authenticated());
        assert!(matches!(
            session.require(),
            Err(SessionError::NotAuthenticated)
        ));
    }

    #[test]
    fn rehydrate_restores_previous_token() {
        let session = Session::rehydrate(MemoryTokenStore::with_token("s.abc")).unwrap();
        assert_eq!(session.token(), Some("s.abc"));
        assert_eq!(session.require().unwrap(), "s.abc");
    }

    #[test]
    fn login_writes_store_and_memory() {
        let mut session = Session::rehydrate(MemoryTokenStore::new()).unwrap();
        session.login("s.new").unwrap();
        assert_eq!(session.token(), Some("s.new"));
        assert_eq!(session.store().load().unwrap().as_deref(), Some("s.new"));
    }

    #[test]
    fn logout_clears_both() {
        let mut session = Session::rehydrate(MemoryTokenStore::with_token("s.abc")).unwrap();
        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.store().load().unwrap(), None);
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session::rehydrate(MemoryTokenStore::with_token("s.secret")).unwrap();
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("s.secret"));
        assert!(rendered.contains("authenticated: true"));
    }

    #[test]
    fn file_store_round_trip_survives_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token");

        let mut first = Session::rehydrate(FileTokenStore::new(&path)).unwrap();
        assert!(!first.is_authenticated());
        first.login("s.durable").unwrap();

        let second = Session::rehydrate(FileTokenStore::new(&path)).unwrap();
        assert_eq!(second.token(), Some("s.durable"));
    }

    #[test]
    fn file_store_ignores_surrounding_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "  s.abc\n").unwrap();
        assert_eq!(
            FileTokenStore::new(&path).load().unwrap().as_deref(),
            Some("s.abc")
        );

        fs::write(&path, "\n").unwrap();
        assert_eq!(FileTokenStore::new(&path).load().unwrap(), None);
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        store.clear().unwrap();
        store.save("s.abc").unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        store.save("s.abc").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_tightens_existing_loose_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "s.old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileTokenStore::new(&path);
        store.save("s.new").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap().as_deref(), Some("s.new"));
    }
}
