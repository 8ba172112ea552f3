use std::{
    fmt::Debug,
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::PoisonError,
};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use crate::{Error, Locked};

/// Key the pkce verifier is stored under
pub static VERIFIER_KEY: &str = "verifier";

/// Single slot store that keeps the pkce verifier alive between starting the login and
/// receiving the authorization code.
pub trait VerifierStore: Debug + Send + Sync {
    fn load(&self) -> Result<Option<String>, Error>;
    /// Overwrites whatever verifier was stored before
    fn save(&self, verifier: &str) -> Result<(), Error>;
    /// Removing an already empty slot is not an error
    fn clear(&self) -> Result<(), Error>;
}

/// Verifier kept in a file named [`VERIFIER_KEY`] inside a directory, so a login can be
/// completed by another process than the one that started it.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(VERIFIER_KEY),
        }
    }
}

impl VerifierStore for FileStore {
    fn load(&self) -> Result<Option<String>, Error> {
        match std::fs::read_to_string(&self.path) {
            Ok(verifier) if verifier.trim().is_empty() => Ok(None),
            Ok(verifier) => Ok(Some(verifier.trim().to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, verifier: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path)?;
        // `mode` only applies to newly created files
        #[cfg(unix)]
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        file.write_all(verifier.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// Verifier kept only for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Locked<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerifierStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, Error> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, verifier: &str) -> Result<(), Error> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(verifier.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_store_round_trip_and_idempotent_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.load().unwrap(), None);
        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_keeps_verifier_private() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        std::fs::write(&store.path, "stale").unwrap();
        std::fs::set_permissions(&store.path, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.save("verifier").unwrap();
        let mode = std::fs::metadata(&store.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap().as_deref(), Some("verifier"));
    }

    #[test]
    fn memory_store_is_single_slot() {
        let store = MemoryStore::new();
        store.save("a").unwrap();
        store.save("b").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("b"));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
