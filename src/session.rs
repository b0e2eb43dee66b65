//! Persisted login state.
//!
//! The session is two entries in a small key-value store: `auth_token` set to
//! `"true"` and `username`. Either both are present or neither is.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, error, info};

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USERNAME_KEY: &str = "username";

pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().ok()?;
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| anyhow::anyhow!("Store lock poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| anyhow::anyhow!("Store lock poisoned"))?;
        items.remove(key);
        Ok(())
    }
}

/// JSON object on disk, read once on open and rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    items: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<Self> {
        let items = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str::<HashMap<String, String>>(&content)
                .with_context(|| format!("Corrupted store file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        debug!("Opened store {} with {} items", path.display(), items.len());
        Ok(Self {
            path: path.to_path_buf(),
            items: RwLock::new(items),
        })
    }

    /// Memory only changes once the file has been written.
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let mut items = self
            .items
            .write()
            .map_err(|_| anyhow::anyhow!("Store lock poisoned"))?;
        let mut next = items.clone();
        f(&mut next);
        let content = serde_json::to_string_pretty(&next)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        *items = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().ok()?;
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.update(|items| {
            items.remove(key);
        })
    }
}

/// Login state shared by every screen, with change notifications.
pub struct SessionStore {
    store: Box<dyn KeyValueStore>,
    authenticated: watch::Sender<bool>,
}

pub type Session = Arc<SessionStore>;

impl SessionStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        let logged_in = has_token(store.as_ref());
        let (authenticated, _) = watch::channel(logged_in);
        Self {
            store,
            authenticated,
        }
    }

    pub fn in_memory() -> Session {
        Arc::new(Self::new(Box::new(MemoryStore::new())))
    }

    pub fn open(path: &Path) -> Result<Session> {
        Ok(Arc::new(Self::new(Box::new(FileStore::open(path)?))))
    }

    /// Accepts any credentials.
    pub fn login(&self, username: &str, _password: &str) -> Result<bool> {
        self.store.set_item(AUTH_TOKEN_KEY, "true")?;
        if let Err(err) = self.store.set_item(USERNAME_KEY, username) {
            if let Err(rollback) = self.store.remove_item(AUTH_TOKEN_KEY) {
                error!("Failed to roll back login: {:#}", rollback);
            }
            return Err(err);
        }
        self.authenticated.send_replace(true);
        info!("Logged in as {}", username);
        Ok(true)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove_item(AUTH_TOKEN_KEY)?;
        if let Err(err) = self.store.remove_item(USERNAME_KEY) {
            if let Err(rollback) = self.store.set_item(AUTH_TOKEN_KEY, "true") {
                error!("Failed to roll back logout: {:#}", rollback);
            }
            return Err(err);
        }
        self.authenticated.send_replace(false);
        info!("Logged out");
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        has_token(self.store.as_ref())
    }

    /// Empty when logged out, even if a stale name is still stored.
    pub fn username(&self) -> String {
        if !self.is_logged_in() {
            return String::new();
        }
        self.store.get_item(USERNAME_KEY).unwrap_or_default()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }
}

fn has_token(store: &dyn KeyValueStore) -> bool {
    store.get_item(AUTH_TOKEN_KEY).as_deref() == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_login_logout() {
        let session = SessionStore::in_memory();
        assert!(!session.is_logged_in());
        assert_eq!(session.username(), "");

        assert!(session.login("alice", "whatever").unwrap());
        assert!(session.is_logged_in());
        assert_eq!(session.username(), "alice");

        session.logout().unwrap();
        assert!(!session.is_logged_in());
        assert_eq!(session.username(), "");
    }

    #[test]
    fn test_login_ignores_password() {
        let session = SessionStore::in_memory();
        assert!(session.login("bob", "").unwrap());
        assert_eq!(session.username(), "bob");
    }

    #[test]
    fn test_token_must_be_true() {
        let store = MemoryStore::new();
        store.set_item(AUTH_TOKEN_KEY, "yes").unwrap();
        store.set_item(USERNAME_KEY, "carol").unwrap();
        let session = SessionStore::new(Box::new(store));
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_subscribers_notified() {
        let session = SessionStore::in_memory();
        let mut rx = session.subscribe();
        assert!(!*rx.borrow());

        session.login("dave", "pw").unwrap();
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());

        session.logout().unwrap();
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn test_file_store_persists() {
        let path = temp_path("session");
        {
            let session = SessionStore::open(&path).unwrap();
            session.login("erin", "pw").unwrap();
        }
        {
            let session = SessionStore::open(&path).unwrap();
            assert!(session.is_logged_in());
            assert_eq!(session.username(), "erin");
            assert!(*session.subscribe().borrow());

            session.logout().unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let items: HashMap<String, String> = serde_json::from_str(&content).unwrap();
        assert!(items.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    /// Memory store whose writes to one key always fail.
    struct FailingKeyStore {
        inner: MemoryStore,
        key: &'static str,
    }

    impl KeyValueStore for FailingKeyStore {
        fn get_item(&self, key: &str) -> Option<String> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            if key == self.key {
                anyhow::bail!("cannot write {}", key);
            }
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<()> {
            if key == self.key {
                anyhow::bail!("cannot remove {}", key);
            }
            self.inner.remove_item(key)
        }
    }

    #[test]
    fn test_failed_login_leaves_no_session() {
        let session = SessionStore::new(Box::new(FailingKeyStore {
            inner: MemoryStore::new(),
            key: USERNAME_KEY,
        }));
        let rx = session.subscribe();

        assert!(session.login("alice", "pw").is_err());
        assert!(!session.is_logged_in());
        assert_eq!(session.username(), "");
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_failed_logout_keeps_session() {
        let inner = MemoryStore::new();
        inner.set_item(AUTH_TOKEN_KEY, "true").unwrap();
        inner.set_item(USERNAME_KEY, "frank").unwrap();
        let session = SessionStore::new(Box::new(FailingKeyStore {
            inner,
            key: USERNAME_KEY,
        }));
        let rx = session.subscribe();

        assert!(session.logout().is_err());
        assert!(session.is_logged_in());
        assert_eq!(session.username(), "frank");
        assert!(*rx.borrow());
    }

    #[test]
    fn test_stale_username_hidden_when_logged_out() {
        let store = MemoryStore::new();
        store.set_item(USERNAME_KEY, "grace").unwrap();
        let session = SessionStore::new(Box::new(store));
        assert_eq!(session.username(), "");
    }

    #[test]
    fn test_unwritable_file_store_stays_logged_out() {
        let dir = std::env::temp_dir().join(format!("missing-{}", uuid::Uuid::new_v4()));
        let session = SessionStore::open(&dir.join("store.json")).unwrap();

        assert!(session.login("alice", "pw").is_err());
        assert!(!session.is_logged_in());
        assert_eq!(session.username(), "");
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let path = temp_path("garbage");
        std::fs::write(&path, "not json").unwrap();
        assert!(FileStore::open(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
