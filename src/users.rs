//! Configured admin users.
//!
//! Users live in a TOML file keyed by email:
//!
//! ```toml
//! [users."admin@example.com"]
//! password = "$argon2id$v=19$..."
//! ```
//!
//! The store is read-mostly. The only writes are [`CredentialStore::persist_user`]
//! and [`CredentialStore::persist_first_user`], used when the very first user is
//! created.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::StoreError;

/// A configured user. `password_hash` is `None` when the entry has no password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: Option<String>,
}

/// A freshly created user with a hashed password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub password_hash: String,
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        UserRecord {
            email: user.email,
            password_hash: Some(user.password_hash),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: BTreeMap<String, UserEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

/// Email -> user map, optionally backed by a file.
#[derive(Debug, Default)]
pub struct CredentialStore {
    users: RwLock<BTreeMap<String, UserRecord>>,
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// In-memory store with no backing file.
    pub fn in_memory(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: RwLock::new(
                users
                    .into_iter()
                    .map(|user| (user.email.clone(), user))
                    .collect(),
            ),
            path: None,
        }
    }

    /// Load users from `path`. A missing file yields an empty store that will
    /// be created on the first [`persist_user`](Self::persist_user).
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let users = match fs::read_to_string(&path) {
            Ok(contents) => parse_users(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No users file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Loaded {} admin user(s) from {}", users.len(), path.display());
        Ok(Self {
            users: RwLock::new(users),
            path: Some(path),
        })
    }

    pub fn find(&self, email: &str) -> Option<UserRecord> {
        self.users.read().ok()?.get(email).cloned()
    }

    /// All users, ordered by email.
    pub fn list(&self) -> Vec<UserRecord> {
        self.users
            .read()
            .map(|users| users.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().map(|users| users.is_empty()).unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    /// Add or replace a user and write the store back to its file, if any.
    pub fn persist_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        self.insert_and_write(&mut users, user)
    }

    /// Persist `user` only if the store is still empty, checked under the
    /// same write lock as the insert. Returns whether the user was saved.
    pub fn persist_first_user(&self, user: User) -> Result<bool, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        if !users.is_empty() {
            return Ok(false);
        }
        self.insert_and_write(&mut users, user)?;
        Ok(true)
    }

    fn insert_and_write(
        &self,
        users: &mut BTreeMap<String, UserRecord>,
        user: User,
    ) -> Result<(), StoreError> {
        let email = user.email.clone();
        users.insert(email.clone(), user.into());

        if let Some(path) = &self.path {
            if let Err(e) = write_users(path, users) {
                // Keep memory and disk in agreement
                users.remove(&email);
                return Err(e);
            }
            tracing::info!("Wrote {} admin user(s) to {}", users.len(), path.display());
        }
        Ok(())
    }
}

fn parse_users(contents: &str) -> Result<BTreeMap<String, UserRecord>, StoreError> {
    let file: UsersFile = toml::from_str(contents)?;
    Ok(file
        .users
        .into_iter()
        .map(|(email, entry)| {
            let record = UserRecord {
                email: email.clone(),
                password_hash: entry.password.filter(|p| !p.is_empty()),
            };
            (email, record)
        })
        .collect())
}

fn write_users(path: &Path, users: &BTreeMap<String, UserRecord>) -> Result<(), StoreError> {
    let file = UsersFile {
        users: users
            .values()
            .map(|user| {
                (
                    user.email.clone(),
                    UserEntry {
                        password: user.password_hash.clone(),
                    },
                )
            })
            .collect(),
    };
    let contents = toml::to_string_pretty(&file)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // Write then rename so a crash never leaves a half-written file
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
