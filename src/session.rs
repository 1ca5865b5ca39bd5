//! Browser session state for the admin area.
//!
//! A [`Session`] is the per-request handle: plain key/value data, one-shot
//! flash messages and the CSRF tokens minted for it. Handlers receive it as
//! `&mut Session` and never reach for a global. [`SessionStore`] keeps the
//! sessions between requests, keyed by the session cookie, and expires them
//! after a period of inactivity.

use crate::auth::csrf::CsrfToken;
use crate::config;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Session key holding the login flag.
pub const LOGGED_IN_KEY: &str = "logged_in";

/// Flash type used for user-visible validation errors.
pub const FLASH_ERROR: &str = "error";

/// Data belonging to one browser session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
  data: HashMap<String, Value>,
  flash: HashMap<String, Vec<String>>,
  tokens: HashMap<String, CsrfToken>,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.data.get(key)
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.data.insert(key.into(), value.into());
  }

  pub fn contains(&self, key: &str) -> bool {
    self.data.contains_key(key)
  }

  /// Whether `key` holds a value that counts as "set": `true`, a non-zero
  /// number, or a non-empty string, array or object.
  pub fn is_truthy(&self, key: &str) -> bool {
    match self.data.get(key) {
      None | Some(Value::Null) => false,
      Some(Value::Bool(b)) => *b,
      Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
      Some(Value::String(s)) => !s.is_empty() && s != "0",
      Some(Value::Array(a)) => !a.is_empty(),
      Some(Value::Object(o)) => !o.is_empty(),
    }
  }

  pub fn logged_in(&self) -> bool {
    self.is_truthy(LOGGED_IN_KEY)
  }

  /// Drop everything: data, pending flash messages and CSRF tokens.
  pub fn clear(&mut self) {
    self.data.clear();
    self.flash.clear();
    self.tokens.clear();
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty() && self.flash.is_empty() && self.tokens.is_empty()
  }

  /// Queue a flash message for the next render.
  pub fn flash_add(&mut self, kind: &str, message: impl Into<String>) {
    self.flash.entry(kind.to_string()).or_default().push(message.into());
  }

  pub fn flash_has(&self, kind: &str) -> bool {
    self.flash.get(kind).is_some_and(|messages| !messages.is_empty())
  }

  /// Read and clear all queued messages of one kind.
  pub fn flash_take(&mut self, kind: &str) -> Vec<String> {
    self.flash.remove(kind).unwrap_or_default()
  }

  /// Look at queued messages without consuming them.
  pub fn flash_peek(&self, kind: &str) -> &[String] {
    self.flash.get(kind).map(Vec::as_slice).unwrap_or(&[])
  }

  pub(crate) fn set_token(&mut self, namespace: &str, token: CsrfToken) {
    self.tokens.insert(namespace.to_string(), token);
  }

  pub(crate) fn take_token(&mut self, namespace: &str) -> Option<CsrfToken> {
    self.tokens.remove(namespace)
  }
}

/// Session entry with last access time for expiration
struct SessionEntry {
  session: Session,
  last_access: DateTime<Utc>,
}

/// In-process session storage shared by all handlers.
#[derive(Clone)]
pub struct SessionStore {
  sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
  expiry: Duration,
}

impl SessionStore {
  pub fn new(expiry_hours: i64) -> Self {
    Self {
      sessions: Arc::new(Mutex::new(HashMap::new())),
      expiry: Duration::hours(expiry_hours),
    }
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
    // A panic mid-request leaves the map itself intact.
    self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Fetch a copy of the session for `session_id`, or an empty one if the id
  /// is unknown or has expired.
  pub fn load(&self, session_id: &str) -> Session {
    let mut sessions = self.lock();

    // Clean up expired sessions occasionally
    if rand::random::<u8>() < config::SESSION_CLEANUP_THRESHOLD {
      self.cleanup_expired(&mut sessions);
    }

    let now = Utc::now();
    if let Some(entry) = sessions.get_mut(session_id) {
      if entry.last_access > now - self.expiry {
        entry.last_access = now;
        return entry.session.clone();
      }
      tracing::debug!("Session expired, starting a new one");
      sessions.remove(session_id);
    }
    Session::new()
  }

  /// Store the session back under `session_id`.
  pub fn save(&self, session_id: &str, session: Session) {
    self.lock().insert(
      session_id.to_string(),
      SessionEntry {
        session,
        last_access: Utc::now(),
      },
    );
  }

  pub fn remove(&self, session_id: &str) {
    self.lock().remove(session_id);
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.lock().len()
  }

  #[cfg(test)]
  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn cleanup_expired(&self, sessions: &mut HashMap<String, SessionEntry>) {
    let cutoff = Utc::now() - self.expiry;
    sessions.retain(|_, entry| entry.last_access > cutoff);
  }
}

/// Generate a new session ID
pub fn generate_session_id() -> String {
  use rand::Rng;
  use rand::distr::Alphanumeric;

  rand::rng()
    .sample_iter(&Alphanumeric)
    .take(48)
    .map(char::from)
    .collect()
}
