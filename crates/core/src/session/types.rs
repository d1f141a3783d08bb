use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Key/value payload carried by a session.
pub type SessionValues = serde_json::Map<String, Value>;

/// Opaque session identifier used by persisted sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn flash_key(key: &str) -> String {
    format!("__flash_{key}__")
}

/// A per-client session.
///
/// Values set with [`Session::flash`] are readable once: the first
/// [`Session::get`] removes them, and the removal sticks if the session is
/// committed afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    id: Option<SessionId>,
    values: SessionValues,
}

impl Session {
    /// An empty session that has never been committed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a session from decoded storage.
    pub fn from_parts(id: Option<SessionId>, values: SessionValues) -> Self {
        Self { id, values }
    }

    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: SessionId) {
        self.id = Some(id);
    }

    /// Detach the session from its stored record. The next commit creates a
    /// new one.
    pub fn take_id(&mut self) -> Option<SessionId> {
        self.id.take()
    }

    pub fn values(&self) -> &SessionValues {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.values.contains_key(&flash_key(key))
    }

    /// Read a value, consuming it if it was flashed.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if let Some(value) = self.values.get(key) {
            return Some(value.clone());
        }
        self.values.remove(&flash_key(key))
    }

    /// Read and deserialize a value. Values of the wrong shape read as `None`.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Store a value that survives until it is read once.
    pub fn flash(&mut self, key: &str, value: Value) {
        self.values.insert(flash_key(key), value);
    }

    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}
