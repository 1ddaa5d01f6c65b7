use std::collections::HashSet;
use std::fmt;

use crate::utils::mask_key;

/// Environment variable read for API keys when nothing else is configured
pub const DEFAULT_KEYS_ENV: &str = "TRANSCRIPT_API_KEYS";

/// A shared-secret token accepted by the service
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked rendering, safe for logs
    pub fn masked(&self) -> String {
        mask_key(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

/// The read-only set of accepted API keys
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashSet<ApiKey>,
}

impl KeySet {
    /// Build from an iterator of raw keys. Entries are trimmed and blanks dropped.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(ApiKey)
            .collect();

        Self { keys }
    }

    /// Parse a comma-separated list such as `"key-a, key-b"`
    pub fn from_delimited(value: &str) -> Self {
        Self::from_keys(value.split(','))
    }

    /// Look up a candidate, returning the stored key on an exact match
    pub fn get(&self, candidate: &str) -> Option<&ApiKey> {
        self.keys.get(&ApiKey(candidate.to_string()))
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.get(candidate).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Where the key set is read from at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Fixed list, for development
    Static(Vec<String>),
    /// One environment variable holding a comma-separated list
    Env(String),
}

impl KeySource {
    /// Prefer the environment variable when it is set, otherwise fall back to the static list
    pub fn resolve(env_var: &str, fallback: &[String]) -> Self {
        if std::env::var_os(env_var).is_some() {
            KeySource::Env(env_var.to_string())
        } else {
            KeySource::Static(fallback.to_vec())
        }
    }

    fn describe(&self) -> String {
        match self {
            KeySource::Static(_) => "static key list".to_string(),
            KeySource::Env(var) => format!("environment variable {}", var),
        }
    }
}

/// Load the key set once at startup.
///
/// A missing or empty source is not an error: the returned set is empty and every
/// authorization check against it fails closed.
pub fn load_keys(source: &KeySource) -> KeySet {
    let keys = match source {
        KeySource::Static(list) => KeySet::from_keys(list),
        KeySource::Env(var) => match std::env::var(var) {
            Ok(value) => KeySet::from_delimited(&value),
            Err(_) => KeySet::default(),
        },
    };

    if keys.is_empty() {
        tracing::warn!(
            "No API keys loaded from {}; every transcript request will be rejected",
            source.describe()
        );
    } else {
        tracing::info!("Loaded {} API key(s) from {}", keys.len(), source.describe());
    }

    keys
}
