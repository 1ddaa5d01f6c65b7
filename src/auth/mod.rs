pub mod keys;

pub use keys::{load_keys, ApiKey, KeySet, KeySource, DEFAULT_KEYS_ENV};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Query parameter carrying the API key
pub const API_KEY_QUERY: &str = "api_key";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid or missing API Key. Provide it in 'X-API-Key' header or 'api_key' query parameter.")]
    Unauthorized,
}

/// Check the header channel, then the query channel, against `keys`.
pub fn authorize(
    header_value: Option<&str>,
    query_value: Option<&str>,
    keys: &KeySet,
) -> Result<ApiKey, AuthError> {
    [header_value, query_value]
        .into_iter()
        .flatten()
        .find_map(|candidate| keys.get(candidate))
        .cloned()
        .ok_or(AuthError::Unauthorized)
}

/// Admission gate built once from the startup key set
#[derive(Debug, Clone)]
pub struct Authorizer {
    keys: KeySet,
}

impl Authorizer {
    pub fn new(keys: KeySet) -> Self {
        Self { keys }
    }

    pub fn authorize(
        &self,
        header_value: Option<&str>,
        query_value: Option<&str>,
    ) -> Result<ApiKey, AuthError> {
        let result = authorize(header_value, query_value, &self.keys);

        match &result {
            Ok(key) => tracing::debug!("API key used: {}", key.masked()),
            Err(_) => tracing::debug!(
                header = header_value.is_some(),
                query = query_value.is_some(),
                "Rejected request without a valid API key"
            ),
        }

        result
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}
