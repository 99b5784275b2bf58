use std::collections::HashMap;

/// External identity resolution. The real
/// implementation lives outside this system — it maps a session
/// cookie/bearer token to a principal id. This crate only depends on the
/// trait; callers in `ezekiel-server` own the concrete instance.
pub trait AuthCollaborator: Send + Sync {
    /// Resolve a principal id from raw bearer bytes, or `None` if the token
    /// does not resolve to an identity.
    fn id_from_token(&self, bearer: &[u8]) -> Option<String>;

    /// Name of the cookie the session/request cookie jar should be read
    /// from when no bearer header is present.
    fn cookie_name(&self) -> &str;
}

/// Minimal in-memory implementation so the crate is runnable and testable
/// standalone without a real auth service attached. The "cache" here is
/// simply the full identity map since there is no token expiry to account
/// for in a fixture.
pub struct StaticAuthCollaborator {
    tokens: HashMap<String, String>,
    cookie_name: String,
}

impl StaticAuthCollaborator {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            tokens: HashMap::new(),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn with_identity(mut self, token: impl Into<String>, principal: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), principal.into());
        self
    }
}

impl AuthCollaborator for StaticAuthCollaborator {
    fn id_from_token(&self, bearer: &[u8]) -> Option<String> {
        let token = std::str::from_utf8(bearer).ok()?;
        self.tokens.get(token).cloned()
    }

    fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}
