use crate::error::{CompareError, Result};

/// Upstream account credentials.
///
/// Part of the fetch cache key: switching accounts refetches everything.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads `CG_USERNAME` and `CG_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let get = |key: &str| {
            std::env::var(key).map_err(|_| CompareError::Config(format!("{key} must be set")))
        };
        Ok(Self::new(get("CG_USERNAME")?, get("CG_PASSWORD")?))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
