//! Short-lived delivery credentials.
//!
//! Credentials come from an external role-assumption step. They are handed to
//! the notify step by reference and dropped when the run ends; nothing here
//! serializes or caches them.

use async_trait::async_trait;

use crate::error::{ScrapeError, ScrapeResult};

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Access key, secret key and session token of an assumed role.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

impl SessionCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Source of delivery credentials, consulted once per run.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> ScrapeResult<SessionCredentials>;
}

/// Reads the standard `AWS_*` variables exported by the scheduler's
/// role-assumption task.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn credentials(&self) -> ScrapeResult<SessionCredentials> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ScrapeError::Credentials(format!("{name} is not set")))
        };
        Ok(SessionCredentials::new(
            read(ENV_ACCESS_KEY_ID)?,
            read(ENV_SECRET_ACCESS_KEY)?,
            read(ENV_SESSION_TOKEN)?,
        ))
    }
}

/// Hands out a fixed triple. Used for tests and local runs.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider(pub SessionCredentials);

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credentials(&self) -> ScrapeResult<SessionCredentials> {
        Ok(self.0.clone())
    }
}
