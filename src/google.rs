// src/google.rs
use std::path::Path;
use thiserror::Error;
use tracing::info;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator};

#[derive(Error, Debug)]
pub enum GoogleAuthError {
    #[error("Failed to read service account key: {0}")]
    KeyFile(#[source] std::io::Error),

    #[error("Failed to build authenticator: {0}")]
    Builder(#[source] std::io::Error),

    #[error("Token request failed: {0}")]
    Token(#[from] yup_oauth2::Error),

    #[error("Authenticator returned a token without an access token")]
    EmptyToken,
}

/// Service-account token source shared by the Sheets and Gmail clients.
#[derive(Clone)]
pub struct GoogleAuth {
    inner: DefaultAuthenticator,
}

impl GoogleAuth {
    /// Build an authenticator from a service account JSON key.
    ///
    /// `subject` enables domain-wide delegation; Gmail sends require it
    /// (the service account impersonates the sender), Sheets does not.
    pub async fn from_service_account_file(
        path: &Path,
        subject: Option<&str>,
    ) -> Result<Self, GoogleAuthError> {
        let key = read_service_account_key(path)
            .await
            .map_err(GoogleAuthError::KeyFile)?;

        let mut builder = ServiceAccountAuthenticator::builder(key);
        if let Some(subject) = subject {
            builder = builder.subject(subject);
        }
        let inner = builder.build().await.map_err(GoogleAuthError::Builder)?;

        info!(
            "Initialized Google service account auth from {}",
            path.display()
        );
        Ok(Self { inner })
    }

    /// Fetch a bearer token for the given scopes. Tokens are cached and
    /// refreshed by the authenticator internally.
    pub async fn bearer_token(&self, scopes: &[&str]) -> Result<String, GoogleAuthError> {
        let token = self.inner.token(scopes).await?;
        token
            .token()
            .map(str::to_string)
            .ok_or(GoogleAuthError::EmptyToken)
    }
}
