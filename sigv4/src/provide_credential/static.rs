use crate::Credential;
use async_trait::async_trait;
use awsauth_core::{Context, ProvideCredential, Result};

/// StaticCredentialProvider returns a fixed credential.
///
/// Useful for testing and for callers that manage credentials themselves.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl StaticCredentialProvider {
    /// Create a provider with the given access key and secret key.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
        }
    }

    /// Attach a session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.session_token = Some(token.to_string());
        self
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(Credential {
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            session_token: self.session_token.clone(),
            expires_in: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticCredentialProvider::new("ak", "sk").with_session_token("st");
        let cred = provider
            .provide_credential(&Context::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cred.access_key_id, "ak");
        assert_eq!(cred.secret_access_key, "sk");
        assert_eq!(cred.session_token.as_deref(), Some("st"));
    }
}
