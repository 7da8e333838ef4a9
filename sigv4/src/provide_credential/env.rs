use crate::constants::{AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::{Context, ProvideCredential, Result};

/// EnvCredentialProvider loads credentials from environment variables.
///
/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
/// `AWS_SESSION_TOKEN`. Returns `None` when the key pair is not present.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let (Some(ak), Some(sk)) = (
            ctx.env_var(AWS_ACCESS_KEY_ID),
            ctx.env_var(AWS_SECRET_ACCESS_KEY),
        ) else {
            return Ok(None);
        };

        if ak.is_empty() || sk.is_empty() {
            return Ok(None);
        }

        Ok(Some(Credential {
            access_key_id: ak,
            secret_access_key: sk,
            session_token: ctx.env_var(AWS_SESSION_TOKEN),
            expires_in: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsauth_core::StaticEnv;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_env_provider() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([
                (AWS_ACCESS_KEY_ID.to_string(), "access_key_id".to_string()),
                (
                    AWS_SECRET_ACCESS_KEY.to_string(),
                    "secret_access_key".to_string(),
                ),
            ]),
        });

        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cred.access_key_id, "access_key_id");
        assert_eq!(cred.secret_access_key, "secret_access_key");
        assert!(cred.session_token.is_none());
    }

    #[tokio::test]
    async fn test_env_provider_without_vars() {
        let cred = EnvCredentialProvider::new()
            .provide_credential(&Context::new())
            .await
            .unwrap();
        assert!(cred.is_none());
    }
}
