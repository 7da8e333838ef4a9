use crate::provide_credential::{
    EnvCredentialProvider, IMDSCredentialProvider, ProfileCredentialProvider,
    ProvideCredentialChain,
};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::{Context, Error, ProvideCredential, Result};

/// DefaultCredentialProvider resolves credentials the way AWS SDKs do by
/// default:
///
/// 1. Environment variables
/// 2. Shared config and credentials files
/// 3. EC2 instance metadata service
///
/// Exhausting all sources is an error: callers of the default chain
/// expect to be authenticated. Use a specific provider (or none at all)
/// for anonymous access.
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a provider with the standard resolution order.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ProfileCredentialProvider::new())
            .push(IMDSCredentialProvider::new());
        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        match self.chain.provide_credential(ctx).await? {
            Some(cred) => Ok(Some(cred)),
            None => Err(Error::credential_denied(
                "no credentials found in environment, shared config or instance metadata",
            )
            .with_context("hint: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        AWS_ACCESS_KEY_ID, AWS_EC2_METADATA_DISABLED, AWS_SECRET_ACCESS_KEY,
    };
    use awsauth_core::StaticEnv;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_env_first() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([
                (AWS_ACCESS_KEY_ID.to_string(), "env_ak".to_string()),
                (AWS_SECRET_ACCESS_KEY.to_string(), "env_sk".to_string()),
            ]),
        });

        let cred = DefaultCredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cred.access_key_id, "env_ak");
    }

    #[tokio::test]
    async fn test_nothing_configured() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(
                AWS_EC2_METADATA_DISABLED.to_string(),
                "true".to_string(),
            )]),
        });

        let err = DefaultCredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), awsauth_core::ErrorKind::CredentialDenied);
    }
}
