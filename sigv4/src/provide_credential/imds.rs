use crate::constants::AWS_EC2_METADATA_DISABLED;
use crate::imds::{EndpointMode, ImdsClient};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::time::{parse_rfc3339, Clock};
use awsauth_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// IMDSCredentialProvider loads role credentials from the EC2 metadata
/// service.
///
/// Setting the `AWS_EC2_METADATA_DISABLED` environment variable to `true`
/// makes this provider return `None` without touching the network.
#[derive(Debug, Default)]
pub struct IMDSCredentialProvider {
    endpoint: Option<String>,
    endpoint_mode: Option<EndpointMode>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    clock: Option<Arc<dyn Clock>>,

    client: OnceCell<ImdsClient>,
}

impl IMDSCredentialProvider {
    /// Create a new IMDSCredentialProvider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the metadata service endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Select the endpoint mode used when no endpoint is configured.
    pub fn with_endpoint_mode(mut self, mode: EndpointMode) -> Self {
        self.endpoint_mode = Some(mode);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the number of attempts for transient failures.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Replace the time source used by the metadata client.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    async fn client(&self, ctx: &Context) -> Result<&ImdsClient> {
        self.client
            .get_or_try_init(|| async {
                let mut builder = ImdsClient::builder();
                if let Some(ep) = &self.endpoint {
                    builder = builder.with_endpoint(ep);
                }
                if let Some(mode) = self.endpoint_mode {
                    builder = builder.with_endpoint_mode(mode);
                }
                if let Some(timeout) = self.timeout {
                    builder = builder.with_timeout(timeout);
                }
                if let Some(retries) = self.max_retries {
                    builder = builder.with_max_retries(retries);
                }
                if let Some(clock) = &self.clock {
                    builder = builder.with_shared_clock(clock.clone());
                }
                builder.build(ctx.clone()).await
            })
            .await
    }
}

#[async_trait]
impl ProvideCredential for IMDSCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let disabled = ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if disabled {
            return Ok(None);
        }

        let client = self.client(ctx).await?;

        let profile_name = client
            .get("/latest/meta-data/iam/security-credentials/")
            .await?;
        if profile_name.is_empty() {
            return Err(Error::config_invalid("no IAM role attached to EC2 instance")
                .with_context("hint: attach an IAM role to the instance"));
        }

        let content = client
            .get(&format!(
                "/latest/meta-data/iam/security-credentials/{profile_name}"
            ))
            .await?;

        let resp: Ec2MetadataIamSecurityCredentials =
            serde_json::from_str(&content).map_err(|e| {
                Error::unexpected("failed to parse metadata credentials response")
                    .with_source(e)
                    .with_context(format!("profile: {profile_name}"))
            })?;

        match resp.code.as_str() {
            "Success" => {}
            "AssumeRoleUnauthorizedAccess" => {
                return Err(Error::permission_denied(format!(
                    "EC2 instance not authorized to assume role: {}",
                    resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
            code if code.contains("Expired") => {
                return Err(Error::credential_expired(format!(
                    "metadata credentials expired: {}",
                    resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
            code => {
                return Err(Error::unexpected(format!(
                    "metadata service returned error: [{code}] {}",
                    resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
        }

        Ok(Some(Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration).map_err(|e| {
                Error::unexpected("failed to parse credential expiration")
                    .with_source(e)
                    .with_context(format!("expiration: {}", resp.expiration))
            })?),
        }))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Ec2MetadataIamSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsauth_core::{HttpSend, StaticEnv};
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct FakeImdsWithRole;

    #[async_trait]
    impl HttpSend for FakeImdsWithRole {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            let body = if req.method() == Method::PUT {
                "TOKEN".to_string()
            } else if req.uri().path() == "/latest/meta-data/iam/security-credentials/" {
                "my-role".to_string()
            } else {
                assert_eq!(
                    req.uri().path(),
                    "/latest/meta-data/iam/security-credentials/my-role"
                );
                r#"{
                    "Code": "Success",
                    "AccessKeyId": "ASIAIMDSEXAMPLE",
                    "SecretAccessKey": "imds-secret",
                    "Token": "imds-token",
                    "Expiration": "2030-01-01T00:00:00Z"
                }"#
                .to_string()
            };

            Ok(http::Response::builder()
                .status(StatusCode::OK)
                .body(Bytes::from(body))
                .unwrap())
        }
    }

    #[tokio::test]
    async fn test_loads_role_credentials() {
        let ctx = Context::new().with_http_send(FakeImdsWithRole);

        let provider = IMDSCredentialProvider::new();
        let cred = provider.provide_credential(&ctx).await.unwrap().unwrap();
        assert_eq!(cred.access_key_id, "ASIAIMDSEXAMPLE");
        assert_eq!(cred.secret_access_key, "imds-secret");
        assert_eq!(cred.session_token.as_deref(), Some("imds-token"));
        assert_eq!(
            cred.expires_in.unwrap(),
            parse_rfc3339("2030-01-01T00:00:00Z").unwrap()
        );
    }

    #[tokio::test]
    async fn test_disabled_via_env() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(AWS_EC2_METADATA_DISABLED.to_string(), "true".to_string())]),
        });

        let cred = IMDSCredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap();
        assert!(cred.is_none());
    }
}
