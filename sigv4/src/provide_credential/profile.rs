use crate::constants::{AWS_CONFIG_FILE, AWS_PROFILE, AWS_SHARED_CREDENTIALS_FILE};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::{Context, Error, ProvideCredential, Result};
use ini::Ini;
use log::debug;

/// ProfileCredentialProvider loads credentials from the shared AWS files.
///
/// Lookup order:
/// - `~/.aws/credentials` (or the path in `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or the path in `AWS_CONFIG_FILE`)
///
/// The active profile is `AWS_PROFILE` if set, otherwise the one passed to
/// `with_profile()`, otherwise `default`.
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a provider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    async fn load_section(
        &self,
        ctx: &Context,
        path: String,
        section: &str,
        what: &str,
    ) -> Result<Option<Credential>> {
        let Some(path) = ctx.expand_home_dir(&path) else {
            debug!("failed to expand home dir for {what} file: {path}");
            return Ok(None);
        };

        let content = match ctx.file_read(&path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read {what} file {path}: {err:?}");
                return Ok(None);
            }
        };

        let conf = Ini::load_from_str(&String::from_utf8_lossy(&content)).map_err(|e| {
            Error::config_invalid(format!("failed to parse {what} file"))
                .with_source(anyhow::Error::new(e))
                .with_context(format!("path: {path}"))
        })?;

        let Some(props) = conf.section(Some(section)) else {
            debug!("section {section} not found in {what} file");
            return Ok(None);
        };

        match (
            props.get("aws_access_key_id"),
            props.get("aws_secret_access_key"),
        ) {
            (Some(ak), Some(sk)) => Ok(Some(Credential {
                access_key_id: ak.to_string(),
                secret_access_key: sk.to_string(),
                session_token: props.get("aws_session_token").map(|s| s.to_string()),
                expires_in: None,
            })),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = ctx
            .env_var(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        // Credentials file first. Section names carry no "profile " prefix.
        let credentials_path = self
            .credentials_file
            .clone()
            .or_else(|| ctx.env_var(AWS_SHARED_CREDENTIALS_FILE))
            .unwrap_or_else(|| "~/.aws/credentials".to_string());
        if let Some(cred) = self
            .load_section(ctx, credentials_path, &profile, "credentials")
            .await?
        {
            return Ok(Some(cred));
        }

        // Then the config file, where non-default profiles live in
        // "[profile <name>]" sections.
        let config_path = self
            .config_file
            .clone()
            .or_else(|| ctx.env_var(AWS_CONFIG_FILE))
            .unwrap_or_else(|| "~/.aws/config".to_string());
        let section = match profile.as_str() {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };
        self.load_section(ctx, config_path, &section, "config").await
    }
}
