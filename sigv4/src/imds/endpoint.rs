use crate::constants::{
    AWS_CONFIG_FILE, AWS_EC2_METADATA_SERVICE_ENDPOINT, AWS_EC2_METADATA_SERVICE_ENDPOINT_MODE,
    AWS_PROFILE, PROFILE_EC2_METADATA_SERVICE_ENDPOINT, PROFILE_EC2_METADATA_SERVICE_ENDPOINT_MODE,
};
use awsauth_core::{Context, Error, Result};
use ini::Ini;
use log::debug;
use std::str::FromStr;

/// Which address family the metadata service is reached over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointMode {
    /// `http://169.254.169.254`, the default.
    #[default]
    IPv4,
    /// `http://[fd00:ec2::254]`.
    IPv6,
}

impl EndpointMode {
    /// The well-known endpoint for this mode.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            EndpointMode::IPv4 => "http://169.254.169.254",
            EndpointMode::IPv6 => "http://[fd00:ec2::254]",
        }
    }
}

impl FromStr for EndpointMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ipv4" => Ok(EndpointMode::IPv4),
            "ipv6" => Ok(EndpointMode::IPv6),
            _ => Err(Error::config_invalid(format!(
                "invalid endpoint mode: {s}, expected IPv4 or IPv6"
            ))),
        }
    }
}

/// Resolve the metadata service endpoint.
///
/// Precedence: explicit override, then environment, then the shared config
/// profile, then the default for the resolved endpoint mode. An invalid
/// override is a configuration error, not a request-time error.
pub(crate) async fn resolve_endpoint(
    ctx: &Context,
    endpoint_override: Option<&str>,
    mode_override: Option<EndpointMode>,
) -> Result<String> {
    let endpoint = match endpoint_override {
        Some(ep) => Some(ep.to_string()),
        None => match ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT) {
            Some(ep) => Some(ep),
            None => profile_value(ctx, PROFILE_EC2_METADATA_SERVICE_ENDPOINT).await,
        },
    };
    if let Some(ep) = endpoint {
        return validate_endpoint(&ep);
    }

    let mode = match mode_override {
        Some(mode) => mode,
        None => {
            let raw = match ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT_MODE) {
                Some(v) => Some(v),
                None => profile_value(ctx, PROFILE_EC2_METADATA_SERVICE_ENDPOINT_MODE).await,
            };
            match raw {
                Some(v) => v.parse()?,
                None => EndpointMode::default(),
            }
        }
    };

    Ok(mode.default_endpoint().to_string())
}

fn validate_endpoint(endpoint: &str) -> Result<String> {
    let uri: http::Uri = endpoint.parse().map_err(|e| {
        Error::config_invalid(format!("invalid metadata service endpoint: {endpoint}"))
            .with_source(anyhow::Error::new(e))
    })?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(Error::config_invalid(format!(
            "metadata service endpoint must carry scheme and host: {endpoint}"
        )));
    }

    Ok(endpoint.trim_end_matches('/').to_string())
}

/// Look up a key in the active profile of the shared config file.
///
/// Missing or unparsable files resolve to `None`, matching how credential
/// providers fall through instead of failing.
async fn profile_value(ctx: &Context, key: &str) -> Option<String> {
    let path = ctx
        .env_var(AWS_CONFIG_FILE)
        .unwrap_or_else(|| "~/.aws/config".to_string());
    let path = ctx.expand_home_dir(&path)?;

    let content = match ctx.file_read(&path).await {
        Ok(content) => content,
        Err(err) => {
            debug!("failed to read config file {path}: {err:?}");
            return None;
        }
    };
    let conf = match Ini::load_from_str(&String::from_utf8_lossy(&content)) {
        Ok(conf) => conf,
        Err(err) => {
            debug!("failed to parse config file {path}: {err:?}");
            return None;
        }
    };

    let profile = ctx
        .env_var(AWS_PROFILE)
        .unwrap_or_else(|| "default".to_string());
    let section = match profile.as_str() {
        "default" => "default".to_string(),
        x => format!("profile {x}"),
    };

    conf.section(Some(&section))?.get(key).map(|v| v.to_string())
}
