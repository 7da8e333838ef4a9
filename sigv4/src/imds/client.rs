use crate::constants::{X_AWS_EC2_METADATA_TOKEN, X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS};
use crate::imds::endpoint::{resolve_endpoint, EndpointMode};
use awsauth_core::time::{Clock, DateTime, SystemClock};
use awsauth_core::{Context, Error, Result};
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Refresh the session token this long before it actually expires, so a
/// token handed to a caller is never already stale.
const TOKEN_REFRESH_BUFFER_SECS: i64 = 120;

/// 6 hours, the maximum the service accepts.
const DEFAULT_TOKEN_TTL: u32 = 21600;

const DEFAULT_MAX_RETRIES: u32 = 3;

/// IMDS is link-local, so unreachability shows up fast. Anything slower
/// than this means we are not on EC2.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct Token {
    value: String,
    expires_at: DateTime,
}

/// Builder for [`ImdsClient`].
#[derive(Debug, Default)]
pub struct ImdsClientBuilder {
    endpoint: Option<String>,
    endpoint_mode: Option<EndpointMode>,
    token_ttl: Option<u32>,
    max_retries: Option<u32>,
    timeout: Option<Duration>,
    clock: Option<Arc<dyn Clock>>,
}

impl ImdsClientBuilder {
    /// Override the metadata service endpoint, e.g. `http://[fd00:ec2::254]`.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Select the endpoint mode used when no endpoint is configured.
    pub fn with_endpoint_mode(mut self, mode: EndpointMode) -> Self {
        self.endpoint_mode = Some(mode);
        self
    }

    /// Set the session token TTL in seconds. Defaults to 21600 (6 hours).
    pub fn with_token_ttl(mut self, seconds: u32) -> Self {
        self.token_ttl = Some(seconds);
        self
    }

    /// Set the number of attempts for transient failures. Defaults to 3.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the per-request timeout. Defaults to 1 second.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the time source. Tests inject a manual clock.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub(crate) fn with_shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the client, resolving and validating the endpoint.
    ///
    /// Configuration problems (zero retries, malformed endpoint override)
    /// surface here rather than on the first request.
    pub async fn build(self, ctx: Context) -> Result<ImdsClient> {
        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries == 0 {
            return Err(Error::config_invalid("max retries must be at least 1"));
        }

        let endpoint =
            resolve_endpoint(&ctx, self.endpoint.as_deref(), self.endpoint_mode).await?;
        debug!("resolved metadata service endpoint: {endpoint}");

        Ok(ImdsClient {
            ctx,
            endpoint,
            token_ttl: self.token_ttl.unwrap_or(DEFAULT_TOKEN_TTL),
            max_retries,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            token: Mutex::new(None),
        })
    }
}

/// Client for the EC2 Instance Metadata Service (IMDSv2).
///
/// Holds a single cached session token per client, refreshed on the
/// request path once it enters the refresh buffer. Transient failures
/// (5xx, timeouts) are retried with backoff; a 403 from the token endpoint
/// means metadata access is disabled on the instance and is surfaced
/// immediately.
#[derive(Debug)]
pub struct ImdsClient {
    ctx: Context,
    endpoint: String,
    token_ttl: u32,
    max_retries: u32,
    timeout: Duration,
    clock: Arc<dyn Clock>,

    token: Mutex<Option<Token>>,
}

impl ImdsClient {
    /// Start building a client.
    pub fn builder() -> ImdsClientBuilder {
        ImdsClientBuilder::default()
    }

    /// Fetch a metadata path, e.g. `/latest/meta-data/instance-id`.
    pub async fn get(&self, path: &str) -> Result<String> {
        let token = self.token().await?;

        let resp = self.get_with_token(path, &token).await?;
        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            // The service rejected our token before its TTL ran out.
            // Drop it and retry once with a fresh one.
            debug!("metadata token rejected, refreshing");
            *self.token.lock().await = None;
            let token = self.token().await?;
            self.get_with_token(path, &token).await?
        } else {
            resp
        };

        match resp.status() {
            StatusCode::OK => Ok(resp.into_body()),
            StatusCode::FORBIDDEN => Err(Error::permission_denied(
                "metadata service access is disabled",
            )
            .with_context(format!("path: {path}"))),
            status => Err(Error::unexpected("metadata service returned an error")
                .with_context(format!("path: {path}"))
                .with_context(format!("status: {status}"))),
        }
    }

    async fn get_with_token(&self, path: &str, token: &str) -> Result<http::Response<String>> {
        let url = format!("{}{}", self.endpoint, path);
        self.send_with_retry(|| {
            http::Request::builder()
                .uri(&url)
                .method(Method::GET)
                .header(X_AWS_EC2_METADATA_TOKEN, token)
                .body(Bytes::new())
                .map_err(|e| {
                    Error::request_invalid("failed to build metadata request")
                        .with_source(e)
                        .with_context(format!("url: {url}"))
                })
        })
        .await
    }

    /// Return a usable session token, fetching or refreshing as needed.
    ///
    /// The slot lock is held across the refresh so concurrent callers
    /// observe either the old token or the new one, and only one refresh
    /// is ever in flight.
    async fn token(&self) -> Result<String> {
        let mut slot = self.token.lock().await;

        let now = self.clock.now();
        if let Some(token) = &*slot {
            let buffer = chrono::TimeDelta::try_seconds(TOKEN_REFRESH_BUFFER_SECS)
                .expect("in bounds");
            if now < token.expires_at - buffer {
                return Ok(token.value.clone());
            }
        }

        let (value, ttl) = self.fetch_token().await?;
        let token = Token {
            value,
            expires_at: now + chrono::TimeDelta::try_seconds(ttl as i64).expect("in bounds"),
        };
        let value = token.value.clone();
        *slot = Some(token);

        Ok(value)
    }

    /// Fetch a fresh token along with its effective TTL.
    ///
    /// The service echoes the granted TTL in the response header and may
    /// cap it below the requested value, so the echo wins over what we
    /// asked for.
    async fn fetch_token(&self) -> Result<(String, u32)> {
        let url = format!("{}/latest/api/token", self.endpoint);
        let ttl = self.token_ttl.to_string();
        let resp = self
            .send_with_retry(|| {
                http::Request::builder()
                    .uri(&url)
                    .method(Method::PUT)
                    .header(CONTENT_LENGTH, "0")
                    .header(X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS, &ttl)
                    .body(Bytes::new())
                    .map_err(|e| {
                        Error::request_invalid("failed to build token request")
                            .with_source(e)
                            .with_context(format!("url: {url}"))
                    })
            })
            .await?;

        match resp.status() {
            StatusCode::OK => {
                let granted_ttl = resp
                    .headers()
                    .get(X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(self.token_ttl);
                Ok((resp.into_body(), granted_ttl))
            }
            StatusCode::FORBIDDEN => Err(Error::permission_denied(
                "metadata service access is disabled",
            )
            .with_context("operation: fetch_token")
            .with_context("hint: check the instance metadata options")),
            status => Err(Error::unexpected("failed to fetch metadata token")
                .with_context(format!("status: {status}"))),
        }
    }

    /// Send a request, retrying transport errors, timeouts, and 5xx
    /// responses up to the attempt limit with exponential backoff.
    ///
    /// Non-5xx responses are returned to the caller for status handling;
    /// they never consume a retry.
    async fn send_with_retry(
        &self,
        make_req: impl Fn() -> Result<http::Request<Bytes>>,
    ) -> Result<http::Response<String>> {
        let mut last_err = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
            }

            let req = make_req()?;
            let resp = match tokio::time::timeout(self.timeout, self.ctx.http_send_as_string(req))
                .await
            {
                Err(_) => {
                    debug!("metadata request timed out, attempt {attempt}");
                    last_err = Some(
                        Error::timed_out("metadata service did not respond")
                            .with_context(format!("timeout: {:?}", self.timeout))
                            .set_retryable(true),
                    );
                    continue;
                }
                Ok(Err(e)) => {
                    debug!("metadata request failed, attempt {attempt}: {e:?}");
                    last_err = Some(
                        Error::unexpected("failed to reach metadata service")
                            .with_source(e)
                            .with_context("hint: check if running on an EC2 instance")
                            .set_retryable(true),
                    );
                    continue;
                }
                Ok(Ok(resp)) => resp,
            };

            if resp.status().is_server_error() {
                debug!(
                    "metadata service returned {}, attempt {attempt}",
                    resp.status()
                );
                last_err = Some(
                    Error::unexpected("metadata service returned a server error")
                        .with_context(format!("status: {}", resp.status()))
                        .set_retryable(true),
                );
                continue;
            }

            return Ok(resp);
        }

        Err(last_err.expect("at least one attempt was made"))
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * (1 << attempt.min(6)))
}
