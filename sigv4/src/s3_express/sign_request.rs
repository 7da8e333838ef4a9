use crate::constants::{X_AMZ_S3_SESSION_TOKEN, X_AMZ_SECURITY_TOKEN};
use crate::{Credential, RequestSigner};
use async_trait::async_trait;
use awsauth_core::time::Clock;
use awsauth_core::{Context, Result, SignRequest};
use http::header::HeaderValue;
use http::request::Parts;
use std::time::Duration;

/// Signs requests to directory buckets with session credentials.
///
/// The session token travels in `x-amz-s3session-token` rather than
/// `x-amz-security-token`, and must stay out of the signature: the inner
/// signer runs with `omit_session_token` and any security token header
/// left over from a previous attempt is stripped before canonicalization.
#[derive(Debug)]
pub struct S3ExpressRequestSigner {
    inner: RequestSigner,
}

impl S3ExpressRequestSigner {
    /// Create a signer for directory buckets in the given region.
    ///
    /// Follows the S3 signing profile: single URI encoding and no path
    /// normalization.
    pub fn new(region: &str) -> Self {
        Self {
            inner: RequestSigner::new("s3express", region)
                .with_omit_session_token(true)
                .with_double_uri_encode(false)
                .with_normalize_uri_path(false),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.inner = self.inner.with_clock(clock);
        self
    }
}

#[async_trait]
impl SignRequest for S3ExpressRequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        ctx: &Context,
        parts: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        // Retries reuse the same parts; drop token headers from the
        // previous attempt so they cannot leak into the signature.
        parts.headers.remove(X_AMZ_SECURITY_TOKEN);
        parts.headers.remove(X_AMZ_S3_SESSION_TOKEN);

        self.inner
            .sign_request(ctx, parts, credential, expires_in)
            .await?;

        if let Some(token) = credential.and_then(|c| c.session_token.as_deref()) {
            let mut value = HeaderValue::from_str(token)?;
            value.set_sensitive(true);
            parts.headers.insert(X_AMZ_S3_SESSION_TOKEN, value);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsauth_core::time::{parse_rfc3339, ManualClock};
    use bytes::Bytes;
    use http::Request;
    use pretty_assertions::assert_eq;

    fn session_credential() -> Credential {
        Credential {
            access_key_id: "ASIAS3EXPRESS".to_string(),
            secret_access_key: "session-secret".to_string(),
            session_token: Some("session-token".to_string()),
            expires_in: None,
        }
    }

    fn signer() -> S3ExpressRequestSigner {
        S3ExpressRequestSigner::new("us-west-2")
            .with_clock(ManualClock::new(parse_rfc3339("2021-08-31T12:00:00Z").unwrap()))
    }

    #[tokio::test]
    async fn test_session_token_header() {
        let req = Request::builder()
            .method(http::Method::GET)
            .uri("https://data--usw2-az1--x-s3.s3express-usw2-az1.amazonaws.com/key")
            .body(Bytes::new())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        signer()
            .sign_request(&Context::new(), &mut parts, Some(&session_credential()), None)
            .await
            .unwrap();

        assert_eq!(
            parts.headers.get(X_AMZ_S3_SESSION_TOKEN).unwrap(),
            "session-token"
        );
        assert!(parts.headers.get(X_AMZ_SECURITY_TOKEN).is_none());

        let authorization = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(!authorization.contains("x-amz-security-token"));
        assert!(!authorization.contains("x-amz-s3session-token"));
    }

    #[tokio::test]
    async fn test_stale_security_token_removed() {
        let req = Request::builder()
            .method(http::Method::PUT)
            .uri("https://data--usw2-az1--x-s3.s3express-usw2-az1.amazonaws.com/key")
            .header(X_AMZ_SECURITY_TOKEN, "stale-token")
            .header(X_AMZ_S3_SESSION_TOKEN, "stale-session")
            .body(Bytes::new())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        signer()
            .sign_request(&Context::new(), &mut parts, Some(&session_credential()), None)
            .await
            .unwrap();

        assert!(parts.headers.get(X_AMZ_SECURITY_TOKEN).is_none());
        assert_eq!(
            parts.headers.get(X_AMZ_S3_SESSION_TOKEN).unwrap(),
            "session-token"
        );
        let authorization = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(!authorization.contains("x-amz-security-token"));
    }
}
