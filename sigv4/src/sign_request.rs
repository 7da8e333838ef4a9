use crate::constants::{
    AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE,
    X_AMZ_SECURITY_TOKEN,
};
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256, EMPTY_STRING_SHA256};
use awsauth_core::time::{format_date, format_iso8601, Clock, DateTime, SystemClock};
use awsauth_core::{Context, Error, Result, SignRequest, SigningRequest};
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

/// Signing algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// AWS4-HMAC-SHA256, the symmetric SigV4 algorithm.
    HmacSha256,
    /// AWS4-ECDSA-P256-SHA256 (SigV4a). Not implemented.
    EcdsaP256Sha256,
}

/// How the request payload hash is derived when the request carries no
/// explicit `x-amz-content-sha256` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashSpecification {
    /// SHA-256 of the empty string. The default: request parts carry no
    /// body, so callers with a payload hash it themselves and use
    /// [`HashSpecification::Precalculated`].
    EmptyBody,
    /// The literal string `UNSIGNED-PAYLOAD`.
    UnsignedPayload,
    /// A hex SHA-256 computed by the caller over the payload bytes.
    Precalculated(String),
}

impl Default for HashSpecification {
    fn default() -> Self {
        Self::EmptyBody
    }
}

impl HashSpecification {
    fn to_hash(&self) -> String {
        match self {
            Self::EmptyBody => EMPTY_STRING_SHA256.to_string(),
            Self::UnsignedPayload => "UNSIGNED-PAYLOAD".to_string(),
            Self::Precalculated(v) => v.clone(),
        }
    }
}

/// Whether the computed payload hash is also attached as a request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignedBodyHeader {
    /// Don't attach the hash. The default.
    #[default]
    None,
    /// Attach the hash as `x-amz-content-sha256` before canonicalization,
    /// so the header is part of the signature. S3 requires this.
    XAmzContentSha256,
}

/// RequestSigner that implements AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,

    normalize_uri_path: bool,
    double_uri_encode: bool,
    omit_session_token: bool,
    signed_body_header: SignedBodyHeader,
    hash_specification: HashSpecification,

    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    /// Create a new SigV4 signer for the given service and region.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),

            normalize_uri_path: true,
            double_uri_encode: true,
            omit_session_token: false,
            signed_body_header: SignedBodyHeader::default(),
            hash_specification: HashSpecification::default(),

            clock: Arc::new(SystemClock),
        }
    }

    /// Select the signing algorithm.
    ///
    /// Only `AWS4-HMAC-SHA256` is supported; requesting SigV4a fails here
    /// rather than at request time.
    pub fn with_algorithm(self, algorithm: Algorithm) -> Result<Self> {
        match algorithm {
            Algorithm::HmacSha256 => Ok(self),
            Algorithm::EcdsaP256Sha256 => Err(Error::config_invalid(
                "AWS4-ECDSA-P256-SHA256 (SigV4a) is not supported",
            )),
        }
    }

    /// Control RFC 3986 dot-segment normalization of the path before
    /// encoding. On by default; S3 turns it off.
    pub fn with_normalize_uri_path(mut self, enable: bool) -> Self {
        self.normalize_uri_path = enable;
        self
    }

    /// Control double percent-encoding of the canonical path. On by
    /// default; S3 turns it off.
    pub fn with_double_uri_encode(mut self, enable: bool) -> Self {
        self.double_uri_encode = enable;
        self
    }

    /// Never emit `x-amz-security-token`, in either signing mode.
    ///
    /// S3 Express sets this and carries its session token in
    /// `x-amz-s3session-token` instead.
    pub fn with_omit_session_token(mut self, enable: bool) -> Self {
        self.omit_session_token = enable;
        self
    }

    /// Also attach the payload hash as a signed request header.
    pub fn with_signed_body_header(mut self, header: SignedBodyHeader) -> Self {
        self.signed_body_header = header;
        self
    }

    /// Set the payload hash used when the request has no explicit
    /// `x-amz-content-sha256` header.
    pub fn with_hash_specification(mut self, spec: HashSpecification) -> Self {
        self.hash_specification = spec;
        self
    }

    /// Replace the time source.
    ///
    /// Production code keeps the default system clock; tests inject a
    /// manual clock for deterministic signatures.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Resolve the payload hash for this request.
    ///
    /// An explicit `x-amz-content-sha256` header wins over the configured
    /// hash specification.
    fn payload_hash(&self, req: &SigningRequest) -> Result<String> {
        match req.headers.get(X_AMZ_CONTENT_SHA_256) {
            Some(v) => Ok(v.to_str()?.to_string()),
            None => Ok(self.hash_specification.to_hash()),
        }
    }

    fn canonical_uri(&self, req: &SigningRequest) -> Result<String> {
        let path = if self.normalize_uri_path {
            normalize_uri_path(&req.path)
        } else {
            req.path.clone()
        };

        let decoded = percent_decode_str(&path)
            .decode_utf8()
            .map_err(|e| Error::request_invalid("path is not valid utf-8").with_source(e))?;
        let encoded = utf8_percent_encode(&decoded, &AWS_URI_ENCODE_SET).to_string();

        if self.double_uri_encode {
            Ok(utf8_percent_encode(&encoded, &AWS_URI_ENCODE_SET).to_string())
        } else {
            Ok(encoded)
        }
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            // Anonymous request, leave it untouched.
            return Ok(());
        };

        let now = self.clock.now();
        let mut signed_req = SigningRequest::build(req)?;

        let payload_hash = self.payload_hash(&signed_req)?;
        if self.signed_body_header == SignedBodyHeader::XAmzContentSha256 {
            signed_req.headers.insert(
                X_AMZ_CONTENT_SHA_256,
                HeaderValue::from_str(&payload_hash)?,
            );
        }

        // canonicalize context
        self.canonicalize_header(&mut signed_req, cred, expires_in, now)?;
        self.canonicalize_query(&mut signed_req, cred, expires_in, now)?;

        // build canonical request and string to sign.
        let creq = self.canonical_request_string(&mut signed_req, &payload_hash)?;
        debug!("calculated canonical request: {creq}");
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "AWS4-HMAC-SHA256")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{}", &scope)?;
            write!(f, "{}", &encoded_req)?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        if expires_in.is_some() {
            signed_req.query.push(("X-Amz-Signature".into(), signature));
        } else {
            let mut authorization = HeaderValue::from_str(&format!(
                "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
                cred.access_key_id,
                scope,
                signed_req.header_name_to_vec_sorted().join(";"),
                signature
            ))?;
            authorization.set_sensitive(true);

            signed_req
                .headers
                .insert(header::AUTHORIZATION, authorization);
        }

        // Apply to the request.
        signed_req.apply(req)
    }
}

impl RequestSigner {
    fn canonical_request_string(
        &self,
        ctx: &mut SigningRequest,
        payload_hash: &str,
    ) -> Result<String> {
        // 256 is specially chosen to avoid reallocation for most requests.
        let mut f = String::with_capacity(256);

        writeln!(f, "{}", ctx.method)?;
        writeln!(f, "{}", self.canonical_uri(ctx)?)?;
        writeln!(
            f,
            "{}",
            ctx.query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        )?;
        let signed_headers = ctx.header_name_to_vec_sorted();
        for name in signed_headers.iter() {
            // A header may carry multiple values; all of them are part of
            // the canonical form, sorted and comma joined.
            let mut values = ctx
                .headers
                .get_all(*name)
                .iter()
                .map(|v| v.to_str())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            values.sort_unstable();
            writeln!(f, "{name}:{}", values.join(","))?;
        }
        writeln!(f)?;
        writeln!(f, "{}", signed_headers.join(";"))?;
        write!(f, "{payload_hash}")?;

        Ok(f)
    }

    fn canonicalize_header(
        &self,
        ctx: &mut SigningRequest,
        cred: &Credential,
        expires_in: Option<Duration>,
        now: DateTime,
    ) -> Result<()> {
        // Header values are trimmed and internal whitespace runs collapsed
        // per step 4 of the canonical request rules.
        for (_, value) in ctx.headers.iter_mut() {
            SigningRequest::header_value_normalize(value)
        }

        // Insert HOST header if not present.
        if ctx.headers.get(header::HOST).is_none() {
            ctx.headers.insert(
                header::HOST,
                ctx.authority.as_str().parse().map_err(|e| {
                    Error::request_invalid("authority is not a valid header value").with_source(e)
                })?,
            );
        }

        if expires_in.is_none() {
            // Insert DATE header if not present.
            if ctx.headers.get(X_AMZ_DATE).is_none() {
                ctx.headers
                    .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
            }

            // Insert X_AMZ_SECURITY_TOKEN header if a session token exists
            // and omission isn't requested.
            if !self.omit_session_token {
                if let Some(token) = &cred.session_token {
                    let mut value = HeaderValue::from_str(token)?;
                    // Mark the token value sensitive to avoid leaking.
                    value.set_sensitive(true);

                    ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
                }
            }
        }

        Ok(())
    }

    fn canonicalize_query(
        &self,
        ctx: &mut SigningRequest,
        cred: &Credential,
        expires_in: Option<Duration>,
        now: DateTime,
    ) -> Result<()> {
        if let Some(expire) = expires_in {
            ctx.query
                .push(("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()));
            ctx.query.push((
                "X-Amz-Credential".into(),
                format!(
                    "{}/{}/{}/{}/aws4_request",
                    cred.access_key_id,
                    format_date(now),
                    self.region,
                    self.service
                ),
            ));
            ctx.query.push(("X-Amz-Date".into(), format_iso8601(now)));
            ctx.query
                .push(("X-Amz-Expires".into(), expire.as_secs().to_string()));
            ctx.query.push((
                "X-Amz-SignedHeaders".into(),
                ctx.header_name_to_vec_sorted().join(";"),
            ));

            if !self.omit_session_token {
                if let Some(token) = &cred.session_token {
                    ctx.query
                        .push(("X-Amz-Security-Token".into(), token.into()));
                }
            }
        }

        // Return if query is empty.
        if ctx.query.is_empty() {
            return Ok(());
        }

        // Encode first, then sort by encoded key and encoded value.
        ctx.query = ctx
            .query
            .iter()
            .map(|(k, v)| {
                (
                    utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                    utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
                )
            })
            .collect();
        ctx.query.sort();

        Ok(())
    }
}

/// Remove dot segments from a path per RFC 3986 section 5.2.4.
fn normalize_uri_path(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }

    let mut s = String::with_capacity(path.len());
    s.push('/');
    s.push_str(&out.join("/"));
    // A trailing slash is significant to S3 style paths, keep it.
    if path.ends_with('/') && s.len() > 1 {
        s.push('/');
    }
    s
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsauth_core::time::ManualClock;
    use awsauth_core::Context;
    use chrono::{TimeZone, Utc};
    use http::Request;
    use pretty_assertions::assert_eq;

    fn sigv4_suite_clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap())
    }

    fn sigv4_suite_credential() -> Credential {
        Credential {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
            expires_in: None,
        }
    }

    fn parts(uri: &str) -> Parts {
        Request::builder()
            .method(http::Method::GET)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    async fn sign(
        signer: RequestSigner,
        mut parts: Parts,
        cred: &Credential,
        expires_in: Option<Duration>,
    ) -> Parts {
        let ctx = Context::new();
        signer
            .sign_request(&ctx, &mut parts, Some(cred), expires_in)
            .await
            .expect("signing must succeed");
        parts
    }

    // The expected signatures in the two vanilla tests come from the
    // official SigV4 test suite (get-vanilla and post-vanilla).

    #[tokio::test]
    async fn test_get_vanilla() {
        let _ = env_logger::builder().is_test(true).try_init();

        let signer =
            RequestSigner::new("service", "us-east-1").with_clock(sigv4_suite_clock());
        let parts = sign(
            signer,
            parts("https://example.amazonaws.com/"),
            &sigv4_suite_credential(),
            None,
        )
        .await;

        assert_eq!(
            parts.headers[header::AUTHORIZATION].to_str().unwrap(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, SignedHeaders=host;x-amz-date, Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(
            parts.headers[X_AMZ_DATE].to_str().unwrap(),
            "20150830T123600Z"
        );
        assert_eq!(
            parts.headers[header::HOST].to_str().unwrap(),
            "example.amazonaws.com"
        );
        assert!(parts.headers.get(X_AMZ_CONTENT_SHA_256).is_none());
    }

    #[tokio::test]
    async fn test_post_vanilla() {
        let signer =
            RequestSigner::new("service", "us-east-1").with_clock(sigv4_suite_clock());
        let mut unsigned = parts("https://example.amazonaws.com/");
        unsigned.method = http::Method::POST;
        let parts = sign(signer, unsigned, &sigv4_suite_credential(), None).await;

        assert_eq!(
            parts.headers[header::AUTHORIZATION].to_str().unwrap(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, SignedHeaders=host;x-amz-date, Signature=5da7c1a2acd57cee7505fc6676e4e544621c30862966e37dddb68e92efbe5d6b"
        );
    }

    async fn auth_with_meta_tags(values: &[&str]) -> String {
        let signer =
            RequestSigner::new("service", "us-east-1").with_clock(sigv4_suite_clock());
        let mut unsigned = parts("https://example.amazonaws.com/");
        for value in values {
            unsigned
                .headers
                .append("x-amz-meta-tag", HeaderValue::from_str(value).unwrap());
        }
        let signed = sign(signer, unsigned, &sigv4_suite_credential(), None).await;
        signed.headers[header::AUTHORIZATION]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_multi_valued_headers_are_all_signed() {
        // Every value participates in the signature.
        assert_ne!(
            auth_with_meta_tags(&["alpha", "beta"]).await,
            auth_with_meta_tags(&["alpha"]).await
        );
        // Values are sorted, so insertion order does not matter.
        assert_eq!(
            auth_with_meta_tags(&["beta", "alpha"]).await,
            auth_with_meta_tags(&["alpha", "beta"]).await
        );
    }

    #[tokio::test]
    async fn test_signing_is_deterministic() {
        let cred = sigv4_suite_credential();

        let mut outputs = Vec::new();
        for _ in 0..2 {
            let signer =
                RequestSigner::new("s3", "us-west-2").with_clock(sigv4_suite_clock());
            let parts = sign(
                signer,
                parts("https://bucket.s3.us-west-2.amazonaws.com/key?a=1&b=2"),
                &cred,
                None,
            )
            .await;
            outputs.push(
                parts.headers[header::AUTHORIZATION]
                    .to_str()
                    .unwrap()
                    .to_string(),
            );
        }

        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn test_canonical_query_is_order_invariant() {
        let cred = sigv4_suite_credential();

        let permutations = [
            "https://example.amazonaws.com/?b=2&a=1&a=0",
            "https://example.amazonaws.com/?a=1&a=0&b=2",
            "https://example.amazonaws.com/?a=0&b=2&a=1",
        ];

        let mut signatures = Vec::new();
        for uri in permutations {
            let signer =
                RequestSigner::new("service", "us-east-1").with_clock(sigv4_suite_clock());
            let parts = sign(signer, parts(uri), &cred, None).await;
            signatures.push(
                parts.headers[header::AUTHORIZATION]
                    .to_str()
                    .unwrap()
                    .to_string(),
            );
        }

        assert_eq!(signatures[0], signatures[1]);
        assert_eq!(signatures[1], signatures[2]);
    }

    #[tokio::test]
    async fn test_session_token_signed_by_default() {
        let cred = Credential {
            session_token: Some("TOKEN".to_string()),
            ..sigv4_suite_credential()
        };

        let signer =
            RequestSigner::new("service", "us-east-1").with_clock(sigv4_suite_clock());
        let parts = sign(signer, parts("https://example.amazonaws.com/"), &cred, None).await;

        assert_eq!(parts.headers[X_AMZ_SECURITY_TOKEN].to_str().unwrap(), "TOKEN");
        let auth = parts.headers[header::AUTHORIZATION].to_str().unwrap();
        assert!(auth.contains("SignedHeaders=host;x-amz-date;x-amz-security-token"));
    }

    #[tokio::test]
    async fn test_omit_session_token_never_emits_it() {
        let cred = Credential {
            session_token: Some("TOKEN".to_string()),
            ..sigv4_suite_credential()
        };

        // Header mode.
        let signer = RequestSigner::new("service", "us-east-1")
            .with_clock(sigv4_suite_clock())
            .with_omit_session_token(true);
        let signed = sign(signer, parts("https://example.amazonaws.com/"), &cred, None).await;
        assert!(signed.headers.get(X_AMZ_SECURITY_TOKEN).is_none());
        let auth = signed.headers[header::AUTHORIZATION].to_str().unwrap();
        assert!(!auth.contains("security-token"));

        // Query mode.
        let signer = RequestSigner::new("service", "us-east-1")
            .with_clock(sigv4_suite_clock())
            .with_omit_session_token(true);
        let signed = sign(
            signer,
            parts("https://example.amazonaws.com/"),
            &cred,
            Some(Duration::from_secs(3600)),
        )
        .await;
        assert!(!signed.uri.query().unwrap().contains("X-Amz-Security-Token"));
    }

    #[tokio::test]
    async fn test_presign_emits_query_parameters() {
        let signer =
            RequestSigner::new("s3", "us-east-1").with_clock(sigv4_suite_clock());
        let signed = sign(
            signer,
            parts("https://examplebucket.s3.amazonaws.com/test.txt"),
            &sigv4_suite_credential(),
            Some(Duration::from_secs(86400)),
        )
        .await;

        let query = signed.uri.query().unwrap();
        assert!(query.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(query.contains(
            "X-Amz-Credential=AKIDEXAMPLE%2F20150830%2Fus-east-1%2Fs3%2Faws4_request"
        ));
        assert!(query.contains("X-Amz-Date=20150830T123600Z"));
        assert!(query.contains("X-Amz-Expires=86400"));
        assert!(query.contains("X-Amz-SignedHeaders=host"));
        assert!(query.contains("X-Amz-Signature="));
        // Presigned requests carry no authorization header.
        assert!(signed.headers.get(header::AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_signed_body_header_attaches_hash() {
        let signer = RequestSigner::new("s3", "us-east-1")
            .with_clock(sigv4_suite_clock())
            .with_signed_body_header(SignedBodyHeader::XAmzContentSha256)
            .with_hash_specification(HashSpecification::UnsignedPayload);
        let signed = sign(
            signer,
            parts("https://bucket.s3.amazonaws.com/key"),
            &sigv4_suite_credential(),
            None,
        )
        .await;

        assert_eq!(
            signed.headers[X_AMZ_CONTENT_SHA_256].to_str().unwrap(),
            "UNSIGNED-PAYLOAD"
        );
        let auth = signed.headers[header::AUTHORIZATION].to_str().unwrap();
        assert!(auth.contains("x-amz-content-sha256"));
    }

    #[tokio::test]
    async fn test_explicit_content_sha256_header_wins() {
        let precalculated = hex_sha256(b"Hello,World!");
        let mut p = parts("https://bucket.s3.amazonaws.com/key");
        p.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_str(&precalculated).unwrap(),
        );

        let signer = RequestSigner::new("s3", "us-east-1").with_clock(sigv4_suite_clock());
        let signed = sign(signer, p, &sigv4_suite_credential(), None).await;

        assert_eq!(
            signed.headers[X_AMZ_CONTENT_SHA_256].to_str().unwrap(),
            precalculated
        );
    }

    #[tokio::test]
    async fn test_anonymous_request_left_untouched() {
        let signer = RequestSigner::new("service", "us-east-1");
        let mut p = parts("https://example.amazonaws.com/");
        let ctx = Context::new();
        signer
            .sign_request(&ctx, &mut p, None, None)
            .await
            .unwrap();
        assert!(p.headers.get(header::AUTHORIZATION).is_none());
        assert!(p.headers.get(X_AMZ_DATE).is_none());
        assert_eq!(p.uri.to_string(), "https://example.amazonaws.com/");
    }

    #[test]
    fn test_normalize_uri_path() {
        let cases = [
            ("/", "/"),
            ("/a/b/c", "/a/b/c"),
            ("/a//b/", "/a/b/"),
            ("/a/./b", "/a/b"),
            ("/a/b/../c", "/a/c"),
            ("/..", "/"),
            ("", "/"),
        ];

        for (input, expect) in cases {
            assert_eq!(normalize_uri_path(input), expect, "input: {input:?}");
        }
    }

    #[test]
    fn test_sigv4a_rejected_at_construction() {
        let err = RequestSigner::new("s3", "us-east-1")
            .with_algorithm(Algorithm::EcdsaP256Sha256)
            .unwrap_err();
        assert_eq!(err.kind(), awsauth_core::ErrorKind::ConfigInvalid);

        assert!(RequestSigner::new("s3", "us-east-1")
            .with_algorithm(Algorithm::HmacSha256)
            .is_ok());
    }

    #[test]
    fn test_signing_key_derivation() {
        // From the AWS documentation example for 20150830/us-east-1/iam.
        let key = generate_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            Utc.with_ymd_and_hms(2015, 8, 30, 0, 0, 0).unwrap(),
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }
}
