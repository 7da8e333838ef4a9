use crate::constants::X_AMZ_CONTENT_SHA_256;
use crate::{Credential, RequestSigner};
use async_trait::async_trait;
use awsauth_core::hash::EMPTY_STRING_SHA256;
use awsauth_core::time::parse_rfc3339;
use awsauth_core::{Context, Error, Result, SignRequest};
use bytes::Bytes;
use http::{header, Method, Request};
use log::debug;
use serde::Deserialize;
use std::fmt::Debug;

/// Creates session credentials for a directory bucket.
///
/// Abstracted behind a trait so the cache refresh machinery can be
/// exercised without a network.
#[async_trait]
pub trait CreateSession: Debug + Send + Sync + 'static {
    /// Call s3:CreateSession for the given bucket, signing with the base
    /// credentials, and return the session credentials.
    async fn create_session(
        &self,
        ctx: &Context,
        bucket: &str,
        base: &Credential,
    ) -> Result<Credential>;
}

/// Calls the real CreateSession endpoint of the bucket's zonal host.
#[derive(Debug, Default)]
pub struct DefaultCreateSession;

#[async_trait]
impl CreateSession for DefaultCreateSession {
    async fn create_session(
        &self,
        ctx: &Context,
        bucket: &str,
        base: &Credential,
    ) -> Result<Credential> {
        debug!("creating session for directory bucket {bucket}");

        let az_id = parse_az_id(bucket)?;
        let region = region_from_az_id(az_id)?;
        let host = format!("{bucket}.s3express-{az_id}.amazonaws.com");

        let req = Request::builder()
            .method(Method::GET)
            .uri(format!("https://{host}/?session"))
            .header(header::HOST, &host)
            .header(X_AMZ_CONTENT_SHA_256, EMPTY_STRING_SHA256)
            .header("x-amz-create-session-mode", "ReadWrite")
            .body(Bytes::new())?;

        let (mut parts, body) = req.into_parts();
        let signer = RequestSigner::new("s3express", region);
        signer.sign_request(ctx, &mut parts, Some(base), None).await?;

        let resp = ctx.http_send(Request::from_parts(parts, body)).await?;
        let status = resp.status();
        let body = String::from_utf8_lossy(&resp.into_body()).into_owned();
        if !status.is_success() {
            return Err(Error::unexpected(format!(
                "CreateSession failed for bucket {bucket}"
            ))
            .with_context(format!("status: {status}"))
            .with_context(format!("body: {body}")));
        }

        let result: CreateSessionResult = quick_xml::de::from_str(&body).map_err(|e| {
            Error::unexpected("failed to parse CreateSession response")
                .with_source(anyhow::Error::new(e))
                .with_context(format!("bucket: {bucket}"))
        })?;
        let creds = result.credentials;

        Ok(Credential {
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_access_key,
            session_token: Some(creds.session_token),
            expires_in: Some(parse_rfc3339(&creds.expiration).map_err(|e| {
                Error::unexpected("failed to parse session expiration")
                    .with_source(e)
                    .with_context(format!("expiration: {}", creds.expiration))
            })?),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "CreateSessionResult", rename_all = "PascalCase")]
struct CreateSessionResult {
    credentials: SessionCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SessionCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

/// Extract the availability zone id from a directory bucket name in the
/// `name--azid--x-s3` format.
fn parse_az_id(bucket: &str) -> Result<&str> {
    let parts: Vec<&str> = bucket.split("--").collect();
    if parts.len() != 3 || parts[2] != "x-s3" {
        return Err(Error::config_invalid(format!(
            "not a directory bucket name: {bucket}"
        ))
        .with_context("expected format: name--azid--x-s3"));
    }
    Ok(parts[1])
}

/// Map an availability zone id prefix to its region.
fn region_from_az_id(az_id: &str) -> Result<&'static str> {
    let region = match az_id.split('-').next().unwrap_or_default() {
        "use1" => "us-east-1",
        "use2" => "us-east-2",
        "usw1" => "us-west-1",
        "usw2" => "us-west-2",
        "euw1" => "eu-west-1",
        "euw2" => "eu-west-2",
        "euc1" => "eu-central-1",
        "eun1" => "eu-north-1",
        "apne1" => "ap-northeast-1",
        "apse1" => "ap-southeast-1",
        "apse2" => "ap-southeast-2",
        "aps1" => "ap-south-1",
        _ => {
            return Err(Error::config_invalid(format!(
                "unknown availability zone id: {az_id}"
            )))
        }
    };
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_az_id() {
        assert_eq!(parse_az_id("my-bucket--usw2-az1--x-s3").unwrap(), "usw2-az1");
        assert!(parse_az_id("my-bucket").is_err());
        assert!(parse_az_id("my-bucket--usw2-az1--x-s4").is_err());
    }

    #[test]
    fn test_region_from_az_id() {
        assert_eq!(region_from_az_id("usw2-az1").unwrap(), "us-west-2");
        assert_eq!(region_from_az_id("apne1-az4").unwrap(), "ap-northeast-1");
        assert!(region_from_az_id("mars1-az1").is_err());
    }

    #[test]
    fn test_parse_create_session_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <CreateSessionResult>
                <Credentials>
                    <SessionToken>session-token</SessionToken>
                    <SecretAccessKey>session-secret</SecretAccessKey>
                    <AccessKeyId>ASIAS3EXPRESS</AccessKeyId>
                    <Expiration>2021-08-31T12:30:00Z</Expiration>
                </Credentials>
            </CreateSessionResult>"#;

        let result: CreateSessionResult = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(result.credentials.access_key_id, "ASIAS3EXPRESS");
        assert_eq!(result.credentials.session_token, "session-token");
    }
}
