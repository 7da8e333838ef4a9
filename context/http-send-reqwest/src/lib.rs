//! Reqwest-based HTTP sending for awsauth.
//!
//! This crate provides [`ReqwestHttpSend`], an HTTP client implementing the
//! `HttpSend` trait from `awsauth_core` on top of `reqwest`. The metadata
//! client and the session credential providers use it to reach their
//! endpoints.
//!
//! ## Example
//!
//! ```no_run
//! use awsauth_core::Context;
//! use awsauth_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
//! ```

#![warn(missing_docs)]

use async_trait::async_trait;
use awsauth_core::{Error, HttpSend, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};

/// Reqwest-based implementation of the `HttpSend` trait.
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend from an existing `reqwest::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::unexpected("failed to send http request").with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::unexpected("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
