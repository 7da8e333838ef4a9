use std::borrow::Cow;
use std::mem;
use std::str::FromStr;
use std::time::Duration;

use http::header::HeaderName;
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{HeaderMap, HeaderValue, Method, Uri};

use crate::{Error, Result};

/// Signing context for a request.
///
/// The context is taken out of `http::request::Parts`, mutated during
/// signing and then applied back, so headers are moved rather than copied.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, still percent encoded.
    pub path: String,
    /// HTTP query parameters, percent decoded.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from `http::request::Parts`.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority can't be signed")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return them when applying the context back.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to `http::request::Parts`.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Cow<str> {
        percent_encoding::percent_decode_str(&self.path).decode_utf8_lossy()
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Push a new query pair into the query list.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Get query pairs whose key passes the filter.
    pub fn query_to_vec_with_filter(&self, filter: impl Fn(&str) -> bool) -> Vec<(String, String)> {
        self.query
            .iter()
            .filter(|(k, _)| filter(k))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Convert sorted query to string.
    ///
    /// ```shell
    /// [(a, b), (c, d)] => "a:b\nc:d"
    /// ```
    pub fn query_to_string(mut query: Vec<(String, String)>, sep: &str, join: &str) -> String {
        let mut s = String::with_capacity(16);

        query.sort();

        for (idx, (k, v)) in query.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }

            s.push_str(&k);
            if !v.is_empty() {
                s.push_str(sep);
                s.push_str(&v);
            }
        }

        s
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Normalize a header value for canonicalization.
    ///
    /// Leading and trailing spaces are trimmed and runs of internal spaces
    /// collapse to a single space.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();

        let mut out = Vec::with_capacity(bs.len());
        let mut in_run = false;
        for &b in bs {
            if b == b' ' {
                in_run = true;
                continue;
            }
            if in_run && !out.is_empty() {
                out.push(b' ');
            }
            in_run = false;
            out.push(b);
        }

        // This can't fail because we started with a valid HeaderValue and
        // only removed spaces.
        *v = HeaderValue::from_bytes(&out).expect("invalid header value")
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }

    /// Convert sorted headers to string.
    ///
    /// ```shell
    /// [(a, b), (c, d)] => "a:b\nc:d"
    /// ```
    pub fn header_to_string(mut headers: Vec<(String, String)>, sep: &str, join: &str) -> String {
        let mut s = String::with_capacity(16);

        headers.sort();

        for (idx, (k, v)) in headers.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }

            s.push_str(&k);
            s.push_str(sep);
            s.push_str(&v);
        }

        s
    }
}

/// SigningMethod is the method used in signing.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SigningMethod {
    /// Signing with headers, producing an `authorization` header.
    Header,
    /// Signing with query parameters valid for the given duration.
    Query(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_apply_round_trip() {
        let mut parts = http::Request::builder()
            .method(Method::GET)
            .uri("https://example.amazonaws.com/path?foo=bar")
            .header("host", "example.amazonaws.com")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let mut req = SigningRequest::build(&mut parts).unwrap();
        assert_eq!(req.path, "/path");
        assert_eq!(req.query, vec![("foo".to_string(), "bar".to_string())]);

        req.query_push("baz", "qux");
        req.apply(&mut parts).unwrap();
        assert_eq!(
            parts.uri.to_string(),
            "https://example.amazonaws.com/path?foo=bar&baz=qux"
        );
    }

    #[test]
    fn test_build_without_authority() {
        let mut parts = http::Request::builder()
            .method(Method::GET)
            .uri("/relative")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        assert!(SigningRequest::build(&mut parts).is_err());
    }

    #[test]
    fn test_header_value_normalize() {
        let cases = [
            ("a  b  c", "a b c"),
            ("  leading", "leading"),
            ("trailing   ", "trailing"),
            ("   ", ""),
            ("already normal", "already normal"),
        ];

        for (input, expect) in cases {
            let mut v = HeaderValue::from_str(input).unwrap();
            SigningRequest::header_value_normalize(&mut v);
            assert_eq!(v.to_str().unwrap(), expect, "input: {input:?}");
        }
    }
}
