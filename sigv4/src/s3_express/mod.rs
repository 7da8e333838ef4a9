//! Session credentials for S3 Express One Zone directory buckets.
//!
//! Directory buckets authenticate through short lived session
//! credentials obtained from s3:CreateSession. This module caches those
//! sessions per `(bucket, base credential)` pair, refreshes active
//! sessions in the background, and signs requests with the
//! `x-amz-s3session-token` header.

mod cache;

mod create_session;
pub use create_session::{CreateSession, DefaultCreateSession};

mod lru;

mod provide_credential;
pub use provide_credential::{
    BucketSessionProvider, S3ExpressCredentialProvider, S3ExpressCredentialProviderBuilder,
};

mod sign_request;
pub use sign_request::S3ExpressRequestSigner;
