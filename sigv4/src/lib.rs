//! AWS SigV4 request signing.
//!
//! This crate implements the SigV4 canonicalization and signing
//! algorithm together with the credential machinery around it: static,
//! environment, shared-config, EC2 metadata (IMDS), and S3 Express
//! session providers.
//!
//! # Example
//!
//! ```no_run
//! use awsauth_core::{Context, Signer};
//! use awsauth_sigv4::{DefaultCredentialProvider, RequestSigner};
//!
//! # async fn example() -> awsauth_core::Result<()> {
//! let ctx = Context::new();
//! let signer = Signer::new(
//!     ctx,
//!     DefaultCredentialProvider::new(),
//!     RequestSigner::new("s3", "us-east-1"),
//! );
//!
//! let req = http::Request::get("https://s3.amazonaws.com/testbucket")
//!     .body(())
//!     .unwrap();
//! let (mut parts, _) = req.into_parts();
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

mod constants;

mod credential;
pub use credential::Credential;

pub mod imds;

pub mod provide_credential;
pub use provide_credential::DefaultCredentialProvider;
pub use provide_credential::EnvCredentialProvider;
pub use provide_credential::IMDSCredentialProvider;
pub use provide_credential::ProfileCredentialProvider;
pub use provide_credential::ProvideCredentialChain;
pub use provide_credential::StaticCredentialProvider;

pub mod s3_express;
pub use s3_express::{S3ExpressCredentialProvider, S3ExpressRequestSigner};

mod sign_request;
pub use sign_request::{Algorithm, HashSpecification, RequestSigner, SignedBodyHeader};
