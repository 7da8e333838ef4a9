//! Core components for signing API requests.
//!
//! This crate provides the foundational types and traits shared by the
//! awsauth crates. It defines the abstractions that let credential loading
//! and request signing stay decoupled from any particular HTTP client or
//! filesystem.
//!
//! ## Overview
//!
//! The crate is built around a few concepts:
//!
//! - **Context**: A container holding implementations for file reading,
//!   HTTP sending and environment access
//! - **Traits**: Abstract interfaces for credential loading
//!   (`ProvideCredential`) and request signing (`SignRequest`)
//! - **Signer**: The orchestrator that caches credentials and drives
//!   signing
//! - **Clock**: A time source that tests replace with a manual clock
//!
//! ## Example
//!
//! ```no_run
//! use awsauth_core::{
//!     Context, ProvideCredential, Result, SignRequest, Signer, SigningCredential,
//! };
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//!     secret: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty() && !self.secret.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyProvider;
//!
//! #[async_trait]
//! impl ProvideCredential for MyProvider {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             key: "my-access-key".to_string(),
//!             secret: "my-secret-key".to_string(),
//!         }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MySigner;
//!
//! #[async_trait]
//! impl SignRequest for MySigner {
//!     type Credential = MyCredential;
//!
//!     async fn sign_request(
//!         &self,
//!         _ctx: &Context,
//!         _req: &mut http::request::Parts,
//!         _credential: Option<&Self::Credential>,
//!         _expires_in: Option<Duration>,
//!     ) -> Result<()> {
//!         todo!()
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let ctx = Context::default();
//! let signer = Signer::new(ctx, MyProvider, MySigner);
//!
//! let mut parts = http::Request::builder()
//!     .method("GET")
//!     .uri("https://example.com")
//!     .body(())
//!     .unwrap()
//!     .into_parts()
//!     .0;
//!
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, FileRead, HttpSend, NoopEnv, NoopFileRead, NoopHttpSend, OsEnv, StaticEnv};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod error;
pub use error::{Error, ErrorKind, Result};
mod request;
pub use request::{SigningMethod, SigningRequest};
mod signer;
pub use signer::Signer;

pub use time::{Clock, DateTime, ManualClock, SystemClock};
