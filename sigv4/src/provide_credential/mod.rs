//! Credential providers for AWS services.

mod chain;
pub use chain::ProvideCredentialChain;

mod default;
pub use default::DefaultCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod imds;
pub use imds::IMDSCredentialProvider;

mod profile;
pub use profile::ProfileCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;
