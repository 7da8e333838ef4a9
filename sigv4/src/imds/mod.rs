//! Client for the EC2 Instance Metadata Service (IMDSv2).

mod endpoint;
pub use endpoint::EndpointMode;

mod client;
pub use client::{ImdsClient, ImdsClientBuilder};
