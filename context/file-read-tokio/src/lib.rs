//! Tokio-based file reading for awsauth.
//!
//! This crate provides [`TokioFileRead`], an async file reader implementing
//! the `FileRead` trait from `awsauth_core` on top of Tokio's filesystem
//! operations. It is used when loading shared config or credentials from
//! disk.
//!
//! ## Example
//!
//! ```no_run
//! use awsauth_core::{Context, OsEnv};
//! use awsauth_file_read_tokio::TokioFileRead;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileRead::default())
//!         .with_env(OsEnv);
//!
//!     match ctx.file_read("/path/to/credentials").await {
//!         Ok(content) => println!("read {} bytes", content.len()),
//!         Err(e) => eprintln!("failed to read file: {e}"),
//!     }
//! }
//! ```

#![warn(missing_docs)]

use async_trait::async_trait;
use awsauth_core::{Error, FileRead, Result};

/// Tokio-based implementation of the `FileRead` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| Error::unexpected("failed to read file").with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_file_read() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello").unwrap();

        let reader = TokioFileRead;
        let content = reader
            .file_read(f.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(content, b"hello");
    }

    #[tokio::test]
    async fn test_file_read_missing() {
        let reader = TokioFileRead;
        assert!(reader.file_read("/no/such/file").await.is_err());
    }
}
