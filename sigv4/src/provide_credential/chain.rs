use crate::Credential;
use async_trait::async_trait;
use awsauth_core::{Context, ProvideCredential, Result};
use log::debug;
use std::fmt;

/// ProvideCredentialChain tries a list of providers in order and returns
/// the first credential found.
///
/// A provider returning `Ok(None)` moves the chain to the next provider.
/// A provider returning an error is logged and skipped, so a broken
/// source does not mask a working one later in the chain.
#[derive(Default)]
pub struct ProvideCredentialChain {
    providers: Vec<Box<dyn ProvideCredential<Credential = Credential>>>,
}

impl fmt::Debug for ProvideCredentialChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl ProvideCredentialChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the end of the chain.
    pub fn push(mut self, provider: impl ProvideCredential<Credential = Credential>) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Build a chain from an existing list of providers.
    pub fn from_vec(providers: Vec<Box<dyn ProvideCredential<Credential = Credential>>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl ProvideCredential for ProvideCredentialChain {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        for provider in &self.providers {
            debug!("trying credential provider: {provider:?}");
            match provider.provide_credential(ctx).await {
                Ok(Some(cred)) => return Ok(Some(cred)),
                Ok(None) => continue,
                Err(err) => {
                    debug!("credential provider {provider:?} failed: {err}, trying next");
                    continue;
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsauth_core::Error;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        result: Option<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl ProvideCredential for CountingProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Credential>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::unexpected("provider exploded"));
            }
            Ok(self.result.map(|ak| Credential {
                access_key_id: ak.to_string(),
                secret_access_key: "secret".to_string(),
                ..Default::default()
            }))
        }
    }

    fn provider(
        calls: &Arc<AtomicUsize>,
        result: Option<&'static str>,
        fail: bool,
    ) -> CountingProvider {
        CountingProvider {
            calls: calls.clone(),
            result,
            fail,
        }
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let chain = ProvideCredentialChain::new()
            .push(provider(&first, Some("first"), false))
            .push(provider(&second, Some("second"), false));

        let cred = chain
            .provide_credential(&Context::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cred.access_key_id, "first");
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_none_and_errors_fall_through() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let third = Arc::new(AtomicUsize::new(0));

        let chain = ProvideCredentialChain::new()
            .push(provider(&first, None, false))
            .push(provider(&second, None, true))
            .push(provider(&third, Some("third"), false));

        let cred = chain
            .provide_credential(&Context::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cred.access_key_id, "third");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_returns_none() {
        let chain = ProvideCredentialChain::new();
        assert!(chain
            .provide_credential(&Context::new())
            .await
            .unwrap()
            .is_none());
    }
}
