use crate::{Context, ProvideCredential, Result, SignRequest, SigningCredential};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Signer is the main entry point used to sign requests.
///
/// It caches the most recently loaded credential and only asks the provider
/// again once the cached one stops being valid.
#[derive(Clone, Debug)]
pub struct Signer<C: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = C>>,
    signer: Arc<dyn SignRequest<Credential = C>>,
    credential: Arc<Mutex<Option<C>>>,
}

impl<C: SigningCredential> Signer<C> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        provider: impl ProvideCredential<Credential = C>,
        signer: impl SignRequest<Credential = C>,
    ) -> Self {
        Self {
            ctx,

            provider: Arc::new(provider),
            signer: Arc::new(signer),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Sign the request parts in place.
    ///
    /// Pass `expires_in` to produce a presigned request instead of an
    /// `authorization` header.
    pub async fn sign(
        &self,
        req: &mut http::request::Parts,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let cred = self.credential.lock().expect("lock poisoned").clone();
        let cred = if cred.is_valid() {
            cred
        } else {
            let cred = self.provider.provide_credential(&self.ctx).await?;
            *self.credential.lock().expect("lock poisoned") = cred.clone();
            cred
        };

        self.signer
            .sign_request(&self.ctx, req, cred.as_ref(), expires_in)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SigningCredential;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct TestCredential {
        key: String,
    }

    impl SigningCredential for TestCredential {
        fn is_valid(&self) -> bool {
            !self.key.is_empty()
        }
    }

    #[derive(Debug)]
    struct TestProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ProvideCredential for TestProvider {
        type Credential = TestCredential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<TestCredential>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(TestCredential {
                key: "ak".to_string(),
            }))
        }
    }

    #[derive(Debug)]
    struct TestSignRequest;

    #[async_trait]
    impl SignRequest for TestSignRequest {
        type Credential = TestCredential;

        async fn sign_request(
            &self,
            _: &Context,
            parts: &mut http::request::Parts,
            credential: Option<&TestCredential>,
            _: Option<Duration>,
        ) -> Result<()> {
            let cred = credential.expect("credential loaded");
            parts
                .headers
                .insert("authorization", cred.key.parse().unwrap());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sign_reuses_valid_credential() {
        let calls = Arc::new(AtomicUsize::new(0));
        let signer = Signer::new(
            Context::new(),
            TestProvider {
                calls: calls.clone(),
            },
            TestSignRequest,
        );

        for _ in 0..3 {
            let req = http::Request::get("https://example.com/").body(()).unwrap();
            let (mut parts, _) = req.into_parts();
            signer.sign(&mut parts, None).await.unwrap();
            assert_eq!(parts.headers.get("authorization").unwrap(), "ak");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
