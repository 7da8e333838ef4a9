use crate::{Context, Result};
use std::fmt::Debug;
use std::time::Duration;

/// SigningCredential is implemented by credential types that know whether
/// they are still usable for signing.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is still valid for signing.
    ///
    /// Credentials close to expiration should report invalid so the signer
    /// refreshes them before they actually expire.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential is implemented by credential sources.
///
/// A source may read the environment, a shared config file, the instance
/// metadata service or a remote API. Returning `Ok(None)` means this source
/// has nothing to offer and the caller may try another one.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load a credential from the current environment.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is implemented by request signers.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request parts in place.
    ///
    /// ## Credential
    ///
    /// `credential` is `None` when no provider produced one. Signers that
    /// support anonymous access may leave the request untouched; others
    /// should return an error.
    ///
    /// ## Expires In
    ///
    /// `expires_in` asks for a presigned result that stays valid for the
    /// given duration. Signers that don't support presigning should return
    /// an error when it is set.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()>;
}
