use super::cache::{
    ExpiringValue, SessionEntry, SessionKey, DEFAULT_CAPACITY, DEFAULT_REFRESH_PERIOD,
    EMPTY_POLL_PERIOD,
};
use super::create_session::{CreateSession, DefaultCreateSession};
use super::lru::Lru;
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::time::{Clock, SystemClock};
use awsauth_core::{Context, Error, ProvideCredential, Result};
use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// S3ExpressCredentialProvider caches per-bucket session credentials for
/// directory buckets.
///
/// `resolve` serves cached credentials while they stay outside the one
/// minute refresh buffer, and calls CreateSession synchronously on a
/// miss. A background task refreshes entries still in use before they
/// expire and evicts entries no bucket has touched since the previous
/// cycle, so sessions for idle buckets stop being renewed.
///
/// The task is owned by the provider: `close()` or dropping the provider
/// cancels it. Construction must happen inside a tokio runtime.
pub struct S3ExpressCredentialProvider {
    inner: Arc<Inner>,
    task: tokio::task::JoinHandle<()>,
}

struct Inner {
    base: Box<dyn ProvideCredential<Credential = Credential>>,
    create_session: Box<dyn CreateSession>,
    cache: Mutex<Lru<SessionKey, SessionEntry>>,
    // Serializes CreateSession calls so concurrent resolves for the same
    // uncached bucket collapse into one upstream call.
    creation_lock: tokio::sync::Mutex<()>,
    // Captured from the first resolve; the refresh loop cannot run
    // before it has a context to send requests with.
    ctx: Mutex<Option<Context>>,
    notify: Notify,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for S3ExpressCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ExpressCredentialProvider")
            .field("base", &self.inner.base)
            .finish_non_exhaustive()
    }
}

/// Builder for [`S3ExpressCredentialProvider`]. The refresh task starts
/// on `build()`.
pub struct S3ExpressCredentialProviderBuilder {
    base: Box<dyn ProvideCredential<Credential = Credential>>,
    create_session: Box<dyn CreateSession>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl S3ExpressCredentialProviderBuilder {
    /// Replace the CreateSession implementation.
    pub fn with_create_session(mut self, create_session: impl CreateSession) -> Self {
        self.create_session = Box::new(create_session);
        self
    }

    /// Replace the LRU capacity. Defaults to 100.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Build the provider and spawn its background refresh task.
    pub fn build(self) -> S3ExpressCredentialProvider {
        let inner = Arc::new(Inner {
            base: self.base,
            create_session: self.create_session,
            cache: Mutex::new(Lru::new(self.capacity)),
            creation_lock: tokio::sync::Mutex::new(()),
            ctx: Mutex::new(None),
            notify: Notify::new(),
            clock: self.clock,
        });

        let task = tokio::spawn(refresh_loop(inner.clone()));

        S3ExpressCredentialProvider { inner, task }
    }
}

impl S3ExpressCredentialProvider {
    /// Create a provider on top of a base credential provider and spawn
    /// its refresh task.
    pub fn new(base: impl ProvideCredential<Credential = Credential>) -> Self {
        Self::builder(base).build()
    }

    /// Start configuring a provider.
    pub fn builder(
        base: impl ProvideCredential<Credential = Credential>,
    ) -> S3ExpressCredentialProviderBuilder {
        S3ExpressCredentialProviderBuilder {
            base: Box::new(base),
            create_session: Box::new(DefaultCreateSession),
            capacity: DEFAULT_CAPACITY,
            clock: Arc::new(SystemClock),
        }
    }

    /// Resolve session credentials for a bucket.
    pub async fn resolve(&self, ctx: &Context, bucket: &str) -> Result<Credential> {
        self.inner
            .ctx
            .lock()
            .expect("lock poisoned")
            .get_or_insert_with(|| ctx.clone());

        let base = self
            .inner
            .base
            .provide_credential(ctx)
            .await?
            .ok_or_else(|| {
                Error::credential_invalid(
                    "no base credentials available for directory bucket session",
                )
            })?;
        let key: SessionKey = (bucket.to_string(), base);

        if let Some(cred) = self.cached(&key) {
            return Ok(cred);
        }

        let _creating = self.inner.creation_lock.lock().await;
        // Another resolve may have filled the entry while we waited.
        if let Some(cred) = self.cached(&key) {
            return Ok(cred);
        }

        let cred = self
            .inner
            .create_session
            .create_session(ctx, bucket, &key.1)
            .await?;
        let expires_at = cred.expires_in.ok_or_else(|| {
            Error::unexpected("session credentials carry no expiration")
                .with_context(format!("bucket: {bucket}"))
        })?;

        self.inner.cache.lock().expect("lock poisoned").insert(
            key,
            SessionEntry {
                expiring: ExpiringValue {
                    value: cred.clone(),
                    expires_at,
                },
                used_since_last_refresh: true,
            },
        );
        // Wake the refresh loop so the schedule accounts for the new
        // entry.
        self.inner.notify.notify_one();

        Ok(cred)
    }

    /// Bind the provider to a single bucket so it can feed a
    /// [`Signer`](awsauth_core::Signer).
    pub fn bucket_provider(self: &Arc<Self>, bucket: impl Into<String>) -> BucketSessionProvider {
        BucketSessionProvider {
            provider: self.clone(),
            bucket: bucket.into(),
        }
    }

    /// Cancel the background refresh task.
    pub fn close(&self) {
        self.task.abort();
    }

    fn cached(&self, key: &SessionKey) -> Option<Credential> {
        let now = self.inner.clock.now();
        let mut cache = self.inner.cache.lock().expect("lock poisoned");
        let entry = cache.get_mut(key)?;
        if entry.expiring.is_expired(now) {
            return None;
        }
        entry.used_since_last_refresh = true;
        Some(entry.expiring.value.clone())
    }

    #[cfg(test)]
    pub(crate) async fn run_refresh_cycle(&self) -> Duration {
        refresh_cycle(&self.inner).await
    }

    #[cfg(test)]
    pub(crate) fn cache_len(&self) -> usize {
        self.inner.cache.lock().expect("lock poisoned").len()
    }
}

impl Drop for S3ExpressCredentialProvider {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A [`S3ExpressCredentialProvider`] fixed to one bucket.
#[derive(Debug, Clone)]
pub struct BucketSessionProvider {
    provider: Arc<S3ExpressCredentialProvider>,
    bucket: String,
}

#[async_trait]
impl ProvideCredential for BucketSessionProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.provider.resolve(ctx, &self.bucket).await.map(Some)
    }
}

async fn refresh_loop(inner: Arc<Inner>) {
    loop {
        let wake = next_wake(&inner);
        tokio::select! {
            // An insert changed the schedule, recompute the wake.
            _ = inner.notify.notified() => continue,
            _ = tokio::time::sleep(wake) => {}
        }
        refresh_cycle(&inner).await;
    }
}

/// Time until the soonest entry needs refreshing, bounded by the default
/// refresh period. Falls back to a short poll while there is nothing to
/// schedule against.
fn next_wake(inner: &Inner) -> Duration {
    if inner.ctx.lock().expect("lock poisoned").is_none() {
        return EMPTY_POLL_PERIOD;
    }

    let now = inner.clock.now();
    let mut cache = inner.cache.lock().expect("lock poisoned");
    if cache.is_empty() {
        return EMPTY_POLL_PERIOD;
    }

    let soonest = cache
        .iter_mut()
        .map(|(_, entry)| {
            (entry.expiring.refresh_at() - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
        .min()
        .unwrap_or(DEFAULT_REFRESH_PERIOD);

    soonest.min(DEFAULT_REFRESH_PERIOD)
}

/// One refresh cycle: evict entries unused since the previous cycle,
/// reset used flags on survivors, and re-create sessions that crossed
/// into the refresh buffer. Individual failures are logged and do not
/// stop the cycle.
async fn refresh_cycle(inner: &Inner) -> Duration {
    let ctx = inner.ctx.lock().expect("lock poisoned").clone();
    let Some(ctx) = ctx else {
        return EMPTY_POLL_PERIOD;
    };

    let now = inner.clock.now();
    let expired: Vec<SessionKey> = {
        let mut cache = inner.cache.lock().expect("lock poisoned");
        cache.retain(|(bucket, _), entry| {
            if !entry.used_since_last_refresh {
                debug!("evicting idle session for bucket {bucket}");
            }
            entry.used_since_last_refresh
        });

        let mut expired = Vec::new();
        for (key, entry) in cache.iter_mut() {
            entry.used_since_last_refresh = false;
            if entry.expiring.is_expired(now) {
                expired.push(key.clone());
            }
        }
        expired
    };

    for key in expired {
        let (bucket, base) = &key;
        match inner.create_session.create_session(&ctx, bucket, base).await {
            Ok(cred) => {
                let Some(expires_at) = cred.expires_in else {
                    warn!("refreshed session for bucket {bucket} carries no expiration, dropping");
                    continue;
                };
                let mut cache = inner.cache.lock().expect("lock poisoned");
                if let Some(entry) = cache.get_mut(&key) {
                    entry.expiring = ExpiringValue {
                        value: cred,
                        expires_at,
                    };
                }
            }
            Err(err) => {
                warn!("failed to refresh session for bucket {bucket}: {err}");
            }
        }
    }

    next_wake(inner)
}
