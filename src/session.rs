use crate::claims;
use crate::error::EnergyError;
use crate::geo_api::GeoApi;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

/// Renew this many minutes before the upstream would reject the token
pub const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Validity, in minutes, assumed when the token's expiry can't be decoded
pub const FALLBACK_VALIDITY_MINUTES: i64 = 55;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Caches the geo access token and system id so polls don't pay for a login
/// every time.
///
/// Token and system id are guarded by separate locks. Both follow the same
/// pattern: check under the read lock, and on a miss take the write lock,
/// check again, then fetch while still holding it. That keeps at most one
/// renewal in flight and readers only ever see a complete value.
pub struct SessionCache {
    api: GeoApi,
    username: String,
    password: String,
    token: RwLock<Option<CachedToken>>,
    system_id: RwLock<Option<String>>,
}

impl SessionCache {
    pub fn new(api: GeoApi, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            api,
            username: username.into(),
            password: password.into(),
            token: RwLock::new(None),
            system_id: RwLock::new(None),
        }
    }

    /// Returns an access token that is valid for immediate use
    pub async fn token(&self) -> Result<String, EnergyError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
                return Ok(token.access_token.clone());
            }
        }

        let mut cached = self.token.write().await;
        // Another caller may have renewed while we waited for the write lock
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.access_token.clone());
        }

        let requested_at = Utc::now();
        let response = self
            .api
            .login(&self.username, &self.password)
            .await
            .map_err(EnergyError::Auth)?;

        let expires_at = buffered_expiry(&response.access_token, requested_at);
        tracing::info!(%expires_at, "renewed geo access token");

        let access_token = response.access_token;
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });
        Ok(access_token)
    }

    /// Resolves the installation id once; later calls never hit the network
    pub async fn system_id(&self, access_token: &str) -> Result<String, EnergyError> {
        if let Some(id) = self.system_id.read().await.as_ref() {
            return Ok(id.clone());
        }

        let mut cached = self.system_id.write().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let device_data = self
            .api
            .device_data(access_token)
            .await
            .map_err(EnergyError::Upstream)?;
        let id = device_data
            .system_details
            .into_iter()
            .next()
            .map(|system| system.system_id)
            .ok_or(EnergyError::NoSystems)?;

        tracing::info!(system_id = %id, "resolved geo system id");
        *cached = Some(id.clone());
        Ok(id)
    }

    /// Buffered expiry of the cached token, if one has been acquired
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.read().await.as_ref().map(|t| t.expires_at)
    }
}

fn buffered_expiry(access_token: &str, requested_at: DateTime<Utc>) -> DateTime<Utc> {
    let fallback = requested_at + Duration::minutes(FALLBACK_VALIDITY_MINUTES);
    match claims::decode_expiry(access_token) {
        Ok(expiry) => match expiry.checked_sub_signed(Duration::minutes(EXPIRY_BUFFER_MINUTES)) {
            Some(buffered) => buffered,
            None => {
                tracing::warn!(%expiry, "token expiry out of range, assuming {FALLBACK_VALIDITY_MINUTES} minutes");
                fallback
            }
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                "could not read token expiry, assuming {FALLBACK_VALIDITY_MINUTES} minutes"
            );
            fallback
        }
    }
}
