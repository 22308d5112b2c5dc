//! Identity persistence and reconnection helpers.
//!
//! Platform crates supply the [`SessionStore`] (browser `sessionStorage`,
//! nothing at all for the CLI) and an async sleep.

use serde::{Deserialize, Serialize};
use uno_core::docs::Pfp;
use uno_core::username::Profile;

use crate::auth::Identity;
use crate::remote::RemoteStore;
#[cfg(any(feature = "native", feature = "web"))]
use crate::transport::TransportError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection attempts before giving up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base delay between attempts in ms (doubles each attempt).
pub const RECONNECT_BASE_DELAY_MS: u64 = 1_000;

/// Delay before retry number `attempt` (zero-based).
pub fn reconnect_delay(attempt: u32) -> u64 {
    RECONNECT_BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(attempt))
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// What survives a page reload: the anonymous uid and the chosen profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub uid: String,
    pub username: String,
    pub pfp: Pfp,
}

impl From<&Identity> for StoredIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            uid: identity.uid.clone(),
            username: identity.profile.username.clone(),
            pfp: identity.profile.pfp,
        }
    }
}

impl From<StoredIdentity> for Identity {
    fn from(stored: StoredIdentity) -> Self {
        Identity {
            uid: stored.uid,
            profile: Profile {
                username: stored.username,
                pfp: stored.pfp,
            },
        }
    }
}

pub trait SessionStore {
    fn save(&self, identity: &StoredIdentity);
    fn load(&self) -> Option<StoredIdentity>;
    fn clear(&self);
}

/// Put a saved identity back on a fresh connection so the user keeps their
/// uid (and therefore their seats) across reloads.
pub fn restore_identity(store: &RemoteStore, session: &dyn SessionStore) -> Option<Identity> {
    let stored = session.load()?;
    if stored.uid.is_empty() || stored.pfp == Pfp::Unknown {
        session.clear();
        return None;
    }
    tracing::info!(uid = %stored.uid, "restoring saved identity");
    store.restore_uid(stored.uid.clone());
    Some(stored.into())
}

// ---------------------------------------------------------------------------
// Reconnection
// ---------------------------------------------------------------------------

/// Connect to the relay, retrying with exponential back-off.
///
/// `sleep_ms` is the platform's async sleep (`gloo_timers` on web,
/// `tokio::time::sleep` on native).
#[cfg(any(feature = "native", feature = "web"))]
pub async fn connect_with_retry<F, Fut>(url: &str, sleep_ms: F) -> Result<RemoteStore, TransportError>
where
    F: Fn(u64) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut last_error = TransportError::Closed;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match RemoteStore::connect_ws(url).await {
            Ok(store) => return Ok(store),
            Err(e) => {
                tracing::warn!(%url, attempt = attempt + 1, error = %e, "relay connection failed");
                last_error = e;
            }
        }
        if attempt + 1 < MAX_RECONNECT_ATTEMPTS {
            sleep_ms(reconnect_delay(attempt)).await;
        }
    }
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::auth::AuthProvider;

    #[derive(Default)]
    struct MemorySession(RefCell<Option<StoredIdentity>>);

    impl SessionStore for MemorySession {
        fn save(&self, identity: &StoredIdentity) {
            *self.0.borrow_mut() = Some(identity.clone());
        }

        fn load(&self) -> Option<StoredIdentity> {
            self.0.borrow().clone()
        }

        fn clear(&self) {
            self.0.borrow_mut().take();
        }
    }

    #[test]
    fn delay_doubles() {
        assert_eq!(reconnect_delay(0), 1_000);
        assert_eq!(reconnect_delay(1), 2_000);
        assert_eq!(reconnect_delay(4), 16_000);
        assert_eq!(reconnect_delay(200), u64::MAX);
    }

    #[test]
    fn saved_identity_is_restored_onto_the_connection() {
        let session = MemorySession::default();
        let identity = Identity {
            uid: "anon-7".into(),
            profile: Profile {
                username: "ana".into(),
                pfp: Pfp::Frog,
            },
        };
        session.save(&StoredIdentity::from(&identity));

        let (store, _sent) = RemoteStore::detached();
        assert_eq!(restore_identity(&store, &session), Some(identity));
        assert_eq!(store.current_uid().as_deref(), Some("anon-7"));
    }

    #[test]
    fn unusable_saved_identity_is_cleared() {
        let session = MemorySession::default();
        session.save(&StoredIdentity {
            uid: "anon-7".into(),
            username: "ana".into(),
            pfp: Pfp::Unknown,
        });
        let (store, _sent) = RemoteStore::detached();
        assert!(restore_identity(&store, &session).is_none());
        assert!(session.load().is_none());
        assert!(store.current_uid().is_none());
    }
}
