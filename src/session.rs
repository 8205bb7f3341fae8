use crate::models::SessionCredentials;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

// ==============================================================================
// Session Store
// ==============================================================================

/// Raw view of the stored triple; any component may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub tenant: Option<String>,
    pub token: Option<String>,
    pub api_key: Option<String>,
}

/// In-memory holder of the authenticated session.
///
/// Cloning hands out another handle to the same session, so the login flow and
/// the dashboard observe one triple. Nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionSnapshot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all three fields in one write.
    pub fn start_session(&self, tenant: &str, token: &str, api_key: &str) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = SessionSnapshot {
            tenant: Some(tenant.to_string()),
            token: Some(token.to_string()),
            api_key: Some(api_key.to_string()),
        };
        info!(tenant = %tenant, "Session started");
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = SessionSnapshot::default();
        debug!("Session cleared");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The credential triple, only when every component is present and non-blank.
    pub fn credentials(&self) -> Option<SessionCredentials> {
        let snapshot = self.snapshot();
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Some(SessionCredentials {
            tenant: present(snapshot.tenant)?,
            api_key: present(snapshot.api_key)?,
            token: present(snapshot.token)?,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().is_some()
    }
}
