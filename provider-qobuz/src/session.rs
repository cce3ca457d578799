//! Account session
//!
//! The session is created on the first authenticated call and kept for the
//! lifetime of the provider instance. Concurrent first callers may each log
//! in; the last stored session wins, which is harmless because logins are
//! idempotent.

use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::{QobuzError, Result};
use crate::transport::ThrottledTransport;
use crate::types::{params, Session};
use crate::PROVIDER_ID;

const LOGIN_ENDPOINT: &str = "user/login";

pub struct SessionManager {
    username: String,
    password: String,
    device_manufacturer_id: String,
    session: RwLock<Option<Arc<Session>>>,
    events: OnceLock<EventBus>,
}

impl SessionManager {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        device_manufacturer_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            device_manufacturer_id: device_manufacturer_id.into(),
            session: RwLock::new(None),
            events: OnceLock::new(),
        }
    }

    /// Publish `SignedIn` / `AuthError` on `bus`. Only the first bus is kept.
    pub fn attach_events(&self, bus: EventBus) {
        if self.events.set(bus).is_err() {
            debug!("Event bus already attached to session manager");
        }
    }

    /// Current session, logging in first if there is none.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` when the login request fails or returns no
    /// token. The failure is not cached; the next call tries again.
    pub async fn token(&self, transport: &ThrottledTransport) -> Result<Arc<Session>> {
        if let Some(session) = self.current().await {
            return Ok(session);
        }

        match self.login(transport).await {
            Ok(session) => {
                let session = Arc::new(session);
                *self.session.write().await = Some(Arc::clone(&session));

                info!(user = %session.display_name, "Logged in to Qobuz");
                self.emit(AuthEvent::SignedIn {
                    provider: PROVIDER_ID.to_string(),
                    user: session.display_name.clone(),
                });
                Ok(session)
            }
            Err(e) => {
                error!(error = %e, "Qobuz login failed");
                self.emit(AuthEvent::AuthError {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Session if already logged in; never touches the network
    pub async fn current(&self) -> Option<Arc<Session>> {
        self.session.read().await.clone()
    }

    /// Drop the stored session so the next call logs in again
    pub async fn invalidate(&self) {
        if self.session.write().await.take().is_some() {
            info!("Qobuz session invalidated");
        }
    }

    async fn login(&self, transport: &ThrottledTransport) -> Result<Session> {
        let login_params = params([
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("device_manufacturer_id", self.device_manufacturer_id.as_str()),
        ]);

        let payload = transport
            .get(LOGIN_ENDPOINT, &login_params, None)
            .await
            .map_err(|e| QobuzError::AuthenticationFailed(e.to_string()))?;

        Session::from_login(&payload).ok_or_else(|| {
            QobuzError::AuthenticationFailed("login response carried no token".to_string())
        })
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = self.events.get() {
            let _ = bus.emit(CoreEvent::Auth(event));
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("device_manufacturer_id", &self.device_manufacturer_id)
            .finish()
    }
}
