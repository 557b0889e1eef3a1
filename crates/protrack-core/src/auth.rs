//! Auth session lifecycle.
//!
//! [`AuthSession`] owns the token (in memory and on disk) and the
//! state machine around it. Restoring validates the persisted token
//! with a profile fetch; any later request that comes back
//! auth-rejected forces a logout through
//! [`AuthSession::handle_api_error`], so a revoked token never lingers.

use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use protrack_types::{SignupRequest, UserProfile};

use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::services;
use crate::session::{SessionStore, SharedToken};

/// Where the session currently stands.
///
/// Invariant: `user` is only ever populated while a token is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// No token; only signup/login are possible.
    Unauthenticated,
    /// A persisted token is being validated against the backend.
    Restoring,
    /// Token accepted; requests carry the auth header.
    Authenticated,
    /// A token is held but could not be validated (server down or
    /// failing). Requests may still be attempted.
    Error,
}

/// What [`AuthSession::restore`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No persisted token.
    NoSession,
    /// Token accepted; profile loaded.
    Active,
    /// The server rejected the persisted token; it has been cleared.
    Rejected,
    /// Validation did not complete; the token is kept.
    Unverified,
}

/// Snapshot of the session state.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: AuthPhase,
    pub user: Option<UserProfile>,
    pub token_present: bool,
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Unauthenticated,
            user: None,
            token_present: false,
            is_loading: false,
        }
    }
}

/// Session controller: token storage plus the state machine around it.
pub struct AuthSession {
    store: SessionStore,
    token: SharedToken,
    state: Mutex<SessionState>,
}

impl AuthSession {
    pub fn new(store: SessionStore, token: SharedToken) -> Self {
        Self {
            store,
            token,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().phase == AuthPhase::Authenticated
    }

    /// Loads the persisted token and validates it with a profile fetch.
    ///
    /// A rejected token is cleared on the spot; an unreachable server
    /// leaves the token in place (`Error` phase) so the actual command
    /// can still try and report its own failure.
    pub async fn restore(&self, api: &ApiClient) -> RestoreOutcome {
        let Some(token) = self.store.load() else {
            self.set_phase(AuthPhase::Unauthenticated);
            return RestoreOutcome::NoSession;
        };

        self.token.set(token);
        self.set_token_present(true);
        self.set_phase(AuthPhase::Restoring);

        match services::user::fetch_profile(api).await {
            Ok(profile) => {
                self.set_user(Some(profile));
                self.set_phase(AuthPhase::Authenticated);
                RestoreOutcome::Active
            }
            Err(err) if err.is_auth_rejected() => {
                warn!("Persisted token rejected by the server; clearing it");
                if let Err(clear_err) = self.force_logout() {
                    warn!(error = %clear_err, "Failed to clear session file");
                }
                RestoreOutcome::Rejected
            }
            Err(err) => {
                warn!(error = %err, "Could not validate the persisted session");
                self.set_phase(AuthPhase::Error);
                RestoreOutcome::Unverified
            }
        }
    }

    /// Exchanges credentials for a token, persists it, and moves to
    /// `Authenticated`.
    ///
    /// Rejected credentials come back as a generic message; the backend
    /// does not distinguish unknown email from wrong password and
    /// neither do we.
    ///
    /// # Errors
    /// Returns an error if login fails. If the server rejects the freshly
    /// issued token, it is cleared before the error is returned.
    pub async fn login(&self, api: &ApiClient, email: &str, password: &str) -> Result<()> {
        self.set_loading(true);
        let outcome = services::auth::issue_token(api, email, password).await;
        self.set_loading(false);

        let token = match outcome {
            Ok(token) => token,
            Err(err) if err.kind == ApiErrorKind::Network => {
                return Err(err).context("Could not reach the server");
            }
            Err(err) => {
                warn!(kind = %err.kind, "Login rejected");
                bail!("Invalid email or password");
            }
        };

        self.token.set(token.clone());
        self.set_token_present(true);
        self.store
            .save(&token)
            .context("Failed to persist session")?;

        // The session only becomes Authenticated once the profile fetch
        // confirms the token. A rejection here clears the token we just
        // persisted; logins never leave a dead token behind.
        match services::user::fetch_profile(api).await {
            Ok(profile) => {
                self.set_user(Some(profile));
                self.set_phase(AuthPhase::Authenticated);
                info!("Logged in");
                Ok(())
            }
            Err(err) => {
                if self.handle_api_error(&err) {
                    bail!("Login failed: the server rejected the new session");
                }
                self.set_phase(AuthPhase::Error);
                Err(anyhow::Error::new(err).context("Could not fetch profile after login"))
            }
        }
    }

    /// Creates an account, then logs in with the same credentials.
    ///
    /// # Errors
    /// Returns an error if signup or the follow-up login fails.
    pub async fn signup(&self, api: &ApiClient, request: &SignupRequest) -> Result<()> {
        self.set_loading(true);
        let outcome = services::auth::register(api, request).await;
        self.set_loading(false);

        if let Err(err) = outcome {
            return Err(anyhow::Error::new(err).context("Signup failed"));
        }

        self.login(api, &request.email, &request.password).await
    }

    /// Ends the session: notifies the backend (best effort), then clears
    /// the token from memory and disk. Local clearing happens even when
    /// the server call fails.
    ///
    /// # Errors
    /// Returns an error only if the local session file cannot be removed.
    pub async fn logout(&self, api: &ApiClient) -> Result<()> {
        if self.token.get().is_some() {
            services::auth::notify_logout(api).await;
        }
        self.force_logout()?;
        info!("Logged out");
        Ok(())
    }

    /// Clears the session locally without contacting the backend.
    ///
    /// # Errors
    /// Returns an error if the session file cannot be removed.
    pub fn force_logout(&self) -> Result<()> {
        self.token.clear();
        self.store.clear()?;
        if let Ok(mut state) = self.state.lock() {
            state.user = None;
            state.token_present = false;
            state.phase = AuthPhase::Unauthenticated;
        }
        Ok(())
    }

    /// Reacts to an API error: auth rejection ends the session.
    /// Returns true if the session was terminated.
    pub fn handle_api_error(&self, err: &ApiError) -> bool {
        if err.is_auth_rejected() {
            warn!("Server rejected the session token; logging out");
            if let Err(clear_err) = self.force_logout() {
                warn!(error = %clear_err, "Failed to clear session file");
            }
            true
        } else {
            false
        }
    }

    /// Fetches and caches the profile for the current session.
    ///
    /// # Errors
    /// Returns the API error; auth rejection also ends the session.
    pub async fn refresh_user(&self, api: &ApiClient) -> std::result::Result<UserProfile, ApiError> {
        match services::user::fetch_profile(api).await {
            Ok(profile) => {
                self.set_user(Some(profile.clone()));
                Ok(profile)
            }
            Err(err) => {
                self.handle_api_error(&err);
                Err(err)
            }
        }
    }

    fn set_phase(&self, phase: AuthPhase) {
        if let Ok(mut state) = self.state.lock() {
            state.phase = phase;
        }
    }

    fn set_user(&self, user: Option<UserProfile>) {
        if let Ok(mut state) = self.state.lock() {
            state.user = user;
        }
    }

    fn set_token_present(&self, token_present: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.token_present = token_present;
        }
    }

    fn set_loading(&self, is_loading: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.is_loading = is_loading;
        }
    }
}
