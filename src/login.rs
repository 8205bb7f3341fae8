use crate::errors::AppError;
use crate::models::{LoginForm, LoginState};
use crate::repository::SubmissionRepository;
use crate::session::SessionStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use validator::Validate;

/// Drives the login screen and fills the [`SessionStore`] on success.
pub struct LoginController {
    repository: Arc<dyn SubmissionRepository>,
    session: SessionStore,
    state_tx: watch::Sender<LoginState>,
}

impl LoginController {
    pub fn new(repository: Arc<dyn SubmissionRepository>, session: SessionStore) -> Self {
        Self {
            repository,
            session,
            state_tx: watch::Sender::new(LoginState::Idle),
        }
    }

    pub fn state(&self) -> LoginState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoginState> {
        self.state_tx.subscribe()
    }

    pub async fn login(&self, tenant: &str, email: &str, password: &str, api_key: &str) -> LoginState {
        self.state_tx.send_replace(LoginState::Loading);

        let form = LoginForm {
            tenant: tenant.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            api_key: api_key.to_string(),
        };

        if let Err(e) = form.validate() {
            let err = AppError::from(e);
            warn!(error = %err, "Login rejected locally");
            return self.finish(LoginState::Error(err.to_string()));
        }

        match self.repository.login(&form.tenant, &form.api_key, &form.request()).await {
            Ok(response) => {
                // The backend's tenant wins over the one typed by the user
                self.session
                    .start_session(&response.user.tenant, &response.token, &form.api_key);
                info!(user = %response.user.username, "Logged in");
                self.finish(LoginState::Success)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.finish(LoginState::Error(format!("Login failed: {}", e)))
            }
        }
    }

    pub fn logout(&self) {
        self.session.clear();
        self.state_tx.send_replace(LoginState::Idle);
        info!("Logged out");
    }

    fn finish(&self, state: LoginState) -> LoginState {
        self.state_tx.send_replace(state.clone());
        state
    }
}
