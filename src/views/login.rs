use std::time::Duration;

use tracing::{error, warn};

use crate::session::Session;

use super::Route;

pub const LOGIN_FAILED: &str = "Login failed. Please try again.";
pub const DEFAULT_LOGIN_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Submitting,
}

pub struct LoginView {
    session: Session,
    pub username: String,
    pub password: String,
    error_message: Option<String>,
    state: LoginState,
    delay: Duration,
}

impl LoginView {
    pub fn new(session: Session) -> Self {
        Self::with_delay(session, DEFAULT_LOGIN_DELAY)
    }

    pub fn with_delay(session: Session, delay: Duration) -> Self {
        Self {
            session,
            username: String::new(),
            password: String::new(),
            error_message: None,
            state: LoginState::Idle,
            delay,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoginState::Submitting
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn can_submit(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.is_loading()
    }

    /// Enters the submitting state. Returns false if a submission is already running.
    pub fn begin_submit(&mut self) -> bool {
        if self.is_loading() {
            warn!("Login already in progress");
            return false;
        }
        self.error_message = None;
        self.state = LoginState::Submitting;
        true
    }

    /// Completes a submission started with [`LoginView::begin_submit`].
    pub fn finish_submit(&mut self) -> Option<Route> {
        let result = self.session.login(&self.username, &self.password);
        self.state = LoginState::Idle;
        match result {
            Ok(true) => {
                self.password.clear();
                Some(Route::Dashboard)
            }
            Ok(false) => {
                self.error_message = Some(LOGIN_FAILED.to_string());
                None
            }
            Err(err) => {
                error!("Login failed: {:#}", err);
                self.error_message = Some(LOGIN_FAILED.to_string());
                None
            }
        }
    }

    pub async fn submit(&mut self) -> Option<Route> {
        if !self.begin_submit() {
            return None;
        }
        tokio::time::sleep(self.delay).await;
        self.finish_submit()
    }
}
