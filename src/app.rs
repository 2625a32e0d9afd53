//! Application state management for Latchkey.
//!
//! This module contains the core `App` struct that owns the session gate,
//! the login form state, and the dashboard state, and coordinates the
//! background login task with the UI loop.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::{
    gate::{validate_email, validate_password},
    Field, LoginOutcome, SessionGate, SessionStatus, SessionStore, UserInfo,
};
use crate::config::Config;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the login outcome channel.
/// One pending attempt at a time; a little headroom costs nothing.
const CHANNEL_BUFFER_SIZE: usize = 4;

/// Maximum length for email input.
/// Sign-in emails rarely exceed this; keeps the form row stable.
const MAX_EMAIL_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// How long the success notice is shown before switching to the dashboard.
const REDIRECT_DELAY_SECS: i64 = 2;

/// Transient notifications dismiss themselves after this long.
const NOTICE_DISMISS_SECS: i64 = 5;

// ============================================================================
// UI State Types
// ============================================================================

/// Which screen is active. Switching screens is the terminal analogue of
/// a page redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ConfirmingLogout,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Remember,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Remember,
            LoginFocus::Remember => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Email,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Email,
            LoginFocus::Remember => LoginFocus::Password,
            LoginFocus::Button => LoginFocus::Remember,
        }
    }
}

/// Dashboard navigation sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Overview,
    Profile,
    Settings,
    Help,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Overview => "Overview",
            Section::Profile => "Profile",
            Section::Settings => "Settings",
            Section::Help => "Help & Support",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Section::Overview => Section::Profile,
            Section::Profile => Section::Settings,
            Section::Settings => Section::Help,
            Section::Help => Section::Overview,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Section::Overview => Section::Help,
            Section::Profile => Section::Overview,
            Section::Settings => Section::Profile,
            Section::Help => Section::Settings,
        }
    }
}

/// Severity of a transient notification line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// A notification with a self-dismiss deadline.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    expires_at: DateTime<Utc>,
}

impl Notice {
    fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            expires_at: Utc::now() + Duration::seconds(NOTICE_DISMISS_SECS),
        }
    }

    fn expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// ============================================================================
// Input Guards
// ============================================================================

/// Whether a character may be appended to the email field.
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && !c.is_control()
}

/// Whether a character may be appended to the password field.
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && !c.is_control()
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub gate: SessionGate,

    // UI state
    pub screen: Screen,
    pub state: AppState,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_remember: bool,
    pub login_focus: LoginFocus,
    pub login_pending: bool,
    pub email_error: Option<&'static str>,
    pub password_error: Option<&'static str>,

    // Dashboard state
    pub current_user: Option<UserInfo>,
    pub section: Section,
    pub login_time: Option<DateTime<Utc>>,
    pub last_access: Option<DateTime<Utc>>,

    // Transient notification
    pub notice: Option<Notice>,
    redirect_at: Option<DateTime<Utc>>,

    // Background login channel
    login_rx: mpsc::Receiver<LoginOutcome>,
    login_tx: mpsc::Sender<LoginOutcome>,
}

impl App {
    /// Create a new application instance.
    ///
    /// The gate is consulted here, before the first frame is ever drawn,
    /// so protected content is never rendered to an unauthenticated
    /// visitor.
    pub fn new() -> Result<Self> {
        debug!("App::new() starting");
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let data_dir = config.data_dir()?;
        debug!(?data_dir, "Session storage configured");
        let store = SessionStore::new(data_dir)?;
        let gate = SessionGate::new(store);

        let mut app = Self::from_parts(config, gate);

        // Prefill email from env or the remembered config value
        app.login_email = std::env::var("LATCHKEY_EMAIL")
            .ok()
            .or_else(|| app.config.last_email.clone())
            .unwrap_or_default();
        app.login_password = std::env::var("LATCHKEY_PASSWORD").unwrap_or_default();
        app.login_focus = if app.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };

        // Decide the starting screen before first paint
        match app.gate.check_session() {
            SessionStatus::Valid(user) => {
                info!(email = %user.email, "Existing session valid, skipping login");
                app.enter_dashboard(user);
            }
            SessionStatus::Expired => {
                app.notice = Some(Notice::new(
                    NoticeKind::Info,
                    "Your session expired. Please sign in again.",
                ));
            }
            SessionStatus::NoSession => {}
        }

        Ok(app)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(config: Config, gate: SessionGate) -> Self {
        Self::from_parts(config, gate)
    }

    fn from_parts(config: Config, gate: SessionGate) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            config,
            gate,

            screen: Screen::Login,
            state: AppState::Normal,

            login_email: String::new(),
            login_password: String::new(),
            login_remember: false,
            login_focus: LoginFocus::Email,
            login_pending: false,
            email_error: None,
            password_error: None,

            current_user: None,
            section: Section::Overview,
            login_time: None,
            last_access: None,

            notice: None,
            redirect_at: None,

            login_rx: rx,
            login_tx: tx,
        }
    }

    // =========================================================================
    // Login flow
    // =========================================================================

    /// Kick off the login attempt as a background task so the form can
    /// render its pending state while the simulated round trip runs.
    /// No-op while an attempt is already pending.
    pub fn submit_login(&mut self) {
        if self.login_pending {
            return;
        }

        self.email_error = None;
        self.password_error = None;
        self.notice = None;
        self.login_pending = true;

        let gate = self.gate.clone();
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();
        let remember = self.login_remember;
        let tx = self.login_tx.clone();

        tokio::spawn(async move {
            let outcome = gate.attempt_login(&email, &password, remember).await;
            if let Err(e) = tx.send(outcome).await {
                warn!(error = %e, "Failed to deliver login outcome - channel closed");
            }
        });
    }

    /// Drain completed login attempts. Called once per loop iteration.
    pub fn poll_login(&mut self) {
        while let Ok(outcome) = self.login_rx.try_recv() {
            self.apply_login_outcome(outcome);
        }
    }

    fn apply_login_outcome(&mut self, outcome: LoginOutcome) {
        self.login_pending = false;

        match outcome {
            LoginOutcome::Success(user) => {
                self.remember_email(&user.email);
                self.login_password.clear();
                self.current_user = Some(user);
                self.notice = Some(Notice::new(
                    NoticeKind::Success,
                    "Signed in! Redirecting...",
                ));
                self.redirect_at = Some(Utc::now() + Duration::seconds(REDIRECT_DELAY_SECS));
            }
            LoginOutcome::InvalidCredentials => {
                // Contract with the login screen: clear and refocus the
                // password input
                self.login_password.clear();
                self.login_focus = LoginFocus::Password;
                self.notice = Some(Notice::new(
                    NoticeKind::Error,
                    "Incorrect email or password",
                ));
            }
            LoginOutcome::ValidationFailure { field, message } => match field {
                Field::Email => {
                    self.email_error = Some(message);
                    self.login_focus = LoginFocus::Email;
                }
                Field::Password => {
                    self.password_error = Some(message);
                    self.login_focus = LoginFocus::Password;
                }
            },
            LoginOutcome::TransientFailure => {
                self.notice = Some(Notice::new(
                    NoticeKind::Error,
                    "Connection error. Please try again.",
                ));
            }
        }
    }

    /// Remember the signed-in email for the next start. Persisting is
    /// compiled out of tests so they never touch the real config dir.
    fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        #[cfg(not(test))]
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    /// Validate the field being left when focus moves on, mirroring the
    /// original form's on-blur checks.
    pub fn validate_on_blur(&mut self, left: LoginFocus) {
        match left {
            LoginFocus::Email => {
                self.email_error = validate_email(self.login_email.trim()).err();
            }
            LoginFocus::Password => {
                self.password_error = validate_password(&self.login_password).err();
            }
            _ => {}
        }
    }

    /// Typing in a field clears its error.
    pub fn clear_field_error(&mut self, field: LoginFocus) {
        match field {
            LoginFocus::Email => self.email_error = None,
            LoginFocus::Password => self.password_error = None,
            _ => {}
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Advance timed state: notice dismissal and the post-login redirect.
    pub fn tick(&mut self) {
        if self.notice.as_ref().is_some_and(Notice::expired) {
            self.notice = None;
        }

        if self.redirect_at.is_some_and(|at| Utc::now() >= at) {
            self.redirect_at = None;
            // Consult the gate again rather than trusting stale UI state
            match self.gate.check_session() {
                SessionStatus::Valid(user) => self.enter_dashboard(user),
                status => {
                    debug!(?status, "Session no longer valid at redirect time");
                    self.leave_dashboard();
                }
            }
        }
    }

    fn enter_dashboard(&mut self, user: UserInfo) {
        let now = Utc::now();
        self.current_user = Some(user);
        self.screen = Screen::Dashboard;
        self.section = Section::Overview;
        self.login_time = Some(now);
        self.last_access = Some(now);
        self.notice = None;
    }

    fn leave_dashboard(&mut self) {
        self.current_user = None;
        self.screen = Screen::Login;
        self.state = AppState::Normal;
        self.login_password.clear();
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
    }

    /// Re-run the session check on dashboard interaction; anything but
    /// `Valid` bounces back to the login screen.
    pub fn refresh_dashboard_session(&mut self) {
        match self.gate.check_session() {
            SessionStatus::Valid(user) => {
                self.current_user = Some(user);
                self.last_access = Some(Utc::now());
            }
            SessionStatus::Expired => {
                self.leave_dashboard();
                self.notice = Some(Notice::new(
                    NoticeKind::Info,
                    "Your session expired. Please sign in again.",
                ));
            }
            SessionStatus::NoSession => {
                self.leave_dashboard();
            }
        }
    }

    // =========================================================================
    // Logout
    // =========================================================================

    pub fn request_logout(&mut self) {
        self.state = AppState::ConfirmingLogout;
    }

    pub fn cancel_logout(&mut self) {
        self.state = AppState::Normal;
    }

    pub fn confirm_logout(&mut self) {
        self.gate.logout();
        self.leave_dashboard();
        self.notice = Some(Notice::new(NoticeKind::Info, "Signed out"));
    }
}
