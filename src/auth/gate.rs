//! The session gate: the one component that decides whether a visitor is
//! signed in, issues and expires session records, and owns the redirect
//! decision consumed by both screens.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use super::directory::CredentialDirectory;
use super::session::{SessionRecord, UserInfo};
use super::store::{Durability, SessionStore};

/// Minimum password length accepted by the form.
const MIN_PASSWORD_LEN: usize = 6;

/// Simulated network round trip window in milliseconds.
/// There is no real backend; the delay exists so the UI exercises its
/// pending state the way it would against a remote service.
const ROUND_TRIP_MIN_MS: u64 = 1000;
const ROUND_TRIP_MAX_MS: u64 = 2000;

/// Which form field failed syntactic validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Credentials matched; a session record has been issued.
    Success(UserInfo),
    /// No directory match. The caller should clear and refocus the
    /// password field.
    InvalidCredentials,
    /// A field failed validation before the directory was consulted.
    ValidationFailure { field: Field, message: &'static str },
    /// The (simulated) round trip was rejected; worth retrying.
    TransientFailure,
}

/// Read-time classification of whatever session is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Valid(UserInfo),
    Expired,
    NoSession,
}

/// Timing and failure policy for the simulated round trip.
#[derive(Debug, Clone, Copy)]
pub struct RoundTrip {
    min_ms: u64,
    max_ms: u64,
    reject_probability: f64,
}

impl Default for RoundTrip {
    fn default() -> Self {
        Self {
            min_ms: ROUND_TRIP_MIN_MS,
            max_ms: ROUND_TRIP_MAX_MS,
            reject_probability: 0.0,
        }
    }
}

impl RoundTrip {
    /// No delay, never rejects. For tests.
    pub fn instant() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
            reject_probability: 0.0,
        }
    }

    /// No delay, always rejects. For tests.
    pub fn rejecting() -> Self {
        Self {
            reject_probability: 1.0,
            ..Self::instant()
        }
    }

    async fn run(&self) -> Result<(), ()> {
        let (delay_ms, rejected) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(self.min_ms..=self.max_ms),
                rng.gen_bool(self.reject_probability),
            )
        };
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if rejected {
            Err(())
        } else {
            Ok(())
        }
    }
}

/// Syntactic email check: one `@`, a non-empty local part, a domain
/// containing an interior dot, no whitespace.
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("Email is required");
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format");
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err("Invalid email format"),
    }
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        Err("Password is required")
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        Err("Password must be at least 6 characters")
    } else {
        Ok(())
    }
}

/// The gate itself. Construct one per process and hand references (or
/// cheap clones, which share storage) to the UI layer.
#[derive(Clone)]
pub struct SessionGate {
    directory: Arc<CredentialDirectory>,
    store: SessionStore,
    round_trip: RoundTrip,
}

impl SessionGate {
    pub fn new(store: SessionStore) -> Self {
        Self {
            directory: Arc::new(CredentialDirectory::builtin()),
            store,
            round_trip: RoundTrip::default(),
        }
    }

    pub fn with_round_trip(mut self, round_trip: RoundTrip) -> Self {
        self.round_trip = round_trip;
        self
    }

    /// Validate, make the simulated round trip, look up the credentials,
    /// and on a match issue a session record into the tier chosen by
    /// `remember`.
    ///
    /// The caller must treat the gate as busy until this resolves. A
    /// second overlapping attempt is not supported input, but it cannot
    /// corrupt state: the store applies writes atomically per tier and
    /// the later write wins.
    pub async fn attempt_login(&self, email: &str, password: &str, remember: bool) -> LoginOutcome {
        if let Err(message) = validate_email(email) {
            return LoginOutcome::ValidationFailure {
                field: Field::Email,
                message,
            };
        }
        if let Err(message) = validate_password(password) {
            return LoginOutcome::ValidationFailure {
                field: Field::Password,
                message,
            };
        }

        if self.round_trip.run().await.is_err() {
            warn!("Simulated round trip rejected");
            return LoginOutcome::TransientFailure;
        }

        let Some(record) = self.directory.lookup(email, password) else {
            info!("Login rejected: no directory match");
            return LoginOutcome::InvalidCredentials;
        };

        let user = record.user();
        let session = SessionRecord::issue(user.clone());
        let durability = if remember {
            Durability::Durable
        } else {
            Durability::Ephemeral
        };

        if let Err(e) = self.store.write(&session, durability) {
            warn!(error = %e, "Failed to persist session");
            return LoginOutcome::TransientFailure;
        }
        if let Err(e) = self.store.cache_user(&user) {
            warn!(error = %e, "Failed to cache user");
        }

        info!(email = %user.email, "Login successful");
        LoginOutcome::Success(user)
    }

    /// Classify the stored session, if any. Detecting an expired record
    /// erases both tiers as a side effect; a valid one refreshes the
    /// cached user so the dashboard reads a consistent view.
    pub fn check_session(&self) -> SessionStatus {
        match self.store.read() {
            None => SessionStatus::NoSession,
            Some((record, tier)) => {
                if record.is_expired() {
                    debug!(?tier, "Stored session expired, clearing");
                    self.store.clear();
                    SessionStatus::Expired
                } else {
                    if let Err(e) = self.store.cache_user(&record.user) {
                        warn!(error = %e, "Failed to cache user");
                    }
                    SessionStatus::Valid(record.user)
                }
            }
        }
    }

    /// Erase the session from both tiers and the cached user. Always
    /// succeeds; calling it signed-out is a no-op.
    pub fn logout(&self) {
        self.store.clear();
        info!("Signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use tempfile::TempDir;

    fn test_gate() -> (SessionGate, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().to_path_buf()).unwrap();
        let gate = SessionGate::new(store).with_round_trip(RoundTrip::instant());
        (gate, temp)
    }

    #[tokio::test]
    async fn test_unknown_credentials_never_authenticate() {
        let (gate, _temp) = test_gate();
        let outcome = gate.attempt_login("nobody@test.com", "hunter2x", false).await;
        assert_eq!(outcome, LoginOutcome::InvalidCredentials);
        assert_eq!(gate.check_session(), SessionStatus::NoSession);
    }

    #[tokio::test]
    async fn test_known_credentials_issue_session() {
        let (gate, _temp) = test_gate();
        let outcome = gate.attempt_login("admin@test.com", "admin123", true).await;
        match outcome {
            LoginOutcome::Success(user) => assert_eq!(user.name, "Administrator"),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remembered_login_roundtrip() {
        let (gate, _temp) = test_gate();
        gate.attempt_login("user@test.com", "user123", true).await;

        match gate.check_session() {
            SessionStatus::Valid(user) => {
                assert_eq!(user.email, "user@test.com");
                assert_eq!(user.name, "Test User");
            }
            other => panic!("expected valid session, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validation_failures_name_the_field() {
        let (gate, _temp) = test_gate();

        let outcome = gate.attempt_login("not-an-email", "admin123", false).await;
        assert!(matches!(
            outcome,
            LoginOutcome::ValidationFailure { field: Field::Email, .. }
        ));

        let outcome = gate.attempt_login("admin@test.com", "abc", false).await;
        assert!(matches!(
            outcome,
            LoginOutcome::ValidationFailure { field: Field::Password, .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_fields_have_distinct_messages() {
        let (gate, _temp) = test_gate();

        match gate.attempt_login("", "admin123", false).await {
            LoginOutcome::ValidationFailure { field, message } => {
                assert_eq!(field, Field::Email);
                assert_eq!(message, "Email is required");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }

        match gate.attempt_login("admin@test.com", "", false).await {
            LoginOutcome::ValidationFailure { field, message } => {
                assert_eq!(field, Field::Password);
                assert_eq!(message, "Password is required");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (gate, _temp) = test_gate();
        gate.attempt_login("admin@test.com", "admin123", true).await;

        gate.logout();
        gate.logout();

        assert_eq!(gate.check_session(), SessionStatus::NoSession);
    }

    #[tokio::test]
    async fn test_expired_session_is_cleared_lazily() {
        let (gate, temp) = test_gate();
        let store = SessionStore::new(temp.path().to_path_buf()).unwrap();

        let stale = SessionRecord {
            user: UserInfo {
                email: "admin@test.com".to_string(),
                name: "Administrator".to_string(),
            },
            timestamp: (Utc::now() - ChronoDuration::hours(24) - ChronoDuration::milliseconds(1))
                .timestamp_millis(),
        };
        store
            .write_raw_for_test(Durability::Durable, "authToken", &serde_json::to_string(&stale).unwrap());

        assert_eq!(gate.check_session(), SessionStatus::Expired);
        // Lazy cleanup: the second check sees nothing at all
        assert_eq!(gate.check_session(), SessionStatus::NoSession);
    }

    #[tokio::test]
    async fn test_session_just_under_expiry_is_valid() {
        let (gate, temp) = test_gate();
        let store = SessionStore::new(temp.path().to_path_buf()).unwrap();

        let fresh_enough = SessionRecord {
            user: UserInfo {
                email: "user@test.com".to_string(),
                name: "Test User".to_string(),
            },
            timestamp: (Utc::now() - ChronoDuration::hours(23) - ChronoDuration::minutes(59))
                .timestamp_millis(),
        };
        store.write_raw_for_test(
            Durability::Durable,
            "authToken",
            &serde_json::to_string(&fresh_enough).unwrap(),
        );

        assert!(matches!(gate.check_session(), SessionStatus::Valid(_)));
    }

    #[tokio::test]
    async fn test_malformed_token_reads_as_no_session() {
        let (gate, temp) = test_gate();
        let store = SessionStore::new(temp.path().to_path_buf()).unwrap();
        store.write_raw_for_test(Durability::Durable, "authToken", "{\"user\":42}");

        assert_eq!(gate.check_session(), SessionStatus::NoSession);
        assert!(!temp.path().join("authToken.json").exists());
    }

    #[tokio::test]
    async fn test_rejected_round_trip_leaves_no_session() {
        let (gate, _temp) = test_gate();
        let gate = gate.with_round_trip(RoundTrip::rejecting());

        let outcome = gate.attempt_login("admin@test.com", "admin123", true).await;
        assert_eq!(outcome, LoginOutcome::TransientFailure);
        assert_eq!(gate.check_session(), SessionStatus::NoSession);
    }

    #[tokio::test]
    async fn test_relogin_switches_tier_cleanly() {
        let (gate, temp) = test_gate();

        gate.attempt_login("admin@test.com", "admin123", true).await;
        gate.attempt_login("user@test.com", "user123", false).await;

        // Only the ephemeral tier is populated; no durable file drifts
        assert!(!temp.path().join("authToken.json").exists());
        match gate.check_session() {
            SessionStatus::Valid(user) => assert_eq!(user.email, "user@test.com"),
            other => panic!("expected valid session, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overlapping_attempts_last_write_wins() {
        let (gate, _temp) = test_gate();

        let first = gate.clone();
        let second = gate.clone();
        let a = tokio::spawn(async move { first.attempt_login("admin@test.com", "admin123", false).await });
        let b = tokio::spawn(async move { second.attempt_login("user@test.com", "user123", false).await });

        assert!(matches!(a.await.unwrap(), LoginOutcome::Success(_)));
        assert!(matches!(b.await.unwrap(), LoginOutcome::Success(_)));

        // One of the two sessions survives intact; no panic, no torn state
        match gate.check_session() {
            SessionStatus::Valid(user) => {
                assert!(user.email == "admin@test.com" || user.email == "user@test.com");
            }
            other => panic!("expected valid session, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@test.com").is_ok());
        assert!(validate_email("a@b.co").is_ok());

        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
        assert!(validate_email("@test.com").is_err());
        assert!(validate_email("user@test").is_err());
        assert!(validate_email("user@.com").is_err());
        assert!(validate_email("user@test.").is_err());
        assert!(validate_email("us er@test.com").is_err());
        assert!(validate_email("user@@test.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("abcdef").is_ok());
        assert!(validate_password("admin123").is_ok());

        assert!(validate_password("").is_err());
        assert!(validate_password("abcde").is_err());
    }
}
