use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Session lifetime in hours.
/// A stored record older than this is treated as expired on read.
const SESSION_MAX_AGE_HOURS: i64 = 24;

/// Public identity of a signed-in user. This is the only user data a
/// session ever carries; the password never leaves the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub name: String,
}

/// The stored proof-of-login: who signed in and when.
///
/// The timestamp is kept as epoch milliseconds to match the persisted
/// `authToken` layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user: UserInfo,
    pub timestamp: i64,
}

impl SessionRecord {
    /// Issue a new record for `user`, stamped with the current instant.
    pub fn issue(user: UserInfo) -> Self {
        Self {
            user,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// A record is valid iff `now - timestamp < 24h`. A timestamp that
    /// does not map to a real instant counts as expired.
    pub fn is_expired(&self) -> bool {
        match self.issued_at() {
            Some(issued) => Utc::now() - issued >= Duration::hours(SESSION_MAX_AGE_HOURS),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_aged(age: Duration) -> SessionRecord {
        SessionRecord {
            user: UserInfo {
                email: "user@test.com".to_string(),
                name: "Test User".to_string(),
            },
            timestamp: (Utc::now() - age).timestamp_millis(),
        }
    }

    #[test]
    fn test_fresh_record_not_expired() {
        let record = SessionRecord::issue(UserInfo {
            email: "user@test.com".to_string(),
            name: "Test User".to_string(),
        });
        assert!(!record.is_expired());
    }

    #[test]
    fn test_expiry_boundary() {
        let just_over = record_aged(Duration::hours(24) + Duration::milliseconds(1));
        assert!(just_over.is_expired());

        let just_under = record_aged(Duration::hours(23) + Duration::minutes(59));
        assert!(!just_under.is_expired());
    }

    #[test]
    fn test_wire_shape() {
        let record = record_aged(Duration::zero());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["user"]["email"].is_string());
        assert!(json["user"]["name"].is_string());
        assert!(json["timestamp"].is_i64());
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
