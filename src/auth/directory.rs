//! Fixed demo credential directory.
//!
//! A real deployment would replace this with a hashed-credential lookup
//! behind the same `lookup` contract. The table here is a demo fixture
//! shipped with the binary.

use super::session::UserInfo;

/// A single directory entry: login email, plaintext password (demo only),
/// and the display name shown on the dashboard.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub email: &'static str,
    pub password: &'static str,
    pub name: &'static str,
}

impl CredentialRecord {
    /// Public fields of this record, suitable for storing in a session.
    /// Never includes the password.
    pub fn user(&self) -> UserInfo {
        UserInfo {
            email: self.email.to_string(),
            name: self.name.to_string(),
        }
    }
}

/// Static table of demo accounts. Emails are unique within the table.
pub struct CredentialDirectory {
    records: Vec<CredentialRecord>,
}

impl CredentialDirectory {
    /// The built-in demo accounts.
    pub fn builtin() -> Self {
        Self {
            records: vec![
                CredentialRecord {
                    email: "admin@test.com",
                    password: "admin123",
                    name: "Administrator",
                },
                CredentialRecord {
                    email: "user@test.com",
                    password: "user123",
                    name: "Test User",
                },
                CredentialRecord {
                    email: "dante@test.com",
                    password: "dante123",
                    name: "Dante",
                },
            ],
        }
    }

    /// Find the first record matching the given credentials.
    ///
    /// Email comparison is case-insensitive; the password must match
    /// exactly. Absence of a match is a normal outcome, not an error.
    pub fn lookup(&self, email: &str, password: &str) -> Option<&CredentialRecord> {
        self.records
            .iter()
            .find(|r| r.email.eq_ignore_ascii_case(email) && r.password == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_pair() {
        let dir = CredentialDirectory::builtin();
        let record = dir.lookup("admin@test.com", "admin123").unwrap();
        assert_eq!(record.name, "Administrator");
    }

    #[test]
    fn test_lookup_email_case_insensitive() {
        let dir = CredentialDirectory::builtin();
        assert!(dir.lookup("ADMIN@TEST.COM", "admin123").is_some());
        assert!(dir.lookup("Admin@Test.Com", "admin123").is_some());
    }

    #[test]
    fn test_lookup_password_case_sensitive() {
        let dir = CredentialDirectory::builtin();
        assert!(dir.lookup("admin@test.com", "ADMIN123").is_none());
    }

    #[test]
    fn test_lookup_unknown_pair() {
        let dir = CredentialDirectory::builtin();
        assert!(dir.lookup("nobody@test.com", "admin123").is_none());
        assert!(dir.lookup("admin@test.com", "wrong").is_none());
        assert!(dir.lookup("", "").is_none());
    }

    #[test]
    fn test_user_omits_password() {
        let dir = CredentialDirectory::builtin();
        let user = dir.lookup("dante@test.com", "dante123").unwrap().user();
        assert_eq!(user.email, "dante@test.com");
        assert_eq!(user.name, "Dante");
        // The serialized shape carries only the public fields
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_emails_unique() {
        let dir = CredentialDirectory::builtin();
        let mut emails: Vec<_> = dir.records.iter().map(|r| r.email.to_lowercase()).collect();
        emails.sort();
        emails.dedup();
        assert_eq!(emails.len(), dir.records.len());
    }
}
