//! Account credentials supplied by the caller

use serde::Deserialize;
use std::fmt;

/// One account to provision. The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: String,
    pub secret: String,
}

impl Account {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// Local part of an email-style id, or the whole id
    pub fn username(&self) -> &str {
        self.id.split('@').next().unwrap_or(&self.id)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let account = Account::new("jane@example.com", "hunter2");
        let printed = format!("{:?}", account);
        assert!(printed.contains("jane@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_username() {
        assert_eq!(Account::new("jane.doe@example.com", "x").username(), "jane.doe");
        assert_eq!(Account::new("plain", "x").username(), "plain");
    }

    #[test]
    fn test_deserialize_list() {
        let json = r#"[{"id":"a@x.com","secret":"p1"},{"id":"b@x.com","secret":"p2"}]"#;
        let accounts: Vec<Account> = serde_json::from_str(json).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].secret, "p2");
    }
}
