//! Admin email allow-list.

use std::collections::HashSet;
use std::sync::Arc;

use shelfmark_core::Email;

/// Immutable set of admin emails, normalized (trimmed, lowercase).
///
/// Built once at startup from configuration and shared read-only.
#[derive(Debug, Clone)]
pub struct AdminAllowList {
    emails: Arc<HashSet<Email>>,
}

impl AdminAllowList {
    /// Build an allow-list from already-normalized emails.
    #[must_use]
    pub fn new(emails: impl IntoIterator<Item = Email>) -> Self {
        Self {
            emails: Arc::new(emails.into_iter().collect()),
        }
    }

    /// Whether `email` belongs to an admin.
    ///
    /// Case-insensitive and whitespace-tolerant. Input that does not parse as
    /// an email is never an admin.
    #[must_use]
    pub fn is_admin(&self, email: &str) -> bool {
        Email::parse(email).is_ok_and(|email| self.emails.contains(&email))
    }

    /// Number of admin emails.
    #[must_use]
    pub fn admin_count(&self) -> usize {
        self.emails.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn allow_list() -> AdminAllowList {
        AdminAllowList::new([
            Email::parse("owner@shop.example").unwrap(),
            Email::parse("Ops@Shop.Example").unwrap(),
        ])
    }

    #[test]
    fn test_is_admin_exact_match() {
        assert!(allow_list().is_admin("owner@shop.example"));
    }

    #[test]
    fn test_is_admin_ignores_case_and_whitespace() {
        let list = allow_list();
        assert!(list.is_admin("  OWNER@Shop.example "));
        assert!(list.is_admin("ops@shop.example"));
    }

    #[test]
    fn test_is_admin_rejects_others() {
        let list = allow_list();
        assert!(!list.is_admin("intruder@shop.example"));
        assert!(!list.is_admin(""));
        assert!(!list.is_admin("owner"));
    }
}
