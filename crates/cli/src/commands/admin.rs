//! Admin allow-list commands.
//!
//! # Usage
//!
//! ```bash
//! # Check whether an email would be let in
//! sm-cli admin check owner@shop.example
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_EMAILS` - Comma-separated admin allow-list, as used by the server

use shelfmark_admin::config::{ConfigError, admin_emails_from_env};
use shelfmark_admin::services::AdminAllowList;

/// Check `email` against the configured allow-list.
///
/// # Errors
///
/// Returns `ConfigError` if `ADMIN_EMAILS` is unset or invalid.
pub fn check(email: &str) -> Result<bool, ConfigError> {
    let allow_list = AdminAllowList::new(admin_emails_from_env()?);
    Ok(check_against(&allow_list, email))
}

/// Check `email` against an explicit allow-list and log the verdict.
#[must_use]
pub fn check_against(allow_list: &AdminAllowList, email: &str) -> bool {
    let is_admin = allow_list.is_admin(email);
    if is_admin {
        tracing::info!(%email, "is an admin");
    } else {
        tracing::warn!(%email, admins = allow_list.admin_count(), "is NOT an admin");
    }
    is_admin
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shelfmark_admin::config::parse_admin_emails;

    #[test]
    fn test_check_against_normalizes_input() {
        let allow_list =
            AdminAllowList::new(parse_admin_emails("owner@shop.example, ops@shop.example").unwrap());

        assert!(check_against(&allow_list, "  OWNER@Shop.Example "));
        assert!(!check_against(&allow_list, "intruder@shop.example"));
        assert!(!check_against(&allow_list, "not an email"));
    }
}
