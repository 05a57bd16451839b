use std::env;

use crate::host::Role;

/// Moderation, notification and review-gate knobs.
///
/// Every field has a conservative default so the crate works with an empty
/// environment; hosts override per deployment.
#[derive(Debug, Clone)]
pub struct IssuesConfig {
    /// Distinct non-privileged reports tolerated before an entity is hidden.
    /// `None` disables strike-based hiding entirely.
    pub max_strikes: Option<u32>,
    /// When on, datasets with open issues are flipped private.
    pub review_system: bool,
    /// Notify organization members on issue lifecycle events.
    pub notify_admin: bool,
    /// Notify the dataset contact on issue lifecycle events.
    pub notify_owner: bool,
    /// Minimum capacity an organization member needs to be notified.
    pub min_role_required: Role,
    /// Master switch for outbound issue email.
    pub send_email_notifications: bool,
    /// Account the spam screener files reports as.
    pub site_user_id: String,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            max_strikes: Some(2),
            review_system: false,
            notify_admin: false,
            notify_owner: false,
            min_role_required: Role::Admin,
            send_email_notifications: false,
            site_user_id: "default".to_string(),
        }
    }
}

impl IssuesConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_strikes: env::var("ISSUES_MAX_STRIKES")
                .ok()
                .map(|s| s.parse().ok())
                .unwrap_or(defaults.max_strikes),
            review_system: env_bool("ISSUES_REVIEW_SYSTEM", defaults.review_system),
            notify_admin: env_bool("ISSUES_NOTIFY_ADMIN", defaults.notify_admin),
            notify_owner: env_bool("ISSUES_NOTIFY_OWNER", defaults.notify_owner),
            min_role_required: env::var("ISSUES_MIN_ROLE_REQUIRED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_role_required),
            send_email_notifications: env_bool(
                "ISSUES_SEND_EMAIL_NOTIFICATIONS",
                defaults.send_email_notifications,
            ),
            site_user_id: env::var("ISSUES_SITE_USER")
                .unwrap_or(defaults.site_user_id),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_quiet() {
        let config = IssuesConfig::default();
        assert!(!config.review_system);
        assert!(!config.send_email_notifications);
        assert_eq!(config.max_strikes, Some(2));
        assert_eq!(config.min_role_required, Role::Admin);
    }

}
