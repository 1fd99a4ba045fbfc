//! Type definitions for cloud credentials and validation outcomes.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Result of one access token validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationOutcome {
    /// The cloud service accepted the token.
    Success,
    /// No token is stored.
    NoToken,
    /// The stored validity instant has passed.
    Expired,
    /// The cloud service rejected the token.
    Invalid,
    /// The cloud host is unreachable and so is the network.
    Offline,
    /// Anything else went wrong.
    UnknownError,
}

impl ValidationOutcome {
    /// Reason tag passed to the desktop UI on the unauthenticated channel.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoToken => "NO_ACCESS_TOKEN",
            Self::Expired => "ACCESS_TOKEN_EXPIRED",
            Self::Invalid => "INVALID",
            Self::Offline => "OFFLINE",
            Self::Success | Self::UnknownError => "",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::NoToken => "no_token",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
            Self::Offline => "offline",
            Self::UnknownError => "unknown_error",
        };
        f.write_str(s)
    }
}

/// Credentials delivered by the browser sign-in page to the local listener.
#[derive(Debug)]
pub struct TokenGrant {
    token: SecretString,
    /// Expiry instant as epoch seconds, as sent by the cloud service.
    pub validity: Option<String>,
    pub user_id: Option<String>,
    websocket_token: Option<SecretString>,
}

impl TokenGrant {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            validity: None,
            user_id: None,
            websocket_token: None,
        }
    }

    pub fn with_validity(mut self, validity: Option<String>) -> Self {
        self.validity = validity;
        self
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_websocket_token(mut self, websocket_token: Option<String>) -> Self {
        self.websocket_token = websocket_token.map(SecretString::from);
        self
    }

    /// Get the access token (exposes the secret - use sparingly).
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn websocket_token(&self) -> Option<&str> {
        self.websocket_token.as_ref().map(|s| s.expose_secret())
    }
}

impl Clone for TokenGrant {
    fn clone(&self) -> Self {
        Self::new(self.token())
            .with_validity(self.validity.clone())
            .with_user_id(self.user_id.clone())
            .with_websocket_token(self.websocket_token().map(str::to_string))
    }
}

/// Cloud session settings held by a [`crate::SettingsStore`].
#[derive(Debug, Default)]
pub struct CloudSettings {
    auth_token: Option<SecretString>,
    /// Expiry instant as epoch seconds, kept as the string the service sent.
    pub validity: Option<String>,
    pub user_id: Option<String>,
    websocket_token: Option<SecretString>,
}

impl CloudSettings {
    pub fn from_grant(grant: &TokenGrant) -> Self {
        Self {
            auth_token: Some(SecretString::from(grant.token().to_string())),
            validity: grant.validity.clone(),
            user_id: grant.user_id.clone(),
            websocket_token: grant
                .websocket_token()
                .map(|s| SecretString::from(s.to_string())),
        }
    }

    /// Build settings from a bare token and expiry instant.
    pub fn with_token(token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            auth_token: Some(SecretString::from(token.into())),
            validity: Some(expires_at.to_string()),
            user_id: None,
            websocket_token: None,
        }
    }

    /// Get the stored token, if any (exposes the secret - use sparingly).
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_ref().map(|s| s.expose_secret())
    }

    pub fn websocket_token(&self) -> Option<&str> {
        self.websocket_token.as_ref().map(|s| s.expose_secret())
    }

    /// True when a non-empty token is stored.
    pub fn has_token(&self) -> bool {
        self.auth_token().is_some_and(|t| !t.is_empty())
    }

    /// Expiry instant in epoch seconds. Missing or unparsable validity is 0.
    pub fn expires_at(&self) -> i64 {
        self.validity
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0)
    }

    /// Expired when the validity instant is at or before `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at() <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Time left until expiry, or `None` once expired.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.time_until_expiry_at(chrono::Utc::now().timestamp())
    }

    /// Time left as of `now` (epoch seconds). Saturates instead of overflowing.
    pub fn time_until_expiry_at(&self, now: i64) -> Option<Duration> {
        let remaining = self.expires_at().saturating_sub(now);
        u64::try_from(remaining)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Outcome that can be decided without the network, if any.
    pub fn local_outcome_at(&self, now: i64) -> Option<ValidationOutcome> {
        if !self.has_token() {
            Some(ValidationOutcome::NoToken)
        } else if self.is_expired_at(now) {
            Some(ValidationOutcome::Expired)
        } else {
            None
        }
    }

    pub(crate) fn to_stored(&self) -> StoredSettings {
        StoredSettings {
            auth_token: self.auth_token().map(str::to_string),
            validity: self.validity.clone(),
            user_id: self.user_id.clone(),
            websocket_token: self.websocket_token().map(str::to_string),
        }
    }

    pub(crate) fn from_stored(stored: StoredSettings) -> Self {
        Self {
            auth_token: stored.auth_token.map(SecretString::from),
            validity: stored.validity,
            user_id: stored.user_id,
            websocket_token: stored.websocket_token.map(SecretString::from),
        }
    }
}

/// On-disk settings format. Keys match the desktop application's option names.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket_token: Option<String>,
}

/// Format a remaining duration as `2h 5m` or `42m`.
pub fn format_remaining(remaining: Duration) -> String {
    let total_minutes = remaining.as_secs() / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_reasons() {
        assert_eq!(ValidationOutcome::NoToken.reason(), "NO_ACCESS_TOKEN");
        assert_eq!(ValidationOutcome::Expired.reason(), "ACCESS_TOKEN_EXPIRED");
        assert_eq!(ValidationOutcome::Invalid.reason(), "INVALID");
        assert_eq!(ValidationOutcome::Offline.reason(), "OFFLINE");
        assert_eq!(ValidationOutcome::UnknownError.reason(), "");
        assert!(ValidationOutcome::Success.is_success());
        assert!(!ValidationOutcome::Invalid.is_success());
    }

    #[test]
    fn test_expiry_boundary() {
        let settings = CloudSettings::with_token("tok", 1_000);
        assert!(settings.is_expired_at(1_000));
        assert!(settings.is_expired_at(1_001));
        assert!(!settings.is_expired_at(999));
    }

    #[test]
    fn test_unparsable_validity_counts_as_epoch_zero() {
        let mut settings = CloudSettings::with_token("tok", 0);
        settings.validity = Some("tomorrow".to_string());
        assert_eq!(settings.expires_at(), 0);
        assert!(settings.is_expired());

        settings.validity = None;
        assert!(settings.is_expired());
        assert!(settings.time_until_expiry().is_none());
    }

    #[test]
    fn test_extreme_validity_does_not_overflow() {
        let mut settings = CloudSettings::with_token("tok", 0);
        settings.validity = Some(i64::MIN.to_string());
        assert!(settings.is_expired());
        assert!(settings.time_until_expiry().is_none());
        assert!(settings.time_until_expiry_at(i64::MAX).is_none());
        assert!(settings.time_until_expiry_at(1_700_000_000).is_none());

        settings.validity = Some(i64::MAX.to_string());
        assert_eq!(
            settings.time_until_expiry_at(i64::MIN),
            Some(Duration::from_secs(i64::MAX as u64))
        );
        assert_eq!(
            settings.time_until_expiry_at(0),
            Some(Duration::from_secs(i64::MAX as u64))
        );
        assert!(settings.time_until_expiry().is_some());
    }

    #[test]
    fn test_local_outcome_at() {
        let now = 1_700_000_000;
        assert_eq!(
            CloudSettings::default().local_outcome_at(now),
            Some(ValidationOutcome::NoToken)
        );
        assert_eq!(
            CloudSettings::with_token("", now + 60).local_outcome_at(now),
            Some(ValidationOutcome::NoToken)
        );
        assert_eq!(
            CloudSettings::with_token("tok", now).local_outcome_at(now),
            Some(ValidationOutcome::Expired)
        );
        assert_eq!(
            CloudSettings::with_token("tok", now + 1).local_outcome_at(now),
            None
        );
    }

    #[test]
    fn test_empty_token_is_not_a_token() {
        let settings = CloudSettings::with_token("", i64::MAX);
        assert!(!settings.has_token());
        assert!(!CloudSettings::default().has_token());
    }

    #[test]
    fn test_settings_from_grant() {
        let grant = TokenGrant::new("abc")
            .with_validity(Some("1700000000".to_string()))
            .with_user_id(Some("alice".to_string()))
            .with_websocket_token(Some("ws".to_string()));
        let settings = CloudSettings::from_grant(&grant);
        assert_eq!(settings.auth_token(), Some("abc"));
        assert_eq!(settings.expires_at(), 1_700_000_000);
        assert_eq!(settings.user_id.as_deref(), Some("alice"));
        assert_eq!(settings.websocket_token(), Some("ws"));
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let grant = TokenGrant::new("super-secret-token");
        assert!(!format!("{grant:?}").contains("super-secret-token"));
        let settings = CloudSettings::from_grant(&grant);
        assert!(!format!("{settings:?}").contains("super-secret-token"));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::from_secs(2 * 3600 + 5 * 60 + 30)), "2h 5m");
        assert_eq!(format_remaining(Duration::from_secs(42 * 60)), "42m");
        assert_eq!(format_remaining(Duration::from_secs(59)), "0m");
    }
}
