//! Access token validation.
//!
//! Missing and expired tokens are decided locally. Otherwise exactly one
//! `GET /access-token/check` is issued and the status code decides. Errors
//! never escape: they are logged and reported as an outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::{Context as _, Result};
use reqwest::StatusCode;
use tokio::task::JoinHandle;

use gpcloud_common::{CloudConfig, create_client_with_timeouts};

use crate::constants::ACCESS_TOKEN_CHECK_PATH;
use crate::probe::{NetworkProbe, TcpNetworkProbe};
use crate::settings::SettingsStore;
use crate::types::{CloudSettings, ValidationOutcome};

/// Decides whether the stored cloud session is usable.
pub struct TokenValidator {
    store: Arc<dyn SettingsStore>,
    probe: Arc<dyn NetworkProbe>,
    client: reqwest::Client,
    check_url: String,
}

impl TokenValidator {
    pub fn new(
        cloud_host: &str,
        store: Arc<dyn SettingsStore>,
        probe: Arc<dyn NetworkProbe>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            store,
            probe,
            client,
            check_url: format!(
                "{}{}",
                cloud_host.trim_end_matches('/'),
                ACCESS_TOKEN_CHECK_PATH
            ),
        }
    }

    /// Build a validator with the configured host, timeouts and probe addresses.
    pub fn from_config(config: &CloudConfig, store: Arc<dyn SettingsStore>) -> Result<Self> {
        let client =
            create_client_with_timeouts(config.request_timeout(), config.connect_timeout())
                .map_err(anyhow::Error::msg)
                .context("Failed to create HTTP client for token check")?;
        let probe = Arc::new(TcpNetworkProbe::new(config.probe_addresses.clone()));
        Ok(Self::new(&config.cloud_host, store, probe, client))
    }

    pub fn check_url(&self) -> &str {
        &self.check_url
    }

    /// Validate the stored token.
    pub async fn validate(&self) -> ValidationOutcome {
        self.validate_at(chrono::Utc::now().timestamp()).await
    }

    /// Validate the stored token as of `now` (epoch seconds).
    pub async fn validate_at(&self, now: i64) -> ValidationOutcome {
        let settings = match self.store.load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load cloud settings");
                return ValidationOutcome::UnknownError;
            }
        };

        if let Some(outcome) = settings.local_outcome_at(now) {
            tracing::debug!(
                outcome = %outcome,
                expires_at = settings.expires_at(),
                now,
                "Token check decided locally"
            );
            return outcome;
        }

        self.remote_check(&settings).await
    }

    /// Time left on the stored token, or `None` when missing or expired.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        match self.store.load() {
            Ok(settings) if settings.has_token() => settings.time_until_expiry(),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load cloud settings");
                None
            }
        }
    }

    async fn remote_check(&self, settings: &CloudSettings) -> ValidationOutcome {
        let token = settings.auth_token().unwrap_or_default();
        let request = match settings.user_id.as_deref() {
            Some(user_id) if !user_id.is_empty() => {
                self.client.get(&self.check_url).basic_auth(user_id, Some(token))
            }
            _ => self.client.get(&self.check_url).bearer_auth(token),
        };

        match request.send().await {
            Ok(resp) => {
                let status = resp.status();
                tracing::debug!(status = %status, "Access token check answered");
                match status {
                    StatusCode::OK => ValidationOutcome::Success,
                    StatusCode::UNAUTHORIZED => ValidationOutcome::Invalid,
                    _ => {
                        tracing::warn!(status = %status, "Unexpected status from token check");
                        ValidationOutcome::Invalid
                    }
                }
            }
            Err(e) if e.is_connect() => {
                if self.probe.is_network_available().await {
                    tracing::warn!(error = %e, url = %self.check_url, "Cloud host unreachable");
                    ValidationOutcome::UnknownError
                } else {
                    tracing::info!("Network unavailable, working offline");
                    ValidationOutcome::Offline
                }
            }
            Err(e) => {
                tracing::error!(error = %e, url = %self.check_url, "Failed to contact cloud server");
                ValidationOutcome::UnknownError
            }
        }
    }

    /// Run the check on a background task.
    ///
    /// Every call starts an independent check; nothing is de-duplicated.
    pub fn check_access(self: &Arc<Self>) -> AccessCheck {
        let validator = Arc::clone(self);
        AccessCheck {
            handle: tokio::spawn(async move { validator.validate().await }),
        }
    }

    /// Run the check in the background and report through two callbacks.
    ///
    /// `on_unauthenticated` receives every outcome other than `Success`.
    pub fn check_access_with<S, U>(
        self: &Arc<Self>,
        on_success: S,
        on_unauthenticated: U,
    ) -> JoinHandle<()>
    where
        S: FnOnce() + Send + 'static,
        U: FnOnce(ValidationOutcome) + Send + 'static,
    {
        let check = self.check_access();
        tokio::spawn(async move {
            match check.await {
                ValidationOutcome::Success => on_success(),
                outcome => on_unauthenticated(outcome),
            }
        })
    }
}

/// Handle to a background token check. Resolves to its outcome.
pub struct AccessCheck {
    handle: JoinHandle<ValidationOutcome>,
}

impl AccessCheck {
    /// Cancel the check. Awaiting it afterwards yields `UnknownError`.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Future for AccessCheck {
    type Output = ValidationOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| {
            joined.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Token check task failed");
                ValidationOutcome::UnknownError
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemorySettingsStore, SettingsError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NOW: i64 = 1_700_000_000;

    struct FixedProbe {
        available: bool,
        calls: AtomicUsize,
    }

    impl FixedProbe {
        fn new(available: bool) -> Arc<Self> {
            Arc::new(Self {
                available,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NetworkProbe for FixedProbe {
        async fn is_network_available(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.available
        }
    }

    struct BrokenStore;

    impl SettingsStore for BrokenStore {
        fn load(&self) -> Result<CloudSettings, SettingsError> {
            Err(SettingsError::Io {
                path: "cloud-auth.json".into(),
                source: std::io::Error::other("disk on fire"),
            })
        }

        fn save(&self, _settings: &CloudSettings) -> Result<(), SettingsError> {
            Ok(())
        }

        fn clear(&self) -> Result<bool, SettingsError> {
            Ok(false)
        }
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn validator(host: &str, settings: CloudSettings, probe: Arc<FixedProbe>) -> TokenValidator {
        let store = Arc::new(MemorySettingsStore::with_settings(&settings));
        TokenValidator::new(host, store, probe, client())
    }

    async fn mock_check(server: &MockServer, status: u16, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/access-token/check"))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn closed_port_host() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    #[tokio::test]
    async fn test_no_token_skips_network() {
        let server = MockServer::start().await;
        mock_check(&server, 200, 0).await;

        for settings in [
            CloudSettings::default(),
            CloudSettings::with_token("", NOW + 3600),
        ] {
            let v = validator(&server.uri(), settings, FixedProbe::new(true));
            assert_eq!(v.validate_at(NOW).await, ValidationOutcome::NoToken);
        }
    }

    #[tokio::test]
    async fn test_expired_token_skips_network() {
        let server = MockServer::start().await;
        mock_check(&server, 200, 0).await;

        for expires_at in [NOW, NOW - 1, 0] {
            let v = validator(
                &server.uri(),
                CloudSettings::with_token("tok", expires_at),
                FixedProbe::new(true),
            );
            assert_eq!(v.validate_at(NOW).await, ValidationOutcome::Expired);
        }
    }

    #[tokio::test]
    async fn test_ok_status_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/access-token/check"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let v = validator(
            &server.uri(),
            CloudSettings::with_token("tok", NOW + 3600),
            FixedProbe::new(true),
        );
        assert_eq!(v.validate_at(NOW).await, ValidationOutcome::Success);
    }

    #[tokio::test]
    async fn test_basic_auth_when_user_id_stored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/access-token/check"))
            // base64("alice:secret")
            .and(header("authorization", "Basic YWxpY2U6c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = CloudSettings::with_token("secret", NOW + 60);
        settings.user_id = Some("alice".to_string());
        let v = validator(&server.uri(), settings, FixedProbe::new(true));
        assert_eq!(v.validate_at(NOW).await, ValidationOutcome::Success);
    }

    #[tokio::test]
    async fn test_unauthorized_is_invalid() {
        let server = MockServer::start().await;
        mock_check(&server, 401, 1).await;

        let v = validator(
            &server.uri(),
            CloudSettings::with_token("tok", NOW + 3600),
            FixedProbe::new(true),
        );
        assert_eq!(v.validate_at(NOW).await, ValidationOutcome::Invalid);
    }

    #[tokio::test]
    async fn test_other_statuses_are_invalid() {
        for status in [403, 404, 500, 503] {
            let server = MockServer::start().await;
            mock_check(&server, status, 1).await;

            let v = validator(
                &server.uri(),
                CloudSettings::with_token("tok", NOW + 3600),
                FixedProbe::new(true),
            );
            assert_eq!(
                v.validate_at(NOW).await,
                ValidationOutcome::Invalid,
                "status {status}"
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_while_offline() {
        let probe = FixedProbe::new(false);
        let v = validator(
            &closed_port_host(),
            CloudSettings::with_token("tok", NOW + 3600),
            probe.clone(),
        );
        assert_eq!(v.validate_at(NOW).await, ValidationOutcome::Offline);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_while_online() {
        let probe = FixedProbe::new(true);
        let v = validator(
            &closed_port_host(),
            CloudSettings::with_token("tok", NOW + 3600),
            probe.clone(),
        );
        assert_eq!(v.validate_at(NOW).await, ValidationOutcome::UnknownError);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_host_while_offline() {
        let probe = FixedProbe::new(false);
        let v = validator(
            "http://gpcloud-check.invalid",
            CloudSettings::with_token("tok", NOW + 3600),
            probe.clone(),
        );
        assert_eq!(v.validate_at(NOW).await, ValidationOutcome::Offline);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_host_while_online() {
        let probe = FixedProbe::new(true);
        let v = validator(
            "http://gpcloud-check.invalid",
            CloudSettings::with_token("tok", NOW + 3600),
            probe.clone(),
        );
        assert_eq!(v.validate_at(NOW).await, ValidationOutcome::UnknownError);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_unknown_error() {
        let v = TokenValidator::new(
            "http://127.0.0.1:1",
            Arc::new(BrokenStore),
            FixedProbe::new(true),
            client(),
        );
        assert_eq!(v.validate().await, ValidationOutcome::UnknownError);
    }

    #[tokio::test]
    async fn test_check_url_joins_host_and_path() {
        let v = validator(
            "https://cloud.example.com/",
            CloudSettings::default(),
            FixedProbe::new(true),
        );
        assert_eq!(v.check_url(), "https://cloud.example.com/access-token/check");
    }

    #[test]
    fn test_time_until_expiry() {
        let expires_at = chrono::Utc::now().timestamp() + 2 * 3600 + 600;
        let v = validator(
            "http://127.0.0.1:1",
            CloudSettings::with_token("tok", expires_at),
            FixedProbe::new(true),
        );
        let remaining = v.time_until_expiry().unwrap();
        assert!(remaining > Duration::from_secs(2 * 3600));
        assert!(remaining <= Duration::from_secs(2 * 3600 + 600));

        let empty = validator(
            "http://127.0.0.1:1",
            CloudSettings::with_token("", expires_at),
            FixedProbe::new(true),
        );
        assert!(empty.time_until_expiry().is_none());
    }

    #[tokio::test]
    async fn test_check_access_runs_in_background() {
        let server = MockServer::start().await;
        mock_check(&server, 200, 1).await;

        let expires_at = chrono::Utc::now().timestamp() + 3600;
        let v = Arc::new(validator(
            &server.uri(),
            CloudSettings::with_token("tok", expires_at),
            FixedProbe::new(true),
        ));
        assert_eq!(v.check_access().await, ValidationOutcome::Success);
    }

    #[tokio::test]
    async fn test_aborted_check_is_unknown_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/access-token/check"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let expires_at = chrono::Utc::now().timestamp() + 3600;
        let v = Arc::new(validator(
            &server.uri(),
            CloudSettings::with_token("tok", expires_at),
            FixedProbe::new(true),
        ));
        let check = v.check_access();
        check.abort();
        let outcome = tokio::time::timeout(Duration::from_secs(5), check)
            .await
            .unwrap();
        assert_eq!(outcome, ValidationOutcome::UnknownError);
    }

    #[tokio::test]
    async fn test_check_access_with_reports_success_once() {
        let server = MockServer::start().await;
        mock_check(&server, 200, 1).await;

        let expires_at = chrono::Utc::now().timestamp() + 3600;
        let v = Arc::new(validator(
            &server.uri(),
            CloudSettings::with_token("tok", expires_at),
            FixedProbe::new(true),
        ));

        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let s = successes.clone();
        let f = failures.clone();
        v.check_access_with(
            move || {
                s.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await
        .unwrap();

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_access_with_reports_reason() {
        let server = MockServer::start().await;
        mock_check(&server, 401, 1).await;

        let expires_at = chrono::Utc::now().timestamp() + 3600;
        let v = Arc::new(validator(
            &server.uri(),
            CloudSettings::with_token("tok", expires_at),
            FixedProbe::new(true),
        ));

        let (tx, rx) = tokio::sync::oneshot::channel();
        v.check_access_with(
            || panic!("check should not succeed"),
            move |outcome| {
                let _ = tx.send(outcome);
            },
        )
        .await
        .unwrap();

        let outcome = rx.await.unwrap();
        assert_eq!(outcome, ValidationOutcome::Invalid);
        assert_eq!(outcome.reason(), "INVALID");
    }
}
