//! Browser sign-in flow.
//!
//! Starts the callback listener, sends the user to the cloud sign-in page and
//! stores whatever credentials come back.

use std::sync::Arc;
use thiserror::Error;

use gpcloud_common::CloudConfig;

use crate::browser::open_browser;
use crate::listener::{CallbackListener, ListenerError, ListenerOptions};
use crate::settings::{SettingsError, SettingsStore};
use crate::types::{CloudSettings, TokenGrant};

#[derive(Debug, Error)]
pub enum SignInError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Failed to store credentials: {0}")]
    Settings(#[from] SettingsError),
}

/// Drives one browser sign-in.
pub struct SignInFlow {
    config: CloudConfig,
    store: Arc<dyn SettingsStore>,
    open_browser: bool,
}

impl SignInFlow {
    pub fn new(config: CloudConfig, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            config,
            store,
            open_browser: true,
        }
    }

    /// Do not launch a browser; the caller shows the URL instead.
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    /// Registration page. No listener is involved.
    pub fn signup_url(&self) -> &str {
        &self.config.signup_url
    }

    /// Start the listener and point the browser at the sign-in page.
    pub async fn start(&self) -> Result<PendingSignIn, SignInError> {
        let mut listener = CallbackListener::new(ListenerOptions::from_config(&self.config));
        listener.start().await?;
        let signin_url = listener.signin_url(&self.config.signin_url)?;

        let browser_opened = self.open_browser
            && match open_browser(&signin_url) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not open browser");
                    false
                }
            };

        Ok(PendingSignIn {
            listener,
            signin_url,
            browser_opened,
            store: Arc::clone(&self.store),
        })
    }
}

/// A sign-in waiting for the browser to deliver credentials.
pub struct PendingSignIn {
    listener: CallbackListener,
    signin_url: String,
    browser_opened: bool,
    store: Arc<dyn SettingsStore>,
}

impl PendingSignIn {
    pub fn signin_url(&self) -> &str {
        &self.signin_url
    }

    /// False when the URL has to be opened by hand.
    pub fn browser_opened(&self) -> bool {
        self.browser_opened
    }

    pub fn port(&self) -> Option<u16> {
        self.listener.listening_port()
    }

    /// Additionally observe the grant, e.g. to update a UI.
    pub fn on_token_received<F>(&self, callback: F)
    where
        F: FnOnce(TokenGrant) + Send + 'static,
    {
        self.listener.on_token_received(callback);
    }

    /// Wait for the grant, stop the listener and persist the credentials.
    pub async fn complete(mut self) -> Result<CloudSettings, SignInError> {
        let result = self.listener.wait_for_grant().await;
        self.listener.shutdown();
        let grant = result?;

        let settings = CloudSettings::from_grant(&grant);
        self.store.save(&settings)?;
        tracing::info!(
            user_id = settings.user_id.as_deref().unwrap_or("-"),
            "Signed in to GanttProject Cloud"
        );
        Ok(settings)
    }
}
