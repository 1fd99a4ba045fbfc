//! Local HTTP listener for the browser sign-in callback.
//!
//! The sign-in page is opened with `?callback=<port>&state=<nonce>` and, once
//! the user has signed in, redirects (or posts) back to
//! `http://localhost:<port>/...` with the token as a request parameter.
//!
//! SECURITY:
//! - Bound to 127.0.0.1 only
//! - Per-session `state` nonce, compared in constant time
//! - The first accepted token wins; later ones are refused
//! - Idle timeout so an abandoned sign-in does not keep a port open

use axum::Router;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gpcloud_common::CloudConfig;

use crate::constants::{
    CALLBACK_PARAM, LISTENER_TIMEOUT_SECS, STATE_PARAM, TOKEN_PARAM, USER_ID_PARAM,
    VALIDITY_PARAM, WEBSOCKET_TOKEN_PARAM,
};
use crate::types::TokenGrant;
use crate::utils::{constant_time_compare, random_url_safe_token};

/// Handler invoked with the token delivered by the browser.
pub type TokenCallback = Box<dyn FnOnce(TokenGrant) + Send + 'static>;

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>GanttProject Cloud</title></head>
<body>
    <h1>You are signed in</h1>
    <p>You may close this window and return to GanttProject.</p>
</body>
</html>
"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>GanttProject Cloud - Error</title></head>
<body>
    <h1>Sign-in failed</h1>
    <p>Please return to GanttProject and try again.</p>
</body>
</html>
"#;

/// Errors raised by the callback listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Callback listener already started")]
    AlreadyStarted,
    #[error("Callback listener not started")]
    NotStarted,
    #[error("Failed to bind callback listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("Invalid sign-in URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("No token received within {0:?}")]
    Timeout(Duration),
    #[error("Callback listener closed before a token was received")]
    Closed,
}

/// Options for the callback listener.
#[derive(Debug, Clone)]
pub struct ListenerOptions {
    /// Reject requests that do not carry the session `state`.
    pub require_state: bool,
    /// Origin allowed to read the listener's responses (CORS).
    pub allowed_origin: Option<String>,
    /// Stop listening after this long. `None` keeps it open until shutdown.
    pub timeout: Option<Duration>,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            require_state: true,
            allowed_origin: None,
            timeout: Some(Duration::from_secs(LISTENER_TIMEOUT_SECS)),
        }
    }
}

impl ListenerOptions {
    pub fn from_config(config: &CloudConfig) -> Self {
        Self {
            require_state: config.require_state,
            allowed_origin: Some(config.cloud_origin()),
            timeout: Some(config.listener_timeout()),
        }
    }
}

#[derive(Default)]
struct CallbackSlot {
    callback: Option<TokenCallback>,
    pending: Option<TokenGrant>,
}

struct Shared {
    state: String,
    require_state: bool,
    allowed_origin: Option<HeaderValue>,
    slot: Mutex<CallbackSlot>,
    grant_tx: Mutex<Option<oneshot::Sender<TokenGrant>>>,
    delivered: AtomicBool,
    timed_out: AtomicBool,
}

impl Shared {
    /// Hand the grant to the registered callback, or park it until one is set.
    fn deliver(&self, grant: TokenGrant) {
        let callback = {
            let mut slot = self.slot.lock();
            match slot.callback.take() {
                Some(callback) => Some(callback),
                None => {
                    slot.pending = Some(grant.clone());
                    None
                }
            }
        };
        if let Some(callback) = callback {
            callback(grant.clone());
        }

        if let Some(tx) = self.grant_tx.lock().take() {
            let _ = tx.send(grant);
        }
    }

    fn respond(&self, status: StatusCode, page: &'static str) -> Response {
        let mut response = (status, Html(page)).into_response();
        if let Some(origin) = &self.allowed_origin {
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }
        response
    }
}

struct Running {
    port: u16,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Short-lived loopback server that receives one token from the browser.
pub struct CallbackListener {
    options: ListenerOptions,
    shared: Arc<Shared>,
    grant_rx: Option<oneshot::Receiver<TokenGrant>>,
    running: Option<Running>,
}

impl CallbackListener {
    pub fn new(options: ListenerOptions) -> Self {
        let allowed_origin = options.allowed_origin.as_deref().and_then(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!(origin, "Ignoring invalid CORS origin"))
                .ok()
        });
        let (grant_tx, grant_rx) = oneshot::channel();

        let shared = Arc::new(Shared {
            state: random_url_safe_token(),
            require_state: options.require_state,
            allowed_origin,
            slot: Mutex::new(CallbackSlot::default()),
            grant_tx: Mutex::new(Some(grant_tx)),
            delivered: AtomicBool::new(false),
            timed_out: AtomicBool::new(false),
        });

        Self {
            options,
            shared,
            grant_rx: Some(grant_rx),
            running: None,
        }
    }

    /// Register the handler for the received token, replacing any previous one.
    ///
    /// If a token already arrived, the handler runs immediately.
    pub fn on_token_received<F>(&self, callback: F)
    where
        F: FnOnce(TokenGrant) + Send + 'static,
    {
        let pending = {
            let mut slot = self.shared.slot.lock();
            match slot.pending.take() {
                Some(grant) => Some(grant),
                None => {
                    slot.callback = Some(Box::new(callback));
                    return;
                }
            }
        };
        if let Some(grant) = pending {
            callback(grant);
        }
    }

    /// Bind an ephemeral loopback port and start accepting connections.
    ///
    /// Returns the listening port. Fails if called more than once.
    pub async fn start(&mut self) -> Result<u16, ListenerError> {
        if self.running.is_some() {
            return Err(ListenerError::AlreadyStarted);
        }

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(ListenerError::Bind)?;
        let port = listener.local_addr().map_err(ListenerError::Bind)?.port();

        let app = Router::new()
            .fallback(handle_callback)
            .with_state(self.shared.clone());

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let shared = self.shared.clone();
        let timeout = self.options.timeout;

        let task = tokio::spawn(async move {
            let signal_shared = shared.clone();
            let signal = async move {
                match timeout {
                    Some(limit) => {
                        tokio::select! {
                            _ = shutdown.cancelled() => {}
                            _ = tokio::time::sleep(limit) => {
                                tracing::warn!(port, "Callback listener timed out");
                                signal_shared.timed_out.store(true, Ordering::SeqCst);
                            }
                        }
                    }
                    None => shutdown.cancelled().await,
                }
            };

            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
            {
                tracing::error!(port, error = %e, "Callback listener failed");
            }

            // Wake up anyone still waiting for a token.
            shared.grant_tx.lock().take();
            tracing::debug!(port, "Callback listener stopped");
        });

        tracing::info!(port, "Callback listener started");
        self.running = Some(Running { port, cancel, task });
        Ok(port)
    }

    /// Port the listener is bound to, once started.
    pub fn listening_port(&self) -> Option<u16> {
        self.running.as_ref().map(|r| r.port)
    }

    /// Per-session nonce the sign-in page must echo back as `state`.
    pub fn session_state(&self) -> &str {
        &self.shared.state
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    /// Build `<base>?callback=<port>&state=<nonce>`.
    pub fn signin_url(&self, base: &str) -> Result<String, ListenerError> {
        let port = self.listening_port().ok_or(ListenerError::NotStarted)?;
        let mut url = url::Url::parse(base).map_err(|e| ListenerError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair(CALLBACK_PARAM, &port.to_string())
            .append_pair(STATE_PARAM, &self.shared.state);
        Ok(url.into())
    }

    /// Wait until the browser delivers a token, the listener times out, or it
    /// is shut down. Can be awaited once.
    pub async fn wait_for_grant(&mut self) -> Result<TokenGrant, ListenerError> {
        if self.running.is_none() {
            return Err(ListenerError::NotStarted);
        }
        let rx = self.grant_rx.take().ok_or(ListenerError::Closed)?;

        match rx.await {
            Ok(grant) => Ok(grant),
            Err(_) if self.shared.timed_out.load(Ordering::SeqCst) => Err(ListenerError::Timeout(
                self.options.timeout.unwrap_or_default(),
            )),
            Err(_) => Err(ListenerError::Closed),
        }
    }

    /// Stop accepting connections. In-flight requests are allowed to finish.
    pub fn shutdown(&self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn handle_callback(
    State(shared): State<Arc<Shared>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let params = match form {
        Ok(Form(params)) => params,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Malformed sign-in callback");
            return shared.respond(StatusCode::BAD_REQUEST, FAILURE_PAGE);
        }
    };

    let Some(token) = params.get(TOKEN_PARAM).filter(|t| !t.is_empty()) else {
        tracing::warn!("Sign-in callback without a token");
        return shared.respond(StatusCode::BAD_REQUEST, FAILURE_PAGE);
    };

    // A state that is present must always match; a missing one only passes
    // when the listener was configured not to require it.
    let state_ok = match params.get(STATE_PARAM) {
        Some(received) => constant_time_compare(&shared.state, received),
        None => !shared.require_state,
    };
    if !state_ok {
        tracing::warn!("Sign-in callback with missing or mismatched state");
        return shared.respond(StatusCode::FORBIDDEN, FAILURE_PAGE);
    }

    if shared.delivered.swap(true, Ordering::SeqCst) {
        tracing::warn!("Ignoring repeated sign-in callback");
        return shared.respond(StatusCode::CONFLICT, FAILURE_PAGE);
    }

    let grant = TokenGrant::new(token.clone())
        .with_validity(params.get(VALIDITY_PARAM).cloned())
        .with_user_id(params.get(USER_ID_PARAM).cloned())
        .with_websocket_token(params.get(WEBSOCKET_TOKEN_PARAM).cloned());

    tracing::info!(
        has_validity = grant.validity.is_some(),
        has_user_id = grant.user_id.is_some(),
        "Received access token from browser"
    );
    shared.deliver(grant);

    shared.respond(StatusCode::OK, SUCCESS_PAGE)
}
