//! Constants for the gpcloud-login crate.

/// Path of the remote endpoint that validates the stored access token.
pub const ACCESS_TOKEN_CHECK_PATH: &str = "/access-token/check";

/// Query parameter carrying the listener port to the sign-in page.
pub const CALLBACK_PARAM: &str = "callback";

/// Query parameter carrying the per-session nonce.
pub const STATE_PARAM: &str = "state";

/// Request parameters delivered by the sign-in page.
pub const TOKEN_PARAM: &str = "token";
pub const VALIDITY_PARAM: &str = "validity";
pub const USER_ID_PARAM: &str = "userId";
pub const WEBSOCKET_TOKEN_PARAM: &str = "websocketToken";

/// File holding the persisted cloud settings inside the GPCloud home.
pub const SETTINGS_FILE: &str = "cloud-auth.json";

/// Default idle lifetime of the callback listener (in seconds).
pub const LISTENER_TIMEOUT_SECS: u64 = 300;

/// Timeout for a single network reachability probe (in seconds).
pub const PROBE_TIMEOUT_SECS: u64 = 3;
