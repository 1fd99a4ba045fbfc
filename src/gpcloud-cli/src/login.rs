//! Login command handlers.

use anyhow::{Context, Result, bail};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use gpcloud_common::{CloudConfig, get_app_dirs, get_gpcloud_home};
use gpcloud_login::{
    CloudSettings, FileSettingsStore, ListenerError, SettingsStore, SignInError, SignInFlow,
    TokenValidator, ValidationOutcome, format_remaining, open_browser, safe_format_key,
    validate_browser_url,
};

use crate::styled_output::{
    MessageType, print_dim, print_info, print_message, print_success, print_warning,
};

fn settings_store() -> Result<Arc<FileSettingsStore>> {
    let home = get_gpcloud_home().context("Could not determine the GPCloud home directory")?;
    Ok(Arc::new(FileSettingsStore::new(&home)))
}

/// Run the browser sign-in and store the received credentials.
pub async fn run_login(config: CloudConfig, no_browser: bool) -> Result<()> {
    let dirs = get_app_dirs().context("Could not determine the GPCloud home directory")?;
    dirs.ensure_dirs().with_context(|| {
        format!("Failed to create GPCloud home at {}", dirs.config_dir.display())
    })?;
    let store = settings_store()?;
    let mut flow = SignInFlow::new(config, store);
    if no_browser {
        flow = flow.without_browser();
    }

    let pending = flow
        .start()
        .await
        .context("Failed to start the sign-in listener")?;

    if pending.browser_opened() {
        print_info("Opening your browser to sign in to GanttProject Cloud...");
        print_dim(&format!(
            "If nothing happens, open this URL: {}",
            pending.signin_url()
        ));
    } else {
        print_info("Open this URL in your browser to sign in:");
        println!("{}", pending.signin_url());
    }
    print_dim("Waiting for the browser to complete sign-in (Ctrl+C to cancel)...");

    let result = tokio::select! {
        result = pending.complete() => result,
        _ = tokio::signal::ctrl_c() => bail!("Sign-in cancelled"),
    };

    let settings = match result {
        Ok(settings) => settings,
        Err(SignInError::Listener(ListenerError::Timeout(limit))) => bail!(
            "No response from the browser within {}s. Run `gpcloud login` to try again.",
            limit.as_secs()
        ),
        Err(e) => return Err(e).context("Sign-in failed"),
    };

    print_success("Signed in to GanttProject Cloud.");
    print_settings_details(&settings);
    Ok(())
}

/// Open the registration page.
pub fn run_signup(config: &CloudConfig, no_browser: bool) -> Result<()> {
    let url = validate_browser_url(&config.signup_url).context("Invalid signup URL")?;

    if !no_browser {
        match open_browser(url.as_str()) {
            Ok(()) => {
                print_info("Opened the GanttProject Cloud registration page in your browser.");
                print_dim("When your account is ready, run `gpcloud login`.");
                return Ok(());
            }
            Err(e) => tracing::warn!(error = %e, "Could not open browser"),
        }
    }

    print_info("Open this URL in your browser to create an account:");
    println!("{url}");
    Ok(())
}

/// Report whether the stored token is usable. Returns true when it is.
pub async fn run_status(config: &CloudConfig, local: bool) -> Result<bool> {
    let store = settings_store()?;

    if local {
        let settings = store
            .load()
            .context("Failed to read stored credentials")?;
        let authenticated = match settings.local_outcome_at(chrono::Utc::now().timestamp()) {
            Some(outcome) => {
                let (kind, message) = describe_outcome(outcome, None);
                print_message(kind, &message);
                false
            }
            None => {
                print_success("Access token stored (not verified with the cloud).");
                true
            }
        };
        print_settings_details(&settings);
        return Ok(authenticated);
    }

    let validator = Arc::new(TokenValidator::from_config(config, store.clone())?);
    print_dim(&format!("Checking access token with {}...", config.cloud_host));
    let mut check = validator.check_access();
    let outcome = tokio::select! {
        outcome = &mut check => outcome,
        _ = tokio::signal::ctrl_c() => {
            check.abort();
            bail!("Token check cancelled");
        }
    };
    tracing::debug!(outcome = %outcome, reason = outcome.reason(), "Token check finished");

    let (kind, message) = describe_outcome(outcome, validator.time_until_expiry());
    print_message(kind, &message);
    if outcome.is_success()
        && let Ok(settings) = store.load()
    {
        print_settings_details(&settings);
    }
    Ok(outcome.is_success())
}

/// Remove the stored credentials.
pub fn run_logout(skip_confirmation: bool) -> Result<()> {
    let store = settings_store()?;

    let settings = store
        .load()
        .context("Failed to read stored credentials")?;
    if !settings.has_token() && !store.path().exists() {
        print_info("Not signed in.");
        return Ok(());
    }

    if !skip_confirmation && std::io::stdin().is_terminal() {
        eprint!("Are you sure you want to sign out? This will remove your stored credentials. [y/N]: ");
        let _ = std::io::Write::flush(&mut std::io::stderr());

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input).is_ok() {
            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                print_info("Sign-out cancelled.");
                return Ok(());
            }
        }
    }

    if store.clear().context("Failed to remove stored credentials")? {
        print_success("Signed out. Credentials have been removed.");
    } else {
        print_info("Not signed in.");
    }
    Ok(())
}

/// User-facing message for a validation outcome.
pub fn describe_outcome(
    outcome: ValidationOutcome,
    remaining: Option<Duration>,
) -> (MessageType, String) {
    match outcome {
        ValidationOutcome::Success => {
            let message = match remaining {
                Some(left) => format!(
                    "Signed in to GanttProject Cloud. Token expires in {}.",
                    format_remaining(left)
                ),
                None => "Signed in to GanttProject Cloud.".to_string(),
            };
            (MessageType::Success, message)
        }
        ValidationOutcome::NoToken => (
            MessageType::Info,
            "Not signed in. Run `gpcloud login` to sign in.".to_string(),
        ),
        ValidationOutcome::Expired => (
            MessageType::Warning,
            "Access token expired. Run `gpcloud login` to sign in again.".to_string(),
        ),
        ValidationOutcome::Invalid => (
            MessageType::Error,
            "Access token was rejected by GanttProject Cloud. Run `gpcloud login` to sign in again."
                .to_string(),
        ),
        ValidationOutcome::Offline => (
            MessageType::Warning,
            "Working offline: the network is unavailable.".to_string(),
        ),
        ValidationOutcome::UnknownError => (
            MessageType::Error,
            "Could not verify the access token. Run with --verbose for details.".to_string(),
        ),
    }
}

fn print_settings_details(settings: &CloudSettings) {
    if let Some(token) = settings.auth_token().filter(|t| !t.is_empty()) {
        print_dim(&format!("Token: {}", safe_format_key(token)));
    }
    if let Some(user_id) = settings.user_id.as_deref() {
        print_dim(&format!("User: {user_id}"));
    }
    match settings.time_until_expiry() {
        Some(left) => print_dim(&format!("Expires in {}", format_remaining(left))),
        None if settings.has_token() => print_warning("Token has expired."),
        None => {}
    }
}
