//! Opening sign-in pages in the user's default browser.

use anyhow::{Context, Result};

/// Check that `url` is safe to hand to the platform opener.
///
/// Only http and https URLs without embedded credentials are accepted.
pub fn validate_browser_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url).context("invalid URL")?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            anyhow::bail!(
                "refusing to open URL with scheme '{scheme}': only http and https are allowed"
            );
        }
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        anyhow::bail!("refusing to open URL with embedded credentials");
    }

    const DANGEROUS_CHARS: &[char] = &['`', '$', '|', ';', '<', '>', '!', '\n', '\r'];
    if parsed.as_str().chars().any(|c| DANGEROUS_CHARS.contains(&c)) {
        anyhow::bail!("URL contains potentially dangerous characters");
    }

    Ok(parsed)
}

/// Open `url` in the default browser.
///
/// Returns an error when the URL is rejected or no opener could be spawned;
/// callers fall back to printing the URL.
pub fn open_browser(url: &str) -> Result<()> {
    let parsed = validate_browser_url(url)?;
    let safe_url = parsed.as_str();
    tracing::debug!(url = %safe_url, "Opening browser");

    spawn_opener(safe_url)
}

#[cfg(target_os = "macos")]
fn spawn_opener(url: &str) -> Result<()> {
    std::process::Command::new("open")
        .arg("--")
        .arg(url)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("failed to open browser")?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn spawn_opener(url: &str) -> Result<()> {
    std::process::Command::new("xdg-open")
        .arg(url)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("failed to open browser")?;
    Ok(())
}

#[cfg(target_os = "windows")]
fn spawn_opener(url: &str) -> Result<()> {
    // `start` treats the first quoted argument as the window title.
    // `&` separates query parameters and must be escaped for cmd.
    let escaped = url.replace('&', "^&");
    std::process::Command::new("cmd")
        .args(["/C", "start", "", &escaped])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("failed to open browser")?;
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn spawn_opener(_url: &str) -> Result<()> {
    anyhow::bail!("no browser opener for this platform")
}
